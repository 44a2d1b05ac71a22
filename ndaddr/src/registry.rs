/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The constructor cache.
//!
//! A [`Registry`] owns one [`Backend`] and a concurrent map from
//! [`Signature`] to [`Constructor`]. Resolving a view derives its
//! signature, reuses the cached constructor when there is one, and
//! otherwise compiles one with the backend and installs it.
//!
//! The map holds at most one constructor per signature. Threads racing
//! on a missing signature may each compile one, but only the first to
//! install wins and every racer is served the winner. Entries are
//! never removed.
//!
//! A backend that fails (or panics) while compiling never fails the
//! caller: the failure is logged and the generic constructor is
//! installed in its place.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;

use crate::backend::Backend;
use crate::backend::BackendError;
use crate::backend::Constructor;
use crate::config::Config;
use crate::dims::Dimensions;
use crate::dims::DimsError;
use crate::dims::ReducedDims;
use crate::reduce::reduce;
use crate::signature::Signature;
use crate::translate::GenericTranslator;
use crate::translate::Translator;

/// Views with more axes than this bypass the cache and always get
/// the generic translator.
pub const MAX_SPECIALIZED_RANK: usize = 4;

pub struct Registry {
    backend: Arc<dyn Backend>,
    constructors: DashMap<Signature, Constructor>,
}

impl Registry {
    /// An empty registry compiling with `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            constructors: DashMap::new(),
        }
    }

    /// A registry with the configured backend, warmed up when the
    /// configuration asks for it.
    pub fn from_config(config: &Config) -> Self {
        let registry = Self::new(config.backend.backend());
        if config.warm_up {
            registry.warm_up();
        }
        registry
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Number of installed signatures.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.constructors.contains_key(signature)
    }

    /// Returns the constructor installed for `signature`, compiling
    /// and installing one first if there is none.
    pub fn constructor(&self, signature: &Signature) -> Constructor {
        if let Some(constructor) = self.constructors.get(signature) {
            return constructor.clone();
        }

        // Compile without holding a shard lock; a racing thread may
        // install first, in which case its constructor is kept.
        let compiled = self.compile(signature);
        self.constructors
            .entry(signature.clone())
            .or_insert(compiled)
            .clone()
    }

    fn compile(&self, signature: &Signature) -> Constructor {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.backend.compile(signature)
        }))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(BackendError::Other(anyhow::anyhow!(
                "backend panicked: {}",
                message
            )))
        });

        match result {
            Ok(constructor) => {
                tracing::debug!(
                    "backend {} compiled {} as {}",
                    self.backend.name(),
                    signature,
                    constructor.label()
                );
                constructor
            }
            Err(err) => {
                tracing::warn!(
                    "backend {} failed to compile {}: {}; using generic translator",
                    self.backend.name(),
                    signature,
                    err
                );
                Constructor::generic()
            }
        }
    }

    /// Binds a translator to `dims`.
    ///
    /// `broadcast` is the analyzer's determination of whether the view
    /// broadcasts; it is trusted. With `force_generic`, or when `dims`
    /// has more than [`MAX_SPECIALIZED_RANK`] axes, the cache is
    /// bypassed and the generic translator is returned.
    pub fn resolve(
        &self,
        dims: &ReducedDims,
        broadcast: bool,
        force_generic: bool,
    ) -> Arc<dyn Translator> {
        if force_generic || dims.rank() > MAX_SPECIALIZED_RANK {
            return Arc::new(GenericTranslator::new(dims.clone()));
        }
        let signature = Signature::derive(dims, broadcast);
        self.constructor(&signature).construct(dims)
    }

    /// Reduces view dimensions with [`reduce`] and resolves the result.
    pub fn resolve_dims(
        &self,
        dims: &Dimensions,
        force_generic: bool,
    ) -> Result<Arc<dyn Translator>, DimsError> {
        let reduction = reduce(dims)?;
        Ok(self.resolve(&reduction.dims, reduction.broadcast, force_generic))
    }

    /// Installs constructors for [`Signature::catalogue`], so that
    /// commonly used views never wait on compilation. Returns the number
    /// of signatures newly installed.
    pub fn warm_up(&self) -> usize {
        let before = self.len();
        for signature in Signature::catalogue() {
            self.constructor(&signature);
        }
        let installed = self.len() - before;
        tracing::info!(
            "warmed up {} signatures with backend {}",
            installed,
            self.backend.name()
        );
        installed
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backend", &self.backend.name())
            .field("signatures", &self.constructors.len())
            .finish()
    }
}

/// The process-wide registry.
///
/// It is created on first use from [`Config::from_env`], warmed up if
/// so configured, and lives for the rest of the process. Components
/// that want an isolated cache construct their own [`Registry`]
/// instead.
pub mod global {
    use std::sync::LazyLock;

    use super::*;

    static REGISTRY: LazyLock<Registry> =
        LazyLock::new(|| Registry::from_config(&Config::from_env()));

    /// Get the process-wide registry.
    pub fn registry() -> &'static Registry {
        &REGISTRY
    }
}
