/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A backend turns a [`Signature`] into a [`Constructor`]: a shared
//! function that binds a [`Translator`] to any [`ReducedDims`] with
//! that signature.
//!
//! Two backends are provided. [`InterpreterBackend`] is always
//! available and hands out the [`GenericTranslator`].
//! [`SpecializedBackend`] selects a translator monomorphized for the
//! signature's rank and flags. Which one a registry uses is chosen
//! explicitly through [`BackendKind`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::dims::ReducedDims;
use crate::signature::Signature;
use crate::translate::GenericTranslator;
use crate::translate::Translator;

mod interpreter;
mod specialized;

pub use interpreter::InterpreterBackend;
pub use specialized::SpecializedBackend;

/// Errors raised while compiling a constructor. These never reach
/// callers of [`crate::Registry::resolve`]; the registry logs them and
/// falls back to the generic translator.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend cannot compile anything in this process.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend does not support this family of shapes.
    #[error("unsupported signature {signature}: {reason}")]
    Unsupported {
        signature: Signature,
        reason: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

type ConstructFn = dyn Fn(&ReducedDims) -> Arc<dyn Translator> + Send + Sync;

/// Binds translators to dims of a single signature. Cloning is cheap;
/// clones share the same underlying function.
#[derive(Clone)]
pub struct Constructor {
    label: Arc<str>,
    construct: Arc<ConstructFn>,
}

impl Constructor {
    pub fn new<F>(label: impl Into<Arc<str>>, construct: F) -> Self
    where
        F: Fn(&ReducedDims) -> Arc<dyn Translator> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            construct: Arc::new(construct),
        }
    }

    /// A constructor that wraps [`GenericTranslator`]. Valid for every
    /// signature.
    pub fn generic() -> Self {
        Self::new("generic", |dims| {
            Arc::new(GenericTranslator::new(dims.clone())) as Arc<dyn Translator>
        })
    }

    /// Short description of what this constructor builds.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binds a translator to `dims`.
    pub fn construct(&self, dims: &ReducedDims) -> Arc<dyn Translator> {
        (self.construct)(dims)
    }

    /// Whether `self` and `other` share the same function.
    pub fn ptr_eq(&self, other: &Constructor) -> bool {
        Arc::ptr_eq(&self.construct, &other.construct)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("label", &self.label)
            .finish()
    }
}

/// A source of constructors.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Produces a constructor for views with signature `signature`.
    /// Compilation may be slow; callers cache the result.
    fn compile(&self, signature: &Signature) -> Result<Constructor, BackendError>;
}

/// Selects a backend through configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Always hand out the generic translator.
    Interpreter,

    /// Hand out translators specialized by signature.
    #[default]
    Specialized,
}

impl BackendKind {
    /// Builds the backend this kind names.
    pub fn backend(self) -> Arc<dyn Backend> {
        match self {
            BackendKind::Interpreter => Arc::new(InterpreterBackend),
            BackendKind::Specialized => Arc::new(SpecializedBackend::default()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Interpreter => write!(f, "interpreter"),
            BackendKind::Specialized => write!(f, "specialized"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interpreter" | "generic" => Ok(BackendKind::Interpreter),
            "specialized" | "compiled" => Ok(BackendKind::Specialized),
            other => anyhow::bail!("unknown backend {:?}", other),
        }
    }
}
