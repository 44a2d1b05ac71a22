/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Configuration for address translation.
//!
//! The backend is chosen here explicitly rather than probed at
//! runtime. Settings come from defaults, then environment variables,
//! then any explicit configuration merged on top.

use std::env;

use serde::Deserialize;
use serde::Serialize;

use crate::backend::BackendKind;

/// Environment variable selecting the backend (`interpreter` or
/// `specialized`).
pub const BACKEND_ENV: &str = "NDADDR_BACKEND";

/// Environment variable controlling warm-up of common signatures.
pub const WARM_UP_ENV: &str = "NDADDR_WARM_UP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which backend compiles constructors.
    pub backend: BackendKind,

    /// Whether a new registry pre-installs the catalogue of common
    /// signatures.
    pub warm_up: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            warm_up: true,
        }
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables, on top of the
    /// defaults. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(val) = env::var(BACKEND_ENV) {
            match val.parse::<BackendKind>() {
                Ok(backend) => config.backend = backend,
                Err(err) => tracing::warn!("ignoring {}: {}", BACKEND_ENV, err),
            }
        }

        if let Ok(val) = env::var(WARM_UP_ENV) {
            match parse_bool(&val) {
                Some(warm_up) => config.warm_up = warm_up,
                None => tracing::warn!("ignoring {}: invalid value {:?}", WARM_UP_ENV, val),
            }
        }

        config
    }

    /// Merge with another configuration, with the other taking
    /// precedence wherever it differs from the default.
    pub fn merge(&mut self, other: &Config) {
        let defaults = Config::default();
        if other.backend != defaults.backend {
            self.backend = other.backend;
        }
        if other.warm_up != defaults.warm_up {
            self.warm_up = other.warm_up;
        }
    }
}
