/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::backend::Backend;
use crate::backend::BackendError;
use crate::backend::Constructor;
use crate::signature::Signature;

/// The always-available backend. Every signature gets the generic
/// translator.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpreterBackend;

impl Backend for InterpreterBackend {
    fn name(&self) -> &str {
        "interpreter"
    }

    fn compile(&self, _signature: &Signature) -> Result<Constructor, BackendError> {
        Ok(Constructor::generic())
    }
}
