/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Address translation for strided N-dimensional views.
//!
//! Provides [`ReducedDims`], the canonical description of a view over
//! a flat buffer, and [`Translator`]s that map a flat logical index
//! in the view's iteration space to a physical offset in the buffer.
//!
//! Translators are produced by a [`Registry`], which caches one
//! [`Constructor`] per structural [`Signature`] and asks a pluggable
//! [`Backend`] to build constructors for signatures it has not seen.
//! [`NdReader`] wraps a resolved translator with rank-aware,
//! bounds-checked coordinate accessors.
//!
//! ```
//! use ndaddr::Dimensions;
//! use ndaddr::NdReader;
//! use ndaddr::Registry;
//!
//! let registry = Registry::default();
//! let reader = NdReader::new(&registry, Dimensions::row_major(vec![3, 4])).unwrap();
//! assert_eq!(reader.read2d(2, 3).unwrap(), 11);
//! assert!(reader.read2d(3, 0).is_err());
//! ```

/// Backends that compile translator constructors for a signature.
pub mod backend;

/// Configuration of the registry and its backend.
pub mod config;

mod dims;
pub use dims::Axis;
pub use dims::Dimensions;
pub use dims::DimsError;
pub use dims::ReducedDims;

/// Rank-aware, bounds-checked access to a translated view.
pub mod reader;

/// Reference reduction of view dimensions into canonical form.
pub mod reduce;

/// The signature-keyed constructor cache.
pub mod registry;

mod signature;
pub use signature::Signature;

/// Translators from global indices to physical offsets.
pub mod translate;

pub use backend::Backend;
pub use backend::BackendError;
pub use backend::BackendKind;
pub use backend::Constructor;
pub use config::Config;
pub use reader::NdReader;
pub use reduce::Reduction;
pub use reduce::reduce;
pub use registry::MAX_SPECIALIZED_RANK;
pub use registry::Registry;
pub use translate::GenericTranslator;
pub use translate::Translator;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
