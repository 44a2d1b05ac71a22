/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt::Debug;

use crate::dims::ReducedDims;

/// A map from global indices in a view's logical iteration space to
/// physical offsets in the underlying buffer.
///
/// A translator is bound to one [`ReducedDims`] and is stateless, so
/// it may be shared and invoked concurrently.
///
/// `translate` performs no bounds checking: results for a `global`
/// outside `0..size()` are unspecified (and may panic). Every
/// implementation must agree with [`GenericTranslator`] on all
/// indices in range.
pub trait Translator: Send + Sync + Debug {
    /// The number of logical elements in the view.
    fn size(&self) -> usize;

    /// Maps a global index to a physical offset.
    fn translate(&self, global: usize) -> isize;
}

/// The reference translator. Correct for any [`ReducedDims`].
///
/// For each axis `i` with extent `E`, stride `S`, offset `O` and
/// ecount stride `C`:
///
/// ```text
/// coord  = ⌊global / C⌋ + O
/// local  = coord mod E
/// value  = local             (literal extent)
///        | indices[local]    (index sequence)
/// result = ∑ᵢ value × S
/// ```
///
/// The modulo re-wraps repeated axes, which lets a smaller buffer be
/// addressed by a larger broadcast iteration space.
#[derive(Debug, Clone)]
pub struct GenericTranslator {
    dims: ReducedDims,
}

impl GenericTranslator {
    pub fn new(dims: ReducedDims) -> Self {
        Self { dims }
    }

    pub fn dims(&self) -> &ReducedDims {
        &self.dims
    }
}

impl Translator for GenericTranslator {
    fn size(&self) -> usize {
        self.dims.size()
    }

    fn translate(&self, global: usize) -> isize {
        let dims = &self.dims;
        let mut result = 0isize;
        for (i, axis) in dims.shape().iter().enumerate() {
            let coord = global / dims.ecount_strides()[i];
            let local = wrap_offset(coord, dims.offsets()[i], axis.len());
            result += axis.value_at(local) * dims.strides()[i];
        }
        result
    }
}

/// `(coord + offset) mod extent`, for `offset < extent`, without
/// forming the possibly overflowing sum.
#[inline(always)]
pub(crate) fn wrap_offset(coord: usize, offset: usize, extent: usize) -> usize {
    let local = coord % extent;
    let room = extent - offset;
    if local >= room {
        local - room
    } else {
        local + offset
    }
}
