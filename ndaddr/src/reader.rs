/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;

use crate::dims::Dimensions;
use crate::dims::DimsError;
use crate::dims::row_major_strides;
use crate::registry::Registry;
use crate::translate::Translator;

/// Rank-aware access to a view through a resolved [`Translator`].
///
/// Coordinates address the view's logical shape, the per-axis
/// extents of the originating [`Dimensions`]. They are flattened
/// row-major into a global index, which the translator maps to a
/// physical offset. Reduction may change how many axes the translator
/// walks but not the global index space, so coordinates stay valid
/// whatever the analyzer did.
///
/// The checked accessors validate rank and bounds before computing
/// anything; [`NdReader::read`] does not.
#[derive(Debug, Clone)]
pub struct NdReader {
    dims: Dimensions,
    shape: Vec<usize>,
    strides: Vec<usize>,
    translator: Arc<dyn Translator>,
}

impl NdReader {
    /// Reduces `dims` and resolves a translator for it in `registry`.
    pub fn new(registry: &Registry, dims: Dimensions) -> Result<Self, DimsError> {
        let translator = registry.resolve_dims(&dims, false)?;
        Self::with_translator(dims, translator)
    }

    /// Wraps an already resolved translator for `dims`. The translator
    /// must address exactly as many elements as `dims` describes.
    pub fn with_translator(
        dims: Dimensions,
        translator: Arc<dyn Translator>,
    ) -> Result<Self, DimsError> {
        let expected = dims.size()?;
        if translator.size() != expected {
            return Err(DimsError::InvalidDims {
                expected,
                got: translator.size(),
            });
        }
        let shape = dims.extents();
        Ok(Self {
            strides: row_major_strides(&shape),
            shape,
            dims,
            translator,
        })
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Effective extent of every axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Extent of the outermost axis; 1 for a rank-0 view.
    pub fn outer_extent(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Total number of logical elements.
    pub fn size(&self) -> usize {
        self.translator.size()
    }

    /// Physical offset of the element at global index `global`. Not
    /// bounds checked.
    #[inline]
    pub fn read(&self, global: usize) -> isize {
        self.translator.translate(global)
    }

    fn check_rank(&self, expected: usize) -> Result<(), DimsError> {
        if self.rank() != expected {
            return Err(DimsError::DimensionMismatch {
                expected,
                actual: self.rank(),
            });
        }
        Ok(())
    }

    fn check_bounds(&self, index: &[usize]) -> Result<(), DimsError> {
        if index.iter().zip(&self.shape).any(|(i, bound)| i >= bound) {
            return Err(DimsError::IndexOutOfRange {
                index: index.to_vec(),
                bounds: self.shape.clone(),
            });
        }
        Ok(())
    }

    pub fn read1d(&self, i: usize) -> Result<isize, DimsError> {
        self.check_rank(1)?;
        self.check_bounds(&[i])?;
        Ok(self.read(i))
    }

    pub fn read2d(&self, row: usize, col: usize) -> Result<isize, DimsError> {
        self.check_rank(2)?;
        self.check_bounds(&[row, col])?;
        Ok(self.read(row * self.shape[1] + col))
    }

    pub fn read3d(&self, height: usize, width: usize, channel: usize) -> Result<isize, DimsError> {
        self.check_rank(3)?;
        self.check_bounds(&[height, width, channel])?;
        let row_stride = self.shape[2];
        let plane_stride = self.shape[1] * row_stride;
        Ok(self.read(height * plane_stride + width * row_stride + channel))
    }

    /// Reads the element at `coords`, which must hold exactly one
    /// in-range coordinate per axis. Both too few and too many
    /// coordinates are a [`DimsError::DimensionMismatch`].
    pub fn read_nd(&self, coords: &[usize]) -> Result<isize, DimsError> {
        self.check_rank(coords.len())?;
        self.check_bounds(coords)?;
        let global = coords
            .iter()
            .zip(&self.strides)
            .map(|(c, s)| c * s)
            .sum::<usize>();
        Ok(self.read(global))
    }
}
