/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::sync::Arc;

use enum_as_inner::EnumAsInner;

/// The type of error for dimension construction and checked access.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DimsError {
    /// Parallel per-axis sequences disagree in length.
    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    /// An accessor was used with the wrong number of coordinates.
    #[error("dimension mismatch: expected rank {expected}, actual rank {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// One or more coordinates exceed their axis's extent.
    #[error("index {index:?} out of range {bounds:?}")]
    IndexOutOfRange {
        index: Vec<usize>,
        bounds: Vec<usize>,
    },

    /// A broadcast axis repeats a number of times that is not a
    /// multiple of its physical extent.
    #[error("axis {axis}: extent {extent} does not divide broadcast extent {ecount}")]
    NonDivisibleBroadcast {
        axis: usize,
        extent: usize,
        ecount: usize,
    },

    /// An indirect axis has more entries than its effective extent.
    #[error("axis {axis}: indirect sequence of length {len} exceeds effective extent {ecount}")]
    IndirectSequenceTooLong {
        axis: usize,
        len: usize,
        ecount: usize,
    },

    /// The logical element count does not fit in a `usize`.
    #[error("logical size overflows usize")]
    SizeOverflow,
}

/// One dimension of a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumAsInner)]
pub enum Axis {
    /// A contiguous logical range `0..extent`.
    Extent(usize),

    /// An explicit sequence of positions, produced when an axis has
    /// been reordered or gathered.
    Indices(Arc<[isize]>),
}

impl Axis {
    /// Builds an indirect axis from a sequence of positions.
    pub fn indices(values: impl Into<Vec<isize>>) -> Self {
        Axis::Indices(values.into().into())
    }

    /// The axis's own extent: the literal count, or the length of the
    /// index sequence.
    pub fn len(&self) -> usize {
        match self {
            Axis::Extent(n) => *n,
            Axis::Indices(seq) => seq.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for literal extents, false for index sequences.
    pub fn is_direct(&self) -> bool {
        matches!(self, Axis::Extent(_))
    }

    /// The position along this axis for a local coordinate in
    /// `0..self.len()`.
    #[inline]
    pub fn value_at(&self, local: usize) -> isize {
        match self {
            Axis::Extent(_) => local as isize,
            Axis::Indices(seq) => seq[local],
        }
    }
}

impl From<usize> for Axis {
    fn from(extent: usize) -> Self {
        Axis::Extent(extent)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Extent(n) => write!(f, "{}", n),
            Axis::Indices(seq) => write!(f, "{:?}", seq),
        }
    }
}

fn check_len(expected: usize, got: usize) -> Result<(), DimsError> {
    if expected != got {
        return Err(DimsError::InvalidDims { expected, got });
    }
    Ok(())
}

/// Unreduced dimensions of a view, as produced by the view layer on
/// reshape, transpose, broadcast and slice.
///
/// Strides may be zero (broadcast) or negative (reversed iteration).
/// An offset is a starting position along its axis; coordinates wrap
/// modulo the axis's extent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimensions {
    shape: Vec<Axis>,
    strides: Vec<isize>,
    offsets: Vec<usize>,
}

impl Dimensions {
    pub fn new(
        shape: Vec<Axis>,
        strides: Vec<isize>,
        offsets: Vec<usize>,
    ) -> Result<Self, DimsError> {
        check_len(shape.len(), strides.len())?;
        check_len(shape.len(), offsets.len())?;
        Ok(Self {
            shape,
            strides,
            offsets,
        })
    }

    /// Contiguous row-major dimensions with no offsets.
    pub fn row_major(extents: Vec<usize>) -> Self {
        let strides = row_major_strides(&extents)
            .into_iter()
            .map(|s| s as isize)
            .collect();
        Self {
            offsets: vec![0; extents.len()],
            shape: extents.into_iter().map(Axis::Extent).collect(),
            strides,
        }
    }

    pub fn shape(&self) -> &[Axis] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Logical extent of every axis.
    pub fn extents(&self) -> Vec<usize> {
        self.shape.iter().map(Axis::len).collect()
    }

    /// Total number of logical elements.
    pub fn size(&self) -> Result<usize, DimsError> {
        checked_product(self.shape.iter().map(Axis::len))
    }
}

fn checked_product(counts: impl IntoIterator<Item = usize>) -> Result<usize, DimsError> {
    counts
        .into_iter()
        .try_fold(1usize, |acc, n| acc.checked_mul(n))
        .ok_or(DimsError::SizeOverflow)
}

/// Canonical form of a view's dimensions.
///
/// Besides shape, strides and offsets, each axis carries a
/// shape-ecount: its extent in the logical (possibly broadcast)
/// iteration space. The ecount of an axis is always a multiple of the
/// axis's own extent; the axis repeats `ecount / extent` times.
/// Shape-ecount-strides are the row-major strides over the ecounts and
/// decompose a global index into per-axis coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReducedDims {
    shape: Vec<Axis>,
    strides: Vec<isize>,
    offsets: Vec<usize>,
    ecounts: Vec<usize>,
    ecount_strides: Vec<usize>,
    size: usize,
}

impl ReducedDims {
    /// Validates the per-axis data and computes the shape-ecount
    /// strides. Offsets are stored modulo their axis's extent, which
    /// leaves every translated offset unchanged.
    pub fn new(
        shape: Vec<Axis>,
        strides: Vec<isize>,
        offsets: Vec<usize>,
        ecounts: Vec<usize>,
    ) -> Result<Self, DimsError> {
        check_len(shape.len(), strides.len())?;
        check_len(shape.len(), offsets.len())?;
        check_len(shape.len(), ecounts.len())?;

        for (axis, (a, &ecount)) in shape.iter().zip(&ecounts).enumerate() {
            let extent = a.len();
            if !a.is_direct() && extent > ecount {
                return Err(DimsError::IndirectSequenceTooLong {
                    axis,
                    len: extent,
                    ecount,
                });
            }
            let divides = match extent {
                0 => ecount == 0,
                _ => ecount % extent == 0,
            };
            if !divides {
                return Err(DimsError::NonDivisibleBroadcast {
                    axis,
                    extent,
                    ecount,
                });
            }
        }

        let size = checked_product(ecounts.iter().copied())?;
        let offsets = shape
            .iter()
            .zip(offsets)
            .map(|(axis, offset)| match axis.len() {
                0 => 0,
                extent => offset % extent,
            })
            .collect();

        Ok(Self {
            ecount_strides: row_major_strides(&ecounts),
            shape,
            strides,
            offsets,
            ecounts,
            size,
        })
    }

    /// The identity canonical form of `dims`: every axis keeps its own
    /// extent as its ecount.
    pub fn unreduced(dims: &Dimensions) -> Result<Self, DimsError> {
        Self::new(
            dims.shape.clone(),
            dims.strides.clone(),
            dims.offsets.clone(),
            dims.extents(),
        )
    }

    /// Contiguous row-major dims with no offsets or broadcasting.
    pub fn row_major(extents: Vec<usize>) -> Result<Self, DimsError> {
        Self::unreduced(&Dimensions::row_major(extents))
    }

    pub fn shape(&self) -> &[Axis] {
        &self.shape
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn ecounts(&self) -> &[usize] {
        &self.ecounts
    }

    pub fn ecount_strides(&self) -> &[usize] {
        &self.ecount_strides
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of logical elements; global indices range over
    /// `0..size`.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether any axis has a nonzero offset.
    pub fn has_offsets(&self) -> bool {
        self.offsets.iter().any(|&o| o != 0)
    }

    /// Whether any axis repeats, i.e. has an ecount different from
    /// its own extent.
    pub fn is_broadcast_shape(&self) -> bool {
        self.shape
            .iter()
            .zip(&self.ecounts)
            .any(|(axis, &ecount)| axis.len() != ecount)
    }
}

impl fmt::Display for ReducedDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, axis) in self.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", axis)?;
        }
        write!(
            f,
            "] st={:?} off={:?} ec={:?}",
            self.strides, self.offsets, self.ecounts
        )
    }
}

/// Row-major strides for `extents`: the last axis has stride 1.
pub(crate) fn row_major_strides(extents: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; extents.len()];
    for i in (0..extents.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].saturating_mul(extents[i + 1]);
    }
    strides
}
