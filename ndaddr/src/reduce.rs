/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A reference analyzer that reduces view [`Dimensions`] into
//! canonical [`ReducedDims`].
//!
//! Reduction shrinks the number of axes a translator has to walk
//! without changing the physical offset of any global index:
//!
//! 1. Literal axes of extent 1 always contribute 0 and are dropped.
//! 2. A literal axis with stride 0 contributes 0 too, but it still
//!    shapes the iteration space. When it has an inner neighbour it is
//!    folded into that neighbour as repetition: the neighbour's ecount
//!    is multiplied by the folded extent, and the neighbour's modulo
//!    re-wraps it.
//! 3. Adjacent literal axes that are contiguous with respect to each
//!    other (`stride[a] == stride[b] * extent[b]`), carry no offset and
//!    do not repeat are merged into one.
//!
//! The reduced view broadcasts when any of its axes repeats.
//!
//! Views with an empty axis have no elements to address and are
//! returned unreduced.

use crate::dims::Axis;
use crate::dims::Dimensions;
use crate::dims::DimsError;
use crate::dims::ReducedDims;

/// The canonical form of a view together with its broadcast status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub dims: ReducedDims,
    pub broadcast: bool,
}

#[derive(Debug, Clone)]
struct WorkAxis {
    axis: Axis,
    stride: isize,
    offset: usize,
    ecount: usize,
}

impl WorkAxis {
    fn extent(&self) -> usize {
        self.axis.len()
    }

    fn is_plain_literal(&self) -> bool {
        self.axis.is_direct() && self.offset == 0 && self.ecount == self.extent()
    }
}

/// Reduces `dims` into canonical form.
pub fn reduce(dims: &Dimensions) -> Result<Reduction, DimsError> {
    if dims.shape().iter().any(Axis::is_empty) {
        return Ok(Reduction {
            dims: ReducedDims::unreduced(dims)?,
            broadcast: false,
        });
    }

    let axes = dims
        .shape()
        .iter()
        .zip(dims.strides())
        .zip(dims.offsets())
        .map(|((axis, &stride), &offset)| WorkAxis {
            axis: axis.clone(),
            stride,
            offset: offset % axis.len(),
            ecount: axis.len(),
        })
        .filter(|a| !(a.axis.is_direct() && a.extent() == 1));

    // Fold stride-0 literal axes into their inner neighbour.
    let mut folded: Vec<WorkAxis> = Vec::new();
    let mut pending = 1usize;
    let mut axes = axes.peekable();
    while let Some(mut a) = axes.next() {
        if a.axis.is_direct() && a.stride == 0 && axes.peek().is_some() {
            pending = pending.checked_mul(a.ecount).ok_or(DimsError::SizeOverflow)?;
            continue;
        }
        a.ecount = a.ecount.checked_mul(pending).ok_or(DimsError::SizeOverflow)?;
        pending = 1;
        folded.push(a);
    }

    // Merge contiguous literal neighbours, outermost first.
    let mut merged: Vec<WorkAxis> = Vec::with_capacity(folded.len());
    for b in folded {
        match merged.last_mut() {
            Some(a)
                if a.is_plain_literal()
                    && b.is_plain_literal()
                    && Some(a.stride) == b.stride.checked_mul(b.extent() as isize) =>
            {
                let extent = a
                    .extent()
                    .checked_mul(b.extent())
                    .ok_or(DimsError::SizeOverflow)?;
                *a = WorkAxis {
                    axis: Axis::Extent(extent),
                    stride: b.stride,
                    offset: 0,
                    ecount: extent,
                };
            }
            _ => merged.push(b),
        }
    }

    let broadcast = merged.iter().any(|a| a.ecount != a.extent());
    let mut shape = Vec::with_capacity(merged.len());
    let mut strides = Vec::with_capacity(merged.len());
    let mut offsets = Vec::with_capacity(merged.len());
    let mut ecounts = Vec::with_capacity(merged.len());
    for a in merged {
        shape.push(a.axis);
        strides.push(a.stride);
        offsets.push(a.offset);
        ecounts.push(a.ecount);
    }

    Ok(Reduction {
        dims: ReducedDims::new(shape, strides, offsets, ecounts)?,
        broadcast,
    })
}
