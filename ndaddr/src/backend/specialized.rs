/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Translators monomorphized by signature.
//!
//! A [`Kernel`] fixes the rank, the per-axis direct/indirect mask and
//! the offset, broadcast and unit-last-stride flags as const
//! parameters, so the per-axis loop unrolls and the branches that do
//! not apply to the signature disappear:
//!
//! - the innermost axis has an ecount stride of 1, so its division is
//!   dropped;
//! - without offsets or broadcasting, the outermost coordinate is
//!   already below its extent, so its modulo is dropped;
//! - with a unit last stride, the innermost multiply becomes an add.
//!
//! [`SpecializedBackend::compile`] maps a runtime [`Signature`] onto
//! one of these instantiations.

use std::sync::Arc;

use crate::backend::Backend;
use crate::backend::BackendError;
use crate::backend::Constructor;
use crate::dims::Axis;
use crate::dims::ReducedDims;
use crate::signature::Signature;
use crate::translate::GenericTranslator;
use crate::translate::Translator;
use crate::translate::wrap_offset;

/// Highest rank with a monomorphized kernel.
const KERNEL_MAX_RANK: usize = 4;

#[derive(Debug)]
struct Kernel<
    const N: usize,
    const DIRECT: u8,
    const OFFSETS: bool,
    const BROADCAST: bool,
    const UNIT_LAST: bool,
> {
    extents: [usize; N],
    strides: [isize; N],
    offsets: [usize; N],
    ecount_strides: [usize; N],
    // Empty for direct axes.
    indices: [Arc<[isize]>; N],
    size: usize,
}

impl<const N: usize, const DIRECT: u8, const OFFSETS: bool, const BROADCAST: bool, const UNIT_LAST: bool>
    Kernel<N, DIRECT, OFFSETS, BROADCAST, UNIT_LAST>
{
    /// Whether this instantiation computes the same offsets as the
    /// generic translator for `dims`.
    fn fits(dims: &ReducedDims) -> bool {
        if dims.rank() != N {
            return false;
        }
        let mask_matches = dims
            .shape()
            .iter()
            .enumerate()
            .all(|(i, axis)| axis.is_direct() == Self::is_direct(i));
        let outer_in_range = N == 0
            || OFFSETS
            || BROADCAST
            || dims.ecounts()[0] == dims.shape()[0].len();
        mask_matches
            && outer_in_range
            && (OFFSETS || !dims.has_offsets())
            && (!UNIT_LAST || dims.strides().last() == Some(&1))
    }

    #[inline(always)]
    const fn is_direct(axis: usize) -> bool {
        (DIRECT >> axis) & 1 == 1
    }

    fn new(dims: &ReducedDims) -> Self {
        let empty: Arc<[isize]> = Arc::from(Vec::new());
        Self {
            extents: std::array::from_fn(|i| dims.shape()[i].len()),
            strides: std::array::from_fn(|i| dims.strides()[i]),
            offsets: std::array::from_fn(|i| dims.offsets()[i]),
            ecount_strides: std::array::from_fn(|i| dims.ecount_strides()[i]),
            indices: std::array::from_fn(|i| match &dims.shape()[i] {
                Axis::Extent(_) => empty.clone(),
                Axis::Indices(seq) => seq.clone(),
            }),
            size: dims.size(),
        }
    }
}

impl<const N: usize, const DIRECT: u8, const OFFSETS: bool, const BROADCAST: bool, const UNIT_LAST: bool>
    Translator for Kernel<N, DIRECT, OFFSETS, BROADCAST, UNIT_LAST>
{
    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn translate(&self, global: usize) -> isize {
        let mut result = 0isize;
        for i in 0..N {
            let last = i + 1 == N;
            let coord = if last {
                global
            } else {
                global / self.ecount_strides[i]
            };
            let local = if OFFSETS {
                wrap_offset(coord, self.offsets[i], self.extents[i])
            } else if i == 0 && !BROADCAST {
                coord
            } else {
                coord % self.extents[i]
            };
            let value = if Self::is_direct(i) {
                local as isize
            } else {
                self.indices[i][local]
            };
            if UNIT_LAST && last {
                result += value;
            } else {
                result += value * self.strides[i];
            }
        }
        result
    }
}

fn kernel<
    const N: usize,
    const DIRECT: u8,
    const OFFSETS: bool,
    const BROADCAST: bool,
    const UNIT_LAST: bool,
>(
    label: String,
) -> Constructor {
    Constructor::new(label, |dims: &ReducedDims| -> Arc<dyn Translator> {
        if Kernel::<N, DIRECT, OFFSETS, BROADCAST, UNIT_LAST>::fits(dims) {
            Arc::new(Kernel::<N, DIRECT, OFFSETS, BROADCAST, UNIT_LAST>::new(dims))
        } else {
            tracing::debug!(
                "specialized kernel does not fit {}; using generic translator",
                dims
            );
            Arc::new(GenericTranslator::new(dims.clone()))
        }
    })
}

fn with_unit_last<const N: usize, const DIRECT: u8, const OFFSETS: bool, const BROADCAST: bool>(
    signature: &Signature,
    label: String,
) -> Constructor {
    if signature.trivial_last_stride() {
        kernel::<N, DIRECT, OFFSETS, BROADCAST, true>(label)
    } else {
        kernel::<N, DIRECT, OFFSETS, BROADCAST, false>(label)
    }
}

fn with_broadcast<const N: usize, const DIRECT: u8, const OFFSETS: bool>(
    signature: &Signature,
    label: String,
) -> Constructor {
    if signature.broadcast() {
        with_unit_last::<N, DIRECT, OFFSETS, true>(signature, label)
    } else {
        with_unit_last::<N, DIRECT, OFFSETS, false>(signature, label)
    }
}

fn with_offsets<const N: usize, const DIRECT: u8>(
    signature: &Signature,
    label: String,
) -> Constructor {
    if signature.has_offsets() {
        with_broadcast::<N, DIRECT, true>(signature, label)
    } else {
        with_broadcast::<N, DIRECT, false>(signature, label)
    }
}

// Instantiates one arm per direct mask valid at the given rank.
macro_rules! select_direct {
    ($rank:literal, $mask:expr, $signature:expr, $label:expr; $($m:literal)*) => {
        match $mask {
            $($m => Some(with_offsets::<$rank, $m>($signature, $label)),)*
            _ => None,
        }
    };
}

/// Compiles signatures of rank up to 4 into monomorphized kernels.
///
/// A constructor from this backend checks every dims it is handed
/// against its kernel's assumptions and binds the generic translator
/// when they do not hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecializedBackend;

impl Backend for SpecializedBackend {
    fn name(&self) -> &str {
        "specialized"
    }

    fn compile(&self, signature: &Signature) -> Result<Constructor, BackendError> {
        let rank = signature.rank();
        let unsupported = |reason: String| BackendError::Unsupported {
            signature: signature.clone(),
            reason,
        };
        if rank > KERNEL_MAX_RANK {
            return Err(unsupported(format!(
                "rank {} exceeds maximum kernel rank {}",
                rank, KERNEL_MAX_RANK
            )));
        }
        let mask = signature
            .direct_mask()
            .ok_or_else(|| unsupported("too many axes".to_string()))?;
        let label = format!("specialized {}", signature);

        let constructor = match rank {
            0 => select_direct!(0, mask, signature, label; 0),
            1 => select_direct!(1, mask, signature, label; 0 1),
            2 => select_direct!(2, mask, signature, label; 0 1 2 3),
            3 => select_direct!(3, mask, signature, label; 0 1 2 3 4 5 6 7),
            4 => select_direct!(4, mask, signature, label;
                0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15),
            _ => None,
        };
        constructor.ok_or_else(|| unsupported(format!("no kernel for direct mask {:#b}", mask)))
    }
}
