/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use crate::dims::Axis;
use crate::dims::ReducedDims;

/// Structural fingerprint of a [`ReducedDims`], used as the key of
/// the constructor cache.
///
/// Two views with equal signatures may differ in their concrete
/// extents, strides and offsets, but can share one constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    direct: Vec<bool>,
    has_offsets: bool,
    broadcast: bool,
    trivial_last_stride: bool,
}

impl Signature {
    pub fn new(
        direct: Vec<bool>,
        has_offsets: bool,
        broadcast: bool,
        trivial_last_stride: bool,
    ) -> Self {
        Self {
            direct,
            has_offsets,
            broadcast,
            trivial_last_stride,
        }
    }

    /// Derives the signature of `dims`.
    ///
    /// Whether a view broadcasts depends on how the analyzer related
    /// logical and physical extents, so the caller supplies it.
    pub fn derive(dims: &ReducedDims, broadcast: bool) -> Self {
        Self {
            direct: dims.shape().iter().map(Axis::is_direct).collect(),
            has_offsets: dims.has_offsets(),
            broadcast,
            trivial_last_stride: dims.strides().last() == Some(&1),
        }
    }

    pub fn rank(&self) -> usize {
        self.direct.len()
    }

    /// Per-axis flag: true for literal extents, false for index
    /// sequences.
    pub fn direct(&self) -> &[bool] {
        &self.direct
    }

    pub fn has_offsets(&self) -> bool {
        self.has_offsets
    }

    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    pub fn trivial_last_stride(&self) -> bool {
        self.trivial_last_stride
    }

    /// The per-axis direct flags packed into a bitmask, axis `i` in bit
    /// `i`. Returns `None` above 64 axes.
    pub fn direct_mask(&self) -> Option<u64> {
        if self.direct.len() > 64 {
            return None;
        }
        Some(
            self.direct
                .iter()
                .enumerate()
                .filter(|(_, direct)| **direct)
                .fold(0u64, |mask, (i, _)| mask | (1u64 << i)),
        )
    }

    /// Signatures of commonly used views: one to three axes, every
    /// combination of direct and indirect axes, with and without
    /// offsets, broadcasting and a trivial last stride.
    pub fn catalogue() -> Vec<Signature> {
        let mut out = Vec::new();
        for rank in 1..=3usize {
            for mask in 0..(1u32 << rank) {
                let direct: Vec<bool> = (0..rank).map(|i| mask & (1 << i) != 0).collect();
                for flags in 0..8u32 {
                    out.push(Signature::new(
                        direct.clone(),
                        flags & 1 != 0,
                        flags & 2 != 0,
                        flags & 4 != 0,
                    ));
                }
            }
        }
        out
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes: String = self
            .direct
            .iter()
            .map(|&d| if d { 'D' } else { 'I' })
            .collect();
        let flag = |on: bool| if on { '+' } else { '-' };
        write!(
            f,
            "sig({},{}off,{}bcast,{}unit)",
            axes,
            flag(self.has_offsets),
            flag(self.broadcast),
            flag(self.trivial_last_stride)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_derive() {
        let dims = ReducedDims::new(
            vec![Axis::Extent(2), Axis::indices(vec![2, 0, 1])],
            vec![3, 1],
            vec![0, 1],
            vec![2, 3],
        )
        .unwrap();
        let sig = Signature::derive(&dims, false);
        assert_eq!(sig.rank(), 2);
        assert_eq!(sig.direct(), &[true, false]);
        assert!(sig.has_offsets());
        assert!(!sig.broadcast());
        assert!(sig.trivial_last_stride());
        assert_eq!(sig.direct_mask(), Some(0b01));
        assert_eq!(sig.to_string(), "sig(DI,+off,-bcast,+unit)");
    }

    #[test]
    fn test_broadcast_is_supplied() {
        let dims = ReducedDims::row_major(vec![4]).unwrap();
        assert!(Signature::derive(&dims, true).broadcast());
        assert!(!Signature::derive(&dims, false).broadcast());
    }

    #[test]
    fn test_nontrivial_last_stride() {
        let dims = ReducedDims::new(vec![Axis::Extent(4)], vec![-1], vec![0], vec![4]).unwrap();
        assert!(!Signature::derive(&dims, false).trivial_last_stride());

        let scalar = ReducedDims::row_major(vec![]).unwrap();
        let sig = Signature::derive(&scalar, false);
        assert_eq!(sig.rank(), 0);
        assert!(!sig.trivial_last_stride());
        assert_eq!(sig.to_string(), "sig(,-off,-bcast,-unit)");
    }

    #[test]
    fn test_structurally_equal_views_share_signature() {
        let a = ReducedDims::row_major(vec![2, 3]).unwrap();
        let b = ReducedDims::row_major(vec![7, 5]).unwrap();
        assert_eq!(Signature::derive(&a, false), Signature::derive(&b, false));
    }

    #[test]
    fn test_catalogue() {
        let catalogue = Signature::catalogue();
        assert_eq!(catalogue.len(), (2 + 4 + 8) * 8);
        let unique: HashSet<_> = catalogue.iter().cloned().collect();
        assert_eq!(unique.len(), catalogue.len());
        assert!(catalogue.iter().all(|s| (1..=3).contains(&s.rank())));
    }
}
