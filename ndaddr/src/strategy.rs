/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for [`ReducedDims`] and [`Dimensions`].
//!
//! These strategies are used in `proptest`-based tests to check that
//! every translator agrees with the generic one, and that reduction
//! preserves addressing.
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::dims::Axis;
use crate::dims::Dimensions;
use crate::dims::ReducedDims;

/// Upper bound on the logical size of generated views, so that tests
/// can afford to translate every global index.
pub const MAX_SIZE: usize = 4096;

/// A literal extent or a short index sequence with small signed
/// entries.
pub fn gen_axis() -> BoxedStrategy<Axis> {
    prop_oneof![
        3 => (1usize..=4).prop_map(Axis::Extent),
        2 => prop::collection::vec(-8isize..8, 1..=4).prop_map(|seq| Axis::indices(seq)),
    ]
    .boxed()
}

/// Generates valid `ReducedDims` of rank `0..=max_rank`.
///
/// About half of the generated views broadcast (some axis repeats
/// 2 or 3 times) and about half carry offsets. Strides are small and
/// may be zero or negative.
pub fn gen_reduced_dims(max_rank: usize) -> BoxedStrategy<ReducedDims> {
    (0..=max_rank)
        .prop_flat_map(|rank| {
            (
                prop::collection::vec(gen_axis(), rank),
                prop::collection::vec(-5isize..=5, rank),
                prop::collection::vec(0usize..=6, rank),
                prop::collection::vec(1usize..=3, rank),
                any::<bool>(),
                any::<bool>(),
            )
        })
        .prop_filter_map(
            "logical size too large",
            |(shape, strides, offsets, repeats, with_offsets, broadcast)| {
                let ecounts = shape
                    .iter()
                    .zip(&repeats)
                    .map(|(axis, &r)| axis.len() * if broadcast { r } else { 1 })
                    .collect();
                let offsets = if with_offsets {
                    offsets
                } else {
                    vec![0; shape.len()]
                };
                ReducedDims::new(shape, strides, offsets, ecounts)
                    .ok()
                    .filter(|dims| dims.size() <= MAX_SIZE)
            },
        )
        .boxed()
}

/// How a generated axis's stride relates to the axes inside it.
#[derive(Debug, Clone, Copy)]
enum StrideKind {
    Broadcast,
    Contiguous,
    Arbitrary(isize),
}

fn gen_stride_kind() -> impl Strategy<Value = StrideKind> {
    prop_oneof![
        Just(StrideKind::Broadcast),
        Just(StrideKind::Contiguous),
        (-6isize..=6).prop_map(StrideKind::Arbitrary),
    ]
}

fn gen_view_axis() -> BoxedStrategy<Axis> {
    prop_oneof![
        1 => Just(Axis::Extent(0)),
        3 => Just(Axis::Extent(1)),
        12 => (2usize..=4).prop_map(Axis::Extent),
        4 => prop::collection::vec(-8isize..8, 1..=4).prop_map(|seq| Axis::indices(seq)),
    ]
    .boxed()
}

/// Generates `Dimensions` of rank `0..=max_rank` as a view layer
/// would: a mix of broadcast (stride 0), contiguous and arbitrary
/// strides, degenerate axes and occasional offsets.
pub fn gen_dimensions(max_rank: usize) -> BoxedStrategy<Dimensions> {
    (0..=max_rank)
        .prop_flat_map(|rank| {
            (
                prop::collection::vec(gen_view_axis(), rank),
                prop::collection::vec(gen_stride_kind(), rank),
                prop::collection::vec(prop_oneof![3 => Just(0usize), 1 => 1usize..=5], rank),
            )
        })
        .prop_filter_map("logical size too large", |(shape, kinds, offsets)| {
            let mut strides = vec![0isize; shape.len()];
            let mut inner = 1isize;
            for i in (0..shape.len()).rev() {
                strides[i] = match kinds[i] {
                    StrideKind::Broadcast => 0,
                    StrideKind::Contiguous => inner,
                    StrideKind::Arbitrary(s) => s,
                };
                inner = strides[i] * shape[i].len().max(1) as isize;
                if inner == 0 {
                    inner = 1;
                }
            }
            let dims = Dimensions::new(shape, strides, offsets).ok()?;
            dims.size().ok().filter(|&size| size <= MAX_SIZE)?;
            Some(dims)
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use proptest::test_runner::Config;
    use proptest::test_runner::TestRunner;

    use super::*;

    #[test]
    fn sample_many() {
        let mut runner = TestRunner::new(Config::default());
        let strat = gen_reduced_dims(6);

        let mut saw_broadcast = false;
        let mut saw_indirect = false;
        for _ in 0..256 {
            let dims = strat.new_tree(&mut runner).unwrap().current();
            assert!(dims.size() <= MAX_SIZE);
            assert!(dims.rank() <= 6);
            saw_broadcast |= dims.is_broadcast_shape();
            saw_indirect |= dims.shape().iter().any(|axis| !axis.is_direct());
        }
        assert!(saw_broadcast);
        assert!(saw_indirect);
    }

    #[test]
    fn sample_dimensions() {
        let mut runner = TestRunner::new(Config::default());
        let strat = gen_dimensions(5);

        for _ in 0..256 {
            let dims = strat.new_tree(&mut runner).unwrap().current();
            assert!(dims.size().unwrap() <= MAX_SIZE);
            assert_eq!(dims.strides().len(), dims.rank());
        }
    }
}
