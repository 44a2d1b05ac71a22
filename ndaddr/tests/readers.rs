/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::sync::Arc;
use std::sync::Barrier;

use ndaddr::Axis;
use ndaddr::BackendKind;
use ndaddr::Config;
use ndaddr::Dimensions;
use ndaddr::DimsError;
use ndaddr::NdReader;
use ndaddr::ReducedDims;
use ndaddr::Registry;
use ndaddr::Signature;
use ndaddr::Translator;
use ndaddr::registry::global;

fn views() -> Vec<Dimensions> {
    vec![
        Dimensions::row_major(vec![4, 5]),
        // Transpose of a 5x4 buffer.
        Dimensions::new(
            vec![Axis::Extent(4), Axis::Extent(5)],
            vec![1, 4],
            vec![0, 0],
        )
        .unwrap(),
        // Column broadcast.
        Dimensions::new(
            vec![Axis::Extent(4), Axis::Extent(5)],
            vec![1, 0],
            vec![0, 0],
        )
        .unwrap(),
        // Gathered rows with a rolled column axis.
        Dimensions::new(
            vec![Axis::indices(vec![3, 0, 2]), Axis::Extent(5)],
            vec![5, 1],
            vec![0, 2],
        )
        .unwrap(),
        // Reversed channels.
        Dimensions::new(
            vec![Axis::Extent(2), Axis::Extent(2), Axis::Extent(3)],
            vec![6, 3, -1],
            vec![0, 0, 0],
        )
        .unwrap(),
    ]
}

fn expected(dims: &Dimensions) -> Vec<isize> {
    let reference = ndaddr::GenericTranslator::new(ReducedDims::unreduced(dims).unwrap());
    (0..reference.size()).map(|g| reference.translate(g)).collect()
}

#[test]
fn concurrent_readers_share_global_registry() {
    let views = views();
    let barrier = Barrier::new(8);
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                barrier.wait();
                for dims in &views {
                    let reader = NdReader::new(global::registry(), dims.clone()).unwrap();
                    let got: Vec<isize> = (0..reader.size()).map(|g| reader.read(g)).collect();
                    assert_eq!(got, expected(dims));
                }
            });
        }
    });
    assert!(!global::registry().is_empty());
}

#[test]
fn backends_agree() {
    let interpreter = Registry::from_config(&Config {
        backend: BackendKind::Interpreter,
        warm_up: false,
    });
    let specialized = Registry::from_config(&Config {
        backend: BackendKind::Specialized,
        warm_up: true,
    });
    assert_eq!(specialized.len(), Signature::catalogue().len());
    assert!(interpreter.is_empty());

    for dims in views() {
        let a = NdReader::new(&interpreter, dims.clone()).unwrap();
        let b = NdReader::new(&specialized, dims.clone()).unwrap();
        assert_eq!(a.shape(), b.shape());
        let extents = dims.extents();
        for row in 0..extents[0] {
            for col in 0..extents[1] {
                match dims.rank() {
                    2 => assert_eq!(a.read2d(row, col).unwrap(), b.read2d(row, col).unwrap()),
                    _ => {
                        for ch in 0..extents[2] {
                            assert_eq!(
                                a.read3d(row, col, ch).unwrap(),
                                b.read3d(row, col, ch).unwrap()
                            );
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn reader_over_shared_translator() {
    let registry = Registry::default();
    let dims = Dimensions::row_major(vec![2, 3]);
    let translator: Arc<dyn Translator> = registry.resolve_dims(&dims, false).unwrap();
    let first = NdReader::with_translator(dims.clone(), translator.clone()).unwrap();
    let second = NdReader::with_translator(dims, translator).unwrap();
    assert_eq!(first.read2d(1, 2).unwrap(), second.read(5));
    assert_eq!(
        first.read3d(0, 0, 0).unwrap_err(),
        DimsError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    );
}
