//! Property-based invariant tests for the double-tailed buffer.
//!
//! 1. `to_vec()` equals a `VecDeque` model driven by the same operations.
//! 2. `at(i)` agrees with `to_vec()[i]` for every valid index.
//! 3. `at` outside `[0, len)` reports the offending index and length.
//! 4. `len()` is the total of every inserted block.
//! 5. `set` succeeds exactly inside the bounds and mirrors `at`.

use std::collections::VecDeque;

use logpane_core::{DoubleTailedBuffer, IndexOutOfBounds};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append(Vec<u32>),
    Prepend(Vec<u32>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let block = proptest::collection::vec(any::<u32>(), 0..8);
    prop_oneof![
        block.clone().prop_map(Op::Append),
        block.prop_map(Op::Prepend),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op_strategy(), 0..40)
}

fn apply(ops: &[Op]) -> (DoubleTailedBuffer<u32>, VecDeque<u32>) {
    let mut buf = DoubleTailedBuffer::new();
    let mut model = VecDeque::new();
    for op in ops {
        match op {
            Op::Append(block) => {
                buf.append(block.iter().copied());
                model.extend(block.iter().copied());
            }
            Op::Prepend(block) => {
                buf.prepend(block.iter().copied());
                for &v in block.iter().rev() {
                    model.push_front(v);
                }
            }
        }
    }
    (buf, model)
}

proptest! {
    #[test]
    fn to_vec_matches_model(ops in ops_strategy()) {
        let (buf, model) = apply(&ops);
        prop_assert_eq!(buf.to_vec(), model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn at_matches_to_vec(ops in ops_strategy()) {
        let (buf, _) = apply(&ops);
        let flat = buf.to_vec();
        for (i, expected) in flat.iter().enumerate() {
            prop_assert_eq!(buf.at(i), Ok(expected));
        }
    }

    #[test]
    fn at_out_of_range_reports_payload(ops in ops_strategy(), extra in 0usize..16) {
        let (buf, _) = apply(&ops);
        let len = buf.len();
        let index = len + extra;
        prop_assert_eq!(buf.at(index), Err(IndexOutOfBounds { index, len }));
    }

    #[test]
    fn len_is_sum_of_blocks(ops in ops_strategy()) {
        let (buf, _) = apply(&ops);
        let total: usize = ops
            .iter()
            .map(|op| match op {
                Op::Append(b) | Op::Prepend(b) => b.len(),
            })
            .sum();
        prop_assert_eq!(buf.len(), total);
        prop_assert_eq!(buf.is_empty(), total == 0);
    }

    #[test]
    fn set_mirrors_at(ops in ops_strategy(), index in 0usize..64, value in any::<u32>()) {
        let (mut buf, _) = apply(&ops);
        let len = buf.len();
        let ok = buf.set(index, value);
        prop_assert_eq!(ok, index < len);
        if ok {
            prop_assert_eq!(buf.at(index), Ok(&value));
        }
    }

    #[test]
    fn first_and_last_track_ends(ops in ops_strategy()) {
        let (buf, model) = apply(&ops);
        match (model.front(), model.back()) {
            (Some(front), Some(back)) => {
                prop_assert_eq!(buf.first(), Ok(front));
                prop_assert_eq!(buf.last(), Ok(back));
            }
            _ => {
                prop_assert!(buf.first().is_err());
                prop_assert!(buf.last().is_err());
            }
        }
    }
}
