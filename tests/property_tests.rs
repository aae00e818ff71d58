//! Construction and rendering properties.

use axial::{OrderDirection, QueryBuilder, Result, SetExpr};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    Axis { index: usize, members: Vec<String> },
    CrossJoin { members: Vec<String> },
    NonEmptyCrossJoin { members: Vec<String> },
    NonEmpty,
    Hierarchize,
    HierarchizeAll,
    Except { members: Vec<String> },
    FilterNonEmpty,
    Order { key: String, descending: bool },
    TopCount { count: u64 },
    Where { condition: String },
}

fn arb_member() -> impl Strategy<Value = String> {
    proptest::string::string_regex("\\[[A-Za-z][A-Za-z0-9]{0,7}\\]").expect("member regex")
}

fn arb_members() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_member(), 1..=4)
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (0usize..3, arb_members()).prop_map(|(index, members)| Operation::Axis { index, members }),
        arb_members().prop_map(|members| Operation::CrossJoin { members }),
        arb_members().prop_map(|members| Operation::NonEmptyCrossJoin { members }),
        Just(Operation::NonEmpty),
        Just(Operation::Hierarchize),
        Just(Operation::HierarchizeAll),
        arb_members().prop_map(|members| Operation::Except { members }),
        Just(Operation::FilterNonEmpty),
        (arb_member(), any::<bool>())
            .prop_map(|(key, descending)| Operation::Order { key, descending }),
        (1u64..100).prop_map(|count| Operation::TopCount { count }),
        arb_member().prop_map(|condition| Operation::Where { condition }),
    ]
}

/// Replays the operation sequence, ignoring contract violations the same
/// way both times (a structural call before content is skipped).
fn replay(ops: &[Operation]) -> Result<String> {
    let mut q = QueryBuilder::new("[Sales]");
    for op in ops {
        let outcome = match op {
            Operation::Axis { index, members } => q.axis(*index, members.clone()).map(|_| ()),
            Operation::CrossJoin { members } => q.crossjoin(members.clone()).map(|_| ()),
            Operation::NonEmptyCrossJoin { members } => {
                q.nonempty_crossjoin(members.clone()).map(|_| ())
            }
            Operation::NonEmpty => q.nonempty().map(|_| ()),
            Operation::Hierarchize => q.hierarchize().map(|_| ()),
            Operation::HierarchizeAll => q.hierarchize_all().map(|_| ()),
            Operation::Except { members } => q.except(members.clone()).map(|_| ()),
            Operation::FilterNonEmpty => q.filter_nonempty().map(|_| ()),
            Operation::Order { key, descending } => {
                let direction = if *descending {
                    OrderDirection::BDesc
                } else {
                    OrderDirection::Asc
                };
                q.order(key.clone(), direction).map(|_| ())
            }
            Operation::TopCount { count } => q.top_count(*count).map(|_| ()),
            Operation::Where { condition } => {
                q.r#where([condition.clone()]);
                Ok(())
            }
        };
        if let Err(err) = outcome {
            assert_eq!(err.code(), "Usage", "only usage errors are legal during replay");
        }
    }
    Ok(q.to_mdx())
}

fn assert_no_nested_crossjoin(expr: &SetExpr) {
    if let SetExpr::CrossJoin { operands, .. } = expr {
        for operand in operands {
            assert!(
                !matches!(operand, SetExpr::CrossJoin { .. }),
                "cross-join operand must not be another cross-join"
            );
        }
    }
}

proptest! {
    #[test]
    fn prop_identical_sequences_render_identically(
        ops in prop::collection::vec(arb_operation(), 1..40)
    ) {
        let first = replay(&ops).expect("replay");
        let second = replay(&ops).expect("replay");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_member_lists_brace_only_above_one(members in arb_members()) {
        let mut q = QueryBuilder::new("[Sales]");
        q.axis(0, members.clone()).expect("axis");
        let rendered = q.axis_expr(0).expect("axis set").to_mdx();
        if members.len() == 1 {
            prop_assert_eq!(rendered, members[0].clone());
        } else {
            prop_assert!(
                rendered.starts_with('{') && rendered.ends_with('}'),
                "rendered not brace-wrapped: {}",
                rendered
            );
        }
    }

    #[test]
    fn prop_crossjoins_stay_flat(
        lists in prop::collection::vec(arb_members(), 2..=5)
    ) {
        let mut q = QueryBuilder::new("[Sales]");
        let mut lists = lists.into_iter();
        q.axis(0, lists.next().expect("seed list")).expect("axis");
        let mut joined = 0usize;
        for list in lists {
            q.crossjoin(list).expect("crossjoin");
            joined += 1;
        }
        let expr = q.axis_expr(0).expect("axis set");
        assert_no_nested_crossjoin(expr);
        if let SetExpr::CrossJoin { operands, .. } = expr {
            prop_assert_eq!(operands.len(), joined + 1);
        }
    }
}
