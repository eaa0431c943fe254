//! 连接顺序指令
//!
//! 生成 `LEADING( ... )`：叶子扫描贡献关系名，每个二元连接把两个子节点的
//! 内容括起来，其余节点透明地展开子节点。只沿外/内主干行走，
//! 挂在节点上的辅助子计划不参与。

use crate::core::PlanError;
use crate::query::plan::walker::walk;
use crate::query::plan::{NodeKind, PlanNode, RelationNames, ScanKind};

pub fn build_leading(root: &PlanNode, names: &RelationNames) -> Result<String, PlanError> {
    let mut out = String::from("LEADING( ");
    append_node(root, names, &mut out)?;
    out.push_str(" )");
    Ok(out)
}

fn append_node(node: &PlanNode, names: &RelationNames, out: &mut String) -> Result<(), PlanError> {
    match &node.kind {
        NodeKind::Scan {
            scan:
                ScanKind::Seq
                | ScanKind::Cte
                | ScanKind::BitmapHeap
                | ScanKind::Function
                | ScanKind::Index
                | ScanKind::IndexOnly,
            scanrelid,
        } => {
            out.push_str(names.name(*scanrelid)?);
            out.push(' ');
            Ok(())
        }
        NodeKind::Join { .. } => {
            out.push('(');
            append_children(node, names, out)?;
            out.push(')');
            Ok(())
        }
        _ => append_children(node, names, out),
    }
}

fn append_children(
    node: &PlanNode,
    names: &RelationNames,
    out: &mut String,
) -> Result<(), PlanError> {
    let mut failure = None;
    walk(node, |child| match append_node(child, names, out) {
        Ok(()) => false,
        Err(e) => {
            failure = Some(e);
            true
        }
    });
    failure.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{JoinKind, RangeTable, RangeTableEntry};
    use std::collections::BTreeSet;

    fn names() -> RelationNames {
        let rt = RangeTable::new(vec![
            RangeTableEntry::relation("a"),
            RangeTableEntry::relation("b"),
            RangeTableEntry::relation("c"),
        ]);
        let used: BTreeSet<_> = [1, 2, 3].into_iter().collect();
        RelationNames::assign(&rt, &used).expect("names")
    }

    #[test]
    fn test_two_scans_under_join() {
        let root = PlanNode::join(
            JoinKind::HashJoin,
            PlanNode::scan(ScanKind::Seq, 1, 1.0),
            PlanNode::unary("Hash", PlanNode::scan(ScanKind::Seq, 2, 1.0), 1.0),
            1.0,
        );
        assert_eq!(
            build_leading(&root, &names()).expect("leading"),
            "LEADING( (a b ) )"
        );
    }

    #[test]
    fn test_nesting_follows_join_depth() {
        let left = PlanNode::join(
            JoinKind::NestLoop,
            PlanNode::scan(ScanKind::Index, 1, 1.0),
            PlanNode::scan(ScanKind::IndexOnly, 2, 1.0),
            1.0,
        );
        let root = PlanNode::join(
            JoinKind::MergeJoin,
            PlanNode::unary("Sort", left, 1.0),
            PlanNode::scan(ScanKind::Seq, 3, 1.0),
            1.0,
        );
        assert_eq!(
            build_leading(&root, &names()).expect("leading"),
            "LEADING( ((a b )c ) )"
        );
    }

    #[test]
    fn test_aux_plans_do_not_affect_order() {
        let outer = PlanNode::scan(ScanKind::Seq, 1, 1.0)
            .with_init_plan(PlanNode::scan(ScanKind::Seq, 3, 1.0));
        let root = PlanNode::join(
            JoinKind::HashJoin,
            outer,
            PlanNode::scan(ScanKind::Seq, 2, 1.0),
            1.0,
        );
        assert_eq!(
            build_leading(&root, &names()).expect("leading"),
            "LEADING( (a b ) )"
        );
    }

    #[test]
    fn test_unlisted_scans_contribute_nothing() {
        let root = PlanNode::join(
            JoinKind::NestLoop,
            PlanNode::scan(ScanKind::Values, 1, 1.0),
            PlanNode::scan(ScanKind::Seq, 2, 1.0),
            1.0,
        );
        assert_eq!(
            build_leading(&root, &names()).expect("leading"),
            "LEADING( (b ) )"
        );
    }
}
