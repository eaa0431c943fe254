//! 计划树遍历
//!
//! 遍历只访问节点的直接子节点，由访问函数决定是否继续向下递归。
//! 访问函数返回 true 时立即短路返回。
//!
//! 子节点通过 [`Edge`] 区分来源，[`EdgeFilter`] 是传入遍历器的纯过滤谓词：
//! 指令生成只沿外/内连接主干行走，辅助子计划（相关子查询、InitPlan）
//! 在遍历时被跳过，而不是从树上摘除。

use std::collections::BTreeSet;

use super::node::{NodeKind, PlanNode, RangeIndex};

/// 父节点到子节点的边
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Outer,
    Inner,
    /// 组合算子成员或子查询扫描包装的子计划
    Member(usize),
    InitPlan(usize),
    SubPlan(usize),
}

impl Edge {
    pub fn is_auxiliary(self) -> bool {
        matches!(self, Edge::InitPlan(_) | Edge::SubPlan(_))
    }

    pub fn is_spine(self) -> bool {
        matches!(self, Edge::Outer | Edge::Inner)
    }

    /// EXPLAIN 中的 Parent Relationship
    pub fn relationship(self) -> &'static str {
        match self {
            Edge::Outer => "Outer",
            Edge::Inner => "Inner",
            Edge::Member(_) => "Member",
            Edge::InitPlan(_) => "InitPlan",
            Edge::SubPlan(_) => "SubPlan",
        }
    }
}

/// 边过滤策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    /// 只走外/内主干，组合算子视为不透明边界
    Spine,
    /// 走所有结构子节点，跳过辅助子计划
    SkipAuxiliary,
    /// 所有边
    All,
}

impl EdgeFilter {
    pub fn follows(self, edge: Edge) -> bool {
        match self {
            EdgeFilter::Spine => edge.is_spine(),
            EdgeFilter::SkipAuxiliary => !edge.is_auxiliary(),
            EdgeFilter::All => true,
        }
    }
}

impl PlanNode {
    /// 按固定顺序列出所有子节点：外、内、成员、InitPlan、SubPlan
    pub fn edges(&self) -> impl Iterator<Item = (Edge, &PlanNode)> + '_ {
        let outer = self.outer().map(|n| (Edge::Outer, n));
        let inner = self.inner().map(|n| (Edge::Inner, n));
        let members = self
            .members
            .iter()
            .enumerate()
            .map(|(i, n)| (Edge::Member(i), n));
        let init_plans = self
            .init_plans
            .iter()
            .enumerate()
            .map(|(i, n)| (Edge::InitPlan(i), n));
        let sub_plans = self
            .sub_plans
            .iter()
            .enumerate()
            .map(|(i, n)| (Edge::SubPlan(i), n));

        outer
            .into_iter()
            .chain(inner)
            .chain(members)
            .chain(init_plans)
            .chain(sub_plans)
    }
}

/// 对 `node` 的每个通过过滤的子节点调用 `visit`，任一调用返回 true 即短路
pub fn walk_children<'a, F>(node: &'a PlanNode, filter: EdgeFilter, mut visit: F) -> bool
where
    F: FnMut(Edge, &'a PlanNode) -> bool,
{
    for (edge, child) in node.edges() {
        if filter.follows(edge) && visit(edge, child) {
            return true;
        }
    }
    false
}

/// 只访问外/内两个主干子节点
pub fn walk<'a, F>(node: &'a PlanNode, mut visit: F) -> bool
where
    F: FnMut(&'a PlanNode) -> bool,
{
    walk_children(node, EdgeFilter::Spine, |_, child| visit(child))
}

/// 节点自身直接引用的关系
pub fn node_relations(node: &PlanNode) -> Vec<RangeIndex> {
    match &node.kind {
        NodeKind::Scan { scanrelid, .. } => vec![*scanrelid],
        NodeKind::ForeignScan { relids } | NodeKind::CustomScan { relids } => relids.clone(),
        NodeKind::ModifyTable {
            nominal_relation,
            exclusion_relation,
        } => {
            let mut rels = vec![*nominal_relation];
            rels.extend(exclusion_relation.iter().copied());
            rels
        }
        NodeKind::BitmapIndexScan { .. }
        | NodeKind::Join { .. }
        | NodeKind::Composite { .. }
        | NodeKind::Gather { .. }
        | NodeKind::Other { .. } => Vec::new(),
    }
}

/// 预扫描：收集以 `node` 为根的子树中引用到的关系
pub fn collect_relations(node: &PlanNode, filter: EdgeFilter) -> BTreeSet<RangeIndex> {
    let mut rels = BTreeSet::new();
    prescan(node, filter, &mut rels);
    rels
}

fn prescan(node: &PlanNode, filter: EdgeFilter, rels: &mut BTreeSet<RangeIndex>) -> bool {
    rels.extend(node_relations(node));
    walk_children(node, filter, |_, child| prescan(child, filter, rels))
}
