//! 已执行计划树
//!
//! - `node`：算子模型（封闭的节点种类集合）
//! - `range_table`：范围表、关系显示名、标识符引号规则
//! - `walker`：按边过滤的树遍历与关系预扫描

pub mod node;
pub mod range_table;
pub mod walker;

pub use node::{
    CompositeKind, Instrumentation, JoinKind, NodeKind, PlanNode, RangeIndex, ScanKind,
};
pub use range_table::{quote_identifier, RangeTable, RangeTableEntry, RelationNames};
pub use walker::{collect_relations, walk, walk_children, Edge, EdgeFilter};
