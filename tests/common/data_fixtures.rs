//! 测试数据生成模块
//!
//! 提供已完成执行、计划树与范围表的构造函数

use plan_advisor::query::fingerprint::scan_literals;
use plan_advisor::query::plan::{
    JoinKind, NodeKind, PlanNode, RangeTable, RangeTableEntry, ScanKind,
};
use plan_advisor::query::statement::{QuerySource, Statement};
use plan_advisor::services::CompletedExecution;

/// orders / customers / items 三表范围表
pub fn shop_range_table() -> RangeTable {
    RangeTable::new(vec![
        RangeTableEntry::aliased("orders", "o"),
        RangeTableEntry::aliased("customers", "c"),
        RangeTableEntry::aliased("items", "i"),
    ])
}

/// `o ⋈ c` 的哈希连接，连接节点带给定的估算/实际行数
pub fn two_way_hash_join(estimated: f64, actual: Option<f64>) -> PlanNode {
    let join = PlanNode::join(
        JoinKind::HashJoin,
        PlanNode::scan(ScanKind::Seq, 1, 1000.0).with_actual(1000.0),
        PlanNode::unary(
            "Hash",
            PlanNode::scan(ScanKind::Index, 2, 50.0).with_actual(50.0),
            50.0,
        ),
        estimated,
    );
    match actual {
        Some(rows) => join.with_actual(rows),
        None => join,
    }
}

/// `(o ⋈ c) ⋈ i` 的三表计划
pub fn three_way_plan(top_actual: f64, inner_actual: f64) -> PlanNode {
    let lower = two_way_hash_join(100.0, Some(inner_actual));
    PlanNode::join(
        JoinKind::NestLoop,
        lower,
        PlanNode::scan(ScanKind::IndexOnly, 3, 1.0).with_instrument(300.0, 100.0),
        300.0,
    )
    .with_actual(top_actual)
}

/// 在扫描上挂一个相关子查询，子查询内部的连接估算偏差很大
pub fn with_correlated_subplan(mut plan: PlanNode) -> PlanNode {
    let sub_join = PlanNode::join(
        JoinKind::NestLoop,
        PlanNode::scan(ScanKind::Seq, 3, 1.0).with_actual(1.0),
        PlanNode::scan(ScanKind::Seq, 2, 1.0).with_actual(1.0),
        1.0,
    )
    .with_actual(250_000.0);
    if let Some(outer) = plan.outer.as_mut() {
        outer.sub_plans.push(sub_join);
    }
    plan
}

/// 用 EXPLAIN ANALYZE 包装一条查询文本
pub fn analyzed(sql: &str, plan: PlanNode, client: &str) -> CompletedExecution {
    let text = format!("EXPLAIN ANALYZE {}", sql);
    CompletedExecution {
        source: QuerySource::new(&text, scan_literals(&text)),
        statement: Statement::explain_analyze(Statement::Select),
        range_table: shop_range_table(),
        plan,
        execution_time_ms: Some(12.5),
        client: client.to_string(),
    }
}

/// 外层包一个不可见的 Gather
pub fn behind_invisible_gather(plan: PlanNode) -> PlanNode {
    let mut gather = PlanNode::new(NodeKind::Gather { invisible: true }, plan.estimated_rows);
    gather.outer = Some(Box::new(plan));
    gather
}

pub const ORDERS_BY_CUSTOMER: &str =
    "SELECT * FROM orders o JOIN customers c ON o.cid = c.id WHERE c.region = 'EU' AND o.total > 100";
