//! 指令生成器
//!
//! 对已执行计划树做两遍处理：
//! 1. 预扫描：收集整棵树引用到的关系，为它们分配 EXPLAIN 风格的显示名
//! 2. 生成：沿外/内主干按树序访问节点，产出扫描、连接、行数三类指令
//!
//! 随后独立执行一遍 leading 遍历得到连接顺序指令。辅助子计划在所有
//! 遍历中都通过边过滤跳过，计划树本身保持只读。

use serde::{Deserialize, Serialize};

use super::leading::build_leading;
use crate::core::PlanError;
use crate::query::plan::walker::{collect_relations, walk, EdgeFilter};
use crate::query::plan::{
    quote_identifier, JoinKind, NodeKind, PlanNode, RangeIndex, RangeTable, RelationNames, ScanKind,
};

/// 每行扫描指令的条数
pub const SCAN_DIRECTIVES_PER_LINE: usize = 5;

/// 扫描方法提示词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMethod {
    SeqScan,
    BitmapScan,
    IndexScan,
    IndexOnlyScan,
}

impl ScanMethod {
    /// 扫描种类对应的提示词；不在提示词表中的扫描返回 None
    pub fn for_scan(kind: ScanKind) -> Option<Self> {
        match kind {
            ScanKind::Seq | ScanKind::Cte | ScanKind::Function => Some(ScanMethod::SeqScan),
            ScanKind::BitmapHeap => Some(ScanMethod::BitmapScan),
            ScanKind::Index => Some(ScanMethod::IndexScan),
            ScanKind::IndexOnly => Some(ScanMethod::IndexOnlyScan),
            ScanKind::Sample
            | ScanKind::Tid
            | ScanKind::Subquery
            | ScanKind::TableFunc
            | ScanKind::Values
            | ScanKind::NamedTuplestore
            | ScanKind::WorkTable => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ScanMethod::SeqScan => "SEQSCAN",
            ScanMethod::BitmapScan => "BITMAPSCAN",
            ScanMethod::IndexScan => "INDEXSCAN",
            ScanMethod::IndexOnlyScan => "INDEXONLYSCAN",
        }
    }
}

/// 连接方法提示词
pub fn join_keyword(join: JoinKind) -> &'static str {
    match join {
        JoinKind::NestLoop => "NESTLOOP",
        JoinKind::MergeJoin => "MERGEJOIN",
        JoinKind::HashJoin => "HASHJOIN",
    }
}

/// 一次生成的全部指令
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectiveSet {
    pub scan_directives: String,
    pub join_directives: String,
    pub leading_directive: String,
    pub rows_directives: String,
    /// 所有连接节点 |实际 - 估算| 之和
    pub total_absolute_row_diff: f64,
    pub join_count: usize,
}

impl DirectiveSet {
    /// 扫描、连接与连接顺序指令拼成的完整提示
    pub fn hints(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.scan_directives, self.join_directives, self.leading_directive
        )
    }
}

/// 一次生成过程的累加状态
///
/// 每次生成都从零开始，不在多次调用间共享。
#[derive(Debug)]
pub struct GenerationContext<'a> {
    names: &'a RelationNames,
    rtable: &'a RangeTable,
    scan_directives: String,
    join_directives: String,
    rows_directives: String,
    scan_count: usize,
    join_count: usize,
    rows_count: usize,
    total_absolute_row_diff: f64,
}

impl<'a> GenerationContext<'a> {
    pub fn new(names: &'a RelationNames, rtable: &'a RangeTable) -> Self {
        Self {
            names,
            rtable,
            scan_directives: String::new(),
            join_directives: String::new(),
            rows_directives: String::new(),
            scan_count: 0,
            join_count: 0,
            rows_count: 0,
            total_absolute_row_diff: 0.0,
        }
    }

    /// 先处理节点自身，再按外、内顺序递归
    pub fn visit(&mut self, node: &PlanNode, depth: usize) -> Result<(), PlanError> {
        log::trace!("{:indent$}{}", "", node.kind.node_type_name(), indent = depth * 2);

        match &node.kind {
            NodeKind::Scan { scan, scanrelid } => self.emit_scan(*scan, *scanrelid)?,
            NodeKind::ForeignScan { relids } | NodeKind::CustomScan { relids } => {
                // 只有单关系扫描才有目标关系，但提示词表中没有对应方法
                if let [single] = relids.as_slice() {
                    self.rtable.get(*single)?;
                }
            }
            NodeKind::Join { join } => self.emit_join(node, *join)?,
            NodeKind::BitmapIndexScan { .. }
            | NodeKind::ModifyTable { .. }
            | NodeKind::Composite { .. }
            | NodeKind::Gather { .. }
            | NodeKind::Other { .. } => {}
        }

        let mut failure = None;
        walk(node, |child| match self.visit(child, depth + 1) {
            Ok(()) => false,
            Err(e) => {
                failure = Some(e);
                true
            }
        });
        failure.map_or(Ok(()), Err)
    }

    fn emit_scan(&mut self, scan: ScanKind, rti: RangeIndex) -> Result<(), PlanError> {
        let names = self.names;
        let name = names.name(rti)?;
        let Some(method) = ScanMethod::for_scan(scan) else {
            return Ok(());
        };
        if self.scan_count > 0 && self.scan_count % SCAN_DIRECTIVES_PER_LINE == 0 {
            self.scan_directives.push('\n');
        }
        self.scan_directives
            .push_str(&format!("{}({}) ", method.keyword(), quote_identifier(name)));
        self.scan_count += 1;
        Ok(())
    }

    fn emit_join(&mut self, node: &PlanNode, join: JoinKind) -> Result<(), PlanError> {
        let relids = collect_relations(node, EdgeFilter::SkipAuxiliary);
        let relnames = self.names.join_names(&relids)?;

        if self.join_count > 0 {
            self.join_directives.push('\n');
        }
        self.join_directives
            .push_str(&format!("{}({}) ", join_keyword(join), relnames));
        self.join_count += 1;

        let estimated = node.estimated_rows;
        let actual = node.actual_rows().unwrap_or(estimated);
        let diff = actual - estimated;

        if estimated != actual {
            if self.rows_count > 0 {
                self.rows_directives.push('\n');
            }
            self.rows_directives
                .push_str(&format!("ROWS({} #{:.0}) ", relnames, actual));
            self.rows_count += 1;
        }

        log::debug!(
            "join ({}): estimated={} actual={} diff={}",
            relnames,
            estimated,
            actual,
            diff
        );
        self.total_absolute_row_diff += diff.abs();
        Ok(())
    }

    pub fn finish(self, leading_directive: String) -> DirectiveSet {
        DirectiveSet {
            scan_directives: self.scan_directives,
            join_directives: self.join_directives,
            leading_directive,
            rows_directives: self.rows_directives,
            total_absolute_row_diff: self.total_absolute_row_diff,
            join_count: self.join_count,
        }
    }
}

/// 跳过不可见的并行 Gather 节点
pub fn effective_root(root: &PlanNode) -> &PlanNode {
    match (&root.kind, root.outer()) {
        (NodeKind::Gather { invisible: true }, Some(child)) => child,
        _ => root,
    }
}

/// 指令生成入口
#[derive(Debug, Clone, Default)]
pub struct DirectiveGenerator;

impl DirectiveGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, root: &PlanNode, rtable: &RangeTable) -> Result<DirectiveSet, PlanError> {
        let used = collect_relations(root, EdgeFilter::All);
        let names = RelationNames::assign(rtable, &used)?;
        let root = effective_root(root);

        let mut ctx = GenerationContext::new(&names, rtable);
        ctx.visit(root, 0)?;

        let leading = build_leading(root, &names)?;
        Ok(ctx.finish(leading))
    }
}
