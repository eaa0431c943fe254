//! 已执行计划树的节点模型
//!
//! 计划树由外部执行引擎产生，本模块只读取它。节点种类是一个封闭集合，
//! 用带标签的枚举表达，生成器对它做穷尽匹配。

use serde::{Deserialize, Serialize};

/// 范围表索引（从 1 开始）
pub type RangeIndex = usize;

/// 单关系扫描的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Seq,
    Sample,
    Index,
    IndexOnly,
    BitmapHeap,
    Tid,
    Subquery,
    Function,
    TableFunc,
    Values,
    Cte,
    NamedTuplestore,
    WorkTable,
}

impl ScanKind {
    pub fn node_type_name(self) -> &'static str {
        match self {
            ScanKind::Seq => "Seq Scan",
            ScanKind::Sample => "Sample Scan",
            ScanKind::Index => "Index Scan",
            ScanKind::IndexOnly => "Index Only Scan",
            ScanKind::BitmapHeap => "Bitmap Heap Scan",
            ScanKind::Tid => "Tid Scan",
            ScanKind::Subquery => "Subquery Scan",
            ScanKind::Function => "Function Scan",
            ScanKind::TableFunc => "Table Function Scan",
            ScanKind::Values => "Values Scan",
            ScanKind::Cte => "CTE Scan",
            ScanKind::NamedTuplestore => "Named Tuplestore Scan",
            ScanKind::WorkTable => "WorkTable Scan",
        }
    }
}

/// 连接算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    NestLoop,
    MergeJoin,
    HashJoin,
}

impl JoinKind {
    pub fn node_type_name(self) -> &'static str {
        match self {
            JoinKind::NestLoop => "Nested Loop",
            JoinKind::MergeJoin => "Merge Join",
            JoinKind::HashJoin => "Hash Join",
        }
    }
}

/// 多子节点的组合算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeKind {
    Append,
    MergeAppend,
    BitmapAnd,
    BitmapOr,
}

impl CompositeKind {
    pub fn node_type_name(self) -> &'static str {
        match self {
            CompositeKind::Append => "Append",
            CompositeKind::MergeAppend => "Merge Append",
            CompositeKind::BitmapAnd => "BitmapAnd",
            CompositeKind::BitmapOr => "BitmapOr",
        }
    }
}

/// 算子种类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
    /// 单关系扫描
    Scan { scan: ScanKind, scanrelid: RangeIndex },
    /// 位图索引扫描（位图堆扫描的输入，不指向堆关系）
    BitmapIndexScan { index_name: String },
    /// 外部表扫描，可能下推了多个关系
    ForeignScan { relids: Vec<RangeIndex> },
    /// 自定义扫描，可能覆盖多个关系
    CustomScan { relids: Vec<RangeIndex> },
    Join { join: JoinKind },
    ModifyTable {
        nominal_relation: RangeIndex,
        #[serde(default)]
        exclusion_relation: Option<RangeIndex>,
    },
    Composite { composite: CompositeKind },
    /// 并行收集节点；invisible 的 Gather 不出现在 EXPLAIN 输出中
    Gather {
        #[serde(default)]
        invisible: bool,
    },
    /// 其它单输入算子（Hash、Sort、Material、Aggregate、Limit ...）
    Other { name: String },
}

impl NodeKind {
    /// EXPLAIN 风格的节点类型名
    pub fn node_type_name(&self) -> &str {
        match self {
            NodeKind::Scan { scan, .. } => scan.node_type_name(),
            NodeKind::BitmapIndexScan { .. } => "Bitmap Index Scan",
            NodeKind::ForeignScan { .. } => "Foreign Scan",
            NodeKind::CustomScan { .. } => "Custom Scan",
            NodeKind::Join { join } => join.node_type_name(),
            NodeKind::ModifyTable { .. } => "ModifyTable",
            NodeKind::Composite { composite } => composite.node_type_name(),
            NodeKind::Gather { .. } => "Gather",
            NodeKind::Other { name } => name,
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, NodeKind::Join { .. })
    }
}

/// 行级统计信息（EXPLAIN ANALYZE 才有）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instrumentation {
    /// 所有循环产出的总行数
    pub ntuples: f64,
    /// 节点执行的循环次数
    pub nloops: f64,
}

/// 已执行计划树中的一个算子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    /// 优化器估算的行数
    pub estimated_rows: f64,
    #[serde(default)]
    pub instrument: Option<Instrumentation>,
    #[serde(default)]
    pub outer: Option<Box<PlanNode>>,
    #[serde(default)]
    pub inner: Option<Box<PlanNode>>,
    /// 组合算子的成员，或子查询扫描包装的子计划
    #[serde(default)]
    pub members: Vec<PlanNode>,
    #[serde(default)]
    pub init_plans: Vec<PlanNode>,
    #[serde(default)]
    pub sub_plans: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(kind: NodeKind, estimated_rows: f64) -> Self {
        Self {
            kind,
            estimated_rows,
            instrument: None,
            outer: None,
            inner: None,
            members: Vec::new(),
            init_plans: Vec::new(),
            sub_plans: Vec::new(),
        }
    }

    pub fn scan(scan: ScanKind, scanrelid: RangeIndex, estimated_rows: f64) -> Self {
        Self::new(NodeKind::Scan { scan, scanrelid }, estimated_rows)
    }

    pub fn join(join: JoinKind, outer: PlanNode, inner: PlanNode, estimated_rows: f64) -> Self {
        let mut node = Self::new(NodeKind::Join { join }, estimated_rows);
        node.outer = Some(Box::new(outer));
        node.inner = Some(Box::new(inner));
        node
    }

    /// 单输入算子，如 Hash、Sort
    pub fn unary(name: &str, input: PlanNode, estimated_rows: f64) -> Self {
        let mut node = Self::new(NodeKind::Other { name: name.to_string() }, estimated_rows);
        node.outer = Some(Box::new(input));
        node
    }

    pub fn composite(composite: CompositeKind, members: Vec<PlanNode>, estimated_rows: f64) -> Self {
        let mut node = Self::new(NodeKind::Composite { composite }, estimated_rows);
        node.members = members;
        node
    }

    /// 以单次循环记录实际行数
    pub fn with_actual(mut self, rows: f64) -> Self {
        self.instrument = Some(Instrumentation {
            ntuples: rows,
            nloops: 1.0,
        });
        self
    }

    pub fn with_instrument(mut self, ntuples: f64, nloops: f64) -> Self {
        self.instrument = Some(Instrumentation { ntuples, nloops });
        self
    }

    pub fn with_sub_plan(mut self, plan: PlanNode) -> Self {
        self.sub_plans.push(plan);
        self
    }

    pub fn with_init_plan(mut self, plan: PlanNode) -> Self {
        self.init_plans.push(plan);
        self
    }

    /// 每次循环的实际行数；未插桩或从未执行时返回 None
    pub fn actual_rows(&self) -> Option<f64> {
        match self.instrument {
            Some(instr) if instr.nloops > 0.0 => Some(instr.ntuples / instr.nloops),
            _ => None,
        }
    }

    pub fn outer(&self) -> Option<&PlanNode> {
        self.outer.as_deref()
    }

    pub fn inner(&self) -> Option<&PlanNode> {
        self.inner.as_deref()
    }
}
