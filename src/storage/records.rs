//! 仓库记录类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::advisor::{DirectiveSet, PlanId};
use crate::query::fingerprint::QueryFingerprint;

/// 执行历史，每次反馈追加一条，写入后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanHistoryRecord {
    /// 仓库分配的序号，追加前为 0
    #[serde(default)]
    pub id: u64,
    /// 规范化查询文本的指纹
    pub norm_query_hash: String,
    pub query_id: u32,
    /// 计划形状哈希
    pub plan_id: PlanId,
    pub execution_time_ms: f64,
    pub rows_hint: String,
    pub scan_hint: String,
    pub join_hint: String,
    pub lead_hint: String,
    pub diff_of_joins: f64,
    pub join_count: usize,
    pub application_name: String,
    pub timestamp: DateTime<Utc>,
}

impl PlanHistoryRecord {
    pub fn new(
        fingerprint: &QueryFingerprint,
        plan_id: PlanId,
        execution_time_ms: f64,
        directives: &DirectiveSet,
        application_name: &str,
    ) -> Self {
        Self {
            id: 0,
            norm_query_hash: fingerprint.hash_hex(),
            query_id: fingerprint.query_id,
            plan_id,
            execution_time_ms,
            rows_hint: directives.rows_directives.clone(),
            scan_hint: directives.scan_directives.clone(),
            join_hint: directives.join_directives.clone(),
            lead_hint: directives.leading_directive.clone(),
            diff_of_joins: directives.total_absolute_row_diff,
            join_count: directives.join_count,
            application_name: application_name.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// 规范化查询文本日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedQueryRecord {
    pub id: u64,
    pub norm_query_hash: String,
    pub norm_query_string: String,
    pub timestamp: DateTime<Utc>,
}

/// 原始查询文本日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQueryRecord {
    pub id: u64,
    pub norm_query_hash: String,
    pub raw_query_string: String,
    pub timestamp: DateTime<Utc>,
}

/// 某个 (规范化查询, 客户端) 当前生效的行数提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveHintRecord {
    pub norm_query_string: String,
    pub application_name: String,
    pub hints: String,
    pub updated_at: DateTime<Utc>,
}
