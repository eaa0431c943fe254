//! 反馈报告

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::StorageError;
use crate::query::advisor::{DirectiveSet, PlanId};
use crate::query::fingerprint::QueryFingerprint;

/// 持久化步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistStep {
    LoadActiveHints,
    ReplaceActiveHints,
    AppendHistory,
    RecordNormalizedQuery,
    RecordRawQuery,
}

impl fmt::Display for PersistStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistStep::LoadActiveHints => "load hints",
            PersistStep::ReplaceActiveHints => "replace hints",
            PersistStep::AppendHistory => "plan_history",
            PersistStep::RecordNormalizedQuery => "norm_queries",
            PersistStep::RecordRawQuery => "raw_queries",
        };
        write!(f, "{}", name)
    }
}

/// 单个失败的持久化步骤
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceFailure {
    pub step: PersistStep,
    pub error: StorageError,
}

/// 一次反馈处理的结果
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReport {
    pub fingerprint: QueryFingerprint,
    pub plan_id: PlanId,
    pub execution_time_ms: f64,
    pub client: String,
    pub directives: DirectiveSet,
    /// 合并前的生效行数提示
    pub prior_row_hints: String,
    /// 写回后的生效行数提示；替换失败时为 None
    pub stored_row_hints: Option<String>,
    pub history_id: Option<u64>,
    pub persistence_failures: Vec<PersistenceFailure>,
}

impl FeedbackReport {
    pub fn is_fully_persisted(&self) -> bool {
        self.persistence_failures.is_empty()
    }

    /// 分段文本，verbose 模式下逐行输出
    pub fn render(&self) -> String {
        let mut sections: Vec<(&str, String)> = vec![
            ("Query text", self.fingerprint.normalized.clone()),
            ("Query id", self.fingerprint.query_id.to_string()),
            ("Plan id", self.plan_id.to_string()),
            ("Query hash", self.fingerprint.hash_hex()),
            ("Execution time (ms)", format!("{:.3}", self.execution_time_ms)),
            ("Hints", self.directives.hints()),
            ("Rows hint (feedback info)", self.directives.rows_directives.clone()),
            ("Join cnt", self.directives.join_count.to_string()),
            (
                "Total diff rows of joins",
                format!("{:.0}", self.directives.total_absolute_row_diff),
            ),
            ("Application name", self.client.clone()),
        ];
        if !self.persistence_failures.is_empty() {
            let failures = self
                .persistence_failures
                .iter()
                .map(|f| format!("{}: {}", f.step, f.error))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(("Persistence failures", failures));
        }

        let mut out = String::new();
        for (title, body) in sections {
            out.push_str(&format!("---- {} {}\n", title, "-".repeat(30usize.saturating_sub(title.len()))));
            for line in body.lines() {
                out.push_str("\t\t");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}
