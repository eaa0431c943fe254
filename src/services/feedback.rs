//! 反馈编排器
//!
//! 每次 ANALYZE 风格的执行完成后同步调用一次，按固定顺序执行：
//! 指纹 → 计划形状哈希 → 指令生成 → 读取旧行数提示 → 合并替换生效提示
//! → 追加历史 → 记录规范化文本与原始文本。
//!
//! 跳过条件（反馈关闭、非 ANALYZE、无指纹）返回 `Ok(None)`；单个持久化步骤
//! 失败只记录日志并继续后续步骤；仓库表缺失或计划引用无效时中止本次处理。

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::report::{FeedbackReport, PersistStep, PersistenceFailure};
use crate::config::FeedbackConfig;
use crate::core::{AdvisorResult, StorageError};
use crate::query::advisor::{effective_root, hash_plan_shape, DirectiveGenerator};
use crate::query::fingerprint::QueryFingerprinter;
use crate::query::plan::{PlanNode, RangeTable};
use crate::query::statement::{QuerySource, Statement};
use crate::storage::{HintRepository, PlanHistoryRecord};

/// verbose 输出使用的日志 target
pub const FEEDBACK_LOG_TARGET: &str = "plan_advisor::feedback";

/// 执行引擎交来的一次已完成执行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedExecution {
    pub source: QuerySource,
    pub statement: Statement,
    #[serde(default)]
    pub range_table: RangeTable,
    pub plan: PlanNode,
    /// 总执行时间（毫秒）；没有计时信息时为 None
    #[serde(default)]
    pub execution_time_ms: Option<f64>,
    /// 客户端标识（application_name）
    #[serde(default)]
    pub client: String,
}

pub struct FeedbackOrchestrator {
    repository: Arc<dyn HintRepository>,
    settings: RwLock<FeedbackConfig>,
    fingerprinter: QueryFingerprinter,
    generator: DirectiveGenerator,
}

impl std::fmt::Debug for FeedbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackOrchestrator")
            .field("repository", &self.repository)
            .field("settings", &*self.settings.read())
            .finish()
    }
}

impl FeedbackOrchestrator {
    pub fn new(repository: Arc<dyn HintRepository>, settings: FeedbackConfig) -> Self {
        Self {
            repository,
            settings: RwLock::new(settings),
            fingerprinter: QueryFingerprinter::new(),
            generator: DirectiveGenerator::new(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn HintRepository> {
        &self.repository
    }

    pub fn settings(&self) -> FeedbackConfig {
        self.settings.read().clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.settings.write().enabled = enabled;
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.settings.write().quiet = quiet;
    }

    /// 开启反馈并允许规划器读取生效提示
    pub fn enable_feedback(&self) {
        let mut settings = self.settings.write();
        settings.enabled = true;
        settings.apply_hints = true;
        log::info!("feedback enabled");
    }

    /// 规划器停止读取生效提示，观测与记录照常进行
    pub fn disable_feedback(&self) {
        self.settings.write().apply_hints = false;
        log::info!("feedback disabled");
    }

    /// 规划器读取路径：不允许应用提示或没有提示时返回 None
    pub fn active_hints_for(&self, normalized: &str, client: &str) -> AdvisorResult<Option<String>> {
        if !self.settings.read().apply_hints {
            return Ok(None);
        }
        let hints = self.repository.load_active_row_hints(normalized, client)?;
        Ok(if hints.is_empty() { None } else { Some(hints) })
    }

    /// 处理一次已完成的执行
    pub fn process(&self, execution: &CompletedExecution) -> AdvisorResult<Option<FeedbackReport>> {
        let settings = self.settings();
        if !settings.enabled {
            return Ok(None);
        }
        if !execution.statement.is_analyze_request() {
            log::debug!("非 ANALYZE 执行，跳过反馈");
            return Ok(None);
        }
        let Some(fingerprint) = self
            .fingerprinter
            .fingerprint_statement(&execution.statement, &execution.source)
        else {
            log::debug!("没有可用的查询指纹，跳过反馈");
            return Ok(None);
        };

        let plan_id = hash_plan_shape(effective_root(&execution.plan), &execution.range_table)?;
        let directives = self.generator.generate(&execution.plan, &execution.range_table)?;
        self.repository.ensure_schema()?;

        let client = execution.client.as_str();
        let hash = fingerprint.hash_hex();
        let execution_time_ms = execution.execution_time_ms.unwrap_or(0.0);
        let repo = &self.repository;
        let mut failures = Vec::new();

        let prior_row_hints = persist(&mut failures, PersistStep::LoadActiveHints, || {
            repo.load_active_row_hints(&fingerprint.normalized, client)
        })?
        .unwrap_or_default();

        let stored_row_hints = persist(&mut failures, PersistStep::ReplaceActiveHints, || {
            repo.replace_active_row_hints(
                &fingerprint.normalized,
                client,
                &directives.rows_directives,
            )
        })?;

        let history = PlanHistoryRecord::new(
            &fingerprint,
            plan_id,
            execution_time_ms,
            &directives,
            client,
        );
        let history_id = persist(&mut failures, PersistStep::AppendHistory, || {
            repo.append_history(history)
        })?;

        persist(&mut failures, PersistStep::RecordNormalizedQuery, || {
            repo.record_normalized_query(&hash, &fingerprint.normalized)
        })?;
        persist(&mut failures, PersistStep::RecordRawQuery, || {
            repo.record_raw_query(&hash, &execution.source.text)
        })?;

        let report = FeedbackReport {
            fingerprint,
            plan_id,
            execution_time_ms,
            client: client.to_string(),
            directives,
            prior_row_hints,
            stored_row_hints,
            history_id,
            persistence_failures: failures,
        };

        if !settings.quiet {
            for line in report.render().lines() {
                log::info!(target: FEEDBACK_LOG_TARGET, "{}", line);
            }
        }
        Ok(Some(report))
    }

    /// 供执行流水线调用：任何错误都只记录日志，不向外传播
    pub fn observe(&self, execution: &CompletedExecution) -> Option<FeedbackReport> {
        match self.process(execution) {
            Ok(report) => report,
            Err(e) => {
                log::error!("反馈处理中止: {}", e);
                None
            }
        }
    }
}

/// 执行一个持久化步骤；普通存储错误记入 `failures` 后返回 None，
/// 不变量违反向上传播
fn persist<T, F>(
    failures: &mut Vec<PersistenceFailure>,
    step: PersistStep,
    op: F,
) -> Result<Option<T>, StorageError>
where
    F: FnOnce() -> Result<T, StorageError>,
{
    match op() {
        Ok(value) => {
            log::debug!("{} 成功", step);
            Ok(Some(value))
        }
        Err(e) if e.is_invariant_violation() => Err(e),
        Err(e) => {
            log::error!("{} 失败: {}", step, e);
            failures.push(PersistenceFailure { step, error: e });
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fingerprint::scan_literals;
    use crate::query::plan::{JoinKind, RangeTableEntry, ScanKind};
    use crate::storage::MemoryHintRepository;

    fn execution(sql: &str, est: f64, actual: f64) -> CompletedExecution {
        let plan = PlanNode::join(
            JoinKind::HashJoin,
            PlanNode::scan(ScanKind::Seq, 1, 10.0).with_actual(10.0),
            PlanNode::unary(
                "Hash",
                PlanNode::scan(ScanKind::Seq, 2, 10.0).with_actual(10.0),
                10.0,
            ),
            est,
        )
        .with_actual(actual);
        CompletedExecution {
            source: QuerySource::new(sql, scan_literals(sql)),
            statement: Statement::explain_analyze(Statement::Select),
            range_table: RangeTable::new(vec![
                RangeTableEntry::relation("a"),
                RangeTableEntry::relation("b"),
            ]),
            plan,
            execution_time_ms: Some(3.25),
            client: "psql".to_string(),
        }
    }

    fn orchestrator() -> FeedbackOrchestrator {
        let settings = FeedbackConfig {
            quiet: true,
            ..FeedbackConfig::default()
        };
        FeedbackOrchestrator::new(Arc::new(MemoryHintRepository::new()), settings)
    }

    #[test]
    fn test_process_persists_everything() {
        let orch = orchestrator();
        let sql = "EXPLAIN ANALYZE SELECT * FROM a JOIN b ON a.id = b.id WHERE a.x = 5";
        let report = orch
            .process(&execution(sql, 100.0, 40.0))
            .expect("处理失败")
            .expect("应当产生报告");

        assert_eq!(report.directives.rows_directives, "ROWS(a b #40) ");
        assert_eq!(report.stored_row_hints.as_deref(), Some("ROWS(a b #40) "));
        assert_eq!(report.prior_row_hints, "");
        assert_eq!(report.history_id, Some(1));
        assert!(report.is_fully_persisted());

        let hash = report.fingerprint.hash_hex();
        let history = orch.repository().history_for(Some(&hash)).expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].diff_of_joins, 60.0);
        assert_eq!(history[0].execution_time_ms, 3.25);
        assert_eq!(
            orch.repository().raw_queries_for(&hash).expect("raw")[0].raw_query_string,
            sql
        );
    }

    #[test]
    fn test_disabled_has_no_side_effects() {
        let orch = orchestrator();
        orch.set_enabled(false);
        let result = orch
            .process(&execution("EXPLAIN ANALYZE SELECT 1", 100.0, 40.0))
            .expect("处理失败");
        assert!(result.is_none());
        assert!(orch.repository().history_for(None).expect("history").is_empty());
    }

    #[test]
    fn test_non_analyze_is_skipped() {
        let orch = orchestrator();
        let mut exec = execution("SELECT 1", 100.0, 40.0);
        exec.statement = Statement::Select;
        assert!(orch.process(&exec).expect("处理失败").is_none());
    }

    #[test]
    fn test_disable_feedback_hides_hints_but_keeps_observing() {
        let orch = orchestrator();
        let report = orch
            .observe(&execution("EXPLAIN ANALYZE SELECT 1", 100.0, 40.0))
            .expect("应当产生报告");
        let normalized = report.fingerprint.normalized.clone();

        assert_eq!(
            orch.active_hints_for(&normalized, "psql").expect("hints").as_deref(),
            Some("ROWS(a b #40) ")
        );
        orch.disable_feedback();
        assert_eq!(orch.active_hints_for(&normalized, "psql").expect("hints"), None);
        assert!(orch
            .observe(&execution("EXPLAIN ANALYZE SELECT 2", 100.0, 40.0))
            .is_some());
        orch.enable_feedback();
        assert!(orch.active_hints_for(&normalized, "psql").expect("hints").is_some());
    }

    #[test]
    fn test_missing_schema_aborts_without_panic() {
        let orch = FeedbackOrchestrator::new(
            Arc::new(MemoryHintRepository::without_schema()),
            FeedbackConfig::default(),
        );
        let exec = execution("EXPLAIN ANALYZE SELECT 1", 100.0, 40.0);
        assert!(orch.process(&exec).is_err());
        assert!(orch.observe(&exec).is_none());
    }
}
