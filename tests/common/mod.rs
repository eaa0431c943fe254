//! 集成测试共享工具模块
//!
//! 提供测试基础设施和辅助函数，供所有集成测试使用

#![allow(dead_code)]

pub mod data_fixtures;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use plan_advisor::core::StorageError;
use plan_advisor::storage::{
    HintRepository, MemoryHintRepository, NormalizedQueryRecord, PlanHistoryRecord,
    RawQueryRecord, RedbHintRepository,
};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// 测试仓库包装器
///
/// 使用项目目录下的临时文件夹确保每个测试有独立的仓库文件，
/// 测试结束后自动清理临时目录
pub struct TestRepository {
    repository: Option<Arc<RedbHintRepository>>,
    db_path: PathBuf,
    temp_path: PathBuf,
}

impl TestRepository {
    pub fn new() -> anyhow::Result<Self> {
        let temp_path = unique_temp_dir()?;
        let db_path = temp_path.join("plan_repo.redb");
        let repository = Some(Arc::new(RedbHintRepository::open(&db_path)?));
        Ok(Self {
            repository,
            db_path,
            temp_path,
        })
    }

    /// 数据库文件存在但没有建表
    pub fn without_schema() -> anyhow::Result<Self> {
        let temp_path = unique_temp_dir()?;
        let db_path = temp_path.join("plan_repo.redb");
        let repository = Some(Arc::new(RedbHintRepository::open_without_schema(&db_path)?));
        Ok(Self {
            repository,
            db_path,
            temp_path,
        })
    }

    /// 仓库实例；`reopen` 期间之外总是存在
    pub fn repository(&self) -> Arc<RedbHintRepository> {
        self.repository.clone().expect("仓库已关闭")
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// 关闭当前数据库并重新打开同一个文件
    ///
    /// 调用前测试必须释放所有 `repository()` 返回的引用
    pub fn reopen(&mut self) -> anyhow::Result<()> {
        // redb 不允许同一文件被打开两次，先释放旧句柄
        self.repository = None;
        self.repository = Some(Arc::new(RedbHintRepository::open(&self.db_path)?));
        Ok(())
    }
}

impl Drop for TestRepository {
    fn drop(&mut self) {
        // 尝试清理临时目录，忽略错误
        let _ = std::fs::remove_dir_all(&self.temp_path);
    }
}

fn next_id() -> usize {
    NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

fn unique_temp_dir() -> anyhow::Result<PathBuf> {
    let temp_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("test-temp");
    std::fs::create_dir_all(&temp_dir)?;

    let unique_id = format!(
        "test_{}_{}_{}",
        std::process::id(),
        next_id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_nanos()
    );
    let temp_path = temp_dir.join(unique_id);
    std::fs::create_dir_all(&temp_path)?;
    Ok(temp_path)
}

/// 指定步骤总是失败的仓库，其余操作委托给内存仓库
#[derive(Debug, Default)]
pub struct FailingRepository {
    pub inner: MemoryHintRepository,
    pub fail_history: bool,
    pub fail_replace: bool,
}

impl FailingRepository {
    fn injected() -> StorageError {
        StorageError::DbError("injected failure".to_string())
    }
}

impl HintRepository for FailingRepository {
    fn ensure_schema(&self) -> Result<(), StorageError> {
        self.inner.ensure_schema()
    }

    fn load_active_row_hints(&self, normalized: &str, client: &str) -> Result<String, StorageError> {
        self.inner.load_active_row_hints(normalized, client)
    }

    fn replace_active_row_hints(
        &self,
        normalized: &str,
        client: &str,
        rows_directives: &str,
    ) -> Result<String, StorageError> {
        if self.fail_replace {
            return Err(Self::injected());
        }
        self.inner
            .replace_active_row_hints(normalized, client, rows_directives)
    }

    fn append_history(&self, record: PlanHistoryRecord) -> Result<u64, StorageError> {
        if self.fail_history {
            return Err(Self::injected());
        }
        self.inner.append_history(record)
    }

    fn record_normalized_query(&self, hash: &str, normalized: &str) -> Result<u64, StorageError> {
        self.inner.record_normalized_query(hash, normalized)
    }

    fn record_raw_query(&self, hash: &str, raw: &str) -> Result<u64, StorageError> {
        self.inner.record_raw_query(hash, raw)
    }

    fn history_for(&self, hash: Option<&str>) -> Result<Vec<PlanHistoryRecord>, StorageError> {
        self.inner.history_for(hash)
    }

    fn normalized_queries_for(&self, hash: &str) -> Result<Vec<NormalizedQueryRecord>, StorageError> {
        self.inner.normalized_queries_for(hash)
    }

    fn raw_queries_for(&self, hash: &str) -> Result<Vec<RawQueryRecord>, StorageError> {
        self.inner.raw_queries_for(hash)
    }
}
