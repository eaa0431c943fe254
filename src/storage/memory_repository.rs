//! 内存提示仓库
//!
//! 生效提示存放在 DashMap 中，替换通过 entry API 在分片锁内完成读-合并-写；
//! 三类追加日志共用一把 parking_lot 互斥锁。进程退出后数据丢失，
//! 适合嵌入式调用方和测试。

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::hint_repository::{merge_row_hints, HintRepository};
use super::records::{ActiveHintRecord, NormalizedQueryRecord, PlanHistoryRecord, RawQueryRecord};
use crate::core::StorageError;

#[derive(Debug, Default)]
struct Logs {
    history: Vec<PlanHistoryRecord>,
    norm_queries: Vec<NormalizedQueryRecord>,
    raw_queries: Vec<RawQueryRecord>,
}

#[derive(Debug)]
pub struct MemoryHintRepository {
    hints: DashMap<(String, String), ActiveHintRecord>,
    logs: Mutex<Logs>,
    schema_ready: AtomicBool,
}

impl Default for MemoryHintRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHintRepository {
    pub fn new() -> Self {
        Self {
            hints: DashMap::new(),
            logs: Mutex::new(Logs::default()),
            schema_ready: AtomicBool::new(true),
        }
    }

    /// 模拟仓库表尚未创建
    pub fn without_schema() -> Self {
        let repo = Self::new();
        repo.schema_ready.store(false, Ordering::SeqCst);
        repo
    }

    pub fn active_hint_count(&self) -> usize {
        self.hints.len()
    }
}

impl HintRepository for MemoryHintRepository {
    fn ensure_schema(&self) -> Result<(), StorageError> {
        if self.schema_ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::SchemaMissing("hints".to_string()))
        }
    }

    fn load_active_row_hints(&self, normalized: &str, client: &str) -> Result<String, StorageError> {
        Ok(self
            .hints
            .get(&(normalized.to_string(), client.to_string()))
            .map(|entry| entry.hints.clone())
            .unwrap_or_default())
    }

    fn replace_active_row_hints(
        &self,
        normalized: &str,
        client: &str,
        rows_directives: &str,
    ) -> Result<String, StorageError> {
        let mut entry = self
            .hints
            .entry((normalized.to_string(), client.to_string()))
            .or_insert_with(|| ActiveHintRecord {
                norm_query_string: normalized.to_string(),
                application_name: client.to_string(),
                hints: String::new(),
                updated_at: Utc::now(),
            });
        entry.hints = merge_row_hints(&entry.hints, rows_directives);
        entry.updated_at = Utc::now();
        Ok(entry.hints.clone())
    }

    fn append_history(&self, mut record: PlanHistoryRecord) -> Result<u64, StorageError> {
        let mut logs = self.logs.lock();
        let id = logs.history.len() as u64 + 1;
        record.id = id;
        logs.history.push(record);
        Ok(id)
    }

    fn record_normalized_query(&self, hash: &str, normalized: &str) -> Result<u64, StorageError> {
        let mut logs = self.logs.lock();
        let id = logs.norm_queries.len() as u64 + 1;
        logs.norm_queries.push(NormalizedQueryRecord {
            id,
            norm_query_hash: hash.to_string(),
            norm_query_string: normalized.to_string(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    fn record_raw_query(&self, hash: &str, raw: &str) -> Result<u64, StorageError> {
        let mut logs = self.logs.lock();
        let id = logs.raw_queries.len() as u64 + 1;
        logs.raw_queries.push(RawQueryRecord {
            id,
            norm_query_hash: hash.to_string(),
            raw_query_string: raw.to_string(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    fn history_for(&self, hash: Option<&str>) -> Result<Vec<PlanHistoryRecord>, StorageError> {
        let logs = self.logs.lock();
        Ok(logs
            .history
            .iter()
            .filter(|r| hash.map_or(true, |h| r.norm_query_hash == h))
            .cloned()
            .collect())
    }

    fn normalized_queries_for(&self, hash: &str) -> Result<Vec<NormalizedQueryRecord>, StorageError> {
        let logs = self.logs.lock();
        Ok(logs
            .norm_queries
            .iter()
            .filter(|r| r.norm_query_hash == hash)
            .cloned()
            .collect())
    }

    fn raw_queries_for(&self, hash: &str) -> Result<Vec<RawQueryRecord>, StorageError> {
        let logs = self.logs.lock();
        Ok(logs
            .raw_queries
            .iter()
            .filter(|r| r.norm_query_hash == hash)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_replace_loses_nothing() {
        let repo = Arc::new(MemoryHintRepository::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || {
                    repo.replace_active_row_hints("q", "app", &format!("ROWS(a b #{}) ", i))
                        .expect("replace");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("线程失败");
        }

        let stored = repo.load_active_row_hints("q", "app").expect("load");
        for i in 0..8 {
            assert!(stored.contains(&format!("#{})", i)));
        }
        assert_eq!(repo.active_hint_count(), 1);
    }

    #[test]
    fn test_without_schema() {
        let repo = MemoryHintRepository::without_schema();
        assert_eq!(
            repo.ensure_schema(),
            Err(StorageError::SchemaMissing("hints".to_string()))
        );
    }
}
