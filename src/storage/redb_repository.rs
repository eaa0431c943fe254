//! 基于 redb 的提示仓库
//!
//! 每个写操作是一个独立的 redb 写事务。生效提示的替换在同一个写事务内
//! 完成读取、合并与写回，redb 同一时刻只允许一个写事务，因此同一键上的
//! 并发替换不会互相覆盖。

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition, TableError, WriteTransaction};

use super::hint_repository::{merge_row_hints, HintRepository};
use super::records::{ActiveHintRecord, NormalizedQueryRecord, PlanHistoryRecord, RawQueryRecord};
use super::redb_types::{
    hint_key, history_key, query_log_key, query_log_range, ByteKey, ALL_TABLES, HINTS_TABLE,
    NORM_QUERIES_TABLE, PLAN_HISTORY_TABLE, RAW_QUERIES_TABLE, SEQUENCES_TABLE,
};
use super::serializer::{
    hint_from_bytes, hint_to_bytes, history_from_bytes, history_to_bytes, norm_query_from_bytes,
    norm_query_to_bytes, raw_query_from_bytes, raw_query_to_bytes,
};
use crate::core::StorageError;

pub struct RedbHintRepository {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbHintRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbHintRepository").finish()
    }
}

impl RedbHintRepository {
    /// 打开（或创建）仓库文件并建好所有表
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let repo = Self::open_without_schema(path)?;
        repo.create_schema()?;
        Ok(repo)
    }

    /// 只打开数据库文件，不建表
    pub fn open_without_schema<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::DbError(e.to_string()))?;
            }
        }
        let db = Database::create(path).map_err(|e| StorageError::DbError(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn create_schema(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        for table in ALL_TABLES {
            write_txn.open_table(table)
                .map_err(|e| StorageError::DbError(e.to_string()))?;
        }
        write_txn.commit()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        log::debug!("仓库表已就绪");
        Ok(())
    }

    /// 在写事务内取下一个序号
    fn next_sequence(write_txn: &WriteTransaction, name: &str) -> Result<u64, StorageError> {
        let mut table = write_txn.open_table(SEQUENCES_TABLE)
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        let key = ByteKey(name.as_bytes().to_vec());

        let current = match table.get(key.clone())
            .map_err(|e| StorageError::DbError(e.to_string()))? {
            Some(value) => {
                let bytes: [u8; 8] = value.value().0.try_into().map_err(|bytes: Vec<u8>| {
                    StorageError::SerializationError(format!(
                        "序号 {} 宽度错误: {} 字节",
                        name,
                        bytes.len()
                    ))
                })?;
                u64::from_be_bytes(bytes)
            }
            None => 0,
        };

        let next = current + 1;
        table.insert(key, ByteKey(next.to_be_bytes().to_vec()))
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        Ok(next)
    }

    /// 追加一条带序号的记录
    fn append<F>(
        &self,
        table_def: TableDefinition<ByteKey, ByteKey>,
        sequence: &str,
        encode: F,
    ) -> Result<u64, StorageError>
    where
        F: FnOnce(u64) -> Result<(ByteKey, Vec<u8>), StorageError>,
    {
        let write_txn = self.db.begin_write()
            .map_err(|e| StorageError::DbError(e.to_string()))?;

        let id = Self::next_sequence(&write_txn, sequence)?;
        {
            let (key, bytes) = encode(id)?;
            let mut table = write_txn.open_table(table_def)
                .map_err(|e| StorageError::DbError(e.to_string()))?;
            table.insert(key, ByteKey(bytes))
                .map_err(|e| StorageError::DbError(e.to_string()))?;
        }

        write_txn.commit()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        Ok(id)
    }

    fn query_log<T, F>(
        &self,
        table_def: TableDefinition<ByteKey, ByteKey>,
        hash: &str,
        decode: F,
    ) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&[u8]) -> Result<T, StorageError>,
    {
        let read_txn = self.db.begin_read()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        let table = read_txn.open_table(table_def).map_err(table_error)?;

        let (lo, hi) = query_log_range(hash);
        let mut records = Vec::new();
        for result in table.range(lo..=hi)
            .map_err(|e| StorageError::DbError(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::DbError(e.to_string()))?;
            records.push(decode(&value.value().0)?);
        }
        Ok(records)
    }
}

fn table_error(e: TableError) -> StorageError {
    match e {
        TableError::TableDoesNotExist(name) => StorageError::SchemaMissing(name),
        other => StorageError::DbError(other.to_string()),
    }
}

impl HintRepository for RedbHintRepository {
    fn ensure_schema(&self) -> Result<(), StorageError> {
        let read_txn = self.db.begin_read()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        for table in ALL_TABLES {
            read_txn.open_table(table).map_err(table_error)?;
        }
        Ok(())
    }

    fn load_active_row_hints(&self, normalized: &str, client: &str) -> Result<String, StorageError> {
        let read_txn = self.db.begin_read()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        let table = read_txn.open_table(HINTS_TABLE).map_err(table_error)?;

        match table.get(hint_key(normalized, client))
            .map_err(|e| StorageError::DbError(e.to_string()))? {
            Some(value) => Ok(hint_from_bytes(&value.value().0)?.hints),
            None => Ok(String::new()),
        }
    }

    fn replace_active_row_hints(
        &self,
        normalized: &str,
        client: &str,
        rows_directives: &str,
    ) -> Result<String, StorageError> {
        let key = hint_key(normalized, client);
        let write_txn = self.db.begin_write()
            .map_err(|e| StorageError::DbError(e.to_string()))?;

        let merged = {
            let mut table = write_txn.open_table(HINTS_TABLE)
                .map_err(|e| StorageError::DbError(e.to_string()))?;

            let prior = match table.get(key.clone())
                .map_err(|e| StorageError::DbError(e.to_string()))? {
                Some(value) => hint_from_bytes(&value.value().0)?.hints,
                None => String::new(),
            };

            let record = ActiveHintRecord {
                norm_query_string: normalized.to_string(),
                application_name: client.to_string(),
                hints: merge_row_hints(&prior, rows_directives),
                updated_at: Utc::now(),
            };
            table.insert(key, ByteKey(hint_to_bytes(&record)?))
                .map_err(|e| StorageError::DbError(e.to_string()))?;
            record.hints
        };

        write_txn.commit()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        Ok(merged)
    }

    fn append_history(&self, mut record: PlanHistoryRecord) -> Result<u64, StorageError> {
        self.append(PLAN_HISTORY_TABLE, "plan_history", |id| {
            record.id = id;
            Ok((history_key(id), history_to_bytes(&record)?))
        })
    }

    fn record_normalized_query(&self, hash: &str, normalized: &str) -> Result<u64, StorageError> {
        self.append(NORM_QUERIES_TABLE, "norm_queries", |id| {
            let record = NormalizedQueryRecord {
                id,
                norm_query_hash: hash.to_string(),
                norm_query_string: normalized.to_string(),
                timestamp: Utc::now(),
            };
            Ok((query_log_key(hash, id), norm_query_to_bytes(&record)?))
        })
    }

    fn record_raw_query(&self, hash: &str, raw: &str) -> Result<u64, StorageError> {
        self.append(RAW_QUERIES_TABLE, "raw_queries", |id| {
            let record = RawQueryRecord {
                id,
                norm_query_hash: hash.to_string(),
                raw_query_string: raw.to_string(),
                timestamp: Utc::now(),
            };
            Ok((query_log_key(hash, id), raw_query_to_bytes(&record)?))
        })
    }

    fn history_for(&self, hash: Option<&str>) -> Result<Vec<PlanHistoryRecord>, StorageError> {
        let read_txn = self.db.begin_read()
            .map_err(|e| StorageError::DbError(e.to_string()))?;
        let table = read_txn.open_table(PLAN_HISTORY_TABLE).map_err(table_error)?;

        let mut records = Vec::new();
        for result in table.iter()
            .map_err(|e| StorageError::DbError(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::DbError(e.to_string()))?;
            let record = history_from_bytes(&value.value().0)?;
            if hash.map_or(true, |h| record.norm_query_hash == h) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn normalized_queries_for(&self, hash: &str) -> Result<Vec<NormalizedQueryRecord>, StorageError> {
        self.query_log(NORM_QUERIES_TABLE, hash, norm_query_from_bytes)
    }

    fn raw_queries_for(&self, hash: &str) -> Result<Vec<RawQueryRecord>, StorageError> {
        self.query_log(RAW_QUERIES_TABLE, hash, raw_query_from_bytes)
    }
}
