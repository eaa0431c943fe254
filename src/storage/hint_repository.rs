//! 提示仓库接口
//!
//! 反馈编排器只通过这个 trait 访问持久化层。生效行数提示以
//! (规范化查询文本, 客户端标识) 为键，替换操作必须是一次原子的
//! 读-合并-写；其余三类记录只追加，不去重。

use super::records::{NormalizedQueryRecord, PlanHistoryRecord, RawQueryRecord};
use crate::core::StorageError;

pub trait HintRepository: Send + Sync + std::fmt::Debug {
    /// 检查仓库表是否存在；缺失时返回 `StorageError::SchemaMissing`
    fn ensure_schema(&self) -> Result<(), StorageError>;

    /// 读取生效的行数提示，不存在时返回空串
    fn load_active_row_hints(&self, normalized: &str, client: &str) -> Result<String, StorageError>;

    /// 把新的行数提示合并进已有提示并写回，返回写入后的文本
    fn replace_active_row_hints(
        &self,
        normalized: &str,
        client: &str,
        rows_directives: &str,
    ) -> Result<String, StorageError>;

    /// 追加一条执行历史，返回分配的序号
    fn append_history(&self, record: PlanHistoryRecord) -> Result<u64, StorageError>;

    fn record_normalized_query(&self, hash: &str, normalized: &str) -> Result<u64, StorageError>;

    fn record_raw_query(&self, hash: &str, raw: &str) -> Result<u64, StorageError>;

    /// 按序号顺序列出历史；`hash` 为 None 时列出全部
    fn history_for(&self, hash: Option<&str>) -> Result<Vec<PlanHistoryRecord>, StorageError>;

    fn normalized_queries_for(&self, hash: &str) -> Result<Vec<NormalizedQueryRecord>, StorageError>;

    fn raw_queries_for(&self, hash: &str) -> Result<Vec<RawQueryRecord>, StorageError>;
}

/// 行数提示的合并规则：旧提示在前，新提示在后，不去重
pub fn merge_row_hints(prior: &str, fresh: &str) -> String {
    match (prior.is_empty(), fresh.is_empty()) {
        (true, _) => fresh.to_string(),
        (false, true) => prior.to_string(),
        (false, false) => format!("{} {}", prior, fresh),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_row_hints() {
        assert_eq!(merge_row_hints("", ""), "");
        assert_eq!(merge_row_hints("", "ROWS(a b #1) "), "ROWS(a b #1) ");
        assert_eq!(merge_row_hints("ROWS(a b #1) ", ""), "ROWS(a b #1) ");
        assert_eq!(
            merge_row_hints("ROWS(a b #1) ", "ROWS(a b #1) "),
            "ROWS(a b #1)  ROWS(a b #1) "
        );
    }
}
