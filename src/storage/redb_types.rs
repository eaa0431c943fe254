//! Redb 仓库共享类型定义
//!
//! 提供 ByteKey、表定义以及各表的键编码

use std::cmp::Ordering as CmpOrdering;
use redb::{TableDefinition, TypeName};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ByteKey(pub Vec<u8>);

impl redb::Key for ByteKey {
    fn compare(data1: &[u8], data2: &[u8]) -> CmpOrdering {
        data1.cmp(data2)
    }
}

impl redb::Value for ByteKey {
    type SelfType<'a> = ByteKey where Self: 'a;
    type AsBytes<'a> = Vec<u8> where Self: 'a;

    fn fixed_width() -> Option<usize> {
        None
    }

    fn from_bytes<'a>(data: &'a [u8]) -> ByteKey where Self: 'a {
        ByteKey(data.to_vec())
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Vec<u8> where Self: 'b {
        value.0.clone()
    }

    fn type_name() -> TypeName {
        TypeName::new("plan_advisor::ByteKey")
    }
}

// plan_repo 下的追加日志
pub const PLAN_HISTORY_TABLE: TableDefinition<ByteKey, ByteKey> = TableDefinition::new("plan_history");
pub const NORM_QUERIES_TABLE: TableDefinition<ByteKey, ByteKey> = TableDefinition::new("norm_queries");
pub const RAW_QUERIES_TABLE: TableDefinition<ByteKey, ByteKey> = TableDefinition::new("raw_queries");

// 规划器读取的生效提示
pub const HINTS_TABLE: TableDefinition<ByteKey, ByteKey> = TableDefinition::new("hints");

// 各日志表的序号生成器
pub const SEQUENCES_TABLE: TableDefinition<ByteKey, ByteKey> = TableDefinition::new("sequences");

pub const ALL_TABLES: [TableDefinition<ByteKey, ByteKey>; 5] = [
    PLAN_HISTORY_TABLE,
    NORM_QUERIES_TABLE,
    RAW_QUERIES_TABLE,
    HINTS_TABLE,
    SEQUENCES_TABLE,
];

/// 历史表键：序号（大端，保证按插入顺序迭代）
pub fn history_key(id: u64) -> ByteKey {
    ByteKey(id.to_be_bytes().to_vec())
}

/// 文本日志键：指纹 + '/' + 序号
pub fn query_log_key(hash: &str, id: u64) -> ByteKey {
    let mut key = Vec::with_capacity(hash.len() + 9);
    key.extend_from_slice(hash.as_bytes());
    key.push(b'/');
    key.extend_from_slice(&id.to_be_bytes());
    ByteKey(key)
}

/// 某个指纹下所有文本日志键的闭区间
pub fn query_log_range(hash: &str) -> (ByteKey, ByteKey) {
    (query_log_key(hash, 0), query_log_key(hash, u64::MAX))
}

/// 生效提示键：规范化文本长度前缀 + 文本 + 客户端标识
pub fn hint_key(normalized: &str, client: &str) -> ByteKey {
    let mut key = Vec::with_capacity(normalized.len() + client.len() + 8);
    key.extend_from_slice(&(normalized.len() as u64).to_be_bytes());
    key.extend_from_slice(normalized.as_bytes());
    key.extend_from_slice(client.as_bytes());
    ByteKey(key)
}
