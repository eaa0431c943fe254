//! 提示仓库
//!
//! - `hint_repository`：仓库接口与提示合并规则
//! - `records`：仓库记录
//! - `redb_repository`：redb 持久化实现
//! - `memory_repository`：内存实现

pub mod hint_repository;
pub mod memory_repository;
pub mod records;
pub mod redb_repository;
pub mod redb_types;
pub mod serializer;

pub use hint_repository::{merge_row_hints, HintRepository};
pub use memory_repository::MemoryHintRepository;
pub use records::{ActiveHintRecord, NormalizedQueryRecord, PlanHistoryRecord, RawQueryRecord};
pub use redb_repository::RedbHintRepository;

pub use crate::core::StorageError;
