pub mod error;
pub mod hash;

// 错误和结果类型
pub use error::{AdvisorError, AdvisorResult, PlanError, StorageError};

// 哈希工具
pub use hash::{fingerprint_digest, murmurhash2, Digest128};
