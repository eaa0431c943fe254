//! 服务层模块
//!
//! 反馈编排器及其报告

pub mod feedback;
pub mod report;

pub use feedback::{CompletedExecution, FeedbackOrchestrator, FEEDBACK_LOG_TARGET};
pub use report::{FeedbackReport, PersistStep, PersistenceFailure};
