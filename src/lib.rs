//! Plan Advisor - adaptive query-optimization feedback loop
//!
//! Observes completed EXPLAIN ANALYZE executions, compares estimated and
//! actual row counts at every join, and keeps per-query row-count hints
//! that a cooperating planner can apply the next time the same query
//! shape is seen.

pub mod config;
pub mod core;
pub mod query;
pub mod services;
pub mod storage;
pub mod utils;
