//! 计划反馈分析
//!
//! - `plan_shape`：计划形状哈希（计划 id）
//! - `directives`：扫描/连接/行数指令生成
//! - `leading`：连接顺序指令

pub mod directives;
pub mod leading;
pub mod plan_shape;

pub use directives::{
    effective_root, join_keyword, DirectiveGenerator, DirectiveSet, GenerationContext, ScanMethod,
};
pub use leading::build_leading;
pub use plan_shape::{hash_plan_shape, render_plan_shape, PlanId};
