pub mod advisor;
pub mod fingerprint;
pub mod plan;
pub mod statement;

pub use advisor::{DirectiveGenerator, DirectiveSet};
pub use fingerprint::{QueryFingerprint, QueryFingerprinter};
pub use plan::{PlanNode, RangeTable};
pub use statement::{QuerySource, Statement};
