pub mod classifier;
pub mod coerce;
pub mod compiler;
pub mod executor;
pub mod expression;
pub mod normalize;
pub mod plan;
pub mod plan_validator;
pub mod result;
pub mod shape;
pub mod vocabulary;

pub use classifier::IntentClassifier;
pub use compiler::{PlanCompiler, SqlStatement, StatementOrigin};
pub use executor::QueryExecutor;
pub use plan::*;
pub use plan_validator::{SafetyValidator, SafetyViolation};
pub use result::ResultSet;
