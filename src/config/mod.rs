/// Configuration management
pub mod assistant;

pub use assistant::*;
