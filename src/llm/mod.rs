//! LLM Module - optional oracle for plan assist and paraphrasing

pub mod audit_log;
pub mod ollama_client;
pub mod oracle;
pub mod prompts;

pub use audit_log::{AuditLog, AuditLogEntry, AuditOutcome, AuditRecord};
pub use ollama_client::OllamaOracle;
pub use oracle::{Oracle, OracleGateway, OracleOutput, OracleRequest, OracleTask};
