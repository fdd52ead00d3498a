//! # Game Sales NLQ
//!
//! Natural-language questions over a video-game sales dataset, answered by a
//! deterministic pipeline that compiles each question to one safe read-only SQL
//! statement.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use game_sales_nlq::{AnswerEngine, AssistantConfig};
//!
//! let config = AssistantConfig::from_env();
//! let engine = AnswerEngine::from_config(config).unwrap();
//!
//! let response = engine.answer("top 5 vendas globais em 2010");
//! println!("{}", response.natural_language_answer);
//! ```
//!
//! ## Pipeline
//!
//! - **Intent Classifier**: rule-based question to `QueryPlan`
//! - **Entity Resolver**: fuzzy title matching over a once-built index
//! - **Plan Compiler / Safety Validator**: plan to a single validated SELECT
//! - **Query Executor**: restricted SQL interpreter over the columnar snapshot
//! - **Aggregation Engine**: count-weighted franchise scores
//! - **Answer Synthesizer**: PT/EN templates, optional guarded paraphrase

// Internal modules
pub mod aggregation;
pub mod answer;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod query;
pub mod resolver;
pub mod result_format;
pub mod storage;

// Public API - Main types users need
pub use config::AssistantConfig;
pub use engine::{AnswerEngine, AskResponse};
pub use error::{NlqError, NlqResult};
pub use ingestion::load_csv;
pub use query::{Intent, Language, Metric, QueryPlan};
pub use storage::{GameRecord, GamesTable};
