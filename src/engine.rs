//! Answer Engine - the single request pipeline
//!
//! classify -> (plan assist) -> resolve -> compile -> execute -> weight -> render
//! -> (paraphrase) -> audit. Every branch ends with a non-empty answer.

use crate::aggregation::{self, WeightedStats};
use crate::answer::{accept_paraphrase, render, render_apology, render_not_found, render_out_of_scope};
use crate::config::AssistantConfig;
use crate::error::{NlqError, NlqResult};
use crate::ingestion::load_csv;
use crate::llm::audit_log::{AuditLog, AuditOutcome, AuditRecord};
use crate::llm::ollama_client::OllamaOracle;
use crate::llm::oracle::{Oracle, OracleGateway, OracleOutput};
use crate::llm::prompts::{paraphrase_request, plan_request};
use crate::query::classifier::IntentClassifier;
use crate::query::compiler::{PlanCompiler, SqlStatement, StatementOrigin};
use crate::query::executor::QueryExecutor;
use crate::query::plan::{Intent, Language, PlanOrigin, QueryPlan};
use crate::query::result::ResultSet;
use crate::resolver::index::EntityResolver;
use crate::result_format::{format_results, ResultFormat};
use crate::storage::columnar::{GameColumn, GamesTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Rows shown to the oracle when paraphrasing
const PARAPHRASE_PREVIEW_ROWS: usize = 5;

/// Structured answer returned to the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub intent: Intent,
    pub metric_label: String,
    pub columns: Vec<String>,
    /// Presented rows (sales rounded to two decimals)
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_stats: Option<WeightedStats>,
    pub natural_language_answer: String,
    pub compiled_sql: Option<String>,
    pub language: Language,
    pub plan: QueryPlan,
    /// Alternate titles for a `not_found` answer
    pub suggestions: Vec<String>,
    pub elapsed_ms: u64,
}

/// Work in progress for one request
struct Draft {
    response: AskResponse,
    result: Option<ResultSet>,
    origin: Option<StatementOrigin>,
    outcome: AuditOutcome,
}

impl Draft {
    fn message(plan: QueryPlan, metric_label: String, answer: String, outcome: AuditOutcome) -> Self {
        Self {
            response: AskResponse {
                intent: plan.intent,
                metric_label,
                columns: Vec::new(),
                rows: Vec::new(),
                weighted_stats: None,
                natural_language_answer: answer,
                compiled_sql: None,
                language: plan.language,
                plan,
                suggestions: Vec::new(),
                elapsed_ms: 0,
            },
            result: None,
            origin: None,
            outcome,
        }
    }
}

/// Answer Engine
pub struct AnswerEngine {
    config: AssistantConfig,
    classifier: IntentClassifier,
    resolver: EntityResolver,
    compiler: PlanCompiler,
    executor: QueryExecutor,
    gateway: Option<OracleGateway>,
    audit: AuditLog,
}

impl AnswerEngine {
    /// Build the engine over an already loaded snapshot. Call `warm` before serving.
    pub fn new(table: Arc<GamesTable>, config: AssistantConfig) -> Self {
        let table_name = config.dataset.table_name.clone();
        Self {
            classifier: IntentClassifier::with_default_language(config.answer.default_language),
            resolver: EntityResolver::new(table.clone())
                .with_threshold(config.resolver.title_threshold)
                .with_limit(config.resolver.suggestion_limit),
            compiler: PlanCompiler::with_table(table_name.clone())
                .with_confidence_weight(config.ranking.confidence_weight),
            executor: QueryExecutor::new(table).with_table_name(table_name),
            gateway: None,
            audit: AuditLog::new(config.answer.audit_capacity),
            config,
        }
    }

    /// Explicit startup: load the dataset, attach the configured oracle and build the title index
    pub fn from_config(config: AssistantConfig) -> NlqResult<Self> {
        config
            .validate()
            .map_err(|e| NlqError::from(e).with_context("configuration"))?;
        let table = Arc::new(load_csv(&config.dataset.csv_path)?);
        info!(rows = table.row_count(), path = %config.dataset.csv_path.display(), "Dataset loaded");

        let mut engine = Self::new(table, config);
        if engine.config.oracle.enabled {
            let oracle = OllamaOracle::new(
                Some(engine.config.oracle.base_url.clone()),
                Some(engine.config.oracle.model.clone()),
            );
            info!(model = oracle.model(), "Oracle enabled");
            engine = engine.with_oracle(Arc::new(oracle));
        }
        engine.warm();
        Ok(engine)
    }

    /// Attach an oracle with the configured timeout and retry policy
    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        let settings = &self.config.oracle;
        self.gateway = Some(
            OracleGateway::new(oracle)
                .with_timeout(settings.timeout())
                .with_retries(settings.max_retries, settings.retry_backoff()),
        );
        self
    }

    /// Build the canonical-title index; returns the number of indexed titles
    pub fn warm(&self) -> usize {
        let titles = self.resolver.warm();
        info!(titles, "Title index ready");
        titles
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn has_oracle(&self) -> bool {
        self.gateway.is_some()
    }

    /// Check the attached oracle and log whether it answers. Requests still
    /// degrade to the deterministic path when it does not.
    pub async fn check_oracle(&self) -> bool {
        let Some(gateway) = &self.gateway else {
            return false;
        };
        let available = gateway.is_available().await;
        if available {
            info!("Oracle reachable");
        } else {
            warn!("Oracle unreachable, answers will be deterministic only");
        }
        available
    }

    /// Deterministic answer; the oracle is never consulted
    pub fn answer(&self, question: &str) -> AskResponse {
        let started = Instant::now();
        let plan = self.classifier.classify(question);
        let draft = self.run(plan, None);
        self.finish(question, draft, started)
    }

    /// Full pipeline including optional plan assist and paraphrase
    pub async fn ask(&self, question: &str) -> AskResponse {
        let started = Instant::now();
        let mut plan = self.classifier.classify(question);
        let mut candidate = None;

        if let (Some(gateway), PlanOrigin::DefaultFallback) = (&self.gateway, plan.origin) {
            match gateway.try_generate(&plan_request(question, &plan)).await {
                Some(OracleOutput::Plan { reasoning, plan: proposed }) => {
                    info!(intent = %proposed.intent, %reasoning, "Oracle plan accepted");
                    plan = proposed;
                }
                Some(OracleOutput::Sql { reasoning, sql }) => {
                    info!(%reasoning, "Oracle SQL candidate received");
                    candidate = Some(sql);
                }
                Some(OracleOutput::Text { .. }) | None => {
                    debug!("No plan assist, keeping default plan");
                }
            }
        }

        let mut draft = self.run(plan, candidate);
        if draft.outcome == AuditOutcome::Answered && self.config.oracle.paraphrase {
            self.paraphrase(question, &mut draft).await;
        }
        self.finish(question, draft, started)
    }

    async fn paraphrase(&self, question: &str, draft: &mut Draft) {
        let Some(gateway) = &self.gateway else {
            return;
        };
        let preview = draft
            .result
            .as_ref()
            .map(|r| format_results(r, ResultFormat::Sample(PARAPHRASE_PREVIEW_ROWS)))
            .unwrap_or_default();
        let response = &draft.response;
        let request = paraphrase_request(
            question,
            &response.plan,
            &response.natural_language_answer,
            &preview,
            response.language,
        );
        if let Some(OracleOutput::Text { text, .. }) = gateway.try_generate(&request).await {
            let titles: Vec<String> = draft
                .result
                .as_ref()
                .map(|r| r.column_values(GameColumn::Name.name()).iter().map(|v| v.to_string()).collect())
                .unwrap_or_default();
            if accept_paraphrase(&draft.response.natural_language_answer, &text, &titles) {
                debug!("Paraphrase accepted");
                draft.response.natural_language_answer = text;
            } else {
                warn!("Paraphrase changed the numbers or their titles, keeping deterministic answer");
            }
        }
    }

    /// Resolve, compile, execute, weight and render one plan
    fn run(&self, mut plan: QueryPlan, candidate: Option<String>) -> Draft {
        let language = plan.language;
        let metric_label = self.compiler.metric_label(&plan);
        info!(intent = %plan.intent, metric = plan.metric.label(), origin = ?plan.origin, "Plan ready");

        match plan.intent {
            Intent::OutOfScope => {
                return Draft::message(plan, metric_label, render_out_of_scope(language), AuditOutcome::OutOfScope);
            }
            Intent::NotFound => {
                let answer = render_not_found(plan.entity_text().unwrap_or_default(), &[], language);
                return Draft::message(plan, metric_label, answer, AuditOutcome::NotFound);
            }
            Intent::TitleLookup => {
                let term = plan.entity_text().unwrap_or_default().to_string();
                let resolution = self.resolver.resolve(&term);
                match resolution.canonical_title {
                    Some(ref title) => {
                        info!(term = %term, title = %title, confidence = resolution.confidence, "Title resolved");
                        plan.entity = Some(title.clone());
                    }
                    None => {
                        info!(term = %term, confidence = resolution.confidence, "Title not found");
                        let suggestions = resolution.suggestion_titles();
                        let answer = render_not_found(&term, &suggestions, language);
                        plan.intent = Intent::NotFound;
                        let mut draft = Draft::message(plan, metric_label, answer, AuditOutcome::NotFound);
                        draft.response.suggestions = suggestions;
                        return draft;
                    }
                }
            }
            _ => {}
        }

        let compiled = match candidate {
            Some(sql) => self.compiler.compile_candidate(&plan, sql, StatementOrigin::Oracle),
            None => self.compiler.compile(&plan),
        };
        let statement = match compiled {
            Ok(statement) => statement,
            Err(e) => return self.failure(plan, metric_label, e),
        };

        let result = match self.executor.execute(&statement) {
            Ok(result) => result,
            Err(e) => {
                let mut draft = self.failure(plan, statement.metric_label.clone(), e);
                draft.response.compiled_sql = Some(statement.sql);
                draft.origin = Some(statement.origin);
                return draft;
            }
        };
        info!(rows = result.len(), origin = ?statement.origin, "Statement executed");

        if let Some(column) = missing_ranking_column(&plan, &statement, &result) {
            let err = NlqError::execution(format!("ranking result has no {} column", column));
            let mut draft = self.failure(plan, statement.metric_label.clone(), err);
            draft.response.compiled_sql = Some(statement.sql);
            draft.origin = Some(statement.origin);
            return draft;
        }

        let weighted = if plan.intent == Intent::FranchiseAverage {
            if result.is_empty() {
                let term = plan.entity_text().unwrap_or_default().to_string();
                info!(term = %term, "No titles matched the franchise");
                plan.intent = Intent::NotFound;
                let answer = render_not_found(&term, &[], language);
                let mut draft = Draft::message(plan, statement.metric_label.clone(), answer, AuditOutcome::NotFound);
                draft.response.compiled_sql = Some(statement.sql);
                draft.origin = Some(statement.origin);
                return draft;
            }
            Some(aggregation::weight(&result))
        } else {
            None
        };

        let answer = render(&plan, &statement, &result, weighted.as_ref());
        self.answered(plan, statement, result, weighted, answer)
    }

    fn answered(
        &self,
        plan: QueryPlan,
        statement: SqlStatement,
        result: ResultSet,
        weighted: Option<WeightedStats>,
        answer: String,
    ) -> Draft {
        let formatted = format_results(&result, ResultFormat::Full);
        Draft {
            response: AskResponse {
                intent: plan.intent,
                metric_label: statement.metric_label,
                columns: formatted.columns,
                rows: formatted.rows,
                weighted_stats: weighted,
                natural_language_answer: answer,
                compiled_sql: Some(statement.sql),
                language: plan.language,
                plan,
                suggestions: Vec::new(),
                elapsed_ms: 0,
            },
            result: Some(result),
            origin: Some(statement.origin),
            outcome: AuditOutcome::Answered,
        }
    }

    fn failure(&self, plan: QueryPlan, metric_label: String, err: NlqError) -> Draft {
        error!(intent = %plan.intent, category = err.category(), error = %err, "Request failed");
        let answer = render_apology(plan.language);
        Draft::message(plan, metric_label, answer, AuditOutcome::Failed(err.category().to_string()))
    }

    fn finish(&self, question: &str, draft: Draft, started: Instant) -> AskResponse {
        let mut response = draft.response;
        response.elapsed_ms = started.elapsed().as_millis() as u64;
        let id = self.audit.log(AuditRecord {
            question,
            plan: &response.plan,
            sql: response.compiled_sql.as_deref(),
            origin: draft.origin,
            row_count: response.rows.len(),
            elapsed_ms: response.elapsed_ms,
            outcome: draft.outcome,
        });
        debug!(audit_id = %id, elapsed_ms = response.elapsed_ms, "Request complete");
        response
    }
}

/// A ranking can only be rendered from its title and metric columns
fn missing_ranking_column<'a>(plan: &QueryPlan, statement: &'a SqlStatement, result: &ResultSet) -> Option<&'a str> {
    if plan.intent != Intent::Ranking {
        return None;
    }
    [GameColumn::Name.name(), statement.metric_label.as_str()]
        .into_iter()
        .find(|column| result.column_index(column).is_none())
}
