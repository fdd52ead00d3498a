/// Integration tests for the full question-to-answer pipeline
/// Scenarios run over the shared fixture; oracle paths use in-process scripted oracles
///
/// Run with: cargo test --test pipeline_test

mod common;

use async_trait::async_trait;
use game_sales_nlq::llm::{AuditOutcome, OllamaOracle, Oracle};
use game_sales_nlq::query::{PlanOrigin, StatementOrigin};
use game_sales_nlq::{AssistantConfig, Intent, Language, Metric};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays canned replies in order; `None` fails the call
struct ScriptedOracle {
    replies: Mutex<Vec<Option<String>>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new(replies: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().map(|r| r.map(str::to_string)).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, _system: &str, _payload: &serde_json::Value) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().pop().flatten() {
            Some(reply) => Ok(reply),
            None => anyhow::bail!("connection refused"),
        }
    }
}

/// Never answers in time
struct SlowOracle;

#[async_trait]
impl Oracle for SlowOracle {
    async fn complete(&self, _system: &str, _payload: &serde_json::Value) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(r#"{"reasoning": "late", "text": "late"}"#.to_string())
    }
}

fn fast_oracle_config() -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.oracle.enabled = true;
    config.oracle.timeout_ms = 50;
    config.oracle.max_retries = 0;
    config.oracle.retry_backoff_ms = 1;
    config
}

#[test]
fn test_top_five_sales_in_2010() {
    let engine = common::engine();
    let response = engine.answer("top 5 sales in 2010");

    assert_eq!(response.intent, Intent::Ranking);
    assert_eq!(response.plan.metric, Metric::GlobalSales);
    assert_eq!(response.plan.top_n, 5);
    assert_eq!(response.plan.year, Some(2010));
    assert_eq!(response.language, Language::En);

    let sql = response.compiled_sql.as_deref().unwrap();
    assert!(sql.contains("GROUP BY lower(Name)"));
    assert!(sql.contains("Year_of_Release = 2010"));
    assert!(sql.contains("DESC"));
    assert!(sql.ends_with("LIMIT 5"));

    assert_eq!(response.columns, vec!["Rank", "Name", "year", "Global_Sales"]);
    assert_eq!(response.rows.len(), 3);
    assert_eq!(response.rows[0][1], json!("Call of Duty: Black Ops"));
    assert_eq!(response.rows[0][3], json!(27.25));
    assert_eq!(response.rows[1][1], json!("Kinect Adventures!"));
    assert_eq!(response.rows[2][1], json!("Pokemon Black/White"));
    assert!(response
        .natural_language_answer
        .starts_with("Top 3 by global sales in 2010: Call of Duty: Black Ops (2010) – 27.25"));
}

#[test]
fn test_release_year_question_ranks_that_year() {
    let engine = common::engine();
    for question in ["top 10 jogos com lançamento em 2010", "quais jogos tiveram lançamento em 2010?"] {
        let response = engine.answer(question);
        assert_eq!(response.intent, Intent::Ranking, "{}", question);
        assert_eq!(response.plan.year, Some(2010));
        assert!(response.suggestions.is_empty());
        assert!(response
            .natural_language_answer
            .starts_with("Top 3 por vendas globais em 2010: Call of Duty: Black Ops (2010) – 27.25"));
    }
}

#[test]
fn test_multi_platform_title_counted_once() {
    let engine = common::engine();
    let response = engine.answer("top 3 vendas globais");

    let names: Vec<_> = response.rows.iter().map(|r| r[1].clone()).collect();
    assert_eq!(names, vec![json!("Wii Sports"), json!("Grand Theft Auto V"), json!("Super Mario Bros.")]);
    assert_eq!(response.rows[1][2], json!(2013));
    assert_eq!(response.rows[1][3], json!(49.92));
    let ranks: Vec<_> = response.rows.iter().map(|r| r[0].clone()).collect();
    assert_eq!(ranks, vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn test_ties_break_by_title() {
    let engine = common::engine();
    let response = engine.answer("top 2 vendas em 2015");
    assert_eq!(response.rows.len(), 2);
    assert_eq!(response.rows[0][1], json!("Alpha Racer"));
    assert_eq!(response.rows[1][1], json!("beta racer"));
}

#[test]
fn test_out_of_scope_question() {
    let engine = common::engine();
    let response = engine.answer("Qual o preço do petróleo hoje?");
    assert_eq!(response.intent, Intent::OutOfScope);
    assert!(response.rows.is_empty());
    assert!(response.compiled_sql.is_none());
    assert!(response
        .natural_language_answer
        .starts_with("Sua pergunta parece estar fora do escopo deste app"));
}

#[test]
fn test_franchise_average_is_weighted() {
    let engine = common::engine();
    let response = engine.answer("média de nota da franquia Zelda");
    assert_eq!(response.intent, Intent::FranchiseAverage);
    assert_eq!(response.metric_label, "Weighted_Score");
    // Zelda II has no scores and is filtered out
    assert_eq!(response.rows.len(), 3);

    let stats = response.weighted_stats.clone().unwrap();
    let critic = (99.0 * 22.0 + 95.0 * 88.0 + 90.0 * 70.0) / 180.0;
    let user = (9.1 * 2400.0 + 9.0 * 2023.0) / 4423.0;
    assert!((stats.critic_weighted_avg.unwrap() - critic).abs() < 1e-9);
    assert!((stats.user_weighted_avg.unwrap() - user).abs() < 1e-9);
    assert!((stats.combo_score.unwrap() - (0.6 * critic + 0.4 * user * 10.0)).abs() < 1e-9);
    assert_eq!(stats.titles_considered, 3);
    assert_eq!(stats.critic_count_sum, 180);
    assert_eq!(stats.user_count_sum, 4423);

    let answer = &response.natural_language_answer;
    assert!(answer.starts_with("Para Zelda, média ponderada dos usuários 9.05 e média ponderada da crítica 93.54"));
    assert!(answer.contains("n usuários=4423, n críticas=180, títulos considerados=3"));
}

#[test]
fn test_franchise_without_titles_is_not_found() {
    let engine = common::engine();
    let response = engine.answer("média de nota da franquia Xyzzy");
    assert_eq!(response.intent, Intent::NotFound);
    assert!(response.suggestions.is_empty());
    assert!(response.rows.is_empty());
    assert!(response.weighted_stats.is_none());
    assert!(response.natural_language_answer.starts_with("Não encontrei 'xyzzy' na base."));
}

#[test]
fn test_title_lookup_resolves_canonical_title() {
    let engine = common::engine();
    let response = engine.answer("Em que ano foi lançado Tetris?");
    assert_eq!(response.intent, Intent::TitleLookup);
    assert_eq!(response.plan.entity.as_deref(), Some("Tetris"));
    assert_eq!(response.rows, vec![vec![json!(1989)]]);
    assert_eq!(response.natural_language_answer, "Tetris foi lançado em 1989.");
}

#[test]
fn test_unknown_title_offers_suggestions() {
    let engine = common::engine();
    let response = engine.answer("Em que ano foi lançado Halo Infinite?");
    assert_eq!(response.intent, Intent::NotFound);
    assert!(response.suggestions.len() <= 5);
    assert!(response.rows.is_empty());
    assert!(response.compiled_sql.is_none());
    assert!(response
        .natural_language_answer
        .starts_with("Não encontrei 'halo infinite' na base."));
}

#[test]
fn test_total_franchise_sales() {
    let engine = common::engine();
    let response = engine.answer("Qual o total de vendas da franquia Mario Kart?");
    assert_eq!(response.intent, Intent::TotalFranchiseSales);
    assert_eq!(
        response.natural_language_answer,
        "A franquia Mario Kart soma 35.52 milhões globalmente (NA 15.68, EU 12.76, JP 3.79, Outros 3.29; títulos considerados=1)."
    );
}

#[test]
fn test_count_with_platform_filter() {
    let engine = common::engine();
    let response = engine.answer("Quantos jogos de PS3 existem na base?");
    assert_eq!(response.intent, Intent::Aggregate);
    assert_eq!(response.rows, vec![vec![json!(2)]]);
    assert_eq!(response.natural_language_answer, "Encontrei 2 jogos (plataforma PS3).");
}

#[test]
fn test_summary_of_the_dataset() {
    let engine = common::engine();
    let response = engine.answer("Me dá um resumo da base");
    assert_eq!(response.intent, Intent::Summary);
    assert!(response.natural_language_answer.starts_with("A base tem 18 entradas, de 1985 a 2015"));
}

#[test]
fn test_unrecognized_question_degrades_to_ranking() {
    let engine = common::engine();
    let response = engine.answer("me conta uma curiosidade");
    assert_eq!(response.intent, Intent::Ranking);
    assert_eq!(response.plan.origin, PlanOrigin::DefaultFallback);
    assert_eq!(response.rows.len(), 10);
    assert!(!response.natural_language_answer.is_empty());
}

#[test]
fn test_every_request_is_audited() {
    let engine = common::engine();
    engine.answer("top 5 sales in 2010");
    engine.answer("Qual o preço do petróleo hoje?");
    engine.answer("Em que ano foi lançado Halo Infinite?");

    let outcomes: Vec<_> = engine.audit_log().entries().into_iter().map(|e| e.outcome).collect();
    assert_eq!(outcomes, vec![AuditOutcome::Answered, AuditOutcome::OutOfScope, AuditOutcome::NotFound]);
}

#[tokio::test]
async fn test_oracle_plan_assist_and_paraphrase() {
    let oracle = ScriptedOracle::new(vec![
        Some(r#"{"reasoning": "asks for a count", "plan": {"intent": "aggregate", "aggregate": "count", "filters": {"platform": "Wii"}}}"#),
        Some(r#"{"reasoning": "restyled", "text": "Há 3 jogos de Wii na base."}"#),
    ]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle.clone());

    let response = engine.ask("me conta uma curiosidade").await;
    assert_eq!(response.intent, Intent::Aggregate);
    assert_eq!(response.plan.origin, PlanOrigin::Oracle);
    assert_eq!(response.rows, vec![vec![json!(3)]]);
    assert_eq!(response.natural_language_answer, "Há 3 jogos de Wii na base.");
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_paraphrase_with_new_numbers_is_rejected() {
    let oracle = ScriptedOracle::new(vec![Some(r#"{"reasoning": "r", "text": "Foram 4 jogos em 2011."}"#)]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle.clone());

    // Classified by rules, so only the paraphrase is requested
    let response = engine.ask("Quantos jogos de PS3 existem na base?").await;
    assert_eq!(oracle.calls(), 1);
    assert_eq!(response.natural_language_answer, "Encontrei 2 jogos (plataforma PS3).");
}

#[tokio::test]
async fn test_paraphrase_swapping_title_values_is_rejected() {
    let oracle = ScriptedOracle::new(vec![Some(
        r#"{"reasoning": "r", "text": "Kinect Adventures! lidera com 27.25, seguido de Call of Duty: Black Ops com 21.82."}"#,
    )]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle.clone());

    let response = engine.ask("top 2 vendas em 2010").await;
    assert_eq!(oracle.calls(), 1);
    let expected = common::engine().answer("top 2 vendas em 2010");
    assert_eq!(response.natural_language_answer, expected.natural_language_answer);
    assert!(response.natural_language_answer.contains("Call of Duty: Black Ops (2010) – 27.25"));
}

#[tokio::test]
async fn test_oracle_sql_candidate_runs_after_validation() {
    let oracle = ScriptedOracle::new(vec![
        Some(
            r#"{"reasoning": "nes ranking", "sql": "SELECT ROW_NUMBER() OVER (ORDER BY SUM(Global_Sales) DESC, lower(MIN(Name)) ASC) AS Rank, MIN(Name) AS Name, SUM(Global_Sales) AS Global_Sales FROM games WHERE lower(Platform) = 'nes' GROUP BY lower(Name) ORDER BY Rank ASC LIMIT 3"}"#,
        ),
        None,
    ]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle);

    let response = engine.ask("me conta uma curiosidade").await;
    assert_eq!(response.rows.len(), 2);
    assert_eq!(response.rows[0][1], json!("Super Mario Bros."));
    assert_eq!(
        response.natural_language_answer,
        "Top 2 por vendas globais: Super Mario Bros. – 40.24, Zelda II: The Adventure of Link – 4.38."
    );
    let entry = engine.audit_log().entries().pop().unwrap();
    assert_eq!(entry.origin, Some(StatementOrigin::Oracle));
}

#[tokio::test]
async fn test_misordered_oracle_ranking_falls_back_to_template() {
    let oracle = ScriptedOracle::new(vec![
        Some(
            r#"{"reasoning": "lowest first", "sql": "SELECT MIN(Name) AS Name, SUM(Global_Sales) AS Global_Sales FROM games GROUP BY lower(Name) ORDER BY Global_Sales ASC LIMIT 3"}"#,
        ),
        None,
    ]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle);

    let response = engine.ask("asdf qwerty").await;
    assert_eq!(response.intent, Intent::Ranking);
    assert_eq!(response.rows.len(), 10);
    let metric = response.columns.iter().position(|c| c == "Global_Sales").unwrap();
    let values: Vec<f64> = response.rows.iter().map(|r| r[metric].as_f64().unwrap()).collect();
    assert!(values.windows(2).all(|pair| pair[0] >= pair[1]), "{:?}", values);
    assert!(response.natural_language_answer.starts_with("Top 10 por vendas globais: Wii Sports"));
    let entry = engine.audit_log().entries().pop().unwrap();
    assert_eq!(entry.origin, Some(StatementOrigin::Fallback));
}

#[tokio::test]
async fn test_oracle_sql_without_ranking_columns_is_not_rendered() {
    let oracle = ScriptedOracle::new(vec![
        Some(r#"{"reasoning": "per platform", "sql": "SELECT Platform, COUNT(*) AS n FROM games GROUP BY Platform"}"#),
        None,
    ]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle);

    let response = engine.ask("asdf qwerty").await;
    let expected = common::engine().answer("asdf qwerty");
    assert_eq!(response.natural_language_answer, expected.natural_language_answer);
    assert!(!response.natural_language_answer.contains(", ,"));
    assert_eq!(response.rows, expected.rows);
}

#[tokio::test]
async fn test_unsafe_oracle_sql_falls_back_to_template() {
    let oracle = ScriptedOracle::new(vec![
        Some(r#"{"reasoning": "oops", "sql": "DELETE FROM games"}"#),
        None,
    ]);
    let engine = common::engine_with(fast_oracle_config()).with_oracle(oracle);

    let response = engine.ask("me conta uma curiosidade").await;
    assert_eq!(response.intent, Intent::Ranking);
    assert_eq!(response.rows.len(), 10);
    assert!(response.compiled_sql.as_deref().unwrap().starts_with("SELECT"));
    let entry = engine.audit_log().entries().pop().unwrap();
    assert_eq!(entry.origin, Some(StatementOrigin::Fallback));
}

#[tokio::test]
async fn test_unreachable_oracle_keeps_deterministic_answer() {
    let failing = common::engine_with(fast_oracle_config()).with_oracle(ScriptedOracle::new(vec![None, None]));
    let slow = common::engine_with(fast_oracle_config()).with_oracle(Arc::new(SlowOracle));
    let plain = common::engine();

    for question in ["me conta uma curiosidade", "top 5 sales in 2010"] {
        let expected = plain.answer(question);
        for engine in [&failing, &slow] {
            let response = engine.ask(question).await;
            assert_eq!(response.natural_language_answer, expected.natural_language_answer);
            assert_eq!(response.rows, expected.rows);
        }
    }
}

#[tokio::test]
async fn test_oracle_availability_check() {
    assert!(!common::engine().check_oracle().await);

    let scripted = common::engine_with(fast_oracle_config()).with_oracle(ScriptedOracle::new(vec![]));
    assert!(scripted.check_oracle().await);

    let mut config = fast_oracle_config();
    config.oracle.timeout_ms = 2000;
    let unreachable = OllamaOracle::new(Some("http://127.0.0.1:9".into()), None);
    let engine = common::engine_with(config).with_oracle(Arc::new(unreachable));
    assert!(!engine.check_oracle().await);
    // Still answers deterministically
    assert_eq!(engine.ask("top 5 sales in 2010").await.rows.len(), 3);
}
