/// Integration tests for the restricted SQL interpreter
/// Covers coercion, null handling, ordering and the ranking properties
///
/// Run with: cargo test --test executor_test

mod common;

use common::{game, Sales};
use game_sales_nlq::aggregation::{confidence_weighted_combo, ScoreRow};
use game_sales_nlq::query::{PlanCompiler, QueryExecutor};
use game_sales_nlq::storage::Value;
use game_sales_nlq::{GameRecord, GamesTable, Intent, Metric, NlqError, QueryPlan};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn executor() -> QueryExecutor {
    QueryExecutor::new(common::table())
}

#[test]
fn test_where_with_null_year_excludes_row() {
    let result = executor()
        .execute_sql("SELECT Name FROM games WHERE Year_of_Release >= 2015 ORDER BY Name ASC")
        .unwrap();
    let names: Vec<String> = result.column_values("Name").iter().map(|v| v.to_string()).collect();
    assert_eq!(names, vec!["Alpha Racer", "beta racer"]);
}

#[test]
fn test_average_ignores_nulls() {
    let result = executor()
        .execute_sql("SELECT AVG(User_Score) AS u, COUNT(User_Score) AS n, COUNT(*) AS total FROM games WHERE Platform = 'DS'")
        .unwrap();
    // Pokemon has no user score, Phantom Hourglass has none either
    assert!(result.value(0, "u").unwrap().is_null());
    assert_eq!(result.value(0, "n").unwrap().as_i64(), Some(0));
    assert_eq!(result.value(0, "total").unwrap().as_i64(), Some(2));

    let result = executor()
        .execute_sql("SELECT AVG(Critic_Score) AS c FROM games WHERE lower(Name) LIKE '%zelda%'")
        .unwrap();
    let avg = result.value(0, "c").unwrap().as_f64().unwrap();
    assert!((avg - (99.0 + 95.0 + 90.0) / 3.0).abs() < 1e-9);
}

#[test]
fn test_nulls_sort_last_by_default() {
    let result = executor()
        .execute_sql("SELECT Name, Year_of_Release FROM games WHERE Platform = 'PC' OR Platform = 'NES' ORDER BY Year_of_Release DESC")
        .unwrap();
    assert_eq!(result.len(), 3);
    assert!(result.value(2, "Year_of_Release").unwrap().is_null());

    let result = executor()
        .execute_sql("SELECT Name FROM games WHERE Platform IN ('PC', 'NES') ORDER BY Year_of_Release ASC NULLS FIRST")
        .unwrap();
    assert_eq!(result.first_value("Name").unwrap().to_string(), "Lost Cartridge");
}

#[test]
fn test_case_coalesce_and_between() {
    let result = executor()
        .execute_sql(
            "SELECT Name, CASE WHEN Global_Sales > 30 THEN 'hit' ELSE 'other' END AS tier, \
             COALESCE(Critic_Score, -1) AS critic FROM games \
             WHERE Year_of_Release BETWEEN 1985 AND 1989 ORDER BY 1",
        )
        .unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(result.value(0, "Name").unwrap().to_string(), "Super Mario Bros.");
    assert_eq!(result.value(0, "tier").unwrap().to_string(), "hit");
    assert_eq!(result.value(1, "tier").unwrap().to_string(), "hit");
    assert_eq!(result.value(2, "Name").unwrap().to_string(), "Zelda II: The Adventure of Link");
    assert_eq!(result.value(2, "tier").unwrap().to_string(), "other");
    assert_eq!(result.value(2, "critic").unwrap().as_f64(), Some(-1.0));
}

#[test]
fn test_try_cast_of_text_is_null() {
    let result = executor()
        .execute_sql("SELECT TRY_CAST(Platform AS INTEGER) AS p, TRY_CAST(Platform AS INTEGER) IS NULL AS missing FROM games WHERE Name = 'Tetris'")
        .unwrap();
    assert!(result.value(0, "p").unwrap().is_null());
    assert_eq!(result.value(0, "missing").unwrap().as_bool(), Some(true));
}

#[test]
fn test_distinct_offset_limit() {
    let result = executor()
        .execute_sql("SELECT DISTINCT Publisher FROM games ORDER BY Publisher ASC LIMIT 2 OFFSET 1")
        .unwrap();
    let publishers: Vec<String> = result.column_values("Publisher").iter().map(|v| v.to_string()).collect();
    assert_eq!(publishers, vec!["Indie Works", "Microsoft Game Studios"]);
}

#[test]
fn test_unsupported_shapes_are_execution_errors() {
    let executor = executor();
    for sql in [
        "SELECT * FROM games g JOIN games h ON g.Name = h.Name",
        "SELECT Name FROM sales",
        "WITH t AS (SELECT Name FROM games) SELECT Name FROM t",
        "SELECT Name FROM games LIMIT Global_Sales",
    ] {
        let err = executor.execute_sql(sql).unwrap_err();
        assert!(matches!(err, NlqError::Execution { .. }), "{} gave {:?}", sql, err);
    }
}

fn ranking_plan(metric: Metric, top_n: u32) -> QueryPlan {
    let mut plan = QueryPlan::new(Intent::Ranking);
    plan.metric = metric;
    plan.top_n = top_n;
    plan
}

#[test]
fn test_score_ranking_uses_average_per_title() {
    let table = common::table();
    let statement = PlanCompiler::new().compile(&ranking_plan(Metric::CriticScore, 3)).unwrap();
    let result = QueryExecutor::new(table).execute(&statement).unwrap();
    let names: Vec<String> = result.column_values("Name").iter().map(|v| v.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "The Legend of Zelda: Ocarina of Time",
            "Grand Theft Auto V",
            "The Legend of Zelda: Twilight Princess"
        ]
    );
    assert_eq!(result.value(1, "Critic_Score").unwrap().as_f64(), Some(97.0));
}

fn names(result: &game_sales_nlq::query::ResultSet) -> Vec<String> {
    result.column_values("Name").iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_combo_ranking_is_confidence_weighted() {
    let table = common::table();
    let plan = ranking_plan(Metric::Combo, 3);
    let statement = PlanCompiler::new().compile(&plan).unwrap();
    let result = QueryExecutor::new(table.clone()).execute(&statement).unwrap();
    assert_eq!(
        names(&result),
        vec!["The Legend of Zelda: Twilight Princess", "Grand Theft Auto V", "Mario Kart Wii"]
    );
    // (0.6·95 + 0.4·9.0·10) · (0.5·σ((88-20)/10) + 0.5·σ((2023-200)/100))
    let top = result.value(0, "Combo_Score").unwrap().as_f64().unwrap();
    assert!((top - 92.948266).abs() < 1e-5);

    // Each title scores the mean of its rows' weighted combo
    let records = common::records();
    for (row, name) in names(&result).iter().enumerate() {
        let combos: Vec<f64> = records
            .iter()
            .filter(|r| &r.name == name)
            .filter_map(|r| {
                confidence_weighted_combo(&ScoreRow {
                    critic_score: r.critic_score,
                    critic_count: r.critic_count.map(|c| c as f64),
                    user_score: r.user_score,
                    user_count: r.user_count.map(|c| c as f64),
                })
            })
            .collect();
        let expected = combos.iter().sum::<f64>() / combos.len() as f64;
        let actual = result.value(row, "Combo_Score").unwrap().as_f64().unwrap();
        assert!((actual - expected).abs() < 1e-9, "{}: {} vs {}", name, actual, expected);
    }

    // Without the confidence factor the plain blend ranks Ocarina of Time first
    let statement = PlanCompiler::new().with_confidence_weight(false).compile(&plan).unwrap();
    let result = QueryExecutor::new(table).execute(&statement).unwrap();
    assert_eq!(names(&result)[0], "The Legend of Zelda: Ocarina of Time");
    let top = result.value(0, "Combo_Score").unwrap().as_f64().unwrap();
    assert!((top - 95.8).abs() < 1e-9);
}

fn arb_records() -> impl Strategy<Value = Vec<GameRecord>> {
    let titles = prop::sample::select(vec!["Alpha", "alpha", "Beta", "Gamma", "Delta", "delta", "Omega"]);
    let platforms = prop::sample::select(vec!["PS4", "X360", "Wii"]);
    prop::collection::vec((titles, platforms, 0u32..500u32), 1..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(title, platform, cents)| {
                let sales = f64::from(cents) / 100.0;
                game(title, platform, Some(2010), "Misc", "Test", Sales(0.0, 0.0, 0.0, 0.0, sales), None, None)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_ranking_is_ordered_unique_and_bounded(records in arb_records(), top_n in 1u32..10) {
        let table = Arc::new(GamesTable::from_records(&records));
        let statement = PlanCompiler::new().compile(&ranking_plan(Metric::GlobalSales, top_n)).unwrap();
        let result = QueryExecutor::new(table).execute(&statement).unwrap();

        prop_assert!(result.len() <= top_n as usize);

        let names: Vec<String> = result.column_values("Name").iter().map(|v| v.to_string().to_lowercase()).collect();
        let unique: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(unique.len(), names.len());

        let values: Vec<f64> = result.column_values("Global_Sales").iter().filter_map(|v| v.as_f64()).collect();
        for i in 1..values.len() {
            prop_assert!(values[i - 1] >= values[i]);
            if values[i - 1] == values[i] {
                prop_assert!(names[i - 1] < names[i]);
            }
        }

        let ranks: Vec<i64> = result.column_values("Rank").iter().filter_map(|v| v.as_i64()).collect();
        prop_assert_eq!(ranks, (1..=result.len() as i64).collect::<Vec<_>>());

        // Each title's value is the sum over all of its rows
        for (row, name) in names.iter().enumerate() {
            let expected: f64 = records
                .iter()
                .filter(|r| r.name.to_lowercase() == *name)
                .filter_map(|r| r.global_sales)
                .sum();
            prop_assert!((values[row] - expected).abs() < 1e-9);
        }
    }
}

#[test]
fn test_value_comparison_treats_null_as_unknown() {
    assert!(Value::Null.sql_cmp(&Value::Int64(1)).is_none());
    assert!(Value::Int64(2).sql_cmp(&Value::Float64(1.5)).is_some());
}
