//! System instructions and payloads sent to the oracle

use crate::llm::oracle::{OracleRequest, OracleTask};
use crate::query::plan::{Language, QueryPlan};
use crate::result_format::FormattedResult;
use crate::storage::columnar::GameColumn;
use serde_json::json;

pub const PLAN_SYSTEM_PROMPT: &str = "\
You translate questions about a video-game sales dataset into a query plan.
The only table is `games` with columns: {columns}.
Reply with strict JSON: {\"reasoning\": string, \"plan\": object} or {\"reasoning\": string, \"sql\": string}.
Plan fields: intent (ranking | franchise_average | title_lookup | aggregate | total_franchise_sales | summary | out_of_scope),
metric (global_sales | na_sales | eu_sales | jp_sales | other_sales | critic_score | user_score | combo),
top_n (1-100), year or year_from/year_to, filters {platform, genre, publisher, developer}, entity.
SQL must be a single read-only SELECT over `games`; rankings must GROUP BY lower(Name).
Never invent columns or tables.";

pub const PARAPHRASE_SYSTEM_PROMPT: &str = "\
You restyle an already computed answer about video-game data.
Reply with strict JSON: {\"reasoning\": string, \"text\": string}.
Write 1-3 sentences in the requested language.
Use only the facts and numbers in `answer`; never add, drop or change a number.";

fn column_list() -> String {
    GameColumn::ALL.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
}

/// Plan assist for questions the rules could not place
pub fn plan_request(question: &str, default_plan: &QueryPlan) -> OracleRequest {
    OracleRequest {
        task: OracleTask::Plan,
        system: PLAN_SYSTEM_PROMPT.replace("{columns}", &column_list()),
        payload: json!({
            "question": question,
            "language": default_plan.language,
            "default_plan": default_plan,
        }),
    }
}

/// Paraphrase of a deterministic answer
pub fn paraphrase_request(
    question: &str,
    plan: &QueryPlan,
    answer: &str,
    preview: &FormattedResult,
    language: Language,
) -> OracleRequest {
    let language_name = match language {
        Language::Pt => "Portuguese",
        Language::En => "English",
    };
    OracleRequest {
        task: OracleTask::Paraphrase,
        system: PARAPHRASE_SYSTEM_PROMPT.to_string(),
        payload: json!({
            "question": question,
            "language": language_name,
            "intent": plan.intent,
            "answer": answer,
            "rows_preview": preview,
        }),
    }
}
