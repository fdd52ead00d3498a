//! Answer Synthesizer
//!
//! Deterministic PT/EN templates. Every number in a rendered answer comes from
//! the result set, the weighted stats, or the plan's own parameters.

use crate::aggregation::WeightedStats;
use crate::query::compiler::SqlStatement;
use crate::query::plan::{AggregateFunc, Intent, Language, LookupField, Metric, QueryPlan};
use crate::query::result::ResultSet;
use crate::storage::columnar::GameColumn;
use crate::storage::value::Value;

/// Example questions offered when a request is out of scope
pub const EXAMPLE_QUESTIONS_PT: &[&str] = &[
    "Top 10 vendas globais em 2010",
    "Top 10 no Japão por User_Score",
    "Média de nota da franquia Zelda",
];
pub const EXAMPLE_QUESTIONS_EN: &[&str] = &[
    "Top 10 global sales in 2010",
    "Top 10 in Japan by User_Score",
    "Average score of the Zelda franchise",
];

fn fmt_number(value: &Value) -> Option<String> {
    match value {
        Value::Int64(i) => Some(i.to_string()),
        Value::Float64(f) => Some(format!("{:.2}", f)),
        _ => None,
    }
}

fn fmt_opt(value: Option<f64>) -> Option<String> {
    value.map(|v| format!("{:.2}", v))
}

/// "zelda" -> "Zelda", "grand theft auto" -> "Grand Theft Auto"
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Year and filter qualifiers, e.g. " em 2010 (plataforma PS4)"
fn scope_phrase(plan: &QueryPlan, language: Language) -> String {
    let mut out = String::new();
    match (plan.year, plan.year_from, plan.year_to, language) {
        (Some(y), _, _, Language::Pt) => out.push_str(&format!(" em {}", y)),
        (Some(y), _, _, Language::En) => out.push_str(&format!(" in {}", y)),
        (None, Some(a), Some(b), Language::Pt) => out.push_str(&format!(" entre {} e {}", a, b)),
        (None, Some(a), Some(b), Language::En) => out.push_str(&format!(" between {} and {}", a, b)),
        _ => {}
    }
    let predicates = plan.filters.predicates();
    if !predicates.is_empty() {
        let parts: Vec<String> = predicates
            .iter()
            .map(|(column, value)| {
                let label = match (column, language) {
                    (GameColumn::Platform, Language::Pt) => "plataforma",
                    (GameColumn::Genre, Language::Pt) => "gênero",
                    (GameColumn::Publisher, Language::Pt) => "publicadora",
                    (GameColumn::Developer, Language::Pt) => "desenvolvedora",
                    (GameColumn::Platform, Language::En) => "platform",
                    (GameColumn::Genre, Language::En) => "genre",
                    (GameColumn::Publisher, Language::En) => "publisher",
                    (_, _) => "developer",
                };
                format!("{} {}", label, value)
            })
            .collect();
        out.push_str(&format!(" ({})", parts.join(", ")));
    }
    out
}

fn entity_label(plan: &QueryPlan, language: Language) -> String {
    match (plan.entity_text(), language) {
        (Some(entity), _) => title_case(entity),
        (None, Language::Pt) => "a franquia".to_string(),
        (None, Language::En) => "the franchise".to_string(),
    }
}

/// Render the answer for an executed statement
pub fn render(plan: &QueryPlan, statement: &SqlStatement, result: &ResultSet, weighted: Option<&WeightedStats>) -> String {
    let language = plan.language;
    match plan.intent {
        Intent::Ranking => render_ranking(plan, &statement.metric_label, result),
        Intent::FranchiseAverage => render_franchise_average(plan, weighted.cloned().unwrap_or_default()),
        Intent::TitleLookup => render_title_lookup(plan, &statement.metric_label, result),
        Intent::Aggregate => render_aggregate(plan, result),
        Intent::TotalFranchiseSales => render_total_sales(plan, result),
        Intent::Summary => render_summary(plan, result),
        Intent::OutOfScope => render_out_of_scope(language),
        Intent::NotFound => render_not_found(plan.entity_text().unwrap_or_default(), &[], language),
    }
}

fn render_ranking(plan: &QueryPlan, metric_label: &str, result: &ResultSet) -> String {
    let language = plan.language;
    let metric = plan.metric.display_name(language);
    let scope = scope_phrase(plan, language);
    if result.is_empty() {
        return match language {
            Language::Pt => format!("Nenhum resultado para {}{}.", metric, scope),
            Language::En => format!("No results for {}{}.", metric, scope),
        };
    }

    // Nothing to list without titles and values
    if result.column_index("Name").is_none() || result.column_index(metric_label).is_none() {
        return render_apology(language);
    }

    let listing: Vec<String> = (0..result.len())
        .map(|row| {
            let name = result.value(row, "Name").map(|v| v.to_string()).unwrap_or_default();
            let year = result.value(row, "year").and_then(fmt_number);
            let value = result.value(row, metric_label).and_then(fmt_number);
            let mut item = name;
            if let Some(year) = year {
                item.push_str(&format!(" ({})", year));
            }
            if let Some(value) = value {
                item.push_str(&format!(" – {}", value));
            }
            item
        })
        .collect();

    match language {
        Language::Pt => format!("Top {} por {}{}: {}.", result.len(), metric, scope, listing.join(", ")),
        Language::En => format!("Top {} by {}{}: {}.", result.len(), metric, scope, listing.join(", ")),
    }
}

fn render_franchise_average(plan: &QueryPlan, stats: WeightedStats) -> String {
    let language = plan.language;
    let family = entity_label(plan, language);
    let mut parts = Vec::new();
    if let Some(user) = fmt_opt(stats.user_weighted_avg) {
        parts.push(match language {
            Language::Pt => format!("média ponderada dos usuários {}", user),
            Language::En => format!("users' weighted average {}", user),
        });
    }
    if let Some(critic) = fmt_opt(stats.critic_weighted_avg) {
        parts.push(match language {
            Language::Pt => format!("média ponderada da crítica {}", critic),
            Language::En => format!("critics' weighted average {}", critic),
        });
    }
    let core = match (parts.is_empty(), language) {
        (true, Language::Pt) => "médias não disponíveis".to_string(),
        (true, Language::En) => "averages not available".to_string(),
        (false, Language::Pt) => parts.join(" e "),
        (false, Language::En) => parts.join(" and "),
    };
    let counts = match language {
        Language::Pt => format!(
            " (n usuários={}, n críticas={}, títulos considerados={})",
            stats.user_count_sum, stats.critic_count_sum, stats.titles_considered
        ),
        Language::En => format!(
            " (n users={}, n critics={}, titles considered={})",
            stats.user_count_sum, stats.critic_count_sum, stats.titles_considered
        ),
    };
    let combo = match (fmt_opt(stats.combo_score), language) {
        (Some(c), Language::Pt) => format!(" Nota combinada: {}.", c),
        (Some(c), Language::En) => format!(" Combined score: {}.", c),
        (None, _) => String::new(),
    };
    match language {
        Language::Pt => format!("Para {}, {}{}.{}", family, core, counts, combo),
        Language::En => format!("For {}, {}{}.{}", family, core, counts, combo),
    }
}

fn render_title_lookup(plan: &QueryPlan, metric_label: &str, result: &ResultSet) -> String {
    let language = plan.language;
    let title = plan.entity_text().unwrap_or_default();
    let field = plan.lookup.unwrap_or_default();
    let missing = match language {
        Language::Pt => format!("Não encontrei essa informação para {}.", title),
        Language::En => format!("I could not find that information for {}.", title),
    };

    match field {
        LookupField::ReleaseYear | LookupField::Sales => {
            let Some(value) = result.first_value(metric_label).and_then(fmt_number) else {
                return missing;
            };
            let sales_metric = if plan.metric.is_sales() { plan.metric } else { Metric::GlobalSales };
            match (field, language) {
                (LookupField::ReleaseYear, Language::Pt) => format!("{} foi lançado em {}.", title, value),
                (LookupField::ReleaseYear, Language::En) => format!("{} was released in {}.", title, value),
                (_, Language::Pt) => format!(
                    "{} vendeu {} milhões de unidades ({}).",
                    title,
                    value,
                    sales_metric.display_name(language)
                ),
                (_, Language::En) => format!(
                    "{} sold {} million units ({}).",
                    title,
                    value,
                    sales_metric.display_name(language)
                ),
            }
        }
        LookupField::Platforms | LookupField::Publisher | LookupField::Developer | LookupField::Genre => {
            let values: Vec<String> = result
                .column_values(metric_label)
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| v.to_string())
                .collect();
            if values.is_empty() {
                return missing;
            }
            let list = values.join(", ");
            match (field, language) {
                (LookupField::Platforms, Language::Pt) => format!("{} está disponível em: {}.", title, list),
                (LookupField::Platforms, Language::En) => format!("{} is available on: {}.", title, list),
                (LookupField::Publisher, Language::Pt) => format!("{} foi publicado por {}.", title, list),
                (LookupField::Publisher, Language::En) => format!("{} was published by {}.", title, list),
                (LookupField::Developer, Language::Pt) => format!("{} foi desenvolvido por {}.", title, list),
                (LookupField::Developer, Language::En) => format!("{} was developed by {}.", title, list),
                (_, Language::Pt) => format!("{} é do gênero {}.", title, list),
                (_, Language::En) => format!("{} belongs to the {} genre.", title, list),
            }
        }
    }
}

fn render_aggregate(plan: &QueryPlan, result: &ResultSet) -> String {
    let language = plan.language;
    let mut scope = scope_phrase(plan, language);
    if let Some(entity) = plan.entity_text() {
        scope.push_str(&match language {
            Language::Pt => format!(" para '{}'", entity),
            Language::En => format!(" for '{}'", entity),
        });
    }
    let metric = plan.metric.display_name(language);
    let cell = |col: usize| result.rows.first().and_then(|r| r.get(col)).and_then(fmt_number);

    match plan.aggregate.unwrap_or(AggregateFunc::Count) {
        AggregateFunc::Count => {
            let n = cell(0).unwrap_or_else(|| "0".to_string());
            match language {
                Language::Pt => format!("Encontrei {} jogos{}.", n, scope),
                Language::En => format!("I found {} games{}.", n, scope),
            }
        }
        AggregateFunc::Avg => match (cell(0), cell(1), language) {
            (Some(avg), n, Language::Pt) => format!(
                "A média de {}{} é {} (com base em {} jogos).",
                metric,
                scope,
                avg,
                n.unwrap_or_else(|| "0".to_string())
            ),
            (Some(avg), n, Language::En) => format!(
                "The average {}{} is {} (based on {} games).",
                metric,
                scope,
                avg,
                n.unwrap_or_else(|| "0".to_string())
            ),
            (None, _, Language::Pt) => format!("Não há {} registrada{}.", metric, scope),
            (None, _, Language::En) => format!("There is no recorded {}{}.", metric, scope),
        },
        AggregateFunc::Sum => {
            let sales_metric = if plan.metric.is_sales() { plan.metric } else { Metric::GlobalSales };
            let metric = sales_metric.display_name(language);
            let total = cell(0).unwrap_or_else(|| "0.00".to_string());
            let n = cell(1).unwrap_or_else(|| "0".to_string());
            match language {
                Language::Pt => format!("O total de {}{} é {} milhões ({} jogos).", metric, scope, total, n),
                Language::En => format!("Total {}{} is {} million ({} games).", metric, scope, total, n),
            }
        }
    }
}

fn render_total_sales(plan: &QueryPlan, result: &ResultSet) -> String {
    let language = plan.language;
    let family = entity_label(plan, language);
    let entries = result.value(0, "Entries").and_then(Value::as_i64).unwrap_or(0);
    if entries == 0 {
        return match language {
            Language::Pt => format!("Não consegui calcular as vendas totais de {}.", family),
            Language::En => format!("I could not compute total sales for {}.", family),
        };
    }
    let sales = |column: GameColumn| {
        result
            .value(0, column.name())
            .and_then(fmt_number)
            .unwrap_or_else(|| "0.00".to_string())
    };
    let (g, na, eu, jp, ot) = (
        sales(GameColumn::GlobalSales),
        sales(GameColumn::NaSales),
        sales(GameColumn::EuSales),
        sales(GameColumn::JpSales),
        sales(GameColumn::OtherSales),
    );
    match language {
        Language::Pt => format!(
            "A franquia {} soma {} milhões globalmente (NA {}, EU {}, JP {}, Outros {}; títulos considerados={}).",
            family, g, na, eu, jp, ot, entries
        ),
        Language::En => format!(
            "The {} franchise totals {} million globally (NA {}, EU {}, JP {}, Other {}; titles considered={}).",
            family, g, na, eu, jp, ot, entries
        ),
    }
}

fn render_summary(plan: &QueryPlan, result: &ResultSet) -> String {
    let language = plan.language;
    let scope = scope_phrase(plan, language);
    let get = |column: &str| result.value(0, column).and_then(fmt_number);
    let entries = get("Entries").unwrap_or_else(|| "0".to_string());
    let mut text = match language {
        Language::Pt => format!("A base tem {} entradas{}", entries, scope),
        Language::En => format!("The dataset has {} entries{}", entries, scope),
    };
    if let (Some(first), Some(last)) = (get("First_Year"), get("Last_Year")) {
        text.push_str(&match language {
            Language::Pt => format!(", de {} a {}", first, last),
            Language::En => format!(", from {} to {}", first, last),
        });
    }
    if let Some(global) = get("Global_Sales") {
        text.push_str(&match language {
            Language::Pt => format!(", somando {} milhões em vendas globais", global),
            Language::En => format!(", totalling {} million in global sales", global),
        });
    }
    text.push('.');
    let critic = get("Avg_Critic_Score");
    let user = get("Avg_User_Score");
    match (critic, user, language) {
        (Some(c), Some(u), Language::Pt) => text.push_str(&format!(" Média da crítica {} e dos usuários {}.", c, u)),
        (Some(c), Some(u), Language::En) => text.push_str(&format!(" Average critic score {} and user score {}.", c, u)),
        (Some(c), None, Language::Pt) => text.push_str(&format!(" Média da crítica {}.", c)),
        (Some(c), None, Language::En) => text.push_str(&format!(" Average critic score {}.", c)),
        (None, Some(u), Language::Pt) => text.push_str(&format!(" Média dos usuários {}.", u)),
        (None, Some(u), Language::En) => text.push_str(&format!(" Average user score {}.", u)),
        (None, None, _) => {}
    }
    text
}

pub fn render_out_of_scope(language: Language) -> String {
    match language {
        Language::Pt => format!(
            "Sua pergunta parece estar fora do escopo deste app (focado em dados de videogames). Tente: {}.",
            quoted_examples(EXAMPLE_QUESTIONS_PT)
        ),
        Language::En => format!(
            "Your question seems to be outside the scope of this app (focused on video game data). Try: {}.",
            quoted_examples(EXAMPLE_QUESTIONS_EN)
        ),
    }
}

fn quoted_examples(examples: &[&str]) -> String {
    examples.iter().map(|e| format!("'{}'", e)).collect::<Vec<_>>().join(", ")
}

pub fn render_not_found(term: &str, suggestions: &[String], language: Language) -> String {
    let term = if term.trim().is_empty() {
        match language {
            Language::Pt => "o título",
            Language::En => "the title",
        }
    } else {
        term.trim()
    };
    if suggestions.is_empty() {
        return match language {
            Language::Pt => format!(
                "Não encontrei '{}' na base. Se quiser, refaça a busca com outra grafia ou peça um ranking/estatística geral.",
                term
            ),
            Language::En => format!(
                "I could not find '{}' in the dataset. Try another spelling or ask for a general ranking or statistic.",
                term
            ),
        };
    }
    let listed = suggestions.iter().take(5).cloned().collect::<Vec<_>>().join("; ");
    match language {
        Language::Pt => format!(
            "Não encontrei '{}' na base. Tente um dos títulos parecidos: {}. Você também pode refazer a busca com outro nome ou parte do nome.",
            term, listed
        ),
        Language::En => format!(
            "I could not find '{}' in the dataset. Try one of the similar titles: {}. You can also search again with another name or part of the name.",
            term, listed
        ),
    }
}

pub fn render_apology(language: Language) -> String {
    match language {
        Language::Pt => {
            "Desculpe, não consegui responder a essa pergunta agora. Tente reformulá-la ou peça um ranking/estatística geral."
                .to_string()
        }
        Language::En => {
            "Sorry, I could not answer that question right now. Try rephrasing it or ask for a general ranking or statistic."
                .to_string()
        }
    }
}
