//! Paraphrase guard
//!
//! An oracle paraphrase replaces the deterministic answer only when it is
//! non-empty and every number it mentions already appears in that answer,
//! attached to the same title. A number belongs to the nearest title mentioned
//! before it; numbers inside a title ("FIFA 14") are part of the name.

use regex::Regex;
use std::sync::OnceLock;

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("static regex"))
}

fn parse_number(text: &str) -> Option<f64> {
    text.replace(',', ".").parse::<f64>().ok()
}

/// Numbers mentioned in a text; a decimal comma reads as a decimal point
pub fn extract_numbers(text: &str) -> Vec<f64> {
    number_regex()
        .find_iter(text)
        .filter_map(|m| parse_number(m.as_str()))
        .collect()
}

/// A number and the index of the title it follows, if any
#[derive(Clone, Copy, Debug, PartialEq)]
struct Fact {
    title: Option<usize>,
    value: f64,
}

/// Non-overlapping title mentions as (start, end, title index), leftmost first
fn title_spans(lowered: &str, titles: &[String]) -> Vec<(usize, usize, usize)> {
    let mut spans: Vec<(usize, usize, usize)> = titles
        .iter()
        .enumerate()
        .filter(|(_, title)| !title.trim().is_empty())
        .flat_map(|(idx, title)| {
            let needle = title.to_lowercase();
            lowered
                .match_indices(needle.as_str())
                .map(|(start, m)| (start, start + m.len(), idx))
                .collect::<Vec<_>>()
        })
        .collect();
    // Longest mention wins at a shared start
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut kept: Vec<(usize, usize, usize)> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().map_or(true, |last| span.0 >= last.1) {
            kept.push(span);
        }
    }
    kept
}

fn facts(text: &str, titles: &[String]) -> Vec<Fact> {
    let lowered = text.to_lowercase();
    let spans = title_spans(&lowered, titles);
    number_regex()
        .find_iter(&lowered)
        .filter(|m| !spans.iter().any(|(start, end, _)| m.start() >= *start && m.start() < *end))
        .filter_map(|m| {
            let title = spans
                .iter()
                .filter(|(_, end, _)| *end <= m.start())
                .last()
                .map(|(_, _, idx)| *idx);
            parse_number(m.as_str()).map(|value| Fact { title, value })
        })
        .collect()
}

/// True when `candidate` may stand in for `deterministic`. `titles` are the
/// names listed in the result; with none, any known number is accepted anywhere.
pub fn accept_paraphrase(deterministic: &str, candidate: &str, titles: &[String]) -> bool {
    if candidate.trim().is_empty() {
        return false;
    }
    let allowed = facts(deterministic, titles);
    facts(candidate, titles).into_iter().all(|fact| {
        allowed
            .iter()
            .any(|known| known.title == fact.title && (known.value - fact.value).abs() < 1e-9)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("Top 3 em 2010: Wii – 82.53"), vec![3.0, 2010.0, 82.53]);
        assert_eq!(extract_numbers("média 8,25"), vec![8.25]);
        assert!(extract_numbers("sem números").is_empty());
    }

    #[test]
    fn test_rejects_new_numbers() {
        let answer = "Para Zelda, média ponderada da crítica 91.50 (títulos considerados=12).";
        assert!(accept_paraphrase(answer, "Zelda tem média 91,50 da crítica em 12 títulos.", &[]));
        assert!(accept_paraphrase(answer, "Zelda é muito bem avaliada pela crítica.", &[]));
        assert!(!accept_paraphrase(answer, "Zelda tem média 92 da crítica.", &[]));
        assert!(!accept_paraphrase(answer, "   ", &[]));
    }

    #[test]
    fn test_rejects_values_moved_to_another_title() {
        let names = titles(&["Kinect Adventures!", "Pokemon Black/White"]);
        let answer = "Top 2 por vendas globais em 2010: Kinect Adventures! (2010) – 21.82, Pokemon Black/White (2010) – 15.14.";

        let swapped = "Pokemon Black/White lidera com 21.82 milhões, seguido por Kinect Adventures! com 15.14.";
        assert!(!accept_paraphrase(answer, swapped, &names));

        let dropped = "Em 2010, Pokemon Black/White vendeu 21.82 milhões.";
        assert!(!accept_paraphrase(answer, dropped, &names));

        let faithful = "Em 2010, Kinect Adventures! vendeu 21,82 milhões e Pokemon Black/White 15,14.";
        assert!(accept_paraphrase(answer, faithful, &names));
    }

    #[test]
    fn test_numbers_inside_titles_are_not_facts() {
        let names = titles(&["FIFA 14", "Grand Theft Auto V"]);
        let answer = "Top 2 por vendas globais: Grand Theft Auto V – 49.92, FIFA 14 – 16.05.";
        assert!(accept_paraphrase(answer, "FIFA 14 somou 16.05, atrás de Grand Theft Auto V (49.92).", &names));
        assert!(!accept_paraphrase(answer, "FIFA 14 somou 49.92.", &names));
    }
}
