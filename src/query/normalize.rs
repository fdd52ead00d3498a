//! Text folding shared by the classifier and the entity resolver.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-case and strip diacritics ("Média" -> "media", "Pokémon" -> "pokemon")
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split folded text into alphanumeric words
pub fn words(folded: &str) -> Vec<String> {
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// A question after folding, with its word sequence for whole-word matching.
#[derive(Clone, Debug)]
pub struct NormalizedText {
    /// Folded text with punctuation intact
    pub folded: String,
    /// Alphanumeric words of `folded`
    pub tokens: Vec<String>,
}

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let folded = fold(raw.trim());
        let tokens = words(&folded);
        Self { folded, tokens }
    }

    /// Token span `[start, end)` of the first whole-word occurrence of `term`
    pub fn find_term(&self, term: &str) -> Option<(usize, usize)> {
        let needle = words(&fold(term));
        if needle.is_empty() || needle.len() > self.tokens.len() {
            return None;
        }
        (0..=self.tokens.len() - needle.len())
            .find(|&i| self.tokens[i..i + needle.len()] == needle[..])
            .map(|i| (i, i + needle.len()))
    }

    /// Token span of the last whole-word occurrence of `term`
    pub fn rfind_term(&self, term: &str) -> Option<(usize, usize)> {
        let needle = words(&fold(term));
        if needle.is_empty() || needle.len() > self.tokens.len() {
            return None;
        }
        (0..=self.tokens.len() - needle.len())
            .rev()
            .find(|&i| self.tokens[i..i + needle.len()] == needle[..])
            .map(|i| (i, i + needle.len()))
    }

    pub fn has_term(&self, term: &str) -> bool {
        self.find_term(term).is_some()
    }

    pub fn has_any(&self, terms: &[&str]) -> bool {
        terms.iter().any(|t| self.has_term(t))
    }

    /// First term of `terms` present in the text
    pub fn first_of<'a>(&self, terms: &[&'a str]) -> Option<&'a str> {
        terms.iter().copied().find(|t| self.has_term(t))
    }

    /// Words joined with single spaces
    pub fn joined(&self) -> String {
        self.tokens.join(" ")
    }

    /// Words `[start, end)` joined with single spaces
    pub fn span(&self, start: usize, end: usize) -> String {
        self.tokens[start.min(self.tokens.len())..end.min(self.tokens.len())].join(" ")
    }

    /// True when the raw question used any non-ASCII letter (accents hint Portuguese)
    pub fn had_accents(raw: &str) -> bool {
        raw.chars().any(|c| c.is_alphabetic() && !c.is_ascii())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold("Média da FRANQUIA Pokémon"), "media da franquia pokemon");
        assert_eq!(fold("Japão"), "japao");
    }

    #[test]
    fn test_terms_match_whole_words_only() {
        let text = NormalizedText::new("Nada de vendas na América do Norte?");
        assert!(text.has_term("america do norte"));
        assert!(text.has_term("na"));
        assert!(!text.has_term("nad"));
        assert_eq!(text.find_term("vendas"), Some((2, 3)));
    }

    #[test]
    fn test_punctuation_splits_words() {
        let text = NormalizedText::new("best-selling games, 2005-2010");
        assert_eq!(text.tokens, vec!["best", "selling", "games", "2005", "2010"]);
        assert!(text.has_term("best selling"));
    }
}
