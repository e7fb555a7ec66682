//! Keyword frequency over headlines

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::data::Headline;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "also", "am",
    "among", "an", "and", "any", "are", "as", "at", "be", "because", "been", "before",
    "being", "below", "between", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "down", "during", "each", "either", "else", "etc", "ever", "every",
    "few", "for", "from", "further", "get", "had", "has", "have", "having", "he", "her",
    "here", "hers", "him", "his", "how", "however", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "last", "least", "less", "many", "may", "me", "might",
    "more", "most", "much", "must", "my", "neither", "next", "no", "nor", "not", "now",
    "of", "off", "on", "once", "one", "only", "or", "other", "our", "ours", "out", "over",
    "own", "per", "same", "she", "should", "since", "so", "some", "still", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "two", "under", "until", "up", "upon", "us", "very", "via",
    "was", "we", "well", "were", "what", "when", "where", "whether", "which", "while",
    "who", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet",
    "you", "your", "yours",
];

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b")
        .expect("Failed to compile TOKEN regex - this is a bug in the hardcoded pattern");
    static ref STOP_SET: HashSet<&'static str> = STOP_WORDS.iter().copied().collect();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// Lowercase tokens of two or more word characters, stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !STOP_SET.contains(*t))
        .map(str::to_string)
        .collect()
}

/// Most frequent keywords across all headlines, ties broken alphabetically
pub fn top_keywords(headlines: &[Headline], top_n: usize) -> Vec<KeywordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for h in headlines {
        for token in tokenize(&h.headline) {
            *counts.entry(token).or_default() += 1;
        }
    }

    let mut ranked: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount { keyword, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let tokens = tokenize("The Stock is UP a 5% on Q2 earnings");
        assert_eq!(tokens, vec!["stock", "q2", "earnings"]);
    }

    #[test]
    fn test_top_keywords() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date");
        let headlines = vec![
            Headline::on_date("AAPL", date, "Stocks that hit 52-week highs"),
            Headline::on_date("AAPL", date, "Stocks moving in premarket"),
            Headline::on_date("AAPL", date, "Earnings scheduled for stocks"),
        ];
        let top = top_keywords(&headlines, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], KeywordCount { keyword: "stocks".into(), count: 3 });
        assert_eq!(top[1].count, 1);
        assert_eq!(top[1].keyword, "52");
    }
}
