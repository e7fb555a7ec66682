//! Headline polarity scoring and per-day aggregation

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use super::validation::validate_sentiment_score;
use super::Headline;

/// Weighted polarity lexicon, tuned toward financial headlines
const LEXICON: &[(&str, f64)] = &[
    // positive
    ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("best", 1.0), ("better", 0.5),
    ("positive", 0.6), ("strong", 0.5), ("stronger", 0.5), ("strongest", 0.7),
    ("gain", 0.5), ("gains", 0.5), ("gained", 0.5), ("surge", 0.6), ("surges", 0.6),
    ("surged", 0.6), ("soar", 0.7), ("soars", 0.7), ("soared", 0.7), ("jump", 0.4),
    ("jumps", 0.4), ("jumped", 0.4), ("rally", 0.5), ("rallies", 0.5), ("rise", 0.3),
    ("rises", 0.3), ("rising", 0.3), ("rose", 0.3), ("up", 0.2), ("upgrade", 0.6),
    ("upgrades", 0.6), ("upgraded", 0.6), ("outperform", 0.6), ("outperforms", 0.6),
    ("beat", 0.5), ("beats", 0.5), ("record", 0.4), ("high", 0.16), ("higher", 0.25),
    ("bullish", 0.7), ("bull", 0.5), ("buy", 0.4), ("profit", 0.5), ("profits", 0.5),
    ("profitable", 0.6), ("growth", 0.5), ("grow", 0.4), ("grows", 0.4), ("boost", 0.5),
    ("boosts", 0.5), ("win", 0.6), ("wins", 0.6), ("success", 0.7), ("successful", 0.75),
    ("optimistic", 0.6), ("robust", 0.5), ("solid", 0.4), ("impressive", 0.8),
    ("breakout", 0.5), ("recover", 0.4), ("recovery", 0.4), ("rebound", 0.4),
    ("approval", 0.5), ("approved", 0.5), ("raises", 0.3), ("raised", 0.3),
    ("dividend", 0.2), ("top", 0.5), ("love", 0.5), ("happy", 0.8), ("nice", 0.6),
    ("new", 0.14), ("easy", 0.43), ("safe", 0.5), ("exciting", 0.6), ("attractive", 0.6),
    // negative
    ("bad", -0.7), ("worse", -0.4), ("worst", -1.0), ("poor", -0.4), ("negative", -0.3),
    ("weak", -0.4), ("weaker", -0.4), ("loss", -0.5), ("losses", -0.5), ("lose", -0.5),
    ("loses", -0.5), ("lost", -0.4), ("fall", -0.4), ("falls", -0.4), ("fell", -0.4),
    ("falling", -0.4), ("drop", -0.4), ("drops", -0.4), ("dropped", -0.4), ("plunge", -0.7),
    ("plunges", -0.7), ("plunged", -0.7), ("crash", -0.8), ("crashes", -0.8), ("slump", -0.6),
    ("slumps", -0.6), ("decline", -0.4), ("declines", -0.4), ("declined", -0.4),
    ("down", -0.16), ("downgrade", -0.6), ("downgrades", -0.6), ("downgraded", -0.6),
    ("underperform", -0.6), ("miss", -0.5), ("misses", -0.5), ("missed", -0.5),
    ("low", -0.2), ("lower", -0.25), ("bearish", -0.7), ("bear", -0.5), ("sell", -0.4),
    ("cut", -0.4), ("cuts", -0.4), ("layoffs", -0.6), ("lawsuit", -0.5), ("fraud", -0.9),
    ("probe", -0.4), ("investigation", -0.4), ("warning", -0.5), ("warns", -0.5),
    ("risk", -0.3), ("risky", -0.5), ("concern", -0.4), ("concerns", -0.4),
    ("fear", -0.6), ("fears", -0.6), ("volatile", -0.3), ("uncertainty", -0.4),
    ("bankruptcy", -0.9), ("default", -0.6), ("recall", -0.5), ("terrible", -1.0),
    ("awful", -1.0), ("disappointing", -0.6), ("sad", -0.5), ("hard", -0.29),
    ("wrong", -0.5), ("fail", -0.5), ("fails", -0.5), ("failed", -0.5), ("sinks", -0.5),
];

/// Multipliers applied to the next polar word
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3), ("extremely", 1.5), ("highly", 1.3), ("really", 1.2),
    ("strongly", 1.3), ("sharply", 1.4), ("significantly", 1.3), ("most", 1.2),
    ("slightly", 0.5), ("somewhat", 0.7), ("modestly", 0.6),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "nor", "without", "don't", "doesn't", "didn't", "isn't",
    "wasn't", "aren't", "won't", "can't", "cannot", "hardly",
];

/// Factor applied to a negated polar word
const NEGATION_FACTOR: f64 = -0.5;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z][a-z']*")
        .expect("Failed to compile WORD regex - this is a bug in the hardcoded pattern");
    static ref POLARITY: HashMap<&'static str, f64> = LEXICON.iter().copied().collect();
    static ref INTENSITY: HashMap<&'static str, f64> = INTENSIFIERS.iter().copied().collect();
}

/// Maps text to a polarity in [-1.0, 1.0]
pub trait PolarityScorer {
    fn polarity(&self, text: &str) -> f64;
}

/// Lexicon-based scorer with intensifier and negation handling
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let mut scores = Vec::new();
        let mut multiplier = 1.0;
        let mut negated = false;

        for token in WORD.find_iter(&lowered).map(|m| m.as_str()) {
            if let Some(factor) = INTENSITY.get(token) {
                multiplier *= factor;
                continue;
            }
            if NEGATORS.contains(&token) {
                negated = true;
                continue;
            }

            if let Some(&polarity) = POLARITY.get(token) {
                let mut score = polarity * multiplier;
                if negated {
                    score *= NEGATION_FACTOR;
                }
                scores.push(score.clamp(-1.0, 1.0));
            }
            multiplier = 1.0;
            negated = false;
        }

        if scores.is_empty() {
            return 0.0; // Neutral
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        if mean.is_finite() {
            mean.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Headline with its polarity score attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub date: NaiveDate,
    pub ticker: String,
    pub headline: String,
    pub sentiment: f64,
}

/// Mean headline sentiment for one (date, ticker)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub ticker: String,
    pub avg_sentiment: f64,
    pub headline_count: usize,
}

/// Score every headline. Out-of-range or non-finite scores are clamped to [-1, 1].
pub fn score_headlines<S: PolarityScorer + ?Sized>(headlines: &[Headline], scorer: &S) -> Vec<ScoredHeadline> {
    headlines
        .iter()
        .map(|h| {
            let raw = scorer.polarity(&h.headline);
            let sentiment = if validate_sentiment_score(raw) {
                raw
            } else {
                warn!(ticker = %h.ticker, score = raw, "Scorer returned out-of-range polarity");
                if raw.is_nan() {
                    0.0
                } else {
                    raw.clamp(-1.0, 1.0)
                }
            };
            ScoredHeadline {
                date: h.date,
                ticker: h.ticker.clone(),
                headline: h.headline.clone(),
                sentiment,
            }
        })
        .collect()
}

/// Average scores per (date, ticker), sorted by ticker then date.
///
/// Days without headlines are absent, not zero-filled.
pub fn aggregate_daily_sentiment(scored: &[ScoredHeadline]) -> Vec<DailySentiment> {
    let mut groups: BTreeMap<(String, NaiveDate), (f64, usize)> = BTreeMap::new();
    for s in scored {
        let entry = groups.entry((s.ticker.clone(), s.date)).or_insert((0.0, 0));
        entry.0 += s.sentiment;
        entry.1 += 1;
    }

    let daily: Vec<DailySentiment> = groups
        .into_iter()
        .map(|((ticker, date), (sum, count))| DailySentiment {
            date,
            ticker,
            avg_sentiment: sum / count as f64,
            headline_count: count,
        })
        .collect();

    info!(headlines = scored.len(), days = daily.len(), "Aggregated daily sentiment");
    daily
}

/// Score and aggregate in one step
pub fn daily_sentiment<S: PolarityScorer + ?Sized>(headlines: &[Headline], scorer: &S) -> Vec<DailySentiment> {
    aggregate_daily_sentiment(&score_headlines(headlines, scorer))
}

/// Interpret sentiment score as human-readable text
pub fn interpret_sentiment(score: f64) -> &'static str {
    if score > 0.5 {
        "Very Bullish"
    } else if score > 0.2 {
        "Bullish"
    } else if score > -0.2 {
        "Neutral"
    } else if score > -0.5 {
        "Bearish"
    } else {
        "Very Bearish"
    }
}
