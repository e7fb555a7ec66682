//! Publication activity over time and publisher email domains

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::data::Headline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub articles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub articles: usize,
}

/// Articles published per date, ascending by date
pub fn daily_article_counts(headlines: &[Headline]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for h in headlines {
        *counts.entry(h.date).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, articles)| DailyCount { date, articles })
        .collect()
}

/// Publishers that are email addresses, counted by domain
pub fn top_email_domains(headlines: &[Headline], top_n: usize) -> Vec<DomainCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for h in headlines {
        if let Some((_, domain)) = h.publisher.rsplit_once('@') {
            if !domain.is_empty() {
                *counts.entry(domain.to_lowercase()).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<DomainCount> = counts
        .into_iter()
        .map(|(domain, articles)| DomainCount { domain, articles })
        .collect();
    ranked.sort_by(|a, b| b.articles.cmp(&a.articles).then_with(|| a.domain.cmp(&b.domain)));
    ranked.truncate(top_n);
    ranked
}

/// Day with the most articles, earliest first on ties
pub fn peak_day(counts: &[DailyCount]) -> Option<&DailyCount> {
    counts
        .iter()
        .max_by(|a, b| a.articles.cmp(&b.articles).then_with(|| b.date.cmp(&a.date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_publisher(day: u32, publisher: &str) -> Headline {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).expect("valid date");
        let mut h = Headline::on_date("AAPL", date, "headline");
        h.publisher = publisher.to_string();
        h
    }

    #[test]
    fn test_daily_counts_sorted() {
        let headlines = vec![
            with_publisher(3, "A"),
            with_publisher(2, "A"),
            with_publisher(3, "B"),
        ];
        let counts = daily_article_counts(&headlines);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].articles, 1);
        assert_eq!(counts[1].articles, 2);
        assert_eq!(peak_day(&counts).map(|c| c.articles), Some(2));
        assert!(peak_day(&[]).is_none());
    }

    #[test]
    fn test_email_domains() {
        let headlines = vec![
            with_publisher(2, "jane@benzinga.com"),
            with_publisher(2, "joe@Benzinga.com"),
            with_publisher(2, "tips@gurufocus.com"),
            with_publisher(2, "Reuters"),
        ];
        let domains = top_email_domains(&headlines, 10);
        assert_eq!(domains[0], DomainCount { domain: "benzinga.com".into(), articles: 2 });
        assert_eq!(domains.len(), 2);
    }
}
