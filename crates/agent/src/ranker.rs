//! Keyword ranking of inventory records against a free-text query.
//!
//! Scoring is two-tier: a term found in the product name is worth far more
//! than the same term found anywhere else in the record. Symptom words in the
//! query pull in the product names commonly sold for them, so "I have a
//! fever" still surfaces Panadol even though no product mentions "fever".

use pharmabot_config::RankingConfig;
use pharmabot_core::product::ProductRecord;
use serde::Serialize;

/// A record with the score it earned for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredMatch {
    pub score: u32,
    pub record: ProductRecord,
}

/// Scores and selects the top matching products. Pure: no I/O, no state.
#[derive(Debug, Clone)]
pub struct Ranker {
    config: RankingConfig,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// At most `max_results` records, most relevant first.
    pub fn rank(&self, query: &str, items: &[ProductRecord]) -> Vec<ProductRecord> {
        self.rank_scored(query, items)
            .into_iter()
            .map(|m| m.record)
            .collect()
    }

    /// Like [`rank`](Self::rank) but keeps the scores.
    pub fn rank_scored(&self, query: &str, items: &[ProductRecord]) -> Vec<ScoredMatch> {
        let terms = self.expand_terms(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<ScoredMatch> = items
            .iter()
            .filter_map(|record| {
                let score = self.score(&terms, record);
                (score > 0).then(|| ScoredMatch {
                    score,
                    record: record.clone(),
                })
            })
            .collect();

        // sort_by is stable: equal scores keep inventory order
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(self.config.max_results);
        matches
    }

    /// Query terms plus the expansions of every symptom the query mentions.
    /// Duplicates are dropped, first occurrence wins.
    pub fn expand_terms(&self, query: &str) -> Vec<String> {
        let normalized = query.trim().to_lowercase();

        let mut terms: Vec<String> = Vec::new();
        let mut push = |term: &str| {
            if !term.is_empty() && !terms.iter().any(|t| t == term) {
                terms.push(term.to_string());
            }
        };

        for word in normalized.split_whitespace() {
            push(word);
        }

        for (symptom, expansion) in &self.config.symptom_expansions {
            if !mentions_keyword(&normalized, symptom) {
                continue;
            }
            for term in expansion {
                push(&term.to_lowercase());
            }
        }

        terms
    }

    /// Sum of per-term points for one record.
    pub fn score(&self, terms: &[String], record: &ProductRecord) -> u32 {
        let name = record.name().to_lowercase();
        let blob = record.text_blob().to_lowercase();

        terms
            .iter()
            .map(|term| {
                if name.contains(term.as_str()) {
                    self.config.name_weight
                } else if blob.contains(term.as_str()) {
                    self.config.body_weight
                } else {
                    0
                }
            })
            .fold(0u32, u32::saturating_add)
    }
}

/// Whether `keyword` occurs in `query` as whole words, case-insensitively.
/// Punctuation around query words is ignored and a trailing plural "s" is
/// accepted, so "headaches?" mentions "headache" but "spain" does not
/// mention "pain".
pub fn mentions_keyword(query: &str, keyword: &str) -> bool {
    let query = query.to_lowercase();
    let keyword = keyword.to_lowercase();

    let words: Vec<&str> = query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();
    let wanted: Vec<&str> = keyword.split_whitespace().collect();
    if wanted.is_empty() {
        return false;
    }

    words.windows(wanted.len()).any(|window| {
        window
            .iter()
            .zip(&wanted)
            .all(|(word, want)| word == want || word.strip_suffix('s') == Some(*want))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn product(value: serde_json::Value) -> ProductRecord {
        ProductRecord::from_value(value).unwrap()
    }

    fn named(name: &str) -> ProductRecord {
        product(json!({ "item_name": name }))
    }

    fn plain_ranker() -> Ranker {
        Ranker::new(RankingConfig {
            symptom_expansions: BTreeMap::new(),
            ..RankingConfig::default()
        })
    }

    #[test]
    fn no_matches_is_empty() {
        let items = vec![named("Panadol Advance"), named("Toothbrush")];
        assert!(Ranker::default().rank("zzzz", &items).is_empty());
    }

    #[test]
    fn empty_query_and_empty_inventory() {
        let items = vec![named("Panadol Advance")];
        assert!(Ranker::default().rank("", &items).is_empty());
        assert!(Ranker::default().rank("   ", &items).is_empty());
        assert!(Ranker::default().rank("fever", &[]).is_empty());
    }

    #[test]
    fn never_more_than_max_results() {
        let items: Vec<_> = (0..20).map(|i| named(&format!("Vitamin C {i}"))).collect();
        let ranked = Ranker::default().rank("vitamin", &items);
        assert_eq!(ranked.len(), 6);

        let small = Ranker::new(RankingConfig {
            max_results: 2,
            ..RankingConfig::default()
        });
        assert_eq!(small.rank("vitamin", &items).len(), 2);
    }

    #[test]
    fn name_hits_outrank_body_hits() {
        let items = vec![
            product(json!({ "item_name": "Multivitamin", "description": "contains zinc" })),
            named("Zinc Tablets"),
        ];
        let scored = plain_ranker().rank_scored("zinc", &items);
        assert_eq!(scored[0].record.name(), "Zinc Tablets");
        assert_eq!(scored[0].score, 15);
        assert_eq!(scored[1].score, 2);
    }

    #[test]
    fn ordering_is_non_increasing_and_stable() {
        let items = vec![
            named("Omega 3"),
            named("Omega 3 Fish Oil"),
            named("Omega Kids"),
            named("Fish Oil"),
        ];
        let scored = plain_ranker().rank_scored("omega fish", &items);
        let scores: Vec<u32> = scored.iter().map(|m| m.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(scored[0].record.name(), "Omega 3 Fish Oil");
        // Three ties at 15 keep their inventory order
        let tied: Vec<String> = scored[1..].iter().map(|m| m.record.name()).collect();
        assert_eq!(tied, vec!["Omega 3", "Omega Kids", "Fish Oil"]);
    }

    #[test]
    fn fever_ranks_panadol_and_excludes_toothbrush() {
        let items = vec![named("Toothbrush"), named("Panadol Advance")];
        let ranked = Ranker::default().rank("I have a fever", &items);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name(), "Panadol Advance");
    }

    #[test]
    fn symptom_expansion_never_lowers_a_score() {
        let items = vec![
            named("Panadol Advance"),
            product(json!({ "item_name": "Adol Syrup", "category": "fever relief" })),
            named("Toothbrush"),
        ];
        let ranker = Ranker::default();
        let plain = plain_ranker();

        for record in &items {
            let with = ranker.score(&ranker.expand_terms("fever"), record);
            let without = plain.score(&plain.expand_terms("fever"), record);
            assert!(with >= without, "{} lost score", record.name());
        }
    }

    #[test]
    fn expand_terms_dedups_keeping_first() {
        let terms = Ranker::default().expand_terms("Panadol for fever and headache");
        assert_eq!(terms[0], "panadol");
        assert_eq!(terms.iter().filter(|t| *t == "panadol").count(), 1);
        assert!(terms.contains(&"ibuprofen".to_string()));
        assert!(terms.contains(&"aspirin".to_string()));
    }

    #[test]
    fn missing_fields_never_panic() {
        let items = vec![
            product(json!({})),
            product(json!({ "price": 10, "stock": null })),
            product(json!({ "item_name": null, "description": "panadol pack" })),
        ];
        let scored = plain_ranker().rank_scored("panadol", &items);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].score, 2);
    }

    #[test]
    fn symptoms_match_whole_words_only() {
        let ranker = Ranker::default();
        assert!(ranker.expand_terms("pain relief").contains(&"voltaren".to_string()));
        assert!(ranker.expand_terms("Headaches?").contains(&"aspirin".to_string()));
        assert!(!ranker.expand_terms("flights to spain").contains(&"voltaren".to_string()));
        assert!(!ranker.expand_terms("painting supplies").contains(&"voltaren".to_string()));
        assert!(!ranker.expand_terms("don't scold me").contains(&"otrivin".to_string()));
    }

    #[test]
    fn keyword_mentions() {
        assert!(mentions_keyword("My son has a FEVER.", "fever"));
        assert!(mentions_keyword("a sore throat since monday", "sore throat"));
        assert!(!mentions_keyword("sore, dry throat", "sore throat"));
        assert!(!mentions_keyword("anything", ""));
        assert!(mentions_keyword("عندي حمى", "حمى"));
    }

    #[test]
    fn huge_weights_saturate_instead_of_overflowing() {
        let ranker = Ranker::new(RankingConfig {
            name_weight: u32::MAX,
            body_weight: 1,
            symptom_expansions: BTreeMap::new(),
            ..RankingConfig::default()
        });
        let terms = ranker.expand_terms("omega fish oil");
        assert_eq!(ranker.score(&terms, &named("Omega Fish Oil")), u32::MAX);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let items = vec![named("STREPSILS Honey & Lemon")];
        assert_eq!(plain_ranker().rank("strepsils", &items).len(), 1);
        assert_eq!(plain_ranker().rank("Strepsils", &items).len(), 1);
    }
}
