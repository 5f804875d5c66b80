//! Relevance scoring and ranking.
//!
//! relevance(article) = Σ weight(article, token) over the requested tokens,
//! with unknown categories contributing 0. Articles with relevance > 0 are
//! ranked by a stable descending sort and the first [`MAX_RECOMMENDATIONS`]
//! are returned.

use serde::Serialize;
use tracing::debug;

use crate::dataset::{Article, Dataset};

pub const MAX_RECOMMENDATIONS: usize = 30;
pub const NO_RECOMMENDATIONS_MESSAGE: &str = "No recommendations found.";

/// Path segment preceding the article slug in encyclopedia URLs.
pub const ARTICLE_PATH_MARKER: &str = "/wiki/";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// 1-based row of the article in the full dataset, not its rank.
    pub pageid: usize,
    pub title: String,
    #[serde(rename = "relatedCategories")]
    pub related_categories: Vec<String>,
    pub cleanup_messages: Vec<String>,
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecommendationResult {
    Found { recommendations: Vec<Recommendation> },
    Empty { message: String },
}

impl RecommendationResult {
    pub fn empty() -> Self {
        Self::Empty {
            message: NO_RECOMMENDATIONS_MESSAGE.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Found { recommendations } => recommendations.len(),
            Self::Empty { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split on `,` and trim. Duplicates are kept; each one counts again.
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',').map(|t| t.trim().to_string()).collect()
}

/// Sum of the article's weights over `selected` (one term per token).
pub fn relevance(article: &Article, selected: &[String]) -> f64 {
    selected
        .iter()
        .map(|c| article.category_percentages.get(c).unwrap_or(0.0))
        .sum()
}

/// Human title from an article URL: slug after the last `/wiki/`,
/// percent-decoded, underscores as spaces. URLs without the marker are
/// decoded whole.
pub fn title_from_url(url: &str) -> String {
    let slug = url
        .rsplit_once(ARTICLE_PATH_MARKER)
        .map_or(url, |(_, tail)| tail);
    let bytes = urlencoding::decode_binary(slug.as_bytes());
    String::from_utf8_lossy(&bytes).replace('_', " ")
}

/// Two decimals, exact halves to even.
fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Score, filter, rank and shape the response for a raw `categories` value.
pub fn recommend(dataset: &Dataset, raw_categories: &str) -> RecommendationResult {
    let selected = parse_categories(raw_categories);

    let mut scored: Vec<(usize, f64)> = dataset
        .articles()
        .iter()
        .enumerate()
        .map(|(idx, a)| (idx, relevance(a, &selected)))
        .filter(|(_, r)| *r > 0.0)
        .collect();

    // `sort_by` is stable: equal scores keep dataset order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(MAX_RECOMMENDATIONS);

    debug!(
        tokens = selected.len(),
        returned = scored.len(),
        "recommendations computed"
    );

    if scored.is_empty() {
        return RecommendationResult::empty();
    }

    let articles = dataset.articles();
    let recommendations = scored
        .into_iter()
        .map(|(idx, score)| {
            let a = &articles[idx];
            Recommendation {
                pageid: idx + 1,
                title: title_from_url(&a.url),
                related_categories: a.category_percentages.keys().map(str::to_string).collect(),
                cleanup_messages: a.cleanup_message.clone(),
                relevance: round2(score),
            }
        })
        .collect();

    RecommendationResult::Found { recommendations }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(slug: &str, weights: &[(&str, f64)]) -> Article {
        Article {
            url: format!("https://en.wikipedia.org/wiki/{slug}"),
            category_percentages: weights.iter().map(|(k, v)| (*k, *v)).collect(),
            cleanup_message: vec![format!("{slug} needs work")],
        }
    }

    fn abc() -> Dataset {
        Dataset::from_articles(vec![
            article("A", &[("Science", 80.0), ("History", 10.0)]),
            article("B", &[("History", 50.0)]),
            article("C", &[]),
        ])
    }

    fn found(res: RecommendationResult) -> Vec<Recommendation> {
        match res {
            RecommendationResult::Found { recommendations } => recommendations,
            RecommendationResult::Empty { message } => panic!("expected results, got {message}"),
        }
    }

    #[test]
    fn parse_categories_trims_and_keeps_duplicates() {
        assert_eq!(
            parse_categories(" Science , History,Science"),
            vec!["Science", "History", "Science"]
        );
        assert_eq!(parse_categories(""), vec![""]);
    }

    #[test]
    fn ranks_by_cumulative_relevance() {
        let recs = found(recommend(&abc(), "Science,History"));
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title, "A");
        assert_eq!(recs[0].relevance, 90.0);
        assert_eq!(recs[0].related_categories, vec!["Science", "History"]);
        assert_eq!(recs[0].cleanup_messages, vec!["A needs work"]);
        assert_eq!(recs[1].title, "B");
        assert_eq!(recs[1].relevance, 50.0);
    }

    #[test]
    fn no_overlap_yields_message() {
        let res = recommend(&abc(), "Art");
        assert_eq!(res, RecommendationResult::empty());
        assert_eq!(
            serde_json::to_value(&res).unwrap(),
            serde_json::json!({ "message": "No recommendations found." })
        );
    }

    #[test]
    fn duplicate_tokens_count_twice() {
        let recs = found(recommend(&abc(), "History,History"));
        assert_eq!(recs[0].title, "B");
        assert_eq!(recs[0].relevance, 100.0);
        assert_eq!(recs[1].title, "A");
        assert_eq!(recs[1].relevance, 20.0);
    }

    #[test]
    fn unknown_category_contributes_nothing() {
        let ds = abc();
        let with = found(recommend(&ds, "History,Nonexistent"));
        let without = found(recommend(&ds, "History"));
        assert_eq!(with, without);
    }

    #[test]
    fn pageid_is_dataset_row_not_rank() {
        let ds = Dataset::from_articles(vec![
            article("Low", &[("X", 1.0)]),
            article("Zero", &[("Y", 5.0)]),
            article("High", &[("X", 9.0)]),
        ]);
        let recs = found(recommend(&ds, "X"));
        assert_eq!(recs[0].title, "High");
        assert_eq!(recs[0].pageid, 3);
        assert_eq!(recs[1].title, "Low");
        assert_eq!(recs[1].pageid, 1);
    }

    #[test]
    fn ties_keep_dataset_order() {
        let ds = Dataset::from_articles(
            (0..6)
                .map(|i| article(&format!("T{i}"), &[("X", if i % 2 == 0 { 5.0 } else { 7.0 })]))
                .collect(),
        );
        let titles: Vec<String> = found(recommend(&ds, "X"))
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["T1", "T3", "T5", "T0", "T2", "T4"]);
    }

    #[test]
    fn results_capped_and_non_increasing() {
        let ds = Dataset::from_articles(
            (0..45)
                .map(|i| article(&format!("N{i}"), &[("X", (i % 7) as f64)]))
                .collect(),
        );
        let qualifying = ds
            .articles()
            .iter()
            .filter(|a| a.category_percentages.get("X").unwrap_or(0.0) > 0.0)
            .count();
        assert!(qualifying > MAX_RECOMMENDATIONS);

        let recs = found(recommend(&ds, "X"));
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert!(recs.iter().all(|r| r.relevance > 0.0));
        assert!(recs.windows(2).all(|w| w[0].relevance >= w[1].relevance));

        let small = found(recommend(&abc(), "Science"));
        assert_eq!(small.len(), 1);
    }

    #[test]
    fn negative_weights_are_not_rejected() {
        let ds = Dataset::from_articles(vec![article("Neg", &[("X", -3.0), ("Y", 4.0)])]);
        assert!(recommend(&ds, "X").is_empty());
        let recs = found(recommend(&ds, "X,Y"));
        assert_eq!(recs[0].relevance, 1.0);
    }

    #[test]
    fn relevance_rounded_to_two_places() {
        let ds = Dataset::from_articles(vec![article("R", &[("X", 33.3333), ("Y", 0.005)])]);
        let recs = found(recommend(&ds, "X"));
        assert_eq!(recs[0].relevance, 33.33);
    }

    #[test]
    fn exact_halves_round_to_even() {
        let ds = Dataset::from_articles(vec![article("H", &[("X", 12.125), ("Y", 0.375)])]);
        assert_eq!(found(recommend(&ds, "X"))[0].relevance, 12.12);
        assert_eq!(found(recommend(&ds, "Y"))[0].relevance, 0.38);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(-0.125), -0.12);
    }

    #[test]
    fn title_is_decoded_slug() {
        assert_eq!(
            title_from_url("https://en.wikipedia.org/wiki/Foo_Bar%27s"),
            "Foo Bar's"
        );
        assert_eq!(
            title_from_url("https://en.wikipedia.org/wiki/Caf%C3%A9_de_Flore"),
            "Café de Flore"
        );
        assert_eq!(
            title_from_url("https://x.org/wiki/Outer/wiki/Inner_Page"),
            "Inner Page"
        );
        assert_eq!(title_from_url("Plain_Name"), "Plain Name");
    }

    #[test]
    fn serializes_with_camel_case_related_categories() {
        let recs = found(recommend(&abc(), "History"));
        let v = serde_json::to_value(&recs[0]).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "pageid": 2,
                "title": "B",
                "relatedCategories": ["History"],
                "cleanup_messages": ["B needs work"],
                "relevance": 50.0
            })
        );
    }
}
