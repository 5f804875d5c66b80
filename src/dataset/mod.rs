//! # Article dataset
//!
//! The pre-computed article table the recommender scores against. It is
//! loaded once at startup and never mutated afterwards; handlers share it
//! through `Arc<Dataset>`.
//!
//! - CSV (`.csv`): columns `url`, `category_percentages`, `cleanup_message`;
//!   any other columns are ignored. The two structured columns hold textual
//!   literals (see [`literal`]).
//! - JSON Lines (`.jsonl` / `.ndjson`): one object per line with the same
//!   fields. Structured fields may be native JSON or a literal string.
//!
//! Any unreadable file or unparsable cell fails the whole load.

pub mod literal;

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub use literal::LiteralError;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("reading dataset from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed JSON on line {line} of {path}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("row {row}: cannot parse column `{column}`: {source}")]
    Literal {
        row: usize,
        column: &'static str,
        #[source]
        source: LiteralError,
    },
    #[error("unsupported dataset format {0:?} (expected .csv, .jsonl or .ndjson)")]
    UnsupportedFormat(String),
}

/// Category name -> weight, in insertion order.
///
/// Maps are tiny (a handful of categories per article) so lookups scan a
/// `Vec`, which also keeps the on-disk key order for `relatedCategories`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryWeights(Vec<(String, f64)>);

impl CategoryWeights {
    /// Insert or overwrite. An existing key keeps its position.
    pub fn insert(&mut self, category: String, weight: f64) {
        match self.0.iter_mut().find(|(k, _)| *k == category) {
            Some(slot) => slot.1 = weight,
            None => self.0.push((category, weight)),
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(k, _)| k == category)
            .map(|(_, w)| *w)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for CategoryWeights {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut w = CategoryWeights::default();
        for (k, v) in iter {
            w.insert(k.into(), v);
        }
        w
    }
}

impl<'de> Deserialize<'de> for CategoryWeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WeightsVisitor;

        impl<'de> Visitor<'de> for WeightsVisitor {
            type Value = CategoryWeights;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a category -> weight map or its literal text")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                literal::parse_weights(v).map_err(E::custom)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut w = CategoryWeights::default();
                while let Some((k, v)) = map.next_entry::<String, f64>()? {
                    w.insert(k, v);
                }
                Ok(w)
            }
        }

        deserializer.deserialize_any(WeightsVisitor)
    }
}

/// Cleanup messages as either a JSON array or its literal text.
fn deserialize_messages<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    struct MessagesVisitor;

    impl<'de> Visitor<'de> for MessagesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of strings or its literal text")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            literal::parse_messages(v).map_err(E::custom)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(msg) = seq.next_element::<String>()? {
                out.push(msg);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(MessagesVisitor)
}

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Article {
    pub url: String,
    pub category_percentages: CategoryWeights,
    #[serde(deserialize_with = "deserialize_messages")]
    pub cleanup_message: Vec<String>,
}

/// CSV row before the structured columns are parsed.
#[derive(Debug, Deserialize)]
struct RawRow {
    url: String,
    category_percentages: String,
    cleanup_message: String,
}

/// Immutable article table; row order is the on-disk order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    articles: Vec<Article>,
}

impl Dataset {
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// Load from `path`, choosing the format by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let ds = match ext.as_str() {
            "csv" => Self::load_csv(path)?,
            "jsonl" | "ndjson" => Self::load_jsonl(path)?,
            other => return Err(DatasetError::UnsupportedFormat(other.to_string())),
        };

        info!(
            path = %path.display(),
            articles = ds.len(),
            categories = ds.categories().len(),
            "dataset loaded"
        );
        Ok(ds)
    }

    fn load_csv(path: &Path) -> Result<Self, DatasetError> {
        let file = fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);

        let mut articles = Vec::new();
        for (idx, row) in reader.deserialize::<RawRow>().enumerate() {
            let raw = row.map_err(|source| DatasetError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            articles.push(Article::from_raw(raw, idx + 1)?);
        }
        Ok(Self { articles })
    }

    fn load_jsonl(path: &Path) -> Result<Self, DatasetError> {
        let content = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut articles = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let article: Article =
                serde_json::from_str(line).map_err(|source| DatasetError::Json {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                })?;
            articles.push(article);
        }
        Ok(Self { articles })
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Distinct category names across all articles, sorted.
    pub fn categories(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .articles
            .iter()
            .flat_map(|a| a.category_percentages.keys())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }
}

impl Article {
    fn from_raw(raw: RawRow, row: usize) -> Result<Self, DatasetError> {
        let category_percentages =
            literal::parse_weights(&raw.category_percentages).map_err(|source| {
                DatasetError::Literal {
                    row,
                    column: "category_percentages",
                    source,
                }
            })?;
        let cleanup_message =
            literal::parse_messages(&raw.cleanup_message).map_err(|source| {
                DatasetError::Literal {
                    row,
                    column: "cleanup_message",
                    source,
                }
            })?;
        Ok(Self {
            url: raw.url,
            category_percentages,
            cleanup_message,
        })
    }
}
