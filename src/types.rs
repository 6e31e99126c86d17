//! Public types for the paperdb pipeline.
//!
//! These types are self-contained with no external dependencies beyond serde.
//! The JSONL field names are stable: files written by one release are
//! readable by the next.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tag added to records that can never be fallback-matched during
/// deduplication (no external ids and no known year). Surfaced instead of
/// silently merging or dropping.
pub const UNVERIFIED_DUPLICATE_RISK: &str = "unverified-duplicate-risk";

/// Upstream API a raw record came from.
///
/// Trust order for merge conflicts: `s2 > crossref > openalex > arxiv`.
/// Semantic Scholar aggregates and curates, CrossRef is publisher-fed,
/// OpenAlex is broad but noisier, arXiv metadata is author-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Source {
    S2,
    Arxiv,
    #[cfg_attr(feature = "cli", value(name = "openalex"))]
    OpenAlex,
    Crossref,
}

impl Source {
    /// The `source_tags` string for this source.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::S2 => "s2",
            Self::Arxiv => "arxiv",
            Self::OpenAlex => "openalex",
            Self::Crossref => "crossref",
        }
    }

    /// Merge-conflict priority; higher wins.
    pub fn trust_rank(&self) -> u8 {
        match self {
            Self::S2 => 3,
            Self::Crossref => 2,
            Self::OpenAlex => 1,
            Self::Arxiv => 0,
        }
    }

    /// Parse from string (case-insensitive, accepts common aliases).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "s2" | "semantic_scholar" | "semanticscholar" => Some(Self::S2),
            "arxiv" => Some(Self::Arxiv),
            "openalex" => Some(Self::OpenAlex),
            "crossref" => Some(Self::Crossref),
            _ => None,
        }
    }

    /// Trust rank of a merged record: the best rank among its source tags.
    /// Tags that are not source names (flags, user labels) are ignored.
    pub fn best_rank(tags: &BTreeSet<String>) -> u8 {
        tags.iter()
            .filter_map(|t| Self::from_str_loose(t))
            .map(|s| s.trust_rank())
            .max()
            .unwrap_or(0)
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Identifier scheme used as a deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    Doi,
    Arxiv,
    S2,
    OpenAlex,
}

/// One canonical bibliographic entry, possibly assembled from multiple
/// source observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title. Required at ingest; tolerated empty on load so that
    /// export can surface (rather than reject) hand-edited records.
    #[serde(default)]
    pub title: String,
    /// Authors in source order, original Unicode preserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Publication year; unknown is explicit, never 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Journal or conference name as reported upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    /// Abstract text, whitespace-normalized.
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// Citation count; 0 when unknown. Merged as max across sources.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub citation_count: u32,
    /// Normalized external identifiers (DOI lowercased, arXiv id
    /// version-stripped). Primary dedup keys.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_ids: BTreeMap<IdScheme, String>,
    /// Version suffix stripped from the arXiv id (`2401.12345v2` -> 2),
    /// kept so the versioned form can still be displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_version: Option<u32>,
    /// Landing page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Which upstream APIs contributed to this record, plus warning flags
    /// such as [`UNVERIFIED_DUPLICATE_RISK`].
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub source_tags: BTreeSet<String>,
    /// User labels added with `paperdb tag`.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Composite relevance score; derived at rank time, never authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Citation key assigned at export time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibtex_key: Option<String>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl PaperRecord {
    /// A minimal record with the given title. Used by tests and by callers
    /// building records programmatically.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            abstract_text: None,
            citation_count: 0,
            external_ids: BTreeMap::new(),
            arxiv_version: None,
            url: None,
            source_tags: BTreeSet::new(),
            tags: BTreeSet::new(),
            score: None,
            bibtex_key: None,
        }
    }

    /// The arXiv id with its version suffix reattached, for display.
    pub fn arxiv_id_display(&self) -> Option<String> {
        let id = self.external_ids.get(&IdScheme::Arxiv)?;
        match self.arxiv_version {
            Some(v) => Some(format!("{}v{}", id, v)),
            None => Some(id.clone()),
        }
    }

    /// Whether this record carries no external identifier at all.
    pub fn has_no_external_ids(&self) -> bool {
        self.external_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_str_loose() {
        assert_eq!(Source::from_str_loose("s2"), Some(Source::S2));
        assert_eq!(Source::from_str_loose("Semantic_Scholar"), Some(Source::S2));
        assert_eq!(Source::from_str_loose("arXiv"), Some(Source::Arxiv));
        assert_eq!(Source::from_str_loose("openalex"), Some(Source::OpenAlex));
        assert_eq!(Source::from_str_loose("CrossRef"), Some(Source::Crossref));
        assert_eq!(Source::from_str_loose("dblp"), None);
    }

    #[test]
    fn test_trust_order() {
        assert!(Source::S2.trust_rank() > Source::Crossref.trust_rank());
        assert!(Source::Crossref.trust_rank() > Source::OpenAlex.trust_rank());
        assert!(Source::OpenAlex.trust_rank() > Source::Arxiv.trust_rank());
    }

    #[test]
    fn test_best_rank_ignores_flags() {
        let mut tags = BTreeSet::new();
        tags.insert("arxiv".to_string());
        tags.insert(UNVERIFIED_DUPLICATE_RISK.to_string());
        assert_eq!(Source::best_rank(&tags), Source::Arxiv.trust_rank());

        tags.insert("s2".to_string());
        assert_eq!(Source::best_rank(&tags), Source::S2.trust_rank());
    }

    #[test]
    fn test_arxiv_id_display_reattaches_version() {
        let mut rec = PaperRecord::new("A Paper");
        rec.external_ids
            .insert(IdScheme::Arxiv, "2401.12345".to_string());
        assert_eq!(rec.arxiv_id_display().as_deref(), Some("2401.12345"));

        rec.arxiv_version = Some(2);
        assert_eq!(rec.arxiv_id_display().as_deref(), Some("2401.12345v2"));
    }

    #[test]
    fn test_jsonl_roundtrip_is_stable() {
        let mut rec = PaperRecord::new("Attention Is All You Need");
        rec.authors = vec!["Ashish Vaswani".to_string()];
        rec.year = Some(2017);
        rec.citation_count = 50000;
        rec.external_ids
            .insert(IdScheme::Arxiv, "1706.03762".to_string());
        rec.source_tags.insert("arxiv".to_string());

        let line = serde_json::to_string(&rec).unwrap();
        let back: PaperRecord = serde_json::from_str(&line).unwrap();
        let line2 = serde_json::to_string(&back).unwrap();
        assert_eq!(line, line2);
        // Empty optional fields stay off the wire.
        assert!(!line.contains("bibtex_key"));
        assert!(!line.contains("score"));
    }
}
