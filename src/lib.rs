//! # paperdb
//!
//! Merge, deduplicate, rank, and export literature records.
//!
//! Provides:
//! - **Library**: pure pipeline stages over an in-memory record set
//! - **CLI**: `paperdb` binary (`merge`, `filter`, `stats`, `export`,
//!   `search`, `tag`, `add`)
//!
//! The pipeline is four composable stages over a JSONL database of
//! [`PaperRecord`]s:
//!
//! 1. **Ingest/normalize** ([`ingest`]): raw Semantic Scholar / arXiv /
//!    OpenAlex / CrossRef records into one canonical shape.
//! 2. **Deduplicate** ([`dedup`]): merge records that refer to the same
//!    paper, preferring the most trusted source per field.
//! 3. **Score & rank** ([`rank`]): composite relevance score from
//!    citations, recency, venue tier, and keyword hits.
//! 4. **Cite-key assign & export** ([`bibtex`]): deterministic citation
//!    keys and BibTeX serialization.
//!
//! ## Quick start
//!
//! ```
//! use paperdb::types::{IdScheme, PaperRecord};
//!
//! // The same paper seen by two sources: an arXiv preprint and the
//! // published version.
//! let mut preprint = PaperRecord::new("Attention Is All You Need");
//! preprint.year = Some(2017);
//! preprint.citation_count = 50000;
//! preprint.external_ids.insert(IdScheme::Arxiv, "1706.03762".to_string());
//! preprint.source_tags.insert("arxiv".to_string());
//!
//! let mut published = PaperRecord::new("Attention is all you need");
//! published.year = Some(2017);
//! published.citation_count = 48000;
//! published.venue = Some("NeurIPS".to_string());
//! published.source_tags.insert("s2".to_string());
//!
//! let merged = paperdb::dedup::dedup(vec![preprint, published]);
//! assert_eq!(merged.records.len(), 1);
//! assert_eq!(merged.records[0].citation_count, 50000);
//! assert_eq!(merged.records[0].venue.as_deref(), Some("NeurIPS"));
//! ```

pub mod bibtex;
pub mod db;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod rank;
pub mod stats;
pub mod types;

// Re-export key types at the crate root.
pub use error::{PaperDbError, Result};
pub use types::{IdScheme, PaperRecord, Source};
