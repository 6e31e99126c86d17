//! Raw source record parsing.
//!
//! One serde struct per upstream API (Semantic Scholar, arXiv, OpenAlex,
//! CrossRef), each with its own mapping into the canonical [`PaperRecord`].
//! The structs accept both the raw API shapes and the flattened shapes the
//! search scripts write to JSONL (aliased field names, string-or-int years,
//! authors as strings or objects).
//!
//! Which mapping applies is decided by an explicit `source` discriminant on
//! the record (or a caller-supplied fallback), never by probing field names.

use crate::error::{PaperDbError, Result};
use crate::normalize;
use crate::types::{IdScheme, PaperRecord, Source};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of ingesting one JSONL file.
#[derive(Debug)]
pub struct FileIngest {
    pub records: Vec<PaperRecord>,
    /// Malformed records skipped (logged, never silently dropped).
    pub skipped: usize,
}

/// Ingest a whole JSONL file of raw source records.
///
/// Malformed records (missing title, unknown source) are skipped and
/// counted; a line that is not JSON at all is fatal for the file.
pub fn ingest_file(path: &Path, fallback: Option<Source>) -> Result<FileIngest> {
    let text =
        std::fs::read_to_string(path).map_err(|e| PaperDbError::io(path.to_path_buf(), e))?;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(line).map_err(|e| PaperDbError::InvalidLine {
                path: path.to_path_buf(),
                line: idx + 1,
                source: e,
            })?;
        match ingest_value(value, fallback) {
            Ok(record) => records.push(record),
            Err(e @ (PaperDbError::MalformedRecord(_) | PaperDbError::UnknownSource(_))) => {
                log::warn!("{}:{}: skipping: {}", path.display(), idx + 1, e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "loaded {} records from {} ({} skipped)",
        records.len(),
        path.display(),
        skipped
    );
    Ok(FileIngest { records, skipped })
}

/// Parse one raw JSON object into a canonical record.
///
/// Records that already carry `source_tags` are treated as canonical output
/// of a previous merge and pass through (derived fields cleared, so score
/// and citation key are always recomputed downstream).
pub fn ingest_value(value: Value, fallback: Option<Source>) -> Result<PaperRecord> {
    if value.get("source_tags").is_some() {
        let mut record: PaperRecord = serde_json::from_value(value)
            .map_err(|e| PaperDbError::MalformedRecord(format!("canonical record: {}", e)))?;
        if record.title.trim().is_empty() {
            return Err(PaperDbError::MalformedRecord(
                "missing or empty title".to_string(),
            ));
        }
        record.score = None;
        record.bibtex_key = None;
        return Ok(record);
    }

    let source = match value.get("source").and_then(Value::as_str) {
        Some(s) => Source::from_str_loose(s)
            .ok_or_else(|| PaperDbError::UnknownSource(s.to_string()))?,
        None => fallback.ok_or_else(|| {
            PaperDbError::MalformedRecord(
                "no `source` field and no --source fallback given".to_string(),
            )
        })?,
    };

    let record = match source {
        Source::S2 => from_value::<S2Document>(value, source)?.into_record()?,
        Source::Arxiv => from_value::<ArxivDocument>(value, source)?.into_record()?,
        Source::OpenAlex => from_value::<OpenAlexWork>(value, source)?.into_record()?,
        Source::Crossref => from_value::<CrossrefItem>(value, source)?.into_record()?,
    };
    Ok(record)
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value, source: Source) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| PaperDbError::MalformedRecord(format!("{} record: {}", source, e)))
}

fn require_title(title: Option<String>) -> Result<String> {
    let title = normalize::collapse_ws(&title.unwrap_or_default());
    if title.is_empty() {
        Err(PaperDbError::MalformedRecord(
            "missing or empty title".to_string(),
        ))
    } else {
        Ok(title)
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| normalize::collapse_ws(&v)).filter(|v| !v.is_empty())
}

/// Pull a year from the front of a date string ("2017-06-12", "2017/06").
fn year_from_date(s: &str) -> Option<i32> {
    let head: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if head.len() == 4 {
        head.parse().ok()
    } else {
        None
    }
}

/// Year fields arrive as integers, strings, full dates, or null.
fn de_opt_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().map(|y| y as i32),
        Value::String(s) => {
            let s = s.trim().to_string();
            s.parse::<i32>().ok().or_else(|| year_from_date(&s))
        }
        _ => None,
    }))
}

/// Citation counts arrive as integers, strings, or null; negatives clamp to 0.
fn de_opt_count<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().map(|c| c.max(0) as u32),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|c| c.max(0) as u32),
        _ => None,
    }))
}

/// An author entry: a plain name string, or an object from any of the APIs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorField {
    Name(String),
    Structured {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        given: Option<String>,
        #[serde(default)]
        family: Option<String>,
    },
}

impl AuthorField {
    fn into_name(self) -> Option<String> {
        let name = match self {
            Self::Name(s) => s,
            Self::Structured {
                name,
                display_name,
                given,
                family,
            } => name.or(display_name).or_else(|| match (given, family) {
                (Some(g), Some(f)) => Some(format!("{} {}", g, f)),
                (None, Some(f)) => Some(f),
                (Some(g), None) => Some(g),
                (None, None) => None,
            })?,
        };
        let name = normalize::collapse_ws(&name);
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// An author list: an array of entries, or a single pre-joined string
/// ("Family, Given and Family, Given").
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorsField {
    List(Vec<AuthorField>),
    Joined(String),
}

impl Default for AuthorsField {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl AuthorsField {
    fn into_names(self) -> Vec<String> {
        match self {
            Self::List(fields) => fields.into_iter().filter_map(AuthorField::into_name).collect(),
            Self::Joined(s) => s
                .split(" and ")
                .flat_map(|part| part.split(';'))
                .map(|part| normalize::collapse_ws(part))
                .filter(|part| !part.is_empty())
                .collect(),
        }
    }
}

/// A field that is a string in some responses and an array in others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_first(self) -> Option<String> {
        match self {
            Self::One(s) => Some(s),
            Self::Many(v) => v.into_iter().next(),
        }
    }
}

// ---------------------------------------------------------------------------
// Semantic Scholar
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct S2Document {
    #[serde(rename = "paperId", default)]
    paper_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: AuthorsField,
    #[serde(default, deserialize_with = "de_opt_year")]
    year: Option<i32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(rename = "citationCount", default, deserialize_with = "de_opt_count")]
    citation_count: Option<u32>,
    /// Raw API shape: `{"DOI": "...", "ArXiv": "...", "CorpusId": 123}`.
    #[serde(rename = "externalIds", default)]
    external_ids: BTreeMap<String, Value>,
    /// Flattened script shape.
    #[serde(default)]
    arxiv_id: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "publicationDate", default)]
    publication_date: Option<String>,
}

fn s2_external_id(ids: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    ids.get(key).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl S2Document {
    fn into_record(self) -> Result<PaperRecord> {
        let mut record = PaperRecord::new(require_title(self.title)?);
        record.authors = self.authors.into_names();
        record.year = self
            .year
            .or_else(|| self.publication_date.as_deref().and_then(year_from_date));
        record.venue = non_empty(self.venue);
        record.abstract_text = non_empty(self.abstract_text);
        record.citation_count = self.citation_count.unwrap_or(0);
        record.url = non_empty(self.url);

        let doi = s2_external_id(&self.external_ids, "DOI").or(self.doi);
        if let Some(doi) = doi.as_deref().and_then(normalize::normalize_doi) {
            record.external_ids.insert(IdScheme::Doi, doi);
        }
        let arxiv = s2_external_id(&self.external_ids, "ArXiv").or(self.arxiv_id);
        if let Some((id, version)) = arxiv.as_deref().and_then(normalize::split_arxiv_id) {
            record.external_ids.insert(IdScheme::Arxiv, id);
            record.arxiv_version = version;
        }
        if let Some(pid) = non_empty(self.paper_id) {
            record.external_ids.insert(IdScheme::S2, pid);
        }

        record.source_tags.insert(Source::S2.tag().to_string());
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// arXiv (Atom-derived)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ArxivDocument {
    /// Entry id URL in the raw Atom shape, bare id in the script shape.
    #[serde(default, alias = "arxiv_id")]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: AuthorsField,
    #[serde(default, alias = "abstract")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "de_opt_year")]
    year: Option<i32>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl ArxivDocument {
    fn into_record(self) -> Result<PaperRecord> {
        let mut record = PaperRecord::new(require_title(self.title)?);
        record.authors = self.authors.into_names();
        record.year = self
            .year
            .or_else(|| self.published.as_deref().and_then(year_from_date));
        record.abstract_text = non_empty(self.summary);

        if let Some((id, version)) = self.id.as_deref().and_then(normalize::split_arxiv_id) {
            record.url = non_empty(self.url)
                .or_else(|| Some(format!("https://arxiv.org/abs/{}", id)));
            record.external_ids.insert(IdScheme::Arxiv, id);
            record.arxiv_version = version;
        } else {
            record.url = non_empty(self.url);
        }

        record.source_tags.insert(Source::Arxiv.tag().to_string());
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// OpenAlex
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAlexWork {
    /// Work id: a full URL in the raw shape, sometimes bare in script output.
    #[serde(default, alias = "openalex_id")]
    id: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default, alias = "display_name")]
    title: Option<String>,
    /// Raw API shape.
    #[serde(default)]
    authorships: Vec<OaAuthorship>,
    /// Script shape.
    #[serde(default)]
    authors: AuthorsField,
    #[serde(rename = "publication_year", alias = "year", default, deserialize_with = "de_opt_year")]
    year: Option<i32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    primary_location: Option<OaLocation>,
    #[serde(rename = "cited_by_count", alias = "citationCount", default, deserialize_with = "de_opt_count")]
    citation_count: Option<u32>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    abstract_inverted_index: Option<BTreeMap<String, Vec<u32>>>,
    #[serde(default)]
    arxiv_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OaAuthorship {
    #[serde(default)]
    author: Option<OaAuthor>,
}

#[derive(Debug, Deserialize)]
struct OaAuthor {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    #[serde(default)]
    source: Option<OaVenue>,
}

#[derive(Debug, Deserialize)]
struct OaVenue {
    #[serde(default)]
    display_name: Option<String>,
}

/// Rebuild an abstract from OpenAlex's inverted index ({word: [positions]}).
fn reconstruct_abstract(index: BTreeMap<String, Vec<u32>>) -> Option<String> {
    let mut positioned: Vec<(u32, &str)> = Vec::new();
    for (word, positions) in &index {
        for &pos in positions {
            positioned.push((pos, word.as_str()));
        }
    }
    if positioned.is_empty() {
        return None;
    }
    positioned.sort();
    Some(
        positioned
            .into_iter()
            .map(|(_, w)| w)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

impl OpenAlexWork {
    fn into_record(self) -> Result<PaperRecord> {
        let mut record = PaperRecord::new(require_title(self.title)?);

        record.authors = if self.authorships.is_empty() {
            self.authors.into_names()
        } else {
            self.authorships
                .into_iter()
                .filter_map(|a| a.author.and_then(|a| a.display_name))
                .map(|n| normalize::collapse_ws(&n))
                .filter(|n| !n.is_empty())
                .collect()
        };

        record.year = self
            .year
            .or_else(|| self.publication_date.as_deref().and_then(year_from_date));
        record.venue = non_empty(self.venue).or_else(|| {
            self.primary_location
                .and_then(|l| l.source)
                .and_then(|s| non_empty(s.display_name))
        });
        record.abstract_text = non_empty(self.abstract_text)
            .or_else(|| self.abstract_inverted_index.and_then(reconstruct_abstract));
        record.citation_count = self.citation_count.unwrap_or(0);
        record.url = non_empty(self.url);

        if let Some(doi) = self.doi.as_deref().and_then(normalize::normalize_doi) {
            record.external_ids.insert(IdScheme::Doi, doi);
        }
        if let Some((id, version)) = self.arxiv_id.as_deref().and_then(normalize::split_arxiv_id)
        {
            record.external_ids.insert(IdScheme::Arxiv, id);
            record.arxiv_version = version;
        }
        if let Some(id) = self.id.as_deref().and_then(normalize::normalize_openalex_id) {
            record.external_ids.insert(IdScheme::OpenAlex, id);
        }

        record
            .source_tags
            .insert(Source::OpenAlex.tag().to_string());
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// CrossRef
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CrossrefItem {
    #[serde(rename = "DOI", alias = "doi", default)]
    doi: Option<String>,
    #[serde(default)]
    title: Option<OneOrMany>,
    #[serde(rename = "author", alias = "authors", default)]
    authors: AuthorsField,
    #[serde(default, deserialize_with = "de_opt_year")]
    year: Option<i32>,
    #[serde(default)]
    issued: Option<DateParts>,
    #[serde(rename = "published-print", default)]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online", default)]
    published_online: Option<DateParts>,
    #[serde(default)]
    created: Option<DateParts>,
    #[serde(rename = "container-title", alias = "journal", default)]
    container_title: Option<OneOrMany>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(
        rename = "is-referenced-by-count",
        alias = "cited_by",
        default,
        deserialize_with = "de_opt_count"
    )]
    citation_count: Option<u32>,
    #[serde(rename = "URL", alias = "url", default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<i64>>,
}

impl DateParts {
    fn year(&self) -> Option<i32> {
        self.date_parts
            .first()
            .and_then(|parts| parts.first())
            .map(|&y| y as i32)
    }
}

impl CrossrefItem {
    fn into_record(self) -> Result<PaperRecord> {
        let title = self.title.and_then(OneOrMany::into_first);
        let mut record = PaperRecord::new(require_title(title)?);
        record.authors = self.authors.into_names();
        record.year = self
            .year
            .or_else(|| self.issued.as_ref().and_then(DateParts::year))
            .or_else(|| self.published_print.as_ref().and_then(DateParts::year))
            .or_else(|| self.published_online.as_ref().and_then(DateParts::year))
            .or_else(|| self.created.as_ref().and_then(DateParts::year));
        record.venue = self
            .container_title
            .and_then(OneOrMany::into_first)
            .and_then(|v| non_empty(Some(v)));
        record.abstract_text = self
            .abstract_text
            .map(|a| normalize::strip_markup(&a))
            .filter(|a| !a.is_empty());
        record.citation_count = self.citation_count.unwrap_or(0);
        record.url = non_empty(self.url);

        if let Some(doi) = self.doi.as_deref().and_then(normalize::normalize_doi) {
            record.external_ids.insert(IdScheme::Doi, doi);
        }

        record
            .source_tags
            .insert(Source::Crossref.tag().to_string());
        Ok(record)
    }
}
