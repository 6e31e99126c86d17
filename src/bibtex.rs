//! BibTeX key assignment and export.
//!
//! Keys follow the `{surname}{year}{firstTitleWord}` convention
//! (`vaswani2017attention`). Assignment order is the database order, which
//! makes collision suffixing deterministic: a run over the same file
//! produces byte-identical output.

use crate::normalize;
use crate::types::{IdScheme, PaperRecord};
use std::collections::HashMap;

/// Words never used as the title component of a citation key.
const SKIP_WORDS: &[&str] = &[
    "a", "an", "the", "on", "in", "of", "for", "to", "with", "and", "or",
];

/// Venue keywords that classify an entry as a conference paper.
const CONF_KEYWORDS: &[&str] = &[
    "conference",
    "proceedings",
    "symposium",
    "workshop",
    "icml",
    "neurips",
    "nips",
    "iclr",
    "acl",
    "emnlp",
    "cvpr",
    "aaai",
];

/// Venue keywords that classify an entry as a journal article.
const JOURNAL_KEYWORDS: &[&str] = &["journal", "transactions", "review"];

/// Result of assigning keys to a database.
#[derive(Debug)]
pub struct KeyReport {
    /// Indices of records that could not be keyed (no authors, no title).
    /// They keep `bibtex_key = None` and are excluded from `.bib` output
    /// but stay in the JSONL database.
    pub unkeyable: Vec<usize>,
}

/// Derive the collision-free base key, or `None` for unkeyable records.
pub fn citation_key_base(record: &PaperRecord) -> Option<String> {
    let title_usable = !record.title.trim().is_empty();
    if record.authors.is_empty() && !title_usable {
        return None;
    }

    let author_part = record
        .authors
        .first()
        .map(|a| keep_alpha(&normalize::ascii_fold(&normalize::surname(a))))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let year_part = record
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "nd".to_string());

    let title_part = normalize::ascii_fold(&record.title)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|w| w.len() > 2 && !SKIP_WORDS.contains(w))
        .map(str::to_string)
        .unwrap_or_else(|| "paper".to_string());

    Some(format!("{}{}{}", author_part, year_part, title_part))
}

fn keep_alpha(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

/// Suffix for the n-th member of a collision group: a, b, ..., z, aa, ab, ...
fn collision_suffix(mut n: usize) -> String {
    let mut out = String::new();
    loop {
        out.insert(0, (b'a' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out
}

/// Assign a unique `bibtex_key` to every keyable record, in database order.
///
/// A base key claimed by exactly one record is used bare. When several
/// records collide, *all* of them get a letter suffix (`smith2020deepa`,
/// `smith2020deepb`, …) so that adding a new colliding record in a later
/// run never silently renames an existing unsuffixed key.
pub fn assign_keys(records: &mut [PaperRecord]) -> KeyReport {
    let bases: Vec<Option<String>> = records.iter().map(citation_key_base).collect();

    let mut group_sizes: HashMap<&str, usize> = HashMap::new();
    for base in bases.iter().flatten() {
        *group_sizes.entry(base.as_str()).or_insert(0) += 1;
    }

    let mut assigned: HashMap<String, usize> = HashMap::new();
    let mut unkeyable = Vec::new();
    for (i, base) in bases.iter().enumerate() {
        let base = match base {
            Some(b) => b,
            None => {
                records[i].bibtex_key = None;
                unkeyable.push(i);
                continue;
            }
        };
        let key = if group_sizes[base.as_str()] == 1 {
            base.clone()
        } else {
            let n = assigned.entry(base.clone()).or_insert(0);
            let key = format!("{}{}", base, collision_suffix(*n));
            *n += 1;
            key
        };
        records[i].bibtex_key = Some(key);
    }

    KeyReport { unkeyable }
}

/// Escape BibTeX-special characters and drop unbalanced braces.
pub fn escape(text: &str) -> String {
    let balanced = balance_braces(text);
    let mut out = String::with_capacity(balanced.len());
    for c in balanced.chars() {
        match c {
            '&' => out.push_str(r"\&"),
            '%' => out.push_str(r"\%"),
            '#' => out.push_str(r"\#"),
            '_' => out.push_str(r"\_"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep only matched brace pairs; strays would break the entry.
fn balance_braces(s: &str) -> String {
    let mut out: Vec<char> = Vec::with_capacity(s.len());
    let mut open_positions: Vec<usize> = Vec::new();
    for c in s.chars() {
        match c {
            '{' => {
                open_positions.push(out.len());
                out.push(c);
            }
            '}' => {
                if open_positions.pop().is_some() {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    for &idx in open_positions.iter().rev() {
        out.remove(idx);
    }
    out.into_iter().collect()
}

/// BibTeX entry type from venue keywords, falling back to `article` for
/// arXiv-only records and `misc` otherwise.
pub fn entry_type(record: &PaperRecord) -> &'static str {
    if let Some(venue) = record.venue.as_deref() {
        let venue = venue.to_lowercase();
        if CONF_KEYWORDS.iter().any(|kw| venue.contains(kw)) {
            return "inproceedings";
        }
        if JOURNAL_KEYWORDS.iter().any(|kw| venue.contains(kw)) {
            return "article";
        }
    }
    if record.external_ids.contains_key(&IdScheme::Arxiv) {
        return "article";
    }
    "misc"
}

/// Render one record as a BibTeX entry. Missing optional fields are
/// omitted, never emitted empty.
pub fn format_entry(record: &PaperRecord, key: &str) -> String {
    let kind = entry_type(record);
    let arxiv_id = record
        .external_ids
        .get(&IdScheme::Arxiv)
        .map(String::as_str);

    let mut lines = vec![format!("@{}{{{},", kind, key)];
    lines.push(format!("  title = {{{}}},", escape(&record.title)));
    if !record.authors.is_empty() {
        lines.push(format!(
            "  author = {{{}}},",
            escape(&record.authors.join(" and "))
        ));
    }
    if let Some(year) = record.year {
        lines.push(format!("  year = {{{}}},", year));
    }
    if let Some(venue) = record.venue.as_deref() {
        match kind {
            "inproceedings" => lines.push(format!("  booktitle = {{{}}},", escape(venue))),
            "article" if arxiv_id.is_none() => {
                lines.push(format!("  journal = {{{}}},", escape(venue)))
            }
            _ => {}
        }
    }
    if let Some(id) = arxiv_id {
        lines.push(format!("  eprint = {{{}}},", id));
        lines.push("  archivePrefix = {arXiv},".to_string());
        if record.venue.is_none() {
            lines.push(format!("  journal = {{arXiv preprint arXiv:{}}},", id));
        }
    }
    if let Some(doi) = record.external_ids.get(&IdScheme::Doi) {
        lines.push(format!("  doi = {{{}}},", doi));
    }
    if let Some(url) = record.url.as_deref() {
        lines.push(format!("  url = {{{}}},", url));
    }
    if let Some(abstract_text) = record.abstract_text.as_deref() {
        let short: String = abstract_text.chars().take(500).collect();
        lines.push(format!("  abstract = {{{}}},", escape(&short)));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// Assign keys and render the whole database as a `.bib` file.
///
/// Returns the rendered bibliography and the indices of records excluded
/// because no key could be derived.
pub fn render_bibliography(records: &mut [PaperRecord]) -> (String, Vec<usize>) {
    let report = assign_keys(records);
    let entries: Vec<String> = records
        .iter()
        .filter_map(|r| {
            r.bibtex_key
                .as_deref()
                .map(|key| format_entry(r, key))
        })
        .collect();
    let mut output = entries.join("\n\n");
    if !output.is_empty() {
        output.push('\n');
    }
    (output, report.unkeyable)
}
