//! JSONL persistence for the paper database.
//!
//! One record per line, stable field names, trailing newline. Each command
//! reads its whole input and writes its whole output; there are no partial
//! writes and no hidden default paths.

use crate::error::{PaperDbError, Result};
use crate::types::PaperRecord;
use std::fs;
use std::path::Path;

/// Load a canonical JSONL database.
///
/// Errors carry `{path}:{line}` so a broken line is easy to find.
pub fn load(path: &Path) -> Result<Vec<PaperRecord>> {
    let text = fs::read_to_string(path).map_err(|e| PaperDbError::io(path.to_path_buf(), e))?;
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: PaperRecord =
            serde_json::from_str(line).map_err(|e| PaperDbError::InvalidLine {
                path: path.to_path_buf(),
                line: idx + 1,
                source: e,
            })?;
        records.push(record);
    }
    Ok(records)
}

/// Write records as JSONL, replacing the file.
pub fn save(path: &Path, records: &[PaperRecord]) -> Result<()> {
    fs::write(path, to_jsonl(records)?).map_err(|e| PaperDbError::io(path.to_path_buf(), e))
}

/// Serialize records as JSONL text.
pub fn to_jsonl(records: &[PaperRecord]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Render records as CSV for spreadsheet triage. List fields are joined
/// with "; ".
pub fn to_csv(records: &[PaperRecord]) -> String {
    let mut out = String::from(
        "title,authors,year,venue,citation_count,doi,arxiv_id,url,tags,source_tags\n",
    );
    for r in records {
        let row = [
            r.title.clone(),
            r.authors.join("; "),
            r.year.map(|y| y.to_string()).unwrap_or_default(),
            r.venue.clone().unwrap_or_default(),
            r.citation_count.to_string(),
            r.external_ids
                .get(&crate::types::IdScheme::Doi)
                .cloned()
                .unwrap_or_default(),
            r.arxiv_id_display().unwrap_or_default(),
            r.url.clone().unwrap_or_default(),
            r.tags.iter().cloned().collect::<Vec<_>>().join("; "),
            r.source_tags.iter().cloned().collect::<Vec<_>>().join("; "),
        ];
        let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdScheme;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.jsonl");

        let mut rec = PaperRecord::new("A Paper");
        rec.year = Some(2020);
        rec.external_ids
            .insert(IdScheme::Doi, "10.1/abc".to_string());
        save(&path, &[rec.clone(), PaperRecord::new("Another")]).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "A Paper");
        assert_eq!(
            loaded[0].external_ids.get(&IdScheme::Doi).map(String::as_str),
            Some("10.1/abc")
        );
    }

    #[test]
    fn test_save_then_load_is_byte_stable() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.jsonl");

        let mut rec = PaperRecord::new("Stable");
        rec.citation_count = 7;
        save(&a, &[rec]).unwrap();
        let loaded = load(&a).unwrap();
        save(&b, &loaded).unwrap();

        assert_eq!(
            std::fs::read_to_string(&a).unwrap(),
            std::fs::read_to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_invalid_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"title\": \"ok\"}\nnot json\n").unwrap();

        let err = load(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad.jsonl:2"), "unexpected error: {}", msg);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load(Path::new("/nonexistent/db.jsonl")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/db.jsonl"));
    }

    #[test]
    fn test_csv_quotes_fields_with_commas() {
        let mut rec = PaperRecord::new("Deep, Wide, and \"Fast\"");
        rec.authors = vec!["Doe, Jane".to_string(), "Roe, Richard".to_string()];
        rec.year = Some(2021);

        let csv = to_csv(&[rec]);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("title,authors,year"));
        let row = lines.next().unwrap();
        assert!(row.starts_with(r#""Deep, Wide, and ""Fast""","Doe, Jane; Roe, Richard",2021"#));
    }
}
