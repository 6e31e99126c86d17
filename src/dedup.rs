//! Deduplication: collapse records that refer to the same paper.
//!
//! Identity is established transitively over shared external ids (union-find:
//! a DOI match or a version-stripped arXiv match joins two records, and
//! anything joined to either joins both). Records with no shared external id
//! fall back to normalized-title equality, which additionally requires a
//! matching known year so that reprints and common titles ("A Survey") from
//! different years stay distinct.
//!
//! Records that can never be fallback-checked (no external ids, unknown
//! year) are kept as-is and tagged [`UNVERIFIED_DUPLICATE_RISK`] instead of
//! being silently merged or dropped.

use crate::normalize;
use crate::types::{IdScheme, PaperRecord, Source, UNVERIFIED_DUPLICATE_RISK};
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Outcome of a dedup pass.
#[derive(Debug)]
pub struct DedupSummary {
    /// One record per equivalence class, in first-observed order.
    pub records: Vec<PaperRecord>,
    /// How many input records were merged away.
    pub duplicates_merged: usize,
    /// Records tagged as unverifiable duplicate risks.
    pub flagged: usize,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression.
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Attach the later-seen root under the earlier one.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// Deduplicate a batch of records, merging each equivalence class into one
/// record.
pub fn dedup(records: Vec<PaperRecord>) -> DedupSummary {
    let n = records.len();
    let mut uf = UnionFind::new(n);

    // Primary key: any shared per-scheme external id.
    let mut by_id: HashMap<(IdScheme, String), usize> = HashMap::new();
    for (i, rec) in records.iter().enumerate() {
        for (scheme, value) in &rec.external_ids {
            match by_id.entry((*scheme, value.clone())) {
                Entry::Occupied(e) => uf.union(*e.get(), i),
                Entry::Vacant(e) => {
                    e.insert(i);
                }
            }
        }
    }

    // Fallback key: normalized title + known year.
    let mut by_title_year: HashMap<(String, i32), usize> = HashMap::new();
    for (i, rec) in records.iter().enumerate() {
        let year = match rec.year {
            Some(y) => y,
            None => continue,
        };
        let title = normalize::normalize_title(&rec.title);
        if title.is_empty() {
            continue;
        }
        match by_title_year.entry((title, year)) {
            Entry::Occupied(e) => uf.union(*e.get(), i),
            Entry::Vacant(e) => {
                e.insert(i);
            }
        }
    }

    // Collect equivalence classes in first-observed order.
    let mut class_index: HashMap<usize, usize> = HashMap::new();
    let mut classes: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = uf.find(i);
        match class_index.entry(root) {
            Entry::Occupied(e) => classes[*e.get()].push(i),
            Entry::Vacant(e) => {
                e.insert(classes.len());
                classes.push(vec![i]);
            }
        }
    }

    let mut flagged = 0usize;
    let mut merged: Vec<PaperRecord> = Vec::with_capacity(classes.len());
    for members in classes {
        let mut record = merge_class(&records, &members);
        if record.has_no_external_ids() && record.year.is_none() {
            record
                .source_tags
                .insert(UNVERIFIED_DUPLICATE_RISK.to_string());
            flagged += 1;
        }
        merged.push(record);
    }

    DedupSummary {
        duplicates_merged: n - merged.len(),
        flagged,
        records: merged,
    }
}

/// Merge one equivalence class. `members` is in first-observed order.
///
/// Scalar fields take the value from the highest-trust contributing source
/// (`s2 > crossref > openalex > arxiv`); this also settles year conflicts
/// for DOI-matched preprint/published pairs. `citation_count` instead takes
/// the maximum: counts from different snapshots are lower bounds, so the
/// largest one is the most informed.
fn merge_class(records: &[PaperRecord], members: &[usize]) -> PaperRecord {
    if members.len() == 1 {
        let mut record = records[members[0]].clone();
        record.score = None;
        record.bibtex_key = None;
        return record;
    }

    // Members ordered by descending trust, first-observed breaking ties.
    let mut by_trust: Vec<usize> = members.to_vec();
    by_trust.sort_by_key(|&i| (Reverse(Source::best_rank(&records[i].source_tags)), i));

    let pick = |get: &dyn Fn(&PaperRecord) -> Option<String>| -> Option<String> {
        by_trust.iter().find_map(|&i| get(&records[i]))
    };

    let mut record = PaperRecord::new(
        pick(&|r| {
            if r.title.is_empty() {
                None
            } else {
                Some(r.title.clone())
            }
        })
        .unwrap_or_default(),
    );

    record.authors = by_trust
        .iter()
        .map(|&i| &records[i].authors)
        .find(|a| !a.is_empty())
        .cloned()
        .unwrap_or_default();
    record.year = by_trust.iter().find_map(|&i| records[i].year);
    record.venue = pick(&|r| r.venue.clone());
    record.abstract_text = pick(&|r| r.abstract_text.clone());
    record.url = pick(&|r| r.url.clone());
    record.citation_count = members
        .iter()
        .map(|&i| records[i].citation_count)
        .max()
        .unwrap_or(0);

    // Per scheme, the highest-trust id wins; the arXiv version travels with
    // whichever record supplied the arXiv id.
    for &i in &by_trust {
        for (scheme, value) in &records[i].external_ids {
            if !record.external_ids.contains_key(scheme) {
                record.external_ids.insert(*scheme, value.clone());
                if *scheme == IdScheme::Arxiv {
                    record.arxiv_version = records[i].arxiv_version;
                }
            }
        }
    }

    for &i in members {
        record
            .source_tags
            .extend(records[i].source_tags.iter().cloned());
        record.tags.extend(records[i].tags.iter().cloned());
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdScheme;

    fn rec(title: &str, year: Option<i32>) -> PaperRecord {
        let mut r = PaperRecord::new(title);
        r.year = year;
        r
    }

    fn tagged(mut r: PaperRecord, source: Source) -> PaperRecord {
        r.source_tags.insert(source.tag().to_string());
        r
    }

    #[test]
    fn test_doi_match_merges_and_unions_tags() {
        let mut a = tagged(rec("A Paper", Some(2020)), Source::Arxiv);
        a.external_ids
            .insert(IdScheme::Doi, "10.1/x".to_string());
        let mut b = tagged(rec("A Paper (Extended)", Some(2020)), Source::S2);
        b.external_ids
            .insert(IdScheme::Doi, "10.1/x".to_string());

        let out = dedup(vec![a, b]);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.duplicates_merged, 1);
        let merged = &out.records[0];
        assert_eq!(
            merged.external_ids.get(&IdScheme::Doi).map(String::as_str),
            Some("10.1/x")
        );
        assert!(merged.source_tags.contains("arxiv"));
        assert!(merged.source_tags.contains("s2"));
        // S2 outranks arXiv, so its title wins.
        assert_eq!(merged.title, "A Paper (Extended)");
    }

    #[test]
    fn test_transitive_union_over_shared_ids() {
        let mut a = rec("P", Some(2021));
        a.external_ids
            .insert(IdScheme::Arxiv, "2101.00001".to_string());
        let mut b = rec("P", Some(2021));
        b.external_ids
            .insert(IdScheme::Arxiv, "2101.00001".to_string());
        b.external_ids.insert(IdScheme::Doi, "10.1/y".to_string());
        let mut c = rec("P v2", None);
        c.external_ids.insert(IdScheme::Doi, "10.1/y".to_string());

        let out = dedup(vec![a, b, c]);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn test_attention_merge_scenario() {
        let mut a = tagged(rec("Attention Is All You Need", Some(2017)), Source::Arxiv);
        a.external_ids
            .insert(IdScheme::Arxiv, "1706.03762".to_string());
        a.citation_count = 50000;

        let mut b = tagged(rec("Attention is all you need", Some(2017)), Source::S2);
        b.external_ids.insert(IdScheme::Doi, "10.5555/3295222".to_string());
        b.citation_count = 48000;
        b.venue = Some("NeurIPS".to_string());

        let out = dedup(vec![a, b]);
        assert_eq!(out.records.len(), 1);
        let merged = &out.records[0];
        assert_eq!(merged.citation_count, 50000);
        assert_eq!(merged.venue.as_deref(), Some("NeurIPS"));
        assert_eq!(merged.year, Some(2017));
        assert!(merged.source_tags.contains("arxiv"));
        assert!(merged.source_tags.contains("s2"));
        // Both ids survive on the merged record.
        assert!(merged.external_ids.contains_key(&IdScheme::Arxiv));
        assert!(merged.external_ids.contains_key(&IdScheme::Doi));
    }

    #[test]
    fn test_same_title_different_year_stays_distinct() {
        let a = rec("A Survey", Some(2015));
        let b = rec("A Survey", Some(2023));
        let out = dedup(vec![a, b]);
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn test_unknown_year_blocks_fallback_and_flags() {
        let a = rec("An Obscure Workshop Paper", None);
        let b = rec("An Obscure Workshop Paper", None);
        let out = dedup(vec![a, b]);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.flagged, 2);
        for r in &out.records {
            assert!(r.source_tags.contains(UNVERIFIED_DUPLICATE_RISK));
        }
    }

    #[test]
    fn test_year_conflict_resolved_by_trust() {
        let mut a = tagged(rec("P", Some(2017)), Source::Arxiv);
        a.external_ids.insert(IdScheme::Doi, "10.1/z".to_string());
        let mut b = tagged(rec("P", Some(2018)), Source::S2);
        b.external_ids.insert(IdScheme::Doi, "10.1/z".to_string());

        let out = dedup(vec![b, a]);
        assert_eq!(out.records.len(), 1);
        // S2 outranks arXiv regardless of input order.
        assert_eq!(out.records[0].year, Some(2018));
    }

    #[test]
    fn test_output_preserves_first_observed_order() {
        let mut a = rec("First", Some(2020));
        a.external_ids.insert(IdScheme::Doi, "10.1/a".to_string());
        let b = rec("Second", Some(2021));
        let mut a_dup = rec("First again", Some(2019));
        a_dup
            .external_ids
            .insert(IdScheme::Doi, "10.1/a".to_string());

        let out = dedup(vec![a, b, a_dup]);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].title, "First");
        assert_eq!(out.records[1].title, "Second");
    }

    #[test]
    fn test_citation_count_is_max_of_members() {
        let mut a = rec("P", Some(2020));
        a.external_ids.insert(IdScheme::Doi, "10.1/c".to_string());
        a.citation_count = 10;
        let mut b = rec("P", Some(2020));
        b.external_ids.insert(IdScheme::Doi, "10.1/c".to_string());
        b.citation_count = 25;

        let out = dedup(vec![a, b]);
        assert_eq!(out.records[0].citation_count, 25);
    }
}
