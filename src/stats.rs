//! Database statistics for the `stats` command.

use crate::rank::VenueTiers;
use crate::types::{PaperRecord, Source, UNVERIFIED_DUPLICATE_RISK};
use std::collections::BTreeMap;

/// Aggregate counts over a database.
#[derive(Debug, Default)]
pub struct DbStats {
    pub total: usize,
    /// Papers per known publication year.
    pub years: BTreeMap<i32, usize>,
    pub unknown_year: usize,
    /// Papers per venue tier (index 0 = tier 1).
    pub tiers: [usize; 3],
    /// Papers per contributing source.
    pub sources: BTreeMap<String, usize>,
    pub with_abstract: usize,
    pub with_doi: usize,
    pub total_citations: u64,
    /// User tag distribution.
    pub tags: BTreeMap<String, usize>,
    /// Records carrying the unverified-duplicate-risk flag.
    pub flagged: usize,
}

impl DbStats {
    pub fn avg_citations(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.total_citations as f64 / self.total as f64
        }
    }
}

/// Compute statistics for a record set.
pub fn compute(records: &[PaperRecord], tiers: &VenueTiers) -> DbStats {
    let mut stats = DbStats {
        total: records.len(),
        ..DbStats::default()
    };

    for record in records {
        match record.year {
            Some(year) => *stats.years.entry(year).or_insert(0) += 1,
            None => stats.unknown_year += 1,
        }

        let tier = tiers.tier(record.venue.as_deref());
        stats.tiers[(tier - 1) as usize] += 1;

        for tag in &record.source_tags {
            if Source::from_str_loose(tag).is_some() {
                *stats.sources.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        if record.source_tags.contains(UNVERIFIED_DUPLICATE_RISK) {
            stats.flagged += 1;
        }

        if record.abstract_text.is_some() {
            stats.with_abstract += 1;
        }
        if record
            .external_ids
            .contains_key(&crate::types::IdScheme::Doi)
        {
            stats.with_doi += 1;
        }
        stats.total_citations += u64::from(record.citation_count);

        for tag in &record.tags {
            *stats.tags.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    stats
}
