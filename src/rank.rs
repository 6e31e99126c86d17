//! Relevance scoring and ranking.
//!
//! The composite score is a documented contract so that runs are
//! reproducible:
//!
//! ```text
//! score = 0.3 * citation_norm + 0.3 * recency_norm
//!       + 0.2 * venue_tier_norm + 0.2 * keyword_relevance
//! ```
//!
//! All four components live in [0, 1], so the score does too. Scoring is a
//! pure function of the record set: re-running it on unchanged input gives
//! identical scores.

use crate::error::{PaperDbError, Result};
use crate::types::PaperRecord;
use std::cmp::{Ordering, Reverse};
use std::path::Path;

const W_CITATIONS: f64 = 0.3;
const W_RECENCY: f64 = 0.3;
const W_VENUE: f64 = 0.2;
const W_KEYWORDS: f64 = 0.2;

/// Venue keywords that indicate a peer-reviewed journal when no explicit
/// tier entry matches.
const JOURNAL_KEYWORDS: &[&str] = &["journal", "transactions", "review"];

/// Cutoffs applied after ranking. The threshold runs before the truncation,
/// so a small high-quality set is never padded up to `max_papers`.
#[derive(Debug, Default, Clone)]
pub struct FilterOptions {
    pub min_score: Option<f64>,
    pub max_papers: Option<usize>,
    pub keywords: Vec<String>,
}

/// Three-tier venue quality table used for `venue_tier_norm`.
///
/// Entries are lowercased substrings matched against the venue name,
/// longest first (so "eacl" wins over "acl" for EACL). Tier 1 maps to 1.0,
/// tier 2 to 0.6, tier 3 / preprint / unknown to 0.3.
#[derive(Debug, Clone)]
pub struct VenueTiers {
    entries: Vec<(String, u8)>,
}

impl VenueTiers {
    /// The built-in table: the major ML/NLP/vision/AI venues as tier 1, the
    /// second-rank conferences as tier 2. Journals fall to tier 2 via
    /// keyword match, everything else to tier 3.
    pub fn builtin() -> Self {
        const TIER1: &[&str] = &[
            "neurips", "nips", "icml", "iclr", "acl", "emnlp", "naacl", "cvpr", "iccv", "eccv",
            "aaai", "ijcai", "kdd", "sigir", "www",
        ];
        const TIER2: &[&str] = &["coling", "eacl", "icra", "corl"];

        let mut entries: Vec<(String, u8)> = TIER1
            .iter()
            .map(|v| (v.to_string(), 1))
            .chain(TIER2.iter().map(|v| (v.to_string(), 2)))
            .collect();
        entries.sort_by_key(|(v, _)| Reverse(v.len()));
        Self { entries }
    }

    /// Load an override table from a JSON object of `{"substring": tier}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| PaperDbError::io(path.to_path_buf(), e))?;
        Self::from_json_str(&text)
    }

    /// Parse a `{"substring": tier}` object into a tier table.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: std::collections::BTreeMap<String, u8> = serde_json::from_str(text)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (venue, tier) in raw {
            if !(1..=3).contains(&tier) {
                return Err(PaperDbError::Config(format!(
                    "venue tier for '{}' must be 1, 2, or 3 (got {})",
                    venue, tier
                )));
            }
            entries.push((venue.to_lowercase(), tier));
        }
        entries.sort_by_key(|(v, _)| Reverse(v.len()));
        Ok(Self { entries })
    }

    /// Tier for a venue name; unknown and missing venues are tier 3.
    pub fn tier(&self, venue: Option<&str>) -> u8 {
        let venue = match venue {
            Some(v) if !v.trim().is_empty() => v.to_lowercase(),
            _ => return 3,
        };
        for (needle, tier) in &self.entries {
            if venue.contains(needle) {
                return *tier;
            }
        }
        if JOURNAL_KEYWORDS.iter().any(|kw| venue.contains(kw)) {
            return 2;
        }
        3
    }

    fn norm(tier: u8) -> f64 {
        match tier {
            1 => 1.0,
            2 => 0.6,
            _ => 0.3,
        }
    }
}

/// Compute and store `score` for every record in the set.
///
/// Normalization context (max citations, year range, median recency) is
/// derived from the set itself: the score of one record depends on which
/// records it is ranked with. This ranks *within* a database.
pub fn score_records(records: &mut [PaperRecord], keywords: &[String], tiers: &VenueTiers) {
    let log_max_citations = records
        .iter()
        .map(|r| r.citation_count)
        .max()
        .map(|c| f64::from(c).ln_1p())
        .unwrap_or(0.0);

    let known_years: Vec<i32> = records.iter().filter_map(|r| r.year).collect();
    let min_year = known_years.iter().copied().min();
    let max_year = known_years.iter().copied().max();

    let recency_of = |year: i32| -> f64 {
        match (min_year, max_year) {
            (Some(lo), Some(hi)) if hi > lo => {
                (f64::from(year - lo) / f64::from(hi - lo)).clamp(0.0, 1.0)
            }
            // A single-year set carries no recency signal.
            _ => 0.5,
        }
    };

    // Records with unknown year get the median of the known recency values:
    // a neutral default rather than a penalty.
    let median_recency = {
        let mut known: Vec<f64> = known_years.iter().map(|&y| recency_of(y)).collect();
        if known.is_empty() {
            0.5
        } else {
            known.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            let mid = known.len() / 2;
            if known.len() % 2 == 0 {
                (known[mid - 1] + known[mid]) / 2.0
            } else {
                known[mid]
            }
        }
    };

    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    for record in records.iter_mut() {
        let citation_norm = if log_max_citations > 0.0 {
            f64::from(record.citation_count).ln_1p() / log_max_citations
        } else {
            0.0
        };

        let recency_norm = match record.year {
            Some(y) => recency_of(y),
            None => median_recency,
        };

        let venue_norm = VenueTiers::norm(tiers.tier(record.venue.as_deref()));

        let keyword_relevance = if keywords.is_empty() {
            1.0
        } else {
            let haystack = format!(
                "{} {}",
                record.title,
                record.abstract_text.as_deref().unwrap_or("")
            )
            .to_lowercase();
            let hits = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
            hits as f64 / keywords.len() as f64
        };

        let score = W_CITATIONS * citation_norm
            + W_RECENCY * recency_norm
            + W_VENUE * venue_norm
            + W_KEYWORDS * keyword_relevance;
        // Six decimals keeps JSONL output tidy without disturbing ordering
        // at the precision the weights can produce.
        record.score = Some((score * 1e6).round() / 1e6);
    }
}

/// Ranking order: score descending, citation count descending, year
/// ascending (older, better-evidenced work above newer at equal score),
/// unknown year last.
pub fn rank_cmp(a: &PaperRecord, b: &PaperRecord) -> Ordering {
    let sa = a.score.unwrap_or(0.0);
    let sb = b.score.unwrap_or(0.0);
    sb.partial_cmp(&sa)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.citation_count.cmp(&a.citation_count))
        .then_with(|| match (a.year, b.year) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Score, sort, and cut a record set: threshold first, then truncation.
pub fn rank_and_filter(
    mut records: Vec<PaperRecord>,
    opts: &FilterOptions,
    tiers: &VenueTiers,
) -> Vec<PaperRecord> {
    score_records(&mut records, &opts.keywords, tiers);
    records.sort_by(rank_cmp);

    if let Some(min_score) = opts.min_score {
        records.retain(|r| r.score.unwrap_or(0.0) >= min_score);
    }
    if let Some(max_papers) = opts.max_papers {
        records.truncate(max_papers);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str, year: Option<i32>, citations: u32, venue: Option<&str>) -> PaperRecord {
        let mut r = PaperRecord::new(title);
        r.year = year;
        r.citation_count = citations;
        r.venue = venue.map(String::from);
        r
    }

    #[test]
    fn test_scores_are_bounded() {
        let mut records = vec![
            rec("A", Some(1998), 0, None),
            rec("B", Some(2024), 120000, Some("NeurIPS")),
            rec("C", None, 3, Some("Journal of Testing")),
        ];
        score_records(
            &mut records,
            &["testing".to_string(), "absent".to_string()],
            &VenueTiers::builtin(),
        );
        for r in &records {
            let s = r.score.unwrap();
            assert!((0.0..=1.0).contains(&s), "score {} out of bounds", s);
        }
    }

    #[test]
    fn test_all_zero_citations_defines_zero_norm() {
        let mut records = vec![rec("A", Some(2020), 0, None), rec("B", Some(2021), 0, None)];
        score_records(&mut records, &[], &VenueTiers::builtin());
        // No NaN, and citation contributes nothing: only recency + venue + keywords.
        let a = records[0].score.unwrap();
        let b = records[1].score.unwrap();
        assert!(a.is_finite() && b.is_finite());
        assert!(b > a); // newer, all else equal
    }

    #[test]
    fn test_unknown_year_gets_median_recency() {
        let mut records = vec![
            rec("Old", Some(2000), 0, None),
            rec("New", Some(2020), 0, None),
            rec("Undated", None, 0, None),
        ];
        score_records(&mut records, &[], &VenueTiers::builtin());
        let old = records[0].score.unwrap();
        let new = records[1].score.unwrap();
        let undated = records[2].score.unwrap();
        assert!(old < undated && undated < new);
    }

    #[test]
    fn test_venue_tier_lookup() {
        let tiers = VenueTiers::builtin();
        assert_eq!(tiers.tier(Some("NeurIPS 2023")), 1);
        assert_eq!(tiers.tier(Some("Proceedings of EACL")), 2);
        assert_eq!(tiers.tier(Some("Journal of Machine Learning Research")), 2);
        assert_eq!(tiers.tier(Some("IEEE Transactions on Pattern Analysis")), 2);
        assert_eq!(tiers.tier(Some("arXiv preprint")), 3);
        assert_eq!(tiers.tier(None), 3);
    }

    #[test]
    fn test_keyword_relevance_fraction() {
        let mut records = vec![rec("Graph neural networks for chemistry", Some(2020), 0, None)];
        records[0].abstract_text = Some("We apply message passing.".to_string());
        score_records(
            &mut records,
            &["graph".to_string(), "chemistry".to_string(), "quantum".to_string()],
            &VenueTiers::builtin(),
        );
        // 2 of 3 keywords hit: 0.3*0 + 0.3*0.5 + 0.2*0.3 + 0.2*(2/3)
        let expected = 0.3 * 0.5 + 0.2 * 0.3 + 0.2 * (2.0 / 3.0);
        let got = records[0].score.unwrap();
        assert!((got - expected).abs() < 1e-6, "got {}, want {}", got, expected);
    }

    #[test]
    fn test_no_keywords_means_no_penalty() {
        let mut records = vec![rec("Anything", Some(2020), 0, None)];
        score_records(&mut records, &[], &VenueTiers::builtin());
        let with_none = records[0].score.unwrap();
        score_records(&mut records, &["zzz".to_string()], &VenueTiers::builtin());
        let with_miss = records[0].score.unwrap();
        assert!(with_none > with_miss);
    }

    #[test]
    fn test_rank_output_is_non_increasing() {
        let records = vec![
            rec("LowCite", Some(2020), 10, Some("NeurIPS")),
            rec("HighCite", Some(2020), 10000, Some("NeurIPS")),
            rec("Old", Some(2010), 500, None),
            rec("New", Some(2022), 500, None),
        ];
        let tiers = VenueTiers::builtin();
        let ranked = rank_and_filter(records, &FilterOptions::default(), &tiers);

        let scores: Vec<f64> = ranked.iter().map(|r| r.score.unwrap()).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "not non-increasing: {:?}", scores);
        }
    }

    #[test]
    fn test_rank_cmp_tie_breaks() {
        let mut a = rec("A", Some(2010), 500, None);
        a.score = Some(0.5);
        let mut b = rec("B", Some(2022), 500, None);
        b.score = Some(0.5);
        // Equal score and citations: older year ranks first.
        assert_eq!(rank_cmp(&a, &b), Ordering::Less);

        let mut c = rec("C", None, 500, None);
        c.score = Some(0.5);
        // Unknown year sorts after any known year.
        assert_eq!(rank_cmp(&a, &c), Ordering::Less);

        let mut d = rec("D", Some(2015), 900, None);
        d.score = Some(0.5);
        // Citations break the score tie before year does.
        assert_eq!(rank_cmp(&d, &a), Ordering::Less);
    }

    #[test]
    fn test_threshold_applies_before_truncation() {
        let mut records: Vec<PaperRecord> = (0..8)
            .map(|i| rec(&format!("P{}", i), Some(2000 + i), (i as u32) * 100, None))
            .collect();
        let tiers = VenueTiers::builtin();
        score_records(&mut records, &[], &tiers);
        records.sort_by(rank_cmp);
        // Pick a threshold that only the top two clear.
        let cutoff = records[1].score.unwrap();

        let opts = FilterOptions {
            min_score: Some(cutoff),
            max_papers: Some(5),
            keywords: Vec::new(),
        };
        let filtered = rank_and_filter(records, &opts, &tiers);
        assert_eq!(filtered.len(), 2, "threshold-first must not pad to max_papers");
    }

    #[test]
    fn test_venue_tier_override_file_format() {
        let tiers =
            VenueTiers::from_json_str(r#"{"neurips": 1, "myworkshop": 2}"#).unwrap();
        assert_eq!(tiers.tier(Some("MyWorkshop 2024")), 2);
        assert!(VenueTiers::from_json_str(r#"{"x": 9}"#).is_err());
    }
}
