//! CLI binary for the paperdb pipeline.
//!
//! Usage: paperdb merge --inputs results_s2.jsonl results_arxiv.jsonl --output merged.jsonl

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use paperdb::rank::{FilterOptions, VenueTiers};
    use paperdb::types::Source;
    use paperdb::{bibtex, db, dedup, ingest, rank, stats};
    use paperdb::PaperDbError;
    use std::path::PathBuf;

    #[derive(Parser)]
    #[command(
        name = "paperdb",
        about = "Merge, deduplicate, rank, and export literature records",
        version
    )]
    struct Cli {
        /// Verbose logging
        #[arg(short, long, global = true)]
        verbose: bool,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum ExportFormat {
        Bibtex,
        Csv,
        Jsonl,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Merge raw source result files into one deduplicated database
        Merge {
            /// Input JSONL files, one per source query
            #[arg(long, num_args = 1.., required = true)]
            inputs: Vec<PathBuf>,
            /// Output JSONL database
            #[arg(long)]
            output: PathBuf,
            /// Source for input records that lack a `source` field
            #[arg(long, value_enum)]
            source: Option<Source>,
        },
        /// Score, rank, and cut a database
        Filter {
            /// Input JSONL database
            #[arg(long)]
            input: PathBuf,
            /// Output JSONL database
            #[arg(long)]
            output: PathBuf,
            /// Keep only records scoring at least this much
            #[arg(long)]
            min_score: Option<f64>,
            /// Keep at most this many records (applied after --min-score)
            #[arg(long)]
            max_papers: Option<usize>,
            /// Keywords for the relevance component of the score
            #[arg(long, num_args = 0..)]
            keywords: Vec<String>,
            /// Venue tier override table (JSON object of substring -> 1|2|3)
            #[arg(long)]
            venue_tiers: Option<PathBuf>,
        },
        /// Print record count, year histogram, and venue-tier breakdown
        Stats {
            /// Input JSONL database
            #[arg(long)]
            input: PathBuf,
        },
        /// Export a database as BibTeX (or CSV/JSONL)
        Export {
            /// Input JSONL database
            #[arg(long, alias = "input")]
            jsonl: PathBuf,
            /// Output file (stdout if omitted)
            #[arg(short, long)]
            output: Option<PathBuf>,
            /// Output format
            #[arg(long, value_enum, default_value = "bibtex")]
            format: ExportFormat,
            /// Print `key<TAB>title` lines instead of full entries
            #[arg(long)]
            keys_only: bool,
        },
        /// Print records matching a substring query as JSONL
        Search {
            /// Input JSONL database
            #[arg(long)]
            input: PathBuf,
            /// Query string (case-insensitive substring)
            #[arg(long)]
            query: String,
            /// Field to search: title, abstract, venue, authors, or tags
            #[arg(long, default_value = "title")]
            field: String,
        },
        /// Add tags to records matched by external id
        Tag {
            /// JSONL database, rewritten in place
            #[arg(long)]
            input: PathBuf,
            /// External ids (DOI, arXiv id, S2 id, OpenAlex id) to match
            #[arg(long, num_args = 1.., required = true)]
            ids: Vec<String>,
            /// Tags to add
            #[arg(long, num_args = 1.., required = true)]
            tags: Vec<String>,
        },
        /// Add one record and re-deduplicate the database
        Add {
            /// JSONL database, rewritten in place (created if missing)
            #[arg(long)]
            input: PathBuf,
            /// The record as a JSON object
            #[arg(long)]
            record: String,
            /// Source for the record if it lacks a `source` field
            #[arg(long, value_enum)]
            source: Option<Source>,
        },
    }

    pub fn run() -> paperdb::Result<i32> {
        let cli = Cli::parse();

        let default_level = if cli.verbose { "debug" } else { "info" };
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(default_level),
        )
        .init();

        match cli.command {
            Commands::Merge {
                inputs,
                output,
                source,
            } => {
                let mut records = Vec::new();
                let mut skipped = 0usize;
                let mut failed_files = 0usize;

                for path in &inputs {
                    match ingest::ingest_file(path, source) {
                        Ok(result) => {
                            skipped += result.skipped;
                            records.extend(result.records);
                        }
                        Err(e) => {
                            log::error!("giving up on input file: {}", e);
                            failed_files += 1;
                        }
                    }
                }

                let total_in = records.len();
                let outcome = dedup::dedup(records);
                db::save(&output, &outcome.records)?;

                eprintln!(
                    "merge: {} in, {} out, {} duplicates merged, {} skipped, {} flagged -> {}",
                    total_in,
                    outcome.records.len(),
                    outcome.duplicates_merged,
                    skipped,
                    outcome.flagged,
                    output.display()
                );
                if failed_files > 0 {
                    eprintln!("merge: {} of {} input files failed", failed_files, inputs.len());
                }
                Ok(if skipped > 0 || failed_files > 0 { 1 } else { 0 })
            }

            Commands::Filter {
                input,
                output,
                min_score,
                max_papers,
                keywords,
                venue_tiers,
            } => {
                let records = db::load(&input)?;
                let tiers = match venue_tiers {
                    Some(path) => VenueTiers::from_json_file(&path)?,
                    None => VenueTiers::builtin(),
                };
                let opts = FilterOptions {
                    min_score,
                    max_papers,
                    keywords,
                };
                let total_in = records.len();
                let kept = rank::rank_and_filter(records, &opts, &tiers);
                db::save(&output, &kept)?;
                eprintln!(
                    "filter: {} in, {} kept, {} cut -> {}",
                    total_in,
                    kept.len(),
                    total_in - kept.len(),
                    output.display()
                );
                Ok(0)
            }

            Commands::Stats { input } => {
                let records = db::load(&input)?;
                let stats = stats::compute(&records, &VenueTiers::builtin());
                print_stats(&stats);
                Ok(0)
            }

            Commands::Export {
                jsonl,
                output,
                format,
                keys_only,
            } => {
                let mut records = db::load(&jsonl)?;

                if keys_only {
                    let report = bibtex::assign_keys(&mut records);
                    for record in &records {
                        if let Some(key) = &record.bibtex_key {
                            let title: String = record.title.chars().take(60).collect();
                            println!("{}\t{}", key, title);
                        }
                    }
                    eprintln!(
                        "export: {} keys, {} unkeyable",
                        records.len() - report.unkeyable.len(),
                        report.unkeyable.len()
                    );
                    return Ok(0);
                }

                let (text, summary) = match format {
                    ExportFormat::Bibtex => {
                        let (bib, unkeyable) = bibtex::render_bibliography(&mut records);
                        for &index in &unkeyable {
                            log::warn!(
                                "{}",
                                PaperDbError::UnkeyableRecord { index: index + 1 }
                            );
                        }
                        let summary = format!(
                            "export: {} entries, {} unkeyable",
                            records.len() - unkeyable.len(),
                            unkeyable.len()
                        );
                        (bib, summary)
                    }
                    ExportFormat::Csv => (
                        db::to_csv(&records),
                        format!("export: {} rows", records.len()),
                    ),
                    ExportFormat::Jsonl => (
                        db::to_jsonl(&records)?,
                        format!("export: {} records", records.len()),
                    ),
                };

                match &output {
                    Some(path) => {
                        std::fs::write(path, &text)
                            .map_err(|e| PaperDbError::io(path.clone(), e))?;
                        eprintln!("{} -> {}", summary, path.display());
                    }
                    None => {
                        print!("{}", text);
                        eprintln!("{}", summary);
                    }
                }
                Ok(0)
            }

            Commands::Search {
                input,
                query,
                field,
            } => {
                let records = db::load(&input)?;
                let query = query.to_lowercase();
                let mut found = 0usize;
                for record in &records {
                    let haystack = match field.as_str() {
                        "title" => record.title.clone(),
                        "abstract" => record.abstract_text.clone().unwrap_or_default(),
                        "venue" => record.venue.clone().unwrap_or_default(),
                        "authors" => record.authors.join(" "),
                        "tags" => record
                            .tags
                            .iter()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(" "),
                        other => {
                            return Err(PaperDbError::Config(format!(
                                "unknown search field '{}'",
                                other
                            )))
                        }
                    };
                    if haystack.to_lowercase().contains(&query) {
                        println!("{}", serde_json::to_string(record)?);
                        found += 1;
                    }
                }
                eprintln!("search: {} of {} records match", found, records.len());
                Ok(0)
            }

            Commands::Tag { input, ids, tags } => {
                let mut records = db::load(&input)?;
                let mut tagged = 0usize;
                for record in &mut records {
                    let hit = record
                        .external_ids
                        .values()
                        .any(|v| ids.iter().any(|id| id == v))
                        || record
                            .arxiv_id_display()
                            .map_or(false, |display| ids.contains(&display));
                    if hit {
                        record.tags.extend(tags.iter().cloned());
                        tagged += 1;
                    }
                }
                db::save(&input, &records)?;
                eprintln!("tag: {} of {} records tagged", tagged, records.len());
                Ok(0)
            }

            Commands::Add {
                input,
                record,
                source,
            } => {
                let mut records = if input.exists() {
                    db::load(&input)?
                } else {
                    Vec::new()
                };
                let value: serde_json::Value = serde_json::from_str(&record)?;
                records.push(ingest::ingest_value(value, source)?);

                let total_in = records.len();
                let outcome = dedup::dedup(records);
                db::save(&input, &outcome.records)?;
                eprintln!(
                    "add: database now has {} records ({} merged) -> {}",
                    outcome.records.len(),
                    total_in - outcome.records.len(),
                    input.display()
                );
                Ok(0)
            }
        }
    }

    fn print_stats(stats: &stats::DbStats) {
        use comfy_table::{ContentArrangement, Table};

        println!("Records: {}", stats.total);
        println!(
            "Citations: {} total, {:.1} average",
            stats.total_citations,
            stats.avg_citations()
        );
        println!(
            "With abstract: {}, with DOI: {}",
            stats.with_abstract, stats.with_doi
        );
        if stats.flagged > 0 {
            println!("Flagged unverified-duplicate-risk: {}", stats.flagged);
        }

        let mut years = Table::new();
        years.set_content_arrangement(ContentArrangement::Dynamic);
        years.set_header(vec!["Year", "Papers"]);
        for (year, count) in &stats.years {
            years.add_row(vec![year.to_string(), count.to_string()]);
        }
        if stats.unknown_year > 0 {
            years.add_row(vec!["unknown".to_string(), stats.unknown_year.to_string()]);
        }
        println!("{years}");

        let mut tiers = Table::new();
        tiers.set_content_arrangement(ContentArrangement::Dynamic);
        tiers.set_header(vec!["Venue tier", "Papers"]);
        tiers.add_row(vec!["1 (top venues)".to_string(), stats.tiers[0].to_string()]);
        tiers.add_row(vec!["2".to_string(), stats.tiers[1].to_string()]);
        tiers.add_row(vec![
            "3 (preprint/unknown)".to_string(),
            stats.tiers[2].to_string(),
        ]);
        println!("{tiers}");

        if !stats.sources.is_empty() {
            let mut sources = Table::new();
            sources.set_content_arrangement(ContentArrangement::Dynamic);
            sources.set_header(vec!["Source", "Papers"]);
            for (source, count) in &stats.sources {
                sources.add_row(vec![source.clone(), count.to_string()]);
            }
            println!("{sources}");
        }

        if !stats.tags.is_empty() {
            let mut tags = Table::new();
            tags.set_content_arrangement(ContentArrangement::Dynamic);
            tags.set_header(vec!["Tag", "Papers"]);
            for (tag, count) in &stats.tags {
                tags.add_row(vec![tag.clone(), count.to_string()]);
            }
            println!("{tags}");
        }
    }
}

#[cfg(feature = "cli")]
fn main() {
    match cli::run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
