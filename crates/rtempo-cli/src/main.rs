use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use rtempo_eval::{EngineConfig, EpochUnit, Event, PatternOutcome, TemporalEngine, TemporalStats};
use rtempo_spec::{PatternCollection, PatternKind, parse_pattern_directory, parse_pattern_file};

#[derive(Parser)]
#[command(name = "rtempo")]
#[command(about = "Load temporal patterns and evaluate event streams against them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a pattern YAML file and print the definitions as JSON
    Parse {
        /// Path to a pattern YAML file
        path: PathBuf,

        /// Print JSON on a single line instead of pretty-printing it
        #[arg(short, long)]
        compact: bool,
    },

    /// Load and compile patterns from a file or directory and report results
    Validate {
        /// Path to a pattern file or a directory of pattern files
        path: PathBuf,

        /// Show details for each error (not just summary)
        #[arg(short, long)]
        verbose: bool,
    },

    /// Evaluate events against temporal patterns
    ///
    /// Every event is delivered to every loaded pattern. Events can be
    /// provided as a single JSON string (--event) or as NDJSON
    /// (newline-delimited JSON) from stdin. Event time is read from the
    /// timestamp fields; events without one use the wall clock.
    Eval {
        /// Path to a pattern file or directory of pattern files
        #[arg(short = 'P', long)]
        patterns: PathBuf,

        /// A single event as a JSON string (if omitted, reads NDJSON from stdin)
        #[arg(short, long)]
        event: Option<String>,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Event field holding the event time (can be specified multiple times;
        /// replaces the default list)
        #[arg(short = 't', long = "timestamp-field")]
        timestamp_fields: Vec<String>,

        /// Unit of numeric timestamps. `auto` reads values below 1e12 as
        /// seconds and larger ones as milliseconds
        #[arg(long, value_enum, default_value_t = EpochUnitArg::Auto)]
        epoch_unit: EpochUnitArg,

        /// Print per-pattern statistics after the last event
        #[arg(short, long)]
        stats: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EpochUnitArg {
    Auto,
    Seconds,
    Milliseconds,
}

impl From<EpochUnitArg> for EpochUnit {
    fn from(arg: EpochUnitArg) -> Self {
        match arg {
            EpochUnitArg::Auto => EpochUnit::Auto,
            EpochUnitArg::Seconds => EpochUnit::Seconds,
            EpochUnitArg::Milliseconds => EpochUnit::Milliseconds,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { path, compact } => cmd_parse(path, !compact),
        Commands::Validate { path, verbose } => cmd_validate(path, verbose),
        Commands::Eval {
            patterns,
            event,
            pretty,
            timestamp_fields,
            epoch_unit,
            stats,
        } => cmd_eval(patterns, event, pretty, timestamp_fields, epoch_unit.into(), stats),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_parse(path: PathBuf, pretty: bool) {
    match parse_pattern_file(&path) {
        Ok(collection) => {
            print_warnings(&collection.errors);
            print_json(&collection, pretty);
        }
        Err(e) => {
            eprintln!("Error parsing {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn cmd_validate(path: PathBuf, verbose: bool) {
    let collection = load_collection(&path);
    let engine = TemporalEngine::default();

    let mut errors = collection.errors.clone();
    for def in &collection.patterns {
        if let Err(e) = engine.compile_pattern(def) {
            errors.push(format!("pattern '{}': {e}", def.id));
        }
    }

    let mut by_kind: BTreeMap<PatternKind, usize> = BTreeMap::new();
    for id in engine.pattern_ids() {
        if let Some(kind) = engine.pattern_kind(&id) {
            *by_kind.entry(kind).or_default() += 1;
        }
    }
    let count = |k| by_kind.get(&k).copied().unwrap_or(0);

    println!(
        "Loaded {} patterns from {}",
        collection.len(),
        path.display()
    );
    println!("  Sequence:    {}", count(PatternKind::Sequence));
    println!("  Frequency:   {}", count(PatternKind::Frequency));
    println!("  Correlation: {}", count(PatternKind::Correlation));
    println!("  Errors:      {}", errors.len());

    if verbose && !errors.is_empty() {
        println!("\nErrors:");
        for err in &errors {
            println!("  - {err}");
        }
    }

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn cmd_eval(
    patterns_path: PathBuf,
    event_json: Option<String>,
    pretty: bool,
    timestamp_fields: Vec<String>,
    epoch_unit: EpochUnit,
    stats: bool,
) {
    let collection = load_collection(&patterns_path);

    let mut config = EngineConfig::default();
    if !timestamp_fields.is_empty() {
        config.timestamp_fields = timestamp_fields;
    }
    config.epoch_unit = epoch_unit;
    let engine = TemporalEngine::new(config);
    if let Err(e) = engine.add_collection(&collection) {
        eprintln!("Error compiling patterns: {e}");
        process::exit(1);
    }

    eprintln!(
        "Loaded {} patterns from {}",
        engine.pattern_count(),
        patterns_path.display()
    );

    if let Some(json_str) = event_json {
        let value: serde_json::Value = match serde_json::from_str(&json_str) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Invalid JSON event: {e}");
                process::exit(1);
            }
        };

        let event = Event::from_value(&value);
        let matches = matched(engine.broadcast_event_now(&event));

        if matches.is_empty() {
            eprintln!("No matches.");
        } else {
            for m in &matches {
                print_json(m, pretty);
            }
        }
    } else {
        let stdin = io::stdin();
        let mut line_num = 0u64;
        let mut match_count = 0u64;

        for line in stdin.lock().lines() {
            line_num += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error reading line {line_num}: {e}");
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let value: serde_json::Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("Invalid JSON on line {line_num}: {e}");
                    continue;
                }
            };

            let event = Event::from_value(&value);
            for m in &matched(engine.broadcast_event_now(&event)) {
                match_count += 1;
                print_json(m, pretty);
            }
        }

        eprintln!("Processed {line_num} events, {match_count} matches.");
    }

    if stats {
        print_stats(&engine, pretty);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn matched(outcomes: Vec<PatternOutcome>) -> Vec<PatternOutcome> {
    outcomes.into_iter().filter(|o| o.outcome.is_match()).collect()
}

fn print_stats(engine: &TemporalEngine, pretty: bool) {
    let mut snapshot: BTreeMap<String, TemporalStats> = BTreeMap::new();
    for id in engine.pattern_ids() {
        match engine.get_temporal_stats(&id) {
            Ok(s) => {
                snapshot.insert(id, s);
            }
            Err(e) => log::warn!("no stats for '{id}': {e}"),
        }
    }
    print_json(&serde_json::json!({ "stats": snapshot }), pretty);
}

fn load_collection(path: &Path) -> PatternCollection {
    let collection = if path.is_dir() {
        match parse_pattern_directory(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading patterns from {}: {e}", path.display());
                process::exit(1);
            }
        }
    } else {
        match parse_pattern_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading pattern file {}: {e}", path.display());
                process::exit(1);
            }
        }
    };

    if !collection.errors.is_empty() {
        eprintln!(
            "Warning: {} errors while loading patterns",
            collection.errors.len()
        );
        for err in &collection.errors {
            log::warn!("{err}");
        }
    }

    collection
}

fn print_warnings(errors: &[String]) {
    if !errors.is_empty() {
        eprintln!("Warnings:");
        for err in errors {
            eprintln!("  - {err}");
        }
    }
}

fn print_json(value: &impl serde::Serialize, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(j) => println!("{j}"),
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    }
}
