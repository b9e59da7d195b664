/// Chain Trainer — builds a narrative chain model from an event stream.
///
/// Usage: chain_trainer --input <events.tsv> --output <model.ron>
///                      [--export <events.tsv>] [--config <config.ron>] [--verbose]
use std::env;
use std::path::Path;
use std::process;

use narrative_chains::core::config::ClozeConfig;
use narrative_chains::core::corpus::CorpusBuilder;
use narrative_chains::core::model::save_model;
use narrative_chains::schema::stream::{load_tsv, save_tsv};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "Usage: chain_trainer --input <events.tsv> --output <model.ron> [--export <events.tsv>] [--config <config.ron>] [--verbose]";

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a global tracing subscriber is already installed");
    }
}

fn next_value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    args.get(*i).cloned().unwrap_or_else(|| {
        eprintln!("Error: {} needs a value", flag);
        eprintln!("{}", USAGE);
        process::exit(1);
    })
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = None;
    let mut export = None;
    let mut config_path = None;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => input = Some(next_value(&args, &mut i, "--input")),
            "--output" => output = Some(next_value(&args, &mut i, "--output")),
            "--export" => export = Some(next_value(&args, &mut i, "--export")),
            "--config" => config_path = Some(next_value(&args, &mut i, "--config")),
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    setup_logging(verbose);

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });
    let output_path = output.unwrap_or_else(|| {
        eprintln!("Error: --output is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let config = match config_path {
        Some(path) => ClozeConfig::load_from_ron(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Error loading config '{}': {}", path, e);
            process::exit(1);
        }),
        None => ClozeConfig::default(),
    };

    let events = load_tsv(Path::new(&input_path)).unwrap_or_else(|e| {
        eprintln!("Error reading event stream '{}': {}", input_path, e);
        process::exit(1);
    });
    info!(path = %input_path, events = events.len(), "read event stream");

    let builder = CorpusBuilder::from_shards(&events, config.shard_size);
    let stats = builder.stats();

    if let Some(ref path) = export {
        save_tsv(builder.ordered_events(), Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error exporting events to '{}': {}", path, e);
            process::exit(1);
        });
        info!(path = %path, events = stats.accepted, "exported ordered events");
    }

    let model = builder.build();
    println!(
        "Model built: {} events ({} skipped), {} verbs, coreference total {}",
        model.total_events(),
        stats.skipped,
        model.verb_count(),
        model.total_coreference()
    );

    save_model(&model, Path::new(&output_path)).unwrap_or_else(|e| {
        eprintln!("Error saving model to '{}': {}", output_path, e);
        process::exit(1);
    });

    println!("Model saved to '{}'", output_path);
}
