/// Cloze Eval — scores a trained model on narrative cloze pairs.
///
/// Usage: cloze_eval --model <model.ron> [--pairs <pairs.ron>] [--config <config.ron>]
///                   [--similarity <table.ron>] [--mode <pmi|embedding|interpolated>]
///                   [--sample <events.tsv>] [--seed <n>] [--verbose]
///
/// Without `--pairs` the built-in fixture is used. `--sample` draws pairs
/// from an event stream instead. `--mode` runs a single scoring mode.
/// Otherwise the configured mode runs alone unless a similarity table is
/// supplied, which runs all three modes.
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::Path;
use std::process;

use narrative_chains::core::config::ClozeConfig;
use narrative_chains::core::evaluation::EvaluationHarness;
use narrative_chains::core::model::load_model;
use narrative_chains::core::predictor::{top_n, ScoringMode};
use narrative_chains::core::similarity::SimilarityTable;
use narrative_chains::schema::cloze::{
    chains_by_protagonist, load_pairs_from_ron, narrative_cloze_fixture, sample_cloze_pairs,
};
use narrative_chains::schema::stream::load_tsv;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "Usage: cloze_eval --model <model.ron> [--pairs <pairs.ron>] [--config <config.ron>] [--similarity <table.ron>] [--mode <pmi|embedding|interpolated>] [--sample <events.tsv>] [--seed <n>] [--verbose]";

/// Minimum chain length for sampled pairs.
const SAMPLE_MIN_CHAIN: usize = 3;

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

fn fail(message: String) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut model_path = None;
    let mut pairs_path = None;
    let mut config_path = None;
    let mut similarity_path = None;
    let mut sample_path = None;
    let mut mode = None;
    let mut seed = 0u64;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--model" => model_path = Some(next_value(&args, &mut i, "--model")),
            "--pairs" => pairs_path = Some(next_value(&args, &mut i, "--pairs")),
            "--config" => config_path = Some(next_value(&args, &mut i, "--config")),
            "--similarity" => similarity_path = Some(next_value(&args, &mut i, "--similarity")),
            "--mode" => {
                let raw = next_value(&args, &mut i, "--mode");
                mode = Some(raw.parse::<ScoringMode>().unwrap_or_else(|e| fail(e)));
            }
            "--sample" => sample_path = Some(next_value(&args, &mut i, "--sample")),
            "--seed" => {
                let raw = next_value(&args, &mut i, "--seed");
                seed = raw
                    .parse()
                    .unwrap_or_else(|_| fail(format!("--seed must be an integer, got '{}'", raw)));
            }
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

    let model_path = model_path.unwrap_or_else(|| {
        eprintln!("Error: --model is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let config = match config_path {
        Some(path) => ClozeConfig::load_from_ron(Path::new(&path))
            .unwrap_or_else(|e| fail(format!("loading config '{}': {}", path, e))),
        None => ClozeConfig::default(),
    };

    let model = load_model(Path::new(&model_path))
        .unwrap_or_else(|e| fail(format!("loading model '{}': {}", model_path, e)));
    info!(path = %model_path, verbs = model.verb_count(), "loaded model");

    let pairs = match (pairs_path, sample_path) {
        (Some(path), _) => load_pairs_from_ron(Path::new(&path))
            .unwrap_or_else(|e| fail(format!("loading pairs '{}': {}", path, e))),
        (None, Some(path)) => {
            let raw = load_tsv(Path::new(&path))
                .unwrap_or_else(|e| fail(format!("reading event stream '{}': {}", path, e)));
            let events: Vec<_> = raw.iter().filter_map(|r| r.validate().ok()).collect();
            let chains = chains_by_protagonist(&events);
            let mut rng = StdRng::seed_from_u64(seed);
            sample_cloze_pairs(&chains, SAMPLE_MIN_CHAIN, &mut rng)
        }
        (None, None) => narrative_cloze_fixture(),
    };

    let similarity = similarity_path.map(|path| {
        SimilarityTable::load_from_ron(Path::new(&path))
            .unwrap_or_else(|e| fail(format!("loading similarity table '{}': {}", path, e)))
    });

    let modes = match (mode, similarity.is_some()) {
        (Some(mode), _) => vec![mode],
        (None, true) => vec![
            ScoringMode::PmiOnly,
            ScoringMode::EmbeddingOnly,
            ScoringMode::Interpolated,
        ],
        (None, false) => vec![config.mode],
    };

    println!(
        "Evaluating narrative cloze positions for {} verbs ({} pairs)",
        model.verb_count(),
        pairs.len()
    );

    for mode in modes {
        let mut predictor = config
            .predictor(&model)
            .unwrap_or_else(|e| fail(format!("configuring predictor: {}", e)));
        if let Some(ref table) = similarity {
            predictor = predictor.with_similarity(table);
        }

        if let (Some(n), Some(pair)) = (config.top_n, pairs.first()) {
            let ranked = predictor
                .predict(&pair.chain, mode)
                .unwrap_or_else(|e| fail(format!("predicting: {}", e)));
            println!("\ntop {} for the first chain ({} model):", n, mode);
            for p in top_n(&ranked, n) {
                println!("  {:<16} {:.4}", p.verb, p.score);
            }
        }

        let report = EvaluationHarness::new(&predictor)
            .evaluate(&pairs, mode)
            .unwrap_or_else(|e| fail(format!("evaluating {} model: {}", mode, e)));
        println!("\n{}", report);
    }
}
