use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use lexunion_core::config::{expand_path, Config, PipelineSettings};
use lexunion_core::loader::load_documents;
use lexunion_core::Document;
use lexunion_union::{build_pipeline, Pipeline};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ADD_BATCH: usize = 1_000;

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {} <query|interactive> [documents] [query] [--k N]", prog);
    eprintln!("  query [documents] <query>   print ranked matches as JSON lines");
    eprintln!("  interactive [documents]     read queries from stdin");
    eprintln!("Without [documents], data.documents from lexunion.toml is used.");
    std::process::exit(1)
}

fn parse_args() -> (String, String, Vec<String>, Option<usize>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() { usage(&prog); }
    let cmd = args.remove(0);
    let mut positional = Vec::new();
    let mut k = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--k" => {
                let Some(v) = args.get(i + 1) else { eprintln!("--k requires a number"); std::process::exit(2) };
                match v.parse::<usize>() {
                    Ok(n) if n > 0 => k = Some(n),
                    _ => { eprintln!("--k must be a positive integer, got '{}'", v); std::process::exit(2) }
                }
                i += 2;
            }
            s if s.starts_with("--") => { eprintln!("Unknown flag: {}", s); std::process::exit(2) }
            s => { positional.push(s.to_string()); i += 1; }
        }
    }
    (prog, cmd, positional, k)
}

/// Build the configured pipeline and feed it every document under `path`.
fn ingest(settings: &PipelineSettings, path: &Path) -> anyhow::Result<Pipeline> {
    let documents = load_documents(path)?;
    let mut pipeline = build_pipeline(settings)?;
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?.progress_chars("#>-"));
    for batch in documents.chunks(ADD_BATCH) {
        pipeline = pipeline.add(batch)?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("indexed");
    info!(documents = documents.len(), leaves = pipeline.leaves().len(), "pipeline ready");
    Ok(pipeline)
}

fn print_hits(hits: &[Document]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for hit in hits { writeln!(out, "{}", serde_json::to_string(hit)?)?; }
    Ok(())
}

/// Split `query` positionals into an optional documents path and the query.
fn query_args(positional: &[String]) -> Option<(Option<&String>, &String)> {
    match positional {
        [query] => Some((None, query)),
        [documents, query] => Some((Some(documents), query)),
        _ => None,
    }
}

fn documents_path(config: &Config, arg: Option<&String>) -> PathBuf {
    arg.map(expand_path).unwrap_or_else(|| {
        let dir: String = config.get("data.documents").unwrap_or_else(|_| "./documents".to_string());
        expand_path(dir)
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "lexunion=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let (prog, cmd, positional, k) = parse_args();
    let mut settings = config.pipeline()?;
    if k.is_some() { settings.k = k; }

    match cmd.as_str() {
        "query" => {
            let Some((documents, query)) = query_args(&positional) else { usage(&prog) };
            let pipeline = ingest(&settings, &documents_path(&config, documents))?;
            print_hits(&pipeline.search(query)?)?;
        }
        "interactive" => {
            if positional.len() > 1 { usage(&prog); }
            let pipeline = ingest(&settings, &documents_path(&config, positional.first()))?;
            let stdin = io::stdin();
            loop {
                print!("query> ");
                io::stdout().flush()?;
                let mut input = String::new();
                if stdin.lock().read_line(&mut input)? == 0 { break; }
                let input = input.trim();
                if input.is_empty() { continue; }
                if input == "quit" || input == "exit" { break; }
                let hits = pipeline.search(input)?;
                println!("{} result(s)", hits.len());
                print_hits(&hits)?;
            }
        }
        _ => { eprintln!("Unknown command: {}", cmd); usage(&prog) }
    }
    Ok(())
}
