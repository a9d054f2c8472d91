use std::env;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ragstore_core::config::Config;
use ragstore_core::error::Error;
use ragstore_core::loader::DocumentLoader;
use ragstore_core::types::{Collection, Document};
use ragstore_embed::get_default_embedder;
use ragstore_hybrid::Engine;

const USAGE: &str = "Usage: ragstore <command> [args...]

Commands:
  ingest <dir> [--collection general|domain|auto] [--batch-size N]
  query <text> [--collection general|domain|auto] [--k N] [--no-fusion] [--require-results]
  classify <text>
  compact
  stats";

/// `auto` defers the choice to the engine's classifier.
#[derive(Clone, Copy)]
enum Target {
    Fixed(Collection),
    Auto,
}

fn parse_target(value: &str) -> anyhow::Result<Target> {
    if value.eq_ignore_ascii_case("auto") { return Ok(Target::Auto); }
    Ok(Target::Fixed(value.parse()?))
}

fn parse_number(flag: &str, value: Option<&String>) -> anyhow::Result<usize> {
    value
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| anyhow::anyhow!("{} requires a number", flag))
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{}", USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn open_engine(config: &Config) -> anyhow::Result<Engine> {
    let engine_config = config.engine()?;
    let embedder = get_default_embedder(&engine_config.embedding)?;
    Ok(Engine::open(engine_config, embedder)?)
}

fn ingest(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let mut data_dir = None;
    let mut target = Target::Auto;
    let mut batch_size = 256;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--collection" | "-c" => { target = parse_target(args.get(i + 1).map(String::as_str).unwrap_or_default())?; i += 1; }
            "--batch-size" => { batch_size = parse_number("--batch-size", args.get(i + 1))?.max(1); i += 1; }
            other if !other.starts_with('-') => data_dir = Some(PathBuf::from(other)),
            other => warn!("Ignoring unknown flag {}", other),
        }
        i += 1;
    }
    let data_dir = data_dir.ok_or_else(|| anyhow::anyhow!("ingest requires a data directory\n\n{}", USAGE))?;

    let engine = open_engine(config)?;
    let loaded = DocumentLoader::new().load_directory(&data_dir)?;
    for err in &loaded.errors { warn!("{}:{}: {}", err.path.display(), err.line, err.reason); }
    println!("Loaded {} documents from {} ({} bad lines)", loaded.documents.len(), data_dir.display(), loaded.errors.len());

    let mut batches: Vec<(Collection, Vec<Document>)> = Vec::new();
    match target {
        Target::Fixed(collection) => batches.push((collection, loaded.documents)),
        Target::Auto => {
            let (domain, general): (Vec<Document>, Vec<Document>) =
                loaded.documents.into_iter().partition(|d| engine.classify(&d.content) == Collection::Domain);
            batches.push((Collection::General, general));
            batches.push((Collection::Domain, domain));
        }
    }

    let total: usize = batches.iter().map(|(_, docs)| docs.len()).sum();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len}")?);
    let totals = ingest_and_persist(engine, batches, batch_size, &pb)?;
    println!("Ingest complete: {} accepted, {} duplicates, {} skipped", totals.accepted, totals.duplicates, totals.skipped);
    Ok(())
}

#[derive(Debug, Default)]
struct IngestTotals {
    accepted: usize,
    duplicates: usize,
    skipped: usize,
}

/// Feed `batches` to the engine `batch_size` documents at a time, then persist.
/// Chunks committed before a failing chunk are persisted before the error is returned.
fn ingest_and_persist(
    engine: Engine,
    batches: Vec<(Collection, Vec<Document>)>,
    batch_size: usize,
    pb: &ProgressBar,
) -> Result<IngestTotals, Error> {
    let mut totals = IngestTotals::default();
    let mut outcome = Ok(());
    'batches: for (collection, documents) in batches {
        pb.set_message(collection.to_string());
        for chunk in documents.chunks(batch_size) {
            match engine.ingest(chunk.to_vec(), collection) {
                Ok(report) => {
                    for err in &report.skipped { warn!("{}", err); }
                    totals.accepted += report.accepted;
                    totals.duplicates += report.duplicates;
                    totals.skipped += report.skipped.len();
                    pb.inc(chunk.len() as u64);
                }
                Err(e) => {
                    warn!("Stopping ingest into {}; persisting {} documents accepted so far", collection, totals.accepted);
                    outcome = Err(e);
                    break 'batches;
                }
            }
        }
    }
    pb.finish_and_clear();
    let persisted = engine.shutdown();
    outcome.and(persisted)?;
    Ok(totals)
}

fn query(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    let mut text = None;
    let mut target = Target::Auto;
    let mut k = engine.config().search.default_k;
    let mut use_fusion = engine.config().search.use_fusion;
    let mut require_results = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--collection" | "-c" => { target = parse_target(args.get(i + 1).map(String::as_str).unwrap_or_default())?; i += 1; }
            "--k" | "-k" => { k = parse_number("--k", args.get(i + 1))?; i += 1; }
            "--no-fusion" => use_fusion = false,
            "--require-results" => require_results = true,
            other if !other.starts_with('-') => text = Some(other.to_string()),
            other => warn!("Ignoring unknown flag {}", other),
        }
        i += 1;
    }
    let text = text.ok_or_else(|| anyhow::anyhow!("query requires text\n\n{}", USAGE))?;
    let collection = match target {
        Target::Fixed(collection) => collection,
        Target::Auto => engine.classify(&text),
    };
    info!("Query routed to {} (k={}, fusion={})", collection, k, use_fusion);

    let results = engine.query(&text, collection, k, use_fusion)?;
    if results.is_empty() && require_results { return Err(Error::NoResults.into()); }
    println!("Found {} results in {} for: \"{}\"", results.len(), collection, text);
    for (i, doc) in results.iter().enumerate() {
        let source = doc.metadata.get("source").map(String::as_str).unwrap_or("-");
        println!("\n  {}. [{}]", i + 1, source);
        println!("     {}", doc.content);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&config, &args)?,
        "query" => query(&config, &args)?,
        "classify" => {
            let text = args.join(" ");
            if text.trim().is_empty() { anyhow::bail!("classify requires text\n\n{}", USAGE); }
            let engine = open_engine(&config)?;
            println!("{}", engine.classify(&text));
        }
        "compact" => {
            let engine = open_engine(&config)?;
            let report = engine.compact()?;
            engine.shutdown()?;
            println!("Compaction removed {} documents (general {}, domain {})", report.removed, report.general, report.domain);
        }
        "stats" => {
            let engine = open_engine(&config)?;
            let stats = engine.stats()?;
            for c in &stats.collections {
                let dim = c.dimension.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
                println!("{:<8} documents={:<6} keywords={:<6} dim={}", c.collection, c.documents, c.keywords, dim);
            }
            println!("ledger   hashes={}", stats.ledger_size);
        }
        "help" | "--help" | "-h" => println!("{}", USAGE),
        _ => { eprintln!("Unknown command: {}\n\n{}", cmd, USAGE); std::process::exit(1); }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragstore_core::config::EngineConfig;
    use ragstore_core::traits::Embedder;
    use ragstore_embed::HashEmbedder;
    use tempfile::TempDir;

    /// 16 dims, except text mentioning "wide" gets 32.
    struct WidthEmbedder;

    impl Embedder for WidthEmbedder {
        fn dim(&self) -> usize { 16 }

        fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let dim = if text.contains("wide") { 32 } else { 16 };
            HashEmbedder::new(dim).embed_text(text)
        }
    }

    #[test]
    fn failed_chunk_still_persists_earlier_chunks() {
        let tmp = TempDir::new().unwrap();
        let mut config = EngineConfig::default();
        config.storage.general_dir = tmp.path().join("general").to_string_lossy().into_owned();
        config.storage.domain_dir = tmp.path().join("domain").to_string_lossy().into_owned();

        let engine = Engine::open(config.clone(), Box::new(WidthEmbedder)).unwrap();
        let batches = vec![(Collection::General, vec![Document::new("first chunk"), Document::new("wide chunk")])];
        let err = ingest_and_persist(engine, batches, 1, &ProgressBar::hidden()).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 16, actual: 32 }));

        let reopened = Engine::open(config, Box::new(HashEmbedder::new(16))).unwrap();
        assert_eq!(reopened.documents(Collection::General).unwrap(), vec![Document::new("first chunk")]);
    }
}
