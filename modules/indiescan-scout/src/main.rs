use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog_client::CatalogClient;
use indiescan_common::{ScanConfig, ScanRequest, ScanStats, Secrets, VerifiedResult};
use indiescan_scout::report::write_report;
use indiescan_scout::{client_config, Scanner};

#[derive(Parser)]
#[command(name = "indiescan", about = "Finds recently active self-released creators in the catalog")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/indiescan.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one or more scan pages
    Scan(ScanArgs),
    /// Validate the config file and show which secrets are set
    Check,
}

#[derive(Args)]
struct ScanArgs {
    /// Number of pages to scan; later pages skip creators found by earlier ones
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// JSON file of already-reported creator ids, read before and updated after the run
    #[arg(long)]
    seen: Option<PathBuf>,

    /// Write a tab-separated report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print results as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = if cli.config.exists() {
        ScanConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
        ScanConfig::default()
    };
    let secrets = Secrets::from_env();
    secrets.log_redacted();

    match cli.command {
        Command::Check => {
            config.validate()?;
            info!("Config OK");
            Ok(())
        }
        Command::Scan(args) => run_scan(config, &secrets, args).await,
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("indiescan=info".parse()?)
        .add_directive("indiescan_scout=info".parse()?)
        .add_directive("catalog_client=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn run_scan(config: ScanConfig, secrets: &Secrets, args: ScanArgs) -> Result<()> {
    let client = CatalogClient::new(client_config(&config.upstream, secrets))?;
    let mut scanner = Scanner::new(Arc::new(client), config)?;

    let mut seen = match &args.seen {
        Some(path) => read_seen(path)?,
        None => HashSet::new(),
    };
    info!(pages = args.pages, already_found = seen.len(), "Indiescan starting");

    let mut found: Vec<VerifiedResult> = Vec::new();
    let mut totals = ScanStats::default();
    for page in 0..args.pages {
        let request = ScanRequest {
            page_index: Some(page),
            already_found_ids: seen.clone(),
        };
        let response = scanner.scan(&request).await?;

        seen.extend(response.results.iter().map(|r| r.id.clone()));
        accumulate(&mut totals, &response.stats);
        found.extend(response.results);
    }

    if let Some(path) = &args.seen {
        write_seen(path, &seen)?;
    }
    if let Some(path) = &args.report {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_report(&mut BufWriter::new(file), &found)?;
        info!(path = %path.display(), rows = found.len(), "Wrote report");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        for r in &found {
            println!(
                "{}  followers={} popularity={} latest={}  {}",
                r.name, r.follower_count, r.popularity_score, r.latest_release, r.url
            );
        }
        println!("{totals}");
    }
    Ok(())
}

fn accumulate(totals: &mut ScanStats, page: &ScanStats) {
    totals.attempts += page.attempts;
    totals.works_inspected += page.works_inspected;
    totals.candidates_matched += page.candidates_matched;
    totals.filtered_out += page.filtered_out;
    totals.verification_rejected += page.verification_rejected;
    totals.verified += page.verified;
    totals.chunks_skipped += page.chunks_skipped;
}

fn read_seen(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let ids: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("parsing {} as a JSON list of ids", path.display()))?;
    Ok(ids.into_iter().collect())
}

fn write_seen(path: &Path, seen: &HashSet<String>) -> Result<()> {
    let mut ids: Vec<&String> = seen.iter().collect();
    ids.sort();
    std::fs::write(path, serde_json::to_string_pretty(&ids)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
