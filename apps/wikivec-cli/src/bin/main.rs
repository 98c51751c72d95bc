use std::env;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use wikivec_core::config::Config;
use wikivec_core::types::{CrawlMode, CrawlReport};
use wikivec_crawler::HttpFetcher;
use wikivec_daemon::{Pipeline, SystemClock};
use wikivec_embed::default_embedder;

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} <full|incremental|schedule|monitor|query> [args...]");
    eprintln!("  full [--force]        rebuild the whole index from scratch");
    eprintln!("  incremental           crawl once, re-embedding only changed pages");
    eprintln!("  schedule              run the timer loop (Ctrl-C to stop)");
    eprintln!("  monitor               alias for schedule");
    eprintln!("  query \"<text>\" [k]    search the index");
    std::process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        usage(&prog);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn print_report(report: &CrawlReport) {
    println!(
        "Crawl finished: {} discovered, {} new, {} updated, {} unchanged, {} failed",
        report.discovered, report.new_pages, report.updated, report.unchanged, report.failed
    );
}

/// Forwards Ctrl-C into the stop channel the pipeline watches.
fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing up");
            let _ = tx.send(true);
        }
    });
    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();

    let fetcher = HttpFetcher::new(&settings.crawl)?;
    let embedder = default_embedder(&settings.embedding)?;
    let mut pipeline = Pipeline::new(
        settings,
        Box::new(fetcher),
        embedder,
        Box::new(SystemClock),
    )?;

    match cmd.as_str() {
        "full" | "incremental" => {
            let force = args.iter().any(|a| a == "--force");
            let mode = if cmd == "full" {
                CrawlMode::Full
            } else {
                CrawlMode::Incremental
            };
            let stop = shutdown_channel();
            let report = pipeline.run_once(mode, force, &stop).await?;
            print_report(&report);
        }
        "schedule" | "monitor" => {
            let stop = shutdown_channel();
            pipeline.run_forever(stop).await?;
        }
        "query" => {
            let Some(text) = args.first() else {
                eprintln!("Usage: wikivec query \"<text>\" [k]");
                std::process::exit(1);
            };
            let k = args
                .get(1)
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or_else(|| config.get("query.top_k").unwrap_or(5));
            let hits = pipeline.query(text, k).await?;
            if hits.is_empty() {
                println!("No results (index holds {} pages)", pipeline.index_len());
            }
            for (i, hit) in hits.iter().enumerate() {
                println!("{}. score={:.4}  {}", i + 1, hit.score, hit.url);
                println!("   {}", hit.snippet);
            }
        }
        other => {
            eprintln!("Unknown command: {other}");
            usage("wikivec");
        }
    }
    Ok(())
}
