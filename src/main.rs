//! preflight binary: CLI parsing and the interactive driver.
//!
//! All check logic lives in the library; this file only wires the
//! engine to a selector, a renderer, and the key loop.

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use preflight::catalog::Selection;
use preflight::config::CheckConfig;
use preflight::engine::CheckEngine;
use preflight::exec::SshExecutor;
use preflight::render::render_table;
use preflight::retry::select_failed;

#[derive(Parser)]
#[command(
    name = "preflight",
    about = "Pre-collection environment health check for the data rig",
    version
)]
struct Args {
    /// Items to check: an id list ("1,2,3") or an alias
    /// (gate, mount, topic, mdc1, mdc2, all). Empty means everything.
    #[arg(long, env = "PREFLIGHT_ITEMS", default_value = "")]
    items: String,

    /// Emit a JSON report to stdout instead of the interactive table
    #[arg(long)]
    json: bool,

    /// One-shot mode: after a failing run, re-run just the failed
    /// items once and report that result
    #[arg(long)]
    retry: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("preflight=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let cfg = CheckConfig::load();
    let exec = Arc::new(SshExecutor::new(cfg.connect_timeout));
    let engine = CheckEngine::new(exec, cfg);
    let selection = Selection::parse(&args.items, engine.catalog());

    if args.json || args.retry {
        let result = if args.retry {
            engine.run_with_retry(&selection).await
        } else {
            engine.run(&selection).await
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print!("{}", render_table(&result));
        }
        std::process::exit(if result.success { 0 } else { 1 });
    }

    interactive(&engine, selection).await
}

fn clear_screen() {
    print!("\x1bc");
}

/// The operator loop: run, show the table, then wait for R (rerun
/// everything), X (recheck only the failed items), or Q (quit).
async fn interactive(
    engine: &CheckEngine,
    mut selection: Selection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        clear_screen();
        println!("Running checks... expect about a minute.");
        let result = engine.run(&selection).await;
        print!("{}", render_table(&result));

        if result.success {
            println!("Rig healthy; data collection may proceed.");
            std::process::exit(0);
        }

        println!("Press R to rerun everything, X to recheck failed items, Q to quit.");
        loop {
            let line = match input.next_line().await? {
                Some(line) => line,
                None => std::process::exit(1),
            };
            match line.trim().to_ascii_lowercase().as_str() {
                "r" => {
                    selection = Selection::All;
                    break;
                }
                "x" => {
                    selection = Selection::from_ids(select_failed(&result));
                    break;
                }
                "q" => std::process::exit(1),
                _ => continue,
            }
        }
    }
}
