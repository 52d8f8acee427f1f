use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use siga_lib::modules::import_jobs::commands::{self, render_summary};
use siga_lib::modules::import_jobs::{ImportPhase, ImportSnapshot};
use siga_lib::shared::utils::init_logger;
use siga_lib::shared::{AppConfig, SessionEvent};
use siga_lib::ClientContext;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siga-import", version, about = "Track SIGA bulk imports")]
struct Cli {
    /// Backend base URL (overrides SIGA_API_URL)
    #[arg(long, env = "SIGA_API_URL", global = true)]
    api_url: Option<String>,

    /// Print snapshots as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a file and follow the import until it finishes
    Start { file: PathBuf },
    /// Resume the import persisted by an earlier run
    Resume,
    /// Show the persisted import handle
    Status,
    /// Cancel the persisted import
    Cancel,
    /// Forget any persisted import
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = load_config(cli.api_url.as_deref())?;
    let context = ClientContext::initialize(config).context("Failed to initialize SIGA client")?;

    let mut session_rx = context.session_events.subscribe();
    tokio::spawn(async move {
        while let Ok(SessionEvent::Expired { status, endpoint, .. }) = session_rx.recv().await {
            eprintln!(
                "Session expired (HTTP {} on {}), please sign in again",
                status, endpoint
            );
        }
    });

    let json = cli.json;
    let print = move |snapshot: &ImportSnapshot| print_snapshot(snapshot, json);

    // Followed commands print every snapshot as it arrives, the others only the last one.
    let (outcome, followed) = match cli.command {
        Command::Start { file } => {
            let tracker = context.tracker.clone();
            let result = follow_until_interrupted(&context, async move {
                commands::start_import(&tracker, &file, print).await
            })
            .await;
            (result, true)
        }
        Command::Resume => {
            let tracker = context.tracker.clone();
            let result = follow_until_interrupted(&context, async move {
                commands::resume_import(&tracker, print).await
            })
            .await;
            (result, true)
        }
        Command::Status => {
            let view = commands::import_status(context.store.as_ref())
                .await
                .map_err(|e| anyhow!(e))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                match &view.process_id {
                    Some(id) if view.resumable => println!("Import {} in progress", id),
                    Some(id) => println!("Stale import handle {}", id),
                    None => println!("No import in progress"),
                }
            }
            return Ok(());
        }
        Command::Cancel => (commands::cancel_import(&context.tracker).await, false),
        Command::Reset => (Ok(commands::reset_import(&context.tracker).await), false),
    };

    let snapshot = outcome.map_err(|e| anyhow!(e))?;
    if !followed {
        print_snapshot(&snapshot, json);
    }

    if snapshot.phase == ImportPhase::Errored || snapshot.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(api_url: Option<&str>) -> Result<AppConfig> {
    match api_url {
        Some(url) => {
            dotenvy::dotenv().ok();
            AppConfig::from_lookup(|key| {
                if key == "SIGA_API_URL" {
                    Some(url.to_string())
                } else {
                    std::env::var(key).ok()
                }
            })
        }
        None => AppConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))
}

/// Ctrl-C detaches without clearing persisted state so `resume` can pick the job up.
async fn follow_until_interrupted<F>(
    context: &ClientContext,
    follow: F,
) -> std::result::Result<ImportSnapshot, String>
where
    F: std::future::Future<Output = std::result::Result<ImportSnapshot, String>>,
{
    tokio::select! {
        result = follow => result,
        _ = tokio::signal::ctrl_c() => {
            context.tracker.shutdown().await;
            eprintln!("Detached; run `siga-import resume` to keep following the import");
            Ok(context.tracker.snapshot())
        }
    }
}

fn print_snapshot(snapshot: &ImportSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Could not encode snapshot: {}", e),
        }
    } else {
        println!("{}", render_summary(snapshot));
    }
}
