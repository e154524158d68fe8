use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use space_exporter::AppState;
use space_exporter::config::ExportConfig;
use space_exporter::infrastructure::{credentials, http};
use space_exporter::models::{FolderNode, Node, Token};
use space_exporter::services::archive::{archive_file_name, write_archive};
use space_exporter::services::enumerator::EnumerationReport;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Bulk export of workspace documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enumerate both namespaces and print the tree
    List {
        /// Print the forest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the selected documents into one zip archive
    Export {
        /// Export every enumerated document
        #[arg(long, conflicts_with = "token")]
        all: bool,

        /// Document token to export (repeatable)
        #[arg(long = "token", value_name = "TOKEN")]
        token: Vec<Token>,

        /// Directory the archive is written to
        #[arg(long, short, default_value = ".")]
        output: PathBuf,

        /// Archive name prefix
        #[arg(long, default_value = "space-export")]
        prefix: String,

        /// Exports in flight at once (overrides SPACE_MAX_CONCURRENT_EXPORTS)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "space_exporter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ExportConfig::from_env();

    let state = AppState {
        api: http::setup_client(&config)?,
        credentials: credentials::setup_credentials(&config),
        config,
    };

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    match cli.command {
        Command::List { json } => list(&state, cancel, json).await,
        Command::Export {
            all,
            token,
            output,
            prefix,
            concurrency,
        } => {
            let mut state = state;
            if let Some(n) = concurrency {
                state.config.max_concurrent_exports = n.max(1);
            }
            export(&state, cancel, all, token, output, &prefix).await
        }
    }
}

async fn list(state: &AppState, cancel: CancellationToken, json: bool) -> anyhow::Result<()> {
    let report = state.enumerator(cancel).enumerate().await;
    warn_partial(&report);

    if json {
        println!("{}", serde_json::to_string_pretty(&report.forest)?);
    } else {
        for root in report.forest.roots() {
            print_folder(root, 0);
        }
    }
    Ok(())
}

async fn export(
    state: &AppState,
    cancel: CancellationToken,
    all: bool,
    tokens: Vec<Token>,
    output: PathBuf,
    prefix: &str,
) -> anyhow::Result<()> {
    if !all && tokens.is_empty() {
        anyhow::bail!("nothing selected: pass --all or at least one --token");
    }

    let report = state.enumerator(cancel.clone()).enumerate().await;
    warn_partial(&report);
    if report.cancelled {
        anyhow::bail!("enumeration cancelled");
    }

    let selection: Vec<Token> = if all {
        report.forest.files().iter().map(|f| f.id.clone()).collect()
    } else {
        tokens
    };

    let batch = state.batch(cancel).export(&report.forest, &selection).await;

    if batch.succeeded() > 0 {
        std::fs::create_dir_all(&output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        let path = output.join(archive_file_name(prefix, chrono::Utc::now()));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let entries = write_archive(file, &batch)?;
        info!("💾 Saved {} file(s) to {}", entries.len(), path.display());
        println!("{}", path.display());
    }

    println!(
        "Exported {} of {} file(s), {} failed",
        batch.succeeded(),
        batch.files.len(),
        batch.failed()
    );
    for (file, error) in batch.failures() {
        let label = if file.name.is_empty() { &file.token } else { &file.name };
        println!("  ✗ {} ({}): {}", label, file.token, error);
    }
    Ok(())
}

fn warn_partial(report: &EnumerationReport) {
    if let Some(err) = report.partial_error() {
        warn!("{}", err);
        for failure in &report.failures {
            warn!("  {}: {}", failure.path, failure.reason);
        }
    }
    if report.cancelled {
        warn!("Enumeration was cancelled, the tree is incomplete");
    }
}

fn print_folder(folder: &FolderNode, depth: usize) {
    println!("{}📁 {}", "  ".repeat(depth), folder.name);
    for child in &folder.children {
        match child {
            Node::Folder(sub) => print_folder(sub, depth + 1),
            Node::File(file) => println!(
                "{}📄 {} [{}] {}",
                "  ".repeat(depth + 1),
                file.name,
                file.kind.export_type(),
                file.id
            ),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, cancelling...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, cancelling...");
        },
    }
}
