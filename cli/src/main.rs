use clap::{Parser, Subcommand};
use runlens_cli::CliContext;
use runlens_cli::commands;
use runlens_cli::logging;
use runlens_cli::printer;
use runlens_cli::readline;
use runlens_cli::store_watcher;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();
    let (ctx, events) = CliContext::new()?;

    {
        let mut tasks = ctx.tasks.lock().await;
        tasks.interaction_printer = Some(printer::spawn(events));
        if ctx.config.read().await.watch_storage {
            tasks.store_watcher = store_watcher::init_watcher(&ctx);
        }
    }

    // Optional feed file to load on startup
    if let Some(path) = std::env::args().nth(1) {
        commands::load(&path, &ctx).await;
    }

    while let Some(line) = readline()? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    ctx.shutdown().await;
    Ok(())
}

#[derive(Parser)]
#[command(version, about = "runlens")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a record feed (JSON array or {records, page})
    Load {
        #[arg(short, long)]
        path: String,
    },
    Reload,
    Select {
        #[arg(short, long)]
        category: String,
    },
    Deselect {
        #[arg(short, long)]
        category: String,
    },
    Expand {
        #[arg(short, long)]
        category: String,
    },
    Collapse {
        #[arg(short, long)]
        category: String,
    },
    /// Select a subtype by composite key, e.g. `login_failed::timeout`
    Subtype {
        #[arg(short, long)]
        key: String,
    },
    Unsubtype {
        #[arg(short, long)]
        key: String,
    },
    All,
    None,
    Default,
    /// Print the distribution; order is extraction, alpha, count, or a comma list
    Show {
        #[arg(short, long)]
        order: Option<String>,
    },
    Filtered,
    Selection,
    Hover {
        #[arg(short, long)]
        row: usize,
    },
    Leave,
    Click {
        #[arg(short, long)]
        row: usize,
    },
    Config,
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "runlens".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Load { path }) => commands::load(path, ctx).await,
        Some(Commands::Reload) => commands::reload(ctx).await,
        Some(Commands::Select { category }) => commands::select(category, ctx).await,
        Some(Commands::Deselect { category }) => commands::deselect(category, ctx).await,
        Some(Commands::Expand { category }) => commands::expand(category, ctx).await,
        Some(Commands::Collapse { category }) => commands::collapse(category, ctx).await,
        Some(Commands::Subtype { key }) => commands::subtype(key, ctx).await,
        Some(Commands::Unsubtype { key }) => commands::unsubtype(key, ctx).await,
        Some(Commands::All) => commands::select_all(ctx).await,
        Some(Commands::None) => commands::select_none(ctx).await,
        Some(Commands::Default) => commands::select_default(ctx).await,
        Some(Commands::Show { order }) => commands::show(order.as_deref(), ctx).await,
        Some(Commands::Filtered) => commands::show_filtered(ctx).await,
        Some(Commands::Selection) => commands::show_selection(ctx).await,
        Some(Commands::Hover { row }) => commands::hover(*row, ctx).await?,
        Some(Commands::Leave) => commands::leave(ctx).await?,
        Some(Commands::Click { row }) => commands::click(*row, ctx).await?,
        Some(Commands::Config) => commands::show_settings(ctx).await,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
