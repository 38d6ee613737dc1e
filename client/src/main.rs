use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use xp_dashboard::config::Config;
use xp_dashboard::report::{self, TOP_PROJECTS};
use xp_dashboard::stat::{Gateway, SessionStore, Snapshot, signin};
use xp_dashboard::tui;

#[derive(Parser)]
#[command(name = "xp-dashboard", about = "XP progress dashboard")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and save the session token
    Login {
        /// Username or email
        #[arg(short, long)]
        identifier: String,
        /// Password; read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Print profile, total XP, milestones and top projects
    Summary {
        /// Number of projects to list
        #[arg(long, default_value_t = TOP_PROJECTS)]
        top: usize,
    },
    /// Server-side XP total for a time window, with the first rows
    Range {
        /// Window start (RFC 3339), requires --to
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,
        /// Window end, exclusive (RFC 3339), requires --from
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,
        /// Window length in days when --from/--to are not given
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Rows to print
        #[arg(long, default_value_t = 10)]
        preview: usize,
        /// Recompute the total from the returned rows
        #[arg(long)]
        verify: bool,
    },
    /// Interactive terminal dashboard (default)
    Tui,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = SessionStore::new(config.session_file.clone());
    let rt = tokio::runtime::Runtime::new()?;

    match cli.cmd.unwrap_or(Commands::Tui) {
        Commands::Login {
            identifier,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let session = rt.block_on(signin(&config, &identifier, &password))?;
            store.save(&session)?;
            info!(path = %store.path().display(), "session saved");
            println!("Signed in as {identifier}");
        }
        Commands::Logout => {
            store.clear()?;
            println!("Signed out");
        }
        Commands::Summary { top } => {
            let gateway = gateway(&config, &store)?;
            let snap = rt.block_on(Snapshot::fetch(&gateway))?;
            print!("{}", report::render_summary(&snap, top));
        }
        Commands::Range {
            from,
            to,
            days,
            preview,
            verify,
        } => {
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                _ => report::last_days_range(Utc::now(), days)
                    .with_context(|| format!("--days {days} reaches past the supported date range"))?,
            };
            if from >= to {
                bail!("--from must be earlier than --to");
            }
            let gateway = gateway(&config, &store)?;
            let range = rt.block_on(gateway.fetch_range(from, to))?;
            print!("{}", report::render_range(&range, preview, verify));
        }
        Commands::Tui => tui::run_tui(config, store, &rt)?,
    }
    Ok(())
}

fn gateway(config: &Config, store: &SessionStore) -> Result<Gateway> {
    let session = store
        .load()?
        .context("not logged in; run `xp-dashboard login` first")?;
    Ok(Gateway::new(config, session))
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("empty password");
    }
    Ok(password)
}
