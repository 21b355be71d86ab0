mod app;
mod cli;
mod config;
mod confirm;
mod filter;
mod ports;
mod signals;
mod table;
mod theme;
mod tree;
mod tui;
mod ui;

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use app::App;
use cli::{KillOptions, ListOptions};
use config::{Config, SortField, Theme};
use ports::Scanner;

const LOG_ENV: &str = "REAP_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "reap",
    about = "Interactive TUI for viewing and killing processes on ports",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// seconds between rescans.
    #[arg(short = 'i', long = "interval", value_name = "secs",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// show system processes in addition to user processes.
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// theme selection for the tui.
    #[arg(long = "theme", value_enum)]
    pub theme: Option<Theme>,

    /// initial sort column.
    #[arg(long = "sort-by", value_enum)]
    pub sort_by: Option<SortField>,

    /// config file to read instead of ~/.config/reap/config.toml.
    #[arg(long = "config", value_name = "path")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// list listening ports and exit.
    List {
        /// only this port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// only processes whose name contains this text.
        #[arg(short = 'n', long = "name")]
        name: Option<String>,

        /// print JSON instead of a table.
        #[arg(long = "json")]
        json: bool,

        /// group related processes like the dashboard does.
        #[arg(long = "tree")]
        tree: bool,
    },
    /// kill the processes listening on the given ports.
    Kill {
        #[arg(value_name = "PORT", required = true)]
        ports: Vec<String>,

        /// send SIGKILL instead of SIGTERM.
        #[arg(short = 'f', long = "force")]
        force: bool,

        /// do not ask for confirmation.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

impl Cli {
    /// Config file values with command-line flags layered on top.
    fn resolve_config(&self) -> Config {
        let mut config = Config::load(self.config.as_deref());
        if let Some(interval) = self.interval {
            config.refresh_interval = interval;
        }
        if self.all {
            config.show_system = true;
        }
        if let Some(theme) = self.theme {
            config.theme = theme;
        }
        if let Some(sort_by) = self.sort_by {
            config.sort_by = sort_by;
        }
        config
    }
}

/// The dashboard owns the terminal, so its log goes to a file. Logging stays
/// off unless `REAP_LOG` is set.
fn init_logging(interactive: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, "off"));
    builder.format_timestamp_secs();

    if interactive && std::env::var_os(LOG_ENV).is_some() {
        match open_log_file() {
            Some(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            None => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}

fn open_log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("reap");
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("reap.log"))
        .ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.command.is_none());
    let config = args.resolve_config();
    let scanner: Arc<dyn Scanner> = Arc::from(ports::new_scanner());

    match args.command {
        None => {
            log::info!("reap v{} starting", env!("CARGO_PKG_VERSION"));
            let interval = Duration::from_secs(config.refresh_interval);
            tui::run(App::new(config), scanner, interval).await
        }
        Some(Command::List {
            port,
            name,
            json,
            tree,
        }) => cli::list(
            scanner.as_ref(),
            &config,
            &ListOptions {
                port,
                name,
                json,
                tree,
            },
        ),
        Some(Command::Kill { ports, force, yes }) => {
            cli::kill(scanner.as_ref(), &KillOptions { ports, force, yes })
        }
    }
}
