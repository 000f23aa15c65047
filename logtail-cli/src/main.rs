mod backends;
mod client;
mod commands;
mod health;
mod logging;
mod session;
mod tui;
mod ui;
mod view;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast;

use logtail_core::backend::Backend;
use logtail_core::config::{ConfigError, LogtailConfig};
use logtail_core::host::{Host, HostRegistry, HostSource, SERVERS_ENV};
use logtail_core::launch::LaunchParams;

use backends::{FakeBackend, HttpBackend};
use client::LogClient;
use health::HealthMonitor;
use logging::LogSink;
use view::{ViewAction, ViewPrefs};

#[derive(Parser)]
#[command(name = "logtail")]
#[command(about = "Tail log files served by remote log servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: discover logtail.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON host list: [{"name": "..", "url": ".."}]
    #[arg(long, global = true)]
    hosts_file: Option<PathBuf>,

    /// Initial host, by name or URL
    #[arg(long, global = true)]
    host: Option<String>,

    /// Deep link carrying host=, file= and an optional #fragment
    #[arg(long, global = true)]
    link: Option<String>,

    /// Use the in-memory demo backend
    #[arg(long, global = true)]
    demo: bool,

    #[arg(long, global = true)]
    debug: bool,

    /// Write logs here (the TUI discards them otherwise)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive viewer (default)
    Tui {
        file: Option<String>,
        #[arg(short = 'n', long)]
        line_numbers: bool,
    },
    /// Stream a file to stdout
    Tail {
        file: String,
        #[arg(short = 'n', long)]
        line_numbers: bool,
    },
    /// List files on the active host
    Files { query: Option<String> },
    /// Check host health
    Hosts {
        #[arg(short, long)]
        watch: bool,
    },
}

fn fatal(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_config(explicit: Option<&Path>) -> Result<LogtailConfig, ConfigError> {
    if let Some(path) = explicit {
        return LogtailConfig::load(path);
    }
    let cwd = std::env::current_dir()?;
    match LogtailConfig::discover(&cwd) {
        Ok((_, config)) => Ok(config),
        Err(ConfigError::NotFound { .. }) => Ok(LogtailConfig::default()),
        Err(e) => Err(e),
    }
}

/// Host list by precedence: --hosts-file, then LOGTAIL_SERVERS, then config
fn load_hosts(cli: &Cli, config: &LogtailConfig) -> Vec<Host> {
    if let Some(path) = &cli.hosts_file {
        return HostRegistry::load(HostSource::JsonFile(path));
    }
    let from_env = HostRegistry::load(HostSource::Env(SERVERS_ENV));
    if !from_env.is_empty() {
        return from_env;
    }
    HostRegistry::load(HostSource::Inline(&config.hosts))
}

struct Runtime {
    client: LogClient,
    monitor: HealthMonitor,
    /// Hosts the monitor polls: the list, or the implicit host
    monitored: Vec<Host>,
}

fn bootstrap(cli: &Cli, config: &LogtailConfig, launch: &LaunchParams) -> Runtime {
    let (backend, hosts): (Arc<dyn Backend>, Vec<Host>) = if cli.demo {
        let (fake, hosts) = FakeBackend::demo();
        (Arc::new(fake), hosts)
    } else {
        let http = HttpBackend::new().unwrap_or_else(|e| fatal(e));
        (Arc::new(http), load_hosts(cli, config))
    };

    let registry = HostRegistry::new(hosts);
    let fallback = registry.is_implicit().then(|| config.default_host.clone());
    let initial = registry.resolve_initial(launch.host.as_deref().or(fallback.as_deref()));
    tracing::info!(
        backend = backend.name(),
        hosts = registry.hosts().len(),
        initial = %initial.name,
        "starting"
    );

    let monitored = if registry.is_implicit() {
        vec![initial.clone()]
    } else {
        registry.hosts().to_vec()
    };

    let (event_tx, _) = broadcast::channel(256);
    let monitor = HealthMonitor::new(
        backend.clone(),
        config.health.timeout(),
        event_tx,
        Arc::new(AtomicU64::new(1)),
    );

    let mut client = LogClient::new(backend, registry, &config.stream);
    client.select_host(initial);
    if let Some(file) = &launch.file {
        client.set_input(file);
    }

    Runtime {
        client,
        monitor,
        monitored,
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).unwrap_or_else(|e| fatal(e));

    let sink = match (&cli.command, &cli.log_file) {
        (_, Some(path)) => LogSink::File(path),
        (Some(Commands::Tui { .. }) | None, None) => LogSink::Discard,
        _ => LogSink::Stderr,
    };
    logging::init(cli.debug, config.log_level.as_deref(), sink)?;

    let launch = match &cli.link {
        Some(link) => LaunchParams::parse(link).unwrap_or_else(|e| fatal(e)),
        None => LaunchParams::default(),
    };
    let file_arg = match &cli.command {
        Some(Commands::Tui { file, .. }) => file.clone(),
        Some(Commands::Tail { file, .. }) => Some(file.clone()),
        _ => None,
    };
    let launch = launch.merge(cli.host.clone(), file_arg);

    let Runtime {
        mut client,
        mut monitor,
        monitored,
    } = bootstrap(&cli, &config, &launch);

    match cli.command {
        Some(Commands::Tail { line_numbers, .. }) => {
            drop(monitor);
            commands::run_tail(client, line_numbers).await
        }
        Some(Commands::Files { ref query }) => {
            drop(monitor);
            commands::run_files(client, query.as_deref()).await
        }
        Some(Commands::Hosts { watch }) => {
            drop(client);
            commands::run_hosts(monitor, monitored, watch, config.health.interval()).await
        }
        command @ (Some(Commands::Tui { .. }) | None) => {
            let line_numbers = matches!(command, Some(Commands::Tui { line_numbers: true, .. }));
            client.attach_health(monitor.subscribe());
            monitor.start(monitored, config.health.interval());
            let prefs = ViewPrefs::default().apply(ViewAction::SetLineNumbers(line_numbers));
            tui::run(client, monitor, prefs).await
        }
    }
}
