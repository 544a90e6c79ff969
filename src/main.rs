/*!
 * Forge CLI - spawn and manage star systems and planets
 */

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use forge::{
    config::LogLevel,
    error::{EXIT_FATAL, EXIT_SUCCESS},
    logging,
    output::{planets_table, system_card, systems_table, ConsoleSink, OutputWriter, Theme},
    Forge, ForgeConfig, ForgeError, PlanetId, PlanetType, StarSystemId, Status, StoreMode,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ENV_WALLET: &str = "FORGE_WALLET";

#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "Spawn and manage star systems and their planets", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Backend to use
    #[arg(short = 'm', long, value_enum, global = true)]
    mode: Option<ModeArg>,

    /// Base URL of the remote backend
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Directory for the local store
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Wallet address acting as caller (falls back to FORGE_WALLET)
    #[arg(short = 'w', long, value_name = "ADDRESS", global = true)]
    wallet: Option<String>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file
    #[arg(long = "log", value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage star systems
    #[command(subcommand)]
    System(SystemCommand),

    /// Manage planets
    #[command(subcommand)]
    Planet(PlanetCommand),

    /// Create demo star systems and planets for the caller
    Seed {
        /// Number of star systems
        #[arg(long, default_value_t = 3)]
        systems: usize,

        /// Planets per star system
        #[arg(long, default_value_t = 2)]
        planets: usize,
    },

    /// Delete every star system the caller owns
    Clear,

    /// Refresh periodically and print star systems whenever they change
    Watch {
        /// Refresh interval in seconds (defaults to the configured one)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Only show the caller's star systems
        #[arg(long)]
        mine: bool,
    },
}

#[derive(Subcommand)]
enum SystemCommand {
    /// Spawn a new star system
    Spawn {
        name: String,

        /// Tribute percentage (0-20)
        #[arg(short, long, default_value_t = 5.0)]
        tribute: f64,
    },

    /// List star systems
    List {
        /// Only the caller's star systems
        #[arg(long)]
        mine: bool,
    },

    /// Show a star system with its planets
    Show { id: String },

    /// Set the status of a star system
    Status(StatusArgs),

    /// Activate a star system
    Deploy { id: String },

    /// Delete a star system and its planets
    Delete { id: String },
}

#[derive(Subcommand)]
enum PlanetCommand {
    /// Spawn a planet in a star system
    Spawn {
        /// Star system id
        #[arg(short, long)]
        system: String,

        name: String,

        /// Planet type
        #[arg(short = 't', long = "type", default_value = "habitable")]
        planet_type: PlanetType,
    },

    /// List planets of a star system, or the caller's planets
    List {
        /// Star system id
        #[arg(short, long, conflicts_with = "mine")]
        system: Option<String>,

        /// Only the caller's planets
        #[arg(long)]
        mine: bool,
    },

    /// Show a planet
    Show { id: String },

    /// Set the status of a planet
    Status(StatusArgs),

    /// Delete a planet
    Delete { id: String },
}

#[derive(Args)]
struct StatusArgs {
    id: String,

    /// active, deploying or inactive
    status: Status,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Mock,
    Remote,
}

impl From<ModeArg> for StoreMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Mock => StoreMode::Mock,
            ModeArg::Remote => StoreMode::Remote,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let out = OutputWriter::new(cli.json);

    let code = match run(cli, &out).await {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => match e.downcast_ref::<ForgeError>() {
            Some(forge_err) => {
                out.error(forge_err);
                forge_err.exit_code()
            }
            None => {
                eprintln!("{} {:#}", Theme::error("✗ Error:"), e);
                EXIT_FATAL
            }
        },
    };
    std::process::exit(code);
}

fn load_config(cli: &Cli) -> anyhow::Result<ForgeConfig> {
    let mut config = ForgeConfig::load_or_default(cli.config.as_deref())?;

    // Flags win over file and environment
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if let Some(url) = &cli.api_url {
        config.remote.base_url = url.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
    config.verbose |= cli.verbose;
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli, out: &OutputWriter) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let wallet = cli
        .wallet
        .clone()
        .or_else(|| std::env::var(ENV_WALLET).ok())
        .filter(|w| !w.trim().is_empty());

    let store = forge::store::open_store(&config)
        .await
        .with_context(|| format!("opening {} store", config.mode))?;
    let forge = Forge::builder(store)
        .timeouts((&config.timeouts).into())
        .notifier(Arc::new(ConsoleSink::new(out.is_json())))
        .build();

    let caller = wallet.as_deref();
    match cli.command {
        Commands::System(command) => run_system(&forge, command, caller, out).await?,
        Commands::Planet(command) => run_planet(&forge, command, caller, out).await?,
        Commands::Seed { systems, planets } => {
            let report = forge.seed_demo(caller, systems, planets).await?;
            out.emit(&report, |report| {
                if !report.systems.is_empty() {
                    println!("{}", systems_table(&report.systems));
                }
                for name in &report.skipped {
                    println!("{}", Theme::muted(format!("skipped existing '{name}'")));
                }
            });
        }
        Commands::Clear => {
            let deleted = forge.clear_owned(caller).await?;
            out.emit(&serde_json::json!({ "deleted": deleted }), |_| {});
        }
        Commands::Watch { interval, mine } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.refresh_interval());
            watch(&forge, interval, owner_scope(mine, caller), out).await?;
        }
    }
    Ok(())
}

async fn run_system(
    forge: &Forge,
    command: SystemCommand,
    caller: Option<&str>,
    out: &OutputWriter,
) -> anyhow::Result<()> {
    match command {
        SystemCommand::Spawn { name, tribute } => {
            let system = forge.spawn_star_system(&name, tribute, caller).await?;
            out.emit(&system, |s| println!("{}", system_card(s)));
        }
        SystemCommand::List { mine } => {
            let owner = owner_scope(mine, caller);
            let systems = forge.list_star_systems(owner).await?;
            out.emit(&systems, |systems| {
                if systems.is_empty() {
                    println!("{}", Theme::muted("No star systems"));
                } else {
                    println!("{}", systems_table(systems));
                }
            });
        }
        SystemCommand::Show { id } => {
            let details = forge.star_system_details(&StarSystemId::new(id)).await?;
            out.emit(&details, |d| {
                println!("{}", system_card(&d.star_system));
                if !d.planets.is_empty() {
                    println!("\n{}", Theme::header("Planets"));
                    println!("{}", planets_table(&d.planets));
                }
            });
        }
        SystemCommand::Status(StatusArgs { id, status }) => {
            let system = forge
                .update_star_system_status(&StarSystemId::new(id), status, caller)
                .await?;
            out.emit(&system, |_| {});
        }
        SystemCommand::Deploy { id } => {
            let system = forge
                .deploy_star_system(&StarSystemId::new(id), caller)
                .await?;
            out.emit(&system, |_| {});
        }
        SystemCommand::Delete { id } => {
            let id = StarSystemId::new(id);
            forge.delete_star_system(&id, caller).await?;
            out.emit(&serde_json::json!({ "deleted": id }), |_| {});
        }
    }
    Ok(())
}

async fn run_planet(
    forge: &Forge,
    command: PlanetCommand,
    caller: Option<&str>,
    out: &OutputWriter,
) -> anyhow::Result<()> {
    match command {
        PlanetCommand::Spawn {
            system,
            name,
            planet_type,
        } => {
            let planet = forge
                .spawn_planet(&StarSystemId::new(system), &name, planet_type, caller)
                .await?;
            out.emit(&planet, |p| println!("{}", planets_table(std::slice::from_ref(p))));
        }
        PlanetCommand::List { system, mine } => {
            let planets = match system {
                Some(id) if !mine => forge.list_planets_for_system(&StarSystemId::new(id)).await?,
                _ => forge.list_planets_owned(caller).await?,
            };
            out.emit(&planets, |planets| {
                if planets.is_empty() {
                    println!("{}", Theme::muted("No planets"));
                } else {
                    println!("{}", planets_table(planets));
                }
            });
        }
        PlanetCommand::Show { id } => {
            let planet = forge.get_planet(&PlanetId::new(id)).await?;
            out.emit(&planet, |p| println!("{}", planets_table(std::slice::from_ref(p))));
        }
        PlanetCommand::Status(StatusArgs { id, status }) => {
            let planet = forge
                .update_planet_status(&PlanetId::new(id), status, caller)
                .await?;
            out.emit(&planet, |_| {});
        }
        PlanetCommand::Delete { id } => {
            let id = PlanetId::new(id);
            forge.delete_planet(&id, caller).await?;
            out.emit(&serde_json::json!({ "deleted": id }), |_| {});
        }
    }
    Ok(())
}

/// Owner filter for `--mine`; without a wallet it matches nothing
fn owner_scope(mine: bool, caller: Option<&str>) -> Option<&str> {
    if mine {
        Some(caller.unwrap_or_default())
    } else {
        None
    }
}

async fn watch(
    forge: &Forge,
    interval: Duration,
    owner: Option<&str>,
    out: &OutputWriter,
) -> anyhow::Result<()> {
    let mut changes = forge.subscribe();
    let handle = forge.spawn_refresh(interval);

    let render = |systems: &Vec<forge::StarSystem>| {
        println!(
            "\n{} {}",
            Theme::header("Star systems"),
            Theme::muted(chrono::Local::now().format("%H:%M:%S").to_string())
        );
        println!("{}", systems_table(systems));
    };

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = forge.snapshot().await;
                let systems: Vec<_> = match owner {
                    Some(raw) => {
                        let caller = forge::WalletAddress::parse(raw).ok();
                        snapshot
                            .systems_owned_by(caller.as_ref())
                            .into_iter()
                            .cloned()
                            .collect()
                    }
                    None => snapshot.systems.clone(),
                };
                out.emit(&systems, render);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
