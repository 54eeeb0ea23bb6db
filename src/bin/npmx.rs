//! `npmx` - CLI entrypoint wiring the clap command surface to
//! `npmx_core::commands`. Single-threaded `tokio` runtime: nothing in this
//! crate needs to spread work across OS threads.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use npmx_core::commands;
use npmx_core::config::Config;

/// npmx - an npm-compatible resolver and tiered execution runtime
#[derive(Parser)]
#[command(name = "npmx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new package.json in the current directory
    Init {
        /// Package name (defaults to the current directory name)
        name: Option<String>,
    },

    /// Resolve dependencies and write the lockfile
    Install {
        /// Package to add, e.g. left-pad@^1.3.0 (omit to reinstall from the manifest)
        package: Option<String>,
    },

    /// Remove a dependency and re-resolve
    Uninstall {
        /// Package name
        package: String,
    },

    /// Re-resolve preferring the newest version satisfying each range
    Update,

    /// List the resolved package set
    List,

    /// Check for dependencies newer than the locked version
    Outdated,

    /// Print the resolved dependency tree
    Tree,

    /// Explain why a package is installed
    Why {
        /// Package name
        package: String,
    },

    /// Search the registry
    Search {
        /// Search query
        query: String,
    },

    /// Execute a package through the tiered CDN sandbox (npx-style)
    Run {
        /// Command or package specifier, e.g. cowsay or -p typescript tsc
        command: String,
        /// Arguments passed through to the executed package
        args: Vec<String>,
    },

    /// Inspect the registry cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: npmx_core::ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show configured cache capacities
    Info,
    /// Run a demonstration resolve and report hit/miss counters
    Demo,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(dispatch(cli.command));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init { name } => commands::init::run(name),
        Commands::Install { package } => {
            let config = Config::load()?;
            commands::install::run(package, &config).await
        }
        Commands::Uninstall { package } => {
            let config = Config::load()?;
            commands::uninstall::run(package, &config).await
        }
        Commands::Update => {
            let config = Config::load()?;
            commands::update::run(&config).await
        }
        Commands::List => commands::list::run(),
        Commands::Outdated => {
            let config = Config::load()?;
            commands::outdated::run(&config).await
        }
        Commands::Tree => commands::tree::run(),
        Commands::Why { package } => commands::why::run(package),
        Commands::Search { query } => {
            let config = Config::load()?;
            commands::search::run(query, &config).await
        }
        Commands::Run { command, args } => {
            let config = Config::load()?;
            commands::run::run(command, args, &config).await
        }
        Commands::Cache { action } => {
            let config = Config::load()?;
            match action {
                CacheAction::Info => commands::cache::run_info(&config),
                CacheAction::Demo => commands::cache::run_demo(&config).await,
            }
        }
        Commands::Config { action } => commands::config::run(&action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "npmx", &mut std::io::stdout());
            Ok(())
        }
    }
}
