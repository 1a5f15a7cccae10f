// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pirg::config::{self, Config, DEFAULT_PIP, DEFAULT_PYTHON};
use pirg::index::{DEFAULT_INDEX_URL, PypiClient};
use pirg::installer::{PassthroughArgs, PipInstaller};
use pirg::manifest::{self, ManifestSet};
use pirg::reconcile::{self, Outcome};
use pirg::resolver::Resolver;
use pirg::search::{self, InitOutcome};
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "pirg")]
#[command(author, version, about = "Install packages with pip and keep requirements.txt in sync", long_about = None)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Package index base URL
    #[arg(long, global = true, default_value = DEFAULT_INDEX_URL)]
    index_url: String,

    /// Python version releases must support (detected from --python when omitted)
    #[arg(long, global = true)]
    python_version: Option<String>,

    /// Interpreter asked for its version when --python-version is omitted
    #[arg(long, global = true, default_value = DEFAULT_PYTHON)]
    python: String,

    /// Package manager program
    #[arg(long, global = true, default_value = DEFAULT_PIP)]
    pip: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install packages and record them in the requirements file
    ///
    /// Arguments after "--" are passed to `pip install`, e.g.
    /// `pirg install torch -- --index-url https://download.pytorch.org/whl/cu118`
    Install {
        /// Package tokens, e.g. numpy, requests>=2.0,<3.0, uvicorn[standard]
        packages: Vec<String>,
        /// Requirements file (default: nearest requirements.txt upwards)
        #[arg(long)]
        requirements_path: Option<PathBuf>,
        /// Re-pin every recorded package to its newest compatible release
        #[arg(long)]
        update_all: bool,
        /// Arguments forwarded to pip
        #[arg(last = true)]
        pip_args: Vec<String>,
    },
    /// Uninstall packages and remove them from the requirements file
    ///
    /// Arguments after "--" are passed to `pip uninstall`, e.g.
    /// `pirg uninstall torch -- --yes`
    Uninstall {
        /// Package names
        packages: Vec<String>,
        /// Requirements file (default: nearest requirements.txt upwards)
        #[arg(long)]
        requirements_path: Option<PathBuf>,
        /// Remove every recorded package
        #[arg(long)]
        delete_all: bool,
        /// Arguments forwarded to pip
        #[arg(last = true)]
        pip_args: Vec<String>,
    },
    /// Search the local package-name database
    Search {
        /// Approximate package name
        query: String,
        /// Database path (default: pirg_pkg_db.txt in the temp directory)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Initialize or update the local package-name database
    Initdb {
        /// Refresh the database if the index listing changed
        #[arg(long)]
        update: bool,
        /// Database path (default: pirg_pkg_db.txt in the temp directory)
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Build the configuration from global options and the subcommand's paths
    ///
    /// The runtime version is only detected later, when resolution needs it.
    fn config(&self) -> pirg::Result<Config> {
        let python_version = self
            .python_version
            .as_deref()
            .map(config::parse_python_version)
            .transpose()?;

        let mut config = Config {
            index_url: self.index_url.clone(),
            python_version,
            python: self.python.clone(),
            pip: self.pip.clone(),
            ..Config::default()
        };

        match &self.command {
            Some(Commands::Install { requirements_path, .. })
            | Some(Commands::Uninstall { requirements_path, .. }) => {
                config.requirements_path = requirements_path.clone();
            }
            Some(Commands::Search { db_path, .. }) | Some(Commands::Initdb { db_path, .. }) => {
                if let Some(path) = db_path {
                    config.db_path = path.clone();
                }
            }
            _ => {}
        }

        Ok(config)
    }
}

fn load_manifest(config: &Config) -> Result<(PathBuf, ManifestSet)> {
    let manifest_path = config
        .manifest_path()
        .context("Failed to locate the requirements file")?;
    debug!("Requirements file: {}", manifest_path.display());

    let current = manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;
    Ok((manifest_path, current))
}

fn install(config: &Config, packages: &[String], update_all: bool, args: &PassthroughArgs) -> Result<Outcome> {
    let mut packages = packages.to_vec();
    packages.sort();
    packages.dedup();

    let (manifest_path, current) = load_manifest(config)?;

    let plan = if packages.is_empty() && !update_all {
        reconcile::merge_install(&current, ManifestSet::new(), args)
    } else {
        let runtime = config.runtime_version()?;
        info!("Resolving against {} for Python {}", config.index_url, runtime);
        let resolver = Resolver::new(PypiClient::new(&config.index_url)?, runtime);
        reconcile::install_merge(&resolver, &current, &packages, update_all, args)?
    };

    let installer = PipInstaller::new(config.pip.as_str());
    let outcome = reconcile::apply(&plan, &installer, args, &manifest_path)?;

    match outcome {
        Outcome::NothingToDo => println!("Nothing to install"),
        Outcome::Apply => {
            for record in &plan.changes {
                println!("Installed: {}", record);
            }
            println!("Updated {}", manifest_path.display());
        }
    }

    Ok(outcome)
}

fn uninstall(config: &Config, packages: &[String], delete_all: bool, args: &PassthroughArgs) -> Result<Outcome> {
    let (manifest_path, current) = load_manifest(config)?;
    let plan = reconcile::uninstall_merge(&current, packages, delete_all, args)?;

    let installer = PipInstaller::new(config.pip.as_str());
    let outcome = reconcile::apply(&plan, &installer, args, &manifest_path)?;

    match outcome {
        Outcome::NothingToDo => println!("Nothing to remove"),
        Outcome::Apply => {
            for record in &plan.changes {
                println!("Removed: {}", record);
            }
            println!("Updated {}", manifest_path.display());
        }
    }

    Ok(outcome)
}

fn search_names(config: &Config, query: &str) -> Result<Outcome> {
    let names = search::read_database(&config.db_path)?;

    let client = PypiClient::new(&config.index_url)?;
    match search::listing_outdated(&client) {
        Ok(true) => warn!("Current list of package names is out of date. Please update with `initdb --update`"),
        Ok(false) => {}
        Err(e) => debug!("Could not check listing freshness: {}", e),
    }

    let results = search::fuzzy_search(query, &names)?;
    if results.is_empty() {
        println!("No packages found.");
    } else {
        println!("Search result:");
        for name in &results {
            println!("  {}", name);
        }
    }

    Ok(Outcome::Apply)
}

fn initdb(config: &Config, update: bool) -> Result<Outcome> {
    let client = PypiClient::new(&config.index_url)?;

    match search::init_database(&client, &config.db_path, update)? {
        InitOutcome::AlreadyInitialized => println!("Database already initialized"),
        InitOutcome::UpToDate => println!("Database is up-to-date"),
        InitOutcome::Created(count) => {
            println!("Database initialized with {} package names at {}", count, config.db_path.display())
        }
    }

    Ok(Outcome::Apply)
}

fn run(cli: Cli) -> Result<Outcome> {
    // Deny-listed arguments are rejected before any config, network or file access
    let args = match &cli.command {
        Some(Commands::Install { pip_args, .. }) | Some(Commands::Uninstall { pip_args, .. }) => {
            PassthroughArgs::new(pip_args.clone())?
        }
        _ => PassthroughArgs::default(),
    };

    let config = cli.config()?;

    match &cli.command {
        Some(Commands::Install {
            packages,
            update_all,
            ..
        }) => install(&config, packages, *update_all, &args),
        Some(Commands::Uninstall {
            packages,
            delete_all,
            ..
        }) => uninstall(&config, packages, *delete_all, &args),
        Some(Commands::Search { query, .. }) => search_names(&config, query),
        Some(Commands::Initdb { update, .. }) => initdb(&config, *update),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "pirg", &mut io::stdout());
            Ok(Outcome::Apply)
        }
        None => {
            // No command provided, show help
            println!("pirg v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'pirg --help' for usage information");
            Ok(Outcome::Apply)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.to_lowercase())),
        )
        .init();

    debug!("ARGV: {:?}", std::env::args().collect::<Vec<_>>());

    let code = match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!("{:#}", err);
            err.downcast_ref::<pirg::Error>()
                .map_or(1, pirg::Error::exit_code)
        }
    };

    std::process::exit(code);
}
