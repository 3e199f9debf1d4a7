//! homingd: the homing daemon.
//!
//! Assembles the inventory client, region cache and resolution engine
//! from one TOML config file, then either resolves a demands document or
//! runs a single inventory lookup.
//!
//! # Usage
//!
//! ```text
//! homingd resolve --config homing.toml --demands demands.json --plan-id p1
//! homingd host-location --config homing.toml --host ucpe-host-1
//! homingd default-config > homing.toml
//! ```

mod lookup_mode;
mod resolve_mode;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use homing_core::HomingConfig;
use homing_inventory::{HttpInventoryClient, InventoryCache, InventoryGateway, SystemClock};

#[derive(Parser)]
#[command(name = "homingd", about = "Homing candidate resolution daemon")]
struct Cli {
    /// Config file; built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a demands document and print candidates plus triage as JSON.
    Resolve {
        /// JSON object of demand name → list of requirements.
        #[arg(long)]
        demands: PathBuf,

        #[arg(long, default_value = "")]
        plan_id: String,

        #[arg(long, default_value = "")]
        plan_name: String,

        /// Write the result here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Refresh the region cache once and list the usable regions.
    Regions,
    /// Latitude/longitude/country of a pnf or pserver host.
    HostLocation {
        #[arg(long)]
        host: String,
    },
    /// Latitude/longitude/country of a complex by CLLI code.
    ClliLocation {
        #[arg(long)]
        clli: String,
    },
    /// Cloud regions that host networks of a role.
    NetworkRoles {
        #[arg(long)]
        role: String,
    },
    /// Allotted-resource role of the service instance behind a workload.
    CandidateRole {
        #[arg(long)]
        host: String,
    },
    /// Service-instance pairs of the instance groups with a description.
    GroupPairs {
        #[arg(long)]
        description: String,
    },
    /// Print the default config as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,homing=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Command::DefaultConfig = cli.command {
        print!("{}", HomingConfig::default().to_toml_string()?);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let cache = Arc::new(build_cache(&config)?);

    match cli.command {
        Command::Resolve {
            demands,
            plan_id,
            plan_name,
            output,
        } => {
            resolve_mode::run(cache, &config, &demands, plan_id, plan_name, output.as_deref())
                .await
        }
        Command::Regions => lookup_mode::regions(&cache).await,
        Command::HostLocation { host } => lookup_mode::host_location(&cache, &host).await,
        Command::ClliLocation { clli } => lookup_mode::clli_location(&cache, &clli).await,
        Command::NetworkRoles { role } => lookup_mode::network_roles(&cache, &role).await,
        Command::CandidateRole { host } => lookup_mode::candidate_role(&cache, &host).await,
        Command::GroupPairs { description } => {
            lookup_mode::group_pairs(&cache, &description).await
        }
        Command::DefaultConfig => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HomingConfig> {
    match path {
        Some(path) => {
            let config = HomingConfig::from_file(path)
                .with_context(|| format!("load config {}", path.display()))?;
            info!(path = %path.display(), "config loaded");
            Ok(config)
        }
        None => {
            info!("no config file given, using defaults");
            Ok(HomingConfig::default())
        }
    }
}

fn build_cache(config: &HomingConfig) -> anyhow::Result<InventoryCache<HttpInventoryClient>> {
    let client = HttpInventoryClient::from_config(&config.inventory)
        .context("build inventory client")?;
    info!(
        server = config.inventory.base_url(),
        version = config.inventory.version(),
        "inventory client ready"
    );
    let gateway = InventoryGateway::new(Arc::new(client), config.inventory.version());
    Ok(InventoryCache::new(
        gateway,
        Arc::new(SystemClock),
        &config.cache,
        config.resolver.capability_aware,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resolve_arguments_parse() {
        let cli = Cli::try_parse_from([
            "homingd",
            "resolve",
            "--config",
            "homing.toml",
            "--demands",
            "demands.json",
            "--plan-id",
            "p1",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("homing.toml")));
        match cli.command {
            Command::Resolve {
                demands, plan_id, ..
            } => {
                assert_eq!(demands, PathBuf::from("demands.json"));
                assert_eq!(plan_id, "p1");
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn sample_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/homing.toml");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.inventory.version(), "v14");
        assert_eq!(config.resolver.concurrency_limit, 4);
        assert!(build_cache(&config).is_ok());
    }

    #[test]
    fn default_config_builds_cache() {
        let config = load_config(None).unwrap();
        assert!(build_cache(&config).is_ok());
    }
}
