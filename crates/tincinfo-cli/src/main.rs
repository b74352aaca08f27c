#![deny(unsafe_code)]

//! tincinfo: query a running tinc daemon over its control socket.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tincinfo_config::AppConfig;
use tincinfo_core::Session;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use report::{EdgeStats, Report, Topology};

/// Show the topology a running tinc daemon knows about.
#[derive(Parser)]
#[command(name = "tincinfo", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "tincinfo.toml")]
    config: PathBuf,

    /// tinc network name, overriding the configuration.
    #[arg(short, long)]
    netname: Option<String>,

    /// Directory holding the daemon's pid file and socket.
    #[arg(long)]
    rundir: Option<PathBuf>,

    /// Print JSON instead of tables.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// List nodes with their reachability and routing state.
    Nodes,

    /// List the subnets each node claims.
    Subnets,

    /// List edges of the mesh.
    Edges,

    /// List the daemon's meta-connections.
    Connections,

    /// Summarise edge weights and per-node edge counts.
    Stats {
        /// Only count edges leaving this node.
        #[arg(long)]
        node: Option<String>,
    },

    /// Dump everything.
    All,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config).await?;
    apply_overrides(&mut config, cli.netname.clone(), cli.rundir.clone())?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(config = %cli.config.display(), netname = %config.daemon.netname, "Configuration resolved");

    if let Commands::Config { show } = cli.command {
        return cmd_config(&cli.config, &config, show);
    }

    let command = cli.command;
    let report = tokio::task::spawn_blocking(move || query(&config, &command))
        .await
        .context("query task failed")??;

    let output = if cli.json {
        report.to_json()?
    } else {
        report.to_text()?
    };
    print!("{output}");
    if cli.json {
        println!();
    }

    Ok(())
}

/// Open a session, run the dumps `command` needs, and collect the result.
fn query(config: &AppConfig, command: &Commands) -> Result<Report> {
    info!(
        socket = %config.socket_path().display(),
        "Querying tinc daemon"
    );
    let mut session = Session::open(config).with_context(|| {
        format!(
            "could not open control session for network '{}'",
            config.daemon.netname
        )
    })?;

    let report = match command {
        Commands::Nodes => Report::Nodes(session.refresh_nodes()?.clone()),
        Commands::Subnets => Report::Subnets(session.refresh_subnets()?.clone()),
        Commands::Edges => Report::Edges(session.refresh_edges()?.to_vec()),
        Commands::Connections => Report::Connections(session.refresh_connections()?.to_vec()),
        Commands::Stats { node } => {
            let edges = session.refresh_edges()?;
            Report::Stats(EdgeStats::new(edges, node.as_deref()))
        }
        Commands::All => {
            session.refresh_all()?;
            Report::All(Topology::from_session(&session))
        }
        Commands::Config { .. } => anyhow::bail!("config does not query the daemon"),
    };

    session.close();
    Ok(report)
}

fn apply_overrides(
    config: &mut AppConfig,
    netname: Option<String>,
    rundir: Option<PathBuf>,
) -> Result<()> {
    if let Some(netname) = netname {
        config.daemon.netname = netname;
    }
    if let Some(rundir) = rundir {
        config.daemon.rundir = rundir;
    }
    config.validate()?;
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
        println!("pid file: {}", config.pid_file_path().display());
        println!("socket:   {}", config.socket_path().display());
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load '{}'", path.display()))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tincinfo_test_utils::{DaemonScript, FakeDaemon, PidFileFixture, TEST_COOKIE};

    fn script() -> DaemonScript {
        DaemonScript::new()
            .accept_cookie(TEST_COOKIE)
            .respond(
                "18 3",
                "18 3 alpha 0a myself port 655 0 0 0 0 700c 1a alpha alpha 0 1518 1518 1518 0\n18 3\n",
            )
            .respond(
                "18 4",
                "18 4 alpha beta 192.0.2.7 port 655 10.0.0.1 port 40000 700c 12 3\n18 4\n",
            )
            .respond("18 5", "18 5 10.1.0.0/16 alpha\n18 5\n")
            .respond("18 6", "18 6 beta 192.0.2.7 port 655 700c 5 1a\n18 6\n")
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "tincinfo", "-n", "office", "--rundir", "/run", "--json", "-vv", "stats", "--node",
            "alpha",
        ])
        .unwrap();
        assert_eq!(cli.netname.as_deref(), Some("office"));
        assert_eq!(cli.rundir, Some(PathBuf::from("/run")));
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Commands::Stats {
                node: Some("alpha".to_string())
            }
        );
    }

    #[test]
    fn test_cli_requires_a_command() {
        assert!(Cli::try_parse_from(["tincinfo"]).is_err());
        assert!(Cli::try_parse_from(["tincinfo", "routes"]).is_err());
    }

    #[test]
    fn test_overrides_are_validated() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, Some("office".into()), Some("/run/tinc".into())).unwrap();
        assert_eq!(
            config.socket_path(),
            PathBuf::from("/run/tinc/tinc.office.socket")
        );

        let result = apply_overrides(&mut config, Some("../etc".into()), None);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_config_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/tincinfo.toml"))
            .await
            .unwrap();
        assert_eq!(config.daemon.netname, "vpn");
    }

    #[tokio::test]
    async fn test_invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tincinfo.toml");
        std::fs::write(&path, "[control]\nbuffer_size = 0\n").unwrap();
        assert!(load_config(&path).await.is_err());
    }

    #[test_log::test]
    fn test_query_stats_for_node() {
        let fixture = PidFileFixture::new();
        let _daemon = FakeDaemon::start(&fixture.socket_path, script());

        let report = query(
            &fixture.config(),
            &Commands::Stats {
                node: Some("alpha".into()),
            },
        )
        .unwrap();
        let Report::Stats(stats) = report else {
            panic!("expected stats, got {report:?}");
        };
        assert_eq!(stats.max_weight, Some(12));
        assert_eq!(stats.edge_counts.get("alpha"), Some(&1));
    }

    #[test_log::test]
    fn test_query_all() {
        let fixture = PidFileFixture::new();
        let daemon = FakeDaemon::start(&fixture.socket_path, script());

        let report = query(&fixture.config(), &Commands::All).unwrap();
        let Report::All(topology) = &report else {
            panic!("expected topology, got {report:?}");
        };
        assert_eq!(topology.nodes.len(), 1);
        assert_eq!(topology.edges.len(), 1);
        assert_eq!(topology.connections.len(), 1);
        assert!(daemon.received_text().ends_with("18 6\n18 4\n18 5\n18 3\n"));

        let text = report.to_text().unwrap();
        assert!(text.contains("# connections"));
        assert!(text.contains("10.1.0.0/16"));
    }

    #[test]
    fn test_query_without_daemon_names_the_network() {
        let fixture = PidFileFixture::new();
        let err = query(&fixture.config(), &Commands::Nodes).unwrap_err();
        assert!(err.to_string().contains("testnet"), "{err}");
    }
}
