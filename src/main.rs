// src/main.rs

//! The entry point for the `clusterjoin` binary: joins one server to the cluster.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clusterjoin::cluster::{
    ClusterIdentityStore, ClusterMembershipCoordinator, PortAllocator, Server, SqlServerRegistry,
};
use clusterjoin::config::Config;
use clusterjoin::core::cache::{DistributedCacheJoiner, LocalCacheStore, RespCacheAdministrator};
use clusterjoin::core::persistence::{QueryExecutor, SqliteExecutor};
use clusterjoin::core::search::{SearchEngineJoiner, SettingsFileClient};
use clusterjoin::core::settings::ConfigService;
use clusterjoin::core::{ClusterJoinError, metrics};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};

const USAGE: &str = "Usage: clusterjoin [--config config.toml] --server-id <id> \
                     [--register <ip>] [--set key=value]... [--metrics]";

/// Command-line options.
struct Args {
    config_path: String,
    server_id: String,
    register_ip: Option<String>,
    overrides: HashMap<String, String>,
    print_metrics: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut config_path = "config.toml".to_string();
    let mut server_id = None;
    let mut register_ip = None;
    let mut overrides = HashMap::new();
    let mut print_metrics = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{flag} flag requires a value"))
        };
        match arg.as_str() {
            "--config" => config_path = value("--config")?,
            "--server-id" => server_id = Some(value("--server-id")?),
            "--register" => register_ip = Some(value("--register")?),
            "--set" => {
                let pair = value("--set")?;
                let (key, val) = pair
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--set expects key=value, got '{pair}'"))?;
                overrides.insert(key.trim().to_string(), val.to_string());
            }
            "--metrics" => print_metrics = true,
            other => return Err(anyhow!("Unknown argument '{other}'")),
        }
    }

    Ok(Args {
        config_path,
        server_id: server_id.ok_or_else(|| anyhow!("--server-id is required"))?,
        register_ip,
        overrides,
        print_metrics,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();
    if args.contains(&"--version".to_string()) {
        println!("clusterjoin version {VERSION}");
        return Ok(());
    }

    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(1);
        }
    };

    let config = match Config::from_file(&args.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!(
                "Failed to load configuration from \"{}\": {e:#}",
                args.config_path
            );
            std::process::exit(1);
        }
    };

    // Logging level comes from RUST_LOG, falling back to the config file.
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = run(config, &args).await {
        error!("Join failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(config: Config, args: &Args) -> Result<()> {
    let sqlite = SqliteExecutor::open(&config.database.path)?;
    sqlite.initialize_schema().await?;
    let db: Arc<dyn QueryExecutor> = Arc::new(sqlite);

    let cluster_id = ClusterIdentityStore::new(Arc::clone(&db))
        .ensure_cluster_id()
        .await
        .context("Could not establish the cluster id")?;
    info!("Cluster id: {}", cluster_id);

    let registry = Arc::new(SqlServerRegistry::new(
        Arc::clone(&db),
        config.cluster.heartbeat_timeout,
    ));
    if let Some(ip) = &args.register_ip {
        register_or_heartbeat(&registry, &args.server_id, ip, &cluster_id).await?;
    }

    let settings = Arc::new(ConfigService::new(&config));
    let ports = Arc::new(PortAllocator::new(Arc::clone(&db), Arc::clone(&settings)));
    let cache_admin = Arc::new(RespCacheAdministrator::new(
        registry.clone(),
        Arc::clone(&ports),
        Some(config.cache.host.clone()),
        config.cache.connect_timeout,
    ));
    let cache = DistributedCacheJoiner::new(
        cache_admin,
        Arc::clone(&settings),
        LocalCacheStore::from_config(&config.cache),
    );
    let search_client = SettingsFileClient::new(&config.search.settings_path)
        .with_cluster_name(format!("{}{}", config.search.cluster_name_prefix, cluster_id));
    info!(
        "Search node settings file: {}",
        search_client.path().display()
    );
    let search = SearchEngineJoiner::new(Arc::new(search_client));

    let coordinator = ClusterMembershipCoordinator::new(registry, ports, cache, search);
    let overrides = (!args.overrides.is_empty()).then(|| args.overrides.clone());
    let report = coordinator
        .add_node_to_cluster(overrides, &args.server_id)
        .await?;

    for (key, value) in report.properties.iter() {
        info!("{} = {}", key, value);
    }
    for degraded in &report.degraded {
        warn!("Degraded step {}: {}", degraded.step, degraded.cause);
    }
    if args.print_metrics {
        println!("{}", metrics::gather_metrics());
    }
    Ok(())
}

/// Registers the server on first run; afterwards only refreshes its heartbeat.
async fn register_or_heartbeat(
    registry: &SqlServerRegistry,
    server_id: &str,
    ip: &str,
    cluster_id: &str,
) -> Result<()> {
    match registry.heartbeat(server_id, Utc::now()).await {
        Ok(()) => Ok(()),
        Err(ClusterJoinError::NotFound(_)) => {
            let mut server = Server::new(server_id, ip);
            server.cluster_id = Some(cluster_id.to_string());
            server.last_heartbeat = Some(Utc::now());
            registry.register_server(&server).await?;
            info!("Registered server {} at {}", server_id, ip);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
