use anyhow::{anyhow, Result};
use dnspeek::{Config, DynVisitorStore, ExpiryReaper, InMemoryVisitorStore, Shared};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("dnspeek".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let visitor_store: DynVisitorStore = Arc::new(InMemoryVisitorStore::new());

    let reaper = ExpiryReaper::new(
        visitor_store.clone(),
        config.sweep_interval,
        config.visitor_retention,
    );
    tokio::spawn(reaper.run());

    tracing::info!("DNS listening on UDP {}", &config.dns_udp_bind_addr);
    if let Some(tcp_addr) = &config.dns_tcp_bind_addr {
        tracing::info!("DNS listening on TCP {tcp_addr}");
    }
    tracing::info!(
        "relaying {} TXT to {} upstream servers",
        &config.acme_challenge_domain,
        config.acme_upstream_servers.len()
    );
    let dns_server = dnspeek::dns::new(config.clone(), visitor_store.clone()).await?;
    let dns_handle = tokio::spawn(dns_server.block_until_done());

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = dnspeek::api::new(config.clone(), visitor_store.clone());
    let api_handle = tokio::spawn(api_server);

    // The reaper has no shutdown hook; it ends with the runtime.
    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        dns_res = dns_handle => {
            return Err(anyhow!("DNS server stopped: {dns_res:?}"))
        }
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dnspeek=info,tower_http=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
