use session_gate::infra::{config, logging};
use session_gate::{ApiClient, ClientConfig, PostgresSessionStore, SessionStore};
use tracing::{error, info};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-server]\n\
         \n\
         Reads env vars:\n\
           BIND_ADDR, DATABASE_URL (optional), ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS,\n\
           COOKIE_SECURE, SESSION_SWEEP_INTERVAL_SECS, API_BASE_URL\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_server = args.iter().any(|a| a == "--skip-server");

    // Force-read config (nice error messages if a value is malformed)
    let server = config::ServerConfig::from_env()?;
    info!(
        bind_addr = %server.bind_addr,
        access_ttl_secs = server.access_token_ttl_secs,
        refresh_ttl_secs = server.refresh_token_ttl_secs,
        cookie_secure = server.cookie_secure,
        sweep_interval_secs = server.sweep_interval_secs,
        "configuration ok"
    );
    if server.access_token_ttl_secs >= server.refresh_token_ttl_secs {
        anyhow::bail!("ACCESS_TOKEN_TTL_SECS must be shorter than REFRESH_TOKEN_TTL_SECS");
    }

    match &server.database_url {
        Some(url) => {
            let store = PostgresSessionStore::connect(url).await?;
            store.ping().await?;
            info!("database reachable; users/sessions tables present");
        }
        None => info!("DATABASE_URL not set; server will use the in-memory store"),
    }

    if skip_server {
        info!("preflight OK (server check skipped)");
        return Ok(());
    }

    let base_url = config::api_base_url();
    let client = ApiClient::new(ClientConfig::new(base_url.clone()))?;
    match client.get_json::<serde_json::Value>("/health").await {
        Ok(v) => info!(%base_url, status = %v["status"], "server healthy"),
        Err(e) => {
            error!(%base_url, error = %e, "server health check failed");
            return Err(e.into());
        }
    }

    info!("preflight OK");
    Ok(())
}
