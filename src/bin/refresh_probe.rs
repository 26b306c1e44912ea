// src/bin/refresh_probe.rs
// Fires a burst of concurrent requests with a stale access token at a running server and reports
// how many session refreshes the client needed to serve them.

use session_gate::infra::{config, logging};
use session_gate::{ApiClient, ClientConfig, Credentials};
use std::time::Instant;
use tracing::{error, info};

fn parse_requests(args: &[String]) -> anyhow::Result<usize> {
    match args.iter().position(|a| a == "--requests") {
        Some(i) => {
            let raw = args
                .get(i + 1)
                .ok_or_else(|| anyhow::anyhow!("--requests needs a value"))?;
            let n = raw.parse::<usize>()?;
            Ok(n.max(1))
        }
        None => Ok(16),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let num_requests = parse_requests(&args)?;
    let base_url = config::api_base_url();
    info!(%base_url, num_requests, "refresh probe starting");

    let client = ApiClient::new(ClientConfig::new(base_url))?;

    // 1. Sign in as a throwaway user.
    let email = format!("probe-{}@example.com", uuid::Uuid::new_v4());
    client.register(&email, "probe-password", Some("refresh probe")).await?;
    let signed_in = client
        .credentials()
        .ok_or_else(|| anyhow::anyhow!("register returned no credentials"))?;

    // 2. Make the access token stale but keep the refresh token.
    client.set_credentials(Credentials {
        access_token: "stale".to_string(),
        refresh_token: signed_in.refresh_token.clone(),
    });

    // 3. Burst.
    let start_time = Instant::now();
    let mut tasks = Vec::with_capacity(num_requests);
    for _ in 0..num_requests {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.me().await }));
    }

    let mut ok = 0usize;
    for task in tasks {
        match task.await? {
            Ok(_) => ok += 1,
            Err(e) => error!(error = %e, "request failed"),
        }
    }
    let duration = start_time.elapsed();

    info!(
        succeeded = ok,
        total = num_requests,
        refreshes = client.refresh_attempts(),
        elapsed_ms = duration.as_millis() as u64,
        "burst finished"
    );

    client.logout().await?;

    if client.refresh_attempts() != 1 || ok != num_requests {
        anyhow::bail!(
            "expected 1 refresh and {} successes, got {} refreshes and {} successes",
            num_requests,
            client.refresh_attempts(),
            ok
        );
    }
    info!("single-flight refresh OK");
    Ok(())
}
