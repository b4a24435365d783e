//! `coinboard doctor`: config, store and API health checks.

use std::time::Instant;

use anyhow::Result;
use coinboard_core::workspace;
use coinboard_core::CoinDb;
use coinboard_types::config::{ApiTier, AppConfig};
use coinboard_types::output::{DoctorCheck, DoctorOutput};
use coinboard_utils::output::{render, OutputFormat};

use super::helpers::market_service;

/// `coinboard doctor`
pub async fn run(config: &AppConfig, load_error: Option<anyhow::Error>, fmt: OutputFormat) -> Result<()> {
    let mut checks = Vec::new();

    // ── Config ──────────────────────────────────────────────────
    let config_path = workspace::resolve("config.toml")?;
    checks.push(match (&load_error, config.validate()) {
        (Some(e), _) => DoctorCheck::fail("Config", format!("fix {}: {e:#}", config_path.display())),
        (None, Err(e)) => DoctorCheck::fail("Config", format!("{e}")),
        (None, Ok(())) => DoctorCheck::ok("Config", config_path.display().to_string()),
    });

    // ── API key ─────────────────────────────────────────────────
    checks.push(match (config.api.tier, &config.api.api_key) {
        (ApiTier::Public, _) => DoctorCheck::ok("API key", "public tier, none needed"),
        (tier, Some(_)) => DoctorCheck::ok("API key", format!("{tier} key set")),
        (tier, None) => DoctorCheck::fail("API key", format!("{tier} tier: coinboard configure api-key <key>")),
    });

    // ── Store ───────────────────────────────────────────────────
    let store_path = workspace::store_path(config)?;
    checks.push(if !config.store.enabled {
        DoctorCheck::ok("Store", "disabled")
    } else if !store_path.is_file() {
        DoctorCheck::fail("Store", "not synced: coinboard store sync")
    } else {
        match CoinDb::open(&store_path).and_then(|db| db.count()) {
            Ok(0) => DoctorCheck::fail("Store", "empty: coinboard store sync"),
            Ok(n) => DoctorCheck::ok("Store", format!("{n} coins")),
            Err(e) => DoctorCheck::fail("Store", format!("unreadable ({e:#}): coinboard store sync")),
        }
    });

    // ── API connectivity ────────────────────────────────────────
    checks.push(match check_api_latency(config).await {
        Ok(ms) => {
            let quality = if ms < 200 { "excellent" }
                else if ms < 500 { "good" }
                else if ms < 1000 { "slow" }
                else { "very slow" };
            DoctorCheck::ok("API", format!("{} ({ms}ms, {quality})", config.api.resolved_base_url()))
        }
        Err(e) => DoctorCheck::fail("API", format!("unreachable: {e:#}")),
    });

    render(fmt, &DoctorOutput { checks })
}

async fn check_api_latency(config: &AppConfig) -> Result<u64> {
    let svc = market_service(config)?;
    let start = Instant::now();
    svc.ping().await?;
    Ok(start.elapsed().as_millis() as u64)
}
