use anyhow::Result;
use coinboard_core::workspace;
use coinboard_types::config::{ApiTier, AppConfig};
use coinboard_types::output::ConfigOutput;
use coinboard_utils::output::{render, OutputFormat};

use super::helpers::mask_secret;

/// The config as written on disk (no env overrides), so saves never
/// persist a key that only came from the environment.
fn load_file_config() -> Result<AppConfig> {
    workspace::load_config_from(&workspace::root_dir()?)
}

/// `coinboard configure show`: display current config (non-interactive).
pub fn run(fmt: OutputFormat) -> Result<()> {
    let config = workspace::load_config()?;

    let output = ConfigOutput {
        config_path: workspace::resolve("config.toml")?.display().to_string(),
        tier: config.api.tier.to_string(),
        api_key: mask_secret(config.api.api_key.as_deref()),
        base_url: config.api.resolved_base_url(),
        vs_currency: config.api.vs_currency.clone(),
        timeout_secs: config.api.timeout_secs,
        store_enabled: config.store.enabled,
        store_path: workspace::store_path(&config)?.display().to_string(),
        stale_secs: config.query.stale_secs,
        per_page: config.display.per_page,
    };

    render(fmt, &output)?;

    if fmt == OutputFormat::Table {
        println!();
        println!("Tip: `coinboard configure tier demo` + `coinboard configure api-key <key>` lifts public rate limits.");
    }

    Ok(())
}

/// `coinboard configure api-key <key>`
pub fn set_api_key(key: &str) -> Result<()> {
    let mut config = load_file_config()?;
    let key = key.trim();
    config.api.api_key = (!key.is_empty()).then(|| key.to_string());
    workspace::save_config(&config)?;
    println!("✓ API key set ({})", mask_secret(config.api.api_key.as_deref()));
    if config.api.tier == ApiTier::Public {
        println!("  The public tier sends no key. Run `coinboard configure tier demo` (or pro) to use it.");
    }
    Ok(())
}

/// `coinboard configure tier <public|demo|pro>`
pub fn set_tier(tier: ApiTier) -> Result<()> {
    let mut config = load_file_config()?;
    config.api.tier = tier;
    workspace::save_config(&config)?;
    println!("✓ Tier set to {tier} ({})", config.api.resolved_base_url());
    if tier != ApiTier::Public && config.api.api_key.is_none() {
        println!("  ⚠ {tier} needs a key: coinboard configure api-key <key>");
    }
    Ok(())
}

/// `coinboard configure currency <vs>`
pub fn set_currency(vs: &str) -> Result<()> {
    let mut config = load_file_config()?;
    config.api.vs_currency = vs.trim().to_lowercase();
    config.validate()?;
    workspace::save_config(&config)?;
    println!("✓ Quote currency set to {}", config.api.vs_currency);
    Ok(())
}

/// `coinboard configure store --enabled <bool> [--path <file>]`
pub fn set_store(enabled: bool, path: Option<String>) -> Result<()> {
    let mut config = load_file_config()?;
    config.store.enabled = enabled;
    if path.is_some() {
        config.store.path = path;
    }
    workspace::save_config(&config)?;
    println!(
        "✓ Store {} at {}",
        if enabled { "enabled" } else { "disabled" },
        workspace::store_path(&config)?.display()
    );
    Ok(())
}

/// `coinboard configure verbose <bool>`
pub fn set_verbose(enabled: bool) -> Result<()> {
    let mut config = load_file_config()?;
    config.system.verbose = enabled;
    workspace::save_config(&config)?;
    println!("✓ verbose = {enabled}");
    Ok(())
}
