//! `pharmabot doctor` — Diagnose system health.

use pharmabot_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 pharmabot Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — using defaults (run `pharmabot onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    // Check API key
    match config.require_api_key() {
        Ok(()) if config.provider_is_keyless() => {
            println!("  ✅ Provider '{}' needs no API key", config.default_provider)
        }
        Ok(()) => println!("  ✅ API key configured for '{}'", config.default_provider),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Check inventory
    let source = pharmabot_inventory::source_from_config(&config.inventory);
    match source.fetch().await {
        Ok(products) if products.is_empty() => {
            println!("  ⚠️  Inventory reachable ({}) but empty", source.name());
            issues += 1;
        }
        Ok(products) => println!(
            "  ✅ Inventory reachable ({}): {} product(s)",
            source.name(),
            products.len()
        ),
        Err(e) => {
            println!("  ❌ Inventory unreachable ({}): {e}", source.name());
            issues += 1;
        }
    }

    // Check provider
    let router = pharmabot_providers::build_from_config(&config);
    match router.default() {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' rejected the health check", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        None => {
            println!("  ❌ No provider named '{}'", config.default_provider);
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
