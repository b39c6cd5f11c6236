//! `concierge doctor`: Diagnose configuration and model connectivity.

use concierge_config::AppConfig;
use concierge_memory::open_session_store;
use std::time::Duration;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Concierge Doctor: System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, defaults in use (run `concierge init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the config and re-run.");
            return Ok(());
        }
    };

    println!("  ℹ️  Provider: {} / model {}", config.llm.provider, config.llm.model);

    if config.llm.api_key.is_some() || config.llm.provider == "ollama" {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key, replies will use the fallback text");
        issues += 1;
    }

    match open_session_store(&config.session.backend, config.session.path.as_deref()).await {
        Ok(store) => println!("  ✅ Session store opens ({})", store.name()),
        Err(e) => {
            println!("  ❌ Session store failed: {e}");
            issues += 1;
        }
    }

    let provider = concierge_providers::build_from_config(&config);
    match tokio::time::timeout(Duration::from_secs(10), provider.health_check()).await {
        Ok(Ok(true)) => println!("  ✅ Model endpoint reachable"),
        Ok(Ok(false)) => {
            println!("  ⚠️  Model endpoint answered but rejected the check");
            issues += 1;
        }
        Ok(Err(e)) => {
            println!("  ❌ Model endpoint unreachable: {e}");
            issues += 1;
        }
        Err(_) => {
            println!("  ❌ Model endpoint check timed out");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
