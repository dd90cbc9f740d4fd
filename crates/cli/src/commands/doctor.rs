//! `coupler doctor`: Diagnose configuration and provider health.

use std::path::Path;
use coupler_config::AppConfig;

use super::load_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Coupler Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} — run `coupler onboard`", path.display());
        issues += 1;
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    match config.team_roster() {
        Ok(roster) if roster.is_empty() => {
            println!("  ❌ No team members — add [[team]] entries");
            issues += 1;
        }
        Ok(roster) => {
            println!("  ✅ {} team member(s): {}", roster.len(), roster.ids().join(", "));
            match roster.default_handler() {
                Some(default) => println!("  ✅ Default member: {}", default.id),
                None => {
                    println!("  ⚠️  No default member — unmatched requests stay UNKNOWN");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Team invalid: {e}");
            issues += 1;
        }
    }

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured — set COUPLER_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    match coupler_providers::build_primary(&config) {
        Some(provider) => {
            if provider.health_check().await.unwrap_or(false) {
                println!("  ✅ Provider '{}' reachable", config.default_provider);
            } else {
                println!("  ❌ Provider '{}' not reachable", config.default_provider);
                issues += 1;
            }
        }
        None => {
            println!("  ❌ No provider configured");
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
