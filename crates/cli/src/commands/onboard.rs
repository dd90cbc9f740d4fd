//! `coupler onboard`: First-time setup.

use std::path::Path;
use coupler_config::AppConfig;

pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);

    println!("🔗 Coupler — First-Time Setup");
    println!("=============================\n");

    if write_starter_config(&config_path, force)? {
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Edit {} and add your API key", config_path.display());
        println!("   2. Describe your team in the [[team]] entries");
        println!("   3. Run: coupler route -m \"Launch a marketing campaign.\"\n");
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
    }

    Ok(())
}

/// Write the sample config to `path`; returns whether a file was written.
fn write_starter_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
