//! `parley init`: First-time setup.

use parley_config::AppConfig;
use std::path::PathBuf;

pub async fn run(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = path.unwrap_or_else(AppConfig::config_path);

    println!("Parley: First-Time Setup");
    println!("=========================\n");

    if let Some(dir) = config_path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("✅ Created config directory: {}", dir.display());
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add [[contacts]] and grant permissions in {}", config_path.display());
        println!("   2. Run: parley chat\n");
    }

    Ok(())
}
