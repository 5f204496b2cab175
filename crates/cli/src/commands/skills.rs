//! `parley skills`: List skills with their enabled state.

use crate::runtime::Runtime;
use parley_config::AppConfig;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(config)?;
    let enabled = runtime.handler.current();
    let catalog = runtime.handler.catalog();

    println!("Skills ({}):", runtime.config.locale);
    for info in &catalog.skills {
        let state = if enabled.ids().contains(&info.id()) {
            "enabled"
        } else if !runtime.config.is_skill_enabled(info.id()) {
            "disabled"
        } else {
            "unavailable"
        };
        println!("  {:<14} {:<12} \"{}\"", info.id(), state, info.sentence_example());

        let missing: Vec<String> = info
            .needed_permissions()
            .iter()
            .filter(|p| !runtime.config.is_granted(**p))
            .map(|p| p.to_string())
            .collect();
        if !missing.is_empty() {
            println!("  {:<14} needs: {}", "", missing.join(", "));
        }
    }
    println!("  {:<14} {:<12} (answers everything else)", catalog.fallback.id(), "fallback");
    Ok(())
}
