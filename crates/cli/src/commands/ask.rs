//! `parley ask`: Handle a single utterance.

use crate::runtime::{Runtime, screen_text};
use parley_config::AppConfig;
use parley_core::InputEvent;

pub async fn run(config: AppConfig, message: String) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(config)?;
    let log = runtime
        .evaluator
        .process(InputEvent::final_text(message))
        .await?;

    if let Some(screen) = screen_text(&log, &runtime.skill_context()) {
        for line in screen.lines() {
            println!("  {line}");
        }
    }
    Ok(())
}
