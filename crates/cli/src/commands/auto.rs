//! `parley auto`: Print auto-runnable outputs as they refresh.

use crate::runtime::Runtime;
use parley_config::AppConfig;
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

pub async fn run(mut config: AppConfig, seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    // Asked for explicitly, so run even if the config turns it off
    config.auto_runner.enabled = true;
    let runtime = Runtime::build(config)?;
    let ctx = runtime.skill_context();
    let runner = runtime
        .start_auto_runner()
        .ok_or("auto runner could not be started")?;

    println!("Watching auto outputs for {seconds}s (Ctrl+C to stop)");
    let mut updates = WatchStream::from_changes(runner.outputs());
    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            update = updates.next() => {
                let Some(outputs) = update else { break };
                let mut ids: Vec<&String> = outputs.keys().collect();
                ids.sort();
                for id in ids {
                    println!("  [{id}] {}", outputs[id].graphical_output(&ctx));
                }
            }
        }
    }

    runner.shutdown().await;
    Ok(())
}
