//! `parley chat`: interactive mode, every line typed is a final utterance.

use crate::runtime::{Runtime, screen_text};
use parley_config::AppConfig;
use parley_core::InputEvent;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(config)?;
    let auto_runner = runtime.start_auto_runner();
    let ctx = runtime.skill_context();

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Parley: Interactive Mode            ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Locale:    {}", runtime.config.locale);
    println!("  Skills:    {}", runtime.handler.current().ids().join(", "));
    println!();
    println!("  Type what you would say and press Enter.");
    println!("  Type '/auto' to see auto-refreshed outputs, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "exit" | "quit" => break,
            "" => {}
            "/auto" => match &auto_runner {
                Some(runner) => {
                    let outputs = runner.outputs().borrow().clone();
                    if outputs.is_empty() {
                        println!("  (no auto outputs yet)");
                    }
                    for (id, output) in outputs {
                        println!("  [{id}] {}", output.graphical_output(&ctx));
                    }
                }
                None => println!("  (auto runner disabled)"),
            },
            utterance => match runtime
                .evaluator
                .process(InputEvent::final_text(utterance))
                .await
            {
                Ok(log) => {
                    if let Some(screen) = screen_text(&log, &ctx) {
                        for line in screen.lines() {
                            println!("  {line}");
                        }
                    }
                }
                Err(e) => eprintln!("  [Error] {e}"),
            },
        }

        println!();
        print!("  You > ");
        std::io::stdout().flush()?;
    }

    if let Some(runner) = auto_runner {
        runner.shutdown().await;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
