//! Terminal stand-ins for the speaker and the phone.

use async_trait::async_trait;
use parley_core::{SkillError, SpeechOutputDevice};
use parley_skills::Dialer;

/// "Speaks" by printing. Printing is instant, so completion callbacks run at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSpeechDevice;

impl SpeechOutputDevice for ConsoleSpeechDevice {
    fn speak(&self, text: &str) {
        for line in text.lines() {
            println!("  Parley > {line}");
        }
    }

    fn run_when_finished_speaking(&self, callback: Box<dyn FnOnce() + Send>) {
        callback();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDialer;

#[async_trait]
impl Dialer for ConsoleDialer {
    async fn dial(&self, number: &str) -> Result<(), SkillError> {
        tracing::info!(number, "Dialing");
        println!("  📞 Calling {number}...");
        Ok(())
    }
}
