//! Current date, month or year.

use crate::{Clock, supports_language};
use async_trait::async_trait;
use parley_core::{
    AnySkill, AutoRunnable, Score, Skill, SkillContext, SkillError, SkillInfo, SkillOutput,
    Specificity,
};
use parley_recognizer::{FuzzyRecognizer, Pattern};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const AUTO_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCommand {
    Day,
    Month,
    Year,
}

pub struct CurrentDateInfo {
    clock: Clock,
    recognizer: Arc<FuzzyRecognizer<DateCommand>>,
}

impl CurrentDateInfo {
    pub fn new(clock: Clock) -> Self {
        let recognizer = FuzzyRecognizer::new(vec![
            Pattern::new(
                &[
                    "what day is it",
                    "what day is it today",
                    "what is the date",
                    "what is the date today",
                    "what's today's date",
                ],
                |_| DateCommand::Day,
            ),
            Pattern::new(
                &["what month is it", "what is the month", "which month is it"],
                |_| DateCommand::Month,
            ),
            Pattern::new(
                &["what year is it", "what is the year", "which year is it"],
                |_| DateCommand::Year,
            ),
        ]);
        Self {
            clock,
            recognizer: Arc::new(recognizer),
        }
    }
}

impl fmt::Debug for CurrentDateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentDateInfo").finish_non_exhaustive()
    }
}

impl SkillInfo for CurrentDateInfo {
    fn id(&self) -> &str {
        "current_date"
    }

    fn name(&self) -> &str {
        "Current date"
    }

    fn sentence_example(&self) -> &str {
        "What day is it today?"
    }

    fn is_available(&self, ctx: &SkillContext) -> bool {
        supports_language(ctx)
    }

    fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
        Arc::new(CurrentDateSkill { info: self })
    }
}

struct CurrentDateSkill {
    info: Arc<CurrentDateInfo>,
}

#[async_trait]
impl Skill for CurrentDateSkill {
    type Data = Option<DateCommand>;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        Specificity::Low
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, Option<DateCommand>) {
        self.info.recognizer.score(input)
    }

    async fn generate_output(
        &self,
        _ctx: &SkillContext,
        command: Option<DateCommand>,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        let today = (self.info.clock)().date();
        let command = command.unwrap_or(DateCommand::Day);
        let value = match command {
            DateCommand::Day => today.format("%A, %B %-d, %Y"),
            DateCommand::Month => today.format("%B"),
            DateCommand::Year => today.format("%Y"),
        };
        Ok(Arc::new(CurrentDateOutput {
            command,
            value: value.to_string(),
        }))
    }

    fn as_auto_runnable(&self) -> Option<&dyn AutoRunnable> {
        Some(self)
    }
}

#[async_trait]
impl AutoRunnable for CurrentDateSkill {
    fn auto_update_interval(&self) -> Duration {
        AUTO_UPDATE_INTERVAL
    }

    async fn auto_output(&self, _ctx: &SkillContext) -> Result<Arc<dyn SkillOutput>, SkillError> {
        // Compact numeric form for widgets
        let today = (self.info.clock)().date();
        Ok(Arc::new(CurrentDateOutput {
            command: DateCommand::Day,
            value: today.format("%d.%m.%Y").to_string(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentDateOutput {
    pub command: DateCommand,
    pub value: String,
}

impl SkillOutput for CurrentDateOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        match self.command {
            DateCommand::Day => format!("Today is {}", self.value),
            DateCommand::Month => format!("It's {}", self.value),
            DateCommand::Year => format!("It's {}", self.value),
        }
    }

    fn graphical_output(&self, _ctx: &SkillContext) -> String {
        self.value.clone()
    }
}
