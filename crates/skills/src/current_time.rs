//! Current time: "what time is it". Refreshes itself every minute.

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

pub struct CurrentTimeInfo {
    clock: Clock,
    recognizer: Arc<FuzzyRecognizer<()>>,
}

impl CurrentTimeInfo {
    pub fn new(clock: Clock) -> Self {
        let recognizer = FuzzyRecognizer::new(vec![Pattern::new(
            &[
                "what time is it",
                "what time is it now",
                "what is the time",
                "tell me the time",
                "what's the time",
                "current time",
            ],
            |_| (),
        )]);
        Self {
            clock,
            recognizer: Arc::new(recognizer),
        }
    }
}

impl fmt::Debug for CurrentTimeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentTimeInfo").finish_non_exhaustive()
    }
}

impl SkillInfo for CurrentTimeInfo {
    fn id(&self) -> &str {
        "current_time"
    }

    fn name(&self) -> &str {
        "Current time"
    }

    fn sentence_example(&self) -> &str {
        "What time is it?"
    }

    fn is_available(&self, ctx: &SkillContext) -> bool {
        supports_language(ctx)
    }

    fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
        Arc::new(CurrentTimeSkill { info: self })
    }
}

struct CurrentTimeSkill {
    info: Arc<CurrentTimeInfo>,
}

impl CurrentTimeSkill {
    fn output(&self) -> Arc<dyn SkillOutput> {
        let now = (self.info.clock)();
        Arc::new(CurrentTimeOutput {
            time: now.format("%H:%M").to_string(),
        })
    }
}

#[async_trait]
impl Skill for CurrentTimeSkill {
    type Data = Option<()>;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        Specificity::Low
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, Option<()>) {
        self.info.recognizer.score(input)
    }

    async fn generate_output(
        &self,
        _ctx: &SkillContext,
        _data: Option<()>,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        Ok(self.output())
    }

    fn as_auto_runnable(&self) -> Option<&dyn AutoRunnable> {
        Some(self)
    }
}

#[async_trait]
impl AutoRunnable for CurrentTimeSkill {
    fn auto_update_interval(&self) -> Duration {
        AUTO_UPDATE_INTERVAL
    }

    async fn auto_output(&self, _ctx: &SkillContext) -> Result<Arc<dyn SkillOutput>, SkillError> {
        Ok(self.output())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTimeOutput {
    pub time: String,
}

impl SkillOutput for CurrentTimeOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        format!("It's {}", self.time)
    }

    fn graphical_output(&self, _ctx: &SkillContext) -> String {
        self.time.clone()
    }
}
