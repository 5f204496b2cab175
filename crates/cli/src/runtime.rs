//! Wiring shared by the commands: catalog, handler, evaluator and auto runner.

use crate::devices::{ConsoleDialer, ConsoleSpeechDevice};
use parley_agent::{
    EvaluatorHandle, SkillEvaluator, SkillHandler, SkillSettings, StaticPermissions,
};
use parley_config::AppConfig;
use parley_core::{EventBus, InteractionLog, SkillContext, SpeechOutputDevice};
use parley_skills::{Contact, StaticContactBook, default_catalog};
use parley_workflow::AutoSkillRunner;
use std::sync::Arc;

pub struct Runtime {
    pub config: AppConfig,
    pub handler: SkillHandler,
    pub evaluator: EvaluatorHandle,
    pub event_bus: Arc<EventBus>,
    speech: Arc<dyn SpeechOutputDevice>,
}

impl Runtime {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let speech: Arc<dyn SpeechOutputDevice> = Arc::new(ConsoleSpeechDevice);
        let contacts = StaticContactBook::new(
            config
                .contacts
                .iter()
                .map(|c| Contact::new(&c.name, c.numbers.clone()))
                .collect(),
        );
        let catalog = default_catalog(Arc::new(contacts), Arc::new(ConsoleDialer))?;

        let event_bus = Arc::new(EventBus::default());
        let handler = SkillHandler::new(catalog, speech.clone(), &SkillSettings::from(&config))
            .with_event_bus(event_bus.clone());

        let evaluator = SkillEvaluator::new(
            speech.clone(),
            handler.fallback(),
            handler.enabled_skills(),
            Arc::new(StaticPermissions::new(config.permissions.granted.clone())),
            event_bus.clone(),
        )
        .with_thresholds(config.ranker.into())
        .with_settings((&config.evaluator).into())
        .spawn();

        Ok(Self {
            config,
            handler,
            evaluator,
            event_bus,
            speech,
        })
    }

    /// `None` when the auto runner is disabled in the configuration.
    pub fn start_auto_runner(&self) -> Option<AutoSkillRunner> {
        if !self.config.auto_runner.enabled {
            return None;
        }
        Some(AutoSkillRunner::start(
            self.handler.enabled_skills(),
            self.speech.clone(),
            self.event_bus.clone(),
        ))
    }

    pub fn skill_context(&self) -> SkillContext {
        self.handler.skill_context()
    }
}

/// What the screen would show for the last answer, when the speaker did not
/// already say it.
pub fn screen_text(log: &InteractionLog, ctx: &SkillContext) -> Option<String> {
    let answer = log.last_answer()?;
    let speech = answer.speech_output(ctx);
    let screen = answer.graphical_output(ctx);
    (screen.trim() != speech.trim() && !screen.trim().is_empty()).then_some(screen)
}
