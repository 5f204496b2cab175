//! The enabled-skill stream.
//!
//! `SkillHandler` combines the catalog with the user's settings (per-skill
//! enable flags and locale) and each skill's own availability check, and
//! publishes the result through a `watch` channel. Consumers only wake up
//! when the enabled set actually changes.

use parley_config::AppConfig;
use parley_core::{
    DomainEvent, EnabledSkills, EventBus, SkillCatalog, SkillContext, SkillInfo,
    SpeechOutputDevice,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// User settings that decide which skills are enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillSettings {
    pub locale: String,
    /// Skill id → enabled. Missing ids are enabled.
    pub enabled: HashMap<String, bool>,
}

impl SkillSettings {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            enabled: HashMap::new(),
        }
    }

    pub fn is_enabled(&self, skill_id: &str) -> bool {
        self.enabled.get(skill_id).copied().unwrap_or(true)
    }
}

impl From<&AppConfig> for SkillSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            enabled: config.skills.clone(),
        }
    }
}

pub struct SkillHandler {
    catalog: SkillCatalog,
    speech_output_device: Arc<dyn SpeechOutputDevice>,
    enabled: watch::Sender<EnabledSkills>,
    event_bus: Option<Arc<EventBus>>,
}

impl SkillHandler {
    pub fn new(
        catalog: SkillCatalog,
        speech_output_device: Arc<dyn SpeechOutputDevice>,
        settings: &SkillSettings,
    ) -> Self {
        let initial = compute_enabled(&catalog, &speech_output_device, settings);
        tracing::info!(skills = ?initial.ids(), locale = %initial.locale, "Enabled skills");
        let (enabled, _) = watch::channel(initial);
        Self {
            catalog,
            speech_output_device,
            enabled,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn fallback(&self) -> Arc<dyn SkillInfo> {
        self.catalog.fallback.clone()
    }

    /// Subscribe to the enabled set. The current value is available at once.
    pub fn enabled_skills(&self) -> watch::Receiver<EnabledSkills> {
        self.enabled.subscribe()
    }

    pub fn current(&self) -> EnabledSkills {
        self.enabled.borrow().clone()
    }

    /// A context for the current locale, speaking through the handler's device.
    pub fn skill_context(&self) -> SkillContext {
        SkillContext::new(
            self.enabled.borrow().locale.clone(),
            self.speech_output_device.clone(),
        )
    }

    /// Recompute the enabled set. Subscribers are only notified, and `true`
    /// returned, when the set or its locale changed.
    pub fn update_settings(&self, settings: &SkillSettings) -> bool {
        let next = compute_enabled(&self.catalog, &self.speech_output_device, settings);
        let changed = self.enabled.send_if_modified(|current| {
            if current.same_as(&next) {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            let current = self.current();
            tracing::info!(
                skills = ?current.ids(),
                locale = %current.locale,
                "Enabled skills changed"
            );
            if let Some(bus) = &self.event_bus {
                bus.publish(DomainEvent::EnabledSkillsChanged {
                    skill_ids: current.ids().into_iter().map(String::from).collect(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
        changed
    }
}

fn compute_enabled(
    catalog: &SkillCatalog,
    speech_output_device: &Arc<dyn SpeechOutputDevice>,
    settings: &SkillSettings,
) -> EnabledSkills {
    let ctx = SkillContext::new(settings.locale.clone(), speech_output_device.clone());
    let skills = catalog
        .skills
        .iter()
        .filter(|info| settings.is_enabled(info.id()))
        .filter(|info| {
            let available = info.is_available(&ctx);
            if !available {
                tracing::debug!(skill_id = %info.id(), locale = %ctx.locale, "Skill unavailable");
            }
            available
        })
        .cloned()
        .collect();
    EnabledSkills::new(settings.locale.clone(), skills)
}
