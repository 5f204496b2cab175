//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley voice assistant.
//! This crate has **no framework dependencies**. It defines
//! the vocabulary every other crate speaks:
//!
//! - [`Skill`] / [`AnySkill`] - a unit that scores an utterance and produces an output
//! - [`SkillInfo`] - the static descriptor a skill instance is built from
//! - [`SkillOutput`] / [`InteractionPlan`] - what a skill answers and how the dialogue continues
//! - [`Score`] / [`Specificity`] - how candidates are ranked
//! - [`InputEvent`] / [`InteractionLog`] - what speech recognition sends and what the UI shows
//!
//! Implementations live in their respective crates (`parley-recognizer`,
//! `parley-skills`, `parley-agent`, `parley-workflow`).

pub mod context;
pub mod error;
pub mod event;
pub mod input;
pub mod interaction;
pub mod output;
pub mod score;
pub mod skill;

// Re-export key types at crate root for ergonomics
pub use context::{NothingSpeechDevice, SkillContext, SpeechOutputDevice};
pub use error::{Error, Result, SkillError, panic_message};
pub use event::{DomainEvent, EventBus};
pub use input::InputEvent;
pub use interaction::{Interaction, InteractionLog, PendingQuestion, QuestionAnswer};
pub use output::{InteractionPlan, SkillOutput};
pub use score::{Score, Specificity};
pub use skill::{
    AnySkill, AutoRunnable, EnabledSkills, Permission, Skill, SkillCatalog, SkillData, SkillInfo,
    SkillWithResult,
};
