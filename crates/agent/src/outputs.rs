//! Outputs the evaluator produces on its own, when no skill could answer.

use parley_core::{Error, Permission, SkillContext, SkillInfo, SkillOutput};
use std::sync::Arc;

/// Something went wrong while understanding or answering the user.
#[derive(Debug, Clone)]
pub struct ErrorOutput {
    pub cause: Error,
    /// False when the failure happened in speech recognition.
    pub from_skill_evaluation: bool,
}

impl ErrorOutput {
    pub fn new(cause: Error, from_skill_evaluation: bool) -> Self {
        Self {
            cause,
            from_skill_evaluation,
        }
    }

    pub fn is_network_error(&self) -> bool {
        self.cause.is_network_error()
    }
}

impl SkillOutput for ErrorOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        if self.is_network_error() {
            "I could not reach the network.".into()
        } else if self.from_skill_evaluation {
            "Sorry, something went wrong while answering.".into()
        } else {
            "Sorry, I could not understand you.".into()
        }
    }

    fn graphical_output(&self, ctx: &SkillContext) -> String {
        format!("{}\n{}", self.speech_output(ctx), self.cause)
    }
}

/// The chosen skill needs permissions the user did not grant.
#[derive(Debug, Clone)]
pub struct MissingPermissionsOutput {
    pub skill: Arc<dyn SkillInfo>,
    pub permissions: Vec<Permission>,
}

impl MissingPermissionsOutput {
    pub fn new(skill: Arc<dyn SkillInfo>, permissions: Vec<Permission>) -> Self {
        Self { skill, permissions }
    }
}

impl SkillOutput for MissingPermissionsOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        let names: Vec<String> = self.permissions.iter().map(|p| p.to_string()).collect();
        format!(
            "{} needs permission to {} before it can answer.",
            self.skill.name(),
            names.join(" and ")
        )
    }
}
