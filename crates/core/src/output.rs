//! Skill outputs and the interaction plan each one carries.

use crate::context::SkillContext;
use crate::skill::AnySkill;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// What a skill produces for one turn.
///
/// Outputs are immutable once built; the evaluator may ask for the speech
/// text, the plan and the graphical rendering several times.
pub trait SkillOutput: Any + fmt::Debug + Send + Sync {
    /// The text to speak. A blank string means "say nothing".
    fn speech_output(&self, ctx: &SkillContext) -> String;

    /// How the dialogue continues after this output.
    fn interaction_plan(&self, _ctx: &SkillContext) -> InteractionPlan {
        InteractionPlan::FinishInteraction
    }

    /// A textual rendering for displays. Defaults to the speech text.
    fn graphical_output(&self, ctx: &SkillContext) -> String {
        self.speech_output(ctx)
    }
}

impl dyn SkillOutput {
    /// Try to view this output as a concrete type.
    pub fn downcast_ref<T: SkillOutput>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    pub fn is<T: SkillOutput>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }
}

/// Describes how the ranker's batch stack changes after an output, and
/// whether the microphone should be reopened.
#[derive(Clone)]
pub enum InteractionPlan {
    /// Keep the current stack.
    Continue { reopen_microphone: bool },

    /// Drop every pushed batch. Never reopens the microphone.
    FinishInteraction,

    /// Drop the top batch. Never reopens the microphone.
    FinishSubInteraction,

    /// Push a batch with `next_skills` on top of the stack.
    StartSubInteraction {
        next_skills: Vec<Arc<dyn AnySkill>>,
        reopen_microphone: bool,
    },

    /// Pop the top batch, then push `next_skills`.
    ReplaceSubInteraction {
        next_skills: Vec<Arc<dyn AnySkill>>,
        reopen_microphone: bool,
    },
}

impl InteractionPlan {
    pub fn reopen_microphone(&self) -> bool {
        match self {
            InteractionPlan::FinishInteraction | InteractionPlan::FinishSubInteraction => false,
            InteractionPlan::Continue { reopen_microphone }
            | InteractionPlan::StartSubInteraction { reopen_microphone, .. }
            | InteractionPlan::ReplaceSubInteraction {
                reopen_microphone, ..
            } => *reopen_microphone,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            InteractionPlan::Continue { .. } => "continue",
            InteractionPlan::FinishInteraction => "finish_interaction",
            InteractionPlan::FinishSubInteraction => "finish_sub_interaction",
            InteractionPlan::StartSubInteraction { .. } => "start_sub_interaction",
            InteractionPlan::ReplaceSubInteraction { .. } => "replace_sub_interaction",
        }
    }
}

impl fmt::Debug for InteractionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionPlan::Continue { reopen_microphone } => f
                .debug_struct("Continue")
                .field("reopen_microphone", reopen_microphone)
                .finish(),
            InteractionPlan::FinishInteraction => f.write_str("FinishInteraction"),
            InteractionPlan::FinishSubInteraction => f.write_str("FinishSubInteraction"),
            InteractionPlan::StartSubInteraction {
                next_skills,
                reopen_microphone,
            }
            | InteractionPlan::ReplaceSubInteraction {
                next_skills,
                reopen_microphone,
            } => {
                let ids: Vec<String> = next_skills.iter().map(|s| s.id()).collect();
                f.debug_struct(if matches!(self, InteractionPlan::StartSubInteraction { .. }) {
                    "StartSubInteraction"
                } else {
                    "ReplaceSubInteraction"
                })
                .field("next_skills", &ids)
                .field("reopen_microphone", reopen_microphone)
                .finish()
            }
        }
    }
}
