//! Text fallback: answers anything nothing else recognized.

use async_trait::async_trait;
use parley_core::{
    AnySkill, InteractionPlan, Score, Skill, SkillContext, SkillError, SkillInfo, SkillOutput,
    Specificity,
};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextFallbackInfo;

impl SkillInfo for TextFallbackInfo {
    fn id(&self) -> &str {
        "text"
    }

    fn name(&self) -> &str {
        "Text fallback"
    }

    fn sentence_example(&self) -> &str {
        ""
    }

    fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
        Arc::new(TextFallbackSkill { info: self })
    }
}

struct TextFallbackSkill {
    info: Arc<TextFallbackInfo>,
}

#[async_trait]
impl Skill for TextFallbackSkill {
    type Data = String;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        Specificity::Low
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, String) {
        (Score::AlwaysBest, input.to_string())
    }

    async fn generate_output(
        &self,
        ctx: &SkillContext,
        _input: String,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        // Ask to repeat unless the previous answer already did.
        let ask_to_repeat = ctx
            .previous_output
            .as_deref()
            .and_then(|previous| previous.downcast_ref::<TextFallbackOutput>())
            .is_none_or(|previous| !previous.ask_to_repeat);
        Ok(Arc::new(TextFallbackOutput::new(ask_to_repeat)))
    }
}

/// "I did not understand", optionally asking the user to repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFallbackOutput {
    pub ask_to_repeat: bool,
}

impl TextFallbackOutput {
    pub fn new(ask_to_repeat: bool) -> Self {
        Self { ask_to_repeat }
    }
}

impl SkillOutput for TextFallbackOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        if self.ask_to_repeat {
            "Sorry, I did not understand. Could you repeat?".into()
        } else {
            "Sorry, I did not understand.".into()
        }
    }

    // Reopening keeps the current stack, so the next utterance is matched
    // against the same batch again.
    fn interaction_plan(&self, _ctx: &SkillContext) -> InteractionPlan {
        InteractionPlan::Continue {
            reopen_microphone: self.ask_to_repeat,
        }
    }
}
