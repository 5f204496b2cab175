//! Yes/no confirmation, used as the next batch of confirmation dialogues.

use async_trait::async_trait;
use parley_core::{
    Score, Skill, SkillContext, SkillError, SkillInfo, SkillOutput, Specificity,
};
use parley_recognizer::{FuzzyRecognizer, Pattern};
use std::sync::{Arc, LazyLock};

/// What to do once the user answered.
#[async_trait]
pub trait YesNoHandler: Send + Sync + 'static {
    /// `yes` is false both for "no" and for an answer that was not understood.
    async fn on_answer(
        &self,
        ctx: &SkillContext,
        yes: bool,
    ) -> Result<Arc<dyn SkillOutput>, SkillError>;
}

static YES_NO: LazyLock<FuzzyRecognizer<bool>> = LazyLock::new(|| {
    FuzzyRecognizer::new(vec![
        Pattern::new(
            &[
                "yes", "yeah", "yep", "sure", "of course", "ok", "okay", "go for it", "do it",
                "go ahead", "confirm",
            ],
            |_| true,
        ),
        Pattern::new(
            &["no", "nope", "no thanks", "don't", "cancel", "stop", "never mind"],
            |_| false,
        ),
    ])
});

/// Recognizes a yes or a no and hands it to `H`.
///
/// Belongs to whichever skill asked the question: `info` is that skill's info.
pub struct YesNoSkill<H> {
    info: Arc<dyn SkillInfo>,
    handler: H,
}

impl<H: YesNoHandler> YesNoSkill<H> {
    pub fn new(info: Arc<dyn SkillInfo>, handler: H) -> Self {
        Self { info, handler }
    }
}

#[async_trait]
impl<H: YesNoHandler> Skill for YesNoSkill<H> {
    type Data = Option<bool>;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        Specificity::Low
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, Option<bool>) {
        YES_NO.score(input)
    }

    async fn generate_output(
        &self,
        ctx: &SkillContext,
        answer: Option<bool>,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        self.handler.on_answer(ctx, answer == Some(true)).await
    }
}
