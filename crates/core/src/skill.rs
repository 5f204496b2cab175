//! The skill traits, the abstraction over everything the assistant can answer.
//!
//! A skill is written against the typed [`Skill`] trait, where scoring
//! produces a value of the skill's own `Data` type that generation consumes.
//! The ranker stores candidates of many different skills side by side, so the
//! blanket [`AnySkill`] impl erases `Data` into a [`SkillData`] box.

use crate::context::SkillContext;
use crate::error::SkillError;
use crate::output::SkillOutput;
use crate::score::{Score, Specificity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Type-erased data extracted while scoring.
pub type SkillData = Box<dyn Any + Send>;

/// The live, enabled subset of the catalog and the locale it was computed for.
#[derive(Debug, Clone, Default)]
pub struct EnabledSkills {
    pub locale: String,
    pub skills: Vec<Arc<dyn SkillInfo>>,
}

impl EnabledSkills {
    pub fn new(locale: impl Into<String>, skills: Vec<Arc<dyn SkillInfo>>) -> Self {
        Self {
            locale: locale.into(),
            skills,
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.skills.iter().map(|info| info.id()).collect()
    }

    /// Same locale and same skills in the same order.
    pub fn same_as(&self, other: &EnabledSkills) -> bool {
        self.locale == other.locale && self.ids() == other.ids()
    }
}

/// A permission a skill may need before it can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadContacts,
    CallPhone,
    RecordAudio,
    PostNotifications,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ReadContacts => "read contacts",
            Permission::CallPhone => "call phone",
            Permission::RecordAudio => "record audio",
            Permission::PostNotifications => "post notifications",
        };
        f.write_str(name)
    }
}

/// The static descriptor of a skill.
///
/// Infos live for the whole program; skill instances are built from them
/// fresh for each evaluation session.
pub trait SkillInfo: fmt::Debug + Send + Sync {
    /// Stable identifier, also used as the key in settings and auto outputs.
    fn id(&self) -> &str;

    /// Human readable name.
    fn name(&self) -> &str;

    /// An example sentence that triggers this skill.
    fn sentence_example(&self) -> &str;

    fn needed_permissions(&self) -> &[Permission] {
        &[]
    }

    /// Whether the skill can work in this context (e.g. supports the locale).
    fn is_available(&self, _ctx: &SkillContext) -> bool {
        true
    }

    /// Build a new skill instance.
    fn build(self: Arc<Self>, ctx: &SkillContext) -> Arc<dyn AnySkill>;
}

/// The typed skill contract.
#[async_trait]
pub trait Skill: Send + Sync + 'static {
    /// Whatever scoring extracts from the utterance for generation to use.
    type Data: Send + 'static;

    fn info(&self) -> Arc<dyn SkillInfo>;

    fn specificity(&self) -> Specificity;

    /// Score `input`. Must be pure: the ranker may call it for many
    /// candidates and throw most results away.
    fn score(&self, ctx: &SkillContext, input: &str) -> (Score, Self::Data);

    async fn generate_output(
        &self,
        ctx: &SkillContext,
        data: Self::Data,
    ) -> Result<Arc<dyn SkillOutput>, SkillError>;

    /// Skills that can refresh their output periodically return themselves here.
    fn as_auto_runnable(&self) -> Option<&dyn AutoRunnable> {
        None
    }
}

/// Periodic self-refresh capability.
#[async_trait]
pub trait AutoRunnable: Send + Sync {
    /// How long to wait between two outputs.
    fn auto_update_interval(&self) -> Duration;

    /// Produce an output without any user utterance.
    async fn auto_output(&self, ctx: &SkillContext) -> Result<Arc<dyn SkillOutput>, SkillError>;
}

/// Object-safe view over any [`Skill`], with its data type erased.
#[async_trait]
pub trait AnySkill: Send + Sync {
    fn skill_info(&self) -> Arc<dyn SkillInfo>;

    fn id(&self) -> String {
        self.skill_info().id().to_string()
    }

    fn tier(&self) -> Specificity;

    fn score_erased(&self, ctx: &SkillContext, input: &str) -> (Score, SkillData);

    async fn generate_erased(
        &self,
        ctx: &SkillContext,
        data: SkillData,
    ) -> Result<Arc<dyn SkillOutput>, SkillError>;

    fn auto_runnable(&self) -> Option<&dyn AutoRunnable>;
}

#[async_trait]
impl<S: Skill> AnySkill for S {
    fn skill_info(&self) -> Arc<dyn SkillInfo> {
        Skill::info(self)
    }

    fn tier(&self) -> Specificity {
        Skill::specificity(self)
    }

    fn score_erased(&self, ctx: &SkillContext, input: &str) -> (Score, SkillData) {
        let (score, data) = Skill::score(self, ctx, input);
        (score, Box::new(data))
    }

    async fn generate_erased(
        &self,
        ctx: &SkillContext,
        data: SkillData,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        let data = data
            .downcast::<S::Data>()
            .map_err(|_| SkillError::DataMismatch {
                skill_id: Skill::info(self).id().to_string(),
            })?;
        Skill::generate_output(self, ctx, *data).await
    }

    fn auto_runnable(&self) -> Option<&dyn AutoRunnable> {
        Skill::as_auto_runnable(self)
    }
}

impl fmt::Debug for dyn AnySkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skill")
            .field("id", &self.id())
            .field("specificity", &self.tier())
            .finish()
    }
}

/// A scored skill together with the data its scoring extracted.
///
/// Produced by the ranker and consumed by [`generate_output`](Self::generate_output)
/// within the same turn.
pub struct SkillWithResult {
    pub skill: Arc<dyn AnySkill>,
    pub score: Score,
    pub data: SkillData,
}

impl SkillWithResult {
    /// Score `skill` against `input`.
    pub fn evaluate(skill: Arc<dyn AnySkill>, ctx: &SkillContext, input: &str) -> Self {
        let (score, data) = skill.score_erased(ctx, input);
        Self { skill, score, data }
    }

    pub fn info(&self) -> Arc<dyn SkillInfo> {
        self.skill.skill_info()
    }

    pub async fn generate_output(
        self,
        ctx: &SkillContext,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        self.skill.generate_erased(ctx, self.data).await
    }
}

impl fmt::Debug for SkillWithResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillWithResult")
            .field("skill", &self.skill)
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

/// Every skill the application knows about, plus the designated fallback.
#[derive(Debug, Clone)]
pub struct SkillCatalog {
    pub skills: Vec<Arc<dyn SkillInfo>>,
    pub fallback: Arc<dyn SkillInfo>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Arc<dyn SkillInfo>>, fallback: Arc<dyn SkillInfo>) -> Self {
        Self { skills, fallback }
    }

    pub fn find(&self, id: &str) -> Option<&Arc<dyn SkillInfo>> {
        self.skills.iter().find(|info| info.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.skills.iter().map(|info| info.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EchoInfo;

    impl SkillInfo for EchoInfo {
        fn id(&self) -> &str {
            "echo"
        }
        fn name(&self) -> &str {
            "Echo"
        }
        fn sentence_example(&self) -> &str {
            "echo something"
        }
        fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
            Arc::new(EchoSkill { info: self })
        }
    }

    struct EchoSkill {
        info: Arc<EchoInfo>,
    }

    #[derive(Debug)]
    struct EchoOutput(String);

    impl SkillOutput for EchoOutput {
        fn speech_output(&self, _ctx: &SkillContext) -> String {
            self.0.clone()
        }
    }

    #[async_trait]
    impl Skill for EchoSkill {
        type Data = String;

        fn info(&self) -> Arc<dyn SkillInfo> {
            self.info.clone()
        }

        fn specificity(&self) -> Specificity {
            Specificity::Low
        }

        fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, String) {
            (Score::numeric(0.5), input.to_uppercase())
        }

        async fn generate_output(
            &self,
            _ctx: &SkillContext,
            data: String,
        ) -> Result<Arc<dyn SkillOutput>, SkillError> {
            Ok(Arc::new(EchoOutput(data)))
        }
    }

    #[tokio::test]
    async fn erased_skill_round_trips_its_data() {
        let ctx = SkillContext::silent("en");
        let skill = Arc::new(EchoInfo).build(&ctx);
        assert_eq!(skill.id(), "echo");
        assert_eq!(skill.tier(), Specificity::Low);
        assert!(skill.auto_runnable().is_none());

        let result = SkillWithResult::evaluate(skill, &ctx, "hi");
        assert_eq!(result.score, Score::Numeric(0.5));
        let output = result.generate_output(&ctx).await.unwrap();
        assert_eq!(output.speech_output(&ctx), "HI");
    }

    #[tokio::test]
    async fn wrong_data_type_is_reported() {
        let ctx = SkillContext::silent("en");
        let skill = Arc::new(EchoInfo).build(&ctx);
        let err = skill
            .generate_erased(&ctx, Box::new(42_u32))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::DataMismatch { ref skill_id } if skill_id == "echo"));
    }

    #[test]
    fn catalog_lookup() {
        let echo: Arc<dyn SkillInfo> = Arc::new(EchoInfo);
        let catalog = SkillCatalog::new(vec![echo.clone()], echo);
        assert!(catalog.find("echo").is_some());
        assert!(catalog.find("missing").is_none());
        assert_eq!(catalog.ids(), vec!["echo"]);
    }

    #[test]
    fn enabled_skills_compare_by_locale_and_ids() {
        let echo: Arc<dyn SkillInfo> = Arc::new(EchoInfo);
        let a = EnabledSkills::new("en", vec![echo.clone()]);
        let b = EnabledSkills::new("en", vec![Arc::new(EchoInfo)]);
        assert!(a.same_as(&b));
        assert!(!a.same_as(&EnabledSkills::new("it", vec![echo])));
        assert!(!a.same_as(&EnabledSkills::new("en", vec![])));
    }

    #[test]
    fn permissions_use_snake_case() {
        let json = serde_json::to_string(&Permission::ReadContacts).unwrap();
        assert_eq!(json, "\"read_contacts\"");
    }
}
