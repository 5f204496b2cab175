//! Shared test helpers for ranker and evaluator tests.

use async_trait::async_trait;
use parley_core::{
    AnySkill, InteractionPlan, Permission, Score, Skill, SkillContext, SkillError, SkillInfo,
    SkillOutput, SpeechOutputDevice, Specificity,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a [`MockInfo`] skill does when asked to generate.
#[derive(Clone)]
pub enum Reply {
    Say(&'static str, InteractionPlan),
    Fail(SkillError),
    Panic,
}

/// A scripted skill descriptor. Every instance it builds shares its call counters.
pub struct MockInfo {
    pub id: &'static str,
    tier: Specificity,
    score: Score,
    reply: Reply,
    permissions: Vec<Permission>,
    keyword: Option<&'static str>,
    panic_on_score: bool,
    score_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl MockInfo {
    pub fn new(id: &'static str, tier: Specificity, score: Score) -> Arc<Self> {
        Arc::new(Self::unshared(id, tier, score))
    }

    pub fn scored(id: &'static str, tier: Specificity, score: f64) -> Arc<Self> {
        Self::new(id, tier, Score::Numeric(score))
    }

    /// An `AlwaysBest` skill that says `speech` and then follows `plan`.
    pub fn saying(id: &'static str, speech: &'static str, plan: InteractionPlan) -> Arc<Self> {
        let mut info = Self::unshared(id, Specificity::Low, Score::AlwaysBest);
        info.reply = Reply::Say(speech, plan);
        Arc::new(info)
    }

    /// Like [`saying`](Self::saying), but only recognizes inputs containing `keyword`.
    pub fn answering(
        id: &'static str,
        keyword: &'static str,
        speech: &'static str,
        plan: InteractionPlan,
    ) -> Arc<Self> {
        let mut info = Self::unshared(id, Specificity::Low, Score::AlwaysBest);
        info.reply = Reply::Say(speech, plan);
        info.keyword = Some(keyword);
        Arc::new(info)
    }

    pub fn failing(id: &'static str, reply: Reply) -> Arc<Self> {
        let mut info = Self::unshared(id, Specificity::Low, Score::AlwaysBest);
        info.reply = reply;
        Arc::new(info)
    }

    pub fn panicking_on_score(id: &'static str) -> Arc<Self> {
        let mut info = Self::unshared(id, Specificity::Low, Score::AlwaysBest);
        info.panic_on_score = true;
        Arc::new(info)
    }

    pub fn needing(id: &'static str, permissions: &[Permission]) -> Arc<Self> {
        let mut info = Self::unshared(id, Specificity::Low, Score::AlwaysBest);
        info.permissions = permissions.to_vec();
        Arc::new(info)
    }

    fn unshared(id: &'static str, tier: Specificity, score: Score) -> Self {
        Self {
            id,
            tier,
            score,
            reply: Reply::Say(id, InteractionPlan::FinishInteraction),
            permissions: Vec::new(),
            keyword: None,
            panic_on_score: false,
            score_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
        }
    }

    pub fn skill(self: &Arc<Self>) -> Arc<dyn AnySkill> {
        Arc::new(MockSkill { info: self.clone() })
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockInfo").field("id", &self.id).finish()
    }
}

impl SkillInfo for MockInfo {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.id
    }

    fn sentence_example(&self) -> &str {
        ""
    }

    fn needed_permissions(&self) -> &[Permission] {
        &self.permissions
    }

    fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
        self.skill()
    }
}

struct MockSkill {
    info: Arc<MockInfo>,
}

#[async_trait]
impl Skill for MockSkill {
    type Data = String;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        self.info.tier
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, String) {
        self.info.score_calls.fetch_add(1, Ordering::SeqCst);
        if self.info.panic_on_score {
            panic!("scoring {} blew up", self.info.id);
        }
        match self.info.keyword {
            Some(keyword) if !input.to_lowercase().contains(keyword) => {
                (Score::AlwaysWorst, input.to_string())
            }
            _ => (self.info.score, input.to_string()),
        }
    }

    async fn generate_output(
        &self,
        _ctx: &SkillContext,
        input: String,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        self.info.generate_calls.fetch_add(1, Ordering::SeqCst);
        match self.info.reply.clone() {
            Reply::Say(speech, plan) => Ok(Arc::new(MockOutput {
                speech: speech.to_string(),
                input,
                plan,
            })),
            Reply::Fail(error) => Err(error),
            Reply::Panic => panic!("generating {} blew up", self.info.id),
        }
    }
}

#[derive(Debug)]
pub struct MockOutput {
    pub speech: String,
    pub input: String,
    plan: InteractionPlan,
}

impl SkillOutput for MockOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        self.speech.clone()
    }

    fn interaction_plan(&self, _ctx: &SkillContext) -> InteractionPlan {
        self.plan.clone()
    }
}

/// Records what was spoken. Completion callbacks wait for [`finish`](Self::finish).
#[derive(Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    waiting: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl RecordingSpeech {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Pretend playback ended: run every queued callback.
    pub fn finish(&self) {
        let callbacks: Vec<_> = self.waiting.lock().unwrap().drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl SpeechOutputDevice for RecordingSpeech {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn run_when_finished_speaking(&self, callback: Box<dyn FnOnce() + Send>) {
        self.waiting.lock().unwrap().push(callback);
    }
}
