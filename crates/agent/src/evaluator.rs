//! The evaluator loop.
//!
//! A single worker task owns the ranker, the skill context and the
//! interaction log. Input events reach it through a bounded queue and are
//! handled strictly in order:
//!
//! 1. **Receive** an input event from the recognizer
//! 2. **Rank** every alternative of a final utterance, falling back when none matches
//! 3. **Check permissions** the chosen skill needs
//! 4. **Generate** the output and apply its interaction plan to the ranker
//! 5. **Log** the question and answer, speak, and reopen the microphone if asked
//!
//! Failures anywhere in a turn become an error interaction; the worker keeps running.

use crate::outputs::{ErrorOutput, MissingPermissionsOutput};
use crate::plan::resolve_plan;
use crate::ranker::{RankerThresholds, SkillRanker};
use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use parley_config::EvaluatorConfig;
use parley_core::{
    DomainEvent, EnabledSkills, Error, EventBus, InputEvent, InteractionLog, PendingQuestion,
    Permission, Result, SkillContext, SkillError, SkillInfo, SkillOutput, SkillWithResult,
    SpeechOutputDevice, panic_message,
};
use parley_skills::TextFallbackOutput;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Longest utterance excerpt carried by events.
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorSettings {
    /// Whether the fallback may ask the user to repeat.
    pub ask_to_repeat: bool,
    pub queue_capacity: usize,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            ask_to_repeat: true,
            queue_capacity: 32,
        }
    }
}

impl From<&EvaluatorConfig> for EvaluatorSettings {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            ask_to_repeat: config.ask_to_repeat,
            queue_capacity: config.queue_capacity,
        }
    }
}

/// Asks the user for permissions a skill needs.
#[async_trait]
pub trait PermissionRequester: Send + Sync {
    /// Whether every permission in `permissions` is granted.
    async fn request_permissions(&self, permissions: &[Permission]) -> bool;
}

/// Grants a fixed set of permissions and denies the rest.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    granted: Vec<Permission>,
}

impl StaticPermissions {
    pub fn new(granted: Vec<Permission>) -> Self {
        Self { granted }
    }
}

#[async_trait]
impl PermissionRequester for StaticPermissions {
    async fn request_permissions(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.granted.contains(p))
    }
}

/// The speech recognizer, as seen by the evaluator.
pub trait InputDevice: Send + Sync {
    /// Start listening if possible, sending what is heard to `sink`.
    fn try_listen(&self, sink: EvaluatorHandle);
}

struct Command {
    event: InputEvent,
    done: Option<oneshot::Sender<()>>,
}

/// Cheap, cloneable access to a running evaluator.
///
/// The worker stops once every handle is dropped.
#[derive(Clone)]
pub struct EvaluatorHandle {
    tx: mpsc::Sender<Command>,
    log: watch::Receiver<InteractionLog>,
}

impl EvaluatorHandle {
    /// Queue an event, waiting for room in the queue.
    pub async fn submit(&self, event: InputEvent) -> Result<()> {
        self.tx
            .send(Command { event, done: None })
            .await
            .map_err(|_| Error::EvaluatorClosed)
    }

    /// Queue an event without waiting.
    pub fn try_submit(&self, event: InputEvent) -> Result<()> {
        self.tx
            .try_send(Command { event, done: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Error::QueueFull,
                mpsc::error::TrySendError::Closed(_) => Error::EvaluatorClosed,
            })
    }

    /// Queue an event and wait until it was handled. Returns the log as it
    /// was right after.
    pub async fn process(&self, event: InputEvent) -> Result<InteractionLog> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Command {
                event,
                done: Some(done_tx),
            })
            .await
            .map_err(|_| Error::EvaluatorClosed)?;
        done_rx.await.map_err(|_| Error::EvaluatorClosed)?;
        Ok(self.log.borrow().clone())
    }

    pub fn interaction_log(&self) -> watch::Receiver<InteractionLog> {
        self.log.clone()
    }

    pub fn snapshot(&self) -> InteractionLog {
        self.log.borrow().clone()
    }
}

impl std::fmt::Debug for EvaluatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Configures and starts the evaluator worker.
pub struct SkillEvaluator {
    ctx: SkillContext,
    fallback: Arc<dyn SkillInfo>,
    enabled: watch::Receiver<EnabledSkills>,
    permissions: Arc<dyn PermissionRequester>,
    event_bus: Arc<EventBus>,
    thresholds: RankerThresholds,
    settings: EvaluatorSettings,
    input_device: Option<Arc<dyn InputDevice>>,
}

impl SkillEvaluator {
    pub fn new(
        speech_output_device: Arc<dyn SpeechOutputDevice>,
        fallback: Arc<dyn SkillInfo>,
        enabled: watch::Receiver<EnabledSkills>,
        permissions: Arc<dyn PermissionRequester>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let locale = enabled.borrow().locale.clone();
        Self {
            ctx: SkillContext::new(locale, speech_output_device),
            fallback,
            enabled,
            permissions,
            event_bus,
            thresholds: RankerThresholds::default(),
            settings: EvaluatorSettings::default(),
            input_device: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: RankerThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_settings(mut self, settings: EvaluatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The device to reopen when an output asks for more input.
    pub fn with_input_device(mut self, device: Arc<dyn InputDevice>) -> Self {
        self.input_device = Some(device);
        self
    }

    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(self) -> EvaluatorHandle {
        let (tx, rx) = mpsc::channel(self.settings.queue_capacity.max(1));
        let (log_tx, log_rx) = watch::channel(InteractionLog::default());

        let mut ctx = self.ctx;
        let mut enabled = self.enabled;
        let ranker = fresh_ranker(&mut ctx, &mut enabled, &self.fallback, self.thresholds);

        let worker = Worker {
            ctx,
            ranker,
            fallback: self.fallback,
            enabled,
            permissions: self.permissions,
            event_bus: self.event_bus,
            thresholds: self.thresholds,
            settings: self.settings,
            input_device: self.input_device,
            log: log_tx,
            sink: tx.downgrade(),
            log_rx: log_rx.clone(),
        };

        tokio::spawn(worker.run(rx));
        EvaluatorHandle { tx, log: log_rx }
    }
}

struct Worker {
    ctx: SkillContext,
    ranker: SkillRanker,
    fallback: Arc<dyn SkillInfo>,
    enabled: watch::Receiver<EnabledSkills>,
    permissions: Arc<dyn PermissionRequester>,
    event_bus: Arc<EventBus>,
    thresholds: RankerThresholds,
    settings: EvaluatorSettings,
    input_device: Option<Arc<dyn InputDevice>>,
    log: watch::Sender<InteractionLog>,
    /// Weak so that the worker does not keep its own queue open.
    sink: mpsc::WeakSender<Command>,
    log_rx: watch::Receiver<InteractionLog>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!(locale = %self.ctx.locale, "Skill evaluator started");
        while let Some(Command { event, done }) = rx.recv().await {
            if self.enabled.has_changed().unwrap_or(false) {
                self.rebuild_ranker();
            }
            self.handle(event).await;
            if let Some(done) = done {
                let _ = done.send(());
            }
        }
        info!("Skill evaluator stopped");
    }

    fn rebuild_ranker(&mut self) {
        self.ranker = fresh_ranker(
            &mut self.ctx,
            &mut self.enabled,
            &self.fallback,
            self.thresholds,
        );
    }

    async fn handle(&mut self, event: InputEvent) {
        let turn_id = uuid::Uuid::new_v4().to_string();
        self.event_bus.publish(DomainEvent::UtteranceReceived {
            turn_id: turn_id.clone(),
            kind: event.kind().to_string(),
            text_preview: preview(&event),
            timestamp: Utc::now(),
        });

        match event {
            InputEvent::Partial(text) => self.set_pending(text, None),
            InputEvent::None => self.clear_pending(),
            InputEvent::Error(cause) => self.add_error(&turn_id, cause, false),
            InputEvent::Final { utterances } => {
                let inputs: Vec<String> = utterances.into_iter().map(|(text, _)| text).collect();
                if inputs.is_empty() {
                    self.clear_pending();
                } else {
                    self.evaluate(&turn_id, inputs).await;
                }
            }
        }
    }

    async fn evaluate(&mut self, turn_id: &str, inputs: Vec<String>) {
        let first = inputs[0].clone();
        self.set_pending(first.clone(), None);

        let ranker = &self.ranker;
        let ctx = &self.ctx;
        let chosen = std::panic::catch_unwind(AssertUnwindSafe(|| {
            choose(ranker, ctx, &inputs, &first)
        }));
        let (input, chosen, used_fallback) = match chosen {
            Ok(chosen) => chosen,
            Err(payload) => {
                let reason = panic_message(&*payload);
                let cause = Error::Internal(format!("Scoring panicked: {reason}"));
                self.add_error(turn_id, cause, true);
                return;
            }
        };

        let info = chosen.info();
        let skill_id = info.id().to_string();
        info!(
            turn_id,
            skill_id = %skill_id,
            score = %chosen.score,
            used_fallback,
            "Skill chosen"
        );
        self.event_bus.publish(DomainEvent::SkillChosen {
            turn_id: turn_id.to_string(),
            skill_id: skill_id.clone(),
            score: chosen.score.as_f64(),
            used_fallback,
            timestamp: Utc::now(),
        });
        self.set_pending(input, Some(info.clone()));

        let needed = info.needed_permissions();
        if !needed.is_empty() {
            let granted = AssertUnwindSafe(self.permissions.request_permissions(needed))
                .catch_unwind()
                .await;
            match granted {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        turn_id,
                        skill_id = %skill_id,
                        permissions = ?needed,
                        "Permissions denied"
                    );
                    let missing = MissingPermissionsOutput::new(info.clone(), needed.to_vec());
                    self.answer(Arc::new(missing));
                    return;
                }
                Err(payload) => {
                    let reason = panic_message(&*payload);
                    let cause = Error::Internal(format!("Permission request panicked: {reason}"));
                    self.add_error(turn_id, cause, true);
                    return;
                }
            }
        }

        self.ctx.previous_output = if self.settings.ask_to_repeat {
            self.log.borrow().last_answer()
        } else {
            let no_repeat: Arc<dyn SkillOutput> = Arc::new(TextFallbackOutput::new(true));
            Some(no_repeat)
        };

        let started = Instant::now();
        let generated = AssertUnwindSafe(chosen.generate_output(&self.ctx))
            .catch_unwind()
            .await;
        let output = match generated {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                self.add_error(turn_id, e.into(), true);
                return;
            }
            Err(payload) => {
                self.add_error(turn_id, SkillError::from_panic(&skill_id, &*payload).into(), true);
                return;
            }
        };

        let ctx = &self.ctx;
        let rendered = std::panic::catch_unwind(AssertUnwindSafe(|| {
            (output.interaction_plan(ctx), output.speech_output(ctx))
        }));
        let (plan, speech) = match rendered {
            Ok(rendered) => rendered,
            Err(payload) => {
                self.add_error(turn_id, SkillError::from_panic(&skill_id, &*payload).into(), true);
                return;
            }
        };

        let reopen = resolve_plan(&mut self.ranker, &plan);
        let duration_ms = started.elapsed().as_millis() as u64;
        debug!(
            turn_id,
            skill_id = %skill_id,
            plan = plan.name(),
            depth = self.ranker.depth(),
            duration_ms,
            "Output generated"
        );
        self.event_bus.publish(DomainEvent::OutputGenerated {
            turn_id: turn_id.to_string(),
            skill_id,
            plan: plan.name().to_string(),
            reopen_microphone: reopen,
            duration_ms,
            timestamp: Utc::now(),
        });

        self.answer(output);
        if !speech.trim().is_empty() {
            let device = &self.ctx.speech_output_device;
            let spoken = std::panic::catch_unwind(AssertUnwindSafe(|| device.speak(&speech)));
            if let Err(payload) = spoken {
                let reason = panic_message(&*payload);
                let cause = Error::Internal(format!("Speech output panicked: {reason}"));
                self.add_error(turn_id, cause, true);
                return;
            }
        }
        if reopen {
            self.reopen_microphone();
        }
    }

    fn set_pending(&self, user_input: String, skill: Option<Arc<dyn SkillInfo>>) {
        let continues = self.ranker.has_any_batches();
        self.log.send_modify(|log| {
            log.pending_question = Some(PendingQuestion {
                user_input,
                continues_last_interaction: continues,
                skill_being_evaluated: skill,
            });
        });
    }

    fn clear_pending(&self) {
        self.log.send_modify(|log| log.pending_question = None);
    }

    fn answer(&self, output: Arc<dyn SkillOutput>) {
        let continues = self.ranker.has_any_batches();
        self.log
            .send_modify(|log| log.answer_pending(output, continues));
    }

    fn add_error(&self, turn_id: &str, cause: Error, from_skill_evaluation: bool) {
        warn!(turn_id, error = %cause, from_skill_evaluation, "Turn failed");
        self.event_bus.publish(DomainEvent::TurnFailed {
            turn_id: turn_id.to_string(),
            error_message: cause.to_string(),
            timestamp: Utc::now(),
        });
        self.answer(Arc::new(ErrorOutput::new(cause, from_skill_evaluation)));
    }

    /// Ask the input device to listen again once the speech is over.
    fn reopen_microphone(&self) {
        let Some(device) = self.input_device.clone() else {
            return;
        };
        let Some(tx) = self.sink.upgrade() else {
            return;
        };
        let sink = EvaluatorHandle {
            tx,
            log: self.log_rx.clone(),
        };
        self.ctx
            .speech_output_device
            .run_when_finished_speaking(Box::new(move || device.try_listen(sink)));
    }
}

/// Fresh skill instances for the current enabled set, with an empty stack.
fn fresh_ranker(
    ctx: &mut SkillContext,
    enabled: &mut watch::Receiver<EnabledSkills>,
    fallback: &Arc<dyn SkillInfo>,
    thresholds: RankerThresholds,
) -> SkillRanker {
    let enabled = enabled.borrow_and_update().clone();
    if !enabled.locale.is_empty() {
        ctx.locale = enabled.locale.clone();
    }
    let skills = enabled
        .skills
        .iter()
        .map(|info| info.clone().build(ctx))
        .collect();
    debug!(skills = ?enabled.ids(), locale = %ctx.locale, "Ranker rebuilt");
    SkillRanker::new(skills, fallback.clone().build(ctx), thresholds)
}

/// The first alternative some skill accepts, or the fallback for the first one.
fn choose(
    ranker: &SkillRanker,
    ctx: &SkillContext,
    inputs: &[String],
    first: &str,
) -> (String, SkillWithResult, bool) {
    inputs
        .iter()
        .find_map(|input| {
            ranker
                .get_best(ctx, input)
                .map(|best| (input.clone(), best, false))
        })
        .unwrap_or_else(|| (first.to_string(), ranker.get_fallback_skill(ctx, first), true))
}

fn preview(event: &InputEvent) -> String {
    let text = match event {
        InputEvent::Final { utterances } => utterances
            .first()
            .map(|(text, _)| text.as_str())
            .unwrap_or_default(),
        InputEvent::Partial(text) => text.as_str(),
        InputEvent::None | InputEvent::Error(_) => "",
    };
    text.chars().take(PREVIEW_CHARS).collect()
}
