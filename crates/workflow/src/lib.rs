//! Auto-runner: background refresh of auto-runnable skills.
//!
//! Some skills (the clock, the date) can produce an output without being
//! asked. For every enabled skill that can, a task loops
//! `auto_output → publish → sleep(interval)`. Whenever the enabled set
//! changes, the whole generation of tasks is cancelled and joined, the
//! published outputs are cleared, and a new generation starts.

use chrono::Utc;
use futures::FutureExt;
use parley_core::{
    AnySkill, DomainEvent, EnabledSkills, EventBus, SkillContext, SkillOutput, SpeechOutputDevice,
    panic_message,
};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Latest auto output per skill id.
pub type AutoOutputs = HashMap<String, Arc<dyn SkillOutput>>;

/// Supervises one task per auto-runnable enabled skill.
pub struct AutoSkillRunner {
    outputs: watch::Receiver<AutoOutputs>,
    shutdown: CancellationToken,
    supervisor: JoinHandle<()>,
}

impl AutoSkillRunner {
    /// Start supervising on the current tokio runtime.
    pub fn start(
        enabled: watch::Receiver<EnabledSkills>,
        speech_output_device: Arc<dyn SpeechOutputDevice>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let (outputs_tx, outputs) = watch::channel(AutoOutputs::new());
        let shutdown = CancellationToken::new();
        let supervisor = tokio::spawn(supervise(
            enabled,
            speech_output_device,
            outputs_tx,
            event_bus,
            shutdown.clone(),
        ));
        Self {
            outputs,
            shutdown,
            supervisor,
        }
    }

    pub fn outputs(&self) -> watch::Receiver<AutoOutputs> {
        self.outputs.clone()
    }

    pub fn latest(&self, skill_id: &str) -> Option<Arc<dyn SkillOutput>> {
        self.outputs.borrow().get(skill_id).cloned()
    }

    /// Cancel every task and wait for all of them to stop.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.supervisor.await {
            warn!(error = %e, "Auto runner supervisor ended abnormally");
        }
    }
}

async fn supervise(
    mut enabled: watch::Receiver<EnabledSkills>,
    speech_output_device: Arc<dyn SpeechOutputDevice>,
    outputs: watch::Sender<AutoOutputs>,
    event_bus: Arc<EventBus>,
    shutdown: CancellationToken,
) {
    let mut generation = 0u64;
    loop {
        generation += 1;
        let current = enabled.borrow_and_update().clone();
        let ctx = SkillContext::new(current.locale.clone(), speech_output_device.clone());
        let token = shutdown.child_token();

        let tasks: Vec<JoinHandle<()>> = current
            .skills
            .iter()
            .map(|info| info.clone().build(&ctx))
            .filter(|skill| skill.auto_runnable().is_some())
            .map(|skill| {
                tokio::spawn(run_skill(
                    skill,
                    ctx.clone(),
                    outputs.clone(),
                    event_bus.clone(),
                    token.clone(),
                ))
            })
            .collect();

        info!(generation, task_count = tasks.len(), "Auto tasks started");
        event_bus.publish(DomainEvent::AutoTasksRestarted {
            generation,
            task_count: tasks.len(),
            timestamp: Utc::now(),
        });

        let stop = tokio::select! {
            _ = shutdown.cancelled() => true,
            changed = enabled.changed() => match changed {
                Ok(()) => false,
                // Nobody can change the set anymore: keep this generation until shutdown
                Err(_) => {
                    shutdown.cancelled().await;
                    true
                }
            },
        };

        token.cancel();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(generation, error = %e, "Auto task ended abnormally");
            }
        }
        outputs.send_replace(AutoOutputs::new());
        debug!(generation, "Auto tasks stopped");

        if stop {
            break;
        }
    }
}

async fn run_skill(
    skill: Arc<dyn AnySkill>,
    ctx: SkillContext,
    outputs: watch::Sender<AutoOutputs>,
    event_bus: Arc<EventBus>,
    token: CancellationToken,
) {
    let Some(auto) = skill.auto_runnable() else {
        return;
    };
    let skill_id = skill.id();
    let interval = auto.auto_update_interval();
    debug!(skill_id = %skill_id, interval_ms = interval.as_millis() as u64, "Auto task running");

    loop {
        let produced = tokio::select! {
            _ = token.cancelled() => break,
            produced = AssertUnwindSafe(auto.auto_output(&ctx)).catch_unwind() => produced,
        };

        match produced {
            Ok(Ok(output)) => {
                outputs.send_modify(|map| {
                    map.insert(skill_id.clone(), output);
                });
                event_bus.publish(DomainEvent::AutoOutputPublished {
                    skill_id: skill_id.clone(),
                    timestamp: Utc::now(),
                });
            }
            Ok(Err(e)) => warn!(skill_id = %skill_id, error = %e, "Auto output failed"),
            Err(payload) => warn!(
                skill_id = %skill_id,
                reason = %panic_message(&*payload),
                "Auto output panicked"
            ),
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::{
        AutoRunnable, NothingSpeechDevice, Score, Skill, SkillError, SkillInfo, Specificity,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const INTERVAL: Duration = Duration::from_secs(10);

    /// What the n-th call (1-based) of a ticking skill does.
    #[derive(Debug, Clone, Copy)]
    enum Misbehave {
        Never,
        FailFirst,
        PanicFirst,
    }

    #[derive(Debug)]
    struct TickInfo {
        id: &'static str,
        auto: bool,
        misbehave: Misbehave,
        calls: AtomicUsize,
    }

    impl TickInfo {
        fn new(id: &'static str) -> Arc<Self> {
            Self::with(id, true, Misbehave::Never)
        }

        fn with(id: &'static str, auto: bool, misbehave: Misbehave) -> Arc<Self> {
            Arc::new(Self {
                id,
                auto,
                misbehave,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SkillInfo for TickInfo {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn sentence_example(&self) -> &str {
            ""
        }

        fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
            Arc::new(TickSkill { info: self })
        }
    }

    struct TickSkill {
        info: Arc<TickInfo>,
    }

    #[async_trait]
    impl Skill for TickSkill {
        type Data = ();

        fn info(&self) -> Arc<dyn SkillInfo> {
            self.info.clone()
        }

        fn specificity(&self) -> Specificity {
            Specificity::Low
        }

        fn score(&self, _ctx: &SkillContext, _input: &str) -> (Score, ()) {
            (Score::AlwaysWorst, ())
        }

        async fn generate_output(
            &self,
            _ctx: &SkillContext,
            _data: (),
        ) -> Result<Arc<dyn SkillOutput>, SkillError> {
            Err(SkillError::Unavailable("ticks only".into()))
        }

        fn as_auto_runnable(&self) -> Option<&dyn AutoRunnable> {
            if self.info.auto { Some(self) } else { None }
        }
    }

    #[async_trait]
    impl AutoRunnable for TickSkill {
        fn auto_update_interval(&self) -> Duration {
            INTERVAL
        }

        async fn auto_output(
            &self,
            _ctx: &SkillContext,
        ) -> Result<Arc<dyn SkillOutput>, SkillError> {
            let call = self.info.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match (self.info.misbehave, call) {
                (Misbehave::FailFirst, 1) => Err(SkillError::ExecutionFailed {
                    skill_id: self.info.id.into(),
                    reason: "cold start".into(),
                }),
                (Misbehave::PanicFirst, 1) => panic!("tick exploded"),
                _ => Ok(Arc::new(Tick(call))),
            }
        }
    }

    #[derive(Debug)]
    struct Tick(usize);

    impl SkillOutput for Tick {
        fn speech_output(&self, _ctx: &SkillContext) -> String {
            format!("tick {}", self.0)
        }
    }

    fn enabled(skills: &[&Arc<TickInfo>]) -> EnabledSkills {
        EnabledSkills::new(
            "en",
            skills
                .iter()
                .map(|info| -> Arc<dyn SkillInfo> { (*info).clone() })
                .collect(),
        )
    }

    fn tick_of(runner: &AutoSkillRunner, id: &str) -> Option<usize> {
        runner
            .latest(id)
            .map(|output| output.downcast_ref::<Tick>().map(|t| t.0).unwrap_or(0))
    }

    /// Let every ready task run without moving the clock past a tick.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn start(skills: &[&Arc<TickInfo>]) -> (AutoSkillRunner, watch::Sender<EnabledSkills>) {
        let (tx, rx) = watch::channel(enabled(skills));
        let runner = AutoSkillRunner::start(
            rx,
            Arc::new(NothingSpeechDevice),
            Arc::new(EventBus::default()),
        );
        (runner, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_and_refreshes_on_interval() {
        let clock = TickInfo::new("clock");
        let (runner, _tx) = start(&[&clock]);

        settle().await;
        assert_eq!(tick_of(&runner, "clock"), Some(1));

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(tick_of(&runner, "clock"), Some(2));

        runner.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn skips_skills_that_are_not_auto_runnable() {
        let clock = TickInfo::new("clock");
        let manual = TickInfo::with("manual", false, Misbehave::Never);
        let (tx, rx) = watch::channel(enabled(&[&clock, &manual]));
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let runner = AutoSkillRunner::start(rx, Arc::new(NothingSpeechDevice), bus);

        match &*events.recv().await.unwrap() {
            DomainEvent::AutoTasksRestarted {
                generation,
                task_count,
                ..
            } => {
                assert_eq!(*generation, 1);
                assert_eq!(*task_count, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        settle().await;
        assert_eq!(manual.calls(), 0);
        drop(tx);
        runner.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn enabled_set_change_restarts_every_task() {
        let clock = TickInfo::new("clock");
        let date = TickInfo::new("date");
        let (runner, tx) = start(&[&clock]);
        let mut outputs = runner.outputs();

        settle().await;
        assert_eq!(tick_of(&runner, "clock"), Some(1));

        tx.send_replace(enabled(&[&date]));
        settle().await;
        assert_eq!(tick_of(&runner, "clock"), None);
        assert_eq!(tick_of(&runner, "date"), Some(1));
        assert!(outputs.has_changed().unwrap());
        outputs.borrow_and_update();

        // The old generation was joined: it never ticks again
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(clock.calls(), 1);
        assert_eq!(tick_of(&runner, "date"), Some(4));

        runner.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_iteration_is_retried_next_interval() {
        let flaky = TickInfo::with("flaky", true, Misbehave::FailFirst);
        let (runner, _tx) = start(&[&flaky]);

        settle().await;
        assert_eq!(tick_of(&runner, "flaky"), None);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(tick_of(&runner, "flaky"), Some(2));

        runner.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_iteration_does_not_kill_the_task() {
        let wild = TickInfo::with("wild", true, Misbehave::PanicFirst);
        let (runner, _tx) = start(&[&wild]);

        settle().await;
        assert_eq!(tick_of(&runner, "wild"), None);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(tick_of(&runner, "wild"), Some(2));

        runner.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_and_clears() {
        let clock = TickInfo::new("clock");
        let (runner, _tx) = start(&[&clock]);
        let outputs = runner.outputs();

        settle().await;
        assert!(!outputs.borrow().is_empty());

        runner.shutdown().await;
        assert!(outputs.borrow().is_empty());

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(clock.calls(), 1);
    }
}
