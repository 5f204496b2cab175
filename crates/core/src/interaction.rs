//! The interaction log: everything the user asked and the assistant answered.
//!
//! The log is the only externally observable state of the evaluator. It is
//! plain data, cloned into a `watch` channel after every change.

use crate::output::SkillOutput;
use crate::skill::SkillInfo;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct QuestionAnswer {
    /// What the user said. `None` when the answer did not follow an utterance.
    pub question: Option<String>,
    pub answer: Arc<dyn SkillOutput>,
}

/// One dialogue with a skill, possibly spanning several turns.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub skill: Option<Arc<dyn SkillInfo>>,
    pub question_answers: Vec<QuestionAnswer>,
}

/// The utterance currently being handled.
#[derive(Debug, Clone)]
pub struct PendingQuestion {
    pub user_input: String,
    pub continues_last_interaction: bool,
    pub skill_being_evaluated: Option<Arc<dyn SkillInfo>>,
}

#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    pub interactions: Vec<Interaction>,
    pub pending_question: Option<PendingQuestion>,
}

impl InteractionLog {
    /// The most recent answer, if any.
    pub fn last_answer(&self) -> Option<Arc<dyn SkillOutput>> {
        self.interactions
            .last()
            .and_then(|interaction| interaction.question_answers.last())
            .map(|qa| qa.answer.clone())
    }

    /// Move the pending question into the log together with `answer`.
    ///
    /// The pair joins the last interaction when the pending question said so
    /// (or, without a pending question, when `default_continues` is set) and an
    /// interaction exists; otherwise it starts a new one. The pending question
    /// is cleared either way.
    pub fn answer_pending(&mut self, answer: Arc<dyn SkillOutput>, default_continues: bool) {
        let pending = self.pending_question.take();
        let (question, continues, skill) = match pending {
            Some(p) => (
                Some(p.user_input),
                p.continues_last_interaction,
                p.skill_being_evaluated,
            ),
            None => (None, default_continues, None),
        };
        let qa = QuestionAnswer { question, answer };

        match self.interactions.last_mut() {
            Some(last) if continues => last.question_answers.push(qa),
            _ => self.interactions.push(Interaction {
                skill,
                question_answers: vec![qa],
            }),
        }
    }

    pub fn question_answer_count(&self) -> usize {
        self.interactions
            .iter()
            .map(|interaction| interaction.question_answers.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SkillContext;

    #[derive(Debug)]
    struct Said(&'static str);

    impl SkillOutput for Said {
        fn speech_output(&self, _ctx: &SkillContext) -> String {
            self.0.into()
        }
    }

    fn pending(text: &str, continues: bool) -> Option<PendingQuestion> {
        Some(PendingQuestion {
            user_input: text.into(),
            continues_last_interaction: continues,
            skill_being_evaluated: None,
        })
    }

    #[test]
    fn new_interaction_when_not_continuing() {
        let mut log = InteractionLog::default();
        log.pending_question = pending("hello", false);
        log.answer_pending(Arc::new(Said("hi")), false);
        log.pending_question = pending("again", false);
        log.answer_pending(Arc::new(Said("hi again")), false);

        assert_eq!(log.interactions.len(), 2);
        assert!(log.pending_question.is_none());
        assert_eq!(
            log.interactions[0].question_answers[0].question.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn continuing_appends_to_last_interaction() {
        let mut log = InteractionLog::default();
        log.pending_question = pending("call bob", false);
        log.answer_pending(Arc::new(Said("call bob?")), false);
        log.pending_question = pending("yes", true);
        log.answer_pending(Arc::new(Said("calling")), false);

        assert_eq!(log.interactions.len(), 1);
        assert_eq!(log.question_answer_count(), 2);
        let ctx = SkillContext::silent("en");
        assert_eq!(log.last_answer().unwrap().speech_output(&ctx), "calling");
    }

    #[test]
    fn continuing_with_empty_log_starts_one() {
        let mut log = InteractionLog::default();
        log.pending_question = pending("yes", true);
        log.answer_pending(Arc::new(Said("ok")), false);
        assert_eq!(log.interactions.len(), 1);
    }

    #[test]
    fn answer_without_pending_has_no_question() {
        let mut log = InteractionLog::default();
        log.answer_pending(Arc::new(Said("oops")), false);
        assert_eq!(log.interactions[0].question_answers[0].question, None);
        assert!(log.interactions[0].skill.is_none());
    }
}
