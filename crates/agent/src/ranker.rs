//! Tiered skill ranking over a stack of batches.
//!
//! The bottom batch holds every enabled skill and is never popped. Skills
//! that start a sub-interaction push a batch on top, so follow-up answers
//! ("yes", "the second one") are matched against them first.

use parley_config::RankerConfig;
use parley_core::{AnySkill, SkillContext, SkillWithResult, Specificity};
use std::sync::Arc;

/// Minimum score a tier winner needs to be chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl RankerThresholds {
    pub fn for_tier(&self, tier: Specificity) -> f64 {
        match tier {
            Specificity::High => self.high,
            Specificity::Medium => self.medium,
            Specificity::Low => self.low,
        }
    }
}

impl Default for RankerThresholds {
    fn default() -> Self {
        Self {
            high: 0.85,
            medium: 0.90,
            low: 0.95,
        }
    }
}

impl From<RankerConfig> for RankerThresholds {
    fn from(config: RankerConfig) -> Self {
        Self {
            high: config.high_threshold,
            medium: config.medium_threshold,
            low: config.low_threshold,
        }
    }
}

pub struct SkillRanker {
    /// `batches[0]` is the base batch.
    batches: Vec<Vec<Arc<dyn AnySkill>>>,
    fallback: Arc<dyn AnySkill>,
    thresholds: RankerThresholds,
}

impl SkillRanker {
    pub fn new(
        base_skills: Vec<Arc<dyn AnySkill>>,
        fallback: Arc<dyn AnySkill>,
        thresholds: RankerThresholds,
    ) -> Self {
        Self {
            batches: vec![base_skills],
            fallback,
            thresholds,
        }
    }

    /// The best acceptable skill for `input`, if any.
    ///
    /// Tiers are tried from High to Low. Every candidate of a tier is scored
    /// before its winner is checked against the tier threshold, and within
    /// a tier the candidate seen first wins ties. Candidates are seen from
    /// the top batch down.
    pub fn get_best(&self, ctx: &SkillContext, input: &str) -> Option<SkillWithResult> {
        for tier in Specificity::DESCENDING {
            let mut best: Option<SkillWithResult> = None;
            for skill in self.candidates().filter(|skill| skill.tier() == tier) {
                let result = SkillWithResult::evaluate(skill.clone(), ctx, input);
                let better = best
                    .as_ref()
                    .is_none_or(|current| result.score > current.score);
                if better {
                    best = Some(result);
                }
            }

            let threshold = self.thresholds.for_tier(tier);
            if let Some(best) = best {
                tracing::debug!(
                    skill_id = %best.info().id(),
                    score = %best.score,
                    tier = %tier,
                    threshold,
                    "Tier winner"
                );
                if best.score.is_acceptable(threshold) {
                    return Some(best);
                }
            }
        }
        None
    }

    /// Score the fallback skill, whatever the stack holds.
    pub fn get_fallback_skill(&self, ctx: &SkillContext, input: &str) -> SkillWithResult {
        SkillWithResult::evaluate(self.fallback.clone(), ctx, input)
    }

    pub fn add_batch_to_top(&mut self, skills: Vec<Arc<dyn AnySkill>>) {
        self.batches.push(skills);
    }

    /// Pop the top batch. The base batch stays.
    pub fn remove_top_batch(&mut self) {
        if self.batches.len() > 1 {
            self.batches.pop();
        }
    }

    pub fn remove_all_batches(&mut self) {
        self.batches.truncate(1);
    }

    /// Whether any batch was pushed above the base one.
    pub fn has_any_batches(&self) -> bool {
        self.batches.len() > 1
    }

    pub fn depth(&self) -> usize {
        self.batches.len() - 1
    }

    fn candidates(&self) -> impl Iterator<Item = &Arc<dyn AnySkill>> {
        self.batches.iter().rev().flatten()
    }
}

impl std::fmt::Debug for SkillRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRanker")
            .field("batches", &self.batches)
            .field("fallback", &self.fallback.id())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}
