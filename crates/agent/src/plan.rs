//! Applying an output's interaction plan to the ranker stack.

use crate::ranker::SkillRanker;
use parley_core::InteractionPlan;

/// Apply `plan` to `ranker` and tell whether the microphone should reopen.
pub fn resolve_plan(ranker: &mut SkillRanker, plan: &InteractionPlan) -> bool {
    match plan {
        InteractionPlan::FinishInteraction => ranker.remove_all_batches(),
        InteractionPlan::FinishSubInteraction => ranker.remove_top_batch(),
        InteractionPlan::Continue { .. } => {}
        InteractionPlan::StartSubInteraction { next_skills, .. } => {
            ranker.add_batch_to_top(next_skills.clone());
        }
        InteractionPlan::ReplaceSubInteraction { next_skills, .. } => {
            ranker.remove_top_batch();
            ranker.add_batch_to_top(next_skills.clone());
        }
    }
    plan.reopen_microphone()
}
