//! The dialogue engine of Parley.
//!
//! Each utterance goes through the same steps:
//!
//! 1. **Rank**: the [`SkillRanker`] scores skills tier by tier, newest batch first
//! 2. **Generate**: the chosen skill produces an output
//! 3. **Resolve**: the output's interaction plan pushes, pops or clears batches
//! 4. **Log**: the question and answer join the [`InteractionLog`](parley_core::InteractionLog)
//!
//! The [`SkillEvaluator`] runs these steps on a single worker task; the
//! [`SkillHandler`] decides which skills take part.

pub mod evaluator;
pub mod handler;
pub mod outputs;
pub mod plan;
pub mod ranker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use evaluator::{
    EvaluatorHandle, EvaluatorSettings, InputDevice, PermissionRequester, SkillEvaluator,
    StaticPermissions,
};
pub use handler::{SkillHandler, SkillSettings};
pub use outputs::{ErrorOutput, MissingPermissionsOutput};
pub use plan::resolve_plan;
pub use ranker::{RankerThresholds, SkillRanker};
