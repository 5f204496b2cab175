//! Built-in skills for Parley.
//!
//! Skills answer utterances: tell the time or the date, place phone calls
//! to contacts, and confirm yes/no questions. The text fallback answers
//! whatever nothing else recognized.

pub mod current_date;
pub mod current_time;
pub mod fallback;
pub mod telephone;
pub mod yes_no;

use chrono::NaiveDateTime;
use parley_core::{SkillCatalog, SkillContext, SkillInfo};
use parley_recognizer::RecognizerError;
use std::sync::Arc;

pub use current_date::{CurrentDateInfo, CurrentDateOutput, DateCommand};
pub use current_time::{CurrentTimeInfo, CurrentTimeOutput};
pub use fallback::{TextFallbackInfo, TextFallbackOutput};
pub use telephone::{
    ConfirmCallOutput, ConfirmedCallOutput, Contact, ContactBook, ContactListOutput, Dialer,
    NoopDialer, StaticContactBook, TelephoneInfo,
};
pub use yes_no::{YesNoHandler, YesNoSkill};

/// Source of the current local time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Local::now().naive_local())
}

/// Languages the built-in example sentences are written in.
const SUPPORTED_LANGUAGES: &[&str] = &["en"];

fn supports_language(ctx: &SkillContext) -> bool {
    SUPPORTED_LANGUAGES.contains(&ctx.language())
}

/// Create the default catalog with all built-in skills.
///
/// Fails only if a built-in capture expression does not compile.
pub fn default_catalog(
    contacts: Arc<dyn ContactBook>,
    dialer: Arc<dyn Dialer>,
) -> Result<SkillCatalog, RecognizerError> {
    let skills: Vec<Arc<dyn SkillInfo>> = vec![
        Arc::new(CurrentTimeInfo::new(system_clock())),
        Arc::new(CurrentDateInfo::new(system_clock())),
        Arc::new(TelephoneInfo::new(contacts, dialer)?),
    ];
    Ok(SkillCatalog::new(skills, Arc::new(TextFallbackInfo)))
}
