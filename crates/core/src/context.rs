//! The context handed to every skill call, and the speech output boundary.

use crate::output::SkillOutput;
use std::fmt;
use std::sync::Arc;

/// Text-to-speech collaborator.
///
/// Implementations must eventually run every callback passed to
/// [`run_when_finished_speaking`](SpeechOutputDevice::run_when_finished_speaking),
/// immediately if nothing is being spoken.
pub trait SpeechOutputDevice: Send + Sync {
    /// Queue `text` for playback.
    fn speak(&self, text: &str);

    /// Interrupt any ongoing playback.
    fn stop_speaking(&self) {}

    /// Run `callback` once the current playback has finished.
    fn run_when_finished_speaking(&self, callback: Box<dyn FnOnce() + Send>);
}

/// A speech device that says nothing. Callbacks run right away.
#[derive(Debug, Default, Clone, Copy)]
pub struct NothingSpeechDevice;

impl SpeechOutputDevice for NothingSpeechDevice {
    fn speak(&self, _text: &str) {}

    fn run_when_finished_speaking(&self, callback: Box<dyn FnOnce() + Send>) {
        callback();
    }
}

/// Services and state available to skills while scoring and generating output.
#[derive(Clone)]
pub struct SkillContext {
    /// BCP-47 style language tag, e.g. `"en"`.
    pub locale: String,

    /// Where skills (and the evaluator) send speech.
    pub speech_output_device: Arc<dyn SpeechOutputDevice>,

    /// The last output of the interaction the current utterance continues, if any.
    pub previous_output: Option<Arc<dyn SkillOutput>>,
}

impl SkillContext {
    pub fn new(
        locale: impl Into<String>,
        speech_output_device: Arc<dyn SpeechOutputDevice>,
    ) -> Self {
        Self {
            locale: locale.into(),
            speech_output_device,
            previous_output: None,
        }
    }

    /// A silent context in the given locale, handy for tests and batch runs.
    pub fn silent(locale: impl Into<String>) -> Self {
        Self::new(locale, Arc::new(NothingSpeechDevice))
    }

    /// The language part of the locale (`"en"` for `"en-US"`).
    pub fn language(&self) -> &str {
        self.locale
            .split(['-', '_'])
            .next()
            .unwrap_or(self.locale.as_str())
    }
}

impl fmt::Debug for SkillContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillContext")
            .field("locale", &self.locale)
            .field("previous_output", &self.previous_output)
            .finish_non_exhaustive()
    }
}
