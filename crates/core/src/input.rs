//! Events coming from the speech recognition collaborator.

use crate::error::Error;

#[derive(Debug, Clone)]
pub enum InputEvent {
    /// The user finished speaking. Alternatives are ordered most likely first,
    /// each paired with the recognizer's confidence.
    Final { utterances: Vec<(String, f32)> },

    /// Text recognized so far while the user is still speaking.
    Partial(String),

    /// Nothing was heard.
    None,

    /// Recognition failed.
    Error(Error),
}

impl InputEvent {
    /// A `Final` event with a single, fully confident utterance.
    pub fn final_text(text: impl Into<String>) -> Self {
        InputEvent::Final {
            utterances: vec![(text.into(), 1.0)],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::Final { .. } => "final",
            InputEvent::Partial(_) => "partial",
            InputEvent::None => "none",
            InputEvent::Error(_) => "error",
        }
    }
}
