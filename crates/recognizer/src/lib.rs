//! # Parley Recognizer
//!
//! Scores raw utterances against a skill's declared patterns using
//! normalized edit distance, optionally extracting data through a capture
//! expression.
//!
//! ```
//! use parley_recognizer::{FuzzyRecognizer, Pattern};
//!
//! let recognizer = FuzzyRecognizer::new(vec![
//!     Pattern::new(&["what time is it", "tell me the time"], |_| "time"),
//!     Pattern::new(&["what day is it"], |_| "date"),
//! ]);
//! let (score, data) = recognizer.score("What time is it?");
//! assert_eq!(score.as_f64(), 1.0);
//! assert_eq!(data, Some("time"));
//! ```

pub mod fuzzy;
pub mod levenshtein;
pub mod normalize;

pub use fuzzy::{FuzzyRecognizer, Pattern, PatternMatch, RecognizerError};
pub use levenshtein::{levenshtein, similarity};
pub use normalize::{NormalizedText, normalize};
