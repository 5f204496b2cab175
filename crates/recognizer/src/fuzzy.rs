//! The fuzzy recognizer: picks the pattern closest to an utterance.

use crate::levenshtein::char_similarity;
use crate::normalize::NormalizedText;
use parley_core::Score;
use regex_lite::Regex;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RecognizerError {
    #[error("Invalid capture expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },
}

type Builder<T> = Box<dyn Fn(Option<&PatternMatch>) -> T + Send + Sync>;

/// A set of example phrases, an optional capture expression, and a builder
/// turning the capture (if any) into the skill's data.
///
/// Examples are normalized once here. Capture expressions run against the
/// normalized utterance, so they should be written in lower case without
/// punctuation.
pub struct Pattern<T> {
    examples: Vec<Vec<char>>,
    regex: Option<Regex>,
    builder: Builder<T>,
}

impl<T> Pattern<T> {
    pub fn new<F>(examples: &[&str], builder: F) -> Self
    where
        F: Fn(Option<&PatternMatch>) -> T + Send + Sync + 'static,
    {
        Self {
            examples: normalize_examples(examples),
            regex: None,
            builder: Box::new(builder),
        }
    }

    /// A pattern that only applies when `expression` matches the normalized utterance.
    pub fn with_capture<F>(
        examples: &[&str],
        expression: &str,
        builder: F,
    ) -> Result<Self, RecognizerError>
    where
        F: Fn(Option<&PatternMatch>) -> T + Send + Sync + 'static,
    {
        let regex = Regex::new(expression).map_err(|e| RecognizerError::InvalidExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            examples: normalize_examples(examples),
            regex: Some(regex),
            builder: Box::new(builder),
        })
    }

    /// `None` when the pattern is not eligible for this input.
    fn evaluate(
        &self,
        input: &[char],
        text: &NormalizedText,
        raw: &str,
    ) -> Option<(f64, Option<PatternMatch>)> {
        let capture = match &self.regex {
            Some(regex) => Some(PatternMatch::capture(regex, text, raw)?),
            None => None,
        };
        let floor: Option<f64> = capture.as_ref().map(|_| 1.0);
        let best_example = self
            .examples
            .iter()
            .map(|example| char_similarity(input, example))
            .reduce(f64::max);

        let score = match (floor, best_example) {
            (Some(f), Some(e)) => f.max(e),
            (Some(f), None) => f,
            (None, Some(e)) => e,
            (None, None) => return None,
        };
        Some((score, capture))
    }
}

impl<T> fmt::Debug for Pattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let examples: Vec<String> = self.examples.iter().map(|e| e.iter().collect()).collect();
        f.debug_struct("Pattern")
            .field("examples", &examples)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .finish_non_exhaustive()
    }
}

fn normalize_examples(examples: &[&str]) -> Vec<Vec<char>> {
    examples
        .iter()
        .map(|e| NormalizedText::new(e).as_str().chars().collect())
        .collect()
}

/// A successful capture-expression match.
///
/// Group lookups return the text as the user wrote it (original casing and
/// diacritics); the `normalized_*` variants return what the expression saw.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    raw: String,
    normalized: NormalizedText,
    names: Vec<Option<String>>,
    groups: Vec<Option<Range<usize>>>,
}

impl PatternMatch {
    fn capture(regex: &Regex, text: &NormalizedText, raw: &str) -> Option<Self> {
        let captures = regex.captures(text.as_str())?;
        let groups = (0..captures.len())
            .map(|i| captures.get(i).map(|m| m.start()..m.end()))
            .collect();
        let names = regex
            .capture_names()
            .map(|name| name.map(str::to_string))
            .collect();
        Some(Self {
            raw: raw.to_string(),
            normalized: text.clone(),
            names,
            groups,
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_deref() == Some(name))
    }

    /// Group `index` in the raw input. Group 0 is the whole match.
    pub fn get(&self, index: usize) -> Option<&str> {
        let range = self.groups.get(index)?.clone()?;
        let raw = self.normalized.raw_range(range)?;
        self.raw.get(raw)
    }

    /// Named group in the raw input.
    pub fn group(&self, name: &str) -> Option<&str> {
        self.get(self.index_of(name)?)
    }

    pub fn normalized_get(&self, index: usize) -> Option<&str> {
        let range = self.groups.get(index)?.clone()?;
        self.normalized.as_str().get(range)
    }

    pub fn normalized_group(&self, name: &str) -> Option<&str> {
        self.normalized_get(self.index_of(name)?)
    }
}

/// Scores utterances against an ordered list of patterns.
#[derive(Debug)]
pub struct FuzzyRecognizer<T> {
    patterns: Vec<Pattern<T>>,
}

impl<T> FuzzyRecognizer<T> {
    pub fn new(patterns: Vec<Pattern<T>>) -> Self {
        Self { patterns }
    }

    /// Score `input` and build the data of the best pattern.
    ///
    /// Ties keep the earliest pattern. Without any eligible pattern the result
    /// is `(AlwaysWorst, None)`.
    pub fn score(&self, input: &str) -> (Score, Option<T>) {
        let text = NormalizedText::new(input);
        let chars: Vec<char> = text.as_str().chars().collect();

        let mut best: Option<(f64, &Pattern<T>, Option<PatternMatch>)> = None;
        for pattern in &self.patterns {
            let Some((score, capture)) = pattern.evaluate(&chars, &text, input) else {
                continue;
            };
            if best.as_ref().is_none_or(|(top, _, _)| score > *top) {
                best = Some((score, pattern, capture));
            }
        }

        match best {
            Some((score, pattern, capture)) => {
                tracing::trace!(input = %text.as_str(), score, "Fuzzy pattern matched");
                (Score::numeric(score), Some((pattern.builder)(capture.as_ref())))
            }
            None => (Score::AlwaysWorst, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Command {
        Time,
        Date,
        Call(String),
    }

    fn recognizer() -> FuzzyRecognizer<Command> {
        FuzzyRecognizer::new(vec![
            Pattern::new(&["what time is it", "tell me the time"], |_| Command::Time),
            Pattern::new(&["what day is it", "what is the date"], |_| Command::Date),
            Pattern::with_capture(&["call mom"], r"^call (?P<who>.+)$", |m| {
                Command::Call(
                    m.and_then(|m| m.group("who"))
                        .unwrap_or_default()
                        .to_string(),
                )
            })
            .unwrap(),
        ])
    }

    #[test]
    fn exact_example_scores_one() {
        let (score, data) = recognizer().score("tell me the time");
        assert_eq!(score, Score::Numeric(1.0));
        assert_eq!(data, Some(Command::Time));
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let (score, data) = recognizer().score("What DAY is it?!");
        assert_eq!(score, Score::Numeric(1.0));
        assert_eq!(data, Some(Command::Date));
    }

    #[test]
    fn near_miss_scores_below_one() {
        let (score, data) = recognizer().score("what tme is it");
        assert!(score < Score::Numeric(1.0));
        assert!(score > Score::Numeric(0.9));
        assert_eq!(data, Some(Command::Time));
    }

    #[test]
    fn capture_keeps_raw_casing_and_diacritics() {
        let (score, data) = recognizer().score("Call Zoë Müller!");
        assert_eq!(score, Score::Numeric(1.0));
        assert_eq!(data, Some(Command::Call("Zoë Müller".into())));
    }

    #[test]
    fn capture_match_scores_one_even_far_from_examples() {
        let recognizer = FuzzyRecognizer::new(vec![Pattern::with_capture(
            &["set a timer"],
            r"^dial (?P<number>\d+)$",
            |m| m.and_then(|m| m.group("number")).map(str::to_string),
        )
        .unwrap()]);
        let (score, data) = recognizer.score("dial 5550100");
        assert_eq!(score, Score::Numeric(1.0));
        assert_eq!(data, Some(Some("5550100".to_string())));
    }

    #[test]
    fn non_matching_capture_skips_pattern() {
        let recognizer = FuzzyRecognizer::new(vec![
            Pattern::with_capture(&["call mom"], r"^call (?P<who>.+)$", |_| 1).unwrap(),
        ]);
        // Identical to the example minus the verb, but the expression does not match.
        let (score, data) = recognizer.score("mom");
        assert_eq!(score, Score::AlwaysWorst);
        assert_eq!(data, None);
    }

    #[test]
    fn empty_pattern_list_is_always_worst() {
        let recognizer: FuzzyRecognizer<()> = FuzzyRecognizer::new(vec![]);
        assert_eq!(recognizer.score("anything"), (Score::AlwaysWorst, None));
    }

    #[test]
    fn ties_keep_the_first_pattern() {
        let recognizer = FuzzyRecognizer::new(vec![
            Pattern::new(&["hello there"], |_| "first"),
            Pattern::new(&["hello there"], |_| "second"),
        ]);
        assert_eq!(recognizer.score("hello there").1, Some("first"));
    }

    #[test]
    fn invalid_expression_is_an_error() {
        let err = Pattern::<()>::with_capture(&[], r"(unclosed", |_| ()).unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn normalized_group_is_available() {
        let pattern = Pattern::with_capture(&[], r"^call (?P<who>.+)$", |m| {
            m.and_then(|m| m.normalized_group("who")).map(str::to_string)
        })
        .unwrap();
        let recognizer = FuzzyRecognizer::new(vec![pattern]);
        let (score, data) = recognizer.score("CALL Ångström");
        assert_eq!(score, Score::Numeric(1.0));
        assert_eq!(data, Some(Some("angstrom".to_string())));
    }
}
