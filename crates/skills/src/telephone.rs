//! Telephone: "call michael".
//!
//! Looks the spoken name up in a [`ContactBook`]. A single clear match is
//! confirmed with a yes/no question; otherwise up to five candidates are
//! listed and the user picks one by name or by position ("the second one").
//! Calls are placed through a [`Dialer`].

use crate::yes_no::{YesNoHandler, YesNoSkill};
use async_trait::async_trait;
use parley_core::{
    AnySkill, InteractionPlan, Permission, Score, Skill, SkillContext, SkillError, SkillInfo,
    SkillOutput, Specificity,
};
use parley_recognizer::{
    FuzzyRecognizer, Pattern, RecognizerError, levenshtein, normalize, similarity,
};
use std::fmt;
use std::sync::Arc;

const MAX_LISTED_CONTACTS: usize = 5;
const NAME_CHOOSER_MIN_SIMILARITY: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub numbers: Vec<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, numbers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            numbers,
        }
    }
}

/// Read access to the user's contacts.
pub trait ContactBook: Send + Sync {
    fn contacts(&self) -> Vec<Contact>;
}

/// A contact book backed by a fixed list.
#[derive(Debug, Default, Clone)]
pub struct StaticContactBook {
    contacts: Vec<Contact>,
}

impl StaticContactBook {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }
}

impl ContactBook for StaticContactBook {
    fn contacts(&self) -> Vec<Contact> {
        self.contacts.clone()
    }
}

/// Places phone calls.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, number: &str) -> Result<(), SkillError>;
}

/// A dialer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDialer;

#[async_trait]
impl Dialer for NoopDialer {
    async fn dial(&self, number: &str) -> Result<(), SkillError> {
        tracing::info!(number, "Dial requested, no dialer configured");
        Ok(())
    }
}

pub struct TelephoneInfo {
    contacts: Arc<dyn ContactBook>,
    dialer: Arc<dyn Dialer>,
    recognizer: Arc<FuzzyRecognizer<Option<String>>>,
}

impl TelephoneInfo {
    pub fn new(
        contacts: Arc<dyn ContactBook>,
        dialer: Arc<dyn Dialer>,
    ) -> Result<Self, RecognizerError> {
        let recognizer = FuzzyRecognizer::new(vec![Pattern::with_capture(
            &["call mom", "phone mom", "dial mom", "ring mom"],
            r"^(?:call|phone|dial|ring)\s+(?P<who>.+)$",
            |m| m.and_then(|m| m.group("who")).map(|who| who.trim().to_string()),
        )?]);
        Ok(Self {
            contacts,
            dialer,
            recognizer: Arc::new(recognizer),
        })
    }
}

impl fmt::Debug for TelephoneInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephoneInfo").finish_non_exhaustive()
    }
}

impl SkillInfo for TelephoneInfo {
    fn id(&self) -> &str {
        "telephone"
    }

    fn name(&self) -> &str {
        "Telephone"
    }

    fn sentence_example(&self) -> &str {
        "Call Michael"
    }

    fn needed_permissions(&self) -> &[Permission] {
        &[Permission::ReadContacts, Permission::CallPhone]
    }

    fn is_available(&self, ctx: &SkillContext) -> bool {
        crate::supports_language(ctx)
    }

    fn build(self: Arc<Self>, _ctx: &SkillContext) -> Arc<dyn AnySkill> {
        Arc::new(TelephoneSkill { info: self })
    }
}

struct TelephoneSkill {
    info: Arc<TelephoneInfo>,
}

/// A contact matched against a spoken name. Lower distance is better.
struct Candidate {
    contact: Contact,
    distance: usize,
}

/// Edit distance between the spoken name and the closest of the contact's
/// full name and its single words.
fn contact_distance(spoken: &str, name: &str) -> usize {
    let name = normalize(name);
    std::iter::once(name.as_str())
        .chain(name.split(' '))
        .map(|part| levenshtein(spoken, part))
        .min()
        .unwrap_or(usize::MAX)
}

fn find_candidates(book: &dyn ContactBook, spoken: &str) -> Vec<Candidate> {
    let spoken = normalize(spoken);
    let budget = spoken.chars().count() / 2;
    let mut candidates: Vec<Candidate> = book
        .contacts()
        .into_iter()
        .map(|contact| Candidate {
            distance: contact_distance(&spoken, &contact.name),
            contact,
        })
        .filter(|c| c.distance <= budget)
        .collect();
    candidates.sort_by_key(|c| c.distance);
    candidates
}

#[async_trait]
impl Skill for TelephoneSkill {
    type Data = Option<Option<String>>;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        Specificity::Low
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, Self::Data) {
        self.info.recognizer.score(input)
    }

    async fn generate_output(
        &self,
        _ctx: &SkillContext,
        who: Self::Data,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        let who = who.flatten().unwrap_or_default();
        let candidates = find_candidates(self.info.contacts.as_ref(), &who);
        let info: Arc<dyn SkillInfo> = self.info.clone();
        tracing::debug!(who = %who, candidates = candidates.len(), "Looked up contacts");

        let mut listed: Vec<Contact> = Vec::new();
        for (i, candidate) in candidates.iter().enumerate() {
            if listed.len() >= MAX_LISTED_CONTACTS {
                break;
            }
            if candidate.contact.numbers.is_empty() {
                continue;
            }
            // A close match with a single number, clearly ahead of the next one.
            let clear_winner = listed.is_empty()
                && candidate.distance < 3
                && candidate.contact.numbers.len() == 1
                && candidates
                    .get(i + 1)
                    .is_none_or(|next| next.distance > candidate.distance + 2);
            if clear_winner {
                return Ok(Arc::new(ConfirmCallOutput::new(
                    info,
                    self.info.dialer.clone(),
                    &candidate.contact.name,
                    &candidate.contact.numbers[0],
                )));
            }
            listed.push(candidate.contact.clone());
        }

        if let [only] = listed.as_slice() {
            if only.numbers.len() == 1 {
                return Ok(Arc::new(ConfirmCallOutput::new(
                    info,
                    self.info.dialer.clone(),
                    &only.name,
                    &only.numbers[0],
                )));
            }
        }

        Ok(Arc::new(ContactListOutput {
            info,
            dialer: self.info.dialer.clone(),
            contacts: listed,
        }))
    }
}

/// "Should I call X?", followed by a yes/no sub-dialogue.
pub struct ConfirmCallOutput {
    info: Arc<dyn SkillInfo>,
    dialer: Arc<dyn Dialer>,
    pub name: String,
    pub number: String,
}

impl ConfirmCallOutput {
    fn new(info: Arc<dyn SkillInfo>, dialer: Arc<dyn Dialer>, name: &str, number: &str) -> Self {
        Self {
            info,
            dialer,
            name: name.to_string(),
            number: number.to_string(),
        }
    }
}

impl fmt::Debug for ConfirmCallOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmCallOutput")
            .field("name", &self.name)
            .field("number", &self.number)
            .finish_non_exhaustive()
    }
}

impl SkillOutput for ConfirmCallOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        format!("Should I call {}?", self.name)
    }

    fn graphical_output(&self, ctx: &SkillContext) -> String {
        format!("{}\n{}", self.speech_output(ctx), self.number)
    }

    fn interaction_plan(&self, _ctx: &SkillContext) -> InteractionPlan {
        let confirm: Arc<dyn AnySkill> = Arc::new(YesNoSkill::new(
            self.info.clone(),
            CallConfirmation {
                dialer: self.dialer.clone(),
                number: self.number.clone(),
            },
        ));
        InteractionPlan::ReplaceSubInteraction {
            next_skills: vec![confirm],
            reopen_microphone: true,
        }
    }
}

struct CallConfirmation {
    dialer: Arc<dyn Dialer>,
    number: String,
}

#[async_trait]
impl YesNoHandler for CallConfirmation {
    async fn on_answer(
        &self,
        _ctx: &SkillContext,
        yes: bool,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        if !yes {
            return Ok(Arc::new(ConfirmedCallOutput { number: None }));
        }
        self.dialer.dial(&self.number).await?;
        Ok(Arc::new(ConfirmedCallOutput {
            number: Some(self.number.clone()),
        }))
    }
}

/// The end of a call dialogue: either calling `number` or not calling at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedCallOutput {
    pub number: Option<String>,
}

impl SkillOutput for ConfirmedCallOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        match self.number {
            // A call has just started, stay silent.
            Some(_) => String::new(),
            None => "Okay, I won't call.".into(),
        }
    }

    fn graphical_output(&self, ctx: &SkillContext) -> String {
        match &self.number {
            Some(number) => format!("Calling {number}"),
            None => self.speech_output(ctx),
        }
    }
}

/// Several (or no) matching contacts.
pub struct ContactListOutput {
    info: Arc<dyn SkillInfo>,
    dialer: Arc<dyn Dialer>,
    pub contacts: Vec<Contact>,
}

impl fmt::Debug for ContactListOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactListOutput")
            .field("contacts", &self.contacts)
            .finish_non_exhaustive()
    }
}

impl SkillOutput for ContactListOutput {
    fn speech_output(&self, _ctx: &SkillContext) -> String {
        match self.contacts.len() {
            0 => "I could not find that contact.".into(),
            n => format!("I found {n} contacts. Which one should I call?"),
        }
    }

    fn graphical_output(&self, _ctx: &SkillContext) -> String {
        let mut lines = Vec::new();
        let mut index = 1;
        for contact in &self.contacts {
            lines.push(contact.name.clone());
            for number in &contact.numbers {
                lines.push(format!("  {index}. {number}"));
                index += 1;
            }
        }
        if lines.is_empty() {
            lines.push("I could not find that contact.".into());
        }
        lines.join("\n")
    }

    fn interaction_plan(&self, _ctx: &SkillContext) -> InteractionPlan {
        // Saying a name cannot pick between numbers, so names use the first one.
        let by_name: Vec<(String, String)> = self
            .contacts
            .iter()
            .filter_map(|c| Some((c.name.clone(), c.numbers.first()?.clone())))
            .collect();
        if by_name.is_empty() {
            return InteractionPlan::FinishInteraction;
        }
        let by_index = self
            .contacts
            .iter()
            .flat_map(|c| c.numbers.iter().map(|n| (c.name.clone(), n.clone())))
            .collect();
        let next_skills: Vec<Arc<dyn AnySkill>> = vec![
            Arc::new(ContactChooserName {
                info: self.info.clone(),
                dialer: self.dialer.clone(),
                contacts: by_name,
            }),
            Arc::new(ContactChooserIndex {
                info: self.info.clone(),
                dialer: self.dialer.clone(),
                contacts: by_index,
            }),
        ];
        InteractionPlan::StartSubInteraction {
            next_skills,
            reopen_microphone: true,
        }
    }
}

/// Picks a listed contact by name.
struct ContactChooserName {
    info: Arc<dyn SkillInfo>,
    dialer: Arc<dyn Dialer>,
    contacts: Vec<(String, String)>,
}

#[async_trait]
impl Skill for ContactChooserName {
    type Data = Option<(String, String)>;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    // Low, so that the index chooser wins when both apply.
    fn specificity(&self) -> Specificity {
        Specificity::Low
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, Self::Data) {
        let spoken = normalize(input);
        let best = self
            .contacts
            .iter()
            .map(|contact| {
                let name = normalize(&contact.0);
                let closest = std::iter::once(name.as_str())
                    .chain(name.split(' '))
                    .map(|part| similarity(&spoken, part))
                    .fold(0.0, f64::max);
                (contact, closest)
            })
            .filter(|(_, s)| *s >= NAME_CHOOSER_MIN_SIMILARITY)
            .fold(None::<(&(String, String), f64)>, |best, (contact, s)| match best {
                Some((_, top)) if top >= s => best,
                _ => Some((contact, s)),
            });

        match best {
            Some((contact, _)) => (Score::AlwaysBest, Some(contact.clone())),
            None => (Score::AlwaysWorst, None),
        }
    }

    async fn generate_output(
        &self,
        _ctx: &SkillContext,
        chosen: Self::Data,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        Ok(match chosen {
            Some((name, number)) => Arc::new(ConfirmCallOutput::new(
                self.info.clone(),
                self.dialer.clone(),
                &name,
                &number,
            )),
            None => Arc::new(ConfirmedCallOutput { number: None }),
        })
    }
}

/// Picks a listed number by position: "two", "the second one", "3".
struct ContactChooserIndex {
    info: Arc<dyn SkillInfo>,
    dialer: Arc<dyn Dialer>,
    contacts: Vec<(String, String)>,
}

const NUMBER_WORDS: [(&str, &str); 10] = [
    ("one", "first"),
    ("two", "second"),
    ("three", "third"),
    ("four", "fourth"),
    ("five", "fifth"),
    ("six", "sixth"),
    ("seven", "seventh"),
    ("eight", "eighth"),
    ("nine", "ninth"),
    ("ten", "tenth"),
];

/// The first number mentioned in `input`, as digits, a cardinal or an ordinal word.
fn extract_index(input: &str) -> Option<usize> {
    normalize(input).split(' ').find_map(|word| {
        let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return digits.parse().ok();
        }
        NUMBER_WORDS
            .iter()
            .position(|(cardinal, ordinal)| word == *cardinal || word == *ordinal)
            .map(|i| i + 1)
    })
}

#[async_trait]
impl Skill for ContactChooserIndex {
    type Data = usize;

    fn info(&self) -> Arc<dyn SkillInfo> {
        self.info.clone()
    }

    fn specificity(&self) -> Specificity {
        Specificity::High
    }

    fn score(&self, _ctx: &SkillContext, input: &str) -> (Score, usize) {
        let index = extract_index(input).unwrap_or(0);
        if (1..=self.contacts.len()).contains(&index) {
            (Score::AlwaysBest, index)
        } else {
            (Score::AlwaysWorst, index)
        }
    }

    async fn generate_output(
        &self,
        _ctx: &SkillContext,
        index: usize,
    ) -> Result<Arc<dyn SkillOutput>, SkillError> {
        Ok(match index.checked_sub(1).and_then(|i| self.contacts.get(i)) {
            Some((name, number)) => Arc::new(ConfirmCallOutput::new(
                self.info.clone(),
                self.dialer.clone(),
                name,
                number,
            )),
            None => Arc::new(ConfirmedCallOutput { number: None }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::SkillWithResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDialer {
        dialed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Dialer for RecordingDialer {
        async fn dial(&self, number: &str) -> Result<(), SkillError> {
            self.dialed.lock().unwrap().push(number.to_string());
            Ok(())
        }
    }

    fn book() -> Arc<StaticContactBook> {
        Arc::new(StaticContactBook::new(vec![
            Contact::new("Michael Jordan", vec!["+1 555 0100".into()]),
            Contact::new("Anna Smith", vec!["+1 555 0200".into(), "+1 555 0201".into()]),
            Contact::new("Anne Smyth", vec!["+1 555 0300".into()]),
            Contact::new("No Number", vec![]),
        ]))
    }

    async fn run(skill: Arc<dyn AnySkill>, input: &str) -> (Score, Arc<dyn SkillOutput>) {
        let ctx = SkillContext::silent("en");
        let result = SkillWithResult::evaluate(skill, &ctx, input);
        let score = result.score;
        (score, result.generate_output(&ctx).await.unwrap())
    }

    fn telephone(dialer: Arc<RecordingDialer>) -> Arc<dyn AnySkill> {
        let ctx = SkillContext::silent("en");
        Arc::new(TelephoneInfo::new(book(), dialer).unwrap()).build(&ctx)
    }

    #[tokio::test]
    async fn clear_match_asks_for_confirmation_then_calls() {
        let ctx = SkillContext::silent("en");
        let dialer = Arc::new(RecordingDialer::default());
        let (score, output) = run(telephone(dialer.clone()), "Call Michael").await;
        assert_eq!(score, Score::Numeric(1.0));

        let confirm = output.downcast_ref::<ConfirmCallOutput>().unwrap();
        assert_eq!(confirm.name, "Michael Jordan");
        assert_eq!(output.speech_output(&ctx), "Should I call Michael Jordan?");

        let InteractionPlan::ReplaceSubInteraction {
            next_skills,
            reopen_microphone,
        } = output.interaction_plan(&ctx)
        else {
            panic!("expected a replace plan");
        };
        assert!(reopen_microphone);
        assert_eq!(next_skills.len(), 1);

        let (_, confirmed) = run(next_skills[0].clone(), "go for it").await;
        let confirmed = confirmed.downcast_ref::<ConfirmedCallOutput>().unwrap();
        assert_eq!(confirmed.number.as_deref(), Some("+1 555 0100"));
        assert_eq!(*dialer.dialed.lock().unwrap(), vec!["+1 555 0100".to_string()]);
        assert!(confirmed.speech_output(&ctx).is_empty());
    }

    #[tokio::test]
    async fn declining_does_not_dial() {
        let ctx = SkillContext::silent("en");
        let dialer = Arc::new(RecordingDialer::default());
        let (_, output) = run(telephone(dialer.clone()), "call michael").await;
        let InteractionPlan::ReplaceSubInteraction { next_skills, .. } =
            output.interaction_plan(&ctx)
        else {
            panic!("expected a replace plan");
        };
        let (_, declined) = run(next_skills[0].clone(), "no").await;
        assert_eq!(
            declined.downcast_ref::<ConfirmedCallOutput>(),
            Some(&ConfirmedCallOutput { number: None })
        );
        assert!(dialer.dialed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ambiguous_name_lists_candidates() {
        let ctx = SkillContext::silent("en");
        let dialer = Arc::new(RecordingDialer::default());
        let (_, output) = run(telephone(dialer), "ring anna").await;
        let list = output.downcast_ref::<ContactListOutput>().unwrap();
        let names: Vec<&str> = list.contacts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Anna Smith", "Anne Smyth"]);
        assert_eq!(
            output.speech_output(&ctx),
            "I found 2 contacts. Which one should I call?"
        );

        let InteractionPlan::StartSubInteraction { next_skills, .. } =
            output.interaction_plan(&ctx)
        else {
            panic!("expected a start plan");
        };
        assert_eq!(next_skills.len(), 2);
        assert_eq!(next_skills[0].tier(), Specificity::Low);
        assert_eq!(next_skills[1].tier(), Specificity::High);

        // Positions count numbers, not contacts.
        let (score, picked) = run(next_skills[1].clone(), "the second one").await;
        assert_eq!(score, Score::AlwaysBest);
        assert_eq!(picked.downcast_ref::<ConfirmCallOutput>().unwrap().number, "+1 555 0201");

        let (score, _) = run(next_skills[1].clone(), "number seven").await;
        assert_eq!(score, Score::AlwaysWorst);

        let (score, picked) = run(next_skills[0].clone(), "Anne").await;
        assert_eq!(score, Score::AlwaysBest);
        assert_eq!(picked.downcast_ref::<ConfirmCallOutput>().unwrap().name, "Anne Smyth");
    }

    #[tokio::test]
    async fn unknown_contact_finishes() {
        let ctx = SkillContext::silent("en");
        let dialer = Arc::new(RecordingDialer::default());
        let (_, output) = run(telephone(dialer), "call zebediah").await;
        let list = output.downcast_ref::<ContactListOutput>().unwrap();
        assert!(list.contacts.is_empty());
        assert!(matches!(
            output.interaction_plan(&ctx),
            InteractionPlan::FinishInteraction
        ));
    }

    #[test]
    fn listed_contacts_without_numbers_are_not_offered() {
        let ctx = SkillContext::silent("en");
        let info: Arc<dyn SkillInfo> =
            Arc::new(TelephoneInfo::new(book(), Arc::new(NoopDialer)).unwrap());
        let list = |contacts| ContactListOutput {
            info: info.clone(),
            dialer: Arc::new(NoopDialer),
            contacts,
        };

        let only_empty = list(vec![Contact::new("No Number", vec![])]);
        assert!(matches!(
            only_empty.interaction_plan(&ctx),
            InteractionPlan::FinishInteraction
        ));

        let mixed = list(vec![
            Contact::new("No Number", vec![]),
            Contact::new("Anne Smyth", vec!["+1 555 0300".into()]),
        ]);
        let InteractionPlan::StartSubInteraction { next_skills, .. } = mixed.interaction_plan(&ctx)
        else {
            panic!("expected a start plan");
        };
        assert_eq!(next_skills.len(), 2);
    }

    #[test]
    fn extracts_indexes() {
        assert_eq!(extract_index("the third one"), Some(3));
        assert_eq!(extract_index("number 2 please"), Some(2));
        assert_eq!(extract_index("1st"), Some(1));
        assert_eq!(extract_index("none of them"), None);
    }

    #[test]
    fn contacts_without_number_are_skipped() {
        let candidates = find_candidates(book().as_ref(), "no number");
        assert_eq!(candidates[0].contact.name, "No Number");
        assert!(candidates[0].contact.numbers.is_empty());
    }

    #[test]
    fn needs_contact_and_call_permissions() {
        let info = TelephoneInfo::new(book(), Arc::new(NoopDialer)).unwrap();
        assert_eq!(
            info.needed_permissions(),
            &[Permission::ReadContacts, Permission::CallPhone]
        );
    }
}
