//! The lookup form: one term field, one submit control, one copy control.
//!
//! [`LookupForm`] is a plain state machine. It performs no I/O of its own;
//! reads go through a [`DictionarySource`] and copies through a [`Clipboard`],
//! and the caller decides when (and on which task) those run.

use crate::clipboard::{Clipboard, ClipboardError};
use crate::share::{ShareLatch, ShareLink};
use crate::source::{DictionarySource, FetchError};
use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// How long the "Copied" confirmation stays up after a successful copy.
pub const COPY_FEEDBACK_DELAY: Duration = Duration::from_millis(2000);

pub const ISSUE_TRACKER_URL: &str = "https://github.com/Njong392/Abbreve";
pub const FEEDBACK_FORM_URL: &str = "https://t.co/mp86BLYBhq";

pub const NOT_FOUND_MESSAGE: &str = "This entry does not exist in our records as of yet :(";
pub const BLANK_INPUT_MESSAGE: &str = "Search bar is Empty! Please input a slang.";
pub const TRANSPORT_ERROR_MESSAGE: &str = "Oops. Some connection error occurred.";
pub const COPIED_LABEL: &str = "Copied";

/// A dictionary entry. Missing fields render nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LookupState {
    #[default]
    Idle,
    Loading,
    Loaded(Entry),
    NotFound,
    BlankInput,
    TransportError,
}

impl LookupState {
    pub fn label(&self) -> &'static str {
        match self {
            LookupState::Idle => "idle",
            LookupState::Loading => "loading",
            LookupState::Loaded(_) => "loaded",
            LookupState::NotFound => "not_found",
            LookupState::BlankInput => "blank_input",
            LookupState::TransportError => "transport_error",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LookupState::Loading)
    }

    pub fn entry(&self) -> Option<&Entry> {
        match self {
            LookupState::Loaded(entry) => Some(entry),
            _ => None,
        }
    }
}

/// What a submit attempt asks the caller to do next.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The submit control is disabled; nothing changed.
    Rejected,
    /// The term was blank; the form now shows the empty-input prompt.
    Blank,
    /// The form is loading; read this term and hand the outcome to [`LookupForm::complete`].
    Fetch(Term),
}

/// Identifies one successful copy. Only the newest ticket can hide the feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackTicket(u64);

#[derive(Debug, Clone, Default)]
pub struct CopyFeedback {
    shown: bool,
    generation: u64,
}

impl CopyFeedback {
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    fn show(&mut self) -> FeedbackTicket {
        self.generation += 1;
        self.shown = true;
        FeedbackTicket(self.generation)
    }

    fn expire(&mut self, ticket: FeedbackTicket) -> bool {
        if !self.shown || ticket.0 != self.generation {
            return false;
        }
        self.shown = false;
        true
    }
}

#[derive(Debug, Default)]
pub struct LookupForm {
    term: Term,
    state: LookupState,
    in_flight: Option<Term>,
    last_completed: Option<Term>,
    share: ShareLatch,
    feedback: CopyFeedback,
}

impl LookupForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// Term of the last read that ran to completion.
    pub fn last_submitted(&self) -> Option<&Term> {
        self.last_completed.as_ref()
    }

    pub fn feedback(&self) -> &CopyFeedback {
        &self.feedback
    }

    /// Replaces the field contents and clears any shown result.
    ///
    /// An outstanding read is left alone; its outcome still lands because it
    /// belongs to the last submitted term.
    pub fn edit(&mut self, input: &str) {
        self.term = Term::normalize(input);
        if !self.state.is_loading() {
            self.state = LookupState::Idle;
        }
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.state.is_loading() && self.last_completed.as_ref() != Some(&self.term)
    }

    pub fn begin_submit(&mut self) -> Submission {
        if !self.can_submit() {
            debug!(term = %self.term, state = self.state.label(), "submit ignored");
            return Submission::Rejected;
        }
        if self.term.is_blank() {
            self.state = LookupState::BlankInput;
            return Submission::Blank;
        }
        debug!(term = %self.term, "submitting lookup");
        self.state = LookupState::Loading;
        self.in_flight = Some(self.term.clone());
        Submission::Fetch(self.term.clone())
    }

    /// Applies the outcome of the read started by [`LookupForm::begin_submit`].
    ///
    /// A failed read is not recorded as completed, so the same term can be
    /// submitted again straight away.
    pub fn complete(&mut self, outcome: Result<Option<Entry>, FetchError>) -> &LookupState {
        let Some(term) = self.in_flight.take() else {
            warn!("lookup outcome arrived with nothing in flight");
            return &self.state;
        };
        let (state, completed) = match outcome {
            Ok(Some(entry)) => (LookupState::Loaded(entry), Some(term)),
            Ok(None) => (LookupState::NotFound, Some(term)),
            Err(err) => {
                warn!(term = %term, error = %err, "dictionary lookup failed");
                (LookupState::TransportError, None)
            }
        };
        self.state = state;
        self.last_completed = completed;
        &self.state
    }

    pub async fn submit<S>(&mut self, source: &S) -> &LookupState
    where
        S: DictionarySource + ?Sized,
    {
        if let Submission::Fetch(term) = self.begin_submit() {
            let outcome = source.fetch(&term).await;
            self.complete(outcome);
        }
        &self.state
    }

    /// Deep-link arrival with the decoded `share` query value. Only the first
    /// call counts; returns `None` when there was nothing to submit.
    pub fn arrive(&mut self, share: Option<&str>) -> Option<Submission> {
        let term = self.share.take(share)?;
        debug!(term = %term, "prefilling from share link");
        self.edit(term.as_str());
        Some(self.begin_submit())
    }

    pub async fn open<S>(&mut self, share: Option<&str>, source: &S) -> Option<&LookupState>
    where
        S: DictionarySource + ?Sized,
    {
        if let Submission::Fetch(term) = self.arrive(share)? {
            let outcome = source.fetch(&term).await;
            self.complete(outcome);
        }
        Some(&self.state)
    }

    pub fn share_link(&self, origin: &str) -> ShareLink {
        ShareLink::new(origin, &self.term)
    }

    /// Writes the share link to `clipboard` and raises the copy feedback.
    ///
    /// The returned ticket must be passed to [`LookupForm::expire_feedback`]
    /// once [`COPY_FEEDBACK_DELAY`] has elapsed. A failed write leaves the
    /// form untouched.
    pub fn copy_share_link(
        &mut self,
        origin: &str,
        clipboard: &mut dyn Clipboard,
    ) -> Result<(ShareLink, FeedbackTicket), ClipboardError> {
        let link = self.share_link(origin);
        if let Err(err) = clipboard.write_text(link.as_str()) {
            warn!(error = %err, "could not copy share link");
            return Err(err);
        }
        debug!(link = %link, "share link copied");
        let ticket = self.feedback.show();
        Ok((link, ticket))
    }

    /// Hides the copy feedback if `ticket` belongs to the latest copy.
    pub fn expire_feedback(&mut self, ticket: FeedbackTicket) -> bool {
        self.feedback.expire(ticket)
    }

    pub fn view(&self, origin: &str) -> LookupView {
        let mut view = LookupView {
            term: self.term.to_string(),
            state: self.state.label(),
            definition: None,
            alternatives: None,
            share_link: None,
            message: None,
            links: Vec::new(),
            submit_enabled: self.can_submit(),
            copied: self.feedback.is_shown(),
        };
        match &self.state {
            LookupState::Loaded(entry) => {
                view.definition = entry.definition.clone();
                view.alternatives = entry.alternatives.clone();
                view.share_link = Some(self.share_link(origin).into_string());
            }
            LookupState::NotFound => {
                view.message = Some(NOT_FOUND_MESSAGE);
                view.links = vec![ISSUE_TRACKER_URL, FEEDBACK_FORM_URL];
            }
            LookupState::BlankInput => view.message = Some(BLANK_INPUT_MESSAGE),
            LookupState::TransportError => view.message = Some(TRANSPORT_ERROR_MESSAGE),
            LookupState::Idle | LookupState::Loading => {}
        }
        view
    }
}

/// Everything a renderer needs, flattened from the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupView {
    pub term: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<&'static str>,
    pub submit_enabled: bool,
    pub copied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ORIGIN: &str = "https://abbreve.example";

    #[derive(Default)]
    struct StubSource {
        entries: HashMap<String, Entry>,
        broken: Vec<String>,
        reads: AtomicUsize,
    }

    impl StubSource {
        fn with(mut self, term: &str, definition: Option<&str>, alternatives: Option<&str>) -> Self {
            self.entries.insert(
                term.to_string(),
                Entry {
                    definition: definition.map(str::to_string),
                    alternatives: alternatives.map(str::to_string),
                },
            );
            self
        }

        fn broken(mut self, term: &str) -> Self {
            self.broken.push(term.to_string());
            self
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DictionarySource for StubSource {
        async fn fetch(&self, term: &Term) -> Result<Option<Entry>, FetchError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.broken.iter().any(|t| t == term.as_str()) {
                return Err(FetchError::Status(500));
            }
            Ok(self.entries.get(term.as_str()).cloned())
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    fn dictionary() -> StubSource {
        StubSource::default()
            .with("brb", Some("be right back"), None)
            .with("idk", Some("I don't know"), Some("dunno, idek"))
            .broken("lag")
    }

    #[tokio::test]
    async fn blank_terms_never_reach_the_source() {
        let source = dictionary();
        for input in ["", "   ", "\t\n"] {
            let mut form = LookupForm::new();
            form.edit(input);
            assert_eq!(form.submit(&source).await, &LookupState::BlankInput);
        }
        assert_eq!(source.reads(), 0);
    }

    #[tokio::test]
    async fn missing_term_is_not_found() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("zzz123");
        assert_eq!(form.submit(&source).await, &LookupState::NotFound);

        let view = form.view(ORIGIN);
        assert_eq!(view.message, Some(NOT_FOUND_MESSAGE));
        assert_eq!(view.links, vec![ISSUE_TRACKER_URL, FEEDBACK_FORM_URL]);
        assert_eq!(view.share_link, None);
    }

    #[tokio::test]
    async fn loaded_entry_carries_only_present_fields() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("BRB");
        form.submit(&source).await;

        let view = form.view(ORIGIN);
        assert_eq!(view.state, "loaded");
        assert_eq!(view.definition.as_deref(), Some("be right back"));
        assert_eq!(view.alternatives, None);
        assert_eq!(
            view.share_link.as_deref(),
            Some("https://abbreve.example/?share=brb")
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("alternatives").is_none());
    }

    #[tokio::test]
    async fn failed_read_shows_generic_message() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("lag");
        assert_eq!(form.submit(&source).await, &LookupState::TransportError);
        assert_eq!(form.view(ORIGIN).message, Some(TRANSPORT_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn editing_clears_the_shown_result() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("idk");
        form.submit(&source).await;
        assert!(form.state().entry().is_some());

        form.edit("idk!");
        assert_eq!(form.state(), &LookupState::Idle);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn identical_resubmission_is_disabled() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("idk");
        form.submit(&source).await;

        assert!(!form.can_submit());
        assert_eq!(form.begin_submit(), Submission::Rejected);
        assert_eq!(source.reads(), 1);

        form.edit("idc");
        assert!(form.can_submit());
        form.edit("idk");
        assert!(!form.can_submit());
    }

    #[test]
    fn blank_submission_does_not_disable_resubmitting() {
        let mut form = LookupForm::new();
        form.edit(" ");
        assert_eq!(form.begin_submit(), Submission::Blank);
        assert!(form.can_submit());
        assert_eq!(form.begin_submit(), Submission::Blank);
    }

    #[test]
    fn submit_is_disabled_while_loading() {
        let mut form = LookupForm::new();
        form.edit("brb");
        assert_eq!(form.begin_submit(), Submission::Fetch(Term::normalize("brb")));
        form.edit("idk");
        assert_eq!(form.state(), &LookupState::Loading);
        assert_eq!(form.begin_submit(), Submission::Rejected);
    }

    #[test]
    fn result_belongs_to_submitted_term_after_mid_flight_edit() {
        let mut form = LookupForm::new();
        form.edit("brb");
        let _ = form.begin_submit();
        form.edit("idk");
        form.complete(Ok(Some(Entry {
            definition: Some("be right back".to_string()),
            alternatives: None,
        })));

        assert_eq!(
            form.state().entry().and_then(|e| e.definition.as_deref()),
            Some("be right back")
        );
        assert_eq!(form.term().as_str(), "idk");
        assert!(form.can_submit());
    }

    #[tokio::test]
    async fn failed_term_can_be_retried() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("lag");
        assert_eq!(form.submit(&source).await, &LookupState::TransportError);
        assert!(form.can_submit());
        assert_eq!(form.last_submitted(), None);

        form.edit("la");
        form.edit("lag");
        assert!(form.can_submit());
        assert_eq!(form.submit(&source).await, &LookupState::TransportError);
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn failure_after_a_success_reenables_the_earlier_term() {
        let mut form = LookupForm::new();
        form.edit("brb");
        let _ = form.begin_submit();
        form.complete(Ok(Some(Entry::default())));
        assert!(!form.can_submit());

        form.edit("lag");
        let _ = form.begin_submit();
        form.complete(Err(FetchError::Status(503)));
        form.edit("brb");
        assert!(form.can_submit());
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut form = LookupForm::new();
        assert_eq!(form.complete(Ok(None)), &LookupState::Idle);
    }

    #[tokio::test]
    async fn share_link_arrival_matches_manual_submission() {
        let source = dictionary();

        let mut shared = LookupForm::new();
        shared.open(Some("idk"), &source).await;

        let mut typed = LookupForm::new();
        typed.edit("idk");
        typed.submit(&source).await;

        assert_eq!(shared.term().as_str(), "idk");
        assert_eq!(shared.view(ORIGIN), typed.view(ORIGIN));
    }

    #[tokio::test]
    async fn share_link_submits_exactly_once() {
        let source = dictionary();
        let mut form = LookupForm::new();
        assert!(form.open(Some("idk"), &source).await.is_some());

        form.edit("idc");
        form.edit("idk");
        assert!(form.open(Some("idk"), &source).await.is_none());
        assert_eq!(form.state(), &LookupState::Idle);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn arrival_without_share_param_does_nothing() {
        let mut form = LookupForm::new();
        assert_eq!(form.arrive(None), None);
        assert_eq!(form.state(), &LookupState::Idle);
    }

    #[tokio::test]
    async fn copy_raises_feedback_until_latest_ticket_expires() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("idk");
        form.submit(&source).await;

        let mut clipboard = MemoryClipboard::new();
        let (link, first) = form.copy_share_link(ORIGIN, &mut clipboard).unwrap();
        assert_eq!(clipboard.contents(), Some(link.as_str()));
        assert!(form.view(ORIGIN).copied);

        let (_, second) = form.copy_share_link(ORIGIN, &mut clipboard).unwrap();
        assert!(!form.expire_feedback(first));
        assert!(form.feedback().is_shown());
        assert!(form.expire_feedback(second));
        assert!(!form.feedback().is_shown());
    }

    #[tokio::test]
    async fn clipboard_failure_leaves_state_alone() {
        let source = dictionary();
        let mut form = LookupForm::new();
        form.edit("brb");
        form.submit(&source).await;
        let before = form.view(ORIGIN);

        let mut clipboard = MemoryClipboard::rejecting();
        assert!(form.copy_share_link(ORIGIN, &mut clipboard).is_err());
        assert_eq!(form.view(ORIGIN), before);
    }
}
