use crate::clipboard::{Clipboard, ClipboardError};
use crate::config::LookupConfig;
use crate::form::{LookupForm, LookupView, Submission};
use crate::share::ShareLink;
use crate::source::DictionarySource;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A [`LookupForm`] driven from async code.
///
/// Reads run as fire-and-forget tokio tasks that apply their outcome when they
/// finish. The copy-feedback reset is a single slot: scheduling a new one
/// aborts the previous task. All methods that spawn must be called from
/// inside a tokio runtime.
pub struct LookupSession {
    form: Arc<Mutex<LookupForm>>,
    source: Arc<dyn DictionarySource>,
    origin: String,
    feedback_delay: Duration,
    feedback_reset: Mutex<Option<JoinHandle<()>>>,
}

impl LookupSession {
    pub fn new(source: Arc<dyn DictionarySource>, config: &LookupConfig) -> Self {
        Self {
            form: Arc::new(Mutex::new(LookupForm::new())),
            source,
            origin: config.origin.clone(),
            feedback_delay: config.feedback_delay,
            feedback_reset: Mutex::new(None),
        }
    }

    pub fn view(&self) -> LookupView {
        self.form.lock().view(&self.origin)
    }

    pub fn can_submit(&self) -> bool {
        self.form.lock().can_submit()
    }

    pub fn edit(&self, input: &str) {
        self.form.lock().edit(input);
    }

    /// Starts a lookup. Returns the read task, or `None` when no read was needed.
    pub fn submit(&self) -> Option<JoinHandle<()>> {
        let submission = self.form.lock().begin_submit();
        self.dispatch(submission)
    }

    /// Deep-link arrival; see [`LookupForm::arrive`].
    pub fn arrive(&self, share: Option<&str>) -> Option<JoinHandle<()>> {
        let submission = self.form.lock().arrive(share)?;
        self.dispatch(submission)
    }

    fn dispatch(&self, submission: Submission) -> Option<JoinHandle<()>> {
        let Submission::Fetch(term) = submission else {
            return None;
        };
        let form = Arc::clone(&self.form);
        let source = Arc::clone(&self.source);
        Some(tokio::spawn(async move {
            let outcome = source.fetch(&term).await;
            form.lock().complete(outcome);
        }))
    }

    /// Copies the share link and (re)schedules the feedback reset.
    ///
    /// The reset slot stays locked from issuing the ticket until the new reset
    /// is stored, so the slot always holds the reset for the newest ticket.
    pub fn copy_share_link(
        &self,
        clipboard: &mut dyn Clipboard,
    ) -> Result<ShareLink, ClipboardError> {
        let mut slot = self.feedback_reset.lock();
        let (link, ticket) = self
            .form
            .lock()
            .copy_share_link(&self.origin, clipboard)?;

        let form = Arc::clone(&self.form);
        let delay = self.feedback_delay;
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            form.lock().expire_feedback(ticket);
        }));
        Ok(link)
    }
}

impl Drop for LookupSession {
    fn drop(&mut self) {
        if let Some(reset) = self.feedback_reset.get_mut().take() {
            reset.abort();
        }
    }
}
