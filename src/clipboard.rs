use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("could not copy text: {0}")]
    Write(String),
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard held in memory. Used when no system clipboard is reachable and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Option<String>,
    reject_writes: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose every write fails.
    pub fn rejecting() -> Self {
        Self {
            contents: None,
            reject_writes: true,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.reject_writes {
            return Err(ClipboardError::Write("write permission denied".to_string()));
        }
        self.contents = Some(text.to_string());
        Ok(())
    }
}

#[cfg(feature = "system-clipboard")]
pub use system::SystemClipboard;

#[cfg(feature = "system-clipboard")]
mod system {
    use super::{Clipboard, ClipboardError};
    use cli_clipboard::{ClipboardContext, ClipboardProvider};

    pub struct SystemClipboard {
        ctx: ClipboardContext,
    }

    impl SystemClipboard {
        pub fn new() -> Result<Self, ClipboardError> {
            let ctx =
                ClipboardContext::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
            Ok(Self { ctx })
        }
    }

    impl Clipboard for SystemClipboard {
        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.ctx
                .set_contents(text.to_owned())
                .map_err(|err| ClipboardError::Write(err.to_string()))
        }
    }
}
