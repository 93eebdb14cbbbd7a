use crate::term::{Term, encode};
use std::fmt;

/// Query parameter carrying a shared term.
pub const SHARE_PARAM: &str = "share";

/// `<origin>/?share=<term>`, computed on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink(String);

impl ShareLink {
    pub fn new(origin: &str, term: &Term) -> Self {
        let origin = origin.trim_end_matches('/');
        Self(format!("{origin}/?{SHARE_PARAM}={}", encode(term.as_str())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-shot guard around deep-link arrival.
///
/// The first call to [`ShareLatch::take`] consumes the latch whether or not
/// the page arrived with a `share` value, so the auto-submit it triggers can
/// never fire a second time.
#[derive(Debug, Default, Clone)]
pub struct ShareLatch {
    consumed: bool,
}

impl ShareLatch {
    /// `share` is the already decoded value of the `share` query parameter.
    pub fn take(&mut self, share: Option<&str>) -> Option<Term> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        share
            .filter(|value| !value.is_empty())
            .map(Term::normalize)
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_link_joins_origin_and_term() {
        let link = ShareLink::new("https://abbreve.example/", &Term::normalize("idk"));
        assert_eq!(link.as_str(), "https://abbreve.example/?share=idk");
    }

    #[test]
    fn share_link_escapes_query_delimiters() {
        let link = ShareLink::new("http://localhost:3000", &Term::normalize("a&b c"));
        assert_eq!(link.as_str(), "http://localhost:3000/?share=a%26b%20c");
    }

    #[test]
    fn latch_fires_once() {
        let mut latch = ShareLatch::default();
        assert_eq!(latch.take(Some("IDK")), Some(Term::normalize("idk")));
        assert!(latch.is_consumed());
        assert_eq!(latch.take(Some("idk")), None);
    }

    #[test]
    fn latch_is_consumed_even_without_a_share_param() {
        let mut latch = ShareLatch::default();
        assert_eq!(latch.take(Some("")), None);
        assert_eq!(latch.take(Some("idk")), None);

        let mut latch = ShareLatch::default();
        assert_eq!(latch.take(None), None);
        assert!(latch.is_consumed());
        assert_eq!(latch.take(Some("idk")), None);
    }
}
