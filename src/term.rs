use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fmt;

/// Bytes left unescaped in resource names and share links. Everything else,
/// including `.` and `/`, is percent-encoded so a term can never walk out of
/// the dictionary base path.
const TERM_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

const RESOURCE_EXTENSION: &str = ".json";

/// A slang term as typed by the user, lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(String);

impl Term {
    pub fn normalize(input: &str) -> Self {
        Self(input.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the term contains nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Path-safe file stem for this term.
    pub fn resource_stem(&self) -> String {
        encode(&self.0)
    }

    /// `<stem>.json`, the static resource holding this term's entry.
    pub fn resource_name(&self) -> String {
        format!("{}{RESOURCE_EXTENSION}", self.resource_stem())
    }

    /// Parses a file stem as written on disk, e.g. `g%2Eo%2Ea%2Et`.
    ///
    /// Only the exact stem [`Term::resource_stem`] would produce is accepted,
    /// so every bundled file is also reachable through a directory source.
    pub fn from_resource_stem(stem: &str) -> Option<Self> {
        let decoded = percent_decode_str(stem).decode_utf8().ok()?;
        let term = Self::normalize(&decoded);
        (term.resource_stem() == stem).then_some(term)
    }

    /// Recovers the term from a decoded resource name such as `brb.json`.
    pub fn from_resource_name(name: &str) -> Option<Self> {
        name.strip_suffix(RESOURCE_EXTENSION).map(Self::normalize)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn encode(value: &str) -> String {
    utf8_percent_encode(value, TERM_ESCAPE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_without_trimming() {
        let term = Term::normalize(" IDK ");
        assert_eq!(term.as_str(), " idk ");
        assert!(!term.is_blank());
    }

    #[test]
    fn whitespace_only_is_blank() {
        assert!(Term::normalize("").is_blank());
        assert!(Term::normalize(" \t \n").is_blank());
    }

    #[test]
    fn resource_name_keeps_plain_terms_readable() {
        assert_eq!(Term::normalize("brb").resource_name(), "brb.json");
        assert_eq!(Term::normalize("no-cap_fr").resource_name(), "no-cap_fr.json");
    }

    #[test]
    fn resource_name_escapes_path_separators() {
        let name = Term::normalize("../etc/passwd").resource_name();
        assert_eq!(name, "%2E%2E%2Fetc%2Fpasswd.json");
        assert!(!name.contains('/'));
    }

    #[test]
    fn encoded_name_matches_build_time_stem() {
        assert_eq!(Term::normalize("g.o.a.t").resource_stem(), "g%2Eo%2Ea%2Et");
    }

    #[test]
    fn only_canonical_stems_are_accepted() {
        assert_eq!(Term::from_resource_stem("brb"), Some(Term::normalize("brb")));
        assert_eq!(
            Term::from_resource_stem("g%2Eo%2Ea%2Et"),
            Some(Term::normalize("g.o.a.t"))
        );
        assert_eq!(Term::from_resource_stem("g.o.a.t"), None);
        assert_eq!(Term::from_resource_stem("g%2eo%2ea%2et"), None);
        assert_eq!(Term::from_resource_stem("BRB"), None);
        assert_eq!(Term::from_resource_stem("%FF"), None);
    }

    #[test]
    fn resource_name_parses_back_to_term() {
        assert_eq!(Term::from_resource_name("BRB.json"), Some(Term::normalize("brb")));
        assert_eq!(Term::from_resource_name("brb.txt"), None);
    }
}
