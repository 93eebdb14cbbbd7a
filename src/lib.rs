mod data;

pub mod clipboard;
pub mod config;
pub mod form;
pub mod session;
pub mod share;
pub mod source;
pub mod term;
#[cfg(feature = "web")]
pub mod web;

pub use clipboard::{Clipboard, ClipboardError, MemoryClipboard};
pub use config::{ConfigError, LookupConfig, SourceConfig};
pub use form::{Entry, LookupForm, LookupState, LookupView, Submission};
pub use session::LookupSession;
pub use share::{SHARE_PARAM, ShareLatch, ShareLink};
pub use source::{BundledSource, DictionarySource, DirectorySource, FetchError};
pub use term::Term;

use data::{ArchivedDataStore, ArchivedEntryRecord, ArchivedPackedStrings, ArchivedStringId};
use fst::Automaton;
use fst::automaton::Str;
use fst::{IntoStreamer, Map, Streamer};
use once_cell::sync::Lazy;
use rkyv::access_unchecked;
use rkyv::util::AlignedVec;
use std::io::Cursor;
use std::str;
use zstd::stream::decode_all;

static TERMS_FST_BYTES: &[u8] = include_bytes!(env!("ABBREVE_TERMS_FST"));
static DATA_BYTES: &[u8] = include_bytes!(env!("ABBREVE_DATA"));

static TERM_MAP: Lazy<Map<&'static [u8]>> =
    Lazy::new(|| Map::new(TERMS_FST_BYTES).expect("valid term fst"));
static DATA_SLICE: Lazy<&'static AlignedVec> = Lazy::new(|| {
    let decompressed = decode_all(Cursor::new(DATA_BYTES)).expect("decompress dictionary data");
    let mut aligned = AlignedVec::with_capacity(decompressed.len());
    aligned.extend_from_slice(&decompressed);
    Box::leak(Box::new(aligned))
});
static DATA_STORE: Lazy<&'static ArchivedDataStore> =
    Lazy::new(|| unsafe { access_unchecked::<ArchivedDataStore>(DATA_SLICE.as_slice()) });
static ALL_TERMS: Lazy<Vec<String>> = Lazy::new(|| BundledDictionary::prefix("", usize::MAX));

/// Read-only access to the dictionary compiled from `dictionary/*.json`.
pub struct BundledDictionary;

impl BundledDictionary {
    pub fn len() -> usize {
        TERM_MAP.len()
    }

    pub fn is_empty() -> bool {
        TERM_MAP.is_empty()
    }

    pub fn contains(term: &str) -> bool {
        TERM_MAP.contains_key(term)
    }

    /// Returns the entry for an exact (already normalized) term.
    pub fn entry(term: &str) -> Option<BundledEntry<'static>> {
        let index = TERM_MAP.get(term)? as usize;
        let store = data_store();
        store
            .entries
            .get(index)
            .map(|record| BundledEntry { store, record })
    }

    /// Returns up to `limit` terms starting with `prefix`, in byte order.
    pub fn prefix(prefix: &str, limit: usize) -> Vec<String> {
        let automaton = Str::new(prefix).starts_with();
        let mut stream = TERM_MAP.search(automaton).into_stream();
        let mut results = Vec::new();
        while results.len() < limit {
            let Some((key, _)) = stream.next() else {
                break;
            };
            results.push(String::from_utf8_lossy(key).into_owned());
        }
        results
    }

    pub fn all_terms() -> &'static [String] {
        ALL_TERMS.as_slice()
    }
}

fn data_store() -> &'static ArchivedDataStore {
    *DATA_STORE
}

pub struct BundledEntry<'a> {
    store: &'a ArchivedDataStore,
    record: &'a ArchivedEntryRecord,
}

impl<'a> BundledEntry<'a> {
    pub fn term(&self) -> &'a str {
        self.store.strings.get(self.record.term)
    }

    pub fn definition(&self) -> Option<&'a str> {
        self.record
            .definition
            .as_ref()
            .map(|id| self.store.strings.get(*id))
    }

    pub fn alternatives(&self) -> Option<&'a str> {
        self.record
            .alternatives
            .as_ref()
            .map(|id| self.store.strings.get(*id))
    }

    pub fn to_entry(&self) -> Entry {
        Entry {
            definition: self.definition().map(str::to_string),
            alternatives: self.alternatives().map(str::to_string),
        }
    }
}

impl ArchivedPackedStrings {
    fn get(&self, id: ArchivedStringId) -> &str {
        let idx = id.to_native() as usize;
        let start = self.offsets.as_slice()[idx].to_native() as usize;
        let len = self.lengths.as_slice()[idx].to_native() as usize;
        let bytes = &self.data.as_slice()[start..start + len];
        str::from_utf8(bytes).expect("stored string data is valid UTF-8")
    }
}
