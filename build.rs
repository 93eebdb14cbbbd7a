use std::collections::HashMap;
use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use fst::MapBuilder;
use percent_encoding::percent_decode_str;
use rkyv::{rancor::Error as RkyvError, to_bytes};
use serde::Deserialize;
use zstd::bulk::compress as zstd_compress;

#[path = "src/data.rs"]
mod data_model;
use data_model::{DataStore, EntryRecord, PackedStrings, StringId};

#[path = "src/term.rs"]
#[allow(dead_code)]
mod term;
use term::Term;

const ARCHIVE_COMPRESSION_LEVEL: i32 = 9;

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    println!("cargo:rerun-if-changed=src/data.rs");
    println!("cargo:rerun-if-changed=src/term.rs");

    let rows = load_dictionary(&manifest_dir.join("dictionary"))?;
    build_fst(&rows, &out_dir)?;
    build_data_store(rows, &out_dir)?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct EntryJson {
    definition: Option<String>,
    alternatives: Option<String>,
}

fn load_dictionary(dir: &Path) -> Result<Vec<(String, EntryJson)>, Box<dyn Error>> {
    println!("cargo:rerun-if-changed={}", dir.display());
    if !dir.exists() {
        panic!(
            "Missing {}. Add one `<term>.json` file per slang entry.",
            dir.display()
        );
    }

    let mut rows = Vec::new();
    for item in fs::read_dir(dir)? {
        let path = item?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        println!("cargo:rerun-if-changed={}", path.display());
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| format!("Non UTF-8 file name {}", path.display()))?;
        let term = Term::from_resource_stem(stem)
            .ok_or_else(|| {
                let expected = percent_decode_str(stem)
                    .decode_utf8()
                    .map(|decoded| Term::normalize(&decoded).resource_name())
                    .unwrap_or_else(|_| "a valid UTF-8 escape".to_string());
                format!(
                    "{} must be named {expected} so every source resolves it",
                    path.display()
                )
            })?
            .as_str()
            .to_string();
        let body = fs::read_to_string(&path)?;
        let entry: EntryJson = serde_json::from_str(&body)
            .map_err(|err| format!("Failed to parse {}: {err}", path.display()))?;
        rows.push((term, entry));
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));
    for pair in rows.windows(2) {
        if pair[0].0 == pair[1].0 {
            panic!("Duplicate dictionary term {:?}", pair[0].0);
        }
    }
    Ok(rows)
}

fn build_fst(rows: &[(String, EntryJson)], out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let fst_path = out_dir.join("terms.fst");
    let writer = fs::File::create(&fst_path)?;
    let mut builder = MapBuilder::new(writer)?;
    for (idx, (term, _)) in rows.iter().enumerate() {
        builder.insert(term, idx as u64)?;
    }
    builder.finish()?;
    println!("cargo:rustc-env=ABBREVE_TERMS_FST={}", fst_path.display());
    Ok(())
}

fn build_data_store(rows: Vec<(String, EntryJson)>, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let mut strings = StringTable::default();
    let entries = rows
        .into_iter()
        .map(|(term, entry)| EntryRecord {
            term: strings.intern(term),
            definition: entry.definition.map(|value| strings.intern(value)),
            alternatives: entry.alternatives.map(|value| strings.intern(value)),
        })
        .collect();
    let store = DataStore {
        strings: strings.into_packed(),
        entries,
    };

    let bytes = to_bytes::<RkyvError>(&store)
        .map_err(|err| format!("Failed to serialize dictionary store: {err}"))?
        .into_vec();
    let compressed = zstd_compress(&bytes, ARCHIVE_COMPRESSION_LEVEL)?;

    let data_path = out_dir.join("dictionary.rkyv");
    fs::write(&data_path, compressed)?;
    println!("cargo:rustc-env=ABBREVE_DATA={}", data_path.display());
    Ok(())
}

#[derive(Default)]
struct StringTable {
    map: HashMap<Box<str>, StringId>,
    packed: PackedStrings,
}

impl StringTable {
    fn intern(&mut self, value: String) -> StringId {
        if let Some(&id) = self.map.get(value.as_str()) {
            return id;
        }
        let id = self.packed.offsets.len() as StringId;
        self.packed.offsets.push(self.packed.data.len() as u32);
        self.packed.lengths.push(value.len() as u32);
        self.packed.data.extend_from_slice(value.as_bytes());
        self.map.insert(value.into_boxed_str(), id);
        id
    }

    fn into_packed(self) -> PackedStrings {
        self.packed
    }
}
