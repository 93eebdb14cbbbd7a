use rkyv::{Archive, Serialize};

pub type StringId = u32;
#[allow(dead_code)]
pub type ArchivedStringId = <StringId as Archive>::Archived;

#[derive(Archive, Serialize, Debug)]
pub struct EntryRecord {
    pub term: StringId,
    pub definition: Option<StringId>,
    pub alternatives: Option<StringId>,
}

#[derive(Archive, Serialize, Debug, Default)]
pub struct PackedStrings {
    pub offsets: Vec<u32>,
    pub lengths: Vec<u32>,
    pub data: Vec<u8>,
}

/// Entries are stored in term order, so the FST value of a term is its index here.
#[derive(Archive, Serialize, Debug, Default)]
pub struct DataStore {
    pub strings: PackedStrings,
    pub entries: Vec<EntryRecord>,
}
