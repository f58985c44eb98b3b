//! Tables of records, indexed by a lookup key

use crate::records::{Movie, Tag};
use std::collections::{hash_map, HashMap};

/// Record which can be stored in a keyed [`Table`]
pub trait Record: Clone + Send {
    /// Name of the lookup key column
    const KEY_COLUMN: &'static str;

    /// Names of the data columns, in export order
    const DATA_COLUMNS: &'static [&'static str];

    /// Lookup key of this record
    fn key(&self) -> &str;

    /// Popularity of this record, used for ranking
    fn popularity(&self) -> u64;

    /// Data column values, in the order of [`DATA_COLUMNS`](Self::DATA_COLUMNS)
    fn data(&self) -> Vec<u64>;
}
//
impl Record for Movie {
    const KEY_COLUMN: &'static str = "Title";
    const DATA_COLUMNS: &'static [&'static str] = &["MovieID", "NumRatings", "ReleaseYear"];

    fn key(&self) -> &str {
        &self.title
    }

    fn popularity(&self) -> u64 {
        self.num_ratings
    }

    fn data(&self) -> Vec<u64> {
        vec![
            self.id.into(),
            self.num_ratings,
            self.release_year.into(),
        ]
    }
}
//
impl Record for Tag {
    const KEY_COLUMN: &'static str = "Tag";
    const DATA_COLUMNS: &'static [&'static str] = &["TagID", "NumTaggings"];

    fn key(&self) -> &str {
        &self.name
    }

    fn popularity(&self) -> u64 {
        self.num_taggings
    }

    fn data(&self) -> Vec<u64> {
        vec![self.id.into(), self.num_taggings]
    }
}

/// Movies, looked up by title
pub type MovieTable = Table<Movie>;

/// Tags, looked up by name
pub type TagTable = Table<Tag>;

/// Ordered records with a lookup index
///
/// Duplicate keys are accepted. Lookups resolve to the first record that
/// carries a given key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table<R> {
    /// Records, in their original order
    rows: Vec<R>,

    /// Position of the first record with each key
    index: HashMap<Box<str>, usize>,
}
//
impl<R: Record> Table<R> {
    /// Index a set of records
    pub fn new(rows: Vec<R>) -> Self {
        let mut index = HashMap::<Box<str>, usize>::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            match index.entry(row.key().into()) {
                hash_map::Entry::Occupied(o) => {
                    log::debug!(
                        "Duplicate {} {:?} at row {pos}, lookups will use row {}",
                        R::KEY_COLUMN,
                        row.key(),
                        o.get()
                    );
                }
                hash_map::Entry::Vacant(v) => {
                    v.insert(pos);
                }
            }
        }
        Self { rows, index }
    }

    /// Look up a record by key
    pub fn get(&self, key: &str) -> Option<&R> {
        self.index.get(key).map(|&pos| &self.rows[pos])
    }

    /// Records, in table order
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Truth that the table has no records
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract the records
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }
}
//
impl<R: Record> From<Vec<R>> for Table<R> {
    fn from(rows: Vec<R>) -> Self {
        Self::new(rows)
    }
}
