//! Loaders for the MovieLens Tag Genome dataset
//!
//! The Tag Genome ships as a handful of tab-separated `.dat` files, documented
//! in the README that comes with the dataset download. This crate turns them
//! into typed in-memory tables ([`tsv`]), and can pick the most popular
//! movies or tags from those tables ([`top`]).

pub mod error;
pub mod progress;
pub mod records;
pub mod table;
pub mod top;
pub mod tsv;

pub use crate::{
    error::{LoadError, ShapeError},
    records::{Movie, Tag, TagRelevance},
    table::{MovieTable, TagTable},
    top::{PopularityTable, TableKind},
};

/// MovieLens movie identifier
pub type MovieId = u32;

/// Tag Genome tag identifier
pub type TagId = u32;

/// Year of Gregorian Calendar, or 0 if unknown
pub type Year = u16;

/// Number of ratings that a movie received on MovieLens
pub type RatingCount = u64;

/// Number of times a tag was applied on MovieLens
pub type TaggingCount = u64;

/// Relevance of a tag to a movie, nominally between 0 and 1
pub type Relevance = f64;
