//! Records from the Tag Genome data files

use crate::{MovieId, RatingCount, Relevance, TagId, TaggingCount, Year};
use serde::Deserialize;

/// Movie from `movies.dat`
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Movie {
    /// MovieLens identifier
    pub id: MovieId,

    /// Title, without the release year suffix
    pub title: Box<str>,

    /// Release year, or 0 if the title did not carry one
    pub release_year: Year,

    /// Number of ratings on MovieLens
    pub num_ratings: RatingCount,
}
//
impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        let MovieRow {
            id,
            title,
            num_ratings,
        } = row;
        Self {
            id,
            title: strip_year_suffix(&title).into(),
            release_year: release_year(&title),
            num_ratings,
        }
    }
}

/// Tag from `tags.dat`
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq)]
pub struct Tag {
    /// Tag Genome identifier
    pub id: TagId,

    /// Tag name
    pub name: Box<str>,

    /// Number of taggings on MovieLens
    pub num_taggings: TaggingCount,
}

/// Relevance of a tag to a movie, from `tag_relevance.dat`
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct TagRelevance {
    /// Movie that the tag is applied to
    pub movie_id: MovieId,

    /// Tag whose relevance is being measured
    pub tag_id: TagId,

    /// Relevance score
    pub relevance: Relevance,
}

/// Row of `movies.dat`, as it appears in the file
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct MovieRow {
    /// MovieLens identifier
    pub id: MovieId,

    /// Title, followed by the release year in parentheses
    pub title: Box<str>,

    /// Number of ratings on MovieLens
    pub num_ratings: RatingCount,
}

/// Extract the release year from a raw movie title
///
/// The year is made of all the digits found between the first pair of
/// parentheses in the title, whatever else that pair contains. An alternate
/// title in parentheses is therefore mistaken for the year: stray digits in it
/// are picked up, as in "Seven (a.k.a. Se7en) (1995)" which gets year 7.
///
/// Titles without parentheses or without digits inside of them get the 0
/// placeholder year. So do digit sequences which do not fit in a [`Year`],
/// rather than being parsed as an arbitrarily large integer.
pub fn release_year(raw_title: &str) -> Year {
    let inside_parens = raw_title
        .split_once('(')
        .and_then(|(_before, after)| after.split_once(')'))
        .map(|(inside, _after)| inside);
    let Some(inside_parens) = inside_parens else {
        log::trace!("No parenthesized release year in {raw_title:?}");
        return 0;
    };
    let digits = inside_parens
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    if digits.is_empty() {
        log::trace!("No release year digits in {raw_title:?}");
        return 0;
    }
    digits.parse().unwrap_or_else(|_| {
        log::debug!("Ignoring out-of-range release year {digits} of {raw_title:?}");
        0
    })
}

/// Remove the trailing "(yyyy)" release year from a raw movie title
///
/// Titles which do not end with a 6-character parenthesized suffix are
/// returned as-is.
pub fn strip_year_suffix(raw_title: &str) -> &str {
    const SUFFIX_LEN: usize = "(yyyy)".len();
    let raw_title = raw_title.trim_end();
    let bytes = raw_title.as_bytes();
    match bytes.len().checked_sub(SUFFIX_LEN) {
        Some(start) if bytes[start] == b'(' && bytes.last() == Some(&b')') => {
            raw_title[..start].trim_end()
        }
        _ => raw_title,
    }
}
