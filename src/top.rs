//! Select the most popular movies or tags

use crate::{
    error::ShapeError,
    records::{Movie, Tag, TagRelevance},
    table::{MovieTable, Record, TagTable, Table},
    Relevance, TagId,
};
use rayon::prelude::*;
use std::{cmp::Reverse, collections::HashMap, fmt};

/// Kind of table that popularity filtering can be applied to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TableKind {
    /// Tags, ranked by number of taggings
    Tags,

    /// Movies, ranked by number of ratings
    Movies,
}
//
impl TableKind {
    /// Every kind of table, in the order they should be presented to users
    pub const ALL: [Self; 2] = [Self::Tags, Self::Movies];

    /// Infer the kind of a table from its number of data columns
    ///
    /// Only use this when the table kind cannot be known in any other way,
    /// e.g. when reading back a previously exported table.
    pub fn from_column_count(columns: usize) -> Result<Self, ShapeError> {
        match columns {
            c if c == Tag::DATA_COLUMNS.len() => Ok(Self::Tags),
            c if c == Movie::DATA_COLUMNS.len() => Ok(Self::Movies),
            columns => Err(ShapeError { columns }),
        }
    }

    /// Name of the lookup key column
    pub fn key_column(self) -> &'static str {
        match self {
            Self::Tags => Tag::KEY_COLUMN,
            Self::Movies => Movie::KEY_COLUMN,
        }
    }

    /// Names of the data columns
    pub fn data_columns(self) -> &'static [&'static str] {
        match self {
            Self::Tags => Tag::DATA_COLUMNS,
            Self::Movies => Movie::DATA_COLUMNS,
        }
    }

    /// What the rows of this table are called
    fn row_name(self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Movies => "titles",
        }
    }
}
//
impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tags => "tags",
            Self::Movies => "movies",
        })
    }
}

/// Table of either tags or movies
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PopularityTable {
    Tags(TagTable),
    Movies(MovieTable),
}
//
impl PopularityTable {
    /// Kind of table
    pub fn kind(&self) -> TableKind {
        match self {
            Self::Tags(_) => TableKind::Tags,
            Self::Movies(_) => TableKind::Movies,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        match self {
            Self::Tags(tags) => tags.len(),
            Self::Movies(movies) => movies.len(),
        }
    }

    /// Truth that the table has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep the most popular fraction of this table
    ///
    /// See [`top_percent_of_tags()`] and [`top_percent_of_movies()`].
    pub fn top_percent(&self, top_percent: f64) -> Self {
        match self {
            Self::Tags(tags) => Self::Tags(top_percent_of_tags(tags, top_percent)),
            Self::Movies(movies) => Self::Movies(top_percent_of_movies(movies, top_percent)),
        }
    }

    /// Lookup key and data columns of each row, in table order
    pub fn export_rows(&self) -> Vec<(&str, Vec<u64>)> {
        fn export<R: Record>(table: &Table<R>) -> Vec<(&str, Vec<u64>)> {
            (table.rows().iter())
                .map(|row| (row.key(), row.data()))
                .collect()
        }
        match self {
            Self::Tags(tags) => export(tags),
            Self::Movies(movies) => export(movies),
        }
    }
}
//
impl From<TagTable> for PopularityTable {
    fn from(tags: TagTable) -> Self {
        Self::Tags(tags)
    }
}
//
impl From<MovieTable> for PopularityTable {
    fn from(movies: MovieTable) -> Self {
        Self::Movies(movies)
    }
}

/// Keep the most tagged fraction of tags, by decreasing number of taggings
pub fn top_percent_of_tags(tags: &TagTable, top_percent: f64) -> TagTable {
    top_percent_of(TableKind::Tags, tags, top_percent)
}

/// Keep the most rated fraction of movies, by decreasing number of ratings
pub fn top_percent_of_movies(movies: &MovieTable, top_percent: f64) -> MovieTable {
    top_percent_of(TableKind::Movies, movies, top_percent)
}

/// Number of rows that are kept when keeping a fraction of a table
///
/// This is the number of rows times the fraction, rounded down, and clamped
/// to the number of rows. Fractions that are not positive keep nothing.
pub fn cutoff(num_rows: usize, top_percent: f64) -> usize {
    if top_percent.is_nan() || top_percent <= 0.0 {
        return 0;
    }
    let cutoff = (num_rows as f64 * top_percent).floor();
    if cutoff >= num_rows as f64 {
        num_rows
    } else {
        cutoff as usize
    }
}

/// Keep the most popular fraction of a table
///
/// Rows are sorted by decreasing popularity, rows of equal popularity staying
/// in their original order, then truncated to the [`cutoff()`].
fn top_percent_of<R: Record>(kind: TableKind, table: &Table<R>, top_percent: f64) -> Table<R> {
    let cutoff = cutoff(table.len(), top_percent);
    log::info!("Computing top {cutoff} {}", kind.row_name());
    let mut rows = table.rows().to_vec();
    rows.par_sort_by_key(|row| Reverse(row.popularity()));
    rows.truncate(cutoff);
    Table::new(rows)
}

/// Pick the tags that are most relevant to a movie, by decreasing relevance
///
/// Relevance scores that refer to unknown tags are ignored.
pub fn most_relevant_tags<'tags>(
    movie: &Movie,
    tags: &'tags TagTable,
    relevance: &[TagRelevance],
    max_tags: usize,
) -> Vec<(&'tags Tag, Relevance)> {
    let tags_by_id = (tags.rows().iter())
        .map(|tag| (tag.id, tag))
        .collect::<HashMap<TagId, &Tag>>();
    let mut scores = (relevance.iter())
        .filter(|score| score.movie_id == movie.id)
        .filter_map(|score| {
            let tag = tags_by_id.get(&score.tag_id).copied();
            if tag.is_none() {
                log::debug!("Ignoring relevance score for unknown tag {}", score.tag_id);
            }
            tag.map(|tag| (tag, score.relevance))
        })
        .collect::<Vec<_>>();
    scores.sort_by(|(_, rel1), (_, rel2)| rel2.total_cmp(rel1));
    scores.truncate(max_tags);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(counts: &[u64]) -> TagTable {
        (counts.iter().enumerate())
            .map(|(idx, &num_taggings)| Tag {
                id: idx as u32,
                name: format!("tag{idx}").into(),
                num_taggings,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn movies(counts: &[u64]) -> MovieTable {
        (counts.iter().enumerate())
            .map(|(idx, &num_ratings)| Movie {
                id: idx as u32 + 1,
                title: format!("Movie {idx}").into(),
                release_year: 1990 + idx as u16,
                num_ratings,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn assert_sorted_subset<R: Record + PartialEq + std::fmt::Debug>(
        input: &Table<R>,
        output: &Table<R>,
    ) {
        assert!(output
            .rows()
            .windows(2)
            .all(|pair| pair[0].popularity() >= pair[1].popularity()));
        for row in output.rows() {
            assert!(input.rows().contains(row), "{row:?} is not from the input");
        }
    }

    #[test]
    fn cutoff_rounds_down() {
        assert_eq!(cutoff(10, 0.25), 2);
        assert_eq!(cutoff(10, 0.5), 5);
        assert_eq!(cutoff(3, 0.99), 2);
        assert_eq!(cutoff(0, 0.5), 0);
    }

    #[test]
    fn cutoff_is_clamped() {
        assert_eq!(cutoff(10, 0.0), 0);
        assert_eq!(cutoff(10, -0.5), 0);
        assert_eq!(cutoff(10, f64::NAN), 0);
        assert_eq!(cutoff(10, 1.0), 10);
        assert_eq!(cutoff(10, 2.5), 10);
        assert_eq!(cutoff(10, f64::INFINITY), 10);
    }

    #[test]
    fn output_length_follows_fraction() {
        let table = tags(&[5, 3, 9, 1, 7, 7, 2, 8, 4, 6, 0]);
        for percent in 1..=100 {
            let top_percent = f64::from(percent) / 100.0;
            let top = top_percent_of_tags(&table, top_percent);
            assert_eq!(
                top.len(),
                (table.len() as f64 * top_percent).floor() as usize
            );
            assert_sorted_subset(&table, &top);
        }
    }

    #[test]
    fn full_fraction_sorts_everything() {
        let table = movies(&[10, 30, 20]);
        let top = top_percent_of_movies(&table, 1.0);
        let ratings = top.rows().iter().map(|m| m.num_ratings).collect::<Vec<_>>();
        assert_eq!(ratings, vec![30, 20, 10]);
        assert_eq!(top.get("Movie 1").map(|m| m.release_year), Some(1991));
    }

    #[test]
    fn empty_results() {
        let table = tags(&[1, 2, 3]);
        assert!(top_percent_of_tags(&table, 0.0).is_empty());
        assert!(top_percent_of_tags(&table, -1.0).is_empty());
        assert!(top_percent_of_tags(&tags(&[]), 0.5).is_empty());
    }

    #[test]
    fn oversized_fraction_keeps_everything() {
        let table = tags(&[1, 2, 3]);
        assert_eq!(top_percent_of_tags(&table, 1.5).len(), 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let table = tags(&[4, 9, 4, 9, 4, 1]);
        let top = top_percent_of_tags(&table, 1.0);
        let ids = top.rows().iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3, 0, 2, 4, 5]);
    }

    #[test]
    fn dispatch_on_table_kind() {
        let table = PopularityTable::from(movies(&[1, 5, 3, 2]));
        let top = table.top_percent(0.5);
        assert_eq!(top.kind(), TableKind::Movies);
        assert_eq!(
            top.export_rows(),
            vec![("Movie 1", vec![2, 5, 1991]), ("Movie 2", vec![3, 3, 1992])]
        );

        let table = PopularityTable::from(tags(&[1, 5]));
        let top = table.top_percent(0.5);
        assert_eq!(top.kind(), TableKind::Tags);
        assert_eq!(top.export_rows(), vec![("tag1", vec![1, 5])]);
    }

    #[test]
    fn kind_from_column_count() {
        assert_eq!(TableKind::from_column_count(2), Ok(TableKind::Tags));
        assert_eq!(TableKind::from_column_count(3), Ok(TableKind::Movies));
        let error = TableKind::from_column_count(4).unwrap_err();
        assert_eq!(error, ShapeError { columns: 4 });
        assert!(error
            .to_string()
            .starts_with("pass either a tags table or a movies table"));
    }

    #[test]
    fn most_relevant_tags_of_a_movie() {
        let movies = movies(&[10, 20]);
        let tags = tags(&[1, 1, 1]);
        let relevance = [(1, 0, 0.5), (1, 1, 0.9), (2, 0, 1.0), (1, 2, 0.1), (1, 7, 0.95)]
            .map(|(movie_id, tag_id, relevance)| TagRelevance {
                movie_id,
                tag_id,
                relevance,
            });
        let movie = movies.get("Movie 0").unwrap();
        let top = most_relevant_tags(movie, &tags, &relevance, 2)
            .into_iter()
            .map(|(tag, relevance)| (&*tag.name, relevance))
            .collect::<Vec<_>>();
        assert_eq!(top, vec![("tag1", 0.9), ("tag0", 0.5)]);
    }
}
