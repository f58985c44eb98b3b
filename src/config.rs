//! Run configuration

use crate::{Args, Command, DataArgs};
use mltg::TableKind;
use std::{num::NonZeroUsize, path::PathBuf};

/// Default name of the movies data file
pub const MOVIES_FILE: &str = "movies.dat";

/// Default name of the tags data file
pub const TAGS_FILE: &str = "tags.dat";

/// Default name of the tag relevance data file
pub const TAG_RELEVANCE_FILE: &str = "tag_relevance.dat";

/// Final process configuration
///
/// This is the result of digesting [`Args`], asking the user for anything
/// that was left unspecified. Please refer to [`Args`] to know more about
/// individual fields.
#[derive(Clone, Debug, PartialEq)]
pub enum Config {
    /// Print the most popular rows of a data file
    Top {
        paths: DataPaths,
        kind: TableKind,
        top_percent: f64,
    },

    /// Filter a previously exported table again
    Rerank { path: PathBuf, top_percent: f64 },

    /// Print the tags that are most relevant to a movie
    TagsFor {
        paths: DataPaths,
        title: Box<str>,
        count: NonZeroUsize,
    },
}
//
impl Config {
    /// Determine process configuration from CLI arguments
    ///
    /// `pick_kind` is called if the user did not tell which table to use.
    pub fn new(
        args: Args,
        pick_kind: impl FnOnce() -> anyhow::Result<TableKind>,
    ) -> anyhow::Result<Self> {
        Ok(match args.command {
            Command::Top {
                data,
                kind,
                top_percent,
            } => Self::Top {
                paths: DataPaths::new(data),
                kind: match kind {
                    Some(kind) => kind.into(),
                    None => pick_kind()?,
                },
                top_percent,
            },
            Command::Rerank { file, top_percent } => Self::Rerank {
                path: file,
                top_percent,
            },
            Command::TagsFor { data, title, count } => Self::TagsFor {
                paths: DataPaths::new(data),
                title: title.into(),
                count,
            },
        })
    }
}

/// Location of the Tag Genome data files
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DataPaths {
    pub movies: PathBuf,
    pub tags: PathBuf,
    pub tag_relevance: PathBuf,
}
//
impl DataPaths {
    /// Resolve data file names relative to the data directory
    pub fn new(args: DataArgs) -> Self {
        let DataArgs {
            data_dir,
            movies,
            tags,
            tag_relevance,
        } = args;
        let resolve = |name: Option<PathBuf>, default: &str| {
            data_dir.join(name.unwrap_or_else(|| default.into()))
        };
        Self {
            movies: resolve(movies, MOVIES_FILE),
            tags: resolve(tags, TAGS_FILE),
            tag_relevance: resolve(tag_relevance, TAG_RELEVANCE_FILE),
        }
    }
}
