//! This program is based on the MovieLens Tag Genome dataset, whose general
//! documentation you can find at <https://grouplens.org/datasets/movielens/>.

mod config;

use crate::config::{Config, DataPaths};
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dialoguer::FuzzySelect;
use log::LevelFilter;
use mltg::{
    progress::ProgressReport,
    top,
    tsv::{self, LoadProgress},
    PopularityTable, TableKind,
};
use std::{num::NonZeroUsize, path::PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Explore the MovieLens Tag Genome dataset
///
/// Tables are printed on stdout as tab-separated values with a header row,
/// which can be fed back into the `rerank` command.
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    #[command(subcommand)]
    command: Command,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        // Decode CLI arguments
        let args = Args::parse();

        // Check CLI arguments for basic sanity
        if let Command::Top { top_percent, .. } | Command::Rerank { top_percent, .. } =
            &args.command
        {
            anyhow::ensure!(
                top_percent.is_finite(),
                "requested fraction of top rows should be a finite number"
            );
            if !(0.0..=1.0).contains(top_percent) {
                log::warn!("Fraction of top rows {top_percent} is outside of [0, 1] and will be clamped");
            }
        }
        Ok(args)
    }
}

/// Operation to be carried out
#[derive(Subcommand, Debug)]
enum Command {
    /// Print the most popular tags or movies
    Top {
        #[command(flatten)]
        data: DataArgs,

        /// Kind of table to be filtered
        ///
        /// Will interactively prompt for a table kind if not specified.
        #[arg(short, long, default_value = None)]
        kind: Option<KindArg>,

        /// Fraction of the table to be kept, e.g. 0.1 for the top 10%
        ///
        /// Tags are ranked by number of taggings and movies are ranked by
        /// number of ratings. Rows with equal popularity are kept in file
        /// order.
        #[arg(short = 'p', long, default_value = "0.1")]
        top_percent: f64,
    },

    /// Filter a table that was previously printed by this program again
    ///
    /// Whether the table lists tags or movies is deduced from its number of
    /// columns.
    Rerank {
        /// Path to the exported table
        file: PathBuf,

        /// Fraction of the table to be kept, e.g. 0.1 for the top 10%
        #[arg(short = 'p', long, default_value = "0.1")]
        top_percent: f64,
    },

    /// Print the tags that are most relevant to a movie
    TagsFor {
        #[command(flatten)]
        data: DataArgs,

        /// Movie title, without the release year
        title: String,

        /// Max number of output tags
        #[arg(short = 'n', long, default_value = "10")]
        count: NonZeroUsize,
    },
}

/// Location of the Tag Genome data files
#[derive(clap::Args, Debug)]
struct DataArgs {
    /// Directory where the Tag Genome was extracted
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Movies file, relative to the data directory
    #[arg(long)]
    movies: Option<PathBuf>,

    /// Tags file, relative to the data directory
    #[arg(long)]
    tags: Option<PathBuf>,

    /// Tag relevance file, relative to the data directory
    #[arg(long)]
    tag_relevance: Option<PathBuf>,
}

/// Kind of table, as specified on the command line
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum KindArg {
    Tags,
    Movies,
}
//
impl From<KindArg> for TableKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Tags => Self::Tags,
            KindArg::Movies => Self::Movies,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging().map_err(|e| anyhow::format_err!("{e}"))?;

    // Decode CLI arguments
    let args = Args::parse_and_check()?;
    let config = Config::new(args, || prompt_kind().context("asking which table to use"))?;

    // Set up progress reporting
    let report = ProgressReport::new();

    // Carry out the requested operation
    match config {
        Config::Top {
            paths,
            kind,
            top_percent,
        } => {
            let table = load_table(&paths, kind, &report).await?;
            let top = table.top_percent(top_percent);
            print_table(&top).await
        }
        Config::Rerank { path, top_percent } => {
            let progress = LoadProgress::new(&report, 1);
            let table = tsv::exported(&path, Some(&progress))
                .await
                .context("loading exported table")?;
            let top = table.top_percent(top_percent);
            print_table(&top).await
        }
        Config::TagsFor {
            paths,
            title,
            count,
        } => print_tags_for(&paths, &title, count, &report).await,
    }
}

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Ask the user which kind of table should be used
fn prompt_kind() -> Result<TableKind> {
    let kinds = TableKind::ALL;
    let kind_names = kinds.iter().map(ToString::to_string).collect::<Vec<_>>();
    let kind_idx = FuzzySelect::new()
        .with_prompt("Which table should I filter?")
        .items(&kind_names)
        .default(0)
        .interact()?;
    Ok(kinds[kind_idx])
}

/// Load the data file associated with a kind of table
async fn load_table(
    paths: &DataPaths,
    kind: TableKind,
    report: &ProgressReport,
) -> Result<PopularityTable> {
    let progress = LoadProgress::new(report, 1);
    Ok(match kind {
        TableKind::Tags => tsv::tags(&paths.tags, Some(&progress))
            .await
            .context("loading tags")?
            .into(),
        TableKind::Movies => tsv::movies(&paths.movies, Some(&progress))
            .await
            .context("loading movies")?
            .into(),
    })
}

/// Display a popularity table
async fn print_table(table: &PopularityTable) -> Result<()> {
    tsv::write_exported(table, tokio::io::stdout())
        .await
        .context("writing table to stdout")
}

/// Display the tags that are most relevant to a movie
async fn print_tags_for(
    paths: &DataPaths,
    title: &str,
    count: NonZeroUsize,
    report: &ProgressReport,
) -> Result<()> {
    // Load the data files
    let progress = LoadProgress::new(report, 3);
    let (movies, tags, relevance) = tokio::try_join!(
        async {
            tsv::movies(&paths.movies, Some(&progress))
                .await
                .context("loading movies")
        },
        async {
            tsv::tags(&paths.tags, Some(&progress))
                .await
                .context("loading tags")
        },
        async {
            tsv::tag_relevance(&paths.tag_relevance, Some(&progress))
                .await
                .context("loading tag relevance")
        },
    )?;

    // Look up the movie, then its tags
    let movie = movies
        .get(title)
        .with_context(|| format!("failed to find a movie titled {title:?}"))?;
    log::debug!("Looking up the tags of {movie:?}");
    let top_tags = top::most_relevant_tags(movie, &tags, &relevance, count.get());

    // Display them
    let mut stdout = BufWriter::new(tokio::io::stdout());
    stdout.write_all(b"Tag\tRelevance\n").await?;
    for (tag, relevance) in top_tags {
        stdout
            .write_all(format!("{}\t{relevance}\n", tag.name).as_bytes())
            .await?;
    }
    stdout.flush().await?;
    Ok(())
}

/// Set up logging
fn setup_logging() -> syslog::Result<()> {
    syslog::init(
        syslog::Facility::LOG_USER,
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        None,
    )
}
