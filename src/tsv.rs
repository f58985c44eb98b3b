//! Processing of the Tag Genome's tab-separated data files
//!
//! Data files have no header row and exactly three fields per row. Fields are
//! never quoted, so double quotes that appear inside of movie titles are kept
//! as-is.

use crate::{
    error::LoadError,
    progress::{ProgressConfig, ProgressReport, ProgressTracker, Work},
    records::{Movie, MovieRow, Tag, TagRelevance},
    table::{MovieTable, TagTable},
    top::{PopularityTable, TableKind},
    MovieId, RatingCount, TagId, TaggingCount, Year,
};
use csv_async::{AsyncReader, AsyncReaderBuilder};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::{io, path::Path};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter},
};
use tokio_util::io::InspectReader;

/// Number of fields in each row of a data file
pub const FIELDS_PER_ROW: usize = 3;

/// Progress tracking for a batch of data files being loaded
#[derive(Clone, Debug)]
pub struct LoadProgress {
    /// Number of data files that were opened
    opened: ProgressTracker,

    /// Number of bytes read from opened data files
    bytes: ProgressTracker,
}
//
impl LoadProgress {
    /// Prepare to load a certain number of data files
    pub fn new(report: &ProgressReport, num_files: usize) -> Self {
        let opened = report.add(
            "Opening data files",
            ProgressConfig::new(Work::Steps(num_files)).dont_show_rate(),
        );
        let bytes = report.add(
            "Loading data",
            ProgressConfig::new(Work::Bytes(0)).allow_adding_work(),
        );
        Self { opened, bytes }
    }

    /// Start tracking a newly opened data file of `len` bytes
    ///
    /// Returns the tracker of bytes read from this file, or `None` if more
    /// files were opened than announced in [`LoadProgress::new()`].
    fn track_file(&self, path: &Path, len: u64) -> Option<ProgressTracker> {
        if !self.bytes.add_work(len) {
            log::debug!(
                "Not tracking {}, more data files were opened than announced",
                path.display()
            );
            return None;
        }
        if self.opened.make_progress(1) {
            self.bytes.done_adding_work();
        }
        Some(self.bytes.clone())
    }
}

/// Open a data file, tracking how much of it has been read if requested
async fn open(
    path: &Path,
    progress: Option<&LoadProgress>,
) -> Result<impl AsyncRead + Unpin + Send, LoadError> {
    let error = |source| LoadError::Open {
        path: path.into(),
        source,
    };
    let file = File::open(path).await.map_err(error)?;
    let len = file.metadata().await.map_err(error)?.len();
    log::debug!("Opened {} ({len} bytes)", path.display());
    let bytes = progress.and_then(|progress| progress.track_file(path, len));
    Ok(InspectReader::new(file, move |chunk: &[u8]| {
        if let Some(bytes) = &bytes {
            bytes.make_progress(chunk.len() as u64);
        }
    }))
}

/// Load the movies from `movies.dat`
///
/// Reading progress is reported to `progress`, if specified.
pub async fn movies(
    path: &Path,
    progress: Option<&LoadProgress>,
) -> Result<MovieTable, LoadError> {
    read_movies(open(path, progress).await?, path).await
}

/// Load the tags from `tags.dat`
pub async fn tags(path: &Path, progress: Option<&LoadProgress>) -> Result<TagTable, LoadError> {
    read_tags(open(path, progress).await?, path).await
}

/// Load the tag relevance scores from `tag_relevance.dat`
pub async fn tag_relevance(
    path: &Path,
    progress: Option<&LoadProgress>,
) -> Result<Vec<TagRelevance>, LoadError> {
    read_tag_relevance(open(path, progress).await?, path).await
}

/// Load a popularity table that was previously saved by [`write_exported()`]
pub async fn exported(
    path: &Path,
    progress: Option<&LoadProgress>,
) -> Result<PopularityTable, LoadError> {
    read_exported(open(path, progress).await?, path).await
}

/// Read movies in `movies.dat` format
///
/// `origin` is only used for error reporting.
pub async fn read_movies(
    input: impl AsyncRead + Unpin + Send,
    origin: &Path,
) -> Result<MovieTable, LoadError> {
    let rows = read_rows::<MovieRow, _>(data_file_reader(input), FIELDS_PER_ROW, origin).await?;
    Ok(MovieTable::new(rows.into_iter().map(Movie::from).collect()))
}

/// Read tags in `tags.dat` format
///
/// `origin` is only used for error reporting.
pub async fn read_tags(
    input: impl AsyncRead + Unpin + Send,
    origin: &Path,
) -> Result<TagTable, LoadError> {
    let rows = read_rows::<Tag, _>(data_file_reader(input), FIELDS_PER_ROW, origin).await?;
    Ok(TagTable::new(rows))
}

/// Read tag relevance scores in `tag_relevance.dat` format
///
/// `origin` is only used for error reporting.
pub async fn read_tag_relevance(
    input: impl AsyncRead + Unpin + Send,
    origin: &Path,
) -> Result<Vec<TagRelevance>, LoadError> {
    read_rows(data_file_reader(input), FIELDS_PER_ROW, origin).await
}

/// Read a popularity table in the format of [`write_exported()`]
///
/// The kind of table is deduced from its number of data columns.
pub async fn read_exported(
    input: impl AsyncRead + Unpin + Send,
    origin: &Path,
) -> Result<PopularityTable, LoadError> {
    let mut reader = AsyncReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .create_reader(input);
    let num_fields = reader
        .headers()
        .await
        .map_err(|source| LoadError::Read {
            path: origin.into(),
            source,
        })?
        .len();
    // The first column is the lookup key, all others are data columns
    let kind = TableKind::from_column_count(num_fields.saturating_sub(1)).map_err(|source| {
        LoadError::Shape {
            path: origin.into(),
            source,
        }
    })?;
    log::debug!("Reading exported {kind} table from {}", origin.display());
    Ok(match kind {
        TableKind::Tags => {
            let rows = read_rows::<(Box<str>, TagId, TaggingCount), _>(reader, num_fields, origin)
                .await?;
            let tags = (rows.into_iter())
                .map(|(name, id, num_taggings)| Tag {
                    id,
                    name,
                    num_taggings,
                })
                .collect::<Vec<_>>();
            PopularityTable::Tags(tags.into())
        }
        TableKind::Movies => {
            let rows = read_rows::<(Box<str>, MovieId, RatingCount, Year), _>(
                reader, num_fields, origin,
            )
            .await?;
            let movies = (rows.into_iter())
                .map(|(title, id, num_ratings, release_year)| Movie {
                    id,
                    title,
                    release_year,
                    num_ratings,
                })
                .collect::<Vec<_>>();
            PopularityTable::Movies(movies.into())
        }
    })
}

/// Write down a popularity table as tab-separated values
///
/// A header row names the columns. The first column is the lookup key, and
/// the next ones are the data columns.
pub async fn write_exported(
    table: &PopularityTable,
    output: impl AsyncWrite + Unpin,
) -> io::Result<()> {
    let kind = table.kind();
    let mut output = BufWriter::new(output);
    let header = std::iter::once(kind.key_column())
        .chain(kind.data_columns().iter().copied())
        .collect::<Vec<_>>()
        .join("\t");
    output.write_all(header.as_bytes()).await?;
    output.write_all(b"\n").await?;
    for (key, data) in table.export_rows() {
        output.write_all(key.as_bytes()).await?;
        for value in data {
            output.write_all(format!("\t{value}").as_bytes()).await?;
        }
        output.write_all(b"\n").await?;
    }
    output.flush().await
}

/// Set up a reader for a headerless data file
fn data_file_reader<R: AsyncRead + Unpin + Send>(input: R) -> AsyncReader<R> {
    AsyncReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .create_reader(input)
}

/// Read and decode all remaining rows, which must have `num_fields` fields
async fn read_rows<Row, R>(
    reader: AsyncReader<R>,
    num_fields: usize,
    origin: &Path,
) -> Result<Vec<Row>, LoadError>
where
    Row: DeserializeOwned,
    R: AsyncRead + Unpin + Send,
{
    let mut rows = Vec::new();
    let mut records = reader.into_records();
    while let Some(record) = records.next().await {
        let record = record.map_err(|source| LoadError::Read {
            path: origin.into(),
            source,
        })?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let parse_error = |reason| LoadError::Parse {
            path: origin.into(),
            line,
            reason,
        };
        if record.len() != num_fields {
            return Err(parse_error(format!(
                "expected {num_fields} tab-separated fields, found {}",
                record.len()
            )));
        }
        let row = record.deserialize(None).map_err(|error| {
            parse_error(match error.kind() {
                csv_async::ErrorKind::Deserialize { err, .. } => err.to_string(),
                _ => error.to_string(),
            })
        })?;
        rows.push(row);
    }
    log::debug!("Read {} rows from {}", rows.len(), origin.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn movies_are_parsed() {
        let input = b"1\tToy Story (1995)\t1234\n2\tUntitled Short\t5\n3\t\"Great Performances\" Cats (1998)\t10\n";
        let movies = read_movies(&input[..], Path::new("movies.dat")).await.unwrap();
        assert_eq!(movies.len(), 3);
        assert_eq!(
            movies.get("Toy Story"),
            Some(&Movie {
                id: 1,
                title: "Toy Story".into(),
                release_year: 1995,
                num_ratings: 1234,
            })
        );
        let untitled = movies.get("Untitled Short").unwrap();
        assert_eq!((untitled.id, untitled.release_year, untitled.num_ratings), (2, 0, 5));
        let cats = movies.get("\"Great Performances\" Cats").unwrap();
        assert_eq!(cats.release_year, 1998);
    }

    #[tokio::test]
    async fn tags_are_parsed() {
        let input = b"7\tfunny\t42\n8\tbased on a book\t1001\n";
        let tags = read_tags(&input[..], Path::new("tags.dat")).await.unwrap();
        assert_eq!(
            tags.rows(),
            &[
                Tag {
                    id: 7,
                    name: "funny".into(),
                    num_taggings: 42,
                },
                Tag {
                    id: 8,
                    name: "based on a book".into(),
                    num_taggings: 1001,
                },
            ]
        );
        assert_eq!(tags.get("funny").map(|tag| tag.num_taggings), Some(42));
    }

    #[tokio::test]
    async fn tag_relevance_is_parsed_verbatim() {
        let input = b"1\t1\t0.025\n1\t2\t0.97500\n";
        let relevance = read_tag_relevance(&input[..], Path::new("tag_relevance.dat"))
            .await
            .unwrap();
        assert_eq!(
            relevance,
            vec![
                TagRelevance {
                    movie_id: 1,
                    tag_id: 1,
                    relevance: 0.025,
                },
                TagRelevance {
                    movie_id: 1,
                    tag_id: 2,
                    relevance: 0.975,
                },
            ]
        );
    }

    #[tokio::test]
    async fn empty_files_give_empty_tables() {
        let tags = read_tags(&b""[..], Path::new("tags.dat")).await.unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn non_numeric_field_reports_line() {
        let input = b"1\tHeat (1995)\t3\nx\tCasino (1995)\t4\n";
        let error = read_movies(&input[..], Path::new("movies.dat"))
            .await
            .unwrap_err();
        match error {
            LoadError::Parse { path, line, .. } => {
                assert_eq!(path, PathBuf::from("movies.dat"));
                assert_eq!(line, 2);
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_field_count_reports_line() {
        let input = b"7\tfunny\n";
        let error = read_tags(&input[..], Path::new("tags.dat")).await.unwrap_err();
        assert!(matches!(error, LoadError::Parse { line: 1, .. }));
        assert!(error.to_string().contains("expected 3 tab-separated fields, found 2"));
    }

    #[tokio::test]
    async fn missing_file_cannot_be_opened() {
        let progress = LoadProgress::new(&ProgressReport::hidden(), 1);
        let error = movies(Path::new("/nonexistent/movies.dat"), Some(&progress))
            .await
            .unwrap_err();
        match error {
            LoadError::Open { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("expected an open error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exported_tables_can_be_read_back() {
        let input = b"1\tToy Story (1995)\t1234\n2\tHeat (1995)\t4321\n";
        let movies = read_movies(&input[..], Path::new("movies.dat")).await.unwrap();
        let table = PopularityTable::from(movies);
        let mut exported = Vec::new();
        write_exported(&table, &mut exported).await.unwrap();
        assert_eq!(
            String::from_utf8(exported.clone()).unwrap(),
            "Title\tMovieID\tNumRatings\tReleaseYear\nToy Story\t1\t1234\t1995\nHeat\t2\t4321\t1995\n"
        );
        let read_back = read_exported(&exported[..], Path::new("top.tsv"))
            .await
            .unwrap();
        assert_eq!(read_back, table);
    }

    #[tokio::test]
    async fn exported_table_kind_follows_column_count() {
        let input = b"Tag\tTagID\tNumTaggings\nfunny\t7\t42\n";
        let table = read_exported(&input[..], Path::new("top.tsv")).await.unwrap();
        assert_eq!(table.kind(), TableKind::Tags);
        assert_eq!(table.len(), 1);

        let input = b"Key\tA\tB\tC\tD\nx\t1\t2\t3\t4\n";
        let error = read_exported(&input[..], Path::new("top.tsv"))
            .await
            .unwrap_err();
        match error {
            LoadError::Shape { source, .. } => {
                assert_eq!(source.columns, 4);
                assert!(source
                    .to_string()
                    .starts_with("pass either a tags table or a movies table"));
            }
            other => panic!("expected a shape error, got {other:?}"),
        }
    }

    /// Write a data file in a scratch location that is unique to this test
    async fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mltg-{}-{name}", std::process::id()));
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn files_beyond_announced_count_still_load() {
        let movies_path = scratch_file("extra-movies.dat", b"1\tToy Story (1995)\t1234\n").await;
        let tags_path = scratch_file("extra-tags.dat", b"7\tfunny\t42\n8\tdark\t3\n").await;
        let progress = LoadProgress::new(&ProgressReport::hidden(), 1);
        let loaded_movies = movies(&movies_path, Some(&progress)).await.unwrap();
        let loaded_tags = tags(&tags_path, Some(&progress)).await.unwrap();
        let loaded_again = movies(&movies_path, Some(&progress)).await.unwrap();
        assert_eq!(loaded_movies.len(), 1);
        assert_eq!(loaded_tags.len(), 2);
        assert_eq!(loaded_again, loaded_movies);
        for path in [movies_path, tags_path] {
            tokio::fs::remove_file(path).await.unwrap();
        }
    }

    #[tokio::test]
    async fn files_load_without_progress_tracking() {
        let path = scratch_file("untracked-relevance.dat", b"1\t7\t0.5\n").await;
        let relevance = tag_relevance(&path, None).await.unwrap();
        assert_eq!(relevance.len(), 1);
        assert_eq!(relevance[0].relevance, 0.5);
        tokio::fs::remove_file(path).await.unwrap();
    }
}
