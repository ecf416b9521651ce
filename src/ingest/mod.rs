//! Offline ingestion: newline-delimited JSON datasets into the score store.
//!
//! Two dataset shapes share one accumulator and one commit step:
//! - combined rows `{uid, category, target, score}`
//! - a points file `{point_uid, category}` plus a scores file
//!   `{point_uid, target, score}`
//!
//! A run either commits every record in one store transaction or returns an
//! error with the store untouched.

mod accumulator;
pub mod error;
mod rows;


pub use accumulator::PointAccumulator;
pub use error::{IngestError, IngestResult};
pub use rows::{CombinedRow, PointRow, ScoreRow};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::constants::POINTS_COLLECTION;
use crate::storage::ScoreStoreWriter;
use rows::for_each_row;

/// Input to an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    /// One file of combined rows.
    Combined { path: PathBuf },
    /// A points file declaring UIDs, then a scores file referencing them.
    Split { points: PathBuf, scores: PathBuf },
}

impl Dataset {
    pub fn combined(path: impl Into<PathBuf>) -> Self {
        Self::Combined { path: path.into() }
    }

    pub fn split(points: impl Into<PathBuf>, scores: impl Into<PathBuf>) -> Self {
        Self::Split {
            points: points.into(),
            scores: scores.into(),
        }
    }

    /// Reads every input file and folds its rows.
    pub fn accumulate(&self) -> IngestResult<PointAccumulator> {
        let mut acc = PointAccumulator::new();

        match self {
            Self::Combined { path } => {
                read_combined(open(path)?, path, &mut acc)?;
            }
            Self::Split { points, scores } => {
                read_points(open(points)?, points, &mut acc)?;
                read_scores(open(scores)?, scores, &mut acc)?;
            }
        }

        Ok(acc)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Distinct points written.
    pub points: usize,
    /// `(target, score)` pairs written.
    pub scores: usize,
}

fn open(path: &Path) -> IngestResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| IngestError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Folds combined rows from `reader`; `source` names the input in errors.
pub fn read_combined(
    reader: impl BufRead,
    source: &Path,
    acc: &mut PointAccumulator,
) -> IngestResult<usize> {
    let rows = for_each_row(reader, source, |row: CombinedRow| acc.add_combined(row))?;
    debug!(source = %source.display(), rows, "Read combined rows");
    Ok(rows)
}

/// Folds point declarations from `reader`.
pub fn read_points(
    reader: impl BufRead,
    source: &Path,
    acc: &mut PointAccumulator,
) -> IngestResult<usize> {
    let rows = for_each_row(reader, source, |row: PointRow| acc.add_point(row))?;
    debug!(source = %source.display(), rows, "Read point rows");
    Ok(rows)
}

/// Folds score rows from `reader`; every UID must already be declared.
pub fn read_scores(
    reader: impl BufRead,
    source: &Path,
    acc: &mut PointAccumulator,
) -> IngestResult<usize> {
    let rows = for_each_row(reader, source, |row: ScoreRow| acc.add_score_row(row))?;
    debug!(source = %source.display(), rows, "Read score rows");
    Ok(rows)
}

/// Writes every accumulated record in one transaction.
///
/// Records whose UID already exists in the store under another category are
/// rejected before anything is staged.
pub fn commit(acc: PointAccumulator, store: &mut ScoreStoreWriter) -> IngestResult<IngestReport> {
    for (uid, record) in acc.records() {
        if let Some(existing) = store.get(uid)?
            && existing.category != record.category
        {
            return Err(IngestError::ConflictingCategory {
                uid: uid.to_string(),
                expected: existing.category,
                actual: record.category.clone(),
            });
        }
    }

    let report = IngestReport {
        points: acc.len(),
        scores: acc.score_count(),
    };

    let mut txn = store.begin();
    for (uid, record) in acc.records() {
        txn.put(uid, record)?;
    }
    txn.commit()?;

    Ok(report)
}

/// Loads `dataset` into the default collection of the store at `db_path`.
pub fn ingest(dataset: &Dataset, db_path: &Path) -> IngestResult<IngestReport> {
    ingest_collection(dataset, db_path, POINTS_COLLECTION)
}

/// Loads `dataset` into `collection` of the store at `db_path`.
#[instrument(skip_all, fields(db_path = %db_path.display(), collection = %collection))]
pub fn ingest_collection(
    dataset: &Dataset,
    db_path: &Path,
    collection: &str,
) -> IngestResult<IngestReport> {
    let acc = dataset.accumulate()?;
    let mut store = ScoreStoreWriter::open_collection(db_path, collection)?;
    let report = commit(acc, &mut store)?;

    info!(
        points = report.points,
        scores = report.scores,
        "Ingestion committed"
    );

    Ok(report)
}
