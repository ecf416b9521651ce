//! Row shapes of the newline-delimited JSON datasets.

use std::io::BufRead;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::error::{IngestError, IngestResult};

/// One row of a combined dataset: a point, its category, and one target score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombinedRow {
    #[serde(alias = "point_uid")]
    pub uid: String,
    pub category: String,
    pub target: String,
    pub score: f32,
}

/// Declares a point and its category (split datasets).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointRow {
    #[serde(alias = "uid")]
    pub point_uid: String,
    pub category: String,
}

/// Attaches a target score to a declared point (split datasets).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreRow {
    #[serde(alias = "uid")]
    pub point_uid: String,
    pub target: String,
    pub score: f32,
}

/// Row-level checks that serde cannot express.
pub(crate) trait Row: DeserializeOwned {
    fn check(&self) -> Result<(), String>;
}

fn check_uid(uid: &str) -> Result<(), String> {
    if uid.trim().is_empty() {
        return Err("empty point UID".to_string());
    }
    Ok(())
}

fn check_score(score: f32) -> Result<(), String> {
    if !score.is_finite() {
        return Err(format!("score {} is not finite", score));
    }
    Ok(())
}

impl Row for CombinedRow {
    fn check(&self) -> Result<(), String> {
        check_uid(&self.uid)?;
        check_score(self.score)
    }
}

impl Row for PointRow {
    fn check(&self) -> Result<(), String> {
        check_uid(&self.point_uid)
    }
}

impl Row for ScoreRow {
    fn check(&self) -> Result<(), String> {
        check_uid(&self.point_uid)?;
        check_score(self.score)
    }
}

/// Parses `reader` line by line, calling `f` for every non-blank row.
///
/// Errors name `source` and the 1-based line number. Returns the row count.
pub(crate) fn for_each_row<T, R, F>(reader: R, source: &Path, mut f: F) -> IngestResult<usize>
where
    T: Row,
    R: BufRead,
    F: FnMut(T) -> IngestResult<()>,
{
    let mut rows = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| IngestError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let row: T = serde_json::from_str(&line).map_err(|e| IngestError::Parse {
            path: source.to_path_buf(),
            line: line_no,
            message: e.to_string(),
        })?;

        row.check().map_err(|reason| IngestError::Malformed {
            path: source.to_path_buf(),
            line: line_no,
            reason,
        })?;

        f(row)?;
        rows += 1;
    }

    Ok(rows)
}
