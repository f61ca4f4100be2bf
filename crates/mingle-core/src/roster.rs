//! CSV roster reader.
//!
//! The first row names the columns. Only `id` is required; `first_name`,
//! `last_name`, `email`, `department` and `level` default to empty when the
//! column is absent. Rows that cannot be used are dropped without failing the
//! load:
//!
//! - rows with a different field count than the header,
//! - rows that do not deserialize (e.g. invalid UTF-8),
//! - rows whose `id` is blank.
//!
//! Record order follows file order.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info};

use crate::error::RosterError;
use crate::model::UserRecord;

/// Load a roster from a CSV file on disk.
///
/// # Errors
///
/// Returns [`RosterError::Open`] if the file cannot be opened, and otherwise
/// the same errors as [`read_roster`].
pub fn load_roster(path: &Path) -> Result<Vec<UserRecord>, RosterError> {
    let file = File::open(path).map_err(|source| RosterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_roster(BufReader::new(file))?;
    info!(path = %path.display(), records = records.len(), "roster loaded");
    Ok(records)
}

/// Read a roster from any CSV source.
///
/// # Errors
///
/// Returns [`RosterError::MissingColumn`] if the header has no `id` column and
/// [`RosterError::Csv`] if the header cannot be read or the source fails
/// mid-stream.
pub fn read_roster<R: Read>(source: R) -> Result<Vec<UserRecord>, RosterError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    if !reader.headers()?.iter().any(|column| column == "id") {
        return Err(RosterError::MissingColumn("id"));
    }

    let mut records = Vec::new();
    let mut skipped = 0_usize;

    for row in reader.deserialize::<UserRecord>() {
        let record = match row {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                skipped += 1;
                debug!(
                    line = err.position().map(csv::Position::line),
                    error = %err,
                    "skipping malformed roster row"
                );
                continue;
            }
        };

        if record.id.trim().is_empty() {
            skipped += 1;
            if !record.is_blank() {
                debug!(?record, "skipping roster row without an id");
            }
            continue;
        }

        records.push(record);
    }

    if skipped > 0 {
        debug!(skipped, kept = records.len(), "roster rows dropped");
    }
    Ok(records)
}
