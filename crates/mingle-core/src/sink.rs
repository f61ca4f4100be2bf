//! CSV writer for the topic × group assignment.
//!
//! One row per roster record, in roster order:
//!
//! ```text
//! userId,sessionId for topic 1,sessionId for topic 2
//! u1,2,1
//! u2,1,3
//! ```
//!
//! Session ids are 1-based group indices. A record missing from a topic gets
//! an empty cell.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::allocate::Allocation;
use crate::error::SinkError;
use crate::model::UserRecord;

/// Header row for a run with `topic_count` topics.
#[must_use]
pub fn header_row(topic_count: usize) -> Vec<String> {
    std::iter::once("userId".to_string())
        .chain((1..=topic_count).map(|topic| format!("sessionId for topic {topic}")))
        .collect()
}

/// Write the assignment matrix to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`SinkError::Create`] if the file cannot be created, and otherwise
/// the same errors as [`render_assignments`].
pub fn write_assignments(
    path: &Path,
    roster: &[UserRecord],
    topics: &[Allocation],
) -> Result<(), SinkError> {
    let file = File::create(path).map_err(|source| SinkError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    render_assignments(BufWriter::new(file), roster, topics)?;
    info!(path = %path.display(), rows = roster.len(), topics = topics.len(), "assignments written");
    Ok(())
}

/// Encode the assignment matrix as CSV into `out`.
///
/// # Errors
///
/// Returns [`SinkError::Csv`] if a row cannot be written and
/// [`SinkError::Io`] if the final flush fails.
pub fn render_assignments<W: Write>(
    out: W,
    roster: &[UserRecord],
    topics: &[Allocation],
) -> Result<(), SinkError> {
    let sessions: Vec<Vec<Option<usize>>> = topics
        .iter()
        .map(|topic| session_lookup(roster.len(), topic))
        .collect();

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(header_row(topics.len()))?;

    for (idx, record) in roster.iter().enumerate() {
        let row = std::iter::once(record.id.clone()).chain(
            sessions
                .iter()
                .map(|lookup| lookup[idx].map_or_else(String::new, |group| (group + 1).to_string())),
        );
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Map each roster position to its group index within one topic.
fn session_lookup(roster_len: usize, topic: &Allocation) -> Vec<Option<usize>> {
    let mut lookup = vec![None; roster_len];
    for (group_idx, group) in topic.groups.iter().enumerate() {
        for &member in group.members() {
            if let Some(slot) = lookup.get_mut(member) {
                *slot = Some(group_idx);
            }
        }
    }
    lookup
}
