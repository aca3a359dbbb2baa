//! SQLite persistence for schedules.
//!
//! A schedule file holds a single-row `schedule` table carrying the period
//! and a `blocks` table of busy ranges in `block_id` order, all in the
//! textual range format. Two load paths exist: [`load_trusted`] takes the
//! stored blocks verbatim (the caller asserts the file already satisfies
//! the schedule invariants, e.g. because this program wrote it), while
//! [`load_validating`] replays every stored block through the normal
//! insertion path, correcting ordering and overlap problems on the way in.
//!
//! [`save`] replaces the destination's period and entire block table
//! inside one transaction; a failed save rolls back and leaves whatever
//! was persisted before untouched.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::{info, warn};

use crate::range::TimeRange;
use crate::schedule::Schedule;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to open schedule database `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("schedule database has no scheduling period")]
    MissingPeriod,
    #[error("malformed time range `{text}` in schedule database")]
    MalformedRange { text: String },
    #[error("stored block `{text}` does not overlap the scheduling period")]
    UnschedulableBlock { text: String },
    #[error("`{path}` exists and is not a regular file")]
    NotAFile { path: String },
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|source| {
        StoreError::Open {
            path: path.display().to_string(),
            source,
        }
    })
}

fn read_period(conn: &Connection) -> Result<TimeRange, StoreError> {
    let text: String = conn
        .query_row("SELECT period FROM schedule LIMIT 1", [], |row| row.get(0))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::MissingPeriod,
            other => StoreError::Sql(other),
        })?;
    if text.is_empty() {
        return Err(StoreError::MissingPeriod);
    }
    let period = TimeRange::parse(&text);
    if !period.is_valid() {
        return Err(StoreError::MalformedRange { text });
    }
    Ok(period)
}

// Block rows paired with their stored text so errors can name the
// offending row.
fn read_blocks(conn: &Connection) -> Result<Vec<(String, TimeRange)>, StoreError> {
    let mut stmt = conn.prepare("SELECT period FROM blocks ORDER BY block_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut blocks = Vec::new();
    for text in rows {
        let text = text?;
        let range = TimeRange::parse(&text);
        if text.is_empty() || !range.is_valid() {
            return Err(StoreError::MalformedRange { text });
        }
        blocks.push((text, range));
    }
    Ok(blocks)
}

/// Loads a schedule, taking the stored block list as-is.
///
/// No re-validation or re-coalescing happens: the source must already
/// satisfy the schedule invariants. Use [`load_validating`] for files of
/// uncertain provenance.
pub fn load_trusted(path: impl AsRef<Path>) -> Result<Schedule, StoreError> {
    let path = path.as_ref();
    let conn = open_read_only(path)?;
    let period = read_period(&conn)?;
    let blocks = read_blocks(&conn)?;
    info!(path = %path.display(), blocks = blocks.len(), "schedule loaded");
    Ok(Schedule::from_parts(
        period,
        blocks.into_iter().map(|(_, range)| range).collect(),
    ))
}

/// Loads a schedule by replaying every stored block through
/// [`Schedule::insert`].
///
/// Rows that are out of order, overlapping, or only partially inside the
/// period are corrected by the normal coalescing path. Fails on a
/// missing or malformed period, a malformed block, or a block that does
/// not overlap the period at all.
pub fn load_validating(path: impl AsRef<Path>) -> Result<Schedule, StoreError> {
    let path = path.as_ref();
    let conn = open_read_only(path)?;
    let period = read_period(&conn)?;
    let blocks = read_blocks(&conn)?;
    let stored = blocks.len();

    let mut schedule = Schedule::new(period);
    for (text, range) in blocks {
        if !schedule.insert(range) {
            return Err(StoreError::UnschedulableBlock { text });
        }
    }
    if schedule.block_count() != stored {
        warn!(
            path = %path.display(),
            stored,
            coalesced = schedule.block_count(),
            "stored blocks re-coalesced on load"
        );
    }
    info!(path = %path.display(), blocks = schedule.block_count(), "schedule loaded");
    Ok(schedule)
}

/// Saves the schedule to `path`, creating the file and schema when absent.
///
/// The period row and the entire block table are replaced in one
/// transaction; on failure the transaction rolls back, the destination
/// keeps its previous contents, and the error description is retrievable
/// through [`Schedule::last_error`]. A successful save clears it.
pub fn save(schedule: &mut Schedule, path: impl AsRef<Path>) -> Result<(), StoreError> {
    let path = path.as_ref();
    schedule.set_last_error(None);
    let result = write_schedule(schedule, path);
    if let Err(err) = &result {
        schedule.set_last_error(Some(err.to_string()));
    }
    result
}

fn init_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schedule (
             period   TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS blocks (
             block_id INTEGER PRIMARY KEY,
             period   TEXT UNIQUE NOT NULL
         );
        ",
    )?;
    // single-row table: seed a placeholder period on first creation
    let rows: i64 = conn.query_row("SELECT COUNT(*) FROM schedule", [], |row| row.get(0))?;
    if rows == 0 {
        conn.execute("INSERT INTO schedule (period) VALUES (':')", [])?;
    }
    Ok(())
}

fn write_schedule(schedule: &Schedule, path: &Path) -> Result<(), StoreError> {
    if let Ok(meta) = std::fs::metadata(path) {
        if !meta.is_file() {
            return Err(StoreError::NotAFile {
                path: path.display().to_string(),
            });
        }
    }
    let mut conn = Connection::open(path).map_err(|source| StoreError::Open {
        path: path.display().to_string(),
        source,
    })?;
    init_tables(&conn)?;

    let tx = conn.transaction()?;
    tx.execute("UPDATE schedule SET period = ?1", [schedule.period().to_string()])?;
    tx.execute("DELETE FROM blocks", [])?;
    {
        let mut stmt = tx.prepare("INSERT INTO blocks (period) VALUES (?1)")?;
        for block in schedule.blocks().iter() {
            stmt.execute([block.to_string()])?;
        }
    }
    // dropping an uncommitted transaction rolls everything back
    tx.commit()?;
    info!(path = %path.display(), blocks = schedule.block_count(), "schedule saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;

    fn tr(start: Timestamp, end: Timestamp) -> TimeRange {
        TimeRange::bounded(start, end)
    }

    const D0: Timestamp = 1_569_902_400;

    fn db_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("schedule.db")
    }

    #[test]
    fn save_then_trusted_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let mut schedule = Schedule::new(tr(D0, D0 + 9_999));
        assert!(schedule.insert(tr(D0, D0 + 99)));
        assert!(schedule.insert(tr(D0 + 200, D0 + 299)));
        save(&mut schedule, &path).unwrap();
        assert_eq!(schedule.last_error(), None);

        let loaded = load_trusted(&path).unwrap();
        assert_eq!(loaded.period(), schedule.period());
        assert_eq!(
            loaded.blocks().as_slice(),
            schedule.blocks().as_slice()
        );
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let mut first = Schedule::new(tr(D0, D0 + 9_999));
        assert!(first.insert(tr(D0, D0 + 99)));
        save(&mut first, &path).unwrap();

        let mut second = Schedule::new(tr(D0, D0 + 4_999));
        assert!(second.insert(tr(D0 + 500, D0 + 599)));
        save(&mut second, &path).unwrap();

        let loaded = load_trusted(&path).unwrap();
        assert_eq!(loaded.period(), &tr(D0, D0 + 4_999));
        assert_eq!(loaded.blocks().as_slice(), &[tr(D0 + 500, D0 + 599)]);
    }

    #[test]
    fn validating_load_corrects_disordered_and_overlapping_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path).unwrap();
        init_tables(&conn).unwrap();
        let period = tr(D0, D0 + 9_999);
        conn.execute("UPDATE schedule SET period = ?1", [period.to_string()])
            .unwrap();
        for block in [
            tr(D0 + 500, D0 + 599),
            tr(D0, D0 + 99),
            tr(D0 + 550, D0 + 649),
            // partially outside: clipped on the way in
            tr(D0 + 9_000, D0 + 20_000),
        ] {
            conn.execute("INSERT INTO blocks (period) VALUES (?1)", [block.to_string()])
                .unwrap();
        }
        drop(conn);

        let loaded = load_validating(&path).unwrap();
        assert_eq!(loaded.period(), &period);
        assert_eq!(
            loaded.blocks().as_slice(),
            &[
                tr(D0, D0 + 99),
                tr(D0 + 500, D0 + 649),
                tr(D0 + 9_000, D0 + 9_999)
            ]
        );
    }

    #[test]
    fn validating_load_rejects_a_block_outside_the_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path).unwrap();
        init_tables(&conn).unwrap();
        conn.execute(
            "UPDATE schedule SET period = ?1",
            [tr(D0, D0 + 999).to_string()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO blocks (period) VALUES (?1)",
            [tr(D0 + 5_000, D0 + 5_999).to_string()],
        )
        .unwrap();
        drop(conn);

        assert!(matches!(
            load_validating(&path),
            Err(StoreError::UnschedulableBlock { .. })
        ));
    }

    #[test]
    fn malformed_rows_fail_both_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path).unwrap();
        init_tables(&conn).unwrap();
        conn.execute("UPDATE schedule SET period = ?1", [tr(D0, D0 + 999).to_string()])
            .unwrap();
        conn.execute("INSERT INTO blocks (period) VALUES ('potato:')", [])
            .unwrap();
        drop(conn);

        assert!(matches!(
            load_trusted(&path),
            Err(StoreError::MalformedRange { .. })
        ));
        assert!(matches!(
            load_validating(&path),
            Err(StoreError::MalformedRange { .. })
        ));
    }

    #[test]
    fn missing_period_row_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE schedule ( period TEXT NOT NULL );
             CREATE TABLE blocks ( block_id INTEGER PRIMARY KEY, period TEXT UNIQUE NOT NULL );",
        )
        .unwrap();
        drop(conn);

        assert!(matches!(load_trusted(&path), Err(StoreError::MissingPeriod)));
    }

    #[test]
    fn loading_a_missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_trusted(dir.path().join("nope.db")),
            Err(StoreError::Open { .. })
        ));
    }

    #[test]
    fn saving_onto_a_directory_fails_and_records_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut schedule = Schedule::new(tr(D0, D0 + 999));
        let result = save(&mut schedule, dir.path());
        assert!(matches!(result, Err(StoreError::NotAFile { .. })));
        assert!(schedule.last_error().unwrap().contains("not a regular file"));
    }

    #[test]
    fn failed_save_rolls_back_to_the_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        // a schema whose block table rejects every insert
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE schedule ( period TEXT NOT NULL );
             CREATE TABLE blocks (
                 block_id INTEGER PRIMARY KEY,
                 period   TEXT UNIQUE NOT NULL CHECK (period = 'never')
             );",
        )
        .unwrap();
        let old_period = tr(D0, D0 + 999);
        conn.execute("INSERT INTO schedule (period) VALUES (?1)", [old_period.to_string()])
            .unwrap();
        drop(conn);

        let mut schedule = Schedule::new(tr(D0, D0 + 4_999));
        assert!(schedule.insert(tr(D0, D0 + 99)));
        assert!(save(&mut schedule, &path).is_err());
        assert!(schedule.last_error().is_some());

        // the old period row survived the failed replacement
        let conn = Connection::open(&path).unwrap();
        let stored: String = conn
            .query_row("SELECT period FROM schedule LIMIT 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, old_period.to_string());
        let blocks: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(blocks, 0);
    }

    #[test]
    fn successful_save_clears_a_stale_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut schedule = Schedule::new(tr(D0, D0 + 999));
        assert!(save(&mut schedule, dir.path()).is_err());
        assert!(schedule.last_error().is_some());

        save(&mut schedule, db_path(&dir)).unwrap();
        assert_eq!(schedule.last_error(), None);
    }
}
