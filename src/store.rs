//! Observation store and forecast sink.
//!
//! The engine consumes these two narrow interfaces; the SQLite adapter
//! implements both over a single connection, matching the deployed schema
//! (`btc_daily` / `oil_daily` source tables, `predictions` output table).

use crate::buffer::JointObservation;
use crate::engine::ForecastStep;
use crate::error::ForecastError;
use crate::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

/// Supplies ordered historical joint observations.
pub trait ObservationStore {
    /// Fetch at least `min_count` joint observations, ascending by date.
    ///
    /// Only dates present in both source series qualify. Fails with
    /// [`ForecastError::InsufficientHistory`] when fewer exist.
    fn fetch_recent_joint(&self, min_count: usize) -> Result<Vec<JointObservation>>;
}

/// Persists a forecast batch, replacing prior contents.
pub trait ForecastSink {
    /// Atomically replace the stored batch with `batch`.
    ///
    /// Either the entire prior batch is replaced by the entire new batch,
    /// or neither changes.
    fn replace_batch(&mut self, batch: &[ForecastStep]) -> Result<()>;
}

const CREATE_PREDICTIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    prediction_bitcoin REAL NOT NULL,
    prediction_oil REAL NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// SQLite-backed observation store and forecast sink.
pub struct SqliteForecastDb {
    conn: Connection,
}

impl SqliteForecastDb {
    /// Open the database file and bootstrap the predictions table.
    ///
    /// The connection is released when the value is dropped, on every exit
    /// path including failures.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Wrap an existing connection (in-memory databases in tests).
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(CREATE_PREDICTIONS_TABLE, [])?;
        Ok(Self { conn })
    }

    /// Read back the currently stored batch, ascending by date.
    pub fn stored_batch(&self) -> Result<Vec<ForecastStep>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, prediction_bitcoin, prediction_oil
             FROM predictions
             ORDER BY date ASC",
        )?;
        let steps = stmt
            .query_map([], |row| {
                Ok(ForecastStep {
                    date: row.get(0)?,
                    predicted_btc: row.get(1)?,
                    predicted_oil: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(steps)
    }
}

impl ObservationStore for SqliteForecastDb {
    fn fetch_recent_joint(&self, min_count: usize) -> Result<Vec<JointObservation>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.date, b.value, o.value
             FROM btc_daily b
             INNER JOIN oil_daily o ON b.date = o.date
             ORDER BY b.date DESC
             LIMIT ?",
        )?;
        let rows = stmt
            .query_map(params![min_count as i64], |row| {
                Ok(JointObservation {
                    date: row.get::<_, NaiveDate>(0)?,
                    btc_price: row.get(1)?,
                    oil_price: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.len() < min_count {
            return Err(ForecastError::InsufficientHistory {
                have: rows.len(),
                need: min_count,
            });
        }

        // Fetched newest-first for the LIMIT; reverse to chronological order.
        let mut observations = rows;
        observations.reverse();
        Ok(observations)
    }
}

impl ForecastSink for SqliteForecastDb {
    fn replace_batch(&mut self, batch: &[ForecastStep]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM predictions", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO predictions (date, prediction_bitcoin, prediction_oil)
                 VALUES (?1, ?2, ?3)",
            )?;
            for step in batch {
                insert.execute(params![step.date, step.predicted_btc, step.predicted_oil])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn db_with_history(btc: &[(u32, f64)], oil: &[(u32, f64)]) -> SqliteForecastDb {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE btc_daily (date TEXT NOT NULL, value REAL NOT NULL);
             CREATE TABLE oil_daily (date TEXT NOT NULL, value REAL NOT NULL);",
        )
        .unwrap();
        for &(day, value) in btc {
            conn.execute(
                "INSERT INTO btc_daily (date, value) VALUES (?1, ?2)",
                params![date(day), value],
            )
            .unwrap();
        }
        for &(day, value) in oil {
            conn.execute(
                "INSERT INTO oil_daily (date, value) VALUES (?1, ?2)",
                params![date(day), value],
            )
            .unwrap();
        }
        SqliteForecastDb::from_connection(conn).unwrap()
    }

    fn step(day: u32, btc: f64, oil: f64) -> ForecastStep {
        ForecastStep {
            date: date(day),
            predicted_btc: btc,
            predicted_oil: oil,
        }
    }

    #[test]
    fn test_fetch_joins_on_date() {
        // Oil is missing day 3, so day 3 must not appear.
        let db = db_with_history(
            &[(1, 100.0), (2, 101.0), (3, 102.0), (4, 103.0)],
            &[(1, 50.0), (2, 51.0), (4, 52.0)],
        );
        let observations = db.fetch_recent_joint(3).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].date, date(1));
        assert_eq!(observations[2].date, date(4));
        assert_eq!(observations[2].btc_price, 103.0);
        assert_eq!(observations[2].oil_price, 52.0);
    }

    #[test]
    fn test_fetch_ascending_and_limited() {
        let btc: Vec<_> = (1..=10).map(|d| (d, 100.0 + d as f64)).collect();
        let oil: Vec<_> = (1..=10).map(|d| (d, 50.0 + d as f64)).collect();
        let db = db_with_history(&btc, &oil);
        let observations = db.fetch_recent_joint(5).unwrap();
        assert_eq!(observations.len(), 5);
        // Most recent 5 days, oldest first.
        assert_eq!(observations[0].date, date(6));
        assert_eq!(observations[4].date, date(10));
    }

    #[test]
    fn test_fetch_insufficient_history() {
        let db = db_with_history(&[(1, 100.0), (2, 101.0)], &[(1, 50.0), (2, 51.0)]);
        let err = db.fetch_recent_joint(5).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory { have: 2, need: 5 }
        ));
    }

    #[test]
    fn test_replace_batch_roundtrip() {
        let mut db = db_with_history(&[], &[]);
        let first = vec![step(10, 100.0, 50.0), step(11, 101.0, 51.0)];
        db.replace_batch(&first).unwrap();
        assert_eq!(db.stored_batch().unwrap(), first);

        let second = vec![step(20, 200.0, 60.0)];
        db.replace_batch(&second).unwrap();
        assert_eq!(db.stored_batch().unwrap(), second);
    }

    #[test]
    fn test_replace_batch_empty_clears() {
        let mut db = db_with_history(&[], &[]);
        db.replace_batch(&[step(10, 100.0, 50.0)]).unwrap();
        db.replace_batch(&[]).unwrap();
        assert!(db.stored_batch().unwrap().is_empty());
    }

    #[test]
    fn test_replace_batch_is_atomic() {
        let mut db = db_with_history(&[], &[]);
        let prior = vec![step(10, 100.0, 50.0), step(11, 101.0, 51.0)];
        db.replace_batch(&prior).unwrap();

        // Duplicate date violates the UNIQUE constraint mid-insert; the
        // whole replace must roll back, leaving the prior batch intact.
        let broken = vec![step(20, 200.0, 60.0), step(20, 201.0, 61.0)];
        let err = db.replace_batch(&broken).unwrap_err();
        assert!(matches!(err, ForecastError::Storage(_)));
        assert_eq!(db.stored_batch().unwrap(), prior);
    }
}
