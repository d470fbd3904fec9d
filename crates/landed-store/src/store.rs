use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use landed_models::schema::{STORE_DDL, TABLES};
use landed_models::ReferenceData;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::error::StoreError;

/// SQLite-backed persistence for reference data, tariff schedules,
/// exchange rates, news articles and weekly sentiment.
///
/// `rusqlite::Connection` is not `Sync`, so access is serialized through a
/// `Mutex`. Every write is a single statement (or one transaction for
/// [`Store::seed`]), which keeps each logical unit atomic.
pub struct Store {
    conn: Mutex<Connection>,
}

/// Row counts written by [`Store::seed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub countries: usize,
    pub tariff_rates: usize,
    pub shipping_rates: usize,
    pub exchange_rates: usize,
}

impl Store {
    /// Open (or create) the database file. Creates the schema and enables WAL
    /// so the loader daemon can write while the CLI reads.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(STORE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(STORE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }

    /// Load a reference data bundle in a single transaction.
    pub fn seed(&self, data: &ReferenceData) -> Result<SeedSummary, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for country in &data.countries {
            crate::countries::upsert_country_with(&tx, country)?;
        }
        for rate in &data.tariff_rates {
            crate::tariffs::upsert_tariff_rate_with(&tx, rate)?;
        }
        for rate in &data.shipping_rates {
            crate::tariffs::upsert_shipping_rate_with(&tx, rate)?;
        }
        for rate in &data.exchange_rates {
            crate::rates::upsert_exchange_rate_with(&tx, rate)?;
        }
        tx.commit()?;

        let summary = SeedSummary {
            countries: data.countries.len(),
            tariff_rates: data.tariff_rates.len(),
            shipping_rates: data.shipping_rates.len(),
            exchange_rates: data.exchange_rates.len(),
        };
        tracing::info!(
            countries = summary.countries,
            tariff_rates = summary.tariff_rates,
            shipping_rates = summary.shipping_rates,
            exchange_rates = summary.exchange_rates,
            "Reference data seeded"
        );
        Ok(summary)
    }

    /// Number of rows in one of the schema's tables.
    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        if !TABLES.contains(&table) {
            return Err(StoreError::UnknownTable(table.to_string()));
        }
        let conn = self.conn()?;
        let count: usize =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

pub(crate) fn now_text() -> String {
    timestamp_text(&Utc::now())
}

pub(crate) fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        Decimal::from_str(&t)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
