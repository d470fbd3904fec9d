use chrono::NaiveDate;
use landed_models::ExchangeRate;
use rusqlite::{Connection, Row};

use crate::error::StoreError;
use crate::store::{decimal_at, now_text, Store};

fn exchange_rate_from_row(row: &Row<'_>) -> rusqlite::Result<ExchangeRate> {
    Ok(ExchangeRate {
        from_currency: row.get(0)?,
        to_currency: row.get(1)?,
        rate: decimal_at(row, 2)?,
        rate_date: row.get(3)?,
    })
}

pub(crate) fn upsert_exchange_rate_with(
    conn: &Connection,
    rate: &ExchangeRate,
) -> Result<(), StoreError> {
    let now = now_text();
    conn.execute(
        "INSERT INTO exchange_rates \
         (from_currency, to_currency, rate_date, rate, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT(from_currency, to_currency, rate_date) \
         DO UPDATE SET rate = excluded.rate, updated_at = excluded.updated_at",
        rusqlite::params![
            rate.from_currency.to_uppercase(),
            rate.to_currency.to_uppercase(),
            rate.rate_date,
            rate.rate.to_string(),
            now,
        ],
    )?;
    Ok(())
}

impl Store {
    /// Insert the rate, or update it when the pair already has a row for that date.
    pub fn upsert_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), StoreError> {
        let conn = self.conn()?;
        upsert_exchange_rate_with(&conn, rate)
    }

    /// The row with the most recent date for the pair.
    pub fn latest_exchange_rate(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Option<ExchangeRate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT from_currency, to_currency, rate, rate_date FROM exchange_rates \
             WHERE from_currency = ?1 AND to_currency = ?2 \
             ORDER BY rate_date DESC LIMIT 1",
        )?;

        match stmt.query_row(rusqlite::params![from, to], exchange_rate_from_row) {
            Ok(rate) => Ok(Some(rate)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Rates for the pair with `start <= date <= end`, oldest first.
    pub fn exchange_rates_between(
        &self,
        from: &str,
        to: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExchangeRate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT from_currency, to_currency, rate, rate_date FROM exchange_rates \
             WHERE from_currency = ?1 AND to_currency = ?2 \
               AND rate_date >= ?3 AND rate_date <= ?4 \
             ORDER BY rate_date ASC",
        )?;

        let rows = stmt
            .query_map(
                rusqlite::params![from, to, start, end],
                exchange_rate_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn exchange_rate_exists(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM exchange_rates \
             WHERE from_currency = ?1 AND to_currency = ?2 AND rate_date = ?3)",
            rusqlite::params![from, to, date],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn usd_sgd(date: NaiveDate, rate: Decimal) -> ExchangeRate {
        ExchangeRate {
            from_currency: "USD".to_string(),
            to_currency: "SGD".to_string(),
            rate,
            rate_date: date,
        }
    }

    #[test]
    fn upsert_updates_same_date() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_exchange_rate(&usd_sgd(day(3), dec!(1.34))).unwrap();
        store.upsert_exchange_rate(&usd_sgd(day(3), dec!(1.35))).unwrap();

        assert_eq!(store.row_count("exchange_rates").unwrap(), 1);
        let latest = store.latest_exchange_rate("USD", "SGD").unwrap().unwrap();
        assert_eq!(latest.rate, dec!(1.35));
    }

    #[test]
    fn latest_is_most_recent_date() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_exchange_rate(&usd_sgd(day(10), dec!(1.36))).unwrap();
        store.upsert_exchange_rate(&usd_sgd(day(3), dec!(1.34))).unwrap();

        let latest = store.latest_exchange_rate("USD", "SGD").unwrap().unwrap();
        assert_eq!(latest.rate_date, day(10));
        assert!(store.latest_exchange_rate("SGD", "USD").unwrap().is_none());
    }

    #[test]
    fn window_is_inclusive_and_ascending() {
        let store = Store::open_in_memory().unwrap();
        for (d, r) in [(1, dec!(1.30)), (15, dec!(1.32)), (5, dec!(1.31)), (20, dec!(1.33))] {
            store.upsert_exchange_rate(&usd_sgd(day(d), r)).unwrap();
        }

        let window = store
            .exchange_rates_between("USD", "SGD", day(5), day(15))
            .unwrap();
        let dates: Vec<NaiveDate> = window.iter().map(|r| r.rate_date).collect();
        assert_eq!(dates, vec![day(5), day(15)]);
    }

    #[test]
    fn exists_by_date() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_exchange_rate(&usd_sgd(day(3), dec!(1.34))).unwrap();
        assert!(store.exchange_rate_exists("USD", "SGD", day(3)).unwrap());
        assert!(!store.exchange_rate_exists("USD", "SGD", day(4)).unwrap());
    }
}
