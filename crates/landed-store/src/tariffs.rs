use landed_models::{ShippingRate, TariffRate, UnitBasis};
use rusqlite::{Connection, Row};

use crate::error::StoreError;
use crate::store::{decimal_at, now_text, optional_decimal_at, Store};

const TARIFF_COLUMNS: &str = "classification_code, importing_country, exporting_country, year, \
                              ad_valorem_rate, specific_rate, unit_basis";

fn tariff_from_row(row: &Row<'_>) -> rusqlite::Result<TariffRate> {
    let unit_basis: Option<String> = row.get(6)?;
    Ok(TariffRate {
        classification_code: row.get(0)?,
        importing_country: row.get(1)?,
        exporting_country: row.get(2)?,
        year: row.get(3)?,
        ad_valorem_rate: decimal_at(row, 4)?,
        specific_rate: optional_decimal_at(row, 5)?,
        unit_basis: unit_basis.as_deref().and_then(UnitBasis::parse),
    })
}

fn tariff_params(rate: &TariffRate) -> (String, String, String) {
    (
        rate.classification_code.clone(),
        rate.importing_country.to_uppercase(),
        rate.exporting_country.to_uppercase(),
    )
}

/// NULL years never collide in `idx_tariff_rates_key`, so a year-less rate is
/// updated in place first and only inserted when no row matched.
pub(crate) fn upsert_tariff_rate_with(
    conn: &Connection,
    rate: &TariffRate,
) -> Result<(), StoreError> {
    let (code, importer, exporter) = tariff_params(rate);
    let now = now_text();
    let ad_valorem = rate.ad_valorem_rate.to_string();
    let specific = rate.specific_rate.map(|v| v.to_string());
    let unit_basis = rate.unit_basis.map(|u| u.as_str());

    if rate.year.is_none() {
        let updated = conn.execute(
            "UPDATE tariff_rates \
             SET ad_valorem_rate = ?4, specific_rate = ?5, unit_basis = ?6, updated_at = ?7 \
             WHERE classification_code = ?1 AND importing_country = ?2 \
               AND exporting_country = ?3 AND year IS NULL",
            rusqlite::params![code, importer, exporter, ad_valorem, specific, unit_basis, now],
        )?;
        if updated > 0 {
            return Ok(());
        }
    }

    conn.execute(
        "INSERT INTO tariff_rates \
         (classification_code, importing_country, exporting_country, year, \
          ad_valorem_rate, specific_rate, unit_basis, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
         ON CONFLICT(classification_code, importing_country, exporting_country, year) \
         DO UPDATE SET ad_valorem_rate = excluded.ad_valorem_rate, \
                       specific_rate = excluded.specific_rate, \
                       unit_basis = excluded.unit_basis, \
                       updated_at = excluded.updated_at",
        rusqlite::params![
            code,
            importer,
            exporter,
            rate.year,
            ad_valorem,
            specific,
            unit_basis,
            now,
        ],
    )?;
    Ok(())
}

pub(crate) fn upsert_shipping_rate_with(
    conn: &Connection,
    rate: &ShippingRate,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO shipping_rates \
         (importing_country, exporting_country, air_rate_per_kg, sea_rate_per_kg) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(importing_country, exporting_country) \
         DO UPDATE SET air_rate_per_kg = excluded.air_rate_per_kg, \
                       sea_rate_per_kg = excluded.sea_rate_per_kg",
        rusqlite::params![
            rate.importing_country.to_uppercase(),
            rate.exporting_country.to_uppercase(),
            rate.air_rate_per_kg.map(|v| v.to_string()),
            rate.sea_rate_per_kg.map(|v| v.to_string()),
        ],
    )?;
    Ok(())
}

impl Store {
    /// Exact match on (code, importer, exporter, year).
    pub fn find_tariff_rate(
        &self,
        code: &str,
        importer: &str,
        exporter: &str,
        year: i32,
    ) -> Result<Option<TariffRate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TARIFF_COLUMNS} FROM tariff_rates \
             WHERE classification_code = ?1 AND importing_country = ?2 \
               AND exporting_country = ?3 AND year = ?4"
        ))?;

        match stmt.query_row(
            rusqlite::params![code, importer, exporter, year],
            tariff_from_row,
        ) {
            Ok(rate) => Ok(Some(rate)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Every stored year for a corridor, most recent year first and
    /// year-less rows last.
    pub fn tariff_rates_for_corridor(
        &self,
        code: &str,
        importer: &str,
        exporter: &str,
    ) -> Result<Vec<TariffRate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TARIFF_COLUMNS} FROM tariff_rates \
             WHERE classification_code = ?1 AND importing_country = ?2 \
               AND exporting_country = ?3 \
             ORDER BY year IS NULL, year DESC, id ASC"
        ))?;

        let rows = stmt
            .query_map(rusqlite::params![code, importer, exporter], tariff_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn tariff_rate_exists(
        &self,
        code: &str,
        importer: &str,
        exporter: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tariff_rates \
             WHERE classification_code = ?1 AND importing_country = ?2 AND exporting_country = ?3)",
            rusqlite::params![code, importer, exporter],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Plain insert. Fails if the full key already exists.
    pub fn insert_tariff_rate(&self, rate: &TariffRate) -> Result<(), StoreError> {
        let (code, importer, exporter) = tariff_params(rate);
        let now = now_text();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tariff_rates \
             (classification_code, importing_country, exporting_country, year, \
              ad_valorem_rate, specific_rate, unit_basis, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                code,
                importer,
                exporter,
                rate.year,
                rate.ad_valorem_rate.to_string(),
                rate.specific_rate.map(|v| v.to_string()),
                rate.unit_basis.map(|u| u.as_str()),
                now,
            ],
        )?;
        Ok(())
    }

    /// Insert, or update the rate values when the key already exists.
    pub fn upsert_tariff_rate(&self, rate: &TariffRate) -> Result<(), StoreError> {
        let conn = self.conn()?;
        upsert_tariff_rate_with(&conn, rate)
    }

    pub fn find_shipping_rate(
        &self,
        importer: &str,
        exporter: &str,
    ) -> Result<Option<ShippingRate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT importing_country, exporting_country, air_rate_per_kg, sea_rate_per_kg \
             FROM shipping_rates WHERE importing_country = ?1 AND exporting_country = ?2",
        )?;

        match stmt.query_row(rusqlite::params![importer, exporter], |row| {
            Ok(ShippingRate {
                importing_country: row.get(0)?,
                exporting_country: row.get(1)?,
                air_rate_per_kg: optional_decimal_at(row, 2)?,
                sea_rate_per_kg: optional_decimal_at(row, 3)?,
            })
        }) {
            Ok(rate) => Ok(Some(rate)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    pub fn upsert_shipping_rate(&self, rate: &ShippingRate) -> Result<(), StoreError> {
        let conn = self.conn()?;
        upsert_shipping_rate_with(&conn, rate)
    }
}
