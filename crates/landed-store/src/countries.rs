use landed_models::Country;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::directory::CountryDirectory;
use crate::error::StoreError;
use crate::store::{optional_decimal_at, Store};

const COUNTRY_COLUMNS: &str = "alpha2, alpha3, name, vat_rate, currency_code";

fn country_from_row(row: &Row<'_>) -> rusqlite::Result<Country> {
    Ok(Country {
        alpha2: row.get(0)?,
        alpha3: row.get(1)?,
        name: row.get(2)?,
        vat_rate: optional_decimal_at(row, 3)?,
        currency_code: row.get(4)?,
    })
}

pub(crate) fn upsert_country_with(conn: &Connection, country: &Country) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO countries (alpha2, alpha3, name, vat_rate, currency_code) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(alpha2) DO UPDATE SET \
            alpha3 = excluded.alpha3, name = excluded.name, \
            vat_rate = excluded.vat_rate, currency_code = excluded.currency_code",
        rusqlite::params![
            country.alpha2.to_uppercase(),
            country.alpha3.to_uppercase(),
            country.name,
            country.vat_rate.map(|v| v.to_string()),
            country.currency_code.as_ref().map(|c| c.to_uppercase()),
        ],
    )?;
    Ok(())
}

impl Store {
    pub fn upsert_country(&self, country: &Country) -> Result<(), StoreError> {
        let conn = self.conn()?;
        upsert_country_with(&conn, country)
    }

    fn query_country(&self, filter: &str, value: &str) -> Result<Option<Country>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COUNTRY_COLUMNS} FROM countries WHERE {filter} LIMIT 1"
        ))?;
        let country = stmt
            .query_row(rusqlite::params![value], country_from_row)
            .optional()?;
        Ok(country)
    }
}

impl CountryDirectory for Store {
    fn find_by_alpha2(&self, code: &str) -> Result<Option<Country>, StoreError> {
        self.query_country("alpha2 = ?1", &code.to_uppercase())
    }

    fn find_by_alpha3(&self, code: &str) -> Result<Option<Country>, StoreError> {
        self.query_country("alpha3 = ?1", &code.to_uppercase())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Country>, StoreError> {
        self.query_country("name = ?1 COLLATE NOCASE", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_country(&Country {
                alpha2: "SG".to_string(),
                alpha3: "SGP".to_string(),
                name: "Singapore".to_string(),
                vat_rate: Some(dec!(9)),
                currency_code: Some("SGD".to_string()),
            })
            .unwrap();
        store
            .upsert_country(&Country {
                alpha2: "us".to_string(),
                alpha3: "usa".to_string(),
                name: "United States".to_string(),
                vat_rate: None,
                currency_code: Some("usd".to_string()),
            })
            .unwrap();
        store
    }

    #[test]
    fn codes_are_stored_uppercase() {
        let store = seeded_store();
        let us = store.find_by_alpha2("US").unwrap().unwrap();
        assert_eq!(us.alpha3, "USA");
        assert_eq!(us.currency_code.as_deref(), Some("USD"));
        assert!(us.vat_rate.is_none());
    }

    #[test]
    fn lookups_by_each_key() {
        let store = seeded_store();
        assert_eq!(store.find_by_alpha2("sg").unwrap().unwrap().name, "Singapore");
        assert_eq!(store.find_by_alpha3("SGP").unwrap().unwrap().alpha2, "SG");
        assert_eq!(
            store.find_by_name("united states").unwrap().unwrap().alpha2,
            "US"
        );
        assert!(store.find_by_name("Atlantis").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_reference_fields() {
        let store = seeded_store();
        store
            .upsert_country(&Country {
                alpha2: "SG".to_string(),
                alpha3: "SGP".to_string(),
                name: "Singapore".to_string(),
                vat_rate: Some(dec!(10)),
                currency_code: Some("SGD".to_string()),
            })
            .unwrap();
        assert_eq!(
            store.find_by_alpha2("SG").unwrap().unwrap().vat_rate,
            Some(dec!(10))
        );
        assert_eq!(store.row_count("countries").unwrap(), 2);
    }

    #[test]
    fn vat_rate_and_currency_helpers() {
        let store = seeded_store();
        assert_eq!(store.vat_rate("SG").unwrap(), Some(dec!(9)));
        assert_eq!(store.vat_rate("US").unwrap(), None);
        assert_eq!(store.currency_code("US").unwrap().as_deref(), Some("USD"));
        assert_eq!(store.currency_code("XX").unwrap(), None);
    }
}
