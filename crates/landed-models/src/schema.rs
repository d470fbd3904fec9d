//! SQLite schema shared by the engine (reader/writer) and `landed-loader`.
//!
//! Decimals are stored as TEXT so no precision is lost. Dates are stored as
//! `YYYY-MM-DD`; timestamps as RFC 3339 in UTC with second precision, so that
//! lexical order matches chronological order.

pub const STORE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS countries (
    alpha2          TEXT PRIMARY KEY,
    alpha3          TEXT NOT NULL,
    name            TEXT NOT NULL,
    vat_rate        TEXT,
    currency_code   TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_countries_alpha3 ON countries(alpha3);
CREATE INDEX IF NOT EXISTS idx_countries_name ON countries(name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS tariff_rates (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    classification_code  TEXT NOT NULL,
    importing_country    TEXT NOT NULL,
    exporting_country    TEXT NOT NULL,
    year                 INTEGER,
    ad_valorem_rate      TEXT NOT NULL,
    specific_rate        TEXT,
    unit_basis           TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tariff_rates_key
    ON tariff_rates(classification_code, importing_country, exporting_country, year);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tariff_rates_any_year_key
    ON tariff_rates(classification_code, importing_country, exporting_country)
    WHERE year IS NULL;
CREATE INDEX IF NOT EXISTS idx_tariff_rates_corridor
    ON tariff_rates(classification_code, importing_country, exporting_country);

CREATE TABLE IF NOT EXISTS shipping_rates (
    importing_country  TEXT NOT NULL,
    exporting_country  TEXT NOT NULL,
    air_rate_per_kg    TEXT,
    sea_rate_per_kg    TEXT,
    PRIMARY KEY (importing_country, exporting_country)
);

CREATE TABLE IF NOT EXISTS exchange_rates (
    from_currency  TEXT NOT NULL,
    to_currency    TEXT NOT NULL,
    rate_date      TEXT NOT NULL,
    rate           TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    PRIMARY KEY (from_currency, to_currency, rate_date)
);

CREATE TABLE IF NOT EXISTS news_articles (
    url              TEXT PRIMARY KEY,
    title            TEXT NOT NULL,
    description      TEXT,
    source           TEXT,
    published_at     TEXT NOT NULL,
    sentiment_score  REAL,
    keywords         TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_news_published ON news_articles(published_at);

CREATE TABLE IF NOT EXISTS sentiment_analysis (
    week_start         TEXT PRIMARY KEY,
    week_end           TEXT NOT NULL,
    average_sentiment  REAL NOT NULL,
    article_count      INTEGER NOT NULL,
    positive_count     INTEGER NOT NULL,
    negative_count     INTEGER NOT NULL,
    neutral_count      INTEGER NOT NULL,
    trend              TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sentiment_week_end ON sentiment_analysis(week_end);
";

/// Tables created by [`STORE_DDL`].
pub const TABLES: &[&str] = &[
    "countries",
    "tariff_rates",
    "shipping_rates",
    "exchange_rates",
    "news_articles",
    "sentiment_analysis",
];
