use chrono::{DateTime, NaiveDate, Utc};
use landed_models::{NewsArticle, SentimentAnalysis, SentimentTrend};
use rusqlite::Row;

use crate::error::StoreError;
use crate::store::{now_text, timestamp_at, timestamp_text, Store};

const ARTICLE_COLUMNS: &str =
    "url, title, description, source, published_at, sentiment_score, keywords";

const SENTIMENT_COLUMNS: &str = "week_start, week_end, average_sentiment, article_count, \
                                 positive_count, negative_count, neutral_count, trend";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<(NewsArticle, String)> {
    let keywords_json: String = row.get(6)?;
    Ok((
        NewsArticle {
            url: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            source: row.get(3)?,
            published_at: timestamp_at(row, 4)?,
            sentiment_score: row.get(5)?,
            keywords: Vec::new(),
        },
        keywords_json,
    ))
}

fn with_keywords((mut article, keywords_json): (NewsArticle, String)) -> Result<NewsArticle, StoreError> {
    if !keywords_json.is_empty() {
        article.keywords = serde_json::from_str(&keywords_json)?;
    }
    Ok(article)
}

fn sentiment_from_row(row: &Row<'_>) -> rusqlite::Result<SentimentAnalysis> {
    let trend: String = row.get(7)?;
    Ok(SentimentAnalysis {
        week_start: row.get(0)?,
        week_end: row.get(1)?,
        average_sentiment: row.get(2)?,
        article_count: row.get(3)?,
        positive_count: row.get(4)?,
        negative_count: row.get(5)?,
        neutral_count: row.get(6)?,
        trend: SentimentTrend::parse(&trend),
    })
}

impl Store {
    /// Insert an article, or refresh its content and score when the URL is known.
    pub fn upsert_article(&self, article: &NewsArticle) -> Result<(), StoreError> {
        let keywords = serde_json::to_string(&article.keywords)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO news_articles \
             (url, title, description, source, published_at, sentiment_score, keywords, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(url) DO UPDATE SET \
                title = excluded.title, description = excluded.description, \
                source = excluded.source, published_at = excluded.published_at, \
                sentiment_score = excluded.sentiment_score, keywords = excluded.keywords",
            rusqlite::params![
                article.url,
                article.title,
                article.description,
                article.source,
                timestamp_text(&article.published_at),
                article.sentiment_score,
                keywords,
                now_text(),
            ],
        )?;
        Ok(())
    }

    pub fn article_exists(&self, url: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM news_articles WHERE url = ?1)",
            rusqlite::params![url],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Articles with `start <= published_at <= end`, newest first.
    pub fn articles_published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<NewsArticle>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM news_articles \
             WHERE published_at >= ?1 AND published_at <= ?2 \
             ORDER BY published_at DESC"
        ))?;

        let raw = stmt
            .query_map(
                rusqlite::params![timestamp_text(&start), timestamp_text(&end)],
                article_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(with_keywords).collect()
    }

    /// Upsert the aggregate for a week, keyed by its start date.
    pub fn upsert_sentiment(&self, analysis: &SentimentAnalysis) -> Result<(), StoreError> {
        let now = now_text();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sentiment_analysis \
             (week_start, week_end, average_sentiment, article_count, positive_count, \
              negative_count, neutral_count, trend, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
             ON CONFLICT(week_start) DO UPDATE SET \
                week_end = excluded.week_end, average_sentiment = excluded.average_sentiment, \
                article_count = excluded.article_count, positive_count = excluded.positive_count, \
                negative_count = excluded.negative_count, neutral_count = excluded.neutral_count, \
                trend = excluded.trend, updated_at = excluded.updated_at",
            rusqlite::params![
                analysis.week_start,
                analysis.week_end,
                analysis.average_sentiment,
                analysis.article_count,
                analysis.positive_count,
                analysis.negative_count,
                analysis.neutral_count,
                analysis.trend.as_str(),
                now,
            ],
        )?;
        Ok(())
    }

    pub fn sentiment_for_week(
        &self,
        week_start: NaiveDate,
    ) -> Result<Option<SentimentAnalysis>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SENTIMENT_COLUMNS} FROM sentiment_analysis WHERE week_start = ?1"
        ))?;

        match stmt.query_row(rusqlite::params![week_start], sentiment_from_row) {
            Ok(analysis) => Ok(Some(analysis)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// The aggregate with the greatest week end.
    pub fn latest_sentiment(&self) -> Result<Option<SentimentAnalysis>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SENTIMENT_COLUMNS} FROM sentiment_analysis \
             ORDER BY week_end DESC LIMIT 1"
        ))?;

        match stmt.query_row([], sentiment_from_row) {
            Ok(analysis) => Ok(Some(analysis)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Aggregates for weeks starting on or after `since`, oldest first.
    pub fn sentiment_since(&self, since: NaiveDate) -> Result<Vec<SentimentAnalysis>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SENTIMENT_COLUMNS} FROM sentiment_analysis \
             WHERE week_start >= ?1 ORDER BY week_start ASC"
        ))?;

        let rows = stmt
            .query_map(rusqlite::params![since], sentiment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn article(url: &str, published_at: DateTime<Utc>, score: Option<f64>) -> NewsArticle {
        NewsArticle {
            url: url.to_string(),
            title: format!("Headline {url}"),
            description: Some("Tariff talks continue".to_string()),
            source: Some("Wire".to_string()),
            published_at,
            sentiment_score: score,
            keywords: vec!["tariff".to_string()],
        }
    }

    fn week(start: NaiveDate, average: f64, trend: SentimentTrend) -> SentimentAnalysis {
        SentimentAnalysis {
            week_start: start,
            week_end: start + Duration::days(6),
            average_sentiment: average,
            article_count: 10,
            positive_count: 5,
            negative_count: 2,
            neutral_count: 3,
            trend,
        }
    }

    #[test]
    fn upsert_article_refreshes_score() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_article(&article("https://a", now, None)).unwrap();
        store
            .upsert_article(&article("https://a", now, Some(0.5)))
            .unwrap();

        assert_eq!(store.row_count("news_articles").unwrap(), 1);
        assert!(store.article_exists("https://a").unwrap());
        let stored = store
            .articles_published_between(now - Duration::hours(1), now + Duration::hours(1))
            .unwrap();
        assert_eq!(stored[0].sentiment_score, Some(0.5));
        assert_eq!(stored[0].keywords, vec!["tariff".to_string()]);
    }

    #[test]
    fn published_window_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .upsert_article(&article("https://old", now - Duration::days(10), Some(0.1)))
            .unwrap();
        store
            .upsert_article(&article("https://mid", now - Duration::days(2), Some(0.2)))
            .unwrap();
        store
            .upsert_article(&article("https://new", now - Duration::hours(3), Some(0.3)))
            .unwrap();

        let urls: Vec<String> = store
            .articles_published_between(now - Duration::days(7), now)
            .unwrap()
            .into_iter()
            .map(|a| a.url)
            .collect();
        assert_eq!(urls, vec!["https://new", "https://mid"]);
    }

    #[test]
    fn sentiment_upsert_overwrites_week() {
        let store = Store::open_in_memory().unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        store
            .upsert_sentiment(&week(monday, 0.1, SentimentTrend::Stable))
            .unwrap();
        store
            .upsert_sentiment(&week(monday, 0.4, SentimentTrend::Improving))
            .unwrap();

        assert_eq!(store.row_count("sentiment_analysis").unwrap(), 1);
        let stored = store.sentiment_for_week(monday).unwrap().unwrap();
        assert_eq!(stored.average_sentiment, 0.4);
        assert_eq!(stored.trend, SentimentTrend::Improving);
    }

    #[test]
    fn latest_and_history() {
        let store = Store::open_in_memory().unwrap();
        let first = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        for i in 0..4 {
            store
                .upsert_sentiment(&week(
                    first + Duration::weeks(i),
                    0.1 * i as f64,
                    SentimentTrend::Stable,
                ))
                .unwrap();
        }

        let latest = store.latest_sentiment().unwrap().unwrap();
        assert_eq!(latest.week_start, first + Duration::weeks(3));

        let history = store.sentiment_since(first + Duration::weeks(2)).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].week_start < history[1].week_start);
    }

    #[test]
    fn empty_sentiment_table() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.latest_sentiment().unwrap().is_none());
        assert!(store
            .sentiment_since(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap()
            .is_empty());
    }
}
