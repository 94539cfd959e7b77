use crate::models::UnifiedOffer;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use duckdb::{Connection, params};
use std::path::Path;
use tracing::info;

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
DROP TABLE IF EXISTS offers;

CREATE TABLE offers (
    id              VARCHAR PRIMARY KEY,
    agency          VARCHAR NOT NULL,
    title           VARCHAR NOT NULL DEFAULT '',
    destination     VARCHAR NOT NULL DEFAULT '',
    price_eur       DOUBLE,
    dates_start     DATE,
    dates_end       DATE,
    duration_days   BIGINT,
    link            VARCHAR NOT NULL DEFAULT '',
    -- Local timestamp text as written by the scrapers
    scraped_at      VARCHAR
);
"#;

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    /// Drop and recreate the offers table. The table is always rebuilt from
    /// the unified JSON, so there is nothing to migrate.
    pub fn recreate(&self) -> Result<()> {
        info!("Recreating offers table…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        Ok(())
    }

    /// Insert-or-replace by id in a single transaction.
    pub fn load_offers(&self, offers: &[UnifiedOffer]) -> Result<usize> {
        if offers.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT OR REPLACE INTO offers
                (id, agency, title, destination, price_eur,
                 dates_start, dates_end, duration_days, link, scraped_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        for o in offers {
            tx.execute(sql, params![
                o.id, o.agency, o.title, o.destination, o.price_eur,
                o.dates_start, o.dates_end, o.duration_days,
                o.link, o.scraped_at,
            ]).with_context(|| format!("insert offer {} ({})", o.id, o.agency))?;
        }

        tx.commit()?;
        Ok(offers.len())
    }

    pub fn offer_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM offers")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    /// Offers per agency, largest first.
    pub fn agency_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT agency, COUNT(*) AS n FROM offers GROUP BY agency ORDER BY n DESC, agency",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Earliest start and latest end over all dated offers.
    pub fn date_range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let mut s = self.conn.prepare(
            "SELECT MIN(dates_start), MAX(COALESCE(dates_end, dates_start)) FROM offers",
        )?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(id: &str, agency: &str, start: Option<(i32, u32, u32)>, end: Option<(i32, u32, u32)>) -> UnifiedOffer {
        let date = |t: Option<(i32, u32, u32)>| t.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        UnifiedOffer {
            id: id.into(),
            agency: agency.into(),
            title: format!("Оферта {}", id),
            destination: "Greece".into(),
            price_eur: Some(420.5),
            dates_start: date(start),
            dates_end: date(end),
            duration_days: Some(7),
            link: format!("https://example.bg/{}", id),
            scraped_at: "2026-01-01T10:00:00".into(),
        }
    }

    #[test]
    fn test_recreate_and_load() {
        let repo = Repository::open_in_memory().unwrap();
        repo.recreate().unwrap();
        assert_eq!(repo.offer_count().unwrap(), 0);
        assert_eq!(repo.date_range().unwrap(), (None, None));

        let offers = vec![
            offer("a", "Bohemia", Some((2026, 3, 5)), Some((2026, 3, 9))),
            offer("b", "Bohemia", Some((2026, 6, 1)), None),
            offer("c", "Teztour", None, None),
        ];
        assert_eq!(repo.load_offers(&offers).unwrap(), 3);
        assert_eq!(repo.offer_count().unwrap(), 3);
        assert_eq!(
            repo.agency_counts().unwrap(),
            vec![("Bohemia".to_string(), 2), ("Teztour".to_string(), 1)]
        );
        assert_eq!(
            repo.date_range().unwrap(),
            (NaiveDate::from_ymd_opt(2026, 3, 5), NaiveDate::from_ymd_opt(2026, 6, 1))
        );
    }

    #[test]
    fn test_load_replaces_by_id() {
        let repo = Repository::open_in_memory().unwrap();
        repo.recreate().unwrap();
        repo.load_offers(&[offer("a", "Bohemia", None, None)]).unwrap();
        repo.load_offers(&[offer("a", "Aventura", None, None)]).unwrap();
        assert_eq!(repo.offer_count().unwrap(), 1);
        assert_eq!(repo.agency_counts().unwrap(), vec![("Aventura".to_string(), 1)]);
        assert_eq!(repo.load_offers(&[]).unwrap(), 0);
    }

    #[test]
    fn test_recreate_drops_previous_rows() {
        let repo = Repository::open_in_memory().unwrap();
        repo.recreate().unwrap();
        repo.load_offers(&[offer("a", "Bohemia", None, None)]).unwrap();
        repo.recreate().unwrap();
        assert_eq!(repo.offer_count().unwrap(), 0);
    }
}
