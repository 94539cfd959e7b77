//! Batch date enrichment for offers whose listing card only shows a duration.
//!
//! Each batch first tries plain HTTP for every offer concurrently; offers that
//! come back without dates are retried in headless Chrome, at most
//! `browser_concurrency` at a time.

pub mod dates;

use crate::config::{EnrichConfig, ScraperConfig};
use crate::models::RawOffer;
use crate::scraper::browser::BrowserSession;
use crate::scraper::cleaner::fmt_dmy;
use crate::scraper::http_client::HttpClient;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, error, info, warn};

use self::dates::{bounds, extract_all_dates, extract_ratesdata_dates, rates_dates, script_candidates};

const BOHEMIA_BASE: &str = "https://www.bohemia.bg";

const DATE_TABS: [&str; 9] = [
    "Свободни дати",
    "Дати и цени",
    "дати и цени",
    "Дати на отпътуване",
    "дати на отпътуване",
    "Дати",
    "дати",
    "Цени",
    "цени",
];

type DateRange = (NaiveDate, NaiveDate);

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EnrichStats {
    pub total: usize,
    pub via_http: usize,
    pub via_browser: usize,
}

impl EnrichStats {
    pub fn enriched(&self) -> usize {
        self.via_http + self.via_browser
    }
}

pub struct DateEnricher {
    client: Arc<HttpClient>,
    config: EnrichConfig,
    user_agent: String,
    browser: OnceCell<BrowserSession>,
    browser_slots: Arc<Semaphore>,
}

impl DateEnricher {
    pub fn new(scraper: &ScraperConfig, config: &EnrichConfig) -> Result<Self> {
        Ok(Self {
            client: Arc::new(HttpClient::new(scraper)?),
            config: config.clone(),
            user_agent: scraper.user_agent.clone(),
            browser: OnceCell::new(),
            browser_slots: Arc::new(Semaphore::new(config.browser_concurrency.max(1))),
        })
    }

    /// Replace `dates` with "first - last" wherever a detail page yields dates.
    pub async fn enrich_offers_with_dates(&self, offers: &mut [RawOffer]) -> EnrichStats {
        let total = offers.len();
        let batch_size = self.config.batch_size.max(1);
        let total_batches = total.div_ceil(batch_size);
        let started = Instant::now();
        let mut stats = EnrichStats {
            total,
            ..Default::default()
        };

        info!("Enriching {} offers with dates (batch size {})", total, batch_size);

        for (n, batch) in offers.chunks_mut(batch_size).enumerate() {
            let batch_started = Instant::now();
            let urls: Vec<String> = batch.iter().map(|o| o.link.clone()).collect();

            let http_results = self.http_batch(&urls).await;
            let mut need_browser = Vec::new();
            let mut http_ok = 0;
            for (idx, result) in http_results.into_iter().enumerate() {
                match result {
                    Some(range) => {
                        apply_range(&mut batch[idx], range);
                        http_ok += 1;
                    }
                    None => need_browser.push(idx),
                }
            }

            let mut browser_ok = 0;
            if !need_browser.is_empty() {
                debug!("Browser fallback for {} offers", need_browser.len());
                let fallback_urls: Vec<String> =
                    need_browser.iter().map(|&i| urls[i].clone()).collect();
                for (i, result) in need_browser.into_iter().zip(self.browser_batch(&fallback_urls).await) {
                    if let Some(range) = result {
                        apply_range(&mut batch[i], range);
                        browser_ok += 1;
                    }
                }
            }

            stats.via_http += http_ok;
            stats.via_browser += browser_ok;
            info!(
                "Batch {}/{} complete: {}+{}={}/{} offers got dates ({:.1?}), {} enriched so far",
                n + 1,
                total_batches,
                http_ok,
                browser_ok,
                http_ok + browser_ok,
                batch.len(),
                batch_started.elapsed(),
                stats.enriched(),
            );

            tokio::time::sleep(Duration::from_millis(self.config.batch_pause_ms)).await;
        }

        info!(
            "Date enrichment complete: {}/{} offers in {:.1?}",
            stats.enriched(),
            total,
            started.elapsed()
        );
        stats
    }

    async fn http_batch(&self, urls: &[String]) -> Vec<Option<DateRange>> {
        let timeout = Duration::from_secs(self.config.http_timeout_secs);
        let dot_mmdd = self.config.dot_mmdd;

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let client = Arc::clone(&self.client);
                let url = url.clone();
                tokio::spawn(async move {
                    // page plus up to five scripts
                    tokio::time::timeout(timeout * 3, dates_via_http(&client, &url, timeout, dot_mmdd))
                        .await
                        .context("Date lookup timed out")?
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (url, handle) in urls.iter().zip(handles) {
            results.push(match handle.await {
                Ok(Ok(range)) => range,
                Ok(Err(e)) => {
                    debug!("HTTP dates failed for {}: {:#}", url, e);
                    None
                }
                Err(e) => {
                    error!("Task panic for {}: {}", url, e);
                    None
                }
            });
        }
        results
    }

    async fn browser_batch(&self, urls: &[String]) -> Vec<Option<DateRange>> {
        let session = match self
            .browser
            .get_or_try_init(|| async {
                let ua = self.user_agent.clone();
                tokio::task::spawn_blocking(move || BrowserSession::launch(&ua))
                    .await
                    .context("Browser launch panicked")?
            })
            .await
        {
            Ok(s) => s.clone(),
            Err(e) => {
                warn!("Browser fallback unavailable: {:#}", e);
                return vec![None; urls.len()];
            }
        };

        let dot_mmdd = self.config.dot_mmdd;
        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let session = session.clone();
                let sem = Arc::clone(&self.browser_slots);
                let url = url.clone();
                tokio::spawn(async move {
                    let _permit = sem.acquire_owned().await?;
                    tokio::task::spawn_blocking(move || dates_via_browser(&session, &url, dot_mmdd))
                        .await
                        .context("Browser task panicked")?
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (url, handle) in urls.iter().zip(handles) {
            results.push(match handle.await {
                Ok(Ok(range)) => range,
                Ok(Err(e)) => {
                    debug!("Browser dates failed for {}: {:#}", url, e);
                    None
                }
                Err(e) => {
                    error!("Task panic for {}: {}", url, e);
                    None
                }
            });
        }
        results
    }
}

fn apply_range(offer: &mut RawOffer, (first, last): DateRange) {
    offer.dates = format!("{} - {}", fmt_dmy(first), fmt_dmy(last));
}

/// HTTP path: inline RATESDATA, then candidate scripts, then a generic scan
/// of each script.
pub async fn dates_via_http(
    client: &HttpClient,
    url: &str,
    timeout: Duration,
    dot_mmdd: bool,
) -> Result<Option<DateRange>> {
    let html = client.get_text_quick(url, timeout).await?;

    let inline = extract_ratesdata_dates(&html, dot_mmdd);
    if let Some(range) = bounds(&inline) {
        return Ok(Some(range));
    }

    let script_timeout = timeout.min(Duration::from_secs(5));
    for js_url in script_candidates(&html, url, BOHEMIA_BASE) {
        let js = match client.get_text_quick(&js_url, script_timeout).await {
            Ok(js) => js,
            Err(e) => {
                debug!("Script {} skipped: {:#}", js_url, e);
                continue;
            }
        };
        let from_rates = extract_ratesdata_dates(&js, dot_mmdd);
        if let Some(range) = bounds(&from_rates) {
            return Ok(Some(range));
        }
        if let Some(range) = bounds(&extract_all_dates(&js, dot_mmdd)) {
            return Ok(Some(range));
        }
    }

    Ok(None)
}

/// Browser path: open the date tab, wait for `window.RATESDATA`, then fall
/// back to scanning the rendered HTML and the visible text.
pub fn dates_via_browser(
    session: &BrowserSession,
    url: &str,
    dot_mmdd: bool,
) -> Result<Option<DateRange>> {
    let tab = session.new_tab()?;
    let result = (|| -> Result<Option<DateRange>> {
        tab.set_default_timeout(Duration::from_secs(12));
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        if session.click_any_text(&tab, &DATE_TABS)? {
            thread::sleep(Duration::from_millis(400));
        }

        let deadline = Instant::now() + Duration::from_secs(6);
        let mut rates = Vec::new();
        while Instant::now() < deadline {
            let raw = session
                .evaluate_string(&tab, "JSON.stringify(window.RATESDATA || [])")?
                .unwrap_or_default();
            if let Ok(v) = serde_json::from_str::<Value>(&raw) {
                rates = rates_dates(&v, dot_mmdd);
            }
            if !rates.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(300));
        }
        if let Some(range) = bounds(&rates) {
            return Ok(Some(range));
        }

        let html = session.content(&tab)?;
        if let Some(range) = bounds(&extract_all_dates(&html, dot_mmdd)) {
            return Ok(Some(range));
        }

        let visible = session
            .evaluate_string(&tab, "document.body ? document.body.innerText : ''")?
            .unwrap_or_default();
        Ok(bounds(&extract_all_dates(&visible, dot_mmdd)))
    })();

    if let Err(e) = tab.close(true) {
        debug!("Tab close failed for {}: {}", url, e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_range_formats_day_first() {
        let mut offer = RawOffer::new("Виена", "https://www.bohemia.bg/x/");
        offer.dates = "4 дни".into();
        let first = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let last = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
        apply_range(&mut offer, (first, last));
        assert_eq!(offer.dates, "05.03.2026 - 20.11.2026");
    }

    #[test]
    fn test_stats_enriched() {
        let s = EnrichStats {
            total: 10,
            via_http: 6,
            via_browser: 2,
        };
        assert_eq!(s.enriched(), 8);
    }

    #[tokio::test]
    async fn test_unreachable_offers_keep_duration() {
        let scraper = ScraperConfig {
            timeout_secs: 1,
            ..ScraperConfig::default()
        };
        let enrich = EnrichConfig {
            http_timeout_secs: 1,
            batch_pause_ms: 0,
            browser_concurrency: 1,
            ..EnrichConfig::default()
        };
        let enricher = DateEnricher::new(&scraper, &enrich).unwrap();
        let client = HttpClient::new(&scraper).unwrap();
        let res = dates_via_http(&client, "http://127.0.0.1:9/offer", Duration::from_secs(1), false).await;
        assert!(res.is_err());

        let results = enricher.http_batch(&["http://127.0.0.1:9/a".to_string()]).await;
        assert_eq!(results, vec![None]);
    }
}
