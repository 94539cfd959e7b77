//! bohemia.bg: discover destination pages, then read the `a.offer-browser-item`
//! cards on each. Listings load more cards on scroll, so they are rendered in
//! a headless browser when one is available and fetched over HTTP otherwise.
//! Cards only show a duration; real dates come from [`crate::enrich`].

use super::browser::BrowserSession;
use super::cleaner::{absolute_url, element_text, limit_reached, sel};
use super::http_client::HttpClient;
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Html;
use std::time::Duration;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://www.bohemia.bg";
const DESTINATIONS_URL: &str = "https://www.bohemia.bg/Направления/";
const HOT_OFFERS: (&str, &str) = ("Горещи Оферти", "https://www.bohemia.bg/Горещи-Оферти/");

const DESTINATION_SELECTORS: [&str; 4] = [
    r#"a[href*="/Направления/"]"#,
    r#"a[href*="направления"]"#,
    "div.destination a",
    r#"a[class*="destination"]"#,
];

const OFFER_CARD: &str = "a.offer-browser-item";
const RENDER_TIMEOUT: Duration = Duration::from_secs(30);
const SCROLL_PAUSE: Duration = Duration::from_secs(1);
const MAX_SCROLLS: usize = 3;

const DURATION_WORDS: [&str; 3] = ["дни", "ден", "нощувки"];
const MAX_SUBTITLE_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub name: String,
    pub url: String,
}

pub struct BohemiaScraper {
    client: HttpClient,
    config: ScraperConfig,
}

impl BohemiaScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            config: config.clone(),
        })
    }

    async fn discover_destinations(&self) -> Vec<Destination> {
        let html = match self.client.get_text(DESTINATIONS_URL).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Bohemia: destination discovery failed: {:#}", e);
                return Vec::new();
            }
        };
        match parse_destinations(&html) {
            Ok(found) => {
                info!("Bohemia: discovered {} destinations", found.len());
                for d in found.iter().take(10) {
                    debug!("  - {}: {}", d.name, d.url);
                }
                found
            }
            Err(e) => {
                warn!("Bohemia: could not parse destinations: {}", e);
                Vec::new()
            }
        }
    }

    async fn launch_browser(&self) -> Option<BrowserSession> {
        let ua = self.config.user_agent.clone();
        match tokio::task::spawn_blocking(move || BrowserSession::launch(&ua)).await {
            Ok(Ok(session)) => Some(session),
            Ok(Err(e)) => {
                warn!("Bohemia: browser unavailable, listings over HTTP: {:#}", e);
                None
            }
            Err(e) => {
                warn!("Bohemia: browser launch panicked, listings over HTTP: {}", e);
                None
            }
        }
    }

    /// Rendered listing when a browser session is given, plain HTTP otherwise
    /// or when rendering fails.
    async fn listing_html(&self, session: Option<&BrowserSession>, url: &str) -> Result<String> {
        if let Some(session) = session {
            let session = session.clone();
            let target = url.to_string();
            match tokio::task::spawn_blocking(move || render_listing(&session, &target)).await {
                Ok(Ok(html)) => return Ok(html),
                Ok(Err(e)) => warn!("Bohemia: render failed for {}, using HTTP: {:#}", url, e),
                Err(e) => warn!("Bohemia: browser task panicked for {}, using HTTP: {}", url, e),
            }
        }
        self.client
            .get_text(url)
            .await
            .with_context(|| format!("Failed to fetch {}", url))
    }

    async fn scrape_destination(
        &self,
        session: Option<&BrowserSession>,
        dest: &Destination,
        remaining: usize,
    ) -> Result<Vec<RawOffer>> {
        let html = self.listing_html(session, &dest.url).await?;
        let offers = parse_offers(&html, &dest.name, remaining)?;
        if offers.is_empty() {
            debug!("Bohemia: no offer cards for {}", dest.name);
            save_debug_html(&self.config, "bohemia_empty_destination.html", &html)?;
        }
        Ok(offers)
    }
}

/// Blocking: load `url` in a fresh tab and scroll so lazily loaded cards render.
fn render_listing(session: &BrowserSession, url: &str) -> Result<String> {
    let tab = session.new_tab()?;
    session.fetch_page(&tab, url, Some("body"), RENDER_TIMEOUT)?;
    session.scroll_to_bottom(&tab, SCROLL_PAUSE, MAX_SCROLLS)?;
    let html = session.content(&tab);
    if let Err(e) = tab.close(true) {
        debug!("Bohemia: could not close tab: {}", e);
    }
    html
}

#[async_trait]
impl AgencyScraper for BohemiaScraper {
    fn agency(&self) -> Agency {
        Agency::Bohemia
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        let mut destinations = self.discover_destinations().await;
        if destinations.is_empty() {
            warn!("Bohemia: no destinations found, falling back to hot offers");
            destinations.push(Destination {
                name: HOT_OFFERS.0.to_string(),
                url: HOT_OFFERS.1.to_string(),
            });
        }

        let session = self.launch_browser().await;
        let limit = self.config.limit;
        let total = destinations.len();
        let mut all = Vec::new();

        for (i, dest) in destinations.iter().enumerate() {
            if limit_reached(all.len(), limit) {
                break;
            }
            let remaining = if limit == 0 { 0 } else { limit - all.len() };
            info!("Bohemia: destination {}/{}: {}", i + 1, total, dest.name);

            match self.scrape_destination(session.as_ref(), dest, remaining).await {
                Ok(offers) => {
                    info!("Bohemia: {} offers from {}, {} total", offers.len(), dest.name, all.len() + offers.len());
                    all.extend(offers);
                }
                Err(e) => warn!("Bohemia: skipping {}: {:#}", dest.name, e),
            }

            if i + 1 < total {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }

        if limit > 0 {
            all.truncate(limit);
        }
        info!("Bohemia: {} offers", all.len());
        Ok(all)
    }
}

/// Destination links from the directory page, unique by URL, in selector order.
pub fn parse_destinations(html: &str) -> Result<Vec<Destination>> {
    let doc = Html::parse_document(html);
    let mut found: Vec<Destination> = Vec::new();

    for css in DESTINATION_SELECTORS {
        let links: Vec<_> = doc.select(&sel(css)?).collect();
        if !links.is_empty() {
            debug!("Found {} destination links with selector: {}", links.len(), css);
        }
        for link in links {
            let name = element_text(&link);
            if name.chars().count() < 3 {
                continue;
            }
            let Some(url) = link.value().attr("href").and_then(|h| absolute_url(BASE_URL, h)) else {
                continue;
            };
            if found.iter().any(|d| d.url == url) {
                continue;
            }
            found.push(Destination { name, url });
        }
    }

    Ok(found)
}

/// Offer cards of one destination page. `limit == 0` keeps all.
pub fn parse_offers(html: &str, destination: &str, limit: usize) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let card_sel = sel(OFFER_CARD)?;
    let h3_sel = sel("div.title h3")?;
    let h4_sel = sel("div.title h4")?;
    let amount_sel = sel("div.price div.amount")?;
    let right_sel = sel("div.right")?;

    let mut offers = Vec::new();
    for card in doc.select(&card_sel) {
        if limit_reached(offers.len(), limit) {
            break;
        }
        let link = card
            .value()
            .attr("href")
            .and_then(|h| absolute_url(BASE_URL, h))
            .unwrap_or_default();

        let mut title = card.select(&h3_sel).next().map(|h| element_text(&h)).unwrap_or_default();
        if !title.is_empty()
            && let Some(sub) = card.select(&h4_sel).next().map(|h| element_text(&h))
            && !sub.is_empty()
            && sub.chars().count() < MAX_SUBTITLE_CHARS
        {
            title = format!("{} - {}", title, sub);
        }

        let amounts: Vec<String> = card.select(&amount_sel).map(|a| element_text(&a)).collect();
        let price = amounts
            .iter()
            .find(|a| a.contains('€'))
            .or(amounts.last())
            .cloned()
            .unwrap_or_default();

        let duration = card
            .select(&right_sel)
            .next()
            .and_then(|right| {
                right
                    .text()
                    .map(str::trim)
                    .find(|t| DURATION_WORDS.iter().any(|w| t.contains(w)))
                    .map(str::to_string)
            })
            .unwrap_or_default();

        if link.is_empty() || title.chars().count() <= 3 {
            continue;
        }

        let mut offer = RawOffer::new(title, link);
        offer.price = price;
        offer.dates = duration.clone();
        offer.duration = duration;
        offer.destination = destination.to_string();
        offers.push(offer);
    }

    Ok(offers)
}
