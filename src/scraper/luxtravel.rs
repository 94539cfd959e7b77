//! luxtravel.bg home page cards (`div.col-offer a.offer-item`).

use super::cleaner::{
    absolute_url, destination_from_keywords, element_text, is_non_offer_link, limit_reached,
    price_with_currency, range_text, sel,
};
use super::http_client::HttpClient;
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info};

const BASE_URL: &str = "https://luxtravel.bg";

static FULL_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}\.\d{1,2}\.\d{4})\b").unwrap());

const DESTINATIONS: &[&str] = &[
    "египет", "дубай", "испания", "турция", "гърция", "италия", "франция", "португалия",
    "хърватия", "черна гора", "албания", "кипър", "малдиви", "тайланд", "сейшели", "занзибар",
    "мавриций", "доминикана", "мексико", "куба", "йордания", "мароко", "малта", "хургада",
    "шарм", "анталия", "бодрум", "родос", "крит", "тенерифе", "малорка", "барселона", "рим",
    "париж", "дубровник", "будва", "котор", "санторини", "миконос", "истамбул", "лефкада",
    "алания", "памуккале",
];

pub struct LuxtravelScraper {
    client: HttpClient,
    config: ScraperConfig,
}

impl LuxtravelScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl AgencyScraper for LuxtravelScraper {
    fn agency(&self) -> Agency {
        Agency::Luxtravel
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        let html = self
            .client
            .get_text(BASE_URL)
            .await
            .context("Failed to fetch luxtravel.bg")?;
        save_debug_html(&self.config, "luxtravel_offers_page.html", &html)?;

        let offers = parse_listing(&html, self.config.limit)?;
        info!("Luxtravel: {} offers", offers.len());
        Ok(offers)
    }
}

/// Full `dd.mm.yyyy` dates as "first - last"; otherwise the text itself.
pub fn parse_dates(text: &str) -> String {
    let dates: Vec<&str> = FULL_DATE_RE.find_iter(text).map(|m| m.as_str()).collect();
    if dates.is_empty() {
        text.trim().to_string()
    } else {
        range_text(&dates)
    }
}

pub fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let card_sel = sel("div.col-offer a.offer-item")?;
    let title_sel = sel("div.title span")?;
    let price_sel = sel("div.price-wrap div.price")?;
    let day_night_sel = sel("div.box_bottom div.day-night")?;
    let label_sel = sel("span.over")?;
    let span_sel = sel("span")?;

    let cards: Vec<_> = doc.select(&card_sel).collect();
    debug!("Found {} offer cards", cards.len());

    let mut seen = HashSet::new();
    let mut offers = Vec::new();

    for card in cards {
        if limit_reached(offers.len(), limit) {
            break;
        }
        let href = card.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() || is_non_offer_link(href) {
            continue;
        }
        let Some(link) = absolute_url(BASE_URL, href) else {
            continue;
        };
        if !seen.insert(link.clone()) {
            continue;
        }

        let card_text = element_text(&card);
        let title = card
            .select(&title_sel)
            .next()
            .map(|e| element_text(&e))
            .or_else(|| {
                card.value()
                    .attr("title")
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .unwrap_or_else(|| card_text.clone());
        if title.chars().count() < 5 {
            continue;
        }

        let price_text = card
            .select(&price_sel)
            .next()
            .map(|e| element_text(&e))
            .unwrap_or_else(|| card_text.clone());

        let labelled_dates = card.select(&day_night_sel).find_map(|dn| {
            let label = dn.select(&label_sel).next().map(|l| element_text(&l))?;
            if !label.to_lowercase().contains("дати") {
                return None;
            }
            let spans: Vec<_> = dn.select(&span_sel).collect();
            Some(match spans.last() {
                Some(last) if spans.len() >= 2 => element_text(last),
                _ => element_text(&dn),
            })
        });
        let dates_text = labelled_dates
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| card_text.clone());

        let mut offer = RawOffer::new(title.clone(), link);
        offer.price = price_with_currency(&price_text);
        offer.dates = parse_dates(&dates_text);
        offer.destination =
            destination_from_keywords(&format!("{} {}", title, card_text), DESTINATIONS)
                .unwrap_or_else(|| "Unknown".to_string());
        offers.push(offer);
    }

    Ok(offers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
    <div class="row">
      <div class="col-offer">
        <a class="offer-item" href="/oferta/yordania-petra">
          <div class="title"><span>Йордания - Петра и Мъртво море</span></div>
          <div class="price-wrap"><div class="price">1 890 лв.</div></div>
          <div class="box_bottom">
            <div class="day-night"><span class="over">Нощувки</span><span>7</span></div>
            <div class="day-night"><span class="over">Дати</span><span>14.03.2026, 21.03.2026, 04.04.2026</span></div>
          </div>
        </a>
      </div>
      <div class="col-offer">
        <a class="offer-item" href="https://luxtravel.bg/oferta/malta" title="Малта с полет от София">
          <div class="price-wrap"><div class="price">699 €</div></div>
          по запитване
        </a>
      </div>
      <div class="col-offer"><a class="offer-item" href="https://facebook.com/luxtravel">Facebook страница</a></div>
      <div class="col-offer"><a class="offer-item" href="/oferta/yordania-petra">дубликат</a></div>
    </div>
    "#;

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_dates("14.03.2026, 21.03.2026, 04.04.2026"), "14.03.2026 - 04.04.2026");
        assert_eq!(parse_dates(" по запитване "), "по запитване");
    }

    #[test]
    fn test_parse_listing() {
        let offers = parse_listing(LISTING, 0).unwrap();
        assert_eq!(offers.len(), 2);

        assert_eq!(offers[0].title, "Йордания - Петра и Мъртво море");
        assert_eq!(offers[0].link, "https://luxtravel.bg/oferta/yordania-petra");
        assert_eq!(offers[0].price, "1890 BGN");
        assert_eq!(offers[0].dates, "14.03.2026 - 04.04.2026");
        assert_eq!(offers[0].destination, "Йордания");

        assert_eq!(offers[1].title, "Малта с полет от София");
        assert_eq!(offers[1].price, "699 EUR");
        assert_eq!(offers[1].destination, "Малта");
    }
}
