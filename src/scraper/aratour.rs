//! aratour.bg: destinations are discovered from the home page, every
//! destination page is parsed for offer cards (falling back to offer-looking
//! links), and offer detail pages are visited once more to settle the
//! destination name.

use super::cleaner::{
    Deduper, absolute_url, class_matches, element_lines, percent_decode, sel, title_case,
    truncate_chars,
};
use super::http_client::HttpClient;
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const BASE_URL: &str = "https://aratour.bg";

static DEST_HREF_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)href="([^"]*екскурзии[^"]*)""#,
        r#"(?i)href="([^"]*pochivki[^"]*)""#,
        r#"(?i)href="([^"]*оферти[^"]*)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static CARD_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*(лв\.?|€|\$|USD)").unwrap());
static CARD_PRICE_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[ \t]+\d+)*[.,]?\d*)\s*(лв\.?|€|\$|USD)").unwrap());
static LINK_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d+)?)\s*(лв\.?|€|\$|USD)").unwrap());
static FALLBACK_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pochi|tour|\d{3,}").unwrap());
static OFFER_HREF_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)pochi|tour|\d{4,}", r"(?i)екскурзия|почивка", r"(?i)offer|travel|trip"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});
static SECTION_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)offer|promo|featured|special|highlight").unwrap());
static DATE_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}[./-]\d{1,2}[./-]\d{4})\s*-\s*(\d{1,2}[./-]\d{1,2}[./-]\d{4})").unwrap()
});
static TRAVEL_DATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Дати на пътуване:\s*([^<\n]+)").unwrap());
static SINGLE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}[./-]\d{1,2}[./-]\d{4})").unwrap());
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*дни").unwrap());
static TITLE_DEST_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)\s+\d{4}\s*–",
        r"(?i)Aratour\s*-\s*([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)",
        r"(?i)Екскурзия\s+до\s+([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)",
        r"(?i)Почивка\s+в\s+([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)",
        r"(?i)([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)\s*-\s*Aratour",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const DEST_SKIP: &[&str] = &[
    "партньорство", "partnership", "абакс", "abaks", "ранни-записвания", "early-booking",
    "коледа", "christmas", "нова-година", "new-year", "великден", "easter", "лято", "summer",
    "зима", "winter", "пролет", "spring", "есен", "autumn", "уикенд", "weekend", "екзотични",
    "exotic", "круизи", "cruises", "авторски", "author", "специални", "special", "промо", "promo",
];
const CARD_SELECTORS: [&str; 6] = [
    "div.offer-card",
    "div.offer-item",
    "div.tour-item",
    "article.offer",
    ".offer-listing",
    ".tour-offer",
];
const CARD_SKIP: [&str; 6] = ["Календар", "Новини", "Бюлетин", "Aratour", "Контакти", "Карта на сайта"];
const NAV_WORDS: [&str; 3] = ["Aratour", "Контакти", "Карта"];
const TRACKING_PARAMS: [&str; 6] = ["gclid", "gad_source", "gad_campaignid", "utm_", "fbclid", "msclkid"];
const MAIN_SKIP_PATHS: [&str; 7] = ["/contacts", "/about", "/terms", "/privacy", "/sitemap", "/news", "/newsletter"];
const LINK_TEXT_SKIP: [&str; 13] = [
    "телефон", "имейл", "контакт", "за нас", "условия", "политика", "карта", "булетин", "новини",
    "facebook", "instagram", "0999", "@",
];
const SECTION_HREF_WORDS: [&str; 4] = ["екскурзия", "почивка", "tour", "pochi"];
const LISTING_PATH_WORDS: [&str; 4] = ["pochi", "екскурзия", "tour", "пътуван"];
const DETAIL_LINK_WORDS: [&str; 5] = ["pochi", "екскурзия", "почивка", "пътуван", "/tour"];
const DETAIL_PARENT_DIRS: [&str; 4] = ["екскурзии", "почивки", "tours", "vacations"];

pub const KNOWN_DESTINATIONS: &[&str] = &[
    "Турция", "Гърция", "Италия", "Испания", "Франция", "Египет", "Тунис", "Мароко", "България",
    "Албания", "Македония", "Сърбия", "Черна гора", "Хърватия", "Словения", "Австрия",
    "Швейцария", "Чехия", "Полша", "Унгария", "Румъния", "Германия", "Холандия", "Белгия",
    "Великобритания", "Ирландия", "Португалия", "Йордания", "Куба", "Мексико", "Доминикана",
    "Ямайка", "Тайланд", "Виетнам", "Япония", "Китай", "Индия", "Индонезия", "Малайзия",
    "Сингапур", "Южна Корея", "Филипини", "Австралия", "Нова Зеландия", "Канада", "САЩ",
    "Бразилия", "Аржентина", "Чили", "Перу", "Колумбия", "Еквадор", "Боливия", "Уругвай",
    "Парагвай", "Малта",
];

/// Words that mark a destination value as a category or promo label rather
/// than a place.
const DEST_REJECT: &[&str] = &[
    "pochi", "ekskurzi", "tour", "пътуван", "пътешеств", "vacation", "trip", "early", "booking",
    "ранни", "записван", "лято", "зима", "пролет", "есен", "all", "inclusive", "всичко",
    "включен", "от", "до", "в", "партньорство", "partnership", "абакс", "abaks", "коледа",
    "christmas", "нова-година", "new-year", "великден", "easter", "уикенд", "weekend",
    "екзотични", "exotic", "круизи", "cruises", "авторски", "author", "специални", "special",
    "промо", "promo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Excursions,
    Holidays,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub url: String,
    pub name: String,
    pub kind: DestinationKind,
}

pub struct AratourScraper {
    client: HttpClient,
    config: ScraperConfig,
}

impl AratourScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            config: config.clone(),
        })
    }

    async fn refine_destinations(&self, offers: &mut [RawOffer]) {
        let total = offers.len();
        for (i, offer) in offers.iter_mut().enumerate() {
            if (i + 1) % 10 == 0 {
                debug!("Aratour: detail pages {}/{}", i + 1, total);
            }
            if !is_detail_link(&offer.link) {
                continue;
            }
            match self.client.get_text(&offer.link).await {
                Ok(html) => {
                    if self.config.debug {
                        let name = format!(
                            "aratour_offer_{}.html",
                            offer.link.trim_end_matches('/').rsplit('/').next().unwrap_or("page")
                        );
                        if let Err(e) = save_debug_html(&self.config, &name, &html) {
                            debug!("Debug HTML not written: {:#}", e);
                        }
                    }
                    refine_destination(offer, &html);
                }
                Err(e) => debug!("Aratour: detail page {} failed: {:#}", offer.link, e),
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

#[async_trait]
impl AgencyScraper for AratourScraper {
    fn agency(&self) -> Agency {
        Agency::Aratour
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        let main_html = match self.client.get_text(BASE_URL).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Aratour: home page unavailable: {:#}", e);
                return Ok(Vec::new());
            }
        };
        save_debug_html(&self.config, "aratour_main.html", &main_html)?;

        let mut destinations = parse_destinations(&main_html);
        info!("Aratour: {} destinations", destinations.len());
        let mut offers = parse_link_offers(&main_html, BASE_URL)?;
        info!("Aratour: {} offers on the home page", offers.len());

        if self.config.limit > 0 {
            destinations.truncate(self.config.limit);
        }

        let mut processed = HashSet::new();
        let total = destinations.len();
        for (i, dest) in destinations.iter().enumerate() {
            if !processed.insert(dest.url.clone()) {
                continue;
            }
            debug!("Aratour: {}/{} {} ({:?})", i + 1, total, dest.name, dest.kind);
            match self.client.get_text(&dest.url).await {
                Ok(html) => match parse_destination_page(&html, &dest.url) {
                    Ok(found) => {
                        debug!("Aratour: {} offers from {}", found.len(), dest.name);
                        offers.extend(found);
                    }
                    Err(e) => warn!("Aratour: could not parse {}: {}", dest.url, e),
                },
                Err(e) => warn!("Aratour: skipping {}: {:#}", dest.url, e),
            }
            if i + 1 < total {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }

        let mut offers = Deduper::retain_unique(offers);
        self.refine_destinations(&mut offers).await;
        info!("Aratour: {} offers", offers.len());
        Ok(offers)
    }
}

/// URL path of `url`, percent-decoded and lowercased.
fn decoded_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| percent_decode(u.path()))
        .unwrap_or_default()
        .to_lowercase()
}

/// Name from the last meaningful path segment, e.g. `/екскурзии/италия/` → "Италия".
fn name_from_path(url: &str) -> String {
    let path = Url::parse(url).map(|u| percent_decode(u.path())).unwrap_or_default();
    let parts: Vec<&str> = path.split('/').collect();
    let slug = if parts.len() > 2 { parts[parts.len() - 2] } else { parts.last().copied().unwrap_or_default() };
    title_case(slug)
}

/// Destination pages linked from the home page, minus seasonal and partner
/// collections. Unique by URL.
pub fn parse_destinations(html: &str) -> Vec<Destination> {
    let doc = Html::parse_document(html);
    let a_sel = sel("a[href]").ok();
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for re in DEST_HREF_RES.iter() {
        for caps in re.captures_iter(html) {
            let href = &caps[1];
            let Some(url) = absolute_url(&format!("{}/", BASE_URL), href) else {
                continue;
            };
            if url.trim_end_matches('/') == BASE_URL || !seen.insert(url.clone()) {
                continue;
            }
            let path = decoded_path(&url);
            if DEST_SKIP.iter().any(|k| path.contains(k)) {
                continue;
            }

            let link_text = a_sel.as_ref().and_then(|s| {
                doc.select(s)
                    .find(|a| a.value().attr("href") == Some(href))
                    .map(|a| element_lines(&a).join(" "))
            });
            let name = match link_text {
                Some(t) if t.chars().count() > 2 && !t.starts_with("http") => t,
                _ => name_from_path(&url),
            };
            let kind = if url.contains("екскурзии") {
                DestinationKind::Excursions
            } else {
                DestinationKind::Holidays
            };
            found.push(Destination { url, name, kind });
        }
    }
    found
}

fn first_long_line(lines: &[String], min: usize) -> Option<String> {
    lines
        .iter()
        .find(|l| l.chars().count() > min)
        .map(|l| truncate_chars(l, 150))
}

/// Lines that are neither the title, the price nor the duration, capped at
/// 500 characters.
fn description_from(lines: &[String], offer: &RawOffer, skip_nav: bool) -> String {
    let title_prefix = truncate_chars(&offer.title, 50);
    let parts: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|l| offer.title.is_empty() || !l.starts_with(&title_prefix))
        .filter(|l| offer.price.is_empty() || !l.contains(&offer.price))
        .filter(|l| offer.duration.is_empty() || !l.contains(&offer.duration))
        .filter(|l| l.chars().count() > 5)
        .filter(|l| !skip_nav || !NAV_WORDS.iter().any(|n| l.contains(n)))
        .collect();
    truncate_chars(&parts.join(" "), 500)
}

/// Date range, "Дати на пътуване: ..." or a single date.
pub fn card_dates(text: &str) -> String {
    if let Some(c) = DATE_RANGE_RE.captures(text) {
        return format!("{} - {}", &c[1], &c[2]);
    }
    if let Some(c) = TRAVEL_DATES_RE.captures(text) {
        return c[1].trim().to_string();
    }
    SINGLE_DATE_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default()
}

/// Offer cards of a destination page; falls back to offer-looking links when
/// no card matched.
pub fn parse_destination_page(html: &str, page_url: &str) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let destination = name_from_path(page_url);
    let a_sel = sel("a")?;
    let title_sel = sel("h1, h2, h3, h4, strong, b")?;

    let mut cards: Vec<ElementRef> = Vec::new();
    for css in CARD_SELECTORS {
        let found: Vec<_> = doc.select(&sel(css)?).collect();
        if !found.is_empty() {
            cards = found;
            break;
        }
    }
    if cards.is_empty() {
        let mut parents = HashSet::new();
        for link in doc.select(&sel("a[href]")?) {
            let href = link.value().attr("href").unwrap_or_default();
            if !FALLBACK_HREF_RE.is_match(href) {
                continue;
            }
            let Some(parent) = link.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            if CARD_PRICE_RE.is_match(&element_lines(&parent).join("\n")) && parents.insert(parent.id()) {
                cards.push(parent);
            }
        }
    }

    let mut offers = Vec::new();
    for card in cards {
        let lines = element_lines(&card);
        let text = lines.join("\n");
        if CARD_SKIP.iter().any(|k| text.contains(k)) || !CARD_PRICE_RE.is_match(&text) {
            continue;
        }

        let link = card
            .select(&a_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| absolute_url(&format!("{}/", BASE_URL), h))
            .unwrap_or_else(|| page_url.to_string());

        let mut offer = RawOffer::new("", link);
        offer.destination = destination.clone();
        offer.title = match card.select(&title_sel).next().map(|t| element_lines(&t).join(" ")) {
            Some(t) if t != "Aratour" && t.chars().count() > 10 => t,
            _ => first_long_line(&lines, 10).unwrap_or_default(),
        };
        offer.price = CARD_PRICE_VALUE_RE
            .find(&text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        offer.dates = card_dates(&text);
        offer.duration = DURATION_RE
            .find(&text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        offer.description = description_from(&lines, &offer, true);

        if !offer.price.is_empty() && offer.title.chars().count() > 10 {
            offers.push(offer);
        }
    }

    if offers.is_empty() {
        return parse_link_offers(html, page_url);
    }
    Ok(offers)
}

/// Listing and category paths that lead to more listings rather than one offer.
fn is_listing_path(path: &str) -> bool {
    if path.starts_with("/почивки/") || path.starts_with("/екскурзии/") {
        let parts: Vec<&str> = path.split('/').collect();
        return parts.len() == 4 && parts[3].chars().all(|c| c.is_ascii_digit()) && !parts[3].is_empty();
    }
    path.contains("pochivki-") || path.contains("екскурзии-") || path.starts_with("/оферти/")
}

/// Offers read straight from links. On the home page (`page_url == BASE_URL`)
/// every plausible link counts and a missing price becomes "Цена по запитване";
/// elsewhere the surrounding text must carry a price.
pub fn parse_link_offers(html: &str, page_url: &str) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let is_main = page_url.trim_end_matches('/') == BASE_URL;
    let a_sel = sel("a[href]")?;

    let mut seen_hrefs = HashSet::new();
    let mut links: Vec<ElementRef> = Vec::new();
    for re in OFFER_HREF_RES.iter() {
        for a in doc.select(&a_sel) {
            let href = a.value().attr("href").unwrap_or_default();
            if re.is_match(&percent_decode(href)) && seen_hrefs.insert(href.to_string()) {
                links.push(a);
            }
        }
    }
    for section in doc.select(&sel("div[class], section[class]")?) {
        if !class_matches(&section, &SECTION_CLASS_RE) {
            continue;
        }
        for a in section.select(&a_sel) {
            let href = a.value().attr("href").unwrap_or_default();
            let lower = percent_decode(href).to_lowercase();
            if SECTION_HREF_WORDS.iter().any(|k| lower.contains(k)) && seen_hrefs.insert(href.to_string()) {
                links.push(a);
            }
        }
    }

    let mut offers = Vec::new();
    for a in links {
        let href = a.value().attr("href").unwrap_or_default();
        let Some(link) = absolute_url(&format!("{}/", BASE_URL), href) else {
            continue;
        };
        let Ok(parsed) = Url::parse(&link) else { continue };
        let query = parsed.query().unwrap_or_default();
        if TRACKING_PARAMS.iter().any(|p| query.contains(p)) {
            continue;
        }
        let path = percent_decode(parsed.path()).to_lowercase();
        if is_listing_path(&path) {
            continue;
        }
        if is_main {
            if MAIN_SKIP_PATHS.iter().any(|p| path.contains(p)) {
                continue;
            }
        } else if !LISTING_PATH_WORDS.iter().any(|k| path.contains(k))
            && !path.is_empty()
            && path != "/"
            && !path.starts_with("/екскурзии")
            && !path.starts_with("/почивки")
        {
            continue;
        }

        let link_text = element_lines(&a).join(" ");
        let lower_text = link_text.to_lowercase();
        if LINK_TEXT_SKIP.iter().any(|k| lower_text.contains(k)) {
            continue;
        }
        if ["facebook.com", "instagram.com", "mailto:", "tel:"].iter().any(|k| link.contains(k)) {
            continue;
        }
        if path.contains("колко-струва") || path.contains('~') {
            continue;
        }

        let context_lines = a
            .parent()
            .and_then(ElementRef::wrap)
            .map(|p| element_lines(&p))
            .unwrap_or_else(|| element_lines(&a));
        let context = context_lines.join("\n");
        if !is_main && !CARD_PRICE_RE.is_match(&context) {
            continue;
        }

        let mut offer = RawOffer::new("", link.clone());
        let min = if is_main { 3 } else { 10 };
        offer.title = if link_text.chars().count() > min {
            truncate_chars(&link_text, 150)
        } else if let Some(line) = first_long_line(&context_lines, min) {
            line
        } else if is_main {
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            let slug = match segments.as_slice() {
                [.., parent, last] if last.chars().all(|c| c.is_ascii_digit()) => parent,
                [.., last] => last,
                [] => "",
            };
            truncate_chars(&title_case(slug), 150)
        } else {
            String::new()
        };

        offer.price = match LINK_PRICE_RE.find(&context) {
            Some(m) => m.as_str().to_string(),
            None if is_main => "Цена по запитване".to_string(),
            None => String::new(),
        };
        offer.duration = DURATION_RE
            .find(&context)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        offer.description = description_from(&context_lines, &offer, false);

        let keep = if is_main {
            offer.title.chars().count() > 2
        } else {
            !offer.title.is_empty() && !offer.price.is_empty()
        };
        if keep {
            offers.push(offer);
        }
    }
    Ok(offers)
}

/// Offer links worth a detail visit.
fn is_detail_link(link: &str) -> bool {
    let decoded = percent_decode(link).to_lowercase();
    if DETAIL_LINK_WORDS.iter().any(|k| decoded.contains(k)) {
        return true;
    }
    let path = decoded_path(link);
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() >= 3 && DETAIL_PARENT_DIRS.contains(&parts[parts.len() - 2])
}

fn needs_destination(dest: &str) -> bool {
    let lower = dest.to_lowercase();
    dest.is_empty()
        || !KNOWN_DESTINATIONS.contains(&dest)
        || DEST_REJECT.iter().any(|w| lower.contains(w))
}

/// Settle `offer.destination` from a detail page: `<title>` patterns, then the
/// meta description, then the URL path. Only known destinations are accepted.
pub fn refine_destination(offer: &mut RawOffer, html: &str) {
    if !needs_destination(&offer.destination) {
        return;
    }
    let doc = Html::parse_document(html);

    let page_title = sel("title")
        .ok()
        .and_then(|s| doc.select(&s).next().map(|t| element_lines(&t).join(" ")))
        .unwrap_or_default();
    for re in TITLE_DEST_RES.iter() {
        if let Some(c) = re.captures(&page_title) {
            let candidate = c[1].trim();
            if KNOWN_DESTINATIONS.contains(&candidate) {
                offer.destination = candidate.to_string();
                return;
            }
        }
    }

    let meta = sel(r#"meta[name="description"]"#)
        .ok()
        .and_then(|s| doc.select(&s).next().and_then(|m| m.value().attr("content").map(str::to_string)))
        .unwrap_or_default();
    if let Some(dest) = KNOWN_DESTINATIONS.iter().find(|d| meta.contains(*d)) {
        offer.destination = dest.to_string();
        return;
    }

    if offer.destination.is_empty() {
        let path = Url::parse(&offer.link).map(|u| percent_decode(u.path())).unwrap_or_default();
        for part in path.split('/') {
            if part.chars().count() <= 2 || part.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let candidate = part.replace('-', " ");
            let candidate = candidate.trim();
            if KNOWN_DESTINATIONS.contains(&candidate) {
                offer.destination = candidate.to_string();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"
      <nav>
        <a href="/екскурзии/италия/">Италия</a>
        <a href="/екскурзии/коледа/">Коледа</a>
        <a href="https://aratour.bg/pochivki/turcia/">Tu</a>
        <a href="/оферти/ранни-записвания/">Ранни</a>
      </nav>
      <div class="promo-box">
        <p><a href="/екскурзия/рим-и-флоренция/2041">Рим и Флоренция</a> 7 дни, 1250 лв.</p>
        <p><a href="/tour/x?gclid=abc">Tracked</a></p>
        <p><a href="/about-tour">За нас</a></p>
      </div>
    "#;

    #[test]
    fn test_parse_destinations() {
        let d = parse_destinations(HOME);
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].url, "https://aratour.bg/екскурзии/италия/");
        assert_eq!(d[0].name, "Италия");
        assert_eq!(d[0].kind, DestinationKind::Excursions);
        assert_eq!(d[1].name, "Turcia");
        assert_eq!(d[1].kind, DestinationKind::Holidays);
    }

    #[test]
    fn test_home_page_links() {
        let offers = parse_link_offers(HOME, BASE_URL).unwrap();
        let titles: Vec<&str> = offers.iter().map(|o| o.title.as_str()).collect();
        assert!(titles.contains(&"Рим и Флоренция"));
        assert!(!titles.contains(&"Tracked"));
        assert!(!titles.contains(&"За нас"));

        let rome = offers.iter().find(|o| o.title == "Рим и Флоренция").unwrap();
        assert_eq!(rome.link, "https://aratour.bg/екскурзия/рим-и-флоренция/2041");
        assert_eq!(rome.price, "1250 лв.");
        assert_eq!(rome.duration, "7 дни");
    }

    #[test]
    fn test_destination_cards() {
        let html = r#"
          <div class="offer-card">
            <h3>Екскурзия до Италия и Ватикана</h3>
            <a href="/екскурзия/италия-ватикана/1101">Виж</a>
            <span>5 дни</span>
            <span>05.05.2026 - 09.05.2026</span>
            <span>1 099 лв.</span>
            <p>Автобусна програма с нощни преходи</p>
          </div>
          <div class="offer-card"><h3>Без цена в тази карта</h3></div>
          <div class="offer-card"><h3>Контакти с Aratour офис</h3><span>10 лв.</span></div>
        "#;
        let offers = parse_destination_page(html, "https://aratour.bg/екскурзии/италия/").unwrap();
        assert_eq!(offers.len(), 1);
        let o = &offers[0];
        assert_eq!(o.title, "Екскурзия до Италия и Ватикана");
        assert_eq!(o.link, "https://aratour.bg/екскурзия/италия-ватикана/1101");
        assert_eq!(o.price, "1 099 лв.");
        assert_eq!(o.dates, "05.05.2026 - 09.05.2026");
        assert_eq!(o.duration, "5 дни");
        assert_eq!(o.destination, "Италия");
        assert!(o.description.contains("Автобусна програма"));
    }

    #[test]
    fn test_card_dates() {
        assert_eq!(card_dates("Дати на пътуване: 12.06, 19.06\nцена"), "12.06, 19.06");
        assert_eq!(card_dates("тръгване 01/07/2026"), "01/07/2026");
        assert_eq!(card_dates("без дати"), "");
    }

    #[test]
    fn test_listing_paths() {
        assert!(is_listing_path("/почивки/гърция/12"));
        assert!(is_listing_path("/оферти/лято"));
        assert!(!is_listing_path("/екскурзия/рим/2041"));
        assert!(is_detail_link("https://aratour.bg/екскурзия/рим/2041"));
        assert!(!is_detail_link("https://aratour.bg/za-nas"));
    }

    #[test]
    fn test_refine_destination() {
        let html = r#"<html><head><title>Малта 2026 – остров на рицарите</title></head></html>"#;
        let mut offer = RawOffer::new("Малта", "https://aratour.bg/екскурзия/малта/77");
        offer.destination = "В Партньорство С Абакс".into();
        refine_destination(&mut offer, html);
        assert_eq!(offer.destination, "Малта");

        let meta = r#"<meta name="description" content="Почивка в Тунис, хотел 4*">"#;
        let mut offer = RawOffer::new("Хамамет", "https://aratour.bg/pochivka/1");
        refine_destination(&mut offer, meta);
        assert_eq!(offer.destination, "Тунис");

        let mut known = RawOffer::new("Рим", "https://aratour.bg/x");
        known.destination = "Гърция".into();
        refine_destination(&mut known, "<title>Италия 2026 – Рим</title>");
        assert_eq!(known.destination, "Гърция");
    }
}
