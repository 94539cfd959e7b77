//! dari-tour.com: offers are listed directly on the home page and category
//! pages; offer links found there are visited individually as well.

use super::cleaner::{
    Deduper, absolute_url, class_matches, element_lines, fmt_dmy, parse_dmy, sel,
    title_case, truncate_chars,
};
use super::http_client::HttpClient;
use super::{AgencyScraper, save_debug_html};
use crate::config::ScraperConfig;
use crate::models::{Agency, RawOffer};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const BASE_URL: &str = "https://dari-tour.com";
const TITLE_SUFFIX: &str = " | Дари Тур";

const CATEGORY_PAGES: [&str; 2] = ["https://dari-tour.com/ekskurzii", "https://dari-tour.com/top-oferti"];
const DESTINATION_PAGES: [&str; 11] = [
    "https://dari-tour.com/pochivki-dominikanska-republika",
    "https://dari-tour.com/pochivki-meksiko",
    "https://dari-tour.com/pochivki-ispaniya",
    "https://dari-tour.com/pochivki-italiya",
    "https://dari-tour.com/pochivki-turtsiya",
    "https://dari-tour.com/pochivki-egipet",
    "https://dari-tour.com/pochivki-tunis",
    "https://dari-tour.com/pochivki-gretsiya",
    "https://dari-tour.com/ekskurzii-sasht",
    "https://dari-tour.com/ekskurzii-evropa",
    "https://dari-tour.com/ekskurzii-aziq",
];

static CARD_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"col-offer|offer|tour").unwrap());
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d{3})*(?:\.\d{2})?)\s*лв").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}[./-]\d{1,2}[./-]\d{4}").unwrap());

const NAME: &str = r"([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)";
static TITLE_DEST_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"до\s+{NAME}"),
        format!(r"в\s+{NAME}"),
        format!(r"{NAME}\s*-\s*екскурзии"),
        format!(r"{NAME}\s*-\s*почивки"),
        format!(r"Екскурзии\s+{NAME}"),
        format!(r"Почивки\s+{NAME}"),
        format!(r"{NAME}\s*и\s+{NAME}"),
        format!(r"{NAME}\s*круиз"),
        format!(r"Круиз\s+{NAME}"),
        format!(r"Коледа\s*-\s*{NAME}"),
        format!(r"{NAME}\s*-\s*{NAME}"),
        format!(r"{NAME}\s*\|\s*{NAME}"),
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

const LINK_SKIP: [&str; 11] = [
    "tel:", "mailto:", "javascript:", "#", "facebook", "instagram", "iskam-oferta", "contact",
    "about", "privacy", "terms",
];
const LINK_SKIP_PATHS: [&str; 4] = ["/hoteli/", "/kalendar/", "/calendar", "/karibski-ray"];
const LINK_OFFER_WORDS: [&str; 4] = ["ekskurzia", "ekskurzii", "pochivki", "pochi"];
const OFFER_PAGE_MARKERS: [&str; 4] = ["/ekskurzia-", "/pochivki-", "/tour-", "/trip-"];

const TITLE_SKIP: &[&str] = &[
    "calendar", "kalendar", "news", "novini", "contact", "kontakti", "about", "za nas",
    "services", "uslugi", "facebook", "instagram", "последвайте ни", "дари тур", "обслужване",
    "контакти", "галерия", "снимки", "print", "карта", "видео", "видео галерия", "дати:",
    "14 дни", "11 нощувки", "галерия снимки", "програма", "хотели", "транспорт", "информация",
    "условия", "регистрация",
];

const CITY_TO_COUNTRY: &[(&str, &str)] = &[
    ("Рио де Жанейро", "Бразилия"),
    ("РИО ДЕ ЖАНЕЙРО", "Бразилия"),
    ("Виена", "Австрия"),
    ("Будапеща", "Унгария"),
    ("Прага", "Чехия"),
    ("Братислава", "Словакия"),
    ("Белград", "Сърбия"),
    ("Луковска баня", "България"),
    ("Пролом баня", "България"),
    ("Върнячка баня", "България"),
    ("Кайро", "Египет"),
    ("Хургада", "Египет"),
    ("Нил", "Египет"),
    ("Банкок", "Тайланд"),
    ("Москва", "Русия"),
    ("Санкт Петербург", "Русия"),
    ("Бали", "Индонезия"),
    ("Дубай", "ОАЕ"),
];

const KNOWN_DESTINATIONS: &[&str] = &[
    "Китай", "Ботсвана", "Коста Рика", "Узбекистан", "Мексико", "Малайзия", "Исландия", "Панама",
    "Колумбия", "Кипър", "Непал", "Патагония", "Австралия", "Нова Зеландия", "Сингапур",
    "Банкок", "Тайланд", "Бразилия", "Рио де Жанейро", "Дубай", "ОАЕ", "Индия", "Португалия",
    "Русия", "Москва", "Санкт Петербург", "Доминикана", "Куба", "Япония", "Виетнам", "Филипини",
    "Индонезия", "Бали", "Южна Корея", "Тайван", "Израел", "Йордания", "Ливан", "Турция",
    "Гърция", "Италия", "Испания", "Франция", "Германия", "Австрия", "Швейцария", "Чехия",
    "Полша", "Унгария", "Румъния", "България", "Сърбия", "Хърватия", "Словения", "Черна гора",
    "Албания", "Македония", "Великобритания", "Ирландия", "Нидерландия", "Белгия", "Швеция",
    "Норвегия", "Дания", "Финландия", "Естония", "Латвия", "Литва", "САЩ", "Канада", "Аржентина",
    "Чили", "Перу", "Еквадор", "Боливия", "Уругвай", "Парагвай", "Мароко", "Тунис", "Египет",
    "Кения", "Танзания", "ЮАР", "Намибия", "Замбия", "Зимбабве", "Малави", "Мозамбик",
    "Мадагаскар", "Сейшелски острови", "Мавриций", "Реюнион", "Виена", "Будапеща", "Прага",
    "Братислава", "Белград", "Луковска баня", "Пролом баня", "Върнячка баня", "Кайро",
    "Хургада", "Нил",
];

/// Transliterated URL fragments and the destination they stand for.
const SLUG_RULES: &[(&[&str], &str)] = &[
    (&["nepal"], "Непал"),
    (&["bali"], "Бали"),
    (&["dominikan"], "Доминикана"),
    (&["brazil"], "Бразилия"),
    (&["patagoniya", "patagonia"], "Патагония"),
    (&["surbiya", "serbia", "belgrad"], "Сърбия"),
    (&["singapur", "singapore"], "Сингапур"),
    (&["kipur", "cyprus"], "Кипър"),
    (&["nil", "kayro", "hurgada"], "Египет"),
    (&["viena", "budapeshta", "praga", "bratislava"], "Австрия"),
    (&["lukovska-banya", "prolom-banya", "vurnyachka-banya"], "България"),
];

pub struct DariTourScraper {
    client: HttpClient,
    config: ScraperConfig,
}

impl DariTourScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            config: config.clone(),
        })
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        match self.client.get_text(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("Dari Tour: skipping {}: {:#}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl AgencyScraper for DariTourScraper {
    fn agency(&self) -> Agency {
        Agency::DariTour
    }

    async fn scrape(&self) -> Result<Vec<RawOffer>> {
        let mut offers = Vec::new();
        let mut offer_urls = BTreeSet::new();

        for url in std::iter::once(BASE_URL).chain(CATEGORY_PAGES) {
            let Some(html) = self.fetch(url).await else { continue };
            if url == BASE_URL {
                save_debug_html(&self.config, "dari_tour_main.html", &html)?;
            }
            let found = parse_page(&html, url)?;
            debug!("Dari Tour: {} offers on {}", found.len(), url);
            offers.extend(found);
            offer_urls.extend(extract_offer_links(&html)?);
        }

        for url in DESTINATION_PAGES {
            let Some(html) = self.fetch(url).await else { continue };
            let found = parse_page(&html, url)?;
            debug!("Dari Tour: {} offers on {}", found.len(), url);
            offers.extend(found);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let mut offer_urls: Vec<String> = offer_urls.into_iter().collect();
        if self.config.limit > 0 {
            offer_urls.truncate(self.config.limit);
        }
        info!("Dari Tour: visiting {} offer pages", offer_urls.len());

        let mut processed = HashSet::new();
        for (i, url) in offer_urls.iter().enumerate() {
            if (i + 1) % 5 == 0 {
                debug!("Dari Tour: offer pages {}/{}", i + 1, offer_urls.len());
            }
            if !processed.insert(url.clone()) {
                continue;
            }
            if let Some(html) = self.fetch(url).await {
                offers.extend(parse_page(&html, url)?);
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let offers = Deduper::retain_unique(offers);
        info!("Dari Tour: {} offers", offers.len());
        Ok(offers)
    }
}

/// Offer page URLs found on a listing page, sorted and unique.
pub fn extract_offer_links(html: &str) -> Result<BTreeSet<String>> {
    let doc = Html::parse_document(html);
    let mut urls = BTreeSet::new();
    for a in doc.select(&sel("a[href]")?) {
        let href = a.value().attr("href").unwrap_or_default();
        let lower = href.to_lowercase();
        if LINK_SKIP.iter().any(|s| lower.contains(s)) || LINK_SKIP_PATHS.iter().any(|s| lower.contains(s)) {
            continue;
        }
        if !LINK_OFFER_WORDS.iter().any(|w| lower.contains(w)) || lower.contains("kalendar") {
            continue;
        }
        if let Some(url) = absolute_url(BASE_URL, href)
            && url.trim_end_matches('/') != BASE_URL
        {
            urls.insert(url);
        }
    }
    Ok(urls)
}

/// Individual offer pages, as opposed to the fixed listing pages whose slugs
/// happen to share the same prefixes.
pub fn is_offer_page(url: &str) -> bool {
    if DESTINATION_PAGES.contains(&url) || CATEGORY_PAGES.contains(&url) {
        return false;
    }
    let path = Url::parse(url).map(|u| u.path().to_lowercase()).unwrap_or_default();
    OFFER_PAGE_MARKERS.iter().any(|m| path.contains(m))
}

/// One date as is, several as "earliest - latest" (day-first).
pub fn date_span(text: &str) -> String {
    let raw: Vec<&str> = DATE_RE.find_iter(text).map(|m| m.as_str()).collect();
    match raw.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, ..] => {
            let parsed: Option<Vec<_>> = raw.iter().map(|d| parse_dmy(d, None)).collect();
            match parsed {
                Some(mut dates) => {
                    dates.sort();
                    format!("{} - {}", fmt_dmy(dates[0]), fmt_dmy(dates[dates.len() - 1]))
                }
                None => first.to_string(),
            }
        }
    }
}

fn country_of(dest: &str) -> String {
    CITY_TO_COUNTRY
        .iter()
        .find(|(city, _)| *city == dest)
        .map(|(_, country)| country.to_string())
        .unwrap_or_else(|| dest.to_string())
}

/// Destination cascade: title patterns, URL slug rules, title mention, then
/// the first 500 characters of the content.
pub fn destination_for(title: &str, content: &str, url: &str) -> String {
    let clean_title = title
        .replace(" ≫ Цени и оферти от България", "")
        .replace(" • Цени със самолет", "");

    for re in TITLE_DEST_RES.iter() {
        if let Some(c) = re.captures(&clean_title) {
            let candidate = c[1].trim();
            if KNOWN_DESTINATIONS.contains(&candidate) {
                return country_of(candidate);
            }
        }
    }

    let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_default();
    for part in path.split('/').filter(|p| p.len() > 2) {
        if let Some((_, dest)) = SLUG_RULES.iter().find(|(keys, _)| keys.iter().any(|k| part.contains(k))) {
            return dest.to_string();
        }
        let decoded = title_case(part);
        if KNOWN_DESTINATIONS.contains(&decoded.as_str()) {
            return country_of(&decoded);
        }
    }

    let upper_title = clean_title.to_uppercase();
    if let Some(dest) = KNOWN_DESTINATIONS.iter().find(|d| upper_title.contains(&d.to_uppercase())) {
        return country_of(dest);
    }

    let head: String = content.chars().take(500).collect();
    let text = format!("{} {}", clean_title, head).to_uppercase();
    KNOWN_DESTINATIONS
        .iter()
        .find(|d| text.contains(&d.to_uppercase()))
        .map(|d| d.to_string())
        .unwrap_or_default()
}

fn is_acceptable_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    title.chars().count() > 15 && !TITLE_SKIP.iter().any(|s| lower.contains(s))
}

/// Offers on any dari-tour.com page: a single offer for offer pages, listing
/// cards otherwise.
pub fn parse_page(html: &str, page_url: &str) -> Result<Vec<RawOffer>> {
    if is_offer_page(page_url) {
        return Ok(parse_offer_page(html, page_url)?.into_iter().collect());
    }
    parse_cards(html)
}

pub fn parse_cards(html: &str) -> Result<Vec<RawOffer>> {
    let doc = Html::parse_document(html);
    let a_sel = sel("a[href]")?;
    let heading_sel = sel("h1, h2, h3, h4, strong, b, div.title")?;
    let price_sel = sel("div.price")?;

    let div_sel = sel("div[class]")?;
    let cards = doc
        .select(&div_sel)
        .filter(|d| class_matches(d, &CARD_CLASS_RE));

    let mut offers = Vec::new();
    for card in cards {
        let Some(link) = card
            .select(&a_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| absolute_url(BASE_URL, h))
        else {
            continue;
        };

        let lines = element_lines(&card);
        let title = match card.select(&heading_sel).next() {
            Some(h) => {
                let t = element_lines(&h).join(" ");
                if t.chars().count() > 5 { t } else { String::new() }
            }
            None => lines
                .iter()
                .find(|l| l.chars().count() > 5)
                .map(|l| truncate_chars(l, 150))
                .unwrap_or_default(),
        };

        let price = card
            .select(&price_sel)
            .next()
            .and_then(|p| PRICE_RE.find(&element_lines(&p).join(" ")).map(|m| m.as_str().to_string()))
            .unwrap_or_default();

        let text = lines.join("\n");
        let dates = date_span(&text);

        if !is_acceptable_title(&title) || (price.is_empty() && dates.is_empty()) {
            continue;
        }

        let mut offer = RawOffer::new(title.clone(), link.clone());
        offer.price = price;
        offer.dates = dates;
        offer.destination = destination_for(&title, &text, &link);
        offers.push(offer);
    }
    Ok(offers)
}

fn page_body(doc: &Html) -> Option<ElementRef<'_>> {
    sel("body").ok().and_then(|s| doc.select(&s).next())
}

/// Individual offer page: `<title>` without the site suffix, first price and
/// the span of all dates on the page.
pub fn parse_offer_page(html: &str, url: &str) -> Result<Option<RawOffer>> {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&sel("title")?)
        .next()
        .map(|t| element_lines(&t).join(" ").replace(TITLE_SUFFIX, ""))
        .unwrap_or_default();
    if title.is_empty() {
        return Ok(None);
    }

    let text = page_body(&doc)
        .map(|b| element_lines(&b).join("\n"))
        .unwrap_or_default();

    let mut offer = RawOffer::new(title.clone(), url);
    offer.price = PRICE_RE.find(&text).map(|m| m.as_str().to_string()).unwrap_or_default();
    offer.dates = date_span(&text);
    offer.destination = destination_for(&title, &text, url);
    Ok(Some(offer))
}
