//! Patch data-quality issues in the Aratour raw file.
//!
//! The first pass refetches offers with an empty date, price or destination
//! and re-runs the page heuristics on the fresh HTML. The final pass works
//! offline: it re-derives destinations from title keywords and recomputes
//! date ranges from the stated trip length. Both write a backup first.

use crate::analyze::{ARATOUR_DESTINATIONS, INVALID_DESTINATION_KEYWORDS, range_days, stated_duration};
use crate::config::AppConfig;
use crate::models::{Agency, RawOffer};
use crate::scraper::cleaner::{AMOUNT_PATTERN, collapse_ws, element_text, fmt_dmy, parse_amount, sel};
use crate::scraper::http_client::HttpClient;
use crate::scraper::{load_raw_offers, save_results};
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use regex::Regex;
use scraper::{Html, Node};
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const BACKUP_FILE: &str = "aratur_backup.json";
pub const FINAL_BACKUP_FILE: &str = "aratur_final_backup.json";

const HIGH_PRICE: f64 = 10_000.0;

static PAGE_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"((?:\d{1,2}[ \x{A0}])?\d{3,5}(?:[.,]\d{2})?)\s*лв").unwrap());
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(AMOUNT_PATTERN).unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[./-](\d{1,2})[./-](\d{4})").unwrap());
static DAYS_NIGHTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*дни\s*/\s*(\d+)\s*нощувки").unwrap());
static TITLE_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:дни|нощувки)").unwrap());

/// `<title>` shapes that carry the destination name.
static PAGE_TITLE_DESTINATION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const NAME: &str = r"([А-ЯA-Z][а-яА-Яa-zA-Z\s]+)";
    [
        format!(r"{NAME}\s+\d{{4}}\s*–"),
        format!(r"Aratour\s*-\s*{NAME}"),
        format!(r"Екскурзия\s+до\s+{NAME}"),
        format!(r"Почивка\s+в\s+{NAME}"),
        format!(r"{NAME}\s*-\s*Aratour"),
        format!(r"{NAME}\s+ИМПЕРСКИТЕ"),
        format!(r"{NAME}\s+–\s+МИСТИКА"),
        format!(r"{NAME}\s+–\s+ЗЕМЯ"),
        format!(r"{NAME}\s+–\s+\d+"),
        format!(r"{NAME}\s+40\s+НЮАНСА"),
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

/// Scraped destination values known to be wrong, with their replacement
/// when the title gives no better answer.
const DESTINATION_FIXES: &[(&str, Option<&str>)] = &[
    ("Тръгване От Варна", None),
    ("Pochivki Malta", Some("Малта")),
    ("Pochivki V Yordania", Some("Йордания")),
];

/// Country to title keywords, checked in order.
const COUNTRY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Турция", &["Турция", "Анталия", "Алания", "Бодрум", "Сиде", "Лара", "Фетие"]),
    ("Италия", &["Италия", "Венеция", "Милан", "Таормина", "Сицилия", "Рим", "Флоренция"]),
    ("Испания", &["Испания", "Коста Брава", "Барселона", "Каталуния"]),
    ("Франция", &["Франция", "Елзас", "Париж", "Ницца"]),
    ("Гърция", &["Гърция"]),
    ("Германия", &["Германия", "Баварски"]),
    ("Швейцария", &["Швейцария"]),
    ("Австрия", &["Австрия", "Залцбург", "Инсбрук", "Мюнхен"]),
    ("Чехия", &["Чехия"]),
    ("Полша", &["Полша", "Карпатите"]),
    ("Унгария", &["Унгария"]),
    ("Румъния", &["Румъния"]),
    ("България", &["България"]),
    ("Албания", &["Албания"]),
    ("Македония", &["Македония"]),
    ("Сърбия", &["Сърбия"]),
    ("Черна гора", &["Черна гора"]),
    ("Хърватия", &["Хърватия"]),
    ("Словения", &["Словения"]),
    ("Малта", &["Малта"]),
    ("Португалия", &["Португалия", "Порто", "Лисабон", "Сантяго", "Мадейра"]),
    ("Ирландия", &["Ирландия"]),
    ("Великобритания", &["Великобритания"]),
    ("Норвегия", &["Норвегия", "Фиорди"]),
    ("Швеция", &["Швеция", "Скандинавия"]),
    ("Дания", &["Дания", "Скандинавия"]),
    ("Египет", &["Египет", "Шарм", "Хургада", "Кайро", "Нил"]),
    ("Тунис", &["Тунис", "Джерба"]),
    ("Мароко", &["Мароко", "Имперски", "Касабланка", "Маракеш"]),
    ("Йордания", &["Йордания", "Петра"]),
    ("Израел", &["Израел"]),
    ("ОАЕ", &["ОАЕ", "Дубай", "Абу Даби", "Рас Ал Хайма"]),
    ("Катар", &["Катар", "Доха"]),
    ("Оман", &["Оман"]),
    ("Китай", &["Китай", "Пекин", "Шанхай", "Теракота"]),
    ("Япония", &["Япония", "Токио", "Киото"]),
    ("Южна Корея", &["Южна Корея", "Сеул"]),
    ("Индия", &["Индия", "Раджастан", "Делхи", "Агра", "Джайпур"]),
    ("Шри Ланка", &["Шри Ланка"]),
    ("Таиланд", &["Таиланд", "Банкок", "Пукет"]),
    ("Виетнам", &["Виетнам", "Ханой", "Хо Ши Мин", "Фу Квок"]),
    ("Камбоджа", &["Камбоджа", "Сием Реап", "Ангкор"]),
    ("Индонезия", &["Индонезия", "Бали"]),
    ("Малайзия", &["Малайзия"]),
    ("Сингапур", &["Сингапур"]),
    ("Филипини", &["Филипини"]),
    ("Малдиви", &["Малдиви"]),
    ("Непал", &["Непал", "Тибет"]),
    ("Узбекистан", &["Узбекистан", "Самарканд", "Бухара"]),
    ("Кения", &["Кения", "Масаи Мара", "Сафари"]),
    ("Танзания", &["Танзания", "Занзибар", "Сафари"]),
    ("Ботсвана", &["Ботсвана"]),
    ("Зимбабве", &["Зимбабве"]),
    ("Намибия", &["Намибия"]),
    ("ЮАР", &["ЮАР"]),
    ("Етиопия", &["Етиопия"]),
    ("Кабо Верде", &["Кабо Верде", "Сал"]),
    ("Сенегал", &["Сенегал"]),
    ("Сао Томе и Принсипи", &["Сао Томе", "Принсипи"]),
    ("САЩ", &["САЩ", "Ню Йорк", "Вашингтон", "Лос Анджелис"]),
    ("Канада", &["Канада"]),
    ("Мексико", &["Мексико"]),
    ("Куба", &["Куба"]),
    ("Доминикана", &["Доминикана", "Пунта Кана", "Ла Романа", "Баяхибе"]),
    ("Ямайка", &["Ямайка"]),
    ("Бразилия", &["Бразилия", "Рио"]),
    ("Аргентина", &["Аргентина"]),
    ("Чили", &["Чили"]),
    ("Перу", &["Перу", "Мачу Пикчу", "Куско"]),
    ("Колумбия", &["Колумбия"]),
    ("Венецуела", &["Венецуела", "Анхел"]),
    ("Еквадор", &["Еквадор"]),
    ("Коста Рика", &["Коста Рика"]),
    ("Панама", &["Панама"]),
    ("Кюрасао", &["Кюрасао"]),
    ("Австралия", &["Австралия"]),
    ("Нова Зеландия", &["Нова Зеландия"]),
    ("Карибски Острови", &["Карибски", "Бриз"]),
    ("Русия", &["Русия", "Москва", "Санкт Петербург", "Московска област"]),
];

/// Multi-country tours, tried after keywords and the fix table. All listed
/// fragments must appear in the title.
const MULTI_COUNTRY: &[(&[&str], &str)] = &[
    (&["Шри Ланка", "Малдиви"], "Шри Ланка и Малдиви"),
    (&["Виетнам", "Камбоджа"], "Виетнам и Камбоджа"),
    (&["Ботсвана", "Зимбабве"], "Ботсвана и Зимбабве"),
    (&["Намибия", "Ботсвана", "Зимбабве"], "Намибия, Ботсвана и Зимбабве"),
    (&["Кайро", "Хургада"], "Египет"),
    (&["Цяла Скандинавия"], "Скандинавия"),
    (&["Швеция", "Дания"], "Швеция и Дания"),
    (&["Грузия", "Армения"], "Грузия и Армения"),
    (&["Италия", "Швейцария"], "Италия и Швейцария"),
    (&["Китай", "Япония"], "Китай и Япония"),
    (&["Гранд Тур", "Япония"], "Япония и Южна Корея"),
];

// ── Page heuristics ───────────────────────────────────────────────────────────

/// Fields recovered from a freshly fetched offer page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PageDetails {
    pub price: Option<String>,
    pub dates: Option<String>,
    pub destination: Option<String>,
}

/// Visible text, one line per text node, scripts and styles skipped.
fn page_text(doc: &Html) -> String {
    doc.root_element()
        .descendants()
        .filter_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| matches!(e.name(), "script" | "style")))
                .unwrap_or(false);
            (!hidden).then(|| text.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sorted_dates(text: &str) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = DATE_RE
        .captures_iter(text)
        .filter_map(|c| {
            NaiveDate::from_ymd_opt(c[3].parse().ok()?, c[2].parse().ok()?, c[1].parse().ok()?)
        })
        .collect();
    dates.sort();
    dates
}

/// "first - last", or the single date when they coincide.
fn span_text(dates: &[NaiveDate]) -> Option<String> {
    let (first, last) = (dates.first()?, dates.last()?);
    if first == last {
        Some(fmt_dmy(*first))
    } else {
        Some(format!("{} - {}", fmt_dmy(*first), fmt_dmy(*last)))
    }
}

fn dates_from_page(doc: &Html) -> Result<Option<String>> {
    let span_sel = sel("span")?;
    let with_until = doc
        .select(&span_sel)
        .map(|s| element_text(&s))
        .find(|t| t.contains("до") && DATE_RE.is_match(t));
    if let Some(text) = with_until {
        return Ok(span_text(&sorted_dates(&text)));
    }

    let info_sel = sel("div.offer-info")?;
    let calendar_sel = sel("span.icon-calendar")?;
    let found = doc
        .select(&info_sel)
        .filter(|div| div.select(&calendar_sel).next().is_some())
        .map(|div| element_text(&div))
        .find_map(|text| span_text(&sorted_dates(&text)));
    Ok(found)
}

/// Departure plus "N дни / M нощувки" → a full range.
fn extend_single_date(dates: &str, text: &str) -> Option<String> {
    if dates.contains('-') {
        return None;
    }
    let days: i64 = DAYS_NIGHTS_RE.captures(text)?[1].parse().ok()?;
    if days <= 1 {
        return None;
    }
    let start = NaiveDate::parse_from_str(dates, "%d.%m.%Y").ok()?;
    let end = start + Duration::days(days - 1);
    Some(format!("{} - {}", dates, fmt_dmy(end)))
}

fn destination_from_page_title(doc: &Html) -> Result<Option<String>> {
    let Some(title) = doc.select(&sel("title")?).next().map(|t| element_text(&t)) else {
        return Ok(None);
    };
    Ok(PAGE_TITLE_DESTINATION_RES.iter().find_map(|re| {
        let name = re.captures(&title)?.get(1)?.as_str().trim();
        ARATOUR_DESTINATIONS.contains(&name).then(|| name.to_string())
    }))
}

pub fn extract_offer_details(html: &str) -> Result<PageDetails> {
    let doc = Html::parse_document(html);
    let text = page_text(&doc);

    let price = PAGE_PRICE_RE
        .captures(&text)
        .map(|c| format!("{} лв.", &c[1]));

    let dates = dates_from_page(&doc)?.map(|d| extend_single_date(&d, &text).unwrap_or(d));

    Ok(PageDetails {
        price,
        dates,
        destination: destination_from_page_title(&doc)?,
    })
}

// ── Offline fixes ─────────────────────────────────────────────────────────────

pub fn needs_refetch(offer: &RawOffer) -> bool {
    offer.dates.trim().is_empty()
        || offer.destination.trim().is_empty()
        || offer.price.trim().is_empty()
}

/// Only fills what was found; existing values are never blanked.
pub fn apply_details(offer: &mut RawOffer, details: PageDetails) -> bool {
    let mut changed = false;
    let mut set = |field: &mut String, value: Option<String>| {
        if let Some(v) = value
            && *field != v
        {
            *field = v;
            changed = true;
        }
    };
    set(&mut offer.price, details.price);
    set(&mut offer.dates, details.dates);
    set(&mut offer.destination, details.destination);
    changed
}

fn parse_range(dates: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (start, end) = dates.split_once(" - ")?;
    if end.contains(" - ") {
        return None;
    }
    Some((
        NaiveDate::parse_from_str(start.trim(), "%d.%m.%Y").ok()?,
        NaiveDate::parse_from_str(end.trim(), "%d.%m.%Y").ok()?,
    ))
}

/// Extend ranges that fall short of the title's trip length by at most two
/// days.
pub fn fix_inconsistent_date_ranges(offers: &mut [RawOffer]) -> usize {
    let mut fixed = 0;
    for (i, offer) in offers.iter_mut().enumerate() {
        let dates = offer.dates.trim().to_string();
        if !dates.contains('-') {
            continue;
        }
        let Some(stated) = stated_duration(&offer.title.to_lowercase()) else {
            continue;
        };
        let (Some(actual), Some((start, _))) = (range_days(&dates), parse_range(&dates)) else {
            continue;
        };
        if actual < stated && stated - actual <= 2 {
            let end = start + Duration::days(stated - 1);
            offer.dates = format!("{} - {}", fmt_dmy(start), fmt_dmy(end));
            info!("Fixed [{}]: {} -> {} (duration: {} days)", i, dates, offer.dates, stated);
            fixed += 1;
        }
    }
    fixed
}

/// Clear unknown destinations that look like categories or departure points.
pub fn fix_invalid_destinations(offers: &mut [RawOffer]) -> usize {
    let mut fixed = 0;
    for (i, offer) in offers.iter_mut().enumerate() {
        let dest = offer.destination.trim();
        if dest.is_empty() || ARATOUR_DESTINATIONS.contains(&dest) {
            continue;
        }
        let lower = dest.to_lowercase();
        if INVALID_DESTINATION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            info!("Cleared invalid destination [{}]: '{}'", i, dest);
            offer.destination.clear();
            fixed += 1;
        }
    }
    fixed
}

/// "12 500 лв." → 12500.0, "2,450 лв" → 2450.0
fn price_number(price: &str) -> Option<f64> {
    AMOUNT_RE.find(price).and_then(|m| parse_amount(m.as_str()))
}

/// Indices of offers priced above 10 000; flagged for manual review only.
pub fn review_suspicious_prices(offers: &[RawOffer]) -> Vec<usize> {
    let flagged: Vec<usize> = offers
        .iter()
        .enumerate()
        .filter(|(_, o)| price_number(o.price.trim()).is_some_and(|p| p > HIGH_PRICE))
        .map(|(i, _)| i)
        .collect();
    for &i in &flagged {
        let o = &offers[i];
        warn!(
            "[{}] HIGH PRICE: {} | {} | {}",
            i,
            o.price,
            o.title.chars().take(80).collect::<String>(),
            o.link
        );
    }
    flagged
}

pub fn country_from_keywords(title: &str) -> Option<&'static str> {
    let lower = title.to_lowercase();
    COUNTRY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
        .map(|(country, _)| *country)
}

fn multi_country(title: &str) -> Option<&'static str> {
    MULTI_COUNTRY
        .iter()
        .find(|(parts, _)| parts.iter().all(|p| title.contains(p)))
        .map(|(_, name)| *name)
}

/// Re-derive empty or known-bad destinations from the title.
pub fn fix_destinations_from_titles(offers: &mut [RawOffer]) -> usize {
    let mut fixed = 0;
    for (i, offer) in offers.iter_mut().enumerate() {
        let current = offer.destination.trim().to_string();
        let known_fix = DESTINATION_FIXES.iter().find(|(bad, _)| *bad == current);
        if !current.is_empty() && known_fix.is_none() {
            continue;
        }

        let new = country_from_keywords(&offer.title)
            .or_else(|| known_fix.and_then(|(_, fix)| *fix))
            .or_else(|| multi_country(&offer.title));

        if let Some(new) = new
            && new != current
        {
            info!("[{}] Fixed destination: '{}' -> '{}'", i, current, new);
            offer.destination = new.to_string();
            fixed += 1;
        }
    }
    fixed
}

/// Recompute the end date from the title's number when the range is off by
/// more than a day.
pub fn fix_date_inconsistencies(offers: &mut [RawOffer]) -> usize {
    let mut fixed = 0;
    for (i, offer) in offers.iter_mut().enumerate() {
        let Some((start, end)) = parse_range(&offer.dates) else {
            continue;
        };
        let Some(stated) = TITLE_DURATION_RE
            .captures(&offer.title)
            .and_then(|c| c[1].parse::<i64>().ok())
        else {
            continue;
        };
        let actual = (end - start).num_days() + 1;
        if (actual - stated).abs() > 1 && stated > 1 {
            let corrected = format!(
                "{} - {}",
                fmt_dmy(start),
                fmt_dmy(start + Duration::days(stated - 1))
            );
            info!(
                "[{}] Date inconsistency: {} ({} days) vs title {} days, corrected to {}",
                i, offer.dates, actual, stated, corrected
            );
            offer.dates = corrected;
            fixed += 1;
        }
    }
    fixed
}

// ── Runner ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixSummary {
    pub refetched: usize,
    pub ranges_extended: usize,
    pub destinations_cleared: usize,
    pub high_prices: Vec<usize>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FinalSummary {
    pub destinations_fixed: usize,
    pub dates_fixed: usize,
    pub high_prices: Vec<usize>,
}

pub struct Fixer {
    client: HttpClient,
    path: PathBuf,
    dir: PathBuf,
}

impl Fixer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(&config.scraper)?,
            path: config.raw_path(Agency::Aratour),
            dir: config.output.dir.clone(),
        })
    }

    /// Refetch incomplete offers and apply the offline fixes.
    pub async fn run(&self) -> Result<FixSummary> {
        let mut offers = load_raw_offers(&self.path)?;
        info!("Loaded {} offers from {}", offers.len(), self.path.display());
        save_results(&self.dir.join(BACKUP_FILE), &offers)?;

        let summary = FixSummary {
            refetched: self.refetch_missing(&mut offers).await,
            ranges_extended: fix_inconsistent_date_ranges(&mut offers),
            destinations_cleared: fix_invalid_destinations(&mut offers),
            high_prices: review_suspicious_prices(&offers),
        };

        save_results(&self.path, &offers)?;
        info!(
            "Fix complete: {} refetched, {} ranges extended, {} destinations cleared, {} prices to review",
            summary.refetched,
            summary.ranges_extended,
            summary.destinations_cleared,
            summary.high_prices.len()
        );
        Ok(summary)
    }

    /// Offline pass over an already fixed file.
    pub fn run_final(&self) -> Result<FinalSummary> {
        let mut offers = load_raw_offers(&self.path)?;
        info!("Loaded {} offers from {}", offers.len(), self.path.display());
        save_results(&self.dir.join(FINAL_BACKUP_FILE), &offers)?;

        let summary = FinalSummary {
            destinations_fixed: fix_destinations_from_titles(&mut offers),
            dates_fixed: fix_date_inconsistencies(&mut offers),
            high_prices: review_suspicious_prices(&offers),
        };

        save_results(&self.path, &offers)?;
        info!(
            "Final fixes complete: {} destinations, {} date ranges, {} prices to review",
            summary.destinations_fixed,
            summary.dates_fixed,
            summary.high_prices.len()
        );
        Ok(summary)
    }

    async fn refetch_missing(&self, offers: &mut [RawOffer]) -> usize {
        let mut fixed = 0;
        for (i, offer) in offers.iter_mut().enumerate() {
            if !needs_refetch(offer) {
                debug!("Offer [{}] already complete", i);
                continue;
            }
            if offer.link.trim().is_empty() {
                continue;
            }
            info!("Refetching [{}]: {}", i, collapse_ws(&offer.title).chars().take(50).collect::<String>());

            let details = match self.client.get_text(&offer.link).await {
                Ok(html) => extract_offer_details(&html),
                Err(e) => {
                    warn!("Error fetching {}: {:#}", offer.link, e);
                    continue;
                }
            };
            match details {
                Ok(details) if apply_details(offer, details.clone()) => {
                    info!(
                        "  Updated [{}]: dates='{}', dest='{}', price='{}'",
                        i, offer.dates, offer.destination, offer.price
                    );
                    fixed += 1;
                }
                Ok(_) => debug!("No changes for offer [{}]", i),
                Err(e) => warn!("Could not parse {}: {}", offer.link, e),
            }
        }
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, price: &str, dates: &str, destination: &str) -> RawOffer {
        RawOffer {
            title: title.into(),
            link: "https://aratour.bg/offer/1".into(),
            price: price.into(),
            dates: dates.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    const OFFER_PAGE: &str = r#"
      <html><head><title>Италия 2026 – Рим и Флоренция</title>
      <script>var price = "99999 лв";</script></head>
      <body>
        <div class="price">Цена от 1290 лв. на човек</div>
        <span>Отпътуване от 12.06.2026 до 05.06.2026</span>
        <p>Програма: 8 дни / 7 нощувки</p>
      </body></html>
    "#;

    #[test]
    fn test_extract_offer_details() {
        let d = extract_offer_details(OFFER_PAGE).unwrap();
        assert_eq!(d.price.as_deref(), Some("1290 лв."));
        assert_eq!(d.dates.as_deref(), Some("05.06.2026 - 12.06.2026"));
        assert_eq!(d.destination.as_deref(), Some("Италия"));
    }

    #[test]
    fn test_extract_grouped_page_price() {
        let html = r#"<title>Гърция</title><div class="price">Цена: 1 099 лв. на човек</div>"#;
        let d = extract_offer_details(html).unwrap();
        assert_eq!(d.price.as_deref(), Some("1 099 лв."));
        assert_eq!(d.price.as_deref().and_then(price_number), Some(1099.0));
    }

    #[test]
    fn test_calendar_fallback_and_single_date_extension() {
        let html = r#"
          <title>Нещо друго</title>
          <div class="offer-info"><span class="icon-calendar"></span> 03.10.2026</div>
          <p>5 дни / 4 нощувки</p>
        "#;
        let d = extract_offer_details(html).unwrap();
        assert_eq!(d.dates.as_deref(), Some("03.10.2026 - 07.10.2026"));
        assert_eq!(d.price, None);
        assert_eq!(d.destination, None);
    }

    #[test]
    fn test_apply_details_never_blanks() {
        let mut offer = raw("Рим", "800 лв.", "", "Италия");
        let changed = apply_details(
            &mut offer,
            PageDetails {
                price: None,
                dates: Some("01.06.2026".into()),
                destination: Some("Италия".into()),
            },
        );
        assert!(changed);
        assert_eq!(offer.price, "800 лв.");
        assert_eq!(offer.dates, "01.06.2026");
        assert!(!apply_details(&mut offer, PageDetails::default()));
    }

    #[test]
    fn test_fix_inconsistent_date_ranges() {
        let mut offers = vec![
            raw("Рим 5 дни", "", "01.06.2026 - 03.06.2026", ""),
            raw("Рим 5 дни", "", "01.06.2026 - 02.06.2026", ""),
            raw("Рим 4 нощувки", "", "01.06.2026 - 04.06.2026", ""),
            raw("Рим", "", "01.06.2026 - 02.06.2026", ""),
        ];
        assert_eq!(fix_inconsistent_date_ranges(&mut offers), 2);
        assert_eq!(offers[0].dates, "01.06.2026 - 05.06.2026");
        assert_eq!(offers[1].dates, "01.06.2026 - 02.06.2026");
        assert_eq!(offers[2].dates, "01.06.2026 - 05.06.2026");
    }

    #[test]
    fn test_fix_invalid_destinations_keeps_known() {
        let mut offers = vec![
            raw("a", "", "", "Австрия"),
            raw("b", "", "", "Тръгване от Варна"),
            raw("c", "", "", "Занзибар"),
        ];
        assert_eq!(fix_invalid_destinations(&mut offers), 1);
        assert_eq!(offers[0].destination, "Австрия");
        assert_eq!(offers[1].destination, "");
        assert_eq!(offers[2].destination, "Занзибар");
    }

    #[test]
    fn test_review_suspicious_prices() {
        let offers = vec![
            raw("a", "12 500 лв.", "", ""),
            raw("b", "950 лв.", "", ""),
            raw("c", "по запитване", "", ""),
            raw("d", "15000,00 лв", "", ""),
            raw("e", "2,450 лв", "", ""),
            raw("f", "10\u{a0}450 лв.", "", ""),
        ];
        assert_eq!(review_suspicious_prices(&offers), vec![0, 3, 5]);
    }

    #[test]
    fn test_fix_destinations_from_titles() {
        let mut offers = vec![
            raw("Екскурзия до Венеция и Верона", "", "", ""),
            raw("Почивка на остров", "", "", "Pochivki Malta"),
            raw("Грузия и Армения", "", "", ""),
            raw("Слънчев бряг", "", "", "Тръгване От Варна"),
            raw("Анталия", "", "", "Гърция"),
        ];
        assert_eq!(fix_destinations_from_titles(&mut offers), 3);
        assert_eq!(offers[0].destination, "Италия");
        assert_eq!(offers[1].destination, "Малта");
        assert_eq!(offers[2].destination, "Грузия и Армения");
        assert_eq!(offers[3].destination, "Тръгване От Варна");
        assert_eq!(offers[4].destination, "Гърция");
    }

    #[test]
    fn test_fix_date_inconsistencies() {
        let mut offers = vec![
            raw("Япония 10 дни", "", "01.04.2026 - 20.04.2026", ""),
            raw("Япония 10 дни", "", "01.04.2026 - 11.04.2026", ""),
            raw("Япония", "", "01.04.2026 - 20.04.2026", ""),
            raw("Уикенд 1 дни", "", "01.04.2026 - 20.04.2026", ""),
        ];
        assert_eq!(fix_date_inconsistencies(&mut offers), 1);
        assert_eq!(offers[0].dates, "01.04.2026 - 10.04.2026");
        assert_eq!(offers[1].dates, "01.04.2026 - 11.04.2026");
        assert_eq!(offers[3].dates, "01.04.2026 - 20.04.2026");
    }

    fn fixer_in(dir: &std::path::Path) -> Fixer {
        let mut config = AppConfig::default();
        config.output.dir = dir.to_path_buf();
        config.scraper.request_delay_ms = 0;
        config.scraper.jitter_ms = 0;
        Fixer::new(&config).unwrap()
    }

    #[test]
    fn test_refetch_skips_complete_and_linkless() {
        let dir = std::env::temp_dir().join(format!("travel-fix-{}", uuid::Uuid::new_v4()));
        let fixer = fixer_in(&dir);
        let mut complete = raw("Рим 5 дни", "800 лв.", "01.06.2026", "Италия");
        complete.link = "http://127.0.0.1:9/unreachable".into();
        let mut linkless = raw("Рим", "", "", "");
        linkless.link.clear();
        let mut offers = vec![complete, linkless];
        assert_eq!(tokio_test::block_on(fixer.refetch_missing(&mut offers)), 0);
        assert_eq!(offers[1].price, "");
    }

    #[test]
    fn test_run_final_writes_backup() {
        let dir = std::env::temp_dir().join(format!("travel-fix-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let offers = vec![raw("Екскурзия до Рим 5 дни", "", "01.06.2026 - 20.06.2026", "")];
        save_results(&dir.join("aratur.json"), &offers).unwrap();

        let summary = fixer_in(&dir).run_final().unwrap();
        assert_eq!(summary.destinations_fixed, 1);
        assert_eq!(summary.dates_fixed, 1);
        assert!(summary.high_prices.is_empty());

        assert_eq!(load_raw_offers(&dir.join(FINAL_BACKUP_FILE)).unwrap(), offers);
        let fixed = load_raw_offers(&dir.join("aratur.json")).unwrap();
        assert_eq!(fixed[0].destination, "Италия");
        assert_eq!(fixed[0].dates, "01.06.2026 - 05.06.2026");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
