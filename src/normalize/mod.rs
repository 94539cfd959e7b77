//! Merge per-agency raw files into [`UnifiedOffer`]s: EUR prices, ISO date
//! ranges, trip length in days and a canonical destination name.

use crate::models::{Agency, RawOffer, UnifiedOffer};
use crate::scraper::cleaner::{AMOUNT_PATTERN, parse_amount, parse_dmy};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const BGN_TO_EUR: f64 = 0.511292981;
pub const USD_TO_EUR: f64 = 0.85;

/// Minimum similarity for a fuzzy destination match.
const FUZZY_CUTOFF: f64 = 0.8;

static EUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)({AMOUNT_PATTERN})\s*(?:EUR|€)")).unwrap());
static ANGEL_DUAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"({AMOUNT_PATTERN})\s*лв\.?\s*/\s*({AMOUNT_PATTERN})\s*EUR"
    ))
    .unwrap()
});
static ANGEL_BGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"({AMOUNT_PATTERN})\s*лв")).unwrap());
static BGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)({AMOUNT_PATTERN})\s*(?:BGN|лв)")).unwrap());
static USD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"({AMOUNT_PATTERN})\s*\$")).unwrap());

static DURATION_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\d+\s+(?:дни|ден|days?|nights?|нощувки)$").unwrap());
static DURATION_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s+(?:дни|ден|days?|nights?|нощувки)").unwrap());
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());
static DATE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}[./-]\d{1,2}(?:[./-]\d{2,4})?\b").unwrap());
static DARI_DATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Дати:\s*([^,\n]+)").unwrap());

static FIRST_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());
static NIGHTS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*нощув").unwrap());
static DAYS_BG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*дни").unwrap());
static DAYS_EN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*days?").unwrap());

const DESTINATION_PREFIXES: [&str; 4] = ["oferti ", "pochivki ", "ekskurziya do ", "po4ivki "];

const EXCLUDED_TERMS: [&str; 17] = [
    "instagram", "инстаграм", "facebook", "twitter", "tiktok", "youtube", "social", "promo",
    "реклама", "промо", "giveaway", "contest", "competition", "розыгрыш", "конкурс", "лотария",
    "лотарий",
];

/// Short titles that still name a real destination.
const ALLOWED_SHORT_TITLES: &[&str] = &[
    "албания", "гърция", "турция", "испания", "италия", "франция", "египет", "тунис", "мароко",
    "българия", "сърбия", "македония", "черна гора", "хърватия", "грузия", "армения",
    "азербайджан", "киргизстан", "таджикистан", "туркменистан", "узбекистан", "казахстан",
    "бразилия", "аржентина", "уругвай", "доминикана", "зимбабве", "танзания", "замбия",
    "ботсвана", "намибия", "юар", "мозамбик", "занзибар", "мавриций", "сешели", "мадагаскар",
    "реюнион", "комори", "кирибати", "науру", "палау", "маршалови острови", "микронезия",
    "вануату", "соломонови острови", "папуа нова гвинея", "източен тимор", "бруней", "лаос",
    "камбоджа", "мианмар", "непал", "бутан", "молдова", "украйна", "беларус",
    "балтийски държави", "скандинавия", "иберия", "балкани", "кавказ", "централна азия",
    "далечина изток", "югоизточна азия",
];

const CORE_COUNTRIES: [&str; 10] = [
    "албания", "гърция", "турция", "испания", "италия", "франция", "египет", "тунис", "мароко",
    "българия",
];

/// Lowercase destination keys to canonical names.
pub type Mappings = BTreeMap<String, String>;

pub type DateSpan = (Option<NaiveDate>, Option<NaiveDate>);

/// Read the destination mapping file. A missing or broken file only limits
/// destination normalization, so both cases log and yield an empty map.
pub fn load_mappings(path: &Path) -> Mappings {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => {
            warn!(
                "{} not found. Destination normalization will be limited.",
                path.display()
            );
            return Mappings::new();
        }
    };
    match serde_json::from_str::<Mappings>(&text) {
        Ok(map) => map
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect(),
        Err(e) => {
            warn!(
                "{} is invalid JSON ({}). Destination normalization will be limited.",
                path.display(),
                e
            );
            Mappings::new()
        }
    }
}

// ── Price ─────────────────────────────────────────────────────────────────────

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Price text to EUR. An explicit EUR amount wins; BGN and USD are converted.
pub fn parse_price(price: &str, agency: Agency) -> Option<f64> {
    let price = price.trim();

    let parsed = if let Some(c) = EUR_RE.captures(price) {
        parse_amount(&c[1])
    } else if agency == Agency::AngelTravel {
        if let Some(c) = ANGEL_DUAL_RE.captures(price) {
            parse_amount(&c[2])
        } else {
            ANGEL_BGN_RE
                .captures(price)
                .and_then(|c| parse_amount(&c[1]))
                .map(|bgn| round2(bgn * BGN_TO_EUR))
        }
    } else if let Some(c) = BGN_RE.captures(price) {
        parse_amount(&c[1]).map(|bgn| round2(bgn * BGN_TO_EUR))
    } else {
        USD_RE
            .captures(price)
            .and_then(|c| parse_amount(&c[1]))
            .map(|usd| round2(usd * USD_TO_EUR))
    };

    if parsed.is_none() && !price.is_empty() {
        warn!("Failed to parse price '{}' for {}", price, agency);
    }
    parsed
}

// ── Dates ─────────────────────────────────────────────────────────────────────

fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Holiday trips from Angel Travel often carry no dates; the title names the
/// holiday instead.
pub fn infer_angel_travel_dates(title: &str) -> DateSpan {
    let t = title.to_lowercase();
    let has = |words: [&str; 2]| words.iter().any(|w| t.contains(w));

    if has(["нова година", "new year"]) {
        (ymd(2025, 12, 31), ymd(2026, 1, 1))
    } else if has(["коледа", "christmas"]) {
        (ymd(2025, 12, 25), ymd(2025, 12, 26))
    } else if has(["свети валентин", "valentine"]) {
        (ymd(2026, 2, 14), None)
    } else if has(["карнавал", "carnival"]) {
        (ymd(2026, 2, 1), ymd(2026, 2, 5))
    } else {
        (None, None)
    }
}

/// One date: ISO, strict day-first, or the first day-first token in the text.
fn parse_one(s: &str, year: i32) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(m) = ISO_RE.find(s) {
        return NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok();
    }
    parse_dmy(s, Some(year))
        .or_else(|| DATE_TOKEN_RE.find(s).and_then(|m| parse_dmy(m.as_str(), Some(year))))
}

/// Free-form date text to a start/end pair. Dates without a year fall in
/// `year`.
pub fn parse_date_string(text: &str, year: i32) -> DateSpan {
    let mut s = text.trim();
    if s.is_empty() || DURATION_ONLY_RE.is_match(s) {
        return (None, None);
    }
    if let Some((first, _)) = s.split_once(',') {
        s = first.trim();
    }

    if let Some((first, rest)) = s.split_once(" - ") {
        let Some(start) = parse_one(first, year) else {
            debug!("Unparseable date range '{}'", s);
            return (None, None);
        };
        let end_text = rest.split(" - ").next().unwrap_or_default().trim();
        if end_text.is_empty() {
            return (Some(start), None);
        }
        return match parse_one(end_text, year) {
            Some(end) => (Some(start), Some(end)),
            None => {
                debug!("Unparseable date range end '{}'", s);
                (None, None)
            }
        };
    }

    match parse_one(s, year) {
        Some(d) => (Some(d), None),
        None => {
            if !DURATION_LIKE_RE.is_match(s) {
                debug!("Unparseable date '{}'", s);
            }
            (None, None)
        }
    }
}

/// Pick the date source each agency actually fills, then parse it.
pub fn parse_dates(dates: &str, description: &str, agency: Agency, title: &str, year: i32) -> DateSpan {
    let dates = dates.trim();
    let description = description.trim();

    match agency {
        // Aratour cards keep dates in the description text.
        Agency::Aratour if !description.is_empty() => {
            let span = parse_date_string(description, year);
            if span.0.is_some() {
                return span;
            }
        }
        Agency::DariTour if dates.is_empty() => {
            if let Some(c) = DARI_DATES_RE.captures(description) {
                return parse_date_string(c[1].trim(), year);
            }
        }
        Agency::AngelTravel if dates.is_empty() => {
            let span = infer_angel_travel_dates(title);
            if span.0.is_some() {
                return span;
            }
        }
        _ => {}
    }

    parse_date_string(dates, year)
}

/// Trip length in days. Nights count as nights + 1.
pub fn parse_duration(duration: &str, title: &str, description: &str) -> Option<i64> {
    if let Some(c) = FIRST_NUMBER_RE.captures(duration) {
        let n: i64 = c[1].parse().ok()?;
        return Some(if duration.to_lowercase().contains("нощув") { n + 1 } else { n });
    }

    let capture = |re: &Regex, s: &str| -> Option<i64> { re.captures(s)?[1].parse().ok() };

    let title = title.to_lowercase();
    if let Some(n) = capture(&NIGHTS_RE, &title) {
        return Some(n + 1);
    }
    if let Some(n) = capture(&DAYS_BG_RE, &title).or_else(|| capture(&DAYS_EN_RE, &title)) {
        return Some(n);
    }

    let description = description.to_lowercase();
    if let Some(n) = capture(&NIGHTS_RE, &description) {
        return Some(n + 1);
    }
    capture(&DAYS_BG_RE, &description)
}

// ── Destination ───────────────────────────────────────────────────────────────

fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Normalized edit similarity in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(&a, &b) as f64 / longest as f64
}

/// Uppercase the first letter of every alphabetic run.
fn title_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            start = false;
        } else {
            out.push(ch);
            start = true;
        }
    }
    out
}

pub fn normalize_destination(dest: &str, mappings: &Mappings) -> String {
    let mut dest = dest.trim().to_lowercase();
    if let Some(rest) = DESTINATION_PREFIXES.iter().find_map(|p| dest.strip_prefix(p)) {
        dest = rest.trim().to_string();
    }
    if dest.is_empty() {
        return dest;
    }

    if let Some(v) = mappings.get(&dest) {
        return v.clone();
    }
    if let Some(v) = mappings
        .iter()
        .find(|(k, _)| dest.contains(k.as_str()) || k.contains(dest.as_str()))
        .map(|(_, v)| v)
    {
        return v.clone();
    }

    let best = mappings
        .iter()
        .map(|(k, v)| (similarity(&dest, k), v))
        .filter(|(score, _)| *score >= FUZZY_CUTOFF)
        .max_by(|a, b| a.0.total_cmp(&b.0));
    if let Some((_, v)) = best {
        return v.clone();
    }

    title_words(&dest)
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Drops social-media and promo posts, bare non-destination titles and
/// offers without a usable price.
pub fn is_valid_travel_offer(offer: &UnifiedOffer) -> bool {
    let title = offer.title.to_lowercase();
    let destination = offer.destination.to_lowercase();

    if EXCLUDED_TERMS
        .iter()
        .any(|t| title.contains(t) || destination.contains(t))
    {
        return false;
    }

    if title.split_whitespace().count() <= 2
        && !ALLOWED_SHORT_TITLES.contains(&title.as_str())
        && title.chars().count() < 15
        && !CORE_COUNTRIES.iter().any(|c| title.contains(c))
    {
        return false;
    }

    matches!(offer.price_eur, Some(p) if p != 0.0)
}

// ── Standardize ───────────────────────────────────────────────────────────────

pub struct Normalizer {
    mappings: Mappings,
    year: i32,
}

impl Normalizer {
    pub fn new(mappings: Mappings) -> Self {
        Self {
            mappings,
            year: chrono::Local::now().year(),
        }
    }

    /// Year assumed for dates written without one.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn standardize_offer(&self, offer: &RawOffer, agency: Agency) -> UnifiedOffer {
        let title = offer.title.trim().to_string();
        let raw_destination = match offer.destination.trim() {
            "" => title.as_str(),
            d => d,
        };
        let (dates_start, dates_end) = parse_dates(
            &offer.dates,
            &offer.description,
            agency,
            &title,
            self.year,
        );

        UnifiedOffer {
            id: uuid::Uuid::new_v4().to_string(),
            agency: agency.display_name().to_string(),
            destination: normalize_destination(raw_destination, &self.mappings),
            price_eur: parse_price(&offer.price, agency),
            dates_start,
            dates_end,
            duration_days: parse_duration(&offer.duration, &title, &offer.description),
            link: offer.link.trim().to_string(),
            scraped_at: offer.scraped_at.clone(),
            title,
        }
    }

    fn process_file(&self, path: &Path, agency: Agency) -> Result<(Vec<UnifiedOffer>, usize)> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw: Vec<RawOffer> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;

        let mut kept = Vec::with_capacity(raw.len());
        let mut filtered = 0;
        for offer in &raw {
            let unified = self.standardize_offer(offer, agency);
            if is_valid_travel_offer(&unified) {
                kept.push(unified);
            } else {
                debug!(
                    "Filtered out invalid offer: '{}' -> {}",
                    unified.title, unified.destination
                );
                filtered += 1;
            }
        }
        Ok((kept, filtered))
    }

    /// Standardize every known agency file. Unreadable files are skipped.
    pub fn process_files(&self, paths: &[PathBuf]) -> Vec<UnifiedOffer> {
        let mut unified = Vec::new();
        for path in paths {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let Some(agency) = Agency::from_file_name(name) else {
                warn!("Skipping {}: not an agency file", path.display());
                continue;
            };
            if !path.exists() {
                warn!("Skipping {}: file not found", path.display());
                continue;
            }
            match self.process_file(path, agency) {
                Ok((offers, filtered)) => {
                    info!(
                        "{}: {} offers kept, {} filtered out",
                        agency,
                        offers.len(),
                        filtered
                    );
                    unified.extend(offers);
                }
                Err(e) => warn!("Error processing {}: {:#}", path.display(), e),
            }
        }
        unified
    }
}

pub fn save_unified(path: &Path, offers: &[UnifiedOffer]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(offers)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Processed {} offers into {}", offers.len(), path.display());
    Ok(())
}

pub fn load_unified(path: &Path) -> Result<Vec<UnifiedOffer>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    fn mappings() -> Mappings {
        [
            ("гърция", "Greece"),
            ("турция", "Turkey"),
            ("халкидики", "Greece"),
            ("италия", "Italy"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_parse_price_currencies() {
        assert_eq!(parse_price("399 €", Agency::Bohemia), Some(399.0));
        assert_eq!(parse_price("от 450.50 eur", Agency::Teztour), Some(450.5));
        assert_eq!(parse_price("1000 лв.", Agency::Aratour), Some(511.29));
        assert_eq!(parse_price("2343 BGN", Agency::DariTour), Some(1197.96));
        assert_eq!(parse_price("100$", Agency::Luxtravel), Some(85.0));
        assert_eq!(parse_price("по запитване", Agency::Profitours), None);
        assert_eq!(parse_price("", Agency::Aventura), None);
    }

    #[test]
    fn test_parse_price_grouped_amounts() {
        assert_eq!(parse_price("2,450 лв", Agency::DariTour), Some(1252.67));
        assert_eq!(parse_price("1 099 лв.", Agency::Aratour), Some(561.91));
        assert_eq!(parse_price("1\u{a0}099 лв.", Agency::Aratour), Some(561.91));
        assert_eq!(parse_price("1 250,50 лв", Agency::Bohemia), Some(639.37));
        assert_eq!(parse_price("12,50 €", Agency::Teztour), Some(12.5));
        assert_eq!(parse_price("1 299 EUR", Agency::Luxtravel), Some(1299.0));
    }

    /// Prices exactly as each scraper writes them.
    #[test]
    fn test_parse_price_scraper_output() {
        let cases = [
            ("2,450 лв", Agency::DariTour, 1252.67),
            ("1,890 лв", Agency::DariTour, 966.34),
            ("1 099 лв.", Agency::Aratour, 561.91),
            ("1250 лв.", Agency::Aratour, 639.12),
            ("1 250 лв.", Agency::Bohemia, 639.12),
            ("399 €", Agency::Bohemia, 399.0),
            ("1890 BGN", Agency::Luxtravel, 966.34),
            ("499 EUR", Agency::Aventura, 499.0),
            ("1250 BGN", Agency::Aventura, 639.12),
            ("890 BGN", Agency::Profitours, 455.05),
            ("1450 BGN", Agency::Teztour, 741.37),
            ("899 лв", Agency::AngelTravel, 459.65),
        ];
        for (price, agency, eur) in cases {
            assert_eq!(parse_price(price, agency), Some(eur), "{} ({})", price, agency);
        }
    }

    #[test]
    fn test_parse_price_angel_travel() {
        assert_eq!(parse_price("421.00 лв. / 215.25 EUR", Agency::AngelTravel), Some(215.25));
        assert_eq!(parse_price("1000 лв", Agency::AngelTravel), Some(511.29));
        assert_eq!(parse_price("1250,00 лв", Agency::AngelTravel), Some(639.12));
    }

    #[test]
    fn test_infer_angel_travel_dates() {
        assert_eq!(infer_angel_travel_dates("Нова година в Белград"), (d(2025, 12, 31), d(2026, 1, 1)));
        assert_eq!(infer_angel_travel_dates("Коледа във Виена"), (d(2025, 12, 25), d(2025, 12, 26)));
        assert_eq!(infer_angel_travel_dates("Свети Валентин в Рим"), (d(2026, 2, 14), None));
        assert_eq!(infer_angel_travel_dates("Венецианският карнавал"), (d(2026, 2, 1), d(2026, 2, 5)));
        assert_eq!(infer_angel_travel_dates("Охрид"), (None, None));
    }

    #[test]
    fn test_parse_date_string() {
        assert_eq!(parse_date_string("5 дни", 2026), (None, None));
        assert_eq!(parse_date_string("7 нощувки", 2026), (None, None));
        assert_eq!(parse_date_string("2026-06-01", 2026), (d(2026, 6, 1), None));
        assert_eq!(
            parse_date_string("2026-06-01 - 2026-06-08", 2026),
            (d(2026, 6, 1), d(2026, 6, 8))
        );
        assert_eq!(
            parse_date_string("09.02.2026, 20.02.2026", 2026),
            (d(2026, 2, 9), None)
        );
        assert_eq!(
            parse_date_string("05.03.2026 - 20.11.2026", 2026),
            (d(2026, 3, 5), d(2026, 11, 20))
        );
        assert_eq!(parse_date_string("12.06", 2027), (d(2027, 6, 12), None));
        assert_eq!(parse_date_string("12.06.2026 - ", 2026), (d(2026, 6, 12), None));
        assert_eq!(parse_date_string("по запитване", 2026), (None, None));
    }

    #[test]
    fn test_parse_dates_per_agency() {
        let span = parse_dates(
            "",
            "Автобусна програма 05.05.2026 - 09.05.2026 Тур на Рим",
            Agency::Aratour,
            "Рим",
            2026,
        );
        assert_eq!(span, (d(2026, 5, 5), d(2026, 5, 9)));

        let span = parse_dates("12.06.2026", "Без дати тук", Agency::Aratour, "Рим", 2026);
        assert_eq!(span, (d(2026, 6, 12), None));

        let span = parse_dates("", "Дати: 09.02.2026, 20.02.2026", Agency::DariTour, "Виена", 2026);
        assert_eq!(span, (d(2026, 2, 9), None));

        let span = parse_dates("", "", Agency::AngelTravel, "Коледа в Прага", 2026);
        assert_eq!(span, (d(2025, 12, 25), d(2025, 12, 26)));

        assert_eq!(parse_dates("", "", Agency::Bohemia, "Виена", 2026), (None, None));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4 дни", "", ""), Some(4));
        assert_eq!(parse_duration("7 нощувки", "", ""), Some(8));
        assert_eq!(parse_duration("", "Рим - 3 нощувки", ""), Some(4));
        assert_eq!(parse_duration("", "Круиз 10 дни", ""), Some(10));
        assert_eq!(parse_duration("", "Tour 5 days", ""), Some(5));
        assert_eq!(parse_duration("", "Рим", "Програма за 6 дни"), Some(6));
        assert_eq!(parse_duration("", "Рим", "с 2 нощувки"), Some(3));
        assert_eq!(parse_duration("", "Рим", ""), None);
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("гърция", "гърция"), 1.0);
        assert!(similarity("гърциа", "гърция") > 0.8);
        assert!(similarity("рим", "италия") < 0.5);
    }

    #[test]
    fn test_normalize_destination() {
        let m = mappings();
        assert_eq!(normalize_destination("Гърция", &m), "Greece");
        assert_eq!(normalize_destination("pochivki турция", &m), "Turkey");
        assert_eq!(normalize_destination("Почивка в Халкидики", &m), "Greece");
        assert_eq!(normalize_destination("итали", &m), "Italy");
        assert_eq!(normalize_destination("италиа", &m), "Italy");
        assert_eq!(normalize_destination("costa-brava", &m), "Costa-Brava");
        assert_eq!(normalize_destination("  ", &m), "");
    }

    fn offer(title: &str, destination: &str, price: Option<f64>) -> UnifiedOffer {
        UnifiedOffer {
            id: "x".into(),
            agency: "Bohemia".into(),
            title: title.into(),
            destination: destination.into(),
            price_eur: price,
            dates_start: None,
            dates_end: None,
            duration_days: None,
            link: String::new(),
            scraped_at: String::new(),
        }
    }

    #[test]
    fn test_is_valid_travel_offer() {
        assert!(is_valid_travel_offer(&offer("Гърция", "Greece", Some(300.0))));
        assert!(is_valid_travel_offer(&offer("Почивка на остров Крит", "Greece", Some(300.0))));
        assert!(is_valid_travel_offer(&offer("Екскурзиямногодълга", "Italy", Some(300.0))));
        assert!(is_valid_travel_offer(&offer("Рим, Италия", "Italy", Some(300.0))));
        assert!(!is_valid_travel_offer(&offer("Рим", "Italy", Some(300.0))));
        assert!(!is_valid_travel_offer(&offer("Последвайте ни в Instagram", "", Some(1.0))));
        assert!(!is_valid_travel_offer(&offer("Почивка на остров Крит", "Promo", Some(300.0))));
        assert!(!is_valid_travel_offer(&offer("Почивка на остров Крит", "Greece", None)));
        assert!(!is_valid_travel_offer(&offer("Почивка на остров Крит", "Greece", Some(0.0))));
    }

    #[test]
    fn test_standardize_offer() {
        let mut raw = RawOffer::new(" Почивка в Халкидики - 7 нощувки ", "https://www.bohemia.bg/o/1 ");
        raw.price = "399 €".into();
        raw.dates = "01.06.2026 - 08.06.2026".into();
        raw.scraped_at = "2026-01-01T10:00:00".into();

        let n = Normalizer::new(mappings()).with_year(2026);
        let u = n.standardize_offer(&raw, Agency::Bohemia);
        assert_eq!(uuid::Uuid::parse_str(&u.id).unwrap().get_version_num(), 4);
        assert_eq!(u.agency, "Bohemia");
        assert_eq!(u.title, "Почивка в Халкидики - 7 нощувки");
        assert_eq!(u.destination, "Greece");
        assert_eq!(u.price_eur, Some(399.0));
        assert_eq!(u.dates_start, d(2026, 6, 1));
        assert_eq!(u.dates_end, d(2026, 6, 8));
        assert_eq!(u.duration_days, Some(8));
        assert_eq!(u.link, "https://www.bohemia.bg/o/1");
        assert_eq!(u.scraped_at, "2026-01-01T10:00:00");

        let json = serde_json::to_string(&u).unwrap();
        assert!(json.contains(r#""dates_start":"2026-06-01""#));
    }

    #[test]
    fn test_process_files_filters_and_skips() {
        let dir = std::env::temp_dir().join(format!("travel-normalize-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let bohemia = dir.join("bohemia.json");
        std::fs::write(
            &bohemia,
            r#"[
              {"title": "Виена - Коледен базар", "link": "https://www.bohemia.bg/o/1", "price": "399 €", "dates": "4 дни", "duration": "4 дни", "destination": "Австрия", "scrapedAt": "2026-01-01T10:00:00"},
              {"title": "Instagram giveaway", "link": "https://www.bohemia.bg/o/2", "price": "1 €", "dates": "", "destination": "", "scrapedAt": ""}
            ]"#,
        )
        .unwrap();
        let broken = dir.join("teztour.json");
        std::fs::write(&broken, "not json").unwrap();

        let n = Normalizer::new(Mappings::new());
        let offers = n.process_files(&[bohemia, broken, dir.join("aventura.json"), dir.join("other.json")]);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].destination, "Австрия");
        assert_eq!(offers[0].duration_days, Some(4));

        let out = dir.join("unified_offers.json");
        save_unified(&out, &offers).unwrap();
        assert_eq!(load_unified(&out).unwrap(), offers);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_mappings_missing_or_invalid() {
        assert!(load_mappings(Path::new("/nonexistent/destination_mappings.json")).is_empty());
        let path = std::env::temp_dir().join(format!("mappings-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{broken").unwrap();
        assert!(load_mappings(&path).is_empty());
        std::fs::write(&path, r#"{" Гърция ": "Greece"}"#).unwrap();
        assert_eq!(load_mappings(&path).get("гърция").map(String::as_str), Some("Greece"));
        std::fs::remove_file(&path).unwrap();
    }
}
