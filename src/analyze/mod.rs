//! Data-quality report over one raw agency file.
//!
//! Every offer lands in exactly one bucket per check (dates, prices,
//! destinations, titles, links, date consistency). The report lists counts,
//! percentages, a few sample offers and what to fix first.

use crate::models::{Agency, RawOffer};
use crate::scraper::cleaner::parse_amount;
use crate::utils::fmt_percent;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

pub const REPORT_FILE: &str = "data_analysis_report.txt";

static DATE_FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}[./-]\d{1,2}[./-]\d{4}(?:\s*-\s*\d{1,2}[./-]\d{1,2}[./-]\d{4})?$").unwrap()
});
static PRICE_FORMAT_RE: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"^(?:\d{1,3}(?:[ \x{A0}]\d{3})+|\d{1,3}(?:,\d{3})+|\d+)(?:[.,]\d{2})?\s*лв\.?$")
            .unwrap()
    });
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());
static DAYS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*дни").unwrap());
static NIGHTS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*нощувки").unwrap());

const LOW_PRICE: f64 = 100.0;
const HIGH_PRICE: f64 = 10_000.0;
const MIN_TITLE_CHARS: usize = 10;
const INDEX_PREVIEW: usize = 10;

pub(crate) const ARATOUR_DESTINATIONS: &[&str] = &[
    "Турция", "Гърция", "Италия", "Испания", "Франция", "Египет", "Тунис", "Мароко", "България",
    "Албания", "Македония", "Сърбия", "Черна гора", "Хърватия", "Словения", "Австрия",
    "Швейцария", "Чехия", "Полша", "Унгария", "Румъния", "Германия", "Холандия", "Белгия",
    "Великобритания", "Ирландия", "Португалия", "Йордания", "Куба", "Мексико", "Доминикана",
    "Ямайка", "Тайланд", "Виетнам", "Япония", "Китай", "Индия", "Индонезия", "Малайзия",
    "Сингапур", "Южна Корея", "Филипини", "Австралия", "Нова Зеландия", "Канада", "САЩ",
    "Бразилия", "Аржентина", "Чили", "Перу", "Колумбия", "Еквадор", "Боливия", "Уругвай",
    "Парагвай", "Малта",
];

const DARI_DESTINATIONS: &[&str] = &[
    "Австралия", "Нова Зеландия", "Сингапур", "Банкок", "Тайланд", "Бразилия", "Рио де Жанейро",
    "Дубай", "ОАЕ", "Индия", "Португалия", "Русия", "Москва", "Санкт Петербург", "Доминикана",
    "Куба", "Мексико", "Япония", "Китай", "Виетнам", "Филипини", "Малайзия", "Индонезия",
    "Южна Корея", "Тайван", "Израел", "Йордания", "Ливан", "Турция", "Гърция", "Италия",
    "Испания", "Франция", "Германия", "Австрия", "Швейцария", "Чехия", "Полша", "Унгария",
    "Румъния", "България", "Сърбия", "Хърватия", "Словения", "Черна гора", "Албания",
    "Македония", "Великобритания", "Ирландия", "Нидерландия", "Белгия", "Швеция", "Норвегия",
    "Дания", "Финландия", "Естония", "Латвия", "Литва", "САЩ", "Канада", "Аржентина", "Чили",
    "Перу", "Колумбия", "Еквадор", "Боливия", "Уругвай", "Парагвай", "Мароко", "Тунис", "Египет",
    "Кения", "Танзания", "ЮАР", "Намибия", "Замбия", "Зимбабве", "Малави", "Мозамбик",
    "Мадагаскар", "Сейшелски острови", "Мавриций", "Реюнион",
];

/// Fragments that mark a scraped "destination" as a category, season,
/// departure city or partner name.
pub(crate) const INVALID_DESTINATION_KEYWORDS: &[&str] = &[
    "партньорство", "partnership", "абакс", "abaks", "pochi", "ekskurzi", "tour", "пътуван",
    "пътешеств", "vacation", "trip", "early", "booking", "ранни", "записван", "лято", "зима",
    "пролет", "есен", "all", "inclusive", "all-inclusive", "всичко", "включен", "от", "до", "в",
    "коледа", "christmas", "нова-година", "new-year", "великден", "easter", "уикенд", "weekend",
    "екзотични", "exotic", "круизи", "cruises", "авторски", "author", "специални", "special",
    "промо", "promo", "тръгване", "departure", "варна", "sofia", "софия", "burgas", "бургас",
    "пловдив", "plovdiv", "from", "летище", "airport",
];

const SUSPICIOUS_TITLE_KEYWORDS: &[&str] = &[
    "debug", "test", "sample", "example", "template", "цена по запитване", "price on request",
];

const ROUND_TRIP_KEYWORDS: &[&str] = &[
    "екскурзия", "тур", "пътешествие", "приключение", "круиз", "нова година", "великден", "коледа",
];

/// What to check and how strictly, per agency.
#[derive(Debug, Clone)]
pub struct Profile {
    pub agency: Agency,
    known_destinations: Vec<&'static str>,
    /// When set, unknown destinations are invalid only if they contain one of
    /// these fragments; otherwise every unknown destination is invalid.
    invalid_keywords: Option<&'static [&'static str]>,
    suspicious_titles: bool,
    date_consistency: bool,
}

impl Profile {
    pub fn for_agency(agency: Agency) -> Self {
        match agency {
            Agency::Aratour => Self {
                agency,
                known_destinations: ARATOUR_DESTINATIONS.to_vec(),
                invalid_keywords: Some(INVALID_DESTINATION_KEYWORDS),
                suspicious_titles: true,
                date_consistency: true,
            },
            Agency::DariTour => Self {
                agency,
                known_destinations: DARI_DESTINATIONS.to_vec(),
                invalid_keywords: None,
                suspicious_titles: false,
                date_consistency: false,
            },
            _ => {
                let mut known = ARATOUR_DESTINATIONS.to_vec();
                known.extend(DARI_DESTINATIONS.iter().filter(|d| !ARATOUR_DESTINATIONS.contains(*d)));
                Self {
                    agency,
                    known_destinations: known,
                    invalid_keywords: Some(INVALID_DESTINATION_KEYWORDS),
                    suspicious_titles: true,
                    date_consistency: true,
                }
            }
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DateIssues {
    pub empty: Vec<usize>,
    pub invalid_format: Vec<usize>,
    pub valid: Vec<usize>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PriceIssues {
    pub empty: Vec<usize>,
    pub invalid_format: Vec<usize>,
    pub too_low: Vec<usize>,
    pub too_high: Vec<usize>,
    pub valid: Vec<usize>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DestinationIssues {
    pub empty: Vec<usize>,
    pub invalid: Vec<usize>,
    pub valid: Vec<usize>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TitleIssues {
    pub empty: Vec<usize>,
    pub too_short: Vec<usize>,
    pub suspicious: Vec<usize>,
    pub valid: Vec<usize>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LinkIssues {
    pub empty: Vec<usize>,
    pub invalid: Vec<usize>,
    pub valid: Vec<usize>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConsistencyIssues {
    pub single_date_multi_day: Vec<usize>,
    pub inconsistent_ranges: Vec<usize>,
    pub valid: Vec<usize>,
}

pub fn analyze_dates(offers: &[RawOffer]) -> DateIssues {
    let mut issues = DateIssues::default();
    for (i, offer) in offers.iter().enumerate() {
        let dates = offer.dates.trim();
        if dates.is_empty() {
            issues.empty.push(i);
        } else if !DATE_FORMAT_RE.is_match(dates) {
            issues.invalid_format.push(i);
        } else {
            issues.valid.push(i);
        }
    }
    issues
}

/// "1234.56 лв." → 1234.56, "1 099 лв." → 1099
fn price_value(price: &str) -> Option<f64> {
    parse_amount(price)
}

pub fn analyze_prices(offers: &[RawOffer]) -> PriceIssues {
    let mut issues = PriceIssues::default();
    for (i, offer) in offers.iter().enumerate() {
        let price = offer.price.trim();
        if price.is_empty() {
            issues.empty.push(i);
            continue;
        }
        if !PRICE_FORMAT_RE.is_match(price) {
            issues.invalid_format.push(i);
            continue;
        }
        match price_value(price) {
            Some(v) if v < LOW_PRICE => issues.too_low.push(i),
            Some(v) if v > HIGH_PRICE => issues.too_high.push(i),
            Some(_) => issues.valid.push(i),
            None => issues.invalid_format.push(i),
        }
    }
    issues
}

pub fn analyze_destinations(offers: &[RawOffer], profile: &Profile) -> DestinationIssues {
    let mut issues = DestinationIssues::default();
    for (i, offer) in offers.iter().enumerate() {
        let dest = offer.destination.trim();
        if dest.is_empty() {
            issues.empty.push(i);
        } else if profile.known_destinations.contains(&dest) {
            issues.valid.push(i);
        } else {
            let lower = dest.to_lowercase();
            let invalid = match profile.invalid_keywords {
                Some(keywords) => keywords.iter().any(|k| lower.contains(k)),
                None => true,
            };
            if invalid {
                issues.invalid.push(i);
            } else {
                // unrecognized but plausible
                issues.valid.push(i);
            }
        }
    }
    issues
}

pub fn analyze_titles(offers: &[RawOffer], profile: &Profile) -> TitleIssues {
    let mut issues = TitleIssues::default();
    for (i, offer) in offers.iter().enumerate() {
        let title = offer.title.trim();
        let lower = title.to_lowercase();
        if title.is_empty() {
            issues.empty.push(i);
        } else if title.chars().count() < MIN_TITLE_CHARS {
            issues.too_short.push(i);
        } else if profile.suspicious_titles
            && SUSPICIOUS_TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
        {
            issues.suspicious.push(i);
        } else {
            issues.valid.push(i);
        }
    }
    issues
}

pub fn analyze_links(offers: &[RawOffer]) -> LinkIssues {
    let mut issues = LinkIssues::default();
    for (i, offer) in offers.iter().enumerate() {
        let link = offer.link.trim();
        if link.is_empty() {
            issues.empty.push(i);
        } else if !URL_RE.is_match(link) {
            issues.invalid.push(i);
        } else {
            issues.valid.push(i);
        }
    }
    issues
}

/// Trip length stated in the text: "N дни", else "N нощувки" + 1.
pub fn stated_duration(text: &str) -> Option<i64> {
    if let Some(c) = DAYS_RE.captures(text) {
        return c[1].parse().ok();
    }
    NIGHTS_RE
        .captures(text)
        .and_then(|c| c[1].parse::<i64>().ok())
        .map(|n| n + 1)
}

/// Inclusive day count of a "DD.MM.YYYY - DD.MM.YYYY" range.
pub fn range_days(dates: &str) -> Option<i64> {
    let parts: Vec<&str> = dates.split(" - ").collect();
    let [start, end] = parts.as_slice() else {
        return None;
    };
    let start = NaiveDate::parse_from_str(start.trim(), "%d.%m.%Y").ok()?;
    let end = NaiveDate::parse_from_str(end.trim(), "%d.%m.%Y").ok()?;
    Some((end - start).num_days() + 1)
}

pub fn analyze_date_consistency(offers: &[RawOffer]) -> ConsistencyIssues {
    let mut issues = ConsistencyIssues::default();
    for (i, offer) in offers.iter().enumerate() {
        let dates = offer.dates.trim();
        let text = format!("{} {}", offer.title.to_lowercase(), offer.description.to_lowercase());
        let duration = stated_duration(&text);

        if !dates.is_empty()
            && !dates.contains('-')
            && duration.is_some_and(|d| d > 1)
            && ROUND_TRIP_KEYWORDS.iter().any(|k| text.contains(k))
        {
            issues.single_date_multi_day.push(i);
            continue;
        }

        if dates.contains('-')
            && let (Some(actual), Some(stated)) = (range_days(dates), duration)
            && (actual - stated).abs() > 1
        {
            issues.inconsistent_ranges.push(i);
            continue;
        }

        issues.valid.push(i);
    }
    issues
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Analysis {
    pub total: usize,
    pub dates: DateIssues,
    pub prices: PriceIssues,
    pub destinations: DestinationIssues,
    pub titles: TitleIssues,
    pub links: LinkIssues,
    pub consistency: Option<ConsistencyIssues>,
}

pub fn analyze(offers: &[RawOffer], profile: &Profile) -> Analysis {
    Analysis {
        total: offers.len(),
        dates: analyze_dates(offers),
        prices: analyze_prices(offers),
        destinations: analyze_destinations(offers, profile),
        titles: analyze_titles(offers, profile),
        links: analyze_links(offers),
        consistency: profile.date_consistency.then(|| analyze_date_consistency(offers)),
    }
}

fn preview(indices: &[usize]) -> String {
    let shown: Vec<String> = indices.iter().take(INDEX_PREVIEW).map(usize::to_string).collect();
    let more = if indices.len() > INDEX_PREVIEW { ", ..." } else { "" };
    format!("[{}{}]", shown.join(", "), more)
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub fn render_report(offers: &[RawOffer], analysis: &Analysis, agency: Agency) -> String {
    let a = analysis;
    let total = a.total;
    let rule = "=".repeat(60);
    let mut out = String::new();

    push_line(&mut out, &rule);
    push_line(&mut out, format!("{} DATA ANALYSIS REPORT", agency.display_name().to_uppercase()));
    push_line(&mut out, &rule);
    push_line(&mut out, format!("Total offers analyzed: {}\n", total));

    push_line(&mut out, "SUMMARY:");
    let mut valid_line = |label: &str, n: usize| {
        push_line(&mut out, format!("  Valid {}: {} ({})", label, n, fmt_percent(n, total)));
    };
    valid_line("dates", a.dates.valid.len());
    valid_line("prices", a.prices.valid.len());
    valid_line("destinations", a.destinations.valid.len());
    valid_line("titles", a.titles.valid.len());
    valid_line("links", a.links.valid.len());
    if let Some(c) = &a.consistency {
        valid_line("date consistency", c.valid.len());
    }

    push_line(&mut out, "\nISSUES BY PRIORITY:\n");
    let mut issue = |level: &str, indices: &[usize], what: &str, hint: &str| {
        if indices.is_empty() {
            return;
        }
        push_line(&mut out, format!("{}: {} offers with {}", level, indices.len(), what));
        if !hint.is_empty() {
            push_line(&mut out, format!("   {}", hint));
        }
        push_line(&mut out, format!("   Indices: {}\n", preview(indices)));
    };

    issue("CRITICAL", &a.dates.empty, "EMPTY DATES", "Date extraction needs immediate attention.");
    issue("CRITICAL", &a.prices.empty, "EMPTY PRICES", "Price extraction needs fixing.");
    issue("CRITICAL", &a.links.empty, "EMPTY LINKS", "");
    issue(
        "MEDIUM",
        &a.dates.invalid_format,
        "INVALID DATE FORMAT",
        "Expected DD.MM.YYYY or DD.MM.YYYY - DD.MM.YYYY.",
    );
    issue("MEDIUM", &a.prices.invalid_format, "INVALID PRICE FORMAT", "Expected 1234.56 лв.");
    if let Some(c) = &a.consistency {
        issue(
            "MEDIUM",
            &c.single_date_multi_day,
            "SINGLE DATE but MULTI-DAY DURATION",
            "The stated duration calls for a date range.",
        );
        issue(
            "MEDIUM",
            &c.inconsistent_ranges,
            "INCONSISTENT DATE RANGES",
            "Date range does not match the stated duration.",
        );
    }
    issue("MEDIUM", &a.destinations.empty, "EMPTY DESTINATIONS", "Destination extraction needed.");
    issue(
        "MEDIUM",
        &a.destinations.invalid,
        "INVALID DESTINATIONS",
        "Departure points, categories or partner names instead of destinations.",
    );
    issue("MEDIUM", &a.links.invalid, "INVALID LINKS", "");
    issue("LOW", &a.prices.too_low, "SUSPICIOUSLY LOW PRICES", "Prices under 100 лв. may be incorrect.");
    issue(
        "LOW",
        &a.prices.too_high,
        "SUSPICIOUSLY HIGH PRICES",
        "Prices over 10,000 лв. may be special or luxury offers.",
    );
    issue("LOW", &a.titles.too_short, "TOO SHORT TITLES", "Titles shorter than 10 characters.");
    issue("LOW", &a.titles.suspicious, "SUSPICIOUS TITLES", "");

    let with_gaps: Vec<usize> = (0..total)
        .filter(|i| {
            a.dates.empty.contains(i) || a.prices.empty.contains(i) || a.destinations.empty.contains(i)
        })
        .take(5)
        .collect();
    if !with_gaps.is_empty() {
        push_line(&mut out, "EXAMPLES OF PROBLEMATIC OFFERS:\n");
        for i in with_gaps {
            let o = &offers[i];
            push_line(&mut out, format!("Offer {}:", i));
            push_line(&mut out, format!("  Title: {}", clip(&o.title, 80)));
            push_line(&mut out, format!("  Link: {}", clip(&o.link, 80)));
            push_line(&mut out, format!("  Price: {}", o.price));
            push_line(&mut out, format!("  Dates: {}", o.dates));
            push_line(&mut out, format!("  Destination: {}\n", o.destination));
        }
    }

    push_line(&mut out, "RECOMMENDATIONS:");
    push_line(&mut out, "1. Fix EMPTY DATES first, they are critical for travel offers");
    push_line(&mut out, "2. Then fix EMPTY PRICES, users need pricing information");
    push_line(&mut out, "3. Finally address EMPTY DESTINATIONS to improve search and filtering");
    push_line(&mut out, "4. Test fixes on a few examples before applying to all offers");
    out
}

/// Full per-issue listing appended to the saved report.
pub fn render_details(offers: &[RawOffer], analysis: &Analysis) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("\n{}\nDETAILED ISSUES\n{}\n", "=".repeat(50), "=".repeat(50)));

    let mut section = |label: &str, indices: &[usize], show_destination: bool| {
        push_line(&mut out, format!("{} ({}):", label, indices.len()));
        for &i in indices {
            let o = &offers[i];
            if show_destination {
                push_line(&mut out, format!("  [{}] {} | Destination: {}", i, clip(&o.title, 60), o.destination));
            } else {
                push_line(&mut out, format!("  [{}] {} | {}", i, clip(&o.title, 60), o.link));
            }
        }
        out.push('\n');
    };
    section("Empty dates", &analysis.dates.empty, false);
    section("Empty prices", &analysis.prices.empty, false);
    section("Empty destinations", &analysis.destinations.empty, false);
    section("Invalid destinations", &analysis.destinations.invalid, true);
    out
}

/// Analyze `input`, print the report and save it with details to
/// `report_path`.
pub fn run(input: &Path, agency: Agency, report_path: &Path) -> Result<Analysis> {
    let offers = crate::scraper::load_raw_offers(input)
        .with_context(|| format!("No offers to analyze for {}, run the scraper first", agency))?;
    info!("Loaded {} offers from {}", offers.len(), input.display());

    let profile = Profile::for_agency(agency);
    let analysis = analyze(&offers, &profile);
    let report = render_report(&offers, &analysis, agency);
    println!("{}", report);

    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let full = format!("{}{}", report, render_details(&offers, &analysis));
    std::fs::write(report_path, full)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!("Detailed report saved to {}", report_path.display());
    Ok(analysis)
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

    #[test]
    fn test_dates_buckets() {
        let offers = vec![
            raw("a", "", "", ""),
            raw("b", "", "12.06.2026", ""),
            raw("c", "", "12.06.2026 - 19.06.2026", ""),
            raw("d", "", "юни 2026", ""),
        ];
        let d = analyze_dates(&offers);
        assert_eq!(d.empty, vec![0]);
        assert_eq!(d.valid, vec![1, 2]);
        assert_eq!(d.invalid_format, vec![3]);
    }

    #[test]
    fn test_price_buckets() {
        let offers = vec![
            raw("a", "", "", ""),
            raw("b", "450 лв.", "", ""),
            raw("c", "1234.56 лв", "", ""),
            raw("d", "99 лв.", "", ""),
            raw("e", "12000 лв.", "", ""),
            raw("f", "от 450 лв.", "", ""),
            raw("g", "399 €", "", ""),
            raw("h", "1 099 лв.", "", ""),
            raw("i", "2,450 лв", "", ""),
            raw("j", "12 500 лв.", "", ""),
        ];
        let p = analyze_prices(&offers);
        assert_eq!(p.empty, vec![0]);
        assert_eq!(p.valid, vec![1, 2, 7, 8]);
        assert_eq!(p.too_low, vec![3]);
        assert_eq!(p.too_high, vec![4, 9]);
        assert_eq!(p.invalid_format, vec![5, 6]);
    }

    #[test]
    fn test_destination_rules_differ_per_profile() {
        let offers = vec![
            raw("a", "", "", ""),
            raw("b", "", "", "Гърция"),
            raw("c", "", "", "Тръгване от София"),
            raw("d", "", "", "Занзибар"),
        ];
        let aratour = analyze_destinations(&offers, &Profile::for_agency(Agency::Aratour));
        assert_eq!(aratour.empty, vec![0]);
        assert_eq!(aratour.valid, vec![1, 3]);
        assert_eq!(aratour.invalid, vec![2]);

        let dari = analyze_destinations(&offers, &Profile::for_agency(Agency::DariTour));
        assert_eq!(dari.valid, vec![1]);
        assert_eq!(dari.invalid, vec![2, 3]);
    }

    #[test]
    fn test_title_buckets() {
        let offers = vec![
            raw("", "", "", ""),
            raw("Рим", "", "", ""),
            raw("Test offer for Rome", "", "", ""),
            raw("Екскурзия до Рим и Флоренция", "", "", ""),
        ];
        let t = analyze_titles(&offers, &Profile::for_agency(Agency::Aratour));
        assert_eq!(t.empty, vec![0]);
        assert_eq!(t.too_short, vec![1]);
        assert_eq!(t.suspicious, vec![2]);
        assert_eq!(t.valid, vec![3]);

        let t = analyze_titles(&offers, &Profile::for_agency(Agency::DariTour));
        assert_eq!(t.valid, vec![2, 3]);
    }

    #[test]
    fn test_links() {
        let mut offers = vec![raw("a", "", "", ""), raw("b", "", "", ""), raw("c", "", "", "")];
        offers[0].link = String::new();
        offers[1].link = "/offer/relative".into();
        let l = analyze_links(&offers);
        assert_eq!((l.empty, l.invalid, l.valid), (vec![0], vec![1], vec![2]));
    }

    #[test]
    fn test_stated_duration_and_range_days() {
        assert_eq!(stated_duration("екскурзия 5 дни"), Some(5));
        assert_eq!(stated_duration("7 нощувки"), Some(8));
        assert_eq!(stated_duration("рим"), None);
        assert_eq!(range_days("01.06.2026 - 05.06.2026"), Some(5));
        assert_eq!(range_days("01.06.2026"), None);
        assert_eq!(range_days("юни - юли"), None);
    }

    #[test]
    fn test_date_consistency() {
        let offers = vec![
            raw("Екскурзия до Рим 5 дни", "", "12.06.2026", ""),
            raw("Екскурзия до Рим 5 дни", "", "01.06.2026 - 05.06.2026", ""),
            raw("Екскурзия до Рим 5 дни", "", "01.06.2026 - 04.06.2026", ""),
            raw("Екскурзия до Рим 5 дни", "", "01.06.2026 - 12.06.2026", ""),
            raw("Почивка в Гърция 5 дни", "", "12.06.2026", ""),
        ];
        let c = analyze_date_consistency(&offers);
        assert_eq!(c.single_date_multi_day, vec![0]);
        assert_eq!(c.inconsistent_ranges, vec![3]);
        assert_eq!(c.valid, vec![1, 2, 4]);
    }

    #[test]
    fn test_report_and_run() {
        let offers = vec![
            raw("Екскурзия до Рим и Флоренция", "", "", ""),
            raw("Почивка в Гърция, Халкидики", "650 лв.", "12.06.2026 - 19.06.2026", "Гърция"),
        ];
        let dir = std::env::temp_dir().join(format!("travel-analyze-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("aratur.json");
        crate::scraper::save_results(&input, &offers).unwrap();

        let report_path = dir.join(REPORT_FILE);
        let analysis = run(&input, Agency::Aratour, &report_path).unwrap();
        assert_eq!(analysis.total, 2);
        assert_eq!(analysis.dates.empty, vec![0]);

        let text = std::fs::read_to_string(&report_path).unwrap();
        assert!(text.contains("ARATUR DATA ANALYSIS REPORT"));
        assert!(text.contains("CRITICAL: 1 offers with EMPTY DATES"));
        assert!(text.contains("Valid dates: 1 (50.0%)"));
        assert!(text.contains("Offer 0:"));
        assert!(text.contains("Empty prices (1):"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_without_input_fails() {
        let missing = Path::new("/nonexistent/aratur.json");
        assert!(run(missing, Agency::Aratour, Path::new("/tmp/unused.txt")).is_err());
    }
}
