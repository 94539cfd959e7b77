use crate::error::ScrapeError;
use crate::models::RawOffer;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// A price amount: space-grouped thousands ("1 099", "1 250,50") or digits
/// with `.`/`,` separators ("2,450", "12,50", "1.234.567").
pub const AMOUNT_PATTERN: &str =
    r"\d{1,3}(?:[ \x{A0}\x{202F}]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)*";

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EUR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\d\s,.]+)\s*€").unwrap());
static BGN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\d\s,.]+)\s*лв").unwrap());
static DMY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[./-](\d{1,2})(?:[./-](\d{2,4}))?\.?$").unwrap());

// ── Text ──────────────────────────────────────────────────────────────────────

/// Collapse runs of whitespace (including nbsp) into single spaces.
pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(&s.replace('\u{a0}', " "), " ").trim().to_string()
}

/// Element text with children joined by spaces.
pub fn element_text(el: &ElementRef) -> String {
    let parts: Vec<&str> = el.text().map(str::trim).filter(|t| !t.is_empty()).collect();
    collapse_ws(&parts.join(" "))
}

/// Element text keeping line structure; used where the first line is the title.
pub fn element_lines(el: &ElementRef) -> Vec<String> {
    el.text()
        .map(collapse_ws)
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `"sofia-city break"` → `"Sofia City Break"`
pub fn title_case(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ── Selectors / DOM ───────────────────────────────────────────────────────────

pub fn sel(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()))
}

pub fn class_matches(el: &ElementRef, re: &Regex) -> bool {
    el.value().attr("class").is_some_and(|c| re.is_match(c))
}

/// First descendant element (tag in `tags`) whose class attribute matches `re`.
pub fn find_by_class<'a>(el: &ElementRef<'a>, tags: &[&str], re: &Regex) -> Option<ElementRef<'a>> {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .skip(1)
        .find(|e| tags.contains(&e.value().name()) && class_matches(e, re))
}

/// First element after `el` in document order matching `selector`
/// (descendants of `el` included).
pub fn find_next<'a>(doc: &'a Html, el: &ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    let target = el.id();
    doc.root_element()
        .descendants()
        .skip_while(|n| n.id() != target)
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| selector.matches(e))
}

// ── Links ─────────────────────────────────────────────────────────────────────

/// Resolve `href` against `base`. Non-http results are rejected. The result
/// is percent-decoded so Cyrillic paths stay readable in the JSON output.
pub fn absolute_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = Url::parse(base).ok()?.join(href).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(percent_decode(joined.as_str())),
        _ => None,
    }
}

/// `%D0%98` style escapes back to UTF-8; malformed escapes are kept as is.
pub fn percent_decode(s: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned()
}

/// Links that are never offers: mailto/tel/js, fragments, social networks.
pub fn is_non_offer_link(href: &str) -> bool {
    const SKIP: [&str; 7] = [
        "mailto:",
        "tel:",
        "javascript:",
        "#",
        "facebook",
        "instagram",
        "twitter",
    ];
    let h = href.to_lowercase();
    SKIP.iter().any(|s| h.contains(s))
}

// ── Dates ─────────────────────────────────────────────────────────────────────

pub fn valid_day_month(day: u32, month: u32) -> bool {
    (1..=31).contains(&day) && (1..=12).contains(&month)
}

/// Parse `dd.mm.yyyy`, `dd/mm/yy`, `dd-mm-yyyy`. Without a year the
/// `default_year` is used.
pub fn parse_dmy(s: &str, default_year: Option<i32>) -> Option<NaiveDate> {
    let caps = DMY_RE.captures(s.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = match caps.get(3) {
        Some(y) => expand_year(y.as_str().parse().ok()?),
        None => default_year?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

pub fn fmt_dmy(d: NaiveDate) -> String {
    format!("{:02}.{:02}.{}", d.day(), d.month(), d.year())
}

/// "first - last" for two or more values, the value itself for one.
pub fn range_text<S: AsRef<str>>(dates: &[S]) -> String {
    match dates {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, .., last] => format!("{} - {}", first.as_ref(), last.as_ref()),
    }
}

// ── Destinations ──────────────────────────────────────────────────────────────

/// First keyword found in `text` (lowercased), capitalized.
pub fn destination_from_keywords(text: &str, keywords: &[&str]) -> Option<String> {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .find(|k| lower.contains(*k))
        .map(|k| capitalize(k))
}

/// First `(keyword, name)` pair whose keyword occurs in `text`.
pub fn destination_from_map(text: &str, map: &[(&str, &str)]) -> Option<String> {
    let lower = text.to_lowercase();
    map.iter()
        .find(|(k, _)| lower.contains(k))
        .map(|(_, name)| name.to_string())
}

// ── Dedup / limits ────────────────────────────────────────────────────────────

/// Seen-set on the `(title, link)` key.
#[derive(Default)]
pub struct Deduper {
    seen: HashSet<(String, String)>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a key is seen.
    pub fn insert(&mut self, offer: &RawOffer) -> bool {
        self.seen.insert((offer.title.clone(), offer.link.clone()))
    }

    pub fn retain_unique(offers: Vec<RawOffer>) -> Vec<RawOffer> {
        let mut d = Deduper::new();
        offers.into_iter().filter(|o| d.insert(o)).collect()
    }
}

/// `limit == 0` means unlimited.
pub fn limit_reached(count: usize, limit: usize) -> bool {
    limit > 0 && count >= limit
}

/// "1 299 €" → "1299 EUR", "450,50 лв." → "450.5 BGN", anything else unchanged.
pub fn price_with_currency(text: &str) -> String {
    if let Some(v) = EUR_RE.captures(text).and_then(|c| parse_amount(&c[1])) {
        return format!("{} EUR", v);
    }
    if let Some(v) = BGN_RE.captures(text).and_then(|c| parse_amount(&c[1])) {
        return format!("{} BGN", v);
    }
    text.trim().to_string()
}

/// Amount text to a number. Spaces group thousands, the last of mixed `.`/`,`
/// is the decimal point, and a lone `,` followed by exactly three digits
/// groups thousands: "1 234,50" → 1234.5, "2,450" → 2450, "12,50" → 12.5.
pub fn parse_amount(s: &str) -> Option<f64> {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let kept = kept.trim_matches(['.', ',']);

    let normalized = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => kept.replace(',', ""),
        (Some(_), Some(_)) => kept.replace('.', "").replace(',', "."),
        (None, Some(_)) => single_separator(kept, ','),
        (Some(_), None) if kept.matches('.').count() > 1 => single_separator(kept, '.'),
        _ => kept.to_string(),
    };
    normalized.parse().ok()
}

/// Only one kind of separator: thousands when every group after the first
/// has three digits, otherwise the last one is the decimal point.
fn single_separator(s: &str, sep: char) -> String {
    let groups: Vec<&str> = s.split(sep).collect();
    if groups[1..].iter().all(|g| g.len() == 3) && (groups.len() > 2 || sep == ',') {
        return groups.concat();
    }
    let (int, frac) = groups.split_at(groups.len() - 1);
    format!("{}.{}", int.concat(), frac.concat())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  Египет \n\t Хургада\u{a0}7 дни "), "Египет Хургада 7 дни");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("ekskurzii-do-italia"), "Ekskurzii Do Italia");
        assert_eq!(capitalize("ДУБАЙ"), "Дубай");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://aventura.bg", "pochivka/egypt-1").as_deref(),
            Some("https://aventura.bg/pochivka/egypt-1")
        );
        assert_eq!(
            absolute_url("https://aventura.bg/a/b", "/x").as_deref(),
            Some("https://aventura.bg/x")
        );
        assert_eq!(absolute_url("https://a.bg", "mailto:x@a.bg"), None);
        assert!(is_non_offer_link("https://facebook.com/aratour"));
        assert!(!is_non_offer_link("/ekskurzia-rim"));
    }

    #[test]
    fn test_cyrillic_links_stay_readable() {
        assert_eq!(
            absolute_url("https://aratour.bg", "/екскурзии/италия/").as_deref(),
            Some("https://aratour.bg/екскурзии/италия/")
        );
        assert_eq!(percent_decode("%D0%B8%zz100%"), "и%zz100%");
    }

    #[test]
    fn test_parse_dmy() {
        assert_eq!(parse_dmy("05.03.2026", None), NaiveDate::from_ymd_opt(2026, 3, 5));
        assert_eq!(parse_dmy("5/3/26", None), NaiveDate::from_ymd_opt(2026, 3, 5));
        assert_eq!(parse_dmy("12.07", Some(2025)), NaiveDate::from_ymd_opt(2025, 7, 12));
        assert_eq!(parse_dmy("12.07", None), None);
        assert_eq!(parse_dmy("31.02.2026", None), None);
    }

    #[test]
    fn test_range_text() {
        assert_eq!(range_text::<&str>(&[]), "");
        assert_eq!(range_text(&["01.05"]), "01.05");
        assert_eq!(range_text(&["01.05", "03.05", "09.05"]), "01.05 - 09.05");
    }

    #[test]
    fn test_find_next_and_class() {
        let doc = Html::parse_document(
            r#"<a class="o" href="x"><div class="tr-hotel">Hotel</div></a><p>gap</p><div class="tr-date">01.06</div>"#,
        );
        let a = doc.select(&sel("a.o").unwrap()).next().unwrap();
        let re = Regex::new("tr-hotel").unwrap();
        assert_eq!(element_text(&find_by_class(&a, &["div"], &re).unwrap()), "Hotel");
        let next = find_next(&doc, &a, &sel("div.tr-date").unwrap()).unwrap();
        assert_eq!(element_text(&next), "01.06");
    }

    #[test]
    fn test_deduper() {
        let a = RawOffer::new("Рим", "https://x/1");
        let b = RawOffer::new("Рим", "https://x/1");
        let c = RawOffer::new("Рим", "https://x/2");
        assert_eq!(Deduper::retain_unique(vec![a, b, c]).len(), 2);
    }

    #[test]
    fn test_price_with_currency() {
        assert_eq!(price_with_currency("1 299 €"), "1299 EUR");
        assert_eq!(price_with_currency("от 450,50 лв."), "450.5 BGN");
        assert_eq!(price_with_currency("от 2,450 лв"), "2450 BGN");
        assert_eq!(price_with_currency("по запитване"), "по запитване");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1 234,50"), Some(1234.5));
        assert_eq!(parse_amount("1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("от 499"), Some(499.0));
        assert_eq!(parse_amount("—"), None);
        assert_eq!(parse_amount("2,450"), Some(2450.0));
        assert_eq!(parse_amount("12,50"), Some(12.5));
        assert_eq!(parse_amount("1\u{a0}099 лв."), Some(1099.0));
        assert_eq!(parse_amount("1.234.567"), Some(1234567.0));
        assert_eq!(parse_amount("1.250,50"), Some(1250.5));
        assert_eq!(parse_amount("421.00"), Some(421.0));
    }

    #[test]
    fn test_limit() {
        assert!(!limit_reached(100, 0));
        assert!(limit_reached(20, 20));
        assert!(!limit_reached(19, 20));
    }
}
