//! Date recovery from Bohemia offer pages.
//!
//! Bohemia publishes departure dates in three shapes: a `RATESDATA` array of
//! `{"Date": "MM/DD/YYYY", ...}` objects (inline or in an external script),
//! JSON-ish key/value pairs, and visible dot-separated dates whose day/month
//! order is not consistent. Everything here is pure so it can be tested on
//! fixtures.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

static RATESDATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(?:var|let|const)\s+RATESDATA\s*=\s*(\[.*?\]);").unwrap()
});
static BARE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+)\s*:").unwrap());
static JSON_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:[Dd]ate|[Ss]tart[Dd]ate|[Dd]eparture[Dd]ate)"\s*:\s*"(\d{1,2}/\d{1,2}/\d{4})""#,
    )
    .unwrap()
});
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4})\b").unwrap());
static DOT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").unwrap());
static SCRIPT_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<script[^>]+src=["']([^"']+)["']"#).unwrap());
static PRODUCT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d{6,})/").unwrap());

const SCRIPT_HINTS: [&str; 4] = ["rate", "dates", "calendar", "price"];
const MAX_SCRIPT_CANDIDATES: usize = 5;

fn split3(s: &str, sep: char) -> Option<(u32, u32, i32)> {
    let mut parts = s.trim().split(sep);
    let a = parts.next()?.trim().parse().ok()?;
    let b = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((a, b, y))
}

/// Normalise one date token.
///
/// Slash dates are MM/DD/YYYY (DD/MM/YYYY when `dot_mmdd`). Dot dates are
/// DD.MM.YYYY unless the second part cannot be a month.
pub fn normalize_date(s: &str, dot_mmdd: bool) -> Option<NaiveDate> {
    let s = s.trim();
    if s.contains('/') {
        let (a, b, y) = split3(s, '/')?;
        let (day, month) = if dot_mmdd { (a, b) } else { (b, a) };
        return NaiveDate::from_ymd_opt(y, month, day);
    }
    if s.contains('.') {
        let (a, b, y) = split3(s, '.')?;
        let (day, month) = if b > 12 && a <= 12 { (b, a) } else { (a, b) };
        return NaiveDate::from_ymd_opt(y, month, day);
    }
    None
}

/// Every date found in a page or script, sorted and unique.
///
/// A dot date whose second part exceeds 12 is MM.DD. Ambiguous ones (both
/// parts ≤ 12) are read as MM.DD when the first part is a month already seen
/// elsewhere on the page.
pub fn extract_all_dates(html: &str, dot_mmdd: bool) -> Vec<NaiveDate> {
    let mut found = BTreeSet::new();
    let mut known_months = HashSet::new();

    for caps in JSON_DATE_RE
        .captures_iter(html)
        .chain(SLASH_DATE_RE.captures_iter(html))
    {
        if let Some(d) = normalize_date(&caps[1], dot_mmdd) {
            known_months.insert(d.month());
            found.insert(d);
        }
    }

    let dot_tokens: Vec<(u32, u32, i32)> = DOT_DATE_RE
        .captures_iter(html)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)))
        .collect();
    let months_as_second: HashSet<u32> = dot_tokens.iter().map(|(_, b, _)| *b).collect();

    for &(a, b, y) in &dot_tokens {
        let (day, month) = if dot_mmdd {
            (b, a)
        } else if b > 12 {
            known_months.insert(a);
            (b, a)
        } else if a > 12 {
            known_months.insert(b);
            (a, b)
        } else if known_months.contains(&a) || months_as_second.contains(&a) {
            (b, a)
        } else {
            (a, b)
        };
        if let Some(d) = NaiveDate::from_ymd_opt(y, month, day) {
            found.insert(d);
        }
    }

    found.into_iter().collect()
}

/// Dates from a `RATESDATA = [...]` literal. Falls back to quoting bare keys
/// and single quotes when the literal is not strict JSON.
pub fn extract_ratesdata_dates(text: &str, dot_mmdd: bool) -> Vec<NaiveDate> {
    let Some(caps) = RATESDATA_RE.captures(text) else {
        return Vec::new();
    };
    let blob = &caps[1];
    let parsed: Option<Value> = serde_json::from_str(blob).ok().or_else(|| {
        let cleaned = BARE_KEY_RE.replace_all(blob, r#""$1":"#).replace('\'', "\"");
        serde_json::from_str(&cleaned).ok()
    });
    parsed.map(|v| rates_dates(&v, dot_mmdd)).unwrap_or_default()
}

/// `Date` fields of a RATESDATA array, sorted and unique.
pub fn rates_dates(rates: &Value, dot_mmdd: bool) -> Vec<NaiveDate> {
    let set: BTreeSet<NaiveDate> = rates
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|rate| rate.get("Date"))
        .filter_map(|d| match d {
            Value::String(s) => normalize_date(s, dot_mmdd),
            other => normalize_date(&other.to_string(), dot_mmdd),
        })
        .collect();
    set.into_iter().collect()
}

/// External scripts worth fetching for RATESDATA: those naming the product
/// id from the offer URL or hinting at rates/calendars. At most five.
pub fn script_candidates(html: &str, offer_url: &str, base: &str) -> Vec<String> {
    let product_id = PRODUCT_ID_RE
        .captures(offer_url)
        .map(|c| c[1].to_string());

    SCRIPT_SRC_RE
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|src| {
            let low = src.to_lowercase();
            product_id.as_deref().is_some_and(|id| low.contains(id))
                || SCRIPT_HINTS.iter().any(|k| low.contains(k))
        })
        .map(|src| {
            if src.starts_with("http") {
                src
            } else if src.starts_with('/') {
                format!("{}{}", base, src)
            } else {
                format!("{}/{}", base, src)
            }
        })
        .take(MAX_SCRIPT_CANDIDATES)
        .collect()
}

/// First and last of a sorted list.
pub fn bounds(dates: &[NaiveDate]) -> Option<(NaiveDate, NaiveDate)> {
    Some((*dates.first()?, *dates.last()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normalize_slash_dates() {
        assert_eq!(normalize_date("03/14/2026", false), Some(d(2026, 3, 14)));
        assert_eq!(normalize_date("03/04/2026", true), Some(d(2026, 4, 3)));
        assert_eq!(normalize_date("14/03/2026", false), None);
    }

    #[test]
    fn test_normalize_dot_dates() {
        assert_eq!(normalize_date("05.03.2026", false), Some(d(2026, 3, 5)));
        assert_eq!(normalize_date("03.25.2026", false), Some(d(2026, 3, 25)));
        assert_eq!(normalize_date("garbage", false), None);
    }

    #[test]
    fn test_extract_all_dates_uses_known_months() {
        // 05/02/2026 is May 2nd, so 05.09.2026 reads as May 9th
        let html = r#"{"Date":"05/02/2026"} <td>05.09.2026</td> <td>23.05.2026</td>"#;
        let dates = extract_all_dates(html, false);
        assert_eq!(dates, vec![d(2026, 5, 2), d(2026, 5, 9), d(2026, 5, 23)]);
    }

    #[test]
    fn test_extract_all_dates_default_day_first() {
        let dates = extract_all_dates("Отпътуване 07.08.2026 и 02.11.2026, 07.08.2026", false);
        assert_eq!(dates, vec![d(2026, 8, 7), d(2026, 11, 2)]);
    }

    #[test]
    fn test_extract_all_dates_forced_mmdd() {
        assert_eq!(extract_all_dates("08.07.2026", true), vec![d(2026, 8, 7)]);
    }

    #[test]
    fn test_ratesdata_strict_json() {
        let js = r#"var RATESDATA = [{"Date":"06/20/2026","Price":899},{"Date":"06/13/2026"}];"#;
        let dates = extract_ratesdata_dates(js, false);
        assert_eq!(bounds(&dates), Some((d(2026, 6, 13), d(2026, 6, 20))));
    }

    #[test]
    fn test_ratesdata_loose_literal() {
        let js = "const RATESDATA = [{Date: '07/01/2026', Seats: 4}, {Date: '07/15/2026'}];";
        let dates = extract_ratesdata_dates(js, false);
        assert_eq!(dates, vec![d(2026, 7, 1), d(2026, 7, 15)]);
        assert!(extract_ratesdata_dates("no data here", false).is_empty());
    }

    #[test]
    fn test_script_candidates() {
        let html = r#"
            <script src="/js/jquery.min.js"></script>
            <script src="/Scripts/Rates/123456.js"></script>
            <script src='calendar.js'></script>
            <script src="https://cdn.bohemia.bg/price-widget.js"></script>
        "#;
        let c = script_candidates(html, "https://www.bohemia.bg/Оферта/123456/", "https://www.bohemia.bg");
        assert_eq!(
            c,
            vec![
                "https://www.bohemia.bg/Scripts/Rates/123456.js",
                "https://www.bohemia.bg/calendar.js",
                "https://cdn.bohemia.bg/price-widget.js",
            ]
        );
    }
}
