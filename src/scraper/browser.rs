//! Headless Chrome session used by the JS-rendered sites (Teztour listing,
//! Bohemia date calendars).
//!
//! Every call here blocks; async callers wrap them in `spawn_blocking`.

use crate::error::ScrapeError;
use anyhow::{Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct BrowserSession {
    browser: Browser,
    user_agent: String,
}

impl BrowserSession {
    pub fn launch(user_agent: &str) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1920, 1080)))
            .build()
            .map_err(|e| ScrapeError::Browser(e.to_string()))
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            user_agent: user_agent.to_string(),
        })
    }

    pub fn new_tab(&self) -> Result<Arc<Tab>> {
        let tab = self.browser.new_tab().context("Failed to open tab")?;
        tab.set_user_agent(&self.user_agent, Some("bg-BG,bg;q=0.9"), None)?;
        Ok(tab)
    }

    /// Navigate and return the rendered HTML.
    pub fn fetch_page(
        &self,
        tab: &Tab,
        url: &str,
        wait_for_selector: Option<&str>,
        timeout: Duration,
    ) -> Result<String> {
        info!("Fetching (browser): {}", url);
        tab.set_default_timeout(timeout);
        tab.navigate_to(url)
            .with_context(|| format!("navigate to {}", url))?;
        tab.wait_until_navigated()?;

        if let Some(selector) = wait_for_selector {
            if let Err(e) = tab.wait_for_element_with_custom_timeout(selector, timeout) {
                debug!("Selector {} never appeared on {}: {}", selector, url, e);
            }
        }

        // let late XHR content settle
        thread::sleep(Duration::from_secs(1));
        self.content(tab)
    }

    pub fn content(&self, tab: &Tab) -> Result<String> {
        self.evaluate_string(tab, "document.documentElement.outerHTML")?
            .ok_or_else(|| ScrapeError::Browser("page returned no HTML".into()).into())
    }

    /// Evaluate `js` and return its value when it is a string.
    pub fn evaluate_string(&self, tab: &Tab, js: &str) -> Result<Option<String>> {
        let result = tab.evaluate(js, false)?;
        Ok(result
            .value
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Scroll until the document height stops growing.
    pub fn scroll_to_bottom(&self, tab: &Tab, pause: Duration, max_scrolls: usize) -> Result<()> {
        let mut last_height = self.scroll_height(tab)?;

        for i in 0..max_scrolls {
            tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false)?;
            thread::sleep(pause);

            let new_height = self.scroll_height(tab)?;
            if new_height == last_height {
                debug!("Reached bottom after {} scrolls", i + 1);
                break;
            }
            last_height = new_height;
        }
        Ok(())
    }

    fn scroll_height(&self, tab: &Tab) -> Result<i64> {
        let v = tab.evaluate("document.body.scrollHeight", false)?;
        Ok(v.value.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Click a "load more" button by its visible text until it disappears.
    /// Returns the number of clicks made.
    pub fn click_load_more(
        &self,
        tab: &Tab,
        button_text: &str,
        max_clicks: usize,
        wait: Duration,
    ) -> Result<usize> {
        let js = click_by_text_js(&[button_text]);
        let mut clicks = 0;

        for _ in 0..max_clicks {
            let clicked = tab
                .evaluate(&js, false)?
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if !clicked {
                break;
            }
            clicks += 1;
            debug!("Clicked '{}' ({}/{})", button_text, clicks, max_clicks);
            thread::sleep(wait);
        }
        Ok(clicks)
    }

    /// Click the first element whose text contains one of `labels`.
    pub fn click_any_text(&self, tab: &Tab, labels: &[&str]) -> Result<bool> {
        let clicked = tab
            .evaluate(&click_by_text_js(labels), false)?
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(clicked)
    }
}

/// JS returning `true` when a clickable element containing one of the labels
/// was found and clicked.
fn click_by_text_js(labels: &[&str]) -> String {
    let list = serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
            const labels = {list};
            const nodes = document.querySelectorAll('button, a, li, span, div[role="tab"]');
            for (const el of nodes) {{
                const text = (el.innerText || '').trim();
                if (!text || text.length > 60) continue;
                if (labels.some(l => text.includes(l)) && el.offsetParent !== null) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_js_embeds_labels() {
        let js = click_by_text_js(&["ПОКАЖИ ОЩЕ", "Дати и цени"]);
        assert!(js.contains(r#"["ПОКАЖИ ОЩЕ","Дати и цени"]"#));
        assert!(js.contains("el.click()"));
    }
}
