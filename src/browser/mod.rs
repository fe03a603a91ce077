pub mod bridge;
pub mod types;

use crate::config::ListingSelectors;
use anyhow::Result;
use std::time::Duration;

pub use types::{DriverDiag, ElementHandle, RawFormField, RawListing, WaitUntil};

/// A browser session that can hand out pages and must be closed exactly once.
pub trait Browser {
    type Page: Page;

    fn new_page(&mut self) -> Result<Self::Page>;
    fn close(&mut self) -> Result<()>;
}

/// The page operations the orchestrator needs. Pausing is not here; it goes
/// through [`crate::clock::Clock`].
pub trait Page {
    fn goto(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()>;
    fn current_url(&mut self) -> Result<String>;
    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>>;
    fn click(&mut self, element: &ElementHandle) -> Result<()>;
    fn click_selector(&mut self, selector: &str) -> Result<()>;
    fn type_text(&mut self, selector: &str, text: &str) -> Result<()>;
    fn select_option(&mut self, selector: &str, value: &str) -> Result<()>;
    fn press_key(&mut self, key: &str) -> Result<()>;
    fn scrape_listings(&mut self, selectors: &ListingSelectors) -> Result<Vec<RawListing>>;
    fn form_fields(&mut self, selector: &str) -> Result<Vec<RawFormField>>;
}

impl<P: Page + ?Sized> Page for &mut P {
    fn goto(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()> {
        (**self).goto(url, wait, timeout)
    }
    fn current_url(&mut self) -> Result<String> {
        (**self).current_url()
    }
    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>> {
        (**self).query(selector)
    }
    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        (**self).click(element)
    }
    fn click_selector(&mut self, selector: &str) -> Result<()> {
        (**self).click_selector(selector)
    }
    fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        (**self).type_text(selector, text)
    }
    fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        (**self).select_option(selector, value)
    }
    fn press_key(&mut self, key: &str) -> Result<()> {
        (**self).press_key(key)
    }
    fn scrape_listings(&mut self, selectors: &ListingSelectors) -> Result<Vec<RawListing>> {
        (**self).scrape_listings(selectors)
    }
    fn form_fields(&mut self, selector: &str) -> Result<Vec<RawFormField>> {
        (**self).form_fields(selector)
    }
}

/// Returns the first selector (in list order) that has a present element.
/// A selector the page cannot evaluate is skipped.
pub fn first_present<P: Page + ?Sized>(
    page: &mut P,
    selectors: &[String],
) -> Option<(String, ElementHandle)> {
    for selector in selectors {
        match page.query(selector) {
            Ok(Some(handle)) => return Some((selector.clone(), handle)),
            Ok(None) => {}
            Err(err) => tracing::debug!("selector {selector} not usable: {err:#}"),
        }
    }
    None
}
