use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::base::SourceAdapter;
use crate::common::error::{Result, ScraperError};
use crate::common::types::RawEvent;
use crate::registry::ListingSelectors;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; mms_scraper/0.1)";

struct CompiledSelectors {
    item: Selector,
    title: Selector,
    date: Selector,
    link: Selector,
    image: Option<Selector>,
    venue: Option<Selector>,
}

fn compile(source_id: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| {
        ScraperError::Selector(format!("{}: invalid selector '{}': {:?}", source_id, css, e))
    })
}

impl CompiledSelectors {
    fn new(source_id: &str, spec: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            item: compile(source_id, &spec.item)?,
            title: compile(source_id, &spec.title)?,
            date: compile(source_id, &spec.date)?,
            link: compile(source_id, &spec.link)?,
            image: spec.image.as_deref().map(|css| compile(source_id, css)).transpose()?,
            venue: spec.venue.as_deref().map(|css| compile(source_id, css)).transpose()?,
        })
    }
}

/// Generic listing-page scraper driven by CSS selectors from the registry
pub struct HtmlListingAdapter {
    source_id: String,
    client: reqwest::Client,
    urls: Vec<String>,
    selectors: CompiledSelectors,
    venue: Option<String>,
}

impl HtmlListingAdapter {
    pub fn new(
        source_id: impl Into<String>,
        urls: Vec<String>,
        selectors: &ListingSelectors,
        venue: Option<String>,
    ) -> Result<Self> {
        let source_id = source_id.into();
        if selectors.venue.is_none() && venue.is_none() {
            return Err(ScraperError::Registry(format!(
                "{}: html_listing needs a fixed venue or a venue selector",
                source_id
            )));
        }

        let selectors = CompiledSelectors::new(&source_id, selectors)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            source_id,
            client,
            urls,
            selectors,
            venue,
        })
    }

    async fn fetch_page(&self, page_url: &Url) -> Result<String> {
        let response = self.client.get(page_url.clone()).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Pull raw tuples out of one page. Items missing a title or date are skipped.
    fn extract(&self, html: &str, page_url: &Url) -> Vec<RawEvent> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();

        for item in document.select(&self.selectors.item) {
            let title = first_text(&item, &self.selectors.title);
            let raw_date = first_text(&item, &self.selectors.date);
            let (Some(title), Some(raw_date)) = (title, raw_date) else {
                continue;
            };

            let venue = self
                .selectors
                .venue
                .as_ref()
                .and_then(|sel| first_text(&item, sel))
                .or_else(|| self.venue.clone());
            let Some(venue) = venue else {
                continue;
            };

            let link = first_attr(&item, &self.selectors.link, "href")
                .and_then(|href| absolute_link(page_url, &href))
                .unwrap_or_else(|| page_url.to_string());
            let image = self
                .selectors
                .image
                .as_ref()
                .and_then(|sel| first_attr(&item, sel, "src"));

            events.push(RawEvent {
                source_id: self.source_id.clone(),
                title,
                raw_date,
                venue,
                link,
                image,
            });
        }

        events
    }
}

fn first_text(item: &ElementRef, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

fn first_attr(item: &ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    item.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolve `href` against the page it was found on. Protocol-relative image
/// URLs are left alone here and fixed during consolidation.
fn absolute_link(page_url: &Url, href: &str) -> Option<String> {
    page_url.join(href).ok().map(|url| url.to_string())
}

#[async_trait::async_trait]
impl SourceAdapter for HtmlListingAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    #[instrument(skip(self), fields(source = %self.source_id))]
    async fn fetch(&self) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();
        let mut failures = 0usize;

        for url in &self.urls {
            let page_url = Url::parse(url).map_err(|e| ScraperError::Source {
                source_id: self.source_id.clone(),
                message: format!("invalid url '{}': {}", url, e),
            })?;

            let body = match self.fetch_page(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to fetch listing page {}: {}", url, e);
                    failures += 1;
                    continue;
                }
            };

            let page_events = self.extract(&body, &page_url);
            info!("Parsed {} events from {}", page_events.len(), url);
            if page_events.is_empty() {
                warn!("No events found on {} - the page structure may have changed", url);
            }
            events.extend(page_events);
        }

        if failures == self.urls.len() && failures > 0 {
            return Err(ScraperError::Source {
                source_id: self.source_id.clone(),
                message: format!("all {} listing pages failed", failures),
            });
        }

        Ok(events)
    }
}
