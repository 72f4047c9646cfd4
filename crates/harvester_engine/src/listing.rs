use std::collections::HashSet;

use harvester_core::{identity_url, ListingRecord, RegionKind};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::locate::{parse_selector, FieldSpec, Locator, SchemaError, Source};
use crate::region::RegionSpec;
use crate::schema::{CandidateError, Candidates, HarvestSchema};

const RATING_PATTERN: &str = r"(?i)(\d+(?:[.,]\d+)?)\s*star|^\s*(\d+(?:[.,]\d+)?)";
const REVIEW_COUNT_PATTERN: &str = r"(?i)\((\d[\d,.\s]*)\)|(\d[\d,.]*)\s*review";

/// Selectors describing a results feed.
#[derive(Debug, Clone)]
pub struct ListingMarkup {
    pub region: Vec<&'static str>,
    /// One link per venue.
    pub item: &'static str,
    /// Closest ancestors holding a venue's details, tried in order.
    pub containers: Vec<&'static str>,
    pub end_marker: &'static str,
}

impl Default for ListingMarkup {
    fn default() -> Self {
        Self {
            region: vec![r#"[role="feed"]"#],
            item: r#"a.hfpxzc[href*="/maps/place/"]"#,
            containers: vec!["[data-result-index]", ".Nv2PK"],
            end_marker: ".HlvSq",
        }
    }
}

/// Venue listings from an infinite results feed.
#[derive(Debug, Clone)]
pub struct ListingSchema {
    region: RegionSpec,
    item: Selector,
    containers: Vec<Selector>,
    end_marker: Selector,
    name_on_item: FieldSpec,
    name_in_container: FieldSpec,
    rating: FieldSpec,
    review_count: FieldSpec,
    base_url: Option<Url>,
}

impl ListingSchema {
    pub fn new(markup: &ListingMarkup) -> Result<Self, SchemaError> {
        Ok(Self {
            region: RegionSpec::new(&markup.region)?,
            item: parse_selector(markup.item)?,
            containers: markup
                .containers
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_, _>>()?,
            end_marker: parse_selector(markup.end_marker)?,
            name_on_item: FieldSpec::new(
                "name",
                vec![
                    Locator::on_scope(Source::Attr("aria-label")),
                    Locator::on_scope(Source::Text),
                ],
            ),
            name_in_container: FieldSpec::new(
                "name",
                vec![
                    Locator::new(".qBF1Pd", Source::Text)?,
                    Locator::new(".fontHeadlineSmall", Source::Text)?,
                ],
            ),
            rating: FieldSpec::new(
                "rating",
                vec![
                    Locator::new(r#"span[role="img"][aria-label*="star"]"#, Source::AttrThenText("aria-label"))?
                        .with_pattern(RATING_PATTERN)?,
                    Locator::new(".MW4etd", Source::Text)?.with_pattern(RATING_PATTERN)?,
                    Locator::new(r#".fontBodyMedium > span[aria-label*="star"]"#, Source::Attr("aria-label"))?
                        .with_pattern(RATING_PATTERN)?,
                    Locator::new(r#"[data-value="Rating"]"#, Source::Text)?.with_pattern(RATING_PATTERN)?,
                ],
            ),
            review_count: FieldSpec::new(
                "review_count",
                vec![
                    Locator::new(r#"span[aria-label*="review"]"#, Source::AttrThenText("aria-label"))?
                        .with_pattern(REVIEW_COUNT_PATTERN)?,
                    Locator::new(".UY7F9", Source::Text)?.with_pattern(REVIEW_COUNT_PATTERN)?,
                    Locator::new(".fontBodyMedium > span:last-child", Source::Text)?
                        .with_pattern(REVIEW_COUNT_PATTERN)?,
                    Locator::new(r#"[data-value="Review count"]"#, Source::Text)?
                        .with_pattern(REVIEW_COUNT_PATTERN)?,
                    Locator::on_scope(Source::TextNodes).with_pattern(r"\((\d[\d,]*)\)")?,
                ],
            ),
            base_url: None,
        })
    }

    /// Resolve relative venue links against the page they were found on.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    fn container<'a>(&self, item: ElementRef<'a>) -> ElementRef<'a> {
        for selector in &self.containers {
            let found = item
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|a| selector.matches(a));
            if let Some(found) = found {
                return found;
            }
        }
        item.parent().and_then(ElementRef::wrap).unwrap_or(item)
    }

    fn read(&self, index: usize, item: ElementRef<'_>) -> Option<Result<ListingRecord, CandidateError>> {
        let Some(href) = item.value().attr("href") else {
            return Some(Err(CandidateError {
                index,
                reason: "item link has no href".into(),
            }));
        };
        let Some(identity) = identity_url(href, self.base_url.as_ref()) else {
            return Some(Err(CandidateError {
                index,
                reason: format!("unusable link {href:?}"),
            }));
        };

        let container = self.container(item);
        // Nameless venues carry nothing worth keeping.
        let name = self
            .name_on_item
            .first(item)
            .or_else(|| self.name_in_container.first(container))?;

        Some(Ok(ListingRecord {
            name,
            rating: self.rating.first(container).and_then(|r| parse_decimal(&r)),
            review_count: self.review_count.first(container).and_then(|c| parse_count(&c)),
            identity_url: identity,
        }))
    }
}

impl HarvestSchema for ListingSchema {
    type Record = ListingRecord;

    fn region_kind(&self) -> RegionKind {
        RegionKind::Listing
    }

    fn region(&self) -> &RegionSpec {
        &self.region
    }

    fn measure(&self, region: ElementRef<'_>) -> usize {
        region
            .select(&self.item)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| href.split('&').next().unwrap_or(href))
            .collect::<HashSet<_>>()
            .len()
    }

    fn end_marker(&self, region: ElementRef<'_>) -> bool {
        region.select(&self.end_marker).next().is_some()
    }

    fn extract<'a>(&'a self, _doc: &'a Html, region: ElementRef<'a>) -> Candidates<'a, ListingRecord> {
        Box::new(
            region
                .select(&self.item)
                .enumerate()
                .filter_map(move |(index, item)| self.read(index, item)),
        )
    }

    fn missing_region_hint(&self, _doc: &Html) -> String {
        "make sure the page shows search results".to_string()
    }
}

pub(crate) fn parse_decimal(raw: &str) -> Option<f32> {
    raw.trim().replace(',', ".").parse::<f32>().ok()
}

pub(crate) fn parse_count(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
