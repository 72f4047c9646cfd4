use std::collections::HashSet;

use harvester_core::{normalize_text, RegionKind, ReviewRecord, ReviewSort};
use scraper::{ElementRef, Html, Selector};

use crate::listing::parse_decimal;
use crate::locate::{parse_selector, FieldSpec, Locator, SchemaError, Source};
use crate::region::{css_path, RegionSpec};
use crate::schema::{CandidateError, Candidates, HarvestSchema, PreStep};

const REVIEW_LIKE: &str = "[data-review-id], .jftiEf, .MyEned";
const STARS_PATTERN: &str = r"(\d+(?:[.,]\d+)?)";
const UNKNOWN_SUBJECT: &str = "Unknown";
const ANONYMOUS: &str = "Anonymous";

/// Tab labels that lead to the reviews list, across the locales seen so far.
const REVIEW_TAB_KEYWORDS: &[&str] = &["review", "クチコミ", "reseñas", "avis", "rezension"];

/// Reviews of one venue from its detail view.
#[derive(Debug, Clone)]
pub struct ReviewSchema {
    region: RegionSpec,
    item: Selector,
    review_like: Selector,
    subject: Vec<Selector>,
    tab_buttons: Selector,
    clickable: Selector,
    author: FieldSpec,
    stars: FieldSpec,
    text: FieldSpec,
    sort: ReviewSort,
}

impl ReviewSchema {
    pub fn new(sort: ReviewSort) -> Result<Self, SchemaError> {
        Ok(Self {
            region: RegionSpec::new(&[
                r#"[role="feed"]"#,
                ".m6QErb.DxyBCb",
                ".review-dialog-list",
                ".section-scrollbox",
            ])?
            .must_contain(REVIEW_LIKE)?
            .fallback_containers(&[r#"[role="feed"]"#, "div[jsrenderer]", ".m6QErb"])?,
            item: parse_selector("[data-review-id]")?,
            review_like: parse_selector(REVIEW_LIKE)?,
            subject: [
                "h1.DUwDvf.lfPIob",
                "h1",
                r#"[data-value="title"]"#,
                ".section-hero-header-title",
                ".qrShPb",
            ]
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<_, _>>()?,
            tab_buttons: parse_selector(
                r#"button[role="tab"], button[data-tab-index], [role="tablist"] button, [role="tab"]"#,
            )?,
            clickable: parse_selector(
                r#"button, a[href], [role="button"], [role="menuitemradio"], [role="option"], [tabindex="0"]"#,
            )?,
            author: FieldSpec::new(
                "author",
                vec![
                    Locator::new(".d4r55", Source::Text)?,
                    Locator::new(".WNxzHc", Source::Text)?,
                    Locator::new(r#"[data-href*="/maps/contrib/"]"#, Source::AttrThenText("aria-label"))?,
                ],
            ),
            stars: FieldSpec::new(
                "stars",
                vec![
                    Locator::new(r#"span[role="img"]"#, Source::Attr("aria-label"))?
                        .with_pattern(STARS_PATTERN)?,
                    Locator::new(".kvMYJc", Source::Attr("aria-label"))?.with_pattern(STARS_PATTERN)?,
                    Locator::new(".fzvQIb", Source::Text)?.with_pattern(STARS_PATTERN)?,
                ],
            ),
            text: FieldSpec::new(
                "text",
                vec![
                    Locator::new(".wiI7pd", Source::Text)?,
                    Locator::new(".MyEned", Source::Text)?,
                    Locator::new("[data-expandable-section]", Source::Text)?,
                ],
            ),
            sort,
        })
    }

    /// Venue name from the detail header, with trailing category and
    /// parenthesised notes cut off.
    pub fn subject_name(&self, doc: &Html) -> String {
        self.subject
            .iter()
            .filter_map(|selector| doc.select(selector).next())
            .map(|el| normalize_text(&el.text().collect::<String>()))
            .map(|name| {
                let name = name.split('·').next().unwrap_or_default();
                name.split('(').next().unwrap_or_default().trim().to_string()
            })
            .find(|name| !name.is_empty() && name != UNKNOWN_SUBJECT)
            .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string())
    }

    /// Nested elements repeat the id of the review they belong to.
    fn is_outermost(&self, element: ElementRef<'_>) -> bool {
        !element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| self.item.matches(&a))
    }

    fn read(&self, index: usize, element: ElementRef<'_>, subject: &str) -> Option<Result<ReviewRecord, CandidateError>> {
        let id = element.value().attr("data-review-id").unwrap_or_default();
        if id.trim().is_empty() {
            return Some(Err(CandidateError {
                index,
                reason: "review element with empty id".into(),
            }));
        }

        let stars = self.stars.first(element).and_then(|s| parse_decimal(&s));
        let text = self.text.first(element).unwrap_or_default();
        if stars.is_none() && text.is_empty() {
            return None;
        }

        Some(Ok(ReviewRecord {
            subject_name: subject.to_string(),
            author: self.author.first(element).unwrap_or_else(|| ANONYMOUS.to_string()),
            stars,
            text,
        }))
    }

    fn inside_review(&self, element: ElementRef<'_>) -> bool {
        self.review_like.matches(&element)
            || element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| self.review_like.matches(&a))
    }

    fn find_reviews_tab(&self, doc: &Html) -> Option<String> {
        doc.select(&self.tab_buttons)
            .filter(|tab| tab.value().attr("aria-selected") != Some("true"))
            .find(|tab| mentions_any(*tab, REVIEW_TAB_KEYWORDS))
            .map(css_path)
    }

    fn find_sort_option(&self, order: ReviewSort, doc: &Html) -> Option<String> {
        let matches: Vec<ElementRef<'_>> = doc
            .select(&self.clickable)
            .filter(|el| !self.inside_review(*el))
            .filter(|el| mentions_any(*el, order.keywords()))
            .collect();
        // A focusable menu wrapper mentions every option; prefer the innermost hit.
        matches
            .iter()
            .find(|m| {
                !matches
                    .iter()
                    .any(|other| other.id() != m.id() && other.ancestors().any(|a| a.id() == m.id()))
            })
            .map(|m| css_path(*m))
    }
}

fn mentions_any(element: ElementRef<'_>, keywords: &[&str]) -> bool {
    let label = element.value().attr("aria-label").unwrap_or_default();
    let haystack = format!("{} {}", element.text().collect::<String>(), label).to_lowercase();
    keywords.iter().any(|k| haystack.contains(&k.to_lowercase()))
}

impl HarvestSchema for ReviewSchema {
    type Record = ReviewRecord;

    fn region_kind(&self) -> RegionKind {
        RegionKind::Detail
    }

    fn region(&self) -> &RegionSpec {
        &self.region
    }

    fn measure(&self, region: ElementRef<'_>) -> usize {
        region
            .select(&self.item)
            .filter_map(|el| el.value().attr("data-review-id"))
            .filter(|id| !id.trim().is_empty())
            .collect::<HashSet<_>>()
            .len()
    }

    fn extract<'a>(&'a self, doc: &'a Html, region: ElementRef<'a>) -> Candidates<'a, ReviewRecord> {
        let subject = self.subject_name(doc);
        Box::new(
            region
                .select(&self.item)
                .filter(move |el| self.is_outermost(*el))
                .enumerate()
                .filter_map(move |(index, el)| self.read(index, el, &subject)),
        )
    }

    fn pre_steps(&self) -> Vec<PreStep> {
        let mut steps = vec![PreStep::OpenReviewsTab];
        if !self.sort.is_default() {
            steps.push(PreStep::ApplySort(self.sort));
        }
        steps
    }

    fn locate_pre_step(&self, step: PreStep, doc: &Html) -> Option<String> {
        match step {
            PreStep::OpenReviewsTab => self.find_reviews_tab(doc),
            PreStep::ApplySort(order) => self.find_sort_option(order, doc),
        }
    }

    fn missing_region_hint(&self, doc: &Html) -> String {
        if doc.select(&self.review_like).next().is_none() {
            "this place might not have any reviews yet".to_string()
        } else {
            "make sure the page is a place with a reviews list".to_string()
        }
    }
}
