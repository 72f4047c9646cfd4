use std::sync::{Mutex, Once};

use harvester_core::{
    HarvestError, HarvestSettings, HarvestStatus, RegionKind, ReviewRecord, ReviewSort,
};
use harvester_engine::{
    select_by_path, FailureKind, HarvestSchema, Harvester, LogProgressSink, Page, PageError,
    PreStep, RegionHandle, ReviewSchema, StopSignal,
};
use pretty_assertions::assert_eq;
use scraper::Html;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn fast() -> HarvestSettings {
    HarvestSettings {
        scroll_delay_ms: 0,
        stabilize_delay_ms: 0,
        no_change_limit: 2,
        ..HarvestSettings::reviews()
    }
}

const HEADER: &str = r#"<h1 class="DUwDvf lfPIob">Café Rouge · Bistro</h1>"#;

const TABS: &str = r#"<div role="tablist">
    <button role="tab" aria-selected="true">Overview</button>
    <button role="tab" aria-label="Reviews for Café Rouge">Reviews</button>
</div>"#;

const SORT_MENU: &str = r#"<div class="sort" tabindex="-1">
    <div role="menuitemradio">Most relevant</div>
    <div role="menuitemradio">Newest</div>
    <div role="menuitemradio">Highest rating</div>
    <div role="menuitemradio">Lowest rating</div>
</div>"#;

const REVIEWS: &str = r#"<div class="m6QErb DxyBCb">
    <div class="jftiEf" data-review-id="r1">
        <div class="d4r55">Ann</div>
        <span role="img" aria-label="5 stars"></span>
        <span class="wiI7pd">Great   food,
            newest menu is the highest point</span>
        <div data-review-id="r1"><button>Like</button></div>
    </div>
    <div class="jftiEf" data-review-id="r2">
        <span role="img" aria-label="4,5 stars"></span>
        <span class="wiI7pd">Nice
            terrace</span>
    </div>
    <div class="jftiEf" data-review-id="r3">
        <div class="d4r55">Silent Sam</div>
    </div>
    <div class="jftiEf" data-review-id="">
        <div class="d4r55">Nobody</div>
        <span class="wiI7pd">Orphaned</span>
    </div>
</div>"#;

fn page(parts: &[&str]) -> String {
    format!("<html><body>{}</body></html>", parts.concat())
}

/// Every successful activation moves to the next stage; load-more is a no-op.
struct TabbedPage {
    stages: Vec<String>,
    current: Mutex<usize>,
    activated: Mutex<Vec<String>>,
}

impl TabbedPage {
    fn new(stages: Vec<String>) -> Self {
        Self {
            stages,
            current: Mutex::new(0),
            activated: Mutex::new(Vec::new()),
        }
    }

    fn activated(&self) -> Vec<String> {
        self.activated.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Page for TabbedPage {
    async fn snapshot(&self) -> Result<String, PageError> {
        Ok(self.stages[*self.current.lock().unwrap()].clone())
    }

    async fn load_more(&self, _region: &RegionHandle) -> Result<(), PageError> {
        Ok(())
    }

    async fn activate(&self, css_path: &str) -> Result<(), PageError> {
        let mut current = self.current.lock().unwrap();
        let label = {
            let doc = Html::parse_document(&self.stages[*current]);
            let target = select_by_path(&doc, css_path)
                .ok_or_else(|| PageError::new(FailureKind::TargetMissing, css_path))?;
            target.text().collect::<String>().trim().to_string()
        };
        self.activated.lock().unwrap().push(label);
        if *current + 1 < self.stages.len() {
            *current += 1;
        }
        Ok(())
    }
}

#[test]
fn extracts_outermost_reviews_with_fallbacks() {
    init_logging();
    let doc = Html::parse_document(&page(&[HEADER, REVIEWS]));
    let schema = ReviewSchema::new(ReviewSort::MostRelevant).unwrap();
    let region = schema.region().resolve(&doc).unwrap();

    assert_eq!(region.value().attr("class"), Some("m6QErb DxyBCb"));
    assert_eq!(schema.measure(region), 3);
    assert_eq!(schema.subject_name(&doc), "Café Rouge");

    let candidates: Vec<_> = schema.extract(&doc, region).collect();
    let records: Vec<ReviewRecord> = candidates.iter().filter_map(|c| c.clone().ok()).collect();
    assert_eq!(
        records,
        vec![
            ReviewRecord {
                subject_name: "Café Rouge".into(),
                author: "Ann".into(),
                stars: Some(5.0),
                text: "Great food, newest menu is the highest point".into(),
            },
            ReviewRecord {
                subject_name: "Café Rouge".into(),
                author: "Anonymous".into(),
                stars: Some(4.5),
                text: "Nice terrace".into(),
            },
        ]
    );
    let errors: Vec<usize> = candidates
        .iter()
        .filter_map(|c| c.as_ref().err().map(|e| e.index))
        .collect();
    assert_eq!(errors, vec![3]);
}

#[test]
fn subject_defaults_to_unknown() {
    let doc = Html::parse_document(&page(&[REVIEWS]));
    let schema = ReviewSchema::new(ReviewSort::Newest).unwrap();
    assert_eq!(schema.subject_name(&doc), "Unknown");
}

#[test]
fn pre_steps_follow_the_requested_order() {
    let default = ReviewSchema::new(ReviewSort::MostRelevant).unwrap();
    assert_eq!(default.pre_steps(), vec![PreStep::OpenReviewsTab]);

    let newest = ReviewSchema::new(ReviewSort::Newest).unwrap();
    assert_eq!(
        newest.pre_steps(),
        vec![PreStep::OpenReviewsTab, PreStep::ApplySort(ReviewSort::Newest)]
    );
}

#[test]
fn sort_option_ignores_matching_review_text() {
    let doc = Html::parse_document(&page(&[HEADER, SORT_MENU, REVIEWS]));
    let schema = ReviewSchema::new(ReviewSort::HighestRating).unwrap();
    let path = schema
        .locate_pre_step(PreStep::ApplySort(ReviewSort::HighestRating), &doc)
        .unwrap();
    let target = select_by_path(&doc, &path).unwrap();
    assert_eq!(target.text().collect::<String>(), "Highest rating");
}

#[tokio::test]
async fn opens_tab_and_applies_sort_before_harvesting() {
    init_logging();
    let page = TabbedPage::new(vec![
        page(&[HEADER, TABS]),
        page(&[HEADER, TABS, SORT_MENU, REVIEWS]),
        page(&[HEADER, TABS, SORT_MENU, REVIEWS]),
    ]);
    let harvester = Harvester::new(ReviewSchema::new(ReviewSort::Newest).unwrap());

    let result = harvester
        .run(&page, fast(), &StopSignal::new(), &LogProgressSink)
        .await;

    assert_eq!(page.activated(), vec!["Reviews".to_string(), "Newest".to_string()]);
    assert_eq!(result.status, HarvestStatus::Converged);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.warnings.len(), 1);
    assert!(matches!(
        result.warnings[0],
        HarvestError::ExtractionCandidate { index: 3, .. }
    ));
}

#[tokio::test]
async fn missing_sort_control_is_a_warning() {
    init_logging();
    let page = TabbedPage::new(vec![page(&[HEADER, REVIEWS])]);
    let harvester = Harvester::new(ReviewSchema::new(ReviewSort::LowestRating).unwrap());

    let result = harvester
        .run(&page, fast(), &StopSignal::new(), &LogProgressSink)
        .await;

    assert!(page.activated().is_empty());
    assert_eq!(result.status, HarvestStatus::Converged);
    assert_eq!(result.records.len(), 2);
    assert!(result.warnings.iter().any(|w| matches!(
        w,
        HarvestError::SortApplication {
            order: ReviewSort::LowestRating,
            ..
        }
    )));
}

#[tokio::test]
async fn place_without_reviews_fails_with_hint() {
    init_logging();
    let page = TabbedPage::new(vec![page(&[HEADER, TABS])]);
    let harvester = Harvester::new(ReviewSchema::new(ReviewSort::MostRelevant).unwrap());

    let result = harvester
        .run(&page, fast(), &StopSignal::new(), &LogProgressSink)
        .await;

    assert_eq!(result.status, HarvestStatus::Failed);
    match result.error {
        Some(HarvestError::RegionNotFound { region, hint }) => {
            assert_eq!(region, RegionKind::Detail);
            assert!(hint.contains("might not have any reviews"), "{hint}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
