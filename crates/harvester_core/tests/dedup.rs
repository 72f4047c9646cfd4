use harvester_core::{Deduplicator, Keyed, ListingRecord, ReviewRecord};
use pretty_assertions::assert_eq;

fn listing(name: &str, url: &str) -> ListingRecord {
    ListingRecord {
        name: name.to_string(),
        rating: Some(4.5),
        review_count: Some(120),
        identity_url: url.to_string(),
    }
}

#[test]
fn first_occurrence_wins_and_order_is_kept() {
    let mut dedup = Deduplicator::new();
    assert!(dedup.add(listing("Alpha", "https://x/a")));
    assert!(dedup.add(listing("Beta", "https://x/b")));
    assert!(!dedup.add(listing("Alpha (recycled)", "https://x/a")));
    assert!(dedup.add(listing("Gamma", "https://x/c")));

    let names: Vec<_> = dedup.records().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    assert!(dedup.contains(&listing("", "https://x/b").dedup_key()));
}

#[test]
fn extending_twice_with_the_same_pass_is_idempotent() {
    let pass = vec![
        listing("Alpha", "https://x/a"),
        listing("Beta", "https://x/b"),
    ];
    let mut dedup = Deduplicator::new();
    assert_eq!(dedup.extend(pass.clone()), 2);
    assert_eq!(dedup.extend(pass.clone()), 0);
    assert_eq!(dedup.into_records(), pass);
}

#[test]
fn reviews_differing_only_after_the_prefix_collapse() {
    let body = "Lovely staff. ".repeat(10);
    let first = ReviewRecord {
        subject_name: "Cafe".into(),
        author: "Ann".into(),
        stars: Some(5.0),
        text: format!("{body} Will return."),
    };
    let expanded = ReviewRecord {
        text: format!("{body} Will return. Edited later."),
        ..first.clone()
    };
    let other_author = ReviewRecord {
        author: "Bo".into(),
        ..first.clone()
    };

    let mut dedup = Deduplicator::new();
    assert!(dedup.add(first));
    assert!(!dedup.add(expanded));
    assert!(dedup.add(other_author));
    assert_eq!(dedup.len(), 2);
}
