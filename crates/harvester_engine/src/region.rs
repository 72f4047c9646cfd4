use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::locate::{parse_selector, SchemaError};
use crate::page::RegionHandle;

/// How to find the scrollable container of a harvester.
///
/// Candidates are tried in order; a candidate only counts when it contains
/// an item (if `must_contain` is set). When no candidate matches, the first
/// item on the page is located and its closest fitting ancestor is used.
#[derive(Debug, Clone)]
pub struct RegionSpec {
    candidates: Vec<Selector>,
    must_contain: Option<Selector>,
    fallback_containers: Vec<Selector>,
}

impl RegionSpec {
    pub fn new(candidates: &[&str]) -> Result<Self, SchemaError> {
        Ok(Self {
            candidates: candidates
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_, _>>()?,
            must_contain: None,
            fallback_containers: Vec::new(),
        })
    }

    pub fn must_contain(mut self, items: &str) -> Result<Self, SchemaError> {
        self.must_contain = Some(parse_selector(items)?);
        Ok(self)
    }

    /// Ancestor selectors tried (closest first) from the first item when no
    /// candidate matched. Requires `must_contain`.
    pub fn fallback_containers(mut self, containers: &[&str]) -> Result<Self, SchemaError> {
        self.fallback_containers = containers
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn resolve<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        for candidate in &self.candidates {
            if let Some(found) = doc.select(candidate).find(|el| self.holds_items(*el)) {
                return Some(found);
            }
        }
        self.resolve_from_item(doc)
    }

    fn holds_items(&self, element: ElementRef<'_>) -> bool {
        match &self.must_contain {
            Some(items) => element.select(items).next().is_some(),
            None => true,
        }
    }

    fn resolve_from_item<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        let items = self.must_contain.as_ref()?;
        let first = doc.select(items).next()?;
        let ancestors: Vec<ElementRef<'a>> = first.ancestors().filter_map(ElementRef::wrap).collect();

        for container in &self.fallback_containers {
            if let Some(found) = ancestors.iter().find(|a| container.matches(a)) {
                return Some(*found);
            }
        }
        // Grandparent first: a bare parent is usually a single item wrapper.
        ancestors
            .get(1)
            .or_else(|| ancestors.first())
            .copied()
            .filter(|el| el.value().name() != "html")
    }
}

/// Handle naming `element` for a page driver.
pub fn region_handle(element: ElementRef<'_>) -> RegionHandle {
    RegionHandle::new(css_path(element))
}

/// Root-anchored CSS path of `element`, e.g. `html > body:nth-of-type(1) > div:nth-of-type(2)`.
pub fn css_path(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    let mut current = Some(element);
    while let Some(el) = current {
        let name = el.value().name();
        if name == "html" {
            parts.push("html".to_string());
            break;
        }
        parts.push(format!("{}:nth-of-type({})", name, position_among_same_tag(*el, name)));
        current = el.parent().and_then(ElementRef::wrap);
    }
    parts.reverse();
    parts.join(" > ")
}

fn position_among_same_tag(node: NodeRef<'_, Node>, name: &str) -> usize {
    1 + node
        .prev_siblings()
        .filter(|sibling| matches!(sibling.value(), Node::Element(e) if e.name() == name))
        .count()
}

/// Inverse of [`css_path`].
pub fn select_by_path<'a>(doc: &'a Html, css_path: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css_path).ok()?;
    doc.select(&selector).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div id="side"></div>
        <div class="pane"><div><div data-review-id="r1">a</div></div></div>
    </body></html>"#;

    #[test]
    fn css_path_round_trips() {
        let doc = Html::parse_document(PAGE);
        let sel = Selector::parse("[data-review-id]").unwrap();
        let review = doc.select(&sel).next().unwrap();
        let path = css_path(review);
        assert_eq!(
            path,
            "html > body:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(1) > div:nth-of-type(1)"
        );
        assert_eq!(select_by_path(&doc, &path), Some(review));
    }

    #[test]
    fn candidate_without_items_is_skipped() {
        let doc = Html::parse_document(PAGE);
        let spec = RegionSpec::new(&["#side", ".pane"])
            .unwrap()
            .must_contain("[data-review-id]")
            .unwrap();
        let region = spec.resolve(&doc).unwrap();
        assert_eq!(region.value().attr("class"), Some("pane"));
    }

    #[test]
    fn falls_back_to_ancestor_of_first_item() {
        let doc = Html::parse_document(PAGE);
        let spec = RegionSpec::new(&["[role=feed]"])
            .unwrap()
            .must_contain("[data-review-id]")
            .unwrap()
            .fallback_containers(&[".pane"])
            .unwrap();
        let region = spec.resolve(&doc).unwrap();
        assert_eq!(region.value().attr("class"), Some("pane"));

        let bare = RegionSpec::new(&["[role=feed]"])
            .unwrap()
            .must_contain("[data-review-id]")
            .unwrap();
        let region = bare.resolve(&doc).unwrap();
        assert_eq!(region.value().attr("class"), Some("pane"));
    }

    #[test]
    fn missing_region_resolves_to_none() {
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        let spec = RegionSpec::new(&["[role=feed]"]).unwrap();
        assert!(spec.resolve(&doc).is_none());
    }
}
