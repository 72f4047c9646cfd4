//! Declarative field locators.
//!
//! Markup drifts, so every field is described by an ordered list of
//! [`Locator`]s. [`FieldSpec::first`] evaluates them in order and returns the
//! first non-empty, whitespace-normalized value.

use harvester_core::normalize_text;
use regex::Regex;
use scraper::{ElementRef, Selector};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, SchemaError> {
    Selector::parse(selector).map_err(|_| SchemaError::InvalidSelector(selector.into()))
}

/// Where a locator reads its raw value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Concatenated text of the element.
    Text,
    /// An attribute of the element.
    Attr(&'static str),
    /// The attribute, or the text when the attribute is absent or blank.
    AttrThenText(&'static str),
    /// Each descendant text node on its own, first match wins.
    TextNodes,
}

#[derive(Debug, Clone)]
pub struct Locator {
    /// `None` reads from the scope element itself.
    selector: Option<Selector>,
    source: Source,
    pattern: Option<Regex>,
}

impl Locator {
    pub fn new(selector: &str, source: Source) -> Result<Self, SchemaError> {
        Ok(Self {
            selector: Some(parse_selector(selector)?),
            source,
            pattern: None,
        })
    }

    pub fn on_scope(source: Source) -> Self {
        Self {
            selector: None,
            source,
            pattern: None,
        }
    }

    /// Keep only the first capture group that participates in a match
    /// (or the whole match when the pattern has no groups).
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, SchemaError> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn evaluate(&self, scope: ElementRef<'_>) -> Option<String> {
        let target = match &self.selector {
            Some(selector) => scope.select(selector).next()?,
            None => scope,
        };
        match self.source {
            Source::Text => self.accept(&target.text().collect::<String>()),
            Source::Attr(name) => self.accept(target.value().attr(name)?),
            Source::AttrThenText(name) => target
                .value()
                .attr(name)
                .and_then(|value| self.accept(value))
                .or_else(|| self.accept(&target.text().collect::<String>())),
            Source::TextNodes => target.text().find_map(|node| self.accept(node)),
        }
    }

    fn accept(&self, raw: &str) -> Option<String> {
        let value = match &self.pattern {
            Some(pattern) => {
                let caps = pattern.captures(raw)?;
                let hit = caps
                    .iter()
                    .skip(1)
                    .flatten()
                    .next()
                    .or_else(|| caps.get(0))?;
                normalize_text(hit.as_str())
            }
            None => normalize_text(raw),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// One record field and its ordered fallback chain.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: &'static str,
    locators: Vec<Locator>,
}

impl FieldSpec {
    pub fn new(name: &'static str, locators: Vec<Locator>) -> Self {
        Self { name, locators }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn first(&self, scope: ElementRef<'_>) -> Option<String> {
        self.locators.iter().find_map(|l| l.evaluate(scope))
    }
}
