use crate::{FailureKind, PageError};

/// Identifies the scrollable region on the page as a CSS path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionHandle {
    pub css_path: String,
}

impl RegionHandle {
    pub fn new(css_path: impl Into<String>) -> Self {
        Self {
            css_path: css_path.into(),
        }
    }
}

/// The live view a harvester works on: something that can hand out its
/// current markup and be asked for more content.
#[async_trait::async_trait]
pub trait Page: Send + Sync {
    /// Current markup of the whole page.
    async fn snapshot(&self) -> Result<String, PageError>;

    /// Ask the region for more content. Must be a no-op, not an error, when
    /// everything is already loaded.
    async fn load_more(&self, region: &RegionHandle) -> Result<(), PageError>;

    /// Activate (click, follow) the element at `css_path`.
    async fn activate(&self, css_path: &str) -> Result<(), PageError>;

    /// Go back to the view that was current before the last `activate`.
    async fn restore(&self) -> Result<(), PageError> {
        Err(PageError::new(
            FailureKind::Unsupported,
            "this page cannot go back",
        ))
    }
}
