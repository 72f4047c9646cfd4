use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use url::Url;

use crate::decode::decode_html;
use crate::page::{Page, RegionHandle};
use crate::region::select_by_path;
use crate::{FailureKind, PageError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    /// Element whose `href` leads to the longer version of the current page.
    pub next_link_selector: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            next_link_selector: r#"a[rel="next"]"#.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Loaded {
    url: Url,
    html: String,
}

/// Page driver for feeds served over HTTP where "load more" is a link to a
/// cumulatively longer rendering of the same list.
///
/// Each `load_more` follows the next link of the current document and
/// replaces the document with the response. Without a next link it does
/// nothing.
#[derive(Debug)]
pub struct HttpFeedPage {
    settings: FetchSettings,
    next_link: Selector,
    current: Mutex<Loaded>,
    /// Document replaced by the last `activate`.
    previous: Mutex<Option<Loaded>>,
}

impl HttpFeedPage {
    pub async fn open(url: &str, settings: FetchSettings) -> Result<Self, PageError> {
        let next_link = Selector::parse(&settings.next_link_selector).map_err(|_| {
            PageError::new(
                FailureKind::Unsupported,
                format!("invalid next link selector {}", settings.next_link_selector),
            )
        })?;
        let parsed = Url::parse(url)
            .map_err(|err| PageError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let first = fetch_document(&settings, parsed).await?;
        engine_info!("Opened {} ({} bytes)", first.url, first.html.len());
        Ok(Self {
            settings,
            next_link,
            current: Mutex::new(first),
            previous: Mutex::new(None),
        })
    }

    pub fn current_url(&self) -> Url {
        self.lock().url.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Loaded> {
        // A poisoned lock only means another caller panicked mid-replace;
        // the stored document is still a complete page.
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn replace(&self, loaded: Loaded) -> Loaded {
        std::mem::replace(&mut *self.lock(), loaded)
    }

    fn remember(&self, replaced: Loaded) {
        *self.previous.lock().unwrap_or_else(|p| p.into_inner()) = Some(replaced);
    }

    fn take_previous(&self) -> Option<Loaded> {
        self.previous
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
    }

    fn next_url(&self) -> Option<Url> {
        let current = self.lock().clone();
        let doc = Html::parse_document(&current.html);
        let href = doc
            .select(&self.next_link)
            .find_map(|el| el.value().attr("href"))?;
        resolve_href(href, &current.url)
    }

    fn target_url(&self, css_path: &str) -> Result<Url, PageError> {
        let current = self.lock().clone();
        let doc = Html::parse_document(&current.html);
        let element = select_by_path(&doc, css_path)
            .ok_or_else(|| PageError::new(FailureKind::TargetMissing, css_path.to_string()))?;
        let href = element.value().attr("href").ok_or_else(|| {
            PageError::new(
                FailureKind::Unsupported,
                format!("{css_path} has no link to follow"),
            )
        })?;
        resolve_href(href, &current.url)
            .ok_or_else(|| PageError::new(FailureKind::InvalidUrl, href.to_string()))
    }
}

#[async_trait::async_trait]
impl Page for HttpFeedPage {
    async fn snapshot(&self) -> Result<String, PageError> {
        Ok(self.lock().html.clone())
    }

    async fn load_more(&self, _region: &RegionHandle) -> Result<(), PageError> {
        let Some(next) = self.next_url() else {
            engine_debug!("No next link, feed fully loaded");
            return Ok(());
        };
        if next == self.current_url() {
            return Ok(());
        }
        let loaded = fetch_document(&self.settings, next).await?;
        engine_debug!("Loaded {} ({} bytes)", loaded.url, loaded.html.len());
        self.replace(loaded);
        Ok(())
    }

    async fn activate(&self, css_path: &str) -> Result<(), PageError> {
        let target = self.target_url(css_path)?;
        let loaded = fetch_document(&self.settings, target).await?;
        engine_debug!("Activated {} -> {}", css_path, loaded.url);
        let replaced = self.replace(loaded);
        self.remember(replaced);
        Ok(())
    }

    async fn restore(&self) -> Result<(), PageError> {
        let previous = self.take_previous().ok_or_else(|| {
            PageError::new(FailureKind::Unsupported, "nothing was activated yet")
        })?;
        engine_debug!("Back to {}", previous.url);
        self.replace(previous);
        Ok(())
    }
}

fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let trimmed = href.trim();
    let lower = trimmed.to_ascii_lowercase();
    if trimmed.is_empty() || lower.starts_with('#') || lower.starts_with("javascript:") {
        return None;
    }
    base.join(trimmed).ok()
}

fn build_client(
    settings: &FetchSettings,
    redirect_counter: Arc<AtomicUsize>,
) -> Result<reqwest::Client, PageError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        let count = attempt.previous().len();
        redirect_counter.store(count, Ordering::Relaxed);
        if count >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .build()
        .map_err(|err| PageError::new(FailureKind::Network, err.to_string()))
}

fn is_content_type_allowed(settings: &FetchSettings, content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or(content_type).trim();
    settings
        .allowed_content_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ct))
}

async fn fetch_document(settings: &FetchSettings, url: Url) -> Result<Loaded, PageError> {
    let redirect_counter = Arc::new(AtomicUsize::new(0));
    let client = build_client(settings, redirect_counter.clone())?;

    let response = client.get(url).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(PageError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    if let Some(content_len) = response.content_length() {
        if content_len > settings.max_bytes {
            return Err(PageError::new(
                FailureKind::TooLarge {
                    max_bytes: settings.max_bytes,
                    actual: Some(content_len),
                },
                "response too large",
            ));
        }
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    if let Some(ct) = content_type.as_deref() {
        if !is_content_type_allowed(settings, ct) {
            return Err(PageError::new(
                FailureKind::UnsupportedContentType {
                    content_type: ct.to_string(),
                },
                "unsupported content type",
            ));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > settings.max_bytes {
            return Err(PageError::new(
                FailureKind::TooLarge {
                    max_bytes: settings.max_bytes,
                    actual: Some(next_len),
                },
                "response too large",
            ));
        }
        bytes.extend_from_slice(&chunk);
    }

    let decoded = decode_html(&bytes, content_type.as_deref())
        .map_err(|err| PageError::new(FailureKind::Decode, err.to_string()))?;
    engine_debug!(
        "Fetched {} redirects={} encoding={}",
        final_url,
        redirect_counter.load(Ordering::Relaxed),
        decoded.encoding_label
    );

    Ok(Loaded {
        url: final_url,
        html: decoded.html,
    })
}

fn map_reqwest_error(err: reqwest::Error) -> PageError {
    if err.is_timeout() {
        return PageError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return PageError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    PageError::new(FailureKind::Network, err.to_string())
}
