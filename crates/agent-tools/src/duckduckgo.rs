//! DuckDuckGo web search tool
//!
//! Queries the DuckDuckGo HTML endpoint, which needs no API key, and returns
//! the organic results as `{title, href, body}` objects.

use agent_core::{Error, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::Tool;

/// Name the model uses to call this tool
pub const TOOL_NAME: &str = "duckduckgo_search";

const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_REGION: &str = "wt-wt";
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("web-search-agent/", env!("CARGO_PKG_VERSION"));

static RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result").expect("valid result selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").expect("valid title selector"));
static SNIPPET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").expect("valid snippet selector"));

/// Configuration for the DuckDuckGo tool
#[derive(Debug, Clone)]
pub struct DuckDuckGoConfig {
    /// Results returned when the model does not ask for a number
    pub max_results: usize,

    /// When set, overrides whatever limit the model asks for
    pub fixed_max_results: Option<usize>,

    /// DuckDuckGo region code (`wt-wt` is "no region")
    pub region: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// HTML search endpoint
    pub endpoint: String,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            fixed_max_results: None,
            region: DEFAULT_REGION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl DuckDuckGoConfig {
    /// Set the default number of results
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Pin the number of results regardless of the model's request
    pub fn with_fixed_max_results(mut self, max_results: usize) -> Self {
        self.fixed_max_results = Some(max_results);
        self
    }

    /// Set the region code
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set a custom endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn limit(&self, requested: Option<usize>) -> usize {
        self.fixed_max_results
            .or(requested)
            .unwrap_or(self.max_results)
            .max(1)
    }
}

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Target URL
    pub href: String,
    /// Snippet text
    pub body: String,
}

/// Source of raw search result pages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetch the HTML result page for `query` in `region`
    async fn fetch(&self, query: &str, region: &str) -> Result<String>;
}

/// Live backend posting the search form to DuckDuckGo
pub struct HttpSearchBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchBackend {
    /// Create a backend from the tool configuration
    pub fn new(config: &DuckDuckGoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::InitializationFailed(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn fetch(&self, query: &str, region: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query), ("kl", region)])
            .send()
            .await
            .map_err(|e| Error::Transport(format!("DuckDuckGo request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "DuckDuckGo returned HTTP {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("DuckDuckGo response unreadable: {e}")))
    }
}

/// Web search tool backed by DuckDuckGo
pub struct DuckDuckGoTool {
    backend: Arc<dyn SearchBackend>,
    config: DuckDuckGoConfig,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

impl DuckDuckGoTool {
    /// Create a tool that talks to DuckDuckGo over HTTP
    pub fn new(config: DuckDuckGoConfig) -> Result<Self> {
        let backend = Arc::new(HttpSearchBackend::new(&config)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Create a tool over a custom backend
    pub fn with_backend(config: DuckDuckGoConfig, backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend, config }
    }

    /// Get the tool configuration
    pub fn config(&self) -> &DuckDuckGoConfig {
        &self.config
    }

    /// Run a search and return at most `max_results` results
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::ProcessingFailed(
                "search query must not be empty".to_string(),
            ));
        }

        let limit = self.config.limit(max_results);
        info!(query, limit, "Searching DuckDuckGo");

        let html = self.backend.fetch(query, &self.config.region).await?;
        let results = parse_results(&html, limit);
        debug!(result_count = results.len(), "Search results parsed");
        Ok(results)
    }
}

#[async_trait]
impl Tool for DuckDuckGoTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: SearchParams = serde_json::from_value(params)
            .map_err(|e| Error::ProcessingFailed(format!("Invalid parameters: {e}")))?;

        let results = self.search(&params.query, params.max_results).await?;
        serde_json::to_value(results)
            .map_err(|e| Error::ProcessingFailed(format!("Failed to encode results: {e}")))
    }

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web with DuckDuckGo. Use this for current events, news and any \
         question that needs up-to-date information. Returns result titles, links \
         and snippets."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The query to search for"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default 5)"
                }
            },
            "required": ["query"]
        })
    }
}

/// Extract organic results from a DuckDuckGo HTML result page
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT_SELECTOR)
        .filter_map(|result| {
            let anchor = result.select(&TITLE_SELECTOR).next()?;
            let href = resolve_href(anchor.value().attr("href")?)?;
            let title = element_text(anchor);
            if title.is_empty() {
                return None;
            }
            let body = result
                .select(&SNIPPET_SELECTOR)
                .next()
                .map(element_text)
                .unwrap_or_default();
            Some(SearchResult { title, href, body })
        })
        .take(limit)
        .collect()
}

/// Unwrap DuckDuckGo redirect links; ads and internal links yield `None`
fn resolve_href(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let absolute = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };
    let url = Url::parse(&absolute).ok()?;

    let is_ddg = url
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));
    if !is_ddg {
        return Some(url.to_string());
    }
    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    // /y.js is an ad click-through
    None
}

/// Text content of an element with whitespace runs collapsed
fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
<div class="result results_links results_links_deep result--ad">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_provider=bingv7aa&amp;u3=x">Sponsored deal</a>
    </h2>
    <a class="result__snippet" href="https://duckduckgo.com/y.js?u3=x">Buy now</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.dawn.com%2Fnews%2F1&amp;rut=abc">Latest <b>Pakistan</b> news &amp; updates</a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.dawn.com%2Fnews%2F1">Breaking <b>news</b> from &#x27;Islamabad&#x27; and   Karachi.</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://www.bbc.com/news/world/asia">BBC Asia</a>
    </h2>
  </div>
</div>
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://example.org/third">Third</a>
    </h2>
    <a class="result__snippet" href="https://example.org/third">Third snippet</a>
  </div>
</div>
"#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(RESULTS_PAGE, 10);
        assert_eq!(results.len(), 3);

        assert_eq!(
            results[0],
            SearchResult {
                title: "Latest Pakistan news & updates".to_string(),
                href: "https://www.dawn.com/news/1".to_string(),
                body: "Breaking news from 'Islamabad' and Karachi.".to_string(),
            }
        );
        // No snippet of its own; must not borrow the next result's snippet
        assert_eq!(results[1].href, "https://www.bbc.com/news/world/asia");
        assert_eq!(results[1].body, "");
        assert_eq!(results[2].body, "Third snippet");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let results = parse_results(RESULTS_PAGE, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Latest Pakistan news & updates");
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_results("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[test]
    fn test_limit_resolution() {
        let config = DuckDuckGoConfig::default();
        assert_eq!(config.limit(None), 5);
        assert_eq!(config.limit(Some(2)), 2);
        assert_eq!(config.limit(Some(0)), 1);

        let pinned = DuckDuckGoConfig::default().with_fixed_max_results(3);
        assert_eq!(pinned.limit(Some(10)), 3);
    }

    #[test]
    fn test_named_entities_are_decoded() {
        let page = r#"
<div class="result web-result">
  <div class="result__body">
    <h2 class="result__title">
      <a class="result__a" href="https://www.geo.tv/budget">Pakistan&rsquo;s budget &mdash; live</a>
    </h2>
    <a class="result__snippet" href="https://www.geo.tv/budget">Talks continue&hellip; officials said &ldquo;soon&rdquo;</a>
  </div>
</div>
"#;
        let results = parse_results(page, 5);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Pakistan\u{2019}s budget \u{2014} live");
        assert_eq!(
            results[0].body,
            "Talks continue\u{2026} officials said \u{201c}soon\u{201d}"
        );
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1&rut=x"),
            Some("https://example.com/a?b=1".to_string())
        );
        assert_eq!(resolve_href("https://duckduckgo.com/y.js?u3=x"), None);
    }

    #[tokio::test]
    async fn test_execute_with_mock_backend() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_fetch()
            .withf(|query, region| query == "Pakistan news" && region == "wt-wt")
            .times(1)
            .returning(|_, _| Ok(RESULTS_PAGE.to_string()));

        let tool = DuckDuckGoTool::with_backend(DuckDuckGoConfig::default(), Arc::new(backend));
        let output = tool
            .execute(json!({"query": "  Pakistan news ", "max_results": 2}))
            .await
            .unwrap();

        let results: Vec<SearchResult> = serde_json::from_value(output).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].href, "https://www.dawn.com/news/1");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mut backend = MockSearchBackend::new();
        backend
            .expect_fetch()
            .returning(|_, _| Err(Error::Transport("connection refused".to_string())));

        let tool = DuckDuckGoTool::with_backend(DuckDuckGoConfig::default(), Arc::new(backend));
        let err = tool.execute(json!({"query": "anything"})).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_invalid_params_do_not_hit_backend() {
        let mut backend = MockSearchBackend::new();
        backend.expect_fetch().never();

        let tool = DuckDuckGoTool::with_backend(DuckDuckGoConfig::default(), Arc::new(backend));
        assert!(matches!(
            tool.execute(json!({"max_results": 3})).await,
            Err(Error::ProcessingFailed(_))
        ));
        assert!(matches!(
            tool.execute(json!({"query": "   "})).await,
            Err(Error::ProcessingFailed(_))
        ));
    }

    #[test]
    fn test_tool_metadata() {
        let tool = DuckDuckGoTool::new(DuckDuckGoConfig::default()).unwrap();
        assert_eq!(tool.name(), TOOL_NAME);
        assert_eq!(tool.input_schema()["required"][0], "query");
    }
}
