//! Confluence Cloud REST client (basic auth with an API token).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::{ApiResult, check_status, decode_json, endpoint, http_client};

const SERVICE: &str = "Confluence";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Storage-format (XHTML) body.
    pub body: String,
}

/// Narrow view of Confluence used by the Confluence tools.
#[async_trait]
pub trait DocsClient: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> ApiResult<Vec<SearchHit>>;

    async fn get_page(&self, page_id: &str) -> ApiResult<Page>;
}

#[derive(Clone)]
pub struct HttpDocsClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl HttpDocsClient {
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> ApiResult<Self> {
        Ok(Self {
            http: http_client(concat!("api-tools-mcp-server/", env!("CARGO_PKG_VERSION")))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            api_token: api_token.into(),
        })
    }

    /// `{base}/wiki/rest/api/{segments..}` with every segment escaped.
    fn api_url(&self, segments: &[&str]) -> ApiResult<reqwest::Url> {
        let mut path = vec!["wiki", "rest", "api"];
        path.extend_from_slice(segments);
        endpoint(SERVICE, &self.base_url, &path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: reqwest::Url,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(query)
            .send()
            .await?;
        decode_json(SERVICE, check_status(SERVICE, response).await?).await
    }
}

impl std::fmt::Debug for HttpDocsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocsClient")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Plain text is wrapped in a CQL `text ~` clause; anything that already
/// looks like CQL is sent unchanged.
pub fn to_cql(query: &str) -> String {
    let looks_like_cql = ["~", "=", " AND ", " OR ", "ORDER BY"]
        .iter()
        .any(|marker| query.contains(marker));
    if looks_like_cql {
        query.to_string()
    } else {
        format!("text ~ \"{}\"", query.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

#[derive(Default, Deserialize)]
struct SpaceProto {
    #[serde(default)]
    key: Option<String>,
}

#[derive(Default, Deserialize)]
struct LinksProto {
    #[serde(default)]
    webui: Option<String>,
}

#[derive(Deserialize)]
struct ContentProto {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "type")]
    content_type: String,
    #[serde(default)]
    space: Option<SpaceProto>,
    #[serde(default)]
    version: Option<VersionProto>,
    #[serde(default)]
    body: Option<BodyProto>,
}

#[derive(Deserialize)]
struct VersionProto {
    number: u64,
}

#[derive(Deserialize)]
struct BodyProto {
    #[serde(default)]
    storage: Option<StorageProto>,
}

#[derive(Deserialize)]
struct StorageProto {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct SearchResultProto {
    #[serde(default)]
    content: Option<ContentProto>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "_links")]
    links: Option<LinksProto>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultProto>,
}

#[async_trait]
impl DocsClient for HttpDocsClient {
    async fn search(&self, query: &str, limit: u32) -> ApiResult<Vec<SearchHit>> {
        let response: SearchResponse = self
            .get_json(
                self.api_url(&["search"])?,
                &[("cql", to_cql(query)), ("limit", limit.to_string())],
            )
            .await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|result| {
                let content = result.content?;
                let url = result
                    .url
                    .or_else(|| result.links.and_then(|l| l.webui))
                    .map(|path| format!("{}/wiki{}", self.base_url, path));
                Some(SearchHit {
                    id: content.id,
                    title: result.title.unwrap_or(content.title),
                    content_type: content.content_type,
                    space: content.space.and_then(|s| s.key),
                    excerpt: result.excerpt.filter(|e| !e.is_empty()),
                    url,
                })
            })
            .collect())
    }

    async fn get_page(&self, page_id: &str) -> ApiResult<Page> {
        let content: ContentProto = self
            .get_json(
                self.api_url(&["content", page_id])?,
                &[("expand", "body.storage,version,space".to_string())],
            )
            .await?;
        Ok(Page {
            id: content.id,
            title: content.title,
            space: content.space.and_then(|s| s.key),
            version: content.version.map(|v| v.number),
            body: content
                .body
                .and_then(|b| b.storage)
                .map(|s| s.value)
                .unwrap_or_default(),
        })
    }
}
