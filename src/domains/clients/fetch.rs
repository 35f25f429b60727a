//! Plain HTTP GET client behind the `fetch` tool.

use async_trait::async_trait;

use super::error::{ApiResult, check_status, http_client};

const SERVICE: &str = "Fetch";

/// Body of a fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ApiResult<FetchedPage>;
}

/// [`PageFetcher`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http: http_client(concat!("api-tools-mcp-server/", env!("CARGO_PKG_VERSION")))?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> ApiResult<FetchedPage> {
        let response = self.http.get(url).send().await?;
        let response = check_status(SERVICE, response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(FetchedPage {
            url: url.to_string(),
            content_type,
            body,
        })
    }
}
