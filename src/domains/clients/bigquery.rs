//! BigQuery REST v2 client.
//!
//! Queries run as jobs: [`WarehouseClient::start_query`] inserts the job and
//! [`WarehouseClient::wait_for_results`] polls `getQueryResults` until the
//! job completes. A job that is no longer wanted can be cancelled with
//! [`WarehouseClient::request_cancel`], which fires and forgets.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult, check_status, decode_json, endpoint, http_client};

const SERVICE: &str = "BigQuery";
pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const SERVER_WAIT_MS: u64 = 10_000;

/// Handle on a running query job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Rows of a completed query, each keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub job_id: String,
    pub schema: Vec<FieldSchema>,
    pub rows: Vec<Map<String, Value>>,
    pub total_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub table_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetails {
    pub dataset_id: String,
    pub table_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<u64>,
    pub schema: Vec<FieldSchema>,
}

/// Narrow view of the warehouse used by the BigQuery tools.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    async fn start_query(&self, query: &str) -> ApiResult<JobReference>;

    async fn wait_for_results(&self, job: &JobReference, max_results: u32)
    -> ApiResult<QueryResults>;

    /// Ask upstream to stop `job`. Must not block; failures are only logged.
    fn request_cancel(&self, job: &JobReference);

    async fn list_datasets(&self) -> ApiResult<Vec<DatasetSummary>>;

    async fn list_tables(&self, dataset_id: &str) -> ApiResult<Vec<TableSummary>>;

    async fn describe_table(&self, dataset_id: &str, table_id: &str) -> ApiResult<TableDetails>;
}

/// [`WarehouseClient`] over the BigQuery REST API with a bearer token.
#[derive(Clone)]
pub struct HttpWarehouseClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: String,
}

impl HttpWarehouseClient {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> ApiResult<Self> {
        Ok(Self {
            http: http_client(concat!("api-tools-mcp-server/", env!("CARGO_PKG_VERSION")))?,
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            access_token: access_token.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// `{base}/projects/{project}/{segments..}` with every segment escaped.
    fn project_url(&self, segments: &[&str]) -> ApiResult<reqwest::Url> {
        let mut path = vec!["projects", self.project_id.as_str()];
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
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        decode_json(SERVICE, check_status(SERVICE, response).await?).await
    }
}

impl std::fmt::Debug for HttpWarehouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWarehouseClient")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertJobResponse {
    job_reference: JobReference,
}

#[derive(Deserialize)]
struct ApiErrorProto {
    message: String,
}

#[derive(Default, Deserialize)]
struct SchemaProto {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Deserialize)]
struct CellProto {
    #[serde(default)]
    v: Value,
}

#[derive(Deserialize)]
struct RowProto {
    #[serde(default)]
    f: Vec<CellProto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultsResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    schema: Option<SchemaProto>,
    #[serde(default)]
    rows: Vec<RowProto>,
    #[serde(default)]
    total_rows: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorProto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReferenceProto {
    dataset_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetProto {
    dataset_reference: DatasetReferenceProto,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
struct DatasetListResponse {
    #[serde(default)]
    datasets: Vec<DatasetProto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReferenceProto {
    table_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableListItemProto {
    table_reference: TableReferenceProto,
    #[serde(default, rename = "type")]
    table_type: Option<String>,
}

#[derive(Deserialize)]
struct TableListResponse {
    #[serde(default)]
    tables: Vec<TableListItemProto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableProto {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    num_rows: Option<String>,
    #[serde(default)]
    schema: Option<SchemaProto>,
}

/// Zip BigQuery's positional `f`/`v` cells with the column names.
fn rows_to_objects(fields: &[FieldSchema], rows: Vec<RowProto>) -> Vec<Map<String, Value>> {
    rows.into_iter()
        .map(|row| {
            fields
                .iter()
                .map(|f| f.name.clone())
                .zip(row.f.into_iter().map(|cell| cell.v))
                .collect()
        })
        .collect()
}

#[async_trait]
impl WarehouseClient for HttpWarehouseClient {
    async fn start_query(&self, query: &str) -> ApiResult<JobReference> {
        let body = json!({
            "configuration": {
                "query": { "query": query, "useLegacySql": false }
            }
        });
        let response = self
            .http
            .post(self.project_url(&["jobs"])?)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let inserted: InsertJobResponse =
            decode_json(SERVICE, check_status(SERVICE, response).await?).await?;
        debug!(job_id = %inserted.job_reference.job_id, "Query job started");
        Ok(inserted.job_reference)
    }

    async fn wait_for_results(
        &self,
        job: &JobReference,
        max_results: u32,
    ) -> ApiResult<QueryResults> {
        let url = self.project_url(&["queries", job.job_id.as_str()])?;
        let mut query = vec![
            ("maxResults", max_results.to_string()),
            ("timeoutMs", SERVER_WAIT_MS.to_string()),
        ];
        if let Some(location) = &job.location {
            query.push(("location", location.clone()));
        }

        loop {
            let page: QueryResultsResponse = self.get_json(url.clone(), &query).await?;
            if let Some(first) = page.errors.first() {
                return Err(ApiError::api(SERVICE, first.message.clone()));
            }
            if !page.job_complete {
                debug!(job_id = %job.job_id, "Query job still running");
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }

            let schema = page.schema.unwrap_or_default().fields;
            let total_rows = page
                .total_rows
                .and_then(|n| n.parse().ok())
                .unwrap_or(page.rows.len() as u64);
            let rows = rows_to_objects(&schema, page.rows);
            return Ok(QueryResults {
                job_id: job.job_id.clone(),
                schema,
                rows,
                total_rows,
            });
        }
    }

    fn request_cancel(&self, job: &JobReference) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(job_id = %job.job_id, "No runtime available to cancel query job");
            return;
        };

        let url = match self.project_url(&["jobs", job.job_id.as_str(), "cancel"]) {
            Ok(url) => url,
            Err(e) => {
                warn!(job_id = %job.job_id, "Cannot cancel query job: {}", e);
                return;
            }
        };
        let mut request = self.http.post(url).bearer_auth(&self.access_token);
        if let Some(location) = &job.location {
            request = request.query(&[("location", location)]);
        }
        let job_id = job.job_id.clone();

        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(job_id = %job_id, "Query job cancelled upstream");
                }
                Ok(response) => {
                    warn!(job_id = %job_id, status = %response.status(), "Upstream refused to cancel query job");
                }
                Err(e) => warn!(job_id = %job_id, "Failed to cancel query job: {}", e),
            }
        });
    }

    async fn list_datasets(&self) -> ApiResult<Vec<DatasetSummary>> {
        let list: DatasetListResponse = self
            .get_json(self.project_url(&["datasets"])?, &[])
            .await?;
        Ok(list
            .datasets
            .into_iter()
            .map(|d| DatasetSummary {
                dataset_id: d.dataset_reference.dataset_id,
                location: d.location,
            })
            .collect())
    }

    async fn list_tables(&self, dataset_id: &str) -> ApiResult<Vec<TableSummary>> {
        let list: TableListResponse = self
            .get_json(self.project_url(&["datasets", dataset_id, "tables"])?, &[])
            .await?;
        Ok(list
            .tables
            .into_iter()
            .map(|t| TableSummary {
                table_id: t.table_reference.table_id,
                table_type: t.table_type,
            })
            .collect())
    }

    async fn describe_table(&self, dataset_id: &str, table_id: &str) -> ApiResult<TableDetails> {
        let table: TableProto = self
            .get_json(
                self.project_url(&["datasets", dataset_id, "tables", table_id])?,
                &[],
            )
            .await?;
        Ok(TableDetails {
            dataset_id: dataset_id.to_string(),
            table_id: table_id.to_string(),
            description: table.description,
            num_rows: table.num_rows.and_then(|n| n.parse().ok()),
            schema: table.schema.unwrap_or_default().fields,
        })
    }
}
