use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ControlPlaneError;
use super::model::{
    DatasetSummary, DefaultRouteRequest, EtlJob, Ingestion, JobRun, RouteId, RouteRequest,
};
use super::{DatasetCatalog, EtlCatalog, LogGroupAdmin, LogRoutingPlatform};
use crate::scan::{Page, ScanCursor};

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Control-plane client speaking JSON to a gateway
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    http_client: reqwest::Client,
    base_url: String,
    account_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "__type")]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedRoute {
    route_id: String,
}

impl HttpControlPlane {
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ControlPlaneError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ControlPlaneError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
        }
        url
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: String,
        cursor: Option<ScanCursor>,
        extra: &[(&str, String)],
    ) -> Result<Page<T>, ControlPlaneError> {
        let mut query: Vec<(&str, String)> = extra.to_vec();
        if let Some(cursor) = cursor {
            query.push(("next_token", cursor.as_str().to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Network(e.to_string()))?;

        let response = Self::check_status(response).await?;
        response
            .json::<Page<T>>()
            .await
            .map_err(|e| ControlPlaneError::Deserialization(e.to_string()))
    }

    async fn put_json<B: serde::Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
    ) -> Result<reqwest::Response, ControlPlaneError> {
        let response = self
            .http_client
            .put(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ControlPlaneError::Network(e.to_string()))?;

        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ControlPlaneError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
        let (code, message) = match body {
            Some(body) => (body.code, body.message.unwrap_or_else(|| text.clone())),
            None => (None, text),
        };

        Err(ControlPlaneError::from_response(
            status.as_u16(),
            code.as_deref(),
            message,
        ))
    }
}

#[async_trait]
impl EtlCatalog for HttpControlPlane {
    async fn list_jobs(&self, cursor: Option<ScanCursor>) -> Result<Page<EtlJob>, ControlPlaneError> {
        self.get_page(self.endpoint(&["etl", "jobs"]), cursor, &[]).await
    }

    async fn list_job_runs(
        &self,
        job_name: &str,
        cursor: Option<ScanCursor>,
        page_size: u32,
    ) -> Result<Page<JobRun>, ControlPlaneError> {
        self.get_page(
            self.endpoint(&["etl", "jobs", job_name, "runs"]),
            cursor,
            &[("max_results", page_size.to_string())],
        )
        .await
    }
}

#[async_trait]
impl DatasetCatalog for HttpControlPlane {
    async fn list_datasets(
        &self,
        cursor: Option<ScanCursor>,
    ) -> Result<Page<DatasetSummary>, ControlPlaneError> {
        self.get_page(
            self.endpoint(&["accounts", &self.account_id, "datasets"]),
            cursor,
            &[],
        )
        .await
    }

    async fn list_ingestions(
        &self,
        data_set_id: &str,
        cursor: Option<ScanCursor>,
    ) -> Result<Page<Ingestion>, ControlPlaneError> {
        self.get_page(
            self.endpoint(&["accounts", &self.account_id, "datasets", data_set_id, "ingestions"]),
            cursor,
            &[],
        )
        .await
    }
}

#[async_trait]
impl LogRoutingPlatform for HttpControlPlane {
    async fn put_default_route(&self, request: &DefaultRouteRequest) -> Result<(), ControlPlaneError> {
        self.put_json(
            self.endpoint(&["logs", "account-policies", &request.policy_name]),
            request,
        )
        .await?;
        Ok(())
    }

    async fn create_route(&self, request: &RouteRequest) -> Result<RouteId, ControlPlaneError> {
        let response = self
            .put_json(
                self.endpoint(&[
                    "logs",
                    "groups",
                    &request.log_group,
                    "subscription-filters",
                    &request.route_name,
                ]),
                request,
            )
            .await?;

        let created: CreatedRoute = response
            .json()
            .await
            .map_err(|e| ControlPlaneError::Deserialization(e.to_string()))?;
        Ok(RouteId(created.route_id))
    }
}

#[async_trait]
impl LogGroupAdmin for HttpControlPlane {
    async fn put_retention_policy(&self, log_group: &str, retention_days: u32) -> Result<(), ControlPlaneError> {
        self.put_json(
            self.endpoint(&["logs", "groups", log_group, "retention"]),
            &serde_json::json!({ "retention_in_days": retention_days }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn spawn_gateway(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client =
            HttpControlPlane::new("http://gateway/", "123", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(&["logs", "groups", "/aws/lambda/my fn", "retention"]),
            "http://gateway/logs/groups/%2Faws%2Flambda%2Fmy%20fn/retention"
        );
    }

    #[tokio::test]
    async fn test_list_job_runs_pages_and_errors() {
        let router = Router::new().route(
            "/etl/jobs/:name/runs",
            get(
                |Path(name): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                    if name == "missing" {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(serde_json::json!({
                                "code": "EntityNotFoundException",
                                "message": "no such job"
                            })),
                        )
                            .into_response();
                    }
                    assert_eq!(params.get("max_results").map(String::as_str), Some("25"));
                    let next = match params.get("next_token") {
                        None => serde_json::json!("t1"),
                        Some(_) => serde_json::Value::Null,
                    };
                    Json(serde_json::json!({
                        "items": [{
                            "id": "jr_1",
                            "job_name": name,
                            "started_on": "2024-01-01T23:00:00Z",
                            "job_run_state": "FAILED"
                        }],
                        "next_cursor": next
                    }))
                    .into_response()
                },
            ),
        );
        let base = spawn_gateway(router).await;
        let client = HttpControlPlane::new(base, "123", Duration::from_secs(5)).unwrap();

        let first = client.list_job_runs("nightly", None, 25).await.unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.next_cursor, Some(ScanCursor::new("t1")));

        let second = client
            .list_job_runs("nightly", first.next_cursor, 25)
            .await
            .unwrap();
        assert_eq!(second.next_cursor, None);

        let err = client.list_job_runs("missing", None, 25).await.unwrap_err();
        assert_eq!(err, ControlPlaneError::NotFound("no such job".into()));
    }

    #[tokio::test]
    async fn test_throttled_response_is_classified() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let router = Router::new().route(
            "/etl/jobs",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({
                            "__type": "ThrottlingException",
                            "message": "Rate exceeded"
                        })),
                    )
                }
            }),
        );
        let base = spawn_gateway(router).await;
        let client = HttpControlPlane::new(base, "123", Duration::from_secs(5)).unwrap();

        let err = client.list_jobs(None).await.unwrap_err();
        assert_eq!(err, ControlPlaneError::Throttled("Rate exceeded".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
