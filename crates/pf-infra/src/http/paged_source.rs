use std::marker::PhantomData;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use pf_core::feed::{FetchError, PageQuery, PageResult, RequestContext};
use pf_core::ports::PagedQuerySourcePort;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{ErrorBodyDto, PageResponseDto};

/// Where and how to reach one paged collection.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// API root, e.g. `http://localhost:8000/poll`
    pub base_url: String,
    /// Collection path below the root, e.g. `user/polls`
    pub collection: String,
    pub timeout: Duration,
}

/// Paged query source over the REST API.
///
/// `GET {base_url}/{collection}?page=N&page_size=M&<filter>` with the session
/// token in `Authorization: Token <token>`.
///
/// 基于 HTTP 的分页数据源。
pub struct HttpPagedQuerySource<T> {
    client: reqwest::Client,
    endpoint: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpPagedQuerySource<T> {
    pub fn new(config: &HttpSourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(client, &config.base_url, &config.collection))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, collection: &str) -> Self {
        Self {
            client,
            endpoint: join_endpoint(base_url, collection),
            _item: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn join_endpoint(base_url: &str, collection: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let collection = collection.trim_matches('/');
    if collection.is_empty() {
        base_url.to_string()
    } else {
        format!("{base_url}/{collection}")
    }
}

#[async_trait]
impl<T> PagedQuerySourcePort<T> for HttpPagedQuerySource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch_page(
        &self,
        context: &RequestContext,
        query: &PageQuery,
    ) -> Result<PageResult<T>, FetchError> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ];
        params.extend(query.filter.iter().map(|(key, value)| (key, value.to_string())));

        let mut request = self.client.get(&self.endpoint).query(&params);
        if let Some(header) = context.authorization_header() {
            request = request.header(AUTHORIZATION, header);
        }

        debug!(
            endpoint = %self.endpoint,
            page = query.page,
            filter = %query.filter,
            "fetching page"
        );
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBodyDto>(&body)
                .ok()
                .and_then(ErrorBodyDto::into_message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            debug!(status = status.as_u16(), %message, "page request rejected");
            return Err(FetchError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let dto: PageResponseDto<T> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        dto.into_page_result(query.page_size)
    }
}
