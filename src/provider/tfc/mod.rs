//! # Terraform Cloud Client
//!
//! Native REST implementation of `AgentPoolApi` using reqwest with rustls.
//!
//! Only the agent pool and authentication token endpoints are used. Responses are
//! classified into `ApiError` here; the reconciler decides what each class means.

mod requests;
mod responses;

use crate::observability::metrics;
use crate::provider::{AgentPoolApi, ApiError, IssuedToken, PoolState, RemoteToken};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};
use zeroize::Zeroizing;

use self::requests::{AgentPoolRequest, AuthenticationTokenRequest};
use self::responses::{AgentPoolData, AuthenticationTokenData, Document};

const JSON_API: &str = "application/vnd.api+json";
const PAGE_SIZE: &str = "100";

/// Terraform Cloud REST client
pub struct TfcClient {
    http: ReqwestClient,
    base_url: String,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for TfcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfcClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TfcClient {
    /// Create a client for `address` (e.g. `https://app.terraform.io`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        address: &str,
        token: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = ReqwestClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: format!("{}/api/v2", address.trim_end_matches('/')),
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.as_str())
            .header(reqwest::header::CONTENT_TYPE, JSON_API)
            .header(reqwest::header::ACCEPT, JSON_API)
    }

    /// Send a request and decode the JSON:API `data` member
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        Ok(self.send_document(request, what).await?.data)
    }

    /// GET every page of a listing
    async fn send_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let page_number = page.to_string();
            let request = self
                .request(reqwest::Method::GET, path)
                .query(query)
                .query(&[("page[number]", page_number.as_str()), ("page[size]", PAGE_SIZE)]);
            let document: Document<Vec<T>> = self.send_document(request, what).await?;
            let next = document.next_page(page);
            items.extend(document.data);
            match next {
                Some(next) => page = next,
                None => return Ok(items),
            }
        }
    }

    async fn send_document<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Document<T>, ApiError> {
        let start = Instant::now();
        let result = async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status, what, &body));
            }
            response
                .json::<Document<T>>()
                .await
                .map_err(transport_error)
        }
        .await;
        record_request(&result, start);
        result
    }

    /// Send a request whose response body is ignored
    async fn send_empty(&self, request: RequestBuilder, what: &str) -> Result<(), ApiError> {
        let start = Instant::now();
        let result = async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(classify_status(status, what, &body))
        }
        .await;
        record_request(&result, start);
        result
    }
}

fn record_request<T>(result: &Result<T, ApiError>, start: Instant) {
    let outcome = match result {
        Ok(_) => "success",
        Err(ApiError::NotFound(_)) => "not_found",
        Err(ApiError::Transient(_)) => "transient",
        Err(ApiError::Rejected { .. }) => "rejected",
    };
    metrics::observe_api_request(outcome, start.elapsed().as_secs_f64());
}

/// Map a non-success HTTP status to an `ApiError`
fn classify_status(status: StatusCode, what: &str, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        ApiError::NotFound(what.to_string())
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ApiError::Transient(format!("{what}: HTTP {status}"))
    } else {
        ApiError::Rejected {
            status: status.as_u16(),
            message: format!("{what}: {body}"),
        }
    }
}

/// Failures before a status code was received are retried
fn transport_error(error: reqwest::Error) -> ApiError {
    ApiError::Transient(error.to_string())
}

#[async_trait]
impl AgentPoolApi for TfcClient {
    async fn get_pool(&self, pool_id: &str) -> Result<PoolState, ApiError> {
        let what = format!("agent pool {pool_id}");
        let request = self.request(reqwest::Method::GET, &format!("/agent-pools/{pool_id}"));
        let data: AgentPoolData = self
            .send_json(request, &what)
            .instrument(info_span!("tfc.agent_pool.get", pool.id = pool_id))
            .await?;
        Ok(data.into())
    }

    async fn find_pool(
        &self,
        organization: &str,
        name: &str,
    ) -> Result<Option<PoolState>, ApiError> {
        let what = format!("agent pools of organization {organization}");
        let path = format!("/organizations/{organization}/agent-pools");
        let pools: Vec<AgentPoolData> = self
            .send_paged(&path, &[("q", name)], &what)
            .instrument(info_span!("tfc.agent_pool.find", organization = organization, pool.name = name))
            .await?;
        // `q` is a substring search
        Ok(pools
            .into_iter()
            .map(PoolState::from)
            .find(|pool| pool.name == name))
    }

    async fn create_pool(&self, organization: &str, name: &str) -> Result<PoolState, ApiError> {
        let what = format!("organization {organization}");
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/organizations/{organization}/agent-pools"),
            )
            .json(&AgentPoolRequest::new(name));
        let data: AgentPoolData = self
            .send_json(request, &what)
            .instrument(info_span!("tfc.agent_pool.create", organization = organization, pool.name = name))
            .await?;
        debug!("Created agent pool {} ({})", name, data.id);
        Ok(data.into())
    }

    async fn update_pool(&self, pool_id: &str, name: &str) -> Result<PoolState, ApiError> {
        let what = format!("agent pool {pool_id}");
        let request = self
            .request(reqwest::Method::PATCH, &format!("/agent-pools/{pool_id}"))
            .json(&AgentPoolRequest::new(name));
        let data: AgentPoolData = self
            .send_json(request, &what)
            .instrument(info_span!("tfc.agent_pool.update", pool.id = pool_id, pool.name = name))
            .await?;
        Ok(data.into())
    }

    async fn delete_pool(&self, pool_id: &str) -> Result<(), ApiError> {
        let what = format!("agent pool {pool_id}");
        let request = self.request(reqwest::Method::DELETE, &format!("/agent-pools/{pool_id}"));
        self.send_empty(request, &what)
            .instrument(info_span!("tfc.agent_pool.delete", pool.id = pool_id))
            .await
    }

    async fn list_tokens(&self, pool_id: &str) -> Result<Vec<RemoteToken>, ApiError> {
        let what = format!("agent tokens of pool {pool_id}");
        let path = format!("/agent-pools/{pool_id}/authentication-tokens");
        let tokens: Vec<AuthenticationTokenData> = self
            .send_paged(&path, &[], &what)
            .instrument(info_span!("tfc.agent_token.list", pool.id = pool_id))
            .await?;
        Ok(tokens.into_iter().map(RemoteToken::from).collect())
    }

    async fn create_token(&self, pool_id: &str, name: &str) -> Result<IssuedToken, ApiError> {
        let what = format!("agent pool {pool_id}");
        let request = self
            .request(
                reqwest::Method::POST,
                &format!("/agent-pools/{pool_id}/authentication-tokens"),
            )
            .json(&AuthenticationTokenRequest::new(name));
        let data: AuthenticationTokenData = self
            .send_json(request, &what)
            .instrument(info_span!("tfc.agent_token.create", pool.id = pool_id, token.name = name))
            .await?;
        Ok(data.into())
    }

    async fn revoke_token(&self, token_id: &str) -> Result<(), ApiError> {
        let what = format!("agent token {token_id}");
        let request = self.request(
            reqwest::Method::DELETE,
            &format!("/authentication-tokens/{token_id}"),
        );
        self.send_empty(request, &what)
            .instrument(info_span!("tfc.agent_token.revoke", token.id = token_id))
            .await
    }
}
