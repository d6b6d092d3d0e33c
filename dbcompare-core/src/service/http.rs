//! HTTP implementation of the comparison service boundary.

use super::ComparisonService;
use super::wire::{
    CatalogReply, CatalogRow, DiscoveryResponse, EndpointRequest, ProbeReply, submission_document,
};
use crate::config::ServiceConfig;
use crate::error::{DbCompareError, Result, redact_url};
use crate::models::{
    ComparisonOutcome, ComparisonRequest, ComparisonTicket, EndpointConfig, EndpointRole,
};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

const TEST_CONNECTION_ROUTE: &str = "test-connection";
const TABLES_ROUTE: &str = "tables";
const EXECUTE_QUERY_ROUTE: &str = "execute-query";
const SUBMIT_ROUTE: &str = "compare/compare-selected-tables";
const RESULTS_ROUTE: &str = "compare/results/";

/// Wraps a reqwest error without its request URL, which may carry userinfo.
fn transport_error(context: impl Into<String>, error: reqwest::Error) -> DbCompareError {
    DbCompareError::transport(context, error.without_url())
}

/// Comparison service reached over HTTP with JSON bodies.
///
/// # Example
/// ```rust
/// use dbcompare_core::config::ServiceConfig;
/// use dbcompare_core::service::HttpComparisonService;
///
/// let service = HttpComparisonService::new(&ServiceConfig::default()).unwrap();
/// assert_eq!(service.base_url().as_str(), "http://localhost:8080/api/");
/// ```
#[derive(Debug, Clone)]
pub struct HttpComparisonService {
    client: reqwest::Client,
    base: Url,
    row_limit: u32,
}

impl HttpComparisonService {
    /// Creates a client for the configured service.
    ///
    /// # Errors
    /// Returns `Configuration` if the settings are invalid, or `Transport`
    /// if the HTTP client cannot be built.
    pub fn new(settings: &ServiceConfig) -> Result<Self> {
        settings.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.probe_timeout)
            .build()
            .map_err(|e| transport_error("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base: settings.base()?,
            row_limit: settings.row_limit,
        })
    }

    /// Base URL all routes are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn route(&self, route: &str) -> Result<Url> {
        self.base.join(route).map_err(|e| {
            DbCompareError::configuration(format!("invalid service route '{route}': {e}"))
        })
    }

    async fn post_json<B, T>(&self, route: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.route(route)?;
        debug!("POST {}", redact_url(url.as_str()));

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(format!("POST {route} failed"), e))?
            .error_for_status()
            .map_err(|e| transport_error(format!("POST {route} was refused"), e))?;

        response
            .json::<T>()
            .await
            .map_err(|e| {
                transport_error(format!("POST {route} returned an unexpected body"), e)
            })
    }
}

#[async_trait]
impl ComparisonService for HttpComparisonService {
    async fn check_connection(
        &self,
        role: EndpointRole,
        config: &EndpointConfig,
    ) -> Result<bool> {
        let body = EndpointRequest::new(role, config, self.row_limit);
        let reply: ProbeReply = self.post_json(TEST_CONNECTION_ROUTE, &body).await?;
        if let ProbeReply::Status {
            success: false,
            message: Some(message),
        } = &reply
        {
            return Err(DbCompareError::ConnectionRejected {
                role,
                detail: message.clone(),
            });
        }
        Ok(reply.is_affirmative())
    }

    async fn list_tables(
        &self,
        role: EndpointRole,
        config: &EndpointConfig,
    ) -> Result<DiscoveryResponse> {
        let body = EndpointRequest::new(role, config, self.row_limit);
        self.post_json(TABLES_ROUTE, &body).await
    }

    async fn run_catalog_query(
        &self,
        role: EndpointRole,
        config: &EndpointConfig,
        query: &str,
    ) -> Result<Vec<CatalogRow>> {
        let body = EndpointRequest::new(role, config, self.row_limit).with_query(query);
        let reply: CatalogReply = self.post_json(EXECUTE_QUERY_ROUTE, &body).await?;
        Ok(reply.into_rows())
    }

    async fn submit_comparison(&self, request: &ComparisonRequest) -> Result<ComparisonTicket> {
        let document = submission_document(request)?;
        self.post_json(SUBMIT_ROUTE, &document).await
    }

    async fn fetch_outcome(&self, ticket: &ComparisonTicket) -> Result<ComparisonOutcome> {
        let id = ticket.comparison_id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(DbCompareError::validation(format!(
                "invalid comparison id '{id}'"
            )));
        }

        let url = self.route(&format!("{RESULTS_ROUTE}{id}"))?;
        debug!("GET {}", redact_url(url.as_str()));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error("GET comparison results failed", e))?
            .error_for_status()
            .map_err(|e| transport_error("comparison results were refused", e))?;

        response
            .json::<ComparisonOutcome>()
            .await
            .map_err(|e| transport_error("comparison results were not JSON", e))
    }
}
