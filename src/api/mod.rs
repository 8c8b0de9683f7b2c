//! Omnia Timeseries API operations on top of [`Client`].
//!
//! Every method builds the url and query for one endpoint and hands it to the dispatcher.
//! Results stay untyped JSON; callers that want models use [`Client::request_json`].

pub mod query;

use http::Method;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::request::{ContentType, QueryParams, ResponseBody};
use crate::client::Client;
use crate::credentials::{CredentialKind, CredentialProvider};
use crate::error::{Error, Result};
use crate::transport::HttpSend;

pub use query::{AggregateFunction, AggregatesQuery, DatapointsQuery, EdgeQuery, FederationSource, SearchQuery, TimeseriesQuery};

pub struct TimeseriesApi<P = CredentialKind, T = reqwest::Client> {
    client: Client<P, T>,
}

impl<P: CredentialProvider, T: HttpSend> TimeseriesApi<P, T> {
    pub fn new(client: Client<P, T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client<P, T> {
        &self.client
    }

    // ---- datapoints ----

    pub async fn write_data(&self, id: &str, data: &impl Serialize, write_async: Option<bool>) -> Result<Value> {
        let params = QueryParams::new().opt_scalar("async", write_async);
        self.json(Method::POST, &self.url(&[id, "data"]), Some(to_payload(data)?), &params)
            .await
    }

    pub async fn write_multiple(&self, items: &impl Serialize, write_async: Option<bool>) -> Result<Value> {
        let params = QueryParams::new().opt_scalar("async", write_async);
        self.json(Method::POST, &self.url(&["data"]), Some(to_payload(items)?), &params)
            .await
    }

    pub async fn get_datapoints(&self, id: &str, query: &DatapointsQuery, accept: ContentType) -> Result<ResponseBody> {
        let params = query.apply(QueryParams::new());
        self.client
            .request(Method::GET, &self.url(&[id, "data"]), accept, None, Some(&params))
            .await
    }

    pub async fn get_datapoints_by_name(
        &self,
        name: &str,
        facility: &str,
        terminal: Option<&str>,
        query: &DatapointsQuery,
        accept: ContentType,
    ) -> Result<ResponseBody> {
        let params = QueryParams::new()
            .scalar("name", name)
            .scalar("facility", facility)
            .opt_scalar("terminal", terminal);
        let params = query.apply(params);
        self.client
            .request(Method::GET, &self.url(&["query", "data"]), accept, None, Some(&params))
            .await
    }

    pub async fn get_multi_datapoints(
        &self,
        request: &impl Serialize,
        continuation_token: Option<&str>,
        federation_source: Option<FederationSource>,
        accept: ContentType,
    ) -> Result<ResponseBody> {
        let params = QueryParams::new()
            .opt_scalar("continuationToken", continuation_token)
            .opt_scalar("federationSource", federation_source);
        self.client
            .request(
                Method::POST,
                &self.url(&["query", "data"]),
                accept,
                Some(to_payload(request)?),
                Some(&params),
            )
            .await
    }

    pub async fn get_aggregates(&self, id: &str, query: &AggregatesQuery, accept: ContentType) -> Result<ResponseBody> {
        let params = query.apply(QueryParams::new());
        self.client
            .request(Method::GET, &self.url(&[id, "data", "aggregates"]), accept, None, Some(&params))
            .await
    }

    pub async fn get_first_datapoint(&self, id: &str, query: &EdgeQuery, accept: ContentType) -> Result<ResponseBody> {
        let params = query.apply(QueryParams::new());
        self.client
            .request(Method::GET, &self.url(&[id, "data", "first"]), accept, None, Some(&params))
            .await
    }

    pub async fn get_latest_datapoint(&self, id: &str, query: &EdgeQuery, accept: ContentType) -> Result<ResponseBody> {
        let params = query.apply(QueryParams::new());
        self.client
            .request(Method::GET, &self.url(&[id, "data", "latest"]), accept, None, Some(&params))
            .await
    }

    pub async fn get_first_multi_datapoint(
        &self,
        request: &impl Serialize,
        federation_source: Option<FederationSource>,
        accept: ContentType,
    ) -> Result<ResponseBody> {
        self.multi_edge("first", request, federation_source, accept).await
    }

    pub async fn get_latest_multi_datapoint(
        &self,
        request: &impl Serialize,
        federation_source: Option<FederationSource>,
        accept: ContentType,
    ) -> Result<ResponseBody> {
        self.multi_edge("latest", request, federation_source, accept).await
    }

    pub async fn delete_data(&self, id: &str, start_time: Option<&str>, end_time: Option<&str>) -> Result<Value> {
        let params = QueryParams::new()
            .opt_scalar("startTime", start_time)
            .opt_scalar("endTime", end_time);
        self.json(Method::DELETE, &self.url(&[id, "data"]), None, &params).await
    }

    // ---- metadata ----

    pub async fn get_history(&self, id: &str) -> Result<Value> {
        self.json(Method::GET, &self.url(&[id, "history"]), None, &QueryParams::new())
            .await
    }

    /// The service caps the result set at 100 000 items.
    pub async fn get_timeseries(&self, query: &TimeseriesQuery) -> Result<Value> {
        let params = query.apply(QueryParams::new());
        self.json(Method::GET, &self.url(&[]), None, &params).await
    }

    /// `/search/{query}` when a free-text query is given, `/search` otherwise.
    pub async fn search_timeseries(&self, text: Option<&str>, query: &SearchQuery) -> Result<Value> {
        let url = match text {
            Some(text) => self.url(&["search", text]),
            None => self.url(&["search"]),
        };
        let params = query.apply(QueryParams::new());
        self.json(Method::GET, &url, None, &params).await
    }

    pub async fn get_timeseries_by_id(&self, id: &str) -> Result<Value> {
        self.json(Method::GET, &self.url(&[id]), None, &QueryParams::new()).await
    }

    pub async fn post_timeseries(&self, request: &impl Serialize) -> Result<Value> {
        self.json(Method::POST, &self.url(&[]), Some(to_payload(request)?), &QueryParams::new())
            .await
    }

    pub async fn get_or_add_timeseries(&self, requests: &impl Serialize) -> Result<Value> {
        self.json(
            Method::POST,
            &self.url(&["getoradd"]),
            Some(to_payload(requests)?),
            &QueryParams::new(),
        )
        .await
    }

    pub async fn patch_timeseries(&self, id: &str, request: &impl Serialize) -> Result<Value> {
        self.json(Method::PATCH, &self.url(&[id]), Some(to_payload(request)?), &QueryParams::new())
            .await
    }

    pub async fn put_timeseries(&self, id: &str, request: &impl Serialize) -> Result<Value> {
        self.json(Method::PUT, &self.url(&[id]), Some(to_payload(request)?), &QueryParams::new())
            .await
    }

    pub async fn delete_timeseries_by_id(&self, id: &str) -> Result<Value> {
        self.json(Method::DELETE, &self.url(&[id]), None, &QueryParams::new()).await
    }

    // ---- streaming ----

    pub async fn create_stream_subscription(&self, subscriptions: &impl Serialize) -> Result<Value> {
        self.json(
            Method::POST,
            &self.url(&["streaming", "subscriptions"]),
            Some(to_payload(subscriptions)?),
            &QueryParams::new(),
        )
        .await
    }

    pub async fn delete_stream_subscription(&self, id: &str) -> Result<Value> {
        self.json(
            Method::DELETE,
            &self.url(&["streaming", "subscriptions", id]),
            None,
            &QueryParams::new(),
        )
        .await
    }

    pub async fn get_streaming_subscriptions(&self) -> Result<Value> {
        self.json(Method::GET, &self.url(&["streaming", "subscriptions"]), None, &QueryParams::new())
            .await
    }

    pub async fn set_stream_destination(&self, connection_string: &str) -> Result<Value> {
        self.json(
            Method::POST,
            &self.url(&["streaming", "destination"]),
            Some(json!({ "connectionString": connection_string })),
            &QueryParams::new(),
        )
        .await
    }

    // ---- facets ----

    pub async fn get_facilities(&self) -> Result<Value> {
        self.json(Method::GET, &self.url(&["facets", "facility"]), None, &QueryParams::new())
            .await
    }

    pub async fn get_facilities_by_source(&self, source: &str) -> Result<Value> {
        let params = QueryParams::new().scalar("source", source);
        self.json(Method::GET, &self.url(&["facets", "facility"]), None, &params).await
    }

    pub async fn get_sources(&self) -> Result<Value> {
        self.json(Method::GET, &self.url(&["facets", "source"]), None, &QueryParams::new())
            .await
    }

    pub async fn get_sources_by_facility(&self, facility: &str) -> Result<Value> {
        let params = QueryParams::new().scalar("facility", facility);
        self.json(Method::GET, &self.url(&["facets", "source"]), None, &params).await
    }

    async fn multi_edge(
        &self,
        edge: &str,
        request: &impl Serialize,
        federation_source: Option<FederationSource>,
        accept: ContentType,
    ) -> Result<ResponseBody> {
        let params = QueryParams::new().opt_scalar("federationSource", federation_source);
        self.client
            .request(
                Method::POST,
                &self.url(&["query", "data", edge]),
                accept,
                Some(to_payload(request)?),
                Some(&params),
            )
            .await
    }

    async fn json(&self, method: Method, url: &str, payload: Option<Value>, params: &QueryParams) -> Result<Value> {
        let params = (!params.is_empty()).then_some(params);
        self.client.request_json(method, url, payload, params).await
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.client.base_url().to_owned();
        for segment in segments {
            url.push('/');
            url.push_str(segment.trim_matches('/'));
        }
        url
    }
}

fn to_payload(value: &impl Serialize) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::Encode)
}
