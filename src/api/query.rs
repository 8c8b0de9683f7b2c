use std::fmt;

use crate::client::request::QueryParams;

/// Which store the API reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederationSource {
    /// underlying PI or IP21 source
    Ims,
    /// Omnia timeseries database, kept in step with IMS
    Tsdb,
    /// historic data, about two days behind TSDB
    DataLake,
}

impl FederationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FederationSource::Ims => "IMS",
            FederationSource::Tsdb => "TSDB",
            FederationSource::DataLake => "DataLake",
        }
    }
}

impl fmt::Display for FederationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Avg,
    Min,
    Max,
    Sum,
    Stddev,
    Count,
    First,
    Last,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Stddev => "stddev",
            AggregateFunction::Count => "count",
            AggregateFunction::First => "first",
            AggregateFunction::Last => "last",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for raw datapoint reads.
#[derive(Debug, Clone, Default)]
pub struct DatapointsQuery {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<Vec<i32>>,
    pub include_outside_points: Option<bool>,
    pub limit: Option<u32>,
    pub continuation_token: Option<String>,
    pub federation_source: Option<FederationSource>,
}

impl DatapointsQuery {
    pub(crate) fn apply(&self, params: QueryParams) -> QueryParams {
        params
            .opt_scalar("startTime", self.start_time.as_deref())
            .opt_scalar("endTime", self.end_time.as_deref())
            .opt_list("status", self.status.as_deref())
            .opt_scalar("includeOutsidePoints", self.include_outside_points)
            .opt_scalar("limit", self.limit)
            .opt_scalar("continuationToken", self.continuation_token.as_deref())
            .opt_scalar("federationSource", self.federation_source)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregatesQuery {
    pub aggregate_function: Vec<AggregateFunction>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<Vec<i32>>,
    /// e.g. `1h`, `15m`
    pub processing_interval: Option<String>,
    pub fill: Option<String>,
    pub limit: Option<u32>,
    pub continuation_token: Option<String>,
    pub federation_source: Option<FederationSource>,
}

impl AggregatesQuery {
    pub(crate) fn apply(&self, params: QueryParams) -> QueryParams {
        params
            .opt_list("aggregateFunction", Some(self.aggregate_function.as_slice()))
            .opt_scalar("startTime", self.start_time.as_deref())
            .opt_scalar("endTime", self.end_time.as_deref())
            .opt_list("status", self.status.as_deref())
            .opt_scalar("processingInterval", self.processing_interval.as_deref())
            .opt_scalar("fill", self.fill.as_deref())
            .opt_scalar("limit", self.limit)
            .opt_scalar("continuationToken", self.continuation_token.as_deref())
            .opt_scalar("federationSource", self.federation_source)
    }
}

/// Bounds for first/latest datapoint reads.
#[derive(Debug, Clone, Default)]
pub struct EdgeQuery {
    pub after_time: Option<String>,
    pub before_time: Option<String>,
    pub status: Option<Vec<i32>>,
    pub federation_source: Option<FederationSource>,
}

impl EdgeQuery {
    pub(crate) fn apply(&self, params: QueryParams) -> QueryParams {
        params
            .opt_scalar("afterTime", self.after_time.as_deref())
            .opt_scalar("beforeTime", self.before_time.as_deref())
            .opt_list("status", self.status.as_deref())
            .opt_scalar("federationSource", self.federation_source)
    }
}

/// Metadata listing filters. `extra` carries keys without a dedicated field.
#[derive(Debug, Clone, Default)]
pub struct TimeseriesQuery {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub source: Option<String>,
    pub asset_id: Option<String>,
    pub facility: Option<String>,
    pub limit: Option<u32>,
    pub continuation_token: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl TimeseriesQuery {
    pub(crate) fn apply(&self, params: QueryParams) -> QueryParams {
        let params = apply_extra(params, &self.extra);
        params
            .opt_scalar("name", self.name.as_deref())
            .opt_scalar("externalId", self.external_id.as_deref())
            .opt_scalar("source", self.source.as_deref())
            .opt_scalar("assetId", self.asset_id.as_deref())
            .opt_scalar("facility", self.facility.as_deref())
            .opt_scalar("limit", self.limit)
            .opt_scalar("continuationToken", self.continuation_token.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub source: Option<String>,
    pub asset_id: Option<String>,
    pub facility: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub continuation_token: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl SearchQuery {
    pub(crate) fn apply(&self, params: QueryParams) -> QueryParams {
        let params = apply_extra(params, &self.extra);
        params
            .opt_scalar("name", self.name.as_deref())
            .opt_scalar("externalId", self.external_id.as_deref())
            .opt_scalar("source", self.source.as_deref())
            .opt_scalar("assetId", self.asset_id.as_deref())
            .opt_scalar("facility", self.facility.as_deref())
            .opt_scalar("description", self.description.as_deref())
            .opt_scalar("unit", self.unit.as_deref())
            .opt_scalar("continuationToken", self.continuation_token.as_deref())
    }
}

fn apply_extra(params: QueryParams, extra: &[(String, String)]) -> QueryParams {
    extra.iter().fold(params, |params, (k, v)| params.scalar(k, v))
}
