//! Resilient connector: HTTP verbs, retries, response parsing and the cached
//! channel directory.
//!
//! # Retry policy
//!
//! | Failure | Retried | Surfaced as |
//! |---------|---------|-------------|
//! | transport (unreachable host, timeout, broken body) | yes, up to the budget | [`KronicleError::Connection`] |
//! | status >= 400 | no | [`KronicleError::Http`] |
//! | empty, non-JSON or mis-shaped body | no | [`KronicleError::Response`] |
//!
//! # Thread safety
//!
//! A connector owns its directory cache without synchronization. Every
//! operation that reads or invalidates the cache takes `&mut self`, so a
//! connector shared across threads needs an external lock; otherwise use one
//! connector per thread.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::cache::DirectoryCache;
use crate::http_client::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::{Sleeper, ThreadSleeper};
use crate::{
    ChannelData, ConnectorConfig, DataFormat, KronicleError, KronicleHttpError, KroniclePayload,
    RetryBudget, SensorId, ValidationError,
};

const LIVENESS_ROUTE: &str = "/health/live";
const READINESS_ROUTE: &str = "/health/ready";

/// Route namespace of a connector role, e.g. `data/v1` or `setup/v1`.
pub trait ConnectorRole: Send + Sync {
    fn prefix(&self) -> &'static str;
}

/// Request body: a raw JSON object or an already typed payload.
///
/// Both forms are normalized into a validated [`KroniclePayload`] before they
/// are sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Raw(Map<String, Value>),
    Payload(KroniclePayload),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(map) => map.is_empty(),
            Self::Payload(payload) => payload.is_empty(),
        }
    }

    pub fn into_payload(self) -> Result<KroniclePayload, KronicleError> {
        match self {
            Self::Raw(map) => KroniclePayload::from_map(map),
            Self::Payload(mut payload) => {
                payload.refresh_available_rows();
                Ok(payload)
            }
        }
    }
}

impl From<KroniclePayload> for Body {
    fn from(value: KroniclePayload) -> Self {
        Self::Payload(value)
    }
}

impl From<Map<String, Value>> for Body {
    fn from(value: Map<String, Value>) -> Self {
        Self::Raw(value)
    }
}

impl TryFrom<Value> for Body {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::Raw(map)),
            other => Err(ValidationError::InvalidBody {
                found: json_kind(&other),
            }),
        }
    }
}

/// Parsed response of a connector call.
#[derive(Debug, Clone, PartialEq)]
pub enum KronicleResponse {
    One(KroniclePayload),
    Many(Vec<KroniclePayload>),
    /// Decoded but unvalidated JSON (non-strict calls).
    Raw(Value),
}

impl KronicleResponse {
    pub fn into_payload(self) -> Result<KroniclePayload, KronicleError> {
        match self {
            Self::One(payload) => Ok(payload),
            other => Err(KronicleError::response(format!(
                "KroniclePayload expected, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_payload_list(self) -> Result<Vec<KroniclePayload>, KronicleError> {
        match self {
            Self::Many(payloads) => Ok(payloads),
            other => Err(KronicleError::response(format!(
                "list of KroniclePayload expected, got {}",
                other.kind()
            ))),
        }
    }

    /// An empty list or JSON `null` means the service has nothing to report.
    pub fn into_optional_payload(self) -> Result<Option<KroniclePayload>, KronicleError> {
        match self {
            Self::One(payload) => Ok(Some(payload)),
            Self::Many(payloads) if payloads.is_empty() => Ok(None),
            Self::Raw(Value::Null) => Ok(None),
            other => Err(KronicleError::response(format!(
                "KroniclePayload or nothing expected, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_raw(self) -> Result<Value, KronicleError> {
        match self {
            Self::Raw(value) => Ok(value),
            Self::One(payload) => payload.to_value(false),
            Self::Many(payloads) => Ok(serde_json::to_value(payloads)?),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::One(_) => "a single payload",
            Self::Many(_) => "a list of payloads",
            Self::Raw(value) => json_kind(value),
        }
    }
}

/// Channel holding the most rows in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRowCount {
    pub sensor_id: Option<SensorId>,
    pub available_rows: u64,
}

/// Join URL segments with exactly one slash between non-empty parts.
pub fn slash_join(parts: &[&str]) -> String {
    let mut joined = String::new();
    for part in parts {
        let trimmed = if joined.is_empty() {
            part.trim_end_matches('/')
        } else {
            part.trim_matches('/')
        };
        if trimmed.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(trimmed);
    }
    joined
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Request execution shared by every verb: URL building, the retry loop and
/// response parsing.
#[derive(Clone)]
struct Transport {
    base_url: String,
    prefix: &'static str,
    retry: RetryBudget,
    timeout_ms: u64,
    http: Arc<dyn HttpClient>,
    sleeper: Arc<dyn Sleeper>,
}

impl Transport {
    fn url(&self, route: &str) -> String {
        slash_join(&[&self.base_url, self.prefix, route])
    }

    fn request(
        &self,
        method: HttpMethod,
        route: &str,
        body: Option<Body>,
        strict: bool,
        query: &[(&str, &str)],
    ) -> Result<KronicleResponse, KronicleError> {
        let url = self.url(route);
        let mut request = HttpRequest::new(method, &url).with_timeout_ms(self.timeout_ms);
        for (name, value) in query {
            request = request.with_query(*name, *value);
        }
        if let Some(body) = body {
            let payload = body.into_payload()?;
            request = request.with_json_body(serde_json::to_string(&payload)?);
        }

        let attempts = self.retry.retries();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.http.execute(request.clone()) {
                Ok(response) => {
                    return interpret(&request, &response, strict).inspect_err(|error| {
                        warn!(%method, %url, code = error.code(), %error, "kronicle request failed");
                    });
                }
                Err(failure) => {
                    debug!(%method, %url, attempt, attempts, %failure, "transport failure");
                    if !self.retry.has_attempt_after(attempt) {
                        warn!(%method, %url, attempts, "retry budget exhausted");
                        return Err(KronicleError::Connection {
                            url,
                            attempts,
                            source: failure,
                        });
                    }
                    self.sleeper.sleep(self.retry.delay());
                }
            }
        }
    }

    /// Single unauthenticated GET outside the versioned prefix.
    fn health(&self, route: &str, expected: &str) -> Result<bool, KronicleError> {
        let url = slash_join(&[&self.base_url, route]);
        let request = HttpRequest::get(&url).with_timeout_ms(self.timeout_ms);
        let response = self
            .http
            .execute(request)
            .map_err(|source| KronicleError::Connection {
                url,
                attempts: 1,
                source,
            })?;

        let status = match parse_response(&response, false)? {
            KronicleResponse::Raw(Value::Object(body)) => body.get("status").cloned(),
            _ => None,
        };
        Ok(status.as_ref().and_then(Value::as_str) == Some(expected))
    }
}

fn interpret(
    request: &HttpRequest,
    response: &HttpResponse,
    strict: bool,
) -> Result<KronicleResponse, KronicleError> {
    if response.is_error() {
        return Err(KronicleHttpError::from_response(request, response).into());
    }
    parse_response(response, strict)
}

/// Decode a response body.
///
/// Non-strict parsing returns the decoded JSON as is. Strict parsing accepts a
/// JSON object (one payload) or a JSON array (a list of payloads).
pub fn parse_response(
    response: &HttpResponse,
    strict: bool,
) -> Result<KronicleResponse, KronicleError> {
    if response.body.trim().is_empty() {
        return Err(KronicleError::response(
            "no response content received from Kronicle",
        ));
    }

    let data: Value = serde_json::from_str(&response.body).map_err(|error| {
        KronicleError::response(format!("failed to decode JSON ({error}): {}", response.body))
    })?;

    if !strict {
        return Ok(KronicleResponse::Raw(data));
    }
    payloads_from(data, &response.body)
}

/// Validate decoded JSON as one payload (object) or a list of payloads (array).
fn payloads_from(data: Value, body: &str) -> Result<KronicleResponse, KronicleError> {
    let mismatch = |error: KronicleError| {
        KronicleError::response(format!(
            "unexpected response format, expected KroniclePayload or list of KroniclePayload ({error}): {body}"
        ))
    };

    match data {
        Value::Object(map) => KroniclePayload::from_map(map)
            .map(KronicleResponse::One)
            .map_err(mismatch),
        Value::Array(items) => items
            .into_iter()
            .map(KroniclePayload::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map(KronicleResponse::Many)
            .map_err(mismatch),
        other => Err(KronicleError::response(format!(
            "unexpected response type: {}; expected object or array",
            json_kind(&other)
        ))),
    }
}

/// Connector to one route namespace of a Kronicle server.
///
/// The role type fixes the prefix and decides which convenience operations
/// are available (see [`crate::connectors`]).
#[derive(Clone)]
pub struct KronicleConnector<R: ConnectorRole> {
    role: R,
    transport: Transport,
    directory: DirectoryCache<KroniclePayload>,
}

impl<R: ConnectorRole + Default> KronicleConnector<R> {
    /// Connector with default retry budget and timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_config(R::default(), ConnectorConfig::new(url))
    }
}

impl<R: ConnectorRole> KronicleConnector<R> {
    pub fn from_config(role: R, config: ConnectorConfig) -> Self {
        Self::with_http_client(role, config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(role: R, config: ConnectorConfig, http: Arc<dyn HttpClient>) -> Self {
        let prefix = role.prefix();
        Self {
            role,
            transport: Transport {
                base_url: config.url,
                prefix,
                retry: config.retry,
                timeout_ms: config.timeout_ms,
                http,
                sleeper: Arc::new(ThreadSleeper),
            },
            directory: DirectoryCache::new(),
        }
    }

    /// Replace the sleeper used between retry attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.transport.sleeper = sleeper;
        self
    }

    pub fn url(&self) -> &str {
        &self.transport.base_url
    }

    pub fn prefix(&self) -> &'static str {
        self.role.prefix()
    }

    pub fn role(&self) -> &R {
        &self.role
    }

    pub fn retry(&self) -> RetryBudget {
        self.transport.retry
    }

    /// Full URL for a route under this connector's prefix.
    pub fn route_url(&self, route: &str) -> String {
        self.transport.url(route)
    }

    /// Execute a call with retries. Mutating verbs invalidate the directory
    /// cache before anything is sent.
    pub fn request(
        &mut self,
        method: HttpMethod,
        route: &str,
        body: Option<Body>,
        strict: bool,
        query: &[(&str, &str)],
    ) -> Result<KronicleResponse, KronicleError> {
        if method.is_mutating() {
            self.invalidate_cache();
        }
        self.transport.request(method, route, body, strict, query)
    }

    pub fn get(&self, route: &str) -> Result<KronicleResponse, KronicleError> {
        self.transport.request(HttpMethod::Get, route, None, true, &[])
    }

    pub fn get_with_query(
        &self,
        route: &str,
        query: &[(&str, &str)],
    ) -> Result<KronicleResponse, KronicleError> {
        self.transport.request(HttpMethod::Get, route, None, true, query)
    }

    /// GET returning the decoded JSON without payload validation.
    pub fn get_raw(&self, route: &str) -> Result<Value, KronicleError> {
        self.transport
            .request(HttpMethod::Get, route, None, false, &[])?
            .into_raw()
    }

    pub fn post(
        &mut self,
        route: &str,
        body: Option<Body>,
    ) -> Result<KronicleResponse, KronicleError> {
        self.request(HttpMethod::Post, route, body, true, &[])
    }

    pub fn put(&mut self, route: &str, body: Body) -> Result<KronicleResponse, KronicleError> {
        if body.is_empty() {
            return Err(ValidationError::EmptyBody.into());
        }
        self.request(HttpMethod::Put, route, Some(body), true, &[])
    }

    pub fn patch(&mut self, route: &str, body: Body) -> Result<KronicleResponse, KronicleError> {
        if body.is_empty() {
            return Err(ValidationError::EmptyBody.into());
        }
        self.request(HttpMethod::Patch, route, Some(body), true, &[])
    }

    pub fn delete(&mut self, route: &str) -> Result<KronicleResponse, KronicleError> {
        self.request(HttpMethod::Delete, route, None, true, &[])
    }

    pub fn is_alive(&self) -> Result<bool, KronicleError> {
        self.transport.health(LIVENESS_ROUTE, "alive")
    }

    pub fn is_ready(&self) -> Result<bool, KronicleError> {
        self.transport.health(READINESS_ROUTE, "ready")
    }

    /// Force the next directory read to refetch.
    pub fn invalidate_cache(&mut self) {
        self.directory.invalidate();
    }

    /// Fetch every channel, bypassing the cache.
    pub fn get_all_channels(&self) -> Result<Vec<KroniclePayload>, KronicleError> {
        fetch_directory(&self.transport)
    }

    /// Every channel, fetched once and cached until the next mutating call.
    pub fn all_channels(&mut self) -> Result<&[KroniclePayload], KronicleError> {
        let transport = &self.transport;
        self.directory
            .get_or_try_populate(|| fetch_directory(transport))
    }

    /// Identifiers of every cached channel that has one.
    pub fn all_ids(&mut self) -> Result<Vec<SensorId>, KronicleError> {
        Ok(self
            .all_channels()?
            .iter()
            .filter_map(|channel| channel.sensor_id)
            .collect())
    }

    /// A channel by identifier; `None` on 404, an empty list or `null`.
    pub fn get_channel(&self, id: &SensorId) -> Result<Option<KroniclePayload>, KronicleError> {
        let route = format!("channels/{id}");
        let data = match self
            .transport
            .request(HttpMethod::Get, &route, None, false, &[])
        {
            Ok(response) => response.into_raw()?,
            Err(KronicleError::Http(error)) if error.status == 404 => return Ok(None),
            Err(error) => return Err(error),
        };

        let response = if data.is_null() {
            KronicleResponse::Raw(data)
        } else {
            let body = data.to_string();
            payloads_from(data, &body)?
        };
        response.into_optional_payload()
    }

    /// First cached channel whose name matches.
    pub fn get_channel_by_sensor_name(
        &mut self,
        sensor_name: &str,
    ) -> Result<Option<KroniclePayload>, KronicleError> {
        let found = self
            .all_channels()?
            .iter()
            .find(|channel| channel.sensor_name.as_deref() == Some(sensor_name))
            .cloned();
        if found.is_none() {
            debug!(sensor_name, "no channel found with this name");
        }
        Ok(found)
    }

    /// Channel with the most available rows; the earliest one wins ties.
    /// `None` when no channel has any rows.
    pub fn get_channel_with_max_rows(&mut self) -> Result<Option<ChannelRowCount>, KronicleError> {
        let mut best: Option<ChannelRowCount> = None;
        for channel in self.all_channels()? {
            let current = best.map_or(0, |best| best.available_rows);
            if channel.available_rows > current {
                best = Some(ChannelRowCount {
                    sensor_id: channel.sensor_id,
                    available_rows: channel.available_rows,
                });
            }
        }
        Ok(best)
    }

    pub fn get_rows_for_channel(
        &self,
        id: &SensorId,
        format: DataFormat,
    ) -> Result<ChannelData, KronicleError> {
        let payload = self.get(&format!("channels/{id}/rows"))?.into_payload()?;
        Ok(match format {
            DataFormat::List | DataFormat::Dict => {
                ChannelData::Rows(payload.rows.unwrap_or_default())
            }
            DataFormat::Frame => ChannelData::Frame(payload.data_frame()?),
            DataFormat::Str => {
                ChannelData::Text(serde_json::to_string(&payload.rows.unwrap_or_default())?)
            }
        })
    }

    pub fn get_cols_for_channel(
        &self,
        id: &SensorId,
        format: DataFormat,
    ) -> Result<ChannelData, KronicleError> {
        let payload = self.get(&format!("channels/{id}/columns"))?.into_payload()?;
        Ok(match format {
            DataFormat::List | DataFormat::Dict => {
                ChannelData::Columns(payload.columns.unwrap_or_default())
            }
            DataFormat::Frame => ChannelData::Frame(payload.data_frame()?),
            DataFormat::Str => ChannelData::Text(serde_json::to_string(
                &payload.columns.unwrap_or_default(),
            )?),
        })
    }
}

fn fetch_directory(transport: &Transport) -> Result<Vec<KroniclePayload>, KronicleError> {
    transport
        .request(HttpMethod::Get, "channels", None, true, &[])?
        .into_payload_list()
}
