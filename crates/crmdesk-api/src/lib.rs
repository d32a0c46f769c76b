// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use crmdesk_app::{
    Activity, Application, Contact, DashboardCounts, DataSnapshot, Department, EntityKind,
    FormSubmission, Incident, Integration, TagCategory, TagCategoryDetail, TagId,
};
pub use crmdesk_chat::ChatReply;
use crmdesk_chat::ChatRequest;
use reqwest::blocking::Client as HttpClient;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("cannot reach {base_url} -- start the backend or set [api].base_url ({source})")]
    Unreachable {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("decode {what}: {message}")]
    Decode { what: String, message: String },
    #[error("{error}{}", suggestion_suffix(.suggestion))]
    Refused {
        error: String,
        suggestion: Option<String>,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(text) if !text.trim().is_empty() => format!(" -- {text}"),
        _ => String::new(),
    }
}

/// Checks that `raw` is an absolute http(s) URL and returns it without a
/// trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("api.base_url must not be empty -- set it to e.g. {DEFAULT_BASE_URL}");
    }
    let parsed = Url::parse(trimmed)
        .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "api.base_url must use http or https, got {:?} -- e.g. {DEFAULT_BASE_URL}",
            parsed.scheme()
        );
    }
    Ok(trimmed.to_owned())
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Option<Duration>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// One JSON round trip to `<base_url>/<endpoint>`. The status code is not
    /// inspected; whatever JSON comes back is returned.
    pub fn call(&self, endpoint: &str, method: Method, body: Option<&Value>) -> Result<Value> {
        let (_, value) = self.exchange(endpoint, method, body)?;
        Ok(value)
    }

    pub fn list_departments(&self) -> Result<Vec<Department>> {
        self.get_typed("departments")
    }

    pub fn list_applications(&self) -> Result<Vec<Application>> {
        self.get_typed("applications")
    }

    pub fn list_integrations(&self) -> Result<Vec<Integration>> {
        self.get_typed("integrations")
    }

    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        self.get_typed("contacts")
    }

    pub fn list_activities(&self) -> Result<Vec<Activity>> {
        self.get_typed("activities")
    }

    pub fn list_incidents(&self) -> Result<Vec<Incident>> {
        self.get_typed("incidents")
    }

    pub fn dashboard(&self) -> Result<DashboardCounts> {
        self.get_typed("dashboard")
    }

    pub fn tag_categories(&self) -> Result<Vec<TagCategory>> {
        self.get_typed("tags")
    }

    pub fn tag_category(&self, name: &str) -> Result<TagCategoryDetail> {
        self.get_typed(&format!("tags/{name}"))
    }

    /// Fetches every collection plus tag categories. Any failure fails the
    /// whole load so callers never see a partial snapshot.
    pub fn load_snapshot(&self) -> Result<DataSnapshot> {
        Ok(DataSnapshot {
            departments: self.list_departments()?,
            applications: self.list_applications()?,
            integrations: self.list_integrations()?,
            contacts: self.list_contacts()?,
            activities: self.list_activities()?,
            incidents: self.list_incidents()?,
            tag_categories: self.tag_categories()?,
        })
    }

    pub fn create(&self, entity: EntityKind, payload: &Value) -> Result<Value> {
        self.call(entity.endpoint(), Method::POST, Some(payload))
    }

    pub fn update(&self, entity: EntityKind, id: i64, payload: &Value) -> Result<Value> {
        self.call(
            &format!("{}/{id}", entity.endpoint()),
            Method::PUT,
            Some(payload),
        )
    }

    pub fn delete(&self, entity: EntityKind, id: i64) -> Result<Value> {
        if !entity.supports_delete() {
            bail!(
                "{} records cannot be deleted -- the backend has no delete endpoint for them",
                entity.singular()
            );
        }
        self.call(&format!("{}/{id}", entity.endpoint()), Method::DELETE, None)
    }

    pub fn submit(&self, submission: &FormSubmission) -> Result<Value> {
        let method = match submission.target {
            crmdesk_app::FormTarget::Create => Method::POST,
            crmdesk_app::FormTarget::Update(_) => Method::PUT,
        };
        self.call(&submission.endpoint(), method, Some(&submission.payload))
    }

    pub fn create_tag(&self, category: &str, payload: &Value) -> Result<Value> {
        self.mutate_tag(&format!("tags/{category}"), Method::POST, Some(payload))
    }

    pub fn update_tag(&self, tag_id: TagId, payload: &Value) -> Result<Value> {
        self.mutate_tag(&format!("tags/{tag_id}"), Method::PUT, Some(payload))
    }

    pub fn delete_tag(&self, tag_id: TagId) -> Result<()> {
        self.mutate_tag(&format!("tags/{tag_id}"), Method::DELETE, None)?;
        Ok(())
    }

    pub fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let body = serde_json::to_value(request).context("encode chat request")?;
        let value = self.call("chat", Method::POST, Some(&body))?;
        let envelope: ChatEnvelope =
            serde_json::from_value(value).map_err(|error| decode_error("chat reply", error))?;
        match (envelope.error, envelope.response) {
            (Some(error), _) if !error.is_empty() => Ok(ChatReply::Error(error)),
            (_, Some(response)) => Ok(ChatReply::Answer(response)),
            _ => Err(ApiError::Decode {
                what: "chat reply".to_owned(),
                message: "neither response nor error present".to_owned(),
            }
            .into()),
        }
    }

    fn get_typed<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let value = self.call(endpoint, Method::GET, None)?;
        Ok(serde_json::from_value(value).map_err(|error| decode_error(endpoint, error))?)
    }

    /// Tag mutations surface a non-2xx reply as [`ApiError::Refused`],
    /// carrying the server's message and suggestion verbatim.
    fn mutate_tag(&self, endpoint: &str, method: Method, body: Option<&Value>) -> Result<Value> {
        let (status, text) = self.send(endpoint, method, body)?;
        if status.is_success() {
            tracing::info!(endpoint, status = status.as_u16(), "tag mutation accepted");
            return parse_body(endpoint, &text);
        }
        // Error pages are not always JSON; the status alone still refuses.
        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let refusal = refusal_from(status, value);
        tracing::warn!(endpoint, status = status.as_u16(), %refusal, "tag mutation refused");
        Err(refusal.into())
    }

    fn exchange(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let (status, text) = self.send(endpoint, method, body)?;
        Ok((status, parse_body(endpoint, &text)?))
    }

    fn send(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String)> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        tracing::debug!(%method, %url, "api request");

        let mut request = self
            .http
            .request(method, url.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|error| connection_error(&self.base_url, error))?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "api response");
        Ok((status, text))
    }
}

fn parse_body(endpoint: &str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text).map_err(|error| decode_error(endpoint, error))?)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    ApiError::Unreachable {
        base_url: base_url.to_owned(),
        source: error,
    }
    .into()
}

fn decode_error(what: &str, error: serde_json::Error) -> ApiError {
    ApiError::Decode {
        what: what.to_owned(),
        message: error.to_string(),
    }
}

fn refusal_from(status: StatusCode, value: Value) -> ApiError {
    if let Ok(body) = serde_json::from_value::<RefusalBody>(value)
        && let Some(error) = body.error
        && !error.is_empty()
    {
        return ApiError::Refused {
            error,
            suggestion: body.suggestion,
        };
    }
    ApiError::Refused {
        error: format!("server returned {}", status.as_u16()),
        suggestion: None,
    }
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefusalBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}
