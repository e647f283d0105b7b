//! REST client for the booking backend.
//!
//! Every call returns an [`ApiResult`] mirroring the backend's `{success, data | error}`
//! shape. Transport and decoding failures are folded into that shape, so nothing here
//! ever returns an `Err` to the caller.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::errors::ConfigError;
use crate::models::{Credentials, NewBooking, NewFeedback};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResult {
    pub fn ok(data: Value) -> Self {
        ApiResult { success: true, data: Some(data), error: None }
    }

    /// Non-2xx response; the body is kept for error details.
    pub fn rejected(data: Value) -> Self {
        ApiResult { success: false, data: Some(data), error: None }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        ApiResult { success: false, data: None, error: Some(message.into()) }
    }

    /// Best available explanation of a failure, or `fallback`.
    pub fn error_message(&self, fallback: &str) -> String {
        if let Some(err) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return err.to_string();
        }
        self.data
            .as_ref()
            .and_then(|d| {
                ["error", "message"]
                    .iter()
                    .find_map(|key| d.get(*key).and_then(Value::as_str))
            })
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// `data.user.id` of a login/signup response.
    pub fn user_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.pointer("/user/id"))
            .and_then(id_string)
    }

    /// `data.booking._id` of a create-booking response.
    pub fn booking_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|d| d.pointer("/booking/_id"))
            .and_then(id_string)
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn signup(&self, credentials: &Credentials) -> ApiResult;
    async fn login(&self, credentials: &Credentials) -> ApiResult;
    async fn create_booking(&self, booking: &NewBooking) -> ApiResult;
    async fn get_user_bookings(&self, user_id: &str) -> ApiResult;
    async fn submit_feedback(&self, feedback: &NewFeedback) -> ApiResult;
    async fn get_booking_feedback(&self, booking_id: &str) -> ApiResult;
}

#[derive(Clone)]
pub struct HttpApi {
    http: Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpApi {
            http: builder.build()?,
            base_url: config.api_url.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Only fails for cannot-be-a-base URLs, which Config::from_vars rejects.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request failed: {}", e);
                return ApiResult::transport(e.to_string());
            }
        };
        let status = response.status();
        match response.json::<Value>().await {
            Ok(data) if status.is_success() => ApiResult::ok(data),
            Ok(data) => {
                debug!("Backend answered {}: {}", status, data);
                ApiResult::rejected(data)
            }
            Err(e) => {
                warn!("Could not decode response ({}): {}", status, e);
                ApiResult::transport(e.to_string())
            }
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> ApiResult {
        let url = self.endpoint(segments);
        debug!("POST {}", url);
        self.execute(self.http.post(url).json(body)).await
    }

    async fn get(&self, segments: &[&str]) -> ApiResult {
        let url = self.endpoint(segments);
        debug!("GET {}", url);
        self.execute(self.http.get(url)).await
    }
}

#[async_trait]
impl BookingApi for HttpApi {
    async fn signup(&self, credentials: &Credentials) -> ApiResult {
        self.post(&["auth", "signup"], credentials).await
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult {
        self.post(&["auth", "login"], credentials).await
    }

    async fn create_booking(&self, booking: &NewBooking) -> ApiResult {
        self.post(&["bookings"], booking).await
    }

    async fn get_user_bookings(&self, user_id: &str) -> ApiResult {
        self.get(&["bookings", user_id]).await
    }

    async fn submit_feedback(&self, feedback: &NewFeedback) -> ApiResult {
        self.post(&["feedback"], feedback).await
    }

    async fn get_booking_feedback(&self, booking_id: &str) -> ApiResult {
        self.get(&["feedback", booking_id]).await
    }
}
