//! HttpApi: the alarm server over HTTP/JSON.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use super::wire::{error_message, parse_alarm, parse_alarm_list, parse_sound_list, SoundEntry, Statistics};
use super::AlarmApi;
use crate::alarm::{AlarmId, AlarmRecord, ChallengeType, NewAlarm};
use crate::challenge::ChallengeRecord;
use crate::error::ApiError;
use crate::events::StatisticsEvent;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the alarm server rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base: Url,
    http_client: Client,
}

impl HttpApi {
    /// Create a client for `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Self::from_url(Url::parse(base_url)?, timeout)
    }

    pub fn from_url(mut base: Url, timeout: Duration) -> Result<Self, ApiError> {
        // Url::join drops the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http_client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        tracing::debug!(%method, %url, "api request");
        let mut req = self.http_client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<Value>(&text).ok();
            if let Some(msg) = parsed.as_ref().and_then(error_message) {
                return Err(ApiError::Rejected(msg));
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let body: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::Malformed(format!("invalid JSON: {e}")))?;
        if let Some(msg) = error_message(&body) {
            return Err(ApiError::Rejected(msg));
        }
        Ok(body)
    }

    async fn get(&self, url: Url) -> Result<Value, ApiError> {
        self.request::<Value>(Method::GET, url, None).await
    }
}

impl AlarmApi for HttpApi {
    async fn list_alarms(&self) -> Result<Vec<AlarmRecord>, ApiError> {
        let body = self.get(self.endpoint("api/alarms")?).await?;
        parse_alarm_list(&body)
    }

    async fn create_alarm(&self, alarm: &NewAlarm) -> Result<AlarmRecord, ApiError> {
        let url = self.endpoint("api/alarms")?;
        let body = self.request(Method::POST, url, Some(alarm)).await?;
        parse_alarm(&body).ok_or_else(|| ApiError::Malformed("created alarm carries no id".into()))
    }

    async fn delete_alarm(&self, id: &AlarmId) -> Result<(), ApiError> {
        let url = self.endpoint("api/alarms")?;
        self.request(Method::DELETE, url, Some(&json!({ "id": id.to_json() })))
            .await?;
        Ok(())
    }

    async fn toggle_alarm(&self, id: &AlarmId) -> Result<bool, ApiError> {
        let url = self.endpoint("api/alarm/toggle")?;
        let body = self
            .request(Method::POST, url, Some(&json!({ "id": id.to_json() })))
            .await?;
        body.get("enabled")
            .and_then(Value::as_bool)
            .ok_or_else(|| ApiError::Malformed("toggle response has no 'enabled' flag".into()))
    }

    async fn fetch_challenge(&self, challenge_type: ChallengeType) -> Result<ChallengeRecord, ApiError> {
        let mut url = self.endpoint("api/challenge")?;
        url.query_pairs_mut()
            .append_pair("type", challenge_type.as_str());
        let body = self.get(url).await?;
        ChallengeRecord::from_response(challenge_type, &body)
    }

    async fn record_event(&self, event: &StatisticsEvent) -> Result<(), ApiError> {
        let url = self.endpoint("api/statistics")?;
        self.request(Method::POST, url, Some(event)).await?;
        Ok(())
    }

    async fn statistics(&self) -> Result<Statistics, ApiError> {
        let body = self.get(self.endpoint("api/statistics")?).await?;
        Ok(Statistics::from_json(&body))
    }

    async fn list_sounds(&self) -> Result<Vec<SoundEntry>, ApiError> {
        let body = self.get(self.endpoint("api/user_sounds")?).await?;
        parse_sound_list(&body)
    }
}
