//! Flood alert payloads and the backends that deliver them.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{HazardError, Result};

/// Scalar hazard index at or above which an alert is raised.
pub const FLOOD_THREAT_THRESHOLD: f64 = 0.7;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Id,
}

impl FromStr for Language {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "id" => Ok(Language::Id),
            other => Err(HazardError::Config(format!("unsupported alert language '{}'", other))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::En => "en",
            Language::Id => "id",
        })
    }
}

struct Phrases {
    title: &'static str,
    detected: &'static str,
    regions: &'static str,
    precautions: &'static str,
}

impl Language {
    fn phrases(&self) -> Phrases {
        match self {
            Language::En => Phrases {
                title: "FLOOD ALERT!",
                detected: "Imminent flood threat detected with hazard index of",
                regions: "Affected regions",
                precautions: "Please take necessary precautions immediately.",
            },
            Language::Id => Phrases {
                title: "PERINGATAN BANJIR!",
                detected: "Ancaman banjir terdeteksi dengan indeks bahaya sebesar",
                regions: "Wilayah terdampak",
                precautions: "Harap segera lakukan tindakan pencegahan yang diperlukan.",
            },
        }
    }
}

/// A flood alert ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub hazard_index: f64,
    pub regions: Vec<String>,
    pub language: Language,
    /// Telegram-style HTML message text.
    pub message: String,
}

pub fn is_flood_threat(hazard_index: f64) -> bool {
    hazard_index >= FLOOD_THREAT_THRESHOLD
}

/// Build an alert for `hazard_index`, or `None` when it is below the threat
/// threshold.
pub fn build_alert(hazard_index: f64, regions: &[String], language: Language) -> Option<AlertPayload> {
    if !is_flood_threat(hazard_index) {
        info!(hazard_index, "No imminent flood threat");
        return None;
    }

    let p = language.phrases();
    let regions_text = if regions.is_empty() {
        String::new()
    } else {
        let names: Vec<String> = regions.iter().map(|r| escape_html(r)).collect();
        format!("\n\n<b>{}:</b> {}", p.regions, names.join(", "))
    };
    let message = format!(
        "<b>\u{1F6A8} {}</b>\n\n{} <b>{:.2}</b>.{}\n\n{}",
        p.title, p.detected, hazard_index, regions_text, p.precautions
    );

    Some(AlertPayload {
        hazard_index,
        regions: regions.to_vec(),
        language,
        message,
    })
}

/// Escape text for Telegram's HTML parse mode.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Somewhere alerts can be delivered.
#[async_trait]
pub trait AlertBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, payload: &AlertPayload) -> Result<()>;
}

/// Writes alerts to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

#[async_trait]
impl AlertBackend for LogBackend {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        warn!(
            hazard_index = %format!("{:.2}", payload.hazard_index),
            regions = %payload.regions.join(", "),
            language = %payload.language,
            "Flood alert"
        );
        Ok(())
    }
}

fn http_client(backend: &'static str) -> Result<Client> {
    Client::builder()
        .timeout(SEND_TIMEOUT)
        .build()
        .map_err(|e| HazardError::delivery(backend, e))
}

/// Telegram Bot API `sendMessage`.
#[derive(Clone)]
pub struct TelegramBackend {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramBackend {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client("telegram")?,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

impl fmt::Debug for TelegramBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramBackend")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AlertBackend for TelegramBackend {
    fn name(&self) -> &'static str {
        "telegram"
    }

    #[instrument(skip(self, payload), fields(chat_id = %self.chat_id))]
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        let body = TelegramMessage {
            chat_id: &self.chat_id,
            text: &payload.message,
            parse_mode: "HTML",
        };

        // Errors are stripped of their URL, which contains the bot token.
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| HazardError::delivery(self.name(), e.without_url()))?;

        let status = response.status();
        let reply: TelegramResponse = response
            .json()
            .await
            .map_err(|e| HazardError::delivery(self.name(), format!("status {}: {}", status, e.without_url())))?;

        if !reply.ok {
            return Err(HazardError::delivery(
                self.name(),
                reply.description.unwrap_or_else(|| format!("status {}", status)),
            ));
        }

        info!(hazard_index = payload.hazard_index, "Alert sent to Telegram");
        Ok(())
    }
}

/// POSTs alerts as JSON to a messaging bridge.
#[derive(Debug, Clone)]
pub struct WebhookBackend {
    client: Client,
    url: String,
    group_id: Option<String>,
    phone_number: Option<String>,
}

/// JSON body sent by [`WebhookBackend`].
#[derive(Debug, Serialize)]
pub struct WebhookBody<'a> {
    pub message: &'a str,
    pub hazard_index: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
}

impl WebhookBackend {
    /// At least one of `group_id` and `phone_number` is required.
    pub fn new(url: impl Into<String>, group_id: Option<String>, phone_number: Option<String>) -> Result<Self> {
        if group_id.is_none() && phone_number.is_none() {
            return Err(HazardError::Config(
                "webhook alerts need a group_id or a phone_number".to_string(),
            ));
        }
        Ok(Self {
            client: http_client("webhook")?,
            url: url.into(),
            group_id,
            phone_number,
        })
    }

    pub fn body<'a>(&'a self, payload: &'a AlertPayload) -> WebhookBody<'a> {
        WebhookBody {
            message: &payload.message,
            hazard_index: payload.hazard_index,
            group_id: self.group_id.as_deref(),
            phone_number: self.phone_number.as_deref(),
        }
    }
}

#[async_trait]
impl AlertBackend for WebhookBackend {
    fn name(&self) -> &'static str {
        "webhook"
    }

    #[instrument(skip(self, payload), fields(url = %self.url))]
    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.body(payload))
            .send()
            .await
            .map_err(|e| HazardError::delivery(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HazardError::delivery(self.name(), format!("status {}", status)));
        }

        info!(hazard_index = payload.hazard_index, "Alert sent to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<String> {
        vec!["Bandung".to_string(), "Cimahi".to_string()]
    }

    #[test]
    fn test_alert_above_threshold() {
        let payload = build_alert(0.85, &regions(), Language::En).unwrap();
        assert!(payload.message.contains("0.85"));
        assert!(payload.message.contains("Bandung"));
        assert!(payload.message.contains("Cimahi"));
        assert!(payload.message.contains("Affected regions"));
        assert_eq!(payload.regions, regions());
    }

    #[test]
    fn test_region_names_are_escaped() {
        let regions = vec!["Kota <Bogor>".to_string(), "Tom & Jerry".to_string()];
        let payload = build_alert(0.85, &regions, Language::En).unwrap();
        assert!(payload.message.contains("Kota &lt;Bogor&gt;, Tom &amp; Jerry"));
        assert!(!payload.message.contains("<Bogor>"));
        assert_eq!(payload.regions, regions);
    }

    #[test]
    fn test_no_alert_below_threshold() {
        assert!(build_alert(0.5, &regions(), Language::En).is_none());
        assert!(build_alert(0.7, &[], Language::En).is_some());
    }

    #[test]
    fn test_indonesian_without_regions() {
        let payload = build_alert(0.912, &[], Language::Id).unwrap();
        assert!(payload.message.contains("PERINGATAN BANJIR!"));
        assert!(payload.message.contains("<b>0.91</b>"));
        assert!(!payload.message.contains("Wilayah terdampak"));
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("ID".parse::<Language>().unwrap(), Language::Id);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_webhook_body() {
        let backend = WebhookBackend::new("http://127.0.0.1:9/send_alert", Some("group".to_string()), None).unwrap();
        let payload = build_alert(0.85, &regions(), Language::En).unwrap();
        let json = serde_json::to_value(backend.body(&payload)).unwrap();
        assert_eq!(json["hazard_index"], 0.85);
        assert_eq!(json["group_id"], "group");
        assert!(json.get("phone_number").is_none());
    }

    #[test]
    fn test_webhook_needs_recipient() {
        assert!(matches!(
            WebhookBackend::new("http://127.0.0.1:9/send_alert", None, None),
            Err(HazardError::Config(_))
        ));
    }

    #[test]
    fn test_telegram_debug_hides_token() {
        let backend = TelegramBackend::new("secret-token", "123").unwrap();
        assert!(!format!("{:?}", backend).contains("secret-token"));
    }

    #[tokio::test]
    async fn test_unreachable_backends_fail() {
        let payload = build_alert(0.85, &regions(), Language::En).unwrap();

        let telegram = TelegramBackend::new("secret-token", "123")
            .unwrap()
            .with_api_base("http://127.0.0.1:9");
        let err = telegram.send(&payload).await.unwrap_err();
        assert!(matches!(err, HazardError::Delivery { backend: "telegram", .. }));
        assert!(!err.to_string().contains("secret-token"));

        let webhook = WebhookBackend::new("http://127.0.0.1:9/send_alert", None, Some("+62".to_string())).unwrap();
        assert!(webhook.send(&payload).await.is_err());

        assert!(LogBackend.send(&payload).await.is_ok());
    }
}
