//! Enrichment client: one blocking POST per request, run on its own
//! thread, with the outcome posted back to the host as a `HostEvent`.

use bus::{EnrichOutcome, HostEvent};
use core_types::ControlId;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

pub const ENDPOINT: &str = "https://www.iflyrec.com/TranslationService/v1/textTranslation";
pub const ORIGIN: &str = "https://www.iflyrec.com";

/// Shown when the service answers but not with a translation.
pub const TRANSLATION_FAILED: &str = "翻译失败";
/// Shown when the service could not be reached.
pub const NETWORK_FAILED: &str = "网络请求失败";

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("translation service answered with status {0}")]
    Status(u16),
    #[error("unexpected translation response: {0}")]
    Shape(String),
    #[error("translation request failed: {0}")]
    Transport(String),
}

impl EnrichError {
    /// Fixed string shown in place of the translation.
    pub fn display_text(&self) -> &'static str {
        match self {
            EnrichError::Status(_) | EnrichError::Shape(_) => TRANSLATION_FAILED,
            EnrichError::Transport(_) => NETWORK_FAILED,
        }
    }
}

pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> Result<String, EnrichError>;
}

/// Request body: English (`"2"`) to Chinese (`"1"`), one content item.
pub fn request_body(text: &str) -> Value {
    json!({
        "from": "2",
        "to": "1",
        "contents": [{ "text": text, "frontBlankLine": 0 }],
    })
}

/// The translation is `biz[0].translateResult` of a 200 response.
pub fn parse_response(status: u16, body: &Value) -> Result<String, EnrichError> {
    if status != 200 {
        return Err(EnrichError::Status(status));
    }
    body.pointer("/biz/0/translateResult")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EnrichError::Shape("missing biz[0].translateResult".to_string()))
}

pub struct HttpTranslator {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpTranslator {
    pub fn new() -> Self {
        Self::with_endpoint(ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(concat!("hanhua/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }
}

impl Default for HttpTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str) -> Result<String, EnrichError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .set("Origin", ORIGIN)
            .send_json(request_body(text));
        match response {
            Ok(response) => {
                let status = response.status();
                let body: Value = response
                    .into_json()
                    .map_err(|e| EnrichError::Shape(e.to_string()))?;
                parse_response(status, &body)
            }
            Err(ureq::Error::Status(code, _)) => Err(EnrichError::Status(code)),
            Err(ureq::Error::Transport(err)) => Err(EnrichError::Transport(err.to_string())),
        }
    }
}

/// Run one request on a fresh thread and post `EnrichmentDone` to `evt_tx`.
/// There is no cancellation; a closed channel drops the result.
pub fn spawn_translate(
    translator: Arc<dyn Translator>,
    control: ControlId,
    text: String,
    evt_tx: Sender<HostEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let outcome = match translator.translate(&text) {
            Ok(translated) => EnrichOutcome::Translated(translated),
            Err(err) => {
                log::warn!(target: "net", "enrichment for control {control} failed: {err}");
                EnrichOutcome::Failed(err.display_text().to_string())
            }
        };
        let _ = evt_tx.send(HostEvent::EnrichmentDone { control, outcome });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    enum Fixed {
        Translated(&'static str),
        Status(u16),
        Unreachable,
    }

    impl Translator for Fixed {
        fn translate(&self, _text: &str) -> Result<String, EnrichError> {
            match self {
                Fixed::Translated(text) => Ok(text.to_string()),
                Fixed::Status(code) => Err(EnrichError::Status(*code)),
                Fixed::Unreachable => Err(EnrichError::Transport("refused".to_string())),
            }
        }
    }

    fn outcome_of(translator: Fixed) -> EnrichOutcome {
        let (tx, rx) = mpsc::channel();
        spawn_translate(Arc::new(translator), 7, "hello".to_string(), tx)
            .join()
            .unwrap();
        match rx.recv().unwrap() {
            HostEvent::EnrichmentDone { control: 7, outcome } => outcome,
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn body_matches_service_contract() {
        assert_eq!(
            request_body("Hi"),
            json!({"from":"2","to":"1","contents":[{"text":"Hi","frontBlankLine":0}]})
        );
    }

    #[test]
    fn parses_translate_result() {
        let body = json!({"code":"000000","biz":[{"translateResult":"你好"}]});
        assert_eq!(parse_response(200, &body).unwrap(), "你好");
    }

    #[test]
    fn status_and_shape_failures() {
        let body = json!({"biz":[{"translateResult":"你好"}]});
        assert!(matches!(parse_response(500, &body), Err(EnrichError::Status(500))));
        let empty = json!({"biz":[]});
        assert!(matches!(parse_response(200, &empty), Err(EnrichError::Shape(_))));
        let wrong_type = json!({"biz":[{"translateResult": 3}]});
        assert!(matches!(parse_response(200, &wrong_type), Err(EnrichError::Shape(_))));
    }

    #[test]
    fn worker_reports_display_strings() {
        assert_eq!(
            outcome_of(Fixed::Translated("你好")),
            EnrichOutcome::Translated("你好".to_string())
        );
        assert_eq!(
            outcome_of(Fixed::Status(502)),
            EnrichOutcome::Failed(TRANSLATION_FAILED.to_string())
        );
        assert_eq!(
            outcome_of(Fixed::Unreachable),
            EnrichOutcome::Failed(NETWORK_FAILED.to_string())
        );
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let client = HttpTranslator::with_endpoint("http://127.0.0.1:9/unreachable");
        let err = client.translate("hello").unwrap_err();
        assert_eq!(err.display_text(), NETWORK_FAILED, "got: {err:?}");
    }
}
