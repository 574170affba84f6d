use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

use xerror::gateway::GatewayError;

use crate::payment_request::{self, Payment};
use crate::xml;

const WS_CHECKOUT_URL: &str = "https://ws.pagseguro.uol.com.br/v2/transactions";
const WS_CHECKOUT_URL_SANDBOX: &str = "https://ws.sandbox.pagseguro.uol.com.br/v2/transactions";

const WS_SESSION_URL: &str = "https://ws.pagseguro.uol.com.br/v2/sessions";
const WS_SESSION_URL_SANDBOX: &str = "https://ws.sandbox.pagseguro.uol.com.br/v2/sessions";

const WS_TRANSACTION_URL: &str = "https://ws.pagseguro.uol.com.br/v3/transactions";
const WS_TRANSACTION_URL_SANDBOX: &str = "https://ws.sandbox.pagseguro.uol.com.br/v3/transactions";

const WS_NOTIFICATION_URL: &str = "https://ws.pagseguro.uol.com.br/v3/transactions/notifications";
const WS_NOTIFICATION_URL_SANDBOX: &str = "https://ws.sandbox.pagseguro.uol.com.br/v3/transactions/notifications";

/// Immutable gateway account identity, copied out of the shop's payment
/// config row and injected into every client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub email: String,
    pub token: String,
    pub sandbox: bool,
}

impl GatewayConfig {
    pub fn new(email: &str, token: &str, sandbox: bool) -> Self {
        Self {
            email: email.to_string(),
            token: token.to_string(),
            sandbox,
        }
    }
}

/// Outcome of a synchronous pay attempt. A non-500 gateway response is
/// always one of these two shapes; the caller matches instead of
/// handling an error path.
#[derive(Debug, Clone)]
pub enum PaymentResult {
    Success(PaymentSuccess),
    Failure(PaymentFailure),
}

#[derive(Debug, Clone)]
pub struct PaymentSuccess {
    pub code: String,
    pub payment_link: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct PaymentFailure {
    pub errors: Vec<PaymentResultError>,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResultError {
    pub code: String,
    pub message: String,
}

impl PaymentResultError {
    fn from_value(value: &Value) -> Self {
        Self {
            code: value.get("code").and_then(Value::as_str).unwrap_or_default().to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl PaymentResult {
    /// Discriminates on the presence of a top-level `errors` key, the way
    /// the gateway reports request-level failures. `errors.error` may be
    /// a single node or a list.
    pub fn from_document(data: Value) -> Result<Self, GatewayError> {
        if let Some(errors) = data.get("errors") {
            let entries = match errors.get("error") {
                Some(Value::Array(list)) => list.iter().map(PaymentResultError::from_value).collect(),
                Some(value) => vec![PaymentResultError::from_value(value)],
                None => Vec::new(),
            };
            return Ok(PaymentResult::Failure(PaymentFailure { errors: entries, data }));
        }

        let code = xml::text_at(&data, &["transaction", "code"])
            .ok_or_else(|| GatewayError::Parse("transaction document without a code".to_string()))?
            .to_string();
        let payment_link = xml::text_at(&data, &["transaction", "paymentLink"]).map(str::to_string);
        Ok(PaymentResult::Success(PaymentSuccess {
            code,
            payment_link,
            data,
        }))
    }
}

pub struct PagSeguroClient {
    config: GatewayConfig,
    http_client: HttpClient,
}

impl PagSeguroClient {
    pub fn new(config: GatewayConfig, timeout: Duration) -> Self {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create http client.");
        Self { config, http_client }
    }

    fn credentials(&self) -> [(&'static str, &str); 2] {
        [("email", self.config.email.as_str()), ("token", self.config.token.as_str())]
    }

    fn session_url(&self) -> &'static str {
        if self.config.sandbox {
            WS_SESSION_URL_SANDBOX
        } else {
            WS_SESSION_URL
        }
    }

    fn checkout_url(&self) -> &'static str {
        if self.config.sandbox {
            WS_CHECKOUT_URL_SANDBOX
        } else {
            WS_CHECKOUT_URL
        }
    }

    fn transaction_url(&self, transaction_code: &str) -> String {
        let base = if self.config.sandbox {
            WS_TRANSACTION_URL_SANDBOX
        } else {
            WS_TRANSACTION_URL
        };
        format!("{}/{}", base, transaction_code)
    }

    fn notification_url(&self, notification_code: &str) -> String {
        let base = if self.config.sandbox {
            WS_NOTIFICATION_URL_SANDBOX
        } else {
            WS_NOTIFICATION_URL
        };
        format!("{}/{}", base, notification_code)
    }

    /// Opens a gateway session for the checkout UI.
    pub async fn get_session_id(&self) -> Result<String, GatewayError> {
        let response = self
            .http_client
            .post(self.session_url())
            .query(&self.credentials())
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if status == reqwest::StatusCode::OK {
            let doc = xml::parse_document(&body)?;
            xml::text_at(&doc, &["session", "id"])
                .map(str::to_string)
                .ok_or_else(|| GatewayError::Parse("session document without an id".to_string()))
        } else {
            Err(GatewayError::Http {
                status_code: status.as_u16(),
                body,
            })
        }
    }

    /// Fetches the authoritative document behind a webhook notification
    /// code. The code comes from the webhook caller and is not trusted
    /// as-is; this fetch is what reconciliation operates on.
    pub async fn get_notification_info(&self, notification_code: &str) -> Result<Value, GatewayError> {
        self.get_document(self.notification_url(notification_code)).await
    }

    pub async fn get_transaction_info(&self, transaction_code: &str) -> Result<Value, GatewayError> {
        self.get_document(self.transaction_url(transaction_code)).await
    }

    async fn get_document(&self, url: String) -> Result<Value, GatewayError> {
        let response = self
            .http_client
            .get(&url)
            .query(&self.credentials())
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if status == reqwest::StatusCode::OK {
            xml::parse_document(&body)
        } else {
            Err(GatewayError::Http {
                status_code: status.as_u16(),
                body,
            })
        }
    }

    /// Submits a payment. HTTP 500 is a hard failure carrying the status
    /// code and body verbatim; every other status parses into a
    /// [`PaymentResult`], success or structured failure.
    pub async fn pay(&self, payment: &Payment) -> Result<PaymentResult, GatewayError> {
        let body = payment_request::to_xml(payment)?;

        let response = self
            .http_client
            .post(self.checkout_url())
            .query(&self.credentials())
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(body)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR {
            return Err(GatewayError::Http {
                status_code: status.as_u16(),
                body: response_body,
            });
        }

        let doc = xml::parse_document(&response_body)?;
        PaymentResult::from_document(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERROR_XML: &str = r#"<errors>
    <error>
        <code>53031</code>
        <message>shipping address city is required.</message>
    </error>
</errors>"#;

    const MULTI_ERROR_XML: &str = r#"<errors>
    <error>
        <code>11013</code>
        <message>senderAreaCode invalid value.</message>
    </error>
    <error>
        <code>11014</code>
        <message>senderPhone invalid value.</message>
    </error>
</errors>"#;

    const TRANSACTION_XML: &str = r#"<transaction>
    <code>9E884542-81B3-4419-9A75-BCC6FB495EF1</code>
    <status>3</status>
    <paymentLink>https://pagseguro.uol.com.br/checkout/imprimeBoleto.jhtml?code=314601B208B24A5CA53260000F7BB0D</paymentLink>
</transaction>"#;

    #[test]
    fn payment_result_success_carries_code_link_and_raw_data() {
        let doc = xml::parse_document(TRANSACTION_XML).unwrap();
        match PaymentResult::from_document(doc.clone()).unwrap() {
            PaymentResult::Success(success) => {
                assert_eq!(success.code, "9E884542-81B3-4419-9A75-BCC6FB495EF1");
                assert_eq!(
                    success.payment_link.as_deref(),
                    Some("https://pagseguro.uol.com.br/checkout/imprimeBoleto.jhtml?code=314601B208B24A5CA53260000F7BB0D")
                );
                assert_eq!(success.data, doc);
            }
            PaymentResult::Failure(_) => panic!("expected success"),
        }
    }

    #[test]
    fn payment_result_failure_collects_single_error() {
        let doc = xml::parse_document(ERROR_XML).unwrap();
        match PaymentResult::from_document(doc).unwrap() {
            PaymentResult::Failure(failure) => {
                assert_eq!(failure.errors.len(), 1);
                assert_eq!(failure.errors[0].code, "53031");
                assert_eq!(failure.errors[0].message, "shipping address city is required.");
            }
            PaymentResult::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn payment_result_failure_collects_error_list() {
        let doc = xml::parse_document(MULTI_ERROR_XML).unwrap();
        match PaymentResult::from_document(doc).unwrap() {
            PaymentResult::Failure(failure) => {
                assert_eq!(failure.errors.len(), 2);
                assert_eq!(failure.errors[1].code, "11014");
            }
            PaymentResult::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn transaction_document_without_code_is_a_parse_failure() {
        let doc = xml::parse_document("<transaction><status>3</status></transaction>").unwrap();
        assert!(PaymentResult::from_document(doc).is_err());
    }

    #[test]
    fn sandbox_flag_selects_sandbox_endpoints() {
        let sandbox = PagSeguroClient::new(GatewayConfig::new("a@b.c", "token", true), Duration::from_secs(5));
        assert!(sandbox.session_url().contains("sandbox"));
        assert!(sandbox.checkout_url().contains("sandbox"));
        assert!(sandbox.transaction_url("X").starts_with(WS_TRANSACTION_URL_SANDBOX));
        assert!(sandbox.notification_url("X").starts_with(WS_NOTIFICATION_URL_SANDBOX));

        let production = PagSeguroClient::new(GatewayConfig::new("a@b.c", "token", false), Duration::from_secs(5));
        assert!(!production.session_url().contains("sandbox"));
        assert_eq!(production.transaction_url("X"), format!("{}/X", WS_TRANSACTION_URL));
    }
}
