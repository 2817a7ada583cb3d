use crate::domain::money::Currency;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{CheckoutRequest, CheckoutSession, GatewayVerification, PaymentGateway};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Every provider response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    id: Option<u64>,
    reference: String,
    status: String,
    amount: i64,
    currency: String,
}

/// REST client for a hosted-checkout payment provider.
///
/// Authenticates with the secret key as a bearer token. Rate limiting is
/// surfaced as [`PaymentError::RateLimited`] so callers can back off; this
/// client never retries on its own.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    secret_key: String,
}

impl HttpGateway {
    pub fn new(
        base_url: impl AsRef<str>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| PaymentError::ConfigError(format!("invalid gateway URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PaymentError::ConfigError(format!(
                "gateway URL cannot be a base: {base_url}"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            secret_key: secret_key.into(),
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so a
    /// reference can never add path components of its own.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PaymentError::ConfigError("gateway URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PaymentError::RateLimited {
                retry_after: parse_retry_after(&response),
            });
        }

        let body = response.text().await?;
        let envelope: Option<Envelope<T>> = serde_json::from_str(&body).ok();
        match envelope {
            Some(Envelope {
                status: true,
                data: Some(data),
                ..
            }) if status.is_success() => Ok(data),
            Some(envelope) => Err(PaymentError::GatewayError {
                status: status.as_u16(),
                message: if envelope.message.is_empty() {
                    "provider reported failure".to_string()
                } else {
                    envelope.message
                },
            }),
            None => {
                debug!(
                    status = status.as_u16(),
                    body = truncate(&body, 200),
                    "Unexpected gateway response body"
                );
                Err(PaymentError::GatewayError {
                    status: status.as_u16(),
                    message: "unexpected response from provider".to_string(),
                })
            }
        }
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn initialize_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let url = self.endpoint(&["transaction", "initialize"])?;
        debug!(reference = %request.reference, %url, "Initializing checkout");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification> {
        let url = self.endpoint(&["transaction", "verify", reference])?;
        debug!(reference, %url, "Verifying charge");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let data: VerifyData = Self::read_envelope(response).await?;

        let status = PaymentStatus::from_gateway(&data.status).ok_or_else(|| {
            PaymentError::GatewayError {
                status: 200,
                message: format!("unknown charge status {:?}", data.status),
            }
        })?;
        let currency: Currency = data.currency.parse()?;
        Ok(GatewayVerification {
            reference: data.reference,
            status,
            amount_minor: data.amount,
            currency,
            gateway_id: data.id,
        })
    }
}
