//! Gateway auth and participant registry.
//!
//! One bearer is shared process-wide in a single arc-swap slot: readers
//! load lock-free, an expired slot is replaced wholesale and the last
//! writer wins. Participant encryption certs get a small TTL cache so a
//! burst of sends to the same payor costs one registry round-trip.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{AuthError, Error, RegistryError};
use crate::log::REGISTRY;

/// Static client id of the registry's OAuth2 frontend.
pub const CLIENT_ID: &str = "registry-frontend";

const SCOPE: &str = "openid";

/// A bearer is considered expired this long before the server says so.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const CERT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone, Debug, Deserialize)]
pub struct Participant {
    pub participant_code: String,
    #[serde(default)]
    pub participant_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub primary_email: Option<String>,
    /// URL at which the participant publishes its PEM encryption cert
    #[serde(default)]
    pub encryption_cert: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    participants: Vec<Participant>,
}

#[derive(Debug)]
struct Bearer {
    token: String,
    expires_at: Instant,
}

pub struct RegistryClient {
    http: reqwest::Client,
    auth_base: String,
    protocol_base: String,
    username: String,
    password: String,
    bearer: ArcSwapOption<Bearer>,
    certs: Mutex<HashMap<String, (Instant, String)>>,
}

impl RegistryClient {
    pub fn new(http: reqwest::Client, gateway: &GatewayConfig) -> Self {
        RegistryClient {
            http,
            auth_base: gateway.auth_base.clone(),
            protocol_base: gateway.protocol_base.clone(),
            username: gateway.username.clone(),
            password: gateway.password.clone(),
            bearer: ArcSwapOption::empty(),
            certs: Mutex::new(HashMap::new()),
        }
    }

    ///
    /// A bearer for the gateway, from cache while it is still live.
    ///
    /// A failed fetch is retried once on transport errors; auth rejections
    /// are not retried.
    ///
    pub async fn token(&self) -> Result<String, Error> {
        if let Some(bearer) = self.bearer.load_full() {
            if bearer.expires_at > Instant::now() {
                return Ok(bearer.token.clone());
            }
        }

        let fresh = match self.fetch_token().await {
            Ok(bearer) => bearer,
            Err(Error::Auth(AuthError::Transport(err))) => {
                warn!(
                    target: REGISTRY,
                    msg = "Token endpoint unreachable, retrying once",
                    error = err.to_string()
                );
                self.fetch_token().await?
            }
            Err(err) => return Err(err),
        };

        let token = fresh.token.clone();
        self.bearer.store(Some(Arc::new(fresh)));
        Ok(token)
    }

    /// Drop the cached bearer so the next call re-authenticates.
    pub fn invalidate_token(&self) {
        self.bearer.store(None);
    }

    async fn fetch_token(&self) -> Result<Bearer, Error> {
        let params = [
            ("client_id", CLIENT_ID),
            ("username", &self.username),
            ("password", &self.password),
            ("grant_type", "password"),
            ("scope", SCOPE),
        ];

        let response = self
            .http
            .post(&self.auth_base)
            .form(&params)
            .send()
            .await
            .map_err(|err| Error::Auth(AuthError::Transport(err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| Error::Auth(AuthError::Malformed(err)))?;

        debug!(target: REGISTRY, msg = "Bearer refreshed", expires_in = token.expires_in);

        let ttl = Duration::from_secs(token.expires_in.saturating_sub(EXPIRY_MARGIN.as_secs()));
        Ok(Bearer {
            token: token.access_token,
            expires_at: Instant::now() + ttl,
        })
    }

    ///
    /// Search the participant registry: `{filters: {<field>: {eq: <value>}}}`.
    ///
    pub async fn search(&self, field: &str, value: &str) -> Result<Vec<Participant>, Error> {
        let bearer = self.token().await?;
        let url = format!(
            "{}/participant/search",
            self.protocol_base.trim_end_matches('/')
        );
        let body = json!({ "filters": { field: { "eq": value } } });

        let response = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Registry(RegistryError::Transport(err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Upstream {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| Error::Registry(RegistryError::Transport(err)))?;

        Ok(parsed.participants)
    }

    /// Look up a single participant by code.
    pub async fn participant(&self, code: &str) -> Result<Participant, Error> {
        let mut participants = self.search("participant_code", code).await?;
        if participants.is_empty() {
            return Err(RegistryError::NotFound {
                code: code.to_string(),
            }
            .into());
        }
        Ok(participants.remove(0))
    }

    ///
    /// The participant's PEM encryption cert, via its registry record.
    /// Cached for up to an hour per participant; a cache miss is never an
    /// error, only a fetch.
    ///
    pub async fn fetch_public_cert(&self, participant_code: &str) -> Result<String, Error> {
        if let Some((fetched_at, pem)) = self.certs.lock().unwrap().get(participant_code) {
            if fetched_at.elapsed() < CERT_TTL {
                return Ok(pem.clone());
            }
        }

        let participant = self.participant(participant_code).await?;

        // A participant without a published cert cannot receive from us
        let cert_url = participant
            .encryption_cert
            .ok_or_else(|| RegistryError::NotFound {
                code: participant_code.to_string(),
            })?;

        let response = self
            .http
            .get(&cert_url)
            .send()
            .await
            .map_err(|err| Error::Registry(RegistryError::Transport(err)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Upstream {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let pem = response
            .text()
            .await
            .map_err(|err| Error::Registry(RegistryError::Transport(err)))?;

        self.certs
            .lock()
            .unwrap()
            .insert(participant_code.to_string(), (Instant::now(), pem.clone()));

        Ok(pem)
    }
}
