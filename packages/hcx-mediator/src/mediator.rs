//! The assembled service: configuration, collaborator seams, registry
//! client, dispatcher and the local decryption key, shared by every
//! handler.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::catalogs::PackageIndex;
use crate::config::MediatorConfig;
use crate::crypto;
use crate::error::{ConfigError, Error};
use crate::log::CONFIG;
use crate::protocol::Dispatcher;
use crate::registry::RegistryClient;
use crate::store::{BlobStore, EntityStore, NotificationSink};

/// Per-call HTTP timeout for every upstream round-trip.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Mediator {
    pub config: MediatorConfig,
    pub store: Arc<dyn EntityStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub blobs: Arc<dyn BlobStore>,
    pub registry: Arc<RegistryClient>,
    pub dispatcher: Dispatcher,
    pub packages: Arc<PackageIndex>,
    /// Loaded once at startup; handlers only read
    private_key_pem: Arc<str>,
    pub(crate) http: reqwest::Client,
}

impl Mediator {
    pub async fn init(
        config: MediatorConfig,
        store: Arc<dyn EntityStore>,
        notifications: Arc<dyn NotificationSink>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Mediator, Error> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("http client builds");

        let registry = Arc::new(RegistryClient::new(http.clone(), &config.gateway));
        let dispatcher = Dispatcher::new(
            http.clone(),
            registry.clone(),
            &config.gateway.protocol_base,
            &config.gateway.participant_code,
        );

        let private_key_pem = fetch_private_key(&http, &config.gateway.encryption_private_key_url)
            .await?
            .into();

        let packages = Arc::new(PackageIndex::load()?);

        info!(
            target: CONFIG,
            msg = "Mediator initialised",
            participant_code = config.gateway.participant_code,
            gateway = config.gateway.protocol_base,
            packages = packages.len(),
        );

        Ok(Mediator {
            config,
            store,
            notifications,
            blobs,
            registry,
            dispatcher,
            packages,
            private_key_pem,
            http,
        })
    }

    pub(crate) fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }
}

/// Fetch the local private key PEM and fail fast if it does not parse.
async fn fetch_private_key(http: &reqwest::Client, url: &str) -> Result<String, Error> {
    let pem = http
        .get(url)
        .send()
        .await
        .map_err(|_| ConfigError::PrivateKeyUnavailable {
            url: url.to_string(),
        })?
        .error_for_status()
        .map_err(|_| ConfigError::PrivateKeyUnavailable {
            url: url.to_string(),
        })?
        .text()
        .await
        .map_err(|_| ConfigError::PrivateKeyUnavailable {
            url: url.to_string(),
        })?;

    crypto::check_private_key(&pem)?;
    Ok(pem)
}
