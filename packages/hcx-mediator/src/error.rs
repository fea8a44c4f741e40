use thiserror::Error;
use tokio::time::error::Elapsed;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("{kind} {id} could not be resolved")]
    EntityNotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Fhir(#[from] FhirError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Bundle was rejected by the FHIR validator")]
    Validation { issues: Vec<serde_json::Value> },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    FileOrEnvironment(#[from] config::ConfigError),

    #[error("Invalid value {value} for {name}")]
    InvalidParameter { name: String, value: String },

    #[error("Missing field {name} from configuration file or environment")]
    MissingParameter { name: String },

    #[error("Private key could not be fetched from {url}")]
    PrivateKeyUnavailable { url: String },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token response was malformed")]
    Malformed(#[source] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("Token endpoint could not be reached")]
    Transport(#[source] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Participant {code} is not registered with the gateway")]
    NotFound { code: String },

    #[error("Registry could not be reached")]
    Transport(#[source] reqwest::Error),

    #[error("Registry returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Payload could not be decrypted")]
    Decrypt,

    #[error("Payload could not be encrypted")]
    Encrypt,

    #[error("Key could not be parsed")]
    InvalidKey,

    #[error("Token is not a valid JWE compact serialization")]
    InvalidToken,
}

#[derive(Error, Debug)]
pub enum FhirError {
    #[error(transparent)]
    Deserialize(#[from] serde_json::Error),

    #[error("{resource_type} is missing field {field}")]
    MissingField {
        resource_type: &'static str,
        field: &'static str,
    },

    #[error("Bundle is missing a {resource_type} resource")]
    MissingResource { resource_type: &'static str },

    #[error("Unrecognised outcome code {value}")]
    UnknownOutcome { value: String },
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Gateway returned {status}: {body}")]
    Gateway { status: u16, body: String },

    #[error("Recipient participant code is required")]
    MissingRecipient,

    #[error("Action deadline exhausted")]
    Timeout(#[from] Elapsed),

    #[error("Gateway could not be reached")]
    Transport(#[source] reqwest::Error),
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.into())
    }
}

impl From<Elapsed> for Error {
    fn from(e: Elapsed) -> Self {
        Error::Protocol(e.into())
    }
}
