use chrono::{DateTime, Utc};
use thiserror::Error;

/// TLS-specific error variants surfaced while validating Secret source objects.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The secret carries no certificate chain at all.
    #[error("secret {secret} has no certificate data")]
    EmptyCertificateChain { secret: String },

    /// The secret carries no private key.
    #[error("secret {secret} has no private key data")]
    MissingPrivateKey { secret: String },

    /// The certificate bytes could not be parsed as PEM or DER.
    #[error("secret {secret} certificate is not a valid PEM: {source}")]
    InvalidCertificatePem {
        secret: String,
        #[source]
        source: anyhow::Error,
    },

    /// The private key bytes could not be parsed.
    #[error("secret {secret} private key is not a supported format")]
    InvalidPrivateKey {
        secret: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The public key embedded in the certificate does not match the private key.
    #[error("secret {secret} certificate and private key do not match")]
    CertificateKeyMismatch { secret: String },

    /// The certificate is not yet valid.
    #[error("secret {secret} certificate is not valid before {not_before}")]
    CertificateNotYetValid { secret: String, not_before: DateTime<Utc> },

    /// The certificate is expired.
    #[error("secret {secret} certificate expired at {not_after}")]
    CertificateExpired { secret: String, not_after: DateTime<Utc> },

    /// Generic metadata extraction failure (malformed ASN.1).
    #[error("failed to extract certificate metadata for secret {secret}: {source}")]
    CertificateMetadata {
        secret: String,
        #[source]
        source: anyhow::Error,
    },
}
