//! Error taxonomy for the SAML token handler.
//!
//! One variant per distinct failure kind. Errors crossing an
//! external-collaborator boundary (an override callback, a serializer) are
//! not wrapped further; errors raised inside the core carry a stable code
//! via [`SamlError::code`].

use std::fmt;

/// A single candidate key tried during signature verification, kept for
/// diagnosis when every candidate fails.
#[derive(Debug, Clone)]
pub struct KeyAttempt {
    pub key_id: Option<String>,
    pub reason: String,
}

impl fmt::Display for KeyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key_id {
            Some(kid) => write!(f, "key '{kid}': {}", self.reason),
            None => write!(f, "key <no kid>: {}", self.reason),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SamlError {
    #[error("token exceeds max_token_size ({actual} > {limit} bytes)")]
    OversizeInput { actual: usize, limit: usize },

    #[error("malformed SAML2 assertion: {0}")]
    Malformed(String),

    #[error("assertion has no signature but signed tokens are required")]
    MissingSignature,

    #[error(
        "signature verification failed against {} candidate key(s): {}",
        .tried.len(),
        tried.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    InvalidSignature { tried: Vec<KeyAttempt> },

    #[error("signature carries kid '{kid}' that matches no candidate key; metadata is likely stale")]
    SignatureKeyNotFound { kid: String },

    #[error("assertion has no Subject")]
    MissingSubject,

    #[error("token descriptor has no issuer")]
    MissingIssuer,

    #[error("invalid audience: {0}")]
    InvalidAudience(String),

    #[error("invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("invalid lifetime: {0}")]
    InvalidLifetime(String),

    #[error("token has already been used")]
    TokenReplayed,

    #[error("{condition} requires a subclass override with a replay/proxy policy")]
    RequiresOverride { condition: &'static str },

    #[error("authentication context uses an unsupported DeclarationReference")]
    UnsupportedAuthnContext,

    #[error("more than one Actor attribute at a single delegation level")]
    NestedActorConflict,

    #[error("'{value}' is not a valid absolute URI for {field}")]
    InvalidNameFormat { field: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Carries a duplicate-claim violation that isn't covered by a more
    /// specific variant above (e.g. two `NameIdentifier` claims on build).
    #[error("{0}")]
    InvalidClaims(String),
}

impl SamlError {
    /// A stable identifying code, independent of the `Display` message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OversizeInput { .. } => "OVERSIZE_INPUT",
            Self::Malformed(_) => "MALFORMED",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::InvalidSignature { .. } => "INVALID_SIGNATURE",
            Self::SignatureKeyNotFound { .. } => "SIGNATURE_KEY_NOT_FOUND",
            Self::MissingSubject => "MISSING_SUBJECT",
            Self::MissingIssuer => "MISSING_ISSUER",
            Self::InvalidAudience(_) => "INVALID_AUDIENCE",
            Self::InvalidIssuer(_) => "INVALID_ISSUER",
            Self::InvalidLifetime(_) => "INVALID_LIFETIME",
            Self::TokenReplayed => "TOKEN_REPLAYED",
            Self::RequiresOverride { .. } => "REQUIRES_OVERRIDE",
            Self::UnsupportedAuthnContext => "UNSUPPORTED_AUTHN_CONTEXT",
            Self::NestedActorConflict => "NESTED_ACTOR_CONFLICT",
            Self::InvalidNameFormat { .. } => "INVALID_NAME_FORMAT",
            Self::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Self::InvalidClaims(_) => "INVALID_CLAIMS",
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<std::str::Utf8Error> for SamlError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

pub type SamlResult<T> = Result<T, SamlError>;
