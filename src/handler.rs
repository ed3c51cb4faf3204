//! `Saml2TokenHandler`: the single entry point that wires
//! every stage — read, signature, conditions, subject, translation, build —
//! into the read/validate/create/write operations a caller actually calls.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::canonical::{ConservativeCanonicalizer, TransformFactory};
use crate::claims::ClaimsIdentity;
use crate::config::{HandlerConfig, TokenDescriptor, ValidationParameters};
use crate::conditions::validate_conditions;
use crate::error::{SamlError, SamlResult};
use crate::issuer::validate_issuer;
use crate::model::Assertion;
use crate::reader;
use crate::serializer::{DefaultSaml2Serializer, Saml2Serializer};
use crate::signature::verify_signature;
use crate::subject::validate_subject;
use crate::translator::translate;
use crate::builder;

/// The result of a successful `validate_token` call: the claims extracted
/// from the assertion plus the key that signed it, if any.
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    pub claims: ClaimsIdentity,
    pub signing_key_id: Option<String>,
    pub audience: String,
}

/// Orchestrates assertion reading, validation, and construction. Holds no
/// per-call state; a single instance is reused across requests.
pub struct Saml2TokenHandler {
    config: HandlerConfig,
    serializer: Arc<dyn Saml2Serializer>,
    canonicalizer: Arc<dyn TransformFactory>,
}

impl Default for Saml2TokenHandler {
    fn default() -> Self {
        Self {
            config: HandlerConfig::default(),
            serializer: Arc::new(DefaultSaml2Serializer),
            canonicalizer: Arc::new(ConservativeCanonicalizer),
        }
    }
}

impl Saml2TokenHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Saml2Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_canonicalizer(mut self, canonicalizer: Arc<dyn TransformFactory>) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    pub fn max_token_size(&self) -> usize {
        self.config.max_token_size
    }

    /// Mirrors `Saml2SecurityTokenHandler.MaximumTokenSizeInBytes`'s setter:
    /// rejects non-positive sizes with a configuration error rather than a
    /// validation one.
    pub fn set_max_token_size(&mut self, size: usize) -> SamlResult<()> {
        self.config = std::mem::take(&mut self.config).with_max_token_size(size)?;
        Ok(())
    }

    /// Cheap pre-check: is `xml` within size limits and rooted at
    /// `<Assertion>`?
    pub fn can_read_token(&self, xml: &[u8]) -> bool {
        reader::can_read(xml, &self.config)
    }

    /// Parses `xml` into an [`Assertion`] without validating it.
    #[instrument(skip(self, xml))]
    pub fn read_token(&self, xml: &[u8]) -> SamlResult<Assertion> {
        reader::read(xml, &self.config, self.serializer.as_ref())
    }

    /// Runs the full validation pipeline against an assertion already
    /// parsed from `raw_xml` by [`read_token`](Self::read_token), returning
    /// the claims it carries.
    #[instrument(skip(self, assertion, raw_xml, params))]
    pub fn validate_token(&self, mut assertion: Assertion, raw_xml: &[u8], params: &ValidationParameters) -> SamlResult<ValidatedToken> {
        verify_signature(&mut assertion, raw_xml, params, self.canonicalizer.as_ref())?;

        let audience = validate_conditions(assertion.conditions.as_ref(), &assertion, params)?;
        validate_subject(assertion.subject.as_ref(), &assertion, params)?;
        let issuer = validate_issuer(&assertion.issuer, &assertion, params)?;

        let claims = translate(&assertion, &issuer, params)?;
        info!(issuer = %issuer, signing_key_id = ?assertion.signing_key_id, "assertion validated");

        Ok(ValidatedToken { claims, signing_key_id: assertion.signing_key_id.clone(), audience })
    }

    /// Convenience wrapper: reads then validates `xml` in one call.
    pub fn read_and_validate(&self, xml: &[u8], params: &ValidationParameters) -> SamlResult<ValidatedToken> {
        let assertion = self.read_token(xml)?;
        self.validate_token(assertion, xml, params)
    }

    /// Builds an unsigned draft assertion from `descriptor`.
    pub fn create_token(&self, descriptor: &TokenDescriptor) -> SamlResult<Assertion> {
        builder::build_assertion(descriptor)
    }

    /// Builds, signs, and serializes `descriptor` into SAML2 XML.
    /// `descriptor.signing_credentials` must be set — see
    /// [`builder::build_and_sign`].
    #[instrument(skip(self, descriptor))]
    pub fn write_token(&self, descriptor: &TokenDescriptor) -> SamlResult<Vec<u8>> {
        if descriptor.signing_credentials.is_none() {
            return Err(SamlError::InvalidConfiguration(
                "write_token requires TokenDescriptor.signing_credentials".to_string(),
            ));
        }
        builder::build_and_sign(descriptor, self.serializer.as_ref(), self.canonicalizer.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{claim_types, Claim, ClaimsIdentity};
    use crate::key::{HmacSecurityKey, SecurityKey, SigningCredentials};
    use chrono::{Duration, Utc};

    fn descriptor(key: Arc<dyn SigningCredentials>) -> TokenDescriptor {
        let identity = ClaimsIdentity::new()
            .with_claim(Claim::new(claim_types::NAME_IDENTIFIER, "alice", "https://idp.example/"))
            .with_claim(Claim::new("urn:role", "admin", "https://idp.example/"));
        TokenDescriptor::new("https://idp.example/", identity, Utc::now(), Utc::now() + Duration::hours(1))
            .with_audience("urn:rp:test")
            .with_signing_credentials(key)
    }

    #[test]
    fn happy_path_round_trip() {
        let key = Arc::new(HmacSecurityKey::new(Some("k1".to_string()), b"secret".to_vec()));
        let handler = Saml2TokenHandler::new();
        let xml = handler.write_token(&descriptor(key.clone() as Arc<dyn SigningCredentials>)).unwrap();

        let verify_key: Arc<dyn SecurityKey> = key;
        let params = ValidationParameters::builder()
            .issuer_signing_keys(vec![verify_key])
            .valid_audiences(vec!["urn:rp:test".to_string()])
            .build();

        let validated = handler.read_and_validate(&xml, &params).unwrap();
        assert_eq!(validated.claims.find_first(claim_types::NAME_IDENTIFIER).unwrap().value, "alice");
        assert_eq!(validated.signing_key_id.as_deref(), Some("k1"));
        assert_eq!(validated.audience, "urn:rp:test");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let signing_key = Arc::new(HmacSecurityKey::new(Some("k1".to_string()), b"secret".to_vec()));
        let handler = Saml2TokenHandler::new();
        let xml = handler.write_token(&descriptor(signing_key as Arc<dyn SigningCredentials>)).unwrap();

        let wrong_key: Arc<dyn SecurityKey> = Arc::new(HmacSecurityKey::new(Some("k1".to_string()), b"wrong-secret".to_vec()));
        let params = ValidationParameters::builder().issuer_signing_keys(vec![wrong_key]).build();

        let err = handler.read_and_validate(&xml, &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidSignature { .. }));
    }

    #[test]
    fn rejects_oversize_token_before_parsing() {
        let mut handler = Saml2TokenHandler::new();
        handler.set_max_token_size(8).unwrap();
        assert!(!handler.can_read_token(b"<saml:Assertion></saml:Assertion>"));
        let err = handler.read_token(b"<saml:Assertion></saml:Assertion>").unwrap_err();
        assert!(matches!(err, SamlError::OversizeInput { .. }));
    }

    #[test]
    fn rejects_zero_max_token_size() {
        let mut handler = Saml2TokenHandler::new();
        let err = handler.set_max_token_size(0).unwrap_err();
        assert!(matches!(err, SamlError::InvalidConfiguration(_)));
    }
}
