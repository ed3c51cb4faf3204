//! Validation parameters, handler configuration, and the outbound token
//! descriptor.
//!
//! `ValidationParameters` is the single bag of policy + override hooks that
//! every validation stage (`signature.rs`, `lifetime.rs`, `audience.rs`,
//! `issuer.rs`, `conditions.rs`, `subject.rs`) reads from. Each stage has a
//! sensible default behavior; a caller overrides one stage at a time by
//! setting the matching callback, giving the same per-stage override seams
//! as virtual-method inheritance without needing trait-object inheritance.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::claims::ClaimsIdentity;
use crate::error::SamlResult;
use crate::key::{SecurityKey, SigningCredentials};
use crate::model::Assertion;

/// Resolves candidate verification keys for an assertion. Given the `kid`
/// advertised by the assertion's signature (if any), returns the keys the
/// signature verifier should try, in order.
pub type IssuerSigningKeyResolver =
    Arc<dyn Fn(&Assertion, Option<&str>) -> Vec<Arc<dyn SecurityKey>> + Send + Sync>;

/// Replaces the entire signature verification stage. When set, `signature.rs`
/// calls this instead of its own trial-verification loop.
pub type SignatureValidator = Arc<dyn Fn(&Assertion, &ValidationParameters) -> SamlResult<()> + Send + Sync>;

/// Validates the `<AudienceRestriction>` list against the configured valid
/// audiences; returning `Ok(())` accepts the assertion.
pub type AudienceValidator =
    Arc<dyn Fn(&[String], &Assertion, &ValidationParameters) -> SamlResult<String> + Send + Sync>;

/// Validates the assertion's issuer; on success, returns the issuer string
/// to record on the produced `ClaimsIdentity` (the resolved/canonical form,
/// mirroring `Saml2SecurityTokenHandler`'s `ValidateIssuer` delegate, which
/// can remap the issuer, e.g. for multi-tenant aliasing).
pub type IssuerValidator = Arc<dyn Fn(&str, &Assertion, &ValidationParameters) -> SamlResult<String> + Send + Sync>;

/// Validates `NotBefore`/`NotOnOrAfter` against the current time plus skew.
pub type LifetimeValidator =
    Arc<dyn Fn(Option<DateTime<Utc>>, Option<DateTime<Utc>>, &Assertion, &ValidationParameters) -> SamlResult<()> + Send + Sync>;

/// Called with the assertion's id and issue instant; returns an error if the
/// token has been seen before. The default is a no-op.
pub type TokenReplayValidator = Arc<dyn Fn(&str, DateTime<Utc>) -> SamlResult<()> + Send + Sync>;

/// Called with a `<ProxyRestriction>`'s `Count` and `Audience` list; returns
/// an error if the proxying chain this assertion has passed through violates
/// host policy. The default is a no-op, since enforcing `Count` requires a
/// host-tracked proxy depth this core doesn't own.
pub type ProxyRestrictionValidator = Arc<dyn Fn(Option<u32>, &[String]) -> SamlResult<()> + Send + Sync>;

/// Builds the final `ClaimsIdentity` from a validated assertion. Overriding
/// this lets a host change how statements/attributes map onto claims
/// without forking the whole handler.
pub type ClaimsIdentityFactory = Arc<dyn Fn(&Assertion, &ValidationParameters) -> ClaimsIdentity + Send + Sync>;

/// Policy and override hooks consulted by every validation stage.
#[derive(Clone)]
pub struct ValidationParameters {
    pub require_signed_tokens: bool,
    pub issuer_signing_key: Option<Arc<dyn SecurityKey>>,
    pub issuer_signing_keys: Vec<Arc<dyn SecurityKey>>,
    pub issuer_signing_key_resolver: Option<IssuerSigningKeyResolver>,
    pub signature_validator: Option<SignatureValidator>,

    pub validate_audience: bool,
    pub valid_audiences: Vec<String>,
    pub audience_validator: Option<AudienceValidator>,

    pub validate_issuer: bool,
    pub valid_issuers: Vec<String>,
    pub issuer_validator: Option<IssuerValidator>,

    pub validate_lifetime: bool,
    pub clock_skew: Duration,
    pub lifetime_validator: Option<LifetimeValidator>,

    pub validate_token_replay: bool,
    pub token_replay_validator: Option<TokenReplayValidator>,

    pub validate_proxy_restriction: bool,
    pub proxy_restriction_validator: Option<ProxyRestrictionValidator>,

    pub require_audience_restriction: bool,
    pub require_bearer_confirmation: bool,

    pub create_claims_identity: Option<ClaimsIdentityFactory>,

    pub save_sign_in_token: bool,
}

impl Default for ValidationParameters {
    fn default() -> Self {
        Self {
            require_signed_tokens: true,
            issuer_signing_key: None,
            issuer_signing_keys: Vec::new(),
            issuer_signing_key_resolver: None,
            signature_validator: None,

            validate_audience: true,
            valid_audiences: Vec::new(),
            audience_validator: None,

            validate_issuer: true,
            valid_issuers: Vec::new(),
            issuer_validator: None,

            validate_lifetime: true,
            clock_skew: Duration::minutes(5),
            lifetime_validator: None,

            validate_token_replay: false,
            token_replay_validator: None,

            validate_proxy_restriction: false,
            proxy_restriction_validator: None,

            require_audience_restriction: false,
            require_bearer_confirmation: false,

            create_claims_identity: None,
            save_sign_in_token: false,
        }
    }
}

impl ValidationParameters {
    pub fn builder() -> ValidationParametersBuilder {
        ValidationParametersBuilder::default()
    }

    /// All keys a resolver/trial loop may consider: the singular
    /// `issuer_signing_key` plus the `issuer_signing_keys` list, in that
    /// order.
    pub fn candidate_keys(&self) -> Vec<Arc<dyn SecurityKey>> {
        let mut keys = Vec::with_capacity(self.issuer_signing_keys.len() + 1);
        if let Some(key) = &self.issuer_signing_key {
            keys.push(key.clone());
        }
        keys.extend(self.issuer_signing_keys.iter().cloned());
        keys
    }
}

/// Fluent builder for the override-heavy shape of `ValidationParameters`.
#[derive(Clone, Default)]
pub struct ValidationParametersBuilder {
    params: ValidationParameters,
}

impl ValidationParametersBuilder {
    pub fn require_signed_tokens(mut self, value: bool) -> Self {
        self.params.require_signed_tokens = value;
        self
    }

    pub fn issuer_signing_key(mut self, key: Arc<dyn SecurityKey>) -> Self {
        self.params.issuer_signing_key = Some(key);
        self
    }

    pub fn issuer_signing_keys(mut self, keys: Vec<Arc<dyn SecurityKey>>) -> Self {
        self.params.issuer_signing_keys = keys;
        self
    }

    pub fn issuer_signing_key_resolver(mut self, resolver: IssuerSigningKeyResolver) -> Self {
        self.params.issuer_signing_key_resolver = Some(resolver);
        self
    }

    pub fn signature_validator(mut self, validator: SignatureValidator) -> Self {
        self.params.signature_validator = Some(validator);
        self
    }

    pub fn valid_audiences(mut self, audiences: Vec<String>) -> Self {
        self.params.valid_audiences = audiences;
        self
    }

    pub fn validate_audience(mut self, value: bool) -> Self {
        self.params.validate_audience = value;
        self
    }

    pub fn audience_validator(mut self, validator: AudienceValidator) -> Self {
        self.params.audience_validator = Some(validator);
        self
    }

    pub fn valid_issuers(mut self, issuers: Vec<String>) -> Self {
        self.params.valid_issuers = issuers;
        self
    }

    pub fn validate_issuer(mut self, value: bool) -> Self {
        self.params.validate_issuer = value;
        self
    }

    pub fn issuer_validator(mut self, validator: IssuerValidator) -> Self {
        self.params.issuer_validator = Some(validator);
        self
    }

    pub fn validate_lifetime(mut self, value: bool) -> Self {
        self.params.validate_lifetime = value;
        self
    }

    pub fn clock_skew(mut self, skew: Duration) -> Self {
        self.params.clock_skew = skew;
        self
    }

    pub fn lifetime_validator(mut self, validator: LifetimeValidator) -> Self {
        self.params.lifetime_validator = Some(validator);
        self
    }

    pub fn validate_token_replay(mut self, value: bool) -> Self {
        self.params.validate_token_replay = value;
        self
    }

    pub fn token_replay_validator(mut self, validator: TokenReplayValidator) -> Self {
        self.params.token_replay_validator = Some(validator);
        self
    }

    pub fn validate_proxy_restriction(mut self, value: bool) -> Self {
        self.params.validate_proxy_restriction = value;
        self
    }

    pub fn proxy_restriction_validator(mut self, validator: ProxyRestrictionValidator) -> Self {
        self.params.proxy_restriction_validator = Some(validator);
        self
    }

    pub fn require_audience_restriction(mut self, value: bool) -> Self {
        self.params.require_audience_restriction = value;
        self
    }

    pub fn require_bearer_confirmation(mut self, value: bool) -> Self {
        self.params.require_bearer_confirmation = value;
        self
    }

    pub fn create_claims_identity(mut self, factory: ClaimsIdentityFactory) -> Self {
        self.params.create_claims_identity = Some(factory);
        self
    }

    pub fn save_sign_in_token(mut self, value: bool) -> Self {
        self.params.save_sign_in_token = value;
        self
    }

    pub fn build(self) -> ValidationParameters {
        self.params
    }
}

/// Handler-wide settings that apply before any per-assertion policy is
/// consulted.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub max_token_size: usize,
    pub clock_skew: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_token_size: 1024 * 1024,
            clock_skew: Duration::minutes(5),
        }
    }
}

impl HandlerConfig {
    /// Mirrors `Saml2TokenHandler::set_max_token_size`: zero
    /// or negative sizes are a configuration error, not a validation one.
    pub fn with_max_token_size(mut self, size: usize) -> SamlResult<Self> {
        if size == 0 {
            return Err(crate::error::SamlError::InvalidConfiguration(
                "max_token_size must be greater than zero".to_string(),
            ));
        }
        self.max_token_size = size;
        Ok(self)
    }
}

/// Input to the outbound assertion builder: everything needed
/// to produce a signed assertion from a `ClaimsIdentity`.
#[derive(Clone)]
pub struct TokenDescriptor {
    pub issuer: String,
    pub subject: ClaimsIdentity,
    pub not_before: DateTime<Utc>,
    pub expires: DateTime<Utc>,
    pub audience: Option<String>,
    pub signing_credentials: Option<Arc<dyn SigningCredentials>>,
}

impl TokenDescriptor {
    pub fn new(issuer: impl Into<String>, subject: ClaimsIdentity, not_before: DateTime<Utc>, expires: DateTime<Utc>) -> Self {
        Self {
            issuer: issuer.into(),
            subject,
            not_before,
            expires,
            audience: None,
            signing_credentials: None,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_signing_credentials(mut self, credentials: Arc<dyn SigningCredentials>) -> Self {
        self.signing_credentials = Some(credentials);
        self
    }
}
