//! The SAML2 assertion DOM.
//!
//! These types are the sub-tree the core parses, signs and walks. They are
//! plain data — no behavior lives here beyond small constructors and the
//! equality keys used by the attribute flattener.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root entity of a SAML2 assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    pub id: String,
    pub issue_instant: DateTime<Utc>,
    pub issuer: String,
    pub subject: Option<Subject>,
    pub conditions: Option<Conditions>,
    pub advice: Option<String>,
    pub statements: Vec<Statement>,
    pub signature: Option<Signature>,
    /// Populated only on the signature verifier's success path; never
    /// set by the reader or the builder.
    #[serde(skip)]
    pub signing_key_id: Option<String>,
}

impl Assertion {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_{}", uuid::Uuid::new_v4()),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            subject: None,
            conditions: None,
            advice: None,
            statements: Vec::new(),
            signature: None,
            signing_key_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    pub name_id: Option<NameId>,
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameId {
    pub value: String,
    pub format: Option<String>,
    pub name_qualifier: Option<String>,
    pub sp_name_qualifier: Option<String>,
    pub sp_provided_id: Option<String>,
}

impl NameId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
            sp_provided_id: None,
        }
    }
}

pub const BEARER_CONFIRMATION_METHOD: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    pub method: String,
    pub confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    pub fn bearer() -> Self {
        Self {
            method: BEARER_CONFIRMATION_METHOD.to_string(),
            confirmation_data: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub recipient: Option<String>,
    pub in_response_to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conditions {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub audience_restrictions: Vec<AudienceRestriction>,
    pub one_time_use: bool,
    pub proxy_restriction: Option<ProxyRestriction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudienceRestriction {
    pub audiences: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyRestriction {
    pub count: Option<u32>,
    pub audiences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Attribute(AttributeStatement),
    Authentication(AuthenticationStatement),
    AuthorizationDecision(AuthorizationDecisionStatement),
    /// An unrecognized statement kept for pass-through. Does not contribute
    /// claims.
    Unknown { raw_xml: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeStatement {
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationStatement {
    pub context: AuthnContext,
    pub instant: DateTime<Utc>,
    pub session_index: Option<String>,
    pub subject_locality: Option<String>,
    pub session_not_on_or_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthnContext {
    pub class_reference: Option<String>,
    pub declaration_reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationDecisionStatement {
    pub resource: String,
    pub decision: String,
    pub actions: Vec<String>,
}

/// Equality key used by the flattener/collapser: `(name, xsi_type,
/// original_issuer)`.
pub type AttributeKey = (String, Option<String>, Option<String>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub name_format: Option<String>,
    pub friendly_name: Option<String>,
    pub xsi_type: Option<String>,
    pub original_issuer: Option<String>,
    pub values: Vec<String>,
}

impl Attribute {
    pub fn key(&self) -> AttributeKey {
        (self.name.clone(), self.xsi_type.clone(), self.original_issuer.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    pub kid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignedInfo {
    /// Transform algorithm URIs applied, in order, to the signed sub-tree.
    pub transforms: Vec<String>,
    pub canonicalization_method: Option<String>,
    pub signature_method: Option<String>,
    pub digest_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub signed_info: SignedInfo,
    pub key_info: Option<KeyInfo>,
    pub signature_value: Vec<u8>,
}
