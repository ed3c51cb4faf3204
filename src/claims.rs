//! The produced/consumed claims model.
//!
//! Mirrors the shape of `System.Security.Claims` that the original
//! `Saml2SecurityTokenHandler` targets: a claim is a `(type, value)` pair
//! with metadata, and an identity is an ordered bag of claims plus an
//! optional nested `actor` for delegation.

use std::collections::BTreeMap;

/// Well-known claim type URIs the translator/builder recognize by name.
pub mod claim_types {
    pub const NAME_IDENTIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
    pub const AUTHENTICATION_METHOD: &str =
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/authenticationmethod";
    pub const AUTHENTICATION_INSTANT: &str =
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/authenticationinstant";
    pub const ACTOR: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/actor";
}

/// Property keys carried on claims that round-trip SAML-specific metadata.
pub mod claim_properties {
    pub const FORMAT: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claimproperties/format";
    pub const NAME_QUALIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claimproperties/namequalifier";
    pub const SP_NAME_QUALIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claimproperties/spnamequalifier";
    pub const SP_PROVIDED_ID: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claimproperties/spprovidedid";
    pub const SAML_ATTRIBUTE_NAME_FORMAT: &str = "SamlAttributeNameFormat";
    pub const SAML_ATTRIBUTE_DISPLAY_NAME: &str = "SamlAttributeDisplayName";
}

pub const XSI_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// A single typed claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
    pub value_type: String,
    pub issuer: String,
    pub original_issuer: String,
    pub properties: BTreeMap<String, String>,
}

impl Claim {
    pub fn new(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        let issuer = issuer.into();
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: XSI_STRING.to_string(),
            original_issuer: issuer.clone(),
            issuer,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }

    pub fn with_original_issuer(mut self, original_issuer: impl Into<String>) -> Self {
        self.original_issuer = original_issuer.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A bag of claims representing an authenticated party, optionally carrying
/// a nested `actor` identity for delegation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsIdentity {
    pub claims: Vec<Claim>,
    pub actor: Option<Box<ClaimsIdentity>>,
}

impl ClaimsIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a Claim> {
        self.claims.iter().filter(move |c| c.claim_type == claim_type)
    }

    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_all_filters_by_type() {
        let identity = ClaimsIdentity::new()
            .with_claim(Claim::new("role", "admin", "issuer"))
            .with_claim(Claim::new("role", "user", "issuer"))
            .with_claim(Claim::new(claim_types::NAME_IDENTIFIER, "alice", "issuer"));

        assert_eq!(identity.find_all("role").count(), 2);
        assert_eq!(
            identity.find_first(claim_types::NAME_IDENTIFIER).map(|c| c.value.as_str()),
            Some("alice")
        );
    }
}
