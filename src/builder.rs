//! Outbound assertion construction: turns a
//! [`TokenDescriptor`] into a signed, serialized SAML2 assertion.

use std::sync::Arc;

use crate::actor::build_actor_attribute;
use crate::attributes::claims_to_attribute_statement;
use crate::canonical::TransformFactory;
use crate::claims::claim_types;
use crate::config::TokenDescriptor;
use crate::error::{SamlError, SamlResult};
use crate::model::{
    Assertion, AudienceRestriction, AuthenticationStatement, AuthnContext, Conditions, KeyInfo, NameId, Signature,
    SignedInfo, Statement, Subject, SubjectConfirmation,
};
use crate::serializer::Saml2Serializer;

/// Builds an unsigned [`Assertion`] from `descriptor`. Claims of type
/// `NameIdentifier`/`AuthenticationMethod`/`AuthenticationInstant` map onto
/// dedicated SAML elements rather than generic attributes; everything else
/// collapses into a single `AttributeStatement`.
pub fn build_assertion(descriptor: &TokenDescriptor) -> SamlResult<Assertion> {
    if descriptor.issuer.trim().is_empty() {
        return Err(SamlError::MissingIssuer);
    }

    let mut assertion = Assertion::new(descriptor.issuer.clone());
    assertion.conditions = Some(Conditions {
        not_before: Some(descriptor.not_before),
        not_on_or_after: Some(descriptor.expires),
        audience_restrictions: descriptor
            .audience
            .as_ref()
            .map(|aud| vec![AudienceRestriction { audiences: vec![aud.clone()] }])
            .unwrap_or_default(),
        ..Default::default()
    });

    let name_identifier = descriptor.subject.find_first(claim_types::NAME_IDENTIFIER);
    let subject_confirmations = if name_identifier.is_some() {
        vec![SubjectConfirmation::bearer()]
    } else {
        Vec::new()
    };
    assertion.subject = Some(Subject {
        name_id: name_identifier.map(|c| NameId::new(c.value.clone())),
        subject_confirmations,
    });

    let authentication_method = descriptor.subject.find_first(claim_types::AUTHENTICATION_METHOD);
    if let Some(method) = authentication_method {
        assertion.statements.push(Statement::Authentication(AuthenticationStatement {
            context: AuthnContext { class_reference: Some(method.value.clone()), declaration_reference: None },
            instant: assertion.issue_instant,
            session_index: None,
            subject_locality: None,
            session_not_on_or_after: None,
        }));
    }

    let excluded = [claim_types::NAME_IDENTIFIER, claim_types::AUTHENTICATION_METHOD, claim_types::AUTHENTICATION_INSTANT];
    let remaining: Vec<_> = descriptor
        .subject
        .claims
        .iter()
        .filter(|c| !excluded.contains(&c.claim_type.as_str()))
        .cloned()
        .collect();

    let mut attribute_statement = claims_to_attribute_statement(&remaining)?;
    if let Some(actor) = &descriptor.subject.actor {
        attribute_statement.attributes.push(build_actor_attribute(actor, &descriptor.issuer)?);
    }
    if !attribute_statement.attributes.is_empty() {
        assertion.statements.push(Statement::Attribute(attribute_statement));
    }

    Ok(assertion)
}

/// Builds and signs an assertion, returning the serialized XML bytes.
/// `descriptor.signing_credentials` is required — an unsigned write is a
/// configuration error for the outbound path.
pub fn build_and_sign(
    descriptor: &TokenDescriptor,
    serializer: &dyn Saml2Serializer,
    canonicalizer: &dyn TransformFactory,
) -> SamlResult<Vec<u8>> {
    let mut assertion = build_assertion(descriptor)?;

    let Some(credentials) = &descriptor.signing_credentials else {
        return Err(SamlError::InvalidConfiguration(
            "TokenDescriptor has no signing_credentials; call build_assertion for an unsigned draft".to_string(),
        ));
    };

    let unsigned_xml = serializer.write_assertion(&assertion)?;
    let canonical = canonicalizer.apply(&[crate::canonical::ENVELOPED_SIGNATURE.to_string()], &unsigned_xml)?;
    let signature_value = credentials.sign(&canonical);

    assertion.signature = Some(Signature {
        signed_info: SignedInfo {
            transforms: vec![crate::canonical::ENVELOPED_SIGNATURE.to_string()],
            canonicalization_method: Some(crate::canonical::EXCLUSIVE_C14N.to_string()),
            signature_method: None,
            digest_value: None,
        },
        key_info: credentials.key_id().map(|kid| KeyInfo { kid: Some(kid.to_string()) }),
        signature_value,
    });
    assertion.signing_key_id = credentials.key_id().map(str::to_string);

    serializer.write_assertion(&assertion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Claim, ClaimsIdentity};
    use crate::key::{HmacSecurityKey, SigningCredentials};
    use crate::canonical::ConservativeCanonicalizer;
    use crate::serializer::DefaultSaml2Serializer;
    use chrono::{Duration, Utc};

    fn descriptor(credentials: Option<Arc<dyn SigningCredentials>>) -> TokenDescriptor {
        let identity = ClaimsIdentity::new()
            .with_claim(Claim::new(claim_types::NAME_IDENTIFIER, "alice", "https://idp.example/"))
            .with_claim(Claim::new("urn:role", "admin", "https://idp.example/"));
        let mut descriptor = TokenDescriptor::new(
            "https://idp.example/",
            identity,
            Utc::now(),
            Utc::now() + Duration::hours(1),
        )
        .with_audience("urn:rp:test");
        descriptor.signing_credentials = credentials;
        descriptor
    }

    #[test]
    fn builds_subject_and_attributes_from_claims() {
        let assertion = build_assertion(&descriptor(None)).unwrap();
        assert_eq!(assertion.subject.unwrap().name_id.unwrap().value, "alice");
        match &assertion.statements[0] {
            Statement::Attribute(stmt) => assert_eq!(stmt.attributes[0].name, "urn:role"),
            other => panic!("expected attribute statement, got {other:?}"),
        }
    }

    #[test]
    fn requires_issuer() {
        let mut bad = descriptor(None);
        bad.issuer = String::new();
        let err = build_assertion(&bad).unwrap_err();
        assert!(matches!(err, SamlError::MissingIssuer));
    }

    #[test]
    fn signs_and_produces_verifiable_bytes() {
        let key = HmacSecurityKey::new(Some("k1".to_string()), b"secret".to_vec());
        let credentials: Arc<dyn SigningCredentials> = Arc::new(key);
        let xml = build_and_sign(&descriptor(Some(credentials)), &DefaultSaml2Serializer, &ConservativeCanonicalizer).unwrap();

        let parsed = DefaultSaml2Serializer.read_assertion(&xml).unwrap();
        let signature = parsed.signature.unwrap();
        assert_eq!(signature.key_info.unwrap().kid.as_deref(), Some("k1"));
    }

    #[test]
    fn unsigned_descriptor_cannot_write() {
        let err = build_and_sign(&descriptor(None), &DefaultSaml2Serializer, &ConservativeCanonicalizer).unwrap_err();
        assert!(matches!(err, SamlError::InvalidConfiguration(_)));
    }
}
