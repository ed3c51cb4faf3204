//! Quantified invariants that should hold regardless of which specific
//! scenario exercises them: idempotence of read-then-write, actor
//! delegation chains, and attribute collapsing across the full pipeline.

use std::sync::Arc;

use chrono::{Duration, Utc};
use resolve_saml::claims::{claim_types, Claim, ClaimsIdentity};
use resolve_saml::config::TokenDescriptor;
use resolve_saml::key::{HmacSecurityKey, SecurityKey, SigningCredentials};
use resolve_saml::serializer::{DefaultSaml2Serializer, Saml2Serializer};
use resolve_saml::Saml2TokenHandler;

fn key() -> Arc<HmacSecurityKey> {
    Arc::new(HmacSecurityKey::new(Some("k1".to_string()), b"secret".to_vec()))
}

#[test]
fn write_then_read_is_idempotent_on_the_parsed_tree() {
    let identity = ClaimsIdentity::new()
        .with_claim(Claim::new(claim_types::NAME_IDENTIFIER, "alice", "https://idp.example/"))
        .with_claim(Claim::new("urn:dept", "eng", "https://idp.example/"));
    let descriptor = TokenDescriptor::new("https://idp.example/", identity, Utc::now(), Utc::now() + Duration::hours(1))
        .with_audience("urn:rp:a")
        .with_signing_credentials(key() as Arc<dyn SigningCredentials>);

    let handler = Saml2TokenHandler::new();
    let xml_1 = handler.write_token(&descriptor).unwrap();
    let parsed = DefaultSaml2Serializer.read_assertion(&xml_1).unwrap();
    let xml_2 = DefaultSaml2Serializer.write_assertion(&parsed).unwrap();
    let reparsed = DefaultSaml2Serializer.read_assertion(&xml_2).unwrap();

    assert_eq!(parsed.id, reparsed.id);
    assert_eq!(parsed.issuer, reparsed.issuer);
    assert_eq!(
        parsed.subject.unwrap().name_id.unwrap().value,
        reparsed.subject.unwrap().name_id.unwrap().value
    );
}

#[test]
fn delegation_chain_survives_the_full_pipeline() {
    use resolve_saml::config::ValidationParameters;

    let backend_service = ClaimsIdentity::new().with_claim(Claim::new("urn:role", "backend-service", "https://idp.example/"));
    let mut frontend_app = ClaimsIdentity::new()
        .with_claim(Claim::new(claim_types::NAME_IDENTIFIER, "frontend-app", "https://idp.example/"));
    frontend_app.actor = Some(Box::new(backend_service));

    let signing_key = key();
    let descriptor = TokenDescriptor::new(
        "https://idp.example/",
        frontend_app,
        Utc::now(),
        Utc::now() + Duration::hours(1),
    )
    .with_audience("urn:rp:a")
    .with_signing_credentials(signing_key.clone() as Arc<dyn SigningCredentials>);

    let handler = Saml2TokenHandler::new();
    let xml = handler.write_token(&descriptor).unwrap();

    let verify_key: Arc<dyn SecurityKey> = signing_key;
    let params = ValidationParameters::builder()
        .issuer_signing_keys(vec![verify_key])
        .valid_audiences(vec!["urn:rp:a".to_string()])
        .build();
    let validated = handler.read_and_validate(&xml, &params).unwrap();

    assert_eq!(validated.claims.find_first(claim_types::NAME_IDENTIFIER).unwrap().value, "frontend-app");
    let actor = validated.claims.actor.expect("delegation chain should survive round trip");
    assert_eq!(actor.find_first("urn:role").unwrap().value, "backend-service");
}

#[test]
fn multi_valued_claims_collapse_into_one_attribute_and_expand_back() {
    use resolve_saml::config::ValidationParameters;

    let identity = ClaimsIdentity::new()
        .with_claim(Claim::new(claim_types::NAME_IDENTIFIER, "alice", "https://idp.example/"))
        .with_claim(Claim::new("urn:role", "admin", "https://idp.example/"))
        .with_claim(Claim::new("urn:role", "auditor", "https://idp.example/"))
        .with_claim(Claim::new("urn:role", "billing", "https://idp.example/"));

    let signing_key = key();
    let descriptor = TokenDescriptor::new("https://idp.example/", identity, Utc::now(), Utc::now() + Duration::hours(1))
        .with_audience("urn:rp:a")
        .with_signing_credentials(signing_key.clone() as Arc<dyn SigningCredentials>);

    let handler = Saml2TokenHandler::new();
    let xml = handler.write_token(&descriptor).unwrap();

    let parsed = DefaultSaml2Serializer.read_assertion(&xml).unwrap();
    let attribute_count = parsed
        .statements
        .iter()
        .filter_map(|s| match s {
            resolve_saml::model::Statement::Attribute(stmt) => Some(stmt.attributes.len()),
            _ => None,
        })
        .sum::<usize>();
    assert_eq!(attribute_count, 1, "three urn:role claims should collapse into a single Attribute element");

    let verify_key: Arc<dyn SecurityKey> = signing_key;
    let params = ValidationParameters::builder()
        .issuer_signing_keys(vec![verify_key])
        .valid_audiences(vec!["urn:rp:a".to_string()])
        .build();
    let validated = handler.read_and_validate(&xml, &params).unwrap();
    assert_eq!(validated.claims.find_all("urn:role").count(), 3);
}
