//! Claims ⇄ attributes flattening.
//!
//! Inbound: each `<AttributeValue>` becomes its own [`Claim`], all sharing
//! the attribute's name/format/issuer. Outbound: claims that share the same
//! `(name, value_type, original_issuer)` key collapse back into a single
//! multi-valued `Attribute` rather than emitting one `<Attribute>` element
//! per value.

use std::collections::BTreeMap;

use crate::claims::{claim_properties, Claim, XSI_STRING};
use crate::error::{SamlError, SamlResult};
use crate::model::{Attribute, AttributeKey, AttributeStatement};

/// A bare URI reference check, not a full RFC 3986 parse: rejects
/// `NameFormat` values that are obviously not URIs (no scheme) rather than
/// fully validating them.
fn looks_like_absolute_uri(value: &str) -> bool {
    match value.split_once(':') {
        Some((scheme, rest)) => !scheme.is_empty() && !rest.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        None => false,
    }
}

fn validate_uri_field(field: &'static str, value: &str) -> SamlResult<()> {
    if looks_like_absolute_uri(value) {
        Ok(())
    } else {
        Err(SamlError::InvalidNameFormat { field, value: value.to_string() })
    }
}

/// Expands an `AttributeStatement` into one `Claim` per `AttributeValue`.
pub fn attribute_statement_to_claims(statement: &AttributeStatement, default_issuer: &str) -> SamlResult<Vec<Claim>> {
    let mut claims = Vec::new();
    for attribute in &statement.attributes {
        if let Some(name_format) = &attribute.name_format {
            validate_uri_field("Attribute.NameFormat", name_format)?;
        }

        let issuer = default_issuer.to_string();
        let original_issuer = attribute.original_issuer.clone().unwrap_or_else(|| issuer.clone());
        let value_type = attribute.xsi_type.clone().unwrap_or_else(|| XSI_STRING.to_string());

        for value in &attribute.values {
            let mut claim = Claim::new(attribute.name.clone(), value.clone(), issuer.clone())
                .with_value_type(value_type.clone())
                .with_original_issuer(original_issuer.clone());
            if let Some(name_format) = &attribute.name_format {
                claim = claim.with_property(claim_properties::SAML_ATTRIBUTE_NAME_FORMAT, name_format.clone());
            }
            if let Some(friendly_name) = &attribute.friendly_name {
                claim = claim.with_property(claim_properties::SAML_ATTRIBUTE_DISPLAY_NAME, friendly_name.clone());
            }
            claims.push(claim);
        }
    }
    Ok(claims)
}

fn claim_key(claim: &Claim) -> AttributeKey {
    let original_issuer = (claim.original_issuer != claim.issuer).then(|| claim.original_issuer.clone());
    (claim.claim_type.clone(), Some(claim.value_type.clone()), original_issuer)
}

/// Collapses `claims` that share a claim type/value type/original issuer
/// into multi-valued `Attribute`s, preserving first-seen order.
pub fn claims_to_attribute_statement(claims: &[Claim]) -> SamlResult<AttributeStatement> {
    let mut order = Vec::new();
    let mut grouped: BTreeMap<AttributeKey, Attribute> = BTreeMap::new();

    for claim in claims {
        let key = claim_key(claim);
        grouped
            .entry(key.clone())
            .and_modify(|attr| attr.values.push(claim.value.clone()))
            .or_insert_with(|| {
                order.push(key.clone());
                Attribute {
                    name: claim.claim_type.clone(),
                    name_format: claim.properties.get(claim_properties::SAML_ATTRIBUTE_NAME_FORMAT).cloned(),
                    friendly_name: claim.properties.get(claim_properties::SAML_ATTRIBUTE_DISPLAY_NAME).cloned(),
                    xsi_type: Some(claim.value_type.clone()),
                    original_issuer: (claim.original_issuer != claim.issuer).then(|| claim.original_issuer.clone()),
                    values: vec![claim.value.clone()],
                }
            });
    }

    let attributes = order.into_iter().filter_map(|key| grouped.remove(&key)).collect();
    Ok(AttributeStatement { attributes })
}
