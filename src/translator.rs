//! Inbound translation: turns a validated [`Assertion`] into
//! the [`ClaimsIdentity`] a caller actually consumes.

use crate::actor::extract_actor;
use crate::attributes::attribute_statement_to_claims;
use crate::claims::{claim_types, Claim, ClaimsIdentity};
use crate::config::ValidationParameters;
use crate::error::SamlResult;
use crate::model::{Assertion, Statement};

/// Builds a `ClaimsIdentity` from `assertion`, honoring a
/// `create_claims_identity` override if one is configured.
pub fn translate(assertion: &Assertion, issuer: &str, params: &ValidationParameters) -> SamlResult<ClaimsIdentity> {
    if let Some(factory) = &params.create_claims_identity {
        return Ok(factory(assertion, params));
    }

    let mut identity = ClaimsIdentity::new();

    if let Some(subject) = &assertion.subject {
        if let Some(name_id) = &subject.name_id {
            let mut claim = Claim::new(claim_types::NAME_IDENTIFIER, name_id.value.clone(), issuer.to_string());
            if let Some(format) = &name_id.format {
                claim = claim.with_property(crate::claims::claim_properties::FORMAT, format.clone());
            }
            if let Some(nq) = &name_id.name_qualifier {
                claim = claim.with_property(crate::claims::claim_properties::NAME_QUALIFIER, nq.clone());
            }
            if let Some(spnq) = &name_id.sp_name_qualifier {
                claim = claim.with_property(crate::claims::claim_properties::SP_NAME_QUALIFIER, spnq.clone());
            }
            if let Some(spid) = &name_id.sp_provided_id {
                claim = claim.with_property(crate::claims::claim_properties::SP_PROVIDED_ID, spid.clone());
            }
            identity.add_claim(claim);
        }
    }

    // Attribute statements are translated before authentication statements,
    // regardless of their order in the document, so authentication claims
    // never shadow an identically-named attribute claim.
    for statement in &assertion.statements {
        if let Statement::Attribute(attribute_statement) = statement {
            let mut claims = attribute_statement_to_claims(attribute_statement, issuer)?;
            identity.claims.append(&mut claims);
            if let Some(actor) = extract_actor(&attribute_statement.attributes, issuer)? {
                identity.actor = Some(Box::new(actor));
            }
        }
    }

    for statement in &assertion.statements {
        if let Statement::Authentication(authn) = statement {
            if let Some(class_ref) = &authn.context.class_reference {
                identity.add_claim(Claim::new(claim_types::AUTHENTICATION_METHOD, class_ref.clone(), issuer.to_string()));
            }
            identity.add_claim(Claim::new(
                claim_types::AUTHENTICATION_INSTANT,
                crate::serializer::format_xsd_datetime(&authn.instant),
                issuer.to_string(),
            ));
        }
    }

    Ok(identity)
}
