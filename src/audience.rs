//! Audience validation: the `<AudienceRestriction>` list must
//! intersect the configured valid-audience set.

use crate::config::ValidationParameters;
use crate::error::{SamlError, SamlResult};
use crate::model::Assertion;

/// Default audience check: accepted if `validate_audience` is off, if no
/// restriction was present at all, or if any audience named in any
/// restriction is in `valid_audiences`. Returns the matching audience.
pub fn validate_audience(audiences: &[String], assertion: &Assertion, params: &ValidationParameters) -> SamlResult<String> {
    if let Some(validator) = &params.audience_validator {
        return validator(audiences, assertion, params);
    }

    if !params.validate_audience {
        return Ok(audiences.first().cloned().unwrap_or_default());
    }

    if audiences.is_empty() {
        if params.require_audience_restriction {
            return Err(SamlError::InvalidAudience("assertion has no AudienceRestriction".to_string()));
        }
        return Ok(String::new());
    }

    audiences
        .iter()
        .find(|a| params.valid_audiences.iter().any(|valid| valid == *a))
        .cloned()
        .ok_or_else(|| {
            SamlError::InvalidAudience(format!(
                "none of [{}] are in the configured valid audiences",
                audiences.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_audience() {
        let params = ValidationParameters::builder().valid_audiences(vec!["urn:rp:a".into()]).build();
        let assertion = Assertion::new("issuer");
        let matched = validate_audience(&["urn:rp:a".to_string()], &assertion, &params).unwrap();
        assert_eq!(matched, "urn:rp:a");
    }

    #[test]
    fn rejects_unlisted_audience() {
        let params = ValidationParameters::builder().valid_audiences(vec!["urn:rp:a".into()]).build();
        let assertion = Assertion::new("issuer");
        let err = validate_audience(&["urn:rp:b".to_string()], &assertion, &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidAudience(_)));
    }

    #[test]
    fn missing_restriction_is_fine_unless_required() {
        let params = ValidationParameters::builder().valid_audiences(vec!["urn:rp:a".into()]).build();
        let assertion = Assertion::new("issuer");
        validate_audience(&[], &assertion, &params).unwrap();

        let strict = ValidationParameters::builder()
            .valid_audiences(vec!["urn:rp:a".into()])
            .require_audience_restriction(true)
            .build();
        let err = validate_audience(&[], &assertion, &strict).unwrap_err();
        assert!(matches!(err, SamlError::InvalidAudience(_)));
    }
}
