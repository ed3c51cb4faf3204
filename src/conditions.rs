//! Condition validation: orchestrates lifetime + audience
//! checks against `<Conditions>`, and enforces that `OneTimeUse` /
//! `ProxyRestriction` — which need policy state this core doesn't own — are
//! only accepted when a host has actually wired up that policy.

use chrono::Utc;

use crate::audience::validate_audience;
use crate::config::ValidationParameters;
use crate::error::{SamlError, SamlResult};
use crate::lifetime::validate_lifetime;
use crate::model::{Assertion, Conditions};

/// Validates `conditions` against `assertion`/`params`, returning the
/// audience the assertion was accepted for (empty string if unrestricted).
pub fn validate_conditions(conditions: Option<&Conditions>, assertion: &Assertion, params: &ValidationParameters) -> SamlResult<String> {
    let Some(conditions) = conditions else {
        return validate_audience(&[], assertion, params);
    };

    if params.validate_lifetime {
        validate_lifetime(conditions.not_before, conditions.not_on_or_after, assertion, params, Utc::now())?;
    }

    if conditions.one_time_use {
        if !params.validate_token_replay {
            return Err(SamlError::RequiresOverride { condition: "OneTimeUse" });
        }
        if let Some(validator) = &params.token_replay_validator {
            validator(&assertion.id, assertion.issue_instant)?;
        }
    }

    if let Some(proxy_restriction) = &conditions.proxy_restriction {
        if !params.validate_proxy_restriction {
            return Err(SamlError::RequiresOverride { condition: "ProxyRestriction" });
        }
        if let Some(validator) = &params.proxy_restriction_validator {
            validator(proxy_restriction.count, &proxy_restriction.audiences)?;
        }
    }

    let audiences: Vec<String> = conditions
        .audience_restrictions
        .iter()
        .flat_map(|r| r.audiences.iter().cloned())
        .collect();

    validate_audience(&audiences, assertion, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AudienceRestriction;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn absent_conditions_is_fine_by_default() {
        let assertion = Assertion::new("issuer");
        let params = ValidationParameters::builder().validate_audience(false).build();
        validate_conditions(None, &assertion, &params).unwrap();
    }

    #[test]
    fn one_time_use_requires_override() {
        let assertion = Assertion::new("issuer");
        let conditions = Conditions { one_time_use: true, ..Default::default() };
        let params = ValidationParameters::default();
        let err = validate_conditions(Some(&conditions), &assertion, &params).unwrap_err();
        assert!(matches!(err, SamlError::RequiresOverride { condition: "OneTimeUse" }));
    }

    #[test]
    fn one_time_use_accepted_once_wired_up() {
        let assertion = Assertion::new("issuer");
        let conditions = Conditions { one_time_use: true, ..Default::default() };
        let params = ValidationParameters::builder()
            .validate_token_replay(true)
            .token_replay_validator(Arc::new(|_id, _instant| Ok(())))
            .validate_audience(false)
            .build();
        validate_conditions(Some(&conditions), &assertion, &params).unwrap();
    }

    #[test]
    fn proxy_restriction_requires_override() {
        let assertion = Assertion::new("issuer");
        let conditions = Conditions {
            proxy_restriction: Some(crate::model::ProxyRestriction::default()),
            ..Default::default()
        };
        let params = ValidationParameters::builder().validate_audience(false).build();
        let err = validate_conditions(Some(&conditions), &assertion, &params).unwrap_err();
        assert!(matches!(err, SamlError::RequiresOverride { condition: "ProxyRestriction" }));
    }

    #[test]
    fn proxy_restriction_accepted_once_wired_up_independent_of_replay_validator() {
        let assertion = Assertion::new("issuer");
        let conditions = Conditions {
            proxy_restriction: Some(crate::model::ProxyRestriction { count: Some(0), audiences: vec![] }),
            ..Default::default()
        };
        let params = ValidationParameters::builder()
            .validate_proxy_restriction(true)
            .proxy_restriction_validator(Arc::new(|_count, _audiences| Ok(())))
            .validate_audience(false)
            .build();
        validate_conditions(Some(&conditions), &assertion, &params).unwrap();
    }

    #[test]
    fn propagates_audience_restriction_failures() {
        let assertion = Assertion::new("issuer");
        let conditions = Conditions {
            audience_restrictions: vec![AudienceRestriction { audiences: vec!["urn:rp:other".into()] }],
            ..Default::default()
        };
        let params = ValidationParameters::builder().valid_audiences(vec!["urn:rp:mine".into()]).build();
        let err = validate_conditions(Some(&conditions), &assertion, &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidAudience(_)));
    }

    #[test]
    fn skew_respected_through_conditions() {
        let assertion = Assertion::new("issuer");
        let conditions = Conditions {
            not_on_or_after: Some(Utc::now() - Duration::hours(2)),
            ..Default::default()
        };
        let params = ValidationParameters::builder().validate_audience(false).build();
        let err = validate_conditions(Some(&conditions), &assertion, &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidLifetime(_)));
    }
}
