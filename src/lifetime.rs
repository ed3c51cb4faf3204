//! Lifetime validation: `NotBefore`/`NotOnOrAfter` against
//! "now", with configurable clock skew.

use chrono::{DateTime, Utc};

use crate::config::ValidationParameters;
use crate::error::{SamlError, SamlResult};
use crate::model::Assertion;

/// Default lifetime check: `now + skew >= not_before` and
/// `now - skew < not_on_or_after`. A `Conditions` element with neither bound
/// set is accepted (nothing to validate); an absent `Conditions` element
/// is treated as "no temporal constraint."
pub fn validate_lifetime(
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    assertion: &Assertion,
    params: &ValidationParameters,
    now: DateTime<Utc>,
) -> SamlResult<()> {
    if let Some(validator) = &params.lifetime_validator {
        return validator(not_before, not_on_or_after, assertion, params);
    }

    let skew = params.clock_skew;

    if let Some(nb) = not_before {
        if now + skew < nb {
            return Err(SamlError::InvalidLifetime(format!(
                "assertion not valid until {nb} (now {now}, skew {skew})"
            )));
        }
    }

    if let Some(noa) = not_on_or_after {
        if now - skew >= noa {
            return Err(SamlError::InvalidLifetime(format!(
                "assertion expired at {noa} (now {now}, skew {skew})"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn params() -> ValidationParameters {
        ValidationParameters::default()
    }

    #[test]
    fn accepts_within_window() {
        let now = Utc::now();
        let nb = now - Duration::minutes(1);
        let noa = now + Duration::minutes(1);
        let assertion = Assertion::new("issuer");
        validate_lifetime(Some(nb), Some(noa), &assertion, &params(), now).unwrap();
    }

    #[test]
    fn rejects_before_not_before_outside_skew() {
        let now = Utc::now();
        let nb = now + Duration::hours(1);
        let assertion = Assertion::new("issuer");
        let err = validate_lifetime(Some(nb), None, &assertion, &params(), now).unwrap_err();
        assert!(matches!(err, SamlError::InvalidLifetime(_)));
    }

    #[test]
    fn rejects_expired_outside_skew() {
        let now = Utc::now();
        let noa = now - Duration::hours(1);
        let assertion = Assertion::new("issuer");
        let err = validate_lifetime(None, Some(noa), &assertion, &params(), now).unwrap_err();
        assert!(matches!(err, SamlError::InvalidLifetime(_)));
    }

    #[test]
    fn clock_skew_forgives_small_drift() {
        let now = Utc::now();
        let noa = now - Duration::seconds(30);
        let assertion = Assertion::new("issuer");
        validate_lifetime(None, Some(noa), &assertion, &params(), now).unwrap();
    }

    #[test]
    fn no_bounds_means_no_constraint() {
        let now = Utc::now();
        let assertion = Assertion::new("issuer");
        validate_lifetime(None, None, &assertion, &params(), now).unwrap();
    }
}
