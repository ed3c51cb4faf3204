//! Subject validation: confirms the assertion names a
//! subject and that every bearer confirmation it carries is unexpired.

use chrono::Utc;

use crate::config::ValidationParameters;
use crate::error::{SamlError, SamlResult};
use crate::lifetime::validate_lifetime;
use crate::model::{Assertion, Subject, BEARER_CONFIRMATION_METHOD};

/// Validates `subject` against `assertion`/`params`. When
/// `require_bearer_confirmation` is set, at least one bearer
/// `SubjectConfirmation` must be present. Every bearer confirmation found —
/// required or not — has its `NotBefore`/`NotOnOrAfter` checked via
/// [`validate_lifetime`], so a `lifetime_validator` override applies here
/// too.
pub fn validate_subject<'a>(subject: Option<&'a Subject>, assertion: &Assertion, params: &ValidationParameters) -> SamlResult<&'a Subject> {
    let subject = subject.ok_or(SamlError::MissingSubject)?;

    let bearer_confirmations: Vec<_> = subject
        .subject_confirmations
        .iter()
        .filter(|c| c.method == BEARER_CONFIRMATION_METHOD)
        .collect();

    if params.require_bearer_confirmation && bearer_confirmations.is_empty() {
        return Err(SamlError::InvalidClaims("no bearer SubjectConfirmation present".to_string()));
    }

    let now = Utc::now();
    for bearer in bearer_confirmations {
        if let Some(data) = &bearer.confirmation_data {
            validate_lifetime(data.not_before, data.not_on_or_after, assertion, params, now)?;
        }
    }

    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NameId, SubjectConfirmation, SubjectConfirmationData};
    use chrono::Duration;

    fn assertion() -> Assertion {
        Assertion::new("issuer")
    }

    #[test]
    fn rejects_missing_subject() {
        let params = ValidationParameters::default();
        let err = validate_subject(None, &assertion(), &params).unwrap_err();
        assert!(matches!(err, SamlError::MissingSubject));
    }

    #[test]
    fn accepts_subject_without_bearer_requirement() {
        let subject = Subject { name_id: Some(NameId::new("alice")), subject_confirmations: vec![] };
        let params = ValidationParameters::default();
        validate_subject(Some(&subject), &assertion(), &params).unwrap();
    }

    #[test]
    fn requires_bearer_confirmation_when_configured() {
        let subject = Subject { name_id: Some(NameId::new("alice")), subject_confirmations: vec![] };
        let params = ValidationParameters::builder().require_bearer_confirmation(true).build();
        let err = validate_subject(Some(&subject), &assertion(), &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidClaims(_)));
    }

    #[test]
    fn rejects_expired_bearer_confirmation() {
        let subject = Subject {
            name_id: Some(NameId::new("alice")),
            subject_confirmations: vec![SubjectConfirmation {
                method: BEARER_CONFIRMATION_METHOD.to_string(),
                confirmation_data: Some(SubjectConfirmationData {
                    not_before: None,
                    not_on_or_after: Some(Utc::now() - Duration::hours(1)),
                    recipient: None,
                    in_response_to: None,
                }),
            }],
        };
        let params = ValidationParameters::builder().require_bearer_confirmation(true).build();
        let err = validate_subject(Some(&subject), &assertion(), &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidLifetime(_)));
    }

    #[test]
    fn rejects_expired_bearer_confirmation_even_when_not_required() {
        let subject = Subject {
            name_id: Some(NameId::new("alice")),
            subject_confirmations: vec![SubjectConfirmation {
                method: BEARER_CONFIRMATION_METHOD.to_string(),
                confirmation_data: Some(SubjectConfirmationData {
                    not_before: None,
                    not_on_or_after: Some(Utc::now() - Duration::hours(1)),
                    recipient: None,
                    in_response_to: None,
                }),
            }],
        };
        let params = ValidationParameters::default();
        let err = validate_subject(Some(&subject), &assertion(), &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidLifetime(_)));
    }

    #[test]
    fn checks_every_bearer_confirmation_not_just_the_first() {
        let subject = Subject {
            name_id: Some(NameId::new("alice")),
            subject_confirmations: vec![
                SubjectConfirmation::bearer(),
                SubjectConfirmation {
                    method: BEARER_CONFIRMATION_METHOD.to_string(),
                    confirmation_data: Some(SubjectConfirmationData {
                        not_before: None,
                        not_on_or_after: Some(Utc::now() - Duration::hours(1)),
                        recipient: None,
                        in_response_to: None,
                    }),
                },
            ],
        };
        let params = ValidationParameters::default();
        let err = validate_subject(Some(&subject), &assertion(), &params).unwrap_err();
        assert!(matches!(err, SamlError::InvalidLifetime(_)));
    }
}
