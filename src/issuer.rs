//! Issuer validation: confirms the assertion's `<Issuer>`
//! against the configured trust set, returning the canonical issuer string
//! to stamp onto the produced claims identity.

use crate::config::ValidationParameters;
use crate::error::{SamlError, SamlResult};
use crate::model::Assertion;

pub fn validate_issuer(issuer: &str, assertion: &Assertion, params: &ValidationParameters) -> SamlResult<String> {
    if let Some(validator) = &params.issuer_validator {
        return validator(issuer, assertion, params);
    }

    if !params.validate_issuer {
        return Ok(issuer.to_string());
    }

    if issuer.trim().is_empty() {
        return Err(SamlError::InvalidIssuer("issuer is empty".to_string()));
    }

    if params.valid_issuers.is_empty() || params.valid_issuers.iter().any(|valid| valid == issuer) {
        Ok(issuer.to_string())
    } else {
        Err(SamlError::InvalidIssuer(format!("'{issuer}' is not a configured trusted issuer")))
    }
}
