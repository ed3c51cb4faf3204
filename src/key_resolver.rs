//! Candidate-key resolution: a pure function deciding which
//! `SecurityKey`s the signature verifier should try, before any
//! cryptography happens.
//!
//! A caller-supplied resolver callback, when set, fully owns candidate
//! selection: its output is used verbatim, including its ordering, since it
//! may already be doing its own `kid` matching. Only the internal fallback —
//! the static `issuer_signing_key`/`issuer_signing_keys` on
//! `ValidationParameters` — has its list reordered/collapsed by `kid`: a
//! match there is exact, so the verifier only needs to try that one key.

use std::sync::Arc;

use crate::config::ValidationParameters;
use crate::key::SecurityKey;
use crate::model::Assertion;

/// Resolves the ordered list of candidate keys for `assertion`, given the
/// `kid` its signature advertises (if any).
pub fn resolve_candidates(assertion: &Assertion, kid: Option<&str>, params: &ValidationParameters) -> Vec<Arc<dyn SecurityKey>> {
    if let Some(resolver) = &params.issuer_signing_key_resolver {
        return resolver(assertion, kid);
    }

    let candidates = params.candidate_keys();
    match kid {
        None => candidates,
        Some(kid) => match candidates.iter().find(|key| key.key_id() == Some(kid)) {
            Some(matched) => vec![matched.clone()],
            None => candidates,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::HmacSecurityKey;

    fn key(id: &str) -> Arc<dyn SecurityKey> {
        Arc::new(HmacSecurityKey::new(Some(id.to_string()), b"secret".to_vec()))
    }

    #[test]
    fn internal_kid_match_collapses_to_singleton() {
        let params = ValidationParameters::builder()
            .issuer_signing_keys(vec![key("a"), key("b"), key("c")])
            .build();
        let assertion = Assertion::new("issuer");
        let resolved = resolve_candidates(&assertion, Some("b"), &params);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].key_id(), Some("b"));
    }

    #[test]
    fn internal_kid_miss_falls_back_to_full_list() {
        let params = ValidationParameters::builder()
            .issuer_signing_keys(vec![key("a"), key("b")])
            .build();
        let assertion = Assertion::new("issuer");
        let resolved = resolve_candidates(&assertion, Some("missing"), &params);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn resolver_override_is_used_verbatim() {
        let params = ValidationParameters::builder()
            .issuer_signing_keys(vec![key("a"), key("b")])
            .issuer_signing_key_resolver(Arc::new(|_assertion: &Assertion, _kid: Option<&str>| vec![key("z"), key("a")]))
            .build();
        let assertion = Assertion::new("issuer");
        let resolved = resolve_candidates(&assertion, Some("a"), &params);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].key_id(), Some("z"));
        assert_eq!(resolved[1].key_id(), Some("a"));
    }

    #[test]
    fn falls_back_to_full_list_without_kid() {
        let params = ValidationParameters::builder().issuer_signing_keys(vec![key("a"), key("b")]).build();
        let assertion = Assertion::new("issuer");
        let resolved = resolve_candidates(&assertion, None, &params);
        assert_eq!(resolved.len(), 2);
    }
}
