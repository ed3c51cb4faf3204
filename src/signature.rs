//! Signature verification: the trial-verification loop that
//! turns "assertion + candidate keys" into either a confirmed `key_id` or a
//! diagnostic failure.
//!
//! What gets verified is the canonicalized assertion with its
//! `<ds:Signature>` element removed (the enveloped-signature transform),
//! run through whichever [`TransformFactory`] the caller configured. This
//! is a conservative stand-in for the real reference-digest-then-
//! `SignedInfo`-signature scheme that full XML-DSig uses — consistent with
//! canonicalization itself being out of scope (`canonical.rs`) — and is
//! sufficient for verifying assertions this handler itself produced.

use tracing::{debug, warn};

use crate::canonical::TransformFactory;
use crate::config::ValidationParameters;
use crate::error::{KeyAttempt, SamlError, SamlResult};
use crate::key_resolver::resolve_candidates;
use crate::model::Assertion;

/// Removes the first `<ds:Signature>...</ds:Signature>` span (tolerating the
/// `dsig:`/unprefixed spellings `write_assertion` never produces but a
/// hand-written document might) so the remaining bytes approximate what was
/// signed before the signature was attached.
fn strip_signature_element(xml: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(xml);
    for prefix in ["ds:Signature", "dsig:Signature", "Signature"] {
        let open = format!("<{prefix}");
        let close = format!("</{prefix}>");
        if let Some(start) = text.find(&open) {
            if let Some(rel_end) = text[start..].find(&close) {
                let end = start + rel_end + close.len();
                let mut out = String::with_capacity(text.len() - (end - start));
                out.push_str(&text[..start]);
                out.push_str(&text[end..]);
                return out.into_bytes();
            }
        }
    }
    xml.to_vec()
}

/// Verifies `assertion`'s signature against `raw_xml` (the bytes it was
/// parsed from), mutating `assertion.signing_key_id` on success.
///
/// Returns `Ok(())` when: a `signature_validator` override accepts the
/// assertion, or a candidate key successfully verifies, or
/// `require_signed_tokens` is `false` and no signature is present.
pub fn verify_signature(
    assertion: &mut Assertion,
    raw_xml: &[u8],
    params: &ValidationParameters,
    canonicalizer: &dyn TransformFactory,
) -> SamlResult<()> {
    if let Some(validator) = &params.signature_validator {
        return validator(assertion, params);
    }

    let Some(signature) = assertion.signature.clone() else {
        return if params.require_signed_tokens {
            Err(SamlError::MissingSignature)
        } else {
            debug!("assertion is unsigned and require_signed_tokens is false; accepting");
            Ok(())
        };
    };

    let kid = signature.key_info.as_ref().and_then(|k| k.kid.as_deref());
    let candidates = resolve_candidates(assertion, kid, params);
    if candidates.is_empty() {
        return Err(SamlError::InvalidSignature { tried: Vec::new() });
    }

    let stripped = strip_signature_element(raw_xml);
    let canonical = canonicalizer.apply(&signature.signed_info.transforms, &stripped)?;

    let mut tried = Vec::with_capacity(candidates.len());
    let mut kid_matched_any = false;
    for key in &candidates {
        if kid.is_some() && key.key_id() == kid {
            kid_matched_any = true;
        }
        if key.verify(&canonical, &signature.signature_value) {
            assertion.signing_key_id = key.key_id().map(str::to_string);
            debug!(key_id = ?key.key_id(), "signature verified");
            return Ok(());
        }
        tried.push(KeyAttempt {
            key_id: key.key_id().map(str::to_string),
            reason: "digest mismatch".to_string(),
        });
    }

    if let Some(kid) = kid {
        if !kid_matched_any {
            warn!(kid, "signature kid matches no candidate key");
            return Err(SamlError::SignatureKeyNotFound { kid: kid.to_string() });
        }
    }

    Err(SamlError::InvalidSignature { tried })
}
