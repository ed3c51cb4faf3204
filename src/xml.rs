//! Minimal XML reader/writer façade.
//!
//! The core only ever needs to know "does this byte stream start with a
//! given element" and to hand the full parse off to the
//! [`Saml2Serializer`](crate::serializer::Saml2Serializer). Those two
//! capabilities are kept here so that `reader.rs`'s `can_read` stays a
//! cheap, non-allocating probe.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::SamlResult;

/// Capability surface the token reader needs from an XML cursor.
pub trait XmlReader {
    /// True if the cursor is currently positioned on a start element with
    /// the given local name and namespace.
    fn is_start_element(&self, local_name: &str, namespace: &str) -> bool;
}

/// Strip a `prefix:` qualifier off a qualified XML name, the way every SAML
/// document in the wild mixes `saml:`, `saml2:`, and unprefixed elements.
pub fn local_name(qname: &[u8]) -> &str {
    let s = std::str::from_utf8(qname).unwrap_or("");
    match s.rsplit_once(':') {
        Some((_, local)) => local,
        None => s,
    }
}

pub const NS_ASSERTION: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
pub const NS_PROTOCOL: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
pub const NS_DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// A cheap probe over the first meaningful element of an XML document,
/// without building the full assertion tree.
pub struct RootProbe<'a> {
    bytes: &'a [u8],
}

impl<'a> RootProbe<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// The local name and resolved namespace URI of the first start/empty
    /// element found, skipping any XML declaration, comments, and
    /// whitespace. `None` if the document never reaches a start element
    /// (e.g. empty or whitespace-only input). The namespace is `None` when
    /// the element's prefix doesn't resolve to a bound `xmlns`.
    pub fn root_element(&self) -> SamlResult<Option<(String, Option<String>)>> {
        let mut reader = NsReader::from_reader(self.bytes);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        loop {
            match reader.read_resolved_event_into(&mut buf)? {
                (ns, Event::Start(e)) | (ns, Event::Empty(e)) => {
                    let name = local_name(e.name().as_ref()).to_string();
                    let namespace = match ns {
                        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
                        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
                    };
                    return Ok(Some((name, namespace)));
                }
                (_, Event::Eof) => return Ok(None),
                _ => {}
            }
            buf.clear();
        }
    }

    /// The local name of the first start/empty element, ignoring namespace.
    pub fn root_local_name(&self) -> SamlResult<Option<String>> {
        Ok(self.root_element()?.map(|(name, _)| name))
    }
}

impl<'a> XmlReader for RootProbe<'a> {
    fn is_start_element(&self, local_name_wanted: &str, namespace: &str) -> bool {
        matches!(
            self.root_element(),
            Ok(Some((name, Some(ns)))) if name == local_name_wanted && ns == namespace
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_prefixes() {
        assert_eq!(local_name(b"saml2:Assertion"), "Assertion");
        assert_eq!(local_name(b"saml:Assertion"), "Assertion");
        assert_eq!(local_name(b"Assertion"), "Assertion");
    }

    #[test]
    fn root_probe_finds_assertion_after_whitespace() {
        let xml = b"  \n  <saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\"></saml:Assertion>";
        let probe = RootProbe::new(xml);
        assert_eq!(probe.root_local_name().unwrap().as_deref(), Some("Assertion"));
    }

    #[test]
    fn root_probe_returns_none_for_whitespace_only() {
        let probe = RootProbe::new(b"   \n\t  ");
        assert_eq!(probe.root_local_name().unwrap(), None);
    }

    #[test]
    fn is_start_element_requires_matching_namespace() {
        let xml = b"<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\"></saml:Assertion>";
        let probe = RootProbe::new(xml);
        assert!(probe.is_start_element("Assertion", NS_ASSERTION));
        assert!(!probe.is_start_element("Assertion", NS_PROTOCOL));
    }

    #[test]
    fn is_start_element_rejects_foreign_namespace() {
        let xml = b"<Assertion xmlns=\"urn:some:other:ns\"></Assertion>";
        let probe = RootProbe::new(xml);
        assert!(!probe.is_start_element("Assertion", NS_ASSERTION));
    }
}
