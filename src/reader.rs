//! Token reading: the size-gated, cheap "can I read this"
//! probe plus the actual parse into an [`Assertion`].

use tracing::warn;

use crate::config::HandlerConfig;
use crate::error::{SamlError, SamlResult};
use crate::model::Assertion;
use crate::serializer::Saml2Serializer;
use crate::xml::{RootProbe, XmlReader, NS_ASSERTION};

/// True if `xml` is within the configured size ceiling and its root element
/// is `Assertion` in the SAML2 assertion namespace. Never allocates the full
/// parse tree — `handler.rs` calls this before deciding whether `read` is
/// worth attempting at all.
pub fn can_read(xml: &[u8], config: &HandlerConfig) -> bool {
    if xml.len() > config.max_token_size {
        return false;
    }
    RootProbe::new(xml).is_start_element("Assertion", NS_ASSERTION)
}

/// Parses `xml` into an [`Assertion`], enforcing `max_token_size` first.
pub fn read(xml: &[u8], config: &HandlerConfig, serializer: &dyn Saml2Serializer) -> SamlResult<Assertion> {
    if xml.len() > config.max_token_size {
        warn!(actual = xml.len(), limit = config.max_token_size, "rejecting oversize token");
        return Err(SamlError::OversizeInput { actual: xml.len(), limit: config.max_token_size });
    }
    serializer.read_assertion(xml)
}
