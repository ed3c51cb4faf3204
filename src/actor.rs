//! Delegation codec: encodes/decodes the nested `actor`
//! identity carried by [`ClaimsIdentity`] as a single SAML `Attribute` whose
//! value is a small `<Actor>` blob of nested `<Attribute>`/`<AttributeValue>`
//! elements, mirroring how claim type `.../claims/actor` round-trips
//! delegation chains.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::attributes::{attribute_statement_to_claims, claims_to_attribute_statement};
use crate::claims::{claim_types, ClaimsIdentity};
use crate::error::{SamlError, SamlResult};
use crate::model::{Attribute, AttributeStatement};
use crate::serializer::{DefaultSaml2Serializer, Saml2Serializer};
use crate::xml::local_name;

/// Serializes `identity` (and any further-nested actor) into the `<Actor>`
/// blob stored as an attribute value. `issuer` is the outer assertion's
/// issuer, attributed to every claim the same way a top-level
/// `AttributeStatement` is.
pub fn encode_actor(identity: &ClaimsIdentity, issuer: &str) -> SamlResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_actor(&mut writer, identity, issuer)?;
    Ok(String::from_utf8(writer.into_inner().into_inner()).expect("writer only emits valid utf-8"))
}

fn write_actor(writer: &mut Writer<Cursor<Vec<u8>>>, identity: &ClaimsIdentity, issuer: &str) -> SamlResult<()> {
    writer.write_event(Event::Start(BytesStart::new("Actor")))?;

    let statement = claims_to_attribute_statement(&identity.claims)?;
    for attribute in &statement.attributes {
        let attribute_xml = DefaultSaml2Serializer.write_attribute(attribute)?;
        let attribute_xml = String::from_utf8(attribute_xml).map_err(|e| SamlError::Malformed(e.to_string()))?;
        writer.write_event(Event::Text(BytesText::from_escaped(attribute_xml)))?;
    }

    if let Some(nested) = &identity.actor {
        write_actor(writer, nested, issuer)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Actor")))?;
    Ok(())
}

/// Parses a `<Actor>` blob back into a [`ClaimsIdentity`], recursing into a
/// further-nested `<Actor>` if present. `issuer` is the outer assertion's
/// issuer, used the same way [`encode_actor`] used it to attribute claims.
pub fn decode_actor(xml: &str, issuer: &str) -> SamlResult<ClaimsIdentity> {
    let bytes = xml.as_bytes();
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == "Actor" => break,
            Event::Eof => return Err(SamlError::Malformed("Actor blob has no <Actor> root".to_string())),
            _ => {}
        }
        buf.clear();
    }
    buf.clear();
    read_actor_body(&mut reader, bytes, issuer)
}

fn read_actor_body(reader: &mut Reader<&[u8]>, full: &[u8], issuer: &str) -> SamlResult<ClaimsIdentity> {
    let mut statement = AttributeStatement::default();
    let mut nested_actor = None;
    let mut buf = Vec::new();

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == "Attribute" => {
                let mut inner = Vec::new();
                loop {
                    match reader.read_event_into(&mut inner)? {
                        Event::End(end) if local_name(end.name().as_ref()) == "Attribute" => break,
                        Event::Eof => return Err(SamlError::Malformed("unexpected EOF in Attribute".to_string())),
                        _ => {}
                    }
                    inner.clear();
                }
                let after = reader.buffer_position() as usize;
                statement.attributes.push(DefaultSaml2Serializer.read_attribute(&full[before..after])?);
            }
            Event::Empty(e) if local_name(e.name().as_ref()) == "Attribute" => {
                let after = reader.buffer_position() as usize;
                statement.attributes.push(DefaultSaml2Serializer.read_attribute(&full[before..after])?);
            }
            Event::Start(e) if local_name(e.name().as_ref()) == "Actor" => {
                nested_actor = Some(Box::new(read_actor_body(reader, full, issuer)?));
            }
            Event::End(e) if local_name(e.name().as_ref()) == "Actor" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in Actor blob".to_string())),
            _ => {}
        }
        buf.clear();
    }

    let claims = attribute_statement_to_claims(&statement, issuer)?;
    let mut identity = ClaimsIdentity::new();
    identity.claims = claims;
    identity.actor = nested_actor;
    Ok(identity)
}

/// Wraps `identity` into the single `Attribute` that carries a delegation
/// chain (claim type `claim_types::ACTOR`).
pub fn build_actor_attribute(identity: &ClaimsIdentity, issuer: &str) -> SamlResult<Attribute> {
    Ok(Attribute {
        name: claim_types::ACTOR.to_string(),
        name_format: None,
        friendly_name: None,
        xsi_type: None,
        original_issuer: None,
        values: vec![encode_actor(identity, issuer)?],
    })
}

/// Extracts the nested actor identity from an `AttributeStatement`'s
/// attributes, if any. More than one `Actor` attribute at the same
/// delegation level is rejected.
pub fn extract_actor(attributes: &[Attribute], issuer: &str) -> SamlResult<Option<ClaimsIdentity>> {
    let mut actor_attributes = attributes.iter().filter(|a| a.name == claim_types::ACTOR);
    let Some(first) = actor_attributes.next() else {
        return Ok(None);
    };
    if actor_attributes.next().is_some() {
        return Err(SamlError::NestedActorConflict);
    }
    let Some(value) = first.values.first() else {
        return Ok(None);
    };
    Ok(Some(decode_actor(value, issuer)?))
}
