//! SAML2 serializer: converts between the [`Assertion`] DOM and XML bytes.
//! This is a narrow interface boundary — the core only ever calls through
//! [`Saml2Serializer`] — with a default implementation that parses and
//! emits real SAML2 XML rather than approximating it with regex.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::error::{SamlError, SamlResult};
use crate::model::*;
use crate::xml::{local_name, NS_ASSERTION, NS_DSIG};

pub trait Saml2Serializer: Send + Sync {
    fn read_assertion(&self, xml: &[u8]) -> SamlResult<Assertion>;
    fn write_assertion(&self, assertion: &Assertion) -> SamlResult<Vec<u8>>;
    fn read_attribute(&self, xml: &[u8]) -> SamlResult<Attribute>;
    fn write_attribute(&self, attribute: &Attribute) -> SamlResult<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSaml2Serializer;

impl Saml2Serializer for DefaultSaml2Serializer {
    fn read_assertion(&self, xml: &[u8]) -> SamlResult<Assertion> {
        read_assertion(xml)
    }

    fn write_assertion(&self, assertion: &Assertion) -> SamlResult<Vec<u8>> {
        write_assertion(assertion)
    }

    fn read_attribute(&self, xml: &[u8]) -> SamlResult<Attribute> {
        read_attribute_standalone(xml)
    }

    fn write_attribute(&self, attribute: &Attribute) -> SamlResult<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_attribute_el(&mut writer, attribute)?;
        Ok(writer.into_inner().into_inner())
    }
}

fn xsd_datetime(s: &str) -> SamlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SamlError::Malformed(format!("invalid xsd:dateTime '{s}': {e}")))
}

pub fn format_xsd_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn attr(e: &BytesStart, name: &str) -> SamlResult<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(|err| SamlError::Malformed(err.to_string()))?;
        if local_name(a.key.as_ref()) == name {
            let v = a
                .unescape_value()
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned().into());
            return Ok(Some(v.into_owned()));
        }
    }
    Ok(None)
}

fn own_tag(name: QName) -> String {
    local_name(name.as_ref()).to_string()
}

// ---------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------

/// Resolves the namespace URI of the document's root element, skipping any
/// XML declaration, comments, and whitespace. `Ok(None)` if the root's
/// prefix doesn't resolve to a bound `xmlns`, or the document never reaches
/// a start element.
fn resolve_root_namespace(xml: &[u8]) -> SamlResult<Option<String>> {
    let mut reader = NsReader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ResolveResult::Bound(ns), Event::Start(_) | Event::Empty(_)) => {
                return Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned()))
            }
            (_, Event::Start(_) | Event::Empty(_)) => return Ok(None),
            (_, Event::Eof) => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn read_assertion(xml: &[u8]) -> SamlResult<Assertion> {
    if resolve_root_namespace(xml)?.as_deref() != Some(NS_ASSERTION) {
        return Err(SamlError::Malformed(format!(
            "root element is not <Assertion> in the '{NS_ASSERTION}' namespace"
        )));
    }

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let root = loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(e.name().as_ref()) == "Assertion" => break e.to_owned(),
            Event::Eof => return Err(SamlError::Malformed("no Assertion root element found".into())),
            _ => {}
        }
        buf.clear();
    };
    buf.clear();

    let mut assertion = Assertion::new(String::new());
    assertion.id = attr(&root, "ID")?.unwrap_or_default();
    assertion.issue_instant = attr(&root, "IssueInstant")?
        .map(|s| xsd_datetime(&s))
        .transpose()?
        .unwrap_or_else(Utc::now);

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(e) => {
                let tag = own_tag(e.name());
                match tag.as_str() {
                    "Issuer" => {
                        assertion.issuer = reader.read_text(e.name())?.trim().to_string();
                    }
                    "Subject" => {
                        assertion.subject = Some(read_subject(&mut reader)?);
                    }
                    "Conditions" => {
                        assertion.conditions = Some(read_conditions(&mut reader, &e)?);
                    }
                    "Advice" => {
                        let raw = reader.read_text(e.name())?;
                        assertion.advice = Some(raw.trim().to_string());
                    }
                    "Signature" => {
                        assertion.signature = Some(read_signature(&mut reader)?);
                    }
                    "AttributeStatement" => {
                        assertion
                            .statements
                            .push(Statement::Attribute(read_attribute_statement(&mut reader)?));
                    }
                    "AuthnStatement" => {
                        assertion
                            .statements
                            .push(Statement::Authentication(read_authn_statement(&mut reader, &e)?));
                    }
                    "AuthzDecisionStatement" => {
                        assertion.statements.push(Statement::AuthorizationDecision(
                            read_authz_decision_statement(&mut reader, &e)?,
                        ));
                    }
                    other => {
                        let name = other.to_string();
                        let raw = reader.read_text(e.name()).unwrap_or_default();
                        assertion
                            .statements
                            .push(Statement::Unknown { raw_xml: format!("<{name}>{raw}</{name}>") });
                    }
                }
            }
            Event::Empty(e) => {
                let tag = own_tag(e.name());
                if tag == "Issuer" {
                    assertion.issuer = String::new();
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == "Assertion" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF while parsing Assertion".into())),
            _ => {}
        }
        buf.clear();
    }

    if assertion.issuer.trim().is_empty() {
        return Err(SamlError::Malformed("Assertion is missing a non-empty Issuer".into()));
    }

    Ok(assertion)
}

fn read_subject(reader: &mut Reader<&[u8]>) -> SamlResult<Subject> {
    let mut subject = Subject::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "NameID" => {
                subject.name_id = Some(read_name_id(reader, &e)?);
            }
            Event::Empty(e) if own_tag(e.name()) == "NameID" => {
                subject.name_id = Some(NameId {
                    value: String::new(),
                    format: attr(&e, "Format")?,
                    name_qualifier: attr(&e, "NameQualifier")?,
                    sp_name_qualifier: attr(&e, "SPNameQualifier")?,
                    sp_provided_id: attr(&e, "SPProvidedID")?,
                });
            }
            Event::Start(e) if own_tag(e.name()) == "SubjectConfirmation" => {
                subject.subject_confirmations.push(read_subject_confirmation(reader, &e)?);
            }
            Event::End(e) if own_tag(e.name()) == "Subject" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in Subject".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(subject)
}

fn read_name_id(reader: &mut Reader<&[u8]>, start: &BytesStart) -> SamlResult<NameId> {
    let format = attr(start, "Format")?;
    let name_qualifier = attr(start, "NameQualifier")?;
    let sp_name_qualifier = attr(start, "SPNameQualifier")?;
    let sp_provided_id = attr(start, "SPProvidedID")?;
    let value = reader.read_text(start.name()).unwrap_or_default().trim().to_string();
    Ok(NameId { value, format, name_qualifier, sp_name_qualifier, sp_provided_id })
}

fn read_subject_confirmation(reader: &mut Reader<&[u8]>, start: &BytesStart) -> SamlResult<SubjectConfirmation> {
    let method = attr(start, "Method")?.unwrap_or_default();
    let mut confirmation_data = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if own_tag(e.name()) == "SubjectConfirmationData" => {
                confirmation_data = Some(read_subject_confirmation_data(&e)?);
            }
            Event::Start(e) if own_tag(e.name()) == "SubjectConfirmationData" => {
                confirmation_data = Some(read_subject_confirmation_data(&e)?);
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if own_tag(e.name()) == "SubjectConfirmation" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in SubjectConfirmation".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(SubjectConfirmation { method, confirmation_data })
}

fn read_subject_confirmation_data(start: &BytesStart) -> SamlResult<SubjectConfirmationData> {
    let not_before = attr(start, "NotBefore")?.map(|s| xsd_datetime(&s)).transpose()?;
    let not_on_or_after = attr(start, "NotOnOrAfter")?.map(|s| xsd_datetime(&s)).transpose()?;
    let recipient = attr(start, "Recipient")?;
    let in_response_to = attr(start, "InResponseTo")?;
    Ok(SubjectConfirmationData { not_before, not_on_or_after, recipient, in_response_to })
}

fn read_conditions(reader: &mut Reader<&[u8]>, start: &BytesStart) -> SamlResult<Conditions> {
    let not_before = attr(start, "NotBefore")?.map(|s| xsd_datetime(&s)).transpose()?;
    let not_on_or_after = attr(start, "NotOnOrAfter")?.map(|s| xsd_datetime(&s)).transpose()?;
    let mut conditions = Conditions { not_before, not_on_or_after, ..Default::default() };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "AudienceRestriction" => {
                conditions.audience_restrictions.push(read_audience_restriction(reader)?);
            }
            Event::Start(e) | Event::Empty(e) if own_tag(e.name()) == "OneTimeUse" => {
                conditions.one_time_use = true;
            }
            Event::Start(e) if own_tag(e.name()) == "ProxyRestriction" => {
                conditions.proxy_restriction = Some(read_proxy_restriction(reader, &e)?);
            }
            Event::End(e) if own_tag(e.name()) == "Conditions" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in Conditions".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(conditions)
}

fn read_audience_restriction(reader: &mut Reader<&[u8]>) -> SamlResult<AudienceRestriction> {
    let mut audiences = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "Audience" => {
                audiences.push(reader.read_text(e.name())?.trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "AudienceRestriction" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in AudienceRestriction".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(AudienceRestriction { audiences })
}

fn read_proxy_restriction(reader: &mut Reader<&[u8]>, start: &BytesStart) -> SamlResult<ProxyRestriction> {
    let count = attr(start, "Count")?.and_then(|s| s.parse().ok());
    let mut audiences = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "Audience" => {
                audiences.push(reader.read_text(e.name())?.trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "ProxyRestriction" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in ProxyRestriction".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(ProxyRestriction { count, audiences })
}

fn read_attribute_statement(reader: &mut Reader<&[u8]>) -> SamlResult<AttributeStatement> {
    let mut attributes = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "Attribute" => {
                attributes.push(read_attribute(reader, &e)?);
            }
            Event::End(e) if own_tag(e.name()) == "AttributeStatement" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in AttributeStatement".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(AttributeStatement { attributes })
}

fn read_attribute(reader: &mut Reader<&[u8]>, start: &BytesStart) -> SamlResult<Attribute> {
    let name = attr(start, "Name")?.unwrap_or_default();
    let name_format = attr(start, "NameFormat")?;
    let friendly_name = attr(start, "FriendlyName")?;
    let original_issuer = attr(start, "OriginalIssuer")?;
    let mut xsi_type = None;
    let mut values = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "AttributeValue" => {
                if xsi_type.is_none() {
                    xsi_type = attr(&e, "type")?;
                }
                values.push(reader.read_text(e.name())?.trim().to_string());
            }
            Event::Empty(e) if own_tag(e.name()) == "AttributeValue" => {
                if xsi_type.is_none() {
                    xsi_type = attr(&e, "type")?;
                }
                values.push(String::new());
            }
            Event::End(e) if own_tag(e.name()) == "Attribute" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in Attribute".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(Attribute { name, name_format, friendly_name, xsi_type, original_issuer, values })
}

fn read_attribute_standalone(xml: &[u8]) -> SamlResult<Attribute> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "Attribute" => {
                let start = e.to_owned();
                return read_attribute(&mut reader, &start);
            }
            Event::Eof => return Err(SamlError::Malformed("no Attribute element found".into())),
            _ => {}
        }
        buf.clear();
    }
}

fn read_authn_statement(reader: &mut Reader<&[u8]>, start: &BytesStart) -> SamlResult<AuthenticationStatement> {
    let instant = attr(start, "AuthnInstant")?
        .ok_or_else(|| SamlError::Malformed("AuthnStatement missing AuthnInstant".into()))
        .and_then(|s| xsd_datetime(&s))?;
    let session_index = attr(start, "SessionIndex")?;
    let session_not_on_or_after = attr(start, "SessionNotOnOrAfter")?.map(|s| xsd_datetime(&s)).transpose()?;

    let mut context = AuthnContext::default();
    let mut subject_locality = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "AuthnContext" => {
                context = read_authn_context(reader)?;
            }
            Event::Start(e) | Event::Empty(e) if own_tag(e.name()) == "SubjectLocality" => {
                let address = attr(&e, "Address")?.unwrap_or_default();
                let dns = attr(&e, "DNSName")?.unwrap_or_default();
                subject_locality = Some(format!("{address} {dns}").trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "AuthnStatement" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in AuthnStatement".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(AuthenticationStatement { context, instant, session_index, subject_locality, session_not_on_or_after })
}

fn read_authn_context(reader: &mut Reader<&[u8]>) -> SamlResult<AuthnContext> {
    let mut context = AuthnContext::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "AuthnContextClassRef" => {
                context.class_reference = Some(reader.read_text(e.name())?.trim().to_string());
            }
            Event::Start(e) if own_tag(e.name()) == "AuthnContextDeclRef" => {
                context.declaration_reference = Some(reader.read_text(e.name())?.trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "AuthnContext" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in AuthnContext".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(context)
}

fn read_authz_decision_statement(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
) -> SamlResult<AuthorizationDecisionStatement> {
    let resource = attr(start, "Resource")?.unwrap_or_default();
    let decision = attr(start, "Decision")?.unwrap_or_default();
    let mut actions = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "Action" => {
                actions.push(reader.read_text(e.name())?.trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "AuthzDecisionStatement" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in AuthzDecisionStatement".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(AuthorizationDecisionStatement { resource, decision, actions })
}

fn read_signature(reader: &mut Reader<&[u8]>) -> SamlResult<Signature> {
    let mut signed_info = SignedInfo::default();
    let mut key_info = None;
    let mut signature_value = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "SignedInfo" => {
                signed_info = read_signed_info(reader)?;
            }
            Event::Start(e) if own_tag(e.name()) == "SignatureValue" => {
                let text = reader.read_text(e.name())?;
                signature_value = STANDARD
                    .decode(text.trim())
                    .map_err(|e| SamlError::Malformed(format!("invalid SignatureValue base64: {e}")))?;
            }
            Event::Start(e) if own_tag(e.name()) == "KeyInfo" => {
                key_info = Some(read_key_info(reader)?);
            }
            Event::End(e) if own_tag(e.name()) == "Signature" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in Signature".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(Signature { signed_info, key_info, signature_value })
}

fn read_signed_info(reader: &mut Reader<&[u8]>) -> SamlResult<SignedInfo> {
    let mut signed_info = SignedInfo::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if own_tag(e.name()) == "CanonicalizationMethod" => {
                signed_info.canonicalization_method = attr(&e, "Algorithm")?;
            }
            Event::Start(e) | Event::Empty(e) if own_tag(e.name()) == "SignatureMethod" => {
                signed_info.signature_method = attr(&e, "Algorithm")?;
            }
            Event::Start(e) | Event::Empty(e) if own_tag(e.name()) == "Transform" => {
                if let Some(alg) = attr(&e, "Algorithm")? {
                    signed_info.transforms.push(alg);
                }
            }
            Event::Start(e) if own_tag(e.name()) == "DigestValue" => {
                signed_info.digest_value = Some(reader.read_text(e.name())?.trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "SignedInfo" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in SignedInfo".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(signed_info)
}

fn read_key_info(reader: &mut Reader<&[u8]>) -> SamlResult<KeyInfo> {
    let mut kid = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if own_tag(e.name()) == "KeyName" => {
                kid = Some(reader.read_text(e.name())?.trim().to_string());
            }
            Event::End(e) if own_tag(e.name()) == "KeyInfo" => break,
            Event::Eof => return Err(SamlError::Malformed("unexpected EOF in KeyInfo".into())),
            _ => {}
        }
        buf.clear();
    }
    Ok(KeyInfo { kid })
}

// ---------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------

fn write_assertion(assertion: &Assertion) -> SamlResult<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("saml:Assertion");
    root.push_attribute(("xmlns:saml", NS_ASSERTION));
    root.push_attribute(("xmlns:ds", NS_DSIG));
    root.push_attribute(("Version", "2.0"));
    root.push_attribute(("ID", assertion.id.as_str()));
    root.push_attribute(("IssueInstant", format_xsd_datetime(&assertion.issue_instant).as_str()));
    writer.write_event(Event::Start(root))?;

    write_text_element(&mut writer, "saml:Issuer", &assertion.issuer)?;

    if let Some(subject) = &assertion.subject {
        write_subject(&mut writer, subject)?;
    }
    if let Some(conditions) = &assertion.conditions {
        write_conditions(&mut writer, conditions)?;
    }
    if let Some(advice) = &assertion.advice {
        write_text_element(&mut writer, "saml:Advice", advice)?;
    }
    for statement in &assertion.statements {
        write_statement(&mut writer, statement)?;
    }
    if let Some(signature) = &assertion.signature {
        write_signature(&mut writer, signature)?;
    }

    writer.write_event(Event::End(BytesEnd::new("saml:Assertion")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> SamlResult<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_subject(writer: &mut Writer<Cursor<Vec<u8>>>, subject: &Subject) -> SamlResult<()> {
    writer.write_event(Event::Start(BytesStart::new("saml:Subject")))?;
    if let Some(name_id) = &subject.name_id {
        write_name_id(writer, name_id)?;
    }
    for confirmation in &subject.subject_confirmations {
        write_subject_confirmation(writer, confirmation)?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:Subject")))?;
    Ok(())
}

fn write_name_id(writer: &mut Writer<Cursor<Vec<u8>>>, name_id: &NameId) -> SamlResult<()> {
    let mut el = BytesStart::new("saml:NameID");
    if let Some(format) = &name_id.format {
        el.push_attribute(("Format", format.as_str()));
    }
    if let Some(nq) = &name_id.name_qualifier {
        el.push_attribute(("NameQualifier", nq.as_str()));
    }
    if let Some(spnq) = &name_id.sp_name_qualifier {
        el.push_attribute(("SPNameQualifier", spnq.as_str()));
    }
    if let Some(spid) = &name_id.sp_provided_id {
        el.push_attribute(("SPProvidedID", spid.as_str()));
    }
    writer.write_event(Event::Start(el))?;
    writer.write_event(Event::Text(BytesText::new(&name_id.value)))?;
    writer.write_event(Event::End(BytesEnd::new("saml:NameID")))?;
    Ok(())
}

fn write_subject_confirmation(writer: &mut Writer<Cursor<Vec<u8>>>, confirmation: &SubjectConfirmation) -> SamlResult<()> {
    let mut el = BytesStart::new("saml:SubjectConfirmation");
    el.push_attribute(("Method", confirmation.method.as_str()));
    writer.write_event(Event::Start(el))?;
    if let Some(data) = &confirmation.confirmation_data {
        let mut data_el = BytesStart::new("saml:SubjectConfirmationData");
        if let Some(nb) = &data.not_before {
            data_el.push_attribute(("NotBefore", format_xsd_datetime(nb).as_str()));
        }
        if let Some(noa) = &data.not_on_or_after {
            data_el.push_attribute(("NotOnOrAfter", format_xsd_datetime(noa).as_str()));
        }
        if let Some(r) = &data.recipient {
            data_el.push_attribute(("Recipient", r.as_str()));
        }
        if let Some(irt) = &data.in_response_to {
            data_el.push_attribute(("InResponseTo", irt.as_str()));
        }
        writer.write_event(Event::Empty(data_el))?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:SubjectConfirmation")))?;
    Ok(())
}

fn write_conditions(writer: &mut Writer<Cursor<Vec<u8>>>, conditions: &Conditions) -> SamlResult<()> {
    let mut el = BytesStart::new("saml:Conditions");
    if let Some(nb) = &conditions.not_before {
        el.push_attribute(("NotBefore", format_xsd_datetime(nb).as_str()));
    }
    if let Some(noa) = &conditions.not_on_or_after {
        el.push_attribute(("NotOnOrAfter", format_xsd_datetime(noa).as_str()));
    }
    writer.write_event(Event::Start(el))?;
    for restriction in &conditions.audience_restrictions {
        writer.write_event(Event::Start(BytesStart::new("saml:AudienceRestriction")))?;
        for audience in &restriction.audiences {
            write_text_element(writer, "saml:Audience", audience)?;
        }
        writer.write_event(Event::End(BytesEnd::new("saml:AudienceRestriction")))?;
    }
    if conditions.one_time_use {
        writer.write_event(Event::Empty(BytesStart::new("saml:OneTimeUse")))?;
    }
    if let Some(proxy) = &conditions.proxy_restriction {
        let mut proxy_el = BytesStart::new("saml:ProxyRestriction");
        if let Some(count) = proxy.count {
            proxy_el.push_attribute(("Count", count.to_string().as_str()));
        }
        writer.write_event(Event::Start(proxy_el))?;
        for audience in &proxy.audiences {
            write_text_element(writer, "saml:Audience", audience)?;
        }
        writer.write_event(Event::End(BytesEnd::new("saml:ProxyRestriction")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:Conditions")))?;
    Ok(())
}

fn write_statement(writer: &mut Writer<Cursor<Vec<u8>>>, statement: &Statement) -> SamlResult<()> {
    match statement {
        Statement::Attribute(stmt) => write_attribute_statement(writer, stmt),
        Statement::Authentication(stmt) => write_authn_statement(writer, stmt),
        Statement::AuthorizationDecision(stmt) => write_authz_decision_statement(writer, stmt),
        Statement::Unknown { raw_xml } => {
            writer.write_event(Event::Text(BytesText::from_escaped(raw_xml.as_str())))?;
            Ok(())
        }
    }
}

fn write_attribute_statement(writer: &mut Writer<Cursor<Vec<u8>>>, stmt: &AttributeStatement) -> SamlResult<()> {
    writer.write_event(Event::Start(BytesStart::new("saml:AttributeStatement")))?;
    for attribute in &stmt.attributes {
        write_attribute_el(writer, attribute)?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:AttributeStatement")))?;
    Ok(())
}

fn write_attribute_el(writer: &mut Writer<Cursor<Vec<u8>>>, attribute: &Attribute) -> SamlResult<()> {
    let mut el = BytesStart::new("saml:Attribute");
    el.push_attribute(("Name", attribute.name.as_str()));
    if let Some(nf) = &attribute.name_format {
        el.push_attribute(("NameFormat", nf.as_str()));
    }
    if let Some(fname) = &attribute.friendly_name {
        el.push_attribute(("FriendlyName", fname.as_str()));
    }
    if let Some(oi) = &attribute.original_issuer {
        el.push_attribute(("OriginalIssuer", oi.as_str()));
    }
    writer.write_event(Event::Start(el))?;
    for value in &attribute.values {
        let mut value_el = BytesStart::new("saml:AttributeValue");
        if let Some(xsi_type) = &attribute.xsi_type {
            value_el.push_attribute(("xsi:type", xsi_type.as_str()));
        }
        writer.write_event(Event::Start(value_el))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("saml:AttributeValue")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:Attribute")))?;
    Ok(())
}

fn write_authn_statement(writer: &mut Writer<Cursor<Vec<u8>>>, stmt: &AuthenticationStatement) -> SamlResult<()> {
    let mut el = BytesStart::new("saml:AuthnStatement");
    el.push_attribute(("AuthnInstant", format_xsd_datetime(&stmt.instant).as_str()));
    if let Some(si) = &stmt.session_index {
        el.push_attribute(("SessionIndex", si.as_str()));
    }
    if let Some(snoa) = &stmt.session_not_on_or_after {
        el.push_attribute(("SessionNotOnOrAfter", format_xsd_datetime(snoa).as_str()));
    }
    writer.write_event(Event::Start(el))?;

    writer.write_event(Event::Start(BytesStart::new("saml:AuthnContext")))?;
    if let Some(class_ref) = &stmt.context.class_reference {
        write_text_element(writer, "saml:AuthnContextClassRef", class_ref)?;
    }
    if let Some(decl_ref) = &stmt.context.declaration_reference {
        write_text_element(writer, "saml:AuthnContextDeclRef", decl_ref)?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:AuthnContext")))?;

    writer.write_event(Event::End(BytesEnd::new("saml:AuthnStatement")))?;
    Ok(())
}

fn write_authz_decision_statement(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    stmt: &AuthorizationDecisionStatement,
) -> SamlResult<()> {
    let mut el = BytesStart::new("saml:AuthzDecisionStatement");
    el.push_attribute(("Resource", stmt.resource.as_str()));
    el.push_attribute(("Decision", stmt.decision.as_str()));
    writer.write_event(Event::Start(el))?;
    for action in &stmt.actions {
        write_text_element(writer, "saml:Action", action)?;
    }
    writer.write_event(Event::End(BytesEnd::new("saml:AuthzDecisionStatement")))?;
    Ok(())
}

fn write_signature(writer: &mut Writer<Cursor<Vec<u8>>>, signature: &Signature) -> SamlResult<()> {
    writer.write_event(Event::Start(BytesStart::new("ds:Signature")))?;

    writer.write_event(Event::Start(BytesStart::new("ds:SignedInfo")))?;
    if let Some(method) = &signature.signed_info.canonicalization_method {
        let mut el = BytesStart::new("ds:CanonicalizationMethod");
        el.push_attribute(("Algorithm", method.as_str()));
        writer.write_event(Event::Empty(el))?;
    }
    if let Some(method) = &signature.signed_info.signature_method {
        let mut el = BytesStart::new("ds:SignatureMethod");
        el.push_attribute(("Algorithm", method.as_str()));
        writer.write_event(Event::Empty(el))?;
    }
    for transform in &signature.signed_info.transforms {
        let mut el = BytesStart::new("ds:Transform");
        el.push_attribute(("Algorithm", transform.as_str()));
        writer.write_event(Event::Empty(el))?;
    }
    if let Some(digest) = &signature.signed_info.digest_value {
        write_text_element(writer, "ds:DigestValue", digest)?;
    }
    writer.write_event(Event::End(BytesEnd::new("ds:SignedInfo")))?;

    write_text_element(writer, "ds:SignatureValue", &STANDARD.encode(&signature.signature_value))?;

    if let Some(key_info) = &signature.key_info {
        writer.write_event(Event::Start(BytesStart::new("ds:KeyInfo")))?;
        if let Some(kid) = &key_info.kid {
            write_text_element(writer, "ds:KeyName", kid)?;
        }
        writer.write_event(Event::End(BytesEnd::new("ds:KeyInfo")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("ds:Signature")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assertion() -> Assertion {
        let mut assertion = Assertion::new("https://idp.example/");
        assertion.subject = Some(Subject {
            name_id: Some(NameId::new("alice")),
            subject_confirmations: vec![SubjectConfirmation::bearer()],
        });
        assertion.conditions = Some(Conditions {
            not_before: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            not_on_or_after: Some("2024-01-01T01:00:00Z".parse().unwrap()),
            audience_restrictions: vec![AudienceRestriction { audiences: vec!["urn:rp:test".into()] }],
            ..Default::default()
        });
        assertion.statements.push(Statement::Attribute(AttributeStatement {
            attributes: vec![Attribute {
                name: "email".into(),
                name_format: None,
                friendly_name: None,
                xsi_type: None,
                original_issuer: None,
                values: vec!["alice@example".into()],
            }],
        }));
        assertion
    }

    #[test]
    fn round_trips_through_write_and_read() {
        let serializer = DefaultSaml2Serializer;
        let assertion = sample_assertion();
        let xml = serializer.write_assertion(&assertion).unwrap();
        let parsed = serializer.read_assertion(&xml).unwrap();

        assert_eq!(parsed.issuer, "https://idp.example/");
        assert_eq!(parsed.subject.unwrap().name_id.unwrap().value, "alice");
        let conditions = parsed.conditions.unwrap();
        assert_eq!(conditions.audience_restrictions[0].audiences, vec!["urn:rp:test"]);
        match &parsed.statements[0] {
            Statement::Attribute(stmt) => {
                assert_eq!(stmt.attributes[0].name, "email");
                assert_eq!(stmt.attributes[0].values, vec!["alice@example"]);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_issuer() {
        let xml = br#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"></saml:Assertion>"#;
        let err = DefaultSaml2Serializer.read_assertion(xml).unwrap_err();
        assert!(matches!(err, SamlError::Malformed(_)));
    }

    #[test]
    fn rejects_assertion_in_foreign_namespace() {
        let xml = br#"<Assertion xmlns="urn:some:other:ns"><Issuer>https://idp.example/</Issuer></Assertion>"#;
        let err = DefaultSaml2Serializer.read_assertion(xml).unwrap_err();
        assert!(matches!(err, SamlError::Malformed(_)));
    }
}
