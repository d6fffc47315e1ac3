//! Minimal SOAP 1.1 request/response handling for UPnP action invocation.
//!
//! Builds request envelopes the way the teacher's [`build_soap_response`]
//! builds response ones (an `xmltree::Element` tree, serialized), and
//! parses replies the way its `parse_soap_envelope` does. Only as much
//! of the SOAP surface as Browse/Search/GetSearchCapabilities need.

use std::io::BufReader;
use std::time::Duration;

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::TransportError;

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Builds a SOAP request envelope for `<service_type>#<action>` with the
/// given ordered `(name, value)` arguments, matching the shape real
/// MediaServers expect:
///
/// ```xml
/// <s:Envelope ...><s:Body><u:Action xmlns:u="...">...</u:Action></s:Body></s:Envelope>
/// ```
pub fn build_action_request(service_type: &str, action: &str, args: &[(&str, &str)]) -> String {
    let mut action_elem = Element::new(&format!("u:{action}"));
    action_elem
        .attributes
        .insert("xmlns:u".to_string(), service_type.to_string());

    for (name, value) in args {
        let mut child = Element::new(name);
        if !value.is_empty() {
            child.children.push(XMLNode::Text(value.to_string()));
        }
        action_elem.children.push(XMLNode::Element(child));
    }

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(action_elem));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope.attributes.insert(
        "s:encodingStyle".to_string(),
        SOAP_ENCODING_NS.to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new().write_document_declaration(false);
    envelope
        .write_with_config(&mut buf, config)
        .expect("writing an in-memory xmltree buffer cannot fail");

    String::from_utf8(buf).expect("xmltree only ever emits UTF-8")
}

/// Outcome of one SOAP action call, still in XML-element form.
#[derive(Debug)]
pub struct ActionResponse {
    pub action: String,
    /// Output argument values, in document order.
    pub values: Vec<(String, String)>,
}

impl ActionResponse {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a raw HTTP response body into either a successful action
/// response or a typed transport error (SOAP Fault / malformed XML).
pub fn parse_action_response(action: &str, xml: &[u8]) -> Result<ActionResponse, TransportError> {
    let root = Element::parse(BufReader::new(xml)).map_err(|err| TransportError::MalformedResponse {
        action: action.to_string(),
        reason: err.to_string(),
    })?;

    if !root.name.ends_with("Envelope") {
        return Err(TransportError::MalformedResponse {
            action: action.to_string(),
            reason: "missing SOAP Envelope".to_string(),
        });
    }

    let body = find_child_by_suffix(&root, "Body").ok_or_else(|| TransportError::MalformedResponse {
        action: action.to_string(),
        reason: "missing SOAP Body".to_string(),
    })?;

    if let Some(fault) = find_child_by_suffix(body, "Fault") {
        return Err(parse_fault(action, fault));
    }

    let response_elem = body
        .children
        .iter()
        .find_map(|node| node.as_element())
        .ok_or_else(|| TransportError::MalformedResponse {
            action: action.to_string(),
            reason: "SOAP Body has no child element".to_string(),
        })?;

    let values = response_elem
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .map(|elem| (elem.name.clone(), elem.get_text().unwrap_or_default().to_string()))
        .collect();

    Ok(ActionResponse {
        action: action.to_string(),
        values,
    })
}

fn find_child_by_suffix<'a>(parent: &'a Element, suffix: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(elem) if elem.name.ends_with(suffix) => Some(elem),
        _ => None,
    })
}

fn parse_fault(action: &str, fault: &Element) -> TransportError {
    let upnp_error = find_child_by_suffix(fault, "detail")
        .and_then(|detail| find_child_by_suffix(detail, "UPnPError"));

    match upnp_error {
        Some(upnp_error) => {
            let code = find_child_by_suffix(upnp_error, "errorCode")
                .and_then(|e| e.get_text())
                .and_then(|t| t.trim().parse::<u32>().ok())
                .unwrap_or(0);
            let description = find_child_by_suffix(upnp_error, "errorDescription")
                .and_then(|e| e.get_text())
                .map(|t| t.trim().to_string())
                .unwrap_or_default();

            if code == error_codes::OPTIONAL_ACTION_NOT_IMPLEMENTED
                || code == error_codes::INVALID_ACTION
            {
                TransportError::NotSupported {
                    action: action.to_string(),
                }
            } else {
                TransportError::UpnpFault {
                    action: action.to_string(),
                    code,
                    description,
                }
            }
        }
        None => {
            let fault_string = find_child_by_suffix(fault, "faultstring")
                .and_then(|e| e.get_text())
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unknown SOAP fault".to_string());
            TransportError::MalformedResponse {
                action: action.to_string(),
                reason: fault_string,
            }
        }
    }
}

/// UPnP-standard SOAP error codes (UPnP DeviceSecurity spec, table 4.9.1).
pub mod error_codes {
    pub const INVALID_ACTION: u32 = 401;
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: u32 = 602;
}

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
