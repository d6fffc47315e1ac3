//! `ContentDirectoryService`: the per-MediaServer handle the rest of the
//! adapter talks to (§3, §4.B). The trait is the seam the distilled spec
//! describes as "external"; [`UpnpContentDirectory`] is this build's
//! concrete, SOAP-backed implementation of it (§4.I).

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;

use crate::error::TransportError;
use crate::model::DirContent;
use crate::{didl, soap};

/// Backend-agnostic handle to one MediaServer's ContentDirectory service.
pub trait ContentDirectoryService {
    fn friendly_name(&self) -> &str;
    fn read_dir(&self, object_id: &str) -> Result<DirContent, TransportError>;
    fn get_metadata(&self, object_id: &str) -> Result<DirContent, TransportError>;
    fn search(&self, object_id: &str, criteria: &str) -> Result<DirContent, TransportError>;
    fn search_capabilities(&self) -> Result<HashSet<String>, TransportError>;
}

const SERVICE_TYPE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

/// A MediaServer's ContentDirectory endpoint, reached over SOAP/HTTP.
#[derive(Clone, Debug)]
pub struct UpnpContentDirectory {
    friendly_name: String,
    control_url: String,
    agent: Agent,
}

impl UpnpContentDirectory {
    pub fn new(friendly_name: String, control_url: String, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();

        UpnpContentDirectory {
            friendly_name,
            control_url,
            agent: config.into(),
        }
    }

    fn invoke(&self, action: &str, args: &[(&str, &str)]) -> Result<soap::ActionResponse, TransportError> {
        let body = soap::build_action_request(SERVICE_TYPE, action, args);
        let soap_action_header = format!(r#""{SERVICE_TYPE}#{action}""#);

        let mut response = self
            .agent
            .post(&self.control_url)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("SOAPAction", &soap_action_header)
            .send(body)
            .map_err(|err| TransportError::Http {
                action: action.to_string(),
                source: Box::new(err),
            })?;

        let raw_body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| TransportError::Http {
                action: action.to_string(),
                source: Box::new(err),
            })?;

        soap::parse_action_response(action, raw_body.as_bytes())
    }

    fn browse(&self, object_id: &str, browse_flag: &str) -> Result<DirContent, TransportError> {
        let response = self.invoke(
            "Browse",
            &[
                ("ObjectID", object_id),
                ("BrowseFlag", browse_flag),
                ("Filter", "*"),
                ("StartingIndex", "0"),
                ("RequestedCount", "0"),
                ("SortCriteria", ""),
            ],
        )?;

        let payload = response.get("Result").unwrap_or_default();
        didl::parse_didl("Browse", payload)
    }
}

impl ContentDirectoryService for UpnpContentDirectory {
    fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn read_dir(&self, object_id: &str) -> Result<DirContent, TransportError> {
        self.browse(object_id, "BrowseDirectChildren")
    }

    fn get_metadata(&self, object_id: &str) -> Result<DirContent, TransportError> {
        self.browse(object_id, "BrowseMetadata")
    }

    fn search(&self, object_id: &str, criteria: &str) -> Result<DirContent, TransportError> {
        let response = match self.invoke(
            "Search",
            &[
                ("ContainerID", object_id),
                ("SearchCriteria", criteria),
                ("Filter", "*"),
                ("StartingIndex", "0"),
                ("RequestedCount", "0"),
                ("SortCriteria", ""),
            ],
        ) {
            Ok(response) => response,
            Err(TransportError::NotSupported { .. }) => {
                debug!(server = %self.friendly_name, "Search not supported despite advertised capabilities");
                return Ok(DirContent::default());
            }
            Err(err) => return Err(err),
        };

        let payload = response.get("Result").unwrap_or_default();
        didl::parse_didl("Search", payload)
    }

    fn search_capabilities(&self) -> Result<HashSet<String>, TransportError> {
        match self.invoke("GetSearchCapabilities", &[]) {
            Ok(response) => {
                let raw = response.get("SearchCaps").unwrap_or_default();
                let caps = raw
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect();
                Ok(caps)
            }
            Err(TransportError::NotSupported { .. }) => {
                debug!(server = %self.friendly_name, "GetSearchCapabilities not supported");
                Ok(HashSet::new())
            }
            Err(err) => {
                warn!(server = %self.friendly_name, error = %err, "GetSearchCapabilities failed");
                Ok(HashSet::new())
            }
        }
    }
}
