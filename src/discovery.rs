//! SSDP M-SEARCH discovery of UPnP MediaServers (§4.I), and the
//! `DeviceDirectory` wrapper (§4.A/§6) the facade drives between `Open`
//! and `Close`.
//!
//! The control point never binds the well-known port 1900: that port
//! belongs to a would-be SSDP *server* (a device answering M-SEARCH).
//! A control point only sends M-SEARCH from an ephemeral port and
//! listens for unicast HTTP/200 replies on that same socket: if both a
//! client and a server bound 1900 on the same host, the kernel would
//! load-balance incoming datagrams between the two sockets and the
//! client would lose replies at random.

use std::collections::HashMap;
use std::io::BufReader;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, trace, warn};
use xmltree::Element;

use crate::content_directory::{ContentDirectoryService, UpnpContentDirectory};
use crate::error::{DbError, TransportError};
use crate::soap::DEFAULT_HTTP_TIMEOUT;

const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";
const SSDP_PORT: u16 = 1900;
const MEDIA_SERVER_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:MediaServer:1";
const CONTENT_DIRECTORY_SERVICE_TYPE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";

/// One MediaServer found by SSDP, with its ContentDirectory endpoint
/// already resolved from the device description document.
pub struct SsdpMediaServer {
    pub friendly_name: String,
    pub udn: String,
    pub content_directory_control_url: String,
}

/// Sends one M-SEARCH round and returns every MediaServer that replied
/// and exposes a ContentDirectory service, blocking for up to `timeout`.
pub fn discover_media_servers(
    interface: Option<&str>,
    timeout: Duration,
) -> Result<Vec<SsdpMediaServer>, TransportError> {
    let socket = bind_client_socket(interface)?;
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .map_err(TransportError::Io)?;

    send_msearch(&socket)?;

    let deadline = Instant::now() + timeout;
    let mut locations: HashMap<String, String> = HashMap::new(); // USN -> LOCATION
    let mut buf = [0u8; 8192];

    while Instant::now() < deadline {
        match socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                let data = String::from_utf8_lossy(&buf[..n]);
                if let Some((usn, location)) = parse_search_response(&data) {
                    trace!(%from, %usn, %location, "ssdp search response");
                    locations.entry(usn).or_insert(location);
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    let mut servers = Vec::new();
    for location in locations.into_values() {
        match fetch_description(&location) {
            Ok(Some(server)) => servers.push(server),
            Ok(None) => debug!(%location, "device has no ContentDirectory service, skipping"),
            Err(err) => warn!(%location, error = %err, "failed to fetch device description"),
        }
    }

    Ok(servers)
}

fn bind_client_socket(interface: Option<&str>) -> Result<UdpSocket, TransportError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(TransportError::Io)?;
    socket.set_reuse_address(true).map_err(TransportError::Io)?;

    let bind_ip = match interface {
        Some(name) => resolve_interface_address(name)?,
        None => Ipv4Addr::UNSPECIFIED,
    };
    let bind_addr = SocketAddr::from((bind_ip, 0));
    socket.bind(&bind_addr.into()).map_err(TransportError::Io)?;

    if let Some(name) = interface {
        debug!(interface = %name, address = %bind_ip, "bound SSDP client to named interface");
    }

    Ok(socket.into())
}

/// Resolves a configured interface name (e.g. `"eth0"`, `"en0"`) to its
/// first non-loopback IPv4 address, the way the teacher's SSDP client
/// enumerates interfaces with `get_if_addrs` (§6 `interface` option).
fn resolve_interface_address(name: &str) -> Result<Ipv4Addr, TransportError> {
    let interfaces = get_if_addrs::get_if_addrs().map_err(TransportError::Io)?;
    interfaces
        .into_iter()
        .find(|iface| iface.name == name)
        .and_then(|iface| match iface.addr {
            get_if_addrs::IfAddr::V4(v4) => Some(v4.ip),
            get_if_addrs::IfAddr::V6(_) => None,
        })
        .ok_or_else(|| TransportError::Discovery(format!("no IPv4 interface named {name:?}")))
}

fn send_msearch(socket: &UdpSocket) -> Result<(), TransportError> {
    let message = format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST_ADDR}:{SSDP_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: 2\r\n\
         ST: {MEDIA_SERVER_SEARCH_TARGET}\r\n\
         USER-AGENT: upnpdb SSDP client\r\n\
         \r\n"
    );

    let addr: SocketAddr = format!("{SSDP_MULTICAST_ADDR}:{SSDP_PORT}")
        .parse()
        .expect("valid multicast addr literal");

    socket
        .send_to(message.as_bytes(), addr)
        .map_err(TransportError::Io)?;
    Ok(())
}

fn parse_search_response(data: &str) -> Option<(String, String)> {
    let mut lines = data.lines();
    let status_line = lines.next()?.trim().to_ascii_uppercase();
    if !status_line.starts_with("HTTP/") || !status_line.contains(" 200") {
        return None;
    }

    let mut usn = None;
    let mut location = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        match name.trim().to_ascii_uppercase().as_str() {
            "USN" => usn = Some(value.trim().to_string()),
            "LOCATION" => location = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Some((usn?, location?))
}

fn fetch_description(location: &str) -> Result<Option<SsdpMediaServer>, TransportError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(DEFAULT_HTTP_TIMEOUT))
        .build()
        .into();

    let mut response = agent.get(location).call().map_err(|err| TransportError::Http {
        action: "GetDeviceDescription".to_string(),
        source: Box::new(err),
    })?;

    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|err| TransportError::Http {
            action: "GetDeviceDescription".to_string(),
            source: Box::new(err),
        })?;

    let root = Element::parse(BufReader::new(body.as_bytes())).map_err(|err| {
        TransportError::MalformedResponse {
            action: "GetDeviceDescription".to_string(),
            reason: err.to_string(),
        }
    })?;

    let device = find_descendant(&root, "device").ok_or_else(|| TransportError::MalformedResponse {
        action: "GetDeviceDescription".to_string(),
        reason: "missing <device> element".to_string(),
    })?;

    let friendly_name = text_of(device, "friendlyName").unwrap_or_else(|| "Unknown".to_string());
    let udn = text_of(device, "UDN").unwrap_or_default();

    let Some(service_list) = find_child(device, "serviceList") else {
        return Ok(None);
    };

    let control_url = service_list
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .filter(|e| e.name == "service")
        .find(|service| text_of(service, "serviceType").as_deref() == Some(CONTENT_DIRECTORY_SERVICE_TYPE))
        .and_then(|service| text_of(service, "controlURL"));

    let Some(control_url) = control_url else {
        return Ok(None);
    };

    let resolved = resolve_url(location, &control_url)?;

    Ok(Some(SsdpMediaServer {
        friendly_name,
        udn,
        content_directory_control_url: resolved,
    }))
}

fn resolve_url(base: &str, maybe_relative: &str) -> Result<String, TransportError> {
    let base_url = url::Url::parse(base).map_err(|err| TransportError::MalformedResponse {
        action: "GetDeviceDescription".to_string(),
        reason: format!("invalid device description URL {base}: {err}"),
    })?;
    let joined = base_url
        .join(maybe_relative)
        .map_err(|err| TransportError::MalformedResponse {
            action: "GetDeviceDescription".to_string(),
            reason: format!("invalid controlURL {maybe_relative}: {err}"),
        })?;
    Ok(joined.to_string())
}

fn find_child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .find(|e| e.name == name)
}

fn find_descendant<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    if parent.name == name {
        return Some(parent);
    }
    parent
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .find_map(|child| find_descendant(child, name))
}

fn text_of(parent: &Element, name: &str) -> Option<String> {
    find_child(parent, name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The discovery/device-directory snapshot the facade owns between
/// `Open` and `Close` (§3 Lifecycles, §6 `DeviceDirectory`).
pub struct DeviceDirectory {
    servers: Vec<UpnpContentDirectory>,
}

impl DeviceDirectory {
    /// Starts discovery: sends an M-SEARCH round and builds one
    /// `ContentDirectoryService` handle per responding MediaServer.
    /// Errors here are expected to propagate up through `Open`, which
    /// must release the UPnP client handle first (§7 resource-cleanup
    /// policy) — that release happens in the caller, since this type
    /// owns no other resource to release.
    pub fn start(interface: Option<&str>, discovery_timeout: Duration) -> Result<Self, DbError> {
        let found = discover_media_servers(interface, discovery_timeout)?;
        let servers = found
            .into_iter()
            .map(|s| UpnpContentDirectory::new(s.friendly_name, s.content_directory_control_url, DEFAULT_HTTP_TIMEOUT))
            .collect();
        Ok(DeviceDirectory { servers })
    }

    #[cfg(test)]
    pub(crate) fn from_servers(servers: Vec<UpnpContentDirectory>) -> Self {
        DeviceDirectory { servers }
    }

    /// `getServer(name)` (§4.A): exact, case-sensitive match on friendly name.
    pub fn get_server(&self, name: &str) -> Option<&UpnpContentDirectory> {
        self.servers.iter().find(|s| s.friendly_name() == name)
    }

    /// `getDirectories()` (§4.A): the current snapshot, in discovery order.
    pub fn get_directories(&self) -> impl Iterator<Item = &UpnpContentDirectory> {
        self.servers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_search_response() {
        let data = "HTTP/1.1 200 OK\r\n\
                     CACHE-CONTROL: max-age=1800\r\n\
                     LOCATION: http://192.168.1.5:8200/description.xml\r\n\
                     ST: urn:schemas-upnp-org:device:MediaServer:1\r\n\
                     USN: uuid:abc::urn:schemas-upnp-org:device:MediaServer:1\r\n\
                     \r\n";

        let (usn, location) = parse_search_response(data).unwrap();
        assert_eq!(usn, "uuid:abc::urn:schemas-upnp-org:device:MediaServer:1");
        assert_eq!(location, "http://192.168.1.5:8200/description.xml");
    }

    #[test]
    fn ignores_notify_and_msearch_messages() {
        assert!(parse_search_response("NOTIFY * HTTP/1.1\r\n\r\n").is_none());
        assert!(parse_search_response("M-SEARCH * HTTP/1.1\r\n\r\n").is_none());
    }

    #[test]
    fn resolves_relative_control_urls_against_the_description_location() {
        let resolved = resolve_url(
            "http://192.168.1.5:8200/description.xml",
            "/upnp/control/ContentDirectory1",
        )
        .unwrap();
        assert_eq!(resolved, "http://192.168.1.5:8200/upnp/control/ContentDirectory1");
    }

    #[test]
    fn unknown_interface_name_fails_instead_of_silently_using_the_default() {
        let err = resolve_interface_address("no-such-interface-xyz").unwrap_err();
        assert!(matches!(err, TransportError::Discovery(_)));
    }
}
