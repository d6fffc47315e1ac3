//! Plugin configuration (§6). Loaded with `serde` + `toml`, mirroring
//! the teacher's config deserialization rather than inventing a
//! bespoke parser for a two-field block.

use serde::Deserialize;

fn default_discovery_timeout_ms() -> u64 {
    2000
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpnpDatabaseConfig {
    /// Local network interface name the UPnP client binds. Absent
    /// means the library default (all interfaces).
    #[serde(default)]
    pub interface: Option<String>,

    /// How long `Open` waits for SSDP M-SEARCH replies before
    /// building the initial server snapshot.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
}

impl Default for UpnpDatabaseConfig {
    fn default() -> Self {
        UpnpDatabaseConfig {
            interface: None,
            discovery_timeout_ms: default_discovery_timeout_ms(),
        }
    }
}

impl UpnpDatabaseConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
