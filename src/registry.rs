//! Server Registry (§4.A): looks up a known MediaServer by friendly
//! name against the current discovery snapshot.

use crate::content_directory::UpnpContentDirectory;
use crate::discovery::DeviceDirectory;
use crate::error::DbError;

pub struct ServerRegistry<'a> {
    directory: &'a DeviceDirectory,
}

impl<'a> ServerRegistry<'a> {
    pub fn new(directory: &'a DeviceDirectory) -> Self {
        ServerRegistry { directory }
    }

    /// Exact, case-sensitive, byte-exact match (§4.A). Fails
    /// *not-found* if no live server matches.
    pub fn get_server(&self, name: &str) -> Result<&'a UpnpContentDirectory, DbError> {
        self.directory
            .get_server(name)
            .ok_or_else(|| DbError::not_found(format!("no such server: {name:?}")))
    }

    /// The current snapshot, in discovery order (§4.A). Callers must
    /// not assume stability across calls.
    pub fn get_directories(&self) -> impl Iterator<Item = &'a UpnpContentDirectory> {
        self.directory.get_directories()
    }
}
