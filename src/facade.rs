//! Adapter Facade (§4.H): the database plugin the host actually talks
//! to. Owns the UPnP client/discovery session between `Open` and
//! `Close` and implements the uniform database contract.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::config::UpnpDatabaseConfig;
use crate::discovery::DeviceDirectory;
use crate::error::{DbError, DbResult};
use crate::host::{
    DatabaseSelection, DatabaseStats, DatabaseVisitorHelper, LightDirectory, LightSong, TagType, VisitCallbacks,
};
use crate::path;
use crate::registry::ServerRegistry;
use crate::song;
use crate::visitor;

/// The `upnp` database plugin. A plain struct with no internal locks:
/// the host's event loop guarantees single-threaded, re-entrant-free
/// access for the whole `Open`-to-`Close` session (§5).
pub struct UpnpDatabase {
    config: UpnpDatabaseConfig,
    directory: Option<DeviceDirectory>,
}

impl UpnpDatabase {
    pub fn new(config: UpnpDatabaseConfig) -> Self {
        UpnpDatabase {
            config,
            directory: None,
        }
    }

    /// Starts the UPnP client for the configured interface and runs
    /// the initial SSDP discovery round. On failure, no partial state
    /// remains (§3 Lifecycles).
    pub fn open(&mut self) -> DbResult<()> {
        let timeout = Duration::from_millis(self.config.discovery_timeout_ms);
        let directory = DeviceDirectory::start(self.config.interface.as_deref(), timeout)?;
        info!("upnp database opened");
        self.directory = Some(directory);
        Ok(())
    }

    /// Stops discovery and releases the client. Safe to call after a
    /// failed `Open` or a prior `Close` (idempotent).
    pub fn close(&mut self) {
        self.directory = None;
    }

    fn registry(&self) -> DbResult<ServerRegistry<'_>> {
        let directory = self
            .directory
            .as_ref()
            .ok_or_else(|| DbError::bad_resource("database is not open"))?;
        Ok(ServerRegistry::new(directory))
    }

    /// Splits `uri` at the first `/`; both server and tail must be
    /// non-empty. Resolves through the ID-Path Recognizer or Namei and
    /// wraps the result as a heap-owned song (§4.H `GetSong`).
    pub fn get_song(&self, uri: &str) -> DbResult<Box<LightSong>> {
        let (server_name, tail) = path::split_server_and_tail(uri);
        if server_name.is_empty() || tail.is_empty() {
            return Err(DbError::not_found(format!("incomplete song uri: {uri:?}")));
        }

        let registry = self.registry()?;
        let server = registry.get_server(server_name)?;

        let object = match path::recognize_id_path(tail) {
            Some(id) => path::get_metadata(server, id)?,
            None => path::namei(server, tail)?,
        };

        Ok(Box::new(song::materialize(uri.to_string(), &object)))
    }

    /// Destroys a record obtained from `get_song`. Ownership transfer
    /// is 1-1: nothing else may destroy it (§3 invariant 3).
    pub fn return_song(&self, song: Box<LightSong>) {
        drop(song);
    }

    /// Dispatches one visit request via the Visitor Engine, wrapping
    /// the song callback in the (pass-through) group/aggregate helper
    /// and committing it afterward (§4.H).
    pub fn visit(
        &self,
        selection: &DatabaseSelection,
        visit_directory: Option<&mut dyn FnMut(LightDirectory)>,
        visit_song: Option<&mut dyn FnMut(LightSong)>,
        visit_playlist: Option<&mut dyn FnMut(LightSong)>,
    ) -> DbResult<()> {
        let registry = self.registry()?;

        let mut helper_selection = selection.clone();
        helper_selection.uri.clear();
        helper_selection.filter = None;

        let mut helper = DatabaseVisitorHelper::new(&helper_selection, visit_song);
        let mut forward_to_helper = |song: LightSong| helper.emit_song(song);

        let mut callbacks = VisitCallbacks {
            visit_directory,
            visit_song: Some(&mut forward_to_helper),
            visit_playlist,
        };

        visitor::visit(&registry, selection, &mut callbacks)?;
        helper.commit();
        Ok(())
    }

    /// Drives repeated `Visit` calls and deduplicates tag values,
    /// since the host's own generic tag-collection helper lives
    /// outside this crate (§4.H `CollectUniqueTags`).
    pub fn collect_unique_tags(
        &self,
        selection: &DatabaseSelection,
        tag_types: &[TagType],
    ) -> DbResult<Vec<(TagType, Vec<String>)>> {
        let mut sets: Vec<(TagType, BTreeSet<String>)> =
            tag_types.iter().map(|&kind| (kind, BTreeSet::new())).collect();

        {
            let mut collect = |song: LightSong| {
                for (kind, values) in sets.iter_mut() {
                    if let Some(value) = song::tag_value(&song, *kind) {
                        values.insert(value.to_string());
                    }
                }
            };
            self.visit(selection, None, Some(&mut collect), None)?;
        }

        Ok(sets
            .into_iter()
            .map(|(kind, values)| (kind, values.into_iter().collect()))
            .collect())
    }

    /// Non-goal: statistics are never tracked; always a zeroed record.
    pub fn get_stats(&self, _selection: &DatabaseSelection) -> DbResult<DatabaseStats> {
        self.registry()?;
        Ok(DatabaseStats::default())
    }

    /// Non-goal: update timestamps are never tracked; always epoch-min.
    pub fn get_update_stamp(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
}

impl Drop for UpnpDatabase {
    fn drop(&mut self) {
        if self.directory.is_some() {
            warn!("upnp database dropped while still open; closing");
        }
    }
}

/// The plugin vtable the host's database registry loads (§6).
pub struct DatabasePlugin {
    pub name: &'static str,
    pub flags: u32,
}

pub const PLUGIN: DatabasePlugin = DatabasePlugin {
    name: "upnp",
    flags: 0,
};

/// Plugin factory: builds a new adapter bound to the given config
/// block. The host's I/O event loop is implicit — this adapter has no
/// handle to it beyond the blocking calls it makes on whichever thread
/// the host invokes it from (§5).
pub fn create_database(config: UpnpDatabaseConfig) -> UpnpDatabase {
    UpnpDatabase::new(config)
}
