//! Read-only UPnP/AV ContentDirectory database adapter.
//!
//! Exposes zero or more UPnP MediaServers discovered on the local
//! network as a single hierarchical music library: browse containers,
//! search by tag, and resolve items to streamable URLs, behind the
//! same visit/get-song/collect-tags contract a local-filesystem
//! database plugin would implement.

pub mod config;
pub mod content_directory;
pub mod didl;
pub mod discovery;
pub mod error;
pub mod facade;
pub mod host;
pub mod model;
pub mod path;
pub mod registry;
pub mod search;
pub mod soap;
pub mod song;
pub mod visitor;

pub use config::UpnpDatabaseConfig;
pub use error::{DbError, DbResult};
pub use facade::{create_database, UpnpDatabase, DatabasePlugin, PLUGIN};
pub use host::{
    DatabaseSelection, DatabaseStats, FilterItem, LightDirectory, LightSong, SongFilter, TagSongFilter, TagType,
    VisitCallbacks,
};
