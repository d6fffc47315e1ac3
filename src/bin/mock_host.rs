//! Manual smoke-test harness: stands in for the real media-player host
//! just enough to drive the `upnp` database plugin against whatever
//! MediaServers actually answer SSDP on the local network.
//!
//! Not part of the plugin contract (§6 CLI: none) — there is no stable
//! argument grammar here, just enough plumbing to eyeball a live
//! discovery + browse round-trip during development.

use std::env;

use tracing_subscriber::EnvFilter;
use upnpdb::{create_database, DatabaseSelection, LightDirectory, LightSong, UpnpDatabaseConfig};

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let uri = env::args().nth(1).unwrap_or_default();

    let config = UpnpDatabaseConfig {
        interface: env::var("MOCK_HOST_INTERFACE").ok(),
        ..UpnpDatabaseConfig::default()
    };

    let mut db = create_database(config);
    if let Err(err) = db.open() {
        eprintln!("open failed: {err}");
        std::process::exit(1);
    }

    let selection = DatabaseSelection {
        uri,
        recursive: false,
        filter: None,
    };

    let mut visit_directory = |dir: LightDirectory| println!("DIR  {}", dir.uri);
    let mut visit_song = |song: LightSong| println!("SONG {}  ->  {}", song.uri, song.real_uri);

    if let Err(err) = db.visit(&selection, Some(&mut visit_directory), Some(&mut visit_song), None) {
        eprintln!("visit failed: {err}");
        db.close();
        std::process::exit(1);
    }

    db.close();
}
