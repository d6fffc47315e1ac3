//! Visitor Engine (§4.F): classifies a request's tail and dispatches
//! across multi-server, ID-path, and name-path modes, firing the
//! host's visit callbacks.

use crate::content_directory::ContentDirectoryService;
use crate::error::DbError;
use crate::host::{build_path, DatabaseSelection, LightDirectory, LightSong, SongFilter, VisitCallbacks};
use crate::model::{DirObject, ItemClass, ObjectType};
use crate::path::{self, ROOT_SENTINEL};
use crate::registry::ServerRegistry;
use crate::search;
use crate::song;

pub fn visit(
    registry: &ServerRegistry,
    selection: &DatabaseSelection,
    callbacks: &mut VisitCallbacks<'_, '_, '_>,
) -> Result<(), DbError> {
    visit_uri(
        registry,
        &selection.uri,
        selection.recursive,
        selection.filter.as_ref(),
        callbacks,
    )
}

fn visit_uri(
    registry: &ServerRegistry,
    uri: &str,
    recursive: bool,
    filter: Option<&SongFilter>,
    callbacks: &mut VisitCallbacks<'_, '_, '_>,
) -> Result<(), DbError> {
    if uri.is_empty() {
        for server in registry.get_directories() {
            if let Some(cb) = callbacks.visit_directory.as_mut() {
                cb(LightDirectory::new(server.friendly_name().to_string()));
            }
            if recursive {
                visit_server_tail(server, "", server.friendly_name(), recursive, filter, callbacks)?;
            }
        }
        return Ok(());
    }

    let (server_name, tail) = path::split_server_and_tail(uri);
    let server = registry.get_server(server_name)?;
    visit_server_tail(server, tail, uri, recursive, filter, callbacks)
}

fn visit_server_tail(
    server: &dyn ContentDirectoryService,
    tail: &str,
    base_uri: &str,
    recursive: bool,
    filter: Option<&SongFilter>,
    callbacks: &mut VisitCallbacks<'_, '_, '_>,
) -> Result<(), DbError> {
    if tail == ROOT_SENTINEL {
        return Ok(());
    }

    if let Some(id) = path::recognize_id_path(tail) {
        let object = path::get_metadata(server, id)?;
        if !object.is_music() {
            return Err(DbError::not_found(format!("{id:?} is not a music item")));
        }
        let uri = song::synthetic_uri(server.friendly_name(), id);
        emit_filtered_song(callbacks, filter, song::materialize(uri, &object));
        return Ok(());
    }

    let target = path::namei(server, tail)?;

    if recursive && filter.is_some() {
        return search_and_visit(server, &target, filter, callbacks);
    }

    match target.object_type {
        ObjectType::Item => {
            if target.item_class == ItemClass::Music {
                let uri = if base_uri.is_empty() {
                    server.friendly_name().to_string()
                } else {
                    base_uri.to_string()
                };
                emit_filtered_song(callbacks, filter, song::materialize(uri, &target));
            }
            Ok(())
        }
        ObjectType::Container => {
            let children = server.read_dir(&target.id)?;
            for child in children.iter() {
                let child_uri = build_path(base_uri, &child.name);
                if child.is_container() {
                    if let Some(cb) = callbacks.visit_directory.as_mut() {
                        cb(LightDirectory::new(child_uri));
                    }
                } else if child.is_music() {
                    emit_filtered_song(callbacks, filter, song::materialize(child_uri, child));
                }
            }
            Ok(())
        }
        ObjectType::Unknown => Ok(()),
    }
}

fn search_and_visit(
    server: &dyn ContentDirectoryService,
    target: &DirObject,
    filter: Option<&SongFilter>,
    callbacks: &mut VisitCallbacks<'_, '_, '_>,
) -> Result<(), DbError> {
    let capabilities = server.search_capabilities()?;
    let Some(criteria) = search::compile(filter, &capabilities) else {
        return Ok(());
    };

    let results = server.search(&target.id, &criteria)?;
    for object in results.iter() {
        if object.is_music() {
            let uri = song::synthetic_uri(server.friendly_name(), &object.id);
            emit_song(callbacks, song::materialize(uri, object));
        }
    }
    Ok(())
}

fn emit_filtered_song(callbacks: &mut VisitCallbacks<'_, '_, '_>, filter: Option<&SongFilter>, song: LightSong) {
    if let Some(filter) = filter {
        if !filter.matches(&song.tag) {
            return;
        }
    }
    emit_song(callbacks, song);
}

fn emit_song(callbacks: &mut VisitCallbacks<'_, '_, '_>, song: LightSong) {
    if let Some(cb) = callbacks.visit_song.as_mut() {
        cb(song);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::collections::HashSet;

    use super::*;
    use crate::content_directory::UpnpContentDirectory;
    use crate::discovery::DeviceDirectory;
    use crate::error::TransportError;
    use crate::host::{FilterItem, SongFilter, TagSongFilter, TagType};
    use crate::model::{DirContent, DirObject, ItemClass, ObjectType, TagSet};

    fn dir(id: &str, parent: &str, name: &str) -> DirObject {
        DirObject {
            id: id.to_string(),
            parent_id: parent.to_string(),
            name: name.to_string(),
            object_type: ObjectType::Container,
            item_class: ItemClass::Unknown,
            url: None,
            tag: TagSet::new(),
        }
    }

    fn music(id: &str, parent: &str, name: &str, url: &str) -> DirObject {
        let mut tag = TagSet::new();
        tag.insert("upnp:artist", "AC/DC");
        DirObject {
            id: id.to_string(),
            parent_id: parent.to_string(),
            name: name.to_string(),
            object_type: ObjectType::Item,
            item_class: ItemClass::Music,
            url: Some(url.to_string()),
            tag,
        }
    }

    fn photo(id: &str, parent: &str, name: &str) -> DirObject {
        DirObject {
            id: id.to_string(),
            parent_id: parent.to_string(),
            name: name.to_string(),
            object_type: ObjectType::Item,
            item_class: ItemClass::Unknown,
            url: None,
            tag: TagSet::new(),
        }
    }

    /// A fixture `ContentDirectoryService` driven entirely from an
    /// in-memory catalog, used to exercise the Visitor Engine without a
    /// real MediaServer (§8 scenarios S1-S5).
    struct MockServer {
        name: String,
        by_parent: HashMap<String, Vec<DirObject>>,
        by_id: HashMap<String, DirObject>,
        capabilities: HashSet<String>,
        search_results: Vec<DirObject>,
        search_calls: RefCell<Vec<(String, String)>>,
        read_dir_calls: RefCell<u32>,
    }

    impl MockServer {
        fn new(name: &str, objects: Vec<DirObject>) -> Self {
            let mut by_parent: HashMap<String, Vec<DirObject>> = HashMap::new();
            let mut by_id = HashMap::new();
            for obj in objects {
                by_parent.entry(obj.parent_id.clone()).or_default().push(obj.clone());
                by_id.insert(obj.id.clone(), obj);
            }
            MockServer {
                name: name.to_string(),
                by_parent,
                by_id,
                capabilities: HashSet::new(),
                search_results: Vec::new(),
                search_calls: RefCell::new(Vec::new()),
                read_dir_calls: RefCell::new(0),
            }
        }

        fn with_capabilities(mut self, caps: &[&str]) -> Self {
            self.capabilities = caps.iter().map(|s| s.to_string()).collect();
            self
        }

        fn with_search_results(mut self, results: Vec<DirObject>) -> Self {
            self.search_results = results;
            self
        }
    }

    impl ContentDirectoryService for MockServer {
        fn friendly_name(&self) -> &str {
            &self.name
        }

        fn read_dir(&self, object_id: &str) -> Result<DirContent, TransportError> {
            *self.read_dir_calls.borrow_mut() += 1;
            Ok(DirContent(self.by_parent.get(object_id).cloned().unwrap_or_default()))
        }

        fn get_metadata(&self, object_id: &str) -> Result<DirContent, TransportError> {
            Ok(DirContent(self.by_id.get(object_id).cloned().into_iter().collect()))
        }

        fn search(&self, object_id: &str, criteria: &str) -> Result<DirContent, TransportError> {
            self.search_calls
                .borrow_mut()
                .push((object_id.to_string(), criteria.to_string()));
            Ok(DirContent(self.search_results.clone()))
        }

        fn search_capabilities(&self) -> Result<HashSet<String>, TransportError> {
            Ok(self.capabilities.clone())
        }
    }

    fn root_catalog() -> Vec<DirObject> {
        vec![
            dir("0", "-1", "root"),
            dir("1", "0", "Music"),
            music("7", "1", "Song.flac", "http://host/7.flac"),
            photo("8", "1", "photo.jpg"),
        ]
    }

    /// S2: list container, suppressing the non-music item.
    #[test]
    fn lists_a_container_and_suppresses_non_music_items() {
        let server = MockServer::new("MS", root_catalog());

        let mut dirs = Vec::new();
        let mut songs = Vec::new();
        let mut visit_dir = |d: LightDirectory| dirs.push(d.uri);
        let mut visit_song = |s: LightSong| songs.push(s.uri);
        let mut callbacks = VisitCallbacks {
            visit_directory: Some(&mut visit_dir),
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "", "MS", false, None, &mut callbacks).unwrap();
        assert_eq!(dirs, vec!["MS/Music".to_string()]);
        assert!(songs.is_empty());
    }

    /// S3: resolve by name-path, music item visited with the request's URI.
    #[test]
    fn resolves_a_music_item_by_name_path() {
        let server = MockServer::new("MS", root_catalog());

        let mut songs = Vec::new();
        let mut visit_song = |s: LightSong| songs.push((s.uri, s.real_uri));
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "Music/Song.flac", "MS/Music/Song.flac", false, None, &mut callbacks).unwrap();
        assert_eq!(songs, vec![("MS/Music/Song.flac".to_string(), "http://host/7.flac".to_string())]);
    }

    /// S4: resolve by id-path, synthetic URI regardless of the request's own URI.
    #[test]
    fn resolves_a_music_item_by_id_path() {
        let server = MockServer::new("MS", root_catalog());

        let mut songs = Vec::new();
        let mut visit_song = |s: LightSong| songs.push((s.uri, s.real_uri));
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "0/7", "MS/0/7", false, None, &mut callbacks).unwrap();
        assert_eq!(songs, vec![("MS/0/7".to_string(), "http://host/7.flac".to_string())]);
        assert_eq!(*server.read_dir_calls.borrow(), 0, "id-path resolution must never call readDir (§8 invariant 7)");
    }

    /// Invariant 7 / engine rule 2: the bare sentinel "0" visits nothing
    /// and never reaches a container read.
    #[test]
    fn bare_sentinel_tail_visits_nothing() {
        let server = MockServer::new("MS", root_catalog());
        let mut calls = 0;
        let mut visit_song = |_: LightSong| calls += 1;
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "0", "MS/0", false, None, &mut callbacks).unwrap();
        assert_eq!(calls, 0);
        assert_eq!(*server.read_dir_calls.borrow(), 0);
    }

    /// An id-path resolving to a non-music item fails not-found.
    #[test]
    fn id_path_to_non_music_item_fails_not_found() {
        let server = MockServer::new("MS", root_catalog());
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: None,
            visit_playlist: None,
        };
        let err = visit_server_tail(&server, "0/8", "MS/0/8", false, None, &mut callbacks).unwrap_err();
        assert!(err.is_not_found());
    }

    /// S5: recursive + filter dispatches through the Search Compiler,
    /// scoped at the resolved container, with synthetic URIs.
    #[test]
    fn recursive_search_emits_synthetic_paths() {
        let server = MockServer::new("MS", root_catalog())
            .with_capabilities(&["dc:title", "upnp:artist"])
            .with_search_results(vec![music("7", "1", "Song.flac", "http://host/7.flac")]);

        let filter = SongFilter {
            items: vec![FilterItem::TagEquality(TagSongFilter {
                tag_type: TagType::Artist,
                value: r#"AC\DC"#.to_string(),
                fold_case: true,
            })],
        };

        let mut songs = Vec::new();
        let mut visit_song = |s: LightSong| songs.push(s.uri);
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "Music", "MS/Music", true, Some(&filter), &mut callbacks).unwrap();
        assert_eq!(songs, vec!["MS/0/7".to_string()]);
        assert_eq!(server.search_calls.borrow()[0], ("1".to_string(), r#"upnp:artist contains "AC\\DC""#.to_string()));
    }

    /// Search capability gating (§8 invariant 3): zero capabilities means
    /// no `search` call is issued and zero songs are emitted.
    #[test]
    fn recursive_search_with_no_capabilities_issues_no_search_call() {
        let server = MockServer::new("MS", root_catalog())
            .with_search_results(vec![music("7", "1", "Song.flac", "http://host/7.flac")]);

        let filter = SongFilter {
            items: vec![FilterItem::TagEquality(TagSongFilter {
                tag_type: TagType::Artist,
                value: "AC/DC".to_string(),
                fold_case: false,
            })],
        };

        let mut songs = Vec::new();
        let mut visit_song = |s: LightSong| songs.push(s.uri);
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "Music", "MS/Music", true, Some(&filter), &mut callbacks).unwrap();
        assert!(songs.is_empty());
        assert!(server.search_calls.borrow().is_empty());
    }

    /// S1: multi-server root emits one directory per known server and
    /// never touches the network when not recursing.
    #[test]
    fn lists_the_multi_server_root() {
        let a = UpnpContentDirectory::new("Alpha".to_string(), "http://unused/alpha".to_string(), std::time::Duration::from_secs(1));
        let b = UpnpContentDirectory::new("Beta".to_string(), "http://unused/beta".to_string(), std::time::Duration::from_secs(1));
        let directory = DeviceDirectory::from_servers(vec![a, b]);
        let registry = ServerRegistry::new(&directory);

        let mut dirs = Vec::new();
        let mut visit_dir = |d: LightDirectory| dirs.push(d.uri);
        let mut callbacks = VisitCallbacks {
            visit_directory: Some(&mut visit_dir),
            visit_song: None,
            visit_playlist: None,
        };

        let selection = DatabaseSelection::default();
        visit(&registry, &selection, &mut callbacks).unwrap();
        assert_eq!(dirs, vec!["Alpha".to_string(), "Beta".to_string()]);
    }

    /// Client-side filtering during a plain (non-recursive, non-search)
    /// container listing still suppresses non-matching songs.
    #[test]
    fn non_search_listing_applies_the_filter_client_side() {
        let server = MockServer::new(
            "MS",
            vec![
                dir("0", "-1", "root"),
                dir("1", "0", "Music"),
                music("7", "1", "Hit.flac", "http://host/7.flac"),
                {
                    let mut miss = music("9", "1", "Miss.flac", "http://host/9.flac");
                    miss.tag = TagSet::new();
                    miss.tag.insert("upnp:artist", "Queen");
                    miss
                },
            ],
        );
        let filter = SongFilter {
            items: vec![FilterItem::TagEquality(TagSongFilter {
                tag_type: TagType::Artist,
                value: "AC/DC".to_string(),
                fold_case: false,
            })],
        };

        let mut songs = Vec::new();
        let mut visit_song = |s: LightSong| songs.push(s.uri);
        let mut callbacks = VisitCallbacks {
            visit_directory: None,
            visit_song: Some(&mut visit_song),
            visit_playlist: None,
        };

        visit_server_tail(&server, "Music", "MS/Music", false, Some(&filter), &mut callbacks).unwrap();
        assert_eq!(songs, vec!["MS/Music/Hit.flac".to_string()]);
    }
}
