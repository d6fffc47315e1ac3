//! Local stand-ins for the host's database plugin contract (§6).
//!
//! The real host — its plugin registry, config loader, song-filter
//! hierarchy, and event loop — lives outside this crate. What follows
//! is the minimal slice of that contract the adapter is written
//! against, modeled closely enough that [`crate::facade::UpnpDatabase`]
//! reads the way a real plugin implementation would.

use std::time::SystemTime;

use crate::model::TagSet;

/// A tag type the host knows about. `Any` is the disjunction sentinel
/// used by free-text search across every field a server advertises.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagType {
    Title,
    Artist,
    Album,
    AlbumArtist,
    Genre,
    Any,
}

/// Maps a host tag type to the UPnP DIDL field name used both to read
/// a decoded [`TagSet`] (`didl.rs`) and to compile search criteria
/// (`search.rs`). `AlbumArtist` is deliberately absent: the search
/// compiler normalizes it to `Artist` before this lookup ever runs
/// (§4.E "Album-artist normalization"), and `Any` never looks up a
/// single name — it fans out over the server's full capability set.
pub fn upnp_tags(tag: TagType) -> Option<&'static str> {
    match tag {
        TagType::Title => Some("dc:title"),
        TagType::Artist => Some("upnp:artist"),
        TagType::Album => Some("upnp:album"),
        TagType::Genre => Some("upnp:genre"),
        TagType::AlbumArtist | TagType::Any => None,
    }
}

/// Reads a tag's display value out of a decoded [`TagSet`], for
/// building a `LightSong`'s visible tags. Falls back to `dc:creator`
/// for artist, matching the teacher's corpus convention that DIDL
/// producers populate one or the other inconsistently.
pub fn read_tag(tag: &TagSet, kind: TagType) -> Option<&str> {
    match kind {
        TagType::Artist => tag.get("upnp:artist").or_else(|| tag.get("dc:creator")),
        _ => upnp_tags(kind).and_then(|field| tag.get(field)),
    }
}

/// One item of a `SongFilter`. Only `TagEquality` is translated by the
/// Search Compiler; other kinds are an open extension seam (§9 "Filter
/// item polymorphism") left for a host with a richer filter vocabulary.
#[derive(Clone, Debug)]
pub enum FilterItem {
    TagEquality(TagSongFilter),
    #[allow(dead_code)]
    Other,
}

#[derive(Clone, Debug)]
pub struct TagSongFilter {
    pub tag_type: TagType,
    pub value: String,
    pub fold_case: bool,
}

/// A host-side song filter: an ordered list of filter items, ANDed
/// together. Used both to compile a search criteria string and, on
/// non-search listings, to test each candidate client-side.
#[derive(Clone, Debug, Default)]
pub struct SongFilter {
    pub items: Vec<FilterItem>,
}

impl SongFilter {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Client-side match used during non-search listings (§4.F). Only
    /// tag-equality items constrain the match; unmapped tag types and
    /// non-tag filter kinds are accepted unconditionally, mirroring the
    /// "absorb, don't fail" policy the rest of the adapter follows.
    pub fn matches(&self, tag: &TagSet) -> bool {
        self.items.iter().all(|item| match item {
            FilterItem::TagEquality(f) => match upnp_tags(f.tag_type).and_then(|field| tag.get(field)) {
                Some(actual) => {
                    if f.fold_case {
                        actual.eq_ignore_ascii_case(&f.value)
                    } else {
                        actual == f.value
                    }
                }
                None => true,
            },
            FilterItem::Other => true,
        })
    }
}

/// A single visit request (§3, §4.H `Visit`).
#[derive(Clone, Debug, Default)]
pub struct DatabaseSelection {
    pub uri: String,
    pub recursive: bool,
    pub filter: Option<SongFilter>,
}

/// A directory emitted to the host's `visitDirectory` callback.
#[derive(Clone, Debug)]
pub struct LightDirectory {
    pub uri: String,
    pub mtime: SystemTime,
}

impl LightDirectory {
    pub fn new(uri: String) -> Self {
        LightDirectory {
            uri,
            mtime: SystemTime::UNIX_EPOCH,
        }
    }
}

/// A song emitted to the host's `visitSong` callback, or returned by
/// `GetSong` as a heap-owned record (§4.G, §3 invariant 3).
#[derive(Clone, Debug)]
pub struct LightSong {
    pub uri: String,
    pub real_uri: String,
    pub tag: TagSet,
}

/// Host callbacks; absence of any one means "do not emit this kind"
/// (§6). Each callback gets its own lifetime: they are typically
/// borrowed from independent, differently-scoped locals at the call
/// site (e.g. a facade-owned helper wrapping `visit_song`).
pub struct VisitCallbacks<'d, 's, 'p> {
    pub visit_directory: Option<&'d mut dyn FnMut(LightDirectory)>,
    pub visit_song: Option<&'s mut dyn FnMut(LightSong)>,
    pub visit_playlist: Option<&'p mut dyn FnMut(LightSong)>,
}

/// Joins two UTF-8 path segments with a single `/`, matching the
/// host's own `PathTraitsUtf8::build` join helper. An empty `base`
/// yields `child` unchanged, so the multi-server root ("") joins
/// cleanly with a server's friendly name.
pub fn build_path(base: &str, child: &str) -> String {
    if base.is_empty() {
        child.to_string()
    } else {
        format!("{base}/{child}")
    }
}

/// Zeroed stats record (§4.H `GetStats`, Non-goals: statistics are
/// never tracked by this adapter).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub song_count: u64,
    pub container_count: u64,
    pub total_duration_secs: u64,
}

/// Thin pass-through wrapper around the song callback (§6
/// `DatabaseVisitorHelper`). A host with real group-by/aggregation
/// semantics would buffer songs here and flush them on `commit`; this
/// build has no such feature to exercise, so every song is forwarded
/// immediately and `commit` is a no-op. The seam is kept so a richer
/// host implementation can slot in without touching the Visitor Engine.
pub struct DatabaseVisitorHelper<'a, 'b> {
    visit_song: Option<&'a mut dyn FnMut(LightSong)>,
    _selection: &'b DatabaseSelection,
}

impl<'a, 'b> DatabaseVisitorHelper<'a, 'b> {
    pub fn new(selection: &'b DatabaseSelection, visit_song: Option<&'a mut dyn FnMut(LightSong)>) -> Self {
        DatabaseVisitorHelper {
            visit_song,
            _selection: selection,
        }
    }

    pub fn emit_song(&mut self, song: LightSong) {
        if let Some(cb) = self.visit_song.as_mut() {
            cb(song);
        }
    }

    pub fn commit(self) {}
}
