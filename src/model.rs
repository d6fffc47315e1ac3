//! The entities consumed from the UPnP layer (§3): `DirObject`, `DirContent`,
//! and the small closed vocabularies for object type and item class.

use std::collections::BTreeMap;

/// Kind of node a `DirObject` represents. `Unknown` covers DIDL-Lite
/// elements this decoder doesn't recognize (e.g. `<desc>`-only nodes);
/// treating them as neither a container nor a playable item is the
/// conservative choice for a read-only browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectType {
    Container,
    Item,
    Unknown,
}

/// Narrow classification of an item, derived from its `upnp:class`.
/// Only music items are ever surfaced as songs (§3 invariant 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemClass {
    Music,
    Playlist,
    Unknown,
}

impl ItemClass {
    pub fn from_upnp_class(class: &str) -> ItemClass {
        if class.starts_with("object.item.audioItem") {
            ItemClass::Music
        } else if class.starts_with("object.item.playlistItem") {
            ItemClass::Playlist
        } else {
            ItemClass::Unknown
        }
    }
}

/// A DIDL-Lite tag set, keyed by the DIDL field name (e.g. `"upnp:artist"`,
/// `"dc:title"`). Kept as a flat map rather than a fixed struct so the
/// decoder can carry forward fields the adapter doesn't special-case,
/// and so the host's tag-type-to-DIDL-name table (`upnp_tags`) is the
/// only place that needs to know the mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        TagSet(BTreeMap::new())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.0.insert(field.into(), value);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One node of a MediaServer's catalog: a container or an item.
#[derive(Clone, Debug)]
pub struct DirObject {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub object_type: ObjectType,
    pub item_class: ItemClass,
    pub url: Option<String>,
    pub tag: TagSet,
}

impl DirObject {
    pub fn is_music(&self) -> bool {
        self.object_type == ObjectType::Item && self.item_class == ItemClass::Music
    }

    pub fn is_container(&self) -> bool {
        self.object_type == ObjectType::Container
    }
}

/// An ordered list of `DirObject`, as returned by one Browse/Search call.
#[derive(Clone, Debug, Default)]
pub struct DirContent(pub Vec<DirObject>);

impl DirContent {
    pub fn find_by_name(&self, name: &str) -> Option<&DirObject> {
        self.0.iter().find(|obj| obj.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirObject> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<DirObject> {
        self.0
    }
}
