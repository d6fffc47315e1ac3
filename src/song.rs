//! Song Materializer (§4.G): wraps a retrieved [`DirObject`] as a
//! host-visible [`LightSong`], either for a one-off `GetSong` or for
//! every music item a `Visit` encounters.

use crate::host::{read_tag, LightSong, TagType};
use crate::model::DirObject;
use crate::path::ROOT_SENTINEL;

/// Builds the synthetic HostPath `"<friendlyName>/0/<objectId>"` used
/// whenever a song's position came from search or from a direct
/// ID-path lookup, where no stable pretty path exists (§4.G, §9).
pub fn synthetic_uri(friendly_name: &str, object_id: &str) -> String {
    format!("{friendly_name}/{ROOT_SENTINEL}/{object_id}")
}

/// Wraps `object` as a `LightSong` at the given `uri`. Callers decide
/// the URI: a pretty name-path for ordinary listings, or a synthetic
/// ID-path for search hits and direct ID-path resolution.
pub fn materialize(uri: String, object: &DirObject) -> LightSong {
    let mut tag = object.tag.clone();
    if let Some(title) = none_if_empty(&object.name) {
        tag.insert("dc:title", title);
    }

    LightSong {
        uri,
        real_uri: object.url.clone().unwrap_or_default(),
        tag,
    }
}

fn none_if_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Convenience accessor mirroring the host's typed tag lookup, used by
/// `CollectUniqueTags` support code once it reads a materialized song.
pub fn tag_value(song: &LightSong, kind: TagType) -> Option<&str> {
    read_tag(&song.tag, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemClass, ObjectType, TagSet};

    #[test]
    fn builds_the_synthetic_id_path_form() {
        assert_eq!(synthetic_uri("MS", "abc123"), "MS/0/abc123");
    }

    #[test]
    fn materializes_a_music_item_with_its_title_tag() {
        let object = DirObject {
            id: "7".to_string(),
            parent_id: "1".to_string(),
            name: "Song.flac".to_string(),
            object_type: ObjectType::Item,
            item_class: ItemClass::Music,
            url: Some("http://host/7.flac".to_string()),
            tag: TagSet::new(),
        };
        let song = materialize("MS/Music/Song.flac".to_string(), &object);
        assert_eq!(song.uri, "MS/Music/Song.flac");
        assert_eq!(song.real_uri, "http://host/7.flac");
        assert_eq!(song.tag.get("dc:title"), Some("Song.flac"));
    }
}
