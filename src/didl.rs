//! Decodes a DIDL-Lite payload (the `<Result>` text of a Browse/Search
//! SOAP response) into a [`DirContent`] (§4.J).
//!
//! Uses `xmltree` directly instead of `quick-xml` + `serde` (as the
//! teacher's sibling `pmodidl` crate does) because the payload arrives
//! HTML-escaped inside a SOAP text node and is naturally handled as a
//! second XML parse over a tree, matching how this crate already
//! parses the outer SOAP envelope.

use std::io::BufReader;

use xmltree::Element;

use crate::error::TransportError;
use crate::model::{DirContent, DirObject, ItemClass, ObjectType, TagSet};

pub fn parse_didl(action: &str, didl_xml: &str) -> Result<DirContent, TransportError> {
    let trimmed = didl_xml.trim();
    if trimmed.is_empty() {
        return Ok(DirContent::default());
    }

    let root = Element::parse(BufReader::new(trimmed.as_bytes())).map_err(|err| {
        TransportError::MalformedResponse {
            action: action.to_string(),
            reason: format!("invalid DIDL-Lite payload: {err}"),
        }
    })?;

    let mut objects = Vec::new();
    for child in &root.children {
        let Some(elem) = child.as_element() else {
            continue;
        };
        match elem.name.as_str() {
            "container" => objects.push(decode_container(elem)),
            "item" => objects.push(decode_item(elem)),
            _ => {}
        }
    }

    Ok(DirContent(objects))
}

fn decode_container(elem: &Element) -> DirObject {
    DirObject {
        id: attr(elem, "id"),
        parent_id: attr(elem, "parentID"),
        name: text_child(elem, "title"),
        object_type: ObjectType::Container,
        item_class: ItemClass::Unknown,
        url: None,
        tag: TagSet::new(),
    }
}

fn decode_item(elem: &Element) -> DirObject {
    let class = text_child(elem, "class");
    let item_class = ItemClass::from_upnp_class(&class);

    let mut tag = TagSet::new();
    insert_tag(&mut tag, elem, "title", "dc:title");
    insert_tag(&mut tag, elem, "creator", "dc:creator");
    insert_tag(&mut tag, elem, "artist", "upnp:artist");
    insert_tag(&mut tag, elem, "album", "upnp:album");
    insert_tag(&mut tag, elem, "genre", "upnp:genre");
    insert_tag(&mut tag, elem, "albumArtURI", "upnp:albumArtURI");
    insert_tag(&mut tag, elem, "date", "dc:date");
    insert_tag(&mut tag, elem, "originalTrackNumber", "upnp:originalTrackNumber");

    let url = elem
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .find(|e| e.name == "res")
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .filter(|s| !s.is_empty());

    DirObject {
        id: attr(elem, "id"),
        parent_id: attr(elem, "parentID"),
        name: text_child(elem, "title"),
        object_type: ObjectType::Item,
        item_class,
        url,
        tag,
    }
}

fn attr(elem: &Element, name: &str) -> String {
    elem.attributes.get(name).cloned().unwrap_or_default()
}

fn text_child(elem: &Element, name: &str) -> String {
    elem.children
        .iter()
        .filter_map(|node| node.as_element())
        .find(|e| e.name == name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn insert_tag(tag: &mut TagSet, elem: &Element, local_name: &str, field: &str) {
    let value = text_child(elem, local_name);
    if !value.is_empty() {
        tag.insert(field, value);
    }
}
