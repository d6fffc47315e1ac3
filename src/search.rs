//! Search Compiler (§4.E): translates a host `SongFilter` into a UPnP
//! ContentDirectory search criteria string, gated by the target
//! server's advertised search capabilities.

use std::collections::HashSet;

use crate::host::{upnp_tags, FilterItem, SongFilter, TagType};

/// Compiles `filter` into a UPnP search criteria string scoped to
/// `capabilities`. Returns `None` when the filter is absent or the
/// server has no search capabilities at all — callers must then skip
/// issuing `search` entirely (§4.E step 1, invariant 3).
pub fn compile(filter: Option<&SongFilter>, capabilities: &HashSet<String>) -> Option<String> {
    let filter = filter?;
    if capabilities.is_empty() {
        return None;
    }

    let fragments: Vec<String> = filter
        .items
        .iter()
        .filter_map(|item| match item {
            FilterItem::TagEquality(f) => compile_tag_filter(f, capabilities),
            FilterItem::Other => None,
        })
        .collect();

    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" and "))
    }
}

fn compile_tag_filter(
    filter: &crate::host::TagSongFilter,
    capabilities: &HashSet<String>,
) -> Option<String> {
    let op = if filter.fold_case { " contains " } else { " = " };
    let quoted = quote(&filter.value);

    if filter.tag_type == TagType::Any {
        let mut caps: Vec<&String> = capabilities.iter().collect();
        caps.sort();
        let disjuncts: Vec<String> = caps.iter().map(|cap| format!("{cap}{op}{quoted}")).collect();
        return if disjuncts.is_empty() {
            None
        } else {
            Some(format!("({})", disjuncts.join(" or ")))
        };
    }

    let tag_type = if filter.tag_type == TagType::AlbumArtist {
        TagType::Artist
    } else {
        filter.tag_type
    };

    let name = upnp_tags(tag_type)?;
    Some(format!("{name}{op}{quoted}"))
}

/// Surrounds `value` with `"`, escaping every embedded `"` or `\` with
/// a leading `\` (§4.E step 5).
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
