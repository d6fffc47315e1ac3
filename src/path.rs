//! HostPath parsing, the Path Resolver ("Namei", §4.C) and the
//! ID-Path Recognizer (§4.D).

use crate::content_directory::ContentDirectoryService;
use crate::error::DbError;
use crate::model::DirObject;

pub const ROOT_SENTINEL: &str = "0";

/// Splits a full HostPath into `(server name, tail)`. The tail is
/// everything after the first `/`, or empty if there is none.
pub fn split_server_and_tail(uri: &str) -> (&str, &str) {
    match uri.split_once('/') {
        Some((server, tail)) => (server, tail),
        None => (uri, ""),
    }
}

/// Detects the synthetic `"0/<id>"` form (§4.D). `"0"` alone is not an
/// ID-path; the caller handles that sentinel-only case separately.
pub fn recognize_id_path(tail: &str) -> Option<&str> {
    let rest = tail.strip_prefix(ROOT_SENTINEL)?.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Walks a chain of child names through successive `readDir` calls
/// (§4.C). An empty tail resolves to the server's root metadata.
pub fn namei(server: &dyn ContentDirectoryService, tail: &str) -> Result<DirObject, DbError> {
    if tail.is_empty() {
        return metadata_of(server, ROOT_SENTINEL);
    }

    let mut object_id = ROOT_SENTINEL.to_string();
    let mut remaining = tail;

    loop {
        let (head, rest) = match remaining.split_once('/') {
            Some((h, r)) => (h, Some(r)),
            None => (remaining, None),
        };

        let content = server.read_dir(&object_id)?;
        let child = content
            .find_by_name(head)
            .ok_or_else(|| DbError::not_found(format!("no child named {head:?} under {object_id}")))?;

        match rest {
            None => return Ok(child.clone()),
            Some(rest) => {
                if !child.is_container() {
                    return Err(DbError::not_found(format!("{head:?} is not a container")));
                }
                object_id = child.id.clone();
                remaining = rest;
            }
        }
    }
}

fn metadata_of(server: &dyn ContentDirectoryService, object_id: &str) -> Result<DirObject, DbError> {
    let content = server.get_metadata(object_id)?;
    let mut objects = content.into_inner();
    if objects.len() != 1 {
        return Err(DbError::bad_resource(format!(
            "getMetadata({object_id}) returned {} objects, expected 1",
            objects.len()
        )));
    }
    Ok(objects.remove(0))
}

/// `getMetadata(id) → DirObject`, failing *bad-resource* unless
/// exactly one object comes back (§4.B).
pub fn get_metadata(server: &dyn ContentDirectoryService, object_id: &str) -> Result<DirObject, DbError> {
    metadata_of(server, object_id)
}
