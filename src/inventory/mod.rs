//! Virtual media inventory
//!
//! Walks the Redfish resource tree from the service root down to every
//! virtual media resource:
//!
//! ```text
//! /redfish/v1/ -> Managers, Systems -> member -> VirtualMedia -> member
//! ```
//!
//! Records are reported through a callback as they are found, so output for
//! different owners interleaves in discovery order. The traversal only
//! issues GET requests.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ConnectionParams;
use crate::redfish::{
    link, member_links, Auth, RedfishError, Result, SessionGuard, Transport, SERVICE_ROOT,
};

/// Protocol metadata stripped from every record. Keys match
/// case-insensitively.
pub const METADATA_FIELDS: [&str; 5] = [
    "Description",
    "@odata.context",
    "@odata.id",
    "@odata.type",
    "@odata.etag",
];

/// Collections under the service root that own virtual media, in visit order.
pub const OWNER_COLLECTIONS: [&str; 2] = ["Managers", "Systems"];

/// One virtual media resource with its metadata fields removed.
///
/// Field order follows the source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VirtualMediaRecord(Map<String, Value>);

impl VirtualMediaRecord {
    /// Build a record from a fetched resource body.
    ///
    /// `link` names the resource in the error if the body is not an object.
    pub fn from_resource(link: &str, resource: Value) -> Result<Self> {
        match resource {
            Value::Object(mut fields) => {
                fields.retain(|key, _| !is_metadata_field(key));
                Ok(Self(fields))
            }
            other => Err(RedfishError::Decode {
                url: link.to_string(),
                reason: format!("expected a JSON object, got {}", json_type(&other)),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

fn is_metadata_field(key: &str) -> bool {
    METADATA_FIELDS
        .iter()
        .any(|field| field.eq_ignore_ascii_case(key))
}

/// Progress reported while walking the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraversalEvent<'a> {
    /// A virtual media resource under `owner`
    Record {
        owner: &'a str,
        record: &'a VirtualMediaRecord,
    },
    /// `owner` has a VirtualMedia collection with no members
    EmptyCollection { owner: &'a str },
}

/// Walk the tree with the given credentials.
///
/// Fails on the first error. A member without a `VirtualMedia` link is
/// skipped; an empty VirtualMedia collection is reported and skipped.
pub fn collect_virtual_media<T, F>(
    transport: &T,
    auth: &Auth,
    mut on_event: F,
) -> Result<Vec<VirtualMediaRecord>>
where
    T: Transport + ?Sized,
    F: FnMut(TraversalEvent<'_>),
{
    let root = transport.get(SERVICE_ROOT, auth)?;
    let owners = owner_links(transport, auth, &root)?;
    debug!(count = owners.len(), "Discovered managers and systems");

    let mut records = Vec::new();
    for owner in &owners {
        let resource = transport.get(owner, auth)?;
        let Some(collection_link) = link(&resource, "VirtualMedia") else {
            debug!(owner = %owner, "No VirtualMedia link; skipping");
            continue;
        };

        let collection = transport.get(collection_link, auth)?;
        let members = member_links(&collection);
        if members.is_empty() {
            info!(owner = %owner, "VirtualMedia collection is empty");
            on_event(TraversalEvent::EmptyCollection { owner });
            continue;
        }

        for member in &members {
            let record = VirtualMediaRecord::from_resource(member, transport.get(member, auth)?)?;
            on_event(TraversalEvent::Record {
                owner,
                record: &record,
            });
            records.push(record);
        }
    }

    info!(count = records.len(), "Virtual media traversal complete");
    Ok(records)
}

/// Log in, walk the tree, and log out.
///
/// The session is released exactly once whether or not the traversal
/// succeeds. A failed release is logged and does not change the result.
pub fn get_virtual_media<T, F>(
    transport: &T,
    params: &ConnectionParams,
    on_event: F,
) -> Result<Vec<VirtualMediaRecord>>
where
    T: Transport + ?Sized,
    F: FnMut(TraversalEvent<'_>),
{
    let guard = SessionGuard::open(transport, &params.username, &params.password, params.auth)?;
    let result = collect_virtual_media(transport, guard.auth(), on_event);
    if let Err(e) = guard.close() {
        warn!(error = %e, "Failed to delete Redfish session");
    }
    result
}

/// Member links of the Managers then Systems collections, concatenated.
///
/// Both links must be present on the root before either collection is
/// fetched.
fn owner_links<T>(transport: &T, auth: &Auth, root: &Value) -> Result<Vec<String>>
where
    T: Transport + ?Sized,
{
    let collections = OWNER_COLLECTIONS
        .iter()
        .map(|name| {
            link(root, name).ok_or_else(|| RedfishError::MissingLink {
                resource: SERVICE_ROOT.to_string(),
                link: name.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut owners = Vec::new();
    for collection_link in collections {
        let collection = transport.get(collection_link, auth)?;
        owners.extend(member_links(&collection));
    }
    Ok(owners)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
