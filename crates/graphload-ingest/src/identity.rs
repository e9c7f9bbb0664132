//! Internal identity of records
//!
//! A record's internal identity is the entity name followed by the values of
//! its primary attributes, in attribute declaration order, with no separator.
//! Distinct value tuples can therefore alias: primary values `("1", "23")` and
//! `("12", "3")` produce the same identity. Identities already written to
//! stores use this exact form, so the concatenation is kept as is.

use crate::error::RecordError;
use crate::reader::Record;
use crate::schema::EntityType;

/// Property key holding a vertex's internal identity
pub const NODE_IDENTITY_KEY: &str = "NodeId_Internal";

/// Property key holding an edge's internal identity
pub const EDGE_IDENTITY_KEY: &str = "EdgeId_Internal";

/// Reject records with fewer fields than declared attributes
pub fn check_arity(entity: &EntityType, record: &Record) -> Result<(), RecordError> {
    if record.fields.len() < entity.attributes.len() {
        return Err(RecordError::Malformed {
            expected: entity.attributes.len(),
            found: record.fields.len(),
        });
    }
    Ok(())
}

/// Compose the internal identity of a record
pub fn compute_identity(entity: &EntityType, record: &Record) -> Result<String, RecordError> {
    let mut identity = entity.name.clone();

    for (position, attribute) in entity.attributes.iter().enumerate() {
        if !entity.is_primary(attribute) {
            continue;
        }
        let value = record.get(position).ok_or(RecordError::Malformed {
            expected: entity.attributes.len(),
            found: record.fields.len(),
        })?;
        identity.push_str(value);
    }

    Ok(identity)
}

/// Raw value of `attribute` in an edge record, used to match an endpoint node
pub fn resolve_endpoint_key<'r>(
    entity: &EntityType,
    attribute: &str,
    record: &'r Record,
) -> Result<&'r str, RecordError> {
    let position = entity
        .position(attribute)
        .ok_or_else(|| RecordError::MissingAttribute(attribute.to_string()))?;

    record.get(position).ok_or(RecordError::Malformed {
        expected: entity.attributes.len(),
        found: record.fields.len(),
    })
}
