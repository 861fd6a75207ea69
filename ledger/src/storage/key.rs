//! # Composite Keys
//!
//! A composite key is an object type tag followed by an ordered tuple of
//! string parts. Each component is escaped and then terminated:
//!
//! | Byte in component | Encoded as  |
//! |-------------------|-------------|
//! | `0x00`            | `0x01 0x01` |
//! | `0x01`            | `0x01 0x02` |
//! | anything else     | itself      |
//! | end of component  | `0x00`      |
//!
//! The terminator is the smallest byte and never appears inside an encoded
//! component, so byte order on keys equals lexicographic order on the
//! `(type, part1, part2, ..)` tuple. Because every component ends with a
//! terminator, the encoding of a shorter tuple is a byte prefix of exactly
//! the keys that extend that tuple: scanning `(type, "a")` visits
//! `(type, "a", ..)` and never `(type, "ab", ..)`.

use super::kv::{StoreError, StoreResult};

const TERMINATOR: u8 = 0x00;
const ESCAPE: u8 = 0x01;

fn push_component(out: &mut Vec<u8>, component: &str) {
    for &byte in component.as_bytes() {
        match byte {
            TERMINATOR => out.extend_from_slice(&[ESCAPE, 0x01]),
            ESCAPE => out.extend_from_slice(&[ESCAPE, 0x02]),
            other => out.push(other),
        }
    }
    out.push(TERMINATOR);
}

/// Encode `(object_type, parts..)` into a store key.
///
/// The same bytes serve as a scan prefix for every key extending the tuple.
pub fn encode<S: AsRef<str>>(object_type: &str, parts: &[S]) -> StoreResult<Vec<u8>> {
    if object_type.is_empty() {
        return Err(StoreError::InvalidKey("object type must not be empty".into()));
    }

    let capacity = object_type.len() + 1 + parts.iter().map(|p| p.as_ref().len() + 1).sum::<usize>();
    let mut key = Vec::with_capacity(capacity);
    push_component(&mut key, object_type);
    for part in parts {
        push_component(&mut key, part.as_ref());
    }
    Ok(key)
}

/// Decode a store key back into its object type and parts.
pub fn decode(key: &[u8]) -> StoreResult<(String, Vec<String>)> {
    let mut components = Vec::new();
    let mut current = Vec::new();
    let mut bytes = key.iter();

    while let Some(&byte) = bytes.next() {
        match byte {
            TERMINATOR => components.push(std::mem::take(&mut current)),
            ESCAPE => match bytes.next() {
                Some(0x01) => current.push(TERMINATOR),
                Some(0x02) => current.push(ESCAPE),
                _ => return Err(StoreError::InvalidKey("dangling escape byte".into())),
            },
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        return Err(StoreError::InvalidKey("unterminated component".into()));
    }

    let mut strings = components
        .into_iter()
        .map(|c| String::from_utf8(c).map_err(|e| StoreError::InvalidKey(e.to_string())));
    let object_type = strings
        .next()
        .transpose()?
        .filter(|t| !t.is_empty())
        .ok_or_else(|| StoreError::InvalidKey("missing object type".into()))?;
    let parts = strings.collect::<StoreResult<Vec<_>>>()?;
    Ok((object_type, parts))
}
