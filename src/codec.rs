// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encodes a [`Record`] into a single self-framed binary blob and decodes it back.
//!
//! Frame layout (network byte order, all lengths unsigned 32-bit):
//!
//! ```text
//! [ frame_body_length : u32 ]
//! [ record_id_blob    : 36 B ]
//! [ field_count       : u32 ]
//!   repeated field_count times:
//!      [ key_length   : u32 ][ key_bytes   : key_length   ]
//!      [ value_length : u32 ][ value_bytes : value_length ]
//! ```

use crate::error::Error;
use crate::record::{Record, ID_FIELD};
use uuid::Uuid;

/// Width of the NUL-padded `_id` blob.
pub const ID_BLOB_LEN: usize = 36;

/// Encodes a record into a single self-framed blob, assigning a UUIDv4 `_id` if absent.
///
/// Mutates `record` in place so the caller observes the assigned id.
pub fn encode(record: &mut Record) -> Result<Vec<u8>, Error> {
    if record.id().is_empty() {
        record.set_id(Uuid::new_v4().to_string());
    }

    let id = record.id().to_string();
    if id.as_bytes().len() > ID_BLOB_LEN {
        return Err(Error::RecordEncodingError(format!(
            "_id {id:?} exceeds {ID_BLOB_LEN} bytes"
        )));
    }

    let mut id_blob = [0u8; ID_BLOB_LEN];
    id_blob[..id.as_bytes().len()].copy_from_slice(id.as_bytes());

    let mut body = Vec::with_capacity(128);
    body.extend_from_slice(&id_blob);
    body.extend_from_slice(&(record.fields().len() as u32).to_be_bytes());

    for (key, value) in record.iter() {
        let key_bytes = key.as_bytes();
        let value_bytes = value.as_bytes();
        body.extend_from_slice(&(key_bytes.len() as u32).to_be_bytes());
        body.extend_from_slice(key_bytes);
        body.extend_from_slice(&(value_bytes.len() as u32).to_be_bytes());
        body.extend_from_slice(value_bytes);
    }

    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes the body of a single frame (the bytes *after* the `frame_body_length` prefix).
///
/// Returns `None` on any structural mismatch; the caller is expected to log and skip.
pub fn decode_body(body: &[u8]) -> Option<Record> {
    if body.len() < ID_BLOB_LEN + 4 {
        return None;
    }
    let id_raw = &body[..ID_BLOB_LEN];
    let id_end = id_raw.iter().position(|&b| b == 0).unwrap_or(ID_BLOB_LEN);
    let id = std::str::from_utf8(&id_raw[..id_end]).ok()?.to_string();

    let mut offset = ID_BLOB_LEN;
    let field_count = read_u32(body, offset)?;
    offset += 4;

    let mut record = Record::new();
    record.set_id(id);

    for _ in 0..field_count {
        let key_len = read_u32(body, offset)? as usize;
        offset += 4;
        let key_bytes = body.get(offset..offset + key_len)?;
        let key = std::str::from_utf8(key_bytes).ok()?.to_string();
        offset += key_len;

        let value_len = read_u32(body, offset)? as usize;
        offset += 4;
        let value_bytes = body.get(offset..offset + value_len)?;
        let value = String::from_utf8_lossy(value_bytes).into_owned();
        offset += value_len;

        if key != ID_FIELD {
            record.set(key, value);
        }
    }

    Some(record)
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let slice = buf.get(offset..offset + 4)?;
    Some(u32::from_be_bytes(slice.try_into().ok()?))
}
