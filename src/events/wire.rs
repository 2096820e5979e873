// src/events/wire.rs

//! Byte-level framing for the asset-event stream.
//!
//! Each frame on the wire is, in little-endian order:
//!
//! ```text
//! [u32 frame length] [u32 message kind] [u32 string length] [path bytes] [NUL]
//! ```
//!
//! The frame length counts everything after the length field itself. The
//! path is UTF-8 with forward-slash separators and a terminating NUL so
//! consumers in C-flavored runtimes can use it in place.

/// Message kinds understood by consumers. The discriminant is the on-wire
/// tag; it must fit the `u32` wire width by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageKind {
    AssetCompiled = 1,
}

/// Encode one asset-compiled frame, including the leading length field.
pub fn encode_asset_compiled(path: &str) -> Vec<u8> {
    let bytes = path.as_bytes();
    let str_len = bytes.len() as u32;
    // kind + string length + string bytes + NUL
    let frame_len = 4 + 4 + str_len + 1;

    let mut frame = Vec::with_capacity(4 + frame_len as usize);
    frame.extend_from_slice(&frame_len.to_le_bytes());
    frame.extend_from_slice(&(MessageKind::AssetCompiled as u32).to_le_bytes());
    frame.extend_from_slice(&str_len.to_le_bytes());
    frame.extend_from_slice(bytes);
    frame.push(0);
    frame
}
