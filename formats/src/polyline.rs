//! Decoder for encoded polylines, the compact route geometry used by the
//! directions provider.
//!
//! The format stores successive coordinate deltas.  Each delta is a zig-zag
//! signed integer cut into 5-bit groups, each group stored little-endian in
//! one printable character (character code − 63), bit 0x20 marking a
//! continuation.  Values are scaled by 1e5, i.e. five decimal places.
//!

use thiserror::Error;

use transit_common::Position;

/// Fixed precision factor, 5 decimal places.
const PRECISION: f64 = 1e5;

/// Continuation bit inside one 6-bit group.
const CONT: i64 = 0x20;

/// Everything that can go wrong while decoding.
///
#[derive(Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    #[error("polyline truncated inside a group at offset {0}")]
    Truncated(usize),
    #[error("invalid character {0:#04x} at offset {1}")]
    BadChar(u8, usize),
}

/// Decode an encoded polyline into the full ordered list of positions.
///
/// The result is fully materialized: callers render it as one path.
///
#[tracing::instrument]
pub fn decode(encoded: &str) -> Result<Vec<Position>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut path = Vec::new();

    let mut idx = 0;
    let (mut lat, mut lon) = (0i64, 0i64);

    while idx < bytes.len() {
        let (dlat, next) = next_delta(bytes, idx)?;
        let (dlon, next) = next_delta(bytes, next)?;

        lat += dlat;
        lon += dlon;
        idx = next;

        path.push(Position::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
    }
    Ok(path)
}

/// Reassemble one zig-zag encoded delta starting at `idx`, return it with the
/// offset of the next one.  Never reads past the end of `bytes`.
///
fn next_delta(bytes: &[u8], mut idx: usize) -> Result<(i64, usize), DecodeError> {
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        if idx >= bytes.len() {
            return Err(DecodeError::Truncated(idx));
        }
        let b = bytes[idx];
        if b < 63 {
            return Err(DecodeError::BadChar(b, idx));
        }

        let group = (b - 63) as i64;
        result |= (group & 0x1f) << shift;
        shift += 5;
        idx += 1;

        if group & CONT == 0 {
            break;
        }
    }

    // Undo the zig-zag: lowest bit is the sign.
    //
    let delta = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((delta, idx))
}
