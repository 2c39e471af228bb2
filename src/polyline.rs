//! Encoded-polyline codec for route geometries.
//!
//! Routes travel over the wire as compact polyline strings: each
//! coordinate is scaled to 1e-5 degrees and the delta from the previous
//! point is written as zig-zag-signed 5-bit groups offset by 63.
//! Decoding happens at the provider boundary; internal processing works
//! on [`GeoPoint`] sequences.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::GeoPoint;

/// Coordinate scaling factor (1e-5 degree precision).
const PRECISION: f64 = 1e5;

/// Minimum valid code point in an encoded polyline.
const MIN_CHUNK: u8 = 63;

/// Raised when an encoded polyline contains bytes outside the encoding
/// alphabet or ends mid-coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPolylineError {
    #[error("invalid polyline byte {byte:#04x} at offset {offset}")]
    InvalidByte { byte: u8, offset: usize },
    #[error("polyline truncated mid-coordinate")]
    Truncated,
    #[error("polyline coordinate overflows at offset {offset}")]
    Overflow { offset: usize },
}

/// A route geometry as a decoded coordinate sequence.
///
/// Stores points directly for internal processing; use [`encode`] /
/// [`decode`] at API boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<GeoPoint>,
}

impl Polyline {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    /// Decodes an encoded polyline string.
    pub fn from_encoded(encoded: &str) -> Result<Self, MalformedPolylineError> {
        decode(encoded).map(Self::new)
    }

    /// Encodes the points back to the compact string form.
    pub fn to_encoded(&self) -> String {
        encode(&self.points)
    }
}

/// Decodes a polyline string into its coordinate sequence.
///
/// Empty input yields an empty sequence. Any byte below the encoding's
/// minimum code point (63) is rejected.
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, MalformedPolylineError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut offset = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while offset < bytes.len() {
        lat += decode_value(bytes, &mut offset)?;
        lng += decode_value(bytes, &mut offset)?;
        points.push(GeoPoint::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(points)
}

/// Encodes a coordinate sequence as a compact polyline string.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn decode_value(bytes: &[u8], offset: &mut usize) -> Result<i64, MalformedPolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*offset).ok_or(MalformedPolylineError::Truncated)?;
        if byte < MIN_CHUNK {
            return Err(MalformedPolylineError::InvalidByte {
                byte,
                offset: *offset,
            });
        }
        // A valid delta fits in far fewer chunks than this; an
        // unterminated continuation run must not shift past the i64.
        if shift >= 60 {
            return Err(MalformedPolylineError::Overflow { offset: *offset });
        }
        *offset += 1;

        let chunk = (byte - MIN_CHUNK) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    // Undo zig-zag sign encoding
    if result & 1 == 1 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

fn encode_value(value: i64, out: &mut String) {
    // Zig-zag so small negative deltas stay short
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };

    while v >= 0x20 {
        out.push(((0x20 | (v & 0x1f)) as u8 + MIN_CHUNK) as char);
        v >>= 5;
    }
    out.push((v as u8 + MIN_CHUNK) as char);
}
