//! Decoding of raw JSON text messages into typed [`Batch`] values.
//!
//! Decoding is a pure parse-and-validate step: it never resolves materials
//! and never touches a grid. All dynamic field probing happens here, at the
//! boundary — downstream code matches exhaustively over the [`Batch`] enum.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

use crate::messages::{Batch, DenseBatch, SparseBatch, Voxel};

/// Wire `type` tag for sparse batches.
pub const TYPE_SPARSE: &str = "bulkVoxels";
/// Wire `type` tag for dense batches.
pub const TYPE_DENSE: &str = "compressedVoxels";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while decoding a wire message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The message is not parseable JSON.
    #[error("invalid JSON message: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The `type` field is missing or names no known batch encoding.
    #[error("unknown or missing message type")]
    UnknownType,

    /// A required field is missing or has the wrong shape.
    #[error("malformed or missing field `{0}`")]
    MalformedField(String),
}

fn malformed(field: &str) -> DecodeError {
    DecodeError::MalformedField(field.to_string())
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn req_str(obj: &Map<String, Value>, field: &str) -> Result<String, DecodeError> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| malformed(field))
}

fn req_i32(obj: &Map<String, Value>, field: &str) -> Result<i32, DecodeError> {
    obj.get(field)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| malformed(field))
}

/// Like [`req_i32`] but additionally rejects negative values (cuboid sizes).
fn req_size(obj: &Map<String, Value>, field: &str) -> Result<u32, DecodeError> {
    obj.get(field)
        .and_then(Value::as_i64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| malformed(field))
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode one wire message into a typed [`Batch`].
///
/// # Errors
///
/// [`DecodeError::UnknownType`] if the `type` field is absent or names no
/// known encoding; [`DecodeError::MalformedField`] naming the offending field
/// for any structural violation.
pub fn decode(message: &str) -> Result<Batch, DecodeError> {
    let value: Value = serde_json::from_str(message).map_err(DecodeError::InvalidJson)?;
    let obj = value.as_object().ok_or(DecodeError::UnknownType)?;

    match obj.get("type").and_then(Value::as_str) {
        Some(TYPE_SPARSE) => decode_sparse(obj).map(Batch::Sparse),
        Some(TYPE_DENSE) => decode_dense(obj).map(Batch::Dense),
        _ => Err(DecodeError::UnknownType),
    }
}

fn decode_sparse(obj: &Map<String, Value>) -> Result<SparseBatch, DecodeError> {
    let world = req_str(obj, "world")?;
    let entries = obj
        .get("voxels")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("voxels"))?;

    // Input order is preserved: it defines application order.
    let mut voxels = Vec::with_capacity(entries.len());
    for entry in entries {
        let voxel = entry.as_object().ok_or_else(|| malformed("voxels"))?;
        voxels.push(Voxel {
            x: req_i32(voxel, "x")?,
            y: req_i32(voxel, "y")?,
            z: req_i32(voxel, "z")?,
            material: req_str(voxel, "material")?,
        });
    }

    Ok(SparseBatch { world, voxels })
}

fn decode_dense(obj: &Map<String, Value>) -> Result<DenseBatch, DecodeError> {
    let world = req_str(obj, "world")?;
    let origin = (
        req_i32(obj, "startX")?,
        req_i32(obj, "startY")?,
        req_i32(obj, "startZ")?,
    );
    let size = (
        req_size(obj, "sizeX")?,
        req_size(obj, "sizeY")?,
        req_size(obj, "sizeZ")?,
    );

    let data = req_str(obj, "data")?;
    let payload = BASE64.decode(&data).map_err(|_| malformed("data"))?;

    let palette = match obj.get("palette") {
        None => None,
        Some(value) => {
            let entries = value.as_array().ok_or_else(|| malformed("palette"))?;
            let names = entries
                .iter()
                .map(|e| e.as_str().map(str::to_owned).ok_or_else(|| malformed("palette")))
                .collect::<Result<Vec<_>, _>>()?;
            Some(names)
        }
    };

    Ok(DenseBatch {
        world,
        origin,
        size,
        payload,
        palette,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_payload(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    #[test]
    fn test_sparse_batch_decodes_in_input_order() {
        let msg = r#"{
            "type": "bulkVoxels",
            "world": "overworld",
            "voxels": [
                {"x": 1, "y": 2, "z": 3, "material": "stone"},
                {"x": -4, "y": 0, "z": 9, "material": "dirt"}
            ]
        }"#;
        let batch = decode(msg).unwrap();
        let Batch::Sparse(sparse) = batch else {
            panic!("expected sparse batch");
        };
        assert_eq!(sparse.world, "overworld");
        assert_eq!(sparse.voxels.len(), 2);
        assert_eq!(sparse.voxels[0].material, "stone");
        assert_eq!(sparse.voxels[1].x, -4);
    }

    #[test]
    fn test_sparse_batch_may_be_empty() {
        let msg = r#"{"type": "bulkVoxels", "world": "w", "voxels": []}"#;
        let Batch::Sparse(sparse) = decode(msg).unwrap() else {
            panic!("expected sparse batch");
        };
        assert!(sparse.voxels.is_empty());
    }

    #[test]
    fn test_missing_type_is_unknown_type() {
        let msg = r#"{"world": "w", "voxels": []}"#;
        assert!(matches!(decode(msg), Err(DecodeError::UnknownType)));
    }

    #[test]
    fn test_unrecognized_type_is_unknown_type() {
        let msg = r#"{"type": "teleport", "world": "w"}"#;
        assert!(matches!(decode(msg), Err(DecodeError::UnknownType)));
    }

    #[test]
    fn test_non_object_message_is_unknown_type() {
        assert!(matches!(decode("[1, 2, 3]"), Err(DecodeError::UnknownType)));
    }

    #[test]
    fn test_unparseable_message_is_invalid_json() {
        assert!(matches!(
            decode("not json at all"),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_missing_voxel_material_names_the_field() {
        let msg = r#"{
            "type": "bulkVoxels",
            "world": "w",
            "voxels": [{"x": 1, "y": 2, "z": 3}]
        }"#;
        match decode(msg) {
            Err(DecodeError::MalformedField(field)) => assert_eq!(field, "material"),
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_world_names_the_field() {
        let msg = r#"{"type": "bulkVoxels", "voxels": []}"#;
        match decode(msg) {
            Err(DecodeError::MalformedField(field)) => assert_eq!(field, "world"),
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_non_integer_coordinate_names_the_field() {
        let msg = r#"{
            "type": "bulkVoxels",
            "world": "w",
            "voxels": [{"x": 1.5, "y": 2, "z": 3, "material": "stone"}]
        }"#;
        match decode(msg) {
            Err(DecodeError::MalformedField(field)) => assert_eq!(field, "x"),
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_dense_batch_decodes_with_palette() {
        let msg = format!(
            r#"{{
                "type": "compressedVoxels",
                "world": "overworld",
                "startX": -16, "startY": 64, "startZ": 32,
                "sizeX": 2, "sizeY": 2, "sizeZ": 2,
                "data": "{}",
                "palette": ["stone", "dirt"]
            }}"#,
            encode_payload(&[0, 1, 0, 1, 0, 1, 0, 1])
        );
        let Batch::Dense(dense) = decode(&msg).unwrap() else {
            panic!("expected dense batch");
        };
        assert_eq!(dense.origin, (-16, 64, 32));
        assert_eq!(dense.size, (2, 2, 2));
        assert_eq!(dense.payload, vec![0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(
            dense.palette,
            Some(vec!["stone".to_string(), "dirt".to_string()])
        );
    }

    #[test]
    fn test_dense_batch_palette_is_optional() {
        let msg = format!(
            r#"{{
                "type": "compressedVoxels",
                "world": "w",
                "startX": 0, "startY": 0, "startZ": 0,
                "sizeX": 1, "sizeY": 1, "sizeZ": 3,
                "data": "{}"
            }}"#,
            encode_payload(&[1, 2, 3])
        );
        let Batch::Dense(dense) = decode(&msg).unwrap() else {
            panic!("expected dense batch");
        };
        assert_eq!(dense.palette, None);
        assert_eq!(dense.payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_dense_batch_bad_base64_names_data_field() {
        let msg = r#"{
            "type": "compressedVoxels",
            "world": "w",
            "startX": 0, "startY": 0, "startZ": 0,
            "sizeX": 1, "sizeY": 1, "sizeZ": 1,
            "data": "!!not base64!!"
        }"#;
        match decode(msg) {
            Err(DecodeError::MalformedField(field)) => assert_eq!(field, "data"),
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_dense_batch_negative_size_rejected() {
        let msg = format!(
            r#"{{
                "type": "compressedVoxels",
                "world": "w",
                "startX": 0, "startY": 0, "startZ": 0,
                "sizeX": -2, "sizeY": 1, "sizeZ": 1,
                "data": "{}"
            }}"#,
            encode_payload(&[1, 2])
        );
        match decode(&msg) {
            Err(DecodeError::MalformedField(field)) => assert_eq!(field, "sizeX"),
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_dense_batch_non_string_palette_entry_rejected() {
        let msg = format!(
            r#"{{
                "type": "compressedVoxels",
                "world": "w",
                "startX": 0, "startY": 0, "startZ": 0,
                "sizeX": 1, "sizeY": 1, "sizeZ": 1,
                "data": "{}",
                "palette": ["stone", 7]
            }}"#,
            encode_payload(&[0])
        );
        match decode(&msg) {
            Err(DecodeError::MalformedField(field)) => assert_eq!(field, "palette"),
            other => panic!("expected MalformedField, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_may_be_shorter_than_volume() {
        // Truncated payloads are a valid encoding, not a decode error.
        let msg = format!(
            r#"{{
                "type": "compressedVoxels",
                "world": "w",
                "startX": 0, "startY": 0, "startZ": 0,
                "sizeX": 10, "sizeY": 1, "sizeZ": 1,
                "data": "{}"
            }}"#,
            encode_payload(&[1, 2, 3, 4])
        );
        let Batch::Dense(dense) = decode(&msg).unwrap() else {
            panic!("expected dense batch");
        };
        assert_eq!(dense.payload.len(), 4);
        assert_eq!(dense.volume(), 10);
    }
}
