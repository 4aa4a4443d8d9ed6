//! Binary serialization for [`ChunkData`].
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `"STCK"` |
//! | 4 | 1 | Chunk width (`u8`) |
//! | 5 | 2 | Chunk height (`u16`, little-endian) |
//! | 7 | V×2 | Tile IDs (`u16`, little-endian) in storage order |
//!
//! Where V = width × height × width.

use crate::chunk::{CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH, ChunkData};
use crate::registry::TileTypeId;

const MAGIC: [u8; 4] = *b"STCK";

const HEADER_LEN: usize = 7;

/// Errors that can occur during chunk deserialization.
#[derive(Debug, thiserror::Error)]
pub enum ChunkSerError {
    /// The data does not start with the expected magic bytes.
    #[error("invalid magic bytes")]
    InvalidMagic,
    /// The data was written for a different chunk size.
    #[error("chunk dimensions {width}x{height} do not match this build")]
    DimensionMismatch {
        /// Stored width.
        width: u8,
        /// Stored height.
        height: u16,
    },
    /// The data is shorter than expected.
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
}

impl ChunkData {
    /// Serializes this chunk into the `STCK` binary format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + CHUNK_VOLUME * 2);
        buf.extend_from_slice(&MAGIC);
        buf.push(CHUNK_WIDTH as u8);
        buf.extend_from_slice(&(CHUNK_HEIGHT as u16).to_le_bytes());
        for tile in self.tiles() {
            buf.extend_from_slice(&tile.0.to_le_bytes());
        }
        buf
    }

    /// Deserializes a chunk written by [`ChunkData::serialize`].
    pub fn deserialize(data: &[u8]) -> Result<Self, ChunkSerError> {
        if data.len() < MAGIC.len() || data[..MAGIC.len()] != MAGIC {
            return Err(ChunkSerError::InvalidMagic);
        }
        if data.len() < HEADER_LEN {
            return Err(ChunkSerError::Truncated {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }

        let width = data[4];
        let height = u16::from_le_bytes([data[5], data[6]]);
        if width as usize != CHUNK_WIDTH || height as usize != CHUNK_HEIGHT {
            return Err(ChunkSerError::DimensionMismatch { width, height });
        }

        let expected = HEADER_LEN + CHUNK_VOLUME * 2;
        if data.len() < expected {
            return Err(ChunkSerError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let tiles = data[HEADER_LEN..expected]
            .chunks_exact(2)
            .map(|pair| TileTypeId(u16::from_le_bytes([pair[0], pair[1]])))
            .collect();

        ChunkData::from_tiles(tiles).ok_or(ChunkSerError::Truncated {
            expected,
            actual: data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_chunk_reads_back_identically() {
        let mut data = ChunkData::new_air();
        data.set(0, 0, 0, TileTypeId(1));
        data.set(15, 63, 15, TileTypeId(300));
        data.fill_column(4, 4, 10..20, TileTypeId(2));

        let bytes = data.serialize();
        assert_eq!(bytes.len(), HEADER_LEN + CHUNK_VOLUME * 2);
        let back = ChunkData::deserialize(&bytes).expect("valid data");
        assert_eq!(back, data);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = ChunkData::new_air().serialize();
        bytes[0] = b'X';
        assert!(matches!(
            ChunkData::deserialize(&bytes),
            Err(ChunkSerError::InvalidMagic)
        ));
        assert!(matches!(
            ChunkData::deserialize(b"ST"),
            Err(ChunkSerError::InvalidMagic)
        ));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = ChunkData::new_air().serialize();
        let err = ChunkData::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, ChunkSerError::Truncated { .. }));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut bytes = ChunkData::new_air().serialize();
        bytes[4] = 32;
        let err = ChunkData::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, ChunkSerError::DimensionMismatch { width: 32, .. }));
    }
}
