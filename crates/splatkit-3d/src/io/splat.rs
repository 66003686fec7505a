use std::path::Path;

use super::{build_cloud, LoadOptions, SplatError};
use crate::parallel::{self, ExecutionStrategy};
use crate::splats::{SplatAttributes, SplatCloud};

/// Size in bytes of one packed splat record.
pub const RECORD_SIZE: usize = 32;

/// Error types for the packed `.splat` format.
#[derive(Debug, thiserror::Error)]
pub enum PackedSplatError {
    /// The byte count is not aligned to the record size.
    #[error("{0} bytes is not a multiple of the 32-byte record size")]
    Misaligned(usize),

    /// Failed to decode a record.
    #[error("Failed to decode splat record. {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// One record of a packed `.splat` file, as stored.
///
/// Layout (little-endian): position `3 x f32`, scale `3 x f32`, RGBA `4 x u8`,
/// rotation `(w, x, y, z)` as `4 x u8`.
#[derive(Debug, Clone, Copy, PartialEq, bincode::Decode)]
pub struct PackedSplatRecord {
    /// World position.
    pub position: [f32; 3],
    /// Per-axis scale, stored linearly.
    pub scale: [f32; 3],
    /// Color and opacity, `0..=255`.
    pub rgba: [u8; 4],
    /// Quantized quaternion, `0` maps to `-1` and `255` to `1`.
    pub rotation: [u8; 4],
}

/// Decode a color or opacity byte into `[0, 1]`.
#[inline]
pub fn decode_unit_byte(value: u8) -> f32 {
    value as f32 / 255.0
}

/// Decode a quantized quaternion component into `[-1, 1]`.
///
/// No byte maps exactly to zero: `127` gives `-1/255` and `128` gives `1/255`.
#[inline]
pub fn decode_rotation_byte(value: u8) -> f32 {
    value as f32 / 255.0 * 2.0 - 1.0
}

impl PackedSplatRecord {
    /// Decode a record from the first [`RECORD_SIZE`] bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, PackedSplatError> {
        let config = bincode::config::standard()
            .with_little_endian()
            .with_fixed_int_encoding();
        let (record, _): (PackedSplatRecord, usize) = bincode::decode_from_slice(bytes, config)?;
        Ok(record)
    }

    /// Convert the stored fields into splat attributes.
    ///
    /// The quantized rotation is kept as decoded, it is close to unit length by construction.
    pub fn to_attributes(&self) -> SplatAttributes {
        SplatAttributes {
            position: self.position,
            scale: self.scale,
            rotation: self.rotation.map(decode_rotation_byte),
            color: [
                decode_unit_byte(self.rgba[0]),
                decode_unit_byte(self.rgba[1]),
                decode_unit_byte(self.rgba[2]),
            ],
            opacity: decode_unit_byte(self.rgba[3]),
        }
    }
}

/// Decode every record of a packed buffer, keeping the file order.
///
/// # Errors
///
/// [`SplatError::MalformedFile`] when the length is not a multiple of [`RECORD_SIZE`].
pub fn decode_splat_records(
    bytes: &[u8],
    strategy: ExecutionStrategy,
) -> Result<Vec<SplatAttributes>, SplatError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(PackedSplatError::Misaligned(bytes.len()).into());
    }

    let records = parallel::map_chunks_collect(bytes, RECORD_SIZE, strategy, |record| {
        PackedSplatRecord::decode(record).map(|r| r.to_attributes())
    })?;

    Ok(records.into_iter().collect::<Result<Vec<_>, _>>()?)
}

/// Read a packed splat scene from memory.
///
/// With [`ExecutionStrategy::Fixed`] a single thread pool serves the whole load.
pub fn read_splat_bytes(bytes: &[u8], options: &LoadOptions) -> Result<SplatCloud, SplatError> {
    options.strategy.install(|strategy| {
        let options = options.with_strategy(strategy);
        let attributes = decode_splat_records(bytes, options.strategy)?;
        log::debug!("decoded {} packed splat records", attributes.len());
        build_cloud(&attributes, &options)
    })?
}

/// Read a packed `.splat` file.
///
/// # Arguments
///
/// * `path` - Path to the file.
/// * `options` - Centering and execution options.
pub fn read_splat_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<SplatCloud, SplatError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| SplatError::unreadable(path, err))?;
    read_splat_bytes(&bytes, options)
}
