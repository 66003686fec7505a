use super::PlyError;
use crate::ops::{sh_dc_to_rgb, sigmoid};
use crate::splats::SplatAttributes;
use crate::transforms::normalize_quaternion;

/// Encoding of the PLY body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyFormat {
    /// Whitespace separated values, one record per line.
    Ascii,
    /// Packed little-endian records.
    BinaryLittleEndian,
    /// Packed big-endian records.
    BinaryBigEndian,
}

/// Scalar types a PLY property can be declared with.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyDataType {
    /// `float` / `float32`
    Float32,
    /// `double` / `float64`
    Float64,
    /// `char` / `int8`
    Int8,
    /// `uchar` / `uint8`
    UInt8,
    /// `short` / `int16`
    Int16,
    /// `ushort` / `uint16`
    UInt16,
    /// `int` / `int32`
    Int32,
    /// `uint` / `uint32`
    UInt32,
}

impl PlyDataType {
    /// Parse a PLY type name.
    pub fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnsupportedProperty(format!("unknown type {type_str}"))),
        }
    }

    /// Size in bytes of a binary value.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// Read a binary value at `offset` of `buf`, widened to `f64`.
    pub fn read_binary(&self, buf: &[u8], offset: usize, format: PlyFormat) -> Result<f64, PlyError> {
        let end = offset.checked_add(self.size()).ok_or(PlyError::Truncated)?;
        let bytes = buf.get(offset..end).ok_or(PlyError::Truncated)?;
        let big_endian = format == PlyFormat::BinaryBigEndian;

        macro_rules! read {
            ($t:ty) => {{
                let raw: [u8; std::mem::size_of::<$t>()] =
                    bytes.try_into().map_err(|_| PlyError::Truncated)?;
                match big_endian {
                    true => <$t>::from_be_bytes(raw) as f64,
                    false => <$t>::from_le_bytes(raw) as f64,
                }
            }};
        }

        Ok(match self {
            PlyDataType::Float32 => read!(f32),
            PlyDataType::Float64 => read!(f64),
            PlyDataType::Int8 => read!(i8),
            PlyDataType::UInt8 => read!(u8),
            PlyDataType::Int16 => read!(i16),
            PlyDataType::UInt16 => read!(u16),
            PlyDataType::Int32 => read!(i32),
            PlyDataType::UInt32 => read!(u32),
        })
    }

    /// Parse an ascii value, widened to `f64`.
    pub fn parse_ascii(&self, token: &str) -> Result<f64, PlyError> {
        let invalid = || PlyError::InvalidValue(format!("{:?} is not a valid {:?}", token, self));
        match self {
            PlyDataType::Float32 | PlyDataType::Float64 => token.parse::<f64>().map_err(|_| invalid()),
            PlyDataType::Int8 => token.parse::<i8>().map(f64::from).map_err(|_| invalid()),
            PlyDataType::UInt8 => token.parse::<u8>().map(f64::from).map_err(|_| invalid()),
            PlyDataType::Int16 => token.parse::<i16>().map(f64::from).map_err(|_| invalid()),
            PlyDataType::UInt16 => token.parse::<u16>().map(f64::from).map_err(|_| invalid()),
            PlyDataType::Int32 => token.parse::<i32>().map(f64::from).map_err(|_| invalid()),
            PlyDataType::UInt32 => token.parse::<u32>().map(f64::from).map_err(|_| invalid()),
        }
    }
}

/// A property declared for a PLY element.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// Property name.
    pub name: String,
    /// Value type, or item type for list properties.
    pub data_type: PlyDataType,
    /// Type of the item count for list properties, `None` for scalars.
    pub list_count_type: Option<PlyDataType>,
}

impl PlyPropertyDefinition {
    /// Whether the property is a variable-length list.
    pub fn is_list(&self) -> bool {
        self.list_count_type.is_some()
    }
}

/// Names of the vertex properties a Gaussian splat PLY must declare.
pub const GAUSSIAN_PROPERTIES: [&str; 14] = [
    "x", "y", "z", "scale_0", "scale_1", "scale_2", "rot_0", "rot_1", "rot_2", "rot_3", "f_dc_0",
    "f_dc_1", "f_dc_2", "opacity",
];

// Convert a decoded list length into an item count.
pub(crate) fn list_count(value: f64) -> Result<usize, PlyError> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(PlyError::InvalidValue(format!("{value} is not a valid list length")));
    }
    Ok(value as usize)
}

/// Byte offset of every property inside a binary record.
///
/// The returned vector has one entry per property plus a final entry holding the record
/// length. List properties are walked by reading their stored item count.
pub fn binary_offsets(
    properties: &[PlyPropertyDefinition],
    record: &[u8],
    format: PlyFormat,
) -> Result<Vec<usize>, PlyError> {
    let mut offsets = Vec::with_capacity(properties.len() + 1);
    let mut offset = 0usize;
    for property in properties {
        offsets.push(offset);
        offset = match property.list_count_type {
            None => offset + property.data_type.size(),
            Some(count_type) => {
                let count = list_count(count_type.read_binary(record, offset, format)?)?;
                count
                    .checked_mul(property.data_type.size())
                    .and_then(|len| len.checked_add(offset + count_type.size()))
                    .ok_or(PlyError::Truncated)?
            }
        };
    }
    offsets.push(offset);
    Ok(offsets)
}

// Token index of every property in an ascii record, plus the token count of the record.
fn ascii_positions(
    properties: &[PlyPropertyDefinition],
    tokens: &[&str],
) -> Result<Vec<usize>, PlyError> {
    let mut positions = Vec::with_capacity(properties.len() + 1);
    let mut position = 0usize;
    for property in properties {
        positions.push(position);
        position += match property.list_count_type {
            None => 1,
            Some(count_type) => {
                let token = tokens.get(position).ok_or_else(|| {
                    PlyError::InvalidValue(format!("missing length of list {}", property.name))
                })?;
                1 + list_count(count_type.parse_ascii(token)?)?
            }
        };
    }
    positions.push(position);
    Ok(positions)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PropertySlot {
    // position of the property in the record
    index: usize,
    // byte offset of the property in a fixed-size binary record
    offset: usize,
    data_type: PlyDataType,
}

/// Where the Gaussian properties live inside a vertex record.
///
/// Any property order is accepted, undeclared extra properties are skipped. Extra list
/// properties make the records variable-sized and are walked over record by record.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianLayout {
    properties: Vec<PlyPropertyDefinition>,
    slots: [PropertySlot; 14],
    stride: Option<usize>,
}

impl GaussianLayout {
    /// Locate the Gaussian properties in a vertex schema.
    pub fn new(properties: &[PlyPropertyDefinition]) -> Result<Self, PlyError> {
        let mut slots = [PropertySlot {
            index: 0,
            offset: 0,
            data_type: PlyDataType::Float32,
        }; 14];
        for (slot, name) in slots.iter_mut().zip(GAUSSIAN_PROPERTIES) {
            let index = properties
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| PlyError::MissingProperty(name.to_string()))?;
            let property = &properties[index];
            if property.is_list() {
                return Err(PlyError::UnsupportedProperty(format!(
                    "{name} must be a scalar property"
                )));
            }
            let offset = properties[..index]
                .iter()
                .map(|p| p.data_type.size())
                .sum();
            *slot = PropertySlot {
                index,
                offset,
                data_type: property.data_type,
            };
        }

        let stride = match properties.iter().any(|p| p.is_list()) {
            true => None,
            false => Some(properties.iter().map(|p| p.data_type.size()).sum()),
        };

        Ok(Self {
            properties: properties.to_vec(),
            slots,
            stride,
        })
    }

    /// Size in bytes of a binary vertex record, `None` when list properties make it variable.
    pub fn stride(&self) -> Option<usize> {
        self.stride
    }

    /// Decode a binary vertex record.
    pub fn decode_binary(&self, record: &[u8], format: PlyFormat) -> Result<GaussianVertex, PlyError> {
        let offsets = match self.stride {
            Some(_) => None,
            None => Some(binary_offsets(&self.properties, record, format)?),
        };

        let mut values = [0.0f32; 14];
        for (value, slot) in values.iter_mut().zip(&self.slots) {
            let offset = offsets.as_ref().map_or(slot.offset, |o| o[slot.index]);
            *value = slot.data_type.read_binary(record, offset, format)? as f32;
        }
        Ok(GaussianVertex::from_values(&values))
    }

    /// Decode an ascii vertex record.
    pub fn decode_ascii(&self, line: &str) -> Result<GaussianVertex, PlyError> {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        let positions = ascii_positions(&self.properties, &tokens)?;
        let expected = positions[self.properties.len()];
        if tokens.len() != expected {
            return Err(PlyError::InvalidValue(format!(
                "expected {} values per vertex, got {}",
                expected,
                tokens.len()
            )));
        }

        let mut values = [0.0f32; 14];
        for (value, slot) in values.iter_mut().zip(&self.slots) {
            *value = slot.data_type.parse_ascii(tokens[positions[slot.index]])? as f32;
        }
        Ok(GaussianVertex::from_values(&values))
    }
}

/// A Gaussian vertex as stored in the PLY file, before decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianVertex {
    /// `x, y, z`
    pub position: [f32; 3],
    /// `scale_0..2`, natural log of the scale.
    pub log_scale: [f32; 3],
    /// `rot_0..3`, unnormalized `(w, x, y, z)`.
    pub rotation: [f32; 4],
    /// `f_dc_0..2`, spherical-harmonic DC color terms.
    pub f_dc: [f32; 3],
    /// `opacity`, logit of the opacity.
    pub opacity: f32,
}

impl GaussianVertex {
    // values ordered as GAUSSIAN_PROPERTIES
    fn from_values(v: &[f32; 14]) -> Self {
        Self {
            position: [v[0], v[1], v[2]],
            log_scale: [v[3], v[4], v[5]],
            rotation: [v[6], v[7], v[8], v[9]],
            f_dc: [v[10], v[11], v[12]],
            opacity: v[13],
        }
    }

    /// Draw priority of the vertex, see [`crate::ops::importance`].
    pub fn importance(&self) -> f64 {
        crate::ops::importance(&self.log_scale, self.opacity)
    }

    /// Decode the stored values.
    ///
    /// # Returns
    ///
    /// The decoded attributes and whether the stored rotation was degenerate (zero or
    /// non-finite norm) and replaced by the identity.
    pub fn decode(&self) -> (SplatAttributes, bool) {
        let (rotation, degenerate) = match normalize_quaternion(&self.rotation) {
            Some(rotation) => (rotation, false),
            None => ([1.0, 0.0, 0.0, 0.0], true),
        };

        let attributes = SplatAttributes {
            position: self.position,
            scale: self.log_scale.map(f32::exp),
            rotation,
            color: self.f_dc.map(|c| sh_dc_to_rgb(c as f64) as f32),
            opacity: sigmoid(self.opacity as f64) as f32,
        };
        (attributes, degenerate)
    }
}
