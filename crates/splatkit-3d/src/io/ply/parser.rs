use std::io::{BufRead, Read};
use std::path::Path;

use super::{
    properties::{
        list_count, GaussianLayout, GaussianVertex, PlyDataType, PlyFormat, PlyPropertyDefinition,
    },
    PlyError,
};
use crate::io::{build_cloud, LoadOptions, SplatError};
use crate::parallel::{self, ExecutionStrategy};
use crate::splats::SplatCloud;

/// An element declared in a PLY header, e.g. `element vertex 100`.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyElement {
    /// Element name.
    pub name: String,
    /// Number of records.
    pub count: usize,
    /// Properties of every record, in storage order.
    pub properties: Vec<PlyPropertyDefinition>,
}

impl PlyElement {
    /// Size in bytes of one binary record, `None` when list properties make it variable.
    pub fn record_size(&self) -> Option<usize> {
        self.properties
            .iter()
            .map(|p| (!p.is_list()).then_some(p.data_type.size()))
            .sum()
    }
}

/// The header of a PLY file.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyHeader {
    /// Encoding of the body.
    pub format: PlyFormat,
    /// Elements in the order their records are stored.
    pub elements: Vec<PlyElement>,
}

impl PlyHeader {
    /// Get the position and declaration of the `vertex` element.
    pub fn vertex_element(&self) -> Result<(usize, &PlyElement), PlyError> {
        self.elements
            .iter()
            .enumerate()
            .find(|(_, e)| e.name == "vertex")
            .ok_or_else(|| PlyError::InvalidHeader("no vertex element".to_string()))
    }
}

fn parse_count(token: Option<&str>, line: &str) -> Result<usize, PlyError> {
    token
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| PlyError::InvalidHeader(format!("invalid element count in {line:?}")))
}

/// Parse a PLY header, leaving `reader` at the first byte of the body.
pub fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut is_ply = false;
    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PlyError::InvalidHeader("missing end_header".to_string()));
        }
        let trimmed = line.trim();

        if !is_ply {
            if trimmed != "ply" {
                return Err(PlyError::InvalidHeader("missing ply magic".to_string()));
            }
            is_ply = true;
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        match parts.next() {
            Some("end_header") => break,
            Some("comment") | Some("obj_info") | None => {}
            Some("format") => {
                format = Some(match parts.next() {
                    Some("ascii") => PlyFormat::Ascii,
                    Some("binary_little_endian") => PlyFormat::BinaryLittleEndian,
                    Some("binary_big_endian") => PlyFormat::BinaryBigEndian,
                    other => {
                        return Err(PlyError::InvalidHeader(format!("unknown format {other:?}")))
                    }
                });
            }
            Some("element") => {
                let name = parts
                    .next()
                    .ok_or_else(|| PlyError::InvalidHeader("element without name".to_string()))?;
                let count = parse_count(parts.next(), trimmed)?;
                elements.push(PlyElement {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements.last_mut().ok_or_else(|| {
                    PlyError::InvalidHeader("property declared before any element".to_string())
                })?;
                let tokens = parts.collect::<Vec<_>>();
                let property = match tokens.as_slice() {
                    ["list", count_type, item_type, name] => PlyPropertyDefinition {
                        name: name.to_string(),
                        data_type: PlyDataType::parse(item_type)?,
                        list_count_type: Some(PlyDataType::parse(count_type)?),
                    },
                    [data_type, name] => PlyPropertyDefinition {
                        name: name.to_string(),
                        data_type: PlyDataType::parse(data_type)?,
                        list_count_type: None,
                    },
                    _ => {
                        return Err(PlyError::InvalidHeader(format!(
                            "invalid property line {trimmed:?}"
                        )))
                    }
                };
                if element.properties.iter().any(|p| p.name == property.name) {
                    return Err(PlyError::InvalidHeader(format!(
                        "duplicate property {} in element {}",
                        property.name, element.name
                    )));
                }
                element.properties.push(property);
            }
            Some(keyword) => {
                return Err(PlyError::InvalidHeader(format!("unknown keyword {keyword}")));
            }
        }
    }

    let format = format.ok_or_else(|| PlyError::InvalidHeader("missing format".to_string()))?;

    Ok(PlyHeader { format, elements })
}

fn map_eof(err: std::io::Error) -> PlyError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof => PlyError::Truncated,
        _ => PlyError::Io(err),
    }
}

// Append exactly `len` bytes without trusting `len` for the allocation.
fn append_bytes<R: Read>(reader: &mut R, buffer: &mut Vec<u8>, len: usize) -> Result<(), PlyError> {
    let start = buffer.len();
    reader.by_ref().take(len as u64).read_to_end(buffer)?;
    if buffer.len() - start != len {
        return Err(PlyError::Truncated);
    }
    Ok(())
}

fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, PlyError> {
    let mut buffer = Vec::new();
    append_bytes(reader, &mut buffer, len)?;
    Ok(buffer)
}

/// Read one binary record of variable size, following the stored length of every list.
pub fn read_binary_record<R: Read>(
    reader: &mut R,
    properties: &[PlyPropertyDefinition],
    format: PlyFormat,
) -> Result<Vec<u8>, PlyError> {
    let mut record = Vec::new();
    for property in properties {
        match property.list_count_type {
            None => append_bytes(reader, &mut record, property.data_type.size())?,
            Some(count_type) => {
                let start = record.len();
                append_bytes(reader, &mut record, count_type.size())?;
                let count = list_count(count_type.read_binary(&record, start, format)?)?;
                let len = count
                    .checked_mul(property.data_type.size())
                    .ok_or(PlyError::Truncated)?;
                append_bytes(reader, &mut record, len)?;
            }
        }
    }
    Ok(record)
}

fn read_binary_records<R: Read>(
    reader: &mut R,
    element: &PlyElement,
    format: PlyFormat,
) -> Result<Vec<Vec<u8>>, PlyError> {
    let mut records = Vec::new();
    for _ in 0..element.count {
        records.push(read_binary_record(reader, &element.properties, format)?);
    }
    Ok(records)
}

fn read_ascii_records<R: BufRead>(reader: &mut R, count: usize) -> Result<Vec<String>, PlyError> {
    let mut records = Vec::new();
    let mut line = String::new();
    while records.len() < count {
        line.clear();
        if reader.read_line(&mut line).map_err(map_eof)? == 0 {
            return Err(PlyError::Truncated);
        }
        if !line.trim().is_empty() {
            records.push(line.trim().to_string());
        }
    }
    Ok(records)
}

/// Read the raw Gaussian vertices of a PLY body.
///
/// Elements declared before `vertex` are skipped, elements after it are never read.
/// Properties other than the Gaussian ones, list properties included, are ignored.
///
/// # Arguments
///
/// * `reader` - Reader positioned at the start of the body.
/// * `header` - The parsed header.
/// * `strategy` - How the per-vertex decoding is scheduled.
///
/// # Returns
///
/// The vertices in file order.
pub fn read_gaussian_vertices<R: BufRead>(
    reader: &mut R,
    header: &PlyHeader,
    strategy: ExecutionStrategy,
) -> Result<Vec<GaussianVertex>, PlyError> {
    let (vertex_index, vertex) = header.vertex_element()?;
    let layout = GaussianLayout::new(&vertex.properties)?;

    for element in &header.elements[..vertex_index] {
        log::debug!("skipping {} {} records", element.count, element.name);
        match header.format {
            PlyFormat::Ascii => {
                read_ascii_records(reader, element.count)?;
            }
            format => match element.record_size() {
                Some(size) => {
                    let len = element
                        .count
                        .checked_mul(size)
                        .ok_or_else(|| PlyError::InvalidHeader("element too large".to_string()))?;
                    let skipped =
                        std::io::copy(&mut reader.by_ref().take(len as u64), &mut std::io::sink())?;
                    if skipped != len as u64 {
                        return Err(PlyError::Truncated);
                    }
                }
                None => {
                    for _ in 0..element.count {
                        read_binary_record(reader, &element.properties, format)?;
                    }
                }
            },
        }
    }

    let vertices = match header.format {
        PlyFormat::Ascii => {
            let records = read_ascii_records(reader, vertex.count)?;
            parallel::map_collect(&records, strategy, |record| layout.decode_ascii(record))?
        }
        format => match layout.stride() {
            Some(stride) => {
                let len = vertex.count.checked_mul(stride).ok_or_else(|| {
                    PlyError::InvalidHeader("vertex element too large".to_string())
                })?;
                let body = read_bytes(reader, len)?;
                parallel::map_chunks_collect(&body, stride, strategy, |record| {
                    layout.decode_binary(record, format)
                })?
            }
            None => {
                let records = read_binary_records(reader, vertex, format)?;
                parallel::map_collect(&records, strategy, |record| {
                    layout.decode_binary(record, format)
                })?
            }
        },
    };

    vertices.into_iter().collect()
}

// NaN keys sort last
fn rank_key(importance: f64) -> f64 {
    match importance.is_nan() {
        true => f64::NEG_INFINITY,
        false => importance,
    }
}

/// Read a Gaussian splat PLY from any buffered reader.
///
/// The splats are decoded, then ordered by descending importance
/// (see [`crate::ops::importance`]). The sort is stable: equal keys keep their file order.
/// With [`ExecutionStrategy::Fixed`] a single thread pool serves the whole load.
pub fn read_ply_from_reader<R: BufRead + Send>(
    reader: &mut R,
    options: &LoadOptions,
) -> Result<SplatCloud, SplatError> {
    options
        .strategy
        .install(|strategy| load_ply(reader, &options.with_strategy(strategy)))?
}

fn load_ply<R: BufRead>(reader: &mut R, options: &LoadOptions) -> Result<SplatCloud, SplatError> {
    let header = parse_header(reader)?;
    log::debug!(
        "ply header: {:?} with elements {:?}",
        header.format,
        header
            .elements
            .iter()
            .map(|e| (e.name.as_str(), e.count))
            .collect::<Vec<_>>()
    );

    let vertices = read_gaussian_vertices(reader, &header, options.strategy)?;

    let mut ranked = parallel::map_collect(&vertices, options.strategy, |v| {
        (rank_key(v.importance()), v.decode())
    })?;
    parallel::stable_sort_by(&mut ranked, options.strategy, |a, b| b.0.total_cmp(&a.0))?;

    let degenerate = ranked.iter().filter(|(_, (_, degenerate))| *degenerate).count();
    if degenerate > 0 {
        log::warn!("{degenerate} vertices with a degenerate rotation were set to identity");
    }

    let attributes = ranked
        .into_iter()
        .map(|(_, (attributes, _))| attributes)
        .collect::<Vec<_>>();

    build_cloud(&attributes, options)
}

/// Read a Gaussian splat `.ply` file.
///
/// # Arguments
///
/// * `path` - Path to the file.
/// * `options` - Centering and execution options.
pub fn read_ply_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<SplatCloud, SplatError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|err| SplatError::unreadable(path, err))?;
    let mut reader = std::io::BufReader::new(file);
    read_ply_from_reader(&mut reader, options)
}
