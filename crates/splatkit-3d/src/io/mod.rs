use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::parallel::{ExecutionStrategy, ParallelError};
use crate::splats::{SplatAttributes, SplatCloud};

/// PLY reader module.
pub mod ply;

/// Packed `.splat` reader module.
pub mod splat;

/// An error type for loading splat scenes.
#[derive(Debug, thiserror::Error)]
pub enum SplatError {
    /// The file cannot be read, or its content does not follow its format.
    #[error("Malformed splat file. {0}")]
    MalformedFile(String),

    /// The file extension is not one of the supported formats.
    #[error("Unsupported splat format, expected a .splat or .ply file: {0}")]
    UnsupportedFormat(PathBuf),

    /// The per-splat work could not be scheduled.
    #[error("Failed to schedule splat decoding. {0}")]
    Parallel(#[from] ParallelError),
}

impl SplatError {
    /// Whether the file itself could not be loaded, because it is unreadable or its content
    /// is corrupt. Unsupported formats and scheduling failures are not in this class.
    pub fn is_malformed(&self) -> bool {
        matches!(self, SplatError::MalformedFile(_))
    }

    // Opening and reading failures belong to the malformed-file class.
    pub(crate) fn unreadable(path: &Path, err: std::io::Error) -> Self {
        SplatError::MalformedFile(format!("cannot read {}: {err}", path.display()))
    }
}

impl From<ply::PlyError> for SplatError {
    fn from(err: ply::PlyError) -> Self {
        match err {
            ply::PlyError::Parallel(err) => SplatError::Parallel(err),
            err => SplatError::MalformedFile(err.to_string()),
        }
    }
}

impl From<splat::PackedSplatError> for SplatError {
    fn from(err: splat::PackedSplatError) -> Self {
        SplatError::MalformedFile(err.to_string())
    }
}

/// The on-disk formats a splat scene can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplatFormat {
    /// Headerless 32-byte records, `.splat`.
    Packed,
    /// Gaussian vertices in a PLY file, `.ply`.
    Ply,
}

impl SplatFormat {
    /// Detect the format from the file extension, ignoring ASCII case.
    ///
    /// Example:
    /// ```
    /// use splatkit_3d::io::SplatFormat;
    ///
    /// assert_eq!(SplatFormat::from_path("scene.splat").unwrap(), SplatFormat::Packed);
    /// assert_eq!(SplatFormat::from_path("scene.PLY").unwrap(), SplatFormat::Ply);
    /// assert!(SplatFormat::from_path("scene.obj").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SplatError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("splat") => Ok(SplatFormat::Packed),
            Some("ply") => Ok(SplatFormat::Ply),
            _ => Err(SplatError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Options applied when loading a splat scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Translate the scene so that the centroid of the centers is at the origin.
    pub center: bool,
    /// How the per-splat work is executed.
    pub strategy: ExecutionStrategy,
}

impl LoadOptions {
    /// Set whether the loaded scene is centered.
    pub fn with_center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    /// Set the execution strategy of the per-splat work.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

// Reconstruct the covariances and apply the whole-collection options.
pub(crate) fn build_cloud(
    attributes: &[SplatAttributes],
    options: &LoadOptions,
) -> Result<SplatCloud, SplatError> {
    let mut cloud = SplatCloud::from_attributes(attributes, options.strategy)?;
    if options.center {
        if let Some(centroid) = cloud.center(options.strategy)? {
            log::debug!("centered scene, subtracted centroid {centroid:?}");
        }
    }
    Ok(cloud)
}

/// Read a splat scene, dispatching on the file extension.
///
/// # Arguments
///
/// * `path` - Path to a `.splat` or `.ply` file.
/// * `options` - Centering and execution options.
///
/// # Returns
///
/// The fully populated [`SplatCloud`]. Nothing is returned on error, there is no partial result.
pub fn read_splats(path: impl AsRef<Path>, options: &LoadOptions) -> Result<SplatCloud, SplatError> {
    let path = path.as_ref();
    let format = SplatFormat::from_path(path)?;

    let start = Instant::now();
    let cloud = match format {
        SplatFormat::Packed => splat::read_splat_file(path, options)?,
        SplatFormat::Ply => ply::read_ply_file(path, options)?,
    };
    log::debug!(
        "loaded {} splats from {} in {:?}",
        cloud.len(),
        path.display(),
        start.elapsed()
    );

    Ok(cloud)
}

/// Read several independent splat scenes concurrently.
///
/// # Returns
///
/// One result per path, in the order of `paths`.
pub fn read_splats_many<P>(paths: &[P], options: &LoadOptions) -> Vec<Result<SplatCloud, SplatError>>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| read_splats(path, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(SplatFormat::from_path("a/b.splat").unwrap(), SplatFormat::Packed);
        assert_eq!(SplatFormat::from_path("a/b.Splat").unwrap(), SplatFormat::Packed);
        assert_eq!(SplatFormat::from_path("b.ply").unwrap(), SplatFormat::Ply);

        for path in ["b.obj", "b", "b.ply.gz", ".splat"] {
            let err = SplatFormat::from_path(path).unwrap_err();
            assert!(matches!(err, SplatError::UnsupportedFormat(_)), "{path}");
            assert!(!err.is_malformed());
        }
    }

    #[test]
    fn test_unsupported_format_before_io() {
        // the file does not exist, the extension is rejected first
        let err = read_splats("does/not/exist.xyz", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SplatError::UnsupportedFormat(p) if p == Path::new("does/not/exist.xyz")));
    }

    #[test]
    fn test_missing_file_is_malformed() {
        for path in ["does/not/exist.splat", "does/not/exist.ply"] {
            let err = read_splats(path, &LoadOptions::default()).unwrap_err();
            assert!(matches!(err, SplatError::MalformedFile(ref msg) if msg.contains(path)), "{path}");
        }
    }

    #[test]
    fn test_load_options() {
        let options = LoadOptions::default();
        assert!(!options.center);
        assert_eq!(options.strategy, ExecutionStrategy::ParallelElements);

        let options = options
            .with_center(true)
            .with_strategy(ExecutionStrategy::Serial);
        assert!(options.center);
        assert_eq!(options.strategy, ExecutionStrategy::Serial);
    }

    #[test]
    fn test_error_conversions() {
        let err: SplatError = ply::PlyError::MissingProperty("opacity".to_string()).into();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("opacity"));

        let err: SplatError = splat::PackedSplatError::Misaligned(33).into();
        assert!(err.is_malformed());

        let err: SplatError = ply::PlyError::Parallel(ParallelError::InvalidThreadCount(0)).into();
        assert!(matches!(err, SplatError::Parallel(_)));
    }
}
