use crate::parallel::{self, ExecutionStrategy, ParallelError};

/// Zeroth-order real spherical harmonic, `1 / (2 * sqrt(pi))`.
pub const SH_C0: f64 = 0.28209479177387814;

/// Logistic sigmoid, the inverse of the logit encoding of opacities.
///
/// Example:
/// ```
/// use splatkit_3d::ops::sigmoid;
///
/// assert_eq!(sigmoid(0.0), 0.5);
/// ```
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert a spherical-harmonic DC coefficient into a color channel.
#[inline]
pub fn sh_dc_to_rgb(f_dc: f64) -> f64 {
    0.5 + SH_C0 * f_dc
}

/// Draw priority of a Gaussian stored with log-scales and an opacity logit.
///
/// Computes `exp(s0 + s1 + s2) / (1 + exp(-opacity))`, i.e. the scale volume proxy weighted
/// by the decoded opacity. Larger values are drawn first.
///
/// # Arguments
///
/// * `log_scale` - The stored (log-encoded) scale.
/// * `opacity_logit` - The stored (logit-encoded) opacity.
pub fn importance(log_scale: &[f32; 3], opacity_logit: f32) -> f64 {
    let volume = log_scale.iter().map(|s| *s as f64).sum::<f64>().exp();
    volume / (1.0 + (-(opacity_logit as f64)).exp())
}

/// Compute the arithmetic mean of a set of points.
///
/// Returns `None` for an empty set. The sum is accumulated in `f64`.
///
/// Example:
/// ```
/// use splatkit_3d::ops::compute_centroid;
/// use splatkit_3d::parallel::ExecutionStrategy;
///
/// let points = vec![[0.0, 0.0, 0.0], [2.0, 4.0, -2.0]];
/// let centroid = compute_centroid(&points, ExecutionStrategy::Serial).unwrap();
/// assert_eq!(centroid, Some([1.0, 2.0, -1.0]));
/// ```
pub fn compute_centroid(
    points: &[[f32; 3]],
    strategy: ExecutionStrategy,
) -> Result<Option<[f32; 3]>, ParallelError> {
    if points.is_empty() {
        return Ok(None);
    }

    let sum = parallel::map_reduce(
        points,
        strategy,
        [0.0f64; 3],
        |p| [p[0] as f64, p[1] as f64, p[2] as f64],
        |a, b| [a[0] + b[0], a[1] + b[1], a[2] + b[2]],
    )?;

    let n = points.len() as f64;
    Ok(Some(sum.map(|s| (s / n) as f32)))
}

/// Translate a set of points so that their centroid is at the origin.
///
/// The centroid is fully reduced before any point is moved. An empty set is left untouched.
///
/// # Returns
///
/// The centroid that was subtracted, if any.
pub fn center_points(
    points: &mut [[f32; 3]],
    strategy: ExecutionStrategy,
) -> Result<Option<[f32; 3]>, ParallelError> {
    let Some(centroid) = compute_centroid(points, strategy)? else {
        return Ok(None);
    };

    parallel::for_each_mut(points, strategy, |p| {
        p[0] -= centroid[0];
        p[1] -= centroid[1];
        p[2] -= centroid[2];
    })?;

    Ok(Some(centroid))
}

/// Compute the axis-aligned bounds `(min, max)` of a set of points.
pub fn compute_bounds(points: &[[f32; 3]]) -> Option<([f32; 3], [f32; 3])> {
    let first = *points.first()?;
    Some(points.iter().fold((first, first), |(lo, hi), p| {
        (
            [lo[0].min(p[0]), lo[1].min(p[1]), lo[2].min(p[2])],
            [hi[0].max(p[0]), hi[1].max(p[1]), hi[2].max(p[2])],
        )
    }))
}
