use glam::{Mat3, Vec3};

use crate::transforms::quaternion_to_rotation_matrix;

/// Reconstruct the 3x3 covariance of a Gaussian from its rotation and scale.
///
/// Computes `R · diag(sx², sy², sz²) · Rᵗ` where `R` is the rotation matrix of `wxyz`.
/// The result is symmetric and positive semi-definite for any scale, since the scale is
/// squared.
///
/// # Arguments
///
/// * `wxyz` - The rotation as a unit quaternion `(w, x, y, z)`.
/// * `scale` - The per-axis standard deviations.
///
/// # Returns
///
/// The row-major covariance matrix.
///
/// PRECONDITION: `wxyz` is a unit quaternion. The quaternion is not re-normalized here.
///
/// Example:
///
/// ```
/// use splatkit_3d::covariance::covariance_from_rotation_scale;
///
/// let cov = covariance_from_rotation_scale(&[1.0, 0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]);
/// assert_eq!(cov, [[1.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 9.0]]);
/// ```
pub fn covariance_from_rotation_scale(wxyz: &[f32; 4], scale: &[f32; 3]) -> [[f32; 3]; 3] {
    // glam is column-major, the rotation rows become the transposed columns
    let r = Mat3::from_cols_array_2d(&quaternion_to_rotation_matrix(wxyz)).transpose();
    let s = Vec3::from_array(*scale);
    let cov = r * Mat3::from_diagonal(s * s) * r.transpose();
    cov.transpose().to_cols_array_2d()
}
