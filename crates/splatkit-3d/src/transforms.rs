/// Compute the rotation matrix of a unit quaternion.
///
/// # Arguments
///
/// * `wxyz` - The quaternion in scalar-first order `(w, x, y, z)`.
///
/// # Returns
///
/// The row-major rotation matrix.
///
/// PRECONDITION: `wxyz` is a unit quaternion. The matrix is not orthonormal otherwise.
///
/// Example:
///
/// ```
/// use splatkit_3d::transforms::quaternion_to_rotation_matrix;
///
/// let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn quaternion_to_rotation_matrix(wxyz: &[f32; 4]) -> [[f32; 3]; 3] {
    let [w, x, y, z] = *wxyz;

    let xx = x * x;
    let yy = y * y;
    let zz = z * z;

    let xy = x * y;
    let xz = x * z;
    let yz = y * z;

    let wx = w * x;
    let wy = w * y;
    let wz = w * z;

    [
        [1.0 - 2.0 * (yy + zz), 2.0 * (xy - wz), 2.0 * (xz + wy)],
        [2.0 * (xy + wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - wx)],
        [2.0 * (xz - wy), 2.0 * (yz + wx), 1.0 - 2.0 * (xx + yy)],
    ]
}

/// Normalize a quaternion to unit length.
///
/// Returns `None` when the norm is zero or not finite, since no rotation can be recovered.
pub fn normalize_quaternion(wxyz: &[f32; 4]) -> Option<[f32; 4]> {
    let norm = wxyz.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    Some(wxyz.map(|v| v / norm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quaternion_to_rotation_matrix_identity() {
        let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]);
        let expected = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(rotation, expected);
    }

    #[test]
    fn test_quaternion_to_rotation_matrix_x_90() {
        // 90 degrees around the x axis
        let half = std::f32::consts::FRAC_PI_4;
        let rotation = quaternion_to_rotation_matrix(&[half.cos(), half.sin(), 0.0, 0.0]);
        let expected = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rotation[i][j], expected[i][j], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_quaternion_to_rotation_matrix_z_180() {
        let rotation = quaternion_to_rotation_matrix(&[0.0, 0.0, 0.0, 1.0]);
        let expected = [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(rotation, expected);
    }

    #[test]
    fn test_rotation_matrix_is_orthonormal() {
        let q = normalize_quaternion(&[0.3, -0.5, 0.7, 0.1]).unwrap();
        let r = quaternion_to_rotation_matrix(&q);
        for i in 0..3 {
            for j in 0..3 {
                let dot = (0..3).map(|k| r[i][k] * r[j][k]).sum::<f32>();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(dot, expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_normalize_quaternion() {
        let q = normalize_quaternion(&[2.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(q, [1.0, 0.0, 0.0, 0.0]);

        let q = normalize_quaternion(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        for v in q {
            assert_relative_eq!(v, 0.5);
        }

        assert!(normalize_quaternion(&[0.0; 4]).is_none());
        assert!(normalize_quaternion(&[f32::NAN, 0.0, 0.0, 1.0]).is_none());
    }
}
