use crate::covariance::covariance_from_rotation_scale;
use crate::ops;
use crate::parallel::{self, ExecutionStrategy, ParallelError};

/// Decoded attributes of a single Gaussian, before covariance reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatAttributes {
    /// World position.
    pub position: [f32; 3],
    /// Per-axis scale (standard deviation).
    pub scale: [f32; 3],
    /// Rotation quaternion in `(w, x, y, z)` order.
    pub rotation: [f32; 4],
    /// RGB color in `[0, 1]`.
    pub color: [f32; 3],
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

/// A single splat of a [`SplatCloud`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    /// World position.
    pub center: [f32; 3],
    /// RGB color in `[0, 1]`.
    pub color: [f32; 3],
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Row-major 3x3 covariance.
    pub covariance: [[f32; 3]; 3],
}

/// The canonical collection of Gaussian splats handed to a renderer.
///
/// Stored as parallel arrays of equal length; the order is the draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplatCloud {
    // The centers of the splats.
    centers: Vec<[f32; 3]>,
    // The colors of the splats.
    colors: Vec<[f32; 3]>,
    // The opacities of the splats.
    opacities: Vec<f32>,
    // The covariances of the splats, derived from rotation and scale.
    covariances: Vec<[[f32; 3]; 3]>,
}

impl SplatCloud {
    /// Build the collection from decoded attributes, reconstructing every covariance.
    ///
    /// The attribute order is kept as the splat order.
    ///
    /// # Arguments
    ///
    /// * `attributes` - The decoded splats. Rotations must be unit quaternions.
    /// * `strategy` - How the per-splat reconstruction is scheduled.
    pub fn from_attributes(
        attributes: &[SplatAttributes],
        strategy: ExecutionStrategy,
    ) -> Result<Self, ParallelError> {
        let covariances = parallel::map_collect(attributes, strategy, |a| {
            covariance_from_rotation_scale(&a.rotation, &a.scale)
        })?;

        Ok(Self {
            centers: attributes.iter().map(|a| a.position).collect(),
            colors: attributes.iter().map(|a| a.color).collect(),
            opacities: attributes.iter().map(|a| a.opacity).collect(),
            covariances,
        })
    }

    /// Get the number of splats in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Get as reference the centers of the splats.
    pub fn centers(&self) -> &[[f32; 3]] {
        &self.centers
    }

    /// Get as reference the colors of the splats.
    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Get as reference the opacities of the splats.
    pub fn opacities(&self) -> &[f32] {
        &self.opacities
    }

    /// Get as reference the covariances of the splats.
    pub fn covariances(&self) -> &[[[f32; 3]; 3]] {
        &self.covariances
    }

    /// Get the splat at `index`.
    pub fn get(&self, index: usize) -> Option<Splat> {
        Some(Splat {
            center: *self.centers.get(index)?,
            color: *self.colors.get(index)?,
            opacity: *self.opacities.get(index)?,
            covariance: *self.covariances.get(index)?,
        })
    }

    /// Iterate over the splats in draw order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Splat> + '_ {
        // the four arrays always share the same length
        (0..self.len()).map(move |i| Splat {
            center: self.centers[i],
            color: self.colors[i],
            opacity: self.opacities[i],
            covariance: self.covariances[i],
        })
    }

    /// Get the mean of all centers, `None` when the collection is empty.
    pub fn centroid(&self) -> Option<[f32; 3]> {
        ops::compute_centroid(&self.centers, ExecutionStrategy::Serial)
            .ok()
            .flatten()
    }

    /// Get the axis-aligned bounds `(min, max)` of the centers.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        ops::compute_bounds(&self.centers)
    }

    /// Translate every center so that the centroid of the collection is at the origin.
    ///
    /// Colors, opacities and covariances are translation invariant and stay untouched.
    ///
    /// # Returns
    ///
    /// The centroid that was subtracted, `None` for an empty collection.
    pub fn center(&mut self, strategy: ExecutionStrategy) -> Result<Option<[f32; 3]>, ParallelError> {
        ops::center_points(&mut self.centers, strategy)
    }

    /// Consume the collection and return `(centers, colors, opacities, covariances)`.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Vec<[f32; 3]>,
        Vec<[f32; 3]>,
        Vec<f32>,
        Vec<[[f32; 3]; 3]>,
    ) {
        (self.centers, self.colors, self.opacities, self.covariances)
    }
}
