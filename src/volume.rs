use crate::enums::Orientation;

use nalgebra::{Matrix4, Vector3, Vector4};
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Volume has a zero-sized axis: {0:?}")]
    EmptyVolume((usize, usize, usize)),

    #[error("Affine is singular or near-singular (|det| = {0:.3e})")]
    SingularAffine(f64),

    #[error("Label volume shape {actual:?} does not match volume shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
}

/// The loaded scalar volume together with its voxel-to-world geometry.
///
/// Owns the intensity array, the 4x4 affine mapping homogeneous voxel indices
/// `(i, j, k, 1)` to physical coordinates, its cached inverse, and the voxel
/// spacing in millimeters. The caller must hand over a volume already
/// reoriented to the canonical right-handed (RAS) axis convention, so that
/// axial/sagittal/coronal have a fixed meaning.
///
/// Immutable after construction; every other component reads it by shared
/// reference.
pub struct VolumeSpace {
    data: Array3<f32>,
    affine: Matrix4<f64>,
    inv_affine: Matrix4<f64>,
    spacing: (f64, f64, f64),
    min_intensity: f32,
}

const DET_EPSILON: f64 = 1e-12;

impl VolumeSpace {
    /// Build a volume space from a decoded volume, its affine and spacing.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::SingularAffine`] if the affine cannot be
    /// inverted and [`VolumeError::EmptyVolume`] if any axis has length zero.
    pub fn new(
        data: Array3<f32>,
        affine: Matrix4<f64>,
        spacing: (f64, f64, f64),
    ) -> Result<Self, VolumeError> {
        let dim = data.dim();
        if dim.0 == 0 || dim.1 == 0 || dim.2 == 0 {
            return Err(VolumeError::EmptyVolume(dim));
        }

        let det = affine.determinant();
        if det.abs() < DET_EPSILON {
            return Err(VolumeError::SingularAffine(det.abs()));
        }
        let inv_affine = affine
            .try_inverse()
            .ok_or(VolumeError::SingularAffine(det.abs()))?;

        let min_intensity = data.iter().copied().fold(f32::INFINITY, f32::min);

        Ok(Self {
            data,
            affine,
            inv_affine,
            spacing,
            min_intensity,
        })
    }

    /// Dimensions of the volume as `(nx, ny, nz)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Read-only access to the intensity array.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Voxel spacing in millimeters along `(i, j, k)`.
    pub fn spacing(&self) -> (f64, f64, f64) {
        self.spacing
    }

    /// Smallest intensity in the volume, used as the fill value when a
    /// resampling plane leaves the volume.
    pub fn min_intensity(&self) -> f32 {
        self.min_intensity
    }

    /// Number of slices along the given orientation's slice axis.
    pub fn slice_count(&self, orientation: Orientation) -> usize {
        let dim = self.data.dim();
        match orientation {
            Orientation::Axial => dim.2,
            Orientation::Sagittal => dim.0,
            Orientation::Coronal => dim.1,
        }
    }

    /// Raw (non-display-oriented) slice along the orientation's fixed axis.
    ///
    /// Returns `None` for an out-of-range index.
    pub fn slice_view(
        &self,
        orientation: Orientation,
        index: usize,
    ) -> Option<ArrayView2<'_, f32>> {
        if index >= self.slice_count(orientation) {
            return None;
        }
        let view = match orientation {
            Orientation::Axial => self.data.slice(s![.., .., index]),
            Orientation::Sagittal => self.data.slice(s![index, .., ..]),
            Orientation::Coronal => self.data.slice(s![.., index, ..]),
        };
        Some(view)
    }

    /// Map a continuous voxel index to a physical-space coordinate.
    pub fn voxel_to_world(&self, voxel: Vector3<f64>) -> Vector3<f64> {
        let w = self.affine * Vector4::new(voxel.x, voxel.y, voxel.z, 1.0);
        Vector3::new(w.x, w.y, w.z)
    }

    /// Map a physical-space coordinate to a continuous voxel index.
    pub fn world_to_voxel(&self, world: Vector3<f64>) -> Vector3<f64> {
        let v = self.inv_affine * Vector4::new(world.x, world.y, world.z, 1.0);
        Vector3::new(v.x, v.y, v.z)
    }

    /// Clip a continuous voxel index to `[0, dim - 1]` elementwise.
    pub fn clamp_voxel(&self, voxel: Vector3<f64>) -> Vector3<f64> {
        let dim = self.data.dim();
        Vector3::new(
            voxel.x.clamp(0.0, (dim.0 - 1) as f64),
            voxel.y.clamp(0.0, (dim.1 - 1) as f64),
            voxel.z.clamp(0.0, (dim.2 - 1) as f64),
        )
    }

    /// Whether a continuous voxel index lies inside the volume bounds.
    pub fn contains(&self, voxel: Vector3<f64>) -> bool {
        let dim = self.data.dim();
        voxel.x >= 0.0
            && voxel.y >= 0.0
            && voxel.z >= 0.0
            && voxel.x <= (dim.0 - 1) as f64
            && voxel.y <= (dim.1 - 1) as f64
            && voxel.z <= (dim.2 - 1) as f64
    }

    /// Copy out the axis-aligned sub-volume spanned by two inclusive integer
    /// corners. The corners must already be clamped and ordered.
    pub fn extract_box(&self, start: [usize; 3], end: [usize; 3]) -> Array3<f32> {
        self.data
            .slice(s![
                start[0]..=end[0],
                start[1]..=end[1],
                start[2]..=end[2]
            ])
            .to_owned()
    }

    /// Validate that a label volume is shape-compatible with this volume.
    pub fn check_label_shape(&self, labels: &Array3<u8>) -> Result<(), VolumeError> {
        if labels.dim() != self.data.dim() {
            return Err(VolumeError::ShapeMismatch {
                expected: self.data.dim(),
                actual: labels.dim(),
            });
        }
        Ok(())
    }
}
