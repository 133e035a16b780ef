use crate::enums::Orientation;
use crate::interpolator::Interpolator;
use crate::roi::RoiModel;
use crate::volume::VolumeSpace;

use image::{ImageBuffer, Luma};
use nalgebra::Vector3;
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

/// Per-view mutable display state: current slice, viewport size and the
/// cached voxel-to-screen scale factors derived from both.
#[derive(Clone, Copy, Debug)]
pub struct ViewportState {
    slice: usize,
    viewport: (u32, u32),
    scale: (f64, f64),
}

/// Extracts display-oriented 2D slices for one orthogonal orientation and
/// maps bidirectionally between display pixels and volume voxels.
///
/// The display transform is a fixed design constant per orientation: a 90
/// degree rotation followed by a flip of both axes (axial), a horizontal
/// flip (coronal) or no flip (sagittal), so the anatomical up/down and
/// left/right labels come out consistent regardless of voxel storage order.
/// `voxel_to_display` and `display_to_voxel` apply exactly this transform
/// plus the viewport scale, and are exact inverses of each other.
pub struct SliceProjector {
    orientation: Orientation,
    state: ViewportState,
}

impl SliceProjector {
    /// Create a projector positioned at the center slice with a default
    /// viewport.
    pub fn new(orientation: Orientation, volume: &VolumeSpace) -> Self {
        let mut projector = Self {
            orientation,
            state: ViewportState {
                slice: volume.slice_count(orientation) / 2,
                viewport: (512, 512),
                scale: (1.0, 1.0),
            },
        };
        projector.update_scale(volume);
        projector
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn slice(&self) -> usize {
        self.state.slice
    }

    pub fn scale(&self) -> (f64, f64) {
        self.state.scale
    }

    /// Width and height of the display-oriented slice, in voxels.
    pub fn display_dims(&self, volume: &VolumeSpace) -> (usize, usize) {
        let (nx, ny, nz) = volume.dim();
        match self.orientation {
            Orientation::Axial => (nx, ny),
            Orientation::Sagittal => (ny, nz),
            Orientation::Coronal => (nx, nz),
        }
    }

    /// Physical voxel spacing along the display x and y axes, in mm.
    fn plane_spacing(&self, volume: &VolumeSpace) -> (f64, f64) {
        let (sx, sy, sz) = volume.spacing();
        match self.orientation {
            Orientation::Axial => (sx, sy),
            Orientation::Sagittal => (sy, sz),
            Orientation::Coronal => (sx, sz),
        }
    }

    /// Select a new slice. Out-of-range indices are a no-op and leave the
    /// previous display in place; returns whether the slice changed.
    pub fn set_slice(&mut self, volume: &VolumeSpace, index: usize) -> bool {
        if index >= volume.slice_count(self.orientation) {
            return false;
        }
        self.state.slice = index;
        true
    }

    /// Resize the viewport and recompute the display scale.
    pub fn set_viewport(&mut self, volume: &VolumeSpace, width: u32, height: u32) {
        self.state.viewport = (width.max(1), height.max(1));
        self.update_scale(volume);
    }

    /// Fit the slice into the viewport while respecting physical voxel
    /// spacing as the aspect ratio.
    fn update_scale(&mut self, volume: &VolumeSpace) {
        let (w, h) = self.display_dims(volume);
        let (sw, sh) = self.plane_spacing(volume);
        let phys_w = w as f64 * sw;
        let phys_h = h as f64 * sh;
        let aspect = phys_w / phys_h;

        let avail_w = self.state.viewport.0 as f64;
        let avail_h = self.state.viewport.1 as f64;
        let (target_w, target_h) = if avail_w / avail_h > aspect {
            (avail_h * aspect, avail_h)
        } else {
            (avail_w, avail_w / aspect)
        };

        self.state.scale = (target_w / w as f64, target_h / h as f64);
    }

    /// Extract the current slice in display orientation.
    ///
    /// Rotates the raw slice 90 degrees, then applies the per-orientation
    /// flip. The resulting array is indexed `[y, x]` in display coordinates.
    pub fn extract_slice(&self, volume: &VolumeSpace) -> Array2<f32> {
        let raw = volume
            .slice_view(self.orientation, self.state.slice)
            .expect("current slice index is kept in range");
        orient_display(self.orientation, raw)
    }

    /// Map a voxel to unscaled display-slice coordinates.
    pub fn voxel_to_slice_coords(&self, volume: &VolumeSpace, voxel: Vector3<f64>) -> (f64, f64) {
        let (nx, _ny, nz) = volume.dim();
        match self.orientation {
            Orientation::Axial => ((nx - 1) as f64 - voxel.x, voxel.y),
            Orientation::Sagittal => (voxel.y, (nz - 1) as f64 - voxel.z),
            Orientation::Coronal => ((nx - 1) as f64 - voxel.x, (nz - 1) as f64 - voxel.z),
        }
    }

    /// Map unscaled display-slice coordinates back to a voxel on the current
    /// slice. Exact inverse of [`Self::voxel_to_slice_coords`] for the two
    /// in-plane components.
    pub fn slice_coords_to_voxel(&self, volume: &VolumeSpace, x: f64, y: f64) -> Vector3<f64> {
        let (nx, _ny, nz) = volume.dim();
        let slice = self.state.slice as f64;
        match self.orientation {
            Orientation::Axial => Vector3::new((nx - 1) as f64 - x, y, slice),
            Orientation::Sagittal => Vector3::new(slice, x, (nz - 1) as f64 - y),
            Orientation::Coronal => Vector3::new((nx - 1) as f64 - x, slice, (nz - 1) as f64 - y),
        }
    }

    /// Map a voxel to display-pixel coordinates at the current scale.
    pub fn voxel_to_display(&self, volume: &VolumeSpace, voxel: Vector3<f64>) -> (f64, f64) {
        let (x, y) = self.voxel_to_slice_coords(volume, voxel);
        (x * self.state.scale.0, y * self.state.scale.1)
    }

    /// Map display-pixel coordinates back to a voxel on the current slice.
    pub fn display_to_voxel(&self, volume: &VolumeSpace, x: f64, y: f64) -> Vector3<f64> {
        self.slice_coords_to_voxel(volume, x / self.state.scale.0, y / self.state.scale.1)
    }

    /// ROI rectangle on the current slice in display-pixel coordinates,
    /// ordered `(x1, y1, x2, y2)`, or `None` when the slice misses the box.
    pub fn roi_display_rect(
        &self,
        volume: &VolumeSpace,
        roi: &RoiModel,
    ) -> Option<(f64, f64, f64, f64)> {
        let (lo, hi) = roi.intersect_slice(self.orientation, self.state.slice)?;
        let (x1, y1) = self.voxel_to_display(volume, lo);
        let (x2, y2) = self.voxel_to_display(volume, hi);
        Some((x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)))
    }

    /// Render the current slice into an 8-bit grayscale buffer scaled to the
    /// fitted viewport rectangle, resampling bilinearly.
    pub fn render(&self, volume: &VolumeSpace) -> ImageBuffer<Luma<u8>, Vec<u8>> {
        let slice = self.extract_slice(volume);
        let (w, h) = self.display_dims(volume);
        let target_w = ((w as f64 * self.state.scale.0).round() as u32).max(1);
        let target_h = ((h as f64 * self.state.scale.1).round() as u32).max(1);
        scale_to_u8(&slice, target_w, target_h)
    }
}

/// Bring a raw volume cross-section into display orientation: a 90 degree
/// rotation, then the per-orientation flip. The result is indexed `[y, x]`
/// in display coordinates. Works for intensity and label slices alike.
pub fn orient_display<T: Clone>(orientation: Orientation, raw: ArrayView2<'_, T>) -> Array2<T> {
    let mut oriented = raw.reversed_axes();
    oriented.invert_axis(Axis(0));
    match orientation {
        Orientation::Axial => {
            oriented.invert_axis(Axis(0));
            oriented.invert_axis(Axis(1));
        }
        Orientation::Coronal => oriented.invert_axis(Axis(1)),
        Orientation::Sagittal => {}
    }
    oriented.to_owned()
}

/// Linearly rescale a slice to the full 8-bit display range, min to 0 and
/// max to 255. Degenerate constant slices render as all-zero.
pub fn normalize_slice(slice: &Array2<f32>) -> Array2<u8> {
    let (min, max) = min_max(slice);
    if max <= min {
        return Array2::zeros(slice.dim());
    }
    let range = max - min;
    slice.mapv(|v| (((v - min) / range) * 255.0).clamp(0.0, 255.0) as u8)
}

fn min_max(slice: &Array2<f32>) -> (f32, f32) {
    slice.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Resample a display-oriented slice to the target pixel size and normalize
/// to 8 bits in one pass.
fn scale_to_u8(slice: &Array2<f32>, width: u32, height: u32) -> ImageBuffer<Luma<u8>, Vec<u8>> {
    let (slice_h, slice_w) = slice.dim();
    let (min, max) = min_max(slice);
    let range = if max > min { max - min } else { 1.0 };
    let view = slice.view();

    let pixel_data: Vec<u8> = (0..height)
        .into_par_iter()
        .flat_map_iter(|y| {
            let view = view.clone();
            (0..width).map(move |x| {
                // Half-pixel offset so source and target pixel centers line up.
                let norm_x = (x as f32 + 0.5) / width as f32;
                let norm_y = (y as f32 + 0.5) / height as f32;

                let src_x = (norm_x * slice_w as f32 - 0.5)
                    .clamp(0.0, (slice_w - 1) as f32);
                let src_y = (norm_y * slice_h as f32 - 0.5)
                    .clamp(0.0, (slice_h - 1) as f32);

                let value = Interpolator::bilinear_interpolate(&view, src_y, src_x);
                (((value - min) / range) * 255.0).clamp(0.0, 255.0) as u8
            })
        })
        .collect();

    ImageBuffer::from_raw(width, height, pixel_data)
        .expect("buffer length matches target dimensions")
}
