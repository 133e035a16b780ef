use crate::enums::{Orientation, RoiEdge};
use crate::volume::VolumeSpace;

use nalgebra::Vector3;
use tracing::trace;

/// Minimum ROI extent per axis, in voxels.
pub const MIN_ROI_SIZE: f64 = 10.0;

/// An axis-aligned voxel-space box, editable by move and edge/corner drags.
///
/// Invariants held after every mutation: `start <= end` componentwise, each
/// axis extent is at least [`MIN_ROI_SIZE`] (unless the volume itself is
/// smaller), and both corners lie within `[0, dim - 1]`. Disabling the ROI
/// hides it without touching its geometry.
#[derive(Clone, Debug)]
pub struct RoiModel {
    start: Vector3<f64>,
    end: Vector3<f64>,
    enabled: bool,
}

impl RoiModel {
    /// Create an ROI centered on the given voxel at one third of the volume
    /// extent per axis.
    pub fn centered_on(volume: &VolumeSpace, center: Vector3<f64>) -> Self {
        let dim = volume.dim();
        let size = Vector3::new(dim.0 as f64 / 3.0, dim.1 as f64 / 3.0, dim.2 as f64 / 3.0);
        let mut roi = Self {
            start: center - size / 2.0,
            end: center + size / 2.0,
            enabled: false,
        };
        roi.normalize(volume);
        roi
    }

    pub fn start(&self) -> Vector3<f64> {
        self.start
    }

    pub fn end(&self) -> Vector3<f64> {
        self.end
    }

    pub fn size(&self) -> Vector3<f64> {
        self.end - self.start
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Integer corner pair for export, rounded to the enclosing voxels.
    pub fn bounds(&self) -> ([usize; 3], [usize; 3]) {
        let start = self.start.map(|c| c.floor().max(0.0) as usize);
        let end = self.end.map(|c| c.ceil() as usize);
        ([start.x, start.y, start.z], [end.x, end.y, end.z])
    }

    /// Re-center the box on a new cursor position, preserving its size.
    ///
    /// The box is shifted, never shrunk, so the call is idempotent: applying
    /// it twice with the same cursor yields the same bounds as applying it
    /// once.
    pub fn recenter_on(&mut self, volume: &VolumeSpace, center: Vector3<f64>) {
        let size = self.size();
        self.start = clamp_start(volume, center - size / 2.0, size);
        self.end = self.start + size;
    }

    /// Shift the box by a voxel-space delta, shrinking the permissible delta
    /// rather than the box when it would leave the volume.
    pub fn translate(&mut self, volume: &VolumeSpace, delta: Vector3<f64>) {
        let size = self.size();
        self.start = clamp_start(volume, self.start + delta, size);
        self.end = self.start + size;
    }

    /// Shift the box by a display-space delta seen on one orthogonal view.
    ///
    /// `dvx`/`dvy` are display deltas already divided by the view's scale
    /// factors, i.e. in voxel units along the view's screen axes.
    pub fn translate_in_view(
        &mut self,
        volume: &VolumeSpace,
        orientation: Orientation,
        dvx: f64,
        dvy: f64,
    ) {
        // Screen x runs against i on axial/coronal and screen y runs against
        // k on sagittal/coronal; the signs mirror the display transform.
        let delta = match orientation {
            Orientation::Axial => Vector3::new(-dvx, dvy, 0.0),
            Orientation::Sagittal => Vector3::new(0.0, dvx, -dvy),
            Orientation::Coronal => Vector3::new(-dvx, 0.0, -dvy),
        };
        self.translate(volume, delta);
    }

    /// Drag one box face (or two, for a corner tag) by a display-space delta
    /// seen on one orthogonal view.
    ///
    /// An inverted drag (start past end) auto-swaps the corners; the
    /// minimum-size floor is restored after every edit, so fast repeated
    /// shrink-drags bottom out at [`MIN_ROI_SIZE`].
    pub fn resize_edge(
        &mut self,
        volume: &VolumeSpace,
        orientation: Orientation,
        edge: RoiEdge,
        dvx: f64,
        dvy: f64,
    ) {
        match orientation {
            Orientation::Axial => {
                if edge.touches_north() {
                    self.start.y += dvy;
                }
                if edge.touches_south() {
                    self.end.y += dvy;
                }
                if edge.touches_west() {
                    self.end.x -= dvx;
                }
                if edge.touches_east() {
                    self.start.x -= dvx;
                }
            }
            Orientation::Sagittal => {
                if edge.touches_north() {
                    self.end.z -= dvy;
                }
                if edge.touches_south() {
                    self.start.z -= dvy;
                }
                if edge.touches_west() {
                    self.start.y += dvx;
                }
                if edge.touches_east() {
                    self.end.y += dvx;
                }
            }
            Orientation::Coronal => {
                if edge.touches_north() {
                    self.end.z -= dvy;
                }
                if edge.touches_south() {
                    self.start.z -= dvy;
                }
                if edge.touches_west() {
                    self.end.x -= dvx;
                }
                if edge.touches_east() {
                    self.start.x -= dvx;
                }
            }
        }
        self.normalize(volume);
    }

    /// Replace the box with explicit corners, clamped to the volume.
    ///
    /// The corners are ordered first; after clamping, a too-small extent is
    /// restored by pulling `start` back, keeping the clamped `end` in place.
    pub fn set_bounds(&mut self, volume: &VolumeSpace, start: Vector3<f64>, end: Vector3<f64>) {
        self.start = start.zip_map(&end, f64::min);
        self.end = start.zip_map(&end, f64::max);
        self.normalize(volume);
    }

    /// The two in-slice corners of the box on a given slice, or `None` when
    /// the slice does not cut through the box.
    pub fn intersect_slice(
        &self,
        orientation: Orientation,
        slice_index: usize,
    ) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let axis = orientation.slice_axis();
        let index = slice_index as f64;
        if index < self.start[axis] || index > self.end[axis] {
            return None;
        }
        let mut lo = self.start;
        let mut hi = self.end;
        lo[axis] = index;
        hi[axis] = index;
        Some((lo, hi))
    }

    /// Restore the ordering, bounds and minimum-size invariants.
    fn normalize(&mut self, volume: &VolumeSpace) {
        let dim = volume.dim();
        let max = Vector3::new(
            (dim.0 - 1) as f64,
            (dim.1 - 1) as f64,
            (dim.2 - 1) as f64,
        );

        for axis in 0..3 {
            if self.start[axis] > self.end[axis] {
                std::mem::swap(&mut self.start[axis], &mut self.end[axis]);
            }
            self.start[axis] = self.start[axis].clamp(0.0, max[axis]);
            self.end[axis] = self.end[axis].clamp(0.0, max[axis]);

            let floor = MIN_ROI_SIZE.min(max[axis]);
            if self.end[axis] - self.start[axis] < floor {
                trace!(axis, "clamping ROI to minimum size");
                self.start[axis] = self.end[axis] - floor;
                if self.start[axis] < 0.0 {
                    self.start[axis] = 0.0;
                    self.end[axis] = floor;
                }
            }
        }
    }
}

fn clamp_start(volume: &VolumeSpace, start: Vector3<f64>, size: Vector3<f64>) -> Vector3<f64> {
    let dim = volume.dim();
    let max = Vector3::new(
        (dim.0 - 1) as f64 - size.x,
        (dim.1 - 1) as f64 - size.y,
        (dim.2 - 1) as f64 - size.z,
    );
    start.zip_map(&max, f64::min).map(|c| c.max(0.0))
}
