use crate::cursor::CursorModel;
use crate::enums::{FourthViewMode, Orientation, RoiEdge};
use crate::oblique::{ObliqueLine, ObliquePlaneSampler};
use crate::outline::extract_outline;
use crate::projector::{SliceProjector, normalize_slice, orient_display};
use crate::roi::RoiModel;
use crate::volume::{VolumeError, VolumeSpace};

use image::{ImageBuffer, Luma};
use nalgebra::{Matrix4, Vector3};
use ndarray::{Array2, Array3, s};
use tracing::debug;

type GrayImage = ImageBuffer<Luma<u8>, Vec<u8>>;

/// The interactive overlay currently claiming pointer input. At most one
/// overlay claims input at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InteractiveOverlay {
    #[default]
    None,
    Crosshair,
    Roi,
    ObliqueLine,
}

/// Everything one orthogonal viewport needs to paint: the rendered slice,
/// the crosshair position and the ROI rectangle, both in display pixels.
pub struct ViewFrame {
    pub slice_index: usize,
    pub image: GrayImage,
    pub crosshair: Option<(f64, f64)>,
    pub roi_rect: Option<(f64, f64, f64, f64)>,
}

/// ROI bounding box in integer voxel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiBounds {
    pub start: [usize; 3],
    pub end: [usize; 3],
    pub shape: [usize; 3],
}

/// An extracted ROI sub-volume together with its voxel and physical bounds,
/// handed to export collaborators.
pub struct RoiExtract {
    pub data: Array3<f32>,
    pub start: [usize; 3],
    pub end: [usize; 3],
    pub world_start: Vector3<f64>,
    pub world_end: Vector3<f64>,
    pub affine: Matrix4<f64>,
}

/// Orchestrates cursor, ROI, the three orthogonal projectors and the fourth
/// view.
///
/// Every mutation synchronously recomputes the affected [`ViewFrame`]s
/// before returning, so after any cursor move the three orthogonal slice
/// indices and crosshair overlays all describe the same 3D point. All work
/// happens on the caller's thread; the volume and label arrays are only ever
/// read.
pub struct ViewCoordinator {
    volume: VolumeSpace,
    labels: Option<Array3<u8>>,
    cursor: CursorModel,
    roi: RoiModel,
    projectors: [SliceProjector; 3],
    frames: [ViewFrame; 3],
    crosshair_enabled: bool,
    fourth_mode: FourthViewMode,
    oblique_line: Option<ObliqueLine>,
    sampler: ObliquePlaneSampler,
    fourth_frame: Option<GrayImage>,
    outline_thickness: usize,
    input_claim: InteractiveOverlay,
}

impl ViewCoordinator {
    /// Compose the engine around a loaded volume and an optional label
    /// volume of the same voxel grid.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::ShapeMismatch`] when the label volume does not
    /// match the volume's shape.
    pub fn new(volume: VolumeSpace, labels: Option<Array3<u8>>) -> Result<Self, VolumeError> {
        if let Some(labels) = &labels {
            volume.check_label_shape(labels)?;
        }

        let cursor = CursorModel::centered(&volume);
        let roi = RoiModel::centered_on(&volume, cursor.voxel());
        let mut projectors = Orientation::ALL.map(|o| SliceProjector::new(o, &volume));
        for projector in &mut projectors {
            projector.set_slice(&volume, cursor.slice_index(projector.orientation()));
        }
        let frames = [
            build_frame(&volume, &projectors[0], &cursor, &roi, false),
            build_frame(&volume, &projectors[1], &cursor, &roi, false),
            build_frame(&volume, &projectors[2], &cursor, &roi, false),
        ];

        Ok(Self {
            volume,
            labels,
            cursor,
            roi,
            projectors,
            frames,
            crosshair_enabled: false,
            fourth_mode: FourthViewMode::Inactive,
            oblique_line: None,
            sampler: ObliquePlaneSampler::new(),
            fourth_frame: None,
            outline_thickness: 1,
            input_claim: InteractiveOverlay::None,
        })
    }

    fn index(orientation: Orientation) -> usize {
        match orientation {
            Orientation::Axial => 0,
            Orientation::Sagittal => 1,
            Orientation::Coronal => 2,
        }
    }

    pub fn volume(&self) -> &VolumeSpace {
        &self.volume
    }

    pub fn cursor(&self) -> &CursorModel {
        &self.cursor
    }

    pub fn roi(&self) -> &RoiModel {
        &self.roi
    }

    /// Current frame for one orthogonal view.
    pub fn frame(&self, orientation: Orientation) -> &ViewFrame {
        &self.frames[Self::index(orientation)]
    }

    /// Current fourth-view image, when a mode is active and has something to
    /// show.
    pub fn fourth_frame(&self) -> Option<&GrayImage> {
        self.fourth_frame.as_ref()
    }

    pub fn interactive_overlay(&self) -> InteractiveOverlay {
        self.input_claim
    }

    pub fn slice_index(&self, orientation: Orientation) -> usize {
        self.projectors[Self::index(orientation)].slice()
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Toggle crosshair display and interaction. Enabling it takes the
    /// pointer-input claim away from the oblique line.
    pub fn set_crosshair_enabled(&mut self, enabled: bool) {
        self.crosshair_enabled = enabled;
        if enabled {
            self.input_claim = InteractiveOverlay::Crosshair;
        } else if self.input_claim == InteractiveOverlay::Crosshair {
            self.input_claim = InteractiveOverlay::None;
        }
        self.refresh_all();
    }

    pub fn crosshair_enabled(&self) -> bool {
        self.crosshair_enabled
    }

    /// Move the cursor to a clicked display-pixel position on one view.
    /// Ignored while crosshair interaction is disabled.
    pub fn set_cursor_display(&mut self, orientation: Orientation, x: f64, y: f64) {
        if !self.crosshair_enabled {
            return;
        }
        let voxel = self.projectors[Self::index(orientation)].display_to_voxel(&self.volume, x, y);
        self.set_cursor_voxel(voxel);
    }

    /// Move the cursor to a voxel position and synchronously re-slice all
    /// three orthogonal views (and the tracking ROI) to match it.
    pub fn set_cursor_voxel(&mut self, voxel: Vector3<f64>) {
        self.cursor.set_voxel(&self.volume, voxel);
        debug!(voxel = ?self.cursor.voxel(), "cursor moved");
        if self.roi.enabled() {
            self.roi.recenter_on(&self.volume, self.cursor.voxel());
        }
        self.sync_slices_to_cursor();
        self.refresh_all();
    }

    /// Step one view's slice by a wheel delta. The cursor follows along the
    /// through-slice axis, so the other views stay consistent with it.
    pub fn scroll(&mut self, orientation: Orientation, delta: i32) {
        let projector = &self.projectors[Self::index(orientation)];
        let target = projector.slice() as i64 + delta as i64;
        if target < 0 || target >= self.volume.slice_count(orientation) as i64 {
            return;
        }
        self.cursor
            .set_slice_component(&self.volume, orientation, target as f64);
        if self.roi.enabled() {
            self.roi.recenter_on(&self.volume, self.cursor.voxel());
        }
        self.sync_slices_to_cursor();
        self.refresh_all();
    }

    fn sync_slices_to_cursor(&mut self) {
        for projector in &mut self.projectors {
            let index = self.cursor.slice_index(projector.orientation());
            projector.set_slice(&self.volume, index);
        }
    }

    // ------------------------------------------------------------------
    // Viewport
    // ------------------------------------------------------------------

    /// Resize one view's viewport and refresh its frame.
    pub fn set_viewport(&mut self, orientation: Orientation, width: u32, height: u32) {
        self.projectors[Self::index(orientation)].set_viewport(&self.volume, width, height);
        self.refresh_view(orientation);
        if self.fourth_mode.base_view() == Some(orientation) {
            self.refresh_fourth();
        }
    }

    // ------------------------------------------------------------------
    // ROI
    // ------------------------------------------------------------------

    /// Toggle ROI display. Enabling it takes the pointer-input claim away
    /// from the oblique line; geometry is preserved across toggles.
    pub fn set_roi_enabled(&mut self, enabled: bool) {
        self.roi.set_enabled(enabled);
        if enabled {
            self.input_claim = InteractiveOverlay::Roi;
        } else if self.input_claim == InteractiveOverlay::Roi {
            self.input_claim = InteractiveOverlay::None;
        }
        self.refresh_all();
    }

    /// Drag the ROI box (or one of its faces) by a display-pixel delta on
    /// one view.
    pub fn drag_roi(&mut self, orientation: Orientation, edge: RoiEdge, dx: f64, dy: f64) {
        if !self.roi.enabled() {
            return;
        }
        let (sx, sy) = self.projectors[Self::index(orientation)].scale();
        let (dvx, dvy) = (dx / sx, dy / sy);
        if edge == RoiEdge::Inside {
            self.roi
                .translate_in_view(&self.volume, orientation, dvx, dvy);
        } else {
            self.roi
                .resize_edge(&self.volume, orientation, edge, dvx, dvy);
        }
        self.refresh_all();
    }

    /// Shift the ROI by a voxel-space delta.
    pub fn translate_roi(&mut self, delta: Vector3<f64>) {
        if !self.roi.enabled() {
            return;
        }
        self.roi.translate(&self.volume, delta);
        self.refresh_all();
    }

    /// Replace the ROI corners, clamped to the volume.
    pub fn set_roi_bounds(&mut self, start: Vector3<f64>, end: Vector3<f64>) {
        self.roi.set_bounds(&self.volume, start, end);
        self.refresh_all();
    }

    /// ROI bounding box in voxel coordinates, or `None` while the ROI is
    /// disabled.
    pub fn roi_bounds(&self) -> Option<RoiBounds> {
        if !self.roi.enabled() {
            return None;
        }
        let (start, end) = self.roi.bounds();
        Some(RoiBounds {
            start,
            end,
            shape: [
                end[0] - start[0],
                end[1] - start[1],
                end[2] - start[2],
            ],
        })
    }

    /// Copy out the ROI sub-volume with its voxel and physical bounds, or
    /// `None` while the ROI is disabled.
    pub fn extract_roi(&self) -> Option<RoiExtract> {
        if !self.roi.enabled() {
            return None;
        }
        let (start, end) = self.roi.bounds();
        Some(RoiExtract {
            data: self.volume.extract_box(start, end),
            start,
            end,
            world_start: self.volume.voxel_to_world(self.roi.start()),
            world_end: self.volume.voxel_to_world(self.roi.end()),
            affine: *self.volume.affine(),
        })
    }

    // ------------------------------------------------------------------
    // Fourth view
    // ------------------------------------------------------------------

    /// Switch the fourth-view mode. Exactly one mode is active at a time; an
    /// oblique line drawn for a different base view is discarded.
    pub fn set_fourth_view_mode(&mut self, mode: FourthViewMode) {
        self.fourth_mode = mode;
        match mode {
            FourthViewMode::Oblique(base) => {
                if self.oblique_line.map(|l| l.base()) != Some(base) {
                    self.oblique_line = None;
                }
                self.input_claim = InteractiveOverlay::ObliqueLine;
            }
            FourthViewMode::Outline(_) | FourthViewMode::Inactive => {
                if self.input_claim == InteractiveOverlay::ObliqueLine {
                    self.input_claim = InteractiveOverlay::None;
                }
            }
        }
        self.refresh_fourth();
    }

    pub fn fourth_view_mode(&self) -> FourthViewMode {
        self.fourth_mode
    }

    /// Place or replace the oblique line. Ignored unless the oblique mode is
    /// active on the line's base view.
    pub fn set_oblique_line(&mut self, line: ObliqueLine) {
        if self.fourth_mode != FourthViewMode::Oblique(line.base()) {
            return;
        }
        self.oblique_line = Some(line);
        self.refresh_fourth();
    }

    pub fn oblique_line(&self) -> Option<&ObliqueLine> {
        self.oblique_line.as_ref()
    }

    /// Drag one endpoint of the oblique line, in normalized view
    /// coordinates.
    pub fn move_oblique_endpoint(&mut self, second: bool, point: (f64, f64)) {
        if self.input_claim != InteractiveOverlay::ObliqueLine {
            return;
        }
        if let Some(line) = &mut self.oblique_line {
            line.set_endpoint(second, point);
            self.refresh_fourth();
        }
    }

    /// Drag the whole oblique line, in normalized view coordinates.
    pub fn translate_oblique_line(&mut self, du: f64, dv: f64) {
        if self.input_claim != InteractiveOverlay::ObliqueLine {
            return;
        }
        if let Some(line) = &mut self.oblique_line {
            line.translate(du, dv);
            self.refresh_fourth();
        }
    }

    pub fn set_outline_thickness(&mut self, thickness: usize) {
        self.outline_thickness = thickness.max(1);
        self.refresh_fourth();
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    fn refresh_view(&mut self, orientation: Orientation) {
        let idx = Self::index(orientation);
        self.frames[idx] = build_frame(
            &self.volume,
            &self.projectors[idx],
            &self.cursor,
            &self.roi,
            self.crosshair_enabled,
        );
    }

    fn refresh_all(&mut self) {
        for orientation in Orientation::ALL {
            self.refresh_view(orientation);
        }
        self.refresh_fourth();
    }

    fn refresh_fourth(&mut self) {
        self.fourth_frame = match self.fourth_mode {
            FourthViewMode::Inactive => None,
            FourthViewMode::Oblique(base) => {
                let projector = &self.projectors[Self::index(base)];
                match &self.oblique_line {
                    Some(line) => self
                        .sampler
                        .sample(&self.volume, projector, line)
                        .map(|plane| to_gray_image(&normalize_slice(plane))),
                    None => None,
                }
            }
            FourthViewMode::Outline(base) => {
                let index = self.projectors[Self::index(base)].slice();
                self.labels.as_ref().and_then(|labels| {
                    let raw = match base {
                        Orientation::Axial => labels.slice(s![.., .., index]),
                        Orientation::Sagittal => labels.slice(s![index, .., ..]),
                        Orientation::Coronal => labels.slice(s![.., index, ..]),
                    };
                    let oriented = orient_display(base, raw);
                    extract_outline(oriented.view(), self.outline_thickness)
                        .map(|outline| to_gray_image(&outline))
                })
            }
        };
    }
}

fn build_frame(
    volume: &VolumeSpace,
    projector: &SliceProjector,
    cursor: &CursorModel,
    roi: &RoiModel,
    crosshair_enabled: bool,
) -> ViewFrame {
    ViewFrame {
        slice_index: projector.slice(),
        image: projector.render(volume),
        crosshair: crosshair_enabled
            .then(|| projector.voxel_to_display(volume, cursor.voxel())),
        roi_rect: if roi.enabled() {
            projector.roi_display_rect(volume, roi)
        } else {
            None
        },
    }
}

fn to_gray_image(data: &Array2<u8>) -> GrayImage {
    let (rows, cols) = data.dim();
    ImageBuffer::from_raw(cols as u32, rows as u32, data.iter().copied().collect())
        .expect("buffer length matches array dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn coordinator(nx: usize, ny: usize, nz: usize) -> ViewCoordinator {
        let mut data = Array3::zeros((nx, ny, nz));
        for ((i, j, k), v) in data.indexed_iter_mut() {
            *v = (i + j + k) as f32;
        }
        let volume =
            VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 1.0)).unwrap();
        ViewCoordinator::new(volume, None).unwrap()
    }

    #[test]
    fn cursor_move_synchronizes_all_slice_indices() {
        let mut vc = coordinator(20, 30, 40);
        vc.set_cursor_voxel(Vector3::new(4.2, 17.8, 33.0));
        assert_eq!(vc.slice_index(Orientation::Sagittal), 4);
        assert_eq!(vc.slice_index(Orientation::Coronal), 18);
        assert_eq!(vc.slice_index(Orientation::Axial), 33);
        for orientation in Orientation::ALL {
            assert_eq!(
                vc.frame(orientation).slice_index,
                vc.cursor().slice_index(orientation)
            );
        }
    }

    #[test]
    fn scroll_moves_cursor_along_slice_axis() {
        let mut vc = coordinator(20, 20, 20);
        let before = vc.slice_index(Orientation::Axial);
        vc.scroll(Orientation::Axial, 3);
        assert_eq!(vc.slice_index(Orientation::Axial), before + 3);
        assert_eq!(vc.cursor().slice_index(Orientation::Axial), before + 3);
    }

    #[test]
    fn scroll_past_the_end_is_a_no_op() {
        let mut vc = coordinator(20, 20, 20);
        vc.scroll(Orientation::Axial, 100);
        assert_eq!(vc.slice_index(Orientation::Axial), 10);
        vc.scroll(Orientation::Axial, -100);
        assert_eq!(vc.slice_index(Orientation::Axial), 10);
    }

    #[test]
    fn crosshair_appears_only_when_enabled() {
        let mut vc = coordinator(20, 20, 20);
        assert!(vc.frame(Orientation::Axial).crosshair.is_none());
        vc.set_crosshair_enabled(true);
        assert!(vc.frame(Orientation::Axial).crosshair.is_some());
    }

    #[test]
    fn cursor_clicks_are_ignored_without_crosshair() {
        let mut vc = coordinator(20, 20, 20);
        let before = vc.cursor().voxel();
        vc.set_cursor_display(Orientation::Axial, 3.0, 3.0);
        assert_eq!(vc.cursor().voxel(), before);
    }

    #[test]
    fn roi_tracks_cursor_while_enabled() {
        let mut vc = coordinator(60, 60, 60);
        vc.set_roi_enabled(true);
        let size = vc.roi().size();
        vc.set_cursor_voxel(Vector3::new(10.0, 10.0, 10.0));
        assert_eq!(vc.roi().size(), size);
        // Clamping near the border may shift the box; away from it the box
        // is centered on the cursor.
        vc.set_cursor_voxel(Vector3::new(30.0, 30.0, 30.0));
        let center = (vc.roi().start() + vc.roi().end()) / 2.0;
        assert!((center - Vector3::new(30.0, 30.0, 30.0)).norm() < 1e-9);
    }

    #[test]
    fn roi_does_not_track_cursor_while_disabled() {
        let mut vc = coordinator(60, 60, 60);
        let start = vc.roi().start();
        vc.set_cursor_voxel(Vector3::new(5.0, 5.0, 5.0));
        assert_eq!(vc.roi().start(), start);
    }

    #[test]
    fn roi_bounds_require_enabled_roi() {
        let mut vc = coordinator(60, 60, 60);
        assert!(vc.roi_bounds().is_none());
        vc.set_roi_enabled(true);
        let bounds = vc.roi_bounds().unwrap();
        for axis in 0..3 {
            assert_eq!(bounds.shape[axis], bounds.end[axis] - bounds.start[axis]);
        }
    }

    #[test]
    fn extract_roi_matches_bounds() {
        let mut vc = coordinator(30, 30, 30);
        vc.set_roi_enabled(true);
        vc.set_roi_bounds(Vector3::new(2.0, 3.0, 4.0), Vector3::new(20.0, 21.0, 22.0));
        let extract = vc.extract_roi().unwrap();
        assert_eq!(
            extract.data.dim(),
            (
                extract.end[0] - extract.start[0] + 1,
                extract.end[1] - extract.start[1] + 1,
                extract.end[2] - extract.start[2] + 1,
            )
        );
        assert_eq!(extract.data[[0, 0, 0]], (2 + 3 + 4) as f32);
    }

    #[test]
    fn fourth_view_modes_are_mutually_exclusive() {
        let mut vc = coordinator(30, 30, 30);
        vc.set_fourth_view_mode(FourthViewMode::Oblique(Orientation::Axial));
        assert_eq!(vc.interactive_overlay(), InteractiveOverlay::ObliqueLine);
        vc.set_fourth_view_mode(FourthViewMode::Outline(Orientation::Axial));
        assert_eq!(
            vc.fourth_view_mode(),
            FourthViewMode::Outline(Orientation::Axial)
        );
        assert_eq!(vc.interactive_overlay(), InteractiveOverlay::None);
    }

    #[test]
    fn enabling_crosshair_releases_the_oblique_line() {
        let mut vc = coordinator(30, 30, 30);
        vc.set_fourth_view_mode(FourthViewMode::Oblique(Orientation::Axial));
        vc.set_oblique_line(ObliqueLine::new(
            Orientation::Axial,
            (0.1, 0.5),
            (0.9, 0.5),
        ));
        assert!(vc.fourth_frame().is_some());
        vc.set_crosshair_enabled(true);
        assert_eq!(vc.interactive_overlay(), InteractiveOverlay::Crosshair);
        // The line no longer reacts to drags once the claim moved.
        let before = *vc.oblique_line().unwrap();
        vc.translate_oblique_line(0.1, 0.1);
        assert_eq!(before, *vc.oblique_line().unwrap());
    }

    #[test]
    fn changing_base_view_discards_the_line() {
        let mut vc = coordinator(30, 30, 30);
        vc.set_fourth_view_mode(FourthViewMode::Oblique(Orientation::Axial));
        vc.set_oblique_line(ObliqueLine::new(
            Orientation::Axial,
            (0.1, 0.5),
            (0.9, 0.5),
        ));
        vc.set_fourth_view_mode(FourthViewMode::Oblique(Orientation::Coronal));
        assert!(vc.oblique_line().is_none());
        assert!(vc.fourth_frame().is_none());
    }

    #[test]
    fn outline_mode_renders_label_boundaries() {
        let mut data = Array3::zeros((20, 20, 20));
        data.fill(1.0);
        let volume =
            VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 1.0)).unwrap();
        let mut labels = Array3::<u8>::zeros((20, 20, 20));
        labels.slice_mut(s![5..15, 5..15, ..]).fill(1);
        let mut vc = ViewCoordinator::new(volume, Some(labels)).unwrap();

        vc.set_fourth_view_mode(FourthViewMode::Outline(Orientation::Axial));
        let frame = vc.fourth_frame().unwrap();
        assert!(frame.pixels().any(|p| p.0[0] > 0));
    }

    #[test]
    fn mismatched_labels_fail_construction() {
        let volume = VolumeSpace::new(
            Array3::zeros((20, 20, 20)),
            Matrix4::identity(),
            (1.0, 1.0, 1.0),
        )
        .unwrap();
        let labels = Array3::<u8>::zeros((20, 20, 19));
        assert!(ViewCoordinator::new(volume, Some(labels)).is_err());
    }
}
