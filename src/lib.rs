//! # Multi-planar reconstruction engine
//!
//! This crate turns a canonically oriented scalar volume into three
//! synchronized orthogonal cross-sections plus an optional fourth view.
//! The volume is indexed `[i, j, k]` and sliced along the three medical
//! axes:
//!  - Axial (along `k`)
//!  - Sagittal (along `i`)
//!  - Coronal (along `j`)
//!
//! A shared 3D cursor drives the slice selection of all three views at once,
//! an axis-aligned ROI box can be dragged and resized on any of them, and
//! the fourth view shows either an oblique reslice along a line drawn on one
//! base view or the outline of a label volume on the current slice. All
//! state lives in [`ViewCoordinator`]; every mutation synchronously
//! recomputes the affected view frames before it returns, so a frontend can
//! repaint straight from the returned state.
//!
//! Pixel-heavy work (slice resampling, oblique plane interpolation) runs in
//! parallel using rayon.
//!
//! # Examples
//!
//! ## Slicing a volume and moving the cursor
//!
//! ```
//! use mpr_engine::{Orientation, ViewCoordinator, VolumeSpace};
//! use nalgebra::{Matrix4, Vector3};
//! use ndarray::Array3;
//!
//! let data = Array3::<f32>::zeros((64, 64, 32));
//! let volume = VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 2.0))?;
//! let mut views = ViewCoordinator::new(volume, None)?;
//!
//! views.set_cursor_voxel(Vector3::new(10.0, 20.0, 15.0));
//! assert_eq!(views.frame(Orientation::Axial).slice_index, 15);
//! # Ok::<(), mpr_engine::VolumeError>(())
//! ```
//!
//! ## Reslicing along an oblique line
//!
//! ```
//! use mpr_engine::{FourthViewMode, ObliqueLine, Orientation, ViewCoordinator, VolumeSpace};
//! use nalgebra::Matrix4;
//! use ndarray::Array3;
//!
//! let data = Array3::<f32>::zeros((64, 64, 32));
//! let volume = VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 1.0))?;
//! let mut views = ViewCoordinator::new(volume, None)?;
//!
//! views.set_fourth_view_mode(FourthViewMode::Oblique(Orientation::Axial));
//! views.set_oblique_line(ObliqueLine::new(Orientation::Axial, (0.2, 0.3), (0.8, 0.7)));
//! assert!(views.fourth_frame().is_some());
//! # Ok::<(), mpr_engine::VolumeError>(())
//! ```

pub mod coordinator;
pub mod cursor;
pub mod enums;
mod interpolator;
pub mod oblique;
pub mod outline;
pub mod projector;
pub mod roi;
pub mod volume;

pub use coordinator::{InteractiveOverlay, RoiBounds, RoiExtract, ViewCoordinator, ViewFrame};
pub use cursor::CursorModel;
pub use enums::{FourthViewMode, Orientation, RoiEdge};
pub use oblique::{ObliqueLine, ObliquePlaneSampler};
pub use outline::extract_outline;
pub use projector::SliceProjector;
pub use roi::{MIN_ROI_SIZE, RoiModel};
pub use volume::{VolumeError, VolumeSpace};
