use crate::enums::Orientation;
use crate::interpolator::Interpolator;
use crate::projector::SliceProjector;
use crate::volume::VolumeSpace;

use nalgebra::Vector3;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Lower bound on oblique output resolution, samples per side.
pub const MIN_OBLIQUE_SAMPLES: usize = 64;
/// Upper bound on oblique output resolution, samples per side.
pub const MAX_OBLIQUE_SAMPLES: usize = 512;

/// The plane must cover at least this fraction of the largest volume
/// dimension even when the drawn line is short.
const MIN_SPAN_FRACTION: f64 = 0.5;

const DEGENERATE_LINE_EPSILON: f64 = 1e-6;

/// A line drawn on one base orthogonal view, endpoints in normalized
/// `[0, 1] x [0, 1]` display coordinates.
///
/// The line is only meaningful relative to its base view; when the base view
/// changes the line is discarded and redrawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObliqueLine {
    base: Orientation,
    p1: (f64, f64),
    p2: (f64, f64),
}

impl ObliqueLine {
    pub fn new(base: Orientation, p1: (f64, f64), p2: (f64, f64)) -> Self {
        Self {
            base,
            p1: clamp_unit(p1),
            p2: clamp_unit(p2),
        }
    }

    pub fn base(&self) -> Orientation {
        self.base
    }

    pub fn endpoints(&self) -> ((f64, f64), (f64, f64)) {
        (self.p1, self.p2)
    }

    /// Move one endpoint, clamped to the view.
    pub fn set_endpoint(&mut self, second: bool, point: (f64, f64)) {
        if second {
            self.p2 = clamp_unit(point);
        } else {
            self.p1 = clamp_unit(point);
        }
    }

    /// Translate the whole line, clamped so both endpoints stay on the view.
    pub fn translate(&mut self, du: f64, dv: f64) {
        let du = du
            .max(-self.p1.0.min(self.p2.0))
            .min(1.0 - self.p1.0.max(self.p2.0));
        let dv = dv
            .max(-self.p1.1.min(self.p2.1))
            .min(1.0 - self.p1.1.max(self.p2.1));
        self.p1 = (self.p1.0 + du, self.p1.1 + dv);
        self.p2 = (self.p2.0 + du, self.p2.1 + dv);
    }
}

fn clamp_unit(p: (f64, f64)) -> (f64, f64) {
    (p.0.clamp(0.0, 1.0), p.1.clamp(0.0, 1.0))
}

#[derive(PartialEq, Eq, Debug)]
struct CacheKey {
    base: Orientation,
    slice: usize,
    endpoint_bits: [u64; 4],
    samples: usize,
}

/// Resamples the volume along the oblique plane spanned by a drawn line and
/// the through-slice axis of its base view.
///
/// Pure read-side component: it never mutates volume or cursor state. The
/// last result is cached and reused while the base view, slice, line
/// endpoints and output size stay unchanged.
#[derive(Default)]
pub struct ObliquePlaneSampler {
    cache: Option<(CacheKey, Array2<f32>)>,
}

impl ObliquePlaneSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resample the oblique plane defined by `line` on the base view that
    /// `projector` currently shows.
    ///
    /// Returns `None` for a degenerate (near-zero length) line. The output is
    /// a square image whose columns run along the drawn line's direction and
    /// whose rows run along the second in-plane axis; grid points outside the
    /// volume are filled with the volume's minimum intensity.
    pub fn sample(
        &mut self,
        volume: &VolumeSpace,
        projector: &SliceProjector,
        line: &ObliqueLine,
    ) -> Option<&Array2<f32>> {
        debug_assert_eq!(projector.orientation(), line.base());

        // 1. Line endpoints from normalized base-view coordinates to 3D
        // voxel-space points on the current slice.
        let (w, h) = projector.display_dims(volume);
        let ((u1, v1), (u2, v2)) = line.endpoints();
        let p1 = projector.slice_coords_to_voxel(
            volume,
            u1 * (w - 1) as f64,
            v1 * (h - 1) as f64,
        );
        let p2 = projector.slice_coords_to_voxel(
            volume,
            u2 * (w - 1) as f64,
            v2 * (h - 1) as f64,
        );

        // 2. In-plane direction.
        let chord = p2 - p1;
        let length = chord.norm();
        if length < DEGENERATE_LINE_EPSILON {
            trace!("degenerate oblique line, nothing to sample");
            return None;
        }
        let v_dir = chord / length;

        // 3.-5. Orthonormal in-plane frame from the base view's slice normal.
        let base_n = slice_normal(line.base());
        let mut normal = v_dir.cross(&base_n);
        if normal.norm() < DEGENERATE_LINE_EPSILON {
            // Drawn line parallel to the slice normal; fall back to the
            // canonical axis least aligned with it.
            normal = v_dir.cross(&fallback_axis(v_dir));
        }
        let normal = normal.normalize();
        let s_dir = normal.cross(&v_dir).normalize();

        // 6. Regular sampling grid centered on the line midpoint.
        let dim = volume.dim();
        let max_dim = dim.0.max(dim.1).max(dim.2);
        let span = length.max(max_dim as f64 * MIN_SPAN_FRACTION);
        let samples = (span.round() as usize).clamp(MIN_OBLIQUE_SAMPLES, MAX_OBLIQUE_SAMPLES);
        let origin = p1 + chord / 2.0;

        // The endpoints (not just the midpoint) go into the key: swapping
        // them keeps the origin but reverses the in-plane direction.
        let key = CacheKey {
            base: line.base(),
            slice: projector.slice(),
            endpoint_bits: [u1.to_bits(), v1.to_bits(), u2.to_bits(), v2.to_bits()],
            samples,
        };
        if let Some((cached_key, _)) = &self.cache {
            if *cached_key == key {
                trace!(?key, "oblique cache hit");
                return self.cache.as_ref().map(|(_, image)| image);
            }
        }
        debug!(
            base = ?line.base(),
            slice = key.slice,
            samples,
            "resampling oblique plane"
        );

        // 7. Trilinear resampling over the grid, min-intensity fill outside.
        let step = span / (samples - 1) as f64;
        let half = (samples - 1) as f64 / 2.0;
        let fill = volume.min_intensity();
        let data = volume.data();

        let values: Vec<f32> = (0..samples)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..samples).map(move |col| {
                    let u = (col as f64 - half) * step;
                    let v = (row as f64 - half) * step;
                    let p = origin + v_dir * u + s_dir * v;
                    if volume.contains(p) {
                        Interpolator::trilinear_interpolate(data, p)
                    } else {
                        fill
                    }
                })
            })
            .collect();

        let image = Array2::from_shape_vec((samples, samples), values)
            .expect("grid size matches sample count");

        // 8. Cache keyed by everything the output depends on.
        self.cache = Some((key, image));
        self.cache.as_ref().map(|(_, image)| image)
    }

    /// Drop the cached plane, forcing the next sample to recompute.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

/// Unit vector along the orientation's fixed slice axis.
fn slice_normal(orientation: Orientation) -> Vector3<f64> {
    match orientation {
        Orientation::Axial => Vector3::new(0.0, 0.0, 1.0),
        Orientation::Sagittal => Vector3::new(1.0, 0.0, 0.0),
        Orientation::Coronal => Vector3::new(0.0, 1.0, 0.0),
    }
}

/// Canonical axis least aligned with `v`, for a stable fallback cross
/// product.
fn fallback_axis(v: Vector3<f64>) -> Vector3<f64> {
    let abs = v.map(f64::abs);
    if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::new(1.0, 0.0, 0.0)
    } else if abs.y <= abs.z {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;
    use ndarray::Array3;

    fn gradient_volume(nx: usize, ny: usize, nz: usize) -> VolumeSpace {
        let mut data = Array3::zeros((nx, ny, nz));
        for ((i, _, _), v) in data.indexed_iter_mut() {
            *v = i as f32;
        }
        VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 1.0)).unwrap()
    }

    #[test]
    fn degenerate_line_samples_nothing() {
        let vs = gradient_volume(20, 20, 20);
        let projector = SliceProjector::new(Orientation::Axial, &vs);
        let mut sampler = ObliquePlaneSampler::new();
        let line = ObliqueLine::new(Orientation::Axial, (0.4, 0.4), (0.4, 0.4));
        assert!(sampler.sample(&vs, &projector, &line).is_none());
    }

    #[test]
    fn horizontal_axial_line_reslices_along_i() {
        let vs = gradient_volume(100, 100, 50);
        let mut projector = SliceProjector::new(Orientation::Axial, &vs);
        projector.set_slice(&vs, 25);
        let mut sampler = ObliquePlaneSampler::new();
        let line = ObliqueLine::new(Orientation::Axial, (0.2, 0.5), (0.8, 0.5));

        let image = sampler.sample(&vs, &projector, &line).unwrap().clone();
        let samples = image.nrows();
        assert_eq!(image.ncols(), samples);

        // The in-plane direction is purely along i; the intensity gradient
        // runs along i, so every in-bounds row reads the same ramp.
        let span = 0.6 * 99.0_f64.max(50.0); // line length dominates here
        let step = span / (samples - 1) as f64;
        let half = (samples - 1) as f64 / 2.0;
        let origin_i = 49.5;

        let center_row = samples / 2;
        for col in 0..samples {
            let expected_i = origin_i - (col as f64 - half) * step;
            if (0.0..=99.0).contains(&expected_i) {
                let got = image[[center_row, col]];
                assert!(
                    (got as f64 - expected_i).abs() < 1e-3,
                    "col {col}: expected {expected_i}, got {got}"
                );
            }
        }

        // Rows differ only in k, which the gradient ignores, so two
        // in-bounds rows are identical.
        let other_row = center_row - 1;
        for col in 0..samples {
            assert_eq!(image[[center_row, col]], image[[other_row, col]]);
        }
    }

    #[test]
    fn out_of_volume_grid_points_use_min_fill() {
        let mut data = Array3::from_elem((30, 30, 8), 5.0_f32);
        data[[0, 0, 0]] = 2.0;
        let vs = VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 1.0)).unwrap();
        let mut projector = SliceProjector::new(Orientation::Axial, &vs);
        projector.set_slice(&vs, 4);
        let mut sampler = ObliquePlaneSampler::new();
        let line = ObliqueLine::new(Orientation::Axial, (0.1, 0.5), (0.9, 0.5));

        let image = sampler.sample(&vs, &projector, &line).unwrap();
        // The second in-plane axis runs along k, which is only 8 voxels
        // deep, so the top row of the grid lies outside the volume.
        assert_eq!(image[[0, image.ncols() / 2]], vs.min_intensity());
    }

    #[test]
    fn cache_reuses_unchanged_plane() {
        let mut data = Array3::zeros((40, 40, 40));
        for ((i, j, k), v) in data.indexed_iter_mut() {
            *v = (i * 1600 + j * 40 + k) as f32;
        }
        let vs = VolumeSpace::new(data, Matrix4::identity(), (1.0, 1.0, 1.0)).unwrap();
        let mut projector = SliceProjector::new(Orientation::Coronal, &vs);
        let mut sampler = ObliquePlaneSampler::new();
        let line = ObliqueLine::new(Orientation::Coronal, (0.1, 0.2), (0.9, 0.8));

        let first = sampler.sample(&vs, &projector, &line).unwrap().clone();
        let second = sampler.sample(&vs, &projector, &line).unwrap().clone();
        assert_eq!(first, second);

        // Changing the slice changes the key and recomputes.
        projector.set_slice(&vs, 5);
        let third = sampler.sample(&vs, &projector, &line).unwrap();
        assert_ne!(first, *third);
    }

    #[test]
    fn swapped_endpoints_recompute_the_plane() {
        let vs = gradient_volume(33, 33, 33);
        let projector = SliceProjector::new(Orientation::Axial, &vs);
        let mut sampler = ObliquePlaneSampler::new();
        let forward = ObliqueLine::new(Orientation::Axial, (0.25, 0.5), (0.75, 0.5));
        let reversed = ObliqueLine::new(Orientation::Axial, (0.75, 0.5), (0.25, 0.5));

        // Same midpoint, length and slice, but the in-plane direction is
        // reversed, so the cached plane must not be served.
        let first = sampler.sample(&vs, &projector, &forward).unwrap().clone();
        let second = sampler.sample(&vs, &projector, &reversed).unwrap().clone();
        assert_ne!(first, second);

        let mut fresh = ObliquePlaneSampler::new();
        let expected = fresh.sample(&vs, &projector, &reversed).unwrap();
        assert_eq!(second, *expected);
    }

    #[test]
    fn line_translation_stays_inside_view() {
        let mut line = ObliqueLine::new(Orientation::Axial, (0.2, 0.2), (0.6, 0.6));
        line.translate(10.0, -10.0);
        let ((x1, y1), (x2, y2)) = line.endpoints();
        assert_eq!((x1, y1), (0.6, 0.0));
        assert_eq!((x2, y2), (1.0, 0.4));
    }
}
