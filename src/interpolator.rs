use nalgebra::Vector3;
use ndarray::{Array3, ArrayView2};

pub(crate) struct Interpolator;

impl Interpolator {
    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v00 = slice[[y0, x0]];
        let v01 = slice[[y0, x1]];
        let v10 = slice[[y1, x0]];
        let v11 = slice[[y1, x1]];

        let v0 = v00.mul_add(one_minus_dx, v01 * dx);
        let v1 = v10.mul_add(one_minus_dx, v11 * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }

    /// Weighted average of the 8 voxels surrounding a continuous position.
    ///
    /// The position must already lie inside `[0, dim - 1]`; corner indices are
    /// clamped so positions exactly on the upper boundary stay valid.
    #[inline]
    pub(crate) fn trilinear_interpolate(volume: &Array3<f32>, p: Vector3<f64>) -> f32 {
        let (nx, ny, nz) = volume.dim();

        let x0 = (p.x.floor() as usize).min(nx - 1);
        let y0 = (p.y.floor() as usize).min(ny - 1);
        let z0 = (p.z.floor() as usize).min(nz - 1);
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let z1 = (z0 + 1).min(nz - 1);

        let dx = (p.x - x0 as f64) as f32;
        let dy = (p.y - y0 as f64) as f32;
        let dz = (p.z - z0 as f64) as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;
        let one_minus_dz = 1.0 - dz;

        let v000 = volume[[x0, y0, z0]];
        let v100 = volume[[x1, y0, z0]];
        let v010 = volume[[x0, y1, z0]];
        let v110 = volume[[x1, y1, z0]];
        let v001 = volume[[x0, y0, z1]];
        let v101 = volume[[x1, y0, z1]];
        let v011 = volume[[x0, y1, z1]];
        let v111 = volume[[x1, y1, z1]];

        let c00 = v000.mul_add(one_minus_dx, v100 * dx);
        let c10 = v010.mul_add(one_minus_dx, v110 * dx);
        let c01 = v001.mul_add(one_minus_dx, v101 * dx);
        let c11 = v011.mul_add(one_minus_dx, v111 * dx);

        let c0 = c00.mul_add(one_minus_dy, c10 * dy);
        let c1 = c01.mul_add(one_minus_dy, c11 * dy);

        c0.mul_add(one_minus_dz, c1 * dz)
    }
}
