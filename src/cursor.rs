use crate::enums::Orientation;
use crate::volume::VolumeSpace;

use nalgebra::Vector3;

/// The single shared 3D point of interest.
///
/// Held as a continuous voxel-space position, always clamped to the volume
/// bounds, with the physical-space position derived through the affine. The
/// per-view slice index is the rounded component along that view's slice
/// axis.
#[derive(Clone, Debug)]
pub struct CursorModel {
    voxel: Vector3<f64>,
    world: Vector3<f64>,
}

impl CursorModel {
    /// Place the cursor at the volume center.
    pub fn centered(volume: &VolumeSpace) -> Self {
        let dim = volume.dim();
        let center = Vector3::new(
            (dim.0 - 1) as f64 / 2.0,
            (dim.1 - 1) as f64 / 2.0,
            (dim.2 - 1) as f64 / 2.0,
        );
        Self {
            voxel: center,
            world: volume.voxel_to_world(center),
        }
    }

    /// Clamp and store a new voxel position; the world position follows.
    pub fn set_voxel(&mut self, volume: &VolumeSpace, voxel: Vector3<f64>) {
        self.voxel = volume.clamp_voxel(voxel);
        self.world = volume.voxel_to_world(self.voxel);
    }

    /// Move only the component along one orientation's slice axis, keeping
    /// the in-plane components untouched.
    pub fn set_slice_component(
        &mut self,
        volume: &VolumeSpace,
        orientation: Orientation,
        index: f64,
    ) {
        let mut voxel = self.voxel;
        voxel[orientation.slice_axis()] = index;
        self.set_voxel(volume, voxel);
    }

    pub fn voxel(&self) -> Vector3<f64> {
        self.voxel
    }

    pub fn world(&self) -> Vector3<f64> {
        self.world
    }

    /// Rounded slice index of the cursor on the given orientation.
    pub fn slice_index(&self, orientation: Orientation) -> usize {
        self.voxel[orientation.slice_axis()].round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;
    use ndarray::Array3;

    fn volume() -> VolumeSpace {
        VolumeSpace::new(
            Array3::zeros((11, 21, 31)),
            Matrix4::identity(),
            (1.0, 1.0, 1.0),
        )
        .unwrap()
    }

    #[test]
    fn starts_at_volume_center() {
        let vs = volume();
        let cursor = CursorModel::centered(&vs);
        assert_eq!(cursor.voxel(), Vector3::new(5.0, 10.0, 15.0));
        assert_eq!(cursor.slice_index(Orientation::Sagittal), 5);
        assert_eq!(cursor.slice_index(Orientation::Coronal), 10);
        assert_eq!(cursor.slice_index(Orientation::Axial), 15);
    }

    #[test]
    fn set_voxel_clamps_to_bounds() {
        let vs = volume();
        let mut cursor = CursorModel::centered(&vs);
        cursor.set_voxel(&vs, Vector3::new(-4.0, 100.0, 2.5));
        assert_eq!(cursor.voxel(), Vector3::new(0.0, 20.0, 2.5));
    }

    #[test]
    fn slice_indices_follow_rounded_components() {
        let vs = volume();
        let mut cursor = CursorModel::centered(&vs);
        cursor.set_voxel(&vs, Vector3::new(3.4, 7.6, 12.5));
        assert_eq!(cursor.slice_index(Orientation::Sagittal), 3);
        assert_eq!(cursor.slice_index(Orientation::Coronal), 8);
        assert_eq!(cursor.slice_index(Orientation::Axial), 13);
    }

    #[test]
    fn set_slice_component_moves_one_axis() {
        let vs = volume();
        let mut cursor = CursorModel::centered(&vs);
        cursor.set_slice_component(&vs, Orientation::Axial, 4.0);
        assert_eq!(cursor.voxel(), Vector3::new(5.0, 10.0, 4.0));
    }
}
