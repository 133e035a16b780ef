/// One of the three canonical cross-sections of a canonically oriented volume.
///
/// The volume is indexed `[i, j, k]`; each orientation slices along one fixed
/// axis: axial along `k`, sagittal along `i`, coronal along `j`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Axial,
        Orientation::Sagittal,
        Orientation::Coronal,
    ];

    /// Index of the volume axis this orientation slices along.
    pub fn slice_axis(&self) -> usize {
        match self {
            Orientation::Axial => 2,
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
        }
    }
}

/// Compass tag identifying the ROI edge or corner being dragged on a 2D view.
///
/// Corners edit two box faces at once; `Inside` drags the whole box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoiEdge {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Inside,
}

impl RoiEdge {
    pub fn touches_north(&self) -> bool {
        matches!(self, RoiEdge::North | RoiEdge::NorthEast | RoiEdge::NorthWest)
    }

    pub fn touches_south(&self) -> bool {
        matches!(self, RoiEdge::South | RoiEdge::SouthEast | RoiEdge::SouthWest)
    }

    pub fn touches_east(&self) -> bool {
        matches!(self, RoiEdge::East | RoiEdge::NorthEast | RoiEdge::SouthEast)
    }

    pub fn touches_west(&self) -> bool {
        matches!(self, RoiEdge::West | RoiEdge::NorthWest | RoiEdge::SouthWest)
    }
}

/// Content of the fourth viewport. At most one mode is active at a time and
/// each carries the orthogonal view it reads its geometry from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FourthViewMode {
    #[default]
    Inactive,
    Oblique(Orientation),
    Outline(Orientation),
}

impl FourthViewMode {
    pub fn base_view(&self) -> Option<Orientation> {
        match self {
            FourthViewMode::Inactive => None,
            FourthViewMode::Oblique(base) | FourthViewMode::Outline(base) => Some(*base),
        }
    }
}
