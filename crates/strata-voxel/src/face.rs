//! The six faces of a block.

/// One of the six faces of a block.
///
/// The `repr(u8)` discriminant is the face index reported by ray hits:
/// 0 = bottom, 1 = top, 2 = north (−Z), 3 = south (+Z), 4 = west (−X), 5 = east (+X).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Face {
    /// −Y
    Bottom = 0,
    /// +Y
    Top = 1,
    /// −Z
    North = 2,
    /// +Z
    South = 3,
    /// −X
    West = 4,
    /// +X
    East = 5,
}

impl Face {
    /// All six faces in index order.
    pub const ALL: [Face; 6] = [
        Self::Bottom,
        Self::Top,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// Face index as used in hit results.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Face::index`].
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Unit offset from a block to the neighbor across this face.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Bottom => (0, -1, 0),
            Self::Top => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// Outward unit normal.
    pub fn normal(self) -> [f32; 3] {
        let (x, y, z) = self.offset();
        [x as f32, y as f32, z as f32]
    }

    /// Returns the opposite face.
    pub fn opposite(self) -> Self {
        match self {
            Self::Bottom => Self::Top,
            Self::Top => Self::Bottom,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Face axes for quad emission: `(normal_axis, u_axis, v_axis)`, 0=X, 1=Y, 2=Z.
    pub fn sweep_axes(self) -> (usize, usize, usize) {
        match self {
            Self::West | Self::East => (0, 2, 1),
            Self::Bottom | Self::Top => (1, 0, 2),
            Self::North | Self::South => (2, 0, 1),
        }
    }

    /// `true` for faces on the positive side of their axis.
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Top | Self::South | Self::East)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for face in Face::ALL {
            assert_eq!(Face::from_index(face.index()), Some(face));
        }
        assert_eq!(Face::from_index(6), None);
    }

    #[test]
    fn test_opposite_offsets_cancel() {
        for face in Face::ALL {
            let (ax, ay, az) = face.offset();
            let (bx, by, bz) = face.opposite().offset();
            assert_eq!((ax + bx, ay + by, az + bz), (0, 0, 0), "{face:?}");
        }
    }

    #[test]
    fn test_documented_indices() {
        assert_eq!(Face::Bottom.index(), 0);
        assert_eq!(Face::Top.index(), 1);
        assert_eq!(Face::North.index(), 2);
        assert_eq!(Face::South.index(), 3);
        assert_eq!(Face::West.index(), 4);
        assert_eq!(Face::East.index(), 5);
    }
}
