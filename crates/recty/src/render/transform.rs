use bytemuck::{Pod, Zeroable};

/// 2D affine transform shared by every rectangle of a draw call.
///
/// Stored column-major as a 3×3 matrix whose bottom row is fixed to
/// `(0, 0, 1)`, so a point `(x, y)` maps to
///
/// ```text
/// x' = a·x + d·y + g
/// y' = b·x + e·y + h
/// ```
///
/// for the arguments of [`TransformMatrix::from_parts`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TransformMatrix {
    cols: [[f32; 3]; 3],
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformMatrix {
    pub const IDENTITY: Self = Self::from_parts(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);

    /// Builds the matrix from its two free rows, given column by column:
    /// `(a, b)` first column, `(d, e)` second, `(g, h)` translation.
    ///
    /// The argument order mirrors [`Recty::set_transform`](super::Recty::set_transform).
    #[inline]
    pub const fn from_parts(a: f32, d: f32, g: f32, b: f32, e: f32, h: f32) -> Self {
        Self {
            cols: [[a, b, 0.0], [d, e, 0.0], [g, h, 1.0]],
        }
    }

    /// Axis-aligned scale by `(w, h)` followed by a translation by `(dx, dy)`.
    #[inline]
    pub const fn scale(w: f32, h: f32, dx: f32, dy: f32) -> Self {
        Self::from_parts(w, 0.0, dx, 0.0, h, dy)
    }

    /// Column-major storage, third component of each column included.
    #[inline]
    pub const fn columns(&self) -> [[f32; 3]; 3] {
        self.cols
    }

    /// Maps a point through the matrix (w = 1).
    #[inline]
    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        let [c0, c1, c2] = self.cols;
        [
            c0[0] * p[0] + c1[0] * p[1] + c2[0],
            c0[1] * p[0] + c1[1] * p[1] + c2[1],
        ]
    }

    /// Bitwise equality: `-0.0` differs from `0.0` and NaN equals itself.
    #[inline]
    pub fn same_bits(&self, other: &Self) -> bool {
        bytemuck::bytes_of(&self.to_uniform()) == bytemuck::bytes_of(&other.to_uniform())
    }

    /// Uniform buffer representation.
    #[inline]
    pub(crate) fn to_uniform(self) -> TransformUniform {
        let [c0, c1, c2] = self.cols;
        TransformUniform {
            cols: [
                [c0[0], c0[1], c0[2], 0.0],
                [c1[0], c1[1], c1[2], 0.0],
                [c2[0], c2[1], c2[2], 0.0],
            ],
        }
    }
}

/// `mat3x3<f32>` as laid out in a WGSL uniform: each column padded to 16 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct TransformUniform {
    pub cols: [[f32; 4]; 3],
}

impl TransformUniform {
    pub(crate) const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}
