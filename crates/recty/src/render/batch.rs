use bytemuck::{Pod, Zeroable};

use super::TransformMatrix;

/// Number of `f32` fields in one [`RectRecord`].
pub const RECT_FLOATS: usize = 10;

/// Byte stride between consecutive records in the vertex buffer.
pub const RECT_STRIDE: u64 = (RECT_FLOATS * std::mem::size_of::<f32>()) as u64;

/// Vertices emitted per rectangle (one triangle-strip quad).
pub const VERTICES_PER_RECT: u32 = 4;

/// One rectangle as uploaded to the GPU.
///
/// Flat layout `(x1, y1, x2, y2, r, g, b, a, tx, ty)`:
/// - `(x1, y1)` and `(x2, y2)` are opposite corners, in the space the
///   transform maps to normalized device coordinates
/// - `(r, g, b, a)` is the color, not clamped here
/// - `(tx, ty)` is the texture coordinate, only sampled by textured renderers
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct RectRecord {
    pub rect: [f32; 4],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<RectRecord>() as u64 == RECT_STRIDE);

impl RectRecord {
    #[inline]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32, color: [f32; 4]) -> Self {
        Self {
            rect: [x1, y1, x2, y2],
            color,
            texcoord: [0.0, 0.0],
        }
    }

    #[inline]
    pub const fn with_texcoord(mut self, tx: f32, ty: f32) -> Self {
        self.texcoord = [tx, ty];
        self
    }

    #[inline]
    pub const fn from_array(v: [f32; RECT_FLOATS]) -> Self {
        Self {
            rect: [v[0], v[1], v[2], v[3]],
            color: [v[4], v[5], v[6], v[7]],
            texcoord: [v[8], v[9]],
        }
    }

    #[inline]
    pub fn to_array(self) -> [f32; RECT_FLOATS] {
        bytemuck::cast(self)
    }

    /// Quad corners in triangle-strip order:
    /// `(x1, y1)`, `(x1, y2)`, `(x2, y1)`, `(x2, y2)`.
    ///
    /// Mirrored rectangles (`x1 > x2` or `y1 > y2`) keep the same combination
    /// order; the strip is still a valid quad.
    #[inline]
    pub fn corners(&self) -> [[f32; 2]; 4] {
        let [x1, y1, x2, y2] = self.rect;
        [[x1, y1], [x1, y2], [x2, y1], [x2, y2]]
    }

    /// Corners after `transform`, in the same order as [`corners`](Self::corners).
    pub fn transformed_corners(&self, transform: &TransformMatrix) -> [[f32; 2]; 4] {
        self.corners().map(|p| transform.apply(p))
    }
}

impl From<[f32; RECT_FLOATS]> for RectRecord {
    #[inline]
    fn from(v: [f32; RECT_FLOATS]) -> Self {
        Self::from_array(v)
    }
}

impl From<RectRecord> for [f32; RECT_FLOATS] {
    #[inline]
    fn from(r: RectRecord) -> Self {
        r.to_array()
    }
}

/// Host staging for the rectangles of one draw call.
///
/// Nothing here survives into the GPU buffer beyond the draw it is passed to:
/// each draw re-specifies the vertex buffer from scratch. Reuse the
/// allocation across frames with [`clear`](Self::clear).
#[derive(Debug, Clone, Default)]
pub struct BatchBuffer {
    rects: Vec<RectRecord>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rects: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, rect: impl Into<RectRecord>) {
        self.rects.push(rect.into());
    }

    #[inline]
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[RectRecord] {
        &self.rects
    }

    /// Raw bytes as uploaded: `len() * RECT_STRIDE` bytes, no padding.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.rects)
    }
}

impl<R: Into<RectRecord>> Extend<R> for BatchBuffer {
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        self.rects.extend(iter.into_iter().map(Into::into));
    }
}

impl<R: Into<RectRecord>> FromIterator<R> for BatchBuffer {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut batch = Self::new();
        batch.extend(iter);
        batch
    }
}

impl std::ops::Deref for BatchBuffer {
    type Target = [RectRecord];

    fn deref(&self) -> &[RectRecord] {
        &self.rects
    }
}

// ── host expansion ────────────────────────────────────────────────────────

/// Pre-expanded vertex used when quads are built on the CPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct ExpandedVertex {
    pub pos: [f32; 2],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
}

/// Per-quad indices for two triangles over the strip-ordered corners.
pub(crate) const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// Expands every record into four strip-ordered vertices plus six indices.
///
/// Corners stay untransformed; the vertex stage applies the transform in both
/// expansion modes so [`Recty::set_transform`](super::Recty::set_transform)
/// behaves the same either way.
pub(crate) fn expand_on_host(rects: &[RectRecord]) -> (Vec<ExpandedVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(rects.len() * VERTICES_PER_RECT as usize);
    let mut indices = Vec::with_capacity(rects.len() * QUAD_INDICES.len());

    for (i, r) in rects.iter().enumerate() {
        let base = i as u32 * VERTICES_PER_RECT;
        vertices.extend(r.corners().map(|pos| ExpandedVertex {
            pos,
            color: r.color,
            texcoord: r.texcoord,
        }));
        indices.extend(QUAD_INDICES.map(|k| base + k));
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    // ── record layout ─────────────────────────────────────────────────────

    #[test]
    fn record_is_ten_tightly_packed_floats() {
        assert_eq!(std::mem::size_of::<RectRecord>(), 40);
        assert_eq!(std::mem::offset_of!(RectRecord, rect), 0);
        assert_eq!(std::mem::offset_of!(RectRecord, color), 16);
        assert_eq!(std::mem::offset_of!(RectRecord, texcoord), 32);
    }

    #[test]
    fn flat_array_keeps_field_order() {
        let flat = [1.0, 2.0, 3.0, 4.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let r = RectRecord::from(flat);
        assert_eq!(r.rect, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(r.color, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(r.texcoord, [0.5, 0.6]);
        assert_eq!(<[f32; 10]>::from(r), flat);
    }

    // ── corners ───────────────────────────────────────────────────────────

    #[test]
    fn corners_follow_strip_order() {
        let r = RectRecord::new(-0.5, -0.25, 0.5, 0.75, RED);
        assert_eq!(
            r.corners(),
            [[-0.5, -0.25], [-0.5, 0.75], [0.5, -0.25], [0.5, 0.75]]
        );
    }

    #[test]
    fn mirrored_rect_still_yields_four_corners() {
        let r = RectRecord::new(1.0, 1.0, -1.0, -1.0, RED);
        assert_eq!(r.corners(), [[1.0, 1.0], [1.0, -1.0], [-1.0, 1.0], [-1.0, -1.0]]);
    }

    #[test]
    fn identity_places_full_screen_quad_on_ndc_corners() {
        let r = RectRecord::new(-1.0, -1.0, 1.0, 1.0, RED);
        assert_eq!(
            r.transformed_corners(&TransformMatrix::IDENTITY),
            [[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0]]
        );
    }

    #[test]
    fn transformed_corners_apply_matrix_to_each_corner() {
        let m = TransformMatrix::scale(0.5, 0.5, 0.5, -0.5);
        let r = RectRecord::new(-1.0, -1.0, 1.0, 1.0, RED);
        assert_eq!(
            r.transformed_corners(&m),
            [[0.0, -1.0], [0.0, 0.0], [1.0, -1.0], [1.0, 0.0]]
        );
    }

    // ── batch buffer ──────────────────────────────────────────────────────

    #[test]
    fn batch_bytes_are_stride_times_len() {
        let batch: BatchBuffer = (0..3)
            .map(|i| RectRecord::new(i as f32, 0.0, 1.0, 1.0, RED))
            .collect();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.as_bytes().len() as u64, 3 * RECT_STRIDE);
    }

    #[test]
    fn batch_clear_keeps_nothing() {
        let mut batch = BatchBuffer::with_capacity(4);
        batch.push([0.0f32; 10]);
        batch.push(RectRecord::new(0.0, 0.0, 1.0, 1.0, RED));
        batch.clear();
        assert!(batch.is_empty());
        assert!(batch.as_bytes().is_empty());
    }

    // ── host expansion ────────────────────────────────────────────────────

    #[test]
    fn host_expansion_emits_four_vertices_per_rect() {
        let rects: Vec<_> = (0..5)
            .map(|i| RectRecord::new(0.0, 0.0, i as f32, 1.0, RED))
            .collect();
        let (vertices, indices) = expand_on_host(&rects);
        assert_eq!(vertices.len(), 4 * rects.len());
        assert_eq!(indices.len(), 6 * rects.len());
    }

    #[test]
    fn host_expansion_of_empty_batch_is_empty() {
        let (vertices, indices) = expand_on_host(&[]);
        assert!(vertices.is_empty());
        assert!(indices.is_empty());
    }

    #[test]
    fn host_expansion_shares_color_and_texcoord() {
        let r = RectRecord::new(0.0, 0.0, 1.0, 1.0, [0.2, 0.4, 0.6, 0.8]).with_texcoord(0.5, 0.25);
        let (vertices, _) = expand_on_host(&[r]);
        for v in &vertices {
            assert_eq!(v.color, r.color);
            assert_eq!(v.texcoord, r.texcoord);
        }
        let positions: Vec<_> = vertices.iter().map(|v| v.pos).collect();
        assert_eq!(positions, r.corners());
    }

    #[test]
    fn host_expansion_indices_stay_within_their_quad() {
        let rects = [RectRecord::default(); 3];
        let (_, indices) = expand_on_host(&rects);
        for (quad, chunk) in indices.chunks(6).enumerate() {
            let base = quad as u32 * 4;
            assert!(chunk.iter().all(|&i| (base..base + 4).contains(&i)));
        }
        assert_eq!(&indices[6..12], &[4, 5, 6, 6, 5, 7]);
    }
}
