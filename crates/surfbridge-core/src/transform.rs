/// A 4x4 column-major matrix of `f32`.
///
/// Used both for the producer's texture-coordinate remap (orientation/crop) and for the
/// host's model-view-projection. Equality is bitwise: `-0.0 != 0.0`, and `NaN == NaN` when
/// the bits match.
#[derive(Clone, Copy)]
pub struct TextureTransform {
    m: [f32; 16],
}

impl TextureTransform {
    pub const IDENTITY: TextureTransform = TextureTransform {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    #[inline]
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub const fn from_cols_array(m: [f32; 16]) -> Self {
        Self { m }
    }

    #[inline]
    pub fn as_array(&self) -> &[f32; 16] {
        &self.m
    }

    /// Mutable access for producers that write their 16 values in place.
    #[inline]
    pub fn as_mut_array(&mut self) -> &mut [f32; 16] {
        &mut self.m
    }

    /// Orthographic projection with a top-left origin, as used by retained-mode UI scenes.
    pub fn ortho(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        Self {
            m: [
                2.0 / rl,
                0.0,
                0.0,
                0.0,
                0.0,
                2.0 / tb,
                0.0,
                0.0,
                0.0,
                0.0,
                -1.0,
                0.0,
                -(right + left) / rl,
                -(top + bottom) / tb,
                0.0,
                1.0,
            ],
        }
    }

    /// `self * v` for a column vector.
    pub fn transform_point(&self, v: [f32; 4]) -> [f32; 4] {
        let m = &self.m;
        let mut out = [0.0f32; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = m[row] * v[0] + m[4 + row] * v[1] + m[8 + row] * v[2] + m[12 + row] * v[3];
        }
        out
    }

    pub fn bitwise_eq(&self, other: &Self) -> bool {
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PartialEq for TextureTransform {
    fn eq(&self, other: &Self) -> bool {
        self.bitwise_eq(other)
    }
}

impl Eq for TextureTransform {}

impl std::fmt::Debug for TextureTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cols: Vec<&[f32]> = self.m.chunks(4).collect();
        f.debug_struct("TextureTransform").field("cols", &cols).finish()
    }
}

impl From<[f32; 16]> for TextureTransform {
    fn from(m: [f32; 16]) -> Self {
        Self::from_cols_array(m)
    }
}
