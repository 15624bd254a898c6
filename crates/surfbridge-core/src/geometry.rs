/// Axis-aligned rectangle in item coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub const UNIT: Rect = Rect {
        x0: 0.0,
        y0: 0.0,
        x1: 1.0,
        y1: 1.0,
    };

    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Same rectangle with top and bottom exchanged.
    pub fn flipped_vertically(&self) -> Self {
        Self::new(self.x0, self.y1, self.x1, self.y0)
    }
}

/// One vertex of a textured quad: position followed by texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexturedPoint2D {
    pub x: f32,
    pub y: f32,
    pub tx: f32,
    pub ty: f32,
}

/// Four-vertex triangle-strip quad.
///
/// Vertex order: top-left, bottom-left, top-right, bottom-right of the rectangle passed in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadGeometry {
    pub vertices: [TexturedPoint2D; 4],
}

impl QuadGeometry {
    pub const VERTEX_COUNT: usize = 4;
    pub const FLOATS_PER_VERTEX: usize = 4;

    pub fn textured_rect(rect: Rect, tex: Rect) -> Self {
        let v = |x, y, tx, ty| TexturedPoint2D { x, y, tx, ty };
        Self {
            vertices: [
                v(rect.x0, rect.y0, tex.x0, tex.y0),
                v(rect.x0, rect.y1, tex.x0, tex.y1),
                v(rect.x1, rect.y0, tex.x1, tex.y0),
                v(rect.x1, rect.y1, tex.x1, tex.y1),
            ],
        }
    }

    /// Quad covering `bounds` whose texture rows run bottom-up.
    ///
    /// Producers emit rows in the opposite order to the scene's y-down convention, so the
    /// position rectangle is flipped while the texture rectangle stays the unit square.
    pub fn textured_rect_flipped(bounds: Rect) -> Self {
        Self::textured_rect(bounds.flipped_vertically(), Rect::UNIT)
    }

    /// Interleaved `[x, y, tx, ty]` floats ready for a vertex buffer.
    pub fn to_interleaved(&self) -> [f32; Self::VERTEX_COUNT * Self::FLOATS_PER_VERTEX] {
        let mut out = [0.0; Self::VERTEX_COUNT * Self::FLOATS_PER_VERTEX];
        for (chunk, v) in out.chunks_exact_mut(4).zip(self.vertices.iter()) {
            chunk.copy_from_slice(&[v.x, v.y, v.tx, v.ty]);
        }
        out
    }

    /// Texture coordinate of the vertex at position `(x, y)`, if any.
    pub fn tex_coord_at(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        self.vertices
            .iter()
            .find(|v| v.x == x && v.y == y)
            .map(|v| (v.tx, v.ty))
    }
}
