//! 座標変換
//!
//! PDFユーザー空間とビューポート（ピクセル）空間の変換。
//! Matrices use the PDF convention `[a, b, c, d, e, f]`, mapping
//! `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`.

use serde::{Deserialize, Serialize};

/// 2×3 affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix(pub [f64; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Matrix([a, b, c, d, e, f])
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    /// Length of the transformed x unit vector.
    pub fn horizontal_scale(&self) -> f64 {
        self.0[0].hypot(self.0[1])
    }

    /// Length of the transformed y unit vector.
    pub fn vertical_scale(&self) -> f64 {
        self.0[2].hypot(self.0[3])
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

/// Axis-aligned rectangle, `(x, y)` is the minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Closed-interval containment: points on the border are inside.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.h
    }

    /// Maps two opposite corners through `m` and re-normalises.
    pub fn transform(&self, m: &Matrix) -> Rect {
        let (x1, y1) = m.apply(self.x, self.y);
        let (x2, y2) = m.apply(self.x + self.w, self.y + self.h);
        Rect {
            x: x1.min(x2),
            y: y1.min(y2),
            w: (x2 - x1).abs(),
            h: (y2 - y1).abs(),
        }
    }
}

/// Bounding rectangle of each 8-number quadrilateral.
///
/// A trailing group shorter than 8 numbers is ignored; callers that need to
/// reject such input check the length themselves.
pub fn rects_from_quad_points(quad_points: &[f64]) -> Vec<Rect> {
    quad_points
        .chunks_exact(8)
        .map(|q| {
            let xs = [q[0], q[2], q[4], q[6]];
            let ys = [q[1], q[3], q[5], q[7]];
            let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
            let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
            let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Rect {
                x: min_x,
                y: min_y,
                w: max_x - min_x,
                h: max_y - min_y,
            }
        })
        .collect()
}

/// Page display transform (PDF user space → viewport pixels, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub transform: Matrix,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// `view_box` is `[x0, y0, x1, y1]`; `rotation` is in degrees clockwise.
    pub fn new(view_box: [f64; 4], scale: f64, rotation: i64) -> Self {
        let [x0, y0, x1, y1] = view_box;
        let center_x = (x1 + x0) / 2.0;
        let center_y = (y1 + y0) / 2.0;

        let rotation = (((rotation as f64 / 90.0).round() as i64) * 90).rem_euclid(360);
        let (ra, rb, rc, rd) = match rotation {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };

        let (offset_x, offset_y, width, height) = if ra == 0.0 {
            (
                (center_y - y0).abs() * scale,
                (center_x - x0).abs() * scale,
                (y1 - y0).abs() * scale,
                (x1 - x0).abs() * scale,
            )
        } else {
            (
                (center_x - x0).abs() * scale,
                (center_y - y0).abs() * scale,
                (x1 - x0).abs() * scale,
                (y1 - y0).abs() * scale,
            )
        };

        let transform = Matrix([
            ra * scale,
            rb * scale,
            rc * scale,
            rd * scale,
            offset_x - ra * scale * center_x - rc * scale * center_y,
            offset_y - rb * scale * center_x - rd * scale * center_y,
        ]);

        Viewport { transform, width, height }
    }
}
