//! Quadratic 3D fitting for scale-space extremum localization.
//!
//! The DoG function around a discrete extremum is approximated by its
//! second-order Taylor expansion in `(x, y, scale)`; the vertex of that
//! quadratic is the refined extremum.

use crate::util::math::solve_3x3;

/// 3x3x3 block of DoG samples indexed `[layer][row][col]`, centered on the
/// candidate extremum.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cube(pub(crate) [[[f32; 3]; 3]; 3]);

impl Cube {
    #[inline]
    fn at(&self, ds: usize, dy: usize, dx: usize) -> f32 {
        self.0[ds][dy][dx]
    }

    /// Center sample.
    pub(crate) fn center(&self) -> f32 {
        self.at(1, 1, 1)
    }

    /// Central-difference gradient ordered `(x, y, scale)`.
    pub(crate) fn gradient(&self) -> [f32; 3] {
        [
            (self.at(1, 1, 2) - self.at(1, 1, 0)) * 0.5,
            (self.at(1, 2, 1) - self.at(1, 0, 1)) * 0.5,
            (self.at(2, 1, 1) - self.at(0, 1, 1)) * 0.5,
        ]
    }

    /// Finite-difference Hessian ordered `(x, y, scale)`.
    pub(crate) fn hessian(&self) -> [[f32; 3]; 3] {
        let v2 = self.center() * 2.0;
        let dxx = self.at(1, 1, 2) + self.at(1, 1, 0) - v2;
        let dyy = self.at(1, 2, 1) + self.at(1, 0, 1) - v2;
        let dss = self.at(2, 1, 1) + self.at(0, 1, 1) - v2;
        let dxy = (self.at(1, 2, 2) - self.at(1, 2, 0) - self.at(1, 0, 2) + self.at(1, 0, 0)) * 0.25;
        let dxs = (self.at(2, 1, 2) - self.at(2, 1, 0) - self.at(0, 1, 2) + self.at(0, 1, 0)) * 0.25;
        let dys = (self.at(2, 2, 1) - self.at(2, 0, 1) - self.at(0, 2, 1) + self.at(0, 0, 1)) * 0.25;
        [[dxx, dxy, dxs], [dxy, dyy, dys], [dxs, dys, dss]]
    }

    /// Offset `(x, y, scale)` of the fitted quadratic's vertex, or `None`
    /// when the Hessian is singular.
    pub(crate) fn vertex_offset(&self) -> Option<[f32; 3]> {
        let solution = solve_3x3(self.hessian(), self.gradient())?;
        Some([-solution[0], -solution[1], -solution[2]])
    }

    /// Interpolated DoG value at `offset` from the center.
    pub(crate) fn value_at(&self, offset: [f32; 3]) -> f32 {
        let g = self.gradient();
        self.center() + 0.5 * (g[0] * offset[0] + g[1] * offset[1] + g[2] * offset[2])
    }

    /// Trace and determinant of the spatial 2x2 Hessian.
    pub(crate) fn spatial_trace_det(&self) -> (f32, f32) {
        let h = self.hessian();
        let tr = h[0][0] + h[1][1];
        let det = h[0][0] * h[1][1] - h[0][1] * h[0][1];
        (tr, det)
    }
}

#[cfg(test)]
mod tests {
    use super::Cube;

    fn sample_cube(f: impl Fn(f32, f32, f32) -> f32) -> Cube {
        let mut s = [[[0.0f32; 3]; 3]; 3];
        for (ds, layer) in s.iter_mut().enumerate() {
            for (dy, row) in layer.iter_mut().enumerate() {
                for (dx, v) in row.iter_mut().enumerate() {
                    *v = f(dx as f32 - 1.0, dy as f32 - 1.0, ds as f32 - 1.0);
                }
            }
        }
        Cube(s)
    }

    #[test]
    fn vertex_of_separable_paraboloid() {
        let cube = sample_cube(|x, y, s| {
            1.0 - (x - 0.3).powi(2) - 2.0 * (y + 0.2).powi(2) - 0.5 * (s - 0.1).powi(2)
        });
        let offset = cube.vertex_offset().unwrap();
        assert!((offset[0] - 0.3).abs() < 1e-4);
        assert!((offset[1] + 0.2).abs() < 1e-4);
        assert!((offset[2] - 0.1).abs() < 1e-4);
        assert!((cube.value_at(offset) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn ridge_has_non_positive_determinant() {
        // Elongated along y: curvature only across x.
        let cube = sample_cube(|x, _y, _s| -x * x);
        let (_tr, det) = cube.spatial_trace_det();
        assert!(det <= 0.0);
    }

    #[test]
    fn flat_cube_is_singular() {
        let cube = sample_cube(|_, _, _| 0.25);
        assert!(cube.vertex_offset().is_none());
    }
}
