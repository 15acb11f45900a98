/// Axis-aligned periodic simulation volume.
///
/// A plain `Copy` value: resizing the box means replacing it wholesale.
/// Invariant: hi > lo along every axis, asserted at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxDim {
    xlo: f64,
    xhi: f64,
    ylo: f64,
    yhi: f64,
    zlo: f64,
    zhi: f64,
}
impl BoxDim {
    // Creation

    /// Create a cube of side `l` centered at the origin
    pub fn cube(l: f64) -> Self {
        Self::new(l, l, l)
    }
    /// Create a box with the given side lengths, centered at the origin
    pub fn new(lx: f64, ly: f64, lz: f64) -> Self {
        Self::from_bounds(
            -lx / 2.0,
            lx / 2.0,
            -ly / 2.0,
            ly / 2.0,
            -lz / 2.0,
            lz / 2.0,
        )
    }
    /// Create a box from explicit per-axis bounds
    pub fn from_bounds(xlo: f64, xhi: f64, ylo: f64, yhi: f64, zlo: f64, zhi: f64) -> Self {
        assert!(
            xhi > xlo,
            "Upper x bound {} should be greater than lower x bound {}",
            xhi,
            xlo
        );
        assert!(
            yhi > ylo,
            "Upper y bound {} should be greater than lower y bound {}",
            yhi,
            ylo
        );
        assert!(
            zhi > zlo,
            "Upper z bound {} should be greater than lower z bound {}",
            zhi,
            zlo
        );
        Self {
            xlo,
            xhi,
            ylo,
            yhi,
            zlo,
            zhi,
        }
    }

    // Getters
    pub fn xlo(&self) -> f64 {
        self.xlo
    }
    pub fn xhi(&self) -> f64 {
        self.xhi
    }
    pub fn ylo(&self) -> f64 {
        self.ylo
    }
    pub fn yhi(&self) -> f64 {
        self.yhi
    }
    pub fn zlo(&self) -> f64 {
        self.zlo
    }
    pub fn zhi(&self) -> f64 {
        self.zhi
    }
    pub fn lx(&self) -> f64 {
        self.xhi - self.xlo
    }
    pub fn ly(&self) -> f64 {
        self.yhi - self.ylo
    }
    pub fn lz(&self) -> f64 {
        self.zhi - self.zlo
    }

    /// Apply the minimum-image convention to a displacement vector
    pub fn min_image(&self, dx: f64, dy: f64, dz: f64) -> (f64, f64, f64) {
        (
            dx - self.lx() * (dx / self.lx()).round(),
            dy - self.ly() * (dy / self.ly()).round(),
            dz - self.lz() * (dz / self.lz()).round(),
        )
    }
    /// Squared minimum-image distance between two points
    pub fn min_image_dist_sq(&self, a: &[f64; 3], b: &[f64; 3]) -> f64 {
        let (dx, dy, dz) = self.min_image(a[0] - b[0], a[1] - b[1], a[2] - b[2]);
        dx * dx + dy * dy + dz * dz
    }
    /// Wrap a point back into the box, assuming it left by less than one
    /// box length per axis. Wrapped coordinates land in [lo, hi).
    pub fn wrap(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let mut x = x;
        let mut y = y;
        let mut z = z;
        if x >= self.xhi {
            x -= self.lx();
        } else if x < self.xlo {
            x += self.lx();
        }
        if y >= self.yhi {
            y -= self.ly();
        } else if y < self.ylo {
            y += self.ly();
        }
        if z >= self.zhi {
            z -= self.lz();
        } else if z < self.zlo {
            z += self.lz();
        }
        (x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cube_is_centered() {
        let b = BoxDim::cube(10.0);
        assert_relative_eq!(b.xlo(), -5.0);
        assert_relative_eq!(b.xhi(), 5.0);
        assert_relative_eq!(b.ylo(), -5.0);
        assert_relative_eq!(b.yhi(), 5.0);
        assert_relative_eq!(b.zlo(), -5.0);
        assert_relative_eq!(b.zhi(), 5.0);
    }

    #[test]
    fn lengths_follow_bounds() {
        let b = BoxDim::new(10.0, 30.0, 50.0);
        assert_relative_eq!(b.lx(), 10.0);
        assert_relative_eq!(b.ly(), 30.0);
        assert_relative_eq!(b.lz(), 50.0);
        let b = BoxDim::from_bounds(0.0, 1.0, -2.0, 2.0, 1.0, 4.5);
        assert_relative_eq!(b.lx(), 1.0);
        assert_relative_eq!(b.ly(), 4.0);
        assert_relative_eq!(b.lz(), 3.5);
    }

    #[test]
    #[should_panic]
    fn inverted_bounds_panic() {
        BoxDim::from_bounds(1.0, -1.0, 0.0, 1.0, 0.0, 1.0);
    }

    #[test]
    fn min_image_picks_nearest_copy() {
        let b = BoxDim::cube(10.0);
        let (dx, dy, dz) = b.min_image(9.0, -9.0, 0.5);
        assert_relative_eq!(dx, -1.0);
        assert_relative_eq!(dy, 1.0);
        assert_relative_eq!(dz, 0.5);
        // particles hugging opposite faces are close under the convention
        let d2 = b.min_image_dist_sq(&[-4.9, 0.0, 0.0], &[4.9, 0.0, 0.0]);
        assert_relative_eq!(d2, 0.2 * 0.2, epsilon = 1e-12);
    }

    #[test]
    fn wrap_lands_in_half_open_range() {
        let b = BoxDim::cube(10.0);
        let (x, y, z) = b.wrap(5.3, -5.2, 5.0);
        assert_relative_eq!(x, -4.7);
        assert_relative_eq!(y, 4.8);
        // exactly hi is out of range and wraps to lo
        assert_relative_eq!(z, -5.0);
        let (x, _, _) = b.wrap(4.999, 0.0, 0.0);
        assert_relative_eq!(x, 4.999);
    }
}
