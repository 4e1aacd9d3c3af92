//! Linear polarization
//!
//! Polarized intensity `P = sqrt(Q^2 + U^2)`, fractional polarization `P/I`
//! and electric vector position angle `chi = atan2(U, Q) / 2` from
//! co-registered Stokes I, Q and U maps.
//! Pixels below the intensity or polarization cutoffs are masked: their
//! values are set to NaN and they are skipped by ranges and vector fields.

use nalgebra::DMatrix;

use crate::{
    coordinates::{pixel_to_sky, PixelWindow},
    header::HeaderGeometry,
    normalization::data_range,
    Image,
};

#[derive(thiserror::Error, Debug)]
pub enum PolarizationError {
    #[error("Stokes maps shape mismatch: I {i:?}, Q {q:?}, U {u:?}")]
    ShapeMismatch {
        i: (usize, usize),
        q: (usize, usize),
        u: (usize, usize),
    },
    #[error("vector decimation stride must be at least 1")]
    Stride,
    #[error("vector scale must be positive, found {0}")]
    Scale(f64),
}
type Result<T> = std::result::Result<T, PolarizationError>;

/// Polarization maps
#[derive(Debug, Clone)]
pub struct PolarizationField {
    pub q: Image,
    pub u: Image,
    /// polarized intensity
    pub p: Image,
    /// fractional polarization
    pub fp: Image,
    /// electric vector position angle [rd]
    pub chi: Image,
    /// `true` where the pixel is masked
    pub mask: DMatrix<bool>,
}

/// Polarization vector at a sky location [mas]
///
/// `(u, v) = P * (-sin(chi), cos(chi))` are the screen components for an R.A. axis
/// increasing to the left, the position angle being counted from north through east.
/// In sky offsets the vector runs along `(-u, v)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stick {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}
impl Stick {
    /// End points of the headless stick centered on `(x, y)`
    ///
    /// The stick length is `P / scale` in units of `span`, usually the plot width [mas].
    pub fn segment(&self, scale: f64, span: f64) -> [(f64, f64); 2] {
        let f = 0.5 * span / scale;
        let (dx, dy) = (-self.u * f, self.v * f);
        [(self.x - dx, self.y - dy), (self.x + dx, self.y + dy)]
    }
}

/// Decimated polarization vectors
#[derive(Debug, Clone, Default)]
pub struct VectorField {
    pub sticks: Vec<Stick>,
    /// data units per stick length unit
    pub scale: f64,
}

/// Checks that the Stokes maps have the same shape
pub fn check_shapes(i: &Image, q: &Image, u: &Image) -> Result<()> {
    if i.shape() != q.shape() || i.shape() != u.shape() {
        return Err(PolarizationError::ShapeMismatch {
            i: i.shape(),
            q: q.shape(),
            u: u.shape(),
        });
    }
    Ok(())
}

/// Computes the polarization maps
///
/// A pixel is masked when `I < icut` or `P < pcut`, or when either is not a number.
/// The fractional polarization is NaN where `I = 0`.
pub fn compute(i: &Image, q: &Image, u: &Image, icut: f64, pcut: f64) -> Result<PolarizationField> {
    check_shapes(i, q, u)?;
    let mut p = q.zip_map(u, f64::hypot);
    let mut fp = p.zip_map(i, |p, i| if i == 0f64 { f64::NAN } else { p / i });
    let mask = i.zip_map(&p, |i, p| !(i >= icut && p >= pcut));
    let (mut q, mut u) = (q.clone(), u.clone());
    for map in [&mut q, &mut u, &mut p, &mut fp] {
        map.iter_mut()
            .zip(mask.iter())
            .filter(|(_, &masked)| masked)
            .for_each(|(x, _)| *x = f64::NAN);
    }
    let chi = u.zip_map(&q, |u, q| 0.5 * u.atan2(q));
    log::debug!(
        "{}/{} polarization pixels masked",
        mask.iter().filter(|&&m| m).count(),
        mask.len()
    );
    Ok(PolarizationField {
        q,
        u,
        p,
        fp,
        chi,
        mask,
    })
}

impl PolarizationField {
    pub fn shape(&self) -> (usize, usize) {
        self.p.shape()
    }
    /// Fractional polarization range over the unmasked pixels
    pub fn fp_range(&self) -> Option<(f64, f64)> {
        data_range(self.fp.iter())
    }
    /// Polarized intensity range over the unmasked pixels
    pub fn p_range(&self) -> Option<(f64, f64)> {
        data_range(self.p.iter())
    }
    /// Polarization vectors of every `inc`-th pixel along both axes
    ///
    /// `window` is the pixel window the maps were cut from; the vectors are located at
    /// the pixel cell centers. Masked pixels have no vector.
    pub fn vectors(
        &self,
        window: &PixelWindow,
        header: &HeaderGeometry,
        inc: usize,
        scale: f64,
    ) -> Result<VectorField> {
        if inc == 0 {
            return Err(PolarizationError::Stride);
        }
        if !(scale > 0f64 && scale.is_finite()) {
            return Err(PolarizationError::Scale(scale));
        }
        let (nrows, ncols) = self.shape();
        let sticks = (0..nrows)
            .step_by(inc)
            .flat_map(|row| (0..ncols).step_by(inc).map(move |col| (row, col)))
            .filter(|&(row, col)| !self.mask[(row, col)])
            .filter_map(|(row, col)| {
                let (p, chi) = (self.p[(row, col)], self.chi[(row, col)]);
                if !(p.is_finite() && chi.is_finite()) {
                    return None;
                }
                let (x, y) = pixel_to_sky(
                    (window.x_min + col as i64) as f64 + 0.5,
                    (window.y_min + row as i64) as f64 + 0.5,
                    header,
                );
                Some(Stick {
                    x,
                    y,
                    u: -p * chi.sin(),
                    v: p * chi.cos(),
                })
            })
            .collect();
        Ok(VectorField { sticks, scale })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::tests::header;

    fn planes(i: f64, q: f64, u: f64) -> (Image, Image, Image) {
        (
            Image::from_element(6, 6, i),
            Image::from_element(6, 6, q),
            Image::from_element(6, 6, u),
        )
    }

    #[test]
    fn polarized_intensity() -> anyhow::Result<()> {
        let (i, q, u) = planes(10., 3., 4.);
        let field = compute(&i, &q, &u, 0., 0.)?;
        assert!(field.mask.iter().all(|&m| !m));
        assert!(field.p.iter().all(|&p| p == 5.));
        assert!(field.fp.iter().all(|&fp| fp == 0.5));
        let chi = 0.5 * 4f64.atan2(3.);
        assert!(field.chi.iter().all(|&x| (x - chi).abs() < 1e-15));
        assert_eq!(field.fp_range(), Some((0.5, 0.5)));
        Ok(())
    }

    #[test]
    fn intensity_cut_masks_everything() -> anyhow::Result<()> {
        let (i, q, u) = planes(10., 3., 4.);
        let field = compute(&i, &q, &u, 20., 0.)?;
        assert!(field.mask.iter().all(|&m| m));
        for map in [&field.q, &field.u, &field.p, &field.fp, &field.chi] {
            assert!(map.iter().all(|x| x.is_nan()));
        }
        assert_eq!(field.fp_range(), None);
        let w = PixelWindow {
            x_min: 0,
            x_max: 6,
            y_min: 0,
            y_max: 6,
        };
        assert!(field.vectors(&w, &header(), 1, 30.)?.sticks.is_empty());
        Ok(())
    }

    #[test]
    fn polarization_cut() -> anyhow::Result<()> {
        let (i, mut q, u) = planes(10., 3., 4.);
        q[(2, 3)] = 30.;
        let field = compute(&i, &q, &u, 0., 6.)?;
        assert_eq!(field.mask.iter().filter(|&&m| !m).count(), 1);
        assert_eq!(field.p_range(), Some((30f64.hypot(4.), 30f64.hypot(4.))));
        Ok(())
    }

    #[test]
    fn zero_intensity() -> anyhow::Result<()> {
        let (i, q, u) = planes(0., 3., 4.);
        let field = compute(&i, &q, &u, 0., 0.)?;
        assert!(field.mask.iter().all(|&m| !m));
        assert!(field.fp.iter().all(|x| x.is_nan()));
        Ok(())
    }

    #[test]
    fn shape_mismatch() {
        let (i, q, _) = planes(10., 3., 4.);
        let u = Image::from_element(6, 5, 4.);
        assert!(matches!(
            compute(&i, &q, &u, 0., 0.),
            Err(PolarizationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn decimated_vectors() -> anyhow::Result<()> {
        // Q > 0 and U = 0: north-south vectors
        let (i, q, u) = planes(10., 2., 0.);
        let field = compute(&i, &q, &u, 0., 0.)?;
        let h = header();
        let w = PixelWindow {
            x_min: 250,
            x_max: 256,
            y_min: 250,
            y_max: 256,
        };
        let vf = field.vectors(&w, &h, 3, 0.05)?;
        assert_eq!(vf.sticks.len(), 4);
        let s = vf.sticks[0];
        assert_eq!((s.u, s.v), (-0., 2.));
        let (x, y) = pixel_to_sky(250.5, 250.5, &h);
        assert_eq!((s.x, s.y), (x, y));
        let [(x0, y0), (x1, y1)] = s.segment(0.05, 10.);
        assert_eq!(x0, x1);
        assert!((y1 - y0 - 400.).abs() < 1e-9);
        assert!(matches!(
            field.vectors(&w, &h, 0, 0.05),
            Err(PolarizationError::Stride)
        ));
        for scale in [0., -1., f64::NAN] {
            assert!(matches!(
                field.vectors(&w, &h, 3, scale),
                Err(PolarizationError::Scale(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn north_east_position_angle() -> anyhow::Result<()> {
        // Q = 0 and U > 0: chi = 45 deg
        let (i, q, u) = planes(10., 0., 1.);
        let field = compute(&i, &q, &u, 0., 0.)?;
        let w = PixelWindow {
            x_min: 250,
            x_max: 256,
            y_min: 250,
            y_max: 256,
        };
        let s = field.vectors(&w, &header(), 3, 1.)?.sticks[0];
        let [(x0, y0), (x1, y1)] = s.segment(1., 2.);
        // north end toward the east, i.e. larger R.A. offset
        assert!(y1 > y0);
        assert!(x1 > x0);
        assert!(((x1 - x0) - (y1 - y0)).abs() < 1e-12);
        Ok(())
    }
}
