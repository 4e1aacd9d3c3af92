//! False colour mapping
//!
//! [colorous] gradients sampled on 256 entries, optionally with the first
//! `ncut` entries removed to drop the darkest colours.

use std::str::FromStr;

use colorous::{Color, Gradient};
use strum_macros::{Display, EnumString};

use crate::{normalization::Normalization, Image};

/// Number of colormap entries
pub const N_COLOR: usize = 256;
/// Colour of masked or out-of-domain pixels
pub const BAD_COLOR: Color = Color {
    r: 255,
    g: 255,
    b: 255,
};

#[derive(thiserror::Error, Debug)]
pub enum ColormapError {
    #[error("unknown colormap {0:?}")]
    Unknown(String),
    #[error("cannot cut {0} entries out of a 256 colors map")]
    Cut(usize),
}
type Result<T> = std::result::Result<T, ColormapError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ColormapName {
    #[default]
    Rainbow,
    Viridis,
    Inferno,
    Magma,
    Plasma,
    Cividis,
    Turbo,
    Cubehelix,
    Warm,
    Cool,
    Greys,
    Spectral,
}
impl ColormapName {
    fn gradient(&self) -> Gradient {
        use ColormapName::*;
        match self {
            Rainbow => colorous::RAINBOW,
            Viridis => colorous::VIRIDIS,
            Inferno => colorous::INFERNO,
            Magma => colorous::MAGMA,
            Plasma => colorous::PLASMA,
            Cividis => colorous::CIVIDIS,
            Turbo => colorous::TURBO,
            Cubehelix => colorous::CUBEHELIX,
            Warm => colorous::WARM,
            Cool => colorous::COOL,
            Greys => colorous::GREYS,
            Spectral => colorous::SPECTRAL,
        }
    }
}

/// Colormap with the first `ncut` of 256 entries removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Colormap {
    name: ColormapName,
    ncut: usize,
}
impl Colormap {
    /// Selects a colormap by name, an empty name meaning the default one
    pub fn new(name: &str, ncut: usize) -> Result<Self> {
        let name = if name.trim().is_empty() {
            ColormapName::default()
        } else {
            ColormapName::from_str(name.trim())
                .map_err(|_| ColormapError::Unknown(name.to_string()))?
        };
        if ncut >= N_COLOR {
            return Err(ColormapError::Cut(ncut));
        }
        Ok(Self { name, ncut })
    }
    pub fn name(&self) -> ColormapName {
        self.name
    }
    /// Number of colors left after the cut
    pub fn len(&self) -> usize {
        N_COLOR - self.ncut
    }
    /// Colour of a normalized value in `[0, 1]`
    pub fn eval(&self, t: f64) -> Color {
        let n = self.len();
        let i = ((t.clamp(0f64, 1f64) * n as f64) as usize).min(n - 1);
        self.name
            .gradient()
            .eval_continuous((self.ncut + i) as f64 / N_COLOR as f64)
    }
    /// RGB8 raster of the normalized image
    ///
    /// The first raster line is the last image row, the declination increasing upward.
    pub fn rasterize(&self, image: &Image, norm: &Normalization) -> Vec<u8> {
        let (nrows, ncols) = image.shape();
        (0..nrows)
            .rev()
            .flat_map(|row| (0..ncols).map(move |col| (row, col)))
            .flat_map(|(row, col)| {
                let color = norm
                    .apply(image[(row, col)])
                    .map_or(BAD_COLOR, |t| self.eval(t));
                [color.r, color.g, color.b]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_name() -> anyhow::Result<()> {
        assert_eq!(Colormap::new("", 0)?.name(), ColormapName::Rainbow);
        assert_eq!(Colormap::new("viridis", 0)?.name(), ColormapName::Viridis);
        assert!(matches!(
            Colormap::new("jet", 0),
            Err(ColormapError::Unknown(_))
        ));
        assert!(matches!(
            Colormap::new("viridis", 256),
            Err(ColormapError::Cut(256))
        ));
        Ok(())
    }

    #[test]
    fn cut_colormap() -> anyhow::Result<()> {
        let cmap = Colormap::new("viridis", 64)?;
        assert_eq!(cmap.len(), 192);
        assert_eq!(
            cmap.eval(0.).as_tuple(),
            colorous::VIRIDIS.eval_continuous(0.25).as_tuple()
        );
        assert_eq!(
            cmap.eval(1.).as_tuple(),
            colorous::VIRIDIS.eval_continuous(255. / 256.).as_tuple()
        );
        Ok(())
    }

    #[test]
    fn raster_orientation() -> anyhow::Result<()> {
        let cmap = Colormap::new("greys", 0)?;
        let norm = Normalization::Linear { vmin: 0., vmax: 1. };
        let image = Image::from_row_slice(2, 2, &[0., f64::NAN, 1., 1.]);
        let rgb = cmap.rasterize(&image, &norm);
        assert_eq!(rgb.len(), 12);
        let top = cmap.eval(1.);
        assert_eq!(&rgb[..3], &[top.r, top.g, top.b]);
        assert_eq!(&rgb[9..], &[255, 255, 255]);
        Ok(())
    }
}
