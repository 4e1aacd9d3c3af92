//! Pixel and sky coordinates
//!
//! Linear tangent-plane mapping between array indices and angular offsets
//! (mas) from the reference pixel: `pixel = crpix + sky / (cdelt * 3.6e6)`.
//! There is no rotation term.

use std::fmt;

use serde::Deserialize;

use crate::{header::HeaderGeometry, Image, DEG_TO_MAS};

#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    #[error("non-positive image dimensions: {0}x{1}")]
    Dimensions(usize, usize),
    #[error("invalid pixel scale: ({0},{1}) deg")]
    PixelScale(f64, f64),
    #[error("{nrows}x{ncols} image does not match the header {naxis1}x{naxis2} extent")]
    ImageShape {
        nrows: usize,
        ncols: usize,
        naxis1: usize,
        naxis2: usize,
    },
    #[error("empty or inverted window {0}")]
    EmptyWindow(PixelWindow),
    #[error("window {window} does not fit within a {ncols}x{nrows} image")]
    OutOfBounds {
        window: PixelWindow,
        ncols: usize,
        nrows: usize,
    },
}
type Result<T> = std::result::Result<T, GeometryError>;

/// Window in array index space, `[x_min, x_max) x [y_min, y_max)`
///
/// `x` runs along the columns (R.A.) and `y` along the rows (Dec.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}
impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}
impl PixelWindow {
    /// The whole image `[0, naxis1) x [0, naxis2)`
    pub fn full_frame(header: &HeaderGeometry) -> Self {
        Self {
            x_min: 0,
            x_max: header.naxis1 as i64,
            y_min: 0,
            y_max: header.naxis2 as i64,
        }
    }
    pub fn width(&self) -> i64 {
        self.x_max - self.x_min
    }
    pub fn height(&self) -> i64 {
        self.y_max - self.y_min
    }
    /// Checks `0 <= min < max <= naxis` on both axes
    pub fn is_within(&self, naxis1: usize, naxis2: usize) -> bool {
        0 <= self.x_min
            && self.x_min < self.x_max
            && self.x_max <= naxis1 as i64
            && 0 <= self.y_min
            && self.y_min < self.y_max
            && self.y_max <= naxis2 as i64
    }
    /// Clips the window to the image extent
    pub fn clamp(&self, header: &HeaderGeometry) -> Result<Self> {
        header.validate()?;
        let clamped = Self {
            x_min: self.x_min.clamp(0, header.naxis1 as i64),
            x_max: self.x_max.clamp(0, header.naxis1 as i64),
            y_min: self.y_min.clamp(0, header.naxis2 as i64),
            y_max: self.y_max.clamp(0, header.naxis2 as i64),
        };
        if clamped.width() <= 0 || clamped.height() <= 0 {
            return Err(GeometryError::EmptyWindow(*self));
        }
        if clamped != *self {
            log::warn!("window {} clamped to {}", self, clamped);
        }
        Ok(clamped)
    }
}

/// Window in sky coordinates relative to the reference pixel [mas]
///
/// With a negative R.A. pixel scale `x0 > x1`, the R.A. axis decreasing from left to right.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SkyWindow {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}
impl fmt::Display for SkyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} {:.1} {:.1} {:.1}",
            self.x0, self.x1, self.y0, self.y1
        )
    }
}
impl From<[f64; 4]> for SkyWindow {
    fn from([x0, x1, y0, y1]: [f64; 4]) -> Self {
        Self { x0, x1, y0, y1 }
    }
}
impl SkyWindow {
    /// Sky extent of the whole image
    pub fn full_frame(header: &HeaderGeometry) -> Self {
        to_sky(&PixelWindow::full_frame(header), header)
    }
    /// Absolute R.A. extent [mas]
    pub fn span(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }
}

/// Sky window to pixel window
///
/// Pixel bounds are truncated toward zero, not rounded.
pub fn to_pixel(window: &SkyWindow, header: &HeaderGeometry) -> PixelWindow {
    let (s1, s2) = header.scale_mas();
    PixelWindow {
        x_min: (header.crpix1 + window.x0 / s1) as i64,
        x_max: (header.crpix1 + window.x1 / s1) as i64,
        y_min: (header.crpix2 + window.y0 / s2) as i64,
        y_max: (header.crpix2 + window.y1 / s2) as i64,
    }
}

/// Pixel window to sky window
pub fn to_sky(window: &PixelWindow, header: &HeaderGeometry) -> SkyWindow {
    let (x0, y0) = pixel_to_sky(window.x_min as f64, window.y_min as f64, header);
    let (x1, y1) = pixel_to_sky(window.x_max as f64, window.y_max as f64, header);
    SkyWindow { x0, x1, y0, y1 }
}

/// Sky offset [mas] of the (column, row) pixel position
pub fn pixel_to_sky(x: f64, y: f64, header: &HeaderGeometry) -> (f64, f64) {
    (
        header.cdelt1 * DEG_TO_MAS * (x - header.crpix1),
        header.cdelt2 * DEG_TO_MAS * (y - header.crpix2),
    )
}

/// Checks that the image has `naxis2` rows and `naxis1` columns
pub fn check_shape(image: &Image, header: &HeaderGeometry) -> Result<()> {
    let (nrows, ncols) = image.shape();
    if (nrows, ncols) != (header.naxis2, header.naxis1) {
        return Err(GeometryError::ImageShape {
            nrows,
            ncols,
            naxis1: header.naxis1,
            naxis2: header.naxis2,
        });
    }
    Ok(())
}

/// Copies the windowed part of the image
pub fn crop(image: &Image, window: &PixelWindow) -> Result<Image> {
    let (nrows, ncols) = image.shape();
    if !window.is_within(ncols, nrows) {
        return Err(GeometryError::OutOfBounds {
            window: *window,
            ncols,
            nrows,
        });
    }
    Ok(image
        .view(
            (window.y_min as usize, window.x_min as usize),
            (window.height() as usize, window.width() as usize),
        )
        .into_owned())
}
