//! Map header
//!
//! The handful of FITS primary header fields consumed by the analysis.
//! Reading the FITS file itself is left to the caller, who either
//! deserializes a [`HeaderGeometry`] or hands over the header cards.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    coordinates::{GeometryError, SkyWindow},
    DEG_TO_MAS,
};

#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("missing header keyword {0:?}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for header keyword {key:?}")]
    Invalid { key: &'static str, value: String },
}
type Result<T> = std::result::Result<T, HeaderError>;

/// Map geometry and metadata
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HeaderGeometry {
    #[serde(alias = "NAXIS1")]
    pub naxis1: usize,
    #[serde(alias = "NAXIS2")]
    pub naxis2: usize,
    #[serde(alias = "CRPIX1")]
    pub crpix1: f64,
    #[serde(alias = "CRPIX2")]
    pub crpix2: f64,
    /// R.A. pixel scale [deg]
    #[serde(alias = "CDELT1")]
    pub cdelt1: f64,
    /// Dec. pixel scale [deg]
    #[serde(alias = "CDELT2")]
    pub cdelt2: f64,
    /// restoring beam major axis [deg]
    #[serde(alias = "BMAJ")]
    pub bmaj: f64,
    /// restoring beam minor axis [deg]
    #[serde(alias = "BMIN")]
    pub bmin: f64,
    /// restoring beam position angle [deg]
    #[serde(alias = "BPA")]
    pub bpa: f64,
    #[serde(default, alias = "OBJECT")]
    pub object: Option<String>,
    #[serde(default, alias = "TELESCOP")]
    pub telescop: Option<String>,
    /// observing frequency [Hz]
    #[serde(default, alias = "CRVAL3")]
    pub crval3: Option<f64>,
    #[serde(default, rename = "date-obs", alias = "DATE-OBS", alias = "date_obs")]
    pub date_obs: Option<String>,
}

fn strip_quotes(value: &str) -> String {
    value.trim().trim_matches('\'').trim().to_string()
}

struct Cards(HashMap<String, String>);
impl Cards {
    fn text(&self, key: &'static str) -> Option<String> {
        self.0.get(key).map(|value| strip_quotes(value))
    }
    fn number<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>> {
        self.text(key)
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|_| HeaderError::Invalid { key, value })
            })
            .transpose()
    }
    fn required<T: std::str::FromStr>(&self, key: &'static str) -> Result<T> {
        self.number(key)?.ok_or(HeaderError::Missing(key))
    }
}

impl HeaderGeometry {
    /// Builds the header from `(keyword, value)` cards
    ///
    /// Keywords are matched case-insensitively; string values may keep their FITS quotes.
    pub fn from_cards<I, K, V>(cards: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let cards = Cards(
            cards
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.as_ref().to_string()))
                .collect(),
        );
        Ok(Self {
            naxis1: cards.required("naxis1")?,
            naxis2: cards.required("naxis2")?,
            crpix1: cards.required("crpix1")?,
            crpix2: cards.required("crpix2")?,
            cdelt1: cards.required("cdelt1")?,
            cdelt2: cards.required("cdelt2")?,
            bmaj: cards.required("bmaj")?,
            bmin: cards.required("bmin")?,
            bpa: cards.required("bpa")?,
            object: cards.text("object"),
            telescop: cards.text("telescop"),
            crval3: cards.number("crval3")?,
            date_obs: cards.text("date-obs"),
        })
    }
    /// Checks the image extent and pixel scales
    pub fn validate(&self) -> std::result::Result<(), GeometryError> {
        if self.naxis1 == 0 || self.naxis2 == 0 {
            return Err(GeometryError::Dimensions(self.naxis1, self.naxis2));
        }
        if self.cdelt1 == 0f64 || self.cdelt2 == 0f64 || !(self.cdelt1 * self.cdelt2).is_finite() {
            return Err(GeometryError::PixelScale(self.cdelt1, self.cdelt2));
        }
        Ok(())
    }
    /// Returns the (R.A., Dec.) pixel scales [mas/pixel]
    pub fn scale_mas(&self) -> (f64, f64) {
        (self.cdelt1 * DEG_TO_MAS, self.cdelt2 * DEG_TO_MAS)
    }
}

/// Restoring beam ellipse, in mas, ready for drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub width: f64,
    pub height: f64,
    /// ellipse rotation counter-clockwise from the x axis [deg]
    pub angle: f64,
}
impl Beam {
    pub fn from_header(header: &HeaderGeometry) -> Self {
        Self {
            width: header.bmaj * DEG_TO_MAS,
            height: header.bmin * DEG_TO_MAS,
            angle: 90f64 - header.bpa,
        }
    }
    /// Default beam center: `pad` major axes inside the bottom-left corner of the window
    pub fn default_position(&self, window: &SkyWindow, pad: f64) -> (f64, f64) {
        (window.x0 - pad * self.width, window.y0 + pad * self.width)
    }
}

/// Default map caption
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Caption {
    pub object: Option<String>,
    /// `"{telescope}/{frequency} GHz"`
    pub band: Option<String>,
    pub date: Option<String>,
}
impl Caption {
    pub fn from_header(header: &HeaderGeometry) -> Self {
        let band = match (&header.telescop, header.crval3) {
            (Some(telescope), Some(freq)) => Some(format!("{}/{:.1} GHz", telescope, freq * 1e-9)),
            (Some(telescope), None) => Some(telescope.clone()),
            (None, Some(freq)) => Some(format!("{:.1} GHz", freq * 1e-9)),
            (None, None) => None,
        };
        Self {
            object: header.object.clone(),
            band,
            date: header.date_obs.clone(),
        }
    }
}
