//! Contour levels

use std::ops::Deref;

use crate::{
    rms::{self, RmsError},
    Image,
};

/// Number of positive dyadic levels: `1, 2, 4, ..., 4096`
pub const N_OCTAVE: i32 = 13;
/// Noise multiple of the default lowest contour
pub const SIGMA_MULTIPLE: f64 = 3f64;

/// Contour levels, increasing
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSet(Vec<f64>);
impl Deref for LevelSet {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl LevelSet {
    /// `base * [-1, 1, 2, 4, ..., 2^(n_octave-1)]`
    pub fn with_octaves(base: f64, n_octave: i32) -> Self {
        Self(
            std::iter::once(-base)
                .chain((0..n_octave).map(|i| base * 2f64.powi(i)))
                .collect(),
        )
    }
    /// User supplied levels, sorted in increasing order
    pub fn from_levels(mut levels: Vec<f64>) -> Self {
        levels.retain(|x| x.is_finite());
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        Self(levels)
    }
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// Default contour levels `base * [-1, 1, 2, 4, ..., 4096]`
pub fn levels(base: f64) -> LevelSet {
    LevelSet::with_octaves(base, N_OCTAVE)
}

/// Lowest contour level: `cmul` if given, 3 times the map noise otherwise
pub fn base(image: &Image, cmul: Option<f64>) -> Result<f64, RmsError> {
    match cmul {
        Some(cmul) => Ok(cmul),
        None => {
            let cmul = SIGMA_MULTIPLE * rms::estimate(image)?;
            log::info!("Set cmul = {:.2} mJy/beam", cmul * 1e3);
            Ok(cmul)
        }
    }
}
