/*!
# VLBI maps

Analysis of 2-D radio-interferometric brightness maps ahead of rendering.

## Key Components

- [`HeaderGeometry`] - the few FITS header fields the analysis consumes
- [`coordinates`] - pixel to sky (mas) transforms and viewing windows
- [`rms`] - one-sided noise estimate
- [`detection`] - connected-component source detection
- [`framing`] - square padded viewing window around a detection
- [`contour`] - dyadic contour levels
- [`normalization`] - intensity scaling from a textual specification
- [`colormap`] - false colour rasterization
- [`polarization`] - polarized intensity, fractional polarization and EVPA sticks
- [`annotation`] - annotation file line protocol
- [`analysis`] - the contour/false colour and polarization map pipelines

## Usage

```rust,no_run
use vlbi_maps::{ContourMap, HeaderGeometry, Image, MapConfig};

# fn run(image: Image, header: HeaderGeometry) -> Result<(), vlbi_maps::Error> {
let config = MapConfig::default().norm("power 0.5");
let layout = ContourMap::analyse(&image, &header, &config)?;
println!("window: {}", layout.sky_window);
# Ok(())
# }
```
*/

/// Degree to milli-arcsecond conversion factor
pub const DEG_TO_MAS: f64 = 3.6e6;

/// Brightness map, indexed (row, column) = (declination, right ascension)
pub type Image = nalgebra::DMatrix<f64>;

pub mod analysis;
pub mod annotation;
pub mod colormap;
pub mod contour;
pub mod coordinates;
pub mod detection;
mod error;
pub mod framing;
pub mod header;
pub mod normalization;
pub mod polarization;
pub mod rms;

pub use analysis::{
    ContourMap, MapConfig, MapLayout, PolarizationConfig, PolarizationLayout, PolarizationMap,
    WindowMode,
};
pub use annotation::{Annotation, Annotations};
pub use colormap::Colormap;
pub use contour::LevelSet;
pub use coordinates::{PixelWindow, SkyWindow};
pub use detection::{BoundingBox, Region};
pub use error::Error;
pub use header::{Beam, Caption, HeaderGeometry};
pub use normalization::Normalization;
pub use polarization::{PolarizationField, Stick, VectorField};
