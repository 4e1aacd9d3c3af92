//! Map pipelines
//!
//! [ContourMap] gathers everything a contour and false colour plot of a
//! brightness map needs: contour levels, viewing window, intensity
//! normalization, colormap, beam and caption.
//! [PolarizationMap] does the same for the fractional polarization of a
//! Stokes I, Q, U triplet, adding the decimated polarization vectors.
//!
//! Both pipelines are driven by explicit configurations that can be
//! deserialized:
//! ```
//! use vlbi_maps::{MapConfig, WindowMode};
//!
//! let config: MapConfig = serde_json::from_str(
//!     r#"{"norm": "power 0.5", "window": {"sky": {"x0": 10, "x1": -10, "y0": -10, "y1": 10}}}"#,
//! )
//! .unwrap();
//! assert!(matches!(config.window, WindowMode::Sky(_)));
//! ```

use serde::Deserialize;

use crate::{
    annotation::Annotations,
    colormap::Colormap,
    contour::{self, LevelSet},
    coordinates::{check_shape, crop, to_pixel, to_sky, PixelWindow, SkyWindow},
    detection::{self, Region, MIN_AREA},
    framing::{self, PAD_FRACTION},
    header::{Beam, Caption, HeaderGeometry},
    normalization::{data_range, Normalization},
    polarization::{self, PolarizationField, VectorField},
    Error, Image,
};

type Result<T> = std::result::Result<T, Error>;

/// Viewing window selection
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// square padded window around the emission detected above the lowest contour
    #[default]
    Detect,
    /// the whole image
    FullFrame,
    /// user window [mas]
    Sky(SkyWindow),
}

/// Contour and false colour map configuration
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// lowest contour level, 3 times the map noise if `None`
    pub cmul: Option<f64>,
    /// contour levels, `cmul * [-1, 1, 2, ..., 4096]` if `None`
    pub levels: Option<Vec<f64>>,
    pub window: WindowMode,
    /// fractional margin of detected windows
    pub pad: f64,
    /// minimum area [pixel] of a significant emission component
    pub min_area: usize,
    /// normalization specification, e.g. `"power 0.5"`
    pub norm: String,
    pub colormap: String,
    /// number of colormap entries removed from the low end
    pub ncut: usize,
    /// beam center [mas]
    pub beam_position: Option<(f64, f64)>,
    /// beam offset from the window corner in beam major axes
    pub beam_pad: f64,
    #[serde(skip)]
    pub annotations: Annotations,
}
impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cmul: None,
            levels: None,
            window: WindowMode::Detect,
            pad: PAD_FRACTION,
            min_area: MIN_AREA,
            norm: String::new(),
            colormap: "rainbow".to_string(),
            ncut: 0,
            beam_position: None,
            beam_pad: 1.5,
            annotations: Annotations::default(),
        }
    }
}
impl MapConfig {
    pub fn cmul(self, cmul: f64) -> Self {
        Self {
            cmul: Some(cmul),
            ..self
        }
    }
    pub fn levels(self, levels: Vec<f64>) -> Self {
        Self {
            levels: Some(levels),
            ..self
        }
    }
    pub fn window(self, window: WindowMode) -> Self {
        Self { window, ..self }
    }
    /// Sets a sky window `[x0, x1, y0, y1]` [mas]
    pub fn sky_window(self, window: [f64; 4]) -> Self {
        Self {
            window: WindowMode::Sky(window.into()),
            ..self
        }
    }
    pub fn pad(self, pad: f64) -> Self {
        Self { pad, ..self }
    }
    pub fn min_area(self, min_area: usize) -> Self {
        Self { min_area, ..self }
    }
    pub fn norm<S: Into<String>>(self, norm: S) -> Self {
        Self {
            norm: norm.into(),
            ..self
        }
    }
    pub fn colormap<S: Into<String>>(self, name: S, ncut: usize) -> Self {
        Self {
            colormap: name.into(),
            ncut,
            ..self
        }
    }
    pub fn beam_position(self, x: f64, y: f64) -> Self {
        Self {
            beam_position: Some((x, y)),
            ..self
        }
    }
    pub fn annotations(self, annotations: Annotations) -> Self {
        Self {
            annotations,
            ..self
        }
    }
}

/// Polarization map configuration
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PolarizationConfig {
    /// lowest Stokes I contour level, 3 times the I map noise if `None`
    pub cmul: Option<f64>,
    pub levels: Option<Vec<f64>>,
    pub window: WindowMode,
    pub pad: f64,
    pub min_area: usize,
    /// fractional polarization normalization specification
    pub norm: String,
    pub colormap: String,
    pub ncut: usize,
    pub beam_position: Option<(f64, f64)>,
    pub beam_pad: f64,
    /// Stokes I cutoff
    pub icut: f64,
    /// polarized intensity cutoff
    pub pcut: f64,
    /// vector decimation stride [pixel]
    pub inc: usize,
    /// data units per vector length unit
    pub scale: f64,
    #[serde(skip)]
    pub annotations: Annotations,
}
impl Default for PolarizationConfig {
    fn default() -> Self {
        Self {
            cmul: None,
            levels: None,
            window: WindowMode::FullFrame,
            pad: PAD_FRACTION,
            min_area: MIN_AREA,
            norm: String::new(),
            colormap: "rainbow".to_string(),
            ncut: 0,
            beam_position: None,
            beam_pad: 2.,
            icut: 0.,
            pcut: 0.,
            inc: 3,
            scale: 30.,
            annotations: Annotations::default(),
        }
    }
}
impl PolarizationConfig {
    pub fn cmul(self, cmul: f64) -> Self {
        Self {
            cmul: Some(cmul),
            ..self
        }
    }
    pub fn window(self, window: WindowMode) -> Self {
        Self { window, ..self }
    }
    pub fn norm<S: Into<String>>(self, norm: S) -> Self {
        Self {
            norm: norm.into(),
            ..self
        }
    }
    pub fn colormap<S: Into<String>>(self, name: S, ncut: usize) -> Self {
        Self {
            colormap: name.into(),
            ncut,
            ..self
        }
    }
    /// Sets the Stokes I and polarized intensity cutoffs
    pub fn cutoffs(self, icut: f64, pcut: f64) -> Self {
        Self { icut, pcut, ..self }
    }
    pub fn vectors(self, inc: usize, scale: f64) -> Self {
        Self { inc, scale, ..self }
    }
    pub fn beam_position(self, x: f64, y: f64) -> Self {
        Self {
            beam_position: Some((x, y)),
            ..self
        }
    }
    pub fn annotations(self, annotations: Annotations) -> Self {
        Self {
            annotations,
            ..self
        }
    }
}

struct Window {
    pixel: PixelWindow,
    sky: SkyWindow,
    region: Option<Region>,
}

fn resolve_window(
    image: &Image,
    header: &HeaderGeometry,
    mode: &WindowMode,
    threshold: f64,
    pad: f64,
    min_area: usize,
) -> Result<Window> {
    match mode {
        WindowMode::Detect => {
            let region = detection::detect(image, threshold, min_area)?;
            let pixel = framing::frame(&region.bbox, pad)?.clamp(header)?;
            let sky = to_sky(&pixel, header);
            log::info!("Set win = {}", sky);
            Ok(Window {
                pixel,
                sky,
                region: Some(region),
            })
        }
        WindowMode::FullFrame => Ok(Window {
            pixel: PixelWindow::full_frame(header),
            sky: SkyWindow::full_frame(header),
            region: None,
        }),
        WindowMode::Sky(sky) => {
            let requested = to_pixel(sky, header);
            let pixel = requested.clamp(header)?;
            let sky = if pixel == requested {
                *sky
            } else {
                to_sky(&pixel, header)
            };
            Ok(Window {
                pixel,
                sky,
                region: None,
            })
        }
    }
}

fn contour_levels(base: f64, levels: Option<&[f64]>) -> LevelSet {
    match levels {
        Some(levels) => LevelSet::from_levels(levels.to_vec()),
        None => contour::levels(base),
    }
}

fn value_range<'a, I>(data: I) -> (f64, f64)
where
    I: IntoIterator<Item = &'a f64>,
{
    data_range(data).unwrap_or_else(|| {
        log::warn!("no finite value in the window, normalizing over [0, 1]");
        (0f64, 1f64)
    })
}

/// Contour and false colour map layout
#[derive(Debug, Clone)]
pub struct MapLayout {
    /// lowest contour level
    pub cmul: f64,
    pub levels: LevelSet,
    pub pixel_window: PixelWindow,
    pub sky_window: SkyWindow,
    /// emission region when the window was detected
    pub region: Option<Region>,
    /// windowed image
    pub image: Image,
    pub norm: Normalization,
    pub colormap: Colormap,
    pub beam: Beam,
    /// beam center [mas]
    pub beam_position: (f64, f64),
    /// default caption, only when there is no annotation
    pub caption: Option<Caption>,
    pub annotations: Annotations,
}
impl MapLayout {
    /// RGB8 false colour raster of the windowed image
    pub fn rgb(&self) -> Vec<u8> {
        self.colormap.rasterize(&self.image, &self.norm)
    }
    /// Sky extent of the windowed image [mas]
    pub fn extent(&self) -> [f64; 4] {
        let SkyWindow { x0, x1, y0, y1 } = self.sky_window;
        [x0, x1, y0, y1]
    }
}

/// Contour and false colour map pipeline
pub struct ContourMap;
impl ContourMap {
    pub fn analyse(image: &Image, header: &HeaderGeometry, config: &MapConfig) -> Result<MapLayout> {
        header.validate()?;
        check_shape(image, header)?;
        let cmul = contour::base(image, config.cmul)?;
        let levels = contour_levels(cmul, config.levels.as_deref());
        let Window { pixel, sky, region } = resolve_window(
            image,
            header,
            &config.window,
            cmul,
            config.pad,
            config.min_area,
        )?;
        let image = crop(image, &pixel)?;
        let (vmin, vmax) = value_range(image.iter());
        let norm = Normalization::parse(&config.norm, vmin, vmax)?;
        let colormap = Colormap::new(&config.colormap, config.ncut)?;
        let beam = Beam::from_header(header);
        let beam_position = config
            .beam_position
            .unwrap_or_else(|| beam.default_position(&sky, config.beam_pad));
        let caption = config
            .annotations
            .is_empty()
            .then(|| Caption::from_header(header));
        log::info!(
            "{} map: {} window, {} normalization over [{:.3e}, {:.3e}]",
            header.object.as_deref().unwrap_or("unnamed"),
            pixel,
            norm.kind(),
            vmin,
            vmax
        );
        Ok(MapLayout {
            cmul,
            levels,
            pixel_window: pixel,
            sky_window: sky,
            region,
            image,
            norm,
            colormap,
            beam,
            beam_position,
            caption,
            annotations: config.annotations.clone(),
        })
    }
}

/// Polarization map layout
#[derive(Debug, Clone)]
pub struct PolarizationLayout {
    /// lowest Stokes I contour level
    pub cmul: f64,
    pub levels: LevelSet,
    pub pixel_window: PixelWindow,
    pub sky_window: SkyWindow,
    /// windowed Stokes I
    pub intensity: Image,
    /// windowed polarization maps
    pub field: PolarizationField,
    pub vectors: VectorField,
    /// fractional polarization normalization
    pub norm: Normalization,
    pub colormap: Colormap,
    pub beam: Beam,
    pub beam_position: (f64, f64),
    pub annotations: Annotations,
}
impl PolarizationLayout {
    /// RGB8 false colour raster of the fractional polarization
    pub fn rgb(&self) -> Vec<u8> {
        self.colormap.rasterize(&self.field.fp, &self.norm)
    }
    /// End points of the polarization sticks [mas]
    pub fn segments(&self) -> Vec<[(f64, f64); 2]> {
        let span = self.sky_window.span();
        self.vectors
            .sticks
            .iter()
            .map(|stick| stick.segment(self.vectors.scale, span))
            .collect()
    }
}

/// Polarization map pipeline
pub struct PolarizationMap;
impl PolarizationMap {
    pub fn analyse(
        i: &Image,
        q: &Image,
        u: &Image,
        header: &HeaderGeometry,
        config: &PolarizationConfig,
    ) -> Result<PolarizationLayout> {
        header.validate()?;
        polarization::check_shapes(i, q, u)?;
        check_shape(i, header)?;
        let cmul = contour::base(i, config.cmul)?;
        let levels = contour_levels(cmul, config.levels.as_deref());
        let Window { pixel, sky, .. } = resolve_window(
            i,
            header,
            &config.window,
            cmul,
            config.pad,
            config.min_area,
        )?;
        let [i, q, u] = [i, q, u].map(|map| crop(map, &pixel));
        let intensity = i?;
        let field = polarization::compute(&intensity, &q?, &u?, config.icut, config.pcut)?;
        let (vmin, vmax) = value_range(field.fp.iter());
        let norm = Normalization::parse(&config.norm, vmin, vmax)?;
        let colormap = Colormap::new(&config.colormap, config.ncut)?;
        let vectors = field.vectors(&pixel, header, config.inc, config.scale)?;
        log::info!(
            "{} polarization vectors in window {}",
            vectors.sticks.len(),
            pixel
        );
        let beam = Beam::from_header(header);
        let beam_position = config
            .beam_position
            .unwrap_or_else(|| beam.default_position(&sky, config.beam_pad));
        Ok(PolarizationLayout {
            cmul,
            levels,
            pixel_window: pixel,
            sky_window: sky,
            intensity,
            field,
            vectors,
            norm,
            colormap,
            beam,
            beam_position,
            annotations: config.annotations.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coordinates::GeometryError, detection::DetectionError, header::tests::header,
        normalization::Kind, polarization::PolarizationError, rms::tests::gaussian_noise,
        Annotation,
    };

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn source() -> Image {
        let mut image = Image::zeros(512, 512);
        image
            .view_mut((240, 250), (30, 30))
            .iter_mut()
            .for_each(|x| *x = 1.);
        image
    }

    #[test]
    fn detected_window() -> anyhow::Result<()> {
        init();
        let h = header();
        let layout = ContourMap::analyse(&source(), &h, &MapConfig::default().cmul(0.5))?;
        assert_eq!(layout.cmul, 0.5);
        assert_eq!(layout.levels.len(), 14);
        assert_eq!(layout.levels[0], -0.5);
        assert_eq!(layout.levels[13], 0.5 * 4096.);
        let w = layout.pixel_window;
        // 30 pixels box framed with a 0.15 margin
        assert_eq!((w.x_min, w.x_max, w.y_min, w.y_max), (243, 286, 233, 276));
        assert_eq!(layout.image.shape(), (43, 43));
        assert_eq!(layout.sky_window, to_sky(&w, &h));
        assert_eq!(layout.region.as_ref().map(|r| r.components.len()), Some(1));
        assert_eq!(layout.norm, Normalization::Linear { vmin: 0., vmax: 1. });
        assert_eq!(
            layout.beam_position,
            layout.beam.default_position(&layout.sky_window, 1.5)
        );
        assert_eq!(
            layout.caption.as_ref().and_then(|c| c.object.as_deref()),
            Some("CTA102")
        );
        assert_eq!(layout.rgb().len(), 43 * 43 * 3);
        Ok(())
    }

    #[test]
    fn no_source() {
        let h = header();
        let err = ContourMap::analyse(&Image::zeros(512, 512), &h, &MapConfig::default().cmul(0.5))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Detection(DetectionError::NoSourceDetected(_))
        ));
    }

    #[test]
    fn sky_window() -> anyhow::Result<()> {
        let h = header();
        let config = MapConfig::default()
            .cmul(0.5)
            .sky_window([5., -5., -5., 5.])
            .norm("power")
            .beam_position(4., -4.);
        let layout = ContourMap::analyse(&source(), &h, &config)?;
        let w = layout.pixel_window;
        assert_eq!(layout.sky_window, SkyWindow::from([5., -5., -5., 5.]));
        assert_eq!(
            layout.image.shape(),
            (w.height() as usize, w.width() as usize)
        );
        assert!(layout.region.is_none());
        assert_eq!(layout.norm.kind(), Kind::Power);
        assert_eq!(layout.beam_position, (4., -4.));
        Ok(())
    }

    #[test]
    fn sky_window_clamped() -> anyhow::Result<()> {
        let h = header();
        let config = MapConfig::default().cmul(0.5).sky_window([30., -5., -5., 5.]);
        let layout = ContourMap::analyse(&source(), &h, &config)?;
        assert_eq!(layout.pixel_window.x_min, 0);
        assert!((layout.sky_window.x0 - 25.7).abs() < 1e-6);
        let outside = MapConfig::default().cmul(0.5).sky_window([60., 40., -5., 5.]);
        assert!(matches!(
            ContourMap::analyse(&source(), &h, &outside),
            Err(Error::Geometry(GeometryError::EmptyWindow(_)))
        ));
        Ok(())
    }

    #[test]
    fn full_frame_noise() -> anyhow::Result<()> {
        init();
        let h = header();
        let image = gaussian_noise(512, 512, 1e-3, 7);
        let config = MapConfig::default()
            .window(WindowMode::FullFrame)
            .levels(vec![4e-3, -3e-3, 1e-2])
            .colormap("viridis", 32)
            .annotations(vec![Annotation::Text {
                x: 0.,
                y: 0.,
                label: "core".into(),
            }]
            .into());
        let layout = ContourMap::analyse(&image, &h, &config)?;
        assert!(
            (layout.cmul / (3e-3 * std::f64::consts::SQRT_2) - 1.).abs() < 0.1,
            "{}",
            layout.cmul
        );
        assert_eq!(&layout.levels[..], &[-3e-3, 4e-3, 1e-2]);
        assert_eq!(layout.image.shape(), (512, 512));
        assert_eq!(layout.colormap.len(), 224);
        assert!(layout.caption.is_none());
        assert_eq!(layout.annotations.len(), 1);
        Ok(())
    }

    #[test]
    fn image_shape_mismatch() {
        let h = header();
        assert!(matches!(
            ContourMap::analyse(&Image::zeros(256, 512), &h, &MapConfig::default()),
            Err(Error::Geometry(GeometryError::ImageShape { .. }))
        ));
    }

    fn stokes() -> (HeaderGeometry, Image, Image, Image) {
        let h = HeaderGeometry {
            naxis1: 64,
            naxis2: 64,
            crpix1: 33.,
            crpix2: 33.,
            ..header()
        };
        let mut i = Image::zeros(64, 64);
        i.view_mut((20, 20), (20, 20))
            .iter_mut()
            .for_each(|x| *x = 1.);
        let q = &i * 0.1;
        let u = Image::zeros(64, 64);
        (h, i, q, u)
    }

    #[test]
    fn polarization_map() -> anyhow::Result<()> {
        init();
        let (h, i, q, u) = stokes();
        let config = PolarizationConfig::default()
            .cmul(0.05)
            .cutoffs(0.5, 0.)
            .norm("linear 0 0.2");
        let layout = PolarizationMap::analyse(&i, &q, &u, &h, &config)?;
        assert_eq!(layout.pixel_window, PixelWindow::full_frame(&h));
        assert_eq!(layout.field.fp_range(), Some((0.1, 0.1)));
        assert_eq!(layout.norm, Normalization::Linear { vmin: 0., vmax: 0.2 });
        // rows and columns 21, 24, ..., 39
        assert_eq!(layout.vectors.sticks.len(), 49);
        assert!(layout
            .vectors
            .sticks
            .iter()
            .all(|s| s.u == 0. && (s.v - 0.1).abs() < 1e-12));
        assert_eq!(layout.segments().len(), 49);
        assert_eq!(
            layout.beam_position,
            layout.beam.default_position(&layout.sky_window, 2.)
        );
        assert_eq!(layout.rgb().len(), 64 * 64 * 3);
        Ok(())
    }

    #[test]
    fn polarization_detected_window() -> anyhow::Result<()> {
        let (h, i, q, u) = stokes();
        let config = PolarizationConfig {
            min_area: 100,
            ..PolarizationConfig::default()
        }
        .cmul(0.5)
        .window(WindowMode::Detect);
        let layout = PolarizationMap::analyse(&i, &q, &u, &h, &config)?;
        let w = layout.pixel_window;
        assert_eq!(layout.intensity.shape(), layout.field.shape());
        assert_eq!(
            layout.field.shape(),
            (w.height() as usize, w.width() as usize)
        );
        assert!(w.x_min <= 20 && w.x_max >= 40);
        Ok(())
    }

    #[test]
    fn zero_vector_scale() {
        let (h, i, q, u) = stokes();
        let config = PolarizationConfig::default().cmul(0.05).vectors(3, 0.);
        assert!(matches!(
            PolarizationMap::analyse(&i, &q, &u, &h, &config),
            Err(Error::Polarization(PolarizationError::Scale(_)))
        ));
    }

    #[test]
    fn stokes_shape_mismatch() {
        let (h, i, q, _) = stokes();
        let u = Image::zeros(64, 32);
        assert!(matches!(
            PolarizationMap::analyse(&i, &q, &u, &h, &PolarizationConfig::default()),
            Err(Error::Polarization(PolarizationError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn deserialize_configs() -> anyhow::Result<()> {
        let config: MapConfig = serde_json::from_str(
            r#"{"cmul": 0.002, "window": "full_frame", "norm": "log", "colormap": "magma", "ncut": 20}"#,
        )?;
        assert_eq!(config.cmul, Some(2e-3));
        assert_eq!(config.window, WindowMode::FullFrame);
        assert_eq!(config.pad, PAD_FRACTION);
        assert_eq!(config.ncut, 20);
        let config: MapConfig = serde_json::from_str(r#"{}"#)?;
        assert_eq!(config, MapConfig::default());

        let config: PolarizationConfig = serde_json::from_str(
            r#"{"icut": 0.001, "inc": 5, "window": {"sky": {"x0": 5, "x1": -5, "y0": -5, "y1": 5}}}"#,
        )?;
        assert_eq!(config.inc, 5);
        assert_eq!(config.scale, 30.);
        assert_eq!(
            config.window,
            WindowMode::Sky(SkyWindow::from([5., -5., -5., 5.]))
        );
        let config: PolarizationConfig = serde_json::from_str(r#"{}"#)?;
        assert_eq!(config.window, WindowMode::FullFrame);
        assert_eq!(config.beam_pad, 2.);
        Ok(())
    }
}
