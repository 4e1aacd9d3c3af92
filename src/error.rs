use crate::{
    annotation::AnnotationError, colormap::ColormapError, coordinates::GeometryError,
    detection::DetectionError, framing::FramingError, header::HeaderError,
    normalization::NormalizationError, polarization::PolarizationError, rms::RmsError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `header` module")]
    Header(#[from] HeaderError),
    #[error("Error in the `coordinates` module")]
    Geometry(#[from] GeometryError),
    #[error("Error in the `rms` module")]
    Rms(#[from] RmsError),
    #[error("Error in the `detection` module")]
    Detection(#[from] DetectionError),
    #[error("Error in the `framing` module")]
    Framing(#[from] FramingError),
    #[error("Error in the `normalization` module")]
    Normalization(#[from] NormalizationError),
    #[error("Error in the `colormap` module")]
    Colormap(#[from] ColormapError),
    #[error("Error in the `polarization` module")]
    Polarization(#[from] PolarizationError),
    #[error("Error in the `annotation` module")]
    Annotation(#[from] AnnotationError),
}
