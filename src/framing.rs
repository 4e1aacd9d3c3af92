//! Viewing window framing
//!
//! Square, padded window centered on a detected emission region.

use crate::{coordinates::PixelWindow, detection::BoundingBox};

/// Default fractional margin around the detected region
pub const PAD_FRACTION: f64 = 0.15;

#[derive(thiserror::Error, Debug)]
pub enum FramingError {
    #[error("pad fraction {0} outside [0, 0.5)")]
    PadFraction(f64),
    #[error("empty bounding box {0:?}")]
    EmptyBox(BoundingBox),
}
type Result<T> = std::result::Result<T, FramingError>;

/// Square window around `bbox` with a `pad` fractional margin
///
/// The half-width is `0.5 * d / (1 - 2 * pad)` with `d` the largest box side.
/// The window is not clipped to the image and its bounds are truncated toward zero.
pub fn frame(bbox: &BoundingBox, pad: f64) -> Result<PixelWindow> {
    if !(0f64..0.5).contains(&pad) {
        return Err(FramingError::PadFraction(pad));
    }
    let d = bbox.height().max(bbox.width()) as f64;
    if d == 0f64 {
        return Err(FramingError::EmptyBox(*bbox));
    }
    let half_width = 0.5 * d / (1f64 - 2f64 * pad);
    let x0 = 0.5 * (bbox.x1 + bbox.x2) as f64;
    let y0 = 0.5 * (bbox.y1 + bbox.y2) as f64;
    let x1 = x0 - half_width;
    let y1 = y0 - half_width;
    Ok(PixelWindow {
        x_min: x1 as i64,
        x_max: (2f64 * x0 - x1) as i64,
        y_min: y1 as i64,
        y_max: (2f64 * y0 - y1) as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: BoundingBox = BoundingBox {
        y1: 10,
        x1: 10,
        y2: 20,
        x2: 20,
    };

    #[test]
    fn no_padding() -> anyhow::Result<()> {
        let w = frame(&BOX, 0.)?;
        assert_eq!((w.x_min, w.x_max, w.y_min, w.y_max), (10, 20, 10, 20));
        Ok(())
    }

    #[test]
    fn padding() -> anyhow::Result<()> {
        let w = frame(&BOX, 0.2)?;
        assert_eq!((w.x_min, w.x_max, w.y_min, w.y_max), (6, 23, 6, 23));
        Ok(())
    }

    #[test]
    fn square_from_elongated_box() -> anyhow::Result<()> {
        let bbox = BoundingBox {
            y1: 40,
            x1: 10,
            y2: 50,
            x2: 50,
        };
        let w = frame(&bbox, PAD_FRACTION)?;
        // d = 40, half-width = 20 / 0.7
        assert_eq!((w.x_min, w.x_max), (1, 58));
        assert_eq!((w.y_min, w.y_max), (16, 73));
        assert_eq!(w.width(), w.height());
        Ok(())
    }

    #[test]
    fn window_may_leave_the_image() -> anyhow::Result<()> {
        let bbox = BoundingBox {
            y1: 0,
            x1: 0,
            y2: 4,
            x2: 4,
        };
        let w = frame(&bbox, 0.25)?;
        // half-width 4 around (2, 2)
        assert_eq!((w.x_min, w.x_max), (-2, 6));
        Ok(())
    }

    #[test]
    fn invalid_pad() {
        for pad in [0.5, 0.7, -0.1, f64::NAN] {
            assert!(matches!(frame(&BOX, pad), Err(FramingError::PadFraction(_))));
        }
    }
}
