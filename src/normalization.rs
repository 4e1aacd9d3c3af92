//! Intensity normalization
//!
//! Display mapping of the map values onto `[0, 1]`, selected from a
//! whitespace separated specification: the variant name followed by its
//! parameters, e.g. `"power 0.5"` or `"symlog 1e-3 1 -0.01 0.2"`.
//!
//! | variant    | parameters                                                       |
//! |------------|------------------------------------------------------------------|
//! | `linear`   | none, `vmin vmax`                                                |
//! | `power`    | none (`gamma=0.5`), `gamma`, `gamma vmin vmax`                   |
//! | `log`      | none, `vmin vmax`                                                |
//! | `symlog`   | `linthresh`, `linthresh linscale`, `linthresh linscale vmin vmax` |
//! | `twoslope` | `vcenter`, `vcenter vmin vmax`                                   |
//!
//! Parameters left out default to the data range given by the caller.

use std::str::FromStr;

use itertools::{Itertools, MinMaxResult};
use strum_macros::{Display, EnumIter, EnumString};

/// Power law exponent when `power` comes without parameter
pub const DEFAULT_GAMMA: f64 = 0.5;
/// Logarithm base of the `symlog` normalization
const SYMLOG_BASE: f64 = 10f64;

/// Normalization variant names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Linear,
    Power,
    Log,
    SymLog,
    TwoSlope,
}
impl Kind {
    fn arities(&self) -> &'static str {
        match self {
            Kind::Linear | Kind::Log => "0 or 2",
            Kind::Power => "0, 1 or 3",
            Kind::SymLog => "1, 2 or 4",
            Kind::TwoSlope => "1 or 3",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NormalizationError {
    #[error("unknown normalization {0:?}")]
    UnknownVariant(String),
    #[error("{kind} normalization expects {} parameters, found {count}", .kind.arities())]
    Arity { kind: Kind, count: usize },
    #[error("invalid normalization parameter {0:?}")]
    Number(String, #[source] std::num::ParseFloatError),
    #[error("invalid range: vmin={vmin} must not exceed vmax={vmax}")]
    InvalidRange { vmin: f64, vmax: f64 },
    #[error("log normalization requires a positive vmin, found {0}")]
    LogDomain(f64),
    #[error("invalid power law exponent {0}")]
    Gamma(f64),
    #[error("symlog linear threshold must be positive, found {0}")]
    LinThresh(f64),
    #[error("twoslope requires vmin < vcenter < vmax, found {vmin}, {vcenter}, {vmax}")]
    VCenter { vcenter: f64, vmin: f64, vmax: f64 },
}
type Result<T> = std::result::Result<T, NormalizationError>;

/// Intensity normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    Linear {
        vmin: f64,
        vmax: f64,
    },
    Power {
        gamma: f64,
        vmin: f64,
        vmax: f64,
    },
    Log {
        vmin: f64,
        vmax: f64,
    },
    SymLog {
        linthresh: f64,
        linscale: f64,
        vmin: f64,
        vmax: f64,
    },
    TwoSlope {
        vcenter: f64,
        vmin: f64,
        vmax: f64,
    },
}

/// Finite (min,max) range of the data, `None` if there is no finite value
pub fn data_range<'a, I>(data: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    match data
        .into_iter()
        .filter(|x| x.is_finite())
        .minmax_by(|a, b| a.total_cmp(b))
    {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(x) => Some((*x, *x)),
        MinMaxResult::MinMax(min, max) => Some((*min, *max)),
    }
}

fn symlog(x: f64, linthresh: f64, linscale: f64) -> f64 {
    let linscale_adj = linscale / (1f64 - SYMLOG_BASE.recip());
    if x.abs() > linthresh {
        x.signum() * linthresh * (linscale_adj + (x.abs() / linthresh).log10())
    } else {
        x * linscale_adj
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0f64 {
        0f64
    } else {
        num / den
    }
}

impl Normalization {
    /// Parses a normalization specification
    ///
    /// An empty specification is a linear normalization over `[vmin, vmax]`.
    pub fn parse(spec: &str, vmin: f64, vmax: f64) -> Result<Self> {
        let mut tokens = spec.split_whitespace();
        let Some(name) = tokens.next() else {
            return Self::Linear { vmin, vmax }.validated();
        };
        let kind =
            Kind::from_str(name).map_err(|_| NormalizationError::UnknownVariant(name.into()))?;
        let params = tokens
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|e| NormalizationError::Number(t.into(), e))
            })
            .collect::<Result<Vec<f64>>>()?;
        let norm = match (kind, params.as_slice()) {
            (Kind::Linear, []) => Self::Linear { vmin, vmax },
            (Kind::Linear, &[vmin, vmax]) => Self::Linear { vmin, vmax },
            (Kind::Power, []) => Self::power(DEFAULT_GAMMA, vmin, vmax),
            (Kind::Power, &[gamma]) => Self::power(gamma, vmin, vmax),
            (Kind::Power, &[gamma, vmin, vmax]) => Self::power(gamma, vmin, vmax),
            (Kind::Log, []) => Self::Log { vmin, vmax },
            (Kind::Log, &[vmin, vmax]) => Self::Log { vmin, vmax },
            (Kind::SymLog, &[linthresh]) => Self::SymLog {
                linthresh,
                linscale: 1f64,
                vmin,
                vmax,
            },
            (Kind::SymLog, &[linthresh, linscale]) => Self::SymLog {
                linthresh,
                linscale,
                vmin,
                vmax,
            },
            (Kind::SymLog, &[linthresh, linscale, vmin, vmax]) => Self::SymLog {
                linthresh,
                linscale,
                vmin,
                vmax,
            },
            (Kind::TwoSlope, &[vcenter]) => Self::TwoSlope {
                vcenter,
                vmin,
                vmax,
            },
            (Kind::TwoSlope, &[vcenter, vmin, vmax]) => Self::TwoSlope {
                vcenter,
                vmin,
                vmax,
            },
            (kind, params) => {
                return Err(NormalizationError::Arity {
                    kind,
                    count: params.len(),
                })
            }
        };
        norm.validated()
    }
    /// Power law normalization, `vmin` raised to 0 for `gamma < 1`
    fn power(gamma: f64, vmin: f64, vmax: f64) -> Self {
        Self::Power {
            gamma,
            vmin: if gamma < 1f64 && vmin < 0f64 {
                0f64
            } else {
                vmin
            },
            vmax,
        }
    }
    fn validated(self) -> Result<Self> {
        let (vmin, vmax) = self.range();
        if !(vmin <= vmax) {
            return Err(NormalizationError::InvalidRange { vmin, vmax });
        }
        match self {
            Self::Log { vmin, .. } if !(vmin > 0f64) => Err(NormalizationError::LogDomain(vmin)),
            Self::Power { gamma, .. } if !(gamma > 0f64 && gamma.is_finite()) => {
                Err(NormalizationError::Gamma(gamma))
            }
            Self::SymLog { linthresh, .. } if !(linthresh > 0f64) => {
                Err(NormalizationError::LinThresh(linthresh))
            }
            Self::TwoSlope {
                vcenter,
                vmin,
                vmax,
            } if !(vmin < vcenter && vcenter < vmax) => Err(NormalizationError::VCenter {
                vcenter,
                vmin,
                vmax,
            }),
            _ => Ok(self),
        }
    }
    pub fn kind(&self) -> Kind {
        match self {
            Self::Linear { .. } => Kind::Linear,
            Self::Power { .. } => Kind::Power,
            Self::Log { .. } => Kind::Log,
            Self::SymLog { .. } => Kind::SymLog,
            Self::TwoSlope { .. } => Kind::TwoSlope,
        }
    }
    /// Returns `(vmin, vmax)`
    pub fn range(&self) -> (f64, f64) {
        match *self {
            Self::Linear { vmin, vmax }
            | Self::Power { vmin, vmax, .. }
            | Self::Log { vmin, vmax }
            | Self::SymLog { vmin, vmax, .. }
            | Self::TwoSlope { vmin, vmax, .. } => (vmin, vmax),
        }
    }
    /// Maps a value onto `[0, 1]`
    ///
    /// Returns `None` for NaN, infinite or, with the log normalization, non-positive values.
    pub fn apply(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        let y = match *self {
            Self::Linear { vmin, vmax } => ratio(x - vmin, vmax - vmin),
            Self::Power { gamma, vmin, vmax } => {
                ratio(x - vmin, vmax - vmin).max(0f64).powf(gamma)
            }
            Self::Log { vmin, vmax } => {
                if x <= 0f64 {
                    return None;
                }
                ratio(x.ln() - vmin.ln(), vmax.ln() - vmin.ln())
            }
            Self::SymLog {
                linthresh,
                linscale,
                vmin,
                vmax,
            } => {
                let t_min = symlog(vmin, linthresh, linscale);
                let t_max = symlog(vmax, linthresh, linscale);
                ratio(symlog(x, linthresh, linscale) - t_min, t_max - t_min)
            }
            Self::TwoSlope {
                vcenter,
                vmin,
                vmax,
            } => {
                if x < vcenter {
                    0.5 * (x - vmin) / (vcenter - vmin)
                } else {
                    0.5 + 0.5 * (x - vcenter) / (vmax - vcenter)
                }
            }
        };
        Some(y.clamp(0f64, 1f64))
    }
}
