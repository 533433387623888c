use serde::Serialize;
use thiserror::Error;

use crate::session::SampleId;

/// Why a regression could not produce meaningful coefficients
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Degeneracy {
    /// Fewer usable points than the model needs
    TooFewPoints { found: usize, required: usize },
    /// Every observation of the independent variable is identical
    ZeroVariance,
    /// The normal equations have no unique solution
    Singular,
}

impl std::fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { found, required } => {
                write!(f, "{found} usable points, at least {required} required")
            }
            Self::ZeroVariance => write!(f, "all observations are identical"),
            Self::Singular => write!(f, "normal equations are singular"),
        }
    }
}

/// Division by zero or a diverging logarithm in the intensity chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Singularity {
    /// The reference has zero intensity so no transmittance can be formed
    BlackReference,
    /// Transmittance is zero and absorbance would be infinite
    OpaqueSample,
}

impl std::fmt::Display for Singularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlackReference => write!(f, "reference intensity is zero"),
            Self::OpaqueSample => write!(f, "transmittance is zero, absorbance diverges"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("sample index {index} is out of range for a session of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("sample {0} is not part of this session")]
    SampleNotFound(SampleId),

    #[error("absorbance is unavailable: no reference is set")]
    AbsorbanceUnavailable,

    #[error("no session numbered {0}")]
    SessionNotFound(usize),

    #[error("session was built as number {found}, but number {expected} was allocated")]
    SessionNumberMismatch { expected: usize, found: usize },

    #[error("concentration {0} is not a finite non-negative number")]
    InvalidConcentration(f64),

    #[error("sample on line {line} has no concentration")]
    MissingConcentration { line: usize },

    #[error("degenerate fit: {0}")]
    DegenerateFit(Degeneracy),

    #[error("numeric singularity: {0}")]
    NumericSingularity(Singularity),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl From<Singularity> for Error {
    fn from(singularity: Singularity) -> Self {
        Self::NumericSingularity(singularity)
    }
}

impl Error {
    /// Whether the caller passed something the operation cannot act on
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. }
                | Self::SampleNotFound(_)
                | Self::AbsorbanceUnavailable
                | Self::SessionNotFound(_)
                | Self::SessionNumberMismatch { .. }
                | Self::InvalidConcentration(_)
                | Self::MissingConcentration { .. }
        )
    }

    #[must_use]
    pub const fn is_degenerate_fit(&self) -> bool {
        matches!(self, Self::DegenerateFit(_))
    }

    #[must_use]
    pub const fn is_numeric_singularity(&self) -> bool {
        matches!(self, Self::NumericSingularity(_))
    }
}
