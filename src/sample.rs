use std::fmt;
use std::sync::Arc;

use num_traits::{Float, ToPrimitive};

use crate::error::Singularity;
use crate::math::to_float;
use crate::Result;

/// A derived quantity which is either available, unavailable for want of a reference
/// (`Ok(None)`), or undefined because of a [`Singularity`]
pub type Reading<E> = std::result::Result<Option<E>, Singularity>;

/// One colour measurement of a solution at a known concentration
///
/// The derived quantities are computed on demand from the raw channel values. Transmittance and
/// absorbance additionally need a reference (blank) sample, which is shared between every sample
/// of a [`Session`](crate::Session) rather than owned by any one of them.
#[derive(Clone, Debug)]
pub struct Sample<E> {
    red: u32,
    green: u32,
    blue: u32,
    /// Concentration of the analyte, mol/L by convention
    concentration: E,
    reference: Option<Arc<Sample<E>>>,
}

impl<E: Float> Sample<E> {
    /// Create a sample from raw channel values, conventionally in `0..=255`
    pub fn new(red: u32, green: u32, blue: u32, concentration: E) -> Self {
        tracing::debug!(
            red,
            green,
            blue,
            concentration = concentration.to_f64(),
            "sample created"
        );
        Self {
            red,
            green,
            blue,
            concentration,
            reference: None,
        }
    }

    /// A sample captured to be used as a reference, its concentration is zero
    pub fn blank(red: u32, green: u32, blue: u32) -> Self {
        Self::new(red, green, blue, E::zero())
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Arc<Self>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// The raw `(red, green, blue)` triplet
    pub const fn values(&self) -> (u32, u32, u32) {
        (self.red, self.green, self.blue)
    }

    pub fn concentration(&self) -> E {
        self.concentration
    }

    pub fn reference(&self) -> Option<&Self> {
        self.reference.as_deref()
    }

    /// Replace the reference used to normalise this sample
    pub fn set_reference(&mut self, reference: Option<Arc<Self>>) {
        self.reference = reference;
    }

    /// Unweighted mean of the three channels
    ///
    /// No model of human vision is applied.
    pub fn intensity(&self) -> E {
        let sum = u64::from(self.red) + u64::from(self.green) + u64::from(self.blue);
        to_float::<E, _>(sum) / to_float::<E, _>(3)
    }

    /// Ratio of this sample's intensity to that of its reference
    ///
    /// `Ok(None)` when no reference is set.
    ///
    /// # Errors
    /// [`Singularity::BlackReference`] when the reference has zero intensity.
    pub fn transmittance(&self) -> Result<Option<E>> {
        Ok(self.transmittance_reading()?)
    }

    /// Negative decadic logarithm of the transmittance, in arbitrary units
    ///
    /// `Ok(None)` when no reference is set.
    ///
    /// # Errors
    /// - [`Singularity::BlackReference`] when the reference has zero intensity
    /// - [`Singularity::OpaqueSample`] when the sample itself has zero intensity, as the
    ///   absorbance would be infinite
    pub fn absorbance(&self) -> Result<Option<E>> {
        Ok(self.absorbance_reading()?)
    }

    /// [`Sample::transmittance`] with the singularity kept as a value, for tables and charts
    pub fn transmittance_reading(&self) -> Reading<E> {
        let Some(reference) = self.reference.as_deref() else {
            return Ok(None);
        };

        let reference_intensity = reference.intensity();
        if reference_intensity == E::zero() {
            return Err(Singularity::BlackReference);
        }

        let transmittance = self.intensity() / reference_intensity;
        tracing::trace!(transmittance = transmittance.to_f64(), "computed transmittance");
        Ok(Some(transmittance))
    }

    /// [`Sample::absorbance`] with the singularity kept as a value, for tables and charts
    pub fn absorbance_reading(&self) -> Reading<E> {
        let Some(transmittance) = self.transmittance_reading()? else {
            return Ok(None);
        };

        if transmittance == E::zero() {
            return Err(Singularity::OpaqueSample);
        }

        let absorbance = -transmittance.log10();
        tracing::trace!(absorbance = absorbance.to_f64(), "computed absorbance");
        Ok(Some(absorbance))
    }
}

impl<E: Float + fmt::LowerExp> fmt::Display for Sample<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample: RGB: ({}, {}, {}), C: {:.2e} mol/L, I: {:.2e} A.U.",
            self.red,
            self.green,
            self.blue,
            self.concentration,
            self.intensity()
        )
    }
}
