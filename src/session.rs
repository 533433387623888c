use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use ndarray::LinalgScalar;
use num_traits::{Float, ToPrimitive};

use crate::error::{Degeneracy, Error};
use crate::polyfit::{polyfit, Intercept};
use crate::sample::{Reading, Sample};
use crate::Result;

/// The inverse fit estimates an intercept and a slope, so it needs at least two points
const MIN_INVERSE_FIT_POINTS: usize = 2;

/// Identity of a sample inside the session that issued it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(u64);

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Picks a sample out of a session, either by position or by identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSelector {
    /// Zero based position in concentration order
    Index(usize),
    Id(SampleId),
}

impl From<usize> for SampleSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<SampleId> for SampleSelector {
    fn from(id: SampleId) -> Self {
        Self::Id(id)
    }
}

/// One entry of the concentration / absorbance series
#[derive(Clone, Copy, Debug)]
pub struct DataPoint<'a, E> {
    pub id: SampleId,
    pub concentration: E,
    /// `Ok(None)` without a reference, `Err` when the absorbance diverges
    pub absorbance: Reading<E>,
    pub transmittance: Reading<E>,
    pub sample: &'a Sample<E>,
}

/// The calibration line `A = slope * C`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataLine<E> {
    pub slope: E,
    /// `None` when the fit leaves no residual to judge it by
    pub r_squared: Option<E>,
    /// Number of samples with a defined absorbance that entered the fit
    pub num_points: usize,
}

#[derive(Clone, Debug)]
struct Entry<E> {
    id: SampleId,
    sample: Sample<E>,
}

/// A set of calibration samples measured against one shared reference
///
/// Samples are always held in ascending order of concentration. Samples of equal concentration
/// keep the order in which they were added.
#[derive(Clone, Debug)]
pub struct Session<E> {
    /// Label for reporting, carries no identity
    number: usize,
    samples: Vec<Entry<E>>,
    reference: Option<Arc<Sample<E>>>,
    /// Highest concentration ever added, unaffected by removals
    max_concentration: Option<E>,
    next_id: u64,
}

impl<E: Float> Session<E> {
    pub const fn new(number: usize) -> Self {
        Self {
            number,
            samples: vec![],
            reference: None,
            max_concentration: None,
            next_id: 0,
        }
    }

    pub const fn number(&self) -> usize {
        self.number
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The samples in ascending order of concentration
    pub fn samples(&self) -> impl ExactSizeIterator<Item = &Sample<E>> + '_ {
        self.samples.iter().map(|entry| &entry.sample)
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = SampleId> + '_ {
        self.samples.iter().map(|entry| entry.id)
    }

    pub fn get(&self, index: usize) -> Option<&Sample<E>> {
        self.samples.get(index).map(|entry| &entry.sample)
    }

    pub fn sample(&self, id: SampleId) -> Option<&Sample<E>> {
        self.position(id).map(|index| &self.samples[index].sample)
    }

    /// Current position of the sample `id` in concentration order
    pub fn position(&self, id: SampleId) -> Option<usize> {
        self.samples.iter().position(|entry| entry.id == id)
    }

    pub fn reference(&self) -> Option<&Sample<E>> {
        self.reference.as_deref()
    }

    pub fn max_concentration(&self) -> Option<E> {
        self.max_concentration
    }

    /// Replace the shared reference, or remove it with `None`
    ///
    /// Every sample already in the session is pointed at the new reference, as is every sample
    /// added later.
    pub fn set_reference(&mut self, reference: Option<Sample<E>>) {
        tracing::info!(
            session = self.number,
            reference = ?reference.as_ref().map(Sample::values),
            "reference changed"
        );
        self.reference = reference.map(Arc::new);
        for entry in &mut self.samples {
            entry.sample.set_reference(self.reference.clone());
        }
    }

    /// Store a new sample, measured against the session reference
    ///
    /// Returns the identity under which the sample can later be removed.
    ///
    /// # Errors
    /// [`Error::InvalidConcentration`] if the concentration is negative or not finite. The
    /// session is left untouched.
    pub fn add_sample(&mut self, mut sample: Sample<E>) -> Result<SampleId> {
        let concentration = sample.concentration();
        if !concentration.is_finite() || concentration < E::zero() {
            return Err(Error::InvalidConcentration(
                concentration.to_f64().unwrap_or(f64::NAN),
            ));
        }

        sample.set_reference(self.reference.clone());
        if self
            .max_concentration
            .map_or(true, |max| concentration > max)
        {
            self.max_concentration = Some(concentration);
        }

        let id = SampleId(self.next_id);
        self.next_id += 1;

        // Inserting after every sample of lower or equal concentration keeps the collection
        // sorted, with ties in insertion order
        let index = self
            .samples
            .partition_point(|entry| entry.sample.concentration() <= concentration);
        self.samples.insert(index, Entry { id, sample });

        tracing::debug!(
            session = self.number,
            %id,
            index,
            concentration = concentration.to_f64(),
            "sample added"
        );
        Ok(id)
    }

    /// Remove a sample by position or identity, returning it
    ///
    /// # Errors
    /// - [`Error::IndexOutOfRange`] if the position is past the end of the session
    /// - [`Error::SampleNotFound`] if no sample has the identity
    ///
    /// The session is left untouched on error.
    pub fn remove_sample(&mut self, selector: impl Into<SampleSelector>) -> Result<Sample<E>> {
        let index = match selector.into() {
            SampleSelector::Index(index) if index < self.samples.len() => index,
            SampleSelector::Index(index) => {
                return Err(Error::IndexOutOfRange {
                    index,
                    len: self.samples.len(),
                })
            }
            SampleSelector::Id(id) => self.position(id).ok_or(Error::SampleNotFound(id))?,
        };

        let entry = self.samples.remove(index);
        tracing::debug!(session = self.number, id = %entry.id, index, "sample removed");
        Ok(entry.sample)
    }

    /// Remove every sample. The reference and the concentration high-water mark are kept.
    pub fn clear_samples(&mut self) {
        tracing::debug!(session = self.number, removed = self.samples.len(), "samples cleared");
        self.samples.clear();
    }

    /// The `(concentration, absorbance)` series in concentration order, for plotting and tables
    ///
    /// Without a reference every point has `absorbance: Ok(None)`. A black reference or an opaque
    /// sample shows up as `Err` with the [`Singularity`](crate::Singularity) that caused it.
    pub fn absorbance_data_points(&self) -> impl ExactSizeIterator<Item = DataPoint<'_, E>> + '_ {
        self.samples.iter().map(|entry| DataPoint {
            id: entry.id,
            concentration: entry.sample.concentration(),
            absorbance: entry.sample.absorbance_reading(),
            transmittance: entry.sample.transmittance_reading(),
            sample: &entry.sample,
        })
    }

    /// Concentrations and absorbances of every sample with a defined absorbance
    fn calibration_points(&self) -> (Vec<E>, Vec<E>) {
        let mut concentrations = Vec::with_capacity(self.samples.len());
        let mut absorbances = Vec::with_capacity(self.samples.len());
        for entry in &self.samples {
            match entry.sample.absorbance_reading() {
                Ok(Some(absorbance)) => {
                    concentrations.push(entry.sample.concentration());
                    absorbances.push(absorbance);
                }
                Ok(None) => {}
                Err(singularity) => {
                    tracing::warn!(
                        session = self.number,
                        id = %entry.id,
                        %singularity,
                        "sample excluded from fit"
                    );
                }
            }
        }
        (concentrations, absorbances)
    }
}

impl<E: Float + LinalgScalar> Session<E> {
    /// Fit the calibration line `A = slope * C`, constrained through the origin
    ///
    /// Only samples with a defined absorbance take part. `r_squared` is `None` when there is a
    /// single point, or when every concentration is identical.
    ///
    /// # Errors
    /// [`Error::DegenerateFit`] when no sample has a defined absorbance, or when every usable
    /// sample has zero concentration.
    pub fn absorbance_data_line(&self) -> Result<DataLine<E>> {
        let (concentrations, absorbances) = self.calibration_points();
        let fit = polyfit(
            &concentrations,
            &absorbances,
            1,
            None,
            Intercept::ThroughOrigin,
        )?;

        let slope = fit.coefficients()[1];
        let r_squared = if concentrations.iter().all_equal() {
            None
        } else {
            fit.r_squared()
        };

        tracing::debug!(
            session = self.number,
            slope = slope.to_f64(),
            r_squared = r_squared.and_then(|r| r.to_f64()),
            num_points = concentrations.len(),
            "calibration line fitted"
        );

        Ok(DataLine {
            slope,
            r_squared,
            num_points: concentrations.len(),
        })
    }

    /// Estimate the concentration of `sample` from the session's samples
    ///
    /// The session reference is assigned to `sample` so its absorbance can be computed, then
    /// the line `C = a + b * A` fitted over the session is evaluated at that absorbance.
    ///
    /// # Errors
    /// - [`Error::AbsorbanceUnavailable`] when the session has no reference
    /// - [`Error::NumericSingularity`] when the absorbance of `sample` diverges
    /// - [`Error::DegenerateFit`] with fewer than two usable samples, or when their absorbances
    ///   are all identical
    pub fn compute_concentration_from_sample(&self, sample: &mut Sample<E>) -> Result<E> {
        sample.set_reference(self.reference.clone());
        let absorbance = sample.absorbance()?.ok_or(Error::AbsorbanceUnavailable)?;
        self.compute_concentration_from_absorbance(absorbance)
    }

    /// Evaluate the inverse calibration `C = a + b * A` at `absorbance`
    ///
    /// # Errors
    /// [`Error::DegenerateFit`] with fewer than two usable samples, or when their absorbances
    /// are all identical.
    pub fn compute_concentration_from_absorbance(&self, absorbance: E) -> Result<E> {
        let (concentrations, absorbances) = self.calibration_points();
        if absorbances.len() < MIN_INVERSE_FIT_POINTS {
            return Err(Error::DegenerateFit(Degeneracy::TooFewPoints {
                found: absorbances.len(),
                required: MIN_INVERSE_FIT_POINTS,
            }));
        }
        if absorbances.iter().all_equal() {
            return Err(Error::DegenerateFit(Degeneracy::ZeroVariance));
        }

        let fit = polyfit(&absorbances, &concentrations, 1, None, Intercept::Free)?;
        let concentration = fit.evaluate(absorbance);

        if !fit.window_contains(&absorbance) {
            tracing::warn!(
                session = self.number,
                absorbance = absorbance.to_f64(),
                "absorbance lies outside the calibrated range"
            );
        }
        tracing::debug!(
            session = self.number,
            absorbance = absorbance.to_f64(),
            concentration = concentration.to_f64(),
            "concentration estimated"
        );
        Ok(concentration)
    }
}
