use std::fmt;

use ndarray::LinalgScalar;
use num_traits::Float;

use crate::config::ReportConfig;
use crate::math::to_float;
use crate::sample::{Reading, Sample};
use crate::session::Session;

/// Human readable dump of a session, see [`Session::summary`]
pub struct Summary<'a, E> {
    session: &'a Session<E>,
    config: &'a ReportConfig,
}

impl<E: Float> Session<E> {
    /// Render the session as ordered multi-line text: the sample count, the calibration line, the
    /// reference, and one line per sample in concentration order
    pub const fn summary<'a>(&'a self, config: &'a ReportConfig) -> Summary<'a, E> {
        Summary {
            session: self,
            config,
        }
    }
}

impl<'a, E> Summary<'a, E>
where
    E: Float + fmt::LowerExp,
{
    fn write_sample(&self, f: &mut fmt::Formatter<'_>, sample: &Sample<E>) -> fmt::Result {
        let (red, green, blue) = sample.values();
        write!(
            f,
            "Sample: RGB: ({red}, {green}, {blue}), C: {:.2e} {}, I: {:.2e} {}",
            sample.concentration(),
            self.config.concentration_unit,
            sample.intensity(),
            self.config.absorbance_unit,
        )
    }

    /// The placeholder when a value is unavailable, followed by the cause if it is singular
    fn render(&self, reading: Reading<E>, available: impl FnOnce(E) -> String) -> String {
        let unavailable = &self.config.unavailable;
        match reading {
            Ok(Some(value)) => available(value),
            Ok(None) => unavailable.clone(),
            Err(singularity) => format!("{unavailable} ({singularity})"),
        }
    }
}

impl<'a, E> fmt::Display for Summary<'a, E>
where
    E: Float + LinalgScalar + fmt::Display + fmt::LowerExp,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.config;
        let unavailable = config.unavailable.as_str();

        writeln!(f, "------- Session {} ---------", self.session.number())?;
        writeln!(f, "Session of {} samples", self.session.len())?;

        match self.session.absorbance_data_line() {
            Ok(line) => {
                let r_squared = line
                    .r_squared
                    .map_or_else(|| unavailable.to_owned(), |r| format!("{r:.5}"));
                writeln!(
                    f,
                    "regression model: A = {:.5e} * C; R2 = {r_squared}",
                    line.slope
                )?;
            }
            Err(error) => writeln!(f, "regression model: {unavailable} ({error})")?,
        }

        write!(f, "Background : ")?;
        match self.session.reference() {
            Some(reference) => self.write_sample(f, reference)?,
            None => write!(f, "{unavailable}")?,
        }
        writeln!(f)?;

        writeln!(f, "------ Samples ------")?;
        for (index, point) in self.session.absorbance_data_points().enumerate() {
            write!(f, "{index}-> ")?;
            self.write_sample(f, point.sample)?;

            let absorbance = self.render(point.absorbance, |a| {
                format!("{a:.3e} {}", config.absorbance_unit)
            });
            let transmittance = self.render(point.transmittance, |t| {
                format!("{:.2}%", t * to_float::<E, _>(100))
            });
            writeln!(f, ", A: {absorbance}, T: {transmittance}")?;
        }
        write!(f, "--------------------")
    }
}

impl<E> fmt::Display for Session<E>
where
    E: Float + LinalgScalar + fmt::Display + fmt::LowerExp,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.summary(&ReportConfig::default()), f)
    }
}
