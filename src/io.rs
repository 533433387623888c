//! Reading and writing sessions
//!
//! Calibration sessions are stored as CSV with one row per capture:
//!
//! ```text
//! kind,red,green,blue,concentration
//! reference,100,100,150,
//! sample,0,60,120,1.0
//! sample,0,30,60,2.0
//! ```
//!
//! The concentration of a reference row is ignored and may be left empty. When several reference
//! rows are present the last one wins.
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use ndarray::LinalgScalar;
use num_traits::Float;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::error::{Error, Singularity};
use crate::sample::Sample;
use crate::session::Session;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Reference,
    Sample,
}

#[derive(Deserialize, Serialize)]
struct CaptureRow<E> {
    kind: RowKind,
    red: u32,
    green: u32,
    blue: u32,
    concentration: Option<E>,
}

#[derive(Serialize)]
struct DataPointRow<E> {
    concentration: E,
    absorbance: Option<E>,
    transmittance: Option<E>,
    red: u32,
    green: u32,
    blue: u32,
    singularity: Option<Singularity>,
}

/// Build a session numbered `number` from CSV captures
///
/// # Errors
/// - [`Error::Csv`] if the data is malformed
/// - [`Error::MissingConcentration`] if a sample row has no concentration
pub fn read_session<E, R>(reader: R, number: usize) -> Result<Session<E>>
where
    E: Float + DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut session = Session::new(number);
    for (index, result) in rdr.deserialize().enumerate() {
        let row: CaptureRow<E> = result?;
        match row.kind {
            RowKind::Reference => {
                session.set_reference(Some(Sample::blank(row.red, row.green, row.blue)));
            }
            RowKind::Sample => {
                // The header occupies the first line
                let concentration = row
                    .concentration
                    .ok_or(Error::MissingConcentration { line: index + 2 })?;
                session.add_sample(Sample::new(row.red, row.green, row.blue, concentration))?;
            }
        }
    }

    tracing::info!(
        session = number,
        samples = session.len(),
        has_reference = session.reference().is_some(),
        "session read"
    );
    Ok(session)
}

/// Read a session from a CSV file on disk
///
/// # Errors
/// If the file cannot be opened, or see [`read_session`].
pub fn read_session_from_path<E>(path: &Path, number: usize) -> Result<Session<E>>
where
    E: Float + DeserializeOwned,
{
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("session file {} not found", path.display()),
        )
        .into());
    }
    read_session(File::open(path)?, number)
}

/// Write the session captures in the format understood by [`read_session`]
///
/// # Errors
/// If writing fails.
pub fn write_session<E, W>(session: &Session<E>, writer: W) -> Result<()>
where
    E: Float + Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let reference = session.reference().map(|reference| {
        let (red, green, blue) = reference.values();
        CaptureRow {
            kind: RowKind::Reference,
            red,
            green,
            blue,
            concentration: None,
        }
    });
    let samples = session.samples().map(|sample| {
        let (red, green, blue) = sample.values();
        CaptureRow {
            kind: RowKind::Sample,
            red,
            green,
            blue,
            concentration: Some(sample.concentration()),
        }
    });
    for row in reference.into_iter().chain(samples) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the concentration / absorbance series as CSV, for plotting elsewhere
///
/// Values which cannot be computed are left empty. When that is because of a black reference or
/// an opaque sample the `singularity` column names it (`black_reference` or `opaque_sample`).
///
/// # Errors
/// If writing fails.
pub fn write_data_points<E, W>(session: &Session<E>, writer: W) -> Result<()>
where
    E: Float + Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for point in session.absorbance_data_points() {
        let (red, green, blue) = point.sample.values();
        wtr.serialize(DataPointRow {
            concentration: point.concentration,
            absorbance: point.absorbance.unwrap_or(None),
            transmittance: point.transmittance.unwrap_or(None),
            red,
            green,
            blue,
            singularity: point.absorbance.err(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the data points to a CSV file, replacing it if present
///
/// # Errors
/// If the file cannot be created or written.
pub fn write_data_points_to_path<E>(session: &Session<E>, path: &Path) -> Result<()>
where
    E: Float + Serialize,
{
    write_data_points(session, File::create(path)?)?;
    tracing::info!(session = session.number(), path = %path.display(), "data points written");
    Ok(())
}

/// Save the textual summary of `session` to `path`
///
/// # Errors
/// If the file cannot be written.
pub fn write_summary<E>(session: &Session<E>, config: &ReportConfig, path: &Path) -> Result<()>
where
    E: Float + LinalgScalar + std::fmt::Display + std::fmt::LowerExp,
{
    fs::write(path, session.summary(config).to_string())?;
    tracing::info!(session = session.number(), path = %path.display(), "summary written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_session, write_data_points, write_session};
    use crate::error::Error;
    use crate::sample::Sample;
    use crate::session::Session;

    const CAPTURES: &str = "\
kind,red,green,blue,concentration
sample,0,30,60,2.0
reference,100,100,150,
sample,0,60,120,1.0
";

    #[test]
    fn session_is_read_with_reference_applied_to_every_sample() {
        let session: Session<f64> = read_session(CAPTURES.as_bytes(), 4).unwrap();

        assert_eq!(session.number(), 4);
        assert_eq!(session.len(), 2);
        assert_eq!(
            session.reference().map(Sample::values),
            Some((100, 100, 150))
        );
        assert_eq!(session.get(0).unwrap().values(), (0, 60, 120));
        assert!(session
            .absorbance_data_points()
            .all(|p| matches!(p.absorbance, Ok(Some(_)))));
    }

    #[test]
    fn sample_without_concentration_is_rejected() {
        let data = "kind,red,green,blue,concentration\nsample,1,2,3,\n";
        let result = read_session::<f64, _>(data.as_bytes(), 1);
        assert!(matches!(result, Err(Error::MissingConcentration { line: 2 })));
    }

    #[test]
    fn unknown_row_kind_is_a_csv_error() {
        let data = "kind,red,green,blue,concentration\nblank,1,2,3,0.0\n";
        let result = read_session::<f64, _>(data.as_bytes(), 1);
        assert!(matches!(result, Err(Error::Csv(_))));
    }

    #[test]
    fn written_session_reads_back_identically() {
        let original: Session<f64> = read_session(CAPTURES.as_bytes(), 1).unwrap();

        let mut buffer = vec![];
        write_session(&original, &mut buffer).unwrap();
        let restored: Session<f64> = read_session(buffer.as_slice(), 1).unwrap();

        assert_eq!(
            original.samples().map(Sample::values).collect::<Vec<_>>(),
            restored.samples().map(Sample::values).collect::<Vec<_>>()
        );
        assert_eq!(
            original.reference().map(Sample::values),
            restored.reference().map(Sample::values)
        );
    }

    #[test]
    fn data_points_leave_unavailable_cells_empty() {
        let mut session = Session::new(1);
        session.add_sample(Sample::new(0, 60, 120, 1.5)).unwrap();

        let mut buffer = vec![];
        write_data_points(&session, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert_eq!(
            output,
            "concentration,absorbance,transmittance,red,green,blue,singularity\n1.5,,,0,60,120,\n"
        );
    }

    #[test]
    fn data_points_name_the_singularity_behind_an_empty_cell() {
        let mut session = Session::new(1);
        session.set_reference(Some(Sample::blank(0, 0, 0)));
        session.add_sample(Sample::new(0, 60, 120, 1.5)).unwrap();

        let mut buffer = vec![];
        write_data_points(&session, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert_eq!(
            output,
            "concentration,absorbance,transmittance,red,green,blue,singularity\n\
             1.5,,,0,60,120,black_reference\n"
        );

        session.set_reference(Some(Sample::blank(100, 100, 150)));
        session.add_sample(Sample::new(0, 0, 0, 2.0)).unwrap();

        let mut buffer = vec![];
        write_data_points(&session, &mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert!(output.lines().nth(2).unwrap().starts_with("2.0,,0.0,0,0,0,opaque_sample"));
    }
}
