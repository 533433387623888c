#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod config;
pub mod error;
pub mod io;
pub mod math;
pub mod polyfit;
pub mod report;
pub mod sample;
pub mod session;
pub mod workbench;

pub use config::ReportConfig;
pub use error::{Degeneracy, Error, Singularity};
pub use sample::{Reading, Sample};
pub use session::{DataLine, DataPoint, SampleId, SampleSelector, Session};
pub use workbench::Workbench;

pub type Result<T> = ::std::result::Result<T, Error>;
