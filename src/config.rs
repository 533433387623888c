use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Presentation settings for the textual session summary
///
/// Missing keys take their default values, so an empty file is a valid configuration.
///
/// ```toml
/// concentration_unit = "mmol/L"
/// unavailable = "n/a"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Unit printed after concentrations. Values are never converted.
    pub concentration_unit: String,
    /// Unit printed after intensities and absorbances
    pub absorbance_unit: String,
    /// Printed in place of a value which cannot be computed
    pub unavailable: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            concentration_unit: "mol/L".to_owned(),
            absorbance_unit: "A.U.".to_owned(),
            unavailable: "--".to_owned(),
        }
    }
}

impl ReportConfig {
    /// Parse a configuration from TOML
    ///
    /// # Errors
    /// If `contents` is not valid TOML or has fields of the wrong type.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render the configuration as TOML, in the form [`ReportConfig::from_toml_str`] reads
    ///
    /// # Errors
    /// If serialisation fails.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Write the configuration to a TOML file, replacing it if present
    ///
    /// # Errors
    /// If serialisation or writing fails.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        tracing::debug!(path = %path.display(), "saved report configuration");
        Ok(())
    }

    /// Read a configuration from a TOML file on disk
    ///
    /// # Errors
    /// If the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded report configuration");
        Ok(config)
    }
}
