//! Disease progression parameters: per-stage transmission and progression
//! coefficients, loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A disease's per-stage coefficients. All four arrays share one length,
/// `N_INF_CLASSES`; stage 0 is the newly-infected/latent compartment, the
/// last stage is recovered/removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub beta: Vec<f64>,
    pub progress: Vec<f64>,
    pub too_ill_to_move: Vec<f64>,
    pub contrib_foi: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, rename = "author(s)", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, rename = "contact(s)", skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, rename = "reference(s)", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Disease {
    pub fn n_inf_classes(&self) -> usize {
        self.beta.len()
    }

    /// Check that all four per-stage arrays share a length. Called
    /// automatically by [`Disease::load`]; callers that build a `Disease` by
    /// hand should call it too before handing it to [`crate::network::Network::compile`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.beta.len();
        for (field, len) in [
            ("progress", self.progress.len()),
            ("too_ill_to_move", self.too_ill_to_move.len()),
            ("contrib_foi", self.contrib_foi.len()),
        ] {
            if len != n {
                return Err(ConfigError::LengthMismatch {
                    field,
                    expected: n,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let disease: Disease = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        disease.validate()?;
        Ok(disease)
    }
}
