//! Scalar model parameters, loaded from JSON, plus the named-override
//! mechanism ([`Parameters::with_overrides`]) used by variable sweeps.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::disease::Disease;
use crate::error::ConfigError;
use crate::variables::VariableSet;

/// Scalar knobs controlling disease spread and movement, plus the disease
/// itself and any configured seed files. Loaded once from JSON and then
/// specialised per run via [`Parameters::with_overrides`], which never
/// mutates the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    pub length_day: f64,
    pub plength_day: f64,
    pub initial_inf: u32,
    pub static_play_at_home: f64,
    pub dyn_play_at_home: f64,
    pub data_dist_cutoff: f64,
    pub dyn_dist_cutoff: f64,
    pub play_to_work: f64,
    pub work_to_play: f64,
    pub local_vaccination_threshold: f64,
    pub global_detection_threshold: f64,
    pub daily_ward_vaccination_capacity: f64,
    pub neighbour_weight_threshold: f64,
    pub daily_imports: f64,
    #[serde(rename = "UV")]
    pub uv: f64,

    #[serde(default)]
    pub input_files: Vec<String>,
    pub disease_params: Disease,
    #[serde(default)]
    pub additional_seeds: Vec<String>,

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

impl Parameters {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params: Parameters = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        params.disease_params.validate()?;
        Ok(params)
    }

    pub fn set_input_files(&mut self, files: Vec<String>) {
        self.input_files = files;
    }

    pub fn set_disease(&mut self, disease: Disease) {
        self.disease_params = disease;
    }

    /// Return a copy with every named field in `overrides` substituted.
    /// Names are either a bare scalar field (`length_day`) or an indexed
    /// disease array slot (`beta[2]`). Unknown names are an error, not a
    /// silent no-op, since a sweep file typo should fail loudly.
    pub fn with_overrides(&self, overrides: &VariableSet) -> Result<Parameters, ConfigError> {
        let mut out = self.clone();
        for (name, value) in overrides.iter() {
            apply_override(&mut out, name, value)?;
        }
        Ok(out)
    }
}

fn apply_override(params: &mut Parameters, name: &str, value: f64) -> Result<(), ConfigError> {
    if let Some((field, index)) = parse_indexed(name) {
        let array = match field {
            "beta" => &mut params.disease_params.beta,
            "progress" => &mut params.disease_params.progress,
            "too_ill_to_move" => &mut params.disease_params.too_ill_to_move,
            "contrib_foi" => &mut params.disease_params.contrib_foi,
            _ => return Err(ConfigError::MissingField(leak(name))),
        };
        let slot = array.get_mut(index).ok_or(ConfigError::OutOfRange {
            field: leak(name),
            value: index as f64,
        })?;
        *slot = value;
        return Ok(());
    }

    match name {
        "length_day" => params.length_day = value,
        "plength_day" => params.plength_day = value,
        "initial_inf" => params.initial_inf = value as u32,
        "static_play_at_home" => params.static_play_at_home = value,
        "dyn_play_at_home" => params.dyn_play_at_home = value,
        "data_dist_cutoff" => params.data_dist_cutoff = value,
        "dyn_dist_cutoff" => params.dyn_dist_cutoff = value,
        "play_to_work" => params.play_to_work = value,
        "work_to_play" => params.work_to_play = value,
        "local_vaccination_threshold" => params.local_vaccination_threshold = value,
        "global_detection_threshold" => params.global_detection_threshold = value,
        "daily_ward_vaccination_capacity" => params.daily_ward_vaccination_capacity = value,
        "neighbour_weight_threshold" => params.neighbour_weight_threshold = value,
        "daily_imports" => params.daily_imports = value,
        "UV" => params.uv = value,
        _ => return Err(ConfigError::MissingField(leak(name))),
    }
    Ok(())
}

/// Parse `"beta[2]"` into `("beta", 2)`. Plain scalar names (no brackets)
/// return `None`.
fn parse_indexed(name: &str) -> Option<(&str, usize)> {
    let open = name.find('[')?;
    let close = name.find(']')?;
    if close < open {
        return None;
    }
    let field = &name[..open];
    let index: usize = name[open + 1..close].parse().ok()?;
    Some((field, index))
}

/// `MissingField`/`OutOfRange` carry `&'static str`; override names only ever
/// come from a small, fixed set of known identifiers, so leaking the handful
/// of distinct unknown-name strings seen in a process's lifetime is bounded
/// and not worth threading an owned-string error variant through for.
fn leak(name: &str) -> &'static str {
    Box::leak(name.to_string().into_boxed_str())
}

/// Minimal valid `Parameters` for other modules' tests.
#[cfg(test)]
pub(crate) mod tests_support {
    use super::Parameters;
    use crate::disease::Disease;

    pub fn sample() -> Parameters {
        Parameters {
            length_day: 1.0,
            plength_day: 1.0,
            initial_inf: 1,
            static_play_at_home: 0.0,
            dyn_play_at_home: 0.0,
            data_dist_cutoff: 10000.0,
            dyn_dist_cutoff: 10000.0,
            play_to_work: 0.0,
            work_to_play: 0.0,
            local_vaccination_threshold: 0.0,
            global_detection_threshold: 0.0,
            daily_ward_vaccination_capacity: 0.0,
            neighbour_weight_threshold: 0.0,
            daily_imports: 0.0,
            uv: 1.0,
            input_files: vec![],
            disease_params: Disease {
                beta: vec![0.0, 0.5, 0.5, 0.0],
                progress: vec![1.0, 0.5, 0.5, 0.0],
                too_ill_to_move: vec![0.0, 0.0, 1.0, 1.0],
                contrib_foi: vec![0.0, 1.0, 1.0, 0.0],
                name: Some("ncov".to_string()),
                version: None,
                author: None,
                contact: None,
                reference: None,
            },
            additional_seeds: vec![],
            name: None,
            version: None,
            author: None,
            contact: None,
            reference: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::Disease;

    fn sample() -> Parameters {
        Parameters {
            length_day: 1.0,
            plength_day: 1.0,
            initial_inf: 5,
            static_play_at_home: 0.0,
            dyn_play_at_home: 0.0,
            data_dist_cutoff: 10000.0,
            dyn_dist_cutoff: 10000.0,
            play_to_work: 0.0,
            work_to_play: 0.0,
            local_vaccination_threshold: 0.0,
            global_detection_threshold: 0.0,
            daily_ward_vaccination_capacity: 0.0,
            neighbour_weight_threshold: 0.0,
            daily_imports: 0.0,
            uv: 1.0,
            input_files: vec![],
            disease_params: Disease {
                beta: vec![0.0, 0.5, 0.5, 0.0],
                progress: vec![1.0, 0.5, 0.5, 0.0],
                too_ill_to_move: vec![0.0, 0.0, 1.0, 1.0],
                contrib_foi: vec![0.0, 1.0, 1.0, 0.0],
                name: Some("ncov".to_string()),
                version: None,
                author: None,
                contact: None,
                reference: None,
            },
            additional_seeds: vec![],
            name: None,
            version: None,
            author: None,
            contact: None,
            reference: None,
        }
    }

    #[test]
    fn with_overrides_substitutes_indexed_disease_fields_only() {
        let base = sample();
        let mut overrides = VariableSet::new();
        overrides.insert("beta[2]", 0.95);
        overrides.insert("progress[1]", 0.19);

        let updated = base.with_overrides(&overrides).unwrap();
        assert_eq!(updated.disease_params.beta[2], 0.95);
        assert_eq!(updated.disease_params.progress[1], 0.19);
        assert_eq!(updated.disease_params.beta[1], 0.5);
        assert_eq!(base.disease_params.beta[2], 0.5);
    }

    #[test]
    fn with_overrides_substitutes_scalar_fields() {
        let base = sample();
        let mut overrides = VariableSet::new();
        overrides.insert("UV", 0.8);
        let updated = base.with_overrides(&overrides).unwrap();
        assert_eq!(updated.uv, 0.8);
        assert_eq!(base.uv, 1.0);
    }

    #[test]
    fn with_overrides_rejects_unknown_name() {
        let base = sample();
        let mut overrides = VariableSet::new();
        overrides.insert("not_a_real_field", 1.0);
        assert!(base.with_overrides(&overrides).is_err());
    }
}
