//! The per-day scalar summary tallied by the default `analyse` stage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Population counts for a single simulated day, as tallied by
/// [`crate::extract::analyse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub susceptibles: i64,
    pub latent: i64,
    pub infected: Vec<i64>,
    pub removed: i64,
}

impl Population {
    pub fn new(day: u32, n_inf_classes: usize) -> Self {
        Self {
            day,
            date: None,
            susceptibles: 0,
            latent: 0,
            infected: vec![0; n_inf_classes.saturating_sub(1)],
            removed: 0,
        }
    }

    pub fn total(&self) -> i64 {
        self.susceptibles + self.latent + self.infected.iter().sum::<i64>() + self.removed
    }

    pub fn total_infected(&self) -> i64 {
        self.latent + self.infected.iter().sum::<i64>()
    }
}
