//! Multi-demographic networks: one [`Network`] per demographic, all sharing
//! node identity with a shared "overall" network, coupled through FOI.

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, TopologyError};
use crate::network::compiled::Network;

/// One population stratum: its FOI interaction weight, and the fraction of
/// each ward's work/play population assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographic {
    pub name: String,
    /// Interaction weight applied to this demographic's FOI contribution by
    /// the default mixer ([`crate::mix::merge_core`]).
    pub adjustment: f64,
    pub work_ratio: f64,
    pub play_ratio: f64,
}

/// An ordered list of [`Demographic`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Demographics(Vec<Demographic>);

impl Demographics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, demographic: Demographic) {
        self.0.push(demographic);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Demographic> {
        self.0.iter()
    }
}

/// An overall network plus one specialised subnet per demographic. Subnet
/// populations are split from the overall network so that, for every link
/// and every node, summing across subnets reproduces the overall value
/// exactly (the last demographic absorbs any rounding remainder).
#[derive(Debug, Clone)]
pub struct Networks {
    pub overall: Network,
    pub subnets: Vec<Network>,
    pub demographics: Demographics,
}

impl Networks {
    pub fn build(overall: Network, demographics: Demographics) -> Result<Networks, TopologyError> {
        if demographics.len() < 2 {
            return Err(TopologyError::InsufficientDemographics { count: demographics.len() });
        }
        let ndemo = demographics.len();
        let mut subnets: Vec<Network> = (0..ndemo).map(|_| overall.clone()).collect();

        for link_idx in 1..=overall.nlinks as usize {
            let total = overall.to_links[link_idx].weight;
            let mut assigned = 0u32;
            for (i, demo) in demographics.iter().enumerate() {
                let share = if i + 1 == ndemo {
                    total - assigned
                } else {
                    let s = (((total as f64) * demo.work_ratio).round() as u32).min(total - assigned);
                    assigned += s;
                    s
                };
                subnets[i].to_links[link_idx].weight = share;
                subnets[i].to_links[link_idx].suscept = share;
            }
        }

        for node_idx in 1..=overall.nnodes as usize {
            let total = overall.nodes[node_idx].play_suscept;
            let mut assigned = 0.0f64;
            for (i, demo) in demographics.iter().enumerate() {
                let share = if i + 1 == ndemo {
                    total - assigned
                } else {
                    let s = total * demo.play_ratio;
                    assigned += s;
                    s
                };
                subnets[i].nodes[node_idx].play_suscept = share;
                subnets[i].nodes[node_idx].save_play_suscept = share;
            }
        }

        Ok(Networks {
            overall,
            subnets,
            demographics,
        })
    }

    pub fn params(&self) -> &crate::parameters::Parameters {
        &self.overall.params
    }

    pub fn reset(&mut self) {
        self.overall.reset();
        for subnet in &mut self.subnets {
            subnet.reset();
        }
    }

    /// Invariant: summing each link's/node's value across subnets reproduces
    /// the overall network's value (§8 invariants 4 and 5's subnet form).
    pub fn assert_sane(&self) -> Result<(), RuntimeError> {
        for link_idx in 1..=self.overall.nlinks as usize {
            let expected = self.overall.to_links[link_idx].weight as i64;
            let actual: i64 = self.subnets.iter().map(|n| n.to_links[link_idx].weight as i64).sum();
            if actual != expected {
                return Err(RuntimeError::SubnetPopulationMismatch {
                    node: link_idx as u32,
                    expected,
                    actual,
                });
            }
        }
        for node_idx in 1..=self.overall.nnodes as usize {
            let expected = self.overall.nodes[node_idx].play_suscept;
            let actual: f64 = self.subnets.iter().map(|n| n.nodes[node_idx].play_suscept).sum();
            if (expected - actual).abs() > 1e-6 {
                return Err(RuntimeError::SubnetPopulationMismatch {
                    node: node_idx as u32,
                    expected: expected.round() as i64,
                    actual: actual.round() as i64,
                });
            }
        }
        Ok(())
    }
}
