//! The staged day loop's shared state and plugin-function plumbing.
//!
//! Each day runs six [`Stage`]s in a fixed order. For every stage the engine
//! queries four plugin kinds (mover, iterator, mixer, extractor) in that
//! fixed order and runs whatever kernels each one returns for that stage
//! against the same [`StageContext`].

use std::sync::Arc;

use rand_chacha::ChaCha12Rng;

use crate::error::RuntimeError;
use crate::infections::Infections;
use crate::network::{Demographics, Network, Networks};
use crate::population::Population;
use crate::seeds::SeedEvent;

/// One of the six phases of a simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Initialise,
    Setup,
    Foi,
    Infect,
    Analyse,
    Finalise,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Initialise,
        Stage::Setup,
        Stage::Foi,
        Stage::Infect,
        Stage::Analyse,
        Stage::Finalise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initialise => "initialise",
            Stage::Setup => "setup",
            Stage::Foi => "foi",
            Stage::Infect => "infect",
            Stage::Analyse => "analyse",
            Stage::Finalise => "finalise",
        }
    }
}

/// The network(s) being simulated: a bare [`Network`] for single-demographic
/// runs, or a full [`Networks`] once two or more demographics are in play.
#[derive(Debug, Clone)]
pub enum Model {
    Single(Network),
    Multi(Networks),
}

impl Model {
    pub fn network_count(&self) -> usize {
        match self {
            Model::Single(_) => 1,
            Model::Multi(networks) => networks.subnets.len(),
        }
    }

    pub fn network(&self, idx: usize) -> &Network {
        match self {
            Model::Single(network) => {
                debug_assert_eq!(idx, 0);
                network
            }
            Model::Multi(networks) => &networks.subnets[idx],
        }
    }

    pub fn network_mut(&mut self, idx: usize) -> &mut Network {
        match self {
            Model::Single(network) => {
                debug_assert_eq!(idx, 0);
                network
            }
            Model::Multi(networks) => &mut networks.subnets[idx],
        }
    }

    pub fn overall(&self) -> &Network {
        match self {
            Model::Single(network) => network,
            Model::Multi(networks) => &networks.overall,
        }
    }

    pub fn overall_mut(&mut self) -> &mut Network {
        match self {
            Model::Single(network) => network,
            Model::Multi(networks) => &mut networks.overall,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Model::Multi(_))
    }

    pub fn demographics(&self) -> Option<&Demographics> {
        match self {
            Model::Single(_) => None,
            Model::Multi(networks) => Some(&networks.demographics),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Model::Single(network) => network.reset(),
            Model::Multi(networks) => networks.reset(),
        }
    }

    pub fn assert_sane(&self) -> Result<(), RuntimeError> {
        match self {
            Model::Single(_) => Ok(()),
            Model::Multi(networks) => networks.assert_sane(),
        }
    }
}

/// The shared, mutable state every kernel reads and writes. One instance is
/// threaded through the whole day loop, stage by stage.
pub struct StageContext {
    pub model: Model,
    pub infections: Infections,
    pub population: Population,
    pub rngs: Vec<ChaCha12Rng>,
    pub nthreads: usize,
    pub day: u32,
    pub stage: Stage,
    /// Per-ward (or per-subnet-ward) force of infection, recomputed fresh
    /// every `foi` stage before `infect` converts it into a probability.
    pub ward_foi: Vec<Vec<f64>>,
    /// Per-ward (or per-subnet-ward) infection probability, derived from
    /// `ward_foi` at the start of `infect`.
    pub infect_prob: Vec<Vec<f64>>,
    /// Scripted seed events for the whole run, loaded once before day 0 and
    /// filtered by day each time the `infect` stage's `advance_additional`
    /// kernel runs.
    pub seed_events: Vec<SeedEvent>,
    pub stop: bool,
}

impl StageContext {
    pub fn new(model: Model, infections: Infections, rngs: Vec<ChaCha12Rng>, nthreads: usize) -> Self {
        let n_inf_classes = infections.n_inf_classes();
        let network_count = model.network_count();
        let nnodes = model.overall().nnodes as usize;
        StageContext {
            model,
            infections,
            population: Population::new(0, n_inf_classes),
            rngs,
            nthreads,
            day: 0,
            stage: Stage::Initialise,
            ward_foi: vec![vec![0.0; nnodes + 1]; network_count],
            infect_prob: vec![vec![0.0; nnodes + 1]; network_count],
            seed_events: Vec::new(),
            stop: false,
        }
    }

    pub fn network_count(&self) -> usize {
        self.model.network_count()
    }
}

/// A single stage-loop kernel: a plain function (or closure, for
/// user-registered plugins) that mutates [`StageContext`] in place.
pub type KernelFn = Arc<dyn Fn(&mut StageContext) -> Result<(), RuntimeError> + Send + Sync>;

/// One of the four plugin kinds (mover, iterator, mixer, extractor): given a
/// stage, returns the ordered list of kernels to run for it.
pub trait FunctionProvider: Send + Sync {
    fn functions_for(&self, stage: Stage) -> Vec<KernelFn>;
}

/// Compose the four plugin kinds for one stage, in the engine's fixed order:
/// `mover ++ iterator ++ mixer ++ extractor`.
pub fn compose_functions(
    stage: Stage,
    mover: &dyn FunctionProvider,
    iterator: &dyn FunctionProvider,
    mixer: &dyn FunctionProvider,
    extractor: &dyn FunctionProvider,
) -> Vec<KernelFn> {
    let mut funcs = mover.functions_for(stage);
    funcs.extend(iterator.functions_for(stage));
    funcs.extend(mixer.functions_for(stage));
    funcs.extend(extractor.functions_for(stage));
    funcs
}

pub fn kernel(f: fn(&mut StageContext) -> Result<(), RuntimeError>) -> KernelFn {
    Arc::new(f)
}
