//! The bundled iterator: progresses disease stages, recomputes FOI, and
//! samples new infections every day. See [`kernels`] for the individual
//! functions and [`DefaultIterator`] for how they're assigned to stages.

mod kernels;

pub use kernels::{
    advance_additional, advance_fixed, advance_infprob, advance_play, advance_progress,
    advance_recovery, recalculate_foi,
};

use crate::stage::{kernel, FunctionProvider, KernelFn, Stage};

/// The bundled iterator. Runs disease progression in `setup`, recomputes
/// force of infection in `foi`, then samples new infections and applies
/// scripted seeds in `infect`, in that order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIterator;

impl FunctionProvider for DefaultIterator {
    fn functions_for(&self, stage: Stage) -> Vec<KernelFn> {
        match stage {
            Stage::Setup => vec![kernel(advance_progress)],
            Stage::Foi => vec![kernel(recalculate_foi)],
            Stage::Infect => vec![
                kernel(advance_recovery),
                kernel(advance_infprob),
                kernel(advance_fixed),
                kernel(advance_play),
                kernel(advance_additional),
            ],
            Stage::Initialise | Stage::Analyse | Stage::Finalise => vec![],
        }
    }
}
