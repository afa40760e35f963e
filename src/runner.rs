//! The staged day loop: wires mover, iterator, mixer, and extractor plugins
//! together and drives the simulation to completion.

use tracing::info;

use crate::error::RuntimeError;
use crate::extract::DefaultExtractor;
use crate::iterate::DefaultIterator;
use crate::mix::DefaultMixer;
use crate::mover::{conservation_check, DefaultMover};
use crate::stage::{compose_functions, FunctionProvider, Stage, StageContext};

/// One full model run: the plugin set plus a step budget.
pub struct Simulation {
    pub mover: Box<dyn FunctionProvider>,
    pub iterator: Box<dyn FunctionProvider>,
    pub mixer: Box<dyn FunctionProvider>,
    pub extractor: Box<dyn FunctionProvider>,
    pub nsteps: u32,
}

impl Simulation {
    /// A run with every plugin kind set to its bundled default.
    pub fn with_defaults(nsteps: u32) -> Self {
        Self {
            mover: Box::new(DefaultMover::default()),
            iterator: Box::new(DefaultIterator),
            mixer: Box::new(DefaultMixer),
            extractor: Box::new(DefaultExtractor),
            nsteps,
        }
    }

    /// Run every stage of `funcs(stage)` in order against `ctx`.
    fn run_stage(&self, ctx: &mut StageContext, stage: Stage) -> Result<(), RuntimeError> {
        ctx.stage = stage;
        let funcs = compose_functions(
            stage,
            self.mover.as_ref(),
            self.iterator.as_ref(),
            self.mixer.as_ref(),
            self.extractor.as_ref(),
        );
        for f in funcs {
            f(ctx)?;
        }
        Ok(())
    }

    /// Drive `ctx` through the full day loop: `initialise` once, then
    /// `setup`/`foi`/`infect`/`analyse` each day until `nsteps` is reached,
    /// total infections hit zero, or an extractor sets `ctx.stop`, then
    /// `finalise` once.
    pub fn run(&self, ctx: &mut StageContext) -> Result<(), RuntimeError> {
        self.run_stage(ctx, Stage::Initialise)?;

        for day in 0..self.nsteps {
            ctx.day = day;
            self.run_stage(ctx, Stage::Setup)?;
            conservation_check()(ctx)?;
            self.run_stage(ctx, Stage::Foi)?;
            self.run_stage(ctx, Stage::Infect)?;
            self.run_stage(ctx, Stage::Analyse)?;

            info!(
                day,
                susceptibles = ctx.population.susceptibles,
                latent = ctx.population.latent,
                total_infected = ctx.population.total_infected(),
                removed = ctx.population.removed,
                "day complete"
            );

            if ctx.stop {
                info!(day, "extractor requested early termination");
                break;
            }
            if ctx.population.total_infected() == 0 && ctx.infections.total_infected() == 0 {
                info!(day, "no infections remain; ending run");
                break;
            }
        }

        self.run_stage(ctx, Stage::Finalise)
    }
}
