//! Extractor: tallies the day's [`Population`] counters from the current
//! infection state. Custom extractors can additionally set `ctx.stop` to
//! signal early termination.

use crate::error::RuntimeError;
use crate::population::Population;
use crate::stage::{kernel, FunctionProvider, KernelFn, Stage, StageContext};

/// Sum infections across every stage (and, for multi-demographic runs,
/// every subnet) into `ctx.population` for the current day.
pub fn analyse(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    let n_classes = ctx.infections.n_inf_classes();
    let mut stage_totals = vec![0i64; n_classes];

    if ctx.infections.sub_works.is_empty() {
        for (stage_idx, stage) in ctx.infections.work.iter().enumerate() {
            stage_totals[stage_idx] += stage.iter().map(|&x| x as i64).sum::<i64>();
        }
        for (stage_idx, stage) in ctx.infections.play.iter().enumerate() {
            stage_totals[stage_idx] += stage.iter().map(|&x| x as i64).sum::<i64>();
        }
    } else {
        for sub in &ctx.infections.sub_works {
            for (stage_idx, stage) in sub.iter().enumerate() {
                stage_totals[stage_idx] += stage.iter().map(|&x| x as i64).sum::<i64>();
            }
        }
        for sub in &ctx.infections.sub_plays {
            for (stage_idx, stage) in sub.iter().enumerate() {
                stage_totals[stage_idx] += stage.iter().map(|&x| x as i64).sum::<i64>();
            }
        }
    }

    let removed: i64 = if ctx.infections.sub_work_removed.is_empty() {
        ctx.infections.work_removed.iter().map(|&x| x as i64).sum::<i64>()
            + ctx.infections.play_removed.iter().map(|&x| x as i64).sum::<i64>()
    } else {
        ctx.infections
            .sub_work_removed
            .iter()
            .flatten()
            .map(|&x| x as i64)
            .sum::<i64>()
            + ctx.infections
                .sub_play_removed
                .iter()
                .flatten()
                .map(|&x| x as i64)
                .sum::<i64>()
    };

    let (work_suscept, play_suscept): (i64, i64) = {
        let mut w = 0i64;
        let mut p = 0i64;
        for idx in 0..ctx.network_count() {
            let net = ctx.model.network(idx);
            w += net.to_links.iter().map(|l| l.suscept as i64).sum::<i64>();
            p += net.nodes.iter().map(|n| n.play_suscept.round() as i64).sum::<i64>();
        }
        (w, p)
    };

    let mut population = Population::new(ctx.day, n_classes);
    population.susceptibles = work_suscept + play_suscept;
    population.latent = stage_totals[0];
    for stage_idx in 1..n_classes {
        population.infected[stage_idx - 1] = stage_totals[stage_idx];
    }
    population.removed = removed;
    ctx.population = population;

    Ok(())
}

/// Signal termination once total infected (latent + every infectious stage)
/// reaches zero. Registered for `analyse` alongside `analyse` itself.
pub fn stop_when_burned_out(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    if ctx.population.total_infected() == 0 && ctx.infections.total_infected() == 0 {
        ctx.stop = true;
    }
    Ok(())
}

/// The bundled extractor: tallies `Population`, then checks for burnout.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl FunctionProvider for DefaultExtractor {
    fn functions_for(&self, stage: Stage) -> Vec<KernelFn> {
        match stage {
            Stage::Analyse => vec![kernel(analyse), kernel(stop_when_burned_out)],
            _ => vec![],
        }
    }
}
