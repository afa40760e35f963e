//! Demographic mixer: merges each subnet's local FOI into a shared effective
//! FOI before `infect`. A no-op for single-demographic runs.

use crate::error::RuntimeError;
use crate::stage::{kernel, FunctionProvider, KernelFn, Stage, StageContext};

/// Sum per-subnet FOI weighted by each demographic's interaction weight,
/// then write the merged value back into every subnet's FOI array. Runs
/// once per day, at the start of `foi`'s mixer slot (after the iterator has
/// already recomputed each subnet's local contribution).
pub fn merge_core(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    if !ctx.model.is_multi() {
        return Ok(());
    }
    let Some(demographics) = ctx.model.demographics() else {
        return Ok(());
    };
    let weights: Vec<f64> = demographics.iter().map(|d| d.adjustment).collect();

    let nnodes = ctx.ward_foi[0].len();
    let mut merged = vec![0.0f64; nnodes];
    for (net_idx, weight) in weights.iter().enumerate() {
        for (node_idx, &foi) in ctx.ward_foi[net_idx].iter().enumerate() {
            merged[node_idx] += foi * weight;
        }
    }

    for foi in ctx.ward_foi.iter_mut() {
        foi.copy_from_slice(&merged);
    }
    Ok(())
}

/// The bundled mixer. Always runs `merge_core` for `foi`; custom mixers are
/// expected to wrap this provider rather than bypass it, per the rule that
/// the core always prepends the default merge unless a custom list already
/// contains it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMixer;

impl FunctionProvider for DefaultMixer {
    fn functions_for(&self, stage: Stage) -> Vec<KernelFn> {
        match stage {
            Stage::Foi => vec![kernel(merge_core)],
            _ => vec![],
        }
    }
}
