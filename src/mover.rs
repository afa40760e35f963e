//! Mover: transfers population counts between subnetwork slots of the same
//! ward between stages (e.g. "go to weekend", "go home").

use crate::error::RuntimeError;
use crate::stage::{kernel, FunctionProvider, KernelFn, Model, Stage, StageContext};

/// How much of a move to apply: an exact headcount, or a fraction of the
/// source slot's current population at that ward/link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveAmount {
    Count(u32),
    Fraction(f64),
}

/// A single scheduled population transfer between two demographic subnets
/// of the same ward, applied at a chosen stage.
#[derive(Debug, Clone)]
pub struct Move {
    pub from_demographic: usize,
    pub to_demographic: usize,
    pub ward: u32,
    pub amount: MoveAmount,
    pub stage: Stage,
}

impl Move {
    fn resolve_count(&self, current: f64) -> u32 {
        match self.amount {
            MoveAmount::Count(n) => (n as f64).min(current) as u32,
            MoveAmount::Fraction(f) => (current * f.clamp(0.0, 1.0)).round() as u32,
        }
    }

    /// Move `self`'s play-susceptible share between two subnets, leaving the
    /// ward's total population (summed across subnets) unchanged.
    fn apply(&self, ctx: &mut StageContext) {
        if !ctx.model.is_multi() || self.from_demographic == self.to_demographic {
            return;
        }
        let node = self.ward as usize;
        let from_suscept = ctx.model.network(self.from_demographic).nodes[node].play_suscept;
        let n = self.resolve_count(from_suscept) as f64;
        if n <= 0.0 {
            return;
        }
        ctx.model.network_mut(self.from_demographic).nodes[node].play_suscept -= n;
        ctx.model.network_mut(self.to_demographic).nodes[node].play_suscept += n;
    }
}

/// A caller-supplied schedule of moves, run at the stage each one names.
#[derive(Debug, Clone, Default)]
pub struct MoveSchedule {
    pub moves: Vec<Move>,
}

/// The bundled mover. With no schedule it contributes nothing; with a
/// schedule it applies every move whose `stage` matches.
#[derive(Clone, Default)]
pub struct DefaultMover {
    schedule: MoveSchedule,
}

impl DefaultMover {
    pub fn new(schedule: MoveSchedule) -> Self {
        Self { schedule }
    }

    fn run(&self, ctx: &mut StageContext, stage: Stage) -> Result<(), RuntimeError> {
        for mv in self.schedule.moves.iter().filter(|m| m.stage == stage) {
            mv.apply(ctx);
        }
        Ok(())
    }
}

impl FunctionProvider for DefaultMover {
    fn functions_for(&self, stage: Stage) -> Vec<KernelFn> {
        if self.schedule.moves.is_empty() {
            return vec![];
        }
        let schedule = self.schedule.clone();
        let stage_copy = stage;
        vec![std::sync::Arc::new(move |ctx: &mut StageContext| {
            DefaultMover { schedule: schedule.clone() }.run(ctx, stage_copy)
        })]
    }
}

/// Verify that every ward's total population, summed across demographic
/// subnets *and* whatever has moved into that subnet's infection counters,
/// still matches the overall network — run at the end of `setup` once
/// movers for the day have been applied.
///
/// A bare [`Model::assert_sane`] compares only the subnets' current
/// `suscept`/`play_suscept` against the (never-mutated) overall network, which
/// holds only before the first infection: once individuals progress out of
/// `suscept` into an infection-stage counter, the static overall no longer
/// equals the shrunk `suscept` alone. Folding each subnet's infection and
/// removed counts back in restores the true per-ward total.
pub fn assert_population_conserved(ctx: &StageContext) -> Result<(), RuntimeError> {
    let Model::Multi(networks) = &ctx.model else {
        return Ok(());
    };
    if !ctx.infections.is_multi() {
        return networks.assert_sane();
    }

    for link_idx in 1..=networks.overall.nlinks as usize {
        let expected = networks.overall.to_links[link_idx].weight as i64;
        let mut actual = 0i64;
        for (sub_idx, subnet) in networks.subnets.iter().enumerate() {
            actual += subnet.to_links[link_idx].suscept as i64;
            actual += ctx.infections.sub_works[sub_idx]
                .iter()
                .map(|stage| stage[link_idx] as i64)
                .sum::<i64>();
            actual += ctx.infections.sub_work_removed[sub_idx][link_idx] as i64;
        }
        if actual != expected {
            return Err(RuntimeError::SubnetPopulationMismatch {
                node: link_idx as u32,
                expected,
                actual,
            });
        }
    }

    for node_idx in 1..=networks.overall.nnodes as usize {
        let expected = networks.overall.nodes[node_idx].play_suscept;
        let mut actual = 0.0f64;
        for (sub_idx, subnet) in networks.subnets.iter().enumerate() {
            actual += subnet.nodes[node_idx].play_suscept;
            actual += ctx.infections.sub_plays[sub_idx]
                .iter()
                .map(|stage| stage[node_idx] as f64)
                .sum::<f64>();
            actual += ctx.infections.sub_play_removed[sub_idx][node_idx] as f64;
        }
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

pub fn check_conservation_kernel(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    assert_population_conserved(ctx)
}

pub fn conservation_check() -> KernelFn {
    kernel(check_conservation_kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infections::Infections;
    use crate::network::{Demographic, Demographics, Network, Networks};
    use crate::parameters::tests_support::sample;
    use crate::stage::Model;
    use crate::ward::{Ward, Wards};

    fn two_demographic_model() -> Model {
        let mut wards = Wards::new();
        wards.insert(Ward::new().with_id(1).unwrap().with_num_players(1000)).unwrap();
        wards.resolve().unwrap();
        let overall = Network::compile(&wards, sample(), 1).unwrap();

        let mut demographics = Demographics::new();
        demographics.push(Demographic { name: "a".into(), adjustment: 1.0, work_ratio: 0.5, play_ratio: 0.5 });
        demographics.push(Demographic { name: "b".into(), adjustment: 1.0, work_ratio: 0.5, play_ratio: 0.5 });
        Model::Multi(Networks::build(overall, demographics).unwrap())
    }

    #[test]
    fn move_transfers_population_and_conserves_ward_total() {
        let model = two_demographic_model();
        let infections = match &model {
            Model::Multi(n) => Infections::build_for_networks(n),
            _ => unreachable!(),
        };
        let mut ctx = StageContext::new(model, infections, vec![], 1);

        let before_a = ctx.model.network(0).nodes[1].play_suscept;
        let before_b = ctx.model.network(1).nodes[1].play_suscept;

        let mv = Move {
            from_demographic: 0,
            to_demographic: 1,
            ward: 1,
            amount: MoveAmount::Count(100),
            stage: Stage::Setup,
        };
        mv.apply(&mut ctx);

        let after_a = ctx.model.network(0).nodes[1].play_suscept;
        let after_b = ctx.model.network(1).nodes[1].play_suscept;
        assert!((after_a - (before_a - 100.0)).abs() < 1e-9);
        assert!((after_b - (before_b + 100.0)).abs() < 1e-9);
        assert!(((after_a + after_b) - (before_a + before_b)).abs() < 1e-9);
    }

    #[test]
    fn conservation_check_passes_for_untouched_model() {
        let model = two_demographic_model();
        let infections = match &model {
            Model::Multi(n) => Infections::build_for_networks(n),
            _ => unreachable!(),
        };
        let mut ctx = StageContext::new(model, infections, vec![], 1);
        assert!(check_conservation_kernel(&mut ctx).is_ok());
    }

    #[test]
    fn default_mover_with_empty_schedule_contributes_no_kernels() {
        let mover = DefaultMover::default();
        assert!(mover.functions_for(Stage::Setup).is_empty());
    }

    #[test]
    fn conservation_check_accounts_for_population_moved_into_infection_counters() {
        let model = two_demographic_model();
        let mut infections = match &model {
            Model::Multi(n) => Infections::build_for_networks(n),
            _ => unreachable!(),
        };
        // Move 40 individuals from subnet 0's play_suscept into its stage-0
        // infection counter, as `advance_play` would during `infect`.
        infections.sub_plays[0][0][1] = 40;
        let mut ctx = StageContext::new(model, infections, vec![], 1);
        ctx.model.network_mut(0).nodes[1].play_suscept -= 40.0;

        assert!(check_conservation_kernel(&mut ctx).is_ok());
    }
}
