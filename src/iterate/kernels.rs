//! Default infection/progression/FOI kernels, run by [`super::DefaultIterator`].

use crate::error::RuntimeError;
use crate::rng::ran_binomial;
use crate::stage::{Model, StageContext};

/// Progress the last infected stage into the removed bucket. Run first in
/// the `infect` stage so the rest of the day's kernels see this day's
/// removals already applied.
pub fn advance_recovery(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    let last = ctx.infections.n_inf_classes() - 1;
    for net_idx in 0..ctx.network_count() {
        let progress_last = ctx.model.network(net_idx).params.disease_params.progress[last];
        let link_ranges = ctx.model.network(net_idx).nlinks_by_thread.clone();
        let node_ranges = ctx.model.network(net_idx).nnodes_by_thread.clone();

        let (work_arr, work_removed) = if ctx.infections.sub_works.is_empty() {
            (&mut ctx.infections.work, &mut ctx.infections.work_removed)
        } else {
            (&mut ctx.infections.sub_works[net_idx], &mut ctx.infections.sub_work_removed[net_idx])
        };
        let last_work = &mut work_arr[last];
        for (thread_idx, range) in link_ranges.iter().enumerate() {
            let rng = &mut ctx.rngs[thread_idx];
            for idx in range.start as usize..range.end as usize {
                let n = last_work[idx];
                if n == 0 {
                    continue;
                }
                let m = ran_binomial(rng, progress_last, n as u64) as u32;
                last_work[idx] -= m;
                work_removed[idx] += m;
            }
        }

        let (play_arr, play_removed) = if ctx.infections.sub_plays.is_empty() {
            (&mut ctx.infections.play, &mut ctx.infections.play_removed)
        } else {
            (&mut ctx.infections.sub_plays[net_idx], &mut ctx.infections.sub_play_removed[net_idx])
        };
        let last_play = &mut play_arr[last];
        for (thread_idx, range) in node_ranges.iter().enumerate() {
            let rng = &mut ctx.rngs[thread_idx];
            for idx in range.start as usize..range.end as usize {
                let n = last_play[idx];
                if n == 0 {
                    continue;
                }
                let m = ran_binomial(rng, progress_last, n as u64) as u32;
                last_play[idx] -= m;
                play_removed[idx] += m;
            }
        }
    }
    Ok(())
}

/// Progress every stage but the last, highest stage first, so a cohort
/// cannot cascade through more than one stage in a single day.
pub fn advance_progress(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    let n_classes = ctx.infections.n_inf_classes();
    for net_idx in 0..ctx.network_count() {
        let disease = ctx.model.network(net_idx).params.disease_params.clone();
        let link_ranges = ctx.model.network(net_idx).nlinks_by_thread.clone();
        let node_ranges = ctx.model.network(net_idx).nnodes_by_thread.clone();

        let work_arr = if ctx.infections.sub_works.is_empty() {
            &mut ctx.infections.work
        } else {
            &mut ctx.infections.sub_works[net_idx]
        };
        for stage in (0..n_classes.saturating_sub(1)).rev() {
            let p = disease.progress[stage];
            let (lower, upper) = work_arr.split_at_mut(stage + 1);
            let current = &mut lower[stage];
            let next = &mut upper[0];
            for (thread_idx, range) in link_ranges.iter().enumerate() {
                let rng = &mut ctx.rngs[thread_idx];
                for idx in range.start as usize..range.end as usize {
                    let n = current[idx];
                    if n == 0 {
                        continue;
                    }
                    let m = ran_binomial(rng, p, n as u64) as u32;
                    current[idx] -= m;
                    next[idx] += m;
                }
            }
        }

        let play_arr = if ctx.infections.sub_plays.is_empty() {
            &mut ctx.infections.play
        } else {
            &mut ctx.infections.sub_plays[net_idx]
        };
        for stage in (0..n_classes.saturating_sub(1)).rev() {
            let p = disease.progress[stage];
            let (lower, upper) = play_arr.split_at_mut(stage + 1);
            let current = &mut lower[stage];
            let next = &mut upper[0];
            for (thread_idx, range) in node_ranges.iter().enumerate() {
                let rng = &mut ctx.rngs[thread_idx];
                for idx in range.start as usize..range.end as usize {
                    let n = current[idx];
                    if n == 0 {
                        continue;
                    }
                    let m = ran_binomial(rng, p, n as u64) as u32;
                    current[idx] -= m;
                    next[idx] += m;
                }
            }
        }
    }
    Ok(())
}

/// Recompute each network's per-ward force of infection from this day's
/// infection counters. Work-link contributions split between the
/// destination ward (individuals who travel) and the source ward
/// (individuals too ill to move); play contributions land directly on the
/// node the infection counter is already keyed by.
pub fn recalculate_foi(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    for net_idx in 0..ctx.network_count() {
        let network = ctx.model.network(net_idx);
        let disease = &network.params.disease_params;
        let length_day = network.params.length_day;
        let plength_day = network.params.plength_day;
        let uv = network.params.uv;
        let nnodes = network.nnodes as usize;

        let mut foi = vec![0.0f64; nnodes + 1];

        let work_arr = if ctx.infections.sub_works.is_empty() {
            &ctx.infections.work
        } else {
            &ctx.infections.sub_works[net_idx]
        };
        for (stage_idx, stage_counts) in work_arr.iter().enumerate() {
            let contrib = disease.contrib_foi[stage_idx];
            let beta = disease.beta[stage_idx];
            let too_ill = disease.too_ill_to_move[stage_idx];
            if contrib == 0.0 || beta == 0.0 {
                continue;
            }
            for link_idx in 1..network.to_links.len() {
                let n = stage_counts[link_idx];
                if n == 0 {
                    continue;
                }
                let link = &network.to_links[link_idx];
                let total = n as f64 * contrib * beta * length_day;
                foi[link.ito as usize] += total * (1.0 - too_ill);
                foi[link.ifrom as usize] += total * too_ill;
            }
        }

        let play_arr = if ctx.infections.sub_plays.is_empty() {
            &ctx.infections.play
        } else {
            &ctx.infections.sub_plays[net_idx]
        };
        for (stage_idx, stage_counts) in play_arr.iter().enumerate() {
            let contrib = disease.contrib_foi[stage_idx];
            let beta = disease.beta[stage_idx];
            if contrib == 0.0 || beta == 0.0 {
                continue;
            }
            for node_idx in 1..=nnodes {
                let n = stage_counts[node_idx];
                if n == 0 {
                    continue;
                }
                foi[node_idx] += n as f64 * contrib * beta * plength_day;
            }
        }

        for (node_idx, value) in foi.iter_mut().enumerate() {
            *value *= uv;
            if !value.is_finite() {
                return Err(RuntimeError::NonFiniteFoi {
                    node: node_idx as u32,
                    value: *value,
                });
            }
        }
        ctx.ward_foi[net_idx] = foi;
    }
    Ok(())
}

/// Convert each network's `ward_foi` into a per-susceptible infection
/// probability using the standard `1 - exp(-foi)` hazard.
pub fn advance_infprob(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    for net_idx in 0..ctx.network_count() {
        let probs: Vec<f64> = ctx.ward_foi[net_idx]
            .iter()
            .map(|&foi| (1.0 - (-foi).exp()).clamp(0.0, 1.0))
            .collect();
        ctx.infect_prob[net_idx] = probs;
    }
    Ok(())
}

/// Sample new work-link infections: `k ~ Binomial(suscept[L], p[dest])`.
pub fn advance_fixed(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    for net_idx in 0..ctx.network_count() {
        let probs = ctx.infect_prob[net_idx].clone();
        let ranges = ctx.model.network(net_idx).nlinks_by_thread.clone();

        let network = ctx.model.network_mut(net_idx);
        let to_links = &mut network.to_links;
        let work0 = if ctx.infections.sub_works.is_empty() {
            &mut ctx.infections.work[0]
        } else {
            &mut ctx.infections.sub_works[net_idx][0]
        };

        for (thread_idx, range) in ranges.iter().enumerate() {
            let rng = &mut ctx.rngs[thread_idx];
            for link_idx in range.start as usize..range.end as usize {
                let link = &mut to_links[link_idx];
                if link.suscept == 0 {
                    continue;
                }
                let p = probs.get(link.ito as usize).copied().unwrap_or(0.0);
                if p <= 0.0 {
                    continue;
                }
                let k = ran_binomial(rng, p, link.suscept as u64) as u32;
                link.suscept = link.suscept.checked_sub(k).ok_or(RuntimeError::NegativeSusceptibles {
                    index: link_idx as u32,
                })?;
                work0[link_idx] += k;
            }
        }
    }
    Ok(())
}

/// Sample new play infections: `k ~ Binomial(play_suscept[n], p[n])`.
pub fn advance_play(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    for net_idx in 0..ctx.network_count() {
        let probs = ctx.infect_prob[net_idx].clone();
        let ranges = ctx.model.network(net_idx).nnodes_by_thread.clone();

        let network = ctx.model.network_mut(net_idx);
        let nodes = &mut network.nodes;
        let play0 = if ctx.infections.sub_plays.is_empty() {
            &mut ctx.infections.play[0]
        } else {
            &mut ctx.infections.sub_plays[net_idx][0]
        };

        for (thread_idx, range) in ranges.iter().enumerate() {
            let rng = &mut ctx.rngs[thread_idx];
            for node_idx in range.start as usize..range.end as usize {
                let node = &mut nodes[node_idx];
                if node.play_suscept <= 0.0 {
                    continue;
                }
                let p = probs.get(node_idx).copied().unwrap_or(0.0);
                if p <= 0.0 {
                    continue;
                }
                let k = ran_binomial(rng, p, node.play_suscept as u64) as u32;
                node.play_suscept -= k as f64;
                if node.play_suscept < 0.0 {
                    return Err(RuntimeError::NegativeSusceptibles { index: node_idx as u32 });
                }
                play0[node_idx] += k;
            }
        }
    }
    Ok(())
}

/// Apply today's scripted seed events (loaded once before the run starts
/// into [`StageContext::seed_events`]).
pub fn advance_additional(ctx: &mut StageContext) -> Result<(), RuntimeError> {
    let day = ctx.day;
    let events: Vec<_> = ctx.seed_events.iter().filter(|e| e.day == day).cloned().collect();

    for event in events {
        let target_idx = match (&event.demographic, ctx.model.demographics()) {
            (Some(name), Some(demographics)) => demographics.iter().position(|d| &d.name == name),
            _ => None,
        };

        match target_idx {
            Some(idx) => {
                let network = ctx.model.network_mut(idx);
                let play0 = if ctx.infections.sub_plays.is_empty() {
                    &mut ctx.infections.play[0]
                } else {
                    &mut ctx.infections.sub_plays[idx][0]
                };
                crate::seeds::apply_seed_event(network, play0, &event);
            }
            None => {
                let network = ctx.model.overall_mut();
                let play0 = &mut ctx.infections.play[0];
                crate::seeds::apply_seed_event(network, play0, &event);
            }
        }
    }
    Ok(())
}
