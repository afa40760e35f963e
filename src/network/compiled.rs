//! Compiled, immutable-topology network: struct-of-arrays over contiguous
//! 1-based node/link indices, built once from a resolved [`Wards`].

use std::ops::Range;

use crate::error::TopologyError;
use crate::parameters::Parameters;
use crate::ward::{Position, WardInfo, Wards};

/// Per-node bookkeeping. Index `k` of [`Network::nodes`] describes ward `k`;
/// index 0 is an unused sentinel (ward ids are 1-based).
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub begin_to: u32,
    pub end_to: u32,
    /// Index into `to_links` of this node's self-link (`ifrom == ito == k`).
    pub self_w: u32,
    pub begin_play: u32,
    pub end_play: u32,
    pub save_play_suscept: f64,
    pub denominator_d: f64,
    pub denominator_p: f64,
    pub denominator_pd: f64,
    pub denominator_n: f64,
    pub play_suscept: f64,
}

/// A fixed, directional work (commuting) link.
#[derive(Debug, Clone, Default)]
pub struct ToLink {
    pub ifrom: u32,
    pub ito: u32,
    pub weight: u32,
    pub suscept: u32,
    pub distance: f64,
}

/// A probabilistic daily-movement (play) link.
#[derive(Debug, Clone, Default)]
pub struct PlayLink {
    pub ifrom: u32,
    pub ito: u32,
    pub weight: f64,
    pub suscept: f64,
}

/// A compiled network: parallel arrays indexed `[1..=nnodes]`/`[1..=nlinks]`/
/// `[1..=nplay]`, plus the precomputed thread partitions that make kernel
/// execution deterministic under multithreading.
#[derive(Debug, Clone)]
pub struct Network {
    pub nnodes: u32,
    pub nlinks: u32,
    pub nplay: u32,
    pub nodes: Vec<Node>,
    pub to_links: Vec<ToLink>,
    pub play: Vec<PlayLink>,
    pub info: Vec<WardInfo>,
    pub positions: Vec<Option<Position>>,
    pub params: Parameters,
    pub nnodes_by_thread: Vec<Range<u32>>,
    pub nlinks_by_thread: Vec<Range<u32>>,
}

impl Network {
    /// Compile a fully-resolved [`Wards`] collection into a [`Network`].
    /// Ward ids must be exactly `1..=wards.len()` with no gaps.
    pub fn compile(wards: &Wards, params: Parameters, nthreads: usize) -> Result<Network, TopologyError> {
        if wards.is_empty() {
            return Err(TopologyError::EmptyWards);
        }
        if !wards.is_resolved() {
            return Err(TopologyError::StillUnresolved { ward: 0 });
        }

        let nnodes = wards.len() as u32;
        let mut nodes = vec![Node::default(); (nnodes + 1) as usize];
        let mut to_links = vec![ToLink::default()];
        let mut play = vec![PlayLink::default()];
        let mut info = vec![WardInfo::default(); (nnodes + 1) as usize];
        let mut positions: Vec<Option<Position>> = vec![None; (nnodes + 1) as usize];

        for id in 1..=nnodes {
            let ward = wards
                .get(id)
                .ok_or_else(|| TopologyError::DestinationNotFound(format!("ward id {id}")))?;
            info[id as usize] = ward.info().clone();
            positions[id as usize] = ward.position();
        }

        for id in 1..=nnodes {
            let ward = wards.get(id).expect("checked present above");

            let (dests, counts) = ward.get_worker_lists()?;
            let begin_to = to_links.len() as u32;
            let mut self_w = None;
            for (&dest, &count) in dests.iter().zip(&counts) {
                if dest == 0 || dest > nnodes {
                    return Err(TopologyError::LinkEndpointOutOfRange { node: dest, nnodes });
                }
                if dest == id {
                    self_w = Some(to_links.len() as u32);
                }
                to_links.push(ToLink {
                    ifrom: id,
                    ito: dest,
                    weight: count,
                    suscept: count,
                    distance: distance(positions[id as usize], positions[dest as usize]),
                });
            }
            if self_w.is_none() {
                self_w = Some(to_links.len() as u32);
                to_links.push(ToLink {
                    ifrom: id,
                    ito: id,
                    weight: 0,
                    suscept: 0,
                    distance: 0.0,
                });
            }
            let end_to = to_links.len() as u32;

            let (pdests, pweights) = ward.get_player_lists(false)?;
            let begin_play = play.len() as u32;
            for (&dest, &weight) in pdests.iter().zip(&pweights) {
                if dest == 0 || dest > nnodes {
                    return Err(TopologyError::LinkEndpointOutOfRange { node: dest, nnodes });
                }
                play.push(PlayLink {
                    ifrom: id,
                    ito: dest,
                    weight,
                    suscept: weight,
                });
            }
            let end_play = play.len() as u32;

            let num_workers = ward.num_workers() as f64;
            let num_players = ward.num_players() as f64;
            let play_suscept = pweights.iter().sum::<f64>() * num_players;

            nodes[id as usize] = Node {
                begin_to,
                end_to,
                self_w: self_w.unwrap(),
                begin_play,
                end_play,
                save_play_suscept: play_suscept,
                denominator_d: num_workers,
                denominator_p: num_workers,
                denominator_pd: num_workers,
                denominator_n: num_workers,
                play_suscept,
            };
        }

        let nlinks = to_links.len() as u32 - 1;
        let nplay = play.len() as u32 - 1;

        let node_weights: Vec<u64> = (1..=nnodes)
            .map(|id| {
                let node = &nodes[id as usize];
                (node.end_to - node.begin_to).max(1) as u64
            })
            .collect();
        let link_weights: Vec<u64> = to_links[1..].iter().map(|l| (l.weight as u64).max(1)).collect();

        let nnodes_by_thread = partition_by_weight(&node_weights, nthreads.max(1));
        let nlinks_by_thread = partition_by_weight(&link_weights, nthreads.max(1));

        Ok(Network {
            nnodes,
            nlinks,
            nplay,
            nodes,
            to_links,
            play,
            info,
            positions,
            params,
            nnodes_by_thread,
            nlinks_by_thread,
        })
    }

    /// Reset mutable state (`suscept`, `play_suscept`) back to the compiled
    /// initial weights, ready for a fresh run without recompiling topology.
    pub fn reset(&mut self) {
        for link in self.to_links.iter_mut().skip(1) {
            link.suscept = link.weight;
        }
        for link in self.play.iter_mut().skip(1) {
            link.suscept = link.weight;
        }
        for node in self.nodes.iter_mut().skip(1) {
            node.play_suscept = node.save_play_suscept;
        }
    }

    pub fn work_links_for_node(&self, node: u32) -> Range<usize> {
        let n = &self.nodes[node as usize];
        n.begin_to as usize..n.end_to as usize
    }

    pub fn play_links_for_node(&self, node: u32) -> Range<usize> {
        let n = &self.nodes[node as usize];
        n.begin_play as usize..n.end_play as usize
    }
}

fn distance(a: Option<Position>, b: Option<Position>) -> f64 {
    match (a, b) {
        (Some(Position::Xy { x: x1, y: y1 }), Some(Position::Xy { x: x2, y: y2 })) => {
            ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
        }
        (Some(Position::LatLong { lat: lat1, long: long1 }), Some(Position::LatLong { lat: lat2, long: long2 })) => {
            haversine_km(lat1, long1, lat2, long2)
        }
        _ => 0.0,
    }
}

fn haversine_km(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlong = (long2 - long1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlong / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Partition `1..=weights.len()` into `nthreads` contiguous ranges whose
/// cumulative weight is roughly balanced. Greedy: closes a range once its
/// running sum reaches the overall average, except the last thread, which
/// absorbs whatever remains.
fn partition_by_weight(weights: &[u64], nthreads: usize) -> Vec<Range<u32>> {
    let n = weights.len();
    if n == 0 {
        return vec![0..0; nthreads];
    }
    let total: u64 = weights.iter().sum();
    let target = (total / nthreads as u64).max(1);

    let mut ranges = Vec::with_capacity(nthreads);
    let mut start = 1usize;
    let mut acc = 0u64;

    for i in 0..n {
        acc += weights[i];
        let item_id = i + 1;
        let would_be_last = ranges.len() + 1 == nthreads;
        if !would_be_last && acc >= target {
            ranges.push(start as u32..(item_id + 1) as u32);
            start = item_id + 1;
            acc = 0;
        }
    }
    if start <= n {
        ranges.push(start as u32..(n + 1) as u32);
    }
    while ranges.len() < nthreads {
        ranges.push((n + 1) as u32..(n + 1) as u32);
    }
    ranges
}
