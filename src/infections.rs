//! Per-stage infection counters: how many individuals on each work link or
//! at each node sit in each disease stage, plus the cumulative removed
//! counts that the stage arrays themselves don't carry.

use crate::network::{Network, Networks};

/// `work[stage][link]` / `play[stage][node]` counters for a single
/// [`Network`], plus (for multi-demographic runs) one such pair per subnet.
///
/// `work_removed`/`play_removed` are cumulative totals of individuals that
/// have progressed out of the last infected stage; unlike the per-stage
/// arrays they are never reset during a run, only by [`Infections::clear`].
#[derive(Debug, Clone, Default)]
pub struct Infections {
    pub work: Vec<Vec<u32>>,
    pub play: Vec<Vec<u32>>,
    pub work_removed: Vec<u32>,
    pub play_removed: Vec<u32>,
    pub sub_works: Vec<Vec<Vec<u32>>>,
    pub sub_plays: Vec<Vec<Vec<u32>>>,
    pub sub_work_removed: Vec<Vec<u32>>,
    pub sub_play_removed: Vec<Vec<u32>>,
}

impl Infections {
    /// Zeroed counters sized for a single network.
    pub fn build(network: &Network) -> Infections {
        let n = network.params.disease_params.n_inf_classes();
        Infections {
            work: vec![vec![0u32; (network.nlinks + 1) as usize]; n],
            play: vec![vec![0u32; (network.nnodes + 1) as usize]; n],
            work_removed: vec![0u32; (network.nlinks + 1) as usize],
            play_removed: vec![0u32; (network.nnodes + 1) as usize],
            sub_works: Vec::new(),
            sub_plays: Vec::new(),
            sub_work_removed: Vec::new(),
            sub_play_removed: Vec::new(),
        }
    }

    /// Zeroed counters sized for an overall network plus every subnet.
    pub fn build_for_networks(networks: &Networks) -> Infections {
        let mut infections = Infections::build(&networks.overall);
        for subnet in &networks.subnets {
            let n = subnet.params.disease_params.n_inf_classes();
            infections.sub_works.push(vec![vec![0u32; (subnet.nlinks + 1) as usize]; n]);
            infections.sub_plays.push(vec![vec![0u32; (subnet.nnodes + 1) as usize]; n]);
            infections.sub_work_removed.push(vec![0u32; (subnet.nlinks + 1) as usize]);
            infections.sub_play_removed.push(vec![0u32; (subnet.nnodes + 1) as usize]);
        }
        infections
    }

    /// Zero every counter. `nthreads` is accepted for parity with the other
    /// staged kernels, though a memset needs no partitioning to stay
    /// deterministic.
    pub fn clear(&mut self, _nthreads: usize) {
        for stage in self.work.iter_mut().chain(self.play.iter_mut()) {
            stage.iter_mut().for_each(|v| *v = 0);
        }
        self.work_removed.iter_mut().for_each(|v| *v = 0);
        self.play_removed.iter_mut().for_each(|v| *v = 0);
        for sub in self.sub_works.iter_mut().chain(self.sub_plays.iter_mut()) {
            for stage in sub.iter_mut() {
                stage.iter_mut().for_each(|v| *v = 0);
            }
        }
        for sub in self.sub_work_removed.iter_mut().chain(self.sub_play_removed.iter_mut()) {
            sub.iter_mut().for_each(|v| *v = 0);
        }
    }

    pub fn n_inf_classes(&self) -> usize {
        self.work.len()
    }

    /// True once every index has its own entry in `sub_works`/`sub_plays`
    /// (i.e. this was built via [`Infections::build_for_networks`]).
    pub fn is_multi(&self) -> bool {
        !self.sub_works.is_empty()
    }

    pub fn total_infected(&self) -> u64 {
        self.work
            .iter()
            .chain(self.play.iter())
            .map(|stage| stage.iter().map(|&x| x as u64).sum::<u64>())
            .sum()
    }

    pub fn total_removed(&self) -> u64 {
        self.work_removed.iter().map(|&x| x as u64).sum::<u64>()
            + self.play_removed.iter().map(|&x| x as u64).sum::<u64>()
    }

    /// Work counters for network `idx` (0 for the overall/single network, or
    /// a subnet index for multi-demographic runs).
    pub fn work_for(&mut self, idx: usize) -> &mut Vec<Vec<u32>> {
        if self.sub_works.is_empty() {
            &mut self.work
        } else {
            &mut self.sub_works[idx]
        }
    }

    pub fn play_for(&mut self, idx: usize) -> &mut Vec<Vec<u32>> {
        if self.sub_plays.is_empty() {
            &mut self.play
        } else {
            &mut self.sub_plays[idx]
        }
    }

    pub fn work_removed_for(&mut self, idx: usize) -> &mut Vec<u32> {
        if self.sub_work_removed.is_empty() {
            &mut self.work_removed
        } else {
            &mut self.sub_work_removed[idx]
        }
    }

    pub fn play_removed_for(&mut self, idx: usize) -> &mut Vec<u32> {
        if self.sub_play_removed.is_empty() {
            &mut self.play_removed
        } else {
            &mut self.sub_play_removed[idx]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::tests_support::sample;
    use crate::ward::{Ward, Wards};

    fn single_ward_network() -> Network {
        let mut wards = Wards::new();
        wards.insert(Ward::new().with_id(1).unwrap()).unwrap();
        wards.resolve().unwrap();
        Network::compile(&wards, sample(), 1).unwrap()
    }

    #[test]
    fn build_zeroes_counters_sized_to_classes_and_network() {
        let network = single_ward_network();
        let infections = Infections::build(&network);
        assert_eq!(infections.n_inf_classes(), 4);
        assert_eq!(infections.work[0].len(), (network.nlinks + 1) as usize);
        assert_eq!(infections.play[0].len(), (network.nnodes + 1) as usize);
        assert_eq!(infections.total_infected(), 0);
        assert_eq!(infections.total_removed(), 0);
    }

    #[test]
    fn clear_zeroes_all_counters_including_subnets_and_removed() {
        let network = single_ward_network();
        let mut infections = Infections::build(&network);
        infections.work[0][1] = 5;
        infections.work_removed[1] = 2;
        infections.sub_works.push(vec![vec![3, 4]]);
        infections.sub_work_removed.push(vec![1, 1]);
        infections.clear(2);
        assert_eq!(infections.work[0][1], 0);
        assert_eq!(infections.work_removed[1], 0);
        assert_eq!(infections.sub_works[0][0], vec![0, 0]);
        assert_eq!(infections.sub_work_removed[0], vec![0, 0]);
    }

    #[test]
    fn work_for_falls_back_to_overall_when_not_multi() {
        let network = single_ward_network();
        let mut infections = Infections::build(&network);
        infections.work_for(0)[0][1] = 9;
        assert_eq!(infections.work[0][1], 9);
    }
}
