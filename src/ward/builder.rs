//! A single ward under construction: its workers (fixed daily commuters) and
//! players (probabilistic daily movement weights), before the collection they
//! belong to has been resolved and compiled into a [`crate::network::Network`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;
use crate::ward::info::{Dest, DestKey, WardInfo};

/// Below this, a player weight or residual is treated as exactly zero/one —
/// absorbs float accumulation error from repeated `add`/`subtract` calls.
const WEIGHT_TOLERANCE: f64 = 1e-10;

/// Ward position, either projected (kilometres) or geographic (degrees).
/// The two are mutually exclusive: setting one clears the other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Xy { x: f64, y: f64 },
    LatLong { lat: f64, long: f64 },
}

/// A ward: its worker links (integer commuter counts) and player links
/// (fractional daily-movement weights that must sum to 1.0 including the
/// residual kept at home), plus identity and optional position.
///
/// Destinations start out as [`DestKey::Unresolved`] whenever they are added
/// by [`WardInfo`] rather than integer id; [`Ward::resolve`] rewrites them
/// once the owning [`Wards`] collection has assigned every ward an id.
#[derive(Debug, Clone, Default)]
pub struct Ward {
    id: Option<u32>,
    info: WardInfo,
    workers: HashMap<DestKey, u32>,
    players: HashMap<DestKey, f64>,
    player_total: f64,
    num_workers: u32,
    num_players: u32,
    auto_assign_players: bool,
    position: Option<Position>,
}

impl Ward {
    pub fn new() -> Self {
        Self {
            id: None,
            info: WardInfo::new(),
            workers: HashMap::new(),
            players: HashMap::new(),
            player_total: 1.0,
            num_workers: 0,
            num_players: 0,
            auto_assign_players: true,
            position: None,
        }
    }

    pub fn with_id(mut self, id: u32) -> Result<Self, TopologyError> {
        self.set_id(id)?;
        Ok(self)
    }

    pub fn with_info(mut self, info: WardInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_num_players(mut self, n: u32) -> Self {
        self.num_players = n;
        self
    }

    pub fn no_auto_assign(mut self) -> Self {
        self.auto_assign_players = false;
        self
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn info(&self) -> &WardInfo {
        &self.info
    }

    pub fn num_workers(&self) -> u32 {
        self.num_workers
    }

    pub fn num_players(&self) -> u32 {
        self.num_players
    }

    pub fn player_residual(&self) -> f64 {
        self.player_total
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn set_position_xy(&mut self, x: f64, y: f64) {
        self.position = Some(Position::Xy { x, y });
    }

    pub fn set_position_lat_long(&mut self, lat: f64, long: f64) {
        self.position = Some(Position::LatLong { lat, long });
    }

    fn resolve_destination(&self, dest: Option<Dest>) -> Result<DestKey, TopologyError> {
        match dest {
            None => {
                if let Some(id) = self.id {
                    Ok(DestKey::Resolved(id))
                } else if !self.info.is_null() {
                    Ok(DestKey::Unresolved(self.info.clone()))
                } else {
                    Err(TopologyError::DestinationNotFound(
                        "<ward has no id and no identifying info>".to_string(),
                    ))
                }
            }
            Some(Dest::Id(id)) => {
                if id == 0 {
                    return Err(TopologyError::NonPositiveId(0));
                }
                Ok(DestKey::Resolved(id))
            }
            Some(Dest::Info(info)) => {
                if !info.is_null() && self.id.is_some() && info == self.info {
                    Ok(DestKey::Resolved(self.id.unwrap()))
                } else {
                    Ok(DestKey::Unresolved(info))
                }
            }
        }
    }

    pub fn add_workers(&mut self, n: u32, dest: impl Into<Option<Dest>>) -> Result<(), TopologyError> {
        let key = self.resolve_destination(dest.into())?;
        *self.workers.entry(key).or_insert(0) += n;
        self.num_workers += n;
        Ok(())
    }

    pub fn subtract_workers(&mut self, n: u32, dest: impl Into<Option<Dest>>) -> Result<(), TopologyError> {
        let key = self.resolve_destination(dest.into())?;
        if let Some(count) = self.workers.get_mut(&key) {
            let taken = n.min(*count);
            *count -= taken;
            self.num_workers -= taken;
            if *count == 0 {
                self.workers.remove(&key);
            }
        }
        Ok(())
    }

    pub fn get_workers(&self, dest: impl Into<Option<Dest>>) -> Result<u32, TopologyError> {
        let key = self.resolve_destination(dest.into())?;
        Ok(*self.workers.get(&key).unwrap_or(&0))
    }

    /// Add `weight` of player movement probability to `dest`, deducting it
    /// from the residual kept at home. Errors if `weight` exceeds what
    /// remains; a weight within [`WEIGHT_TOLERANCE`] of the residual is
    /// snapped to exactly consume it.
    pub fn add_player_weight(&mut self, weight: f64, dest: impl Into<Option<Dest>>) -> Result<(), TopologyError> {
        if weight < 0.0 {
            return Err(TopologyError::NegativeValue(weight));
        }
        let key = self.resolve_destination(dest.into())?;
        if weight < WEIGHT_TOLERANCE {
            return Ok(());
        }

        let mut weight = weight;
        if (weight - self.player_total).abs() < WEIGHT_TOLERANCE {
            weight = self.player_total;
        }
        if weight > self.player_total {
            return Err(TopologyError::WeightExceedsResidual {
                destination: key.to_string(),
                requested: weight,
                residual: self.player_total,
            });
        }

        *self.players.entry(key).or_insert(0.0) += weight;
        self.player_total -= weight;
        if self.player_total < WEIGHT_TOLERANCE {
            self.player_total = 0.0;
        }
        Ok(())
    }

    /// Remove up to `weight` of player movement probability from `dest`,
    /// returning it to the residual kept at home. Capped at whatever is
    /// currently assigned to `dest`; no-op if `dest` has no weight at all.
    pub fn subtract_player_weight(&mut self, weight: f64, dest: impl Into<Option<Dest>>) -> Result<(), TopologyError> {
        if weight < 0.0 {
            return Err(TopologyError::NegativeValue(weight));
        }
        let key = self.resolve_destination(dest.into())?;
        if weight < WEIGHT_TOLERANCE {
            return Ok(());
        }
        let Some(current) = self.players.get(&key).copied() else {
            return Ok(());
        };

        let taken = weight.min(current);
        let remaining = current - taken;
        if remaining < WEIGHT_TOLERANCE {
            self.players.remove(&key);
        } else {
            self.players.insert(key, remaining);
        }
        self.player_total += taken;
        if (self.player_total - 1.0).abs() < WEIGHT_TOLERANCE {
            self.player_total = 1.0;
        }
        Ok(())
    }

    pub fn get_player_weight(&self, dest: impl Into<Option<Dest>>) -> Result<f64, TopologyError> {
        let key = self.resolve_destination(dest.into())?;
        let mut weight = *self.players.get(&key).unwrap_or(&0.0);
        if self.auto_assign_players {
            if let (Some(self_id), DestKey::Resolved(id)) = (self.id, &key) {
                if *id == self_id {
                    weight += self.player_total;
                }
            }
        }
        Ok(weight)
    }

    /// Assign (or change) this ward's integer id, rewriting any existing
    /// self-referential destination keys (by old id, or by this ward's own
    /// [`WardInfo`]) to the new id. Errors if the new id already appears as a
    /// destination key in this ward's own maps.
    pub fn set_id(&mut self, id: u32) -> Result<(), TopologyError> {
        if id == 0 {
            return Err(TopologyError::NonPositiveId(0));
        }
        if self.id == Some(id) {
            return Ok(());
        }

        let new_key = DestKey::Resolved(id);
        if self.workers.contains_key(&new_key) || self.players.contains_key(&new_key) {
            return Err(TopologyError::IdCollision { id });
        }

        let old_id = self.id;
        self.id = Some(id);

        if let Some(old) = old_id {
            let old_key = DestKey::Resolved(old);
            if let Some(v) = self.workers.remove(&old_key) {
                self.workers.insert(new_key.clone(), v);
            }
            if let Some(v) = self.players.remove(&old_key) {
                self.players.insert(new_key.clone(), v);
            }
        }

        if !self.info.is_null() {
            let info_key = DestKey::Unresolved(self.info.clone());
            if let Some(v) = self.workers.remove(&info_key) {
                self.workers.insert(new_key.clone(), v);
            }
            if let Some(v) = self.players.remove(&info_key) {
                self.players.insert(new_key, v);
            }
        }

        Ok(())
    }

    /// True once this ward has an integer id and every destination key in
    /// both maps is [`DestKey::Resolved`].
    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
            && self.workers.keys().all(|k| matches!(k, DestKey::Resolved(_)))
            && self.players.keys().all(|k| matches!(k, DestKey::Resolved(_)))
    }

    /// Rewrite every [`DestKey::Unresolved`] destination by looking it up in
    /// `ids_by_info` (built by the owning [`crate::ward::Wards`] collection).
    pub fn resolve(&mut self, ids_by_info: &HashMap<WardInfo, u32>) -> Result<(), TopologyError> {
        Self::resolve_map(&mut self.workers, ids_by_info)?;
        Self::resolve_map(&mut self.players, ids_by_info)?;
        Ok(())
    }

    fn resolve_map<V>(map: &mut HashMap<DestKey, V>, ids_by_info: &HashMap<WardInfo, u32>) -> Result<(), TopologyError> {
        let unresolved: Vec<WardInfo> = map
            .keys()
            .filter_map(|k| match k {
                DestKey::Unresolved(info) => Some(info.clone()),
                DestKey::Resolved(_) => None,
            })
            .collect();

        for info in unresolved {
            let key = DestKey::Unresolved(info.clone());
            let id = ids_by_info
                .get(&info)
                .copied()
                .ok_or_else(|| TopologyError::UnresolvedDestination(info.to_string()))?;
            let resolved = DestKey::Resolved(id);
            let value = map.remove(&key).expect("key just matched above");
            if map.contains_key(&resolved) {
                return Err(TopologyError::DuplicateKeyAfterResolve { id });
            }
            map.insert(resolved, value);
        }
        Ok(())
    }

    /// Worker destination/population lists, sorted ascending by destination
    /// id. Errors if any destination is still unresolved.
    pub fn get_worker_lists(&self) -> Result<(Vec<u32>, Vec<u32>), TopologyError> {
        let my_id = self.id.ok_or(TopologyError::StillUnresolved { ward: 0 })?;
        let mut entries: Vec<(u32, u32)> = Vec::with_capacity(self.workers.len());
        for (key, &count) in &self.workers {
            let id = key.as_resolved().ok_or(TopologyError::StillUnresolved { ward: my_id })?;
            entries.push((id, count));
        }
        entries.sort_unstable_by_key(|(id, _)| *id);
        Ok(entries.into_iter().unzip())
    }

    /// Player destination/weight lists, sorted ascending by destination id.
    /// Unless `no_auto_assign` is set, any leftover residual is folded into
    /// this ward's own (self-loop) weight, creating that entry if needed.
    pub fn get_player_lists(&self, no_auto_assign: bool) -> Result<(Vec<u32>, Vec<f64>), TopologyError> {
        let my_id = self.id.ok_or(TopologyError::StillUnresolved { ward: 0 })?;
        let mut entries: Vec<(u32, f64)> = Vec::with_capacity(self.players.len() + 1);
        for (key, &weight) in &self.players {
            let id = key.as_resolved().ok_or(TopologyError::StillUnresolved { ward: my_id })?;
            entries.push((id, weight));
        }

        if !no_auto_assign && self.auto_assign_players && self.player_total > WEIGHT_TOLERANCE {
            if let Some(slot) = entries.iter_mut().find(|(id, _)| *id == my_id) {
                slot.1 += self.player_total;
            } else {
                entries.push((my_id, self.player_total));
            }
        }

        entries.sort_unstable_by_key(|(id, _)| *id);
        Ok(entries.into_iter().unzip())
    }

    /// Check that player weights plus residual sum to 1.0 within tolerance,
    /// and that `num_workers` agrees with the sum of worker counts.
    pub fn assert_sane(&self) -> Result<(), TopologyError> {
        let worker_sum: u32 = self.workers.values().sum();
        if worker_sum != self.num_workers {
            return Err(TopologyError::WorkerCountMismatch {
                expected: self.num_workers,
                actual: worker_sum,
            });
        }
        let player_sum: f64 = self.players.values().sum::<f64>() + self.player_total;
        if (player_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(TopologyError::PlayerTotalOutOfRange(player_sum));
        }
        Ok(())
    }

    pub fn to_data(&self) -> WardData {
        let mut worker_dest: Vec<String> = self.workers.keys().map(|k| k.to_string()).collect();
        worker_dest.sort();
        let workers: Vec<(String, u32)> = worker_dest
            .into_iter()
            .map(|d| {
                let key = self.find_key_by_string(&self.workers, &d);
                (d, *self.workers.get(&key).unwrap())
            })
            .collect();

        let mut player_dest: Vec<String> = self.players.keys().map(|k| k.to_string()).collect();
        player_dest.sort();
        let players: Vec<(String, f64)> = player_dest
            .into_iter()
            .map(|d| {
                let key = self.find_key_by_string(&self.players, &d);
                (d, *self.players.get(&key).unwrap())
            })
            .collect();

        WardData {
            id: self.id,
            info: self.info.clone(),
            worker_destinations: workers.iter().map(|(d, _)| d.clone()).collect(),
            worker_counts: workers.iter().map(|(_, c)| *c).collect(),
            player_destinations: players.iter().map(|(d, _)| d.clone()).collect(),
            player_weights: players.iter().map(|(_, w)| *w).collect(),
            player_total: self.player_total,
            num_workers: self.num_workers,
            num_players: self.num_players,
            auto_assign_players: self.auto_assign_players,
            position: self.position,
        }
    }

    fn find_key_by_string<V>(&self, map: &HashMap<DestKey, V>, s: &str) -> DestKey {
        map.keys().find(|k| k.to_string() == s).unwrap().clone()
    }

    pub fn from_data(data: &WardData) -> Result<Self, TopologyError> {
        if data.worker_destinations.len() != data.worker_counts.len() {
            return Err(TopologyError::WorkerCountMismatch {
                expected: data.worker_destinations.len() as u32,
                actual: data.worker_counts.len() as u32,
            });
        }
        if data.player_destinations.len() != data.player_weights.len() {
            return Err(TopologyError::PlayerTotalOutOfRange(data.player_total));
        }

        let mut ward = Ward {
            id: data.id,
            info: data.info.clone(),
            workers: HashMap::new(),
            players: HashMap::new(),
            player_total: data.player_total,
            num_workers: data.num_workers,
            num_players: data.num_players,
            auto_assign_players: data.auto_assign_players,
            position: data.position,
        };

        for (dest, &count) in data.worker_destinations.iter().zip(&data.worker_counts) {
            let key = parse_dest_key(dest);
            ward.workers.insert(key, count);
        }
        for (dest, &weight) in data.player_destinations.iter().zip(&data.player_weights) {
            let key = parse_dest_key(dest);
            ward.players.insert(key, weight);
        }

        ward.assert_sane()?;
        Ok(ward)
    }
}

fn parse_dest_key(s: &str) -> DestKey {
    match s.parse::<u32>() {
        Ok(id) => DestKey::Resolved(id),
        Err(_) => DestKey::Unresolved(WardInfo::new().with_name(s)),
    }
}

/// Plain-data (de)serializable snapshot of a [`Ward`], used for JSON/CSV
/// round-tripping and for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardData {
    pub id: Option<u32>,
    pub info: WardInfo,
    pub worker_destinations: Vec<String>,
    pub worker_counts: Vec<u32>,
    pub player_destinations: Vec<String>,
    pub player_weights: Vec<f64>,
    pub player_total: f64,
    pub num_workers: u32,
    pub num_players: u32,
    pub auto_assign_players: bool,
    pub position: Option<Position>,
}
