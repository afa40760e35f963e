//! An ordered collection of [`Ward`]s, indexed by both integer id and
//! [`WardInfo`], with the resolution step that rewrites every ward's
//! unresolved destination keys once all wards have ids.

use std::collections::HashMap;

use crate::error::TopologyError;
use crate::ward::builder::Ward;
use crate::ward::info::WardInfo;

/// A collection of wards awaiting resolution and compilation into a
/// [`crate::network::Network`]. Wards are kept in insertion order; `resolve`
/// requires every ward to already have an id (ids are assigned by the caller,
/// e.g. while reading a topology file, not invented here).
#[derive(Debug, Default)]
pub struct Wards {
    wards: Vec<Ward>,
    by_id: HashMap<u32, usize>,
    by_info: HashMap<WardInfo, usize>,
}

impl Wards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ward: Ward) -> Result<(), TopologyError> {
        let idx = self.wards.len();
        if let Some(id) = ward.id() {
            if self.by_id.contains_key(&id) {
                return Err(TopologyError::IdCollision { id });
            }
            self.by_id.insert(id, idx);
        }
        if !ward.info().is_null() {
            self.by_info.insert(ward.info().clone(), idx);
        }
        self.wards.push(ward);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.wards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wards.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Ward> {
        self.by_id.get(&id).map(|&idx| &self.wards[idx])
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Ward> {
        self.by_id.get(&id).copied().map(move |idx| &mut self.wards[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ward> {
        self.wards.iter()
    }

    /// Look up the integer id of the ward matching `info`, if any is
    /// registered under it.
    pub fn index_of(&self, info: &WardInfo) -> Option<u32> {
        self.by_info.get(info).and_then(|&idx| self.wards[idx].id())
    }

    /// Look up a ward id by bare name, for inputs (e.g. additional-seed
    /// files) that identify a ward by a single string rather than a full
    /// [`WardInfo`] record.
    pub fn index_of_name(&self, name: &str) -> Option<u32> {
        self.wards
            .iter()
            .find(|w| w.info().name.as_deref() == Some(name))
            .and_then(|w| w.id())
    }

    /// Rewrite every ward's unresolved destination keys against this
    /// collection. Every ward must already carry an id.
    pub fn resolve(&mut self) -> Result<(), TopologyError> {
        if self.wards.is_empty() {
            return Err(TopologyError::EmptyWards);
        }
        for ward in &self.wards {
            if ward.id().is_none() {
                return Err(TopologyError::StillUnresolved { ward: 0 });
            }
        }

        let ids_by_info: HashMap<WardInfo, u32> = self
            .by_info
            .iter()
            .filter_map(|(info, &idx)| self.wards[idx].id().map(|id| (info.clone(), id)))
            .collect();

        for ward in &mut self.wards {
            ward.resolve(&ids_by_info)?;
        }
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        !self.wards.is_empty() && self.wards.iter().all(|w| w.is_resolved())
    }
}
