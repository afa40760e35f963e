//! Error types for the ward/network data model, configuration loading,
//! plugin resolution, and runtime invariant checks.
//!
//! Each stage of the pipeline gets its own error enum rather than one
//! catch-all, so callers can match on exactly the failure class they
//! can recover from (currently: none during a run except seeding
//! shortfalls, which are reported via `tracing::warn!` rather than
//! this module).

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Errors raised while building or resolving [`crate::ward::Ward`]/
/// [`crate::ward::Wards`] topology, or while compiling a [`crate::network::Network`].
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// A ward or destination id was not a positive integer.
    NonPositiveId(i64),
    /// A negative worker count or player weight was supplied.
    NegativeValue(f64),
    /// `add_player_weight` was asked for more than the remaining residual.
    WeightExceedsResidual {
        destination: String,
        requested: f64,
        residual: f64,
    },
    /// `set_id` would collide with an existing destination key in this ward.
    IdCollision { id: u32 },
    /// A `WardInfo` key could not be found in the `Wards` collection during `resolve`.
    UnresolvedDestination(String),
    /// Resolving a `WardInfo` key produced an id already present as a key.
    DuplicateKeyAfterResolve { id: u32 },
    /// A ward still has unresolved (non-integer) keys when an integer-only
    /// operation (e.g. `get_worker_lists`) was requested.
    StillUnresolved { ward: u32 },
    /// `from_data`'s stored `num_workers` disagreed with the sum of worker counts.
    WorkerCountMismatch { expected: u32, actual: u32 },
    /// Sum of player weights (plus residual) was not within tolerance of 1.0,
    /// or the reconstructed residual went negative.
    PlayerTotalOutOfRange(f64),
    /// A link endpoint referenced a node id outside `[1, nnodes]`.
    LinkEndpointOutOfRange { node: u32, nnodes: u32 },
    /// `Wards::resolve` or `Network::compile` was called on an empty collection.
    EmptyWards,
    /// A `WardInfo` destination did not match any ward in the collection.
    DestinationNotFound(String),
    /// `Networks::build` requires at least two demographics.
    InsufficientDemographics { count: usize },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::NonPositiveId(id) => {
                write!(f, "id {id} must be a positive integer (>= 1)")
            }
            TopologyError::NegativeValue(v) => write!(f, "value {v} must be >= 0"),
            TopologyError::WeightExceedsResidual {
                destination,
                requested,
                residual,
            } => write!(
                f,
                "cannot add weight {requested} to destination {destination}: \
                 only {residual} of player weight remains"
            ),
            TopologyError::IdCollision { id } => write!(
                f,
                "cannot change ward id to {id}: it matches an existing link destination"
            ),
            TopologyError::UnresolvedDestination(info) => {
                write!(f, "destination {info} was not found while resolving wards")
            }
            TopologyError::DuplicateKeyAfterResolve { id } => write!(
                f,
                "resolving a destination produced id {id}, which already exists as a key"
            ),
            TopologyError::StillUnresolved { ward } => {
                write!(f, "ward {ward} has unresolved destination keys")
            }
            TopologyError::WorkerCountMismatch { expected, actual } => write!(
                f,
                "num_workers mismatch: stored {expected}, computed {actual}"
            ),
            TopologyError::PlayerTotalOutOfRange(total) => {
                write!(f, "player weights sum out of range: residual computed as {total}")
            }
            TopologyError::LinkEndpointOutOfRange { node, nnodes } => write!(
                f,
                "link endpoint {node} is out of range for a network of {nnodes} nodes"
            ),
            TopologyError::EmptyWards => write!(f, "wards collection is empty"),
            TopologyError::DestinationNotFound(info) => {
                write!(f, "no ward matches destination info {info}")
            }
            TopologyError::InsufficientDemographics { count } => write!(
                f,
                "Networks::build requires at least 2 demographics, got {count}"
            ),
        }
    }
}

impl Error for TopologyError {}

/// Errors raised while loading Disease/Parameters JSON, or additional-seed
/// and variable-sweep files.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    Csv { path: PathBuf, source: csv::Error },
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    OutOfRange { field: &'static str, value: f64 },
    MissingField(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "could not read {}: {source}", path.display())
            }
            ConfigError::Json { path, source } => {
                write!(f, "could not parse {} as JSON: {source}", path.display())
            }
            ConfigError::Csv { path, source } => {
                write!(f, "could not parse {} as CSV: {source}", path.display())
            }
            ConfigError::LengthMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "field {field} has length {actual}, expected {expected} to match the other disease arrays"
            ),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "field {field} = {value} is out of the allowed range")
            }
            ConfigError::MissingField(field) => write!(f, "missing required field {field}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::Csv { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Plugin name resolution failures (see [`crate::plugins::PluginRegistry`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    NotFound { name: String, kind: &'static str },
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::NotFound { name, kind } => {
                write!(f, "no {kind} plugin named '{name}' is registered")
            }
        }
    }
}

impl Error for PluginError {}

/// Runtime invariant violations. Unlike seeding shortfalls, these always abort the run.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    NegativeSusceptibles { index: u32 },
    SubnetPopulationMismatch { node: u32, expected: i64, actual: i64 },
    NonFiniteFoi { node: u32, value: f64 },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NegativeSusceptibles { index } => {
                write!(f, "susceptible count went negative at index {index}")
            }
            RuntimeError::SubnetPopulationMismatch {
                node,
                expected,
                actual,
            } => write!(
                f,
                "subnet populations at node {node} sum to {actual}, expected {expected} (overall)"
            ),
            RuntimeError::NonFiniteFoi { node, value } => {
                write!(f, "force of infection at node {node} is non-finite: {value}")
            }
        }
    }
}

impl Error for RuntimeError {}
