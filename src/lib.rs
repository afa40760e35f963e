//! A metapopulation epidemic simulation engine: a ward/link network model,
//! a pluggable staged day loop (mover, iterator, mixer, extractor), and the
//! stochastic disease-progression and infection kernels that drive it.

pub mod disease;
pub mod error;
pub mod extract;
pub mod infections;
pub mod iterate;
pub mod mix;
pub mod mover;
pub mod network;
pub mod parameters;
pub mod plugins;
pub mod population;
pub mod rng;
pub mod runner;
pub mod seeds;
pub mod stage;
pub mod variables;
pub mod ward;

pub use disease::Disease;
pub use error::{ConfigError, PluginError, RuntimeError, TopologyError};
pub use infections::Infections;
pub use network::{Demographic, Demographics, Network, Networks};
pub use parameters::Parameters;
pub use population::Population;
pub use runner::Simulation;
pub use seeds::SeedEvent;
pub use stage::{FunctionProvider, Model, Stage, StageContext};
pub use variables::{VariableSet, VariableSets};
pub use ward::{Dest, Ward, WardInfo, Wards};
