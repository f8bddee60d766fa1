//! Rewrites the registry URLs embedded in versioned flows between the address
//! a registry has inside its own network and the aliases external callers use.

pub mod alias;
pub mod config;
pub mod error;
pub mod flow;

pub use crate::alias::{AliasPair, AliasRewriter};
pub use crate::error::InvalidConfiguration;
pub use crate::flow::{
    FlowCoordinates, FlowNode, FlowSnapshot, ProcessGroup, RegistryCoordinates,
};
