//! Activation bookkeeping: the per-operation transaction, the per-workflow
//! active lists it feeds, and the strategies that decide what gets activated.

pub mod active_lists;
pub mod state_manager;
pub mod strategy;

pub use active_lists::{ActiveFiles, ActiveListsManager};
pub use state_manager::{ActivationChange, ActivationChanges, ActivationStateManager, ActiveInfo};
pub use strategy::{
    ActivationStrategy, ActiveState, DefaultActivationStrategy,
    MutuallyExclusiveActivationStrategy, SharedStrategy, StrategyKind,
};
