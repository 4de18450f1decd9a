// ABOUTME: LATS (Language Agent Tree Search) algorithm implementation
// ABOUTME: Provides the search tree, the tree-search controller and its executor

pub mod controller;
pub mod executor;
pub mod search_tree;

pub use controller::{
    Evaluation, Expansion, FailedTrajectory, IterationSnapshot, Reflection, Simulation,
    TerminationReason, TreeSearchController, TreeSearchResult, ValueRecord,
};
pub use executor::LATSExecutor;
pub use search_tree::{NodeId, SearchTree, SearchTreeError, TrajectoryNode};
