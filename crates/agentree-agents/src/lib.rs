// ABOUTME: Reasoning agents built on the LLM gateway: ReAct, Reflexion and LATS tree search
// ABOUTME: Exposes the environment contract, experience memory, executors and their factory

pub mod environment;
pub mod executor;
pub mod executor_factory;
pub mod executor_trait;
pub mod experience;
#[cfg(feature = "lats")]
pub mod lats;
pub mod react_executor;
pub mod recorder;
pub mod reflexion;
#[cfg(feature = "reflexion")]
pub mod reflexion_executor;
pub mod trajectory;

pub use environment::{ActionTool, BenchmarkEnvironment, Environment, StepOutcome, ToolOutput};
pub use executor::{AgentOutput, AgentreeExecutor, AgentreeExecutorBuilder, ExecutorError, Task};
pub use executor_factory::AgentExecutorFactory;
pub use executor_trait::AgentExecutorTrait;
pub use experience::{Experience, ExperienceStore, InMemoryExperienceStore};
#[cfg(feature = "lats")]
pub use lats::{
    LATSExecutor, NodeId, SearchTree, SearchTreeError, TerminationReason, TrajectoryNode,
    TreeSearchController, TreeSearchResult,
};
pub use react_executor::ReActExecutor;
pub use recorder::{RunRecorder, RunTotals};
pub use reflexion::{LoopOutcome, ReflectionStrategyLoop, TrialRecord};
#[cfg(feature = "reflexion")]
pub use reflexion_executor::ReflexionExecutor;
pub use trajectory::{think_act_observe, StepRecord, StepResult};
