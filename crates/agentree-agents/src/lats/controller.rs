// ABOUTME: LATS controller driving select, expand, evaluate, simulate and backpropagate
// ABOUTME: Owns the search tree, failed-trajectory log, reflections and value cache between runs

use super::search_tree::{NodeId, SearchTree, SearchTreeError, TrajectoryNode};
use crate::environment::Environment;
use crate::executor::Task;
use crate::recorder::{RunRecorder, RunTotals};
use crate::trajectory::think_act_observe;
use agentree_ai::{LlmGateway, PromptContext, Usage};
use agentree_core::{Capabilities, LatsConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A terminal node with full reward was reached
    Solved,
    IterationBudget,
    Cancelled,
    /// Selection came back to a root that is itself terminal
    TreeExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrajectory {
    pub trajectory: String,
    pub final_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub trajectory: String,
    pub reflection: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    /// New children in sampling order
    pub children: Vec<NodeId>,
    /// Samples dropped as exact repeats of an earlier sample
    pub duplicates: usize,
    pub usage: Usage,
}

/// Score for one child; `None` for terminal children, which are not scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub node: NodeId,
    pub value: Option<f64>,
    pub cached: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Aligned with the evaluated node's children
    pub records: Vec<ValueRecord>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub reward: f64,
    /// Node the rollout ended on
    pub terminal: NodeId,
    pub visited: Vec<NodeId>,
    pub children_per_step: Vec<Vec<NodeId>>,
    pub values_per_step: Vec<Vec<f64>>,
    pub usage: Usage,
}

/// Everything one iteration produced, enough to replay it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    pub iteration: usize,
    pub selected: NodeId,
    pub children: Vec<NodeId>,
    pub evaluation: Vec<ValueRecord>,
    /// Absent when the iteration ended early on a solved child
    pub simulation: Option<Simulation>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSearchResult {
    /// Winning node, or the last simulated one if the search never solved the task
    pub answer: TrajectoryNode,
    /// Rendered trajectory from the root to `answer`
    pub trajectory: String,
    pub termination: TerminationReason,
    pub iterations: usize,
    #[serde(flatten)]
    pub totals: RunTotals,
    pub additional_info: Vec<IterationSnapshot>,
}

impl TreeSearchResult {
    pub fn is_solved(&self) -> bool {
        self.answer.is_solution()
    }
}

/// Language Agent Tree Search over an LLM gateway and an environment.
///
/// One controller serves one trajectory at a time: each phase completes before
/// the next starts, and statistics only change in backpropagation.
pub struct TreeSearchController {
    gateway: Arc<dyn LlmGateway>,
    environment: Arc<dyn Environment>,
    capabilities: &'static Capabilities,
    config: LatsConfig,
    tree: Option<SearchTree>,
    failed_trajectories: Vec<FailedTrajectory>,
    reflections: Vec<Reflection>,
    // keyed by the candidate's rendered trajectory
    value_cache: HashMap<String, f64>,
}

impl TreeSearchController {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        capabilities: &'static Capabilities,
        config: LatsConfig,
    ) -> Self {
        Self {
            gateway,
            environment,
            capabilities,
            config,
            tree: None,
            failed_trajectories: Vec::new(),
            reflections: Vec::new(),
            value_cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LatsConfig {
        &self.config
    }

    pub fn tree(&self) -> Option<&SearchTree> {
        self.tree.as_ref()
    }

    pub fn failed_trajectories(&self) -> &[FailedTrajectory] {
        &self.failed_trajectories
    }

    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    pub fn cached_values(&self) -> usize {
        self.value_cache.len()
    }

    /// Drop the tree and everything learned while growing it
    pub fn reset(&mut self) {
        self.tree = None;
        self.failed_trajectories.clear();
        self.reflections.clear();
        self.value_cache.clear();
    }

    /// Plant a fresh root when `reset` is set or no tree exists; returns the root
    pub fn ensure_tree(&mut self, reset: bool) -> NodeId {
        if reset || self.tree.is_none() {
            self.reset();
            self.tree = Some(SearchTree::new());
        }
        self.tree.as_ref().map(SearchTree::root_id).unwrap_or_default()
    }

    fn tree_ref(&self) -> Result<&SearchTree, SearchTreeError> {
        self.tree
            .as_ref()
            .ok_or_else(|| SearchTreeError::InvalidOperation("no active search tree".to_string()))
    }

    fn tree_mut(&mut self) -> Result<&mut SearchTree, SearchTreeError> {
        self.tree
            .as_mut()
            .ok_or_else(|| SearchTreeError::InvalidOperation("no active search tree".to_string()))
    }

    fn reflection_texts(&self) -> Vec<String> {
        self.reflections
            .iter()
            .filter(|r| !r.reflection.is_empty())
            .map(|r| r.reflection.clone())
            .collect()
    }

    /// Node to expand next; see [`SearchTree::select`]
    pub fn select_node(&mut self) -> Result<NodeId, SearchTreeError> {
        let tree = self.tree_mut()?;
        let selected = tree.select();
        let node = tree.get_node(selected)?;

        debug!(
            target: "lats::selection",
            node = selected,
            depth = node.depth,
            visits = node.visits,
            value = node.value,
            "Node selected"
        );
        Ok(selected)
    }

    /// Failed trajectories with distinct final answers, first occurrence kept
    fn unique_failures(&self) -> Vec<FailedTrajectory> {
        let mut seen = HashSet::new();
        self.failed_trajectories
            .iter()
            .filter(|f| seen.insert(f.final_answer.as_str()))
            .take(self.config.max_unique)
            .cloned()
            .collect()
    }

    /// Regenerate reflections when new distinct failures have accumulated
    async fn refresh_reflections(&mut self, task: &Task) -> Usage {
        let unique = self.unique_failures();
        if unique.len() <= self.reflections.len() || unique.len() >= self.config.max_reflections {
            return Usage::default();
        }

        let mut usage = Usage::default();
        let mut reflections = Vec::with_capacity(unique.len());
        for failure in unique {
            let ctx = PromptContext {
                question: &task.question,
                scratchpad: &failure.trajectory,
                step: 0,
                examples: self.capabilities.fewshot_examples,
                reflections: &[],
            };
            let generation = self.gateway.reflect(&ctx).await;
            usage += generation.usage;
            reflections.push(Reflection {
                trajectory: failure.trajectory,
                reflection: generation.output,
            });
        }

        info!(
            target: "lats::reflection",
            count = reflections.len(),
            failures = self.failed_trajectories.len(),
            "Reflections regenerated"
        );
        self.reflections = reflections;
        usage
    }

    /// Sample up to `n_samples` continuations of `node` and attach them as children.
    ///
    /// At or beyond the depth limit the node is marked terminal and nothing is
    /// sampled.
    pub async fn expand_node(
        &mut self,
        task: &Task,
        node: NodeId,
    ) -> Result<Expansion, SearchTreeError> {
        let (depth, scratchpad, step) = {
            let tree = self.tree_ref()?;
            let depth = tree.get_node(node)?.depth;
            (depth, tree.scratchpad(node)?, tree.step_of(node)? + 1)
        };

        if depth >= self.config.depth_limit {
            self.tree_mut()?.mark_terminal(node)?;
            debug!(
                target: "lats::expansion",
                node,
                depth,
                "Depth limit reached, node is terminal"
            );
            return Ok(Expansion::default());
        }

        let mut usage = self.refresh_reflections(task).await;
        let reflections = self.reflection_texts();
        let ctx = PromptContext {
            question: &task.question,
            scratchpad: &scratchpad,
            step,
            examples: self.capabilities.fewshot_examples,
            reflections: &reflections,
        };

        let mut seen = HashSet::new();
        let mut samples = Vec::with_capacity(self.config.n_samples);
        let mut duplicates = 0;
        for _ in 0..self.config.n_samples {
            let result = think_act_observe(
                self.gateway.as_ref(),
                self.environment.as_ref(),
                &ctx,
                &task.key,
            )
            .await;
            usage += result.usage;

            let key = (
                result.record.thought.clone(),
                result.record.action_type.clone(),
                result.record.argument.clone(),
            );
            if seen.insert(key) {
                samples.push(result);
            } else {
                duplicates += 1;
            }
        }

        let mut failed = Vec::new();
        let mut children = Vec::with_capacity(samples.len());
        let tree = self.tree_mut()?;
        for sample in samples {
            let trajectory = format!("{}{}", scratchpad, sample.record.render(step));
            let final_answer = sample.record.answer.clone();

            let id = tree.create_child(node, sample.record)?;
            let child = tree.get_node_mut(id)?;
            child.is_terminal = sample.done;
            child.reward = sample.reward;

            if sample.done && sample.reward == 0.0 {
                failed.push(FailedTrajectory {
                    trajectory,
                    final_answer,
                });
            }
            children.push(id);
        }

        let attached = tree.add_children(node, &children);
        debug_assert!(attached.is_ok(), "expansion of {node} broke the tree: {attached:?}");
        attached?;

        let terminal = children
            .iter()
            .filter(|&&c| tree.get_node(c).is_ok_and(|n| n.is_terminal))
            .count();
        info!(
            target: "lats::expansion",
            node,
            depth,
            children = children.len(),
            terminal,
            duplicates,
            "Node expanded"
        );

        self.failed_trajectories.extend(failed);
        Ok(Expansion {
            children,
            duplicates,
            usage,
        })
    }

    /// Score the children of `node`.
    ///
    /// Informational only: no node's value changes here.
    pub async fn evaluate_node(
        &mut self,
        task: &Task,
        node: NodeId,
    ) -> Result<Evaluation, SearchTreeError> {
        let (scratchpad, step, children) = {
            let tree = self.tree_ref()?;
            let mut children = Vec::new();
            for &child in tree.children(node) {
                let is_terminal = tree.get_node(child)?.is_terminal;
                children.push((child, is_terminal, tree.scratchpad(child)?));
            }
            (tree.scratchpad(node)?, tree.step_of(node)? + 1, children)
        };

        let mut records = Vec::with_capacity(children.len());
        let mut pending: Vec<(usize, String)> = Vec::new();
        for (child, is_terminal, trajectory) in children {
            if !is_terminal && self.config.cache_values {
                if let Some(&value) = self.value_cache.get(&trajectory) {
                    records.push(ValueRecord {
                        node: child,
                        value: Some(value),
                        cached: true,
                    });
                    continue;
                }
            }
            if !is_terminal {
                pending.push((records.len(), trajectory));
            }
            records.push(ValueRecord {
                node: child,
                value: None,
                cached: false,
            });
        }

        let mut usage = Usage::default();
        if !pending.is_empty() {
            let reflections = self.reflection_texts();
            let ctx = PromptContext {
                question: &task.question,
                scratchpad: &scratchpad,
                step,
                examples: self.capabilities.fewshot_examples,
                reflections: &reflections,
            };
            let candidates: Vec<String> = pending.iter().map(|(_, t)| t.clone()).collect();
            let generation = self.gateway.score_candidates(&ctx, &candidates).await;
            usage = generation.usage;

            for (i, (index, trajectory)) in pending.into_iter().enumerate() {
                let value = generation.output.get(i).copied().unwrap_or(0.0);
                records[index].value = Some(value);
                if self.config.cache_values {
                    self.value_cache.insert(trajectory, value);
                }
            }
        }

        debug!(
            target: "lats::evaluation",
            node,
            children = records.len(),
            cached = records.iter().filter(|r| r.cached).count(),
            "Children evaluated"
        );
        Ok(Evaluation { records, usage })
    }

    /// Roll out from the best-valued child of `node` until a terminal node or the depth limit
    pub async fn simulate_node(
        &mut self,
        task: &Task,
        node: NodeId,
    ) -> Result<Simulation, SearchTreeError> {
        let start = self.tree_ref()?.best_child_by_value(node).unwrap_or(node);
        let mut current = start;
        let mut visited = vec![start];
        let mut children_per_step = Vec::new();
        let mut values_per_step = Vec::new();
        let mut step_maxima = Vec::new();
        let mut usage = Usage::default();

        loop {
            let (is_terminal, depth) = {
                let n = self.tree_ref()?.get_node(current)?;
                (n.is_terminal, n.depth)
            };
            if is_terminal || depth >= self.config.depth_limit {
                break;
            }

            let expansion = self.expand_node(task, current).await?;
            usage += expansion.usage;
            if expansion.children.is_empty() {
                break;
            }
            children_per_step.push(expansion.children);

            if let Some(best) = self.tree_ref()?.best_terminal_child(current) {
                values_per_step.push(Vec::new());
                visited.push(best);
                current = best;
                break;
            }

            let evaluation = self.evaluate_node(task, current).await?;
            usage += evaluation.usage;

            let values: Vec<f64> = evaluation
                .records
                .iter()
                .map(|r| r.value.unwrap_or(0.0))
                .collect();
            let mut best = 0;
            for (i, &v) in values.iter().enumerate() {
                if v > values[best] {
                    best = i;
                }
            }
            step_maxima.push(values[best]);
            values_per_step.push(values);

            current = evaluation.records[best].node;
            visited.push(current);
        }

        let end = self.tree_ref()?.get_node(current)?;
        let reward = if end.is_terminal {
            end.reward
        } else {
            step_maxima.iter().sum::<f64>() / (step_maxima.len() + 1) as f64
        };

        debug!(
            target: "lats::simulation",
            start,
            end = current,
            steps = visited.len(),
            reward,
            terminal = end.is_terminal,
            "Simulation finished"
        );

        Ok(Simulation {
            reward,
            terminal: current,
            visited,
            children_per_step,
            values_per_step,
            usage,
        })
    }

    pub fn backpropagate_node(&mut self, node: NodeId, value: f64) -> Result<(), SearchTreeError> {
        self.tree_mut()?.backpropagate(node, value)?;
        debug!(target: "lats::backprop", node, value, "Backpropagated");
        Ok(())
    }

    /// Search until solved or out of iterations.
    ///
    /// The existing tree is reused unless `reset` is set or there is none yet.
    pub async fn generate(
        &mut self,
        task: &Task,
        reset: bool,
    ) -> Result<TreeSearchResult, SearchTreeError> {
        self.generate_with_cancellation(task, reset, &CancellationToken::new())
            .await
    }

    /// As [`TreeSearchController::generate`], checking `cancel` between iterations
    pub async fn generate_with_cancellation(
        &mut self,
        task: &Task,
        reset: bool,
        cancel: &CancellationToken,
    ) -> Result<TreeSearchResult, SearchTreeError> {
        let root = self.ensure_tree(reset);
        let recorder = RunRecorder::start(self.config.testing);
        let mut snapshots: Vec<IterationSnapshot> = Vec::new();
        let mut answer: Option<NodeId> = None;
        let mut termination = TerminationReason::IterationBudget;

        info!(
            target: "lats::controller",
            max_iterations = self.config.max_iterations,
            n_samples = self.config.n_samples,
            depth_limit = self.config.depth_limit,
            "Starting LATS search"
        );

        for iteration in 0..self.config.max_iterations {
            if cancel.is_cancelled() {
                info!(target: "lats::controller", iteration, "Search cancelled");
                termination = TerminationReason::Cancelled;
                break;
            }

            let selected = self.select_node()?;
            if selected == root && self.tree_ref()?.get_node(root)?.is_terminal {
                info!(target: "lats::controller", iteration, "Tree exhausted");
                termination = TerminationReason::TreeExhausted;
                break;
            }

            let expansion = self.expand_node(task, selected).await?;
            let mut usage = expansion.usage;

            let solved = {
                let tree = self.tree_ref()?;
                expansion
                    .children
                    .iter()
                    .copied()
                    .find(|&c| tree.get_node(c).is_ok_and(|n| n.is_solution()))
            };
            if let Some(winner) = solved {
                info!(
                    target: "lats::controller",
                    iteration,
                    node = winner,
                    "Solution found during expansion"
                );
                snapshots.push(IterationSnapshot {
                    iteration,
                    selected,
                    children: expansion.children,
                    evaluation: Vec::new(),
                    simulation: None,
                    usage,
                });
                answer = Some(winner);
                termination = TerminationReason::Solved;
                break;
            }

            let evaluation = self.evaluate_node(task, selected).await?;
            usage += evaluation.usage;

            let simulation = self.simulate_node(task, selected).await?;
            usage += simulation.usage;

            self.backpropagate_node(simulation.terminal, simulation.reward)?;
            answer = Some(simulation.terminal);
            let halted = self
                .tree_ref()?
                .get_node(simulation.terminal)?
                .is_solution();

            debug!(
                target: "lats::controller",
                iteration,
                selected,
                reward = simulation.reward,
                tokens = usage.total_tokens,
                "Iteration completed"
            );

            snapshots.push(IterationSnapshot {
                iteration,
                selected,
                children: expansion.children,
                evaluation: evaluation.records,
                simulation: Some(simulation),
                usage,
            });

            if halted {
                termination = TerminationReason::Solved;
                break;
            }
        }

        let answer_id = answer.unwrap_or(root);
        let tree = self.tree_ref()?;
        let answer_node = tree.get_node(answer_id)?.clone();
        let trajectory = tree.scratchpad(answer_id)?;
        let totals = recorder.finish(snapshots.iter().map(|s| &s.usage));

        info!(
            target: "lats::controller",
            termination = ?termination,
            iterations = snapshots.len(),
            nodes = tree.node_count(),
            reward = answer_node.reward,
            total_tokens = totals.total_tokens,
            "LATS search finished"
        );

        Ok(TreeSearchResult {
            answer: answer_node,
            trajectory,
            termination,
            iterations: snapshots.len(),
            totals,
            additional_info: snapshots,
        })
    }
}
