// ABOUTME: End-to-end tests for the LATS controller over a scripted gateway
// ABOUTME: Covers early solutions, budgets, rollouts, reflections, caching and telemetry

mod common;

use agentree_agents::lats::TerminationReason;
use agentree_agents::{Task, TreeSearchController};
use agentree_core::{Benchmark, LatsConfig};
use common::{finish, qa_environment, search, usage, ScriptedGateway};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn config(n_samples: usize, depth_limit: usize, max_iterations: usize) -> LatsConfig {
    LatsConfig {
        n_samples,
        depth_limit,
        max_iterations,
        testing: true,
        ..LatsConfig::default()
    }
}

fn controller(gateway: Arc<ScriptedGateway>, config: LatsConfig) -> TreeSearchController {
    TreeSearchController::new(
        gateway,
        qa_environment(),
        Benchmark::HotpotQA.capabilities(),
        config,
    )
}

fn capital_task() -> Task {
    Task::new("What is the capital of France?", "Paris")
}

#[tokio::test]
async fn test_immediate_solution_stops_after_expansion() {
    let gateway = Arc::new(ScriptedGateway::new().actions(|_| finish("Paris")));
    let mut lats = controller(gateway.clone(), config(1, 1, 10));

    let result = lats.generate(&capital_task(), true).await.unwrap();

    assert_eq!(result.termination, TerminationReason::Solved);
    assert_eq!(result.iterations, 1);
    assert!(result.is_solved());
    assert_eq!(result.answer.reward, 1.0);
    assert_eq!(result.answer.depth, 1);
    assert_eq!(result.answer.state.answer, "Paris");
    assert!(result.trajectory.contains("Action 1: Finish[Paris]"));
    assert!(result.trajectory.contains("Answer is CORRECT"));

    let snapshot = &result.additional_info[0];
    assert!(snapshot.simulation.is_none());
    assert!(snapshot.evaluation.is_empty());
    assert_eq!(ScriptedGateway::count(&gateway.score_requests), 0);
}

#[tokio::test]
async fn test_iteration_budget_returns_rollout_end() {
    let gateway = Arc::new(ScriptedGateway::new().scores(|_| 0.5));
    let mut lats = controller(gateway, config(2, 3, 1));

    let result = lats.generate(&capital_task(), true).await.unwrap();

    assert_eq!(result.termination, TerminationReason::IterationBudget);
    assert_eq!(result.iterations, 1);
    assert!(!result.answer.is_terminal);
    assert!(!result.is_solved());
    assert_eq!(result.answer.depth, 3);

    let simulation = result.additional_info[0].simulation.as_ref().unwrap();
    assert!((simulation.reward - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(simulation.visited.len(), 3);

    let tree = lats.tree().unwrap();
    let path = tree.path_to(result.answer.id).unwrap();
    assert_eq!(path.len(), 4);
    for &id in &path {
        let node = tree.get_node(id).unwrap();
        assert_eq!(node.visits, 1);
        assert!((node.value - 1.0 / 3.0).abs() < 1e-9);
    }

    let root_children = tree.children(tree.root_id());
    assert_eq!(root_children.len(), 2);
    let sibling = root_children
        .iter()
        .copied()
        .find(|id| !path.contains(id))
        .unwrap();
    assert_eq!(tree.get_node(sibling).unwrap().visits, 0);
}

#[tokio::test]
async fn test_solution_among_samples_ends_search() {
    let gateway = Arc::new(ScriptedGateway::new().actions(|i| {
        if i == 2 {
            finish("Paris")
        } else {
            search(&format!("France {}", i))
        }
    }));
    let mut lats = controller(gateway.clone(), config(3, 5, 10));

    let result = lats.generate(&capital_task(), true).await.unwrap();

    assert_eq!(result.termination, TerminationReason::Solved);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.additional_info[0].children.len(), 3);
    assert_eq!(result.answer.id, result.additional_info[0].children[2]);
    assert_eq!(ScriptedGateway::count(&gateway.thought_calls), 3);
    assert_eq!(ScriptedGateway::count(&gateway.score_requests), 0);
}

#[tokio::test]
async fn test_evaluation_leaves_node_values_untouched() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .actions(|i| if i == 0 { finish("London") } else { search("Paris") })
            .scores(|_| 0.7),
    );
    let mut lats = controller(gateway.clone(), config(2, 5, 10));
    let task = capital_task();

    let root = lats.ensure_tree(true);
    let expansion = lats.expand_node(&task, root).await.unwrap();
    assert_eq!(expansion.children.len(), 2);

    let evaluation = lats.evaluate_node(&task, root).await.unwrap();
    assert_eq!(evaluation.records.len(), 2);
    assert_eq!(evaluation.records[0].node, expansion.children[0]);
    assert_eq!(evaluation.records[0].value, None);
    assert_eq!(evaluation.records[1].value, Some(0.7));
    assert_eq!(ScriptedGateway::count(&gateway.scored_candidates), 1);

    let tree = lats.tree().unwrap();
    for &child in &expansion.children {
        let node = tree.get_node(child).unwrap();
        assert_eq!(node.value, 0.0);
        assert_eq!(node.visits, 0);
    }
}

#[tokio::test]
async fn test_value_cache_skips_repeat_scoring() {
    let task = capital_task();

    let cached = Arc::new(ScriptedGateway::new());
    let mut lats = controller(cached.clone(), config(2, 5, 10));
    let root = lats.ensure_tree(true);
    lats.expand_node(&task, root).await.unwrap();
    lats.evaluate_node(&task, root).await.unwrap();
    let second = lats.evaluate_node(&task, root).await.unwrap();

    assert!(second.records.iter().all(|r| r.cached));
    assert_eq!(ScriptedGateway::count(&cached.score_requests), 1);
    assert_eq!(lats.cached_values(), 2);

    let uncached = Arc::new(ScriptedGateway::new());
    let mut lats = controller(
        uncached.clone(),
        LatsConfig {
            cache_values: false,
            ..config(2, 5, 10)
        },
    );
    let root = lats.ensure_tree(true);
    lats.expand_node(&task, root).await.unwrap();
    lats.evaluate_node(&task, root).await.unwrap();
    let second = lats.evaluate_node(&task, root).await.unwrap();

    assert!(second.records.iter().all(|r| !r.cached));
    assert_eq!(ScriptedGateway::count(&uncached.score_requests), 2);
    assert_eq!(lats.cached_values(), 0);
}

#[tokio::test]
async fn test_duplicate_samples_are_dropped() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .thoughts(|_| "Look up France.".to_string())
            .actions(|_| search("France")),
    );
    let mut lats = controller(gateway, config(4, 5, 10));
    let task = capital_task();

    let root = lats.ensure_tree(true);
    let expansion = lats.expand_node(&task, root).await.unwrap();

    assert_eq!(expansion.children.len(), 1);
    assert_eq!(expansion.duplicates, 3);
    assert_eq!(lats.tree().unwrap().node_count(), 2);
}

#[tokio::test]
async fn test_expansion_at_depth_limit_is_idempotent() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut lats = controller(gateway.clone(), config(1, 1, 10));
    let task = capital_task();

    let root = lats.ensure_tree(true);
    let child = lats.expand_node(&task, root).await.unwrap().children[0];

    for _ in 0..2 {
        let expansion = lats.expand_node(&task, child).await.unwrap();
        assert!(expansion.children.is_empty());
        let tree = lats.tree().unwrap();
        assert!(tree.get_node(child).unwrap().is_terminal);
        assert_eq!(tree.node_count(), 2);
    }
    assert_eq!(ScriptedGateway::count(&gateway.thought_calls), 1);
}

#[tokio::test]
async fn test_failed_answers_feed_reflections() {
    let gateway = Arc::new(ScriptedGateway::new().actions(|i| match i {
        0 => finish("London"),
        1 => finish("Berlin"),
        n => search(&format!("France {}", n)),
    }));
    let mut lats = controller(
        gateway.clone(),
        LatsConfig {
            max_reflections: 3,
            max_unique: 5,
            ..config(2, 5, 10)
        },
    );
    let task = capital_task();

    let root = lats.ensure_tree(true);
    lats.expand_node(&task, root).await.unwrap();
    assert_eq!(lats.failed_trajectories().len(), 2);
    assert!(lats.reflections().is_empty());

    lats.expand_node(&task, root).await.unwrap();
    assert_eq!(ScriptedGateway::count(&gateway.reflect_calls), 2);
    let reflections = lats.reflections();
    assert_eq!(reflections.len(), 2);
    assert_eq!(reflections[0].reflection, "reflection 0");
    assert!(reflections[0].trajectory.contains("Finish[London]"));
    assert!(reflections[1].trajectory.contains("Finish[Berlin]"));

    let seen = gateway.reflections_seen.lock().unwrap().clone();
    assert_eq!(seen, vec![0, 0, 2, 2]);
}

#[tokio::test]
async fn test_reflections_skipped_at_capacity() {
    let gateway = Arc::new(ScriptedGateway::new().actions(|i| match i {
        0 => finish("London"),
        1 => finish("Berlin"),
        n => search(&format!("France {}", n)),
    }));
    let mut lats = controller(
        gateway.clone(),
        LatsConfig {
            max_reflections: 2,
            ..config(2, 5, 10)
        },
    );
    let task = capital_task();

    let root = lats.ensure_tree(true);
    lats.expand_node(&task, root).await.unwrap();
    lats.expand_node(&task, root).await.unwrap();

    assert_eq!(ScriptedGateway::count(&gateway.reflect_calls), 0);
    assert!(lats.reflections().is_empty());
    assert_eq!(lats.failed_trajectories().len(), 2);
}

#[tokio::test]
async fn test_rollout_reward_averages_step_maxima() {
    let gateway = Arc::new(ScriptedGateway::new().scores(|_| 0.6));
    let mut lats = controller(gateway, config(1, 3, 10));
    let task = capital_task();

    let root = lats.ensure_tree(true);
    lats.expand_node(&task, root).await.unwrap();
    let simulation = lats.simulate_node(&task, root).await.unwrap();

    assert_eq!(simulation.values_per_step, vec![vec![0.6], vec![0.6]]);
    assert!((simulation.reward - 0.4).abs() < 1e-9);
    assert_eq!(simulation.visited.len(), 3);

    let end = lats.tree().unwrap().get_node(simulation.terminal).unwrap();
    assert_eq!(end.depth, 3);
    assert!(!end.is_terminal);
}

#[tokio::test]
async fn test_solution_found_during_rollout() {
    let gateway = Arc::new(ScriptedGateway::new().actions(|i| {
        if i == 2 {
            finish("Paris")
        } else {
            search(&format!("France {}", i))
        }
    }));
    let mut lats = controller(gateway, config(1, 4, 10));

    let result = lats.generate(&capital_task(), true).await.unwrap();

    assert_eq!(result.termination, TerminationReason::Solved);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.answer.depth, 3);
    assert_eq!(result.answer.reward, 1.0);

    let simulation = result.additional_info[0].simulation.as_ref().unwrap();
    assert_eq!(simulation.reward, 1.0);
    assert_eq!(simulation.terminal, result.answer.id);

    let tree = lats.tree().unwrap();
    assert_eq!(tree.get_node(tree.root_id()).unwrap().visits, 1);
    assert_eq!(tree.get_node(tree.root_id()).unwrap().value, 1.0);
}

#[tokio::test]
async fn test_generate_reuses_tree_unless_reset() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut lats = controller(gateway, config(1, 3, 1));
    let task = capital_task();

    lats.generate(&task, true).await.unwrap();
    let tree = lats.tree().unwrap();
    assert_eq!(tree.node_count(), 4);
    assert_eq!(tree.get_node(tree.root_id()).unwrap().visits, 1);

    lats.generate(&task, false).await.unwrap();
    let tree = lats.tree().unwrap();
    assert_eq!(tree.node_count(), 4);
    assert_eq!(tree.get_node(tree.root_id()).unwrap().visits, 2);

    lats.generate(&task, true).await.unwrap();
    let tree = lats.tree().unwrap();
    assert_eq!(tree.node_count(), 4);
    assert_eq!(tree.get_node(tree.root_id()).unwrap().visits, 1);
}

#[tokio::test]
async fn test_cancelled_search_makes_no_calls() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut lats = controller(gateway.clone(), config(2, 3, 10));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = lats
        .generate_with_cancellation(&capital_task(), true, &cancel)
        .await
        .unwrap();

    assert_eq!(result.termination, TerminationReason::Cancelled);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.answer.depth, 0);
    assert!(result.trajectory.is_empty());
    assert_eq!(ScriptedGateway::count(&gateway.thought_calls), 0);
}

#[tokio::test]
async fn test_run_totals_sum_every_call() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .actions(|_| finish("Paris"))
            .usage_per_call(usage(100, 50, 0.001)),
    );
    let mut lats = controller(gateway, config(1, 1, 10));

    let result = lats.generate(&capital_task(), true).await.unwrap();

    // one thought and one action
    assert_eq!(result.totals.total_prompt_tokens, 200);
    assert_eq!(result.totals.total_completion_tokens, 100);
    assert_eq!(result.totals.total_tokens, 300);
    assert!((result.totals.total_cost - 0.004).abs() < 1e-12);
    assert!((result.totals.total_prompt_time - 0.02).abs() < 1e-12);
    assert_eq!(result.totals.total_time, 0.5);
}

#[tokio::test]
async fn test_terminal_root_exhausts_tree() {
    let gateway = Arc::new(ScriptedGateway::new());
    let mut lats = controller(gateway.clone(), config(2, 0, 5));

    let result = lats.generate(&capital_task(), true).await.unwrap();

    // the first iteration marks the root terminal, the second finds nothing to select
    assert_eq!(result.termination, TerminationReason::TreeExhausted);
    assert_eq!(result.iterations, 1);
    assert!(result.answer.is_terminal);
    assert_eq!(ScriptedGateway::count(&gateway.thought_calls), 0);
}
