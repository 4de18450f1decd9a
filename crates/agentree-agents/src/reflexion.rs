// ABOUTME: Bounded think-act-observe loop with optional self-reflection between failed trials
// ABOUTME: Plain ReAct is the single-trial, reflection-free configuration of the same loop

use crate::environment::Environment;
use crate::executor::Task;
use crate::experience::{Experience, ExperienceStore};
use crate::trajectory::{think_act_observe, StepRecord};
use agentree_ai::{LlmGateway, PromptContext, Usage};
use agentree_core::{Capabilities, ReflexionConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Few-shot examples pulled from the experience store per trial
const RETRIEVED_EXAMPLES: usize = 2;

/// One trial: up to `max_steps` steps, ended early by a terminal action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub steps: Vec<StepRecord>,
    pub scratchpad: String,
    pub answer: String,
    pub reward: f64,
    pub done: bool,
}

impl TrialRecord {
    pub fn succeeded(&self) -> bool {
        self.done && self.reward >= 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopOutcome {
    pub trials: Vec<TrialRecord>,
    /// Reflections alive at the end of the run, oldest first
    pub reflections: Vec<String>,
    pub usage: Usage,
}

impl LoopOutcome {
    /// The last trial, the one whose answer counts
    pub fn final_trial(&self) -> Option<&TrialRecord> {
        self.trials.last()
    }

    pub fn answer(&self) -> &str {
        self.final_trial().map(|t| t.answer.as_str()).unwrap_or("")
    }

    pub fn reward(&self) -> f64 {
        self.final_trial().map(|t| t.reward).unwrap_or(0.0)
    }

    pub fn is_correct(&self) -> bool {
        self.final_trial().is_some_and(TrialRecord::succeeded)
    }

    pub fn steps_taken(&self) -> usize {
        self.trials.iter().map(|t| t.steps.len()).sum()
    }
}

pub struct ReflectionStrategyLoop {
    gateway: Arc<dyn LlmGateway>,
    environment: Arc<dyn Environment>,
    capabilities: &'static Capabilities,
    config: ReflexionConfig,
    reflect: bool,
    experience: Option<Arc<dyn ExperienceStore>>,
}

impl ReflectionStrategyLoop {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        capabilities: &'static Capabilities,
        config: ReflexionConfig,
    ) -> Self {
        Self {
            gateway,
            environment,
            capabilities,
            config,
            reflect: true,
            experience: None,
        }
    }

    /// Single trial, no reflection
    pub fn react(
        gateway: Arc<dyn LlmGateway>,
        environment: Arc<dyn Environment>,
        capabilities: &'static Capabilities,
        max_steps: usize,
    ) -> Self {
        let config = ReflexionConfig {
            max_steps,
            max_trials: 1,
            ..Default::default()
        };
        Self::new(gateway, environment, capabilities, config).with_reflection(false)
    }

    pub fn with_reflection(mut self, enabled: bool) -> Self {
        self.reflect = enabled;
        self
    }

    pub fn with_experience_store(mut self, store: Arc<dyn ExperienceStore>) -> Self {
        self.experience = Some(store);
        self
    }

    pub fn config(&self) -> &ReflexionConfig {
        &self.config
    }

    fn examples_for(&self, question: &str) -> String {
        let mut examples = self.capabilities.fewshot_examples.to_string();
        if let Some(store) = &self.experience {
            for experience in store.retrieve(question, RETRIEVED_EXAMPLES) {
                examples.push_str("\n\n");
                examples.push_str(&experience.as_example());
            }
        }
        examples
    }

    async fn run_trial(
        &self,
        task: &Task,
        examples: &str,
        reflections: &[String],
        usage: &mut Usage,
    ) -> TrialRecord {
        let mut scratchpad = String::new();
        let mut steps = Vec::new();
        let mut reward = 0.0;
        let mut done = false;
        let mut answer = String::new();

        for step in 1..=self.config.max_steps {
            let ctx = PromptContext {
                question: &task.question,
                scratchpad: &scratchpad,
                step,
                examples,
                reflections,
            };
            let result = think_act_observe(
                self.gateway.as_ref(),
                self.environment.as_ref(),
                &ctx,
                &task.key,
            )
            .await;
            *usage += result.usage;

            debug!(
                target: "agents::react",
                step,
                action = %result.record.action_type,
                done = result.done,
                "Step completed"
            );

            scratchpad.push_str(&result.record.render(step));
            reward = result.reward;
            done = result.done;
            if done {
                answer = result.record.answer.clone();
            }
            steps.push(result.record);

            if done {
                break;
            }
        }

        TrialRecord {
            steps,
            scratchpad,
            answer,
            reward,
            done,
        }
    }

    /// Run up to `max_trials` trials, reflecting after `patience` consecutive failures
    pub async fn run(&self, task: &Task) -> LoopOutcome {
        let mut trials = Vec::new();
        let mut reflections: Vec<String> = Vec::new();
        let mut usage = Usage::default();
        let mut consecutive_failures = 0;
        let patience = self.config.patience.max(1);
        let examples = self.examples_for(&task.question);

        for trial_index in 0..self.config.max_trials {
            let trial = self
                .run_trial(task, &examples, &reflections, &mut usage)
                .await;

            if let Some(store) = &self.experience {
                store.record(Experience {
                    question: task.question.clone(),
                    trajectory: trial.scratchpad.clone(),
                    reward: trial.reward,
                    succeeded: trial.succeeded(),
                });
            }

            let succeeded = trial.succeeded();
            info!(
                target: "agents::reflexion",
                trial = trial_index + 1,
                steps = trial.steps.len(),
                succeeded,
                "Trial finished"
            );

            let failed_scratchpad = trial.scratchpad.clone();
            trials.push(trial);
            if succeeded {
                break;
            }

            consecutive_failures += 1;
            let more_trials = trial_index + 1 < self.config.max_trials;
            if self.reflect && more_trials && consecutive_failures >= patience {
                let ctx = PromptContext {
                    question: &task.question,
                    scratchpad: &failed_scratchpad,
                    step: 0,
                    examples: self.capabilities.fewshot_examples,
                    reflections: &reflections,
                };
                let reflection = self.gateway.reflect(&ctx).await;
                usage += reflection.usage;
                consecutive_failures = 0;

                if !reflection.output.is_empty() {
                    reflections.push(reflection.output);
                    if reflections.len() > self.config.max_reflections {
                        reflections.remove(0);
                    }
                    debug!(
                        target: "agents::reflexion",
                        stored = reflections.len(),
                        "Reflection added"
                    );
                }
            }
        }

        LoopOutcome {
            trials,
            reflections,
            usage,
        }
    }
}
