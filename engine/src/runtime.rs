//! Pipeline runtime
//!
//! Sequences one question through the control plane:
//!
//! 1. Read `last_user_question` and the episodic tail through the memory router
//! 2. Apply forgetting and the retrieval-forcing advisory (policy mode only)
//! 3. Classify and plan
//! 4. Execute the plan against the retriever
//! 5. Assess the gathered evidence and pick answer / hedge / refuse
//! 6. Generate the final text
//! 7. Write the semantic keys (through the write filter) and one episodic record
//! 8. Append the run trace to `traces.jsonl`
//!
//! Steps run strictly in order. Collaborator and storage failures abort the
//! run unretried.

use crate::conductor::executor::DEFAULT_K;
use crate::conductor::types::{Action, Plan, RetrievalDecision, StepResult};
use crate::conductor::{Executor, Planner};
use crate::config::Config;
use crate::evidence::{EvidenceAssessment, EvidenceAssessor, EvidenceThresholds};
use crate::generator::Generator;
use crate::memory::working::{WorkingMemory, WorkingSnapshot};
use crate::memory::MemoryRouter;
use crate::policy::write_filter::{
    allow_semantic_write, DEFAULT_MAX_VALUE_CHARS, LAST_ANSWER_PREVIEW, LAST_USER_QUESTION,
};
use crate::policy::{forgetting, retrieval, GenerationDecision, GenerationPolicy};
use crate::tools::corpus::CorpusRetriever;
use sdk::collaborators::{LanguageModel, Retriever};
use sdk::errors::EngineError;
use sdk::types::RetrievedChunk;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Characters of the answer kept as `last_answer_preview`
const ANSWER_PREVIEW_CHARS: usize = 200;

/// Memory knobs applied by the runtime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeSettings {
    pub episodic_tail: usize,
    pub forgetting_max_records: usize,
    pub max_semantic_value_chars: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            episodic_tail: 10,
            forgetting_max_records: forgetting::DEFAULT_MAX_RECORDS,
            max_semantic_value_chars: DEFAULT_MAX_VALUE_CHARS,
        }
    }
}

/// Memory accesses made during one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySummary {
    pub semantic_reads: BTreeMap<String, Value>,
    pub episodic_reads: EpisodicReads,
    /// Keys actually written; filtered keys are absent
    pub semantic_writes: Vec<String>,
    pub episodic_write: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodicReads {
    pub recent_episodes_n: usize,
}

/// Complete record of one run, appended to the trace log
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    pub run_id: String,
    pub question: String,
    pub retrieval_decision: RetrievalDecision,
    pub plan: Plan,
    pub execution: Vec<StepResult>,
    pub executor_decision: Action,
    pub evidence_assessment: EvidenceAssessment,
    pub generation_decision: GenerationDecision,
    pub final_answer: String,
    pub memory: MemorySummary,
    pub working_memory: WorkingSnapshot,
    /// Whether memory policies were enforced
    pub policy_mode: bool,
}

/// Retrieved material merged across retrieve steps
#[derive(Debug, Default)]
struct Gathered {
    decision: Option<Action>,
    context: Vec<String>,
    chunks: Vec<RetrievedChunk>,
}

impl Gathered {
    /// Concatenate every retrieve step's chunks in step order. Context lines
    /// are limited to each step's own `k`.
    fn from_execution(execution: &[StepResult]) -> Self {
        let mut gathered = Gathered::default();

        for step in execution {
            if step.action != Action::Retrieve {
                continue;
            }
            gathered.decision = Some(Action::Retrieve);

            let k = step
                .args
                .get("k")
                .and_then(Value::as_u64)
                .map(|k| k as usize)
                .unwrap_or(DEFAULT_K);
            let chunks = step.tool_result.chunks();

            gathered.context.extend(
                chunks
                    .iter()
                    .take(k)
                    .map(|c| format!("[{}] {}", c.chunk_id, c.text)),
            );
            gathered.chunks.extend_from_slice(chunks);
        }

        gathered
    }

    fn executor_decision(&self) -> Action {
        self.decision.unwrap_or(Action::Noop)
    }

    fn context(&self) -> String {
        self.context.join("\n\n")
    }
}

pub struct Runtime {
    planner: Planner,
    executor: Executor,
    assessor: EvidenceAssessor,
    generator: Generator,
    model: Arc<dyn LanguageModel>,
    memory: MemoryRouter,
    settings: RuntimeSettings,
    trace_path: PathBuf,
}

impl Runtime {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn LanguageModel>,
        memory: MemoryRouter,
        trace_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            planner: Planner::new(),
            executor: Executor::new(retriever),
            assessor: EvidenceAssessor::new(EvidenceThresholds::default()),
            generator: Generator::new(),
            model,
            memory,
            settings: RuntimeSettings::default(),
            trace_path: trace_path.into(),
        }
    }

    /// Build the runtime described by `config`: corpus retriever, configured
    /// language model, memory under `data_dir/memory`.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let retriever = Arc::new(CorpusRetriever::new(config.corpus_settings()));
        let model = crate::llm::from_config(config)?;
        let memory = MemoryRouter::in_dir(&config.memory_dir());

        Ok(Self::new(retriever, model, memory, config.traces_path())
            .with_thresholds(config.evidence_thresholds())
            .with_settings(RuntimeSettings {
                episodic_tail: config.memory.episodic_tail,
                forgetting_max_records: config.memory.forgetting_max_records,
                max_semantic_value_chars: config.memory.max_semantic_value_chars,
            }))
    }

    pub fn with_thresholds(mut self, thresholds: EvidenceThresholds) -> Self {
        self.assessor = EvidenceAssessor::new(thresholds);
        self
    }

    pub fn with_settings(mut self, settings: RuntimeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn memory(&self) -> &MemoryRouter {
        &self.memory
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn trace_path(&self) -> &Path {
        &self.trace_path
    }

    /// Episodic tail as the planner would see it
    pub fn recent_episodes(&self, enforce_policies: bool) -> Result<Vec<Value>, EngineError> {
        let recent = self.memory.read_recent_episodic(self.settings.episodic_tail)?;
        if enforce_policies {
            Ok(forgetting::apply(
                &recent,
                self.settings.forgetting_max_records,
            ))
        } else {
            Ok(recent)
        }
    }

    /// Answer one question end to end and return the run trace
    pub async fn run(
        &self,
        question: &str,
        k: usize,
        enforce_policies: bool,
    ) -> Result<RunTrace, EngineError> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id);

        self.run_inner(run_id, question, k, enforce_policies)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: String,
        question: &str,
        k: usize,
        enforce_policies: bool,
    ) -> Result<RunTrace, EngineError> {
        let mut wm = WorkingMemory::with_goal(question);

        let last_user_question = self.memory.read_semantic(LAST_USER_QUESTION)?;
        let recent_episodes = self.recent_episodes(enforce_policies)?;
        let advisory = enforce_policies
            && retrieval::advise(&wm, &recent_episodes) == Some(true);

        let (retrieval_decision, plan) =
            self.planner
                .decide_and_plan(question, k, advisory, Some(&mut wm));

        let execution = self.executor.execute(&plan, &mut wm).await?;

        let gathered = Gathered::from_execution(&execution);
        let executor_decision = gathered.executor_decision();
        let evidence_assessment =
            self.assessor
                .assess(question, executor_decision, &gathered.chunks);
        info!(
            sufficiency = ?evidence_assessment.sufficiency,
            max_similarity = evidence_assessment.max_similarity,
            coverage_score = evidence_assessment.coverage_score,
            "Evidence assessed"
        );

        let generation_decision = GenerationPolicy::decide(&evidence_assessment);
        info!(decision = ?generation_decision.decision, "Generation policy decided");

        let final_answer = self
            .generator
            .generate(
                question,
                &gathered.context(),
                &generation_decision,
                self.model.as_ref(),
            )
            .await?;

        let preview: String = final_answer.chars().take(ANSWER_PREVIEW_CHARS).collect();
        let mut semantic_writes = Vec::new();
        for (key, value) in [
            (LAST_USER_QUESTION, json!(question)),
            (LAST_ANSWER_PREVIEW, json!(preview)),
        ] {
            if !enforce_policies
                || allow_semantic_write(key, &value, self.settings.max_semantic_value_chars)
            {
                self.memory.write_semantic(key, value)?;
                semantic_writes.push(key.to_string());
            } else {
                tracing::debug!(key, "Semantic write filtered");
            }
        }

        let used_retrieval = execution.iter().any(|s| s.action == Action::Retrieve);
        self.memory.write_episodic(&json!({
            "ts_utc": chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            "run_id": run_id,
            "question": question,
            "plan_actions": plan.actions(),
            "used_retrieval": used_retrieval,
            "last_user_question_before_run": last_user_question,
            "recent_episode_count_before_run": recent_episodes.len(),
            "event": "evidence_assessment",
            "executor_decision": executor_decision,
            "evidence_assessment": evidence_assessment,
            "generation_policy_decision": generation_decision.decision,
            "produced_text": !final_answer.is_empty(),
        }))?;

        let trace = RunTrace {
            run_id,
            question: question.to_string(),
            retrieval_decision,
            plan,
            execution,
            executor_decision,
            evidence_assessment,
            generation_decision,
            final_answer,
            memory: MemorySummary {
                semantic_reads: BTreeMap::from([(
                    LAST_USER_QUESTION.to_string(),
                    last_user_question.unwrap_or(Value::Null),
                )]),
                episodic_reads: EpisodicReads {
                    recent_episodes_n: recent_episodes.len(),
                },
                semantic_writes,
                episodic_write: "append".to_string(),
            },
            working_memory: wm.snapshot(),
            policy_mode: enforce_policies,
        };

        append_trace(&self.trace_path, &trace)?;
        info!(
            decision = ?trace.generation_decision.decision,
            "Run complete"
        );

        Ok(trace)
    }
}

/// Append `trace` as one JSON line to the trace log at `path`
pub fn append_trace(path: &Path, trace: &RunTrace) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut line = serde_json::to_string(trace)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}
