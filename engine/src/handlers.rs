//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - ask: Run a question through the full pipeline
//! - classify / plan / execute: Probe the conductor stages
//! - rank / assess: Run the ranker, assessor, and generation policy offline
//! - history / memory get: Read persisted memory through the router
//! - config show / path: Inspect configuration

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conductor::types::{Action, Plan};
use crate::conductor::{Classifier, Executor, Planner};
use crate::config::Config;
use crate::evidence::EvidenceAssessor;
use crate::memory::{MemoryRouter, WorkingMemory};
use crate::policy::{forgetting, retrieval, GenerationPolicy};
use crate::ranker::{self, RankCandidate};
use crate::runtime::Runtime;
use crate::tools::corpus::CorpusRetriever;
use sdk::errors::EngineError;
use sdk::types::RetrievedChunk;

/// Fields a ranker row cannot do without
const RANK_REQUIRED: &[&str] = &["question_id"];

/// Fields an evidence candidate cannot do without
const CHUNK_REQUIRED: &[&str] = &["chunk_id"];

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Answer a question through the full pipeline
pub async fn handle_ask(
    question: String,
    k: Option<usize>,
    no_policies: bool,
    trace_out: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let runtime = Runtime::from_config(config).context("Failed to build runtime")?;
    let k = k.unwrap_or(config.retrieval.top_k);
    let enforce_policies = config.memory.enforce_policies && !no_policies;

    let trace = runtime.run(&question, k, enforce_policies).await?;

    if let Some(path) = trace_out {
        let pretty = serde_json::to_string_pretty(&trace)?;
        fs::write(&path, pretty)
            .with_context(|| format!("Failed to write trace to {}", path.display()))?;
    }

    match format {
        OutputFormat::Text => {
            println!("{}", trace.final_answer.trim_end());
            println!();
            println!(
                "Decision: {} ({})",
                serde_json::to_value(&trace.generation_decision.decision)?
                    .as_str()
                    .unwrap_or_default(),
                trace.evidence_assessment.rationale
            );
            println!("  Run ID: {}", trace.run_id);
            println!("  Executor: {}", trace.executor_decision);
            println!(
                "  Evidence: max_similarity={:.3} coverage={:.2}",
                trace.evidence_assessment.max_similarity, trace.evidence_assessment.coverage_score
            );
            println!("  Trace: {}", runtime.trace_path().display());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }
    }

    Ok(())
}

/// Show the retrieval-necessity decision for a question
pub fn handle_classify(question: String, format: OutputFormat) -> Result<()> {
    let decision = Classifier::new().decide(&question);

    match format {
        OutputFormat::Text => {
            println!("Requires external evidence: {}", decision.requires_external_evidence);
            println!("  Rationale: {}", decision.decision_rationale);
            println!(
                "  Confidence: {}",
                serde_json::to_value(&decision.confidence)?
                    .as_str()
                    .unwrap_or_default()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }

    Ok(())
}

/// Show the plan for a question, using the live memory advisory
pub fn handle_plan(
    question: String,
    k: Option<usize>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let memory = MemoryRouter::in_dir(&config.memory_dir());
    let mut wm = WorkingMemory::with_goal(question.as_str());

    let advisory = if config.memory.enforce_policies {
        let recent = memory.read_recent_episodic(config.memory.episodic_tail)?;
        let recent = forgetting::apply(&recent, config.memory.forgetting_max_records);
        retrieval::advise(&wm, &recent) == Some(true)
    } else {
        false
    };

    let (decision, plan) = Planner::new().decide_and_plan(
        &question,
        k.unwrap_or(config.retrieval.top_k),
        advisory,
        Some(&mut wm),
    );

    match format {
        OutputFormat::Text => {
            println!("Objective: {}", plan.objective);
            println!("  Memory advisory: {}", advisory);
            println!("  Classifier: {}", decision.decision_rationale);
            for step in &plan.steps {
                println!("  Step {}: {} {}", step.step_id, step.action, step.args);
                println!("    Rationale: {}", step.rationale);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "retrieval_decision": decision,
                "memory_advisory": advisory,
                "plan": plan,
                "working_memory": wm.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Execute a plan file against the configured corpus
pub async fn handle_execute(plan_path: PathBuf, config: &Config, format: OutputFormat) -> Result<()> {
    let raw = fs::read_to_string(&plan_path)
        .with_context(|| format!("Failed to read plan {}", plan_path.display()))?;
    let plan = Plan::from_json(&raw)?;

    let executor = Executor::new(Arc::new(CorpusRetriever::new(config.corpus_settings())));
    let mut wm = WorkingMemory::with_goal(plan.objective.as_str());
    let execution = executor.execute(&plan, &mut wm).await?;

    match format {
        OutputFormat::Text => {
            for step in &execution {
                println!("Step {}: {}", step.step_id, step.action);
                for chunk in step.tool_result.chunks() {
                    println!(
                        "  [{}] {} ({:.3}): {}",
                        chunk.chunk_id,
                        chunk.source,
                        chunk.score.comparable(),
                        preview(&chunk.text, 80)
                    );
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "execution": execution,
                "working_memory": wm.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Rank a JSONL candidate frame with the configured weights
pub fn handle_rank(candidates: PathBuf, config: &Config, format: OutputFormat) -> Result<()> {
    let rows: Vec<RankCandidate> = read_jsonl(&candidates, RANK_REQUIRED)?;
    let ranked = ranker::rank(&rows, &config.ranker);

    match format {
        OutputFormat::Text => {
            if ranked.is_empty() {
                println!("No candidates");
                return Ok(());
            }
            for row in &ranked {
                println!(
                    "q={} #{} chunk={} S={:.4} ({})",
                    row.candidate.question_id,
                    row.rerank_rank,
                    row.candidate.chunk_id,
                    row.score,
                    row.candidate.source
                );
            }
        }
        OutputFormat::Json => {
            // One row per line, same shape as the input frame
            for row in &ranked {
                println!("{}", serde_json::to_string(row)?);
            }
        }
    }

    Ok(())
}

/// Assess stored candidates and show the generation decision
pub fn handle_assess(
    question: String,
    candidates: PathBuf,
    decision: String,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let executor_decision: Action = decision.parse()?;
    let chunks: Vec<RetrievedChunk> = read_jsonl(&candidates, CHUNK_REQUIRED)?;

    let assessment =
        EvidenceAssessor::new(config.evidence_thresholds()).assess(&question, executor_decision, &chunks);
    let generation = GenerationPolicy::decide(&assessment);

    match format {
        OutputFormat::Text => {
            println!(
                "Sufficiency: {}",
                serde_json::to_value(&assessment.sufficiency)?
                    .as_str()
                    .unwrap_or_default()
            );
            println!("  Evidence present: {}", assessment.evidence_present);
            println!("  Max similarity: {:.3}", assessment.max_similarity);
            println!("  Coverage: {:.2}", assessment.coverage_score);
            println!("  Conflicting sources: {}", assessment.conflicting_sources);
            println!("  Rationale: {}", assessment.rationale);
            println!();
            println!("Generation decision: {}", serde_json::to_value(&generation)?);
        }
        OutputFormat::Json => {
            let output = json!({
                "evidence_assessment": assessment,
                "generation_decision": generation,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show the episodic tail as the planner sees it
pub fn handle_history(limit: Option<usize>, config: &Config, format: OutputFormat) -> Result<()> {
    let memory = MemoryRouter::in_dir(&config.memory_dir());
    let limit = limit.unwrap_or(config.memory.episodic_tail);

    let records = memory
        .read_recent_episodic(limit)
        .context("Failed to read episodic memory")?;
    let records = if config.memory.enforce_policies {
        forgetting::apply(&records, config.memory.forgetting_max_records)
    } else {
        records
    };

    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No runs in history");
                return Ok(());
            }

            println!("Run History (last {} runs):", records.len());
            println!();

            for record in &records {
                let created = record
                    .get("ts_utc")
                    .and_then(|t| t.as_f64())
                    .and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0))
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "Unknown".to_string());

                println!(
                    "Question: {}",
                    record.get("question").and_then(|q| q.as_str()).unwrap_or("?")
                );
                println!(
                    "  Decision: {}",
                    record
                        .get("generation_policy_decision")
                        .and_then(|d| d.as_str())
                        .unwrap_or("?")
                );
                println!(
                    "  Used retrieval: {}",
                    record
                        .get("used_retrieval")
                        .and_then(|u| u.as_bool())
                        .unwrap_or(false)
                );
                println!("  Created: {}", created);
                println!();
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "records": records,
                "count": records.len(),
                "limit": limit
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Read one semantic key through the router
pub fn handle_memory_get(key: String, config: &Config, format: OutputFormat) -> Result<()> {
    let memory = MemoryRouter::in_dir(&config.memory_dir());
    let value = memory.read_semantic(&key)?;

    match format {
        OutputFormat::Text => match &value {
            Some(v) => println!("{} = {}", key, v),
            None => println!("{} is not set", key),
        },
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "key": key, "value": value }))?
            );
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to render configuration")?;
            print!("{}", rendered);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

/// Print the configuration file path
pub fn handle_config_path(custom: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match custom {
        Some(p) => p.to_path_buf(),
        None => Config::default_config_path()?,
    };

    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "path": path }))?)
        }
    }
    Ok(())
}

/// Parse a JSONL file, skipping blank lines
/// Parse a JSONL frame, skipping blank lines.
///
/// A row without one of `required` fails with `EngineError::MissingField`.
fn read_jsonl<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let row: serde_json::Value = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid row", path.display(), i + 1))?;

            if let Some(field) = required
                .iter()
                .find(|f| row.get(**f).map_or(true, serde_json::Value::is_null))
            {
                return Err(EngineError::MissingField(format!(
                    "{}:{}: {}",
                    path.display(),
                    i + 1,
                    field
                ))
                .into());
            }

            serde_json::from_value(row)
                .with_context(|| format!("{}:{}: invalid row", path.display(), i + 1))
        })
        .collect()
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_jsonl_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"chunk_id": 1, "doc_id": "a", "text": "x", "score": 0.9}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"chunk_id": 2, "source": "b", "text": "y", "score": {{"dense_score": 0.4}}}}"#
        )
        .unwrap();

        let chunks: Vec<RetrievedChunk> = read_jsonl(file.path(), CHUNK_REQUIRED).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source, "a");
        assert_eq!(chunks[1].score.comparable(), 0.4);
    }

    #[test]
    fn test_read_jsonl_reports_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"chunk_id": 1}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = read_jsonl::<RetrievedChunk>(file.path(), CHUNK_REQUIRED).unwrap_err();
        assert!(err.to_string().ends_with(":2: invalid row"));
    }

    #[test]
    fn test_read_jsonl_missing_required_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"question_id": 1, "chunk_text": "x"}}"#).unwrap();
        writeln!(file, r#"{{"chunk_id": 4, "chunk_text": "y"}}"#).unwrap();

        let err = read_jsonl::<RankCandidate>(file.path(), RANK_REQUIRED).unwrap_err();
        match err.downcast_ref::<EngineError>() {
            Some(EngineError::MissingField(field)) => assert!(field.ends_with(":2: question_id")),
            other => panic!("Expected MissingField, got: {:?}", other),
        }
    }

    #[test]
    fn test_read_jsonl_null_required_field_is_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"chunk_id": null, "text": "x"}}"#).unwrap();

        let err = read_jsonl::<RetrievedChunk>(file.path(), CHUNK_REQUIRED).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::MissingField(_))
        ));
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("héllo", 10), "héllo");
        assert_eq!(preview("héllo", 2), "hé...");
    }
}
