use groundwork_engine::conductor::types::Action;
use groundwork_engine::config::Config;
use groundwork_engine::evidence::{
    EvidenceAssessment, EvidenceAssessor, EvidenceThresholds, Sufficiency,
};
use groundwork_engine::memory::{EventType, MemoryEvent, MemoryRouter};
use groundwork_engine::policy::{forgetting, Decision, GenerationPolicy};
use groundwork_engine::ranker::{self, RankCandidate, RankWeights};
use proptest::prelude::*;
use sdk::types::{RetrievedChunk, Score};
use serde_json::json;

const WORDS: &[&str] = &[
    "attention", "bleu", "score", "paper", "report", "encoder", "layers", "defined", "because",
    "results", "translation", "model",
];

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..12).prop_map(|w| w.join(" "))
}

fn chunk_strategy() -> impl Strategy<Value = RetrievedChunk> {
    (
        0..50u64,
        prop::sample::select(&["a.pdf", "b.pdf", "c.pdf"][..]),
        text_strategy(),
        0.0..1.0f64,
    )
        .prop_map(|(id, source, text, score)| {
            RetrievedChunk::new(id, source, text, Score::Scalar(score))
        })
}

fn candidate_strategy() -> impl Strategy<Value = RankCandidate> {
    (
        prop::sample::select(&["1", "2"][..]),
        0..100u64,
        text_strategy(),
        proptest::option::of(0.0..1.0f64),
        proptest::option::of(0.0..30.0f64),
    )
        .prop_map(|(qid, chunk_id, text, dense, sparse)| RankCandidate {
            question_id: qid.to_string(),
            question_text: "What BLEU score did the paper report?".to_string(),
            chunk_id,
            source: "doc".to_string(),
            chunk_text: text,
            dense_score: dense,
            sparse_score: sparse,
        })
}

// Identical inputs produce identical assessments
proptest! {
    #[test]
    fn test_assessment_determinism(
        query in text_strategy(),
        chunks in prop::collection::vec(chunk_strategy(), 0..8),
    ) {
        let assessor = EvidenceAssessor::new(EvidenceThresholds::default());
        let a = assessor.assess(&query, Action::Retrieve, &chunks);
        let b = assessor.assess(&query, Action::Retrieve, &chunks);
        prop_assert_eq!(a.clone(), b);
        prop_assert!((0.0..=1.0).contains(&a.coverage_score));
    }

    #[test]
    fn test_noop_decision_ignores_candidates(
        query in text_strategy(),
        chunks in prop::collection::vec(chunk_strategy(), 0..8),
    ) {
        let assessment = EvidenceAssessor::new(EvidenceThresholds::default())
            .assess(&query, Action::Noop, &chunks);
        prop_assert!(!assessment.evidence_present);
        prop_assert_eq!(assessment.sufficiency, Sufficiency::Insufficient);
    }
}

// The generation policy is total and codes match the decision
proptest! {
    #[test]
    fn test_generation_policy_totality(
        sufficiency in prop::sample::select(&[
            Sufficiency::Sufficient,
            Sufficiency::Insufficient,
            Sufficiency::Conflicting,
        ][..]),
        evidence_present in any::<bool>(),
        max_similarity in 0.0..1.0f64,
        coverage_score in 0.0..=1.0f64,
    ) {
        let assessment = EvidenceAssessment {
            evidence_present,
            sufficiency,
            max_similarity,
            coverage_score,
            conflicting_sources: sufficiency == Sufficiency::Conflicting,
            rationale: "r".to_string(),
        };
        let d = GenerationPolicy::decide(&assessment);

        let no_code = d.refusal_code.is_none() && d.hedge_code.is_none();
        prop_assert_eq!(d.decision == Decision::Answer, no_code);
        prop_assert_eq!(d.refusal_code.is_some(), d.decision == Decision::Refuse);
        prop_assert_eq!(d.hedge_code.is_some(), d.decision == Decision::Hedge);
    }
}

// Re-ranking ranked output yields the same order
proptest! {
    #[test]
    fn test_ranker_idempotence(
        rows in prop::collection::vec(candidate_strategy(), 0..10),
    ) {
        let weights = RankWeights::default();
        let once = ranker::rank(&rows, &weights);
        let again_input: Vec<RankCandidate> = once.iter().map(|r| r.candidate.clone()).collect();
        let twice = ranker::rank(&again_input, &weights);

        let ids = |v: &[ranker::RankedCandidate]| {
            v.iter()
                .map(|r| (r.candidate.question_id.clone(), r.candidate.chunk_id, r.rerank_rank))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(ids(&once), ids(&twice));
        prop_assert_eq!(once.len(), rows.len());
    }
}

// Forgetting keeps the newest records in order
proptest! {
    #[test]
    fn test_forgetting_keeps_suffix(
        records in prop::collection::vec(any::<u32>(), 0..80),
        max in 0..60usize,
    ) {
        let kept = forgetting::apply(&records, max);
        prop_assert_eq!(kept.len(), records.len().min(max));
        prop_assert!(records.ends_with(&kept));
    }
}

// N router calls append N audit events in call order
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn test_router_event_count(ops in prop::collection::vec(0..3u8, 0..12)) {
        let dir = tempfile::tempdir().unwrap();
        let router = MemoryRouter::in_dir(dir.path());

        let mut expected = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            match op {
                0 => {
                    router.read_semantic("k").unwrap();
                    expected.push(EventType::Read);
                }
                1 => {
                    router.write_semantic("k", json!(i)).unwrap();
                    expected.push(EventType::Write);
                }
                _ => {
                    router.write_episodic(&json!({ "i": i })).unwrap();
                    expected.push(EventType::Write);
                }
            }
        }

        let events: Vec<MemoryEvent> = std::fs::read_to_string(router.audit_log().path())
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let kinds: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
        prop_assert_eq!(kinds, expected);
    }
}

// Configuration round-trips through TOML
proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        provider in "echo|ollama",
        min_similarity in 0.0..=1.0f64,
        conflict in 0.0..=1.0f64,
        top_k in 1..50usize,
        rerank in any::<bool>(),
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level;
        config.llm.provider = provider;
        config.evidence.min_similarity = min_similarity;
        config.evidence.conflict_threshold = conflict;
        config.retrieval.top_k = top_k;
        config.retrieval.rerank = rerank;

        let toml_string = toml::to_string(&config).expect("Failed to serialize Config to string");
        let parsed: Config = toml::from_str(&toml_string).expect("Failed to deserialize TOML to Config");

        prop_assert!(parsed.validate().is_ok());
        prop_assert_eq!(config, parsed);
    }
}
