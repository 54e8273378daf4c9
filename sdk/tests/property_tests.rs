use proptest::prelude::*;
use sdk::errors::{EngineError, ErrorExt};
use sdk::types::{RetrievedChunk, Score};

proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*", step_id in 1..100u32) {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::UnknownAction(error_str.clone()),
            EngineError::InvalidArgs { step_id, reason: error_str.clone() },
            EngineError::MissingField(error_str.clone()),
            EngineError::Retrieval(error_str.clone()),
            EngineError::Generation(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            // Hints are static text and never echo the raw detail back.
            if error_str.len() > 8 {
                prop_assert!(!hint.contains(error_str.as_str()));
            }
        }
    }
}

proptest! {
    #[test]
    fn test_scalar_score_is_its_own_comparable(value in -10.0..10.0f64) {
        prop_assert_eq!(Score::Scalar(value).comparable(), value);
    }

    #[test]
    fn test_provenance_comparable_prefers_dense(
        dense in proptest::option::of(0.0..1.0f64),
        sparse in proptest::option::of(0.0..50.0f64),
    ) {
        let score = Score::provenance(dense, sparse);
        let expected = dense.or(sparse).unwrap_or(0.0);
        prop_assert_eq!(score.comparable(), expected);
    }

    #[test]
    fn test_chunk_json_round_trip_keeps_comparable(
        chunk_id in 0..10_000u64,
        text in "[a-z ]{0,40}",
        source in "[a-z]{1,8}\\.pdf",
        dense in proptest::option::of(0.0..1.0f64),
        sparse in proptest::option::of(0.0..50.0f64),
    ) {
        let chunk = RetrievedChunk::new(chunk_id, source, text, Score::provenance(dense, sparse));
        let encoded = serde_json::to_string(&chunk).unwrap();
        let decoded: RetrievedChunk = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded.chunk_id, chunk.chunk_id);
        prop_assert_eq!(decoded.source, chunk.source);
        prop_assert_eq!(decoded.score.comparable(), chunk.score.comparable());
    }
}
