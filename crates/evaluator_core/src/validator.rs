//! crates/evaluator_core/src/validator.rs
//!
//! Turns raw backend output into a trusted `EvaluationResult`.

use serde_json::Value;
use tracing::warn;

use crate::domain::{EvaluationResult, QAPair};
use crate::error::{CoreError, CoreResult};

/// Divergence between `overallScore` and the mean pair score that is logged.
pub const SCORE_DIVERGENCE_WARNING: f64 = 1.0;

/// Parses and checks the minimal shape: a top-level object, a numeric
/// `overallScore` and an `evaluations` list (possibly empty).
///
/// Pairs must deserialize as `QAPair` but their values (score range, empty
/// strings) are passed through. `overallScore` is never recomputed; a large
/// divergence from the pair mean is only logged.
pub fn validate_response(raw: &str) -> CoreResult<EvaluationResult> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| shape_error(format!("response is not valid JSON: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(shape_error("top-level value is not an object"));
    };

    let overall_score = object
        .get("overallScore")
        .and_then(Value::as_f64)
        .ok_or_else(|| shape_error("overallScore is missing or not a number"))?;

    let items = match object.remove("evaluations") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(shape_error("evaluations is not a list")),
        None => return Err(shape_error("evaluations is missing")),
    };

    let general_feedback = match object.remove("generalFeedback") {
        Some(Value::String(feedback)) => feedback,
        _ => String::new(),
    };

    let evaluations = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<QAPair>(item)
                .map_err(|e| shape_error(format!("evaluation {index} is malformed: {e}")))
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let result = EvaluationResult {
        overall_score,
        general_feedback,
        evaluations,
    };

    if let Some(mean) = result.mean_pair_score() {
        if (mean - result.overall_score).abs() > SCORE_DIVERGENCE_WARNING {
            warn!(
                "Reported overall score {} diverges from the pair mean {:.2}",
                result.overall_score, mean
            );
        }
    }

    Ok(result)
}

fn shape_error(detail: impl Into<String>) -> CoreError {
    CoreError::InvalidResponseShape(detail.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_response_unchanged() {
        let raw = r#"{"overallScore":8,"generalFeedback":"ok","evaluations":[{"question":"Q","answer":"A","feedback":"F","score":8}]}"#;
        let result = validate_response(raw).expect("valid");
        assert_eq!(result.overall_score, 8.0);
        assert_eq!(result.general_feedback, "ok");
        assert_eq!(
            result.evaluations,
            vec![QAPair {
                question: "Q".into(),
                answer: "A".into(),
                feedback: "F".into(),
                score: 8.0,
            }]
        );
    }

    #[test]
    fn accepts_empty_evaluations() {
        let raw = r#"  {"overallScore":0,"generalFeedback":"nothing found","evaluations":[]}  "#;
        let result = validate_response(raw).expect("valid");
        assert!(result.evaluations.is_empty());
    }

    #[test]
    fn overall_score_is_trusted_not_recomputed() {
        let raw = r#"{"overallScore":9.5,"generalFeedback":"","evaluations":[{"question":"Q","answer":"A","feedback":"F","score":2}]}"#;
        let result = validate_response(raw).expect("valid");
        assert_eq!(result.overall_score, 9.5);
    }

    #[test]
    fn rejects_missing_overall_score() {
        let raw = r#"{"generalFeedback":"ok","evaluations":[]}"#;
        assert!(matches!(
            validate_response(raw),
            Err(CoreError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_overall_score() {
        let raw = r#"{"overallScore":"8","generalFeedback":"ok","evaluations":[]}"#;
        assert!(matches!(
            validate_response(raw),
            Err(CoreError::InvalidResponseShape(_))
        ));
    }

    #[test]
    fn rejects_missing_or_non_list_evaluations() {
        for raw in [
            r#"{"overallScore":8,"generalFeedback":"ok"}"#,
            r#"{"overallScore":8,"generalFeedback":"ok","evaluations":null}"#,
            r#"{"overallScore":8,"generalFeedback":"ok","evaluations":{}}"#,
        ] {
            assert!(
                matches!(validate_response(raw), Err(CoreError::InvalidResponseShape(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn rejects_non_object_and_unparsable_text() {
        for raw in ["[]", "null", "not json", ""] {
            assert!(
                matches!(validate_response(raw), Err(CoreError::InvalidResponseShape(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn rejects_pair_missing_fields() {
        let raw = r#"{"overallScore":8,"generalFeedback":"ok","evaluations":[{"question":"Q","score":8}]}"#;
        assert!(matches!(
            validate_response(raw),
            Err(CoreError::InvalidResponseShape(_))
        ));
    }
}
