//! crates/evaluator_core/src/evaluation.rs
//!
//! Lifecycle of a single evaluation: IDLE -> PROCESSING -> RESULTS | ERROR -> IDLE.

use tracing::{debug, info, warn};

use crate::domain::{Document, EvaluationResult};
use crate::error::{CoreError, CoreResult};
use crate::evaluator::Evaluator;

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationState {
    Idle,
    Processing,
    Results(EvaluationResult),
    Error(String),
}

impl EvaluationState {
    pub fn name(&self) -> &'static str {
        match self {
            EvaluationState::Idle => "IDLE",
            EvaluationState::Processing => "PROCESSING",
            EvaluationState::Results(_) => "RESULTS",
            EvaluationState::Error(_) => "ERROR",
        }
    }
}

/// One client's evaluation state plus the currently selected document.
#[derive(Debug)]
pub struct EvaluationMachine {
    state: EvaluationState,
    document: Option<Document>,
    notice: Option<String>,
}

impl Default for EvaluationMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationMachine {
    pub fn new() -> Self {
        Self {
            state: EvaluationState::Idle,
            document: None,
            notice: None,
        }
    }

    pub fn state(&self) -> &EvaluationState {
        &self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// The last recoverable error reported while IDLE (e.g. no file selected).
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Selects (or replaces) the document for the next submission.
    pub fn select_document(&mut self, document: Document) -> CoreResult<()> {
        if self.state != EvaluationState::Idle {
            return Err(self.invalid("select_document"));
        }
        debug!("Selected document {}", document.file_name);
        self.document = Some(document);
        self.notice = None;
        Ok(())
    }

    /// IDLE -> PROCESSING. Hands back the selected document, which is consumed.
    pub fn submit(&mut self) -> CoreResult<Document> {
        if self.state != EvaluationState::Idle {
            return Err(self.invalid("submit"));
        }
        let Some(document) = self.document.take() else {
            let err = CoreError::NoFileSelected;
            self.notice = Some(err.to_string());
            return Err(err);
        };
        self.notice = None;
        self.state = EvaluationState::Processing;
        Ok(document)
    }

    /// PROCESSING -> RESULTS.
    pub fn succeed(&mut self, result: EvaluationResult) -> CoreResult<()> {
        if self.state != EvaluationState::Processing {
            return Err(self.invalid("success"));
        }
        self.state = EvaluationState::Results(result);
        Ok(())
    }

    /// PROCESSING -> ERROR.
    pub fn fail(&mut self, message: impl Into<String>) -> CoreResult<()> {
        if self.state != EvaluationState::Processing {
            return Err(self.invalid("failure"));
        }
        self.state = EvaluationState::Error(message.into());
        Ok(())
    }

    /// RESULTS | ERROR -> IDLE, discarding the document and the result.
    pub fn reset(&mut self) -> CoreResult<()> {
        match self.state {
            EvaluationState::Results(_) | EvaluationState::Error(_) => {
                self.clear();
                Ok(())
            }
            _ => Err(self.invalid("reset")),
        }
    }

    /// Unconditional return to IDLE, used when the session ends.
    pub fn clear(&mut self) {
        self.state = EvaluationState::Idle;
        self.document = None;
        self.notice = None;
    }

    /// Submits the selected document, awaits the evaluator exactly once and
    /// records the outcome.
    pub async fn run(&mut self, evaluator: &Evaluator) -> CoreResult<&EvaluationState> {
        let document = self.submit()?;
        match evaluator.evaluate(&document).await {
            Ok(result) => {
                info!(
                    "Evaluation of {} finished with {} pairs",
                    document.file_name,
                    result.evaluations.len()
                );
                self.succeed(result)?;
            }
            Err(e) => {
                warn!("Evaluation of {} failed: {}", document.file_name, e);
                self.fail(e.to_string())?;
            }
        }
        Ok(&self.state)
    }

    fn invalid(&self, event: &'static str) -> CoreError {
        CoreError::InvalidEvaluationTransition {
            state: self.state.name(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::fakes::ScriptedService;
    use crate::ports::PortError;

    const GOOD: &str = r#"{"overallScore":8,"generalFeedback":"ok","evaluations":[{"question":"Q","answer":"A","feedback":"F","score":8}]}"#;

    fn png() -> Document {
        Document::new("page.png", "image/png", vec![0x89, b'P', b'N', b'G']).expect("png")
    }

    #[tokio::test]
    async fn submit_without_document_stays_idle() {
        let service = ScriptedService::replying(Ok(GOOD.to_string()));
        let evaluator = Evaluator::new(service.clone());
        let mut machine = EvaluationMachine::new();

        let err = machine.run(&evaluator).await.expect_err("no file");
        assert!(matches!(err, CoreError::NoFileSelected));
        assert_eq!(machine.state(), &EvaluationState::Idle);
        assert_eq!(machine.notice(), Some("Please select a file first."));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn successful_run_reaches_results_with_one_call() {
        let service = ScriptedService::replying(Ok(GOOD.to_string()));
        let evaluator = Evaluator::new(service.clone());
        let mut machine = EvaluationMachine::new();
        machine.select_document(png()).expect("select");

        let state = machine.run(&evaluator).await.expect("run").clone();
        match state {
            EvaluationState::Results(result) => {
                assert_eq!(result.overall_score, 8.0);
                assert_eq!(result.general_feedback, "ok");
                assert_eq!(result.evaluations[0].question, "Q");
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(service.calls(), 1);
        assert!(machine.document().is_none());
    }

    #[tokio::test]
    async fn failed_run_reaches_error_then_resets() {
        let service = ScriptedService::replying(Err(PortError::Unexpected("boom".into())));
        let evaluator = Evaluator::new(service);
        let mut machine = EvaluationMachine::new();
        machine.select_document(png()).expect("select");

        machine.run(&evaluator).await.expect("run");
        assert!(matches!(machine.state(), EvaluationState::Error(m) if m.contains("boom")));

        machine.reset().expect("reset");
        assert_eq!(machine.state(), &EvaluationState::Idle);
        assert!(machine.document().is_none());
    }

    #[tokio::test]
    async fn bad_shape_never_reaches_results() {
        let service =
            ScriptedService::replying(Ok(r#"{"overallScore":8,"generalFeedback":"x"}"#.into()));
        let evaluator = Evaluator::new(service);
        let mut machine = EvaluationMachine::new();
        machine.select_document(png()).expect("select");

        machine.run(&evaluator).await.expect("run");
        assert!(matches!(machine.state(), EvaluationState::Error(_)));
    }

    #[test]
    fn transitions_are_guarded() {
        let mut machine = EvaluationMachine::new();
        assert!(machine.reset().is_err());
        assert!(machine.succeed(EvaluationResult {
            overall_score: 1.0,
            general_feedback: String::new(),
            evaluations: vec![],
        })
        .is_err());
        assert!(machine.fail("x").is_err());

        machine.select_document(png()).expect("select");
        machine.submit().expect("submit");
        assert!(machine.submit().is_err());
        assert!(machine.select_document(png()).is_err());
        assert!(machine.reset().is_err());
    }

    #[test]
    fn selecting_clears_notice_and_replaces_document() {
        let mut machine = EvaluationMachine::new();
        assert!(machine.submit().is_err());
        assert!(machine.notice().is_some());

        machine.select_document(png()).expect("select");
        let pdf = Document::new("b.pdf", "application/pdf", vec![1, 2]).expect("pdf");
        machine.select_document(pdf.clone()).expect("replace");
        assert!(machine.notice().is_none());
        assert_eq!(machine.document(), Some(&pdf));
    }
}
