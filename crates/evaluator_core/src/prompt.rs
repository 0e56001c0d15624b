//! crates/evaluator_core/src/prompt.rs
//!
//! The fixed grading instructions and the structured output schema the backend
//! is asked to conform to.

use serde_json::{json, Value};

pub const GRADING_INSTRUCTIONS: &str = "Analyze the provided document (JPEG, PNG, or PDF of handwritten notes). Identify all distinct question-and-answer pairs. For each answer, focus your evaluation primarily on its logical soundness and factual accuracy in relation to the question. Perform a light check for major grammatical errors, but do not heavily penalize for them. The specific format of the answer is not important. Assign a score from 0 to 10 for each answer based on this criteria, provide constructive feedback, and then calculate an overall average score. Return your entire analysis in the specified JSON format.";

pub const GRADING_TEMPERATURE: f32 = 0.2;

/// Response schema in the backend's OpenAPI-subset notation. Every field is required.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallScore": {
                "type": "NUMBER",
                "description": "The average score of all evaluated answers, from 0 to 10. Should be calculated from the individual scores."
            },
            "generalFeedback": {
                "type": "STRING",
                "description": "A high-level summary of the overall performance, highlighting strengths and key areas for improvement."
            },
            "evaluations": {
                "type": "ARRAY",
                "description": "A list of all the identified question-and-answer pairs with their individual evaluation.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": {
                            "type": "STRING",
                            "description": "The exact question identified from the document."
                        },
                        "answer": {
                            "type": "STRING",
                            "description": "The corresponding answer to the question, as written in the document."
                        },
                        "feedback": {
                            "type": "STRING",
                            "description": "Detailed, constructive feedback on the answer's correctness, quality, and areas for improvement."
                        },
                        "score": {
                            "type": "NUMBER",
                            "description": "An integer score from 0 to 10 for this specific answer."
                        }
                    },
                    "required": ["question", "answer", "feedback", "score"]
                }
            }
        },
        "required": ["overallScore", "generalFeedback", "evaluations"]
    })
}
