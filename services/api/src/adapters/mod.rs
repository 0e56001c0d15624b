pub mod gemini;
pub mod kv_store;

pub use gemini::GeminiEvaluationAdapter;
pub use kv_store::SqliteKvStore;
