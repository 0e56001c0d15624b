pub mod auth;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod memory;
pub mod ports;
pub mod prompt;
pub mod session;
pub mod validator;
pub mod verification;
pub mod view;

pub use auth::Authenticator;
pub use credentials::CredentialStore;
pub use domain::{Account, Document, EvaluationResult, MediaType, QAPair, Role, Session, View};
pub use error::{CoreError, CoreResult};
pub use evaluation::{EvaluationMachine, EvaluationState};
pub use evaluator::Evaluator;
pub use memory::MemoryStore;
pub use ports::{EvaluationPrompt, EvaluationService, KeyValueStore, PortError, PortResult};
pub use session::SessionStore;
pub use verification::{RevealGuard, RevealToggle, SecondaryGate};
pub use view::{ViewController, WELCOME_DELAY};
