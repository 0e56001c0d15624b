pub mod protocol;
pub mod rest;
pub mod state;
pub mod tab;
pub mod ws_handler;

// Re-export the handlers the binary wires into the router.
pub use rest::{close_tab_handler, create_tab_handler};
pub use ws_handler::ws_handler;
