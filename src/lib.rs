pub mod catalog;
pub mod color;
pub mod command;
pub mod dispatch;
pub mod generate;
pub mod overlay;
pub mod persist;
pub mod program;
pub mod scene;
pub mod script;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
#[cfg(not(target_arch = "wasm32"))]
pub mod run_log;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
