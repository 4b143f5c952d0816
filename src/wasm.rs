use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use crate::catalog::Catalog;
use crate::command::{render_script, Command};
use crate::dispatch::{self, Dispatcher, RunOutcome, SessionStatus};
use crate::generate::{generate, GenerateDiagnostic};
use crate::overlay;
use crate::persist::{MemoryStore, ProgramStore};
use crate::program::ProgramGraph;
use crate::scene::{SceneCommands, SceneState};

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// The stage as seen from JavaScript.
///
/// The block editor lives on the JS side; it hands a program graph (JSON) to
/// `load_program`, starts a run, and keeps calling `tick(dt)` from its frame
/// callback. The renderer reads `scene_json()` every frame and draws whatever
/// is there; command dispatch never blocks it.
#[wasm_bindgen]
pub struct WasmStage {
    inner: Rc<RefCell<StageContext>>,
}

struct StageContext {
    catalog: Catalog,
    scene: SceneState,
    dispatcher: Dispatcher,
    /// Commands generated from the most recently loaded program.
    commands: Vec<Command>,
    /// Pending generation diagnostics, drained by the UI.
    diagnostics: Vec<GenerateDiagnostic>,
    /// Opaque workspace persistence (the editor's own serialization).
    store: MemoryStore,
    last_error: Option<String>,
}

#[wasm_bindgen]
impl WasmStage {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmStage, JsValue> {
        let catalog = Catalog::builtin().map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmStage {
            inner: Rc::new(RefCell::new(StageContext {
                catalog,
                scene: SceneState::new(),
                dispatcher: Dispatcher::new(),
                commands: Vec::new(),
                diagnostics: Vec::new(),
                store: MemoryStore::new(),
                last_error: None,
            })),
        })
    }

    /// Parse a program graph and generate its command sequence.
    /// Returns false (with `last_error` set) on a malformed or cyclic graph.
    pub fn load_program(&self, json: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.commands.clear();
        inner.last_error = None;

        let graph = match ProgramGraph::from_json(json) {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("failed to parse program: {e}");
                inner.last_error = Some(e.to_string());
                return false;
            }
        };

        match generate(&graph, &inner.catalog) {
            Ok(generated) => {
                log::info!(
                    "program loaded: {} commands, {} diagnostics",
                    generated.commands.len(),
                    generated.diagnostics.len()
                );
                inner.commands = generated.commands;
                inner.diagnostics.extend(generated.diagnostics);
                true
            }
            Err(e) => {
                log::error!("generation failed: {e}");
                inner.last_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.borrow().last_error.clone()
    }

    /// The generated script text for the loaded program.
    pub fn script_text(&self) -> String {
        render_script(&self.inner.borrow().commands)
    }

    /// Drain pending generation diagnostics as JSON. Repeated polling does
    /// not duplicate messages.
    pub fn take_diagnostics_json(&self) -> String {
        let diags = std::mem::take(&mut self.inner.borrow_mut().diagnostics);
        serde_json::to_string(&diags).unwrap_or_else(|_| "[]".to_string())
    }

    /// Execute the loaded program synchronously. Returns the outcome as JSON.
    pub fn run(&self) -> String {
        let inner = &mut *self.inner.borrow_mut();
        let outcome = dispatch::execute(&inner.commands, &mut inner.scene);
        outcome_json(&outcome)
    }

    /// Begin a cooperative run. Any in-flight run is cancelled first.
    pub fn start_run(&self) -> bool {
        let inner = &mut *self.inner.borrow_mut();
        if inner.commands.is_empty() {
            return false;
        }
        let commands = inner.commands.clone();
        inner.dispatcher.start(commands);
        true
    }

    /// Advance the current run by `dt` seconds. Returns true while commands
    /// (or a pending wait) remain.
    pub fn tick(&self, dt: f32) -> bool {
        let inner = &mut *self.inner.borrow_mut();
        let StageContext {
            dispatcher, scene, ..
        } = inner;
        match dispatcher.tick(scene, dt) {
            Some(SessionStatus::Waiting { .. }) => true,
            Some(SessionStatus::Finished) | None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().dispatcher.is_running()
    }

    /// Cancel the in-flight run, if any. Scene effects so far stand.
    pub fn cancel_run(&self) {
        self.inner.borrow_mut().dispatcher.cancel();
    }

    /// Take the outcome of a finished cooperative run as JSON.
    /// Returns null while the run is still draining.
    pub fn take_outcome_json(&self) -> String {
        match self.inner.borrow_mut().dispatcher.take_outcome() {
            Some(outcome) => outcome_json(&outcome),
            None => "null".to_string(),
        }
    }

    /// Current scene state as JSON, read by the renderer each frame.
    pub fn scene_json(&self) -> String {
        serde_json::to_string(&self.inner.borrow().scene).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn overlay_text(&self) -> String {
        overlay::overlay_text(&self.inner.borrow().scene)
    }

    pub fn reset_scene(&self) {
        if let Err(e) = self.inner.borrow_mut().scene.reset() {
            log::error!("scene reset failed: {e}");
        }
    }

    /// The block catalog as JSON, for palette-driven UIs.
    pub fn catalog_json(&self) -> String {
        let inner = self.inner.borrow();
        let specs: Vec<_> = inner.catalog.iter().collect();
        serde_json::to_string(&specs).unwrap_or_else(|_| "[]".to_string())
    }

    /// Store the editor's serialized workspace. The payload is opaque.
    pub fn save_workspace(&self, serialized: &str) -> bool {
        self.inner.borrow().store.save(serialized).is_ok()
    }

    /// Load the stored workspace serialization, if any.
    pub fn load_workspace(&self) -> Option<String> {
        self.inner.borrow().store.load().ok().flatten()
    }
}

fn outcome_json(outcome: &RunOutcome) -> String {
    serde_json::to_string(outcome).unwrap_or_else(|e| {
        format!(r#"{{"executed":0,"failures":[],"error":"serialization: {e}"}}"#)
    })
}
