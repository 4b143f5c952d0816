//! Script execution backend.
//!
//! The command sequence doubles as a tiny script: [`render_script`] text is
//! valid Rhai, and [`ScriptRunner`] executes it by registering every scene
//! command as a native function on a sandboxed engine. This is the path for
//! programs that lean on host-language control flow (loops, conditionals)
//! rather than a straight-line command sequence.
//!
//! The handler-table dispatcher stays the canonical executor: it alone
//! implements cooperative waits and the per-run outcome report. Here a `wait`
//! call is forwarded to the scene and otherwise runs synchronously.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Engine, EvalAltResult, AST};
use serde::Serialize;

use crate::color::Color;
use crate::scene::{SceneCommands, SceneError};

pub use crate::command::render_script;

/// Structured script failure, serializable for UI consumption.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptDiagnosticKind {
    /// Syntax errors (compile time).
    ParseError,
    /// Errors raised while the script ran, including scene setter failures.
    RuntimeError,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    Compile,
    Run,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptDiagnostic {
    pub kind: ScriptDiagnosticKind,
    pub phase: ScriptPhase,
    pub message: String,
    pub location: Option<ScriptLocation>,
}

impl std::fmt::Display for ScriptDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} (line {}, col {})", self.message, loc.line, loc.column),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ScriptDiagnostic {}

fn location_of(pos: rhai::Position) -> Option<ScriptLocation> {
    pos.line().map(|line| ScriptLocation {
        line: line as u32,
        column: pos.position().unwrap_or(1) as u32,
    })
}

fn from_parse_error(err: &rhai::ParseError) -> ScriptDiagnostic {
    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::ParseError,
        phase: ScriptPhase::Compile,
        message: err.to_string(),
        location: location_of(err.position()),
    }
}

fn from_eval_error(err: &EvalAltResult) -> ScriptDiagnostic {
    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::RuntimeError,
        phase: ScriptPhase::Run,
        message: err.to_string(),
        location: location_of(err.position()),
    }
}

fn scene_call<S, F>(scene: &Rc<RefCell<S>>, f: F) -> Result<(), Box<EvalAltResult>>
where
    S: SceneCommands,
    F: FnOnce(&mut S) -> Result<(), SceneError>,
{
    f(&mut scene.borrow_mut()).map_err(|e| e.message.into())
}

fn parse_color(s: &str) -> Result<Color, Box<EvalAltResult>> {
    s.parse::<Color>().map_err(|e| e.to_string().into())
}

/// A sandboxed Rhai engine wired to a shared scene.
pub struct ScriptRunner<S: SceneCommands + 'static> {
    engine: Engine,
    scene: Rc<RefCell<S>>,
}

impl<S: SceneCommands + 'static> ScriptRunner<S> {
    pub fn new(scene: Rc<RefCell<S>>) -> Self {
        let mut engine = Engine::new();

        // Sandbox limits: generated programs are tiny, anything bigger is a
        // runaway script.
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_operations(100_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(500);

        {
            let s = scene.clone();
            engine.register_fn("moveForward", move |d: f32| {
                scene_call(&s, |sc| sc.move_forward(d))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("moveBackward", move |d: f32| {
                scene_call(&s, |sc| sc.move_backward(d))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("turnLeft", move || scene_call(&s, |sc| sc.turn_left()));
        }
        {
            let s = scene.clone();
            engine.register_fn("turnRight", move || scene_call(&s, |sc| sc.turn_right()));
        }
        {
            let s = scene.clone();
            engine.register_fn("turnDegrees", move |d: f32| {
                scene_call(&s, |sc| sc.turn_degrees(d))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setCameraPosition", move |x: f32, y: f32, z: f32| {
                scene_call(&s, |sc| sc.set_camera_position(x, y, z))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setCameraLookAt", move |x: f32, y: f32, z: f32| {
                scene_call(&s, |sc| sc.set_camera_look_at(x, y, z))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setLightColor", move |c: rhai::ImmutableString| {
                let color = parse_color(&c)?;
                scene_call(&s, |sc| sc.set_light_color(color))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setLightIntensity", move |i: f32| {
                scene_call(&s, |sc| sc.set_light_intensity(i))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setLightPosition", move |x: f32, y: f32, z: f32| {
                scene_call(&s, |sc| sc.set_light_position(x, y, z))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setAmbientColor", move |c: rhai::ImmutableString| {
                let color = parse_color(&c)?;
                scene_call(&s, |sc| sc.set_ambient_color(color))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setAmbientIntensity", move |i: f32| {
                scene_call(&s, |sc| sc.set_ambient_intensity(i))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setGroundColor", move |c: rhai::ImmutableString| {
                let color = parse_color(&c)?;
                scene_call(&s, |sc| sc.set_ground_color(color))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setGroundSize", move |size: f32| {
                scene_call(&s, |sc| sc.set_ground_size(size))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("setBackground", move |c: rhai::ImmutableString| {
                let color = parse_color(&c)?;
                scene_call(&s, |sc| sc.set_background(color))
            });
        }
        {
            let s = scene.clone();
            engine.register_fn("resetScene", move || scene_call(&s, |sc| sc.reset()));
        }
        {
            let s = scene.clone();
            engine.register_fn("wait", move |seconds: f32| {
                scene_call(&s, |sc| sc.wait(seconds))
            });
        }

        Self { engine, scene }
    }

    /// The shared scene this runner mutates.
    pub fn scene(&self) -> Rc<RefCell<S>> {
        self.scene.clone()
    }

    pub fn compile(&self, script: &str) -> Result<AST, ScriptDiagnostic> {
        self.engine.compile(script).map_err(|e| from_parse_error(&e))
    }

    /// Compile and run a script against the scene.
    pub fn run(&self, script: &str) -> Result<(), ScriptDiagnostic> {
        let ast = self.compile(script)?;
        self.engine.run_ast(&ast).map_err(|e| from_eval_error(&e))
    }

    /// Render a command sequence to script text and run it.
    pub fn run_commands(&self, commands: &[crate::command::Command]) -> Result<(), ScriptDiagnostic> {
        self.run(&render_script(commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Value};
    use crate::scene::SceneState;

    fn runner() -> ScriptRunner<SceneState> {
        ScriptRunner::new(Rc::new(RefCell::new(SceneState::new())))
    }

    #[test]
    fn test_straight_line_script_mutates_scene() {
        let runner = runner();
        runner
            .run("moveForward(2.0);\nturnLeft();\nsetLightIntensity(0.5);\n")
            .unwrap();

        let scene = runner.scene();
        let scene = scene.borrow();
        assert_eq!(scene.object_position.z, -2.0);
        assert!(scene.object_rotation.y > 0.0);
        assert_eq!(scene.light_intensity, 0.5);
    }

    #[test]
    fn test_rendered_commands_round_trip() {
        let commands = vec![
            Command::new("moveForward", vec![Value::Number(3.0)]),
            Command::new(
                "setGroundColor",
                vec![Value::Color("#123456".parse().unwrap())],
            ),
            Command::new("wait", vec![Value::Number(0.5)]),
        ];

        let runner = runner();
        runner.run_commands(&commands).unwrap();

        let scene = runner.scene();
        let scene = scene.borrow();
        assert_eq!(scene.object_position.z, -3.0);
        assert_eq!(scene.ground_color, "#123456".parse().unwrap());
        assert_eq!(scene.waited_seconds, 0.5);
    }

    #[test]
    fn test_host_control_flow() {
        let runner = runner();
        runner
            .run("for i in 0..4 { moveForward(1.0); }")
            .unwrap();
        assert_eq!(runner.scene().borrow().object_position.z, -4.0);
    }

    #[test]
    fn test_parse_error_is_compile_phase() {
        let runner = runner();
        let diag = runner.run("moveForward(2.0;\n").unwrap_err();
        assert_eq!(diag.kind, ScriptDiagnosticKind::ParseError);
        assert_eq!(diag.phase, ScriptPhase::Compile);
        assert!(diag.location.is_some());
    }

    #[test]
    fn test_bad_color_is_runtime_error() {
        let runner = runner();
        let diag = runner.run("setLightColor(\"mauve-ish\");").unwrap_err();
        assert_eq!(diag.kind, ScriptDiagnosticKind::RuntimeError);
        assert_eq!(diag.phase, ScriptPhase::Run);
        assert!(diag.message.contains("mauve-ish"));
    }

    #[test]
    fn test_unknown_function_is_runtime_error() {
        let runner = runner();
        let diag = runner.run("launchFireworks();").unwrap_err();
        assert_eq!(diag.kind, ScriptDiagnosticKind::RuntimeError);
    }

    #[test]
    fn test_reset_from_script() {
        let runner = runner();
        runner.run("moveForward(5.0); resetScene();").unwrap();
        assert_eq!(*runner.scene().borrow(), SceneState::default());
    }
}
