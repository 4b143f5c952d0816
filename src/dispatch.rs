//! Command execution against a scene.
//!
//! Commands are dispatched through a closed, string-keyed handler table that
//! adapts each name to the typed [`SceneCommands`] method behind it. Two very
//! different failure modes apply:
//!
//! - A name with no handler is a programming error (the catalog and the scene
//!   interface disagree). Dispatch halts immediately; effects so far stand.
//! - A handler that fails at run time (bad argument, scene error) is recorded
//!   and dispatch continues. One bad color must not kill the rest of an
//!   otherwise fine sequence.
//!
//! [`execute`] runs a whole sequence synchronously. [`CommandSession`] runs
//! the same sequence cooperatively, suspending at `wait` commands so the host
//! render loop keeps turning while a delay elapses.

use serde::Serialize;

use crate::command::{Command, Value};
use crate::color::Color;
use crate::scene::SceneCommands;

/// Name of the command that suspends a session.
pub const WAIT_COMMAND: &str = "wait";

/// A command whose invocation failed at run time. Recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFailure {
    /// Position in the dispatched sequence.
    pub index: usize,
    /// Rendered command text, for the user-facing report.
    pub command: String,
    pub message: String,
}

/// A command with no matching scene operation. Fatal for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownCommand {
    pub index: usize,
    pub name: String,
}

impl std::fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown command {:?} at index {}", self.name, self.index)
    }
}

/// Per-run report: how many commands took effect, which ones failed, and
/// whether dispatch halted on an unknown command. Partial scene mutation is
/// never rolled back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunOutcome {
    pub executed: usize,
    pub failures: Vec<CommandFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<UnknownCommand>,
}

impl RunOutcome {
    /// True when every command executed cleanly.
    pub fn clean(&self) -> bool {
        self.failures.is_empty() && self.halted.is_none()
    }
}

// ============================================================================
// Handler table
// ============================================================================

type Handler = fn(&mut dyn SceneCommands, &[Value]) -> Result<(), String>;

fn want(args: &[Value], expected: usize) -> Result<(), String> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} arguments, got {}", args.len()))
    }
}

fn number(args: &[Value], index: usize) -> Result<f32, String> {
    args.get(index)
        .and_then(Value::as_number)
        .ok_or_else(|| format!("argument {index} must be a number"))
}

fn color(args: &[Value], index: usize) -> Result<Color, String> {
    args.get(index)
        .and_then(Value::as_color)
        .ok_or_else(|| format!("argument {index} must be a color"))
}

fn scene_err(e: crate::scene::SceneError) -> String {
    e.message
}

/// Look up the handler for a command name.
///
/// The table is the full scene command surface; a `None` here means the
/// sequence was produced against a different interface.
pub fn handler_for(name: &str) -> Option<Handler> {
    let handler: Handler = match name {
        "moveForward" => |scene, args| {
            want(args, 1)?;
            scene.move_forward(number(args, 0)?).map_err(scene_err)
        },
        "moveBackward" => |scene, args| {
            want(args, 1)?;
            scene.move_backward(number(args, 0)?).map_err(scene_err)
        },
        "turnLeft" => |scene, args| {
            want(args, 0)?;
            scene.turn_left().map_err(scene_err)
        },
        "turnRight" => |scene, args| {
            want(args, 0)?;
            scene.turn_right().map_err(scene_err)
        },
        "turnDegrees" => |scene, args| {
            want(args, 1)?;
            scene.turn_degrees(number(args, 0)?).map_err(scene_err)
        },
        "setCameraPosition" => |scene, args| {
            want(args, 3)?;
            scene
                .set_camera_position(number(args, 0)?, number(args, 1)?, number(args, 2)?)
                .map_err(scene_err)
        },
        "setCameraLookAt" => |scene, args| {
            want(args, 3)?;
            scene
                .set_camera_look_at(number(args, 0)?, number(args, 1)?, number(args, 2)?)
                .map_err(scene_err)
        },
        "setLightColor" => |scene, args| {
            want(args, 1)?;
            scene.set_light_color(color(args, 0)?).map_err(scene_err)
        },
        "setLightIntensity" => |scene, args| {
            want(args, 1)?;
            scene.set_light_intensity(number(args, 0)?).map_err(scene_err)
        },
        "setLightPosition" => |scene, args| {
            want(args, 3)?;
            scene
                .set_light_position(number(args, 0)?, number(args, 1)?, number(args, 2)?)
                .map_err(scene_err)
        },
        "setAmbientColor" => |scene, args| {
            want(args, 1)?;
            scene.set_ambient_color(color(args, 0)?).map_err(scene_err)
        },
        "setAmbientIntensity" => |scene, args| {
            want(args, 1)?;
            scene.set_ambient_intensity(number(args, 0)?).map_err(scene_err)
        },
        "setGroundColor" => |scene, args| {
            want(args, 1)?;
            scene.set_ground_color(color(args, 0)?).map_err(scene_err)
        },
        "setGroundSize" => |scene, args| {
            want(args, 1)?;
            scene.set_ground_size(number(args, 0)?).map_err(scene_err)
        },
        "setBackground" => |scene, args| {
            want(args, 1)?;
            scene.set_background(color(args, 0)?).map_err(scene_err)
        },
        "resetScene" => |scene, args| {
            want(args, 0)?;
            scene.reset().map_err(scene_err)
        },
        WAIT_COMMAND => |scene, args| {
            want(args, 1)?;
            scene.wait(number(args, 0)?).map_err(scene_err)
        },
        _ => return None,
    };
    Some(handler)
}

enum Step {
    Executed,
    Failed,
    Unknown,
}

fn run_command(
    index: usize,
    command: &Command,
    scene: &mut dyn SceneCommands,
    outcome: &mut RunOutcome,
) -> Step {
    let Some(handler) = handler_for(&command.name) else {
        log::error!("unknown command {:?}, halting run", command.name);
        outcome.halted = Some(UnknownCommand {
            index,
            name: command.name.clone(),
        });
        return Step::Unknown;
    };

    match handler(scene, &command.args) {
        Ok(()) => {
            outcome.executed += 1;
            Step::Executed
        }
        Err(message) => {
            log::warn!("command {command} failed: {message}");
            outcome.failures.push(CommandFailure {
                index,
                command: command.to_string(),
                message,
            });
            Step::Failed
        }
    }
}

/// Execute a full command sequence synchronously.
///
/// Waits elapse logically (the scene's `wait` is invoked, nothing sleeps).
pub fn execute(commands: &[Command], scene: &mut dyn SceneCommands) -> RunOutcome {
    let mut outcome = RunOutcome::default();
    for (index, command) in commands.iter().enumerate() {
        if let Step::Unknown = run_command(index, command, scene, &mut outcome) {
            break;
        }
    }
    outcome
}

// ============================================================================
// Cooperative sessions
// ============================================================================

/// Where a session stands after an [`CommandSession::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionStatus {
    /// Suspended inside a wait; `remaining` seconds still to elapse.
    Waiting { remaining: f32 },
    Finished,
}

/// A command sequence being drained across frames.
///
/// Commands run in order until a `wait` suspends the session; subsequent
/// `advance` calls burn down the delay before continuing. Only the
/// continuation is deferred; the caller's render loop is never blocked.
#[derive(Debug)]
pub struct CommandSession {
    commands: Vec<Command>,
    cursor: usize,
    pending_wait: f32,
    outcome: RunOutcome,
    done: bool,
}

impl CommandSession {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            cursor: 0,
            pending_wait: 0.0,
            outcome: RunOutcome::default(),
            done: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> RunOutcome {
        self.outcome
    }

    /// Run until the next suspension point, spending `dt` seconds of any
    /// pending wait first.
    pub fn advance(&mut self, scene: &mut dyn SceneCommands, dt: f32) -> SessionStatus {
        if self.done {
            return SessionStatus::Finished;
        }

        if self.pending_wait > 0.0 {
            self.pending_wait -= dt;
            if self.pending_wait > 0.0 {
                return SessionStatus::Waiting {
                    remaining: self.pending_wait,
                };
            }
            self.pending_wait = 0.0;
        }

        while self.cursor < self.commands.len() {
            let index = self.cursor;
            let command = self.commands[index].clone();
            self.cursor += 1;

            match run_command(index, &command, scene, &mut self.outcome) {
                Step::Unknown => {
                    self.done = true;
                    return SessionStatus::Finished;
                }
                Step::Failed => continue,
                Step::Executed => {
                    if command.name == WAIT_COMMAND {
                        let seconds = command.args.first().and_then(Value::as_number).unwrap_or(0.0);
                        if seconds > 0.0 {
                            self.pending_wait = seconds;
                            return SessionStatus::Waiting { remaining: seconds };
                        }
                    }
                }
            }
        }

        self.done = true;
        SessionStatus::Finished
    }
}

/// Owns at most one in-flight session. Starting a new run cancels the old
/// one first, so two runs can never interleave their scene mutations.
#[derive(Debug, Default)]
pub struct Dispatcher {
    session: Option<CommandSession>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run, cancelling any sequence still draining.
    pub fn start(&mut self, commands: Vec<Command>) {
        if let Some(session) = self.session.take() {
            if !session.is_finished() {
                log::info!(
                    "cancelling in-flight run ({} of {} commands executed)",
                    session.outcome().executed,
                    session.commands.len()
                );
            }
        }
        self.session = Some(CommandSession::new(commands));
    }

    /// Advance the current session, if any.
    pub fn tick(&mut self, scene: &mut dyn SceneCommands, dt: f32) -> Option<SessionStatus> {
        self.session
            .as_mut()
            .map(|session| session.advance(scene, dt))
    }

    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| !s.is_finished())
            .unwrap_or(false)
    }

    /// Drop the current session, returning its partial outcome.
    pub fn cancel(&mut self) -> Option<RunOutcome> {
        self.session.take().map(CommandSession::into_outcome)
    }

    /// Take the outcome of a finished session. `None` while still draining.
    pub fn take_outcome(&mut self) -> Option<RunOutcome> {
        if self.session.as_ref().is_some_and(|s| s.is_finished()) {
            self.session.take().map(CommandSession::into_outcome)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneError, SceneState};

    fn cmd(name: &str, args: Vec<Value>) -> Command {
        Command::new(name, args)
    }

    /// Scene whose light refuses to change, for exercising the
    /// continue-on-failure policy.
    struct BrokenLight(SceneState);

    impl SceneCommands for BrokenLight {
        fn move_forward(&mut self, d: f32) -> Result<(), SceneError> {
            self.0.move_forward(d)
        }
        fn move_backward(&mut self, d: f32) -> Result<(), SceneError> {
            self.0.move_backward(d)
        }
        fn turn_left(&mut self) -> Result<(), SceneError> {
            self.0.turn_left()
        }
        fn turn_right(&mut self) -> Result<(), SceneError> {
            self.0.turn_right()
        }
        fn turn_degrees(&mut self, d: f32) -> Result<(), SceneError> {
            self.0.turn_degrees(d)
        }
        fn set_camera_position(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
            self.0.set_camera_position(x, y, z)
        }
        fn set_camera_look_at(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
            self.0.set_camera_look_at(x, y, z)
        }
        fn set_light_color(&mut self, _: Color) -> Result<(), SceneError> {
            Err(SceneError::new("light driver not ready"))
        }
        fn set_light_intensity(&mut self, _: f32) -> Result<(), SceneError> {
            Err(SceneError::new("light driver not ready"))
        }
        fn set_light_position(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
            self.0.set_light_position(x, y, z)
        }
        fn set_ambient_color(&mut self, c: Color) -> Result<(), SceneError> {
            self.0.set_ambient_color(c)
        }
        fn set_ambient_intensity(&mut self, i: f32) -> Result<(), SceneError> {
            self.0.set_ambient_intensity(i)
        }
        fn set_ground_color(&mut self, c: Color) -> Result<(), SceneError> {
            self.0.set_ground_color(c)
        }
        fn set_ground_size(&mut self, s: f32) -> Result<(), SceneError> {
            self.0.set_ground_size(s)
        }
        fn set_background(&mut self, c: Color) -> Result<(), SceneError> {
            self.0.set_background(c)
        }
        fn reset(&mut self) -> Result<(), SceneError> {
            self.0.reset()
        }
    }

    #[test]
    fn test_executes_in_order() {
        let mut scene = SceneState::new();
        let commands = vec![
            cmd("moveForward", vec![Value::Number(2.0)]),
            cmd("turnLeft", vec![]),
            cmd("setLightIntensity", vec![Value::Number(0.5)]),
        ];

        let outcome = execute(&commands, &mut scene);
        assert!(outcome.clean());
        assert_eq!(outcome.executed, 3);
        assert_eq!(scene.object_position.z, -2.0);
        assert!(scene.object_rotation.y > 0.0);
        assert_eq!(scene.light_intensity, 0.5);
    }

    #[test]
    fn test_unknown_command_halts_and_keeps_prior_effects() {
        let mut scene = SceneState::new();
        let commands = vec![
            cmd("moveForward", vec![Value::Number(1.0)]),
            cmd("launchFireworks", vec![]),
            cmd("turnLeft", vec![]),
        ];

        let outcome = execute(&commands, &mut scene);
        assert_eq!(outcome.executed, 1);
        let halted = outcome.halted.unwrap();
        assert_eq!(halted.index, 1);
        assert_eq!(halted.name, "launchFireworks");
        // The move took effect, the turn never ran.
        assert_eq!(scene.object_position.z, -1.0);
        assert_eq!(scene.object_rotation.y, 0.0);
    }

    #[test]
    fn test_runtime_failure_continues() {
        let mut scene = BrokenLight(SceneState::new());
        let commands = vec![
            cmd("moveForward", vec![Value::Number(1.0)]),
            cmd("setLightIntensity", vec![Value::Number(0.5)]),
            cmd("turnLeft", vec![]),
        ];

        let outcome = execute(&commands, &mut scene);
        assert_eq!(outcome.executed, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert!(outcome.failures[0].message.contains("not ready"));
        assert!(outcome.halted.is_none());
        // The command after the failure still ran.
        assert!(scene.0.object_rotation.y > 0.0);
    }

    #[test]
    fn test_bad_arity_is_a_runtime_failure() {
        let mut scene = SceneState::new();
        let commands = vec![
            cmd("moveForward", vec![]),
            cmd("turnLeft", vec![Value::Number(1.0)]),
            cmd("moveForward", vec![Value::Number(1.0)]),
        ];

        let outcome = execute(&commands, &mut scene);
        assert_eq!(outcome.executed, 1);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(scene.object_position.z, -1.0);
    }

    #[test]
    fn test_bad_argument_type_is_a_runtime_failure() {
        let mut scene = SceneState::new();
        let commands = vec![cmd(
            "setLightColor",
            vec![Value::Number(42.0)],
        )];

        let outcome = execute(&commands, &mut scene);
        assert_eq!(outcome.executed, 0);
        assert!(outcome.failures[0].message.contains("color"));
    }

    #[test]
    fn test_session_suspends_on_wait() {
        let mut scene = SceneState::new();
        let mut session = CommandSession::new(vec![
            cmd("moveForward", vec![Value::Number(1.0)]),
            cmd("wait", vec![Value::Number(1.0)]),
            cmd("turnLeft", vec![]),
        ]);

        // First advance executes up to and including the wait, then suspends.
        let status = session.advance(&mut scene, 0.016);
        assert_eq!(status, SessionStatus::Waiting { remaining: 1.0 });
        assert_eq!(scene.object_position.z, -1.0);
        assert_eq!(scene.object_rotation.y, 0.0);

        // Delay not yet elapsed.
        match session.advance(&mut scene, 0.4) {
            SessionStatus::Waiting { remaining } => assert!((remaining - 0.6).abs() < 1e-6),
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(scene.object_rotation.y, 0.0);

        // Delay elapses; the rest of the sequence runs.
        let status = session.advance(&mut scene, 0.7);
        assert_eq!(status, SessionStatus::Finished);
        assert!(scene.object_rotation.y > 0.0);
        assert_eq!(session.outcome().executed, 3);
    }

    #[test]
    fn test_session_halts_on_unknown() {
        let mut scene = SceneState::new();
        let mut session = CommandSession::new(vec![
            cmd("moveForward", vec![Value::Number(1.0)]),
            cmd("launchFireworks", vec![]),
        ]);

        assert_eq!(session.advance(&mut scene, 0.016), SessionStatus::Finished);
        assert!(session.outcome().halted.is_some());
        assert_eq!(session.outcome().executed, 1);
    }

    #[test]
    fn test_dispatcher_start_cancels_in_flight_run() {
        let mut scene = SceneState::new();
        let mut dispatcher = Dispatcher::new();

        dispatcher.start(vec![
            cmd("wait", vec![Value::Number(10.0)]),
            cmd("moveForward", vec![Value::Number(100.0)]),
        ]);
        dispatcher.tick(&mut scene, 0.016);
        assert!(dispatcher.is_running());

        // Re-run replaces the pending sequence; the giant move never lands.
        dispatcher.start(vec![cmd("turnLeft", vec![])]);
        assert_eq!(
            dispatcher.tick(&mut scene, 0.016),
            Some(SessionStatus::Finished)
        );
        assert_eq!(scene.object_position.z, 0.0);
        assert!(scene.object_rotation.y > 0.0);

        let outcome = dispatcher.take_outcome().unwrap();
        assert_eq!(outcome.executed, 1);
        assert!(!dispatcher.is_running());
    }

    #[test]
    fn test_outcome_serializes() {
        let mut scene = SceneState::new();
        let outcome = execute(&[cmd("nope", vec![])], &mut scene);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"halted\""));
        assert!(json.contains("nope"));
    }

    #[test]
    fn test_every_builtin_template_has_a_handler() {
        use crate::catalog::{BlockRole, Catalog};
        let catalog = Catalog::builtin().unwrap();
        for spec in catalog.iter() {
            if let BlockRole::Statement { template } = &spec.role {
                assert!(
                    handler_for(template.name).is_some(),
                    "no handler for {}",
                    template.name
                );
            }
        }
    }
}
