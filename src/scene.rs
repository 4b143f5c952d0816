//! Scene state and the command surface that mutates it.
//!
//! [`SceneCommands`] is the complete capability set a block program can reach:
//! object movement, camera framing, lights, ground, background, reset, and a
//! time delay. Any renderer implementing the trait is a valid backend; the
//! generator and dispatcher know nothing beyond it.
//!
//! [`SceneState`] is the headless implementation: a plain value holding the
//! observable scene, with documented defaults. A renderer reads it every frame
//! and draws whatever is there; command dispatch never blocks that loop.

use std::f32::consts::PI;
use std::fmt;

use glam::Vec3;
use serde::Serialize;

use crate::color::Color;

/// A scene setter failed at runtime (renderer gone, resource missing, ...).
///
/// These are recoverable per-command failures: the dispatcher records them and
/// keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneError {
    pub message: String,
}

impl SceneError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SceneError {}

/// Everything a block program can do to a scene.
///
/// Setters take already-validated literals. Out-of-range values (a negative
/// ground size, an intensity above 1) are passed through untouched; clamping
/// is the renderer's call, not this layer's.
pub trait SceneCommands {
    /// Move the object along its forward axis (negative z).
    fn move_forward(&mut self, distance: f32) -> Result<(), SceneError>;

    /// Move the object along its backward axis (positive z).
    fn move_backward(&mut self, distance: f32) -> Result<(), SceneError>;

    /// Rotate the object a quarter turn counter-clockwise about y.
    fn turn_left(&mut self) -> Result<(), SceneError>;

    /// Rotate the object a quarter turn clockwise about y.
    fn turn_right(&mut self) -> Result<(), SceneError>;

    /// Rotate the object counter-clockwise about y by an angle in degrees.
    fn turn_degrees(&mut self, degrees: f32) -> Result<(), SceneError>;

    fn set_camera_position(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError>;

    fn set_camera_look_at(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError>;

    fn set_light_color(&mut self, color: Color) -> Result<(), SceneError>;

    fn set_light_intensity(&mut self, intensity: f32) -> Result<(), SceneError>;

    fn set_light_position(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError>;

    fn set_ambient_color(&mut self, color: Color) -> Result<(), SceneError>;

    fn set_ambient_intensity(&mut self, intensity: f32) -> Result<(), SceneError>;

    fn set_ground_color(&mut self, color: Color) -> Result<(), SceneError>;

    /// Scale the ground plane uniformly. 1.0 is the default extent.
    fn set_ground_size(&mut self, size: f32) -> Result<(), SceneError>;

    fn set_background(&mut self, color: Color) -> Result<(), SceneError>;

    /// Restore the documented default scene. Idempotent.
    fn reset(&mut self) -> Result<(), SceneError>;

    /// Time delay. A no-op on the scene itself; the dispatcher uses it as a
    /// suspension point so later commands run after the delay while the
    /// render loop keeps going.
    fn wait(&mut self, seconds: f32) -> Result<(), SceneError> {
        let _ = seconds;
        Ok(())
    }
}

// ============================================================================
// Default scene
// ============================================================================

/// Side length of the ground plane at size factor 1.0, in world units.
pub const GROUND_EXTENT: f32 = 20.0;

/// The observable scene, owned as a plain value.
///
/// Defaults are a single fixed snapshot; `reset` restores exactly this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneState {
    pub camera_position: Vec3,
    pub camera_target: Vec3,

    /// Directional (key) light.
    pub light_color: Color,
    pub light_intensity: f32,
    pub light_position: Vec3,

    /// Ambient fill term.
    pub ambient_color: Color,
    pub ambient_intensity: f32,

    pub ground_color: Color,
    /// Uniform scale factor on the ground plane (see [`GROUND_EXTENT`]).
    pub ground_size: f32,

    /// The movable object.
    pub object_position: Vec3,
    /// Euler angles in radians.
    pub object_rotation: Vec3,
    pub object_color: Color,

    pub background: Color,

    /// Total delay requested through [`SceneCommands::wait`] since the last
    /// reset. Bookkeeping for headless runs; renderers ignore it.
    pub waited_seconds: f32,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            camera_position: Vec3::new(-30.0, 15.0, 15.0),
            camera_target: Vec3::new(-3.0, -3.0, -15.0),
            light_color: Color::WHITE,
            light_intensity: 0.8,
            light_position: Vec3::new(5.0, 15.0, 5.0),
            ambient_color: Color::WHITE,
            ambient_intensity: 0.7,
            ground_color: Color::from_rgb8(0x80, 0x80, 0x80),
            ground_size: 1.0,
            object_position: Vec3::new(0.0, 0.5, 0.0),
            object_rotation: Vec3::ZERO,
            object_color: Color::from_rgb8(0x00, 0xff, 0x00),
            background: Color::from_rgb8(0xf0, 0xf0, 0xf0),
            waited_seconds: 0.0,
        }
    }
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneCommands for SceneState {
    fn move_forward(&mut self, distance: f32) -> Result<(), SceneError> {
        self.object_position.z -= distance;
        Ok(())
    }

    fn move_backward(&mut self, distance: f32) -> Result<(), SceneError> {
        self.object_position.z += distance;
        Ok(())
    }

    fn turn_left(&mut self) -> Result<(), SceneError> {
        self.object_rotation.y += PI / 2.0;
        Ok(())
    }

    fn turn_right(&mut self) -> Result<(), SceneError> {
        self.object_rotation.y -= PI / 2.0;
        Ok(())
    }

    fn turn_degrees(&mut self, degrees: f32) -> Result<(), SceneError> {
        self.object_rotation.y += degrees.to_radians();
        Ok(())
    }

    fn set_camera_position(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
        self.camera_position = Vec3::new(x, y, z);
        Ok(())
    }

    fn set_camera_look_at(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
        self.camera_target = Vec3::new(x, y, z);
        Ok(())
    }

    fn set_light_color(&mut self, color: Color) -> Result<(), SceneError> {
        self.light_color = color;
        Ok(())
    }

    fn set_light_intensity(&mut self, intensity: f32) -> Result<(), SceneError> {
        self.light_intensity = intensity;
        Ok(())
    }

    fn set_light_position(&mut self, x: f32, y: f32, z: f32) -> Result<(), SceneError> {
        self.light_position = Vec3::new(x, y, z);
        Ok(())
    }

    fn set_ambient_color(&mut self, color: Color) -> Result<(), SceneError> {
        self.ambient_color = color;
        Ok(())
    }

    fn set_ambient_intensity(&mut self, intensity: f32) -> Result<(), SceneError> {
        self.ambient_intensity = intensity;
        Ok(())
    }

    fn set_ground_color(&mut self, color: Color) -> Result<(), SceneError> {
        self.ground_color = color;
        Ok(())
    }

    fn set_ground_size(&mut self, size: f32) -> Result<(), SceneError> {
        self.ground_size = size;
        Ok(())
    }

    fn set_background(&mut self, color: Color) -> Result<(), SceneError> {
        self.background = color;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SceneError> {
        *self = Self::default();
        Ok(())
    }

    fn wait(&mut self, seconds: f32) -> Result<(), SceneError> {
        self.waited_seconds += seconds;
        Ok(())
    }
}
