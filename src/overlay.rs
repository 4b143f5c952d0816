//! Debug overlay text.
//!
//! A plain-text snapshot of the interesting scene numbers, formatted the way
//! the on-screen debug panel shows them: object, camera, and camera target
//! positions to two decimals.

use glam::Vec3;

use crate::scene::SceneState;

fn row(out: &mut String, label: &str, v: Vec3) {
    out.push_str(&format!(
        "{label:<18} x {:>8.2}  y {:>8.2}  z {:>8.2}\n",
        v.x, v.y, v.z
    ));
}

/// Render the overlay for a scene snapshot.
pub fn overlay_text(scene: &SceneState) -> String {
    let mut out = String::new();
    row(&mut out, "object position", scene.object_position);
    row(&mut out, "camera position", scene.camera_position);
    row(&mut out, "camera target", scene.camera_target);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneCommands;

    #[test]
    fn test_overlay_shows_defaults() {
        let text = overlay_text(&SceneState::new());
        assert!(text.contains("object position"));
        assert!(text.contains("0.50"));
        assert!(text.contains("-30.00"));
        assert!(text.contains("-15.00"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_overlay_tracks_mutation() {
        let mut scene = SceneState::new();
        scene.move_forward(2.25).unwrap();
        let text = overlay_text(&scene);
        assert!(text.contains("-2.25"));
    }
}
