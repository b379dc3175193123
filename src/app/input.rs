use crate::render::MoveDirection;
use winit::keyboard::{KeyCode, PhysicalKey};

pub fn direction_for_key(key: PhysicalKey) -> Option<MoveDirection> {
    match key {
        PhysicalKey::Code(KeyCode::KeyW) => Some(MoveDirection::Forward),
        PhysicalKey::Code(KeyCode::KeyS) => Some(MoveDirection::Backward),
        PhysicalKey::Code(KeyCode::KeyA) => Some(MoveDirection::Left),
        PhysicalKey::Code(KeyCode::KeyD) => Some(MoveDirection::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_maps_to_directions() {
        assert_eq!(
            direction_for_key(PhysicalKey::Code(KeyCode::KeyW)),
            Some(MoveDirection::Forward)
        );
        assert_eq!(
            direction_for_key(PhysicalKey::Code(KeyCode::KeyD)),
            Some(MoveDirection::Right)
        );
        assert_eq!(direction_for_key(PhysicalKey::Code(KeyCode::ArrowUp)), None);
    }
}
