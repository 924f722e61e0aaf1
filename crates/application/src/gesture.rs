use inkfolio_core::Direction;

/// Direction of a horizontal drag from `start_x` to `end_x`. Dragging
/// leftwards pages forward. Drags no longer than `threshold` are ignored.
pub fn swipe_direction(start_x: i32, end_x: i32, threshold: u32) -> Option<Direction> {
    let diff = start_x - end_x;
    if diff.unsigned_abs() <= threshold {
        return None;
    }
    if diff > 0 {
        Some(Direction::Forward)
    } else {
        Some(Direction::Backward)
    }
}
