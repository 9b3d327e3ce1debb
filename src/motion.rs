//! Moves built by the firmware itself rather than parsed from a line, such as the individual
//! moves of a homing sequence.

use log::debug;

use crate::types::{MoveKind, Target};

/// The planner's input queue.
pub trait MotionQueue {
    /// The position the last queued move ends at.
    fn startpoint(&self) -> Target;
    fn enqueue(&mut self, target: Target);
}

/// A homing move over a subset of the axes. Axes left unset stay where the previous move ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyntheticMove {
    x: Option<i32>,
    y: Option<i32>,
    z: Option<i32>,
    e: Option<i32>,
    f: u32,
}

impl SyntheticMove {
    pub fn new(feed: u32) -> Self {
        Self {
            f: feed,
            ..Self::default()
        }
    }

    pub fn x(mut self, steps: i32) -> Self {
        self.x = Some(steps);
        self
    }

    pub fn y(mut self, steps: i32) -> Self {
        self.y = Some(steps);
        self
    }

    pub fn z(mut self, steps: i32) -> Self {
        self.z = Some(steps);
        self
    }

    pub fn e(mut self, steps: i32) -> Self {
        self.e = Some(steps);
        self
    }

    /// The target this move reaches from `start`.
    pub fn target_from(&self, start: Target) -> Target {
        Target {
            x: self.x.unwrap_or(start.x),
            y: self.y.unwrap_or(start.y),
            z: self.z.unwrap_or(start.z),
            e: self.e.unwrap_or(start.e),
            f: self.f,
            kind: MoveKind::Homing,
        }
    }

    pub fn enqueue<Q: MotionQueue>(self, queue: &mut Q) {
        let target = self.target_from(queue.startpoint());
        debug!("synthetic move to {:?}", target);
        queue.enqueue(target);
    }
}

pub fn move_xy<Q: MotionQueue>(queue: &mut Q, x: i32, y: i32, feed: u32) {
    SyntheticMove::new(feed).x(x).y(y).enqueue(queue)
}

pub fn move_z<Q: MotionQueue>(queue: &mut Q, z: i32, feed: u32) {
    SyntheticMove::new(feed).z(z).enqueue(queue)
}

pub fn move_e<Q: MotionQueue>(queue: &mut Q, e: i32, feed: u32) {
    SyntheticMove::new(feed).e(e).enqueue(queue)
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Queue {
        moves: Vec<Target>,
    }

    impl MotionQueue for Queue {
        fn startpoint(&self) -> Target {
            self.moves.last().copied().unwrap_or(Target {
                x: 10,
                y: 20,
                z: 30,
                e: 40,
                f: 500,
                kind: MoveKind::Parsed,
            })
        }

        fn enqueue(&mut self, target: Target) {
            self.moves.push(target)
        }
    }

    #[test]
    fn only_the_given_axes_move() {
        let mut q = Queue::default();
        move_xy(&mut q, -1, -2, 1200);
        assert_eq!(
            q.moves,
            [Target {
                x: -1,
                y: -2,
                z: 30,
                e: 40,
                f: 1200,
                kind: MoveKind::Homing,
            }]
        );
    }

    #[test]
    fn moves_chain_from_the_last_queued_position() {
        let mut q = Queue::default();
        move_z(&mut q, 0, 50);
        move_e(&mut q, 7, 60);
        let last = q.moves[1];
        assert_eq!((last.x, last.y, last.z, last.e, last.f), (10, 20, 0, 7, 60));
        assert!(q.moves.iter().all(|t| t.kind == MoveKind::Homing));
    }

    #[test]
    fn the_builder_covers_any_axis_subset() {
        let start = Target::default();
        let t = SyntheticMove::new(9).x(1).z(3).target_from(start);
        assert_eq!((t.x, t.y, t.z, t.e, t.f), (1, 0, 3, 0, 9));
    }
}
