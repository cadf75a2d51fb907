//! Path and path-follower components

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{angle_delta, Vec2};

/// How a segment reaches its destination waypoint.
///
/// The mode is declared on the destination waypoint: the segment from
/// point `i` to point `i + 1` uses point `i + 1`'s mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionMode {
    /// Constant-velocity segment. Exactly one quantity must be given;
    /// anything else is a load error.
    Uniform {
        /// Segment duration in seconds.
        #[serde(default)]
        time: Option<f32>,
        /// Linear speed in units/s.
        #[serde(default)]
        linear_speed: Option<f32>,
        /// Angular speed in radians/s.
        #[serde(default)]
        angular_speed: Option<f32>,
    },
    /// Constant-acceleration segment, optionally capped.
    Accelerated {
        /// Linear acceleration in units/s^2.
        #[serde(default)]
        linear_accel: f32,
        /// Angular acceleration in radians/s^2.
        #[serde(default)]
        angular_accel: f32,
        /// Optional linear speed cap in units/s.
        #[serde(default)]
        max_speed: Option<f32>,
    },
}

impl Default for MotionMode {
    fn default() -> Self {
        Self::Uniform {
            time: None,
            linear_speed: None,
            angular_speed: None,
        }
    }
}

/// One waypoint of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// World position.
    pub position: Vec2,
    /// Orientation at this waypoint in radians.
    #[serde(default)]
    pub angle: f32,
    /// How to reach this waypoint from the previous one.
    #[serde(default)]
    pub mode: MotionMode,
}

impl PathPoint {
    /// Waypoint reached in a fixed amount of time.
    pub fn timed(position: Vec2, angle: f32, seconds: f32) -> Self {
        Self {
            position,
            angle,
            mode: MotionMode::Uniform {
                time: Some(seconds),
                linear_speed: None,
                angular_speed: None,
            },
        }
    }
}

/// Path validation failures, surfaced at load time.
#[derive(Error, Debug)]
pub enum PathError {
    /// A path needs at least two waypoints to define a segment.
    #[error("path has fewer than two waypoints")]
    TooFewPoints,
    /// A uniform waypoint specified no quantity.
    #[error("waypoint {index}: uniform motion specifies no quantity")]
    MissingMotionQuantity {
        /// Waypoint index within the path.
        index: usize,
    },
    /// A uniform waypoint specified more than one quantity.
    #[error("waypoint {index}: uniform motion specifies more than one quantity")]
    ConflictingMotionQuantity {
        /// Waypoint index within the path.
        index: usize,
    },
    /// An accelerated waypoint with zero linear and angular acceleration.
    #[error("waypoint {index}: accelerated motion specifies no acceleration")]
    MissingAcceleration {
        /// Waypoint index within the path.
        index: usize,
    },
}

/// An ordered, immutable (after load) sequence of waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompPath {
    points: Vec<PathPoint>,
}

impl CompPath {
    /// Create a path from waypoints.
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self { points }
    }

    /// All waypoints, in order.
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Check the load-time invariants of every waypoint's motion mode.
    ///
    /// The first waypoint's mode is never used (it has no inbound
    /// segment) and is not validated.
    pub fn validate(&self) -> Result<(), PathError> {
        if self.points.len() < 2 {
            return Err(PathError::TooFewPoints);
        }
        for (index, point) in self.points.iter().enumerate().skip(1) {
            match &point.mode {
                MotionMode::Uniform {
                    time,
                    linear_speed,
                    angular_speed,
                } => {
                    let given = [time, linear_speed, angular_speed]
                        .iter()
                        .filter(|q| q.is_some())
                        .count();
                    match given {
                        0 => return Err(PathError::MissingMotionQuantity { index }),
                        1 => {}
                        _ => return Err(PathError::ConflictingMotionQuantity { index }),
                    }
                }
                MotionMode::Accelerated {
                    linear_accel,
                    angular_accel,
                    ..
                } => {
                    if *linear_accel == 0.0 && *angular_accel == 0.0 {
                        return Err(PathError::MissingAcceleration { index });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Target velocities (and optional transform snaps) the path follower
/// wants applied for one tick. Applying them to the solver is the
/// physics system's job, keeping this component solver-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct PathTarget {
    /// Target linear velocity.
    pub linear: Vec2,
    /// Target angular velocity.
    pub angular: f32,
    /// Set on wraparound: teleport the body origin here.
    pub snap_position: Option<Vec2>,
    /// Set on wraparound with `reset_angle`: snap the orientation here.
    pub snap_angle: Option<f32>,
}

impl PathTarget {
    fn halt() -> Self {
        Self {
            linear: Vec2::zeros(),
            angular: 0.0,
            snap_position: None,
            snap_angle: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Traversal {
    current_point: usize,
    segment_started: bool,
    finished: bool,
    // Uniform-mode state.
    remaining_time: f32,
    linear_vel: Vec2,
    angular_vel: f32,
    // Accelerated-mode state.
    accelerated: bool,
    by_distance: bool,
    linear_dir: Vec2,
    angular_sign: f32,
    lin_accel: f32,
    ang_accel: f32,
    max_speed: Option<f32>,
    linear_speed: f32,
    angular_speed: f32,
    remaining_distance: f32,
    remaining_angle: f32,
}

/// Advances an entity along a sibling [`CompPath`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompPathMove {
    /// Instance id of the sibling Path component.
    #[serde(default)]
    pub path_id: String,
    /// Wrap back to waypoint 0 after the last waypoint.
    #[serde(default)]
    pub repeat: bool,
    /// Snap orientation to waypoint 0's angle on wraparound.
    #[serde(default)]
    pub reset_angle: bool,
    #[serde(skip)]
    state: Traversal,
}

impl CompPathMove {
    /// Create a follower for the path with the given instance id.
    pub fn new(path_id: impl Into<String>) -> Self {
        Self {
            path_id: path_id.into(),
            repeat: false,
            reset_angle: false,
            state: Traversal::default(),
        }
    }

    /// Builder-style repeat flag.
    #[must_use]
    pub fn repeating(mut self, reset_angle: bool) -> Self {
        self.repeat = true;
        self.reset_angle = reset_angle;
        self
    }

    /// Index of the waypoint the follower last departed from.
    pub fn current_point(&self) -> usize {
        self.state.current_point
    }

    /// Whether a non-repeating follower has reached the final waypoint.
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Advance traversal state by `dt` and return the velocities the
    /// physics system should apply, or `None` when the path is unusable.
    pub fn advance(&mut self, path: &CompPath, dt: f32) -> Option<PathTarget> {
        if path.len() < 2 {
            return None;
        }
        if self.state.finished {
            return Some(PathTarget::halt());
        }

        let mut snap_position = None;
        let mut snap_angle = None;
        let mut budget = dt;
        // Bounds the number of zero-duration segments crossed in one
        // tick so a degenerate all-instant looping path cannot spin.
        let mut hops = path.len() + 1;

        // A tick may cross a waypoint boundary; the leftover time is
        // carried into the next segment so segment phases stay exact.
        loop {
            if !self.state.segment_started {
                self.begin_segment(path);
            }

            budget = if self.state.accelerated {
                self.advance_accelerated(budget)
            } else {
                self.advance_uniform(budget)
            };

            if self.segment_done() {
                if self.finish_segment(path) {
                    snap_position = Some(path.points()[0].position);
                    if self.reset_angle {
                        snap_angle = Some(path.points()[0].angle);
                    }
                }
                if self.state.finished {
                    return Some(PathTarget {
                        snap_position,
                        snap_angle,
                        ..PathTarget::halt()
                    });
                }
            }

            hops -= 1;
            if budget <= 0.0 || hops == 0 {
                break;
            }
        }

        Some(PathTarget {
            linear: self.state.linear_vel,
            angular: self.state.angular_vel,
            snap_position,
            snap_angle,
        })
    }

    /// Set up per-segment state for the segment leaving `current_point`.
    fn begin_segment(&mut self, path: &CompPath) {
        let from = &path.points()[self.state.current_point];
        let to = &path.points()[self.state.current_point + 1];
        let delta = to.position - from.position;
        let distance = delta.norm();
        let turn = angle_delta(from.angle, to.angle);

        match &to.mode {
            MotionMode::Uniform {
                time,
                linear_speed,
                angular_speed,
            } => {
                let duration = if let Some(t) = time {
                    *t
                } else if let Some(s) = linear_speed {
                    if *s > 0.0 {
                        distance / s
                    } else {
                        0.0
                    }
                } else if let Some(w) = angular_speed {
                    if *w > 0.0 {
                        turn.abs() / w
                    } else {
                        0.0
                    }
                } else {
                    // Rejected at load time; degrade to an instant hop.
                    0.0
                };
                self.state.accelerated = false;
                self.state.remaining_time = duration.max(0.0);
                if self.state.remaining_time > 0.0 {
                    self.state.linear_vel = delta / self.state.remaining_time;
                    self.state.angular_vel = turn / self.state.remaining_time;
                } else {
                    self.state.linear_vel = Vec2::zeros();
                    self.state.angular_vel = 0.0;
                }
            }
            MotionMode::Accelerated {
                linear_accel,
                angular_accel,
                max_speed,
            } => {
                self.state.accelerated = true;
                self.state.by_distance = *linear_accel != 0.0 && distance > 0.0;
                self.state.linear_dir = if distance > 0.0 {
                    delta / distance
                } else {
                    Vec2::zeros()
                };
                self.state.angular_sign = if turn == 0.0 { 0.0 } else { turn.signum() };
                self.state.lin_accel = *linear_accel;
                self.state.ang_accel = *angular_accel;
                self.state.max_speed = *max_speed;
                self.state.linear_speed = 0.0;
                self.state.angular_speed = 0.0;
                self.state.remaining_distance = distance;
                self.state.remaining_angle = turn.abs();
                self.state.linear_vel = Vec2::zeros();
                self.state.angular_vel = 0.0;
            }
        }
        self.state.segment_started = true;
    }

    /// Consume up to `budget` seconds of a uniform segment; returns the
    /// unused remainder.
    fn advance_uniform(&mut self, budget: f32) -> f32 {
        if self.state.remaining_time > budget {
            self.state.remaining_time -= budget;
            0.0
        } else {
            let leftover = budget - self.state.remaining_time;
            self.state.remaining_time = 0.0;
            leftover
        }
    }

    /// Consume `budget` seconds of an accelerated segment. Arrival is
    /// detected on the primary quantity (distance when a linear
    /// acceleration is given, angle otherwise); overshoot within the
    /// final tick is absorbed rather than carried.
    fn advance_accelerated(&mut self, budget: f32) -> f32 {
        let st = &mut self.state;
        st.linear_speed += st.lin_accel * budget;
        if let Some(cap) = st.max_speed {
            st.linear_speed = st.linear_speed.min(cap);
        }
        st.angular_speed += st.ang_accel * budget;

        if st.by_distance {
            st.remaining_distance -= st.linear_speed * budget;
        } else {
            st.remaining_angle -= st.angular_speed * budget;
        }

        st.linear_vel = st.linear_dir * st.linear_speed;
        st.angular_vel = st.angular_sign * st.angular_speed;
        0.0
    }

    fn segment_done(&self) -> bool {
        if self.state.accelerated {
            if self.state.by_distance {
                self.state.remaining_distance <= 0.0
            } else {
                self.state.remaining_angle <= 0.0
            }
        } else {
            self.state.remaining_time <= 0.0
        }
    }

    /// Advance to the next waypoint; returns true when the path wrapped.
    fn finish_segment(&mut self, path: &CompPath) -> bool {
        self.state.segment_started = false;
        self.state.current_point += 1;
        if self.state.current_point >= path.len() - 1 {
            if self.repeat {
                self.state.current_point = 0;
                return true;
            }
            self.state.finished = true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn timed_path() -> CompPath {
        // Two uniform segments: 2 s to (10, 0), then 3 s to (10, 15).
        CompPath::new(vec![
            PathPoint::timed(Vec2::new(0.0, 0.0), 0.0, 0.0),
            PathPoint::timed(Vec2::new(10.0, 0.0), 0.0, 2.0),
            PathPoint::timed(Vec2::new(10.0, 15.0), 0.0, 3.0),
        ])
    }

    #[test]
    fn validate_rejects_empty_uniform() {
        let path = CompPath::new(vec![
            PathPoint {
                position: Vec2::zeros(),
                angle: 0.0,
                mode: MotionMode::default(),
            },
            PathPoint {
                position: Vec2::new(1.0, 0.0),
                angle: 0.0,
                mode: MotionMode::default(),
            },
        ]);
        assert!(matches!(
            path.validate(),
            Err(PathError::MissingMotionQuantity { index: 1 })
        ));
    }

    #[test]
    fn validate_rejects_conflicting_quantities() {
        let path = CompPath::new(vec![
            PathPoint::timed(Vec2::zeros(), 0.0, 0.0),
            PathPoint {
                position: Vec2::new(1.0, 0.0),
                angle: 0.0,
                mode: MotionMode::Uniform {
                    time: Some(1.0),
                    linear_speed: Some(2.0),
                    angular_speed: None,
                },
            },
        ]);
        assert!(matches!(
            path.validate(),
            Err(PathError::ConflictingMotionQuantity { index: 1 })
        ));
    }

    #[test]
    fn uniform_segments_produce_constant_velocity() {
        let path = timed_path();
        let mut follower = CompPathMove::new("");
        let target = follower.advance(&path, 1.0 / 60.0).unwrap();
        // 10 units in 2 s.
        assert_relative_eq!(target.linear.x, 5.0, epsilon = 1e-4);
        assert_relative_eq!(target.linear.y, 0.0);
    }

    #[test]
    fn follower_switches_segment_on_schedule() {
        let path = timed_path();
        let mut follower = CompPathMove::new("");
        let dt = 1.0 / 60.0;
        // Well under 2 s: still on the first segment.
        for _ in 0..118 {
            follower.advance(&path, dt);
        }
        assert_eq!(follower.current_point(), 0);
        // Crossing 2 s moves to the second segment (15 units in 3 s).
        let mut target = None;
        for _ in 0..4 {
            target = follower.advance(&path, dt);
        }
        assert_eq!(follower.current_point(), 1);
        assert_relative_eq!(target.unwrap().linear.y, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn non_repeating_follower_halts_at_end() {
        let path = timed_path();
        let mut follower = CompPathMove::new("");
        let dt = 1.0 / 60.0;
        for _ in 0..360 {
            follower.advance(&path, dt);
        }
        assert!(follower.is_finished());
        let target = follower.advance(&path, dt).unwrap();
        assert_eq!(target.linear, Vec2::zeros());
    }

    #[test]
    fn repeat_wraps_and_snaps_to_start() {
        let path = timed_path();
        let mut follower = CompPathMove::new("").repeating(true);
        let dt = 1.0 / 60.0;
        let mut snapped = None;
        for _ in 0..306 {
            // 5.1 s of simulated time.
            if let Some(target) = follower.advance(&path, dt) {
                if target.snap_position.is_some() {
                    snapped = target.snap_position;
                    assert_eq!(target.snap_angle, Some(0.0));
                }
            }
        }
        assert_eq!(snapped, Some(Vec2::new(0.0, 0.0)));
        assert_eq!(follower.current_point(), 0);
        assert!(!follower.is_finished());
    }

    #[test]
    fn accelerated_segment_ramps_up() {
        let path = CompPath::new(vec![
            PathPoint::timed(Vec2::zeros(), 0.0, 0.0),
            PathPoint {
                position: Vec2::new(100.0, 0.0),
                angle: 0.0,
                mode: MotionMode::Accelerated {
                    linear_accel: 2.0,
                    angular_accel: 0.0,
                    max_speed: Some(5.0),
                },
            },
        ]);
        assert!(path.validate().is_ok());
        let mut follower = CompPathMove::new("");
        let dt = 0.5;
        let first = follower.advance(&path, dt).unwrap();
        assert_relative_eq!(first.linear.x, 1.0, epsilon = 1e-5);
        // After enough ticks the cap kicks in.
        for _ in 0..10 {
            follower.advance(&path, dt);
        }
        let capped = follower.advance(&path, dt).unwrap();
        assert_relative_eq!(capped.linear.x, 5.0, epsilon = 1e-5);
    }
}
