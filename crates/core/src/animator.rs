//! Transition animator.
//!
//! Each call to [`Animator::animate`] opens a session that slides one item
//! from its current cell towards a target cell. Sessions advance on
//! [`Animator::tick`] and report a [`Landed`] completion exactly once, either
//! when their duration elapses or when the renderer reports the end of its own
//! transition through [`Animator::signal_end`]. The structural move is not
//! performed here: the caller commits each `Landed` into the grid.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::grid::{CellId, ItemId};
use crate::layout::{Offset, Rect};
use crate::operation::OperationId;

/// Identifier for a single animation session.
pub type TransitionId = u64;

/// Default transition length in milliseconds.
pub const DEFAULT_DURATION_MS: u64 = 500;

/// Bisection steps used to invert the x(t) curve of a cubic bezier.
const BEZIER_ITERATIONS: usize = 32;

/// Interpolation curve applied to transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// CSS `ease`: cubic-bezier(0.25, 0.1, 0.25, 1.0).
    #[default]
    Ease,
    /// Circular ease-in-out.
    EaseInOut,
}

impl Easing {
    /// Map linear progress `t` in `[0, 1]` to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
        }
    }
}

/// Evaluate a CSS-style cubic bezier with endpoints (0,0) and (1,1) at `x`.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, x: f64) -> f64 {
    let curve = |p1: f64, p2: f64, s: f64| {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    };

    let (mut lo, mut hi) = (0.0, 1.0);
    for _ in 0..BEZIER_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        if curve(x1, x2, mid) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    curve(y1, y2, (lo + hi) / 2.0)
}

/// One item moving from one cell to another on behalf of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    pub op: OperationId,
    pub item: ItemId,
    pub from: CellId,
    pub to: CellId,
}

/// Completion report for a finished transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landed {
    pub transition: TransitionId,
    pub motion: Motion,
}

/// A live animation session.
#[derive(Debug, Clone)]
pub struct Transition {
    id: TransitionId,
    motion: Motion,
    delta: Offset,
    elapsed_ms: u64,
    duration_ms: u64,
    easing: Easing,
    settled: bool,
}

impl Transition {
    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Full screen-space distance between start and target.
    pub fn delta(&self) -> Offset {
        self.delta
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f64 / self.duration_ms as f64).min(1.0)
    }

    /// Current visual offset of the item from its committed cell.
    pub fn offset(&self) -> Offset {
        self.delta.scaled(self.easing.apply(self.progress()))
    }

    fn is_finished(&self) -> bool {
        self.delta.is_zero() || self.elapsed_ms >= self.duration_ms
    }

    fn settle(&mut self) -> Option<Landed> {
        if self.settled {
            return None;
        }
        self.settled = true;
        Some(Landed {
            transition: self.id,
            motion: self.motion,
        })
    }
}

/// Drives all in-flight transitions for one grid.
#[derive(Debug, Clone)]
pub struct Animator {
    sessions: Vec<Transition>,
    duration_ms: u64,
    easing: Easing,
    next_id: TransitionId,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MS, Easing::default())
    }
}

impl Animator {
    pub fn new(duration_ms: u64, easing: Easing) -> Self {
        Self {
            sessions: Vec::new(),
            duration_ms,
            easing,
            next_id: 1,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Change timing for transitions started from now on.
    pub fn set_timing(&mut self, duration_ms: u64, easing: Easing) {
        self.duration_ms = duration_ms;
        self.easing = easing;
    }

    /// Start sliding `motion.item` from `start` to `end`.
    ///
    /// Either rectangle may be unknown (detached element); the session then
    /// has no visible movement and lands on the next tick.
    pub fn animate(&mut self, motion: Motion, start: Option<Rect>, end: Option<Rect>) -> TransitionId {
        let delta = match (start, end) {
            (Some(start), Some(end)) => start.delta_to(&end),
            _ => {
                debug!(
                    item = motion.item,
                    "Transition endpoints unresolved, landing without motion"
                );
                Offset::ZERO
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        self.sessions.push(Transition {
            id,
            motion,
            delta,
            elapsed_ms: 0,
            duration_ms: self.duration_ms,
            easing: self.easing,
            settled: false,
        });
        trace!(
            transition = id,
            item = motion.item,
            dx = delta.dx,
            dy = delta.dy,
            "Transition started"
        );
        id
    }

    /// Advance every session by `delta_ms` and return the ones that landed.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<Landed> {
        let mut landed = Vec::new();
        for session in &mut self.sessions {
            session.elapsed_ms = session.elapsed_ms.saturating_add(delta_ms);
            if session.is_finished() {
                landed.extend(session.settle());
            }
        }
        self.sessions.retain(|s| !s.settled);
        landed
    }

    /// The renderer finished a transition before the tick clock did.
    ///
    /// Repeated signals for the same transition are ignored.
    pub fn signal_end(&mut self, id: TransitionId) -> Option<Landed> {
        let index = self.sessions.iter().position(|s| s.id == id)?;
        let landed = self.sessions[index].settle();
        self.sessions.remove(index);
        landed
    }

    pub fn is_animating(&self) -> bool {
        !self.sessions.is_empty()
    }

    /// Whether any transition started by `op` is still running.
    pub fn in_flight(&self, op: OperationId) -> bool {
        self.sessions.iter().any(|s| s.motion.op == op)
    }

    /// Whether any running transition leaves from or heads to `cell`.
    pub fn touches(&self, cell: CellId) -> bool {
        self.sessions
            .iter()
            .any(|s| s.motion.from == cell || s.motion.to == cell)
    }

    /// Current visual offset of an item, if it is in transit.
    pub fn offset_of(&self, item: ItemId) -> Option<Offset> {
        self.sessions
            .iter()
            .find(|s| s.motion.item == item)
            .map(Transition::offset)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.sessions
    }
}
