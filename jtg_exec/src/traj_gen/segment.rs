//! Timed segments and the queue holding them

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::DVector;
use std::collections::{vec_deque, VecDeque};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One timed motion goal in joint space.
///
/// Times are in control clock seconds. A segment becomes eligible for
/// execution once `start_time_s` has passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start_time_s: f64,
    pub goal_time_s: f64,

    /// Units: radians
    pub goal_position: DVector<f64>,

    /// Units: radians/second
    pub goal_velocity: DVector<f64>,

    /// Units: radians/second^2
    pub goal_acceleration: DVector<f64>,
}

/// Time ordered queue of segments.
///
/// Segments are kept in non-decreasing `start_time_s` order. Only the front
/// segment is ever executed.
#[derive(Debug, Default, Clone)]
pub struct SegmentQueue {
    segments: VecDeque<Segment>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Segment {
    /// Create a segment with zero goal state.
    pub fn zeros(num_dof: usize, start_time_s: f64, goal_time_s: f64) -> Self {
        Self {
            start_time_s,
            goal_time_s,
            goal_position: DVector::zeros(num_dof),
            goal_velocity: DVector::zeros(num_dof),
            goal_acceleration: DVector::zeros(num_dof),
        }
    }

    /// Time allowed to reach the goal, never negative.
    pub fn duration_s(&self) -> f64 {
        (self.goal_time_s - self.start_time_s).max(0.0)
    }
}

impl SegmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn front(&self) -> Option<&Segment> {
        self.segments.front()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Replace the whole queue with a single segment.
    pub fn replace(&mut self, segment: Segment) {
        self.segments.clear();
        self.segments.push_back(segment);
    }

    /// Merge a new batch of segments into the queue.
    ///
    /// Every queued segment starting at or after the first incoming segment
    /// is discarded and the batch is appended in its place.
    ///
    /// Returns the number of queued segments that were discarded, or `None`
    /// if the batch is empty, in which case the queue is untouched.
    pub fn splice<I>(&mut self, incoming: I) -> Option<usize>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut incoming = incoming.into_iter().peekable();

        let pivot_s = match incoming.peek() {
            Some(s) => s.start_time_s,
            None => return None,
        };

        let keep = self.segments.partition_point(|s| s.start_time_s < pivot_s);
        let discarded = self.segments.len() - keep;

        self.segments.truncate(keep);
        self.segments.extend(incoming);

        trace!(
            "Spliced at {:.3} s: kept {}, discarded {}, queue now {}",
            pivot_s,
            keep,
            discarded,
            self.segments.len()
        );

        Some(discarded)
    }

    /// Drop segments which are no longer relevant at `now_s`.
    ///
    /// A segment is marked when its goal time has passed or when the segment
    /// after it has already started. Everything in front of the last marked
    /// segment is removed. The last marked segment itself is only removed if
    /// it has been superseded by a started successor, a segment whose goal
    /// time has passed without a successor stays at the front until the OTG
    /// reports it complete.
    ///
    /// Returns the number of segments removed. When it is not zero the front
    /// segment is new and the OTG must be recomputed for it.
    pub fn expire(&mut self, now_s: f64) -> usize {
        let mut boundary: Option<(usize, bool)> = None;

        for (i, seg) in self.segments.iter().enumerate() {
            let superseded = self
                .segments
                .get(i + 1)
                .map_or(false, |next| next.start_time_s <= now_s);

            if seg.goal_time_s <= now_s || superseded {
                boundary = Some((i, superseded));
            }
        }

        let num_removed = match boundary {
            Some((i, true)) => i + 1,
            Some((i, false)) => i,
            None => 0,
        };

        if num_removed > 0 {
            self.segments.drain(..num_removed);

            trace!(
                "Expired {} segment(s) at {:.3} s, {} remaining",
                num_removed,
                now_s,
                self.segments.len()
            );
        }

        num_removed
    }

    /// The front segment, if it has started by `now_s`.
    pub fn active(&self, now_s: f64) -> Option<&Segment> {
        self.segments.front().filter(|s| s.start_time_s <= now_s)
    }

    /// Remove the front segment once its goal has been reached.
    pub fn pop_front(&mut self) -> Option<Segment> {
        self.segments.pop_front()
    }
}
