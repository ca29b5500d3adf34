//! Paces buffered movement frames against the host's wall clock.
//!
//! Frames carry the host wall time they were taken at. The interpolator keeps
//! a virtual host clock (`local wall time + offset`) and nudges the offset so
//! that roughly [`TARGET_WINDOW`] frames stay buffered: playback speeds up
//! when the buffer grows and slows down when it drains.

use std::collections::VecDeque;

use tracing::{info, warn};

/// Frames the interpolator tries to keep buffered.
pub const TARGET_WINDOW: usize = 5;

/// Gain of the offset correction.
const OFFSET_SHIFT_COEFFICIENT: f32 = 5.0;

/// What the owner of the frame buffer should do after [`TimeInterpolator::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationStep {
    /// Blend between the two oldest frames by [`TimeInterpolator::interpolation_step`].
    Interpolate,
    /// The virtual clock jumped to catch up; update again next frame.
    Resynced,
    /// The oldest frame is in the past. Pop it and update again.
    NextFrame,
    /// The two oldest frames share a timestamp. Pop the oldest.
    Duplicate,
    /// Not enough frames buffered yet.
    Waiting,
}

#[derive(Debug, Clone, Default)]
pub struct TimeInterpolator {
    timestamps: VecDeque<f32>,
    host_walltime_offset: f32,
    interpolation_step: f32,
    offset_shift_vel: f32,
}

impl TimeInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the host wall time of a newly buffered frame.
    pub fn push(&mut self, host_walltime: f32) {
        self.timestamps.push_back(host_walltime);
    }

    /// Forgets the oldest frame.
    pub fn pop(&mut self) {
        self.timestamps.pop_front();
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Position between the two oldest frames, in `0.0..=1.0`.
    pub fn interpolation_step(&self) -> f32 {
        self.interpolation_step
    }

    pub fn host_walltime_offset(&self) -> f32 {
        self.host_walltime_offset
    }

    /// Advances the virtual host clock. `walltime` is the local wall time and
    /// `timestep` the length of the frame being simulated, both in seconds.
    pub fn update(&mut self, walltime: f32, timestep: f32) -> InterpolationStep {
        let count = self.timestamps.len();
        if count < 2 {
            return InterpolationStep::Waiting;
        }
        let virtual_host = walltime + self.host_walltime_offset;
        let current = self.timestamps[0];
        let next = self.timestamps[1];
        let last = self.timestamps[count - 1];

        if current == next {
            warn!(timestamp = current, "two buffered frames share a timestamp");
            return InterpolationStep::Duplicate;
        }

        if virtual_host > last {
            // Ran out of frames: wait for a full window, then land on its middle.
            if count < 2 * TARGET_WINDOW {
                return InterpolationStep::Waiting;
            }
            self.host_walltime_offset = self.timestamps[count - 1 - TARGET_WINDOW] - walltime;
            info!(offset = self.host_walltime_offset, "host clock offset reset");
            return InterpolationStep::Resynced;
        }

        if virtual_host < current {
            // Fell behind the oldest frame: skip ahead the same way.
            if count < 2 * TARGET_WINDOW {
                return InterpolationStep::Waiting;
            }
            self.host_walltime_offset = self.timestamps[count - 1 - TARGET_WINDOW] - walltime;
            if self.host_walltime_offset + walltime < current {
                let diff = next - (self.host_walltime_offset + walltime);
                self.host_walltime_offset += diff / 2.0;
            }
            info!(offset = self.host_walltime_offset, "frames missing, jumping ahead");
            return InterpolationStep::Resynced;
        }

        if virtual_host > next {
            return InterpolationStep::NextFrame;
        }

        self.interpolation_step = (virtual_host - current) / (next - current);

        // Cubic in the distance from the target window: zero at the target,
        // negative when starved, positive when backed up.
        let window = count as f32 - self.interpolation_step;
        let target = TARGET_WINDOW as f32;
        self.offset_shift_vel = OFFSET_SHIFT_COEFFICIENT * ((window - target) / target).powi(3);
        self.host_walltime_offset += self.offset_shift_vel * timestep;
        InterpolationStep::Interpolate
    }
}
