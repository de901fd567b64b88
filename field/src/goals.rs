//! Goal progress tracking for resolution passes.

use lumengrid_core::{Beam, LightColor};

/// Accumulated progress of a single goal piece during a resolution pass.
///
/// Progress is rebuilt from a full reset at the start of every pass; it is
/// never carried incrementally across passes. Satisfaction demands the exact
/// target color and exactly one struck axis, where opposite approach
/// headings count as the same axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GoalProgress {
    target: LightColor,
    received: LightColor,
    hit_directions: u8,
    satisfied: bool,
}

impl GoalProgress {
    /// Fresh progress for a goal expecting the provided color.
    ///
    /// A goal with no target color demands darkness and therefore starts
    /// satisfied.
    pub(crate) fn reset(target: LightColor) -> Self {
        Self {
            target,
            received: LightColor::NONE,
            hit_directions: 0,
            satisfied: target.is_none(),
        }
    }

    /// Folds an arriving beam into the goal's progress.
    pub(crate) fn absorb(&mut self, beam: &Beam) {
        self.received = self.received.merged(beam.color());
        self.hit_directions |= 1 << beam.direction().index();
        self.satisfied = if self.target.is_none() {
            self.received.is_none() && self.struck_axes() == 0
        } else {
            self.received == self.target && self.struck_axes() == 1
        };
    }

    pub(crate) const fn target(&self) -> LightColor {
        self.target
    }

    pub(crate) const fn received(&self) -> LightColor {
        self.received
    }

    pub(crate) const fn satisfied(&self) -> bool {
        self.satisfied
    }

    fn struck_axes(&self) -> u32 {
        let folded = (self.hit_directions | (self.hit_directions >> 4)) & 0x0f;
        folded.count_ones()
    }
}
