//! Preset recall choreography.
//!
//! A recall is not a single write. The device only switches presets after
//! every module has been primed with the selector, committed a second time,
//! and the output modules have seen an activation pulse. The plan is built
//! as plain data and then played back against the clock.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use kxlink_core::PresetSelector;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::codec::{self, Frame, SYNC_REQUEST};
use crate::link::Link;

/// Modules addressed by the prime and commit sweeps.
pub const SWEEP_MODULES: RangeInclusive<u8> = 0..=10;
/// Output modules that receive the activation pulse.
pub const PULSE_MODULES: [u8; 5] = [0, 4, 5, 6, 7];

const SWEEP_SPACING: Duration = Duration::from_millis(20);
const COMMIT_AT: Duration = Duration::from_millis(400);
const PULSE_AT: Duration = Duration::from_millis(700);
const PULSE_SPACING: Duration = Duration::from_millis(30);
const SETTLE_AT: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prime,
    Commit,
    Pulse,
    Settle,
}

/// What to write at a step. Pings take their sequence byte when sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Frame(Frame),
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledStep {
    /// Offset from the start of the recall
    pub at: Duration,
    pub phase: Phase,
    pub step: Step,
}

/// Timed frame schedule for one recall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallPlan {
    pub preset: PresetSelector,
    pub steps: Vec<ScheduledStep>,
}

impl RecallPlan {
    /// Build the schedule for a preset index. Unknown indices recall P01.
    #[must_use]
    pub fn new(index: usize) -> Self {
        let preset = PresetSelector::resolve(index);
        let mut steps = vec![
            ScheduledStep { at: Duration::ZERO, phase: Phase::Prime, step: Step::Frame(SYNC_REQUEST) },
            ScheduledStep { at: Duration::ZERO, phase: Phase::Prime, step: Step::Ping },
        ];

        for (phase, start) in [(Phase::Prime, Duration::ZERO), (Phase::Commit, COMMIT_AT)] {
            steps.extend(SWEEP_MODULES.map(|module| ScheduledStep {
                at: start + SWEEP_SPACING * u32::from(module),
                phase,
                step: Step::Frame(codec::encode_recall(module, preset.selector)),
            }));
        }

        steps.extend(PULSE_MODULES.iter().zip(0u32..).map(|(&module, i)| ScheduledStep {
            at: PULSE_AT + PULSE_SPACING * i,
            phase: Phase::Pulse,
            step: Step::Frame(codec::encode_recall(module, preset.pulse)),
        }));

        steps.push(ScheduledStep { at: SETTLE_AT, phase: Phase::Settle, step: Step::Ping });

        Self { preset, steps }
    }

    /// Offset of the last step.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.steps.last().map_or(Duration::ZERO, |s| s.at)
    }
}

/// Play a plan against the clock, starting now.
pub(crate) async fn play(plan: RecallPlan, link: Arc<Link>) {
    let start = Instant::now();
    let mut phase = None;
    for step in plan.steps {
        sleep_until(start + step.at).await;
        if phase != Some(step.phase) {
            debug!(phase = ?step.phase, preset = plan.preset.index, "Recall phase");
            phase = Some(step.phase);
        }
        match step.step {
            Step::Frame(frame) => link.send(&frame),
            Step::Ping => link.send_ping(),
        };
    }
}
