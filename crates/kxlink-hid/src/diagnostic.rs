//! Audible line check: alternate the master music level so a listener can
//! confirm the host really drives the mixer.

use std::sync::Arc;
use std::time::Duration;

use kxlink_core::Parameter;
use tokio::time::{Instant, interval_at};
use tracing::debug;

use crate::codec;
use crate::link::Link;

/// Time between level changes.
pub const PULSE_PERIOD: Duration = Duration::from_millis(1500);
/// Levels written in turn, starting with the first.
pub const PULSE_LEVELS: [u8; 2] = [10, 50];

pub(crate) async fn run(link: Arc<Link>) {
    let register = Parameter::MasterMusic.register();
    let mut ticker = interval_at(Instant::now() + PULSE_PERIOD, PULSE_PERIOD);
    for level in PULSE_LEVELS.iter().copied().cycle() {
        ticker.tick().await;
        debug!(level, "Diagnostic pulse");
        link.send(&codec::encode_standard(register.bank, register.id, level));
    }
}
