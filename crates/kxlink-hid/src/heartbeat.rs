//! Keep-alive loop that holds the device in remote-control mode.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, interval_at};

use crate::codec::{HEARTBEAT, SYNC_REQUEST};
use crate::link::Link;

/// Interval between heartbeat frames.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(300);
/// Every this many heartbeats a sync request follows.
pub const SYNC_EVERY: u64 = 7;

/// Send heartbeats until cancelled. The first one goes out one period after
/// the loop starts.
pub(crate) async fn run(link: Arc<Link>) {
    let mut ticker = interval_at(Instant::now() + HEARTBEAT_PERIOD, HEARTBEAT_PERIOD);
    let mut ticks: u64 = 0;
    loop {
        ticker.tick().await;
        ticks += 1;
        link.send(&HEARTBEAT);
        if ticks.is_multiple_of(SYNC_EVERY) {
            link.send(&SYNC_REQUEST);
        }
    }
}
