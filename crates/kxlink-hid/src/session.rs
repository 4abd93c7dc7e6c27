//! Mixer session: connection lifecycle, lock acquisition and writes.

use std::sync::Arc;
use std::time::Duration;

use kxlink_core::{Bank, EqGainEncoding, MixerEvent, Parameter, PresetSelector, SessionState, Value};
use kxlink_core::eq::FLAT_CODE;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{self, SYNC_REQUEST};
use crate::decoder::InboundDecoder;
use crate::device::{KX180_PID, KX180_VID};
use crate::error::{HidError, HidResult};
use crate::handshake::{self, HandshakeScript};
use crate::link::Link;
use crate::recall::{self, RecallPlan};
use crate::tasks::TaskQueue;
use crate::transport::HidBackend;
use crate::{diagnostic, heartbeat};

/// Delay before the ping that closes a bracketed write.
pub const BRACKET_PING_DELAY: Duration = Duration::from_millis(50);

const EVENT_CAPACITY: usize = 256;

/// Session settings.
#[derive(Debug, Clone)]
pub struct MixerConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Frames replayed to acquire the lock
    pub handshake: HandshakeScript,
    /// How EQ gains become hardware codes
    pub eq_encoding: EqGainEncoding,
}

impl MixerConfig {
    /// Settings for a KX-180 with the given handshake.
    #[must_use]
    pub fn new(handshake: HandshakeScript) -> Self {
        Self { vendor_id: KX180_VID, product_id: KX180_PID, handshake, eq_encoding: EqGainEncoding::default() }
    }
}

/// A session with one KX-180.
///
/// All methods take `&self`; share the mixer behind an `Arc`. Methods that
/// schedule delayed writes must be called from within a Tokio runtime.
pub struct Mixer {
    backend: Arc<dyn HidBackend>,
    config: MixerConfig,
    link: Arc<Link>,
    state: Mutex<SessionState>,
    tasks: TaskQueue,
    heartbeat: Mutex<Option<CancellationToken>>,
    pulse: Mutex<Option<CancellationToken>>,
    events: broadcast::Sender<MixerEvent>,
}

impl Mixer {
    #[must_use]
    pub fn new(backend: Arc<dyn HidBackend>, config: MixerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            config,
            link: Arc::new(Link::new()),
            state: Mutex::new(SessionState::Disconnected),
            tasks: TaskQueue::new(),
            heartbeat: Mutex::new(None),
            pulse: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MixerEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state() == SessionState::Locked
    }

    /// Open the first matching device and start listening for reports.
    ///
    /// Calling this on a connected session does nothing.
    ///
    /// # Errors
    /// Returns [`HidError::DeviceNotFound`] if no device matches, or the
    /// backend's error if enumeration or opening fails.
    pub fn connect(&self) -> HidResult<()> {
        let mut state = self.state.lock();
        if state.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        let devices = self.backend.enumerate(self.config.vendor_id, self.config.product_id)?;
        if devices.len() > 1 {
            warn!(count = devices.len(), "Several mixers found, using the first");
        }
        let device = devices.into_iter().next().ok_or(HidError::DeviceNotFound)?;

        let mut transport = self.backend.open(&device)?;
        let decoder = InboundDecoder::new(self.config.eq_encoding, self.events.clone());
        let faults = self.events.clone();
        transport.subscribe(
            Box::new(move |raw: &[u8]| decoder.handle(raw)),
            Box::new(move |message: String| {
                error!(%message, "HID device error");
                let _ = faults.send(MixerEvent::TransportFault { message });
            }),
        )?;

        self.link.attach(transport);
        *state = SessionState::Connected;
        info!(path = %device.path, "Connected to KX-180");
        Ok(())
    }

    /// Replay the handshake and start the heartbeat.
    ///
    /// A call while another handshake is running is ignored. On a locked
    /// session the handshake runs again.
    ///
    /// # Errors
    /// Returns [`HidError::NotConnected`] without a transport, or
    /// [`HidError::HandshakeAborted`] if the session was closed mid-replay.
    pub async fn initialize(&self) -> HidResult<()> {
        match self.begin_handshake() {
            Ok(()) => {}
            Err(HidError::HandshakeInProgress) => {
                warn!("{}, ignoring", HidError::HandshakeInProgress);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        let _reset = HandshakeGuard { state: &self.state };

        self.stop_heartbeat();
        info!(
            frames = self.config.handshake.len(),
            settle_ms = self.config.handshake.settle().as_millis(),
            total_ms = self.config.handshake.duration().as_millis(),
            "Initializing hardware control lock"
        );

        let replayed = self.tasks.run(handshake::replay(&self.config.handshake, &self.link)).await;
        if replayed.is_none() {
            warn!("Handshake aborted");
            return Err(HidError::HandshakeAborted);
        }
        self.commit_lock()
    }

    /// Move from `Initializing` to `Locked`. The heartbeat and the event go
    /// out under the state lock, so a concurrent `close` either cancels the
    /// heartbeat or finds nothing to lock.
    fn commit_lock(&self) -> HidResult<()> {
        let mut state = self.state.lock();
        if *state != SessionState::Initializing {
            warn!(state = ?*state, "Handshake aborted");
            return Err(HidError::HandshakeAborted);
        }
        *state = SessionState::Locked;
        self.start_heartbeat();
        let _ = self.events.send(MixerEvent::Locked);
        info!("Hardware lock established");
        Ok(())
    }

    fn begin_handshake(&self) -> HidResult<()> {
        let mut state = self.state.lock();
        match *state {
            SessionState::Disconnected => Err(HidError::NotConnected),
            SessionState::Initializing => Err(HidError::HandshakeInProgress),
            SessionState::Connected | SessionState::Locked => {
                *state = SessionState::Initializing;
                Ok(())
            }
        }
    }

    /// Cancel every queued send, release the transport and forget the lock.
    /// Safe to call repeatedly.
    pub fn close(&self) {
        let mut state = self.state.lock();
        *state = SessionState::Disconnected;
        self.tasks.drain();
        self.heartbeat.lock().take();
        self.pulse.lock().take();

        let released = self.link.release();
        drop(state);

        if released {
            info!("KX-180 released");
            let _ = self.events.send(MixerEvent::Released);
        } else {
            debug!("Close on a session without a transport");
        }
    }

    /// Write a parameter.
    ///
    /// Writes on an unlocked session are sent anyway; the device may ignore
    /// them. Transport failures are logged and not returned.
    ///
    /// # Errors
    /// Returns a parameter error for an invalid band or a value of the wrong
    /// kind, or [`HidError::NotConnected`] without a transport.
    pub fn set_parameter(&self, parameter: Parameter, value: Value) -> HidResult<()> {
        parameter.validate()?;
        let raw = parameter.encode(value, self.config.eq_encoding)?;
        let state = self.connected_state()?;
        if *state != SessionState::Locked {
            warn!(%parameter, "Writing without the hardware lock, the panel may ignore it");
        }

        let frame = codec::encode_register(parameter.register(), raw);
        if parameter.needs_ping_bracket() {
            self.link.send_ping();
            self.link.send(&frame);
            let link = Arc::clone(&self.link);
            self.tasks.spawn("bracket-ping", async move {
                tokio::time::sleep(BRACKET_PING_DELAY).await;
                link.send_ping();
            });
        } else {
            self.link.send(&frame);
        }

        debug!(%parameter, %value, raw, "Parameter written");
        Ok(())
    }

    /// Set a music EQ band back to flat.
    ///
    /// # Errors
    /// Returns [`kxlink_core::Error::InvalidBand`] for bands outside 0-14, or
    /// [`HidError::NotConnected`] without a transport.
    pub fn bypass_music_eq(&self, band: u8) -> HidResult<()> {
        Parameter::MusicEq(band).validate()?;
        self.ensure_connected()?;
        self.link.send(&codec::encode_precision(Bank::MusicEq, band, FLAT_CODE));
        debug!(band, "Music EQ band bypassed");
        Ok(())
    }

    /// Send a keep-alive ping with the next sequence number.
    ///
    /// # Errors
    /// Returns [`HidError::NotConnected`] without a transport.
    pub fn send_ping(&self) -> HidResult<()> {
        self.ensure_connected()?;
        self.link.send_ping();
        Ok(())
    }

    /// Ask the device to report its state.
    ///
    /// # Errors
    /// Returns [`HidError::NotConnected`] without a transport.
    pub fn send_sync_request(&self) -> HidResult<()> {
        self.ensure_connected()?;
        self.link.send(&SYNC_REQUEST);
        Ok(())
    }

    /// Schedule a preset recall. Returns the resolved opcodes.
    ///
    /// # Errors
    /// Returns [`HidError::NotConnected`] without a transport.
    pub fn recall_preset(&self, index: usize) -> HidResult<PresetSelector> {
        let state = self.connected_state()?;
        if *state != SessionState::Locked {
            warn!(index, "Recalling without the hardware lock");
        }

        let plan = RecallPlan::new(index);
        let preset = plan.preset;
        info!(
            index,
            label = preset.label().unwrap_or("P01"),
            factory = preset.is_factory(),
            selector = format!("{:#04x}", preset.selector),
            pulse = format!("{:#04x}", preset.pulse),
            duration_ms = plan.duration().as_millis(),
            "Recalling preset"
        );
        self.tasks.spawn("recall", recall::play(plan, Arc::clone(&self.link)));
        Ok(preset)
    }

    /// Start alternating the master music level as an audible line check.
    /// Does nothing if already running.
    ///
    /// # Errors
    /// Returns [`HidError::NotConnected`] without a transport.
    pub fn start_diagnostic_pulse(&self) -> HidResult<()> {
        let _state = self.connected_state()?;
        let mut pulse = self.pulse.lock();
        if pulse.is_some() {
            debug!("Diagnostic pulse already running");
            return Ok(());
        }
        *pulse = Some(self.tasks.spawn("diagnostic-pulse", diagnostic::run(Arc::clone(&self.link))));
        info!("Diagnostic pulse started");
        Ok(())
    }

    pub fn stop_diagnostic_pulse(&self) {
        if let Some(token) = self.pulse.lock().take() {
            token.cancel();
            info!("Diagnostic pulse stopped");
        }
    }

    fn ensure_connected(&self) -> HidResult<()> {
        self.connected_state().map(drop)
    }

    /// Hold the state lock while scheduling work, so `close` cannot drain
    /// the queue between the connection check and the spawn.
    fn connected_state(&self) -> HidResult<MutexGuard<'_, SessionState>> {
        let state = self.state.lock();
        if state.is_connected() && self.link.is_attached() { Ok(state) } else { Err(HidError::NotConnected) }
    }

    fn start_heartbeat(&self) {
        let token = self.tasks.spawn("heartbeat", heartbeat::run(Arc::clone(&self.link)));
        if let Some(previous) = self.heartbeat.lock().replace(token) {
            previous.cancel();
        }
        debug!(period_ms = heartbeat::HEARTBEAT_PERIOD.as_millis(), "Heartbeat started");
    }

    fn stop_heartbeat(&self) {
        if let Some(token) = self.heartbeat.lock().take() {
            token.cancel();
            debug!("Heartbeat stopped");
        }
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Puts an unfinished handshake back to `Connected` if `initialize` is
/// dropped or fails.
struct HandshakeGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for HandshakeGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if *state == SessionState::Initializing {
            *state = SessionState::Connected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Frame, HEARTBEAT};
    use crate::testing::{self, Wire};
    use crate::transport::MockHidBackend;
    use assert_matches::assert_matches;
    use kxlink_core::{Mic, ParameterChanged};
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::{Instant, sleep};

    fn script() -> HandshakeScript {
        HandshakeScript::from_json(r#"["0101aa", "0101bb", "0101cc"]"#, handshake::REFINED_SETTLE).unwrap()
    }

    fn mixer(wire: &Wire) -> Arc<Mixer> {
        Arc::new(Mixer::new(Arc::new(testing::backend(wire)), MixerConfig::new(script())))
    }

    fn connected(wire: &Wire) -> Arc<Mixer> {
        let mixer = mixer(wire);
        mixer.connect().unwrap();
        mixer
    }

    #[test]
    fn test_connect_without_device() {
        let mut backend = MockHidBackend::new();
        backend.expect_enumerate().returning(|_, _| Ok(vec![]));
        backend.expect_open().never();
        let mixer = Mixer::new(Arc::new(backend), MixerConfig::new(script()));

        assert_matches!(mixer.connect(), Err(HidError::DeviceNotFound));
        assert_eq!(mixer.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_connect_uses_first_match() {
        let wire = Wire::new();
        let mut backend = MockHidBackend::new();
        backend
            .expect_enumerate()
            .withf(|vid, pid| *vid == 0x1210 && *pid == 0x0042)
            .returning(|_, _| Ok(vec![testing::device("/dev/hidraw1"), testing::device("/dev/hidraw2")]));
        let transport_wire = wire.clone();
        backend
            .expect_open()
            .withf(|device| device.path == "/dev/hidraw1")
            .times(1)
            .returning(move |_| Ok(transport_wire.transport()));
        let mixer = Mixer::new(Arc::new(backend), MixerConfig::new(script()));

        mixer.connect().unwrap();
        assert_eq!(mixer.state(), SessionState::Connected);
        assert!(wire.is_subscribed());

        // A second connect keeps the open session
        mixer.connect().unwrap();
        assert_eq!(mixer.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_initialize_requires_connection() {
        let wire = Wire::new();
        let mixer = mixer(&wire);
        assert_matches!(mixer.initialize().await, Err(HidError::NotConnected));
        assert_matches!(mixer.set_parameter(Parameter::MasterMusic, Value::Level(1)), Err(HidError::NotConnected));
        assert_matches!(mixer.recall_preset(0), Err(HidError::NotConnected));
        assert_matches!(mixer.send_ping(), Err(HidError::NotConnected));
        assert!(wire.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_replays_script_then_locks() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        let mut events = mixer.subscribe();

        let start = Instant::now();
        mixer.initialize().await.unwrap();

        assert_eq!(wire.frames(), script().frames());
        let offsets: Vec<_> = wire.timeline(start).iter().map(|(at, _)| at.as_millis()).collect();
        assert_eq!(offsets, vec![0, 20, 40]);
        assert_eq!(mixer.state(), SessionState::Locked);
        assert_eq!(events.try_recv().unwrap(), MixerEvent::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_follows_lock() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        mixer.initialize().await.unwrap();
        wire.clear();

        sleep(Duration::from_millis(2150)).await;
        let frames = wire.frames();
        assert_eq!(frames.iter().filter(|f| **f == HEARTBEAT).count(), 7);
        assert_eq!(frames.iter().filter(|f| **f == SYNC_REQUEST).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_initialize_is_ignored() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        let first = tokio::spawn({
            let mixer = Arc::clone(&mixer);
            async move { mixer.initialize().await }
        });
        while mixer.state() != SessionState::Initializing {
            tokio::task::yield_now().await;
        }

        mixer.initialize().await.unwrap();
        first.await.unwrap().unwrap();

        assert_eq!(wire.frames().len(), script().len());
        assert!(mixer.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinitialize_when_locked_reruns_handshake() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        mixer.initialize().await.unwrap();
        mixer.initialize().await.unwrap();

        assert_eq!(wire.frames().len(), 2 * script().len());
        assert!(mixer.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_handshake_aborts() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        let pending = tokio::spawn({
            let mixer = Arc::clone(&mixer);
            async move { mixer.initialize().await }
        });
        sleep(Duration::from_millis(25)).await;
        mixer.close();

        assert_matches!(pending.await.unwrap(), Err(HidError::HandshakeAborted));
        assert_eq!(mixer.state(), SessionState::Disconnected);
        let written = wire.frames().len();
        assert_eq!(written, 2);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(wire.frames().len(), written);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_before_lock_commit_starts_no_heartbeat() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        let mut events = mixer.subscribe();

        // The replay has finished but the session is closed before the lock is taken
        mixer.begin_handshake().unwrap();
        mixer.close();
        assert_matches!(mixer.commit_lock(), Err(HidError::HandshakeAborted));
        assert_eq!(mixer.state(), SessionState::Disconnected);

        mixer.connect().unwrap();
        wire.clear();
        sleep(Duration::from_millis(650)).await;

        assert_eq!(mixer.state(), SessionState::Connected);
        assert!(wire.frames().is_empty());
        assert_eq!(events.try_recv().unwrap(), MixerEvent::Released);
        assert_matches!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_initialize_can_be_retried() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        let abandoned = tokio::time::timeout(Duration::from_millis(25), mixer.initialize()).await;
        assert!(abandoned.is_err());
        assert_eq!(mixer.state(), SessionState::Connected);
        assert_eq!(wire.frames().len(), 2);

        wire.clear();
        mixer.initialize().await.unwrap();
        assert!(mixer.is_locked());
        assert_eq!(wire.frames(), script().frames());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduling_after_close_is_refused() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        mixer.close();

        assert_matches!(mixer.recall_preset(2), Err(HidError::NotConnected));
        assert_matches!(mixer.start_diagnostic_pulse(), Err(HidError::NotConnected));
        assert_matches!(
            mixer.set_parameter(Parameter::MicFbx(Mic::Two), Value::Select(1)),
            Err(HidError::NotConnected)
        );

        sleep(Duration::from_secs(2)).await;
        assert!(wire.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        mixer.initialize().await.unwrap();
        let mut events = mixer.subscribe();

        mixer.close();
        mixer.close();

        assert_eq!(wire.closes(), 1);
        assert!(!wire.is_subscribed());
        assert_eq!(mixer.state(), SessionState::Disconnected);
        assert_eq!(events.try_recv().unwrap(), MixerEvent::Released);
        assert_matches!(events.try_recv(), Err(TryRecvError::Empty));

        // Heartbeat is gone with the session
        wire.clear();
        sleep(Duration::from_secs(1)).await;
        assert!(wire.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_recall() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        mixer.recall_preset(1).unwrap();

        sleep(Duration::from_millis(100)).await;
        mixer.close();
        let written = wire.frames().len();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(wire.frames().len(), written);
        assert!(written < 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recall_preset_schedule() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        let start = Instant::now();
        let preset = mixer.recall_preset(0).unwrap();
        assert_eq!((preset.selector, preset.pulse), (0x03, 0x0E));
        sleep(Duration::from_millis(1300)).await;

        let timeline = wire.timeline(start);
        assert_eq!(timeline.len(), 30);
        let at = |i: usize| timeline[i].0.as_millis();
        assert_eq!((at(0), at(1)), (0, 0));
        assert_eq!((at(2), at(12)), (0, 200));
        assert_eq!((at(13), at(23)), (400, 600));
        assert_eq!((at(24), at(28)), (700, 820));
        assert_eq!(at(29), 1200);
        assert_eq!(timeline[24].1.as_bytes()[4], 0x0E);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_parameter_writes_standard_frame() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        mixer.set_parameter(Parameter::SubVolume, Value::Level(75)).unwrap();

        let reports = wire.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].len(), codec::REPORT_LEN);
        assert_eq!(&reports[0][..11], &[0x01, 0x09, 0xFE, 0x00, 0x00, 0x07, 0x03, 0x09, 0x00, 75, 0x5C]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_music_eq_uses_precision_frame() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        mixer.set_parameter(Parameter::MusicEq(5), Value::Gain(12.0)).unwrap();

        assert_eq!(wire.frames(), vec![codec::encode_precision(Bank::MusicEq, 5, 2680)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_writes_are_rejected_before_io() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        assert_matches!(
            mixer.set_parameter(Parameter::MusicEq(15), Value::Gain(0.0)),
            Err(HidError::Parameter(kxlink_core::Error::InvalidBand(15)))
        );
        assert_matches!(
            mixer.set_parameter(Parameter::MuteMic, Value::Level(1)),
            Err(HidError::Parameter(kxlink_core::Error::ValueMismatch { .. }))
        );
        assert_matches!(mixer.bypass_music_eq(20), Err(HidError::Parameter(_)));
        assert!(wire.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fbx_write_is_bracketed_by_pings() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        let start = Instant::now();
        mixer.set_parameter(Parameter::MicFbx(Mic::One), Value::Select(2)).unwrap();
        sleep(Duration::from_millis(60)).await;

        let timeline = wire.timeline(start);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[0].1, codec::encode_ping(0x40));
        assert_eq!(timeline[1].1, codec::encode_standard(Bank::System, 0x0C, 2));
        assert_eq!(timeline[2], (BRACKET_PING_DELAY, codec::encode_ping(0x41)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bypass_and_sync() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        mixer.bypass_music_eq(0).unwrap();
        mixer.send_sync_request().unwrap();
        mixer.send_ping().unwrap();

        let frames = wire.frames();
        assert_eq!(frames[0], codec::encode_precision(Bank::MusicEq, 0, 2560));
        assert_eq!(frames[1], SYNC_REQUEST);
        assert_eq!(frames[2], codec::encode_ping(0x40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failures_do_not_abort_handshake() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        wire.fail_writes(true);

        mixer.initialize().await.unwrap();
        assert!(mixer.is_locked());
        assert_eq!(wire.attempts(), script().len());
        assert!(mixer.set_parameter(Parameter::MasterMic, Value::Level(3)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_reports_become_events() {
        let wire = Wire::new();
        let mixer = connected(&wire);
        let mut events = mixer.subscribe();

        wire.inject(&[0x01, 0x09, 0xFE, 0x00, 0x00]);
        assert_matches!(events.try_recv(), Err(TryRecvError::Empty));

        wire.inject(codec::encode_standard(Bank::Center, 0x04, 70).as_bytes());
        assert_eq!(
            events.try_recv().unwrap(),
            MixerEvent::ParameterChanged(ParameterChanged {
                parameter: Parameter::CenterVolume,
                value: Value::Level(70),
                raw: 70,
            })
        );

        wire.fault("device disconnected");
        assert_eq!(
            events.try_recv().unwrap(),
            MixerEvent::TransportFault { message: "device disconnected".to_string() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_diagnostic_pulse_start_stop() {
        let wire = Wire::new();
        let mixer = connected(&wire);

        mixer.start_diagnostic_pulse().unwrap();
        mixer.start_diagnostic_pulse().unwrap();
        sleep(Duration::from_millis(3100)).await;
        mixer.stop_diagnostic_pulse();
        sleep(Duration::from_secs(3)).await;

        let levels: Vec<u8> = wire.frames().iter().map(|f: &Frame| f.as_bytes()[9]).collect();
        assert_eq!(levels, vec![10, 50]);
    }
}
