//! Handshake scripts.
//!
//! The mixer hands control to the host only after it has seen the exact
//! frame sequence the vendor tool sends at startup. A script is that
//! captured sequence plus the pause to leave after each frame.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use crate::codec::{FRAME_LEN, Frame};
use crate::error::{HidError, HidResult};
use crate::link::Link;

/// Pause after each frame of a full capture replay.
pub const REFINED_SETTLE: Duration = Duration::from_millis(20);
/// Pause after each frame of the short legacy sequence.
pub const LEGACY_SETTLE: Duration = Duration::from_millis(200);

const LEGACY_FRAMES: &str = include_str!("../data/legacy_handshake.json");

/// An ordered list of frames replayed to acquire the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeScript {
    frames: Vec<Frame>,
    settle: Duration,
}

impl HandshakeScript {
    #[must_use]
    pub fn new(frames: Vec<Frame>, settle: Duration) -> Self {
        Self { frames, settle }
    }

    /// The built-in six-frame sequence of the first driver generation.
    ///
    /// # Errors
    /// Returns an error if the bundled capture is malformed.
    pub fn legacy() -> HidResult<Self> {
        Self::from_json(LEGACY_FRAMES, LEGACY_SETTLE)
    }

    /// Parse a JSON array of hex strings. Whitespace inside a string is
    /// ignored and frames shorter than 64 bytes are zero-padded.
    ///
    /// # Errors
    /// Returns an error if the text is not an array of hex strings, if a
    /// frame is longer than 64 bytes, or if the script is empty.
    pub fn from_json(text: &str, settle: Duration) -> HidResult<Self> {
        let lines: Vec<String> =
            serde_json::from_str(text).map_err(|e| HidError::Script(format!("not a JSON array of strings: {e}")))?;

        let frames = lines
            .iter()
            .enumerate()
            .map(|(i, line)| parse_frame(line).map_err(|reason| HidError::Script(format!("frame {i}: {reason}"))))
            .collect::<HidResult<Vec<_>>>()?;

        if frames.is_empty() {
            return Err(HidError::Script("script has no frames".to_string()));
        }

        debug!(frames = frames.len(), settle_ms = settle.as_millis(), "Handshake script parsed");
        Ok(Self { frames, settle })
    }

    /// Load a captured script from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path, settle: Duration) -> HidResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let script = Self::from_json(&text, settle)?;
        info!(path = %path.display(), frames = script.len(), "Loaded handshake script");
        Ok(script)
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn settle(&self) -> Duration {
        self.settle
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total time a replay takes.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.settle * u32::try_from(self.frames.len()).unwrap_or(u32::MAX)
    }
}

fn parse_frame(line: &str) -> Result<Frame, String> {
    let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(digits).map_err(|e| e.to_string())?;
    if bytes.len() > FRAME_LEN {
        return Err(format!("{} bytes, longer than a frame", bytes.len()));
    }
    Ok(Frame::from_slice(&bytes))
}

/// Write every frame in order, pausing `settle` after each.
pub(crate) async fn replay(script: &HandshakeScript, link: &Link) {
    let total = script.len();
    for (i, frame) in script.frames.iter().enumerate() {
        link.send(frame);
        tokio::time::sleep(script.settle).await;
        if (i + 1).is_multiple_of(50) {
            debug!(sent = i + 1, total, "Handshake progress");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Wire;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_legacy_script() {
        let script = HandshakeScript::legacy().unwrap();
        assert_eq!(script.len(), 6);
        assert_eq!(script.settle(), LEGACY_SETTLE);

        let frames = script.frames();
        assert_eq!(&frames[0].as_bytes()[..3], &[0x01, 0x01, 0x00]);
        assert_eq!(&frames[1].as_bytes()[..4], &[0x01, 0x01, 0x01, 0xFF]);
        assert_eq!(frames[1].as_bytes()[62], 0xA2);
        assert_eq!(frames[2].as_bytes()[62], 0xE0);
        assert_eq!(frames[1], frames[3]);
        // Short captures keep their footer where it was captured
        assert_eq!(&frames[4].as_bytes()[..17], &[
            0x01, 0x0F, 0xFE, 0xFA, 0x23, 0x23, 0x23, 0x0F, 0x4A, 0x42, 0x4C, 0x5F, 0x43, 0x54, 0x52, 0x4C,
            0xDC
        ]);
        assert_eq!(frames[4].as_bytes()[57], 0xA2);
        assert_eq!(frames[5].as_bytes()[10], 0xBF);
        assert_eq!(frames[5].as_bytes()[59], 0xA2);
        assert_eq!(script.duration(), Duration::from_millis(1200));
    }

    #[test]
    fn test_from_json_pads_short_frames() {
        let script = HandshakeScript::from_json(r#"["01 02", "ff"]"#, REFINED_SETTLE).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(&script.frames()[0].as_bytes()[..3], &[0x01, 0x02, 0x00]);
        assert!(script.frames()[1].as_bytes()[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert_matches!(HandshakeScript::from_json("{}", REFINED_SETTLE), Err(HidError::Script(_)));
        assert_matches!(HandshakeScript::from_json("[]", REFINED_SETTLE), Err(HidError::Script(_)));
        assert_matches!(HandshakeScript::from_json(r#"["zz"]"#, REFINED_SETTLE), Err(HidError::Script(m)) if m.starts_with("frame 0"));

        let long = format!("[\"{}\"]", "00".repeat(65));
        assert_matches!(HandshakeScript::from_json(&long, REFINED_SETTLE), Err(HidError::Script(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"["0101ff", "0109fe"]"#).unwrap();

        let script = HandshakeScript::load(file.path(), REFINED_SETTLE).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script.settle(), REFINED_SETTLE);
    }

    #[test]
    fn test_load_missing_file() {
        let result = HandshakeScript::load(Path::new("/nonexistent/handshake.json"), REFINED_SETTLE);
        assert_matches!(result, Err(HidError::IoError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_preserves_order_and_spacing() {
        let wire = Wire::new();
        let link = Link::new();
        link.attach(wire.transport());
        let script = HandshakeScript::from_json(r#"["0101", "0102", "0103"]"#, REFINED_SETTLE).unwrap();

        let start = tokio::time::Instant::now();
        replay(&script, &link).await;

        let timeline = wire.timeline(start);
        let offsets: Vec<_> = timeline.iter().map(|(at, _)| at.as_millis()).collect();
        assert_eq!(offsets, vec![0, 20, 40]);
        let frames: Vec<_> = timeline.iter().map(|(_, f)| *f).collect();
        assert_eq!(frames, script.frames());
        assert_eq!(start.elapsed(), Duration::from_millis(60));
    }
}
