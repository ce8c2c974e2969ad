//! Standard MIDI File parsing into a flat, time-ordered event list.
//!
//! Supports SMF Format 0 (single track) and Format 1 (multi-track) files with
//! metrical or SMPTE timing. Tempo changes from every track feed one tempo map.
//! Only channel voice messages are kept; SysEx and meta events other than tempo
//! are dropped after they have contributed to timing.

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Tempo assumed until the first Set Tempo event (120 BPM).
pub const DEFAULT_TEMPO_US: u32 = 500_000;

/// Errors that can occur while reading a MIDI file.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("could not read MIDI file: {0}")]
    Io(#[from] std::io::Error),
    /// Chunk framing is broken (bad magic, truncated chunk, missing tracks).
    #[error("malformed MIDI file: {0}")]
    Framing(String),
    #[error("MIDI parse error: {0}")]
    Parse(String),
    #[error("unsupported MIDI file: {0}")]
    Unsupported(String),
}

/// A channel voice message scheduled at an absolute time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelEvent {
    /// Seconds from the start of the sequence.
    pub time: f64,
    pub channel: u8,
    /// Status high nibble (0x80..=0xE0).
    pub command: u8,
    pub data1: u8,
    pub data2: u8,
}

impl ChannelEvent {
    /// True for note on/off and polyphonic aftertouch.
    pub fn is_note(&self) -> bool {
        matches!(self.command, 0x80 | 0x90 | 0xA0)
    }
}

/// A parsed MIDI file ready for playback.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    events: Vec<ChannelEvent>,
    duration: f64,
}

impl Sequence {
    /// Reads and parses a MIDI file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SequenceError> {
        let data = fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    /// Parses SMF bytes.
    ///
    /// The chunk structure is checked before midly sees the data, so truncated
    /// or mislabelled files are rejected instead of being read leniently.
    /// A track whose length stops one byte into its End of Track is accepted.
    pub fn parse(data: &[u8]) -> Result<Self, SequenceError> {
        let data = frame(data)?;

        let smf = Smf::parse(&data).map_err(|e| SequenceError::Parse(e.to_string()))?;

        if smf.header.format == Format::Sequential {
            return Err(SequenceError::Unsupported(
                "Format 2 (sequential) MIDI files not supported".to_string(),
            ));
        }

        // First pass: absolute ticks per event, collecting tempo changes
        let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
        let mut raw: Vec<(u64, usize, usize, u8, u8, u8, u8)> = Vec::new();
        let mut last_tick: u64 = 0;

        for (track_idx, track) in smf.tracks.iter().enumerate() {
            let mut tick: u64 = 0;
            let mut saw_end = false;

            for (event_idx, event) in track.iter().enumerate() {
                tick += u64::from(event.delta.as_int());
                match event.kind {
                    TrackEventKind::Meta(MetaMessage::Tempo(t)) => {
                        let us = t.as_int();
                        if us > 0 {
                            tempo_changes.push((tick, us));
                        }
                    }
                    TrackEventKind::Meta(MetaMessage::EndOfTrack) => saw_end = true,
                    TrackEventKind::Midi { channel, message } => {
                        let (command, data1, data2) = encode_message(message);
                        raw.push((
                            tick,
                            track_idx,
                            event_idx,
                            channel.as_int(),
                            command,
                            data1,
                            data2,
                        ));
                    }
                    _ => {}
                }
            }

            if !saw_end {
                return Err(SequenceError::Framing(format!(
                    "track {} has no End of Track event",
                    track_idx
                )));
            }
            last_tick = last_tick.max(tick);
        }

        let tempo_map = TempoMap::new(smf.header.timing, tempo_changes)?;

        // Events at the same tick keep file order: track first, then position
        raw.sort_by_key(|&(tick, track, idx, ..)| (tick, track, idx));

        let events = raw
            .into_iter()
            .map(|(tick, _, _, channel, command, data1, data2)| ChannelEvent {
                time: tempo_map.seconds_at(tick),
                channel,
                command,
                data1,
                data2,
            })
            .collect();

        Ok(Self {
            events,
            duration: tempo_map.seconds_at(last_tick),
        })
    }

    /// All channel events in playback order.
    pub fn events(&self) -> &[ChannelEvent] {
        &self.events
    }

    /// Length in seconds, up to the last End of Track.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Index of the first event at or after `time`.
    pub fn first_index_at(&self, time: f64) -> usize {
        self.events.partition_point(|e| e.time < time)
    }
}

/// Converts a midly message into (status nibble, data1, data2).
fn encode_message(message: MidiMessage) -> (u8, u8, u8) {
    match message {
        MidiMessage::NoteOff { key, vel } => (0x80, key.as_int(), vel.as_int()),
        MidiMessage::NoteOn { key, vel } => (0x90, key.as_int(), vel.as_int()),
        MidiMessage::Aftertouch { key, vel } => (0xA0, key.as_int(), vel.as_int()),
        MidiMessage::Controller { controller, value } => {
            (0xB0, controller.as_int(), value.as_int())
        }
        MidiMessage::ProgramChange { program } => (0xC0, program.as_int(), 0),
        MidiMessage::ChannelAftertouch { vel } => (0xD0, vel.as_int(), 0),
        MidiMessage::PitchBend { bend } => {
            let value = bend.0.as_int();
            (0xE0, (value & 0x7F) as u8, (value >> 7) as u8)
        }
    }
}

/// End of Track meta event, status through length byte.
const END_OF_TRACK: [u8; 3] = [0xFF, 0x2F, 0x00];

/// Walks the chunk headers, making sure every declared chunk fits in the data.
///
/// Two slips common in hand-built files are repaired rather than rejected:
/// a track length one byte short, so that the `00` closing the End of Track
/// lies just past the chunk, and stray bytes after the last declared track.
/// The repaired bytes are returned for midly to parse.
fn frame(data: &[u8]) -> Result<Cow<'_, [u8]>, SequenceError> {
    if data.len() < 14 || &data[0..4] != b"MThd" {
        return Err(SequenceError::Framing("missing MThd header".to_string()));
    }
    let header_len = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
    if header_len < 6 || 8 + header_len > data.len() {
        return Err(SequenceError::Framing("header chunk truncated".to_string()));
    }
    let declared_tracks = u16::from_be_bytes([data[10], data[11]]) as usize;

    let mut offset = 8 + header_len;
    let mut tracks = 0;
    // Offsets of length fields that need one more byte
    let mut short_tracks: Vec<usize> = Vec::new();

    while offset < data.len() {
        if offset + 8 > data.len() {
            if tracks >= declared_tracks {
                debug!(offset, "ignoring trailing bytes after last track");
                break;
            }
            return Err(SequenceError::Framing(format!(
                "truncated chunk header at byte {}",
                offset
            )));
        }
        let id = &data[offset..offset + 4];
        let len = u32::from_be_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        let mut end = offset + 8 + len;
        if end > data.len() {
            return Err(SequenceError::Framing(format!(
                "chunk at byte {} declares {} bytes but only {} remain",
                offset,
                len,
                data.len() - offset - 8
            )));
        }
        if id == b"MTrk" {
            let body = &data[offset + 8..end];
            if body.ends_with(&END_OF_TRACK[..2]) {
                if data.get(end) != Some(&0x00) {
                    return Err(SequenceError::Framing(format!(
                        "End of Track cut short in chunk at byte {}",
                        offset
                    )));
                }
                short_tracks.push(offset + 4);
                end += 1;
            }
            tracks += 1;
        }
        offset = end;
    }

    if tracks < declared_tracks {
        return Err(SequenceError::Framing(format!(
            "header declares {} tracks but {} found",
            declared_tracks, tracks
        )));
    }

    let used = offset.min(data.len());
    if short_tracks.is_empty() && used == data.len() {
        return Ok(Cow::Borrowed(data));
    }

    let mut repaired = data[..used].to_vec();
    for at in short_tracks {
        let len = u32::from_be_bytes([
            repaired[at],
            repaired[at + 1],
            repaired[at + 2],
            repaired[at + 3],
        ]) + 1;
        repaired[at..at + 4].copy_from_slice(&len.to_be_bytes());
    }
    Ok(Cow::Owned(repaired))
}

/// Maps absolute ticks to seconds.
enum TempoMap {
    Metrical {
        ticks_per_beat: f64,
        /// (tick, seconds at tick, microseconds per beat from this tick on)
        segments: Vec<(u64, f64, u32)>,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl TempoMap {
    fn new(timing: Timing, mut changes: Vec<(u64, u32)>) -> Result<Self, SequenceError> {
        match timing {
            Timing::Metrical(tpb) => {
                let ticks_per_beat = f64::from(tpb.as_int());
                if ticks_per_beat == 0.0 {
                    return Err(SequenceError::Unsupported(
                        "zero ticks per quarter note".to_string(),
                    ));
                }

                changes.sort_by_key(|&(tick, _)| tick);

                let mut segments = vec![(0u64, 0.0f64, DEFAULT_TEMPO_US)];
                for (tick, us) in changes {
                    let &(seg_tick, seg_secs, seg_us) = segments.last().unwrap_or(&(0, 0.0, 0));
                    let secs = seg_secs
                        + (tick - seg_tick) as f64 * f64::from(seg_us) / 1_000_000.0
                            / ticks_per_beat;
                    if tick == seg_tick {
                        // Later change at the same tick wins
                        if let Some(last) = segments.last_mut() {
                            last.2 = us;
                        }
                    } else {
                        segments.push((tick, secs, us));
                    }
                }

                Ok(TempoMap::Metrical {
                    ticks_per_beat,
                    segments,
                })
            }
            Timing::Timecode(fps, subframes) => {
                let ticks_per_second = f64::from(fps.as_f32()) * f64::from(subframes);
                if ticks_per_second <= 0.0 {
                    return Err(SequenceError::Unsupported(
                        "zero SMPTE subframe resolution".to_string(),
                    ));
                }
                Ok(TempoMap::Timecode { ticks_per_second })
            }
        }
    }

    fn seconds_at(&self, tick: u64) -> f64 {
        match self {
            TempoMap::Metrical {
                ticks_per_beat,
                segments,
            } => {
                let idx = segments.partition_point(|&(t, _, _)| t <= tick).max(1) - 1;
                let (seg_tick, seg_secs, us) = segments[idx];
                seg_secs + (tick - seg_tick) as f64 * f64::from(us) / 1_000_000.0 / ticks_per_beat
            }
            TempoMap::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::smf::{write_smf, TrackEvent, PROBE_PAYLOAD};

    fn note(delta: u32, on: bool, key: u8) -> (u32, TrackEvent) {
        let event = if on {
            TrackEvent::NoteOn {
                channel: 0,
                key,
                velocity: 100,
            }
        } else {
            TrackEvent::NoteOff {
                channel: 0,
                key,
                velocity: 0,
            }
        };
        (delta, event)
    }

    #[test]
    fn test_probe_payload_parses() {
        let seq = Sequence::parse(&PROBE_PAYLOAD).unwrap();
        assert_eq!(seq.events().len(), 2);
        assert_eq!(seq.events()[0].command, 0x90);
        assert_eq!(seq.events()[0].data1, 60);
        assert_eq!(seq.events()[1].command, 0x80);
        // 96 ticks at 96 tpq and 120 BPM is half a second
        assert!((seq.events()[1].time - 0.5).abs() < 1e-9);
        assert!((seq.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        for len in [0, 10, 14, 21, 25, 30, 33] {
            let result = Sequence::parse(&PROBE_PAYLOAD[..len]);
            assert!(result.is_err(), "accepted {} bytes", len);
        }
    }

    #[test]
    fn test_short_track_length_is_repaired() {
        // Declared length stops before the End of Track's own length byte
        assert_eq!(PROBE_PAYLOAD[21], 0x0B);
        let repaired = frame(&PROBE_PAYLOAD).unwrap();
        assert_eq!(repaired.len(), PROBE_PAYLOAD.len());
        assert_eq!(repaired[21], 0x0C);
    }

    #[test]
    fn test_well_formed_file_is_not_copied() {
        let bytes = write_smf(96, &[vec![note(0, true, 60), (96, TrackEvent::EndOfTrack)]]);
        assert!(matches!(frame(&bytes).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_trailing_bytes_after_last_track_are_ignored() {
        let mut bytes = write_smf(96, &[vec![note(0, true, 60), (96, TrackEvent::EndOfTrack)]]);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00]);
        let seq = Sequence::parse(&bytes).unwrap();
        assert_eq!(seq.events().len(), 1);
        assert!((seq.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_track_cut_short_is_rejected() {
        let bytes = &PROBE_PAYLOAD[..PROBE_PAYLOAD.len() - 1];
        assert!(matches!(
            Sequence::parse(bytes),
            Err(SequenceError::Framing(ref m)) if m.contains("cut short")
        ));
    }

    #[test]
    fn test_corrupted_magic_is_rejected() {
        let mut bytes = PROBE_PAYLOAD;
        bytes[0] = b'X';
        assert!(matches!(
            Sequence::parse(&bytes),
            Err(SequenceError::Framing(_))
        ));
    }

    #[test]
    fn test_missing_end_of_track_is_rejected() {
        let bytes = write_smf(96, &[vec![note(0, true, 60), note(96, false, 60)]]);
        assert!(Sequence::parse(&bytes).is_err());
    }

    #[test]
    fn test_tempo_change_affects_timing() {
        // Quarter at 120 BPM (0.5 s), then tempo halves to 60 BPM (1 s per quarter)
        let bytes = write_smf(
            480,
            &[
                vec![
                    (0, TrackEvent::Tempo(500_000)),
                    (480, TrackEvent::Tempo(1_000_000)),
                    (0, TrackEvent::EndOfTrack),
                ],
                vec![
                    note(0, true, 60),
                    note(960, false, 60),
                    (0, TrackEvent::EndOfTrack),
                ],
            ],
        );
        let seq = Sequence::parse(&bytes).unwrap();
        assert_eq!(seq.events().len(), 2);
        assert!((seq.events()[1].time - 1.5).abs() < 1e-9);
        assert!((seq.duration() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_events_are_merged_across_tracks() {
        let bytes = write_smf(
            96,
            &[
                vec![note(48, true, 64), note(48, false, 64), (0, TrackEvent::EndOfTrack)],
                vec![
                    (0, TrackEvent::ProgramChange { channel: 0, program: 5 }),
                    note(0, true, 60),
                    note(192, false, 60),
                    (0, TrackEvent::EndOfTrack),
                ],
            ],
        );
        let seq = Sequence::parse(&bytes).unwrap();
        let times: Vec<f64> = seq.events().iter().map(|e| e.time).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seq.events()[0].command, 0xC0);
        assert!((seq.duration() - 1.0).abs() < 1e-9);
        assert_eq!(seq.first_index_at(0.25), 2);
    }
}
