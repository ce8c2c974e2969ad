//! Minimal Standard MIDI File (SMF) writer and the soundbank self-test payload.
//!
//! The writer only knows about chunks, variable-length delta times and the
//! handful of events needed to build small test sequences. Anything richer is
//! out of scope: files are read with midly, never re-encoded.

/// The soundbank liveness probe: a Format 0, single-track SMF at 96 ticks per
/// quarter note playing middle C for one quarter note.
///
/// Fed to the player factory as-is. A successful construction against a
/// soundbank means the soundbank is usable.
///
/// The track length field reads 11 although 12 event bytes follow: the
/// declared chunk ends just before the End of Track's length byte. The
/// sequence parser repairs this, and the bytes are kept exactly as deployed.
pub const PROBE_PAYLOAD: [u8; 34] = [
    0x4D, 0x54, 0x68, 0x64, // "MThd"
    0x00, 0x00, 0x00, 0x06, // Header length
    0x00, 0x00, // Format 0
    0x00, 0x01, // One track
    0x00, 0x60, // 96 ticks per quarter note
    0x4D, 0x54, 0x72, 0x6B, // "MTrk"
    0x00, 0x00, 0x00, 0x0B, // Track length (one short, see above)
    0x00, 0x90, 0x3C, 0x40, // Note on: middle C, velocity 64
    0x60, 0x80, 0x3C, 0x40, // Note off after 96 ticks
    0x00, 0xFF, 0x2F, 0x00, // End of track
];

/// Ticks per quarter note used by the probe payload.
pub const PROBE_DIVISION: u16 = 96;

/// Middle C.
pub const PROBE_NOTE: u8 = 60;

/// Writes a variable-length quantity (VLQ) used for delta times in MIDI.
///
/// VLQ encodes values using 7 bits per byte, with the MSB indicating
/// whether more bytes follow (1 = more bytes, 0 = last byte).
pub fn write_vlq(value: u32, buffer: &mut Vec<u8>) {
    if value == 0 {
        buffer.push(0);
        return;
    }

    let mut temp = value & 0x0FFF_FFFF;
    let mut bytes = Vec::with_capacity(4);

    while temp > 0 {
        bytes.push((temp & 0x7F) as u8);
        temp >>= 7;
    }

    for (i, &byte) in bytes.iter().rev().enumerate() {
        if i < bytes.len() - 1 {
            buffer.push(byte | 0x80);
        } else {
            buffer.push(byte);
        }
    }
}

/// Track events the writer can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Set tempo in microseconds per quarter note.
    Tempo(u32),
    EndOfTrack,
}

impl TrackEvent {
    fn encode(&self, buffer: &mut Vec<u8>) {
        match *self {
            TrackEvent::NoteOn {
                channel,
                key,
                velocity,
            } => buffer.extend_from_slice(&[0x90 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]),
            TrackEvent::NoteOff {
                channel,
                key,
                velocity,
            } => buffer.extend_from_slice(&[0x80 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]),
            TrackEvent::ProgramChange { channel, program } => {
                buffer.extend_from_slice(&[0xC0 | (channel & 0x0F), program & 0x7F])
            }
            TrackEvent::Tempo(us_per_quarter) => {
                let [_, a, b, c] = us_per_quarter.to_be_bytes();
                buffer.extend_from_slice(&[0xFF, 0x51, 0x03, a, b, c]);
            }
            TrackEvent::EndOfTrack => buffer.extend_from_slice(&[0xFF, 0x2F, 0x00]),
        }
    }
}

/// Appends a chunk (4-byte id, big-endian length, payload).
fn write_chunk(id: &[u8; 4], payload: &[u8], buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(id);
    buffer.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buffer.extend_from_slice(payload);
}

/// Encodes a complete SMF from delta-timed tracks.
///
/// Format 0 is written for a single track, format 1 otherwise. Events are
/// written verbatim; callers include their own `EndOfTrack`.
pub fn write_smf(division: u16, tracks: &[Vec<(u32, TrackEvent)>]) -> Vec<u8> {
    let format: u16 = if tracks.len() == 1 { 0 } else { 1 };

    let mut header = Vec::with_capacity(6);
    header.extend_from_slice(&format.to_be_bytes());
    header.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    header.extend_from_slice(&division.to_be_bytes());

    let mut out = Vec::new();
    write_chunk(b"MThd", &header, &mut out);

    for track in tracks {
        let mut data = Vec::new();
        for (delta, event) in track {
            write_vlq(*delta, &mut data);
            event.encode(&mut data);
        }
        write_chunk(b"MTrk", &data, &mut out);
    }

    out
}

/// Rebuilds the probe payload from its musical description.
///
/// The writer always emits correct chunk lengths, so the result differs from
/// [`PROBE_PAYLOAD`] only in the track length field (`0x0C` instead of `0x0B`).
pub fn build_probe_payload() -> Vec<u8> {
    write_smf(
        PROBE_DIVISION,
        &[vec![
            (
                0,
                TrackEvent::NoteOn {
                    channel: 0,
                    key: PROBE_NOTE,
                    velocity: 64,
                },
            ),
            (
                u32::from(PROBE_DIVISION),
                TrackEvent::NoteOff {
                    channel: 0,
                    key: PROBE_NOTE,
                    velocity: 64,
                },
            ),
            (0, TrackEvent::EndOfTrack),
        ]],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlq_encoding() {
        let mut buffer = Vec::new();

        write_vlq(0, &mut buffer);
        assert_eq!(buffer, vec![0x00]);
        buffer.clear();

        write_vlq(0x60, &mut buffer);
        assert_eq!(buffer, vec![0x60]);
        buffer.clear();

        write_vlq(128, &mut buffer);
        assert_eq!(buffer, vec![0x81, 0x00]);
        buffer.clear();

        write_vlq(1920, &mut buffer);
        assert_eq!(buffer, vec![0x8F, 0x00]);
        buffer.clear();

        write_vlq(0x0FFF_FFFF, &mut buffer);
        assert_eq!(buffer, vec![0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_probe_payload_layout() {
        assert_eq!(PROBE_PAYLOAD.len(), 34);
        assert_eq!(&PROBE_PAYLOAD[0..4], b"MThd");
        assert_eq!(&PROBE_PAYLOAD[14..18], b"MTrk");
        // Declared track length is one less than the event bytes present
        assert_eq!(PROBE_PAYLOAD[21], 0x0B);
        assert_eq!(PROBE_PAYLOAD.len() - 22, 12);
        assert_eq!(&PROBE_PAYLOAD[31..], &[0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn test_build_probe_payload_differs_only_in_track_length() {
        let built = build_probe_payload();
        assert_eq!(built.len(), PROBE_PAYLOAD.len());
        assert_eq!(built[21], 0x0C);

        let mut expected = PROBE_PAYLOAD.to_vec();
        expected[21] = 0x0C;
        assert_eq!(built, expected);
    }

    #[test]
    fn test_multi_track_writes_format_1() {
        let bytes = write_smf(
            480,
            &[
                vec![(0, TrackEvent::Tempo(500_000)), (0, TrackEvent::EndOfTrack)],
                vec![(0, TrackEvent::EndOfTrack)],
            ],
        );
        assert_eq!(&bytes[8..10], &[0x00, 0x01]);
        assert_eq!(&bytes[10..12], &[0x00, 0x02]);
        assert_eq!(&bytes[12..14], &480u16.to_be_bytes());
    }
}
