//! Non-volatile storage of the [`PersistedDocument`].
//!
//! The document is framed as
//!
//! ```text
//! ┌────────┬─────────┬─────────────────┐
//! │ "PGT1" │ len u16 │ records ...     │
//! └────────┴─────────┴─────────────────┘
//! ```
//!
//! so erased flash (all `0xFF`) and foreign data decode to `None` instead
//! of a garbage configuration. Each section of the document (one channel,
//! one preset slot, the interface settings, ...) is its own record:
//!
//! ```text
//! ┌─────┬──────┬────────┬───────────────────┐
//! │ tag │ slot │ len u8 │ postcard value    │
//! └─────┴──────┴────────┴───────────────────┘
//! ```
//!
//! Records are read back one at a time. A missing, unknown or unreadable
//! record leaves its section empty, and
//! [`load_document`](polygate::ConfigStateMachine::load_document) keeps
//! the default for it while everything else is restored.

use heapless::Vec;
use serde::Serialize;

use polygate::config::{CHANNEL_COUNT, CV_CHANNEL_COUNT, PRESET_COUNT};
use polygate::PersistedDocument;

use crate::error::IoError;

pub const DOCUMENT_MAGIC: [u8; 4] = *b"PGT1";
const HEADER_LEN: usize = DOCUMENT_MAGIC.len() + 2;
const RECORD_HEADER_LEN: usize = 3;

/// Buffer size large enough for any encoded document.
pub const DOCUMENT_CAPACITY: usize = 1024;

/// Record tags. Values are part of the stored format; never reuse one.
mod tag {
    pub const CHANNEL: u8 = 1;
    pub const PRESET: u8 = 2;
    pub const PRESET_INDEX: u8 = 3;
    pub const INTERFACE: u8 = 4;
    pub const CV: u8 = 5;
    pub const CLOCK: u8 = 6;
}

/// Somewhere a document survives power cycles.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    type Error;

    /// `Ok(None)` when nothing valid has been stored yet.
    async fn load(&mut self) -> Result<Option<PersistedDocument>, IoError<Self::Error>>;

    async fn save(&mut self, doc: &PersistedDocument) -> Result<(), IoError<Self::Error>>;
}

// ── Encoding ─────────────────────────────────────────────────────────────

struct RecordWriter<'a> {
    buf: &'a mut [u8],
    used: usize,
}

impl RecordWriter<'_> {
    /// Append one record; `None` when it does not fit.
    fn put<T: Serialize>(&mut self, tag: u8, slot: u8, value: &T) -> Option<()> {
        let rest = self.buf.get_mut(self.used..)?;
        if rest.len() < RECORD_HEADER_LEN {
            return None;
        }
        let (header, body) = rest.split_at_mut(RECORD_HEADER_LEN);
        let len = postcard::to_slice(value, body).ok()?.len();
        header[0] = tag;
        header[1] = slot;
        header[2] = u8::try_from(len).ok()?;
        self.used += RECORD_HEADER_LEN + len;
        Some(())
    }
}

fn preset_slot(preset: usize, channel: usize) -> u8 {
    (preset * CHANNEL_COUNT + channel) as u8
}

/// Frame `doc` into `buf`, returning the used prefix.
pub fn encode_document<'a, E>(doc: &PersistedDocument, buf: &'a mut [u8]) -> Result<&'a [u8], IoError<E>> {
    if buf.len() < HEADER_LEN {
        return Err(IoError::Encoding);
    }
    let (header, body) = buf.split_at_mut(HEADER_LEN);
    let Some(payload_len) = write_records(doc, body) else {
        return Err(IoError::Encoding);
    };
    let Ok(len) = u16::try_from(payload_len) else {
        return Err(IoError::Encoding);
    };
    header[..DOCUMENT_MAGIC.len()].copy_from_slice(&DOCUMENT_MAGIC);
    header[DOCUMENT_MAGIC.len()..].copy_from_slice(&len.to_le_bytes());
    Ok(&buf[..HEADER_LEN + payload_len])
}

/// Write every present section of `doc` as a record, returning the bytes used.
fn write_records(doc: &PersistedDocument, body: &mut [u8]) -> Option<usize> {
    let mut records = RecordWriter { buf: body, used: 0 };

    for (slot, channel) in doc.channels.iter().enumerate() {
        records.put(tag::CHANNEL, slot as u8, channel)?;
    }
    for (preset, channels) in doc.presets.iter().enumerate() {
        for (channel, stored) in channels.iter().enumerate() {
            records.put(tag::PRESET, preset_slot(preset, channel), stored)?;
        }
    }
    if let Some(index) = doc.load_preset_index {
        records.put(tag::PRESET_INDEX, 0, &index)?;
    }
    if let Some(interface) = &doc.interface {
        records.put(tag::INTERFACE, 0, interface)?;
    }
    for (slot, cv) in doc.cv.iter().enumerate() {
        records.put(tag::CV, slot as u8, cv)?;
    }
    if let Some(clock) = &doc.clock {
        records.put(tag::CLOCK, 0, clock)?;
    }
    Some(records.used)
}

// ── Decoding ─────────────────────────────────────────────────────────────

/// Parse a framed document; `None` for blank, foreign or truncated data.
///
/// Inside a valid frame every readable record is kept. A record cut short
/// by the end of the frame stops the scan.
pub fn decode_document(bytes: &[u8]) -> Option<PersistedDocument> {
    let header = bytes.get(..HEADER_LEN)?;
    if header[..DOCUMENT_MAGIC.len()] != DOCUMENT_MAGIC {
        return None;
    }
    let len = u16::from_le_bytes([header[4], header[5]]) as usize;
    let mut payload = bytes.get(HEADER_LEN..HEADER_LEN + len)?;

    let mut doc = PersistedDocument::default();
    while !payload.is_empty() {
        let Some(&[tag, slot, value_len]) = payload.get(..RECORD_HEADER_LEN) else {
            break;
        };
        let end = RECORD_HEADER_LEN + value_len as usize;
        let Some(value) = payload.get(RECORD_HEADER_LEN..end) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("stored record {} cut short", tag);
            break;
        };
        if apply_record(&mut doc, tag, slot, value).is_none() {
            #[cfg(feature = "defmt")]
            defmt::warn!("skipped stored record {}/{}", tag, slot);
        }
        payload = &payload[end..];
    }
    Some(doc)
}

fn apply_record(doc: &mut PersistedDocument, tag: u8, slot: u8, value: &[u8]) -> Option<()> {
    let slot = slot as usize;
    match tag {
        tag::CHANNEL => place(&mut doc.channels, slot, postcard::from_bytes(value).ok()?),
        tag::PRESET => {
            let (preset, channel) = (slot / CHANNEL_COUNT, slot % CHANNEL_COUNT);
            if preset >= PRESET_COUNT {
                return None;
            }
            if doc.presets.len() <= preset {
                doc.presets.resize_default(preset + 1).ok()?;
            }
            place(&mut doc.presets[preset], channel, postcard::from_bytes(value).ok()?)
        }
        tag::PRESET_INDEX => {
            doc.load_preset_index = Some(postcard::from_bytes(value).ok()?);
            Some(())
        }
        tag::INTERFACE => {
            doc.interface = Some(postcard::from_bytes(value).ok()?);
            Some(())
        }
        tag::CV => place(&mut doc.cv, slot, postcard::from_bytes(value).ok()?),
        tag::CLOCK => {
            doc.clock = Some(postcard::from_bytes(value).ok()?);
            Some(())
        }
        _ => None,
    }
}

/// Put `value` at `slot`, padding any gap with empty entries.
fn place<T: Clone + Default, const N: usize>(list: &mut Vec<T, N>, slot: usize, value: T) -> Option<()> {
    if slot >= N {
        return None;
    }
    if list.len() <= slot {
        list.resize_default(slot + 1).ok()?;
    }
    list[slot] = value;
    Some(())
}

// Preset slots fit in a byte, and the document fits the buffer at up to
// 32 bytes a record.
const _: () = assert!(PRESET_COUNT * CHANNEL_COUNT <= u8::MAX as usize);
const _: () = assert!((CHANNEL_COUNT * (PRESET_COUNT + 1) + CV_CHANNEL_COUNT + 3) * 32 <= DOCUMENT_CAPACITY);

#[cfg(test)]
mod tests {
    use super::*;
    use polygate::config::{ClockSource, Sensitivity, StoredClock, StoredRhythm};
    use polygate::{ConfigStateMachine, Event};

    fn edited_document() -> PersistedDocument {
        let mut m = ConfigStateMachine::new();
        m.on_event(Event::Init);
        m.on_event(Event::SwitchShort(1));
        m.on_event(Event::Encoder(polygate::Motion::Decrement));
        m.on_event(Event::TapLong);
        m.persisted_document()
    }

    /// Frame raw record bytes the way `encode_document` would.
    fn frame(records: &[u8]) -> Vec<u8, 256> {
        let mut out = Vec::new();
        out.extend_from_slice(&DOCUMENT_MAGIC).unwrap();
        out.extend_from_slice(&(records.len() as u16).to_le_bytes()).unwrap();
        out.extend_from_slice(records).unwrap();
        out
    }

    /// One encoded record.
    fn record<T: Serialize>(tag: u8, slot: u8, value: &T) -> Vec<u8, 64> {
        let mut body = [0u8; 61];
        let value = postcard::to_slice(value, &mut body).unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(&[tag, slot, value.len() as u8]).unwrap();
        out.extend_from_slice(value).unwrap();
        out
    }

    #[test]
    fn framed_document_decodes() {
        let doc = edited_document();
        let mut buf = [0u8; DOCUMENT_CAPACITY];
        let frame = encode_document::<()>(&doc, &mut buf).unwrap();
        assert_eq!(&frame[..4], b"PGT1");
        assert!(frame.len() < DOCUMENT_CAPACITY);
        assert_eq!(decode_document(frame), Some(doc));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let doc = PersistedDocument::default();
        let mut buf = [0xFFu8; 64];
        let len = encode_document::<()>(&doc, &mut buf).unwrap().len();
        assert!(len < 64);
        assert_eq!(decode_document(&buf), Some(doc));
    }

    #[test]
    fn erased_flash_is_empty() {
        assert_eq!(decode_document(&[0xFF; 256]), None);
        assert_eq!(decode_document(&[]), None);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let doc = edited_document();
        let mut buf = [0u8; DOCUMENT_CAPACITY];
        let len = encode_document::<()>(&doc, &mut buf).unwrap().len();
        assert_eq!(decode_document(&buf[..len - 1]), None);
    }

    #[test]
    fn small_buffer_fails_to_encode() {
        let doc = edited_document();
        let mut tiny = [0u8; 8];
        assert_eq!(encode_document::<()>(&doc, &mut tiny), Err(IoError::Encoding));
        assert_eq!(encode_document::<()>(&doc, &mut tiny[..3]), Err(IoError::Encoding));
    }

    #[test]
    fn missing_sections_keep_defaults_and_the_rest_survives() {
        // Written by a build that knew no clock section and one CV jack less.
        let mut doc = edited_document();
        doc.clock = None;
        doc.cv.pop();
        if let Some(interface) = doc.interface.as_mut() {
            interface.sensitivity = Some(Sensitivity::High.index());
        }
        let mut buf = [0u8; DOCUMENT_CAPACITY];
        let frame = encode_document::<()>(&doc, &mut buf).unwrap();

        let decoded = decode_document(frame).unwrap();
        assert_eq!(decoded.clock, None);
        assert_eq!(decoded.cv.len(), CV_CHANNEL_COUNT - 1);

        let mut m = ConfigStateMachine::new();
        let report = m.load_document(&decoded);
        assert!(report.is_partial());
        assert_eq!(m.channels()[1].params().beats(), 15);
        assert_eq!(m.interface().sensitivity, Sensitivity::High);
        assert_eq!(m.clock().source, ClockSource::Internal);
        assert_eq!(m.clock().period_ms(), 500);
    }

    #[test]
    fn unreadable_records_are_skipped() {
        let clock = StoredClock {
            source: Some(1),
            period_ms: Some(250),
        };
        let mut records: Vec<u8, 200> = Vec::new();
        // Unknown tag, a channel record with a bad option marker, and a
        // preset slot past the last preset.
        records.extend_from_slice(&[99, 0, 2, 0xAB, 0xCD]).unwrap();
        records.extend_from_slice(&[tag::CHANNEL, 0, 1, 0xFF]).unwrap();
        records
            .extend_from_slice(&record(tag::PRESET, 40, &StoredRhythm::default()))
            .unwrap();
        records.extend_from_slice(&record(tag::CLOCK, 0, &clock)).unwrap();

        let doc = decode_document(&frame(&records)).unwrap();
        assert!(doc.channels.is_empty());
        assert!(doc.presets.is_empty());
        assert_eq!(doc.clock, Some(clock));
    }

    #[test]
    fn sparse_slots_are_padded() {
        let stored = StoredRhythm {
            beats: Some(9),
            ..Default::default()
        };
        let doc = decode_document(&frame(&record(tag::CHANNEL, 2, &stored))).unwrap();
        assert_eq!(doc.channels.len(), 3);
        assert_eq!(doc.channels[0], StoredRhythm::default());
        assert_eq!(doc.channels[2].beats, Some(9));

        let doc = decode_document(&frame(&record(tag::PRESET, preset_slot(1, 3), &stored))).unwrap();
        assert_eq!(doc.presets.len(), 2);
        assert!(doc.presets[0].is_empty());
        assert_eq!(doc.presets[1][3].beats, Some(9));
    }

    #[test]
    fn record_cut_short_keeps_earlier_records() {
        let mut records: Vec<u8, 200> = Vec::new();
        records.extend_from_slice(&record(tag::PRESET_INDEX, 0, &1u8)).unwrap();
        records.extend_from_slice(&[tag::CLOCK, 0, 10, 1]).unwrap();
        let doc = decode_document(&frame(&records)).unwrap();
        assert_eq!(doc.load_preset_index, Some(1));
        assert_eq!(doc.clock, None);
    }
}
