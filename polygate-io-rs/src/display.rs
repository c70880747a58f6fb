//! Screen layout: [`DisplayFrame`] and the [`render_display`] function.
//!
//! A frame is a flat, comparable copy of what is on screen, derived from a
//! [`DisplaySnapshot`]. The display task compares consecutive frames and
//! skips the I2C flush when nothing visible changed.

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text},
};

use polygate::config::{ChannelView, ClockSource, DisplaySnapshot, MenuValue, CHANNEL_COUNT};
use polygate::UiState;

/// Characters per text line (128 px / 6 px glyphs).
pub const LINE_CHARS: usize = 21;
const LINE_BYTES: usize = LINE_CHARS + 1;

// ── DisplayConfig ────────────────────────────────────────────────────────

/// Layout geometry and refresh rate.
///
/// [`DisplayConfig::default()`] matches a 128×64 panel: a header line, a
/// detail line and four pattern rows of 10 px.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Refresh rate in Hz. Default: 30.
    pub update_frequency_hz: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// Height of the header line. Default: 11.
    pub header_height: u32,
    /// Baseline of the detail line. Default: 20.
    pub detail_y: i32,
    /// Top of the first pattern row. Default: 24.
    pub rows_top: i32,
    pub row_height: u32,
    /// Width of the channel number column. Default: 8.
    pub label_width: u32,
    /// Upper bound on a step cell's width. Default: 6.
    pub max_cell_width: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            update_frequency_hz: 30,
            display_width: 128,
            display_height: 64,
            header_height: 11,
            detail_y: 20,
            rows_top: 24,
            row_height: 10,
            label_width: 8,
            max_cell_width: 6,
        }
    }
}

impl DisplayConfig {
    /// `1000 / update_frequency_hz`.
    pub fn update_period_ms(&self) -> u64 {
        1000 / self.update_frequency_hz.max(1) as u64
    }

    /// Width of one step cell for a pattern of `len` steps.
    pub fn cell_width(&self, len: u8) -> u32 {
        let available = self.display_width.saturating_sub(self.label_width);
        (available / u32::from(len.max(1))).clamp(1, self.max_cell_width)
    }
}

// ── DisplayFrame ─────────────────────────────────────────────────────────

/// One pattern row, already rotated by the channel offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFrame {
    /// Bit `s` set when displayed step `s` is an onset.
    pub bits: u32,
    pub len: u8,
    pub playhead: u8,
    /// Label drawn inverted.
    pub selected: bool,
    pub probabilistic: bool,
    pub muted: bool,
    pub fill: bool,
}

impl RowFrame {
    pub fn from_view(view: &ChannelView, selected: bool) -> Self {
        let len = view.pattern.len();
        let mut bits = 0u32;
        if len > 0 {
            for s in 0..len {
                let source = (u16::from(s) + u16::from(len) - u16::from(view.offset % len)) % u16::from(len);
                if view.pattern.is_onset(source as u8) {
                    bits |= 1 << s;
                }
            }
        }
        Self {
            bits,
            len,
            playhead: view.current_step,
            selected,
            probabilistic: view.probabilistic,
            muted: view.muted,
            fill: view.fill,
        }
    }

    pub fn is_onset(&self, step: u8) -> bool {
        step < self.len && self.bits & (1 << step) != 0
    }
}

/// Everything drawn in one frame.
///
/// Text lines are null-padded ASCII, truncated to [`LINE_CHARS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayFrame {
    pub header: [u8; LINE_BYTES],
    pub detail: [u8; LINE_BYTES],
    pub rows: [RowFrame; CHANNEL_COUNT],
}

impl DisplayFrame {
    pub fn from_snapshot(snapshot: &DisplaySnapshot) -> Self {
        let mut header = LineBuf::default();
        let mut detail = LineBuf::default();
        let channel = snapshot.selected_channel as usize;
        let view = &snapshot.channels[channel.min(CHANNEL_COUNT - 1)];
        let editing_channel = matches!(
            snapshot.state,
            UiState::RhythmParamBeatsPulses | UiState::RhythmParamOffsetProbability
        );

        match snapshot.state {
            UiState::Init => {
                let _ = header.write_str("POLYGATE");
                let _ = detail.write_str("starting");
            }
            UiState::Live => {
                let _ = write!(header, "P{} ", snapshot.load_preset_index + 1);
                match snapshot.clock.source {
                    ClockSource::Internal => {
                        let _ = write!(header, "int {}ms", snapshot.clock.period_ms());
                    }
                    ClockSource::External => {
                        let _ = header.write_str("ext");
                    }
                }
            }
            UiState::Parameters => match &snapshot.menu {
                Some(menu) => {
                    if menu.path.is_empty() {
                        let _ = header.write_str("MENU");
                    }
                    for (i, label) in menu.path.iter().enumerate() {
                        if i > 0 {
                            let _ = header.write_char('>');
                        }
                        let _ = header.write_str(label);
                    }
                    if menu.editing {
                        let _ = detail.write_str("= ");
                    } else {
                        let _ = write!(detail, "> {} ", menu.cursor_label);
                    }
                    match menu.value {
                        MenuValue::None => {}
                        MenuValue::Number(n) => {
                            let _ = write!(detail, "{}", n);
                        }
                        MenuValue::Choice(label) => {
                            let _ = detail.write_str(label);
                        }
                    }
                }
                None => {
                    let _ = header.write_str("MENU");
                }
            },
            UiState::RhythmParamBeatsPulses => {
                let _ = write!(header, "CH{} beats/pulses", channel + 1);
                let _ = write!(detail, "{} / {}", view.pattern.len(), view.pattern.onset_count());
            }
            UiState::RhythmParamOffsetProbability => {
                let _ = write!(header, "CH{} offset/prob", channel + 1);
                let _ = write!(detail, "{} / {}%", view.offset, view.probability);
            }
        }

        Self {
            header: header.buf,
            detail: detail.buf,
            rows: core::array::from_fn(|i| {
                RowFrame::from_view(&snapshot.channels[i], editing_channel && i == channel)
            }),
        }
    }

    pub fn header_str(&self) -> &str {
        bytes_to_str(&self.header)
    }

    pub fn detail_str(&self) -> &str {
        bytes_to_str(&self.detail)
    }
}

/// Truncating `core::fmt::Write` sink over a fixed line buffer.
#[derive(Default)]
struct LineBuf {
    buf: [u8; LINE_BYTES],
    len: usize,
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes().filter(u8::is_ascii) {
            if self.len >= LINE_CHARS {
                break;
            }
            self.buf[self.len] = b;
            self.len += 1;
        }
        Ok(())
    }
}

/// Text up to the first null byte; `""` if not valid UTF-8.
pub fn bytes_to_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end]).unwrap_or("")
}

// ── DisplayChanges ───────────────────────────────────────────────────────

/// Which parts of the screen differ between two frames.
pub struct DisplayChanges {
    pub header_changed: bool,
    pub detail_changed: bool,
    pub row_changed: [bool; CHANNEL_COUNT],
}

impl DisplayChanges {
    pub fn detect(old: &DisplayFrame, new: &DisplayFrame) -> Self {
        Self {
            header_changed: old.header != new.header,
            detail_changed: old.detail != new.detail,
            row_changed: core::array::from_fn(|i| old.rows[i] != new.rows[i]),
        }
    }

    pub fn any_changed(&self) -> bool {
        self.header_changed || self.detail_changed || self.row_changed.iter().any(|&c| c)
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Draw `frame` into `display`.
///
/// # Layout
///
/// ```text
/// ┌──────────────────────────────┐
/// │        P1 int 500ms          │  header
/// │> Period ms 510               │  detail
/// │1 ■ · · ■ · · ■ ·             │  one row per channel,
/// │2 ■ · ■ ■ · ■ ■ ·             │  playhead underlined
/// │3 ...                         │
/// │4 ...                         │
/// └──────────────────────────────┘
/// ```
///
/// Probabilistic rows draw onsets hollow, muted rows draw a dash, fill
/// rows draw every step.
pub fn render_display<D>(display: &mut D, frame: &DisplayFrame, config: &DisplayConfig) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let on = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let off = MonoTextStyle::new(&FONT_6X10, BinaryColor::Off);
    let filled = PrimitiveStyle::with_fill(BinaryColor::On);
    let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    let header = frame.header_str();
    if !header.is_empty() {
        let centre_x = config.display_width as i32 / 2;
        Text::with_alignment(header, Point::new(centre_x, config.header_height as i32 - 1), on, Alignment::Center)
            .draw(display)?;
    }

    let detail = frame.detail_str();
    if !detail.is_empty() {
        Text::new(detail, Point::new(0, config.detail_y), on).draw(display)?;
    }

    let row_height = config.row_height as i32;
    for (i, row) in frame.rows.iter().enumerate() {
        let top = config.rows_top + i as i32 * row_height;

        // channel number
        let digit = [b'1' + i as u8];
        let label = core::str::from_utf8(&digit).unwrap_or("?");
        if row.selected {
            Rectangle::new(Point::new(0, top), Size::new(config.label_width - 1, config.row_height - 1))
                .into_styled(filled)
                .draw(display)?;
            Text::with_baseline(label, Point::new(1, top), off, Baseline::Top).draw(display)?;
        } else {
            Text::with_baseline(label, Point::new(1, top), on, Baseline::Top).draw(display)?;
        }

        if row.len == 0 {
            continue;
        }
        let cell = config.cell_width(row.len) as i32;
        let cell_height = row_height - 3;
        let x0 = config.label_width as i32;

        if row.muted {
            let mid = top + cell_height / 2;
            Line::new(Point::new(x0, mid), Point::new(x0 + cell * i32::from(row.len) - 2, mid))
                .into_styled(outline)
                .draw(display)?;
        } else {
            for s in 0..row.len {
                let x = x0 + i32::from(s) * cell;
                let size = Size::new((cell - 1).max(1) as u32, cell_height as u32);
                if row.fill || (row.is_onset(s) && !row.probabilistic) {
                    Rectangle::new(Point::new(x, top), size).into_styled(filled).draw(display)?;
                } else if row.is_onset(s) {
                    Rectangle::new(Point::new(x, top), size).into_styled(outline).draw(display)?;
                } else {
                    Pixel(Point::new(x + (cell - 1) / 2, top + cell_height - 1), BinaryColor::On).draw(display)?;
                }
            }
        }

        let px = x0 + i32::from(row.playhead.min(row.len - 1)) * cell;
        let underline = top + row_height - 2;
        Line::new(Point::new(px, underline), Point::new(px + (cell - 2).max(0), underline))
            .into_styled(outline)
            .draw(display)?;
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use polygate::config::{ClockSettings, MenuView};
    use polygate::{Event, Pattern};
    use polygate::ConfigStateMachine;

    fn view(beats: u8, pulses: u8, offset: u8) -> ChannelView {
        ChannelView {
            pattern: Pattern::euclidean(beats, pulses),
            current_step: 0,
            offset,
            probabilistic: false,
            probability: 100,
            muted: false,
            fill: false,
        }
    }

    fn snapshot(state: UiState) -> DisplaySnapshot {
        DisplaySnapshot {
            state,
            selected_channel: 0,
            load_preset_index: 0,
            clock: ClockSettings::default(),
            menu: None,
            channels: [view(16, 4, 0); CHANNEL_COUNT],
        }
    }

    #[test]
    fn default_frame_is_blank() {
        let frame = DisplayFrame::default();
        assert_eq!(frame.header_str(), "");
        assert_eq!(frame.detail_str(), "");
        assert!(frame.rows.iter().all(|r| r.len == 0));
    }

    #[test]
    fn live_header_shows_preset_and_clock() {
        let frame = DisplayFrame::from_snapshot(&snapshot(UiState::Live));
        assert_eq!(frame.header_str(), "P1 int 500ms");
        assert_eq!(frame.detail_str(), "");

        let mut s = snapshot(UiState::Live);
        s.clock.source = ClockSource::External;
        s.load_preset_index = 1;
        assert_eq!(DisplayFrame::from_snapshot(&s).header_str(), "P2 ext");
    }

    #[test]
    fn menu_lines_follow_the_path() {
        let mut s = snapshot(UiState::Parameters);
        let mut path = heapless::Vec::new();
        path.push("Clock").unwrap();
        path.push("Period ms").unwrap();
        s.menu = Some(MenuView {
            path,
            title: "Period ms",
            cursor_label: "Period ms",
            value: MenuValue::Number(510),
            editing: true,
        });
        let frame = DisplayFrame::from_snapshot(&s);
        assert_eq!(frame.header_str(), "Clock>Period ms");
        assert_eq!(frame.detail_str(), "= 510");
    }

    #[test]
    fn menu_root_shows_cursor_entry() {
        let mut m = ConfigStateMachine::new();
        m.on_event(Event::Init);
        m.on_event(Event::MenuShort);
        let frame = DisplayFrame::from_snapshot(&m.display_snapshot());
        assert_eq!(frame.header_str(), "MENU");
        assert_eq!(frame.detail_str(), "> Channel 1 ");
    }

    #[test]
    fn rhythm_screens_show_selected_channel() {
        let mut s = snapshot(UiState::RhythmParamBeatsPulses);
        s.selected_channel = 2;
        s.channels[2] = view(8, 3, 0);
        let frame = DisplayFrame::from_snapshot(&s);
        assert_eq!(frame.header_str(), "CH3 beats/pulses");
        assert_eq!(frame.detail_str(), "8 / 3");
        assert!(frame.rows[2].selected);
        assert!(!frame.rows[0].selected);

        s.state = UiState::RhythmParamOffsetProbability;
        s.channels[2].offset = 2;
        s.channels[2].probability = 45;
        let frame = DisplayFrame::from_snapshot(&s);
        assert_eq!(frame.detail_str(), "2 / 45%");
    }

    #[test]
    fn live_rows_are_not_highlighted() {
        let frame = DisplayFrame::from_snapshot(&snapshot(UiState::Live));
        assert!(frame.rows.iter().all(|r| !r.selected));
    }

    #[test]
    fn rows_are_rotated_by_offset() {
        // E(8,3) = x..x.x..
        let plain = RowFrame::from_view(&view(8, 3, 0), false);
        assert_eq!(plain.bits, 0b0010_1001);

        let shifted = RowFrame::from_view(&view(8, 3, 1), false);
        assert!(shifted.is_onset(1));
        assert!(shifted.is_onset(4));
        assert!(shifted.is_onset(6));
        assert!(!shifted.is_onset(0));
        assert!(!shifted.is_onset(7));
    }

    #[test]
    fn row_onsets_beyond_len_are_ignored() {
        let row = RowFrame::from_view(&view(4, 4, 0), false);
        assert!(row.is_onset(3));
        assert!(!row.is_onset(4));
    }

    #[test]
    fn long_text_is_truncated() {
        let mut line = LineBuf::default();
        let _ = line.write_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        assert_eq!(bytes_to_str(&line.buf), "ABCDEFGHIJKLMNOPQRSTU");
    }

    #[test]
    fn bytes_to_str_stops_at_null() {
        let mut buf = [0u8; LINE_BYTES];
        buf[0] = b'H';
        buf[1] = b'i';
        assert_eq!(bytes_to_str(&buf), "Hi");
        assert_eq!(bytes_to_str(&[0u8; 4]), "");
    }

    #[test]
    fn changes_detect_step_advance() {
        let a = DisplayFrame::from_snapshot(&snapshot(UiState::Live));
        let mut s = snapshot(UiState::Live);
        s.channels[1].current_step = 5;
        let b = DisplayFrame::from_snapshot(&s);
        let changes = DisplayChanges::detect(&a, &b);
        assert!(!changes.header_changed);
        assert!(!changes.detail_changed);
        assert_eq!(changes.row_changed, [false, true, false, false]);
        assert!(changes.any_changed());
        assert!(!DisplayChanges::detect(&a, &a).any_changed());
    }

    #[test]
    fn default_config_values() {
        let c = DisplayConfig::default();
        assert_eq!(c.update_frequency_hz, 30);
        assert_eq!(c.update_period_ms(), 33);
        assert_eq!(c.rows_top + 4 * c.row_height as i32, c.display_height as i32);
    }

    #[test]
    fn cells_shrink_for_long_patterns() {
        let c = DisplayConfig::default();
        assert_eq!(c.cell_width(16), 6);
        assert_eq!(c.cell_width(32), 3);
        assert_eq!(c.cell_width(1), 6);
    }
}
