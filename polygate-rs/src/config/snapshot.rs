use heapless::Vec;

use crate::rhythm::Pattern;

use super::clock::ClockSettings;
use super::machine::{ConfigStateMachine, UiState};
use super::menu::{self, MenuNode, NodeKind, Target, MENU_DEPTH};
use super::CHANNEL_COUNT;

/// What the display needs from one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelView {
    pub pattern: Pattern,
    pub current_step: u8,
    pub offset: u8,
    /// Onsets are thinned by probability ("turing" rather than plain
    /// euclidean playback).
    pub probabilistic: bool,
    /// Onset probability in percent.
    pub probability: u8,
    pub muted: bool,
    pub fill: bool,
}

/// Value shown next to a menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuValue {
    None,
    Number(i32),
    Choice(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuView {
    /// Labels from the root to the current node.
    pub path: Vec<&'static str, MENU_DEPTH>,
    /// Label of the current node.
    pub title: &'static str,
    /// Entry under the cursor; equals `title` while editing a terminal.
    pub cursor_label: &'static str,
    pub value: MenuValue,
    /// A terminal node is being edited.
    pub editing: bool,
}

/// Copy of everything the display draws, taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub state: UiState,
    pub selected_channel: u8,
    pub load_preset_index: u8,
    pub clock: ClockSettings,
    /// Present only in [`UiState::Parameters`].
    pub menu: Option<MenuView>,
    pub channels: [ChannelView; CHANNEL_COUNT],
}

impl ConfigStateMachine {
    pub fn display_snapshot(&self) -> DisplaySnapshot {
        let channels = core::array::from_fn(|i| {
            let engine = &self.channels[i];
            ChannelView {
                pattern: *engine.pattern(),
                current_step: engine.current_step(),
                offset: engine.params().offset(),
                probabilistic: engine.params().pulses_probability() < 100,
                probability: engine.params().pulses_probability(),
                muted: engine.is_muted(),
                fill: engine.is_fill(),
            }
        });

        let menu = if self.state() == UiState::Parameters {
            self.menu_view()
        } else {
            None
        };

        DisplaySnapshot {
            state: self.state(),
            selected_channel: self.selected_channel(),
            load_preset_index: self.load_preset_index,
            clock: self.clock,
            menu,
            channels,
        }
    }

    fn menu_view(&self) -> Option<MenuView> {
        let path = self.menu_path();
        let (node, target) = menu::resolve(path)?;

        let mut labels = Vec::new();
        for depth in 1..=path.len() {
            let (step, _) = menu::resolve(&path[..depth])?;
            labels.push(step.label).ok()?;
        }

        if node.is_terminal() {
            return Some(MenuView {
                path: labels,
                title: node.label,
                cursor_label: node.label,
                value: self.terminal_value(node, target, true),
                editing: true,
            });
        }

        let child = node.children().get(self.menu_cursor() as usize)?;
        Some(MenuView {
            path: labels,
            title: node.label,
            cursor_label: child.label,
            value: self.terminal_value(child, child.target.or(target), false),
            editing: false,
        })
    }

    /// Value to show for a terminal. While editing a choice the pending
    /// selection is shown instead of the stored value.
    fn terminal_value(&self, node: &MenuNode, target: Option<Target>, editing: bool) -> MenuValue {
        match node.kind {
            NodeKind::Branch(_) => MenuValue::None,
            NodeKind::Range { attr, .. } => MenuValue::Number(self.read_binding(target, attr)),
            NodeKind::Choice { attr, values } => {
                let index = if editing {
                    self.menu_selected_value_index() as i32
                } else {
                    self.read_binding(target, attr)
                };
                values
                    .get(index.max(0) as usize)
                    .map_or(MenuValue::None, |v| MenuValue::Choice(*v))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Event;
    use crate::gesture::Ring;

    fn live() -> ConfigStateMachine {
        let mut m = ConfigStateMachine::new();
        m.on_event(Event::Init);
        m
    }

    #[test]
    fn live_snapshot_has_no_menu() {
        let m = live();
        let snap = m.display_snapshot();
        assert_eq!(snap.state, UiState::Live);
        assert!(snap.menu.is_none());
        assert_eq!(snap.channels[0].pattern.onset_count(), 4);
        assert!(!snap.channels[0].probabilistic);
    }

    #[test]
    fn channel_view_flags() {
        let mut m = live();
        m.channels[1].set_pulses_probability(95);
        m.channels[2].set_muted(true);
        m.channels[3].set_offset(5);
        let snap = m.display_snapshot();
        assert!(snap.channels[1].probabilistic);
        assert!(snap.channels[2].muted);
        assert_eq!(snap.channels[3].offset, 5);
    }

    #[test]
    fn root_menu_view() {
        let mut m = live();
        m.on_event(Event::MenuShort);
        let view = m.display_snapshot().menu.unwrap();
        assert!(view.path.is_empty());
        assert_eq!(view.title, "Menu");
        assert_eq!(view.cursor_label, "Channel 1");
        assert_eq!(view.value, MenuValue::None);
        assert!(!view.editing);
    }

    #[test]
    fn branch_view_previews_child_value() {
        let mut m = live();
        m.on_event(Event::MenuShort);
        for _ in 0..6 {
            m.on_event(Event::RingIncrement(Ring::Outer));
        }
        m.on_event(Event::MenuShort);

        let view = m.display_snapshot().menu.unwrap();
        assert_eq!(view.path.as_slice(), &["Clock"]);
        assert_eq!(view.cursor_label, "Source");
        assert_eq!(view.value, MenuValue::Choice("int"));

        m.on_event(Event::RingIncrement(Ring::Outer));
        let view = m.display_snapshot().menu.unwrap();
        assert_eq!(view.cursor_label, "Period ms");
        assert_eq!(view.value, MenuValue::Number(500));
    }

    #[test]
    fn editing_choice_shows_pending_value() {
        let mut m = live();
        m.on_event(Event::MenuShort);
        m.on_event(Event::MenuShort); // Channel 1
        for _ in 0..4 {
            m.on_event(Event::RingIncrement(Ring::Outer));
        }
        m.on_event(Event::MenuShort); // Prescaler
        m.on_event(Event::RingIncrement(Ring::Outer));

        let view = m.display_snapshot().menu.unwrap();
        assert!(view.editing);
        assert_eq!(view.path.as_slice(), &["Channel 1", "Prescaler"]);
        assert_eq!(view.title, "Prescaler");
        assert_eq!(view.value, MenuValue::Choice("2"));
        assert_eq!(m.channels[0].params().prescaler(), 1);
    }
}
