//! Static menu tree.
//!
//! Terminal nodes name an [`Attr`]; the object it belongs to is the
//! [`Target`] of the nearest node on the path that sets one. Binding a
//! `(Target, Attr)` pair to a getter/setter happens in the state machine.

use crate::rhythm::{
    GATE_LENGTH_MAX_MS, GATE_LENGTH_MIN_MS, GATE_LENGTH_STEP_MS, MAX_BEATS, PRESCALER_LABELS,
    PROBABILITY_STEP,
};

use super::clock::{CLOCK_PERIOD_MAX_MS, CLOCK_PERIOD_MIN_MS, CLOCK_PERIOD_STEP_MS};
use super::{
    ChannelSelector, ClockSource, CvAction, LiveAction, LongPressAction, Sensitivity, VoltageRange,
};

/// Deepest path below the root (e.g. `CV › CV 1 › Action`).
pub const MENU_DEPTH: usize = 3;

/// Object a terminal node reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    Channel(u8),
    Cv(u8),
    Interface,
    Clock,
    Presets,
}

/// Attribute of a [`Target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attr {
    Beats,
    Pulses,
    Offset,
    Probability,
    Prescaler,
    GateLength,
    RandomizeGate,
    CvAction,
    CvTargets,
    CvRange,
    MenuLongPress,
    TapLongPress,
    InnerAction,
    InnerTarget,
    OuterAction,
    OuterTarget,
    Sensitivity,
    ClockSource,
    ClockPeriod,
    SavePreset,
    LoadPreset,
}

#[derive(Debug)]
pub enum NodeKind {
    Branch(&'static [MenuNode]),
    /// Pick one of `values`; the stored value is the index.
    Choice {
        attr: Attr,
        values: &'static [&'static str],
    },
    /// Numeric value edited in place.
    Range {
        attr: Attr,
        min: i32,
        max: i32,
        step: i32,
    },
}

#[derive(Debug)]
pub struct MenuNode {
    pub label: &'static str,
    pub target: Option<Target>,
    pub kind: NodeKind,
}

impl MenuNode {
    const fn branch(label: &'static str, target: Option<Target>, children: &'static [MenuNode]) -> Self {
        Self {
            label,
            target,
            kind: NodeKind::Branch(children),
        }
    }

    const fn choice(label: &'static str, attr: Attr, values: &'static [&'static str]) -> Self {
        Self {
            label,
            target: None,
            kind: NodeKind::Choice { attr, values },
        }
    }

    const fn range(label: &'static str, attr: Attr, min: i32, max: i32, step: i32) -> Self {
        Self {
            label,
            target: None,
            kind: NodeKind::Range {
                attr,
                min,
                max,
                step,
            },
        }
    }

    const fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn children(&self) -> &'static [MenuNode] {
        match self.kind {
            NodeKind::Branch(children) => children,
            _ => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, NodeKind::Branch(_))
    }
}

const OFF_ON: &[&str] = &["off", "on"];
const PRESET_SLOTS: &[&str] = &["1", "2"];

const CHANNEL_ITEMS: &[MenuNode] = &[
    MenuNode::range("Beats", Attr::Beats, 1, MAX_BEATS as i32, 1),
    MenuNode::range("Pulses", Attr::Pulses, 1, MAX_BEATS as i32, 1),
    MenuNode::range("Offset", Attr::Offset, 0, MAX_BEATS as i32 - 1, 1),
    MenuNode::range("Probability", Attr::Probability, 0, 100, PROBABILITY_STEP as i32),
    MenuNode::choice("Prescaler", Attr::Prescaler, &PRESCALER_LABELS),
    MenuNode::range(
        "Gate ms",
        Attr::GateLength,
        GATE_LENGTH_MIN_MS as i32,
        GATE_LENGTH_MAX_MS as i32,
        GATE_LENGTH_STEP_MS as i32,
    ),
    MenuNode::choice("Random gate", Attr::RandomizeGate, OFF_ON),
];

const CV_ITEMS: &[MenuNode] = &[
    MenuNode::choice("Action", Attr::CvAction, CvAction::LABELS),
    MenuNode::range("Channels", Attr::CvTargets, 0, 15, 1),
    MenuNode::choice("Range", Attr::CvRange, VoltageRange::LABELS),
];

const CV_INPUTS: &[MenuNode] = &[
    MenuNode::branch("CV 1", Some(Target::Cv(0)), CV_ITEMS),
    MenuNode::branch("CV 2", Some(Target::Cv(1)), CV_ITEMS),
    MenuNode::branch("CV 3", Some(Target::Cv(2)), CV_ITEMS),
    MenuNode::branch("CV 4", Some(Target::Cv(3)), CV_ITEMS),
];

const INTERFACE_ITEMS: &[MenuNode] = &[
    MenuNode::choice("Menu long", Attr::MenuLongPress, LongPressAction::LABELS),
    MenuNode::choice("Tap long", Attr::TapLongPress, LongPressAction::LABELS),
    MenuNode::choice("Inner ring", Attr::InnerAction, LiveAction::LABELS),
    MenuNode::choice("Inner chan", Attr::InnerTarget, ChannelSelector::LABELS),
    MenuNode::choice("Outer ring", Attr::OuterAction, LiveAction::LABELS),
    MenuNode::choice("Outer chan", Attr::OuterTarget, ChannelSelector::LABELS),
    MenuNode::choice("Touch sens", Attr::Sensitivity, Sensitivity::LABELS),
];

const CLOCK_ITEMS: &[MenuNode] = &[
    MenuNode::choice("Source", Attr::ClockSource, ClockSource::LABELS),
    MenuNode::range(
        "Period ms",
        Attr::ClockPeriod,
        CLOCK_PERIOD_MIN_MS as i32,
        CLOCK_PERIOD_MAX_MS as i32,
        CLOCK_PERIOD_STEP_MS as i32,
    ),
];

const ROOT_ITEMS: &[MenuNode] = &[
    MenuNode::branch("Channel 1", Some(Target::Channel(0)), CHANNEL_ITEMS),
    MenuNode::branch("Channel 2", Some(Target::Channel(1)), CHANNEL_ITEMS),
    MenuNode::branch("Channel 3", Some(Target::Channel(2)), CHANNEL_ITEMS),
    MenuNode::branch("Channel 4", Some(Target::Channel(3)), CHANNEL_ITEMS),
    MenuNode::branch("CV", None, CV_INPUTS),
    MenuNode::branch("Interface", Some(Target::Interface), INTERFACE_ITEMS),
    MenuNode::branch("Clock", Some(Target::Clock), CLOCK_ITEMS),
    MenuNode::choice("Save preset", Attr::SavePreset, PRESET_SLOTS).with_target(Target::Presets),
    MenuNode::choice("Load preset", Attr::LoadPreset, PRESET_SLOTS).with_target(Target::Presets),
];

/// Root of the menu tree.
pub static MENU: MenuNode = MenuNode::branch("Menu", None, ROOT_ITEMS);

/// Follow `path` (child indices) from the root.
///
/// Returns the node reached and the inherited target, or `None` if any
/// index is out of range or steps through a terminal node.
pub fn resolve(path: &[u8]) -> Option<(&'static MenuNode, Option<Target>)> {
    let mut node: &'static MenuNode = &MENU;
    let mut target = MENU.target;
    for &index in path {
        node = node.children().get(index as usize)?;
        target = node.target.or(target);
    }
    Some((node, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(label: &str, nodes: &'static [MenuNode]) -> u8 {
        nodes
            .iter()
            .position(|n| n.label == label)
            .map(|i| i as u8)
            .unwrap_or(u8::MAX)
    }

    #[test]
    fn root_is_a_branch() {
        let (node, target) = resolve(&[]).unwrap();
        assert_eq!(node.label, "Menu");
        assert!(!node.is_terminal());
        assert_eq!(target, None);
    }

    #[test]
    fn channel_target_is_inherited() {
        let (node, target) = resolve(&[2, 1]).unwrap();
        assert_eq!(node.label, "Pulses");
        assert_eq!(target, Some(Target::Channel(2)));
    }

    #[test]
    fn cv_target_comes_from_nearest_ancestor() {
        let cv = find("CV", ROOT_ITEMS);
        let (node, target) = resolve(&[cv, 3, 0]).unwrap();
        assert_eq!(node.label, "Action");
        assert_eq!(target, Some(Target::Cv(3)));
    }

    #[test]
    fn clock_period_range_bounds() {
        let clock = find("Clock", ROOT_ITEMS);
        let (node, _) = resolve(&[clock, 1]).unwrap();
        match node.kind {
            NodeKind::Range { min, max, step, .. } => assert_eq!((min, max, step), (10, 2000, 10)),
            _ => panic!("Period ms should be a range"),
        }
    }

    #[test]
    fn invalid_paths_do_not_resolve() {
        assert!(resolve(&[99]).is_none());
        // Cannot descend through a terminal.
        assert!(resolve(&[0, 0, 0]).is_none());
    }

    #[test]
    fn tree_fits_path_capacity() {
        fn depth(node: &MenuNode) -> usize {
            node.children().iter().map(|c| 1 + depth(c)).max().unwrap_or(0)
        }
        assert_eq!(depth(&MENU), MENU_DEPTH);
    }
}
