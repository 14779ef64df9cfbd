//! Object event kinds.

use std::fmt;

/// Event categories, numbered the way the object table stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Create = 0,
    Destroy = 1,
    Alarm = 2,
    Step = 3,
    Collision = 4,
    Keyboard = 5,
    Mouse = 6,
    Other = 7,
    Draw = 8,
    KeyPress = 9,
    KeyRelease = 10,
    Trigger = 11,
    CleanUp = 12,
    Gesture = 13,
    PreCreate = 14,
}

/// Step event subtypes.
pub const STEP_NORMAL: u32 = 0;
pub const STEP_BEGIN: u32 = 1;
pub const STEP_END: u32 = 2;

impl EventType {
    pub const ALL: [EventType; 15] = [
        EventType::Create,
        EventType::Destroy,
        EventType::Alarm,
        EventType::Step,
        EventType::Collision,
        EventType::Keyboard,
        EventType::Mouse,
        EventType::Other,
        EventType::Draw,
        EventType::KeyPress,
        EventType::KeyRelease,
        EventType::Trigger,
        EventType::CleanUp,
        EventType::Gesture,
        EventType::PreCreate,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Destroy => "destroy",
            EventType::Alarm => "alarm",
            EventType::Step => "step",
            EventType::Collision => "collision",
            EventType::Keyboard => "keyboard",
            EventType::Mouse => "mouse",
            EventType::Other => "other",
            EventType::Draw => "draw",
            EventType::KeyPress => "key_press",
            EventType::KeyRelease => "key_release",
            EventType::Trigger => "trigger",
            EventType::CleanUp => "clean_up",
            EventType::Gesture => "gesture",
            EventType::PreCreate => "pre_create",
        }
    }
}

impl TryFrom<usize> for EventType {
    type Error = usize;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(value).copied().ok_or(value)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The handler currently running, kept so `event_inherited` can find the
/// next handler up the parent chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    pub instance: u32,
    /// Object that declares the running handler.
    pub owner: usize,
    pub event: EventType,
    pub subtype: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_matches_the_table() {
        for (i, event) in EventType::ALL.iter().enumerate() {
            assert_eq!(event.index(), i);
            assert_eq!(EventType::try_from(i), Ok(*event));
        }
        assert_eq!(EventType::try_from(15), Err(15));
        assert_eq!(EventType::PreCreate.to_string(), "pre_create");
    }
}
