//! Raw interaction events observed on the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::Error;

/// Kind of raw interaction signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    MouseDown,
    MouseMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    Focus,
    Blur,
    /// Page became visible again (tab switch back, restore from minimize).
    #[serde(rename = "visible")]
    VisibilityShown,
    /// Page got hidden. The idle clock keeps running.
    #[serde(rename = "hidden")]
    VisibilityHidden,
}

impl EventKind {
    /// Pointer, keyboard, scroll, touch and focus signals.
    pub const ALL_INPUT: [EventKind; 8] = [
        EventKind::MouseDown,
        EventKind::MouseMove,
        EventKind::KeyPress,
        EventKind::Scroll,
        EventKind::TouchStart,
        EventKind::Click,
        EventKind::Focus,
        EventKind::Blur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MouseDown => "mousedown",
            Self::MouseMove => "mousemove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::VisibilityShown => "visible",
            Self::VisibilityHidden => "hidden",
        }
    }

    /// Visibility changes bypass the configured event set.
    pub fn is_visibility(&self) -> bool {
        matches!(self, Self::VisibilityShown | Self::VisibilityHidden)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mousedown" => Ok(Self::MouseDown),
            "mousemove" => Ok(Self::MouseMove),
            "keypress" => Ok(Self::KeyPress),
            "scroll" => Ok(Self::Scroll),
            "touchstart" => Ok(Self::TouchStart),
            "click" => Ok(Self::Click),
            "focus" => Ok(Self::Focus),
            "blur" => Ok(Self::Blur),
            "visible" => Ok(Self::VisibilityShown),
            "hidden" => Ok(Self::VisibilityHidden),
            other => Err(Error::InvalidEventKind(other.to_string())),
        }
    }
}

/// A raw event as published by the host.
#[derive(Debug, Clone, Copy)]
pub struct RawEvent {
    pub kind: EventKind,
    pub at: Instant,
}

impl RawEvent {
    pub fn new(kind: EventKind, at: Instant) -> Self {
        Self { kind, at }
    }
}
