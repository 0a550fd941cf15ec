//! # RPS decode rules
//!
//! Repeated Switch telegrams carry one data byte. Its meaning depends on the
//! T21 and NU status bits:
//!
//! | NU | Format | Data byte |
//! |----|--------|-----------|
//! | 1 | N-message | up to two 3-bit action codes (DB7..5, DB3..1 if DB0), DB4 = pressed |
//! | 0 | U-message | DB7..5 = count of buttons still pressed, DB4 = energy bow |
//!
//! T21 selects between 2-rocker (set) and 4-rocker (clear) switches.

use std::fmt;

use crate::esp3::protocol::{STATUS_NU, STATUS_T21};
use crate::esp3::{RadioTelegram, Rorg};

/// Energy bow / pressed bit of the data byte
const ENERGY_BOW: u8 = 0x10;

/// Data byte and status of an RPS telegram
fn rps_fields(telegram: &RadioTelegram<'_>) -> Option<(u8, u8)> {
    if telegram.rorg() != Rorg::Rps {
        return None;
    }
    Some((telegram.data_byte()?, telegram.status()))
}

/// Action codes of an N-message, first action first
fn n_message_actions(data: u8) -> impl Iterator<Item = u8> {
    let second = data & 0x01 != 0;
    [1u32, 0]
        .into_iter()
        .take(if second { 2 } else { 1 })
        .map(move |i| (data >> (4 * i + 1)) & 0x07)
}

/// Number of rockers affected by a U-message
///
/// `b` is the count code from DB7..5. A 2-rocker switch only signals
/// "none" (0) or "3 or 4 buttons" (3); a 4-rocker switch reports half the
/// button count, rounded up.
pub fn affected_rockers(b: u8, two_rockers: bool) -> u8 {
    let all = if two_rockers { 2 } else { 4 };
    match (two_rockers, b) {
        (_, 0) => all,
        (true, 3) => 2,
        (true, _) => 0,
        (false, b) => (b + 1) >> 1,
    }
}

/// Decode one half of one rocker
///
/// Returns the new pressed state, or `None` if the telegram does not
/// concern this button. A U-message only ever reports the release of all
/// buttons at once.
pub fn decode_rocker(telegram: &RadioTelegram<'_>, rocker: u8, up: bool) -> Option<bool> {
    let (data, status) = rps_fields(telegram)?;

    if status & STATUS_NU != 0 {
        n_message_actions(data)
            .filter(|a| (a >> 1) & 0x03 == rocker && (a & 0x01 != 0) == up)
            .last()
            .map(|_| data & ENERGY_BOW != 0)
    } else {
        let b = (data >> 5) & 0x07;
        (b == 0 && data & ENERGY_BOW == 0).then_some(false)
    }
}

/// Window handle position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Not closed (fully open or tilted)
    pub open: bool,
    /// Tilted open
    pub tilted: bool,
}

/// Decode a window handle position message
///
/// Only U-messages with T21 set carry a handle position.
pub fn decode_window_handle(telegram: &RadioTelegram<'_>) -> Option<WindowState> {
    let (data, status) = rps_fields(telegram)?;
    if status & STATUS_NU != 0 || status & STATUS_T21 == 0 {
        return None;
    }

    let tilted = data & 0xF0 == 0xD0;
    let closed = data & 0xF0 == 0xF0;
    Some(WindowState { open: !closed, tilted })
}

/// Decode a key card switch, returns whether a card is inserted
pub fn decode_card_key(telegram: &RadioTelegram<'_>, erp2: bool) -> Option<bool> {
    let (data, status) = rps_fields(telegram)?;
    if erp2 {
        Some(data & 0x04 != 0)
    } else {
        Some(status & STATUS_NU != 0 && data == 0x70)
    }
}

/// Smoke detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmokeState {
    /// Smoke alarm active
    pub alarm: bool,
    /// Battery below operating threshold
    pub battery_low: bool,
}

/// Decode a smoke detector telegram
///
/// | Data | Status | Meaning |
/// |------|--------|---------|
/// | 0x10 | 0x30 | alarm on |
/// | 0x00 | 0x20 | alarm off, battery ok |
/// | 0x30 | 0x30 | battery low |
pub fn decode_smoke_detector(telegram: &RadioTelegram<'_>) -> Option<SmokeState> {
    let (data, _) = rps_fields(telegram)?;
    Some(SmokeState {
        alarm: data & 0x30 == 0x10,
        battery_low: data & 0x30 == 0x30,
    })
}

/// Action flags reported for one rocker, used for packet descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RpsAction(u8);

impl RpsAction {
    /// No action for this rocker
    pub const NONE: u8 = 0x00;
    /// Lower half (on / down)
    pub const ON_OR_DOWN: u8 = 0x01;
    /// Upper half (off / up)
    pub const OFF_OR_UP: u8 = 0x02;
    /// Several buttons at once (U-message)
    pub const MULTIPLE: u8 = 0x04;
    /// Pressed
    pub const PRESSED: u8 = 0x10;
    /// Released
    pub const RELEASED: u8 = 0x20;

    /// Raw flag bits
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if all bits of `flags` are set
    pub fn contains(self, flags: u8) -> bool {
        self.0 & flags == flags
    }

    /// True if no action concerns this rocker
    pub fn is_none(self) -> bool {
        self.0 == Self::NONE
    }
}

impl fmt::Display for RpsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }
        let names = [
            (Self::ON_OR_DOWN, "on/down"),
            (Self::OFF_OR_UP, "off/up"),
            (Self::MULTIPLE, "multiple"),
            (Self::PRESSED, "pressed"),
            (Self::RELEASED, "released"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.0 & flag != 0 {
                if !first {
                    write!(f, "+")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Summarize what an RPS telegram does to one rocker
pub fn rps_action(telegram: &RadioTelegram<'_>, rocker: u8) -> RpsAction {
    let Some((data, status)) = rps_fields(telegram) else {
        return RpsAction::default();
    };
    if rocker >= telegram.num_rockers() {
        return RpsAction::default();
    }

    let mut action = RpsAction::NONE;
    if status & STATUS_NU != 0 {
        for a in n_message_actions(data) {
            if (a >> 1) & 0x03 == rocker {
                action |= if a & 0x01 != 0 {
                    RpsAction::OFF_OR_UP
                } else {
                    RpsAction::ON_OR_DOWN
                };
            }
        }
    } else {
        let b = (data >> 5) & 0x07;
        if rocker < affected_rockers(b, status & STATUS_T21 != 0) {
            action |= RpsAction::MULTIPLE;
        }
    }

    if action != RpsAction::NONE {
        action |= if data & ENERGY_BOW != 0 {
            RpsAction::PRESSED
        } else {
            RpsAction::RELEASED
        };
    }
    RpsAction(action)
}
