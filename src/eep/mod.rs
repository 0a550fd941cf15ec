//! # EnOcean Equipment Profiles
//!
//! Maps an EEP (RORG-FUNC-TYPE) to the logical channels a device provides and
//! the decode rule each channel applies to incoming telegrams.
//!
//! Decoders form a closed set of variants selected by profile id; each one
//! turns a [`RadioTelegram`] into at most one [`ChannelEvent`] without side
//! effects, so decoding the same telegram twice gives the same result.

pub mod rps;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::esp3::RadioTelegram;

/// 24-bit equipment profile identifier `RORG:FUNC:TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EepProfile(u32);

impl EepProfile {
    /// Mask selecting RORG and FUNC, ignoring TYPE
    pub const IGNORE_TYPE_MASK: u32 = 0xFF_FF00;

    /// F6-02-xx dual rocker switch (function match)
    pub const DUAL_ROCKER: EepProfile = EepProfile(0xF6_0200);
    /// F6-02-FF generic dual rocker switch variant
    pub const DUAL_ROCKER_ANY: EepProfile = EepProfile(0xF6_02FF);
    /// F6-03-xx quad rocker switch (function match)
    pub const QUAD_ROCKER: EepProfile = EepProfile(0xF6_0300);
    /// F6-04-xx key card activated switch (function match)
    pub const CARD_KEY: EepProfile = EepProfile(0xF6_0400);
    /// F6-04-01 key card activated switch (ERP1)
    pub const CARD_KEY_ERP1: EepProfile = EepProfile(0xF6_0401);
    /// F6-04-02 key card activated switch (ERP2)
    pub const CARD_KEY_ERP2: EepProfile = EepProfile(0xF6_0402);
    /// F6-05-C0 smoke detector (vendor pseudo profile, Eltako FRW / alphaEOS GUARD)
    pub const SMOKE_DETECTOR: EepProfile = EepProfile(0xF6_05C0);
    /// F6-10-00 window handle
    pub const WINDOW_HANDLE: EepProfile = EepProfile(0xF6_1000);

    /// Profiles an RPS device can be switched between after learn-in
    pub const RPS_VARIANTS: [EepProfile; 4] = [
        Self::DUAL_ROCKER_ANY,
        Self::CARD_KEY_ERP1,
        Self::CARD_KEY_ERP2,
        Self::SMOKE_DETECTOR,
    ];

    /// Build a profile from its three parts
    pub const fn new(rorg: u8, func: u8, eep_type: u8) -> Self {
        Self(((rorg as u32) << 16) | ((func as u32) << 8) | eep_type as u32)
    }

    /// Build a profile from a raw value (upper byte ignored)
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & 0xFF_FFFF)
    }

    /// Raw 24-bit value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// RORG part
    pub const fn rorg(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// FUNC part
    pub const fn func(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// TYPE part
    pub const fn eep_type(self) -> u8 {
        self.0 as u8
    }

    /// Profile with the TYPE byte cleared
    pub const fn function(self) -> Self {
        Self(self.0 & Self::IGNORE_TYPE_MASK)
    }

    /// True if both profiles share RORG and FUNC
    pub fn matches_function(self, other: EepProfile) -> bool {
        self.function() == other.function()
    }

    /// True if an RPS device with this profile may be switched to another variant
    pub fn is_rps_variant(self) -> bool {
        self.matches_function(Self::DUAL_ROCKER) || Self::RPS_VARIANTS.contains(&self)
    }
}

impl fmt::Display for EepProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.rorg(), self.func(), self.eep_type())
    }
}

/// Device families with a decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Rocker switch with 2 or 4 rockers, one subdevice per rocker
    Rocker {
        /// Number of rockers
        rockers: u8,
    },
    /// Window handle
    WindowHandle,
    /// Key card activated switch
    CardKey {
        /// ERP2 variant reports card state in data bit 2
        erp2: bool,
    },
    /// Smoke detector
    SmokeDetector,
}

impl ProfileKind {
    /// Look up the device family for a profile
    ///
    /// Rocker switches and card key switches match regardless of TYPE.
    pub fn from_profile(profile: EepProfile) -> Option<Self> {
        let function = profile.function();
        if function == EepProfile::DUAL_ROCKER {
            Some(ProfileKind::Rocker { rockers: 2 })
        } else if function == EepProfile::QUAD_ROCKER {
            Some(ProfileKind::Rocker { rockers: 4 })
        } else if profile == EepProfile::WINDOW_HANDLE {
            Some(ProfileKind::WindowHandle)
        } else if function == EepProfile::CARD_KEY {
            Some(ProfileKind::CardKey {
                erp2: profile == EepProfile::CARD_KEY_ERP2,
            })
        } else if profile == EepProfile::SMOKE_DETECTOR {
            Some(ProfileKind::SmokeDetector)
        } else {
            None
        }
    }

    /// Number of logical devices one physical device of this family provides
    pub fn subdevice_count(self) -> u8 {
        match self {
            ProfileKind::Rocker { rockers } => rockers,
            _ => 1,
        }
    }

    /// Short description of the device family
    pub fn description(self) -> &'static str {
        match self {
            ProfileKind::Rocker { .. } => "rocker switch",
            ProfileKind::WindowHandle => "window handle",
            ProfileKind::CardKey { .. } => "key card switch",
            ProfileKind::SmokeDetector => "smoke detector",
        }
    }

    /// Channels of one subdevice
    ///
    /// Returns an empty list if `subdevice` is out of range.
    pub fn channels(self, subdevice: u8) -> Vec<ChannelSpec> {
        if subdevice >= self.subdevice_count() {
            return Vec::new();
        }

        match self {
            ProfileKind::Rocker { .. } => vec![
                ChannelSpec::button("Down key", ChannelDecoder::RockerButton { rocker: subdevice, up: false }),
                ChannelSpec::button("Up key", ChannelDecoder::RockerButton { rocker: subdevice, up: true }),
            ],
            ProfileKind::WindowHandle => vec![
                ChannelSpec::input("Window open", InputType::Generic, ChannelDecoder::WindowHandle { tilted: false }),
                ChannelSpec::input("Window tilted", InputType::Generic, ChannelDecoder::WindowHandle { tilted: true }),
            ],
            ProfileKind::CardKey { erp2 } => vec![ChannelSpec::input(
                "Card inserted",
                InputType::Generic,
                ChannelDecoder::CardKey { erp2 },
            )],
            ProfileKind::SmokeDetector => vec![
                ChannelSpec::input("Smoke alarm", InputType::Smoke, ChannelDecoder::SmokeDetector { battery: false }),
                ChannelSpec::input("Low battery", InputType::LowBattery, ChannelDecoder::SmokeDetector { battery: true }),
            ],
        }
    }
}

/// Meaning of a binary input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// No predefined meaning
    Generic,
    /// Smoke alarm
    Smoke,
    /// Battery low warning
    LowBattery,
}

/// Kind of behaviour a channel drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Push button (press/release)
    Button,
    /// Binary input (on/off state)
    BinaryInput(InputType),
}

/// Static description of one logical channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Hardware name
    pub name: &'static str,
    /// Behaviour kind
    pub kind: ChannelKind,
    /// Decode rule
    pub decoder: ChannelDecoder,
}

impl ChannelSpec {
    fn button(name: &'static str, decoder: ChannelDecoder) -> Self {
        Self { name, kind: ChannelKind::Button, decoder }
    }

    fn input(name: &'static str, input: InputType, decoder: ChannelDecoder) -> Self {
        Self { name, kind: ChannelKind::BinaryInput(input), decoder }
    }
}

/// Event produced by a decoder for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Button pressed or released
    Button {
        /// True when pressed
        pressed: bool,
    },
    /// Binary input state
    Input {
        /// True when active
        active: bool,
    },
}

/// Decode rule bound to one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDecoder {
    /// One half of one rocker
    RockerButton {
        /// Rocker index (0 = A, 1 = B, ...)
        rocker: u8,
        /// Upper half of the rocker
        up: bool,
    },
    /// Window handle open or tilted state
    WindowHandle {
        /// Report tilted state instead of open state
        tilted: bool,
    },
    /// Key card inserted state
    CardKey {
        /// ERP2 telegram format
        erp2: bool,
    },
    /// Smoke alarm or battery state
    SmokeDetector {
        /// Report battery state instead of alarm state
        battery: bool,
    },
}

impl ChannelDecoder {
    /// Decode a telegram for this channel
    ///
    /// Returns `None` if the telegram does not concern this channel.
    pub fn decode(&self, telegram: &RadioTelegram<'_>) -> Option<ChannelEvent> {
        match *self {
            ChannelDecoder::RockerButton { rocker, up } => {
                rps::decode_rocker(telegram, rocker, up).map(|pressed| ChannelEvent::Button { pressed })
            }
            ChannelDecoder::WindowHandle { tilted } => rps::decode_window_handle(telegram)
                .map(|state| ChannelEvent::Input {
                    active: if tilted { state.tilted } else { state.open },
                }),
            ChannelDecoder::CardKey { erp2 } => {
                rps::decode_card_key(telegram, erp2).map(|active| ChannelEvent::Input { active })
            }
            ChannelDecoder::SmokeDetector { battery } => rps::decode_smoke_detector(telegram)
                .map(|state| ChannelEvent::Input {
                    active: if battery { state.battery_low } else { state.alarm },
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esp3::test_util::rps_packet;

    #[test]
    fn test_profile_parts() {
        let profile = EepProfile::new(0xF6, 0x02, 0x01);
        assert_eq!(profile.raw(), 0xF6_0201);
        assert_eq!(profile.rorg(), 0xF6);
        assert_eq!(profile.func(), 0x02);
        assert_eq!(profile.eep_type(), 0x01);
        assert_eq!(profile.function(), EepProfile::DUAL_ROCKER);
        assert_eq!(profile.to_string(), "F6-02-01");
        assert_eq!(EepProfile::from_raw(0xFFF6_05C0), EepProfile::SMOKE_DETECTOR);
    }

    #[test]
    fn test_profile_table() {
        assert_eq!(
            ProfileKind::from_profile(EepProfile::new(0xF6, 0x02, 0x02)),
            Some(ProfileKind::Rocker { rockers: 2 })
        );
        assert_eq!(
            ProfileKind::from_profile(EepProfile::new(0xF6, 0x03, 0x01)),
            Some(ProfileKind::Rocker { rockers: 4 })
        );
        assert_eq!(ProfileKind::from_profile(EepProfile::WINDOW_HANDLE), Some(ProfileKind::WindowHandle));
        assert_eq!(ProfileKind::from_profile(EepProfile::new(0xF6, 0x10, 0x01)), None);
        assert_eq!(
            ProfileKind::from_profile(EepProfile::CARD_KEY_ERP1),
            Some(ProfileKind::CardKey { erp2: false })
        );
        assert_eq!(
            ProfileKind::from_profile(EepProfile::CARD_KEY_ERP2),
            Some(ProfileKind::CardKey { erp2: true })
        );
        assert_eq!(ProfileKind::from_profile(EepProfile::SMOKE_DETECTOR), Some(ProfileKind::SmokeDetector));
        assert_eq!(ProfileKind::from_profile(EepProfile::new(0xF6, 0x05, 0x01)), None);
        assert_eq!(ProfileKind::from_profile(EepProfile::new(0xA5, 0x02, 0x05)), None);
    }

    #[test]
    fn test_channel_layout() {
        let rocker = ProfileKind::Rocker { rockers: 4 };
        assert_eq!(rocker.subdevice_count(), 4);
        let channels = rocker.channels(3);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].decoder, ChannelDecoder::RockerButton { rocker: 3, up: false });
        assert_eq!(channels[1].decoder, ChannelDecoder::RockerButton { rocker: 3, up: true });
        assert!(rocker.channels(4).is_empty());

        assert_eq!(ProfileKind::WindowHandle.channels(0).len(), 2);
        assert!(ProfileKind::WindowHandle.channels(1).is_empty());
        assert_eq!(
            ProfileKind::SmokeDetector.channels(0)[1].kind,
            ChannelKind::BinaryInput(InputType::LowBattery)
        );
    }

    #[test]
    fn test_rps_variants() {
        assert!(EepProfile::new(0xF6, 0x02, 0x01).is_rps_variant());
        assert!(EepProfile::SMOKE_DETECTOR.is_rps_variant());
        assert!(!EepProfile::WINDOW_HANDLE.is_rps_variant());
        assert!(!EepProfile::new(0xF6, 0x03, 0x01).is_rps_variant());
    }

    #[test]
    fn test_decoder_is_idempotent() {
        let packet = rps_packet(0x30, 0x0086_B81A, 0x30);
        let telegram = packet.radio().unwrap();

        let decoders = [
            ChannelDecoder::RockerButton { rocker: 1, up: true },
            ChannelDecoder::WindowHandle { tilted: false },
            ChannelDecoder::CardKey { erp2: true },
            ChannelDecoder::SmokeDetector { battery: false },
        ];
        for decoder in decoders {
            assert_eq!(decoder.decode(&telegram), decoder.decode(&telegram));
        }
    }

    #[test]
    fn test_decoder_dispatch() {
        // N-message, rocker B up pressed: action 3 in DB7..5, energy bow set
        let packet = rps_packet(0x70, 1, 0x30);
        let telegram = packet.radio().unwrap();

        assert_eq!(
            ChannelDecoder::RockerButton { rocker: 1, up: true }.decode(&telegram),
            Some(ChannelEvent::Button { pressed: true })
        );
        assert_eq!(ChannelDecoder::RockerButton { rocker: 1, up: false }.decode(&telegram), None);
        assert_eq!(
            ChannelDecoder::CardKey { erp2: false }.decode(&telegram),
            Some(ChannelEvent::Input { active: true })
        );
    }
}
