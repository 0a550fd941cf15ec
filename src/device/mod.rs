//! # Logical Devices
//!
//! One physical EnOcean device is represented by one or more logical devices
//! (one per subdevice index, e.g. one per rocker of a switch). Each logical
//! device owns an ordered list of channel handlers, each binding a decode
//! rule to a behaviour sink.

pub mod behaviour;
pub mod store;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::eep::{ChannelEvent, ChannelKind, ChannelSpec, EepProfile, ProfileKind};
use crate::error::{EnoceanError, Result};
use crate::esp3::{EnoceanAddress, RadioTelegram};
use behaviour::{BehaviourSink, ChannelInfo, SinkFactory};

/// Persisted identity of one logical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Physical device address
    pub address: EnoceanAddress,
    /// Subdevice index
    pub subdevice: u8,
    /// Equipment profile
    pub profile: EepProfile,
    /// Manufacturer ID (0 if unknown)
    #[serde(default)]
    pub manufacturer: u16,
}

impl DeviceRecord {
    /// Unique key within a store
    pub fn key(&self) -> (EnoceanAddress, u8) {
        (self.address, self.subdevice)
    }
}

/// Binds one decode rule to one behaviour sink
pub struct ChannelHandler {
    channel: usize,
    spec: ChannelSpec,
    sink: Box<dyn BehaviourSink>,
    pressed: bool,
}

impl std::fmt::Debug for ChannelHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandler")
            .field("channel", &self.channel)
            .field("spec", &self.spec)
            .field("pressed", &self.pressed)
            .finish_non_exhaustive()
    }
}

impl ChannelHandler {
    pub fn new(channel: usize, spec: ChannelSpec, sink: Box<dyn BehaviourSink>) -> Self {
        Self {
            channel,
            spec,
            sink,
            pressed: false,
        }
    }

    /// Channel index within its logical device
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Hardware name
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Behaviour kind
    pub fn kind(&self) -> ChannelKind {
        self.spec.kind
    }

    /// Decode a telegram and forward the result to the sink
    ///
    /// Buttons only forward real changes of their pressed state; binary
    /// inputs forward every decoded state.
    pub fn handle_radio_telegram(&mut self, telegram: &RadioTelegram<'_>) {
        match self.spec.decoder.decode(telegram) {
            Some(ChannelEvent::Button { pressed }) => {
                if pressed != self.pressed {
                    debug!(
                        "{} {:08X} channel {}: changed state to {}",
                        self.spec.name,
                        telegram.sender(),
                        self.channel,
                        if pressed { "PRESSED" } else { "RELEASED" }
                    );
                    self.sink.button_action(pressed);
                    self.pressed = pressed;
                }
            }
            Some(ChannelEvent::Input { active }) => {
                self.sink.update_input_state(active);
            }
            None => {}
        }
    }
}

/// One subdevice of a physical EnOcean device
pub struct LogicalDevice {
    record: DeviceRecord,
    kind: ProfileKind,
    handlers: Vec<ChannelHandler>,
}

impl std::fmt::Debug for LogicalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalDevice")
            .field("record", &self.record)
            .field("kind", &self.kind)
            .field("channels", &self.handlers.len())
            .finish()
    }
}

impl LogicalDevice {
    /// Build the logical device described by a record
    ///
    /// # Errors
    ///
    /// Returns [`EnoceanError::UnsupportedProfile`] if no decoder exists for
    /// the profile or the subdevice index is out of range for it.
    pub fn new(record: DeviceRecord, sinks: &mut dyn SinkFactory) -> Result<Self> {
        let kind = ProfileKind::from_profile(record.profile)
            .ok_or(EnoceanError::UnsupportedProfile(record.profile))?;
        let specs = kind.channels(record.subdevice);
        if specs.is_empty() {
            return Err(EnoceanError::UnsupportedProfile(record.profile));
        }

        let handlers = specs
            .into_iter()
            .enumerate()
            .map(|(channel, spec)| {
                let info = ChannelInfo {
                    address: record.address,
                    subdevice: record.subdevice,
                    channel,
                    name: spec.name,
                    kind: spec.kind,
                };
                ChannelHandler::new(channel, spec, sinks.create_sink(&info))
            })
            .collect();

        Ok(Self { record, kind, handlers })
    }

    pub fn record(&self) -> &DeviceRecord {
        &self.record
    }

    pub fn address(&self) -> EnoceanAddress {
        self.record.address
    }

    pub fn subdevice(&self) -> u8 {
        self.record.subdevice
    }

    pub fn profile(&self) -> EepProfile {
        self.record.profile
    }

    /// Short description, e.g. "rocker switch"
    pub fn function_description(&self) -> &'static str {
        self.kind.description()
    }

    pub fn handlers(&self) -> &[ChannelHandler] {
        &self.handlers
    }

    /// Let every channel of this device handle a telegram
    pub fn handle_radio_telegram(&mut self, telegram: &RadioTelegram<'_>) {
        for handler in &mut self.handlers {
            handler.handle_radio_telegram(telegram);
        }
    }
}

/// Create all logical devices for a newly learned-in physical device
///
/// # Errors
///
/// Returns [`EnoceanError::UnsupportedProfile`] if the profile has no decoder.
pub fn create_devices(
    address: EnoceanAddress,
    profile: EepProfile,
    manufacturer: u16,
    sinks: &mut dyn SinkFactory,
) -> Result<Vec<LogicalDevice>> {
    let kind = ProfileKind::from_profile(profile).ok_or(EnoceanError::UnsupportedProfile(profile))?;

    let devices = (0..kind.subdevice_count())
        .map(|subdevice| {
            LogicalDevice::new(
                DeviceRecord {
                    address,
                    subdevice,
                    profile,
                    manufacturer,
                },
                sinks,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Created {} logical {} device(s) for {:08X} ({})",
        devices.len(),
        kind.description(),
        address,
        profile
    );
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::behaviour::recording::RecordingFactory;
    use super::behaviour::MockBehaviourSink;
    use super::*;
    use crate::eep::ChannelDecoder;
    use crate::esp3::protocol::{STATUS_NU, STATUS_T21};
    use crate::esp3::test_util::rps_packet;

    const ADDR: EnoceanAddress = 0x0086_B81A;

    #[test]
    fn test_create_rocker_devices() {
        let mut sinks = RecordingFactory::default();
        let devices = create_devices(ADDR, EepProfile::new(0xF6, 0x03, 0x01), 0, &mut sinks).unwrap();

        assert_eq!(devices.len(), 4);
        for (i, device) in devices.iter().enumerate() {
            assert_eq!(device.subdevice(), i as u8);
            assert_eq!(device.handlers().len(), 2);
            assert_eq!(device.function_description(), "rocker switch");
        }
        assert_eq!(sinks.created.lock().unwrap().len(), 8);
        assert_eq!(devices[2].handlers()[1].name(), "Up key");
    }

    #[test]
    fn test_create_unsupported_profile() {
        let mut sinks = RecordingFactory::default();
        let result = create_devices(ADDR, EepProfile::new(0xA5, 0x02, 0x05), 0, &mut sinks);
        assert!(matches!(result, Err(EnoceanError::UnsupportedProfile(p)) if p.raw() == 0xA5_0205));
        assert!(sinks.created.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subdevice_out_of_range() {
        let mut sinks = RecordingFactory::default();
        let record = DeviceRecord {
            address: ADDR,
            subdevice: 1,
            profile: EepProfile::WINDOW_HANDLE,
            manufacturer: 0,
        };
        assert!(LogicalDevice::new(record, &mut sinks).is_err());
    }

    #[test]
    fn test_button_forwards_only_changes() {
        let mut sink = MockBehaviourSink::new();
        let mut seq = mockall::Sequence::new();
        sink.expect_button_action()
            .withf(|p| *p)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_button_action()
            .withf(|p| !*p)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let spec = ProfileKind::Rocker { rockers: 2 }.channels(0)[1];
        assert_eq!(spec.decoder, ChannelDecoder::RockerButton { rocker: 0, up: true });
        let mut handler = ChannelHandler::new(1, spec, Box::new(sink));

        let press = rps_packet(0x30, ADDR, STATUS_T21 | STATUS_NU);
        let release = rps_packet(0x20, ADDR, STATUS_T21 | STATUS_NU);
        handler.handle_radio_telegram(&press.radio().unwrap());
        handler.handle_radio_telegram(&press.radio().unwrap());
        handler.handle_radio_telegram(&release.radio().unwrap());
        handler.handle_radio_telegram(&release.radio().unwrap());
    }

    #[test]
    fn test_input_forwards_every_state() {
        let mut sink = MockBehaviourSink::new();
        sink.expect_update_input_state()
            .withf(|a| *a)
            .times(2)
            .return_const(());

        let spec = ProfileKind::CardKey { erp2: true }.channels(0)[0];
        let mut handler = ChannelHandler::new(0, spec, Box::new(sink));

        let inserted = rps_packet(0x04, ADDR, 0x00);
        handler.handle_radio_telegram(&inserted.radio().unwrap());
        handler.handle_radio_telegram(&inserted.radio().unwrap());
    }

    #[test]
    fn test_window_handle_device_reports_both_channels() {
        let mut sinks = RecordingFactory::default();
        let mut devices = create_devices(ADDR, EepProfile::WINDOW_HANDLE, 0, &mut sinks).unwrap();
        assert_eq!(devices.len(), 1);

        let tilted = rps_packet(0xD0, ADDR, STATUS_T21);
        devices[0].handle_radio_telegram(&tilted.radio().unwrap());

        let events: Vec<_> = sinks.events().into_iter().map(|(i, e)| (i.channel, e)).collect();
        assert_eq!(
            events,
            vec![
                (0, ChannelEvent::Input { active: true }),
                (1, ChannelEvent::Input { active: true }),
            ]
        );
    }
}
