//! # Radio Packet Dispatcher
//!
//! Address-keyed registry of logical devices. Completed radio packets are
//! routed to every logical device registered for the sender, or, while learn
//! mode is enabled, interpreted as learn-in / learn-out actions.
//!
//! Learn mode is single-shot: the first telegram with usable teach-in
//! information performs one learn action and disables learn mode again, so
//! the repeated telegrams of a held button cannot toggle pairing.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::device::behaviour::SinkFactory;
use crate::device::store::DeviceStore;
use crate::device::{create_devices, DeviceRecord, LogicalDevice};
use crate::eep::EepProfile;
use crate::error::{EnoceanError, Result};
use crate::esp3::{EnoceanAddress, Esp3Packet, RadioTelegram};

/// Default minimum signal strength for implicit (RPS) teach-in
///
/// About 10-20 cm from the receiver module.
pub const DEFAULT_MIN_LEARN_DBM: i32 = -50;

/// Outcome of a learn action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnEvent {
    /// New device registered
    LearnedIn {
        address: EnoceanAddress,
        profile: EepProfile,
        /// Number of logical devices created
        devices: usize,
    },
    /// Known device unpaired, stored records kept
    LearnedOut { address: EnoceanAddress },
    /// Teach-in received but no logical device could be created
    Unsupported {
        address: EnoceanAddress,
        profile: Option<EepProfile>,
    },
}

/// Routes radio telegrams to logical devices and handles learn mode
pub struct Dispatcher {
    devices: BTreeMap<EnoceanAddress, Vec<LogicalDevice>>,
    learning: bool,
    min_learn_dbm: i32,
    sinks: Box<dyn SinkFactory>,
    store: Box<dyn DeviceStore>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("addresses", &self.devices.len())
            .field("learning", &self.learning)
            .field("min_learn_dbm", &self.min_learn_dbm)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher, learn mode disabled
    pub fn new(sinks: Box<dyn SinkFactory>, store: Box<dyn DeviceStore>, min_learn_dbm: i32) -> Self {
        Self {
            devices: BTreeMap::new(),
            learning: false,
            min_learn_dbm,
            sinks,
            store,
        }
    }

    /// Enable or disable learn mode
    pub fn set_learn_mode(&mut self, enable: bool) {
        if enable != self.learning {
            info!("Learn mode {}", if enable { "enabled" } else { "disabled" });
        }
        self.learning = enable;
    }

    pub fn is_learning(&self) -> bool {
        self.learning
    }

    pub fn min_learn_dbm(&self) -> i32 {
        self.min_learn_dbm
    }

    /// Total number of registered logical devices
    pub fn device_count(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }

    /// Logical devices registered for an address, ordered by registration
    pub fn devices_for(&self, address: EnoceanAddress) -> &[LogicalDevice] {
        self.devices.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Handle the outcome of one framed packet
    ///
    /// Returns the learn action performed, if any.
    pub fn handle_radio_packet(
        &mut self,
        packet: std::result::Result<Esp3Packet, EnoceanError>,
    ) -> Option<LearnEvent> {
        let packet = match packet {
            Ok(packet) => packet,
            Err(e) => {
                info!("Radio packet error: {}", e);
                return None;
            }
        };
        let Some(telegram) = packet.radio() else {
            debug!("Ignoring non-radio packet of type {:?}", packet.packet_type());
            return None;
        };

        if self.learning {
            self.handle_learn_telegram(&telegram)
        } else {
            self.route(&telegram);
            None
        }
    }

    fn route(&mut self, telegram: &RadioTelegram<'_>) {
        let sender = telegram.sender();
        match self.devices.get_mut(&sender) {
            Some(devices) => {
                for device in devices {
                    device.handle_radio_telegram(telegram);
                }
            }
            None => debug!("Telegram from unknown sender {:08X}", sender),
        }
    }

    fn handle_learn_telegram(&mut self, telegram: &RadioTelegram<'_>) -> Option<LearnEvent> {
        if !telegram.has_teach_info(self.min_learn_dbm) {
            debug!(
                "No teach-in info from {:08X} ({} dBm), still learning",
                telegram.sender(),
                telegram.signal_strength_dbm()
            );
            return None;
        }

        info!("Received learn telegram while learn mode enabled:\n{}", telegram.packet());
        let address = telegram.sender();
        let event = if self.devices.contains_key(&address) {
            self.unpair_devices_by_address(address, false);
            LearnEvent::LearnedOut { address }
        } else {
            self.learn_in(telegram)
        };

        self.set_learn_mode(false);
        Some(event)
    }

    fn learn_in(&mut self, telegram: &RadioTelegram<'_>) -> LearnEvent {
        let address = telegram.sender();
        let Some(profile) = telegram.eep_profile() else {
            info!("Teach-in from {:08X} without usable profile", address);
            return LearnEvent::Unsupported { address, profile: None };
        };

        match create_devices(address, profile, telegram.manufacturer(), self.sinks.as_mut()) {
            Ok(devices) if !devices.is_empty() => {
                let count = devices.len();
                for device in &devices {
                    if let Err(e) = self.store.remember(*device.record()) {
                        warn!("Failed to store device {:08X}/{}: {}", address, device.subdevice(), e);
                    }
                }
                self.devices.insert(address, devices);
                info!("Learned in {:08X} ({}, {} logical devices)", address, profile, count);
                LearnEvent::LearnedIn {
                    address,
                    profile,
                    devices: count,
                }
            }
            Ok(_) => LearnEvent::Unsupported {
                address,
                profile: Some(profile),
            },
            Err(e) => {
                info!("Cannot learn in {:08X}: {}", address, e);
                LearnEvent::Unsupported {
                    address,
                    profile: Some(profile),
                }
            }
        }
    }

    fn add_known_device(&mut self, device: LogicalDevice) -> bool {
        let list = self.devices.entry(device.address()).or_default();
        if list.iter().any(|d| d.subdevice() == device.subdevice()) {
            return false;
        }
        list.push(device);
        true
    }

    /// Recreate logical devices from stored records without storing them again
    ///
    /// Records that cannot be turned into a device, or duplicate an already
    /// registered subdevice, are skipped. Returns the number of devices added.
    pub fn restore(&mut self, records: impl IntoIterator<Item = DeviceRecord>) -> usize {
        let mut added = 0;
        for record in records {
            match LogicalDevice::new(record, self.sinks.as_mut()) {
                Ok(device) => {
                    if self.add_known_device(device) {
                        added += 1;
                    } else {
                        warn!("Duplicate device record {:08X}/{}", record.address, record.subdevice);
                    }
                }
                Err(e) => warn!(
                    "EnOcean device could not be created for addr={:08X}, subdevice={}, profile={}, manufacturer={}: {}",
                    record.address, record.subdevice, record.profile, record.manufacturer, e
                ),
            }
        }
        added
    }

    /// Load all records from the store and restore them
    pub fn restore_from_store(&mut self) -> Result<usize> {
        let records = self.store.load()?;
        let added = self.restore(records);
        info!("Restored {} logical devices from store", added);
        Ok(added)
    }

    /// Remove one logical device; other subdevices of the address stay
    ///
    /// With `forget`, its stored record is deleted as well.
    pub fn remove_device(&mut self, address: EnoceanAddress, subdevice: u8, forget: bool) -> Result<bool> {
        let Some(list) = self.devices.get_mut(&address) else {
            return Ok(false);
        };
        let Some(pos) = list.iter().position(|d| d.subdevice() == subdevice) else {
            return Ok(false);
        };

        list.remove(pos);
        if list.is_empty() {
            self.devices.remove(&address);
        }
        if forget {
            self.store.forget(address, subdevice)?;
        }
        Ok(true)
    }

    /// Remove all logical devices of a physical device
    ///
    /// Returns the number of logical devices removed.
    pub fn unpair_devices_by_address(&mut self, address: EnoceanAddress, forget: bool) -> usize {
        let Some(devices) = self.devices.remove(&address) else {
            return 0;
        };
        if forget {
            for device in &devices {
                if let Err(e) = self.store.forget(address, device.subdevice()) {
                    warn!("Failed to forget device {:08X}/{}: {}", address, device.subdevice(), e);
                }
            }
        }
        info!("Unpaired {} logical devices of {:08X}", devices.len(), address);
        devices.len()
    }

    /// Switch an RPS device to another interchangeable profile
    ///
    /// Dual rocker switches, key card switches and smoke detectors send
    /// telegrams that cannot be told apart at learn-in, so the profile can be
    /// corrected afterwards. All logical devices of the address are recreated
    /// and their stored records replaced.
    ///
    /// # Errors
    ///
    /// [`EnoceanError::UnknownDevice`] if nothing is registered for the
    /// address, [`EnoceanError::UnsupportedProfile`] if either the current or
    /// the requested profile is not one of the interchangeable variants.
    /// Store errors are returned after the new devices have been registered.
    pub fn set_profile_variant(&mut self, address: EnoceanAddress, profile: EepProfile) -> Result<()> {
        let current = self
            .devices_for(address)
            .first()
            .map(|d| *d.record())
            .ok_or(EnoceanError::UnknownDevice(address))?;

        if !EepProfile::RPS_VARIANTS.contains(&profile) {
            return Err(EnoceanError::UnsupportedProfile(profile));
        }
        if !current.profile.is_rps_variant() {
            return Err(EnoceanError::UnsupportedProfile(current.profile));
        }
        if current.profile == profile {
            return Ok(());
        }

        let devices = create_devices(address, profile, current.manufacturer, self.sinks.as_mut())?;
        let records: Vec<DeviceRecord> = devices.iter().map(|d| *d.record()).collect();
        self.unpair_devices_by_address(address, true);
        self.devices.insert(address, devices);
        info!("Switched {:08X} from {} to {}", address, current.profile, profile);

        // the new devices stay registered even if persisting them fails
        for record in records {
            self.store.remember(record)?;
        }
        Ok(())
    }
}
