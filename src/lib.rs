//! # EnOcean Gateway Library
//!
//! Receive EnOcean radio telegrams from an ESP3 transceiver module and route
//! them to paired logical devices.
//!
//! This library provides the receive core of an EnOcean gateway: ESP3 packet
//! framing with CRC checking and resynchronization, radio telegram decoding,
//! equipment profile (EEP) decode rules and an address-keyed dispatcher with
//! single-shot learn mode.

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod eep;
pub mod error;
pub mod esp3;
pub mod serial;
pub mod timer;
