//! Homeguard firmware library.
//!
//! Control core of a standalone intrusion-alarm controller: the alarm
//! lifecycle state machine, the wireless sensor mesh, and the serial
//! bridge to the network companion module.
//!
//! The pure-logic modules are exposed for integration testing and host
//! simulation; everything ESP-IDF-specific is guarded behind the `espidf`
//! feature within [`adapters`].

#![deny(unused_must_use)]

pub mod alarm;
pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod mesh;
pub mod status;
pub mod timer;

pub mod adapters;
