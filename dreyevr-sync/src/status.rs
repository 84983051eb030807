// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Mutex;

/// Driving automation state shared between the simulator and the external controller
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VehicleStatus {
    ManualDrive,
    Autopilot,
    PreAlertAutopilot,
    TakeOver,
    TakeOverManual,
    ResumedAutopilot,
    TrialOver,
    #[default]
    Unknown,
}

impl VehicleStatus {
    /// All variants that have a canonical wire name
    pub const CANONICAL: [VehicleStatus; 7] = [
        VehicleStatus::ManualDrive,
        VehicleStatus::Autopilot,
        VehicleStatus::PreAlertAutopilot,
        VehicleStatus::TakeOver,
        VehicleStatus::TakeOverManual,
        VehicleStatus::ResumedAutopilot,
        VehicleStatus::TrialOver,
    ];

    /// Textual name used on the wire
    pub const fn name(self) -> &'static str {
        match self {
            VehicleStatus::ManualDrive => "ManualDrive",
            VehicleStatus::Autopilot => "Autopilot",
            VehicleStatus::PreAlertAutopilot => "PreAlertAutopilot",
            VehicleStatus::TakeOver => "TakeOver",
            VehicleStatus::TakeOverManual => "TakeOverManual",
            VehicleStatus::ResumedAutopilot => "ResumedAutopilot",
            VehicleStatus::TrialOver => "TrialOver",
            VehicleStatus::Unknown => "Unknown",
        }
    }

    /// Map a wire name to a status.
    ///
    /// Matching is exact and case-sensitive. Anything that is not one of the canonical
    /// names, including an empty string, maps to [`VehicleStatus::Unknown`].
    pub fn from_name(name: &str) -> VehicleStatus {
        VehicleStatus::CANONICAL
            .into_iter()
            .find(|status| status.name() == name)
            .unwrap_or(VehicleStatus::Unknown)
    }
}

impl Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for VehicleStatus {
    fn from(name: &str) -> Self {
        VehicleStatus::from_name(name)
    }
}

/// Strict parsing, for user input: only the canonical names are accepted
impl FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match VehicleStatus::from_name(s) {
            VehicleStatus::Unknown => Err(format!(
                "'{s}' is not one of {}",
                VehicleStatus::CANONICAL.map(VehicleStatus::name).join(", ")
            )),
            status => Ok(status),
        }
    }
}

impl From<VehicleStatus> for u8 {
    fn from(status: VehicleStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for VehicleStatus {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Error> {
        let status = match v {
            v if v == VehicleStatus::ManualDrive as u8 => VehicleStatus::ManualDrive,
            v if v == VehicleStatus::Autopilot as u8 => VehicleStatus::Autopilot,
            v if v == VehicleStatus::PreAlertAutopilot as u8 => VehicleStatus::PreAlertAutopilot,
            v if v == VehicleStatus::TakeOver as u8 => VehicleStatus::TakeOver,
            v if v == VehicleStatus::TakeOverManual as u8 => VehicleStatus::TakeOverManual,
            v if v == VehicleStatus::ResumedAutopilot as u8 => VehicleStatus::ResumedAutopilot,
            v if v == VehicleStatus::TrialOver as u8 => VehicleStatus::TrialOver,
            v if v == VehicleStatus::Unknown as u8 => VehicleStatus::Unknown,
            _ => return Err(Error::Channel("invalid vehicle status discriminant")),
        };
        Ok(status)
    }
}

/// Current and previous status as seen by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: VehicleStatus,
    pub current: VehicleStatus,
}

impl Transition {
    /// True if the status actually changed
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}

/// Current and previous vehicle status plus the latest schedule timer.
///
/// Both statuses live in a single atomic word, so a transition replaces the pair at once
/// and readers on other threads never observe a torn pair.
#[derive(Debug)]
pub struct StatusStore {
    statuses: AtomicU16,
    schedule_timer: Mutex<String>,
}

impl Default for StatusStore {
    fn default() -> Self {
        StatusStore::new(VehicleStatus::Unknown)
    }
}

impl StatusStore {
    pub fn new(initial: VehicleStatus) -> Self {
        Self {
            statuses: AtomicU16::new(pack(initial, initial)),
            schedule_timer: Mutex::new(String::new()),
        }
    }

    /// Current status (GetCurrVehicleStatus)
    pub fn current(&self) -> VehicleStatus {
        self.snapshot().current
    }

    /// Status before the last transition (GetOldVehicleStatus)
    pub fn previous(&self) -> VehicleStatus {
        self.snapshot().previous
    }

    /// Read both statuses consistently
    pub fn snapshot(&self) -> Transition {
        unpack(self.statuses.load(Ordering::Acquire))
    }

    /// Move to `status`: the current status becomes the previous one.
    ///
    /// Applies on every call, so re-applying the current status leaves both equal.
    /// Returns the resulting pair.
    pub fn transition(&self, status: VehicleStatus) -> Transition {
        let word = self
            .statuses
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some(pack(unpack(word).current, status))
            })
            .unwrap_or_else(|word| word);
        Transition {
            previous: unpack(word).current,
            current: status,
        }
    }

    /// Latest countdown timer value received from the controller
    pub fn schedule_timer(&self) -> String {
        self.schedule_timer
            .lock()
            .map(|timer| timer.clone())
            .unwrap_or_default()
    }

    pub fn set_schedule_timer(&self, value: String) {
        if let Ok(mut timer) = self.schedule_timer.lock() {
            *timer = value;
        }
    }
}

fn pack(previous: VehicleStatus, current: VehicleStatus) -> u16 {
    u16::from_be_bytes([previous.into(), current.into()])
}

fn unpack(word: u16) -> Transition {
    let [previous, current] = word.to_be_bytes();
    // Only values produced by `pack` are ever stored
    Transition {
        previous: previous.try_into().unwrap_or_default(),
        current: current.try_into().unwrap_or_default(),
    }
}

#[cfg(test)]
mod test {
    use super::{StatusStore, Transition, VehicleStatus};

    #[test]
    fn canonical_names_round_trip() {
        for status in VehicleStatus::CANONICAL {
            assert_eq!(VehicleStatus::from_name(status.name()), status);
        }
    }

    #[test]
    fn unrecognized_names_map_to_unknown() {
        for name in [
            "",
            "garbage",
            "manualdrive",
            "MANUALDRIVE",
            " ManualDrive",
            "TakeOver ",
            "Unknown",
        ] {
            assert_eq!(VehicleStatus::from_name(name), VehicleStatus::Unknown, "{name:?}");
        }
    }

    #[test]
    fn strict_parsing() {
        assert_eq!("TakeOver".parse(), Ok(VehicleStatus::TakeOver));
        assert!("takeover".parse::<VehicleStatus>().is_err());
        assert!("Unknown".parse::<VehicleStatus>().is_err());
    }

    #[test]
    fn discriminant_conversion() {
        for status in VehicleStatus::CANONICAL
            .into_iter()
            .chain([VehicleStatus::Unknown])
        {
            let raw: u8 = status.into();
            assert_eq!(VehicleStatus::try_from(raw).unwrap(), status);
        }
        assert!(VehicleStatus::try_from(200).is_err());
    }

    #[test]
    fn transition_shifts_current_into_previous() {
        let store = StatusStore::default();
        assert_eq!(store.current(), VehicleStatus::Unknown);
        assert_eq!(store.previous(), VehicleStatus::Unknown);

        let transition = store.transition(VehicleStatus::ManualDrive);
        assert_eq!(
            transition,
            Transition {
                previous: VehicleStatus::Unknown,
                current: VehicleStatus::ManualDrive
            }
        );
        assert!(transition.is_change());

        store.transition(VehicleStatus::TakeOver);
        assert_eq!(store.current(), VehicleStatus::TakeOver);
        assert_eq!(store.previous(), VehicleStatus::ManualDrive);
    }

    #[test]
    fn repeated_status_becomes_previous() {
        let store = StatusStore::new(VehicleStatus::ManualDrive);
        store.transition(VehicleStatus::Autopilot);
        assert_eq!(store.previous(), VehicleStatus::ManualDrive);

        let transition = store.transition(VehicleStatus::Autopilot);
        assert!(!transition.is_change());
        assert_eq!(store.current(), VehicleStatus::Autopilot);
        assert_eq!(store.previous(), VehicleStatus::Autopilot);
    }

    #[test]
    fn schedule_timer() {
        let store = StatusStore::default();
        assert_eq!(store.schedule_timer(), "");
        store.set_schedule_timer("42".to_string());
        assert_eq!(store.schedule_timer(), "42");
    }
}
