//! Attendance domain types
//!
//! Absence reasons are partitioned statically into paid and unpaid sets.
//! The partitions are fixed slices; nothing here is mutable at runtime.

mod outcome;

pub use outcome::{map_outcome, EventOutcome, OutcomeError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Reason an offender did not attend a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbsentReason {
    AcceptableAbsence,
    ApprovedCourse,
    NotRequired,
    SessionCancelled,
    RestInCell,
    RestDay,
    Sick,
    Refused,
    UnacceptableAbsence,
}

impl AbsentReason {
    pub const ALL: [AbsentReason; 9] = [
        AbsentReason::AcceptableAbsence,
        AbsentReason::ApprovedCourse,
        AbsentReason::NotRequired,
        AbsentReason::SessionCancelled,
        AbsentReason::RestInCell,
        AbsentReason::RestDay,
        AbsentReason::Sick,
        AbsentReason::Refused,
        AbsentReason::UnacceptableAbsence,
    ];

    /// Reasons for which the offender is still paid
    pub const PAID: [AbsentReason; 3] = [
        AbsentReason::AcceptableAbsence,
        AbsentReason::NotRequired,
        AbsentReason::ApprovedCourse,
    ];

    /// Reasons for which the offender is not paid
    pub const UNPAID: [AbsentReason; 6] = [
        AbsentReason::SessionCancelled,
        AbsentReason::RestInCell,
        AbsentReason::Sick,
        AbsentReason::RestDay,
        AbsentReason::Refused,
        AbsentReason::UnacceptableAbsence,
    ];

    /// Reasons that raise an incentive level warning case note
    pub const IEP_TRIGGERS: [AbsentReason; 2] =
        [AbsentReason::Refused, AbsentReason::UnacceptableAbsence];

    /// Reasons for which clients should also ask for a sub-reason
    pub const SUB_REASON_TRIGGERS: [AbsentReason; 4] = [
        AbsentReason::AcceptableAbsence,
        AbsentReason::Refused,
        AbsentReason::SessionCancelled,
        AbsentReason::UnacceptableAbsence,
    ];

    pub fn is_paid(self) -> bool {
        Self::PAID.contains(&self)
    }

    pub fn is_unpaid(self) -> bool {
        Self::UNPAID.contains(&self)
    }

    pub fn triggers_iep_warning(self) -> bool {
        Self::IEP_TRIGGERS.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AbsentReason::AcceptableAbsence => "AcceptableAbsence",
            AbsentReason::ApprovedCourse => "ApprovedCourse",
            AbsentReason::NotRequired => "NotRequired",
            AbsentReason::SessionCancelled => "SessionCancelled",
            AbsentReason::RestInCell => "RestInCell",
            AbsentReason::RestDay => "RestDay",
            AbsentReason::Sick => "Sick",
            AbsentReason::Refused => "Refused",
            AbsentReason::UnacceptableAbsence => "UnacceptableAbsence",
        }
    }

    /// Sentence-case label used in case note text
    ///
    /// `UnacceptableAbsence` becomes `Unacceptable absence`.
    pub fn title(self) -> String {
        let mut label = String::new();
        for (i, c) in self.as_str().chars().enumerate() {
            if i > 0 && c.is_ascii_uppercase() {
                label.push(' ');
                label.push(c.to_ascii_lowercase());
            } else {
                label.push(c);
            }
        }
        label
    }
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbsentReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown absent reason: {}", s)))
    }
}

/// Finer-grained classification of an absence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbsentSubReason {
    Activities,
    Behaviour,
    Courses,
    ExternalMoves,
    Healthcare,
    Operational,
    OverAllocated,
    Visits,
}

impl AbsentSubReason {
    pub const ALL: [AbsentSubReason; 8] = [
        AbsentSubReason::Activities,
        AbsentSubReason::Behaviour,
        AbsentSubReason::Courses,
        AbsentSubReason::ExternalMoves,
        AbsentSubReason::Healthcare,
        AbsentSubReason::Operational,
        AbsentSubReason::OverAllocated,
        AbsentSubReason::Visits,
    ];

    /// Sub-reasons offered alongside a paid absence
    pub fn paid() -> Vec<AbsentSubReason> {
        Self::ALL
            .iter()
            .copied()
            .filter(|r| *r != AbsentSubReason::Behaviour)
            .collect()
    }

    /// Sub-reasons offered alongside an unpaid absence
    pub fn unpaid() -> Vec<AbsentSubReason> {
        Self::ALL.to_vec()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AbsentSubReason::Activities => "Activities",
            AbsentSubReason::Behaviour => "Behaviour",
            AbsentSubReason::Courses => "Courses",
            AbsentSubReason::ExternalMoves => "ExternalMoves",
            AbsentSubReason::Healthcare => "Healthcare",
            AbsentSubReason::Operational => "Operational",
            AbsentSubReason::OverAllocated => "OverAllocated",
            AbsentSubReason::Visits => "Visits",
        }
    }
}

impl FromStr for AbsentSubReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown absent sub-reason: {}", s)))
    }
}

/// Part of the day an event is scheduled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimePeriod {
    Am,
    Pm,
    /// Evening duty
    Ed,
}

impl TimePeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            TimePeriod::Am => "AM",
            TimePeriod::Pm => "PM",
            TimePeriod::Ed => "ED",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AM" => Ok(TimePeriod::Am),
            "PM" => Ok(TimePeriod::Pm),
            "ED" => Ok(TimePeriod::Ed),
            other => Err(Error::InvalidInput(format!("Unknown period: {}", other))),
        }
    }
}

/// Kind of event recorded on the legacy offender-event path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Activity,
    Appointment,
    Visit,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Activity => "ACTIVITY",
            EventType::Appointment => "APPOINTMENT",
            EventType::Visit => "VISIT",
        }
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVITY" => Ok(EventType::Activity),
            "APPOINTMENT" => Ok(EventType::Appointment),
            "VISIT" => Ok(EventType::Visit),
            other => Err(Error::InvalidInput(format!("Unknown event type: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_and_unpaid_partition_every_reason() {
        for reason in AbsentReason::ALL {
            assert_ne!(
                reason.is_paid(),
                reason.is_unpaid(),
                "{} must be in exactly one partition",
                reason
            );
        }
    }

    #[test]
    fn test_reason_round_trips_through_str() {
        for reason in AbsentReason::ALL {
            assert_eq!(reason.as_str().parse::<AbsentReason>().unwrap(), reason);
        }
        assert!("Bored".parse::<AbsentReason>().is_err());
    }

    #[test]
    fn test_reason_title() {
        assert_eq!(AbsentReason::UnacceptableAbsence.title(), "Unacceptable absence");
        assert_eq!(AbsentReason::Refused.title(), "Refused");
        assert_eq!(AbsentReason::RestInCell.title(), "Rest in cell");
    }

    #[test]
    fn test_iep_triggers() {
        assert!(AbsentReason::Refused.triggers_iep_warning());
        assert!(AbsentReason::UnacceptableAbsence.triggers_iep_warning());
        assert!(!AbsentReason::Sick.triggers_iep_warning());
    }

    #[test]
    fn test_period_serde_uses_upstream_literals() {
        assert_eq!(serde_json::to_string(&TimePeriod::Ed).unwrap(), "\"ED\"");
        let period: TimePeriod = serde_json::from_str("\"AM\"").unwrap();
        assert_eq!(period, TimePeriod::Am);
    }

    #[test]
    fn test_paid_sub_reasons_exclude_behaviour() {
        assert!(!AbsentSubReason::paid().contains(&AbsentSubReason::Behaviour));
        assert_eq!(AbsentSubReason::unpaid().len(), 8);
    }
}
