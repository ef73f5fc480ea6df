//! Attendance outcome mapping
//!
//! Translates a recorded attendance into the event outcome and performance
//! codes the Prison API stores against a booking's activity. The codes are a
//! fixed contract with the Prison API.

use serde::Serialize;
use thiserror::Error;

use super::AbsentReason;

/// Outcome sent to the Prison API for one booking/activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcome {
    pub event_outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_comment: Option<String>,
}

/// Rejected combination of attendance inputs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    #[error("An absent reason was supplied for a valid attendance")]
    ReasonWithAttendance,

    #[error("An absent reason is required for a non-attendance")]
    MissingReason,

    #[error("{0} is not a valid paid absent reason")]
    NotPaidReason(String),

    #[error("{0} is not a valid unpaid absent reason")]
    NotUnpaidReason(String),
}

/// Map attendance details to a Prison API event outcome
///
/// Rules are applied in order; the first failing rule wins.
pub fn map_outcome(
    reason: Option<AbsentReason>,
    attended: bool,
    paid: bool,
    comment: Option<&str>,
) -> Result<EventOutcome, OutcomeError> {
    let outcome_comment = comment.filter(|c| !c.is_empty()).map(str::to_string);

    if attended && reason.is_some() {
        return Err(OutcomeError::ReasonWithAttendance);
    }
    if !attended && reason.is_none() {
        return Err(OutcomeError::MissingReason);
    }

    if attended && paid {
        return Ok(EventOutcome {
            event_outcome: "ATT".to_string(),
            performance: Some("STANDARD".to_string()),
            outcome_comment,
        });
    }

    let label = reason.map(|r| r.to_string()).unwrap_or_else(|| "none".to_string());
    let reason = match reason {
        Some(r) if paid && r.is_paid() => r,
        Some(r) if !paid && r.is_unpaid() => r,
        _ if paid => return Err(OutcomeError::NotPaidReason(label)),
        _ => return Err(OutcomeError::NotUnpaidReason(label)),
    };

    Ok(EventOutcome {
        event_outcome: outcome_code(reason).to_string(),
        performance: None,
        outcome_comment,
    })
}

fn outcome_code(reason: AbsentReason) -> &'static str {
    match reason {
        AbsentReason::AcceptableAbsence | AbsentReason::ApprovedCourse => "ACCAB",
        AbsentReason::NotRequired => "NREQ",
        AbsentReason::SessionCancelled => "CANC",
        AbsentReason::RestInCell | AbsentReason::Sick | AbsentReason::RestDay => "REST",
        AbsentReason::Refused | AbsentReason::UnacceptableAbsence => "UNACAB",
    }
}
