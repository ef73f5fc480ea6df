//! Attendance statistics over a date range
//!
//! Scheduled activity counts come from the Prison API, one call per day and
//! period; recorded outcomes come from the attendance table.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;
use whereabouts_common::{AbsentReason, TimePeriod};

use crate::clients::PrisonApi;
use crate::db::attendances;
use crate::models::{Attendance, AttendanceStats};
use crate::{ApiError, ApiResult};

/// Longest range accepted, in days inclusive
pub const MAX_RANGE_DAYS: i64 = 31;

/// Periods counted when none is requested
pub const DEFAULT_PERIODS: [TimePeriod; 2] = [TimePeriod::Am, TimePeriod::Pm];

/// Compute statistics for `prison_id` over `[from, to]`
///
/// `service_token` is the service's own token; schedule lookups run under
/// it rather than the caller's.
pub async fn attendance_stats(
    db: &SqlitePool,
    prison_api: &dyn PrisonApi,
    service_token: &str,
    prison_id: &str,
    period: Option<TimePeriod>,
    from: NaiveDate,
    to: Option<NaiveDate>,
) -> ApiResult<AttendanceStats> {
    let to = to.unwrap_or(from);
    if to < from {
        return Err(ApiError::BadRequest("toDate must not be before fromDate".to_string()));
    }
    if (to - from).num_days() + 1 > MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "Date range must not exceed {} days",
            MAX_RANGE_DAYS
        )));
    }

    let periods: Vec<TimePeriod> = match period {
        Some(p) => vec![p],
        None => DEFAULT_PERIODS.to_vec(),
    };

    let mut scheduled = 0i64;
    for date in from.iter_days().take_while(|d| *d <= to) {
        for period in &periods {
            let activities = prison_api
                .get_scheduled_activities(service_token, prison_id, date, *period)
                .await?;
            scheduled += activities.len() as i64;
        }
    }

    let recorded = attendances::find_in_range(db, prison_id, from, to, &periods).await?;
    debug!(
        prison_id,
        scheduled,
        recorded = recorded.len(),
        "Computed attendance statistics"
    );

    Ok(tally(scheduled, &recorded))
}

/// Count recorded outcomes against the number of scheduled activities
pub fn tally(scheduled: i64, recorded: &[Attendance]) -> AttendanceStats {
    let mut stats = AttendanceStats {
        schedule_activities: scheduled,
        not_recorded: (scheduled - recorded.len() as i64).max(0),
        ..Default::default()
    };

    for attendance in recorded {
        if attendance.attended {
            stats.paid_reasons.attended += 1;
            continue;
        }
        match attendance.absent_reason {
            Some(AbsentReason::AcceptableAbsence) => stats.paid_reasons.acceptable_absence += 1,
            Some(AbsentReason::ApprovedCourse) => stats.paid_reasons.approved_course += 1,
            Some(AbsentReason::NotRequired) => stats.paid_reasons.not_required += 1,
            Some(AbsentReason::Refused) => stats.unpaid_reasons.refused += 1,
            Some(AbsentReason::SessionCancelled) => stats.unpaid_reasons.session_cancelled += 1,
            Some(AbsentReason::RestDay) => stats.unpaid_reasons.rest_day += 1,
            Some(AbsentReason::RestInCell) => stats.unpaid_reasons.rest_in_cell += 1,
            Some(AbsentReason::Sick) => stats.unpaid_reasons.sick += 1,
            Some(AbsentReason::UnacceptableAbsence) => {
                stats.unpaid_reasons.unacceptable_absence += 1
            }
            None => {}
        }
    }

    stats
}
