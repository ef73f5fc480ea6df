//! Attendance recording
//!
//! Each submission is mapped to a Prison API outcome first, so invalid
//! combinations are rejected before anything is sent upstream or written.
//! The outcome is then pushed to the Prison API, incentive level warning
//! case notes are raised, amended or left alone, and finally the row is
//! written.

use chrono::{Local, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use whereabouts_common::{attendance::map_outcome, AbsentReason, TimePeriod};

use crate::auth::AuthContext;
use crate::clients::{BookingActivity, CaseNotesApi, NewCaseNote, PrisonApi, ServiceTokenProvider};
use crate::db::attendances::{self, AttendanceRecord};
use crate::models::{AbsentReasons, Attendance, CreateAttendance, CreateAttendances, UpdateAttendance};
use crate::{ApiError, ApiResult};

const CASE_NOTE_TYPE: &str = "NEG";
const CASE_NOTE_SUB_TYPE: &str = "IEP_WARN";

/// Orchestrates attendance writes across the store and upstream services
#[derive(Clone)]
pub struct AttendanceService {
    db: SqlitePool,
    prison_api: Arc<dyn PrisonApi>,
    case_notes: Arc<dyn CaseNotesApi>,
    tokens: Arc<ServiceTokenProvider>,
}

impl AttendanceService {
    pub fn new(
        db: SqlitePool,
        prison_api: Arc<dyn PrisonApi>,
        case_notes: Arc<dyn CaseNotesApi>,
        tokens: Arc<ServiceTokenProvider>,
    ) -> Self {
        Self {
            db,
            prison_api,
            case_notes,
            tokens,
        }
    }

    /// Record attendance for one booking, updating any earlier submission
    pub async fn record_attendance(
        &self,
        ctx: &AuthContext,
        request: CreateAttendance,
    ) -> ApiResult<Attendance> {
        request.validate()?;
        let outcome = map_outcome(
            request.absent_reason,
            request.attended,
            request.paid,
            request.comments.as_deref(),
        )?;

        let existing = attendances::find_by_key(
            &self.db,
            request.booking_id,
            request.event_id,
            request.event_date,
            request.period,
        )
        .await?;

        self.prison_api
            .put_attendance(ctx.token(), request.booking_id, request.event_id, &outcome)
            .await?;

        let case_note_id = self
            .sync_warning_case_note(
                ctx,
                request.booking_id,
                existing.as_ref(),
                request.absent_reason,
                request.comments.as_deref(),
                request.event_date,
            )
            .await?;

        let record = AttendanceRecord {
            booking_id: request.booking_id,
            event_id: request.event_id,
            event_location_id: request.event_location_id,
            event_date: request.event_date,
            period: request.period,
            prison_id: request.prison_id,
            attended: request.attended,
            paid: request.paid,
            absent_reason: request.absent_reason,
            absent_sub_reason: request.absent_sub_reason,
            comments: request.comments,
            case_note_id,
        };
        let saved = attendances::upsert(&self.db, &record, ctx.username(), now()).await?;

        info!(
            id = saved.id,
            booking_id = saved.booking_id,
            event_id = saved.event_id,
            outcome = %outcome.event_outcome,
            updated = existing.is_some(),
            "Recorded attendance"
        );
        Ok(saved)
    }

    /// Change the outcome of an attendance identified by id
    pub async fn update_attendance(
        &self,
        ctx: &AuthContext,
        id: i64,
        request: UpdateAttendance,
    ) -> ApiResult<Attendance> {
        request.validate()?;
        let existing = attendances::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Attendance with id {} not found", id)))?;

        let outcome = map_outcome(
            request.absent_reason,
            request.attended,
            request.paid,
            request.comments.as_deref(),
        )?;

        self.prison_api
            .put_attendance(ctx.token(), existing.booking_id, existing.event_id, &outcome)
            .await?;

        let case_note_id = self
            .sync_warning_case_note(
                ctx,
                existing.booking_id,
                Some(&existing),
                request.absent_reason,
                request.comments.as_deref(),
                existing.event_date,
            )
            .await?;

        let record = AttendanceRecord {
            booking_id: existing.booking_id,
            event_id: existing.event_id,
            event_location_id: existing.event_location_id,
            event_date: existing.event_date,
            period: existing.period,
            prison_id: existing.prison_id.clone(),
            attended: request.attended,
            paid: request.paid,
            absent_reason: request.absent_reason,
            absent_sub_reason: request.absent_sub_reason,
            comments: request.comments,
            case_note_id,
        };
        let saved = attendances::update(&self.db, id, &record, ctx.username(), now()).await?;

        info!(id, outcome = %outcome.event_outcome, "Updated attendance");
        Ok(saved)
    }

    /// Record one outcome for many bookings with a single upstream call
    ///
    /// The Prison API is updated before anything is written; if it fails no
    /// rows change. All rows are then written in one transaction. Warning
    /// case notes are raised before that transaction, so a failure part way
    /// through leaves the notes already raised without a row.
    pub async fn record_attendance_for_bookings(
        &self,
        ctx: &AuthContext,
        request: CreateAttendances,
    ) -> ApiResult<Vec<Attendance>> {
        request.validate()?;
        let outcome = map_outcome(
            request.absent_reason,
            request.attended,
            request.paid,
            request.comments.as_deref(),
        )?;

        // Repeated pairs collapse onto one row; keep the first of each
        let mut seen = HashSet::new();
        let bookings: Vec<BookingActivity> = request
            .booking_activities
            .iter()
            .copied()
            .filter(|booking| seen.insert(*booking))
            .collect();

        self.prison_api
            .put_attendance_for_bookings(ctx.token(), &bookings, &outcome)
            .await?;

        let mut records = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            let existing = attendances::find_by_key(
                &self.db,
                booking.booking_id,
                booking.activity_id,
                request.event_date,
                request.period,
            )
            .await?;

            let case_note_id = self
                .sync_warning_case_note(
                    ctx,
                    booking.booking_id,
                    existing.as_ref(),
                    request.absent_reason,
                    request.comments.as_deref(),
                    request.event_date,
                )
                .await?;

            records.push(AttendanceRecord {
                booking_id: booking.booking_id,
                event_id: booking.activity_id,
                event_location_id: request.event_location_id,
                event_date: request.event_date,
                period: request.period,
                prison_id: request.prison_id.clone(),
                attended: request.attended,
                paid: request.paid,
                absent_reason: request.absent_reason,
                absent_sub_reason: request.absent_sub_reason,
                comments: request.comments.clone(),
                case_note_id,
            });
        }

        let now = now();
        let mut tx = self.db.begin().await?;
        let mut saved = Vec::with_capacity(records.len());
        for record in &records {
            saved.push(attendances::upsert(&mut *tx, record, ctx.username(), now).await?);
        }
        tx.commit().await?;

        info!(
            bookings = saved.len(),
            outcome = %outcome.event_outcome,
            "Recorded attendance for bookings"
        );
        Ok(saved)
    }

    pub async fn get_attendance(
        &self,
        prison_id: &str,
        event_location_id: i64,
        date: NaiveDate,
        period: TimePeriod,
    ) -> ApiResult<Vec<Attendance>> {
        Ok(attendances::find_by_location(&self.db, prison_id, event_location_id, date, period).await?)
    }

    pub async fn get_attendance_for_bookings(
        &self,
        prison_id: &str,
        booking_ids: &[i64],
        date: NaiveDate,
        period: TimePeriod,
    ) -> ApiResult<Vec<Attendance>> {
        Ok(attendances::find_by_bookings(&self.db, prison_id, booking_ids, date, period).await?)
    }

    pub async fn get_absences(
        &self,
        prison_id: &str,
        reason: AbsentReason,
        from: NaiveDate,
        to: NaiveDate,
        period: Option<TimePeriod>,
    ) -> ApiResult<Vec<Attendance>> {
        if to < from {
            return Err(ApiError::BadRequest("toDate must not be before fromDate".to_string()));
        }
        Ok(attendances::find_absences(&self.db, prison_id, reason, from, to, period).await?)
    }

    pub fn get_absence_reasons(&self) -> AbsentReasons {
        AbsentReasons::current()
    }

    /// Raise, amend or keep the incentive level warning case note
    ///
    /// Returns the case note id to store on the attendance row.
    async fn sync_warning_case_note(
        &self,
        ctx: &AuthContext,
        booking_id: i64,
        previous: Option<&Attendance>,
        reason: Option<AbsentReason>,
        comments: Option<&str>,
        event_date: NaiveDate,
    ) -> ApiResult<Option<i64>> {
        let previous_case_note = previous.and_then(|a| a.case_note_id);
        let previously_warned = previous
            .and_then(|a| a.absent_reason)
            .is_some_and(AbsentReason::triggers_iep_warning);
        let warning_reason = reason.filter(|r| r.triggers_iep_warning());

        match (previously_warned, warning_reason) {
            (true, Some(_)) | (false, None) => Ok(previous_case_note),
            (true, None) => {
                if let Some(case_note_id) = previous_case_note {
                    let outcome = reason.map(AbsentReason::title).unwrap_or_else(|| "attended".to_string());
                    let text = format!("Incentive Level warning rescinded: {}", outcome);
                    self.amend_case_note(ctx, booking_id, case_note_id, &text).await?;
                }
                Ok(previous_case_note)
            }
            (false, Some(warning)) => match previous_case_note {
                Some(case_note_id) => {
                    let text = format!("Incentive Level warning added: {}", warning.title());
                    self.amend_case_note(ctx, booking_id, case_note_id, &text).await?;
                    Ok(Some(case_note_id))
                }
                None => {
                    let offender_no = self.offender_no(ctx, booking_id).await?;
                    let case_note = NewCaseNote {
                        case_note_type: CASE_NOTE_TYPE.to_string(),
                        sub_type: CASE_NOTE_SUB_TYPE.to_string(),
                        text: warning_text(warning, comments),
                        occurrence_date_time: event_date.and_time(Local::now().time()),
                    };
                    let created = self
                        .case_notes
                        .post_case_note(ctx.token(), &offender_no, &case_note)
                        .await?;
                    info!(booking_id, case_note_id = created.case_note_id, "Raised incentive level warning");
                    Ok(Some(created.case_note_id))
                }
            },
        }
    }

    async fn amend_case_note(
        &self,
        ctx: &AuthContext,
        booking_id: i64,
        case_note_id: i64,
        text: &str,
    ) -> ApiResult<()> {
        let offender_no = self.offender_no(ctx, booking_id).await?;
        self.case_notes
            .put_case_note_amendment(ctx.token(), &offender_no, case_note_id, text)
            .await?;
        info!(booking_id, case_note_id, "Amended incentive level warning");
        Ok(())
    }

    async fn offender_no(&self, ctx: &AuthContext, booking_id: i64) -> ApiResult<String> {
        let token = self.tokens.service_token(ctx).await?;
        Ok(self.prison_api.get_offender_no(&token, booking_id).await?)
    }
}

/// Case note text: reason title, then the comment when there is one
fn warning_text(reason: AbsentReason, comments: Option<&str>) -> String {
    match comments.map(str::trim).filter(|c| !c.is_empty()) {
        Some(comment) => format!("{} - {}", reason.title(), comment),
        None => reason.title(),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_text_with_comment() {
        assert_eq!(
            warning_text(AbsentReason::Refused, Some("  Would not leave cell ")),
            "Refused - Would not leave cell"
        );
    }

    #[test]
    fn test_warning_text_without_comment() {
        assert_eq!(
            warning_text(AbsentReason::UnacceptableAbsence, Some("")),
            "Unacceptable absence"
        );
        assert_eq!(warning_text(AbsentReason::Refused, None), "Refused");
    }
}
