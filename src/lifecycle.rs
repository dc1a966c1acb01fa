use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{ExternalStatus, InstanceRecord, LifecyclePhase};
use crate::orchestrator::DeploymentHandle;

/// Lifecycle status values a deployed instance reports via callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedStatus {
    Configured,
    Running,
    Error,
}

/// Records a successful provisioning run: stores the handle and moves the
/// phase to `Provisioning`. A failed deploy never reaches this point, so a
/// partial handle is never persisted.
pub fn apply_deploy(record: &mut InstanceRecord, handle: &DeploymentHandle) {
    record.service_id = Some(handle.service_id.clone());
    record.domain = Some(handle.domain.clone());
    record.setup_password = Some(handle.setup_password.clone());
    record.is_deployed = true;
    record.phase = LifecyclePhase::Provisioning;
}

/// Applies an inbound status event.
///
/// `configured` advances `Provisioning -> Configured` and stamps
/// `configured_at` with the event timestamp (receipt time when the event
/// omits one). The timestamp only moves forward, so replays with an older or
/// equal timestamp are no-ops. `running` and `error` are informational and
/// never regress the phase.
pub fn apply_status_event(
    record: &mut InstanceRecord,
    status: ReportedStatus,
    timestamp: Option<DateTime<Utc>>,
) {
    if status != ReportedStatus::Configured {
        return;
    }

    record.phase = LifecyclePhase::Configured;
    let event_time = timestamp.unwrap_or_else(Utc::now);
    match record.configured_at {
        Some(existing) if existing >= event_time => {}
        _ => record.configured_at = Some(event_time),
    }
}

/// Records a confirmed teardown: clears the handle, health snapshot and
/// configured-at, leaving the record ready for a later redeploy.
pub fn apply_stop(record: &mut InstanceRecord) {
    record.service_id = None;
    record.domain = None;
    record.setup_password = None;
    record.is_deployed = false;
    record.phase = LifecyclePhase::Offline;
    record.configured_at = None;
    record.health = None;
}

/// Projects the operator-visible status from the persisted record.
pub fn derived_status(record: &InstanceRecord) -> ExternalStatus {
    if record.domain.is_none() {
        return ExternalStatus::NotDeployed;
    }
    if record.configured_at.is_some() {
        return ExternalStatus::Configured;
    }
    if record.is_deployed {
        ExternalStatus::Provisioning
    } else {
        // A stop was requested/recorded without full teardown confirmation.
        ExternalStatus::Offline
    }
}
