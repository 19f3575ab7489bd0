//! Content-derived identifiers for calendar entries.
//!
//! The same source record always yields the same UID, so calendar clients can
//! update events in place across regenerations.

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use crate::{Exam, TimetableEvent};

/// Timestamp layout used when a time takes part in an identifier.
pub const IDENTITY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Concatenates `fields` in order and returns the lowercase hex SHA-256 digest.
pub fn identify<S: AsRef<str>>(fields: &[S]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_ref().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format(IDENTITY_TIME_FORMAT).to_string()
}

/// UID of a lecture: module code, start, end.
pub fn lecture_uid(event: &TimetableEvent) -> String {
    identify(&[
        event.module_code.clone(),
        format_time(&event.start),
        format_time(&event.end),
    ])
}

/// UID of an exam: subject name, date, location, teacher.
pub fn exam_uid(exam: &Exam) -> String {
    identify(&[
        exam.subject_name.clone(),
        format_time(&exam.date),
        exam.location.clone(),
        exam.teacher.clone(),
    ])
}
