//! State owned by whoever drives the UI: the two chosen input files, the
//! busy flag and the most recent schedule. Nothing here talks to the
//! network; [`Session::begin_submission`] hands out the files and
//! [`Session::finish_submission`] takes the solver outcome back.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{Result, SchedulaError};
use crate::schedule::{build_grid, AssignmentRecord, ScheduleGrid};

/// An input file as the user picked it. The contents are never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileSlot {
    /// Rooms, courses and time slots.
    First,
    /// Enrollments and preferences.
    Second,
}

impl FileSlot {
    /// Multipart field name the solver expects.
    pub fn field_name(self) -> &'static str {
        match self {
            FileSlot::First => "file1",
            FileSlot::Second => "file2",
        }
    }

    /// `1` / `2`, as used in URLs.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(FileSlot::First),
            2 => Some(FileSlot::Second),
            _ => None,
        }
    }
}

impl fmt::Display for FileSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// The files handed to the solver for one submission.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub file1: Option<UploadedFile>,
    pub file2: Option<UploadedFile>,
}

impl Submission {
    pub fn new(file1: UploadedFile, file2: UploadedFile) -> Self {
        Self {
            file1: Some(file1),
            file2: Some(file2),
        }
    }

    pub fn parts(&self) -> impl Iterator<Item = (FileSlot, &UploadedFile)> {
        [(FileSlot::First, &self.file1), (FileSlot::Second, &self.file2)]
            .into_iter()
            .filter_map(|(slot, file)| file.as_ref().map(|f| (slot, f)))
    }
}

#[derive(Debug, Clone)]
struct ReceivedSchedule {
    records: Vec<AssignmentRecord>,
    received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Session {
    file1: Option<UploadedFile>,
    file2: Option<UploadedFile>,
    busy: bool,
    schedule: Option<ReceivedSchedule>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_file(&mut self, slot: FileSlot, file: UploadedFile) {
        info!(slot = %slot, name = %file.name, bytes = file.bytes.len(), "File selected");
        match slot {
            FileSlot::First => self.file1 = Some(file),
            FileSlot::Second => self.file2 = Some(file),
        }
    }

    pub fn file(&self, slot: FileSlot) -> Option<&UploadedFile> {
        match slot {
            FileSlot::First => self.file1.as_ref(),
            FileSlot::Second => self.file2.as_ref(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Both files chosen and nothing in flight.
    pub fn can_submit(&self) -> bool {
        self.file1.is_some() && self.file2.is_some() && !self.busy
    }

    /// Marks the session busy and returns the files to send.
    pub fn begin_submission(&mut self) -> Result<Submission> {
        if self.busy {
            return Err(SchedulaError::SubmissionInProgress);
        }
        let file1 = self.file1.clone().ok_or(SchedulaError::MissingFile(FileSlot::First))?;
        let file2 = self.file2.clone().ok_or(SchedulaError::MissingFile(FileSlot::Second))?;
        self.busy = true;
        Ok(Submission::new(file1, file2))
    }

    /// Applies the solver outcome. Anything other than a schedule clears the
    /// previous one; failures are logged and otherwise swallowed.
    pub fn finish_submission(&mut self, outcome: Result<Option<Vec<AssignmentRecord>>>) {
        self.busy = false;
        match outcome {
            Ok(Some(records)) => {
                info!(records = records.len(), "Schedule received");
                self.schedule = Some(ReceivedSchedule {
                    records,
                    received_at: Utc::now(),
                });
            }
            Ok(None) => {
                warn!("Solver response carried no schedule");
                self.schedule = None;
            }
            Err(e) => {
                error!("Error submitting files: {}", e);
                self.schedule = None;
            }
        }
    }

    pub fn schedule(&self) -> Option<&[AssignmentRecord]> {
        self.schedule.as_ref().map(|s| s.records.as_slice())
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.schedule.as_ref().map(|s| s.received_at)
    }

    /// Grid for the current schedule, rebuilt on every call.
    pub fn grid(&self) -> Option<ScheduleGrid> {
        self.schedule().map(build_grid)
    }

    /// Drops the submission in flight without touching the current
    /// schedule, for callers that will never see its outcome.
    pub fn abandon_submission(&mut self) {
        if self.busy {
            warn!("Submission abandoned before the solver answered");
            self.busy = false;
        }
    }

    /// Forgets the files and the schedule. A submission in flight stays
    /// in flight.
    pub fn clear(&mut self) {
        *self = Self {
            busy: self.busy,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_session() -> Session {
        let mut session = Session::new();
        session.select_file(FileSlot::First, UploadedFile::new("rooms.txt", "rooms\n"));
        session.select_file(FileSlot::Second, UploadedFile::new("courses.txt", "course\n"));
        session
    }

    #[test]
    fn submit_requires_both_files() {
        let mut session = Session::new();
        assert!(!session.can_submit());

        session.select_file(FileSlot::First, UploadedFile::new("a.txt", "x"));
        assert!(!session.can_submit());
        match session.begin_submission() {
            Err(SchedulaError::MissingFile(FileSlot::Second)) => {}
            other => panic!("expected missing file2, got {:?}", other),
        }
        assert!(!session.is_busy());
    }

    #[test]
    fn begin_marks_busy_and_blocks_second_submission() {
        let mut session = ready_session();
        let submission = session.begin_submission().unwrap();

        let names: Vec<&str> = submission.parts().map(|(slot, _)| slot.field_name()).collect();
        assert_eq!(names, vec!["file1", "file2"]);
        assert!(session.is_busy());
        assert!(!session.can_submit());
        assert!(matches!(
            session.begin_submission(),
            Err(SchedulaError::SubmissionInProgress)
        ));
    }

    #[test]
    fn successful_result_is_stored() {
        let mut session = ready_session();
        session.begin_submission().unwrap();
        session.finish_submission(Ok(Some(vec![AssignmentRecord::new(101, "MWF9", "cs101")])));

        assert!(!session.is_busy());
        assert_eq!(session.schedule().map(<[_]>::len), Some(1));
        assert!(session.received_at().is_some());
        assert_eq!(session.grid().unwrap().rooms.len(), 1);
    }

    #[test]
    fn missing_schedule_clears_previous_result() {
        let mut session = ready_session();
        session.begin_submission().unwrap();
        session.finish_submission(Ok(Some(vec![AssignmentRecord::new(101, "MWF9", "cs101")])));

        session.begin_submission().unwrap();
        session.finish_submission(Ok(None));
        assert!(session.schedule().is_none());
        assert!(session.grid().is_none());
    }

    #[test]
    fn failure_clears_schedule_and_busy_flag() {
        let mut session = ready_session();
        session.begin_submission().unwrap();
        session.finish_submission(Ok(Some(vec![AssignmentRecord::new(101, "MWF9", "cs101")])));

        session.begin_submission().unwrap();
        session.finish_submission(Err(SchedulaError::SolverStatus { status: 500 }));
        assert!(!session.is_busy());
        assert!(session.schedule().is_none());
        assert!(session.can_submit());
    }

    #[test]
    fn reselecting_replaces_file() {
        let mut session = ready_session();
        session.select_file(FileSlot::First, UploadedFile::new("other.txt", "rooms 2"));
        assert_eq!(session.file(FileSlot::First).unwrap().name, "other.txt");
    }

    #[test]
    fn clear_forgets_everything() {
        let mut session = ready_session();
        session.begin_submission().unwrap();
        session.finish_submission(Ok(Some(vec![AssignmentRecord::new(101, "MWF9", "cs101")])));

        session.clear();
        assert!(session.file(FileSlot::First).is_none());
        assert!(session.schedule().is_none());
        assert!(!session.is_busy());
    }

    #[test]
    fn clear_keeps_submission_in_flight() {
        let mut session = ready_session();
        session.begin_submission().unwrap();

        session.clear();
        assert!(session.is_busy());
        session.select_file(FileSlot::First, UploadedFile::new("a.txt", "a"));
        session.select_file(FileSlot::Second, UploadedFile::new("b.txt", "b"));
        assert!(matches!(
            session.begin_submission(),
            Err(SchedulaError::SubmissionInProgress)
        ));
    }

    #[test]
    fn abandon_frees_session_and_keeps_schedule() {
        let mut session = ready_session();
        session.begin_submission().unwrap();
        session.finish_submission(Ok(Some(vec![AssignmentRecord::new(101, "MWF9", "cs101")])));

        session.begin_submission().unwrap();
        session.abandon_submission();
        assert!(!session.is_busy());
        assert!(session.schedule().is_some());
        assert!(session.can_submit());
    }

    #[test]
    fn slot_numbers() {
        assert_eq!(FileSlot::from_number(1), Some(FileSlot::First));
        assert_eq!(FileSlot::from_number(2), Some(FileSlot::Second));
        assert_eq!(FileSlot::from_number(3), None);
    }
}
