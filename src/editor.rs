//! Edit-session state for one exam's grade ranges.
//!
//! State is never mutated in place: [`reduce`] returns the next state, and
//! [`commit`] is the only transition that reaches the store. A failed commit
//! (validation or store) leaves the edited ranges exactly as they were.

use crate::error::ServiceError;
use crate::grades::{self, Grade, GradeRangeError, GradeRangeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub exam_id: String,
    pub ranges: GradeRangeSet,
    /// Last configuration known to be persisted.
    pub baseline: GradeRangeSet,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    Loaded(GradeRangeSet),
    SetMin(Grade, Option<f64>),
    SetMax(Grade, Option<f64>),
    ClearGrade(Grade),
    /// Whole edited set submitted at once.
    ReplaceAll(GradeRangeSet),
    Reset,
}

/// Complete replacement payload: always six records in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub exam_id: String,
    pub ranges: GradeRangeSet,
}

impl EditorState {
    pub fn new(exam_id: impl Into<String>) -> Self {
        Self {
            exam_id: exam_id.into(),
            ranges: GradeRangeSet::unset(),
            baseline: GradeRangeSet::unset(),
            last_error: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.ranges != self.baseline
    }
}

pub fn reduce(state: &EditorState, action: EditorAction) -> EditorState {
    let mut next = state.clone();
    match action {
        EditorAction::Loaded(set) => {
            next.baseline = set.clone();
            next.ranges = set;
            next.last_error = None;
        }
        EditorAction::SetMin(grade, v) => {
            next.ranges.set_min(grade, v);
            next.last_error = None;
        }
        EditorAction::SetMax(grade, v) => {
            next.ranges.set_max(grade, v);
            next.last_error = None;
        }
        EditorAction::ClearGrade(grade) => {
            next.ranges.set_min(grade, None);
            next.ranges.set_max(grade, None);
            next.last_error = None;
        }
        EditorAction::ReplaceAll(set) => {
            next.ranges = set;
            next.last_error = None;
        }
        EditorAction::Reset => {
            next.ranges = next.baseline.clone();
            next.last_error = None;
        }
    }
    next
}

pub fn prepare_save(state: &EditorState) -> Result<SaveRequest, GradeRangeError> {
    grades::validate(&state.ranges)?;
    Ok(SaveRequest {
        exam_id: state.exam_id.clone(),
        ranges: state.ranges.clone(),
    })
}

/// Validates, then hands the replacement set to `persist`. `persist` is not called
/// when validation fails.
pub fn commit<T, F>(state: &EditorState, persist: F) -> (EditorState, Result<T, ServiceError>)
where
    F: FnOnce(&SaveRequest) -> anyhow::Result<T>,
{
    let mut next = state.clone();
    let result = prepare_save(state)
        .map_err(ServiceError::from)
        .and_then(|req| persist(&req).map_err(ServiceError::from));
    match &result {
        Ok(_) => {
            next.baseline = next.ranges.clone();
            next.last_error = None;
        }
        Err(e) => next.last_error = Some(e.to_string()),
    }
    (next, result)
}
