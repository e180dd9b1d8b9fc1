use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

pub const SCALE_MIN: f64 = 0.0;
pub const SCALE_MAX: f64 = 100.0;

/// Largest distance allowed between one band's max and the next band's min.
/// Adjacent integer bounds (Pass ends at 39, Lower Credit starts at 40) differ by 1.
pub const GAP_TOLERANCE: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    Fail,
    Pass,
    LowerCredit,
    Credit,
    UpperCredit,
    Distinction,
}

impl Grade {
    /// Canonical order, low to high.
    pub const ALL: [Grade; 6] = [
        Grade::Fail,
        Grade::Pass,
        Grade::LowerCredit,
        Grade::Credit,
        Grade::UpperCredit,
        Grade::Distinction,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Grade::Fail => "Fail",
            Grade::Pass => "Pass",
            Grade::LowerCredit => "Lower Credit",
            Grade::Credit => "Credit",
            Grade::UpperCredit => "Upper Credit",
            Grade::Distinction => "Distinction",
        }
    }

    /// Exact match on the wire label. No case folding: the backend stores labels verbatim.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|g| g.label() == label)
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One record as exchanged with the front-end and stored per exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeRecord {
    pub grade: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeRange {
    pub grade: Grade,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl GradeRange {
    pub fn unset(grade: Grade) -> Self {
        Self {
            grade,
            min: None,
            max: None,
        }
    }

    /// Both bounds, when the range is fully specified. Partial ranges yield `None`.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.min.is_some() != self.max.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    grade: Grade,
    min: f64,
    max: f64,
}

/// Exactly six ranges, one per grade, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRangeSet {
    ranges: [GradeRange; 6],
}

impl Default for GradeRangeSet {
    fn default() -> Self {
        Self::unset()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("unknown grade: {0:?}")]
    UnknownGrade(String),
    #[error("duplicate grade: {0}")]
    DuplicateGrade(Grade),
    #[error("{grade} {field} must be a finite number")]
    NonFinite { grade: Grade, field: &'static str },
}

impl GradeRangeSet {
    pub fn unset() -> Self {
        Self {
            ranges: Grade::ALL.map(GradeRange::unset),
        }
    }

    /// Builds a set from fetched records. Grades missing from `records` stay unset.
    pub fn from_records(records: &[GradeRecord]) -> Result<Self, RecordError> {
        let mut set = Self::unset();
        let mut seen = [false; 6];
        for rec in records {
            let grade = Grade::parse(&rec.grade)
                .ok_or_else(|| RecordError::UnknownGrade(rec.grade.clone()))?;
            if seen[grade.position()] {
                return Err(RecordError::DuplicateGrade(grade));
            }
            seen[grade.position()] = true;
            check_finite(grade, "min", rec.min)?;
            check_finite(grade, "max", rec.max)?;
            let slot = set.slot_mut(grade);
            slot.min = rec.min;
            slot.max = rec.max;
        }
        Ok(set)
    }

    pub fn to_records(&self) -> Vec<GradeRecord> {
        self.ranges
            .iter()
            .map(|r| GradeRecord {
                grade: r.grade.label().to_string(),
                min: r.min,
                max: r.max,
            })
            .collect()
    }

    pub fn get(&self, grade: Grade) -> &GradeRange {
        &self.ranges[grade.position()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &GradeRange> {
        self.ranges.iter()
    }

    pub fn set_min(&mut self, grade: Grade, min: Option<f64>) {
        self.slot_mut(grade).min = min;
    }

    pub fn set_max(&mut self, grade: Grade, max: Option<f64>) {
        self.slot_mut(grade).max = max;
    }

    pub fn is_unconfigured(&self) -> bool {
        self.iter().all(|r| r.min.is_none() && r.max.is_none())
    }

    fn slot_mut(&mut self, grade: Grade) -> &mut GradeRange {
        &mut self.ranges[grade.position()]
    }

    fn bands(&self) -> Vec<Band> {
        self.iter()
            .filter_map(|r| {
                r.bounds().map(|(min, max)| Band {
                    grade: r.grade,
                    min,
                    max,
                })
            })
            .collect()
    }

    fn sorted_bands(&self) -> Vec<Band> {
        let mut bands = self.bands();
        // Stable: equal mins keep canonical grade order.
        bands.sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(Ordering::Equal));
        bands
    }
}

fn check_finite(grade: Grade, field: &'static str, v: Option<f64>) -> Result<(), RecordError> {
    match v {
        Some(n) if !n.is_finite() => Err(RecordError::NonFinite { grade, field }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeRangeError {
    #[error("Invalid range for {grade}: min ({min}) cannot be greater than max ({max})")]
    MinAboveMax { grade: Grade, min: f64, max: f64 },
    #[error("Invalid range for {grade}: values must be between 0 and 100")]
    OutOfBounds { grade: Grade, min: f64, max: f64 },
    #[error("Grade ranges overlap: {lower} ({lower_min}-{lower_max}) and {upper} ({upper_min}-{upper_max})")]
    Overlap {
        lower: Grade,
        lower_min: f64,
        lower_max: f64,
        upper: Grade,
        upper_min: f64,
        upper_max: f64,
    },
    #[error("Grade ranges do not cover full range, should start at 0 (lowest min is {min})")]
    StartsAboveZero { min: f64 },
    #[error("Grade ranges do not cover full range, should end at 100 (highest max is {max})")]
    EndsBelowHundred { max: f64 },
    #[error("Grade ranges have a gap between {lower} (max {lower_max}) and {upper} (min {upper_min})")]
    Gap {
        lower: Grade,
        lower_max: f64,
        upper: Grade,
        upper_min: f64,
    },
}

impl GradeRangeError {
    pub fn rule(&self) -> &'static str {
        match self {
            Self::MinAboveMax { .. } => "min_above_max",
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::Overlap { .. } => "overlap",
            Self::StartsAboveZero { .. } => "starts_above_zero",
            Self::EndsBelowHundred { .. } => "ends_below_hundred",
            Self::Gap { .. } => "gap",
        }
    }
}

/// Checks a proposed configuration before it is persisted.
///
/// Only fully-specified ranges take part; a range with a single bound is treated as
/// not yet configured. Rules run in a fixed order and the first violation is returned:
/// min/max order, 0..=100 bounds, overlap, coverage of both scale ends, gaps wider
/// than [`GAP_TOLERANCE`].
pub fn validate(set: &GradeRangeSet) -> Result<(), GradeRangeError> {
    let bands = set.bands();

    for b in &bands {
        if b.min > b.max {
            return Err(GradeRangeError::MinAboveMax {
                grade: b.grade,
                min: b.min,
                max: b.max,
            });
        }
    }
    for b in &bands {
        // NaN fails every comparison, so it has to be caught explicitly.
        let finite = b.min.is_finite() && b.max.is_finite();
        if !finite || b.min < SCALE_MIN || b.max > SCALE_MAX {
            return Err(GradeRangeError::OutOfBounds {
                grade: b.grade,
                min: b.min,
                max: b.max,
            });
        }
    }
    if bands.is_empty() {
        return Ok(());
    }

    let sorted = set.sorted_bands();
    for pair in sorted.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        if cur.max >= next.min {
            return Err(GradeRangeError::Overlap {
                lower: cur.grade,
                lower_min: cur.min,
                lower_max: cur.max,
                upper: next.grade,
                upper_min: next.min,
                upper_max: next.max,
            });
        }
    }

    let lowest = sorted.iter().map(|b| b.min).fold(f64::INFINITY, f64::min);
    let highest = sorted.iter().map(|b| b.max).fold(f64::NEG_INFINITY, f64::max);
    if lowest > SCALE_MIN {
        return Err(GradeRangeError::StartsAboveZero { min: lowest });
    }
    if highest < SCALE_MAX {
        return Err(GradeRangeError::EndsBelowHundred { max: highest });
    }

    for pair in sorted.windows(2) {
        let (cur, next) = (pair[0], pair[1]);
        if next.min - cur.max > GAP_TOLERANCE {
            return Err(GradeRangeError::Gap {
                lower: cur.grade,
                lower_max: cur.max,
                upper: next.grade,
                upper_min: next.min,
            });
        }
    }

    Ok(())
}

/// Maps a score to the band containing it. A score that falls between two adjacent
/// bands within the tolerance (39.5 with bands ending at 39 and starting at 40)
/// belongs to the lower band.
pub fn classify(set: &GradeRangeSet, score: f64) -> Option<Grade> {
    if !score.is_finite() || !(SCALE_MIN..=SCALE_MAX).contains(&score) {
        return None;
    }
    let bands = set.sorted_bands();
    for (i, b) in bands.iter().enumerate() {
        if score >= b.min && score <= b.max {
            return Some(b.grade);
        }
        if score > b.max {
            if let Some(next) = bands.get(i + 1) {
                if score < next.min && next.min - b.max <= GAP_TOLERANCE {
                    return Some(b.grade);
                }
            }
        }
    }
    None
}
