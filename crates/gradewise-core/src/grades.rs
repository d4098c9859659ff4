//! Derived grade views
//!
//! Turns a flat grade list into per-student and per-assessment summaries:
//! percentages, weighted overall averages, a rolling average in grading
//! order and class averages per assessment. Grades whose maximum score is
//! not positive carry no percentage and are left out of every figure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Grade;

/// Weight used when a grade has none
pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub grade_id: String,
    pub assessment_name: String,
    pub score: f64,
    pub max_score: f64,
    pub percent: f64,
    pub weight: f64,
    pub graded_at: Option<DateTime<Utc>>,
}

/// Running mean after each grade, in grading order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingPoint {
    pub assessment_name: String,
    pub graded_at: Option<DateTime<Utc>>,
    pub percent: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub student_name: Option<String>,
    /// Results grouped by assessment name
    pub assessments: BTreeMap<String, Vec<AssessmentResult>>,
    /// Weighted mean percentage; `None` when the total weight is zero
    pub overall_average: Option<f64>,
    pub rolling_average: Vec<RollingPoint>,
}

impl StudentSummary {
    pub fn display_name(&self) -> &str {
        self.student_name.as_deref().unwrap_or(&self.student_id)
    }

    pub fn grade_count(&self) -> usize {
        self.assessments.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentAverage {
    pub assessment_name: String,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
    pub students: Vec<StudentSummary>,
    pub assessments: Vec<AssessmentAverage>,
    /// Grades left out because their maximum score is not positive
    pub skipped: usize,
}

/// Build the summary for a set of grades
///
/// Students are ordered by display name, assessments by name.
pub fn summarize(grades: &[Grade]) -> GradeSummary {
    let mut by_student: BTreeMap<&str, Vec<(&Grade, f64)>> = BTreeMap::new();
    let mut skipped = 0;

    for grade in grades {
        match grade.percent() {
            Some(percent) => by_student
                .entry(grade.student_id.as_str())
                .or_default()
                .push((grade, percent)),
            None => {
                log::debug!(
                    "[grades] Skipping grade {} with max score {}",
                    grade.id,
                    grade.max_score
                );
                skipped += 1;
            }
        }
    }

    let mut students: Vec<StudentSummary> = by_student
        .into_iter()
        .map(|(student_id, graded)| summarize_student(student_id, graded))
        .collect();
    students.sort_by(|a, b| {
        a.display_name()
            .cmp(b.display_name())
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    GradeSummary {
        assessments: assessment_averages(&students),
        students,
        skipped,
    }
}

fn summarize_student(student_id: &str, mut graded: Vec<(&Grade, f64)>) -> StudentSummary {
    // Ungraded dates last; stable sort keeps input order for ties
    graded.sort_by_key(|(grade, _)| (grade.graded_at.is_none(), grade.graded_at));

    let student_name = graded
        .iter()
        .find_map(|(grade, _)| grade.student_name.clone());

    let mut assessments: BTreeMap<String, Vec<AssessmentResult>> = BTreeMap::new();
    let mut rolling_average = Vec::with_capacity(graded.len());
    let mut running_total = 0.0;
    let mut weighted_total = 0.0;
    let mut total_weight = 0.0;

    for (i, (grade, percent)) in graded.iter().enumerate() {
        let weight = grade.weight.unwrap_or(DEFAULT_WEIGHT);
        weighted_total += percent * weight;
        total_weight += weight;

        running_total += percent;
        rolling_average.push(RollingPoint {
            assessment_name: grade.assessment_name.clone(),
            graded_at: grade.graded_at,
            percent: *percent,
            average: running_total / (i + 1) as f64,
        });

        assessments
            .entry(grade.assessment_name.clone())
            .or_default()
            .push(AssessmentResult {
                grade_id: grade.id.clone(),
                assessment_name: grade.assessment_name.clone(),
                score: grade.score,
                max_score: grade.max_score,
                percent: *percent,
                weight,
                graded_at: grade.graded_at,
            });
    }

    StudentSummary {
        student_id: student_id.to_string(),
        student_name,
        assessments,
        overall_average: (total_weight > 0.0).then(|| weighted_total / total_weight),
        rolling_average,
    }
}

fn assessment_averages(students: &[StudentSummary]) -> Vec<AssessmentAverage> {
    let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for result in students
        .iter()
        .flat_map(|s| s.assessments.values().flatten())
    {
        let entry = totals.entry(result.assessment_name.as_str()).or_default();
        entry.0 += result.percent;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(name, (sum, count))| AssessmentAverage {
            assessment_name: name.to_string(),
            average: sum / count as f64,
            count,
        })
        .collect()
}
