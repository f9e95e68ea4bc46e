use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Score, ScoreKind};

const ORAL_COEFF: f64 = 1.0;
const FIFTEEN_MINUTES_COEFF: f64 = 1.0;
const MIDTERM_COEFF: f64 = 2.0;
const FINAL_COEFF: f64 = 3.0;

fn coeff(score: &Score) -> f64 {
    use ScoreKind::*;

    match score.kind {
        Oral => ORAL_COEFF,
        FifteenMinutes => FIFTEEN_MINUTES_COEFF,
        Midterm => MIDTERM_COEFF,
        Final => FINAL_COEFF,
    }
}

/// Rounds to two decimals, the precision shown on report cards.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `sum(value * coeff) / sum(coeff)`, or `None` without any score.
pub fn weighted_average<'a>(scores: impl IntoIterator<Item = &'a Score>) -> Option<f64> {
    let mut total = 0.0;
    let mut weights = 0.0;

    for score in scores {
        let coeff = coeff(score);
        total += score.value * coeff;
        weights += coeff;
    }

    if weights > 0.0 {
        Some(round2(total / weights))
    } else {
        None
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    #[serde(rename = "Giỏi")]
    Excellent,
    #[serde(rename = "Khá")]
    Good,
    #[serde(rename = "Trung bình")]
    Average,
    #[serde(rename = "Yếu")]
    Weak,
    #[serde(rename = "Kém")]
    Poor,
}

pub fn classification(gpa: f64) -> Classification {
    if gpa >= 8.0 {
        Classification::Excellent
    } else if gpa >= 6.5 {
        Classification::Good
    } else if gpa >= 5.0 {
        Classification::Average
    } else if gpa >= 3.5 {
        Classification::Weak
    } else {
        Classification::Poor
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubjectAverage {
    pub subject_id: u32,
    pub score_count: usize,
    pub average: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GradeReport {
    pub subjects: Vec<SubjectAverage>,
    pub gpa: Option<f64>,
    pub classification: Option<Classification>,
}

/// Weighted average per subject, and the GPA as the mean of the subject averages.
pub fn grade_report(scores: &[&Score]) -> GradeReport {
    let mut by_subject: BTreeMap<u32, Vec<&Score>> = BTreeMap::new();

    for score in scores {
        by_subject.entry(score.subject_id).or_default().push(*score);
    }

    let subjects: Vec<SubjectAverage> = by_subject
        .into_iter()
        .map(|(subject_id, scores)| SubjectAverage {
            subject_id,
            score_count: scores.len(),
            average: weighted_average(scores.iter().copied()),
        })
        .collect();

    let averages: Vec<f64> = subjects.iter().filter_map(|s| s.average).collect();

    let gpa = if averages.is_empty() {
        None
    } else {
        Some(round2(averages.iter().sum::<f64>() / averages.len() as f64))
    };

    GradeReport {
        subjects,
        gpa,
        classification: gpa.map(classification),
    }
}
