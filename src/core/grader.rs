use std::collections::BTreeMap;

use super::types::{AnswerField, FieldGrade, Grade, Method, Stats, Truth, Verdict};

/// An answer within 1% of the truth is accepted...
pub const RELATIVE_TOLERANCE: f64 = 0.01;
/// ...and so is one within $500, whichever is more forgiving.
pub const ABSOLUTE_TOLERANCE: f64 = 500.0;

/// Reads a number out of free text such as `"$1,234.50"`. After stripping
/// everything but digits, dots and minus signs, the longest leading number is
/// kept (`"12-"` reads as 12). No leading number at all counts as zero.
pub fn parse_answer(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned[..numeric_prefix_len(&cleaned)]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Length of `[-]digits[.digits]` at the start of `text`, or 0 when no digit
/// is present.
fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let mut digits = 0;
    let mut seen_dot = false;
    while let Some(&byte) = bytes.get(end) {
        match byte {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return 0;
    }
    end
}

pub fn grade_value(field: AnswerField, submitted: f64, expected: f64) -> FieldGrade {
    let abs_error = (submitted - expected).abs();
    let rel_error = if expected != 0.0 {
        (abs_error / expected).abs()
    } else if abs_error != 0.0 {
        1.0
    } else {
        0.0
    };
    // A zero truth has to be matched exactly; the dollar allowance only
    // applies when there is something to be near.
    let within_absolute = expected != 0.0 && abs_error <= ABSOLUTE_TOLERANCE;
    let verdict = if rel_error <= RELATIVE_TOLERANCE || within_absolute {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    };

    FieldGrade {
        field,
        submitted,
        expected,
        abs_error,
        rel_error,
        verdict,
    }
}

/// Grades the two answers that belong to `method`; answers for other
/// methods are ignored and missing ones are scored as zero.
pub fn grade(method: Method, answers: &BTreeMap<AnswerField, String>, truth: &Truth) -> Grade {
    let fields = method
        .answer_fields()
        .into_iter()
        .map(|field| {
            let submitted = answers
                .get(&field)
                .map(|raw| parse_answer(raw))
                .unwrap_or(0.0);
            grade_value(field, submitted, truth.value(field))
        })
        .collect();

    Grade { method, fields }
}

impl Grade {
    pub fn all_correct(&self) -> bool {
        self.fields
            .iter()
            .all(|field| field.verdict == Verdict::Correct)
    }

    pub fn correct_count(&self) -> u32 {
        self.fields
            .iter()
            .filter(|field| field.verdict == Verdict::Correct)
            .count() as u32
    }

    pub fn incorrect_count(&self) -> u32 {
        self.fields.len() as u32 - self.correct_count()
    }

    pub fn verdicts(&self) -> BTreeMap<AnswerField, Verdict> {
        self.fields
            .iter()
            .map(|field| (field.field, field.verdict))
            .collect()
    }
}

impl Stats {
    pub fn record(&mut self, grade: &Grade) {
        self.attempted += 1;
        if grade.all_correct() {
            self.all_correct += 1;
        }
        self.correct += grade.correct_count();
        self.incorrect += grade.incorrect_count();
    }

    pub fn reset(&mut self) {
        *self = Stats::default();
    }

    /// Share of graded fields answered correctly.
    pub fn accuracy(&self) -> f64 {
        let total = self.correct + self.incorrect;
        if total == 0 {
            0.0
        } else {
            self.correct as f64 / total as f64
        }
    }
}
