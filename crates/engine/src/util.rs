//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trim and collapse inner whitespace of a category label.
pub(crate) fn normalize_category_display(input: &str) -> ResultEngine<String> {
    let mut out = String::new();
    for token in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() {
        return Err(EngineError::InvalidCategory(
            "category must not be empty".to_string(),
        ));
    }
    Ok(out)
}

/// Grouping key for a category label.
///
/// Decomposes the label (NFKD), drops combining marks, lower-cases
/// alphanumerics and collapses every run of other characters into one
/// space, so `"Food"`, `" food "` and `"FOOD!"` share a key.
pub(crate) fn normalize_category_key(input: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim_end();
    if normalized.is_empty() {
        return Err(EngineError::InvalidCategory(format!(
            "category '{}' has no letters or digits",
            input.trim()
        )));
    }
    Ok(normalized.to_string())
}

/// Both forms of a category: `(display, key)`.
pub(crate) fn normalize_category(input: &str) -> ResultEngine<(String, String)> {
    let display = normalize_category_display(input)?;
    let key = normalize_category_key(&display)?;
    Ok((display, key))
}

/// Trim tags, drop empty ones and deduplicate. Tags are a set, so the
/// result is sorted.
pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let set: BTreeSet<String> = tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect();
    set.into_iter().collect()
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::MissingField(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_month(month: u32, year: i32) -> ResultEngine<()> {
    if !(1..=12).contains(&month) {
        return Err(EngineError::InvalidPeriod(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    if !(1970..=9999).contains(&year) {
        return Err(EngineError::InvalidPeriod(format!(
            "year out of range: {year}"
        )));
    }
    Ok(())
}

/// Calendar month as a half-open UTC range `[first day, first day of next month)`.
pub(crate) fn month_bounds(month: u32, year: i32) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    validate_month(month, year)?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::InvalidPeriod(format!("invalid month {month}/{year}")))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| EngineError::InvalidPeriod(format!("invalid month {month}/{year}")))?;
    Ok((day_start(start)?, day_start(end)?))
}

/// Inclusive day range as a half-open UTC range `[start 00:00, end + 1 day 00:00)`.
pub(crate) fn day_range_bounds(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ResultEngine<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(EngineError::InvalidPeriod(
            "start date must not be after end date".to_string(),
        ));
    }
    let from = start.map(day_start).transpose()?;
    let to = end
        .map(|day| {
            day.succ_opt()
                .ok_or_else(|| EngineError::InvalidPeriod("end date out of range".to_string()))
                .and_then(day_start)
        })
        .transpose()?;
    Ok((from, to))
}

fn day_start(day: NaiveDate) -> ResultEngine<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| EngineError::InvalidPeriod(format!("invalid date {day}")))
}

/// Owner check shared by every entity: missing -> 404, other owner -> 403.
pub(crate) fn ensure_owner<T>(
    model: Option<T>,
    owner_of: impl Fn(&T) -> &str,
    user_id: &str,
    label: &str,
) -> ResultEngine<T> {
    let model = model.ok_or_else(|| EngineError::KeyNotFound(format!("{label} not exists")))?;
    if owner_of(&model) != user_id {
        return Err(EngineError::Forbidden(format!(
            "{label} belongs to another user"
        )));
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn category_key_ignores_case_spacing_and_accents() {
        assert_eq!(normalize_category_key("Food").unwrap(), "food");
        assert_eq!(normalize_category_key("  food ").unwrap(), "food");
        assert_eq!(normalize_category_key("Café & Bar").unwrap(), "cafe bar");
        assert!(normalize_category_key("!!!").is_err());
    }

    #[test]
    fn category_display_collapses_whitespace() {
        assert_eq!(
            normalize_category_display("  Eating   out ").unwrap(),
            "Eating out"
        );
        assert!(normalize_category_display("   ").is_err());
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![
            " work ".to_string(),
            "salary".to_string(),
            "work".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["salary", "work"]);
    }

    #[test]
    fn december_rolls_over_to_next_year() {
        let (start, end) = month_bounds(12, 2024).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert!(month_bounds(0, 2025).is_err());
        assert!(month_bounds(13, 2025).is_err());
    }

    #[test]
    fn day_range_end_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1);
        let end = NaiveDate::from_ymd_opt(2025, 3, 31);
        let (from, to) = day_range_bounds(start, end).unwrap();
        assert_eq!(from, Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()));
        assert_eq!(to, Some(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()));
        assert!(day_range_bounds(end, start).is_err());
    }
}
