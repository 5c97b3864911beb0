//! Experience Verifier: per-skill experience from overlapping work history.
//!
//! Intervals are counted in whole calendar months, both ends inclusive, so a
//! January–June role is 6 months. For each skill the intervals are merged
//! (sorted union, overlapping or adjacent spans coalesce) and the union length
//! is the total. Concurrent roles never double-count.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::profile::WorkHistoryEntry;

/// Inclusive span of month indexes (`year * 12 + month0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthSpan {
    pub start: i32,
    pub end: i32,
}

impl MonthSpan {
    pub fn months(&self) -> u32 {
        (self.end - self.start + 1).max(0) as u32
    }
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Sorted-interval union. O(n log n).
pub fn merge_spans(mut spans: Vec<MonthSpan>) -> Vec<MonthSpan> {
    spans.sort();
    let mut merged: Vec<MonthSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end + 1 => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

pub fn union_months(spans: Vec<MonthSpan>) -> u32 {
    merge_spans(spans).iter().map(MonthSpan::months).sum()
}

/// A role that contributed to a skill's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceProject {
    pub company: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceVerification {
    pub skill: String,
    pub total_months: u32,
    pub required_months: u32,
    pub meets_requirement: bool,
    pub projects: Vec<ExperienceProject>,
}

/// One required-duration line of a vacancy, already canonicalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceRequirement {
    pub key: String,
    pub skill: String,
    pub required_months: u32,
}

/// Verifies every requirement against the work history as of `as_of`.
///
/// `skill_key` maps a raw work-history skill tag to the same key space as
/// `ExperienceRequirement::key`. Open-ended roles run until `as_of`; one that
/// starts after `as_of` contributes nothing. Entries whose end precedes their
/// start are discarded with a warning.
pub fn verify_experience<F>(
    entries: &[WorkHistoryEntry],
    requirements: &[ExperienceRequirement],
    as_of: NaiveDate,
    skill_key: F,
) -> Vec<ExperienceVerification>
where
    F: Fn(&str) -> String,
{
    let valid: Vec<(&WorkHistoryEntry, MonthSpan, Vec<String>)> = entries
        .iter()
        .filter_map(|entry| {
            let end = match entry.end_date {
                Some(end) if end < entry.start_date => {
                    warn!(
                        company = %entry.company,
                        position = %entry.position,
                        start = %entry.start_date,
                        end = %end,
                        "discarding work-history entry that ends before it starts"
                    );
                    return None;
                }
                Some(end) => end,
                None if as_of < entry.start_date => {
                    warn!(
                        company = %entry.company,
                        position = %entry.position,
                        start = %entry.start_date,
                        as_of = %as_of,
                        "skipping open-ended role that has not started yet"
                    );
                    return None;
                }
                None => as_of,
            };
            let span = MonthSpan {
                start: month_index(entry.start_date),
                end: month_index(end),
            };
            let keys: Vec<String> = entry.skills.iter().map(|s| skill_key(s)).collect();
            Some((entry, span, keys))
        })
        .collect();

    requirements
        .iter()
        .map(|req| {
            let mut relevant: Vec<&(&WorkHistoryEntry, MonthSpan, Vec<String>)> = valid
                .iter()
                .filter(|(_, _, keys)| keys.iter().any(|k| *k == req.key))
                .collect();
            relevant.sort_by(|a, b| {
                a.0.start_date
                    .cmp(&b.0.start_date)
                    .then_with(|| a.0.company.cmp(&b.0.company))
            });

            let total_months = union_months(relevant.iter().map(|(_, span, _)| *span).collect());
            let projects = relevant
                .iter()
                .map(|(entry, _, _)| ExperienceProject {
                    company: entry.company.clone(),
                    position: entry.position.clone(),
                    start_date: entry.start_date,
                    end_date: entry.end_date,
                })
                .collect();

            ExperienceVerification {
                skill: req.skill.clone(),
                total_months,
                required_months: req.required_months,
                meets_requirement: total_months >= req.required_months,
                projects,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(company: &str, start: NaiveDate, end: Option<NaiveDate>, skills: &[&str]) -> WorkHistoryEntry {
        WorkHistoryEntry {
            company: company.to_string(),
            position: "Engineer".to_string(),
            start_date: start,
            end_date: end,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn requirement(skill: &str, months: u32) -> ExperienceRequirement {
        ExperienceRequirement {
            key: skill.to_lowercase(),
            skill: skill.to_string(),
            required_months: months,
        }
    }

    fn lower(s: &str) -> String {
        s.to_lowercase()
    }

    #[test]
    fn test_overlapping_intervals_use_union() {
        let entries = vec![
            entry("A", date(2021, 1, 1), Some(date(2021, 6, 30)), &["Python"]),
            entry("B", date(2021, 3, 1), Some(date(2021, 9, 30)), &["Python"]),
        ];
        let result = verify_experience(&entries, &[requirement("Python", 9)], date(2024, 1, 1), lower);
        assert_eq!(result[0].total_months, 9);
        assert!(result[0].meets_requirement);
        assert_eq!(result[0].projects.len(), 2);
    }

    #[test]
    fn test_adjacent_intervals_merge() {
        let spans = vec![
            MonthSpan { start: 0, end: 5 },
            MonthSpan { start: 6, end: 8 },
        ];
        assert_eq!(merge_spans(spans), vec![MonthSpan { start: 0, end: 8 }]);
    }

    #[test]
    fn test_disjoint_intervals_sum() {
        let entries = vec![
            entry("A", date(2019, 1, 1), Some(date(2019, 3, 31)), &["Go"]),
            entry("B", date(2020, 1, 1), Some(date(2020, 3, 31)), &["Go"]),
        ];
        let result = verify_experience(&entries, &[requirement("Go", 12)], date(2024, 1, 1), lower);
        assert_eq!(result[0].total_months, 6);
        assert!(!result[0].meets_requirement);
    }

    #[test]
    fn test_nested_interval_counted_once() {
        let spans = vec![
            MonthSpan { start: 0, end: 23 },
            MonthSpan { start: 5, end: 10 },
        ];
        assert_eq!(union_months(spans), 24);
    }

    #[test]
    fn test_open_interval_runs_until_as_of() {
        let entries = vec![entry("A", date(2023, 1, 15), None, &["Rust"])];
        let result = verify_experience(&entries, &[requirement("Rust", 12)], date(2023, 12, 1), lower);
        assert_eq!(result[0].total_months, 12);
        assert!(result[0].meets_requirement);
        assert_eq!(result[0].projects[0].end_date, None);
    }

    #[test]
    fn test_malformed_interval_discarded() {
        let entries = vec![
            entry("Broken", date(2022, 6, 1), Some(date(2021, 1, 1)), &["SQL"]),
            entry("Fine", date(2022, 1, 1), Some(date(2022, 2, 28)), &["SQL"]),
        ];
        let result = verify_experience(&entries, &[requirement("SQL", 1)], date(2024, 1, 1), lower);
        assert_eq!(result[0].total_months, 2);
        assert_eq!(result[0].projects.len(), 1);
        assert_eq!(result[0].projects[0].company, "Fine");
    }

    #[test]
    fn test_open_role_starting_after_as_of_counts_nothing() {
        let entries = vec![
            entry("Upcoming", date(2024, 3, 1), None, &["Kotlin"]),
            entry("Current", date(2023, 7, 1), None, &["Kotlin"]),
        ];
        let result = verify_experience(&entries, &[requirement("Kotlin", 6)], date(2023, 12, 15), lower);
        assert_eq!(result[0].total_months, 6);
        assert!(result[0].meets_requirement);
        assert_eq!(result[0].projects.len(), 1);
        assert_eq!(result[0].projects[0].company, "Current");
    }

    #[test]
    fn test_skill_without_history_is_zero() {
        let entries = vec![entry("A", date(2021, 1, 1), Some(date(2021, 6, 30)), &["Python"])];
        let result = verify_experience(&entries, &[requirement("Kotlin", 6)], date(2024, 1, 1), lower);
        assert_eq!(result[0].total_months, 0);
        assert!(!result[0].meets_requirement);
        assert!(result[0].projects.is_empty());
    }

    #[test]
    fn test_zero_requirement_always_met() {
        let result = verify_experience(&[], &[requirement("Kotlin", 0)], date(2024, 1, 1), lower);
        assert!(result[0].meets_requirement);
    }

    #[test]
    fn test_skill_key_applied_to_tags() {
        let entries = vec![entry("A", date(2021, 1, 1), Some(date(2021, 12, 31)), &["k8s"])];
        let key = |s: &str| if s == "k8s" { "kubernetes".to_string() } else { s.to_lowercase() };
        let result = verify_experience(&entries, &[requirement("Kubernetes", 12)], date(2024, 1, 1), key);
        assert_eq!(result[0].total_months, 12);
    }
}
