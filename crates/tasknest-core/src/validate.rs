//! Caller-side input validation.
//!
//! The stores accept whatever they are given; forms and the CLI run input
//! through a [`Validator`] first. Limits come from [`TrackerConfig`].

use chrono::{DateTime, Days, Utc};

use crate::config::TrackerConfig;
use crate::domain::{TaskFormData, ValidationError};
use crate::text::plain_text;

#[derive(Debug, Clone)]
pub struct Validator {
    min_title_length: usize,
    min_comment_length: usize,
    max_reply_depth: usize,
    max_future_days: Option<u32>,
}

impl Validator {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            min_title_length: config.min_title_length,
            min_comment_length: config.min_comment_length,
            max_reply_depth: config.max_reply_depth,
            max_future_days: config.max_future_days,
        }
    }

    /// Check a task form. Deadlines are compared by calendar day (UTC).
    pub fn task_form(&self, data: &TaskFormData, now: DateTime<Utc>) -> Result<(), ValidationError> {
        min_trimmed("title", &data.title, self.min_title_length)?;

        if plain_text(&data.description).trim().is_empty() {
            return Err(ValidationError::Required {
                field: "description",
            });
        }

        let today = now.date_naive();
        let day = data.deadline.date_naive();
        if day < today {
            return Err(ValidationError::DeadlineInPast);
        }
        if let Some(max_days) = self.max_future_days {
            let limit = today.checked_add_days(Days::new(u64::from(max_days)));
            if limit.is_some_and(|limit| day > limit) {
                return Err(ValidationError::DeadlineTooFar { max_days });
            }
        }
        Ok(())
    }

    /// Check comment text, returning it trimmed.
    pub fn comment_content<'a>(&self, content: &'a str) -> Result<&'a str, ValidationError> {
        min_trimmed("content", content, self.min_comment_length)?;
        Ok(content.trim())
    }

    /// Check that a reply may be attached under a parent at `parent_depth`.
    pub fn reply_depth(&self, parent_depth: usize) -> Result<(), ValidationError> {
        if parent_depth >= self.max_reply_depth {
            return Err(ValidationError::ReplyTooDeep {
                max_depth: self.max_reply_depth,
            });
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

fn min_trimmed(field: &'static str, value: &str, required: usize) -> Result<(), ValidationError> {
    let actual = value.trim().chars().count();
    if actual == 0 {
        return Err(ValidationError::Required { field });
    }
    if actual < required {
        return Err(ValidationError::TooShort {
            field,
            required,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 15, 30, 0).unwrap()
    }

    fn form(title: &str, description: &str, deadline: DateTime<Utc>) -> TaskFormData {
        TaskFormData {
            title: title.into(),
            description: description.into(),
            deadline,
            status: TaskStatus::Pending,
        }
    }

    #[rstest]
    #[case("Write report", Ok(()))]
    #[case("  ab  ", Err(ValidationError::TooShort { field: "title", required: 3, actual: 2 }))]
    #[case("   ", Err(ValidationError::Required { field: "title" }))]
    fn title_is_checked_after_trimming(
        #[case] title: &str,
        #[case] expected: Result<(), ValidationError>,
    ) {
        let validator = Validator::default();
        assert_eq!(validator.task_form(&form(title, "<p>x</p>", now()), now()), expected);
    }

    #[test]
    fn description_needs_visible_text() {
        let validator = Validator::default();
        assert_eq!(
            validator.task_form(&form("Title", "<p> </p>", now()), now()),
            Err(ValidationError::Required {
                field: "description"
            })
        );
    }

    #[test]
    fn deadline_earlier_today_is_accepted() {
        let validator = Validator::default();
        let this_morning = Utc.with_ymd_and_hms(2024, 5, 10, 1, 0, 0).unwrap();
        assert_eq!(validator.task_form(&form("Title", "d", this_morning), now()), Ok(()));

        let yesterday = now() - Duration::days(1);
        assert_eq!(
            validator.task_form(&form("Title", "d", yesterday), now()),
            Err(ValidationError::DeadlineInPast)
        );
    }

    #[test]
    fn max_future_days_is_inclusive() {
        let config = TrackerConfig {
            max_future_days: Some(30),
            ..TrackerConfig::default()
        };
        let validator = Validator::new(&config);

        let edge = now() + Duration::days(30);
        assert_eq!(validator.task_form(&form("Title", "d", edge), now()), Ok(()));

        let beyond = now() + Duration::days(31);
        assert_eq!(
            validator.task_form(&form("Title", "d", beyond), now()),
            Err(ValidationError::DeadlineTooFar { max_days: 30 })
        );
    }

    #[test]
    fn comment_content_is_trimmed() {
        let validator = Validator::default();
        assert_eq!(validator.comment_content("  hi  "), Ok("hi"));
        assert_eq!(
            validator.comment_content(" \n "),
            Err(ValidationError::Required { field: "content" })
        );
    }

    #[rstest]
    #[case(0, true)]
    #[case(3, true)]
    #[case(4, false)]
    #[case(7, false)]
    fn replies_stop_at_level_four(#[case] parent_depth: usize, #[case] allowed: bool) {
        let validator = Validator::default();
        assert_eq!(validator.reply_depth(parent_depth).is_ok(), allowed);
    }
}
