use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use validator::{Validate, ValidationErrors};

use crate::api::errors::{ApiError, FieldErrors};
use crate::db::types::ChoiceError;

pub(crate) const MIN_PASSWORD_LEN: usize = 8;
pub(crate) const REQUIRED: &str = "This field is required.";
pub(crate) const BLANK: &str = "This field may not be blank.";
pub(crate) const VIDEO_URL_INVALID: &str = "Link is invalid. Only youtube.com links are allowed.";

/// How much of a payload a write must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    Create,
    /// PUT: every required field again.
    Replace,
    /// PATCH: any subset.
    Partial,
}

impl WriteMode {
    pub(crate) fn requires_all(self) -> bool {
        !matches!(self, Self::Partial)
    }
}

/// Accumulates field messages so a single response reports every problem.
#[derive(Debug, Default)]
pub(crate) struct FieldReport {
    errors: FieldErrors,
}

impl FieldReport {
    /// Starts from the derive-based checks of `payload`.
    pub(crate) fn of(payload: &impl Validate) -> Self {
        let mut report = Self::default();
        if let Err(errors) = payload.validate() {
            report.absorb(&errors);
        }
        report
    }

    pub(crate) fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    pub(crate) fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub(crate) fn require<T>(&mut self, mode: WriteMode, field: &str, value: &Option<T>) {
        if mode.requires_all() && value.is_none() {
            self.add(field, REQUIRED);
        }
    }

    /// Rejects present-but-blank text.
    pub(crate) fn not_blank(&mut self, field: &str, value: &Option<String>) {
        if value.as_deref().is_some_and(|text| text.trim().is_empty()) && !self.has(field) {
            self.add(field, BLANK);
        }
    }

    pub(crate) fn choice<T>(&mut self, field: &str, raw: Option<&str>) -> Option<T>
    where
        T: FromStr<Err = ChoiceError>,
    {
        match raw?.parse::<T>() {
            Ok(value) => Some(value),
            Err(error) => {
                self.add(field, error.to_string());
                None
            }
        }
    }

    /// Numeric id filter from a query string; blank means "no filter".
    pub(crate) fn id_filter(&mut self, field: &str, raw: Option<&str>) -> Option<i64> {
        let raw = raw.map(str::trim).filter(|raw| !raw.is_empty())?;
        match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                self.add(field, "Enter a whole number.");
                None
            }
        }
    }

    pub(crate) fn absorb(&mut self, errors: &ValidationErrors) {
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                self.add(&field, message);
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Unwraps a field that `FieldReport::require` already vetted.
pub(crate) fn present<T>(field: &str, value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::validation(field, REQUIRED))
}

/// Message for a foreign-key id that names no row.
pub(crate) fn does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Query-string text filter; blank means "no filter".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Trims surrounding whitespace of an optional text field.
pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string())
}

pub(crate) fn validate_username(username: &str) -> Result<(), &'static str> {
    let valid = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.")
    }
}

pub(crate) fn validate_password_len(password: &str) -> Result<(), String> {
    if password.chars().count() >= MIN_PASSWORD_LEN {
        Ok(())
    } else {
        Err(format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."))
    }
}

/// The bare youtube.com domain with no path or query, so real video URLs are
/// rejected.
static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?youtube\.com/?$").expect("video url regex is invalid")
});

pub(crate) fn validate_video_url(value: &str) -> Result<(), &'static str> {
    if VIDEO_URL.is_match(value) {
        Ok(())
    } else {
        Err(VIDEO_URL_INVALID)
    }
}
