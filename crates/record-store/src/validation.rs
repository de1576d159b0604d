//! Input validation for record, note, message and announcement fields.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is not `local@domain.tld`.
    InvalidEmail(String),
    /// Phone contact does not match the mobile numbering pattern.
    InvalidContact { field: String, value: String },
    /// Value is not one of the allowed choices.
    InvalidChoice { field: String, value: String },
    /// Field is filled from the profile and cannot be edited.
    ReadOnly(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl ValidationError {
    /// Name of the field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::InvalidEmail(_) => "email",
            ValidationError::InvalidContact { field, .. }
            | ValidationError::InvalidChoice { field, .. }
            | ValidationError::TooLong { field, .. } => field,
            ValidationError::ReadOnly(field) | ValidationError::Empty(field) => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(value) => {
                write!(f, "'{}' is not a valid email address", value)
            }
            ValidationError::InvalidContact { field, value } => {
                write!(f, "{} '{}' is not a valid mobile number", field, value)
            }
            ValidationError::InvalidChoice { field, value } => {
                write!(f, "'{}' is not a valid {}", value, field)
            }
            ValidationError::ReadOnly(field) => {
                write!(f, "{} is filled from your profile and cannot be edited", field)
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for note, message and announcement bodies.
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Default mobile pattern: Kenyan Safaricom/Airtel style numbers.
pub const DEFAULT_CONTACT_PATTERN: &str = r"^(\+?254|0)[17]\d{8}$";

static DEFAULT_CONTACT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_CONTACT_PATTERN).expect("Invalid default contact pattern"));

/// Mobile numbering rule for the target locale.
#[derive(Debug, Clone)]
pub struct ContactRule {
    regex: Regex,
}

impl Default for ContactRule {
    fn default() -> Self {
        Self {
            regex: DEFAULT_CONTACT_REGEX.clone(),
        }
    }
}

impl ContactRule {
    /// Build a rule from a custom pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The underlying pattern.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Validate a contact number. Surrounding whitespace is ignored.
    pub fn validate(&self, field: &str, value: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Empty(field.to_string()));
        }
        if !self.regex.is_match(value) {
            return Err(ValidationError::InvalidContact {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

/// Require a non-empty value after trimming.
pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }
    Ok(())
}

/// Require non-empty trimmed free text within the content length limit.
pub fn validate_content(field: &str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    validate_required(field, value)?;

    let len = value.chars().count();
    if len > MAX_CONTENT_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CONTENT_LENGTH,
            actual: len,
        });
    }
    Ok(())
}

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)+$").expect("Invalid email pattern")
});

/// Customer or account email: `local@domain.tld`, no spaces, at most
/// [`MAX_EMAIL_LENGTH`] bytes.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    validate_required("email", email)?;

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}
