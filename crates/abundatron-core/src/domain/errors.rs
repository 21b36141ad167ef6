use std::error::Error;
use std::fmt::{Display, Formatter};

pub type InspectResult<T> = Result<T, InspectError>;

/// Exit code reported when at least one batch item failed.
pub const ITEM_FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectErrorCategory {
    InputValidationError,
    RangeError,
    NetworkError,
    ParseError,
    IoSystemError,
    InternalError,
}

impl InspectErrorCategory {
    pub const fn descriptor(self) -> CategoryDescriptor {
        match self {
            Self::InputValidationError => CategoryDescriptor {
                exit_code: 2,
                name: "InputValidationError",
            },
            Self::RangeError => CategoryDescriptor {
                exit_code: 3,
                name: "RangeError",
            },
            Self::NetworkError => CategoryDescriptor {
                exit_code: 4,
                name: "NetworkError",
            },
            Self::ParseError => CategoryDescriptor {
                exit_code: 5,
                name: "ParseError",
            },
            Self::IoSystemError => CategoryDescriptor {
                exit_code: 6,
                name: "IoSystemError",
            },
            Self::InternalError => CategoryDescriptor {
                exit_code: 7,
                name: "InternalError",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.descriptor().exit_code
    }

    pub const fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Categories that fail a single batch item rather than the whole run.
    pub const fn is_item_scoped(self) -> bool {
        matches!(self, Self::RangeError | Self::NetworkError | Self::ParseError)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDescriptor {
    pub exit_code: i32,
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectError {
    category: InspectErrorCategory,
    code: &'static str,
    message: String,
}

impl InspectError {
    pub fn new(category: InspectErrorCategory, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(InspectErrorCategory::InputValidationError, code, message)
    }

    pub fn range(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(InspectErrorCategory::RangeError, code, message)
    }

    pub fn network(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(InspectErrorCategory::NetworkError, code, message)
    }

    pub fn parse(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(InspectErrorCategory::ParseError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(InspectErrorCategory::IoSystemError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(InspectErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> InspectErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for InspectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.category.name(), self.code, self.message)
    }
}

impl Error for InspectError {}
