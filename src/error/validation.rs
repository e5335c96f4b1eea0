use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Region must not be empty.")]
    RegionEmpty,
    #[error("Region '{value}' must not contain '{delimiter}'.")]
    RegionContainsDelimiter {
        value: String,
        delimiter: &'static str,
    },
    #[error("Owner of region '{value}' must not be empty.")]
    RegionOwnerEmpty { value: String },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid boolean value '{value}'.")]
    InvalidBoolean { value: String },
    #[error("Invalid agent status '{value}'.")]
    InvalidAgentStatus { value: String },
    #[error("Invalid request type '{value}'.")]
    InvalidRequestType { value: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
