use thiserror::Error;

/// Errors from parsing or running a scenario file (§6).
///
/// This is the one place in the crate where a malformed *input* produces a
/// `Result::Err` rather than a silent no-op: the engine's own admission
/// rules (duplicate id, unfillable FillOrKill, ...) are expected
/// rejections and never surface as errors (§7), but a scenario line that
/// doesn't parse is a defect in the caller's input and should abort that
/// scenario loudly.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("line {line}: empty record")]
    EmptyLine { line: usize },

    #[error("line {line}: unknown record kind `{kind}`")]
    UnknownKind { line: usize, kind: String },

    #[error("line {line}: missing field `{field}`")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: invalid side `{value}`, expected `B` or `S`")]
    InvalidSide { line: usize, value: String },

    #[error(
        "line {line}: invalid order kind `{value}`, expected one of GoodTillCancel, \
         FillAndKill, FillOrKill, GoodForDay, Market"
    )]
    InvalidKind { line: usize, value: String },

    #[error("line {line}: invalid integer `{value}`: {source}")]
    InvalidInteger {
        line: usize,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("line {line}: negative value `{value}` is not allowed")]
    NegativeValue { line: usize, value: String },
}
