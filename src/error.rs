#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the lower bound is greater than the upper bound.
    #[error("invalid bounds: low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a normal parameter is declared with a non-positive standard deviation.
    #[error("invalid standard deviation: {0} must be positive")]
    InvalidStdDev(f64),

    /// Returned when a discrete parameter has no values.
    #[error("discrete values cannot be empty")]
    EmptyValues,

    /// Returned when a discrete parameter mixes value kinds (e.g. integers and strings).
    #[error("discrete parameter '{name}' mixes value kinds")]
    MixedValueKinds {
        /// The name of the offending parameter.
        name: String,
    },

    /// Returned when two parameters in a search space share a name.
    #[error("duplicate parameter name '{name}'")]
    DuplicateParameter {
        /// The repeated name.
        name: String,
    },

    /// Returned when a value cannot be encoded by its parameter.
    #[error("value {value} is not valid for parameter '{name}'")]
    InvalidValue {
        /// The parameter the value was offered to.
        name: String,
        /// Display form of the rejected value.
        value: String,
    },

    /// Returned when an encoded vector's length does not match the space arity.
    #[error("dimension mismatch: expected {expected} values but got {got}")]
    DimensionMismatch {
        /// The expected number of dimensions.
        expected: usize,
        /// The actual number of dimensions.
        got: usize,
    },

    /// Returned when restored data conflicts with the parameter schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Returned when a generation slot exceeds its attempt cap.
    ///
    /// The cascade has become selective enough that rejection sampling can no
    /// longer find accepted candidates within the configured budget.
    #[error("generator exhausted after {attempts} rejected attempts for one sample")]
    GeneratorExhausted {
        /// Attempts spent on the slot that gave up.
        attempts: u64,
    },

    /// Returned when the user evaluation function fails.
    #[error("evaluation failed: {message}")]
    Evaluation {
        /// Display form of the user function's error.
        message: String,
    },

    /// Returned when one evaluation exceeds the configured time limit.
    #[error("evaluation timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    EvaluationTimeout {
        /// Observed duration of the evaluation, in milliseconds.
        elapsed_ms: u128,
        /// The configured limit, in milliseconds.
        limit_ms: u128,
    },

    /// Returned when training is stopped through the engine's cancellation token.
    #[error("cancelled")]
    Cancelled,

    /// Returned when a checkpoint read or write fails.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
