use thiserror::Error;

#[derive(Error, Debug)]
pub enum R2lError {
    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error("shape mismatch in {op}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("batch size mismatch: expected {expected} environment slots, got {got}")]
    BatchSizeMismatch { expected: usize, got: usize },

    #[error("invalid action space: {0}")]
    InvalidSpace(String),

    #[error("invalid action {action} for {op}")]
    InvalidAction { op: &'static str, action: f64 },
}

pub type Result<T> = std::result::Result<T, R2lError>;

impl R2lError {
    pub fn shape_mismatch(op: &'static str, expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            op,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}
