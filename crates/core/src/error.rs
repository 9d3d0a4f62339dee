//! Engine errors

use thiserror::Error;

use crate::engine::Algorithm;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid variant {0}, expected a value in 1..=7")]
    InvalidVariant(i32),

    #[error("invalid batch multiplier {0}, expected a value in 1..=5")]
    InvalidMultiplier(usize),

    #[error("unknown algorithm \"{0}\"")]
    UnknownAlgorithm(String),

    #[error("self-test failed for {algorithm} variant {variant} (multiplier {multiplier})")]
    SelfTestFailed {
        algorithm: Algorithm,
        variant: i32,
        multiplier: usize,
    },
}
