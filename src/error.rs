//! Miner errors

use std::path::PathBuf;

use thiserror::Error;

use crate::algorithm::EngineError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid blob hex: {0}")]
    BlobHex(hex::FromHexError),

    #[error("Invalid blob size {0}, expected 76..=84 bytes")]
    BlobSize(usize),

    #[error("Invalid target hex: {0}")]
    TargetHex(String),

    #[error("Target must not be zero")]
    ZeroTarget,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("No {aes} variant hashes {multiplier} lanes per call")]
    NoVariant {
        multiplier: usize,
        aes: &'static str,
    },

    #[error("Variant {variant} hashes {lanes} lanes but the multiplier is {multiplier}")]
    LaneMismatch {
        variant: i32,
        lanes: usize,
        multiplier: usize,
    },

    #[error("Thread count must be at least 1")]
    NoThreads,
}

#[derive(Error, Debug)]
pub enum MinerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
