/*
 * errors.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for rendering and session configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while rendering templates or mutating a session.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template syntax error, missing include, or invalid syntax
    /// configuration, as reported by the engine.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The JSON context string was not well-formed.
    #[error("invalid JSON context: {0}")]
    Context(#[from] serde_json::Error),

    /// A template or context file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The output file could not be created or written.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
