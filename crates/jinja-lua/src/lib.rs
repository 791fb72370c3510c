/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Lua bindings to the [MiniJinja](https://docs.rs/minijinja) template
//! engine.
//!
//! This crate is a binding layer: it registers a `jinja` module in an
//! embedded Lua 5.4 state whose functions marshal Lua arguments into
//! engine calls and marshal the results back. All template semantics
//! (expression syntax, control structures, whitespace handling, include
//! resolution) belong to the engine; this layer only translates.
//!
//! Contexts are passed as JSON-encoded strings and parsed into structured
//! values before rendering. Configuration (delimiters, whitespace flags,
//! include behavior) lives in a per-module [`RenderSession`], so two Lua
//! states never share engine state.
//!
//! # Example
//!
//! ```ignore
//! use mlua::Lua;
//! use jinja_lua::register_jinja_module;
//!
//! let lua = Lua::new();
//! register_jinja_module(&lua)?;
//! lua.load(r#"
//!     print(jinja.render("Hello {{ name }}!", '{"name": "world"}'))
//! "#).exec()?;
//! ```

pub mod engine;
pub mod errors;
pub mod lua;

// Re-export main types at crate root
pub use engine::{Delimiters, RenderSession, parse_context};
pub use errors::{RenderError, RenderResult};
pub use lua::{MODULE_NAME, register_jinja_module, register_jinja_module_with_session};
