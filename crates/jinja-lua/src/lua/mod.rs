/*
 * lua/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Registration of the `jinja` Lua module.
 *
 * The module is a table of typed native functions over a shared render
 * session. Argument conversion and validation happen at the mlua boundary
 * before any native code runs; render and configuration errors are mapped
 * to Lua runtime errors and propagate through the VM's normal error
 * mechanism (observable with pcall).
 */

pub mod config;
pub mod render;


use std::cell::RefCell;
use std::sync::Arc;

use mlua::{Lua, Result, Table};

use crate::engine::RenderSession;
use crate::errors::RenderError;

/// Name under which the module is registered, both as a global and in
/// `package.loaded`.
pub const MODULE_NAME: &str = "jinja";

/// Shared handle to a render session, captured by the registered
/// closures. One handle per registered module; modules in different Lua
/// states never share configuration.
pub type SharedSession = Arc<RefCell<RenderSession>>;

/// Create a new shared render session.
pub fn create_shared_session() -> SharedSession {
    Arc::new(RefCell::new(RenderSession::new()))
}

/// Map a render error to a Lua runtime error.
pub(crate) fn to_lua_error(err: RenderError) -> mlua::Error {
    mlua::Error::runtime(err.to_string())
}

/// Register the `jinja` module with a fresh session.
pub fn register_jinja_module(lua: &Lua) -> Result<Table> {
    register_jinja_module_with_session(lua, create_shared_session())
}

/// Register the `jinja` module backed by the given session.
///
/// The returned table is also set as the global `jinja` and stored in
/// `package.loaded["jinja"]` so `require("jinja")` resolves it.
pub fn register_jinja_module_with_session(lua: &Lua, session: SharedSession) -> Result<Table> {
    let module = lua.create_table()?;

    // version() - binding version string "major.minor.revision"
    module.set(
        "version",
        lua.create_function(|_, ()| Ok(RenderSession::version()))?,
    )?;

    render::register_render_functions(lua, &module, session.clone())?;
    config::register_config_functions(lua, &module, session)?;

    lua.globals().set(MODULE_NAME, module.clone())?;
    let loaded: Table = lua.globals().get::<Table>("package")?.get("loaded")?;
    loaded.set(MODULE_NAME, module.clone())?;

    Ok(module)
}
