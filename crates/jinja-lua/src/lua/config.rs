/*
 * lua/config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Configuration functions of the `jinja` module: delimiter setters,
 * behavior flags, and in-memory template registration. Mutations apply
 * to this module's session only and are observed by subsequent renders.
 */

use mlua::{Lua, Result, Table};

use super::{SharedSession, to_lua_error};

/// Register the configuration functions on the module table.
pub fn register_config_functions(lua: &Lua, module: &Table, session: SharedSession) -> Result<()> {
    // set_expression(open, close)
    let s = session.clone();
    module.set(
        "set_expression",
        lua.create_function(move |_, (open, close): (String, String)| {
            s.borrow_mut()
                .set_expression(&open, &close)
                .map_err(to_lua_error)
        })?,
    )?;

    // set_statement(open, close)
    let s = session.clone();
    module.set(
        "set_statement",
        lua.create_function(move |_, (open, close): (String, String)| {
            s.borrow_mut()
                .set_statement(&open, &close)
                .map_err(to_lua_error)
        })?,
    )?;

    // set_comment(open, close)
    let s = session.clone();
    module.set(
        "set_comment",
        lua.create_function(move |_, (open, close): (String, String)| {
            s.borrow_mut()
                .set_comment(&open, &close)
                .map_err(to_lua_error)
        })?,
    )?;

    // set_line_statement(open)
    let s = session.clone();
    module.set(
        "set_line_statement",
        lua.create_function(move |_, open: String| {
            s.borrow_mut().set_line_statement(&open).map_err(to_lua_error)
        })?,
    )?;

    // set_search_included_templates_in_files(bool)
    let s = session.clone();
    module.set(
        "set_search_included_templates_in_files",
        lua.create_function(move |_, enabled: bool| {
            s.borrow_mut().set_search_included_templates_in_files(enabled);
            Ok(())
        })?,
    )?;

    // set_trim_blocks(bool)
    let s = session.clone();
    module.set(
        "set_trim_blocks",
        lua.create_function(move |_, enabled: bool| {
            s.borrow_mut().set_trim_blocks(enabled);
            Ok(())
        })?,
    )?;

    // set_lstrip_blocks(bool)
    let s = session.clone();
    module.set(
        "set_lstrip_blocks",
        lua.create_function(move |_, enabled: bool| {
            s.borrow_mut().set_lstrip_blocks(enabled);
            Ok(())
        })?,
    )?;

    // set_throw_at_missing_includes(bool)
    let s = session.clone();
    module.set(
        "set_throw_at_missing_includes",
        lua.create_function(move |_, enabled: bool| {
            s.borrow_mut().set_throw_at_missing_includes(enabled);
            Ok(())
        })?,
    )?;

    // include_template(name, templateText) - parse and register an
    // in-memory template for later {% include %} resolution
    let s = session;
    module.set(
        "include_template",
        lua.create_function(move |_, (name, tpl): (String, String)| {
            s.borrow_mut()
                .include_template(&name, &tpl)
                .map_err(to_lua_error)
        })?,
    )?;

    Ok(())
}
