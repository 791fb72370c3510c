/*
 * lua/render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render and write operations of the `jinja` module.
 *
 * Every operation takes its context as a JSON-encoded string and parses
 * it before touching the engine; malformed JSON fails the call rather
 * than rendering partial output.
 */

use std::path::Path;

use mlua::{Lua, Result, Table};

use crate::engine::parse_context;

use super::{SharedSession, to_lua_error};

/// Register the render/write functions on the module table.
pub fn register_render_functions(lua: &Lua, module: &Table, session: SharedSession) -> Result<()> {
    // render(templateText, jsonData) - render inline template text
    let s = session.clone();
    module.set(
        "render",
        lua.create_function(move |_, (tpl, data): (String, String)| {
            let ctx = parse_context(&data).map_err(to_lua_error)?;
            s.borrow().render_str(&tpl, &ctx).map_err(to_lua_error)
        })?,
    )?;

    // render_file(file, jsonData) - render a template file.
    // parse_template is the historical alias for the same operation.
    let s = session.clone();
    let render_file = lua.create_function(move |_, (file, data): (String, String)| {
        let ctx = parse_context(&data).map_err(to_lua_error)?;
        s.borrow()
            .render_file(Path::new(&file), &ctx)
            .map_err(to_lua_error)
    })?;
    module.set("render_file", render_file.clone())?;
    module.set("parse_template", render_file)?;

    // render_file_with_json_file(file, jsonDataFile) - template and
    // context both read from disk
    let s = session.clone();
    module.set(
        "render_file_with_json_file",
        lua.create_function(move |_, (file, data_file): (String, String)| {
            s.borrow()
                .render_file_with_json_file(Path::new(&file), Path::new(&data_file))
                .map_err(to_lua_error)
        })?,
    )?;

    // write(templateOrFile, jsonData, outFile) - render (from file when
    // the first argument names one, inline otherwise) and write the
    // result. Output errors are surfaced, not swallowed.
    let s = session.clone();
    module.set(
        "write",
        lua.create_function(move |_, (tpl, data, out): (String, String, String)| {
            let ctx = parse_context(&data).map_err(to_lua_error)?;
            s.borrow()
                .write(&tpl, &ctx, Path::new(&out))
                .map_err(to_lua_error)
        })?,
    )?;

    // write_with_json_file(file, jsonDataFile, outFile)
    let s = session;
    module.set(
        "write_with_json_file",
        lua.create_function(
            move |_, (file, data_file, out): (String, String, String)| {
                s.borrow()
                    .write_with_json_file(Path::new(&file), Path::new(&data_file), Path::new(&out))
                    .map_err(to_lua_error)
            },
        )?,
    )?;

    Ok(())
}
