//! jinja-lua CLI - Lua scripting host for jinja-style template rendering

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mlua::Lua;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jinja_lua::engine::{RenderSession, parse_context};
use jinja_lua::register_jinja_module;

#[derive(Parser)]
#[command(name = "jinja-lua")]
#[command(version)]
#[command(about = "Run Lua scripts with the jinja template module", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a Lua script with the jinja module pre-registered
    Run {
        /// Path to the Lua script
        script: PathBuf,

        /// Arguments exposed to the script through the `arg` table
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Render a single template and print or write the result
    Render {
        /// Template text, or path to a template file
        template: String,

        /// JSON context
        #[arg(long, default_value = "{}", conflicts_with = "data_file")]
        data: String,

        /// Read the JSON context from a file
        #[arg(long)]
        data_file: Option<PathBuf>,

        /// Write output to FILE instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jinja_lua=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { script, args } => run_script(&script, &args),
        Commands::Render {
            template,
            data,
            data_file,
            output,
        } => render_once(&template, &data, data_file.as_deref(), output.as_deref()),
    }
}

fn run_script(script: &Path, args: &[String]) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("failed to read script '{}'", script.display()))?;

    let lua = Lua::new();
    register_jinja_module(&lua).map_err(lua_error)?;

    // Lua convention: arg[0] is the script name, arg[1..] the arguments
    let arg_table = lua.create_table().map_err(lua_error)?;
    arg_table
        .set(0, script.to_string_lossy().to_string())
        .map_err(lua_error)?;
    for (i, value) in args.iter().enumerate() {
        arg_table.set(i + 1, value.as_str()).map_err(lua_error)?;
    }
    lua.globals().set("arg", arg_table).map_err(lua_error)?;

    lua.load(&source)
        .set_name(script.to_string_lossy())
        .exec()
        .map_err(lua_error)
}

fn render_once(
    template: &str,
    data: &str,
    data_file: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let ctx = match data_file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read context file '{}'", path.display()))?;
            parse_context(&text)?
        }
        None => parse_context(data)?,
    };

    let session = RenderSession::new();
    let template_path = Path::new(template);
    let rendered = if template_path.is_file() {
        session.render_file(template_path, &ctx)?
    } else {
        session.render_str(template, &ctx)?
    };

    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write output '{}'", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn lua_error(err: mlua::Error) -> anyhow::Error {
    anyhow::anyhow!("{err}")
}
