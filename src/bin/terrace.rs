//! Command-line interface for terrace
//! Compiles stylesheet and markup sources and prints the result to stdout.
//!
//! Usage:
//!   terrace css `<path>` [--style `<style>`] [--const name=value]...   - Compile a stylesheet
//!   terrace html `<path>` [--vars `<file>`] [--set name=value]...      - Compile and render markup
//!   terrace styles                                                   - List output styles
//!   terrace clear `<root>`                                             - Delete compiled templates
//!
//! Configuration is read from the embedded defaults, then `./terrace.toml` when present,
//! then the file given with `--config`, then the `--debug`/`--no-cache` flags.

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::metadata::LevelFilter;

use terrace::{Loader, MarkupEngine, StylesheetCompiler, TerraceConfig};

fn main() {
    let matches = Command::new("terrace")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile indentation-based markup and stylesheets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the defaults"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Log more (-v for debug, -vv for trace)"),
        )
        .subcommand(
            Command::new("css")
                .about("Compile a stylesheet to CSS")
                .arg(
                    Arg::new("path")
                        .help("Path to the stylesheet")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("style")
                        .long("style")
                        .short('s')
                        .help("Output style (see `terrace styles`)"),
                )
                .arg(
                    Arg::new("cache-dir")
                        .long("cache-dir")
                        .help("Cache compiled CSS in this directory"),
                )
                .arg(
                    Arg::new("const")
                        .long("const")
                        .action(ArgAction::Append)
                        .help("Define a constant, e.g. --const accent=#336699"),
                ),
        )
        .subcommand(
            Command::new("html")
                .about("Compile and render a markup template")
                .arg(
                    Arg::new("path")
                        .help("Path to the template")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("root")
                        .long("root")
                        .help("Directory includes are resolved against (default: the template's)"),
                )
                .arg(
                    Arg::new("vars")
                        .long("vars")
                        .help("JSON or YAML file with bindings"),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .action(ArgAction::Append)
                        .help("Bind a string value, e.g. --set title=Home"),
                )
                .arg(
                    Arg::new("compile-only")
                        .long("compile-only")
                        .action(ArgAction::SetTrue)
                        .help("Print the compiled template instead of rendering it"),
                )
                .arg(
                    Arg::new("debug")
                        .long("debug")
                        .action(ArgAction::SetTrue)
                        .help("Prefix output lines with source line numbers"),
                )
                .arg(
                    Arg::new("no-cache")
                        .long("no-cache")
                        .action(ArgAction::SetTrue)
                        .help("Always recompile"),
                ),
        )
        .subcommand(Command::new("styles").about("List available stylesheet output styles"))
        .subcommand(
            Command::new("clear")
                .about("Delete compiled templates")
                .arg(
                    Arg::new("root")
                        .help("Template root")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    setup_tracing(matches.get_count("verbose"));

    let config = load_config(&matches).unwrap_or_else(|e| fail("Configuration error", e));
    match matches.subcommand() {
        Some(("css", css_matches)) => handle_css_command(config, css_matches),
        Some(("html", html_matches)) => handle_html_command(config, html_matches),
        Some(("styles", _)) => handle_styles_command(config),
        Some(("clear", clear_matches)) => handle_clear_command(config, clear_matches),
        _ => unreachable!(),
    }
}

fn setup_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .without_time()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<TerraceConfig, config::ConfigError> {
    let mut loader = Loader::new().with_optional_file("terrace.toml");
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(("html", html)) = matches.subcommand() {
        if html.get_flag("debug") {
            loader = loader.markup("debug", true)?;
        }
        if html.get_flag("no-cache") {
            loader = loader.markup("no_cache", true)?;
        }
    }
    loader.build()
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {error}");
    std::process::exit(1);
}

/// Handle the css command
fn handle_css_command(config: TerraceConfig, matches: &ArgMatches) {
    let mut compiler = StylesheetCompiler::new(config.stylesheet);
    if let Some(dir) = matches.get_one::<String>("cache-dir") {
        compiler = compiler.with_cache_dir(dir);
    }
    if let Some(style) = matches.get_one::<String>("style") {
        if let Err(e) = compiler.set_style(style) {
            eprintln!("{e}");
            eprintln!("\nAvailable styles:");
            for name in compiler.renderers().list_styles() {
                eprintln!("  {name}");
            }
            std::process::exit(1);
        }
    }

    let constants: Vec<(String, String)> = matches
        .get_many::<String>("const")
        .into_iter()
        .flatten()
        .map(|pair| split_pair(pair).unwrap_or_else(|e| fail("Invalid --const", e)))
        .collect();
    let constants: Vec<(&str, &str)> = constants
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();

    let path = matches
        .get_one::<String>("path")
        .expect("path is a required argument");
    let css = compiler
        .compile_file(path, &constants)
        .unwrap_or_else(|e| fail("Compilation error", e));
    println!("{css}");
}

/// Handle the html command
fn handle_html_command(config: TerraceConfig, matches: &ArgMatches) {
    let path = PathBuf::from(
        matches
            .get_one::<String>("path")
            .expect("path is a required argument"),
    );

    let root = matches
        .get_one::<String>("root")
        .map(PathBuf::from)
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let mut engine = MarkupEngine::new(config.markup, root);

    if let Some(vars) = matches.get_one::<String>("vars") {
        let bindings = read_bindings(Path::new(vars)).unwrap_or_else(|e| fail("Invalid --vars", e));
        engine.bindings_mut().append(bindings);
    }
    for pair in matches.get_many::<String>("set").into_iter().flatten() {
        let (name, value) = split_pair(pair).unwrap_or_else(|e| fail("Invalid --set", e));
        engine.assign(name, value);
    }

    let output = if matches.get_flag("compile-only") {
        engine.compile_file(&path).map(|template| template.code)
    } else {
        engine.fetch(&path)
    };
    print!("{}", output.unwrap_or_else(|e| fail("Template error", e)));
}

/// Handle the styles command
fn handle_styles_command(config: TerraceConfig) {
    let compiler = StylesheetCompiler::new(config.stylesheet);
    println!("Available output styles:\n");
    for name in compiler.renderers().list_styles() {
        let description = compiler
            .renderers()
            .get(&name)
            .map(|renderer| renderer.description().to_string())
            .unwrap_or_default();
        println!("  {name:<10} {description}");
    }
}

/// Handle the clear command
fn handle_clear_command(config: TerraceConfig, matches: &ArgMatches) {
    let root = matches
        .get_one::<String>("root")
        .expect("root is a required argument");
    let engine = MarkupEngine::new(config.markup, root);
    let removed = engine
        .clear_compiled()
        .unwrap_or_else(|e| fail("Failed to clear compiled templates", e));
    println!("Removed {removed} compiled template(s)");
}

fn split_pair(pair: &str) -> Result<(String, String), String> {
    pair.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{pair}'"))
}

/// Read bindings from a JSON or YAML file (by extension, JSON otherwise).
fn read_bindings(path: &Path) -> Result<Vec<(String, Value)>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&text).map_err(|e| e.to_string())?,
        _ => serde_json::from_str(&text).map_err(|e| e.to_string())?,
    };
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(format!("{}: expected a mapping at the top level", path.display())),
    }
}
