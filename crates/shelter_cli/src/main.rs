use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use shelter_core::backup;
use shelter_core::core_api::{Engine, KeyPath, Session, WriteOptions};
use shelter_core::{CodecError, SaveDocument};
use shelter_render::{
    render_analysis_json, render_analysis_text, render_failure_text, render_summary_json,
    render_summary_text,
};

#[derive(Debug, Parser)]
#[command(name = "shelter-se", author, version, about)]
struct Cli {
    /// Log decoder attempts and other details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the decoded JSON document
    Decode {
        #[arg(value_name = "SAVE")]
        path: PathBuf,
        /// Indent the output
        #[arg(long)]
        pretty: bool,
        /// Write the JSON to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Encode a JSON document into a save file
    Encode {
        #[arg(value_name = "JSON")]
        path: PathBuf,
        #[arg(long, short, value_name = "SAVE")]
        output: PathBuf,
        /// Overwrite an existing save without backing it up
        #[arg(long)]
        no_backup: bool,
    },
    /// Show the detected format and top-level keys
    Info {
        #[arg(value_name = "SAVE")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Run every decoder and report what each one found
    Analyze {
        #[arg(value_name = "SAVE")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the value stored under a key
    Get {
        #[arg(value_name = "SAVE")]
        path: PathBuf,
        /// Key name, or a JSON pointer with --pointer
        key: String,
        #[arg(long)]
        pointer: bool,
    },
    /// Replace the value stored under a key and save
    Set {
        #[arg(value_name = "SAVE")]
        path: PathBuf,
        /// Key name, or a JSON pointer with --pointer
        key: String,
        /// JSON value; anything that does not parse is stored as a string
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        pointer: bool,
        /// Write to a different file instead of editing in place
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_backup: bool,
    },
    /// Copy a save to a timestamped backup next to it
    Backup {
        #[arg(value_name = "SAVE")]
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = Engine::new();
    match cli.command {
        Command::Decode {
            path,
            pretty,
            output,
        } => {
            let session = open_session(&engine, &path);
            let rendered = if pretty {
                session.document().to_pretty_string()
            } else {
                session.document().to_compact_string()
            };
            let json = rendered.unwrap_or_else(|e| {
                eprintln!("Error rendering JSON output: {e}");
                process::exit(1);
            });

            match output {
                Some(out_path) => {
                    fs::write(&out_path, format!("{json}\n")).unwrap_or_else(|e| {
                        eprintln!("Error writing {}: {e}", out_path.display());
                        process::exit(1);
                    });
                    println!("Wrote {}", out_path.display());
                }
                None => print_stdout(&json),
            }
        }
        Command::Encode {
            path,
            output,
            no_backup,
        } => {
            let bytes = read_file(&path);
            let document = SaveDocument::from_slice(&bytes).unwrap_or_else(|e| {
                eprintln!("Error parsing JSON file: {}", path.display());
                eprintln!("  {e}");
                process::exit(1);
            });
            let session = engine.new_session(document);
            write_session(&session, &output, !no_backup);
        }
        Command::Info { path, json } => {
            let session = open_session(&engine, &path);
            if json {
                print_json(&render_summary_json(&session));
            } else {
                print!("{}", render_summary_text(&session));
            }
        }
        Command::Analyze { path, json } => {
            let bytes = read_file(&path);
            let analysis = engine.analyze_bytes(bytes);
            if json {
                print_json(&render_analysis_json(&analysis));
            } else {
                print!("{}", render_analysis_text(&analysis));
            }
        }
        Command::Get { path, key, pointer } => {
            let session = open_session(&engine, &path);
            match session.get(&key, key_path(pointer)) {
                Some(value) => print_json(value),
                None => {
                    eprintln!("Key not found: {key}");
                    process::exit(1);
                }
            }
        }
        Command::Set {
            path,
            key,
            value,
            pointer,
            output,
            no_backup,
        } => {
            let mut session = open_session(&engine, &path);
            let value = parse_value(&value);
            if !session.set(&key, key_path(pointer), value) {
                eprintln!("Key not found: {key}");
                process::exit(1);
            }
            let target = output.unwrap_or(path);
            write_session(&session, &target, !no_backup);
        }
        Command::Backup { path } => {
            let backup_path = backup::create_backup(&path).unwrap_or_else(|e| {
                eprintln!("Error creating backup: {e}");
                process::exit(1);
            });
            println!("{}", backup_path.display());
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn read_file(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        process::exit(1);
    })
}

fn open_session(engine: &Engine, path: &Path) -> Session {
    let bytes = read_file(path);
    let session = engine.open_bytes(bytes).unwrap_or_else(|e| {
        eprintln!("Error decoding save file: {}", path.display());
        match &e {
            CodecError::DecodeExhausted(report) => {
                eprintln!();
                eprint!("{}", render_failure_text(report));
            }
            _ => eprintln!("  {e}"),
        }
        process::exit(1);
    });
    log::info!("opened {} as {}", path.display(), session.method());
    session
}

fn write_session(session: &Session, target: &Path, backup: bool) {
    let backup_path = session
        .write_to(target, WriteOptions { backup })
        .unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", target.display());
            process::exit(1);
        });
    if let Some(backup_path) = backup_path {
        println!("Backup created: {}", backup_path.display());
    }
    println!("Saved {}", target.display());
}

fn key_path(pointer: bool) -> KeyPath {
    if pointer {
        KeyPath::Pointer
    } else {
        KeyPath::Search
    }
}

fn parse_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

fn print_json(value: &JsonValue) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => print_stdout(&text),
        Err(e) => {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        }
    }
}

// Exits quietly when stdout is closed, e.g. piped into `head`.
fn print_stdout(text: &str) {
    let mut stdout = io::stdout().lock();
    if writeln!(stdout, "{text}").is_err() {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn values_fall_back_to_strings() {
        assert_eq!(parse_value("42"), JsonValue::from(42));
        assert_eq!(parse_value("true"), JsonValue::Bool(true));
        assert_eq!(parse_value("{\"a\":1}"), serde_json::json!({"a": 1}));
        assert_eq!(parse_value("Vault 111"), JsonValue::from("Vault 111"));
        assert_eq!(parse_value("\"042\""), JsonValue::from("042"));
    }
}
