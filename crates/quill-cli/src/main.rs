//! Quill operator binary.
//!
//! # Usage
//!
//! ```bash
//! # Provision a key pair for an admin
//! quill --key-dir ~/.quill keygen alice
//!
//! # Seal a message from alice to bob
//! quill --key-dir ~/.quill seal alice --to bob=<public key> "copy desk at 4"
//!
//! # Read stored content as bob
//! quill --key-dir ~/.quill open bob '<content>'
//! ```

use std::{
    error::Error,
    io::{self, Read, Write},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use quill_cli::{describe, keygen, open, parse_recipient, seal};
use quill_core::{FileKeyStore, SystemEnv};
use quill_proto::Identity;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Quill operator tooling
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Key provisioning and offline envelope tooling for Quill")]
#[command(version)]
struct Args {
    /// Directory holding one key pair file per identity
    #[arg(long, default_value = ".quill/keys")]
    key_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and store a key pair, printing the public key
    Keygen {
        /// Admin username
        identity: String,

        /// Replace an existing key pair
        #[arg(long)]
        force: bool,
    },

    /// Seal a message as the given sender
    Seal {
        /// Sending admin
        sender: String,

        /// Recipient as identity=public_key (repeatable)
        #[arg(long = "to", required = true)]
        recipients: Vec<String>,

        /// Produce the single-recipient legacy format
        #[arg(long)]
        legacy: bool,

        /// Message text; read from stdin when absent
        message: Option<String>,
    },

    /// Decrypt raw content as the given admin
    Open {
        /// Reading admin
        identity: String,

        /// Raw content; read from stdin when absent
        content: Option<String>,
    },

    /// Describe the format of raw content
    Inspect {
        /// Raw content; read from stdin when absent
        content: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let store = FileKeyStore::new(&args.key_dir);
    tracing::debug!(dir = %store.dir().display(), "using key directory");

    let output = match args.command {
        Command::Keygen { identity, force } => {
            keygen(&store, &Identity::new(identity), force, &SystemEnv)?.public_key
        },
        Command::Seal { sender, recipients, legacy, message } => {
            let recipients =
                recipients.iter().map(|arg| parse_recipient(arg)).collect::<Result<Vec<_>, _>>()?;
            let message = arg_or_stdin(message)?;
            seal(&store, &Identity::new(sender), &recipients, &message, legacy, &SystemEnv)?
        },
        Command::Open { identity, content } => {
            open(&store, &Identity::new(identity), &arg_or_stdin(content)?)?
        },
        Command::Inspect { content } => describe(&arg_or_stdin(content)?),
    };

    writeln!(io::stdout().lock(), "{output}")?;
    Ok(())
}

fn arg_or_stdin(arg: Option<String>) -> io::Result<String> {
    if let Some(value) = arg {
        return Ok(value);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
}
