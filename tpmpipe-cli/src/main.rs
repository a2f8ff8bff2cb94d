//! CLI for the tpmpipe TPM 2.0 stream relay.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

use std::fs::File;
use std::io::{self, Read, Write};

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tpmpipe::Encoding;
use tpmpipe_wire::DEFAULT_MAX_MESSAGE;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tpmpipe",
    version,
    about = "Relay TPM 2.0 command streams to the system TPM"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Relay framed commands from the input stream until it closes.
    Relay(StreamArgs),

    /// Submit the whole input as a single command and write the response.
    Send(StreamArgs),

    /// Decode whitespace-separated hex text on stdin to raw bytes on stdout.
    Unhex,

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct StreamArgs {
    /// Command source (`-` for stdin).
    #[arg(short = 'i', long = "in", value_name = "FILE", default_value = "-")]
    input: String,

    /// Response sink (`-` for stdout).
    #[arg(short = 'o', long = "out", value_name = "FILE", default_value = "-")]
    output: String,

    /// Exchange messages as hex text instead of raw binary.
    #[arg(short = 'x', long)]
    hex: bool,

    /// TPM device node (default: probe /dev/tpmrm0, then /dev/tpm0).
    #[arg(long, value_name = "PATH")]
    device: Option<String>,

    /// Largest total message accepted, in binary bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_MESSAGE)]
    max_size: usize,
}

impl StreamArgs {
    const fn encoding(&self) -> Encoding {
        if self.hex { Encoding::Hex } else { Encoding::Binary }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = Cli::parse().dispatch() {
        eprintln!("tpmpipe: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

impl Cli {
    fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Relay(args) => run_relay(&args),
            Command::Send(args) => run_send(&args),
            Command::Unhex => unhex(),
            Command::Completion { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Self::command(),
                    "tpmpipe",
                    &mut std::io::stdout(),
                );
                Ok(())
            }
        }
    }
}

fn run_relay(args: &StreamArgs) -> Result<()> {
    anyhow::ensure!(
        args.max_size >= tpmpipe_wire::HEADER_SIZE,
        "--max-size must be at least the {}-byte header",
        tpmpipe_wire::HEADER_SIZE
    );
    let mut input = open_input(&args.input)?;
    let mut output = open_output(&args.output)?;
    let mut tpm = open_transport(args)?;
    tpmpipe::relay(
        &mut input,
        &mut output,
        &mut tpm,
        args.encoding(),
        args.max_size,
    )?;
    Ok(())
}

fn run_send(args: &StreamArgs) -> Result<()> {
    let mut input = open_input(&args.input)?;
    let mut output = open_output(&args.output)?;
    let mut tpm = open_transport(args)?;
    tpmpipe::send_one(&mut input, &mut output, &mut tpm, args.encoding())?;
    Ok(())
}

/// Decodes hex text from stdin to raw bytes on stdout, ignoring ASCII
/// whitespace like the hex-mode sender does.
fn unhex() -> Result<()> {
    let mut text = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut text)
        .context("reading stdin")?;
    text.retain(|b| !b.is_ascii_whitespace());
    let bytes = tpmpipe_wire::decode(&text)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes).context("writing stdout")?;
    stdout.flush().context("flushing stdout")?;
    Ok(())
}

/// Opens the command source; `-` is stdin.
fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("opening input file {path}"))?;
    Ok(Box::new(file))
}

/// Opens the response sink; `-` is stdout. Files are created or truncated.
fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(path).with_context(|| format!("creating output file {path}"))?;
    Ok(Box::new(file))
}

#[cfg(unix)]
fn open_transport(args: &StreamArgs) -> Result<tpmpipe::DeviceTransport> {
    Ok(match &args.device {
        Some(path) => tpmpipe::DeviceTransport::new(path, args.max_size),
        None => tpmpipe::DeviceTransport::detect(args.max_size)?,
    })
}

#[cfg(windows)]
fn open_transport(args: &StreamArgs) -> Result<tpmpipe::TbsTransport> {
    if args.device.is_some() {
        anyhow::bail!("--device applies to TPM device nodes, not TBS");
    }
    Ok(tpmpipe::TbsTransport::new(args.max_size))
}

/// Transport failures exit with the access layer's status code;
/// everything else exits 1.
#[allow(clippy::cast_possible_wrap)]
fn exit_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<tpmpipe::Error>() {
        Some(tpmpipe::Error::Transport { code, .. }) => *code as i32,
        _ => 1,
    }
}
