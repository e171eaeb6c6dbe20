//! flashkv-inspect - Decode a captured RESP request stream
//!
//! Reads client commands from stdin or a file, prints each one in a quoted,
//! escaped form (the way `MONITOR` shows them) and reports totals. Every line
//! is staged in an arena that is reset after the line is written.

use anyhow::Context;
use flashkv_core::arena::{Arena, DEFAULT_ARENA_CAPACITY};
use flashkv_core::ingress::{CommandBuffer, DEFAULT_MAX_BUFFER_SIZE};
use flashkv_core::protocol::{Command, ParserLimits, DEFAULT_MAX_ARRAY_LEN, DEFAULT_MAX_BULK_LEN};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Inspector configuration
struct Config {
    /// Read from this file instead of stdin
    file: Option<PathBuf>,
    /// Capacity of the staging arena
    arena_size: usize,
    /// Maximum bulk string length accepted
    max_bulk: usize,
    /// Maximum number of arguments per command
    max_args: usize,
    /// Maximum unparsed bytes held at once
    max_buffer: usize,
    /// Only print the summary
    quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: None,
            arena_size: DEFAULT_ARENA_CAPACITY,
            max_bulk: DEFAULT_MAX_BULK_LEN,
            max_args: DEFAULT_MAX_ARRAY_LEN,
            max_buffer: DEFAULT_MAX_BUFFER_SIZE,
            quiet: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--file" | "-f" => {
                    config.file = Some(PathBuf::from(required_value(&args, i)));
                    i += 2;
                }
                "--arena-size" => {
                    config.arena_size = parse_value(&args, i);
                    i += 2;
                }
                "--max-bulk" => {
                    config.max_bulk = parse_value(&args, i);
                    i += 2;
                }
                "--max-args" => {
                    config.max_args = parse_value(&args, i);
                    i += 2;
                }
                "--max-buffer" => {
                    config.max_buffer = parse_value(&args, i);
                    i += 2;
                }
                "--quiet" | "-q" => {
                    config.quiet = true;
                    i += 1;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("flashkv-inspect version {}", flashkv_core::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn limits(&self) -> ParserLimits {
        ParserLimits::default()
            .with_max_array_len(self.max_args)
            .with_max_bulk_len(self.max_bulk)
    }
}

fn required_value(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", args[i]);
            std::process::exit(1);
        }
    }
}

fn parse_value<T: FromStr>(args: &[String], i: usize) -> T {
    required_value(args, i).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for {}", args[i]);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
flashkv-inspect - Decode a captured RESP request stream

USAGE:
    flashkv-inspect [OPTIONS]

OPTIONS:
    -f, --file <PATH>          Read from a file instead of stdin
        --arena-size <BYTES>   Staging arena capacity (default: 65536)
        --max-bulk <BYTES>     Largest bulk string accepted (default: 536870912)
        --max-args <N>         Most arguments per command (default: 1048576)
        --max-buffer <BYTES>   Most unparsed bytes held (default: 67108864)
    -q, --quiet                Only print the summary
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLES:
    printf '*1\r\n$4\r\nPING\r\n' | flashkv-inspect
    flashkv-inspect --file capture.resp --quiet
    RUST_LOG=trace flashkv-inspect -f capture.resp
"#
    );
}

/// Totals for one inspected stream
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    commands: u64,
    arguments: u64,
    bytes: u64,
    largest_command: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Logs go to stderr so stdout only carries decoded commands
    let default_level = if config.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = tokio::io::stdout();
    let summary = match &config.file {
        Some(path) => {
            let mut file = File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            info!(file = %path.display(), "Reading request stream");
            inspect(&mut file, &mut stdout, &config).await?
        }
        None => {
            info!("Reading request stream from stdin");
            inspect(&mut tokio::io::stdin(), &mut stdout, &config).await?
        }
    };

    info!(
        commands = summary.commands,
        arguments = summary.arguments,
        bytes = summary.bytes,
        largest_command = summary.largest_command,
        "Inspection complete"
    );
    Ok(())
}

/// Decodes every command from `reader`, writing one line per command to `out`.
async fn inspect<R, W>(reader: &mut R, out: &mut W, config: &Config) -> anyhow::Result<Summary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = CommandBuffer::with_limits(config.limits(), config.max_buffer);
    let mut arena = Arena::new(config.arena_size);
    let mut summary = Summary::default();

    loop {
        // Drain every complete command before reading again (pipelining)
        while let Some((consumed, line)) = buffer
            .with_next_command(|cmd| {
                summary.commands += 1;
                summary.arguments += cmd.len() as u64;
                (cmd.consumed(), render_command(&arena, cmd))
            })
            .context("malformed request stream")?
        {
            summary.largest_command = summary.largest_command.max(consumed);

            match line {
                Some(line) if !config.quiet => out.write_all(line).await?,
                Some(_) => {}
                None => warn!(
                    consumed,
                    arena_size = arena.capacity(),
                    "Command too large to render"
                ),
            }
            arena.reset();
        }

        let n = buffer.fill_from(reader).await?;
        if n == 0 {
            buffer.finish().context("request stream truncated")?;
            break;
        }
        summary.bytes += n as u64;
        debug!(bytes = n, "Read chunk");
    }

    out.flush().await?;
    Ok(summary)
}

/// Renders a command as space-separated quoted tokens followed by a newline.
///
/// Returns `None` if the arena can't hold the line.
fn render_command<'a>(arena: &'a Arena, cmd: &Command<'_>) -> Option<&'a mut [u8]> {
    let quoted: usize = cmd
        .tokens()
        .iter()
        .map(|token| token.iter().map(|&b| escaped_len(b)).sum::<usize>() + 2)
        .sum();
    let len = quoted + cmd.len().saturating_sub(1) + 1;

    let line = arena.allocate(len)?;
    let mut pos = 0;
    for (i, token) in cmd.tokens().iter().enumerate() {
        if i > 0 {
            line[pos] = b' ';
            pos += 1;
        }
        line[pos] = b'"';
        pos += 1;
        for &byte in token.iter() {
            pos += write_escaped(byte, &mut line[pos..]);
        }
        line[pos] = b'"';
        pos += 1;
    }
    line[pos] = b'\n';

    Some(line)
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn escaped_len(byte: u8) -> usize {
    match byte {
        b'"' | b'\\' | b'\r' | b'\n' | b'\t' => 2,
        0x20..=0x7e => 1,
        _ => 4,
    }
}

fn write_escaped(byte: u8, out: &mut [u8]) -> usize {
    let escape = |out: &mut [u8], c: u8| {
        out[0] = b'\\';
        out[1] = c;
        2
    };

    match byte {
        b'"' | b'\\' => escape(out, byte),
        b'\r' => escape(out, b'r'),
        b'\n' => escape(out, b'n'),
        b'\t' => escape(out, b't'),
        0x20..=0x7e => {
            out[0] = byte;
            1
        }
        _ => {
            out[..4].copy_from_slice(&[
                b'\\',
                b'x',
                HEX[usize::from(byte >> 4)],
                HEX[usize::from(byte & 0x0f)],
            ]);
            4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashkv_core::protocol::{encode_command, try_parse_command};

    fn render(parts: &[&[u8]]) -> String {
        let wire = encode_command(parts);
        let outcome = try_parse_command(&wire, 0);
        let arena = Arena::new(1024);
        match outcome.into_result().unwrap() {
            Some(cmd) => {
                String::from_utf8(render_command(&arena, &cmd).unwrap().to_vec()).unwrap()
            }
            None => panic!("incomplete command"),
        }
    }

    #[test]
    fn test_render_plain() {
        assert_eq!(
            render(&[b"SET", b"key", b"val"]),
            "\"SET\" \"key\" \"val\"\n"
        );
    }

    #[test]
    fn test_render_escapes() {
        assert_eq!(
            render(&[b"a\"b\\c", b"\r\n\t", b"\x00\xff"]),
            "\"a\\\"b\\\\c\" \"\\r\\n\\t\" \"\\x00\\xff\"\n"
        );
    }

    #[test]
    fn test_render_empty_command() {
        assert_eq!(render(&[]), "\n");
    }

    #[test]
    fn test_render_arena_too_small() {
        let wire = encode_command(&["SET", "key", "val"]);
        let cmd = try_parse_command(&wire, 0).into_result().unwrap().unwrap();
        let arena = Arena::new(8);
        assert!(render_command(&arena, &cmd).is_none());
        assert_eq!(arena.used(), 0);
    }

    #[tokio::test]
    async fn test_inspect_stream() {
        let mut wire = encode_command(&["SET", "k1", "v1"]);
        wire.extend_from_slice(&encode_command(&["GET", "k1"]));
        let (first, second) = wire.split_at(10);

        let mut reader = tokio_test::io::Builder::new()
            .read(first)
            .read(second)
            .build();
        let mut out = Vec::new();

        let summary = inspect(&mut reader, &mut out, &Config::default())
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"SET\" \"k1\" \"v1\"\n\"GET\" \"k1\"\n"
        );
        assert_eq!(
            summary,
            Summary {
                commands: 2,
                arguments: 5,
                bytes: wire.len() as u64,
                largest_command: 29,
            }
        );
    }

    #[tokio::test]
    async fn test_inspect_quiet() {
        let wire = encode_command(&["PING"]);
        let mut reader = tokio_test::io::Builder::new().read(&wire).build();
        let mut out = Vec::new();
        let config = Config {
            quiet: true,
            ..Config::default()
        };

        let summary = inspect(&mut reader, &mut out, &config).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(summary.commands, 1);
    }

    #[tokio::test]
    async fn test_inspect_truncated_stream() {
        let mut reader = tokio_test::io::Builder::new()
            .read(b"*2\r\n$3\r\nGET\r\n")
            .build();
        let mut out = Vec::new();

        let err = inspect(&mut reader, &mut out, &Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[tokio::test]
    async fn test_inspect_malformed_stream() {
        let mut reader = tokio_test::io::Builder::new().read(b"+OK\r\n").build();
        let mut out = Vec::new();

        let err = inspect(&mut reader, &mut out, &Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
