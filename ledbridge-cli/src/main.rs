//! ledbridge CLI - Web front-end for an Arduino driving three LEDs.
//!
//! ## Features
//!
//! - Serve a control page that toggles the LEDs over a serial link
//! - JSON status endpoint
//! - Arduino port listing
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use console::style;
use env_logger::Env;
use ledbridge::discovery::{detect_ports, is_arduino_description, select_arduino_port};
use ledbridge::{DeviceLink, LinkHandle, NativeBackend, PortInfo, format_port_list};
use log::{debug, info};
use std::env;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

mod config;
mod page;
mod server;

use config::{Config, PostMode};

/// Default listen address.
const DEFAULT_BIND: &str = "127.0.0.1";

/// Default listen port.
const DEFAULT_HTTP_PORT: u16 = 5000;

/// ledbridge - Toggle Arduino LEDs from a web page.
///
/// Environment variables:
///   LEDBRIDGE_BIND         - Listen address (default: 127.0.0.1)
///   LEDBRIDGE_HTTP_PORT    - Listen port (default: 5000)
///   LEDBRIDGE_SERIAL_PORT  - Serial port (auto-detected if not set)
///   LEDBRIDGE_POST_MODE    - Response to POST / (redirect, render)
#[derive(Parser)]
#[command(name = "ledbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (warnings and errors only).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the LED control page.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "LEDBRIDGE_BIND")]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long, env = "LEDBRIDGE_HTTP_PORT")]
        http_port: Option<u16>,

        /// Serial port of the Arduino (auto-detected if not specified).
        #[arg(short = 'p', long, env = "LEDBRIDGE_SERIAL_PORT")]
        serial_port: Option<String>,

        /// Response to a submitted command.
        #[arg(long, value_enum, env = "LEDBRIDGE_POST_MODE")]
        post_mode: Option<PostMode>,
    },

    /// List available serial ports.
    ListPorts {
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type.
        shell: Shell,
    },
}

fn main() -> Result<()> {
    if env::var("NO_COLOR").is_ok() || !console::Term::stderr().is_term() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "ledbridge v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match cli.command {
        Commands::Serve {
            bind,
            http_port,
            serial_port,
            post_mode,
        } => cmd_serve(
            config,
            ServeOptions {
                bind,
                http_port,
                serial_port,
                post_mode,
            },
        ),
        Commands::ListPorts { json } => cmd_list_ports(json),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        },
    }
}

/// `serve` flags; set values win over the config file.
#[derive(Debug, Default)]
struct ServeOptions {
    bind: Option<String>,
    http_port: Option<u16>,
    serial_port: Option<String>,
    post_mode: Option<PostMode>,
}

/// Resolved server settings.
#[derive(Debug, PartialEq)]
struct ServeSettings {
    addr: SocketAddr,
    post_mode: PostMode,
    link: ledbridge::LinkConfig,
}

impl ServeOptions {
    fn resolve(self, config: Config) -> Result<ServeSettings> {
        let Config { server, device } = config;

        let bind = self
            .bind
            .or(server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let ip: IpAddr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?;
        let port = self
            .http_port
            .or(server.port)
            .unwrap_or(DEFAULT_HTTP_PORT);

        let mut link = device.link_config();
        if let Some(serial_port) = self.serial_port {
            link = link.with_port_name(serial_port);
        }

        Ok(ServeSettings {
            addr: SocketAddr::new(ip, port),
            post_mode: self
                .post_mode
                .or(server.post_mode)
                .unwrap_or_default(),
            link,
        })
    }
}

fn cmd_serve(config: Config, options: ServeOptions) -> Result<()> {
    let settings = options.resolve(config)?;
    match settings.link.port_name {
        Some(ref name) => info!("Using serial port {name}"),
        None => info!("Serial port will be auto-detected"),
    }

    let link = LinkHandle::spawn(DeviceLink::new(NativeBackend, settings.link))
        .context("Failed to start device worker")?;
    let app = server::router(link, settings.post_mode);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(server::run(app, settings.addr))
}

fn cmd_list_ports(json: bool) -> Result<()> {
    let ports = detect_ports(&NativeBackend);

    if json {
        println!("{}", ports_json(&ports)?);
        return Ok(());
    }

    eprintln!("{}", style("Available serial ports").bold().underlined());

    if ports.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
        return Ok(());
    }

    for line in format_port_list(&ports) {
        eprintln!("  {} {}", style("•").green(), line);
    }

    match select_arduino_port(&ports) {
        Some(port) => eprintln!(
            "\n  {} {}",
            style("Arduino:").bold(),
            style(&port.name).cyan()
        ),
        None => eprintln!("\n  {}", style("No Arduino detected").yellow()),
    }
    Ok(())
}

fn ports_json(ports: &[PortInfo]) -> Result<String> {
    let entries: Vec<serde_json::Value> = ports
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "description": p.description,
                "arduino": is_arduino_description(&p.description),
                "vid": p.vid,
                "pid": p.pid,
                "manufacturer": p.manufacturer,
                "serial": p.serial_number,
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).context("Failed to encode port list")
}

/// Generate shell completions to stdout.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd
        .get_name()
        .to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
