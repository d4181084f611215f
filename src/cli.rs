use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use wiresift::app::Session;
use wiresift::capture::list_interfaces;
use wiresift::config::CaptureConfig;
use wiresift::dissect::PacketRecord;
use wiresift::event::{CoreEvent, EventHandler};

#[derive(Parser)]
#[command(name = "wiresift")]
#[command(author, version, about = "Capture, dissect and filter network traffic")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List capture-capable interfaces
    Interfaces,

    /// Capture live from an interface
    Capture {
        /// Interface to capture on
        #[arg(short, long)]
        interface: String,

        /// Stop after this many displayed packets
        #[arg(short = 'c', long)]
        count: Option<u64>,

        /// Bytes kept per frame
        #[arg(short, long, default_value = "65535")]
        snaplen: i32,

        /// Do not put the interface into promiscuous mode
        #[arg(long)]
        no_promisc: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Read a saved capture file
    Read {
        /// Capture file to read
        #[arg(short = 'r', long)]
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
pub struct OutputArgs {
    /// Capture filter (BPF syntax), applied before dissection
    #[arg(short = 'f', long)]
    pub bpf: Option<String>,

    /// Display filter, e.g. "tcp.port == 443 || dns"
    #[arg(short = 'Y', long)]
    pub display: Option<String>,

    /// Save every captured packet to this pcap file on exit
    #[arg(short, long)]
    pub write: Option<PathBuf>,

    /// Print the per-layer detail tree under each packet
    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Interfaces => {
            let interfaces = list_interfaces().context("Failed to list interfaces")?;
            if interfaces.is_empty() {
                println!("No capture interfaces found (are you running with capture privileges?)");
            }
            for (i, iface) in interfaces.iter().enumerate() {
                println!("{}. {} ({})", i + 1, iface.name, iface.description);
            }
            Ok(())
        }
        Commands::Capture { interface, count, snaplen, no_promisc, output } => {
            let mut config = CaptureConfig::live(interface).with_bpf_filter(output.bpf.clone());
            config.snaplen = snaplen;
            config.promiscuous = !no_promisc;
            run_session(config, output, count).await
        }
        Commands::Read { file, output } => {
            let config = CaptureConfig::file(file).with_bpf_filter(output.bpf.clone());
            run_session(config, output, None).await
        }
    }
}

async fn run_session(config: CaptureConfig, output: OutputArgs, count: Option<u64>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::sync_channel(config.channel_depth);
    let mut session = Session::new(tx);
    let mut events = EventHandler::new(rx);

    if let Some(text) = output.display.as_deref() {
        session
            .apply_filter(text)
            .with_context(|| format!("Invalid display filter '{text}'"))?;
    }
    session.start(&config).context("Failed to start capture")?;
    info!(source = %config.source.name(), "capturing");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut shown: u64 = 0;
    let mut failure = None;
    'events: loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            event = events.next() => match event? {
                CoreEvent::Packets(packets) => {
                    for pkt in &packets {
                        print_packet(pkt, output.verbose);
                        shown += 1;
                        if count.is_some_and(|c| shown >= c) {
                            break 'events;
                        }
                    }
                }
                CoreEvent::CaptureFinished => break,
                CoreEvent::CaptureFailed(reason) => {
                    failure = Some(reason);
                    break;
                }
                CoreEvent::FilterError(msg) => warn!(%msg, "display filter error"),
                CoreEvent::Cleared | CoreEvent::Filtered(_) => {}
            }
        }
    }

    tokio::task::block_in_place(|| session.stop());
    let captured = session.store().len();

    if let Some(path) = output.write.as_deref() {
        let written = session
            .save(path)
            .with_context(|| format!("Failed to save capture to {}", path.display()))?;
        println!("Saved {} packets to {}", written, path.display());
    }
    eprintln!("{shown} packets displayed, {captured} captured");

    if let Some(reason) = failure {
        bail!("Capture failed: {reason}");
    }
    Ok(())
}

fn print_packet(pkt: &PacketRecord, verbose: bool) {
    println!(
        "{:>6} {} {} → {} {} {} {}",
        pkt.number,
        pkt.timestamp.format("%H:%M:%S%.6f"),
        pkt.source(),
        pkt.destination(),
        pkt.protocol_label(),
        pkt.wire_length,
        pkt.info(),
    );
    if verbose {
        for line in &pkt.details {
            println!("    {line}");
        }
        println!();
    }
}
