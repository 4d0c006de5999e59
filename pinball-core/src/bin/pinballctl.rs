//! A CLI front end for running a machine against the in-process simulated
//! transport, mostly useful for exercising a configuration without real
//! hardware attached.

use std::io::BufRead;

use clap::Parser;
use tracing::{error, info};

use pinball_core::config::MachineConfig;
use pinball_core::platform::NullPlatformDriver;
use pinball_core::transport::{byte_channel, SimulatedTransport};
use pinball_core::Machine;

#[derive(Parser, Debug)]
#[command(name = "pinballctl", about = "Run a pinball machine core against a config file")]
struct Args {
    /// Path to a machine configuration YAML document.
    #[arg(long, env = "PINBALL_CONFIG")]
    config: std::path::PathBuf,

    /// Overrides the configured tick rate.
    #[arg(long)]
    hz: Option<u32>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args) {
        error!(error = %err, "pinballctl exited with an error");
        std::process::exit(1);
    }
}

fn run(args: Args) -> pinball_core::Result<()> {
    let mut config = MachineConfig::from_file(&args.config)?;
    if let Some(hz) = args.hz {
        config.hz = hz;
    }

    let mut platform = NullPlatformDriver;
    let machine = Machine::new(config, &mut platform)?;

    let (sender, receiver) = byte_channel();
    let transport = SimulatedTransport::new(receiver, machine.outbox());

    info!("reading \"SW <name> <0|1>\" / \"AX <x> <y> <z>\" lines from stdin");

    let mut rt = pinball_rt::RuntimeBuilder::new()
        .build()
        .map_err(|e| pinball_core::CoreError::Misconfigured(format!("runtime init failed: {e}")))?;
    rt.block_on(async move {
        // Spawned on the pinball-rt runtime rather than a real OS thread:
        // `ByteSender` is `Rc`-backed and `!Send`, and waking a task from
        // any thread other than the one running `block_on` would panic
        // against the scoped thread-local the executor's context lives in.
        pinball_rt::spawn(async move {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(mut line) = line else { break };
                line.push('\n');
                sender.send_slice(line.as_bytes());
            }
        });
        machine.run(transport).await;
    });
    Ok(())
}
