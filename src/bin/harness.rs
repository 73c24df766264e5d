//! rfkey-harness — CLI entry point driving the decoder core against a
//! simulated radio. Logs to stdout (the adjacent project's TUI reserves
//! stdout for a terminal UI and logs to a file instead; this binary has no
//! such constraint, so it follows the simpler of its two logging paths).

use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rfkey_decoder::clock::SystemClock;
use rfkey_decoder::config;
use rfkey_decoder::emission::FrameContext;
use rfkey_decoder::keystore::KeyStore;
use rfkey_decoder::pipeline::Decoder;
use rfkey_decoder::protocols::load_effective_catalog;
use rfkey_decoder::radio::{EdgeSource, Modulation, RadioDriver, RadioParams, SimulatedDriver};
use rfkey_decoder::{capture::EdgeCapture, DecodedKey};

const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Args {
    learning: bool,
    frequency_mhz: f32,
}

fn parse_args() -> Args {
    let mut learning = false;
    let mut frequency_mhz = 433.92;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--learning" => learning = true,
            "--frequency" => {
                if let Some(v) = args.next() {
                    if let Ok(parsed) = v.parse() {
                        frequency_mhz = parsed;
                    }
                }
            }
            _ => {}
        }
    }
    Args { learning, frequency_mhz }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rfkey_decoder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    tracing::info!("starting rfkey-harness v{}", VERSION);

    let args = parse_args();
    let storage = config::Storage::new()?;
    let keystore = KeyStore::load(&storage.config.keystore_path)?;
    tracing::info!(keys = keystore.keys().len(), "loaded trusted-key store");

    let mut driver = SimulatedDriver::new(EdgeSource::Silence);
    driver.init(RadioParams::new(args.frequency_mhz, Modulation::Ook))?;

    let capture = EdgeCapture::new();
    driver.start_direct_rx(capture.clone())?;

    let clock = SystemClock::new();
    let mut decoder = match &storage.config.catalog_overrides_path {
        Some(path) => match load_effective_catalog(path) {
            Ok(catalog) => {
                tracing::info!(?path, "loaded catalog overrides");
                Decoder::with_catalog(clock, catalog)
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "failed to load catalog overrides, using compiled catalog");
                Decoder::new(clock)
            }
        },
        None => Decoder::new(clock),
    };
    decoder.set_learning_mode(args.learning);

    let mut sink = |key: DecodedKey| {
        tracing::info!(
            protocol = %key.protocol,
            code = format_args!("{:#X}", key.code),
            bit_length = key.bit_length,
            te_us = key.te_us,
            "decoded key"
        );
        if let Some(found) = keystore.find_match(&key) {
            tracing::info!(name = %found.name, "matched a trusted key");
        }
    };

    tracing::info!("entering poll loop (Ctrl-C to exit)");
    loop {
        if let Some(train) = capture.poll() {
            let ctx = FrameContext {
                rssi_dbm: driver.read_rssi_dbm(),
                frequency_mhz: args.frequency_mhz,
                modulation: "OOK",
            };
            decoder.process_frame(train, ctx, &mut sink);
        }
        thread::sleep(Duration::from_millis(10));
    }
}
