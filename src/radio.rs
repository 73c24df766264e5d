//! §6 external interface: the radio driver boundary, plus an in-process
//! simulated driver used by the harness and by integration tests.
//!
//! The core never depends on a concrete radio implementation. A real
//! hardware-backed `RadioDriver` would own its own receive thread the same
//! way the adjacent project's HackRF controller does (`Arc<AtomicBool>` for
//! the run flag, `Arc<AtomicU32>` for RSSI read without blocking the
//! callback); `SimulatedDriver` below follows the same shape without the
//! hardware.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::capture::EdgeCapture;

pub const FREQUENCY_RANGE_MHZ: (f32, f32) = (300.0, 928.0);
const DEFAULT_BITRATE_KBPS: f32 = 3.79;
const DEFAULT_RX_BW_KHZ: f32 = 58.0;
const DEFAULT_DEVIATION_KHZ: f32 = 5.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Ook,
    Ask,
}

#[derive(Debug, Clone, Copy)]
pub struct RadioParams {
    pub frequency_mhz: f32,
    pub modulation: Modulation,
    pub bitrate_kbps: f32,
    pub rx_bw_khz: f32,
    pub deviation_khz: f32,
    pub power_dbm: i32,
}

impl RadioParams {
    pub fn new(frequency_mhz: f32, modulation: Modulation) -> Self {
        Self {
            frequency_mhz,
            modulation,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            rx_bw_khz: DEFAULT_RX_BW_KHZ,
            deviation_khz: DEFAULT_DEVIATION_KHZ,
            power_dbm: 10,
        }
    }
}

/// §6's radio driver boundary. A real implementation owns the physical
/// device; the pipeline only ever sees this trait.
pub trait RadioDriver {
    fn init(&mut self, params: RadioParams) -> Result<()>;
    fn set_frequency(&mut self, mhz: f32) -> Result<()>;
    fn start_direct_rx(&mut self, capture: EdgeCapture) -> Result<()>;
    fn stop(&mut self);
    fn read_rssi_dbm(&self) -> i32;
}

fn validate_frequency(mhz: f32) -> Result<()> {
    if !(FREQUENCY_RANGE_MHZ.0..=FREQUENCY_RANGE_MHZ.1).contains(&mhz) {
        bail!(
            "frequency {mhz} MHz outside the supported range {:?}",
            FREQUENCY_RANGE_MHZ
        );
    }
    Ok(())
}

/// Source of edges for the simulated driver's background thread: either a
/// fixed, pre-recorded stream (for deterministic tests) or silence.
pub enum EdgeSource {
    Fixed(Vec<(u64, bool)>),
    Silence,
}

/// Background-thread-based driver standing in for a real radio's interrupt
/// source. The thread plays the role of the ISR described in §4.1's design:
/// it calls `EdgeCapture::on_edge` exactly as hardware would, through the
/// same `Arc<Mutex<...>>`/`AtomicBool` handoff the capture module already
/// uses for its single-producer/single-consumer buffer.
pub struct SimulatedDriver {
    frequency_mhz: Arc<Mutex<f32>>,
    rssi_dbm: Arc<AtomicI32>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    edge_period_us: Arc<AtomicU32>,
    source: Option<EdgeSource>,
}

impl SimulatedDriver {
    pub fn new(source: EdgeSource) -> Self {
        Self {
            frequency_mhz: Arc::new(Mutex::new(433.92)),
            rssi_dbm: Arc::new(AtomicI32::new(-60)),
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            edge_period_us: Arc::new(AtomicU32::new(100)),
            source: Some(source),
        }
    }

    /// Lets a test or harness push a simulated RSSI reading without going
    /// through an actual receive path.
    pub fn set_rssi_dbm(&self, rssi: i32) {
        self.rssi_dbm.store(rssi, Ordering::Relaxed);
    }
}

impl RadioDriver for SimulatedDriver {
    fn init(&mut self, params: RadioParams) -> Result<()> {
        validate_frequency(params.frequency_mhz)?;
        *self.frequency_mhz.lock().unwrap() = params.frequency_mhz;
        tracing::info!(
            frequency_mhz = params.frequency_mhz,
            bitrate_kbps = params.bitrate_kbps,
            "simulated radio driver initialized"
        );
        Ok(())
    }

    fn set_frequency(&mut self, mhz: f32) -> Result<()> {
        validate_frequency(mhz)?;
        *self.frequency_mhz.lock().unwrap() = mhz;
        Ok(())
    }

    fn start_direct_rx(&mut self, capture: EdgeCapture) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);
        capture.start();

        let running = Arc::clone(&self.running);
        let source = self.source.take().unwrap_or(EdgeSource::Silence);

        let handle = thread::spawn(move || match source {
            EdgeSource::Fixed(edges) => {
                for (ts, level) in edges {
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    capture.on_edge(ts, level);
                }
            }
            EdgeSource::Silence => {
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                }
            }
        });
        self.thread = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn read_rssi_dbm(&self) -> i32 {
        self.rssi_dbm.load(Ordering::Relaxed)
    }
}

impl Drop for SimulatedDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_frequency_outside_supported_range() {
        let mut driver = SimulatedDriver::new(EdgeSource::Silence);
        assert!(driver.init(RadioParams::new(250.0, Modulation::Ook)).is_err());
        assert!(driver.init(RadioParams::new(433.92, Modulation::Ook)).is_ok());
    }

    #[test]
    fn fixed_edge_source_feeds_capture_and_then_stops() {
        let mut driver = SimulatedDriver::new(EdgeSource::Fixed(vec![(0, true), (500, false)]));
        let capture = EdgeCapture::new();
        driver.init(RadioParams::new(433.92, Modulation::Ook)).unwrap();
        driver.start_direct_rx(capture.clone()).unwrap();
        driver.stop();
        assert!(!capture.is_attached() || capture.poll().is_none());
    }
}
