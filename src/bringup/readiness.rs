//! Management-endpoint readiness.
//!
//! A freshly started switch (or one that just finished a configuration round)
//! does not accept management connections right away. Instead of sleeping a
//! fixed amount and hoping, the sequencer probes the endpoint with TCP
//! connects and exponential backoff, and gives up after a bounded number of
//! attempts.

use crate::config::ReadinessConfig;
use log::debug;
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

/// Something that can tell whether an endpoint accepts connections
pub trait ReadinessProbe {
    fn probe(&self, addr: SocketAddr, timeout: Duration) -> bool;
}

/// Probe by opening (and immediately dropping) a TCP connection
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl ReadinessProbe for TcpProbe {
    fn probe(&self, addr: SocketAddr, timeout: Duration) -> bool {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => true,
            Err(e) => {
                debug!("probe {}: {}", addr, e);
                false
            }
        }
    }
}

/// Result of waiting for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    NotReady { attempts: u32 },
}

/// Delay before probe number `attempt + 1`, given `attempt` failed probes so far
///
/// Doubles from `initial_backoff` and saturates at `max_backoff`.
pub fn backoff_delay(config: &ReadinessConfig, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    config
        .initial_backoff
        .checked_mul(factor)
        .map_or(config.max_backoff, |d| d.min(config.max_backoff))
}

/// Probe `addr` until it answers or `max_attempts` probes have failed
pub fn wait_for_endpoint<P: ReadinessProbe>(probe: &P, addr: SocketAddr, config: &ReadinessConfig) -> Readiness {
    for attempt in 1..=config.max_attempts {
        if probe.probe(addr, config.connect_timeout) {
            return Readiness::Ready { attempts: attempt };
        }
        if attempt < config.max_attempts {
            let delay = backoff_delay(config, attempt);
            debug!("{} not ready (attempt {}), retrying in {:?}", addr, attempt, delay);
            thread::sleep(delay);
        }
    }
    Readiness::NotReady {
        attempts: config.max_attempts,
    }
}
