//! Reachability probing with retries.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use log::debug;

use crate::config::{ChannelConfig, SniffOptions};

/// One reachability check against an address.
pub trait Probe {
    /// Returns `true` if the address accepted a connection.
    fn probe(&mut self, address: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Probe for F {
    fn probe(&mut self, address: &str) -> bool {
        self(address)
    }
}

/// Probes by opening and dropping a TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub const fn from_config(config: &ChannelConfig) -> Self {
        Self::new(config.probe_timeout)
    }
}

impl Probe for TcpProbe {
    fn probe(&mut self, address: &str) -> bool {
        let addrs = match address.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(err) => {
                debug!("cannot resolve {address}: {err}");
                return false;
            }
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
    }
}

/// Shared cancellation flag for [`sniff`].
///
/// Cancelling wakes any thread blocked in [`CancelToken::wait`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<(Mutex<bool>, Condvar)>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wake) = &*self.0;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.0;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks for up to `timeout`; returns `true` if cancelled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.0;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (cancelled, _) = wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }
}

/// Probes `address` up to `options.max_retries` times.
///
/// `on_attempt(attempt, max_retries)` runs before each attempt, counting
/// from 1. Waits `retry_delay` between attempts but not after the last.
/// Cancellation is checked before every attempt and ends a wait early.
pub fn sniff<P, F>(
    probe: &mut P,
    address: &str,
    options: SniffOptions,
    cancel: &CancelToken,
    mut on_attempt: F,
) -> bool
where
    P: Probe + ?Sized,
    F: FnMut(u32, u32),
{
    let max = options.max_retries;
    for attempt in 1..=max {
        if cancel.is_cancelled() {
            debug!("sniff of {address} cancelled before attempt {attempt}");
            return false;
        }
        on_attempt(attempt, max);
        if probe.probe(address) {
            debug!("{address} reachable on attempt {attempt}/{max}");
            return true;
        }
        if attempt < max {
            if cancel.wait(options.retry_delay) {
                debug!("sniff of {address} cancelled after attempt {attempt}");
                return false;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    fn quick(max_retries: u32) -> SniffOptions {
        SniffOptions {
            retry_delay: Duration::ZERO,
            max_retries,
        }
    }

    #[test]
    fn unreachable_uses_every_attempt() {
        let mut probes = 0;
        let mut probe = |_: &str| {
            probes += 1;
            false
        };
        let mut calls = Vec::new();
        let reachable = sniff(&mut probe, "nowhere", quick(4), &CancelToken::new(), |a, m| {
            calls.push((a, m));
        });
        assert!(!reachable);
        assert_eq!(probes, 4);
        assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn stops_at_first_success() {
        let mut probes = 0;
        let mut probe = |_: &str| {
            probes += 1;
            probes == 2
        };
        let mut attempts = 0;
        assert!(sniff(&mut probe, "x", quick(5), &CancelToken::new(), |_, _| attempts += 1));
        assert_eq!(attempts, 2);
    }

    #[test]
    fn cancelled_token_prevents_attempts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut probe = |_: &str| true;
        let mut attempts = 0;
        assert!(!sniff(&mut probe, "x", quick(3), &cancel, |_, _| attempts += 1));
        assert_eq!(attempts, 0);
    }

    #[test]
    fn cancel_during_attempt_stops_after_sleep() {
        let cancel = CancelToken::new();
        let inner = cancel.clone();
        let mut probe = move |_: &str| {
            inner.cancel();
            false
        };
        let mut attempts = 0;
        assert!(!sniff(&mut probe, "x", quick(3), &cancel, |_, _| attempts += 1));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn cancel_interrupts_retry_delay() {
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let (probed, on_probe) = std::sync::mpsc::channel();
        let canceller = std::thread::spawn(move || {
            on_probe.recv().unwrap();
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let options = SniffOptions {
            retry_delay: Duration::from_secs(30),
            max_retries: 3,
        };
        let mut probe = move |_: &str| {
            let _ = probed.send(());
            false
        };
        let mut attempts = 0;
        let started = Instant::now();
        assert!(!sniff(&mut probe, "x", options, &cancel, |_, _| attempts += 1));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(attempts, 1);
        canceller.join().unwrap();
    }

    #[test]
    fn wait_times_out_without_cancel() {
        let cancel = CancelToken::new();
        assert!(!cancel.wait(Duration::from_millis(5)));
        cancel.cancel();
        assert!(cancel.wait(Duration::from_secs(30)));
    }

    #[test]
    fn zero_retries_never_probes() {
        let mut probe = |_: &str| true;
        assert!(!sniff(&mut probe, "x", quick(0), &CancelToken::new(), |_, _| {}));
    }

    #[test]
    fn tcp_probe_reaches_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let mut probe = TcpProbe::new(Duration::from_millis(500));
        assert!(probe.probe(&address));
        assert!(!probe.probe("not an address"));
    }
}
