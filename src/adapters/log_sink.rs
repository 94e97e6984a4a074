//! Log-based event sink adapter (the station console).
//!
//! Implements [`EventSink`] by rendering each [`AppEvent`] to one line and
//! writing it through the `log` facade (the ESP-IDF logger on UART /
//! USB-CDC in production).  How a line looks is decided by an
//! [`EventFormatter`] picked once from [`OutputFormat`]:
//!
//! | Format    | Capture tick                                   | Other events   |
//! |-----------|------------------------------------------------|----------------|
//! | `Verbose` | `CAPTURE \| slot=.. \| Ca=..ppm (..V) ..`       | one line each  |
//! | `Compact` | `<remaining_s> <V_Ca> <V_NO3> <V_K>`           | failures as `#` comments |
//!
//! Compact output is meant for serial plotters, which treat every
//! uncommented line as a sample.  The logger prefixes each line with level,
//! timestamp and target, so compact sample lines skip the `log` facade and
//! go straight to the console writer (stdout, which ESP-IDF maps to the
//! same UART).  Comment lines still go through `log`.

use core::fmt::Write as _;
use std::io::{self, Write as _};

use log::Level;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::calibration::Analyte;
use crate::config::OutputFormat;
use crate::scheduler::display_remaining;

/// One rendered console line.
pub type Line = heapless::String<256>;

/// Rendering strategy for console lines.
pub trait EventFormatter {
    /// Render `event` into `out`.  Returns `false` to suppress the event.
    fn render(&self, event: &AppEvent, out: &mut Line) -> bool;

    /// Whether the rendered line is written bare, without the log prefix.
    fn is_raw(&self, _event: &AppEvent) -> bool {
        false
    }
}

/// Log level an event is written at, whatever the format.
pub fn level_of(event: &AppEvent) -> Level {
    match event {
        AppEvent::ConnectivityTimeout { .. } | AppEvent::EncodeFailed(_) | AppEvent::Stalled { .. } => Level::Error,
        AppEvent::TimeSyncFailed(_)
        | AppEvent::StatePersistFailed(_)
        | AppEvent::ChannelUnsampled(_)
        | AppEvent::UplinkFailed(_) => Level::Warn,
        _ => Level::Info,
    }
}

// ───────────────────────────────────────────────────────────────
// Verbose
// ───────────────────────────────────────────────────────────────

pub struct VerboseFormatter;

impl EventFormatter for VerboseFormatter {
    fn render(&self, event: &AppEvent, out: &mut Line) -> bool {
        let _ = match event {
            AppEvent::CycleStarted { at, slots } => write!(out, "WAKE | {} | {} slots/day", at, slots),
            AppEvent::Connected { waited_ms } => write!(out, "NET | ready after {} ms", waited_ms),
            AppEvent::ConnectivityTimeout { waited_ms } => {
                write!(out, "NET | not ready after {} ms, giving up", waited_ms)
            }
            AppEvent::TimeSynced { at } => write!(out, "TIME | synced, now {}", at),
            AppEvent::TimeSyncFailed(e) => write!(out, "TIME | sync failed: {}", e),
            AppEvent::SlotSelected { index, slots, previous } => match previous {
                Some(p) => write!(
                    out,
                    "CAL | slot {}/{} (last: {} #{})",
                    index, slots, p.date, p.count
                ),
                None => write!(out, "CAL | slot {}/{} (no previous record)", index, slots),
            },
            AppEvent::StatePersistFailed(e) => write!(out, "CAL | daily record not saved: {}", e),
            AppEvent::Captured {
                slot,
                measurements,
                remaining_ms,
            } => {
                let _ = write!(
                    out,
                    "CAPTURE | slot={} | remaining={}s |",
                    slot,
                    display_remaining(*remaining_ms) / 1000
                );
                for analyte in Analyte::ALL {
                    let m = measurements.ion(analyte);
                    let _ = write!(out, " {}={:.2}ppm ({:.4}V)", analyte.name(), m.value, m.raw);
                }
                write!(
                    out,
                    " | T={:.1}\u{00b0}C | bat={}% ({:.2}V)",
                    measurements.temperature.value,
                    measurements.battery_percent(),
                    measurements.battery.raw
                )
            }
            AppEvent::ChannelUnsampled(kind) => write!(out, "SENSOR | {} never read, left out of record", kind),
            AppEvent::TelemetryBuilt { bytes } => write!(out, "TELEM | record built ({} bytes)", bytes),
            AppEvent::EncodeFailed(e) => write!(out, "TELEM | not sent: {}", e),
            AppEvent::UplinkSent { status } => write!(out, "UPLINK | HTTP {}", status),
            AppEvent::UplinkFailed(e) => write!(out, "UPLINK | failed: {}", e),
            AppEvent::Sleeping { wake } => write!(out, "SLEEP | {}", wake),
            AppEvent::Stalled { since_ms } => write!(
                out,
                "STALL | no network since {} s, reset the station",
                since_ms / 1000
            ),
        };
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Compact
// ───────────────────────────────────────────────────────────────

pub struct CompactFormatter;

impl EventFormatter for CompactFormatter {
    fn render(&self, event: &AppEvent, out: &mut Line) -> bool {
        match event {
            AppEvent::Captured {
                measurements,
                remaining_ms,
                ..
            } => {
                let _ = write!(out, "{}", display_remaining(*remaining_ms) / 1000);
                for analyte in Analyte::ALL {
                    let _ = write!(out, " {:.4}", measurements.ion(analyte).raw);
                }
                true
            }
            AppEvent::ConnectivityTimeout { .. }
            | AppEvent::ChannelUnsampled(_)
            | AppEvent::EncodeFailed(_)
            | AppEvent::UplinkFailed(_)
            | AppEvent::Stalled { .. } => {
                let _ = out.push_str("# ");
                VerboseFormatter.render(event, out)
            }
            _ => false,
        }
    }

    fn is_raw(&self, event: &AppEvent) -> bool {
        matches!(event, AppEvent::Captured { .. })
    }
}

// ───────────────────────────────────────────────────────────────
// Sink
// ───────────────────────────────────────────────────────────────

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink {
    formatter: Box<dyn EventFormatter>,
    console: Box<dyn io::Write>,
}

impl LogEventSink {
    pub fn new(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Verbose => Self::with_formatter(Box::new(VerboseFormatter)),
            OutputFormat::Compact => Self::with_formatter(Box::new(CompactFormatter)),
        }
    }

    pub fn with_formatter(formatter: Box<dyn EventFormatter>) -> Self {
        Self::with_console(formatter, Box::new(io::stdout()))
    }

    /// Like [`with_formatter`](Self::with_formatter), with raw lines going
    /// to `console` instead of stdout.
    pub fn with_console(formatter: Box<dyn EventFormatter>, console: Box<dyn io::Write>) -> Self {
        Self { formatter, console }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        let mut line = Line::new();
        if !self.formatter.render(event, &mut line) {
            return;
        }
        if self.formatter.is_raw(event) {
            // A lost plot sample is not worth failing the cycle over.
            let _ = writeln!(self.console, "{}", line).and_then(|()| self.console.flush());
        } else {
            log::log!(level_of(event), "{}", line);
        }
    }
}
