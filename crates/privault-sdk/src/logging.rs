//! Log level selection for SDK events.
//!
//! The SDK only emits `tracing` events. Hosts either install their own
//! subscriber or hand the client a [`Dispatch`] built here, which keeps SDK
//! output separate from the application's global subscriber.

use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Minimum severity of SDK events to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Request level detail.
    Debug,
    /// Lifecycle events.
    Info,
    /// Partial failures.
    Warn,
    /// Failures only.
    #[default]
    Error,
    /// Nothing.
    Off,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level.
    #[must_use]
    pub fn directive(self) -> String {
        let level = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        };
        format!("{}={level}", env!("CARGO_CRATE_NAME"))
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" | "none" => Ok(Self::Off),
            other => Err(crate::Error::config(format!("Unknown log level: {other}"))),
        }
    }
}

/// Builds a dispatch writing formatted SDK events to stderr.
#[must_use]
pub fn dispatch(level: LogLevel) -> Dispatch {
    dispatch_to(level, std::io::stderr)
}

/// Builds a dispatch writing formatted SDK events to `writer`.
pub fn dispatch_to<W>(level: LogLevel, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(level.directive()))
        .with(fmt::layer().with_ansi(false).with_writer(writer));

    Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_directive() {
        assert_eq!(LogLevel::Warn.directive(), "privault_sdk=warn");
        assert_eq!(LogLevel::default(), LogLevel::Error);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_dispatch_filters_by_level() {
        let capture = Capture::default();
        let writer = capture.clone();
        let dispatch = dispatch_to(LogLevel::Warn, move || writer.clone());

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("suppressed event");
            tracing::warn!("partial batch failure");
        });

        let output = capture.contents();
        assert!(output.contains("partial batch failure"));
        assert!(!output.contains("suppressed event"));
    }

    #[test]
    fn test_off_emits_nothing() {
        let capture = Capture::default();
        let writer = capture.clone();
        let dispatch = dispatch_to(LogLevel::Off, move || writer.clone());

        tracing::dispatcher::with_default(&dispatch, || tracing::error!("dropped"));
        assert!(capture.contents().is_empty());
    }
}
