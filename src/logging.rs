use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_TAG: &str = "safezone";
const DEFAULT_FILTER: &str = "info,safezone_core=debug";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops, so `init` may be
/// dispatched more than once per process.
pub fn init_logging() {
    INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        #[cfg(target_os = "android")]
        let layer = fmt::layer()
            .with_writer(android::AndroidLogWriter::default)
            .with_ansi(false)
            .with_target(true)
            .without_time();

        #[cfg(not(target_os = "android"))]
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

        // A host that already installed a subscriber keeps it.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init();
    });
}

#[cfg(target_os = "android")]
mod android {
    use super::LOG_TAG;
    use android_log_sys::{LogPriority, __android_log_write};
    use std::ffi::CString;
    use std::io;

    /// Buffers one formatted event and hands it to logcat on flush/drop.
    #[derive(Default)]
    pub struct AndroidLogWriter {
        buf: Vec<u8>,
    }

    impl io::Write for AndroidLogWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.buf.is_empty() {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&self.buf)
                .trim_end()
                .replace('\0', " ");
            self.buf.clear();
            let (Ok(tag), Ok(text)) = (CString::new(LOG_TAG), CString::new(line)) else {
                return Ok(());
            };
            unsafe {
                __android_log_write(LogPriority::INFO as _, tag.as_ptr(), text.as_ptr());
            }
            Ok(())
        }
    }

    impl Drop for AndroidLogWriter {
        fn drop(&mut self) {
            let _ = io::Write::flush(self);
        }
    }
}
