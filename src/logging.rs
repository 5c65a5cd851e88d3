/*
Logging for sprite atlas consumers.

Atlas failures never reach the caller as errors: a lookup just comes back
empty. The log line is the only record of why, so this module keeps the
recent ones around.

- `setup_logger()`: console output through env_logger plus an in-memory buffer
  holding the last `MAX_LOG_LINES` records from this crate
- `dump_logs()`: snapshot of the buffer
- `export_debug_logs()`: writes the buffer to <data_dir>/<app_name>/logs/debug.log
- `export_debug_logs_to()`: same, into a caller-chosen directory

Console level: RUST_LOG if set, otherwise DEBUG in debug builds and ERROR in
release builds. Records from other crates are dropped.
*/

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use chrono::Utc;
use env_logger::fmt::{Color, Formatter};
use log::{Level, LevelFilter, Log, Metadata, Record};

const MAX_LOG_LINES: usize = 1000;
const LOG_TARGET: &str = "sprite_atlas";

pub type LogBuffer = Arc<Mutex<VecDeque<String>>>;

struct BufferLogger {
    log_buffer: LogBuffer,
}

impl BufferLogger {
    fn new() -> Self {
        Self {
            log_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES))),
        }
    }

    fn log_to_buffer(&self, message: &str, target: &str, line: Option<u32>) {
        if !target.starts_with(LOG_TARGET) {
            return;
        }
        let mut buffer = self.log_buffer.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.len() == MAX_LOG_LINES {
            buffer.pop_front();
        }

        let formatted_message = if let Some(line_num) = line {
            format!("{target}:{line_num} {message}")
        } else {
            format!("{target} {message}")
        };

        buffer.push_back(formatted_message);
    }

    fn get_shared_buffer(&self) -> LogBuffer {
        Arc::clone(&self.log_buffer)
    }
}

impl log::Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(LOG_TARGET) && metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{:<5} {}", record.level(), record.args());
            self.log_to_buffer(&message, record.target(), record.line());
        }
    }

    fn flush(&self) {}
}

struct CompositeLogger {
    console_logger: env_logger::Logger,
    buffer_logger: BufferLogger,
}

impl log::Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console_logger.enabled(metadata) || self.buffer_logger.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console_logger.enabled(record.metadata()) {
            self.console_logger.log(record);
        }
        if self.buffer_logger.enabled(record.metadata()) {
            self.buffer_logger.log(record);
        }
    }

    fn flush(&self) {
        self.console_logger.flush();
        self.buffer_logger.flush();
    }
}

/// Install the global logger and return the buffer of recent atlas diagnostics.
pub fn setup_logger() -> Result<LogBuffer, log::SetLoggerError> {
    let buffer_logger = BufferLogger::new();
    let shared_buffer = buffer_logger.get_shared_buffer();

    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else {
        // Filter out all other crates' logs
        builder.filter(None, LevelFilter::Off);
        if cfg!(debug_assertions) {
            builder.filter(Some(LOG_TARGET), LevelFilter::Debug);
        } else {
            builder.filter(Some(LOG_TARGET), LevelFilter::Error);
        }
    }

    builder.format(|buf: &mut Formatter, record: &Record| {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        let module_info = match (record.module_path(), record.line()) {
            (Some(module), Some(line)) => format!("{module}:{line}"),
            (Some(module), None) => module.to_string(),
            (None, Some(line)) => format!("line:{line}"),
            (None, None) => "unknown".to_string(),
        };

        let mut level_style = buf.style();
        let mut meta_style = buf.style();

        match record.level() {
            Level::Error => level_style.set_color(Color::Red).set_bold(true),
            Level::Warn => level_style.set_color(Color::Yellow).set_bold(true),
            Level::Info => level_style.set_color(Color::Green).set_bold(true),
            Level::Debug => level_style.set_color(Color::Blue).set_bold(true),
            Level::Trace => level_style.set_color(Color::White),
        };
        meta_style.set_color(Color::Rgb(120, 120, 120));

        writeln!(
            buf,
            "{} {} {} {}",
            meta_style.value(timestamp),
            level_style.value(record.level()),
            meta_style.value(module_info),
            record.args()
        )
    });

    let composite_logger = CompositeLogger {
        console_logger: builder.build(),
        buffer_logger,
    };

    log::set_boxed_logger(Box::new(composite_logger))?;

    // Filtering happens in the composite logger
    log::set_max_level(LevelFilter::Trace);

    Ok(shared_buffer)
}

/// Copy of the buffered log lines, oldest first.
pub fn dump_logs(log_buffer: &LogBuffer) -> Vec<String> {
    let buffer = log_buffer.lock().unwrap_or_else(|e| e.into_inner());
    buffer.iter().cloned().collect()
}

pub fn get_log_directory(app_name: &str) -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(app_name).join("logs")
}

/// Write the buffered log lines to `debug.log` in the log directory of `app_name`.
pub fn export_debug_logs(app_name: &str, log_buffer: &LogBuffer) -> Result<PathBuf, std::io::Error> {
    export_debug_logs_to(&get_log_directory(app_name), log_buffer)
}

/// Write the buffered log lines to `debug.log` in `log_dir_path`, creating it if needed.
pub fn export_debug_logs_to(log_dir_path: &Path, log_buffer: &LogBuffer) -> Result<PathBuf, std::io::Error> {
    std::fs::create_dir_all(log_dir_path)?;
    let debug_log_path = log_dir_path.join("debug.log");
    write_logs(&debug_log_path, log_buffer)?;
    Ok(debug_log_path)
}

fn write_logs(path: &Path, log_buffer: &LogBuffer) -> Result<(), std::io::Error> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    writeln!(file, "sprite-atlas debug log, exported {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
    for line in dump_logs(log_buffer) {
        writeln!(file, "{}", line)?;
    }
    file.flush()
}
