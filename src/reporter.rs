use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::events::{Listener, ListenerEvent, ProgressEvent};

/// One line of `--json` output.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Start {
        message: &'a str,
        timestamp: &'a DateTime<Utc>,
    },
    Progress {
        message: &'a str,
        timestamp: &'a DateTime<Utc>,
        progress: u8,
    },
    Cancel {
        message: &'a str,
        timestamp: &'a DateTime<Utc>,
    },
    End {
        message: &'a str,
        timestamp: &'a DateTime<Utc>,
    },
}

fn stamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

impl Record<'_> {
    fn human(&self) -> String {
        match self {
            Record::Progress {
                message,
                timestamp,
                progress,
            } => format!("{} - [{progress:>3}%] {message}", stamp(timestamp)),
            Record::Start { message, timestamp }
            | Record::Cancel { message, timestamp }
            | Record::End { message, timestamp } => format!("{} - {message}", stamp(timestamp)),
        }
    }
}

/// Console listener printing one line per event, human readable or JSON.
pub struct Reporter {
    json_mode: bool,
    started: Instant,
    out: Mutex<Box<dyn Write + Send>>,
    events: Mutex<usize>,
}

impl Reporter {
    /// Report to stdout.
    pub fn new(json_mode: bool) -> Self {
        Self::with_writer(json_mode, io::stdout())
    }

    pub fn with_writer(json_mode: bool, out: impl Write + Send + 'static) -> Self {
        Self {
            json_mode,
            started: Instant::now(),
            out: Mutex::new(Box::new(out)),
            events: Mutex::new(0),
        }
    }

    fn record(&self, record: Record<'_>) {
        let line = if self.json_mode {
            match serde_json::to_string(&record) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot serialize event");
                    return;
                }
            }
        } else {
            record.human()
        };
        if let Ok(mut count) = self.events.lock() {
            *count += 1;
        }
        if let Ok(mut out) = self.out.lock() {
            // A closed stdout must not abort the procedure.
            let _ = writeln!(out, "{line}").and_then(|_| out.flush());
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().map(|count| *count).unwrap_or_default()
    }

    /// "N events in <elapsed>".
    pub fn summary(&self) -> String {
        let elapsed = Duration::from_millis(self.started.elapsed().as_millis() as u64);
        format!(
            "{} events in {}",
            self.event_count(),
            humantime::format_duration(elapsed)
        )
    }
}

impl Listener for Reporter {
    fn on_start(&self, event: &ListenerEvent) {
        self.record(Record::Start {
            message: &event.message,
            timestamp: &event.timestamp,
        });
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.record(Record::Progress {
            message: event.message(),
            timestamp: &event.event.timestamp,
            progress: event.progress,
        });
    }

    fn on_cancel(&self, event: &ListenerEvent) {
        self.record(Record::Cancel {
            message: &event.message,
            timestamp: &event.timestamp,
        });
    }

    fn on_end(&self, event: &ListenerEvent) {
        self.record(Record::End {
            message: &event.message,
            timestamp: &event.timestamp,
        });
    }
}

#[cfg(feature = "cli")]
pub use progress::ProgressBarListener;

#[cfg(feature = "cli")]
mod progress {
    use indicatif::{ProgressBar, ProgressStyle};

    use crate::events::{Listener, ListenerEvent, ProgressEvent};

    /// Terminal progress bar following the phase currently running.
    pub struct ProgressBarListener {
        bar: ProgressBar,
    }

    impl ProgressBarListener {
        pub fn new() -> Self {
            let bar = ProgressBar::new(100);
            if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {wide_msg}") {
                bar.set_style(style);
            }
            Self { bar }
        }

        pub fn finish(&self) {
            self.bar.finish_and_clear();
        }
    }

    impl Default for ProgressBarListener {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Listener for ProgressBarListener {
        fn on_start(&self, event: &ListenerEvent) {
            self.bar.set_position(0);
            self.bar.set_message(event.message.clone());
        }

        fn on_progress(&self, event: &ProgressEvent) {
            self.bar.set_position(u64::from(event.progress));
            self.bar.set_message(event.message().to_string());
        }

        fn on_cancel(&self, event: &ListenerEvent) {
            self.bar.set_message(event.message.clone());
        }

        fn on_end(&self, event: &ListenerEvent) {
            self.bar.set_message(event.message.clone());
        }
    }
}
