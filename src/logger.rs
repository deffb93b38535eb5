use {
    log::{Level, Log, Metadata, Record},
    std::{
        io::{self, Write},
        sync::{
            atomic::{AtomicU32, Ordering::Relaxed},
            Arc,
        },
        time::SystemTime,
    },
};

pub struct Logger {
    level: AtomicU32,
}

impl Logger {
    /// Install a logger writing to stderr and a panic hook that routes
    /// panics through it.
    pub fn install_stderr(level: Level) -> Arc<Self> {
        std::panic::set_hook(Box::new(|p| {
            if let Some(loc) = p.location() {
                log::error!(
                    "Panic at {} line {} column {}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                );
            } else {
                log::error!("Panic at unknown location");
            }
            if let Some(msg) = p.payload().downcast_ref::<&str>() {
                log::error!("Message: {}", msg);
            }
            if let Some(msg) = p.payload().downcast_ref::<String>() {
                log::error!("Message: {}", msg);
            }
        }));
        let slf = Arc::new(Self {
            level: AtomicU32::new(level as _),
        });
        let _ = log::set_boxed_logger(Box::new(LogWrapper {
            logger: slf.clone(),
        }));
        log::set_max_level(level.to_level_filter());
        slf
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as _, Relaxed);
        log::set_max_level(level.to_level_filter());
    }
}

struct LogWrapper {
    logger: Arc<Logger>,
}

impl Log for LogWrapper {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() as u32 <= self.logger.level.load(Relaxed)
    }

    fn log(&self, record: &Record) {
        if record.level() as u32 > self.logger.level.load(Relaxed) {
            return;
        }
        let now = SystemTime::now();
        let mut stderr = io::stderr().lock();
        let _ = if let Some(mp) = record.module_path() {
            writeln!(
                stderr,
                "[{} {:5} {}] {}",
                humantime::format_rfc3339_millis(now),
                record.level(),
                mp,
                record.args(),
            )
        } else {
            writeln!(
                stderr,
                "[{} {:5}] {}",
                humantime::format_rfc3339_millis(now),
                record.level(),
                record.args(),
            )
        };
    }

    fn flush(&self) {
        // nothing
    }
}
