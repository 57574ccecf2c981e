use std::{
    fs,
    path::Path,
    sync::{
        mpsc::{self, Receiver, Sender},
        LazyLock, Mutex,
    },
    thread,
};

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use log::Log;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

/// In-process consumers of formatted log lines (a UI console, a test).
static SUBSCRIBERS: LazyLock<Mutex<Vec<Sender<String>>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Feeds the dispatcher thread, so logging never waits on a subscriber.
static LOG_SENDER: LazyLock<Mutex<Option<Sender<String>>>> = LazyLock::new(|| Mutex::new(None));

pub struct MainLogger {
    write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>,
}

impl MainLogger {
    fn new(write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>) -> Self {
        Self { write_logger }
    }
}

impl Log for MainLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.write_logger.log(record);

        let message = format!(
            "{}:{} -- {}",
            record.level(),
            record.target(),
            record.args()
        );
        let sender = LOG_SENDER.lock().ok().and_then(|guard| guard.clone());
        match sender {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => eprintln!("{}", message),
        }
    }

    fn flush(&self) {
        self.write_logger.flush();
    }
}

/// Installs the global logger, writing to `<log_dir>/logs/main.log` with
/// rotation. Fails if a logger is already installed.
pub fn init(log_dir: &str) -> Result<()> {
    let folder = Path::new(log_dir).join("logs");
    fs::create_dir_all(&folder)?;
    let log = FileRotate::new(
        folder.join("main.log"),
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let write_logger = WriteLogger::new(LevelFilter::Info, config, log);
    log::set_boxed_logger(Box::new(MainLogger::new(write_logger)))?;
    log::set_max_level(LevelFilter::Info);

    init_dispatcher();
    Ok(())
}

/// Every log line emitted after this call. Dropping the receiver
/// unsubscribes.
pub fn subscribe() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Ok(mut subscribers) = SUBSCRIBERS.lock() {
        subscribers.push(tx);
    }
    rx
}

fn init_dispatcher() {
    let Ok(mut guard) = LOG_SENDER.lock() else {
        return;
    };
    if guard.is_some() {
        return;
    }
    let (tx, rx) = mpsc::channel::<String>();
    *guard = Some(tx);

    thread::spawn(move || {
        while let Ok(message) = rx.recv() {
            let Ok(mut subscribers) = SUBSCRIBERS.lock() else {
                continue;
            };
            if subscribers.is_empty() {
                eprintln!("{}", message);
                continue;
            }
            subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        }
    });
}
