use std::io::Write;

/// Install the process-wide logger. `RUST_LOG`, when set, overrides `level`.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}
