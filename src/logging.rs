use tracing::level_filters::LevelFilter;

/// Install a stderr subscriber; `-v`/`-q` decide the level.
///
/// Safe to call more than once, later calls are no-ops.
pub fn init(filter: log::LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(to_tracing(filter))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn to_tracing(filter: log::LevelFilter) -> LevelFilter {
    match filter {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}
