use crate::config::LogConfig;

/// Initialize the global logger from `LogConfig`, the same `env_logger`
/// setup `tos_wallet` performs before doing anything else in `main`.
pub fn init(config: &LogConfig) {
    let mut builder = env_logger::Builder::new();
    builder
        .parse_filters(&config.log_level)
        .format_timestamp_millis();
    if config.disable_log_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }
    let _ = builder.try_init();
}
