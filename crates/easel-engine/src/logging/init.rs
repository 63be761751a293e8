use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "easel_engine::device=debug,wgpu_core=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Emit the module path of each record.
    pub module_path: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            module_path: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
///
/// Filter precedence: `config.env_filter`, then `RUST_LOG`, then `info`. wgpu's
/// internals are capped at `warn` unless the filter names them.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.filter_module("wgpu_core", log::LevelFilter::Warn);
        builder.filter_module("wgpu_hal", log::LevelFilter::Warn);

        match config.env_filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(log::LevelFilter::Info);
            }
        }

        builder
            .write_style(config.write_style)
            .format_module_path(config.module_path);

        if builder.try_init().is_err() {
            // Another logger was installed by the host; keep it.
            return;
        }

        log::debug!("logging initialized");
    });
}
