//! 日志初始化
//! 控制台输出，可选按天轮转的文件输出；格式为 text 或 json

use std::path::{Path, PathBuf};

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "xode-gateway.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 文件日志目录：配置路径的父目录，缺省 `./logs`
pub fn log_dir(config: &LoggingConfig) -> PathBuf {
    config
        .log_file_path
        .as_deref()
        .and_then(|p| Path::new(p).parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

fn layer_for<W>(json: bool, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(true);
    if json {
        base.json().boxed()
    } else {
        base.with_ansi(ansi).boxed()
    }
}

/// 初始化全局日志
///
/// 开启文件日志时返回写线程的 guard，调用方需持有到进程退出，
/// 否则缓冲中的日志会丢失。
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let json = config.format == "json";

    let mut layers: Vec<BoxedLayer> = vec![layer_for(json, true, std::io::stdout)];
    let mut guard = None;

    if config.enable_file_logging {
        let dir = log_dir(config);
        std::fs::create_dir_all(&dir)?;
        let (writer, worker_guard) = tracing_appender::non_blocking(rolling::daily(&dir, LOG_FILE_NAME));
        layers.push(layer_for(json, false, writer));
        guard = Some(worker_guard);
    }

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
