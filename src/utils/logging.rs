// 日志工具模块
//
// 封装 flexi_logger 的初始化和关闭操作，确保异步日志正确 flush

use crate::config::LogConfig;
use crate::core::{AdvisorError, AdvisorResult};
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use std::sync::Mutex;

/// 全局日志句柄，用于程序退出时 flush
static LOGGER_HANDLE: Mutex<Option<LoggerHandle>> = Mutex::new(None);

/// 初始化日志系统
///
/// `echo_info` 为 true 时 INFO 及以上级别同时输出到 stderr，
/// 否则只有 ERROR 输出到 stderr。
///
/// # Examples
/// ```no_run
/// use plan_advisor::config::Config;
/// use plan_advisor::utils::logging;
///
/// let config = Config::default();
/// logging::init(&config.log, true).expect("日志初始化失败");
/// ```
pub fn init(config: &LogConfig, echo_info: bool) -> AdvisorResult<()> {
    let duplicate = if echo_info { Duplicate::Info } else { Duplicate::Error };

    let handle = Logger::try_with_str(&config.level)
        .map_err(|e| AdvisorError::Config(e.to_string()))?
        .log_to_file(
            FileSpec::default()
                .basename(&config.file)
                .directory(&config.dir),
        )
        .rotate(
            Criterion::Size(config.max_file_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.max_files),
        )
        .duplicate_to_stderr(duplicate)
        .write_mode(WriteMode::Async)
        .append()
        .start()
        .map_err(|e| AdvisorError::Config(e.to_string()))?;

    // 保存句柄供后续 flush 使用
    if let Ok(mut guard) = LOGGER_HANDLE.lock() {
        *guard = Some(handle);
    }

    log::info!("日志系统初始化完成: {}/{}", config.dir, config.file);
    Ok(())
}

/// 刷新并关闭日志系统
///
/// 在程序退出前调用，确保所有异步日志都已写入文件
pub fn shutdown() {
    if let Ok(mut guard) = LOGGER_HANDLE.lock() {
        if let Some(handle) = guard.take() {
            handle.flush();
        }
    }
}

/// 检查日志系统是否已初始化
pub fn is_initialized() -> bool {
    LOGGER_HANDLE
        .lock()
        .map(|guard| guard.is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_init_and_shutdown() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let config = LogConfig {
            dir: dir.path().to_string_lossy().into_owned(),
            ..LogConfig::default()
        };

        let result = init(&config, false);
        assert!(result.is_ok(), "日志初始化失败: {:?}", result.err());
        assert!(is_initialized());

        log::info!("测试日志消息");

        shutdown();
        assert!(!is_initialized());
    }
}
