use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use log::trace;

use crate::args::ArgumentBuilder;
use crate::config::AdbSettings;
use crate::error::{AdbError, AdbResult};
use crate::locator::{self, Environment, FileSystem, StdEnvironment, StdFileSystem};
use crate::runner::{self, CancelToken, ExecutionResult, LogSink, StdLogSink};

/// 设备记录
///
/// 由 `adb devices -l` 的输出解析得到，序列号是唯一键。
/// 状态为 offline 的设备不会出现在结果中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub serial: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl DeviceInfo {
    /// 创建仅含序列号的记录
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            usb: None,
            product: None,
            model: None,
            device: None,
        }
    }
}

/// ADB 主结构体
///
/// 聚合注入的文件系统、环境变量与输出接收器。命令实现分散在
/// 各能力模块的 `impl Adb` 块中。调用之间没有共享可变状态，
/// 可在多个线程上并发发起命令。
pub struct Adb {
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) env: Arc<dyn Environment>,
    pub(crate) sink: Arc<dyn LogSink>,
}

impl Default for Adb {
    fn default() -> Self {
        Self::new()
    }
}

impl Adb {
    /// 使用默认的真实文件系统、环境变量与日志接收器创建实例
    pub fn new() -> Self {
        Self {
            fs: Arc::new(StdFileSystem),
            env: Arc::new(StdEnvironment),
            sink: Arc::new(StdLogSink),
        }
    }

    /// 使用显式注入的依赖创建实例
    pub fn with_context(
        fs: Arc<dyn FileSystem>,
        env: Arc<dyn Environment>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self { fs, env, sink }
    }

    /// 定位 adb 可执行文件，找不到视为配置错误
    pub(crate) fn tool_path(&self, settings: &AdbSettings) -> AdbResult<PathBuf> {
        let candidate = locator::locate(settings, self.fs.as_ref(), self.env.as_ref())
            .ok_or_else(|| AdbError::ConfigError("无法定位 adb 可执行文件".to_string()))?;

        if !self.fs.file_exists(&candidate) {
            return Err(AdbError::ConfigError(format!(
                "adb 可执行文件不存在: {}",
                candidate.display()
            )));
        }

        trace!("adb 路径: {}", candidate.display());
        Ok(candidate)
    }

    /// 执行一次 adb 调用并判定结果
    pub(crate) fn run_adb(
        &self,
        settings: &AdbSettings,
        builder: &ArgumentBuilder,
    ) -> AdbResult<ExecutionResult> {
        self.run_adb_cancellable(settings, builder, None)
    }

    /// 执行一次可取消的 adb 调用并判定结果
    pub(crate) fn run_adb_cancellable(
        &self,
        settings: &AdbSettings,
        builder: &ArgumentBuilder,
        cancel: Option<&CancelToken>,
    ) -> AdbResult<ExecutionResult> {
        let tool = self.tool_path(settings)?;
        let result = runner::run(&tool, builder, cancel, &self.sink)?;
        runner::classify(&result)?;
        Ok(result)
    }
}

/// 按设置追加序列号参数
///
/// 必须在子命令动词之前调用，序列号作为引号记号追加。
pub(crate) fn append_serial(builder: &mut ArgumentBuilder, settings: &AdbSettings) {
    if let Some(serial) = settings.serial.as_deref() {
        if !serial.is_empty() {
            builder.append("-s");
            builder.append_quoted(serial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdbSettingsBuilder;

    #[test]
    fn serial_flag_precedes_verb_flags_and_positionals() {
        let settings = AdbSettingsBuilder::default().serial("abc123").build();

        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, &settings);
        builder.append("uninstall");
        builder.append("-k");
        builder.append("com.example.app");

        assert_eq!(
            builder.as_args(),
            vec!["-s", "abc123", "uninstall", "-k", "com.example.app"]
        );
    }

    #[test]
    fn missing_serial_adds_nothing() {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, &AdbSettings::new());
        assert!(builder.is_empty());
    }

    #[test]
    fn empty_serial_adds_nothing() {
        let settings = AdbSettingsBuilder::default().serial("").build();
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, &settings);
        assert!(builder.is_empty());
    }
}
