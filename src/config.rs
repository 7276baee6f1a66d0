use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 单次调用的 ADB 设置
///
/// 每次调用独立构造，调用期间不可变。未设置 `sdk_root` 时
/// 回退到 `ANDROID_HOME` 环境变量；未设置 `serial` 时命令
/// 不附加 `-s` 参数，由 adb 自行选择设备。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdbSettings {
    /// Android SDK 根目录，工具从 `<root>/platform-tools` 下定位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_root: Option<PathBuf>,
    /// 目标设备或模拟器的序列号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

impl AdbSettings {
    /// 创建空设置
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回指向给定序列号的设置副本
    pub fn for_serial(&self, serial: &str) -> Self {
        AdbSettings {
            sdk_root: self.sdk_root.clone(),
            serial: Some(serial.to_string()),
        }
    }
}

/// ADB 设置构建器
#[derive(Default)]
pub struct AdbSettingsBuilder {
    sdk_root: Option<PathBuf>,
    serial: Option<String>,
}

impl AdbSettingsBuilder {
    /// 设置 SDK 根目录
    pub fn sdk_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.sdk_root = Some(path.into());
        self
    }

    /// 设置设备序列号
    pub fn serial(mut self, serial: &str) -> Self {
        self.serial = Some(serial.to_string());
        self
    }

    /// 构建 ADB 设置
    pub fn build(self) -> AdbSettings {
        AdbSettings {
            sdk_root: self.sdk_root,
            serial: self.serial,
        }
    }
}
