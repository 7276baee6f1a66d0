use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::config::AdbSettings;
use crate::device::Adb;
use crate::error::AdbResult;

impl Adb {
    /// 在多个设备上并行执行 shell 命令
    ///
    /// 每个设备一次独立调用，互不协调；返回以序列号为键的结果表。
    pub fn parallel_shell(
        &self,
        settings: &AdbSettings,
        serials: &[&str],
        command: &str,
    ) -> HashMap<String, AdbResult<Vec<String>>> {
        serials
            .par_iter()
            .map(|&serial| {
                (
                    serial.to_string(),
                    self.shell(&settings.for_serial(serial), command),
                )
            })
            .collect()
    }

    /// 在多个设备上并行安装 APK
    pub fn parallel_install(
        &self,
        settings: &AdbSettings,
        serials: &[&str],
        apk_file: &Path,
    ) -> HashMap<String, AdbResult<bool>> {
        serials
            .par_iter()
            .map(|&serial| {
                (
                    serial.to_string(),
                    self.install(&settings.for_serial(serial), apk_file),
                )
            })
            .collect()
    }

    /// 在多个设备上并行卸载应用
    pub fn parallel_uninstall(
        &self,
        settings: &AdbSettings,
        serials: &[&str],
        package_name: &str,
        keep_data: bool,
    ) -> HashMap<String, AdbResult<bool>> {
        serials
            .par_iter()
            .map(|&serial| {
                (
                    serial.to_string(),
                    self.uninstall(&settings.for_serial(serial), package_name, keep_data),
                )
            })
            .collect()
    }
}
