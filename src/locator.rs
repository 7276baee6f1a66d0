use std::path::{Path, PathBuf};

use crate::config::AdbSettings;

/// 定位 SDK 根目录时使用的环境变量
pub const SDK_ROOT_ENV: &str = "ANDROID_HOME";

/// 文件系统抽象
///
/// 通过构造参数注入，测试中可替换为内存实现。
pub trait FileSystem: Send + Sync {
    /// 目录是否存在
    fn dir_exists(&self, path: &Path) -> bool;
    /// 文件是否存在
    fn file_exists(&self, path: &Path) -> bool;
    /// 将相对路径解析为绝对路径
    fn absolute(&self, path: &Path) -> PathBuf;
}

/// 环境变量抽象
pub trait Environment: Send + Sync {
    /// 读取环境变量，未设置时返回 None
    fn var(&self, name: &str) -> Option<String>;
}

/// 基于 std::fs 的文件系统实现
#[derive(Debug, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    }
}

/// 基于 std::env 的环境变量实现
#[derive(Debug, Default)]
pub struct StdEnvironment;

impl Environment for StdEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// 平台对应的工具文件名
pub fn tool_name() -> &'static str {
    if cfg!(windows) {
        "adb.exe"
    } else {
        "adb"
    }
}

/// 根据设置与环境定位 adb 可执行文件
///
/// 解析顺序: 设置中的 `sdk_root` 若是存在的目录则优先；
/// 否则回退到 `ANDROID_HOME` 指向的目录；两者皆无则返回 None。
/// 每次调用重新解析，不做缓存，设置可在调用间变化。
pub fn locate(
    settings: &AdbSettings,
    fs: &dyn FileSystem,
    env: &dyn Environment,
) -> Option<PathBuf> {
    let root = settings
        .sdk_root
        .as_deref()
        .map(|p| fs.absolute(p))
        .filter(|p| fs.dir_exists(p))
        .or_else(|| {
            env.var(SDK_ROOT_ENV)
                .map(PathBuf::from)
                .filter(|p| fs.dir_exists(p))
        })?;

    Some(root.join("platform-tools").join(tool_name()))
}
