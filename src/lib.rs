mod args;
mod config;
mod device;
mod error;
mod locator;
mod runner;

// 功能模块
pub mod activity;
pub mod cmd;
pub mod package;
pub mod parallel;
pub mod parse;
pub mod utils;

// 导出主要类型
pub use args::ArgumentBuilder;
pub use config::{AdbSettings, AdbSettingsBuilder};
pub use device::{Adb, DeviceInfo};
pub use error::{AdbError, AdbResult};
pub use locator::{Environment, FileSystem, StdEnvironment, StdFileSystem, SDK_ROOT_ENV};
pub use runner::{CancelToken, ExecutionResult, LogSink, StdLogSink};

pub use activity::{AmInstrumentOptions, AmStartOptions, TestRunSummary};
pub use cmd::{
    DeviceState, LogcatBufferType, LogcatOptions, LogcatVerbosity, ScreenRecordOptions, Transport,
};
pub use package::{
    InstallLocation, PackageListInfo, PackageListState, PackageSourceType, PermissionGroupInfo,
    PermissionInfo, PmInstallOptions,
};

// 便利的预导出模块
pub mod prelude {
    pub use super::{
        Adb, AdbError, AdbResult, AdbSettings, AdbSettingsBuilder, CancelToken, DeviceInfo,
        ExecutionResult,
    };
    pub use super::{AmInstrumentOptions, AmStartOptions, TestRunSummary};
    pub use super::{LogcatOptions, ScreenRecordOptions};
    pub use super::{PackageListInfo, PackageListState, PackageSourceType, PmInstallOptions};
}
