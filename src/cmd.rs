use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};

use crate::args::ArgumentBuilder;
use crate::config::AdbSettings;
use crate::device::{append_serial, Adb, DeviceInfo};
use crate::error::AdbResult;
use crate::locator::FileSystem;
use crate::parse;
use crate::runner::CancelToken;
use crate::utils;

/// 设备连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Any,
    Usb,
    Local,
}

/// 等待的设备状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    #[default]
    Device,
    Recovery,
    Sideload,
    Bootloader,
}

/// logcat 缓冲区类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogcatBufferType {
    #[default]
    Main,
    Radio,
    Events,
}

impl LogcatBufferType {
    fn as_str(&self) -> &'static str {
        match self {
            LogcatBufferType::Main => "main",
            LogcatBufferType::Radio => "radio",
            LogcatBufferType::Events => "events",
        }
    }
}

/// logcat 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogcatVerbosity {
    #[default]
    Brief,
    Process,
    Tag,
    Raw,
    Time,
    ThreadTime,
    Long,
}

impl LogcatVerbosity {
    fn as_str(&self) -> &'static str {
        match self {
            LogcatVerbosity::Brief => "brief",
            LogcatVerbosity::Process => "process",
            LogcatVerbosity::Tag => "tag",
            LogcatVerbosity::Raw => "raw",
            LogcatVerbosity::Time => "time",
            LogcatVerbosity::ThreadTime => "threadtime",
            LogcatVerbosity::Long => "long",
        }
    }
}

/// logcat 选项
///
/// `clear` 与 `print_size` 优先于转储: 设置其一时只执行对应动作。
/// 其余情况总是以 `-d` 转储后返回，不会挂在 logcat 上不退出。
#[derive(Debug, Clone, Default)]
pub struct LogcatOptions {
    pub buffer: LogcatBufferType,
    pub clear: bool,
    pub print_size: bool,
    pub output_file: Option<PathBuf>,
    pub num_rotated_logs: Option<u32>,
    /// 日志轮转大小 (KB)，仅在指定输出文件时生效，缺省 16
    pub log_rotation_kb: Option<u32>,
    pub silent_filter: bool,
    pub verbosity: LogcatVerbosity,
}

/// 录屏选项
#[derive(Debug, Clone, Default)]
pub struct ScreenRecordOptions {
    pub time_limit: Option<Duration>,
    /// 码率 (Mbps)，传给工具前换算成 bps
    pub bitrate_mbps: Option<u32>,
    /// 分辨率 (宽, 高)
    pub size: Option<(u32, u32)>,
    pub rotate: bool,
    pub verbose: bool,
}

pub(crate) fn append_logcat_flags(
    builder: &mut ArgumentBuilder,
    options: &LogcatOptions,
    fs: &dyn FileSystem,
) {
    if options.buffer != LogcatBufferType::Main {
        builder.append("-b");
        builder.append(options.buffer.as_str());
    }

    if options.clear || options.print_size {
        if options.clear {
            builder.append("-c");
        } else {
            builder.append("-g");
        }
        return;
    }

    // 总是转储返回
    builder.append("-d");

    if let Some(file) = options.output_file.as_deref() {
        builder.append("-f");
        builder.append_quoted(fs.absolute(file).display().to_string());

        if let Some(n) = options.num_rotated_logs {
            builder.append("-n");
            builder.append(n.to_string());
        }

        let kb = options.log_rotation_kb.unwrap_or(16);
        builder.append("-r");
        builder.append(kb.to_string());
    }

    if options.silent_filter {
        builder.append("-s");
    }

    if options.verbosity != LogcatVerbosity::Brief {
        builder.append("-v");
        builder.append(options.verbosity.as_str());
    }
}

pub(crate) fn append_screenrecord_flags(builder: &mut ArgumentBuilder, options: &ScreenRecordOptions) {
    if let Some(limit) = options.time_limit {
        builder.append("--time-limit");
        builder.append(limit.as_secs().to_string());
    }

    if let Some(mbps) = options.bitrate_mbps {
        builder.append("--bit-rate");
        builder.append((mbps * 1_000_000).to_string());
    }

    if let Some((width, height)) = options.size {
        builder.append("--size");
        builder.append(format!("{}x{}", width, height));
    }

    if options.rotate {
        builder.append("--rotate");
    }

    if options.verbose {
        builder.append("--verbose");
    }
}

impl Adb {
    /// 列出已连接的设备
    ///
    /// 使用长格式获取属性对，offline 的设备不计入结果。
    pub fn devices(&self, settings: &AdbSettings) -> AdbResult<Vec<DeviceInfo>> {
        let mut builder = ArgumentBuilder::new();
        builder.append("devices");
        builder.append("-l");

        let result = self.run_adb(settings, &builder)?;
        let devices = parse::parse_devices(&result.lines);

        info!("发现 {} 个 ADB 设备", devices.len());
        Ok(devices)
    }

    /// 停止 adb 服务器
    pub fn kill_server(&self, settings: &AdbSettings) -> AdbResult<()> {
        let mut builder = ArgumentBuilder::new();
        builder.append("kill-server");
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 启动 adb 服务器
    pub fn start_server(&self, settings: &AdbSettings) -> AdbResult<()> {
        let mut builder = ArgumentBuilder::new();
        builder.append("start-server");
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 连接到远程设备
    pub fn connect(&self, settings: &AdbSettings, ip: &str, port: u16) -> AdbResult<()> {
        let mut builder = ArgumentBuilder::new();
        builder.append("connect");
        builder.append(format!("{}:{}", ip, port));
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 断开远程设备连接，不给地址时断开全部
    pub fn disconnect(
        &self,
        settings: &AdbSettings,
        ip: Option<&str>,
        port: Option<u16>,
    ) -> AdbResult<()> {
        let mut builder = ArgumentBuilder::new();
        builder.append("disconnect");
        if let Some(ip) = ip.filter(|ip| !ip.is_empty()) {
            builder.append(format!("{}:{}", ip, port.unwrap_or(5555)));
        }
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 安装 APK 文件
    pub fn install(&self, settings: &AdbSettings, apk_file: &Path) -> AdbResult<bool> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("install");
        builder.append(self.fs.absolute(apk_file).display().to_string());

        let result = self.run_adb(settings, &builder)?;
        debug!("安装 {} 完成, 退出码 {}", apk_file.display(), result.exit_code);
        Ok(result.success())
    }

    /// 卸载应用
    ///
    /// `keep_data` 保留数据与缓存目录 (`-k`)。
    pub fn uninstall(
        &self,
        settings: &AdbSettings,
        package_name: &str,
        keep_data: bool,
    ) -> AdbResult<bool> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("uninstall");
        if keep_data {
            builder.append("-k");
        }
        builder.append(package_name);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.success())
    }

    /// 等待设备进入给定状态
    pub fn wait_for(
        &self,
        settings: &AdbSettings,
        transport: Transport,
        state: DeviceState,
    ) -> AdbResult<()> {
        let mut verb = String::from("wait-for");
        match transport {
            Transport::Usb => verb.push_str("-usb"),
            Transport::Local => verb.push_str("-local"),
            Transport::Any => {}
        }
        match state {
            DeviceState::Device => verb.push_str("-device"),
            DeviceState::Recovery => verb.push_str("-recovery"),
            DeviceState::Sideload => verb.push_str("-sideload"),
            DeviceState::Bootloader => verb.push_str("-bootloader"),
        }

        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append(verb);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 关闭模拟器实例
    pub fn emu_kill(&self, settings: &AdbSettings) -> AdbResult<bool> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("emu");
        builder.append("kill");

        let result = self.run_adb(settings, &builder)?;
        Ok(result
            .lines
            .iter()
            .any(|l| l.to_lowercase().contains("stopping emulator")))
    }

    /// 执行任意 adb 命令，返回原始输出行
    pub fn run(&self, settings: &AdbSettings, args: &[&str]) -> AdbResult<Vec<String>> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        for arg in args {
            builder.append(*arg);
        }

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 从设备拉取文件或目录
    pub fn pull(&self, settings: &AdbSettings, remote: &Path, local: &Path) -> AdbResult<bool> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("pull");
        builder.append_quoted(remote.display().to_string());
        builder.append_quoted(self.fs.absolute(local).display().to_string());

        let result = self.run_adb(settings, &builder)?;
        Ok(result.success())
    }

    /// 推送文件或目录到设备
    pub fn push(&self, settings: &AdbSettings, local: &Path, remote: &Path) -> AdbResult<bool> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("push");
        builder.append_quoted(self.fs.absolute(local).display().to_string());
        builder.append_quoted(remote.display().to_string());

        let result = self.run_adb(settings, &builder)?;
        Ok(result.success())
    }

    /// 抓取完整的 bugreport 输出
    pub fn bugreport(&self, settings: &AdbSettings) -> AdbResult<Vec<String>> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("bugreport");

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 读取设备日志
    ///
    /// `filter` 为可选的 filterspec 位置参数，原样传给 logcat。
    pub fn logcat(
        &self,
        settings: &AdbSettings,
        options: &LogcatOptions,
        filter: Option<&str>,
    ) -> AdbResult<Vec<String>> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("logcat");
        append_logcat_flags(&mut builder, options, self.fs.as_ref());
        if let Some(filter) = filter {
            builder.append(filter);
        }

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 查询 adb 版本信息
    pub fn version(&self, settings: &AdbSettings) -> AdbResult<String> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("version");

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.join("\n"))
    }

    /// 查询目标设备的序列号
    pub fn get_serialno(&self, settings: &AdbSettings) -> AdbResult<String> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("get-serialno");

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.join("\n"))
    }

    /// 查询目标设备的状态
    pub fn get_state(&self, settings: &AdbSettings) -> AdbResult<String> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("get-state");

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.join("\n"))
    }

    /// 在设备上执行 shell 命令
    pub fn shell(&self, settings: &AdbSettings, command: &str) -> AdbResult<Vec<String>> {
        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("shell");
        builder.append(command);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 截取设备屏幕并保存到本地
    ///
    /// 截图先落在设备端的随机临时文件，拉取后删除。
    pub fn screencap(&self, settings: &AdbSettings, save_to: &Path) -> AdbResult<()> {
        let remote = utils::random_remote_media_path("png");

        self.shell(settings, &format!("screencap {}", remote))?;
        self.pull(settings, Path::new(&remote), save_to)?;
        self.shell(settings, &format!("rm {}", remote))?;

        debug!("截图已保存到 {}", save_to.display());
        Ok(())
    }

    /// 录制设备屏幕并保存到本地
    ///
    /// 不设时长限制时录制会一直进行，通过取消令牌停止；
    /// 取消后仍会拉取已录制的内容并清理设备端临时文件。
    pub fn screenrecord(
        &self,
        settings: &AdbSettings,
        save_to: &Path,
        cancel: Option<&CancelToken>,
        options: &ScreenRecordOptions,
    ) -> AdbResult<()> {
        let remote = utils::random_remote_media_path("mp4");

        let mut builder = ArgumentBuilder::new();
        append_serial(&mut builder, settings);
        builder.append("shell");
        builder.append("screenrecord");
        append_screenrecord_flags(&mut builder, options);
        builder.append(remote.clone());

        self.run_adb_cancellable(settings, &builder, cancel)?;

        self.pull(settings, Path::new(&remote), save_to)?;
        self.shell(settings, &format!("rm {}", remote))?;

        debug!("录屏已保存到 {}", save_to.display());
        Ok(())
    }

    /// 等待模拟器完成启动 (dev.bootcomplete=1)
    ///
    /// 每秒查询一次启动属性，超时返回 Ok(false)。
    pub fn wait_for_emulator_boot(
        &self,
        settings: &AdbSettings,
        timeout: Duration,
    ) -> AdbResult<bool> {
        info!("等待模拟器启动完成...");
        utils::wait_with_polling(timeout, Duration::from_secs(1), || {
            Ok(self
                .shell(settings, "getprop dev.bootcomplete")?
                .iter()
                .any(|l| l.contains('1')))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::StdFileSystem;

    #[test]
    fn logcat_defaults_to_dump_mode() {
        let mut builder = ArgumentBuilder::new();
        append_logcat_flags(&mut builder, &LogcatOptions::default(), &StdFileSystem);

        assert_eq!(builder.as_args(), vec!["-d"]);
    }

    #[test]
    fn logcat_clear_suppresses_dump_flags() {
        let options = LogcatOptions {
            clear: true,
            verbosity: LogcatVerbosity::Time,
            ..Default::default()
        };

        let mut builder = ArgumentBuilder::new();
        append_logcat_flags(&mut builder, &options, &StdFileSystem);

        assert_eq!(builder.as_args(), vec!["-c"]);
    }

    #[test]
    fn logcat_flags_follow_declared_order() {
        let options = LogcatOptions {
            buffer: LogcatBufferType::Radio,
            output_file: Some(PathBuf::from("/tmp/radio.log")),
            num_rotated_logs: Some(4),
            log_rotation_kb: None,
            silent_filter: true,
            verbosity: LogcatVerbosity::ThreadTime,
            ..Default::default()
        };

        let mut builder = ArgumentBuilder::new();
        append_logcat_flags(&mut builder, &options, &StdFileSystem);

        assert_eq!(
            builder.as_args(),
            vec![
                "-b",
                "radio",
                "-d",
                "-f",
                "/tmp/radio.log",
                "-n",
                "4",
                "-r",
                "16",
                "-s",
                "-v",
                "threadtime"
            ]
        );
    }

    #[test]
    fn screenrecord_flags_follow_declared_order() {
        let options = ScreenRecordOptions {
            time_limit: Some(Duration::from_secs(30)),
            bitrate_mbps: Some(4),
            size: Some((1280, 720)),
            rotate: true,
            verbose: true,
        };

        let mut builder = ArgumentBuilder::new();
        append_screenrecord_flags(&mut builder, &options);

        assert_eq!(
            builder.as_args(),
            vec![
                "--time-limit",
                "30",
                "--bit-rate",
                "4000000",
                "--size",
                "1280x720",
                "--rotate",
                "--verbose"
            ]
        );
    }
}
