//! 活动管理器 (`am`) 命令层
//!
//! 每个操作对应一条 `adb shell am ...` 调用。意图参数由调用方
//! 构造，这里当作不透明字符串透传。

use std::path::{Path, PathBuf};

use log::debug;

use crate::args::ArgumentBuilder;
use crate::config::AdbSettings;
use crate::device::{append_serial, Adb};
use crate::error::AdbResult;
use crate::locator::FileSystem;
use crate::parse;

/// `am start` 选项
#[derive(Debug, Clone, Default)]
pub struct AmStartOptions {
    /// 启用调试 (`-D`)
    pub enable_debugging: bool,
    /// 等待启动完成 (`-W`)
    pub wait_for_launch: bool,
    /// 启动前开始采样并写入该文件
    pub profile_to_file: Option<PathBuf>,
    /// 采样持续到应用空闲 (`-P`)，否则仅标记开始 (`--start`)
    pub profile_until_idle: bool,
    /// 重复启动次数 (`-R`)
    pub repeat_launch: Option<u32>,
    /// 启动前强制停止目标应用 (`-S`)
    pub force_stop_target: bool,
    /// 启用 OpenGL 跟踪 (`--opengl-trace`)
    pub enable_opengl_trace: bool,
    /// 以指定用户身份运行 (`--user`)
    pub run_as_user: Option<String>,
}

/// `am instrument` 选项
#[derive(Debug, Clone, Default)]
pub struct AmInstrumentOptions {
    /// 输出原始结果 (`-r`)
    pub print_raw_results: bool,
    /// 传给测试运行器的键值对 (`-e <key> <v1,v2,...>`)，保持声明顺序
    pub extras: Vec<(String, Vec<String>)>,
    /// 采样输出文件 (`-p`)
    pub profile_to_file: Option<PathBuf>,
    /// 等待仪器化执行结束 (`-w`)
    pub wait: bool,
    /// 关闭窗口动画 (`--no-window-animation`)
    pub no_window_animation: bool,
    /// 以指定用户身份运行 (`--user`)
    pub run_as_user: Option<String>,
}

impl AmInstrumentOptions {
    /// 追加一个传给测试运行器的键值对
    pub fn extra(mut self, key: &str, values: &[&str]) -> Self {
        self.extras
            .push((key.to_string(), values.iter().map(|v| v.to_string()).collect()));
        self
    }
}

/// 仪器化测试摘要
///
/// 从输出中最后一行 "Tests run:" 报告提取。四数形态没有
/// inconclusive 字段，该值补 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestRunSummary {
    pub run: i32,
    pub passed: i32,
    pub failed: i32,
    pub skipped: i32,
    pub inconclusive: i32,
}

fn am_builder(settings: &AdbSettings) -> ArgumentBuilder {
    let mut builder = ArgumentBuilder::new();
    append_serial(&mut builder, settings);
    builder.append("shell");
    builder.append("am");
    builder
}

pub(crate) fn append_start_flags(
    builder: &mut ArgumentBuilder,
    options: &AmStartOptions,
    fs: &dyn FileSystem,
) {
    if options.enable_debugging {
        builder.append("-D");
    }
    if options.wait_for_launch {
        builder.append("-W");
    }
    if let Some(file) = options.profile_to_file.as_deref() {
        if options.profile_until_idle {
            builder.append("-P");
        } else {
            builder.append("--start");
        }
        builder.append_quoted(fs.absolute(file).display().to_string());
    }
    if let Some(repeat) = options.repeat_launch.filter(|r| *r > 0) {
        builder.append("-R");
        builder.append(repeat.to_string());
    }
    if options.force_stop_target {
        builder.append("-S");
    }
    if options.enable_opengl_trace {
        builder.append("--opengl-trace");
    }
    if let Some(user) = options.run_as_user.as_deref() {
        builder.append("--user");
        builder.append(user);
    }
}

pub(crate) fn append_instrument_flags(
    builder: &mut ArgumentBuilder,
    options: &AmInstrumentOptions,
    fs: &dyn FileSystem,
) {
    if options.print_raw_results {
        builder.append("-r");
    }
    for (key, values) in &options.extras {
        builder.append("-e");
        builder.append(key);
        builder.append(values.join(","));
    }
    if let Some(file) = options.profile_to_file.as_deref() {
        builder.append("-p");
        builder.append_quoted(fs.absolute(file).display().to_string());
    }
    if options.wait {
        builder.append("-w");
    }
    if options.no_window_animation {
        builder.append("--no-window-animation");
    }
    if let Some(user) = options.run_as_user.as_deref() {
        builder.append("--user");
        builder.append(user);
    }
}

impl Adb {
    /// 启动活动
    ///
    /// 输出中出现 "Starting:" 行视为启动命令已被接受。
    pub fn start_activity(
        &self,
        settings: &AdbSettings,
        intent: &str,
        options: &AmStartOptions,
    ) -> AdbResult<bool> {
        let mut builder = am_builder(settings);
        builder.append("start");
        append_start_flags(&mut builder, options, self.fs.as_ref());
        builder.append(intent);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.iter().any(|l| {
            l.get(..9)
                .map(|p| p.eq_ignore_ascii_case("starting:"))
                .unwrap_or(false)
        }))
    }

    /// 启动服务
    pub fn start_service(
        &self,
        settings: &AdbSettings,
        intent: &str,
        run_as_user: Option<&str>,
    ) -> AdbResult<bool> {
        let mut builder = am_builder(settings);
        builder.append("startservice");
        if let Some(user) = run_as_user {
            builder.append("--user");
            builder.append(user);
        }
        builder.append(intent);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.iter().any(|l| {
            l.get(..17)
                .map(|p| p.eq_ignore_ascii_case("starting service:"))
                .unwrap_or(false)
        }))
    }

    /// 强制停止应用
    pub fn force_stop(&self, settings: &AdbSettings, package_name: &str) -> AdbResult<()> {
        let mut builder = am_builder(settings);
        builder.append("force-stop");
        builder.append(package_name);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 杀掉应用的后台进程
    pub fn kill(
        &self,
        settings: &AdbSettings,
        package_name: &str,
        for_user: Option<&str>,
    ) -> AdbResult<()> {
        let mut builder = am_builder(settings);
        builder.append("kill");
        builder.append(package_name);
        // user 标志跟在包名之后
        if let Some(user) = for_user {
            builder.append("--user");
            builder.append(user);
        }
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 杀掉所有后台进程
    pub fn kill_all(&self, settings: &AdbSettings) -> AdbResult<()> {
        let mut builder = am_builder(settings);
        builder.append("killall");
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 发送广播并返回结果码
    ///
    /// 输出中没有 "Broadcast completed" 行时返回 -1 哨兵值。
    pub fn broadcast(
        &self,
        settings: &AdbSettings,
        intent: &str,
        to_user: Option<&str>,
    ) -> AdbResult<i32> {
        let mut builder = am_builder(settings);
        builder.append("broadcast");
        if let Some(user) = to_user {
            builder.append("--user");
            builder.append(user);
        }
        builder.append(intent);

        let result = self.run_adb(settings, &builder)?;
        let code = parse::parse_broadcast_result(&result.lines);
        debug!("广播结果码: {}", code);
        Ok(code)
    }

    /// 运行仪器化组件，返回原始输出
    pub fn instrument(
        &self,
        settings: &AdbSettings,
        component: &str,
        options: &AmInstrumentOptions,
    ) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("instrument");
        append_instrument_flags(&mut builder, options, self.fs.as_ref());
        builder.append(component);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 运行仪器化测试并提取测试摘要
    ///
    /// 输出中没有摘要行时返回 None。
    pub fn instrument_summary(
        &self,
        settings: &AdbSettings,
        component: &str,
        options: &AmInstrumentOptions,
    ) -> AdbResult<Option<TestRunSummary>> {
        let output = self.instrument(settings, component, options)?;
        parse::parse_test_summary(&output)
    }

    /// 开始对进程采样
    pub fn start_profiling(
        &self,
        settings: &AdbSettings,
        process: &str,
        output_file: &Path,
    ) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("profile");
        builder.append("start");
        builder.append(process);
        builder.append_quoted(self.fs.absolute(output_file).display().to_string());

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 停止对进程采样
    pub fn stop_profiling(&self, settings: &AdbSettings, process: &str) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("profile");
        builder.append("stop");
        builder.append(process);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 转储进程堆到文件
    pub fn dump_heap(
        &self,
        settings: &AdbSettings,
        process: &str,
        output_file: &Path,
        for_user: Option<&str>,
        dump_native_heap: bool,
    ) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("dumpheap");
        if let Some(user) = for_user {
            builder.append("--user");
            builder.append(user);
        }
        if dump_native_heap {
            builder.append("-n");
        }
        builder.append(process);
        builder.append_quoted(self.fs.absolute(output_file).display().to_string());

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 设置调试目标应用
    pub fn set_debug_app(
        &self,
        settings: &AdbSettings,
        package_name: &str,
        wait: bool,
        persistent: bool,
    ) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("set-debug-app");
        if wait {
            builder.append("-w");
        }
        if persistent {
            builder.append("--persistent");
        }
        builder.append(package_name);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 清除调试目标应用
    pub fn clear_debug_app(&self, settings: &AdbSettings) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("clear-debug-app");

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 启动崩溃/ANR 监视
    pub fn monitor(&self, settings: &AdbSettings, gdb_port: Option<u16>) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("monitor");
        if let Some(port) = gdb_port {
            builder.append(format!("--gdb:{}", port));
        }

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 开关应用的屏幕兼容模式
    pub fn screen_compat(
        &self,
        settings: &AdbSettings,
        compat_on: bool,
        package_name: &str,
    ) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("screen-compat");
        builder.append(if compat_on { "on" } else { "off" });
        builder.append(package_name);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 覆盖显示尺寸
    pub fn display_size(
        &self,
        settings: &AdbSettings,
        width: u32,
        height: u32,
    ) -> AdbResult<Vec<String>> {
        self.display_size_inner(settings, Some((width, height)))
    }

    /// 恢复默认显示尺寸
    pub fn reset_display_size(&self, settings: &AdbSettings) -> AdbResult<Vec<String>> {
        self.display_size_inner(settings, None)
    }

    fn display_size_inner(
        &self,
        settings: &AdbSettings,
        size: Option<(u32, u32)>,
    ) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("display-size");
        match size {
            Some((width, height)) => builder.append(format!("{}x{}", width, height)),
            None => builder.append("reset"),
        };

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 覆盖显示密度
    pub fn display_density(&self, settings: &AdbSettings, dpi: u32) -> AdbResult<Vec<String>> {
        let mut builder = am_builder(settings);
        builder.append("display-density");
        builder.append(dpi.to_string());

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines)
    }

    /// 把意图转换为 URI 表示
    pub fn intent_to_uri(&self, settings: &AdbSettings, intent: &str) -> AdbResult<String> {
        let mut builder = am_builder(settings);
        builder.append("to-uri");
        builder.append(intent);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.join("\n"))
    }

    /// 把意图转换为 intent: URI 表示
    pub fn intent_to_intent_uri(&self, settings: &AdbSettings, intent: &str) -> AdbResult<String> {
        let mut builder = am_builder(settings);
        builder.append("to-intent-uri");
        builder.append(intent);

        let result = self.run_adb(settings, &builder)?;
        Ok(result.lines.join("\n"))
    }
}
