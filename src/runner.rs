use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::args::ArgumentBuilder;
use crate::error::{AdbError, AdbResult};

/// 进程退出轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 输出行接收器
///
/// 无论命令成败，捕获到的每一行输出都会转发到这里。
pub trait LogSink: Send + Sync {
    /// 写入一行输出
    fn write_line(&self, line: &str);
}

/// 默认接收器，转发到 log 门面
#[derive(Debug, Default)]
pub struct StdLogSink;

impl LogSink for StdLogSink {
    fn write_line(&self, line: &str) {
        info!("{}", line);
    }
}

/// 协作式取消令牌
///
/// 克隆共享同一内部状态。触发后运行中的进程会被强制终止，
/// 终止失败不会升级为错误。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// 创建未触发的令牌
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// 是否已请求取消
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// 一次外部进程调用的结果
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// 进程退出码
    pub exit_code: i32,
    /// 按捕获顺序排列的标准输出行
    pub lines: Vec<String>,
    /// 是否因取消而被强制终止
    pub cancelled: bool,
}

impl ExecutionResult {
    /// 退出码为 0 且未被取消视为成功
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.cancelled
    }
}

/// 执行外部工具并捕获标准输出
///
/// 标准输出逐行捕获并即时转发到接收器；标准错误不单独捕获，
/// 这一族工具的错误文本会出现在标准输出上。始终等待进程退出
/// （或强制终止完成）后才返回。
pub fn run(
    executable: &Path,
    builder: &ArgumentBuilder,
    cancel: Option<&CancelToken>,
    sink: &Arc<dyn LogSink>,
) -> AdbResult<ExecutionResult> {
    debug!("执行: {} {}", executable.display(), builder.to_command_line());

    let mut child = Command::new(executable)
        .args(builder.as_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| AdbError::ProcessError(format!("无法启动 {}: {}", executable.display(), e)))?;

    // 读取线程持续排空管道，防止子进程因管道写满而阻塞
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AdbError::ProcessError("无法捕获标准输出".to_string()))?;
    let reader_sink = Arc::clone(sink);
    let reader = std::thread::spawn(move || {
        let mut lines = Vec::new();
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => {
                    reader_sink.write_line(&line);
                    lines.push(line);
                }
                Err(_) => break,
            }
        }
        lines
    });

    let mut cancelled = false;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if cancel.map(CancelToken::is_cancelled).unwrap_or(false) {
                    // 尽力终止，失败不上报
                    if let Err(e) = child.kill() {
                        warn!("终止进程失败: {}", e);
                    }
                    cancelled = true;
                    break child.wait()?;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = reader.join();
                return Err(AdbError::ProcessError(format!("等待进程退出失败: {}", e)));
            }
        }
    };

    let lines = reader.join().unwrap_or_default();
    let exit_code = status.code().unwrap_or(-1);

    debug!("进程退出, 退出码 {}, 输出 {} 行", exit_code, lines.len());

    Ok(ExecutionResult {
        exit_code,
        lines,
        cancelled,
    })
}

/// 根据输出与退出码判定执行结果
///
/// 任何一行以 "error:" 开头（不区分大小写）即视为权威失败信号，
/// 优先于退出码返回；被包装的工具有时在打印错误行的同时仍返回
/// 退出码 0。无错误行时，非零退出不在此处上报，由各命令按自身
/// 返回约定处理。
pub fn classify(result: &ExecutionResult) -> AdbResult<()> {
    for line in &result.lines {
        if let Some(prefix) = line.get(..6) {
            if prefix.eq_ignore_ascii_case("error:") {
                return Err(AdbError::CommandError(line.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(lines: &[&str], exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            exit_code,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            cancelled: false,
        }
    }

    #[test]
    fn error_line_beats_zero_exit_code() {
        let result = result_with(&["ok so far", "error: device not found"], 0);

        match classify(&result) {
            Err(AdbError::CommandError(msg)) => assert_eq!(msg, "error: device not found"),
            other => panic!("expected CommandError, got {:?}", other),
        }
    }

    #[test]
    fn error_marker_match_is_case_insensitive() {
        let result = result_with(&["Error: closed"], 0);
        assert!(classify(&result).is_err());

        let result = result_with(&["ERROR: closed"], 0);
        assert!(classify(&result).is_err());
    }

    #[test]
    fn marker_must_be_a_line_prefix() {
        let result = result_with(&["harmless mention of error: inside"], 0);
        assert!(classify(&result).is_ok());
    }

    #[test]
    fn nonzero_exit_without_marker_is_soft() {
        let result = result_with(&["some output"], 1);
        assert!(classify(&result).is_ok());
        assert!(!result.success());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn captures_lines_and_exit_code_from_real_process() {
        let mut builder = ArgumentBuilder::new();
        let program = if cfg!(windows) {
            builder.append("/C");
            builder.append("echo first& echo second");
            Path::new("cmd.exe")
        } else {
            builder.append("-c");
            builder.append("echo first; echo second");
            Path::new("/bin/sh")
        };

        let sink: Arc<dyn LogSink> = Arc::new(StdLogSink);
        let result = run(program, &builder, None, &sink).expect("进程应当正常执行");

        assert_eq!(result.exit_code, 0);
        assert!(!result.cancelled);
        assert_eq!(result.lines.len(), 2);
        assert!(result.lines[0].contains("first"));
        assert!(result.lines[1].contains("second"));
    }

    #[test]
    fn cancelling_a_long_running_process_sets_the_flag() {
        let mut builder = ArgumentBuilder::new();
        let program = if cfg!(windows) {
            builder.append("/C");
            builder.append("ping -n 30 127.0.0.1 > NUL");
            Path::new("cmd.exe")
        } else {
            builder.append("-c");
            builder.append("sleep 30");
            Path::new("/bin/sh")
        };

        let token = CancelToken::new();
        token.cancel();

        let sink: Arc<dyn LogSink> = Arc::new(StdLogSink);
        let result = run(program, &builder, Some(&token), &sink).expect("取消也应返回结果");

        assert!(result.cancelled);
        assert!(!result.success());
    }
}
