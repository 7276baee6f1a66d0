use thiserror::Error;

/// ADB 操作相关的错误类型
#[derive(Debug, Error)]
pub enum AdbError {
    /// 配置错误（例如无法定位 adb 可执行文件）
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 输出中出现显式错误行（以 "error:" 开头）
    #[error("ADB 命令错误: {0}")]
    CommandError(String),

    /// 进程启动或 IO 错误
    #[error("进程错误: {0}")]
    ProcessError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),
}

// 为标准错误类型实现 From trait，简化错误处理
impl From<std::io::Error> for AdbError {
    fn from(error: std::io::Error) -> Self {
        AdbError::ProcessError(error.to_string())
    }
}

impl From<std::num::ParseIntError> for AdbError {
    fn from(error: std::num::ParseIntError) -> Self {
        AdbError::ParseError(format!("数字解析错误: {}", error))
    }
}

impl From<regex::Error> for AdbError {
    fn from(error: regex::Error) -> Self {
        AdbError::ParseError(format!("正则表达式错误: {}", error))
    }
}

// 添加结果类型别名简化使用
pub type AdbResult<T> = Result<T, AdbError>;
