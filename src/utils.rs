use std::time::{Duration, Instant};

use log::warn;
use rand::Rng;

use crate::error::AdbResult;

/// 根据条件轮询等待
///
/// 周期性地求值条件直到为真或超时。条件求值出错时记录日志并
/// 继续等待，超时返回 Ok(false)。
pub fn wait_with_polling<F>(timeout: Duration, interval: Duration, condition: F) -> AdbResult<bool>
where
    F: Fn() -> AdbResult<bool>,
{
    let start = Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Ok(false);
        }

        match condition() {
            Ok(true) => return Ok(true),
            Ok(false) => std::thread::sleep(interval),
            Err(e) => {
                warn!("检查条件时出错: {}", e);
                std::thread::sleep(interval);
            }
        }
    }
}

/// 生成设备端临时媒体文件路径
///
/// 文件名随机，避免并发调用互相覆盖。
pub fn random_remote_media_path(extension: &str) -> String {
    let name: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();

    format!("/sdcard/{}.{}", name, extension)
}
