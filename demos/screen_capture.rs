use adb_bridge::prelude::*;
use std::path::Path;
use std::time::Duration;

fn main() -> AdbResult<()> {
    let adb = Adb::new();
    let settings = AdbSettings::new();

    // 截图
    adb.screencap(&settings, Path::new("screen.png"))?;
    println!("截图已保存到 screen.png");

    // 录制 10 秒后用取消令牌停止
    let token = CancelToken::new();
    let canceller = token.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(10));
        canceller.cancel();
    });

    adb.screenrecord(
        &settings,
        Path::new("screen.mp4"),
        Some(&token),
        &ScreenRecordOptions::default(),
    )?;
    println!("录屏已保存到 screen.mp4");

    Ok(())
}
