use adb_bridge::prelude::*;

fn main() -> AdbResult<()> {
    // 默认设置: 从 ANDROID_HOME 定位 adb，不指定设备
    let adb = Adb::new();
    let settings = AdbSettings::new();

    // 检查 adb 是否可用
    match adb.version(&settings) {
        Ok(version) => println!("ADB 版本: {}", version),
        Err(e) => {
            eprintln!("ADB 不可用: {}", e);
            return Err(e);
        }
    }

    // 列出连接的设备
    let devices = adb.devices(&settings)?;
    println!("发现 {} 个设备:", devices.len());

    for device in &devices {
        println!(
            "  序列号: {}, 型号: {}",
            device.serial,
            device.model.as_deref().unwrap_or("未知")
        );

        // 指向该设备后查询属性
        let targeted = settings.for_serial(&device.serial);
        let version = adb.shell(&targeted, "getprop ro.build.version.release")?;
        if let Some(line) = version.first() {
            println!("  Android 版本: {}", line);
        }

        // 发送一条广播并查看结果码
        let code = adb.broadcast(&targeted, "-a android.intent.action.BOOT_COMPLETED", None)?;
        println!("  广播结果码: {}", code);
    }

    Ok(())
}
