use adb_bridge::prelude::*;

fn main() -> AdbResult<()> {
    let adb = Adb::new();
    let settings = AdbSettings::new();

    // 列出第三方包
    let packages = adb.list_packages(
        &settings,
        false,
        PackageListState::All,
        PackageSourceType::OnlyThirdParty,
    )?;
    println!("已安装的第三方应用数量: {}", packages.len());

    if let Some(package) = packages.first() {
        println!(
            "第一个包: {} ({})",
            package.package_name,
            package.install_path.display()
        );

        // 查询包路径
        if let Some(path) = adb.path_to_package(&settings, &package.package_name)? {
            println!("APK 路径: {}", path.display());
        }
    }

    // 按组列出危险权限
    let groups = adb.list_permissions(&settings, true, false)?;
    for group in &groups {
        println!("权限组: {} ({} 个权限)", group.group, group.permissions.len());
        for perm in &group.permissions {
            println!("  {} [{}]", perm.permission, perm.protection_levels.join("|"));
        }
    }

    // 运行仪器化测试并取摘要
    let options = AmInstrumentOptions::default().extra("class", &["com.example.FooTest"]);
    if let Some(summary) =
        adb.instrument_summary(&settings, "com.example.test/androidx.test.runner.AndroidJUnitRunner", &options)?
    {
        println!(
            "测试: 共 {} 通过 {} 失败 {} 跳过 {}",
            summary.run, summary.passed, summary.failed, summary.skipped
        );
    }

    Ok(())
}
