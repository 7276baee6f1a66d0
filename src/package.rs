//! 包管理器 (`pm`) 命令层
//!
//! 每个操作对应一条 `adb shell pm ...` 调用，列表类命令的输出
//! 交给 parse 模块转换为类型化记录。

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::args::ArgumentBuilder;
use crate::config::AdbSettings;
use crate::device::{append_serial, Adb};
use crate::error::AdbResult;
use crate::parse;

/// 包的启用状态过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageListState {
    /// 全部，包括启用与禁用
    #[default]
    All,
    /// 仅启用的包
    OnlyEnabled,
    /// 仅禁用的包
    OnlyDisabled,
}

/// 包的来源过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageSourceType {
    /// 全部，包括系统与第三方
    #[default]
    All,
    /// 仅系统包
    OnlySystem,
    /// 仅第三方包
    OnlyThirdParty,
}

/// 安装位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallLocation {
    /// 由系统自动决定
    #[default]
    Auto,
    /// 内部存储
    Internal,
    /// 外部存储
    External,
}

impl InstallLocation {
    fn code(&self) -> i32 {
        match self {
            InstallLocation::Auto => 0,
            InstallLocation::Internal => 1,
            InstallLocation::External => 2,
        }
    }
}

/// `pm install` 选项
#[derive(Debug, Clone, Default)]
pub struct PmInstallOptions {
    /// 前向锁定 (`-l`)
    pub forward_lock: bool,
    /// 覆盖安装并保留数据 (`-r`)
    pub reinstall: bool,
    /// 允许测试 APK (`-t`)
    pub allow_test_apks: bool,
    /// 安装到共享存储 (`-s`)
    pub on_shared_storage: bool,
    /// 安装到内部系统存储 (`-f`)
    pub on_internal_memory: bool,
    /// 允许版本降级 (`-d`)
    pub allow_downgrade: bool,
    /// 授予清单中声明的全部权限 (`-g`)
    pub grant_all_permissions: bool,
}

/// 包列表记录
///
/// 对应 `pm list packages -f -i` 输出中一行 `package:` 记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageListInfo {
    pub install_path: PathBuf,
    pub package_name: String,
    pub installer: Option<String>,
}

/// 权限组记录
///
/// 组级没有独立的 description 字段，`description:` 行的内容
/// 写入 label，消费方依赖这一映射。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionGroupInfo {
    pub group: String,
    pub package_name: Option<String>,
    pub label: Option<String>,
    pub permissions: Vec<PermissionInfo>,
}

impl PermissionGroupInfo {
    pub fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            ..Default::default()
        }
    }
}

/// 权限记录
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionInfo {
    pub permission: String,
    pub package_name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    /// 保护级别，按输出顺序保留，重复项不去重
    pub protection_levels: Vec<String>,
}

impl PermissionInfo {
    pub fn new(permission: &str) -> Self {
        Self {
            permission: permission.to_string(),
            ..Default::default()
        }
    }
}

fn pm_builder(settings: &AdbSettings) -> ArgumentBuilder {
    let mut builder = ArgumentBuilder::new();
    append_serial(&mut builder, settings);
    builder.append("shell");
    builder.append("pm");
    builder
}

pub(crate) fn append_list_packages_flags(
    builder: &mut ArgumentBuilder,
    include_uninstalled: bool,
    state: PackageListState,
    source: PackageSourceType,
) {
    builder.append("list");
    builder.append("packages");
    builder.append("-f");
    builder.append("-i");

    match state {
        PackageListState::OnlyDisabled => {
            builder.append("-d");
        }
        PackageListState::OnlyEnabled => {
            builder.append("-e");
        }
        PackageListState::All => {}
    }

    match source {
        PackageSourceType::OnlySystem => {
            builder.append("-s");
        }
        PackageSourceType::OnlyThirdParty => {
            builder.append("-3");
        }
        PackageSourceType::All => {}
    }

    if include_uninstalled {
        builder.append("-u");
    }
}

pub(crate) fn append_install_flags(builder: &mut ArgumentBuilder, options: &PmInstallOptions) {
    if options.forward_lock {
        builder.append("-l");
    }
    if options.reinstall {
        builder.append("-r");
    }
    if options.allow_test_apks {
        builder.append("-t");
    }
    if options.on_shared_storage {
        builder.append("-s");
    }
    if options.on_internal_memory {
        builder.append("-f");
    }
    if options.allow_downgrade {
        builder.append("-d");
    }
    if options.grant_all_permissions {
        builder.append("-g");
    }
}

impl Adb {
    /// 列出设备上的包
    ///
    /// 带路径与安装来源 (`-f -i`)，可按启用状态和来源过滤。
    pub fn list_packages(
        &self,
        settings: &AdbSettings,
        include_uninstalled: bool,
        state: PackageListState,
        source: PackageSourceType,
    ) -> AdbResult<Vec<PackageListInfo>> {
        let mut builder = pm_builder(settings);
        append_list_packages_flags(&mut builder, include_uninstalled, state, source);

        let result = self.run_adb(settings, &builder)?;
        let packages = parse::parse_package_list(&result.lines);

        info!("列出 {} 个包", packages.len());
        Ok(packages)
    }

    /// 列出权限组名称
    pub fn list_permission_groups(&self, settings: &AdbSettings) -> AdbResult<Vec<String>> {
        let mut builder = pm_builder(settings);
        builder.append("list");
        builder.append("permission-groups");

        let result = self.run_adb(settings, &builder)?;
        Ok(parse::parse_permission_groups(&result.lines))
    }

    /// 按组列出权限
    ///
    /// `only_dangerous` 仅列危险权限 (`-d`)，`only_user_visible`
    /// 仅列用户可见的权限 (`-u`)。
    pub fn list_permissions(
        &self,
        settings: &AdbSettings,
        only_dangerous: bool,
        only_user_visible: bool,
    ) -> AdbResult<Vec<PermissionGroupInfo>> {
        let mut builder = pm_builder(settings);
        builder.append("list");
        builder.append("permissions");
        builder.append("-g");
        builder.append("-f");
        if only_dangerous {
            builder.append("-d");
        }
        if only_user_visible {
            builder.append("-u");
        }

        let result = self.run_adb(settings, &builder)?;
        parse::parse_permissions(&result.lines)
    }

    /// 列出系统特性
    pub fn list_features(&self, settings: &AdbSettings) -> AdbResult<Vec<String>> {
        let mut builder = pm_builder(settings);
        builder.append("list");
        builder.append("features");

        let result = self.run_adb(settings, &builder)?;
        Ok(parse::parse_features(&result.lines))
    }

    /// 列出系统库
    pub fn list_libraries(&self, settings: &AdbSettings) -> AdbResult<Vec<String>> {
        let mut builder = pm_builder(settings);
        builder.append("list");
        builder.append("libraries");

        let result = self.run_adb(settings, &builder)?;
        Ok(parse::parse_libraries(&result.lines))
    }

    /// 查询包的 APK 路径
    pub fn path_to_package(
        &self,
        settings: &AdbSettings,
        package_name: &str,
    ) -> AdbResult<Option<PathBuf>> {
        let mut builder = pm_builder(settings);
        builder.append("path");
        builder.append(package_name);

        let result = self.run_adb(settings, &builder)?;
        Ok(parse::parse_path_to_package(&result.lines))
    }

    /// 安装设备上已有的 APK 文件
    ///
    /// 路径指向设备端文件，区别于主机端 APK 的顶层 `install`。
    pub fn install_package(
        &self,
        settings: &AdbSettings,
        path_on_device: &Path,
        options: &PmInstallOptions,
    ) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("install");
        append_install_flags(&mut builder, options);
        builder.append_quoted(path_on_device.display().to_string());

        self.run_adb(settings, &builder)?;
        debug!("pm install {} 完成", path_on_device.display());
        Ok(())
    }

    /// 清除包的数据
    pub fn clear(&self, settings: &AdbSettings, package_name: &str) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("clear");
        builder.append(package_name);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 启用包或组件
    pub fn enable(&self, settings: &AdbSettings, package_or_component: &str) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("enable");
        builder.append(package_or_component);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 禁用包或组件
    pub fn disable(&self, settings: &AdbSettings, package_or_component: &str) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("disable");
        builder.append(package_or_component);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 为指定用户禁用包或组件
    pub fn disable_user(
        &self,
        settings: &AdbSettings,
        package_or_component: &str,
        for_user: Option<&str>,
    ) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("disable");
        if let Some(user) = for_user {
            builder.append("--user");
            builder.append(user);
        }
        builder.append(package_or_component);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 授予权限
    pub fn grant(
        &self,
        settings: &AdbSettings,
        package_name: &str,
        permission: &str,
    ) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("grant");
        builder.append(package_name);
        builder.append(permission);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 撤销权限
    pub fn revoke(
        &self,
        settings: &AdbSettings,
        package_name: &str,
        permission: &str,
    ) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("revoke");
        builder.append(package_name);
        builder.append(permission);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 设置默认安装位置
    pub fn set_install_location(
        &self,
        settings: &AdbSettings,
        location: InstallLocation,
    ) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("set-install-location");
        builder.append(location.code().to_string());
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 查询默认安装位置
    pub fn get_install_location(&self, settings: &AdbSettings) -> AdbResult<InstallLocation> {
        let mut builder = pm_builder(settings);
        builder.append("get-install-location");

        let result = self.run_adb(settings, &builder)?;
        let joined = result.lines.join("\n");

        if joined.contains("[internal]") {
            Ok(InstallLocation::Internal)
        } else if joined.contains("[external]") {
            Ok(InstallLocation::External)
        } else {
            Ok(InstallLocation::Auto)
        }
    }

    /// 开关权限强制执行
    pub fn set_permission_enforced(
        &self,
        settings: &AdbSettings,
        permission: &str,
        enforced: bool,
    ) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("set-permission-enforced");
        builder.append(permission);
        builder.append(if enforced { "true" } else { "false" });
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 修剪缓存直到达到期望的剩余空间
    pub fn trim_caches(&self, settings: &AdbSettings, desired_free_space: &str) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("trim-caches");
        builder.append(desired_free_space);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 创建用户
    pub fn create_user(&self, settings: &AdbSettings, user_name: &str) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("create-user");
        builder.append(user_name);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 删除用户
    pub fn remove_user(&self, settings: &AdbSettings, user_id: &str) -> AdbResult<()> {
        let mut builder = pm_builder(settings);
        builder.append("remove-user");
        builder.append(user_id);
        self.run_adb(settings, &builder)?;
        Ok(())
    }

    /// 查询系统支持的最大用户数，无法识别时返回 -1
    pub fn get_max_users(&self, settings: &AdbSettings) -> AdbResult<i32> {
        let mut builder = pm_builder(settings);
        builder.append("get-max-users");

        let result = self.run_adb(settings, &builder)?;
        Ok(parse::parse_max_users(&result.lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_packages_flags_follow_declared_order() {
        let mut builder = ArgumentBuilder::new();
        append_list_packages_flags(
            &mut builder,
            true,
            PackageListState::OnlyEnabled,
            PackageSourceType::OnlyThirdParty,
        );

        assert_eq!(
            builder.as_args(),
            vec!["list", "packages", "-f", "-i", "-e", "-3", "-u"]
        );
    }

    #[test]
    fn list_packages_defaults_keep_only_base_flags() {
        let mut builder = ArgumentBuilder::new();
        append_list_packages_flags(
            &mut builder,
            false,
            PackageListState::All,
            PackageSourceType::All,
        );

        assert_eq!(builder.as_args(), vec!["list", "packages", "-f", "-i"]);
    }

    #[test]
    fn install_flags_follow_declared_order() {
        let options = PmInstallOptions {
            forward_lock: true,
            reinstall: true,
            allow_test_apks: true,
            on_shared_storage: true,
            on_internal_memory: true,
            allow_downgrade: true,
            grant_all_permissions: true,
        };

        let mut builder = ArgumentBuilder::new();
        append_install_flags(&mut builder, &options);

        assert_eq!(
            builder.as_args(),
            vec!["-l", "-r", "-t", "-s", "-f", "-d", "-g"]
        );
    }

    #[test]
    fn install_location_codes_match_the_tool() {
        assert_eq!(InstallLocation::Auto.code(), 0);
        assert_eq!(InstallLocation::Internal.code(), 1);
        assert_eq!(InstallLocation::External.code(), 2);
    }
}
