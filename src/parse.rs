//! 输出解析
//!
//! 纯函数，把捕获的输出行序列转换为类型化记录。除显式说明的
//! 逆序扫描外，所有集合保持输出中的出现顺序。

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

use crate::activity::TestRunSummary;
use crate::device::DeviceInfo;
use crate::error::{AdbError, AdbResult};
use crate::package::{PackageListInfo, PermissionGroupInfo, PermissionInfo};

static RX_PACKAGE_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^package:(?P<path>.*?)=(?P<package>.*?)\s+installer=(?P<installer>.*?)$").unwrap()
});
static RX_PACKAGE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^package:(?P<path>.*)$").unwrap());
static RX_FEATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^feature:(?P<feature>.*)$").unwrap());
static RX_LIBRARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^library:(?P<lib>.*)$").unwrap());
static RX_PERMISSION_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^permission group:(?P<group>.*)$").unwrap());
static RX_BROADCAST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Broadcast completed:\s*result\s*=\s*(?P<result>\d+)").unwrap());
static RX_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// 解析 `devices -l` 的输出
///
/// 第一行是表头，跳过。其余行按空白切分: 首列为序列号，第二列
/// 为状态（offline 的设备整行剔除），之后是 `key:value` 属性对，
/// 识别 usb、product、model、device 四个键，其余忽略。
pub fn parse_devices(lines: &[String]) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in lines.iter().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        if parts.len() > 1 && parts[1].eq_ignore_ascii_case("offline") {
            continue;
        }

        let mut info = DeviceInfo::new(parts[0].trim());

        for part in parts.iter().skip(2) {
            let Some((key, value)) = part.split_once(':') else {
                continue;
            };
            match key.to_lowercase().as_str() {
                "usb" => info.usb = Some(value.to_string()),
                "product" => info.product = Some(value.to_string()),
                "model" => info.model = Some(value.to_string()),
                "device" => info.device = Some(value.to_string()),
                _ => {}
            }
        }

        if !info.serial.is_empty() {
            devices.push(info);
        }
    }

    devices
}

/// 解析 `pm list packages -f -i` 的输出
///
/// 每行独立匹配 `package:<路径>=<包名> installer=<来源>`，
/// 不匹配的行静默跳过，路径与包名缺一不可。
pub fn parse_package_list(lines: &[String]) -> Vec<PackageListInfo> {
    let mut results = Vec::new();

    for line in lines {
        let Some(caps) = RX_PACKAGE_LIST.captures(line) else {
            continue;
        };

        let path = &caps["path"];
        let package = &caps["package"];
        if path.is_empty() || package.is_empty() {
            continue;
        }

        let installer = Some(caps["installer"].to_string()).filter(|i| !i.is_empty());
        results.push(PackageListInfo {
            install_path: PathBuf::from(path),
            package_name: package.to_string(),
            installer,
        });
    }

    results
}

fn capture_per_line(lines: &[String], re: &Regex, group: &str) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| re.captures(line))
        .map(|caps| caps[group].to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// 解析 `pm list features` 的输出
pub fn parse_features(lines: &[String]) -> Vec<String> {
    capture_per_line(lines, &RX_FEATURE, "feature")
}

/// 解析 `pm list libraries` 的输出
pub fn parse_libraries(lines: &[String]) -> Vec<String> {
    capture_per_line(lines, &RX_LIBRARY, "lib")
}

/// 解析 `pm list permission-groups` 的输出
pub fn parse_permission_groups(lines: &[String]) -> Vec<String> {
    capture_per_line(lines, &RX_PERMISSION_GROUP, "group")
}

/// 解析 `pm path <package>` 的输出，取第一个匹配
pub fn parse_path_to_package(lines: &[String]) -> Option<PathBuf> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| RX_PACKAGE_PATH.captures(line))
        .map(|caps| caps["path"].to_string())
        .find(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

fn permission_parse_error(line: &str) -> AdbError {
    AdbError::ParseError(format!("权限列表格式异常: {}", line))
}

/// 解析 `pm list permissions -g -f` 的两级分组输出
///
/// 单遍状态机: `+ group:` 开启新组，`  + permission:` 在当前组内
/// 开启新权限，两级字段行按前缀（含前导空白）归属到打开的记录。
/// 组在下一个组标记或输入结束时才写入结果；结束时先冲洗打开的
/// 权限再冲洗打开的组。
///
/// 组级的 `description:` 写入的是 label 字段，沿用既有消费方
/// 依赖的字段映射，不要在这里"修正"。
///
/// 字段行出现在对应记录打开之前属于畸形输入，返回解析错误。
pub fn parse_permissions(lines: &[String]) -> AdbResult<Vec<PermissionGroupInfo>> {
    let mut results = Vec::new();
    let mut current_group: Option<PermissionGroupInfo> = None;
    let mut current_perm: Option<PermissionInfo> = None;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(prefix) = line.get(..16) {
            if prefix.eq_ignore_ascii_case("all permissions:") {
                continue;
            }
        }

        if let Some(rest) = line.strip_prefix("+ group:") {
            if let Some(perm) = current_perm.take() {
                if let Some(group) = current_group.as_mut() {
                    group.permissions.push(perm);
                }
            }
            if let Some(group) = current_group.take() {
                results.push(group);
            }
            current_group = Some(PermissionGroupInfo::new(rest));
        } else if let Some(rest) = line.strip_prefix("  package:") {
            current_group
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .package_name = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("  label:") {
            current_group
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .label = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("  description:") {
            current_group
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .label = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("  + permission:") {
            let group = current_group
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?;
            if let Some(perm) = current_perm.take() {
                group.permissions.push(perm);
            }
            current_perm = Some(PermissionInfo::new(rest));
        } else if let Some(rest) = line.strip_prefix("    package:") {
            current_perm
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .package_name = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("    label:") {
            current_perm
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .label = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("    description:") {
            current_perm
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .description = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("    protectionLevel:") {
            current_perm
                .as_mut()
                .ok_or_else(|| permission_parse_error(line))?
                .protection_levels
                .extend(rest.split('|').map(String::from));
        }
    }

    if let Some(perm) = current_perm.take() {
        if let Some(group) = current_group.as_mut() {
            group.permissions.push(perm);
        }
    }
    if let Some(group) = current_group.take() {
        results.push(group);
    }

    Ok(results)
}

/// 从广播输出中提取结果码
///
/// 找到第一行匹配 `Broadcast completed: result=<n>` 的整数；
/// 没有匹配时返回 -1 哨兵值，表示"无结果/未知"，不是错误。
pub fn parse_broadcast_result(lines: &[String]) -> i32 {
    for line in lines {
        if let Some(caps) = RX_BROADCAST.captures(line) {
            if let Ok(value) = caps["result"].parse::<i32>() {
                return value;
            }
        }
    }
    -1
}

/// 从仪器化测试输出中提取测试摘要
///
/// 逆序扫描，取最后一次出现的 "Tests run:" 行，从匹配位置起
/// 提取所有数字段。4 个数字对应 {run, passed, failed, skipped}，
/// 5 个数字对应 {run, passed, inconclusive, failed, skipped}，
/// 其余数量视为无法识别的报告形态。没有匹配行时返回 None。
pub fn parse_test_summary(lines: &[String]) -> AdbResult<Option<TestRunSummary>> {
    for line in lines.iter().rev() {
        let Some(pos) = line.find("Tests run:") else {
            continue;
        };

        let mut numbers = Vec::new();
        for m in RX_DIGIT_RUN.find_iter(&line[pos..]) {
            numbers.push(m.as_str().parse::<i32>()?);
        }

        let summary = match numbers.as_slice() {
            [run, passed, failed, skipped] => TestRunSummary {
                run: *run,
                passed: *passed,
                failed: *failed,
                skipped: *skipped,
                inconclusive: 0,
            },
            [run, passed, inconclusive, failed, skipped] => TestRunSummary {
                run: *run,
                passed: *passed,
                inconclusive: *inconclusive,
                failed: *failed,
                skipped: *skipped,
            },
            _ => {
                return Err(AdbError::ParseError(format!(
                    "无法识别的测试摘要形态 ({} 个数字): {}",
                    numbers.len(),
                    line
                )))
            }
        };

        return Ok(Some(summary));
    }

    Ok(None)
}

/// 从 `pm get-max-users` 的首行提取数量，无法识别时返回 -1
pub fn parse_max_users(lines: &[String]) -> i32 {
    let Some(line) = lines.first() else {
        return -1;
    };

    if let Some(prefix) = line.get(..24) {
        if prefix.eq_ignore_ascii_case("maximum supported users:") {
            if let Ok(value) = line[24..].trim().parse::<i32>() {
                return value;
            }
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn device_listing_skips_header_and_offline_devices() {
        let output = lines(&[
            "List of devices attached",
            "abc123\tdevice usb:1-1 product:x model:y device:z",
            "def456\toffline",
        ]);

        let devices = parse_devices(&output);

        assert_eq!(devices.len(), 1);
        let d = &devices[0];
        assert_eq!(d.serial, "abc123");
        assert_eq!(d.usb.as_deref(), Some("1-1"));
        assert_eq!(d.product.as_deref(), Some("x"));
        assert_eq!(d.model.as_deref(), Some("y"));
        assert_eq!(d.device.as_deref(), Some("z"));
    }

    #[test]
    fn device_listing_ignores_unknown_keys_and_blank_lines() {
        let output = lines(&[
            "List of devices attached",
            "",
            "abc123\tdevice transport_id:5 model:pixel",
        ]);

        let devices = parse_devices(&output);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].model.as_deref(), Some("pixel"));
        assert!(devices[0].usb.is_none());
    }

    #[test]
    fn package_list_roundtrip() {
        let expected = vec![
            PackageListInfo {
                install_path: PathBuf::from("/data/app/com.example.one-1/base.apk"),
                package_name: "com.example.one".to_string(),
                installer: Some("com.android.vending".to_string()),
            },
            PackageListInfo {
                install_path: PathBuf::from("/system/priv-app/Two/Two.apk"),
                package_name: "com.example.two".to_string(),
                installer: Some("preload".to_string()),
            },
        ];

        let rendered: Vec<String> = expected
            .iter()
            .map(|p| {
                format!(
                    "package:{}={} installer={}",
                    p.install_path.display(),
                    p.package_name,
                    p.installer.as_deref().unwrap_or("")
                )
            })
            .collect();

        assert_eq!(parse_package_list(&rendered), expected);
    }

    #[test]
    fn package_list_skips_unmatched_lines() {
        let output = lines(&[
            "package:/data/app/a-1/base.apk=com.a installer=com.android.vending",
            "some unrelated noise",
            "package:broken-line-without-installer",
        ]);

        let packages = parse_package_list(&output);

        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].package_name, "com.a");
    }

    #[test]
    fn feature_library_and_group_listings() {
        let features = lines(&["feature:android.hardware.location", "oddline"]);
        assert_eq!(parse_features(&features), vec!["android.hardware.location"]);

        let libs = lines(&["library:com.android.location.provider"]);
        assert_eq!(parse_libraries(&libs), vec!["com.android.location.provider"]);

        let groups = lines(&["permission group:android.permission-group.CAMERA"]);
        assert_eq!(
            parse_permission_groups(&groups),
            vec!["android.permission-group.CAMERA"]
        );
    }

    #[test]
    fn path_to_package_takes_first_match() {
        let output = lines(&[
            "",
            "package:/system/priv-app/DownloadProvider/DownloadProvider.apk",
            "package:/data/app/other.apk",
        ]);

        assert_eq!(
            parse_path_to_package(&output),
            Some(PathBuf::from(
                "/system/priv-app/DownloadProvider/DownloadProvider.apk"
            ))
        );
        assert_eq!(parse_path_to_package(&lines(&["no match"])), None);
    }

    fn permission_fixture() -> Vec<String> {
        lines(&[
            "All Permissions:",
            "",
            "+ group:android.permission-group.CAMERA",
            "  package:android",
            "  label:Camera",
            "  description:access the camera",
            "  + permission:android.permission.CAMERA",
            "    package:android",
            "    label:take pictures and videos",
            "    description:Allows the app to take pictures.",
            "    protectionLevel:dangerous",
            "+ group:android.permission-group.LOCATION",
            "  package:android",
            "  + permission:android.permission.ACCESS_FINE_LOCATION",
            "    protectionLevel:dangerous|instant",
        ])
    }

    #[test]
    fn permission_groups_close_on_next_marker_and_at_end_of_stream() {
        let groups = parse_permissions(&permission_fixture()).unwrap();

        assert_eq!(groups.len(), 2);

        let camera = &groups[0];
        assert_eq!(camera.group, "android.permission-group.CAMERA");
        assert_eq!(camera.package_name.as_deref(), Some("android"));
        assert_eq!(camera.permissions.len(), 1);
        let perm = &camera.permissions[0];
        assert_eq!(perm.permission, "android.permission.CAMERA");
        assert_eq!(perm.label.as_deref(), Some("take pictures and videos"));
        assert_eq!(
            perm.description.as_deref(),
            Some("Allows the app to take pictures.")
        );
        assert_eq!(perm.protection_levels, vec!["dangerous"]);

        // 流结束时打开的权限要冲洗进其组
        let location = &groups[1];
        assert_eq!(location.permissions.len(), 1);
        assert_eq!(
            location.permissions[0].permission,
            "android.permission.ACCESS_FINE_LOCATION"
        );
        assert_eq!(
            location.permissions[0].protection_levels,
            vec!["dangerous", "instant"]
        );
    }

    #[test]
    fn group_description_lands_in_label_slot() {
        let groups = parse_permissions(&permission_fixture()).unwrap();
        // 组级 description 行覆盖 label 字段，沿用既有映射
        assert_eq!(groups[0].label.as_deref(), Some("access the camera"));
    }

    #[test]
    fn duplicate_protection_levels_are_preserved() {
        let output = lines(&[
            "+ group:g",
            "  + permission:p",
            "    protectionLevel:normal|normal",
        ]);

        let groups = parse_permissions(&output).unwrap();
        assert_eq!(groups[0].permissions[0].protection_levels, vec!["normal", "normal"]);
    }

    #[test]
    fn permission_line_without_open_group_is_a_parse_error() {
        let output = lines(&["  + permission:android.permission.CAMERA"]);
        assert!(matches!(
            parse_permissions(&output),
            Err(AdbError::ParseError(_))
        ));

        let output = lines(&["+ group:g", "    label:orphan field"]);
        assert!(matches!(
            parse_permissions(&output),
            Err(AdbError::ParseError(_))
        ));
    }

    #[test]
    fn broadcast_result_is_first_match_or_sentinel() {
        assert_eq!(
            parse_broadcast_result(&lines(&["Broadcast completed: result=0"])),
            0
        );
        assert_eq!(
            parse_broadcast_result(&lines(&["broadcast completed: result = 7"])),
            7
        );
        assert_eq!(parse_broadcast_result(&lines(&["no match here"])), -1);
    }

    #[test]
    fn test_summary_takes_last_occurrence() {
        let output = lines(&[
            "Tests run: 9 Passed: 1 Failed: 8 Skipped: 0",
            "retrying...",
            "Tests run: 3 Passed: 3 Failed: 0 Skipped: 0",
            "OK",
        ]);

        let summary = parse_test_summary(&output).unwrap().unwrap();
        assert_eq!(summary.run, 3);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.inconclusive, 0);
    }

    #[test]
    fn test_summary_five_number_shape_carries_inconclusive() {
        let output = lines(&["Tests run: 10, Passed: 7, Inconclusive: 1, Failed: 1, Skipped: 1"]);

        let summary = parse_test_summary(&output).unwrap().unwrap();
        assert_eq!(summary.run, 10);
        assert_eq!(summary.passed, 7);
        assert_eq!(summary.inconclusive, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_summary_ignores_digits_before_the_match() {
        let output = lines(&["08-07 12:00:01 Tests run: 3 Passed: 3 Failed: 0 Skipped: 0"]);

        let summary = parse_test_summary(&output).unwrap().unwrap();
        assert_eq!(summary.run, 3);
    }

    #[test]
    fn test_summary_unknown_shape_is_a_parse_error() {
        let output = lines(&["Tests run: 3 Passed: 3"]);
        assert!(matches!(
            parse_test_summary(&output),
            Err(AdbError::ParseError(_))
        ));
    }

    #[test]
    fn test_summary_absent_is_none() {
        assert!(parse_test_summary(&lines(&["nothing here"])).unwrap().is_none());
        assert!(parse_test_summary(&[]).unwrap().is_none());
    }

    #[test]
    fn max_users_extraction() {
        assert_eq!(parse_max_users(&lines(&["Maximum supported users: 4"])), 4);
        assert_eq!(parse_max_users(&lines(&["maximum supported users:16"])), 16);
        assert_eq!(parse_max_users(&lines(&["unexpected"])), -1);
        assert_eq!(parse_max_users(&[]), -1);
    }
}
