use super::{CommandStrategy, OsFamily, PathStyle};
use crate::models::{FileTransfer, GroupSpec, MountSpec, UserSpec};

/// Pick the command strategy for a host's OS family
pub fn strategy_for(os_family: OsFamily) -> Box<dyn CommandStrategy> {
    match os_family {
        OsFamily::Linux => Box::new(LinuxCommandStrategy),
        OsFamily::Windows => Box::new(WindowsCommandStrategy),
    }
}

/// Single-quote a value for POSIX shells
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Single-quote a value for PowerShell
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// POSIX shell commands for Linux targets
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxCommandStrategy;

impl CommandStrategy for LinuxCommandStrategy {
    fn os_family(&self) -> OsFamily {
        OsFamily::Linux
    }

    fn path_style(&self) -> PathStyle {
        PathStyle::Posix
    }

    fn privileged(&self, command: &str, is_sudoer: bool) -> String {
        if is_sudoer {
            format!("sudo -n sh -c {}", sh_quote(command))
        } else {
            command.to_string()
        }
    }

    fn mount_commands(&self, device: &str, mount: &MountSpec) -> Vec<String> {
        let device_q = sh_quote(device);
        let point_q = sh_quote(&mount.mount_point);
        let fs = &mount.filesystem;
        vec![
            format!("blkid {device_q} >/dev/null 2>&1 || mkfs -t {fs} {device_q}"),
            format!("mkdir -p {point_q}"),
            format!("mountpoint -q {point_q} || mount {device_q} {point_q}"),
            format!(
                "grep -q {} /etc/fstab || echo {} >> /etc/fstab",
                sh_quote(&format!(" {} ", mount.mount_point)),
                sh_quote(&format!("{device} {} {fs} defaults,nofail 0 2", mount.mount_point))
            ),
        ]
    }

    fn ensure_directory_commands(&self, path: &str) -> Vec<String> {
        vec![format!("mkdir -p {}", sh_quote(path))]
    }

    fn add_group_commands(&self, group: &GroupSpec) -> Vec<String> {
        let name = sh_quote(&group.name);
        let gid = group
            .gid
            .map(|gid| format!("-g {gid} "))
            .unwrap_or_default();
        vec![format!("getent group {name} >/dev/null || groupadd {gid}{name}")]
    }

    fn add_user_commands(&self, user: &UserSpec) -> Vec<String> {
        let name = sh_quote(&user.name);
        let mut args = vec!["-m".to_string()];
        if let Some(uid) = user.uid {
            args.push(format!("-u {uid}"));
        }
        if !user.groups.is_empty() {
            args.push(format!("-G {}", sh_quote(&user.groups.join(","))));
        }
        if let Some(home) = &user.home {
            args.push(format!("-d {}", sh_quote(home)));
        }
        if let Some(shell) = &user.shell {
            args.push(format!("-s {}", sh_quote(shell)));
        }
        vec![format!(
            "id -u {name} >/dev/null 2>&1 || useradd {} {name}",
            args.join(" ")
        )]
    }

    fn file_commands(&self, file: &FileTransfer) -> Vec<String> {
        let path = sh_quote(&file.remote_path);
        let mut commands = Vec::new();
        if let Some(owner) = &file.owner {
            commands.push(format!("chown {} {path}", sh_quote(owner)));
        }
        if let Some(mode) = &file.mode {
            commands.push(format!("chmod {} {path}", sh_quote(mode)));
        }
        commands
    }

    fn install_package_commands(&self, packages: &[String]) -> Vec<String> {
        if packages.is_empty() {
            return Vec::new();
        }
        let list = packages
            .iter()
            .map(|p| sh_quote(p))
            .collect::<Vec<_>>()
            .join(" ");
        vec![format!(
            "if command -v apt-get >/dev/null 2>&1; then apt-get update -y && DEBIAN_FRONTEND=noninteractive apt-get install -y {list}; \
             elif command -v dnf >/dev/null 2>&1; then dnf install -y {list}; \
             else yum install -y {list}; fi"
        )]
    }
}

/// PowerShell commands for Windows targets
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsCommandStrategy;

impl CommandStrategy for WindowsCommandStrategy {
    fn os_family(&self) -> OsFamily {
        OsFamily::Windows
    }

    fn path_style(&self) -> PathStyle {
        PathStyle::Windows
    }

    // Remote management sessions already run elevated
    fn privileged(&self, command: &str, _is_sudoer: bool) -> String {
        command.to_string()
    }

    fn mount_commands(&self, _device: &str, mount: &MountSpec) -> Vec<String> {
        let point = ps_quote(&PathStyle::Windows.normalize(&mount.mount_point));
        let fs = mount.filesystem.to_ascii_uppercase();
        vec![
            format!("New-Item -ItemType Directory -Force -Path {point} | Out-Null"),
            format!(
                "$disk = Get-Disk | Where-Object PartitionStyle -eq 'RAW' | Select-Object -First 1; \
                 if ($disk) {{ Initialize-Disk -Number $disk.Number -PartitionStyle GPT -PassThru | \
                 New-Partition -UseMaximumSize | Format-Volume -FileSystem {fs} -Confirm:$false | \
                 Get-Partition | Add-PartitionAccessPath -AccessPath {point} }}"
            ),
        ]
    }

    fn ensure_directory_commands(&self, path: &str) -> Vec<String> {
        let path = ps_quote(&PathStyle::Windows.normalize(path));
        vec![format!("New-Item -ItemType Directory -Force -Path {path} | Out-Null")]
    }

    fn add_group_commands(&self, group: &GroupSpec) -> Vec<String> {
        let name = ps_quote(&group.name);
        vec![format!(
            "if (-not (Get-LocalGroup -Name {name} -ErrorAction SilentlyContinue)) {{ New-LocalGroup -Name {name} | Out-Null }}"
        )]
    }

    fn add_user_commands(&self, user: &UserSpec) -> Vec<String> {
        let name = ps_quote(&user.name);
        let mut commands = vec![format!(
            "if (-not (Get-LocalUser -Name {name} -ErrorAction SilentlyContinue)) {{ New-LocalUser -Name {name} -NoPassword | Out-Null }}"
        )];
        for group in &user.groups {
            commands.push(format!(
                "Add-LocalGroupMember -Group {} -Member {name} -ErrorAction SilentlyContinue",
                ps_quote(group)
            ));
        }
        commands
    }

    fn file_commands(&self, file: &FileTransfer) -> Vec<String> {
        let path = ps_quote(&PathStyle::Windows.normalize(&file.remote_path));
        file.owner
            .iter()
            .map(|owner| format!("icacls {path} /setowner {}", ps_quote(owner)))
            .collect()
    }

    fn install_package_commands(&self, packages: &[String]) -> Vec<String> {
        if packages.is_empty() {
            return Vec::new();
        }
        let list = packages
            .iter()
            .map(|p| ps_quote(p))
            .collect::<Vec<_>>()
            .join(" ");
        vec![format!("choco install -y --no-progress {list}")]
    }
}
