//! # Remote Command Execution
//!
//! Capability interfaces for talking to a host over SSH/WinRM. The transport
//! is external: an adapter implements [`RemoteConnector`] and [`RemoteShell`].
//! What to run is decided by a per-OS [`CommandStrategy`] picked once by
//! [`strategy_for`], never by subclassing.

pub mod strategies;

pub use strategies::{strategy_for, LinuxCommandStrategy, WindowsCommandStrategy};

use crate::error::Result;
use crate::models::{FileTransfer, GroupSpec, MountSpec, UserSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Operating system family of a source or target host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Linux,
    Windows,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Path conventions of a remote host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Posix,
    Windows,
}

impl PathStyle {
    pub fn separator(&self) -> char {
        match self {
            Self::Posix => '/',
            Self::Windows => '\\',
        }
    }

    /// Rewrite separators to this style
    pub fn normalize(&self, path: &str) -> String {
        match self {
            Self::Posix => path.replace('\\', "/"),
            Self::Windows => path.replace('/', "\\"),
        }
    }

    /// Join two path fragments with exactly one separator
    pub fn join(&self, base: &str, child: &str) -> String {
        let sep = self.separator();
        let base = self.normalize(base);
        let child = self.normalize(child);
        format!(
            "{}{sep}{}",
            base.trim_end_matches(sep),
            child.trim_start_matches(sep)
        )
    }

    /// Parent directory of a path, if it has one
    pub fn parent<'a>(&self, path: &'a str) -> Option<&'a str> {
        let sep = self.separator();
        path.trim_end_matches(sep)
            .rfind(sep)
            .map(|idx| if idx == 0 { &path[..1] } else { &path[..idx] })
    }
}

/// Output of a batch of remote commands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// An open session on a remote host
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Cheap round trip proving the session works
    async fn check_connection(&self) -> Result<()>;

    /// Run commands in order, stopping at the first failure
    async fn run_commands(&self, commands: &[String]) -> Result<CommandOutput>;

    /// Whether the session user may escalate without a password
    async fn is_sudoer(&self) -> Result<bool>;

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<()>;
}

/// Opens sessions to hosts; the SSH/WinRM transport lives behind this
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        username: &str,
        key_file: &Path,
    ) -> Result<Box<dyn RemoteShell>>;
}

/// Per-OS command generation for replatform configuration
pub trait CommandStrategy: Send + Sync {
    fn os_family(&self) -> OsFamily;

    fn path_style(&self) -> PathStyle;

    /// Wrap a command so it runs with administrative rights
    fn privileged(&self, command: &str, is_sudoer: bool) -> String;

    fn mount_commands(&self, device: &str, mount: &MountSpec) -> Vec<String>;

    fn ensure_directory_commands(&self, path: &str) -> Vec<String>;

    fn add_group_commands(&self, group: &GroupSpec) -> Vec<String>;

    fn add_user_commands(&self, user: &UserSpec) -> Vec<String>;

    /// Commands run after a file has been uploaded (ownership, mode)
    fn file_commands(&self, file: &FileTransfer) -> Vec<String>;

    fn install_package_commands(&self, packages: &[String]) -> Vec<String>;
}
