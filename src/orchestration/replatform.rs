//! # Replatform Configuration
//!
//! Brings a freshly provisioned instance in line with the source host: data
//! volume mounts, groups, users, files and packages. Commands come from the
//! per-OS [`CommandStrategy`]; the session comes from a [`RemoteConnector`].

use crate::config::ReplatformConfig;
use crate::constants::components;
use crate::error::{MigrationError, Result};
use crate::logging::log_error;
use crate::models::{MigrationProcess, ReplatformPlan};
use crate::remote::{strategy_for, CommandStrategy, RemoteConnector, RemoteShell};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Applies a [`ReplatformPlan`] to the migrated instance over a remote session
pub struct ReplatformConfigurator {
    connector: Arc<dyn RemoteConnector>,
    config: ReplatformConfig,
}

impl std::fmt::Debug for ReplatformConfigurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplatformConfigurator")
            .field("config", &self.config)
            .finish()
    }
}

impl ReplatformConfigurator {
    pub fn new(connector: Arc<dyn RemoteConnector>, config: ReplatformConfig) -> Self {
        Self { connector, config }
    }

    /// Connect to the instance and apply every step of the plan in order
    #[instrument(skip_all, fields(process_id = %process.process_id))]
    pub async fn configure(&self, process: &MigrationProcess) -> Result<()> {
        let plan = process.replatform.as_ref().ok_or_else(|| {
            MigrationError::precondition(format!(
                "process {} has no replatform plan",
                process.process_id
            ))
        })?;
        let host = process
            .outputs
            .public_ip
            .as_deref()
            .or(process.outputs.private_ip.as_deref())
            .ok_or_else(|| MigrationError::precondition("instance has no reachable address"))?;

        let shell = self.connect_when_reachable(host, process).await?;
        let strategy = strategy_for(process.source.os_family);
        let is_sudoer = shell.is_sudoer().await?;
        info!(host = %host, os = %strategy.os_family(), is_sudoer, "🔧 Configuring instance");

        let session = Session {
            shell: shell.as_ref(),
            strategy: strategy.as_ref(),
            is_sudoer,
        };
        self.apply_plan(&session, process, plan).await
    }

    /// Bounded connect-and-check loop; the instance may still be booting its agent
    async fn connect_when_reachable(
        &self,
        host: &str,
        process: &MigrationProcess,
    ) -> Result<Box<dyn RemoteShell>> {
        let attempts = self.config.connectivity_attempts.max(1);
        let interval = Duration::from_millis(self.config.connectivity_interval_ms);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let connected = self
                .connector
                .connect(
                    host,
                    process.source.port,
                    &process.source.username,
                    &process.credential.key_file_path,
                )
                .await;

            match connected {
                Ok(shell) => match shell.check_connection().await {
                    Ok(()) => {
                        debug!(host = %host, attempt, "Remote session established");
                        return Ok(shell);
                    }
                    Err(err) => last_error = err.to_string(),
                },
                Err(err) => last_error = err.to_string(),
            }

            warn!(host = %host, attempt, attempts, error = %last_error, "Instance not reachable yet");
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(MigrationError::connectivity(host, attempts, last_error))
    }

    async fn apply_plan(
        &self,
        session: &Session<'_>,
        process: &MigrationProcess,
        plan: &ReplatformPlan,
    ) -> Result<()> {
        for mount in &plan.mounts {
            let device = process
                .volume(&mount.volume_id)
                .and_then(|v| v.device_name.clone())
                .ok_or_else(|| {
                    MigrationError::precondition(format!(
                        "mount {} references volume {} without a device",
                        mount.mount_point, mount.volume_id
                    ))
                })?;
            session
                .run("mount", session.strategy.mount_commands(&device, mount))
                .await?;
        }

        for group in &plan.groups {
            session
                .run("add_group", session.strategy.add_group_commands(group))
                .await?;
        }

        for user in &plan.users {
            session
                .run("add_user", session.strategy.add_user_commands(user))
                .await?;
        }

        let style = session.strategy.path_style();
        for file in &plan.files {
            let remote = style.normalize(&file.remote_path);
            if let Some(parent) = style.parent(&remote) {
                session
                    .run("prepare_directory", session.strategy.ensure_directory_commands(parent))
                    .await?;
            }
            session.shell.upload_file(&file.local_path, &remote).await?;
            session
                .run("file_permissions", session.strategy.file_commands(file))
                .await?;
        }

        session
            .run(
                "install_packages",
                session.strategy.install_package_commands(&plan.packages),
            )
            .await?;

        info!("✅ Instance configured");
        Ok(())
    }
}

struct Session<'a> {
    shell: &'a dyn RemoteShell,
    strategy: &'a dyn CommandStrategy,
    is_sudoer: bool,
}

impl Session<'_> {
    async fn run(&self, step: &str, commands: Vec<String>) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let wrapped: Vec<String> = commands
            .iter()
            .map(|command| self.strategy.privileged(command, self.is_sudoer))
            .collect();

        let output = self.shell.run_commands(&wrapped).await?;
        if !output.success() {
            log_error(components::REPLATFORM, step, &output.stderr, None);
            return Err(MigrationError::remote_command(
                step,
                output.exit_code,
                output.stderr,
            ));
        }
        debug!(step = %step, commands = wrapped.len(), "Remote step applied");
        Ok(())
    }
}
