//! `pf_bb_config` invocation.
//!
//! Builds the tool's command line for applying a configuration and the
//! process-kill used for teardown. Commands run through a [`CommandRunner`]
//! so tests can observe argv and script exit codes.
//!
//! All calls block until the child exits and impose no timeout of their own.

use crate::devices::is_supported_device_name;
use crate::error::PfBbConfigError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Default location of the `pf_bb_config` binary.
pub const PF_BB_CONFIG_PATH: &str = "/sriov_workdir/pf_bb_config";

/// Host root filesystem as mounted into the daemon container.
pub const HOST_ROOT: &str = "/host/";

/// Directory where `pf_bb_config` leaves its per-device socket.
pub const SOCKET_DIR: &str = "/tmp";

/// Exit code `pkill` returns when no process matched.
const PKILL_NO_MATCH: i32 = 1;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external program to completion.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Runs commands with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Path of the socket `pf_bb_config` can leave behind for `pci_address`.
pub fn stale_socket_path(socket_dir: &Path, pci_address: &str) -> PathBuf {
    socket_dir.join(format!("pf_bb_config.{}.sock", pci_address))
}

/// Issues `pf_bb_config` apply and teardown commands.
#[derive(Debug, Clone)]
pub struct ToolInvoker<R = SystemCommandRunner> {
    tool_path: PathBuf,
    host_root: PathBuf,
    socket_dir: PathBuf,
    runner: R,
}

impl ToolInvoker<SystemCommandRunner> {
    /// Invoker for the tool at `tool_path` using the real process runner.
    pub fn new(tool_path: impl Into<PathBuf>) -> Self {
        Self::with_runner(tool_path, SystemCommandRunner)
    }
}

impl<R: CommandRunner> ToolInvoker<R> {
    pub fn with_runner(tool_path: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            tool_path: tool_path.into(),
            host_root: PathBuf::from(HOST_ROOT),
            socket_dir: PathBuf::from(SOCKET_DIR),
            runner,
        }
    }

    /// Overrides the directory searched for the stale socket.
    pub fn with_socket_dir(mut self, socket_dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = socket_dir.into();
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Builds the argv (without the program) for configuring one device.
    ///
    /// `<family> -c <cfg> [-v <token>] -p <pci>`
    pub fn apply_args(
        &self,
        device_name: &str,
        cfg_path: &Path,
        pci_address: &str,
        token: Option<&str>,
    ) -> Result<Vec<String>, PfBbConfigError> {
        if !is_supported_device_name(device_name) {
            return Err(PfBbConfigError::Config(format!(
                "incorrect deviceName for pf config: {}",
                device_name
            )));
        }

        let mut args = vec![
            device_name.to_string(),
            "-c".to_string(),
            cfg_path.display().to_string(),
        ];
        if let Some(token) = token {
            args.push("-v".to_string());
            args.push(token.to_string());
        }
        args.push("-p".to_string());
        args.push(pci_address.to_string());
        Ok(args)
    }

    /// Runs `pf_bb_config` against one device.
    pub fn apply(
        &self,
        device_name: &str,
        cfg_path: &Path,
        pci_address: &str,
        token: Option<&str>,
    ) -> Result<(), PfBbConfigError> {
        let args = self.apply_args(device_name, cfg_path, pci_address, token)?;
        let program = self.tool_path.display().to_string();

        info!("Running pf_bb_config for {} ({})", pci_address, device_name);
        let output = self.runner.run(&program, &args)?;
        debug!(stdout = %output.stdout, "pf_bb_config finished for {}", pci_address);

        if !output.success() {
            return Err(PfBbConfigError::Exec {
                command: program,
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Builds the argv (without the program) of the teardown kill.
    pub fn teardown_args(&self, pci_address: &str) -> Vec<String> {
        vec![
            self.host_root.display().to_string(),
            "pkill".to_string(),
            "-9".to_string(),
            "-f".to_string(),
            format!("pf_bb_config.*{}", pci_address),
        ]
    }

    /// Kills any `pf_bb_config` process serving `pci_address` on the host and
    /// removes the socket it may leave behind.
    ///
    /// `pkill` exiting with 1 (nothing matched) counts as success. Failing to
    /// remove the socket is logged and never changes the result.
    pub fn teardown(&self, pci_address: &str) -> Result<(), PfBbConfigError> {
        let args = self.teardown_args(pci_address);
        let kill_result = match self.runner.run("chroot", &args) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) if output.code == Some(PKILL_NO_MATCH) => {
                info!("ignoring errorCode(1) returned by pkill for {}", pci_address);
                Ok(())
            }
            Ok(output) => Err(PfBbConfigError::Exec {
                command: format!("chroot {}", args.join(" ")),
                code: output.code,
                stderr: output.stderr,
            }),
            Err(e) => Err(PfBbConfigError::Io(e)),
        };

        // pf_bb_config does not always clean up its socket when killed
        let socket = stale_socket_path(&self.socket_dir, pci_address);
        info!("Removing stale pf_bb_config socket {}", socket.display());
        if let Err(e) = std::fs::remove_file(&socket) {
            info!("cannot remove {}: {}", socket.display(), e);
        }

        kill_result
    }
}
