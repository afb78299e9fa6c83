use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Trailing bytes of archiver stderr kept for error reports
const STDERR_TAIL_BYTES: usize = 2048;

/// Starts an archiver child process for one volume
///
/// The child is owned by the volume's handle so compensation can kill it.
pub trait Compressor: Send + Sync {
    /// Archive `member` (a file inside `working_dir`) into `archive`
    fn spawn(&self, working_dir: &Path, member: &str, archive: &Path) -> std::io::Result<Child>;
}

/// Sparse-aware gzip tarball, the format providers accept for disk imports
#[derive(Debug, Clone)]
pub struct TarCompressor {
    program: String,
}

impl TarCompressor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for TarCompressor {
    fn default() -> Self {
        Self::new("tar")
    }
}

impl Compressor for TarCompressor {
    fn spawn(&self, working_dir: &Path, member: &str, archive: &Path) -> std::io::Result<Child> {
        Command::new(&self.program)
            .arg("-Sczf")
            .arg(archive)
            .arg("-C")
            .arg(working_dir)
            .arg(member)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
    }
}

/// Directory beside `raw_file` where it is staged under the archive member name
///
/// Sharing the raw file's parent keeps the staging move a same-filesystem rename.
pub fn staging_directory(raw_file: &Path, process_id: &str, volume_id: &str) -> PathBuf {
    raw_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{process_id}-{volume_id}.staging"))
}

/// Read the child's stderr to the end in the background
///
/// Keeps a chatty archiver from blocking on a full pipe. The task resolves to
/// the trimmed tail of the output once the child closes the stream.
pub fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut output = Vec::new();
        if let Err(err) = stderr.read_to_end(&mut output).await {
            tracing::debug!(error = %err, "Archiver stderr closed early");
        }
        let tail = output.len().saturating_sub(STDERR_TAIL_BYTES);
        String::from_utf8_lossy(&output[tail..]).trim().to_string()
    }))
}
