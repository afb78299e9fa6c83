use crate::constants::DEVICE_PREFIX;
use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source disk or volume captured for migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    /// Device path on the source host, e.g. `/dev/sda`
    pub source_device: String,
    /// Local raw capture file
    pub raw_file_path: PathBuf,
    pub is_root: bool,
    pub size_gb: u64,
    /// Target device name; `None` for the root volume, which takes the provider's boot slot
    pub device_name: Option<String>,
    /// Provider id of the disk created for this volume
    pub provider_volume_id: Option<String>,
    /// Provider id of the disk image created for this volume (rehost only)
    pub disk_image_id: Option<String>,
    /// Id of the provider asynchronous task currently associated with this volume
    pub task_id: Option<String>,
}

impl Volume {
    pub fn new(
        id: impl Into<String>,
        source_device: impl Into<String>,
        raw_file_path: impl Into<PathBuf>,
        is_root: bool,
        size_gb: u64,
    ) -> Self {
        Self {
            id: id.into(),
            source_device: source_device.into(),
            raw_file_path: raw_file_path.into(),
            is_root,
            size_gb,
            device_name: None,
            provider_volume_id: None,
            disk_image_id: None,
            task_id: None,
        }
    }
}

/// Check that exactly one volume is flagged as root
pub fn validate_single_root(volumes: &[Volume]) -> Result<()> {
    let roots = volumes.iter().filter(|v| v.is_root).count();
    if roots != 1 {
        return Err(MigrationError::precondition(format!(
            "expected exactly one root volume, found {roots} among {} volumes",
            volumes.len()
        )));
    }
    Ok(())
}

/// Device name for the n-th non-root volume (0-based): `/dev/sdb`, `/dev/sdc`, ...
///
/// Past `z` the suffix continues the kernel's scheme (`sdaa`, `sdab`, ...).
pub fn device_name_for(non_root_index: usize) -> String {
    // `a` is the implicit boot slot
    let mut n = non_root_index + 1;
    let mut suffix = Vec::new();
    loop {
        suffix.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    suffix.reverse();
    format!("{DEVICE_PREFIX}{}", String::from_utf8_lossy(&suffix))
}

/// Assign target device names to every non-root volume in list order
///
/// Deterministic for a given ordering; the root volume keeps `None`.
pub fn assign_device_names(volumes: &mut [Volume]) -> Result<()> {
    validate_single_root(volumes)?;
    let mut next = 0;
    for volume in volumes.iter_mut() {
        if volume.is_root {
            volume.device_name = None;
        } else {
            volume.device_name = Some(device_name_for(next));
            next += 1;
        }
    }
    Ok(())
}
