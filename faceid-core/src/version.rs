//! Library version and firmware compatibility

use tracing::debug;

pub const VER_MAJOR: u32 = 0;
pub const VER_MINOR: u32 = 18;
pub const VER_PATCH: u32 = 1;

/// Packed library version (`major * 10000 + minor * 100 + patch`)
pub const VERSION_NUMBER: u32 = VER_MAJOR * 10000 + VER_MINOR * 100 + VER_PATCH;

/// Oldest firmware this host library can talk to
pub const FW_VER_MAJOR: u32 = 2;
pub const FW_VER_MINOR: u32 = 8;

const VERSION: &str = "0.18.1";
const COMPATIBLE_FW_VERSION: &str = "2.8";

/// Library version as a semver string
pub fn version() -> &'static str {
    VERSION
}

/// Compatible firmware version (major and minor only)
pub fn compatible_firmware_version() -> &'static str {
    COMPATIBLE_FW_VERSION
}

/// Check whether a firmware version string is compatible with this host.
///
/// Only the leading `major.minor` components are read, so full firmware
/// strings such as `2.8.0.37` are accepted. The major version must match
/// exactly and the minor version must be at least [`FW_VER_MINOR`].
///
/// # Examples
///
/// ```
/// use faceid_core::version;
///
/// assert!(version::is_fw_compatible_with_host("2.8.0.37"));
/// assert!(!version::is_fw_compatible_with_host("1.9.4"));
/// ```
pub fn is_fw_compatible_with_host(fw_version: &str) -> bool {
    let Some((major, minor)) = parse_major_minor(fw_version) else {
        debug!(fw_version, "Unparsable firmware version");
        return false;
    };

    let compatible = major == FW_VER_MAJOR && minor >= FW_VER_MINOR;
    debug!(fw_version, major, minor, compatible, "Checked firmware compatibility");
    compatible
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}
