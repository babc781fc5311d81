//! Host inspection.

use sysinfo::System;

/// Total physical memory of the host in bytes.
///
/// Returns 0 when the platform cannot report it; callers must treat 0 as
/// "unknown", never as a measurement.
pub fn system_total_memory() -> u64 {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return 0;
    }
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}
