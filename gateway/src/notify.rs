//! Readiness notification for supervising processes.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{FromRawFd, RawFd};

use tracing::debug;

/// Write a single newline to `fd` and close it.
///
/// The descriptor is inherited from whoever started the process; it is
/// consumed by this call and must not be used afterwards.
pub fn signal_ready(fd: RawFd) -> io::Result<()> {
    if fd < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid notify descriptor {fd}"),
        ));
    }

    // SAFETY: the caller hands over ownership of an open descriptor; the File
    // closes it on drop and nothing else in the process refers to it.
    let mut file = unsafe { File::from_raw_fd(fd) };
    file.write_all(b"\n")?;
    drop(file);

    debug!(fd = fd, "readiness_notified");
    Ok(())
}
