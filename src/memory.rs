//! Decode-buffer sizing guard.
use crate::error::Error;

// fail once the projected buffer would claim over half of what is left
const SAFETY_DIVISOR: u64 = 2;

/// Compares a projected allocation against available system memory,
/// failing fast instead of risking the allocator aborting mid-decode.
pub(crate) fn check_allocation(required: u64) -> Result<(), Error> {
    if let Some(available) = available_memory() {
        if required > available / SAFETY_DIVISOR {
            return Err(Error::ResourceExceeded {
                required,
                available,
            });
        }
    }
    Ok(())
}

// Linux MemAvailable; platforms without /proc skip the guard
fn available_memory() -> Option<u64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    for line in meminfo.lines() {
        if let Some(rem) = line.strip_prefix("MemAvailable:") {
            let kb = rem.trim().trim_end_matches("kB").trim().parse::<u64>().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn small_allocations_pass() {
        assert!(check_allocation(1024).is_ok());
    }

    #[test]
    fn absurd_allocations_fail() {
        // a petabyte cannot fit anywhere we run tests
        let r = check_allocation(1 << 50);
        if available_memory().is_some() {
            assert!(matches!(r, Err(Error::ResourceExceeded { .. })));
        }
    }
}
