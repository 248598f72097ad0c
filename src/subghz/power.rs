//! # Power Control
//!
//! Battery charge suppression held for the duration of a transmission.
//!
//! On Linux the hold is implemented through the power supply class
//! `charge_behaviour` attribute, e.g.
//! `/sys/class/power_supply/BAT0/charge_behaviour`. Reading it yields the
//! available behaviours with the active one in brackets:
//!
//! ```text
//! [auto] inhibit-charge force-discharge
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::error::{Result, ShockError};

/// Behaviour written while the hold is active
const INHIBIT_CHARGE: &str = "inhibit-charge";

/// Behaviour restored when the previous one cannot be determined
const DEFAULT_BEHAVIOUR: &str = "auto";

/// Charge suppression operations
#[cfg_attr(test, mockall::automock)]
pub trait PowerControl: Send {
    /// Stop battery charging
    fn suppress_charge_enter(&mut self) -> Result<()>;

    /// Restore battery charging
    fn suppress_charge_exit(&mut self) -> Result<()>;
}

/// Power control for hosts without a controllable charger
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerControl;

impl PowerControl for NoPowerControl {
    fn suppress_charge_enter(&mut self) -> Result<()> {
        Ok(())
    }

    fn suppress_charge_exit(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Charge suppression through a sysfs `charge_behaviour` file
#[derive(Debug)]
pub struct SysfsChargeControl {
    path: PathBuf,
    previous: Option<String>,
}

impl SysfsChargeControl {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            previous: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, behaviour: &str) -> Result<()> {
        fs::write(&self.path, behaviour).map_err(|e| {
            ShockError::Power(format!(
                "Failed to write {} to {}: {}",
                behaviour,
                self.path.display(),
                e
            ))
        })
    }
}

impl PowerControl for SysfsChargeControl {
    fn suppress_charge_enter(&mut self) -> Result<()> {
        let current = fs::read_to_string(&self.path).map_err(|e| {
            ShockError::Power(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        self.previous = active_behaviour(&current).map(str::to_string);
        self.write(INHIBIT_CHARGE)?;
        debug!("Charging inhibited via {}", self.path.display());
        Ok(())
    }

    fn suppress_charge_exit(&mut self) -> Result<()> {
        let behaviour = self.previous.take();
        self.write(behaviour.as_deref().unwrap_or(DEFAULT_BEHAVIOUR))?;
        debug!("Charging restored via {}", self.path.display());
        Ok(())
    }
}

/// Active behaviour from a `charge_behaviour` read
///
/// Accepts both the bracketed list form and a bare single value.
fn active_behaviour(contents: &str) -> Option<&str> {
    let contents = contents.trim();

    if let Some(start) = contents.find('[') {
        let rest = &contents[start + 1..];
        return rest.find(']').map(|end| &rest[..end]);
    }

    (!contents.is_empty() && !contents.contains(' ')).then_some(contents)
}

/// Scoped charge suppression hold
///
/// Entering suppresses charging; dropping the guard restores it. A failed
/// enter is logged and leaves the guard inactive, so nothing is released.
pub struct ChargeSuppression<'a> {
    power: &'a mut dyn PowerControl,
    active: bool,
}

impl<'a> ChargeSuppression<'a> {
    /// Acquire the hold
    pub fn enter(power: &'a mut dyn PowerControl) -> Self {
        let active = match power.suppress_charge_enter() {
            Ok(()) => true,
            Err(e) => {
                warn!("Transmitting without charge suppression: {}", e);
                false
            }
        };

        Self { power, active }
    }

    /// Whether charging is currently suppressed by this guard
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for ChargeSuppression<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Err(e) = self.power.suppress_charge_exit() {
            error!("Failed to restore charging: {}", e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_guard_enters_and_exits_once() {
        let mut power = MockPowerControl::new();
        power.expect_suppress_charge_enter().times(1).returning(|| Ok(()));
        power.expect_suppress_charge_exit().times(1).returning(|| Ok(()));

        {
            let guard = ChargeSuppression::enter(&mut power);
            assert!(guard.is_active());
        }
    }

    #[test]
    fn test_failed_enter_skips_exit() {
        let mut power = MockPowerControl::new();
        power
            .expect_suppress_charge_enter()
            .times(1)
            .returning(|| Err(ShockError::Power("no charger".to_string())));
        power.expect_suppress_charge_exit().times(0);

        let guard = ChargeSuppression::enter(&mut power);
        assert!(!guard.is_active());
    }

    #[test]
    fn test_failed_exit_does_not_panic() {
        let mut power = MockPowerControl::new();
        power.expect_suppress_charge_enter().returning(|| Ok(()));
        power
            .expect_suppress_charge_exit()
            .times(1)
            .returning(|| Err(ShockError::Power("busy".to_string())));

        drop(ChargeSuppression::enter(&mut power));
    }

    #[test]
    fn test_active_behaviour_parsing() {
        assert_eq!(active_behaviour("[auto] inhibit-charge force-discharge\n"), Some("auto"));
        assert_eq!(active_behaviour("auto [inhibit-charge] force-discharge"), Some("inhibit-charge"));
        assert_eq!(active_behaviour("auto\n"), Some("auto"));
        assert_eq!(active_behaviour("auto inhibit-charge"), None);
        assert_eq!(active_behaviour(""), None);
    }

    #[test]
    fn test_sysfs_inhibits_and_restores() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[auto] inhibit-charge force-discharge\n").unwrap();
        file.flush().unwrap();

        let mut control = SysfsChargeControl::new(file.path());
        control.suppress_charge_enter().unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "inhibit-charge");

        control.suppress_charge_exit().unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "auto");
    }

    #[test]
    fn test_sysfs_missing_file() {
        let mut control = SysfsChargeControl::new("/nonexistent/charge_behaviour");
        match control.suppress_charge_enter() {
            Err(ShockError::Power(msg)) => assert!(msg.contains("/nonexistent/charge_behaviour")),
            other => panic!("Expected Power error, got: {:?}", other),
        }
    }

    #[test]
    fn test_no_power_control() {
        let mut power = NoPowerControl;
        assert!(power.suppress_charge_enter().is_ok());
        assert!(power.suppress_charge_exit().is_ok());
    }
}
