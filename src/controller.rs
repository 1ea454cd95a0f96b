use crate::proto::FailureInfo;

/// Per-call status carrier. One lives on each side of every RPC: the
/// server stages failures into it while serving a call, the client reads
/// the outcome from it after `call` completes.
///
/// The on-wire projection is [`FailureInfo`]; the two deliberately do not
/// share a storage layout.
#[derive(Debug, Default, Clone)]
pub struct Controller {
    failed: bool,
    error_text: String,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both fields back to the not-failed state.
    pub fn reset(&mut self) {
        self.failed = false;
        self.error_text.clear();
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    /// Mark the call failed. Staging a second failure appends to the
    /// existing text instead of overwriting it.
    pub fn set_failed(&mut self, reason: &str) {
        if self.failed {
            self.error_text.push_str("; ");
        } else {
            self.failed = true;
        }
        self.error_text.push_str(reason);
    }

    // Cancellation is not part of this protocol. The surface exists for
    // interface compatibility and never reports a cancel.

    pub fn start_cancel(&mut self) {}

    pub fn is_canceled(&self) -> bool {
        false
    }

    pub fn notify_on_cancel<F: FnOnce() + Send + 'static>(&mut self, _callback: F) {}
}

impl From<&Controller> for FailureInfo {
    fn from(ctl: &Controller) -> Self {
        FailureInfo {
            failed: Some(ctl.failed),
            error_text: if ctl.failed { Some(ctl.error_text.clone()) } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_failed_accumulates() {
        let mut ctl = Controller::new();
        assert!(!ctl.failed());
        assert_eq!(ctl.error_text(), "");

        ctl.set_failed("first");
        assert!(ctl.failed());
        assert_eq!(ctl.error_text(), "first");

        ctl.set_failed("second");
        assert_eq!(ctl.error_text(), "first; second");

        ctl.reset();
        assert!(!ctl.failed());
        assert_eq!(ctl.error_text(), "");
    }

    #[test]
    fn test_cancel_surface_is_inert() {
        let mut ctl = Controller::new();
        ctl.start_cancel();
        ctl.notify_on_cancel(|| panic!("never invoked"));
        assert!(!ctl.is_canceled());
        assert!(!ctl.failed());
    }

    #[test]
    fn test_wire_projection() {
        let mut ctl = Controller::new();
        let info = FailureInfo::from(&ctl);
        assert_eq!(info.failed, Some(false));
        assert_eq!(info.error_text, None);

        ctl.set_failed("Method not found on server");
        let info = FailureInfo::from(&ctl);
        assert!(info.is_failed());
        assert_eq!(info.error_text(), "Method not found on server");
    }
}
