/// Feature predicates the host keeps outside this crate.
pub trait ModeFlags: Send + Sync {
    /// Whether the camera feed should be replaced by screen content.
    fn screen_mode_enabled(&self) -> bool;

    /// Whether replacement is switched off entirely.
    fn capture_disabled(&self) -> bool;
}

/// Fixed flag values, used when the host does not supply its own source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticModeFlags {
    pub screen_mode: bool,
    pub disabled: bool,
}

impl Default for StaticModeFlags {
    fn default() -> Self {
        Self {
            screen_mode: true,
            disabled: false,
        }
    }
}

impl ModeFlags for StaticModeFlags {
    fn screen_mode_enabled(&self) -> bool {
        self.screen_mode
    }

    fn capture_disabled(&self) -> bool {
        self.disabled
    }
}
