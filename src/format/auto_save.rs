//! Auto-save bookkeeping.
//!
//! Annotations are flushed when the user leaves an image. This manager only
//! tracks whether there are unsaved changes and whether leaving should save
//! them silently or ask first.

/// What to do with unsaved changes before leaving an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingChanges {
    /// Nothing to save.
    Clean,
    /// Save without asking.
    Save,
    /// Ask whether the changes may be discarded.
    Confirm,
}

/// Tracks unsaved changes of the current image.
#[derive(Debug, Default)]
pub struct AutoSaveManager {
    /// Whether auto-save is enabled.
    enabled: bool,

    /// Whether there are unsaved changes.
    dirty: bool,

    /// Number of successful saves since creation.
    saves: u64,
}

impl AutoSaveManager {
    /// Create a manager with auto-save on or off.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            dirty: false,
            saves: 0,
        }
    }

    /// Mark that a change occurred that needs saving.
    pub fn mark_dirty(&mut self) {
        if !self.dirty {
            log::trace!("Auto-save: marked dirty");
        }
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Decide what leaving the current image requires.
    pub fn pending_changes(&self) -> PendingChanges {
        match (self.dirty, self.enabled) {
            (false, _) => PendingChanges::Clean,
            (true, true) => PendingChanges::Save,
            (true, false) => PendingChanges::Confirm,
        }
    }

    /// Record a successful save.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.saves += 1;
        log::debug!("Auto-save: saved ({} total)", self.saves);
    }

    /// Drop unsaved changes without saving (new image, discard confirmed).
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::info!("Auto-save {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn save_count(&self) -> u64 {
        self.saves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let manager = AutoSaveManager::new(true);
        assert!(!manager.is_dirty());
        assert_eq!(manager.pending_changes(), PendingChanges::Clean);
    }

    #[test]
    fn test_dirty_with_auto_save_saves() {
        let mut manager = AutoSaveManager::new(true);
        manager.mark_dirty();
        assert_eq!(manager.pending_changes(), PendingChanges::Save);
        manager.mark_saved();
        assert!(!manager.is_dirty());
        assert_eq!(manager.save_count(), 1);
    }

    #[test]
    fn test_dirty_without_auto_save_confirms() {
        let mut manager = AutoSaveManager::new(false);
        manager.mark_dirty();
        assert_eq!(manager.pending_changes(), PendingChanges::Confirm);
        manager.mark_clean();
        assert_eq!(manager.pending_changes(), PendingChanges::Clean);
        assert_eq!(manager.save_count(), 0);
    }

    #[test]
    fn test_toggle_enabled() {
        let mut manager = AutoSaveManager::new(false);
        manager.mark_dirty();
        manager.set_enabled(true);
        assert!(manager.is_enabled());
        assert_eq!(manager.pending_changes(), PendingChanges::Save);
    }
}
