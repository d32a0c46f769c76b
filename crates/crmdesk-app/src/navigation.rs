// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ViewKind;

/// Work performed when a view becomes active, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryHook {
    ReloadDashboard,
    LoadTagCategories,
    RebuildFilterOptions,
    RenderTable,
}

impl ViewKind {
    pub const fn entry_hooks(self) -> &'static [EntryHook] {
        match self {
            Self::Dashboard => &[EntryHook::ReloadDashboard],
            Self::Tags => &[EntryHook::LoadTagCategories],
            Self::Departments
            | Self::Applications
            | Self::Integrations
            | Self::Contacts
            | Self::Activities
            | Self::Incidents => &[EntryHook::RebuildFilterOptions, EntryHook::RenderTable],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EntryHook;
    use crate::ViewKind;

    #[test]
    fn every_view_has_entry_hooks() {
        for view in ViewKind::ALL {
            assert!(!view.entry_hooks().is_empty(), "{view:?} has no hooks");
        }
    }

    #[test]
    fn entity_views_rebuild_filters_before_rendering() {
        assert_eq!(
            ViewKind::Contacts.entry_hooks(),
            &[EntryHook::RebuildFilterOptions, EntryHook::RenderTable]
        );
        assert_eq!(
            ViewKind::Dashboard.entry_hooks(),
            &[EntryHook::ReloadDashboard]
        );
    }
}
