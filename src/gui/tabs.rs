#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    QrCode,
    Overlay,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::QrCode, Tab::Overlay];

    pub fn label(self) -> &'static str {
        match self {
            Tab::QrCode => "QR Code",
            Tab::Overlay => "Overlay",
        }
    }
}

/// Per-tab state. The three flags always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabAttributes {
    pub active: bool,
    /// Accessibility "selected" state of the tab button.
    pub selected: bool,
    /// Whether the tab's panel is hidden.
    pub hidden: bool,
}

/// Exactly one tab is active at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabController {
    active: Tab,
}

impl TabController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Tab {
        self.active
    }

    /// Returns true when the active tab changed.
    pub fn select(&mut self, tab: Tab) -> bool {
        let changed = self.active != tab;
        if changed {
            tracing::debug!(tab = tab.label(), "tab selected");
        }
        self.active = tab;
        changed
    }

    pub fn is_active(&self, tab: Tab) -> bool {
        self.active == tab
    }

    pub fn attributes(&self, tab: Tab) -> TabAttributes {
        let active = self.is_active(tab);
        TabAttributes {
            active,
            selected: active,
            hidden: !active,
        }
    }
}
