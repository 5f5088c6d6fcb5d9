//! Display state machine: visibility, expansion, responsive mini view
//!
//! Visibility and expansion only change on user gestures. The responsive
//! `minimized` sub-state is derived from the viewport width on every
//! resize; with auto-collapse enabled a narrow viewport collapses the
//! panel, but nothing here ever expands it on its own.

use tracing::debug;

/// Default narrow-viewport breakpoint in pixels (inclusive)
pub const DEFAULT_MOBILE_BREAKPOINT: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Only the re-open affordance is rendered
    Hidden,
    /// Ticker view
    Collapsed,
    /// Panel view
    Expanded,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Hidden => "hidden",
            DisplayMode::Collapsed => "visible_collapsed",
            DisplayMode::Expanded => "visible_expanded",
        }
    }
}

/// Panel tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelTab {
    #[default]
    Activity,
    Stats,
}

impl PanelTab {
    pub fn next(self) -> Self {
        match self {
            PanelTab::Activity => PanelTab::Stats,
            PanelTab::Stats => PanelTab::Activity,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PanelTab::Activity => "Activity",
            PanelTab::Stats => "Stats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Desktop => "desktop",
        }
    }
}

/// Responsive behavior toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsivePolicy {
    /// Collapse the panel when the viewport becomes narrow
    pub auto_collapse: bool,
    /// Allow the minimized sub-state on narrow viewports
    pub mini_view: bool,
    pub mobile_breakpoint: u32,
}

impl Default for ResponsivePolicy {
    fn default() -> Self {
        Self { auto_collapse: true, mini_view: true, mobile_breakpoint: DEFAULT_MOBILE_BREAKPOINT }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayState {
    visible: bool,
    expanded: bool,
    minimized: bool,
    tab: PanelTab,
    viewport_width: Option<u32>,
    policy: ResponsivePolicy,
}

impl DisplayState {
    pub fn new(initially_visible: bool, initially_expanded: bool, policy: ResponsivePolicy) -> Self {
        Self {
            visible: initially_visible,
            expanded: initially_expanded,
            minimized: false,
            tab: PanelTab::default(),
            viewport_width: None,
            policy,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        match (self.visible, self.expanded) {
            (false, _) => DisplayMode::Hidden,
            (true, false) => DisplayMode::Collapsed,
            (true, true) => DisplayMode::Expanded,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn tab(&self) -> PanelTab {
        self.tab
    }

    /// Whether the ticker may animate in this state
    pub fn allows_ticker(&self) -> bool {
        self.mode() == DisplayMode::Collapsed
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn toggle_visible(&mut self) {
        self.visible = !self.visible;
    }

    pub fn expand(&mut self) {
        self.expanded = true;
    }

    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    pub fn toggle_expanded(&mut self) {
        self.expanded = !self.expanded;
    }

    pub fn select_tab(&mut self, tab: PanelTab) {
        self.tab = tab;
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
    }

    fn is_narrow(&self, width: u32) -> bool {
        width <= self.policy.mobile_breakpoint
    }

    /// Re-derive the responsive sub-state from a new viewport width
    pub fn on_resize(&mut self, viewport_width: u32) {
        self.viewport_width = Some(viewport_width);
        let narrow = self.is_narrow(viewport_width);

        self.minimized = narrow && self.policy.mini_view;
        if narrow && self.policy.auto_collapse && self.expanded {
            self.expanded = false;
            debug!(viewport_width = %viewport_width, "display_auto_collapsed");
        }
    }

    /// Device class from the last reported viewport (desktop until known)
    pub fn device_class(&self) -> DeviceClass {
        match self.viewport_width {
            Some(width) if self.is_narrow(width) => DeviceClass::Mobile,
            _ => DeviceClass::Desktop,
        }
    }
}
