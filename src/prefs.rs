//! Persisted UI preferences: sidebar collapse and colour theme.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::PrefsError;

pub const SIDEBAR_KEY: &str = "sidebar-collapsed";
pub const THEME_KEY: &str = "theme";

/// At or below this viewport width the sidebar is an overlay instead of a rail.
pub const MOBILE_BREAKPOINT: f32 = 768.0;

/// Delay before the overlay closes after a navigation link is clicked.
const LINK_CLOSE_DELAY: Duration = Duration::from_millis(150);

/// String key/value storage that outlives the window.
pub trait PrefStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPrefStore {
    values: HashMap<String, String>,
}

impl PrefStore for MemoryPrefStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences kept as a flat TOML table on disk.
///
/// Every write re-reads the file first so several stores can share one path.
#[derive(Debug, Clone)]
pub struct FilePrefStore {
    path: PathBuf,
}

impl FilePrefStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FilePrefStore { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, PrefsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PrefStore for FilePrefStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read preferences");
                None
            }
        }
    }

    /// A file that does not parse is moved to `<name>.bak` before being replaced.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        let mut values = match self.load() {
            Ok(values) => values,
            Err(PrefsError::Toml(e)) => {
                let backup = self.path.with_extension("toml.bak");
                warn!(path = %self.path.display(), backup = %backup.display(), error = %e, "preferences file is corrupt, starting over");
                std::fs::rename(&self.path, &backup)?;
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(&values)?)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn visuals(self) -> eframe::egui::Visuals {
        match self {
            Theme::Light => eframe::egui::Visuals::light(),
            Theme::Dark => eframe::egui::Visuals::dark(),
        }
    }
}

/// Broadcast whenever a preference changes.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    SidebarToggled { collapsed: bool },
    ThemeChanged { theme: Theme },
}

fn broadcast(events: &Sender<UiEvent>, event: UiEvent) {
    if events.send(event).is_err() {
        debug!("no listener for ui event");
    }
}

fn persist(store: &mut dyn PrefStore, key: &str, value: &str) {
    if let Err(e) = store.set(key, value) {
        warn!(key, error = %e, "could not persist preference");
    }
}

pub struct SidebarController {
    store: Box<dyn PrefStore>,
    events: Sender<UiEvent>,
    collapsed: bool,
    mobile: bool,
    overlay_open: bool,
    active_link: Option<String>,
    close_at: Option<Instant>,
}

impl SidebarController {
    pub fn new(store: Box<dyn PrefStore>, events: Sender<UiEvent>, viewport_width: f32) -> Self {
        let mobile = viewport_width <= MOBILE_BREAKPOINT;
        let collapsed = !mobile && store.get(SIDEBAR_KEY).as_deref() == Some("true");
        SidebarController {
            store,
            events,
            collapsed,
            mobile,
            overlay_open: false,
            active_link: None,
            close_at: None,
        }
    }

    /// Collapse/expand the rail, or show/hide the overlay below the breakpoint.
    pub fn toggle(&mut self) {
        if self.mobile {
            self.toggle_overlay();
        } else {
            self.toggle_rail();
        }
    }

    fn toggle_rail(&mut self) {
        self.set_collapsed(!self.collapsed);
    }

    pub fn toggle_overlay(&mut self) {
        if self.overlay_open {
            self.close_overlay();
        } else {
            self.open_overlay();
        }
    }

    pub fn open_overlay(&mut self) {
        self.overlay_open = true;
    }

    pub fn close_overlay(&mut self) {
        self.overlay_open = false;
        self.close_at = None;
    }

    pub fn collapse(&mut self) {
        if !self.mobile && !self.collapsed {
            self.set_collapsed(true);
        }
    }

    pub fn expand(&mut self) {
        if !self.mobile && self.collapsed {
            self.set_collapsed(false);
        }
    }

    fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
        persist(self.store.as_mut(), SIDEBAR_KEY, if collapsed { "true" } else { "false" });
        broadcast(&self.events, UiEvent::SidebarToggled { collapsed });
    }

    /// React to a new viewport width. Crossing the breakpoint resets transient
    /// state; returning to desktop restores the saved collapse preference.
    pub fn handle_resize(&mut self, viewport_width: f32) {
        let was_mobile = self.mobile;
        self.mobile = viewport_width <= MOBILE_BREAKPOINT;
        if was_mobile == self.mobile {
            return;
        }
        self.close_overlay();
        self.collapsed = if self.mobile {
            false
        } else {
            self.store.get(SIDEBAR_KEY).as_deref() == Some("true")
        };
        debug!(mobile = self.mobile, collapsed = self.collapsed, "sidebar layout changed");
    }

    /// A click somewhere in the window; closes the overlay if it landed outside.
    pub fn pointer_clicked(&mut self, inside_sidebar: bool) {
        if self.mobile && self.overlay_open && !inside_sidebar {
            self.close_overlay();
        }
    }

    pub fn link_clicked(&mut self, link: &str, now: Instant) {
        self.active_link = Some(link.to_string());
        if self.mobile {
            self.close_at = Some(now + LINK_CLOSE_DELAY);
        }
    }

    /// Run deferred work such as the post-navigation overlay close.
    pub fn tick(&mut self, now: Instant) {
        if self.close_at.is_some_and(|at| now >= at) {
            self.close_overlay();
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    pub fn is_overlay_open(&self) -> bool {
        self.overlay_open
    }

    pub fn active_link(&self) -> Option<&str> {
        self.active_link.as_deref()
    }
}

pub struct ThemeController {
    store: Box<dyn PrefStore>,
    events: Sender<UiEvent>,
    theme: Theme,
}

impl ThemeController {
    pub fn new(store: Box<dyn PrefStore>, events: Sender<UiEvent>) -> Self {
        let theme = store
            .get(THEME_KEY)
            .and_then(|raw| Theme::parse(&raw))
            .unwrap_or(Theme::Light);
        ThemeController {
            store,
            events,
            theme,
        }
    }

    pub fn toggle(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        persist(self.store.as_mut(), THEME_KEY, self.theme.as_str());
        broadcast(&self.events, UiEvent::ThemeChanged { theme: self.theme });
        self.theme
    }

    pub fn current(&self) -> Theme {
        self.theme
    }

    pub fn apply(&self, ctx: &eframe::egui::Context) {
        ctx.set_visuals(self.theme.visuals());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::scratch_dir;
    use std::sync::mpsc;

    /// Memory store whose contents stay inspectable after being boxed.
    #[derive(Clone, Default)]
    struct SharedStore(std::rc::Rc<std::cell::RefCell<MemoryPrefStore>>);

    impl PrefStore for SharedStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
            self.0.borrow_mut().set(key, value)
        }
    }

    #[test]
    fn double_toggle_restores_state_and_storage() {
        let store = SharedStore::default();
        store.0.borrow_mut().set(SIDEBAR_KEY, "false").unwrap();
        let (tx, rx) = mpsc::channel();
        let mut sidebar = SidebarController::new(Box::new(store.clone()), tx, 1280.0);

        sidebar.toggle();
        assert!(sidebar.is_collapsed());
        assert_eq!(store.get(SIDEBAR_KEY).as_deref(), Some("true"));

        sidebar.toggle();
        assert!(!sidebar.is_collapsed());
        assert_eq!(store.get(SIDEBAR_KEY).as_deref(), Some("false"));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                UiEvent::SidebarToggled { collapsed: true },
                UiEvent::SidebarToggled { collapsed: false },
            ]
        );
    }

    #[test]
    fn mobile_toggle_drives_overlay_without_persisting() {
        let store = SharedStore::default();
        let (tx, rx) = mpsc::channel();
        let mut sidebar = SidebarController::new(Box::new(store.clone()), tx, 600.0);
        assert!(sidebar.is_mobile());

        sidebar.toggle();
        assert!(sidebar.is_overlay_open());
        sidebar.pointer_clicked(true);
        assert!(sidebar.is_overlay_open());
        sidebar.pointer_clicked(false);
        assert!(!sidebar.is_overlay_open());

        assert_eq!(store.get(SIDEBAR_KEY), None);
        assert!(rx.try_iter().next().is_none());
    }

    #[test]
    fn link_click_closes_overlay_after_delay() {
        let (tx, _rx) = mpsc::channel();
        let mut sidebar = SidebarController::new(Box::new(MemoryPrefStore::default()), tx, 500.0);
        let now = Instant::now();
        sidebar.open_overlay();
        sidebar.link_clicked("builder", now);
        assert_eq!(sidebar.active_link(), Some("builder"));

        sidebar.tick(now + Duration::from_millis(100));
        assert!(sidebar.is_overlay_open());
        sidebar.tick(now + LINK_CLOSE_DELAY);
        assert!(!sidebar.is_overlay_open());
    }

    #[test]
    fn crossing_breakpoint_restores_saved_collapse() {
        let store = SharedStore::default();
        let (tx, _rx) = mpsc::channel();
        let mut sidebar = SidebarController::new(Box::new(store.clone()), tx, 1280.0);
        sidebar.collapse();
        assert!(sidebar.is_collapsed());

        sidebar.handle_resize(700.0);
        assert!(sidebar.is_mobile());
        assert!(!sidebar.is_collapsed());
        sidebar.open_overlay();

        sidebar.handle_resize(1024.0);
        assert!(!sidebar.is_mobile());
        assert!(!sidebar.is_overlay_open());
        assert!(sidebar.is_collapsed());
    }

    #[test]
    fn collapse_and_expand_ignored_on_mobile() {
        let store = SharedStore::default();
        let (tx, _rx) = mpsc::channel();
        let mut sidebar = SidebarController::new(Box::new(store.clone()), tx, 768.0);
        sidebar.collapse();
        assert!(!sidebar.is_collapsed());
        assert_eq!(store.get(SIDEBAR_KEY), None);
    }

    #[test]
    fn theme_toggle_persists_and_broadcasts() {
        let store = SharedStore::default();
        let (tx, rx) = mpsc::channel();
        let mut theme = ThemeController::new(Box::new(store.clone()), tx);
        assert_eq!(theme.current(), Theme::Light);

        assert_eq!(theme.toggle(), Theme::Dark);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::ThemeChanged { theme: Theme::Dark }
        );

        let (tx2, _rx2) = mpsc::channel();
        let reloaded = ThemeController::new(Box::new(store), tx2);
        assert_eq!(reloaded.current(), Theme::Dark);
    }

    #[test]
    fn file_store_round_trips_and_shares_path() {
        let dir = scratch_dir("prefs");
        let path = dir.join("nested").join("prefs.toml");
        let mut sidebar_store = FilePrefStore::new(&path);
        let mut theme_store = FilePrefStore::new(&path);

        sidebar_store.set(SIDEBAR_KEY, "true").unwrap();
        theme_store.set(THEME_KEY, "dark").unwrap();

        let fresh = FilePrefStore::new(&path);
        assert_eq!(fresh.get(SIDEBAR_KEY).as_deref(), Some("true"));
        assert_eq!(fresh.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(fresh.get("missing"), None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = scratch_dir("prefs-corrupt");
        let path = dir.join("prefs.toml");
        std::fs::write(&path, "theme = [").unwrap();
        let store = FilePrefStore::new(&path);
        assert_eq!(store.get(THEME_KEY), None);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn writing_over_corrupt_file_keeps_a_backup() {
        let dir = scratch_dir("prefs-corrupt-write");
        let path = dir.join("prefs.toml");
        std::fs::write(&path, "sidebar-collapsed = \"true\"\ntheme = [").unwrap();
        let mut store = FilePrefStore::new(&path);

        store.set(THEME_KEY, "dark").unwrap();

        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        let backup = std::fs::read_to_string(dir.join("prefs.toml.bak")).unwrap();
        assert!(backup.contains("sidebar-collapsed"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unreadable_prefs_path_is_an_error_not_a_reset() {
        let dir = scratch_dir("prefs-unreadable");
        let mut store = FilePrefStore::new(&dir);
        assert!(matches!(store.set(THEME_KEY, "dark"), Err(PrefsError::Io(_))));
        let _ = std::fs::remove_dir_all(dir);
    }
}
