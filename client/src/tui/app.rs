use crate::config::Config;
use crate::stat::{Gateway, GatewayError, Session, SessionStore, Snapshot};
use tracing::warn;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    Profile,
    Graph,
    Projects,
    History,
    Help,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Login,
    Dashboard,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoginMode {
    Identifier,
    Password,
}

pub struct LoginApp {
    pub identifier: String,
    pub password: String,
    pub mode: LoginMode,
    pub error_message: Option<String>,
}
impl LoginApp {
    fn new() -> Self {
        Self {
            identifier: String::new(),
            password: String::new(),
            mode: LoginMode::Identifier,
            error_message: None,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::Identifier => LoginMode::Password,
            LoginMode::Password => LoginMode::Identifier,
        };
    }

    pub fn active_field(&mut self) -> &mut String {
        match self.mode {
            LoginMode::Identifier => &mut self.identifier,
            LoginMode::Password => &mut self.password,
        }
    }
}

pub struct App {
    pub config: Config,
    pub store: SessionStore,
    pub gateway: Option<Gateway>,
    pub snapshot: Option<Snapshot>,
    pub page: Page,
    pub login: LoginApp,
    pub current_screen: Screen,
    pub selected_point_idx: usize,
    pub should_quit: bool,
    pub needs_refresh: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl App {
    /// Starts on the dashboard when a saved session exists, on the login
    /// page otherwise.
    pub fn new(config: Config, store: SessionStore) -> Self {
        let mut app = Self {
            config,
            store,
            gateway: None,
            snapshot: None,
            page: Page::Login,
            login: LoginApp::new(),
            current_screen: Screen::Profile,
            selected_point_idx: 0,
            should_quit: false,
            needs_refresh: false,
            error_message: None,
            success_message: None,
        };
        match app.store.load() {
            Ok(Some(session)) => app.enter_dashboard(session),
            Ok(None) => {}
            Err(e) => {
                warn!("could not read saved session: {e:#}");
                app.login.error_message = Some(format!("Saved session unreadable: {e}"));
            }
        }
        app
    }

    fn enter_dashboard(&mut self, session: Session) {
        self.gateway = Some(Gateway::new(&self.config, session));
        self.page = Page::Dashboard;
        self.current_screen = Screen::Profile;
        self.needs_refresh = true;
    }

    /// Persists a fresh session and schedules the first fetch.
    pub fn start_session(&mut self, session: Session) {
        if let Err(e) = self.store.save(&session) {
            warn!("could not save session: {e:#}");
        }
        self.login.password.clear();
        self.login.error_message = None;
        self.enter_dashboard(session);
    }

    /// Drops the session and returns to the login page, optionally showing
    /// why.
    pub fn logout(&mut self, reason: Option<String>) {
        if let Err(e) = self.store.clear() {
            warn!("could not remove session file: {e:#}");
        }
        self.gateway = None;
        self.snapshot = None;
        self.page = Page::Login;
        self.needs_refresh = false;
        self.selected_point_idx = 0;
        self.login.password.clear();
        self.login.mode = LoginMode::Identifier;
        self.login.error_message = reason;
        self.error_message = None;
        self.success_message = None;
    }

    /// A failed first load, or any authentication failure, ends the session.
    /// Other failures keep the last good snapshot on screen.
    pub fn apply_refresh(&mut self, result: Result<Snapshot, GatewayError>) {
        match result {
            Ok(snapshot) => {
                let len = snapshot.series.points.len();
                self.selected_point_idx = self.selected_point_idx.min(len.saturating_sub(1));
                self.snapshot = Some(snapshot);
                self.error_message = None;
                self.success_message = Some("Data refreshed".to_string());
            }
            Err(e) if e.is_auth() || self.snapshot.is_none() => {
                warn!("fetch failed, signing out: {e}");
                self.logout(Some(e.to_string()));
            }
            Err(e) => {
                self.error_message = Some(format!("Refresh failed: {e}"));
            }
        }
    }

    pub fn next_screen(&mut self) {
        self.current_screen = match self.current_screen {
            Screen::Profile => Screen::Graph,
            Screen::Graph => Screen::Projects,
            Screen::Projects => Screen::History,
            Screen::History => Screen::Help,
            Screen::Help => Screen::Profile,
        };
    }

    pub fn prev_screen(&mut self) {
        self.current_screen = match self.current_screen {
            Screen::Profile => Screen::Help,
            Screen::Graph => Screen::Profile,
            Screen::Projects => Screen::Graph,
            Screen::History => Screen::Projects,
            Screen::Help => Screen::History,
        };
    }

    pub fn select_prev_point(&mut self) {
        self.selected_point_idx = self.selected_point_idx.saturating_sub(1);
    }

    pub fn select_next_point(&mut self) {
        let len = self
            .snapshot
            .as_ref()
            .map(|s| s.series.points.len())
            .unwrap_or(0);
        if self.selected_point_idx + 1 < len {
            self.selected_point_idx += 1;
        }
    }
}
