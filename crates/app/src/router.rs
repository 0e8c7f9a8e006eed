//! View router.
//!
//! Holds the requested location and the view currently shown for it. The
//! router listens to the session store and re-evaluates synchronously on
//! every committed change, so by the time a store write returns the view
//! already reflects it.

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use dentalcare_auth::Access;
use dentalcare_events::{EventBus, InMemoryEventBus, Listener, ListenerId};

use crate::guard::{self, Decision};
use crate::session::{SessionSnapshot, SessionStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Login,
    Dashboard,
    Patients,
    Appointments,
    Billing,
    Inventory,
    Reports,
    Settings,
    UserManagement,
}

impl Screen {
    pub const ALL: [Screen; 9] = [
        Screen::Login,
        Screen::Dashboard,
        Screen::Patients,
        Screen::Appointments,
        Screen::Billing,
        Screen::Inventory,
        Screen::Reports,
        Screen::Settings,
        Screen::UserManagement,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Screen::Login => "/login",
            Screen::Dashboard => "/dashboard",
            Screen::Patients => "/patients",
            Screen::Appointments => "/appointments",
            Screen::Billing => "/billing",
            Screen::Inventory => "/inventory",
            Screen::Reports => "/reports",
            Screen::Settings => "/settings",
            Screen::UserManagement => "/admin/users",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Screen::Login => "Sign in",
            Screen::Dashboard => "Dashboard",
            Screen::Patients => "Patients",
            Screen::Appointments => "Appointments",
            Screen::Billing => "Billing",
            Screen::Inventory => "Inventory",
            Screen::Reports => "Reports",
            Screen::Settings => "Settings",
            Screen::UserManagement => "Users",
        }
    }

    pub const fn access(self) -> Access {
        match self {
            Screen::Login => Access::Public,
            Screen::UserManagement => Access::Admin,
            _ => Access::Authenticated,
        }
    }

    /// Resolve a location; trailing slashes are ignored and `/` is the dashboard.
    pub fn from_path(path: &str) -> Option<Screen> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Screen::Dashboard);
        }
        Screen::ALL.into_iter().find(|s| s.path() == trimmed)
    }

    fn in_navigation(self) -> bool {
        !matches!(self, Screen::Login)
    }
}

/// Identifies one mount of a screen.
///
/// Work started under a token must be dropped once the token is no longer
/// current: the user navigated away, or the signed-in identity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MountToken {
    pub screen: Screen,
    pub mount_id: u64,
    pub identity_generation: u64,
}

/// What the shell shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    Screen { mount: MountToken },
    /// Session still loading; nothing is decided yet.
    Placeholder { screen: Screen },
    AccessDenied { screen: Screen },
    NotFound { path: String },
}

impl View {
    pub fn mount(&self) -> Option<MountToken> {
        match self {
            View::Screen { mount } => Some(*mount),
            _ => None,
        }
    }

    pub fn screen(&self) -> Option<Screen> {
        match self {
            View::Screen { mount } => Some(mount.screen),
            View::Placeholder { screen } | View::AccessDenied { screen } => Some(*screen),
            View::NotFound { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub screen: Screen,
    pub path: &'static str,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug)]
struct Core {
    /// Requested location, or the raw path when it matched no screen.
    location: Result<Screen, String>,
    view: View,
    /// Last store snapshot applied.
    session: SessionSnapshot,
    next_mount: u64,
}

impl Core {
    fn resolve(&mut self) -> View {
        let screen = match &self.location {
            Ok(screen) => *screen,
            Err(path) => return View::NotFound { path: path.clone() },
        };
        let state = &self.session.state;
        if screen == Screen::Login && state.is_authenticated() {
            self.location = Ok(Screen::Dashboard);
            return self.resolve();
        }
        match guard::evaluate(state, screen.access()) {
            Decision::Render => View::Screen {
                mount: self.mount(screen),
            },
            Decision::Placeholder => View::Placeholder { screen },
            Decision::AccessDenied => View::AccessDenied { screen },
            Decision::RedirectToLogin => {
                // The requested path is not remembered.
                self.location = Ok(Screen::Login);
                View::Screen {
                    mount: self.mount(Screen::Login),
                }
            }
        }
    }

    /// Keep the current mount when screen and identity are unchanged.
    fn mount(&mut self, screen: Screen) -> MountToken {
        if let View::Screen { mount } = self.view {
            if mount.screen == screen && mount.identity_generation == self.session.generation {
                return mount;
            }
        }
        self.next_mount += 1;
        MountToken {
            screen,
            mount_id: self.next_mount,
            identity_generation: self.session.generation,
        }
    }
}

struct Inner {
    store: SessionStore,
    core: Mutex<Core>,
    views: InMemoryEventBus<View>,
    store_listener: Mutex<Option<ListenerId>>,
}

/// Handle to the router. Cheap to clone.
#[derive(Clone)]
pub struct Router {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for Router {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router").field("view", &self.view()).finish_non_exhaustive()
    }
}

impl Router {
    /// Create a router at `/dashboard` and attach it to `store`.
    pub fn new(store: SessionStore) -> Self {
        let session = store.snapshot();
        let inner = Arc::new(Inner {
            store: store.clone(),
            core: Mutex::new(Core {
                location: Ok(Screen::Dashboard),
                view: View::Placeholder {
                    screen: Screen::Dashboard,
                },
                session,
                next_mount: 0,
            }),
            views: InMemoryEventBus::new(),
            store_listener: Mutex::new(None),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let listener: Listener<SessionSnapshot> = Arc::new(move |snapshot: &SessionSnapshot| {
            if let Some(inner) = weak.upgrade() {
                Router { inner }.on_session(snapshot);
            }
        });
        let id = store.listen(listener);
        if let Ok(mut slot) = inner.store_listener.lock() {
            *slot = Some(id);
        }

        let router = Router { inner };
        router.refresh();
        router
    }

    fn apply(&self, update: impl FnOnce(&mut Core)) -> View {
        let (view, changed) = {
            let Ok(mut core) = self.inner.core.lock() else {
                tracing::error!("router state lock poisoned");
                return View::NotFound { path: String::new() };
            };
            update(&mut core);
            let view = core.resolve();
            let changed = view != core.view;
            core.view = view.clone();
            (view, changed)
        };
        if changed {
            tracing::debug!(?view, "view changed");
            if let Err(e) = self.inner.views.publish(view.clone()) {
                tracing::error!(error = ?e, "failed to publish view change");
            }
        }
        view
    }

    fn on_session(&self, snapshot: &SessionSnapshot) {
        self.apply(|core| {
            if snapshot.seq > core.session.seq {
                core.session = snapshot.clone();
            }
        });
    }

    /// Re-read the store and re-evaluate the current location.
    pub fn refresh(&self) -> View {
        let snapshot = self.inner.store.snapshot();
        self.on_session(&snapshot);
        self.view()
    }

    /// Go to `path` and return what is shown for it.
    pub fn navigate(&self, path: &str) -> View {
        let snapshot = self.inner.store.snapshot();
        let location = Screen::from_path(path).ok_or_else(|| path.to_string());
        tracing::debug!(path, "navigate");
        self.apply(move |core| {
            if snapshot.seq > core.session.seq {
                core.session = snapshot;
            }
            core.location = location;
        })
    }

    pub fn view(&self) -> View {
        match self.inner.core.lock() {
            Ok(core) => core.view.clone(),
            Err(poisoned) => poisoned.into_inner().view.clone(),
        }
    }

    /// Location currently requested (after any redirect).
    pub fn location(&self) -> Option<Screen> {
        self.inner.core.lock().ok().and_then(|c| c.location.clone().ok())
    }

    /// Whether work started under `token` may still be applied.
    pub fn is_current(&self, token: &MountToken) -> bool {
        self.inner.core.lock().is_ok_and(|core| {
            core.view.mount() == Some(*token) && core.session.generation == token.identity_generation
        })
    }

    /// Sidebar entries the current session may open.
    pub fn nav_items(&self) -> Vec<NavItem> {
        let Ok(core) = self.inner.core.lock() else {
            return Vec::new();
        };
        let current = core.view.screen();
        Screen::ALL
            .into_iter()
            .filter(|s| s.in_navigation())
            .filter(|s| guard::evaluate(&core.session.state, s.access()) == Decision::Render)
            .map(|screen| NavItem {
                screen,
                path: screen.path(),
                label: screen.label(),
                active: current == Some(screen),
            })
            .collect()
    }

    /// Observe view changes.
    pub fn listen(&self, listener: Listener<View>) -> ListenerId {
        self.inner.views.listen(listener)
    }

    pub fn unlisten(&self, id: ListenerId) -> bool {
        self.inner.views.unlisten(id)
    }

    /// Detach from the store.
    pub fn dispose(&self) {
        let id = self.inner.store_listener.lock().ok().and_then(|mut l| l.take());
        if let Some(id) = id {
            self.inner.store.unlisten(id);
        }
        self.inner.views.clear();
    }
}
