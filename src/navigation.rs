use log::info;
use std::sync::Mutex;

/// Page-navigation hook used for forced logouts and login redirects.
///
/// In a browser host this drives `window.location`; elsewhere it is whatever
/// policy the embedding application wants.
pub trait Navigator: Send + Sync {
    /// Current page path, e.g. `/dashboard`
    fn current_path(&self) -> String;
    fn redirect(&self, location: &str);
    fn reload(&self);
}

/// A navigation that was requested through a [`MemoryNavigator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Redirect(String),
    Reload,
}

/// Navigator that only tracks location in memory and records every request.
/// The default for non-browser hosts.
#[derive(Debug)]
pub struct MemoryNavigator {
    path: Mutex<String>,
    history: Mutex<Vec<Navigation>>,
}

impl MemoryNavigator {
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            path: Mutex::new(initial_path.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn set_path(&self, path: impl Into<String>) {
        if let Ok(mut current) = self.path.lock() {
            *current = path.into();
        }
    }

    fn record(&self, navigation: Navigation) {
        if let Ok(mut history) = self.history.lock() {
            history.push(navigation);
        }
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.path.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn redirect(&self, location: &str) {
        info!("Navigating to {}", location);
        // only the path part becomes the new location
        let path = location.split('?').next().unwrap_or(location);
        self.set_path(path);
        self.record(Navigation::Redirect(location.to_string()));
    }

    fn reload(&self) {
        info!("Reloading current page");
        self.record(Navigation::Reload);
    }
}

/// Sign-in markers; being on any of these pages suppresses auth redirects
const SIGN_IN_MARKERS: [&str; 3] = ["/signin", "/login", "/sign-in"];

/// True if `path` already is a sign-in page
pub fn is_sign_in_path(path: &str, login_url: &str) -> bool {
    let current = path.to_lowercase();
    let login = login_url.to_lowercase();
    SIGN_IN_MARKERS.iter().any(|m| current.contains(m))
        || (!login.is_empty() && current.contains(&login))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_moves_path_and_records() {
        let nav = MemoryNavigator::new("/orders");
        nav.redirect("/signin?redirect=%2Forders");
        assert_eq!(nav.current_path(), "/signin");
        nav.reload();
        assert_eq!(
            nav.history(),
            vec![
                Navigation::Redirect("/signin?redirect=%2Forders".into()),
                Navigation::Reload
            ]
        );
    }

    #[test]
    fn sign_in_detection() {
        assert!(is_sign_in_path("/SignIn", "/signin"));
        assert!(is_sign_in_path("/app/login", "/signin"));
        assert!(is_sign_in_path("/admin/enter", "/admin/enter"));
        assert!(!is_sign_in_path("/dashboard", "/signin"));
    }
}
