//! Navigation guard and navbar state.
//!
//! Both are pure functions of the caller's identity and the requested path;
//! nothing is remembered between navigations.

use lightbox_types::api::MenuState;
use lightbox_types::models::Identity;

use crate::pages::{PageLocation, PageTable};

pub const LOGIN_PATH: &str = "/login";
pub const MAIN_PATH: &str = "/select-images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render,
    Redirect(&'static str),
}

impl Navigation {
    pub fn redirect(self) -> Option<String> {
        match self {
            Self::Render => None,
            Self::Redirect(path) => Some(path.to_string()),
        }
    }
}

/// Decide whether a page may be shown.
///
/// Signed-in users only ever see app pages; everyone else only sees the
/// login and registration pages. Paths with no page fall into neither set.
pub fn guard(authenticated: bool, location: Option<PageLocation>) -> Navigation {
    match (authenticated, location) {
        (true, Some(PageLocation::App)) => Navigation::Render,
        (true, _) => Navigation::Redirect(MAIN_PATH),
        (false, Some(PageLocation::Auth)) => Navigation::Render,
        (false, _) => Navigation::Redirect(LOGIN_PATH),
    }
}

/// Location of the page at `pathname`, matched exactly after trimming a
/// trailing slash.
pub fn page_location(pages: &PageTable, pathname: &str) -> Option<PageLocation> {
    pages.location(pathname)
}

/// Guard a raw request path against the registered pages.
pub fn resolve(identity: &Identity, pages: &PageTable, pathname: &str) -> Navigation {
    guard(identity.is_authenticated(), page_location(pages, pathname))
}

pub fn menu_state(identity: &Identity) -> MenuState {
    match identity.username() {
        Some(username) => MenuState {
            auth_menu_visible: false,
            user_menu_visible: true,
            user_label: format!("Welcome, {}", username),
        },
        None => MenuState {
            auth_menu_visible: true,
            user_menu_visible: false,
            user_label: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lightbox_types::models::User;

    use crate::pages::Page;

    fn pages() -> PageTable {
        let mut table = PageTable::default();
        for (path, location) in [
            ("/login", PageLocation::Auth),
            ("/register", PageLocation::Auth),
            ("/select-images", PageLocation::App),
            ("/review-images", PageLocation::App),
        ] {
            table.insert(Page { path, name: path, location, body: "" });
        }
        table
    }

    fn signed_in() -> Identity {
        Identity::User(User { id: 1, username: "testuser".into() })
    }

    #[test]
    fn anonymous_navigation() {
        let pages = pages();
        let cases = [
            ("/select-images", Navigation::Redirect("/login")),
            ("/review-images", Navigation::Redirect("/login")),
            ("/unknown-path", Navigation::Redirect("/login")),
            ("/", Navigation::Redirect("/login")),
            ("/login", Navigation::Render),
            ("/register", Navigation::Render),
            ("/register/", Navigation::Render),
        ];
        for (path, expected) in cases {
            assert_eq!(resolve(&Identity::Anonymous, &pages, path), expected, "{path}");
        }
    }

    #[test]
    fn authenticated_navigation() {
        let pages = pages();
        let cases = [
            ("/login", Navigation::Redirect("/select-images")),
            ("/register", Navigation::Redirect("/select-images")),
            ("/", Navigation::Redirect("/select-images")),
            ("/unknown-path", Navigation::Redirect("/select-images")),
            ("/select-images", Navigation::Render),
            ("/review-images", Navigation::Render),
        ];
        for (path, expected) in cases {
            assert_eq!(resolve(&signed_in(), &pages, path), expected, "{path}");
        }
    }

    #[test]
    fn menu_for_signed_in_user() {
        let menu = menu_state(&signed_in());
        assert!(!menu.auth_menu_visible);
        assert!(menu.user_menu_visible);
        assert_eq!(menu.user_label, "Welcome, testuser");
    }

    #[test]
    fn menu_for_anonymous_user() {
        let menu = menu_state(&Identity::Anonymous);
        assert!(menu.auth_menu_visible);
        assert!(!menu.user_menu_visible);
        assert_eq!(menu.user_label, "");
    }

    #[test]
    fn page_location_is_exact() {
        let pages = pages();
        assert_eq!(page_location(&pages, "/login"), Some(PageLocation::Auth));
        assert_eq!(page_location(&pages, "/select-images/"), Some(PageLocation::App));
        assert_eq!(page_location(&pages, "/login-extra"), None);
        assert_eq!(page_location(&pages, "/app/login"), None);
    }

    #[test]
    fn redirect_target() {
        assert_eq!(Navigation::Render.redirect(), None);
        assert_eq!(Navigation::Redirect(LOGIN_PATH).redirect().as_deref(), Some("/login"));
    }
}
