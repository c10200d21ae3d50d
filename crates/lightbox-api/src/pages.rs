use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use lightbox_types::api::MenuState;

use crate::layout::{self, Navigation};
use crate::state::{AppState, current_identity};

/// Which side of the login wall a page lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLocation {
    /// Login and registration: only for signed-out visitors.
    Auth,
    /// Everything behind the login.
    App,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub path: &'static str,
    pub name: &'static str,
    pub location: PageLocation,
    /// Inner HTML of the page container.
    pub body: &'static str,
}

/// Registered pages keyed by path.
#[derive(Debug, Clone, Default)]
pub struct PageTable {
    pages: BTreeMap<&'static str, Page>,
}

impl PageTable {
    /// Returns false, leaving the table untouched, if the path is taken.
    pub fn insert(&mut self, page: Page) -> bool {
        if self.pages.contains_key(page.path) {
            return false;
        }
        self.pages.insert(page.path, page);
        true
    }

    pub fn get(&self, pathname: &str) -> Option<&Page> {
        self.pages.get(normalize(pathname))
    }

    pub fn location(&self, pathname: &str) -> Option<PageLocation> {
        self.get(pathname).map(|page| page.location)
    }

    pub fn in_location(&self, location: PageLocation) -> impl Iterator<Item = &Page> {
        self.pages.values().filter(move |page| page.location == location)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn normalize(pathname: &str) -> &str {
    let trimmed = pathname.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Fallback handler: every GET that is not a callback is a page navigation.
pub async fn serve(
    State(state): State<AppState>,
    method: Method,
    session: Session,
    uri: Uri,
) -> Result<Response, StatusCode> {
    if method != Method::GET && method != Method::HEAD {
        return Err(StatusCode::METHOD_NOT_ALLOWED);
    }

    let identity = current_identity(&state, &session).await?;

    match layout::resolve(&identity, &state.pages, uri.path()) {
        Navigation::Redirect(target) => Ok(Redirect::to(target).into_response()),
        Navigation::Render => {
            let page = state.pages.get(uri.path()).ok_or(StatusCode::NOT_FOUND)?;
            let menu = layout::menu_state(&identity);
            Ok(Html(render(page, &state.pages, &menu)).into_response())
        }
    }
}

pub fn render(page: &Page, pages: &PageTable, menu: &MenuState) -> String {
    let mut nav = String::new();
    if menu.auth_menu_visible {
        for item in pages.in_location(PageLocation::Auth) {
            nav.push_str(&format!(r#"<a href="{}">{}</a> "#, item.path, escape(item.name)));
        }
    }
    if menu.user_menu_visible {
        nav.push_str(&format!("<strong>{}</strong> ", escape(&menu.user_label)));
        for item in pages.in_location(PageLocation::App) {
            nav.push_str(&format!(r#"<a href="{}">{}</a> "#, item.path, escape(item.name)));
        }
        nav.push_str(r#"<a href="/logout">Logout</a>"#);
    }

    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{title} · Lightbox</title>
<script>
async function callback(path, body) {{
  const init = body === undefined
    ? {{ method: "GET" }}
    : {{ method: "POST", headers: {{ "content-type": "application/json" }}, body: JSON.stringify(body) }};
  const response = await fetch("/_callbacks" + path, init);
  return response.json();
}}
function follow(redirect) {{ if (redirect) window.location.assign(redirect); }}
window.addEventListener("pageshow", async () => {{
  const nav = await callback("/navigate", {{ pathname: window.location.pathname }});
  follow(nav.redirect);
}});
</script>
</head>
<body>
<nav><span>Lightbox</span> {nav}</nav>
<main style="padding: 24px 0">
{body}
</main>
</body>
</html>
"#,
        title = escape(page.name),
        nav = nav,
        body = page.body,
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
