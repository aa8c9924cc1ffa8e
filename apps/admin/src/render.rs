use client_core::{
    public_list::{ADMIN_EMPTY_MESSAGE, PUBLIC_EMPTY_MESSAGE},
    ListState,
};
use shared::AppRecord;

pub const NO_LINK: &str = "No link";
const LOADING: &str = "Loading apps...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Public,
    Admin,
}

pub fn render_state(state: &ListState, audience: Audience) -> String {
    match state {
        ListState::Loading => LOADING.to_string(),
        ListState::Empty => match audience {
            Audience::Public => PUBLIC_EMPTY_MESSAGE.to_string(),
            Audience::Admin => ADMIN_EMPTY_MESSAGE.to_string(),
        },
        ListState::Ready(apps) => {
            let mut out = match audience {
                Audience::Public => String::new(),
                Audience::Admin => format!("Existing apps ({})\n", apps.len()),
            };
            for app in apps.iter() {
                out.push_str(&render_row(app));
                out.push('\n');
            }
            out.truncate(out.trim_end().len());
            out
        }
    }
}

pub fn render_row(app: &AppRecord) -> String {
    let mut line = format!("{}  {}  [{}]", app.id, app.name, app.launch_status);
    if let Some(summary) = app.launch_summary() {
        line.push_str("  ");
        line.push_str(&summary);
    }
    line.push_str("  ");
    line.push_str(app.external_link.as_deref().unwrap_or(NO_LINK));
    if let Some(tagline) = app.tagline.as_deref().filter(|t| !t.is_empty()) {
        line.push_str("\n    ");
        line.push_str(tagline);
    }
    line
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
