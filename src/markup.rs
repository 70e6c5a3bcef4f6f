//! Presentation shared by both views.
//!
//! A view renders to a [`ViewTree`]: the name list plus the detail pane. The
//! tree prints as HTML (`to_html`) or as plain text (`Display`).

use std::fmt;

use crate::client::Profile;

/// Placeholder shown while a lookup is pending.
pub const LOADING_TEXT: &str = "Loading...";

/// One entry of the name list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub name: String,
    pub active: bool,
}

/// Contents of the detail pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPane {
    Loading,
    /// `None` when the lookup settled without a profile.
    Loaded(Option<Profile>),
    Failed(String),
}

/// A rendered frame: the name list plus the detail pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTree {
    pub items: Vec<ListItem>,
    pub detail: DetailPane,
}

impl ViewTree {
    /// Build a frame with `active` highlighted in the list.
    pub fn new(names: &[String], active: &str, detail: DetailPane) -> Self {
        let items = names
            .iter()
            .map(|name| ListItem {
                name: name.clone(),
                active: name == active,
            })
            .collect();
        Self { items, detail }
    }

    /// Whether the pane shows the loading placeholder.
    pub fn is_loading(&self) -> bool {
        self.detail == DetailPane::Loading
    }

    /// The highlighted name.
    pub fn active_name(&self) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.active)
            .map(|item| item.name.as_str())
    }

    /// Handle text shown in the loaded pane. Empty when loaded without a profile.
    pub fn handle(&self) -> Option<&str> {
        match &self.detail {
            DetailPane::Loaded(profile) => Some(profile.as_ref().map_or("", |p| p.login.as_str())),
            _ => None,
        }
    }

    /// Source of the avatar image, if one is shown.
    pub fn image_src(&self) -> Option<&str> {
        match &self.detail {
            DetailPane::Loaded(Some(profile)) => Some(profile.avatar_url.as_str()),
            _ => None,
        }
    }

    /// Render as HTML. Text content and attributes are escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"App\"><ul class=\"list\">");
        for item in &self.items {
            html.push_str(&format!(
                "<li class=\"{}\">{}</li>",
                class_names(&[("name", true), ("active", item.active)]),
                escape(&item.name)
            ));
        }
        html.push_str("</ul>");

        match &self.detail {
            DetailPane::Loading => html.push_str(&format!("<div>{LOADING_TEXT}</div>")),
            DetailPane::Loaded(profile) => {
                html.push_str("<div class=\"detail\">name: ");
                if let Some(profile) = profile {
                    html.push_str(&escape(&profile.login));
                    html.push_str(&format!("<img src=\"{}\">", escape(&profile.avatar_url)));
                }
                html.push_str("</div>");
            }
            DetailPane::Failed(message) => {
                html.push_str(&format!("<div class=\"detail error\">{}</div>", escape(message)));
            }
        }

        html.push_str("</div>");
        html
    }
}

impl fmt::Display for ViewTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            let marker = if item.active { '>' } else { ' ' };
            writeln!(f, "{marker} {}", item.name)?;
        }
        match &self.detail {
            DetailPane::Loading => write!(f, "  {LOADING_TEXT}"),
            DetailPane::Loaded(Some(profile)) => {
                write!(f, "  name: {} [{}]", profile.login, profile.avatar_url)
            }
            DetailPane::Loaded(None) => write!(f, "  name: "),
            DetailPane::Failed(message) => write!(f, "  error: {message}"),
        }
    }
}

/// Join the class names whose flag is set.
pub fn class_names(classes: &[(&str, bool)]) -> String {
    classes
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(" ")
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
            c => out.push(c),
        }
    }
    out
}
