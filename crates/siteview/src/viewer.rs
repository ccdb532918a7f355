use serde::{Deserialize, Serialize};

use crate::{normalize_url, Result, ViewerError};

/// Callbacks from the embedded renderer.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RendererEvent {
    #[serde(rename = "load_finished")]
    LoadFinished,
    #[serde(rename = "load_error")]
    LoadError {
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "navigation_state_changed")]
    NavigationStateChanged { can_go_back: bool },
}

/// Instructions for the renderer.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavCommand {
    GoBack,
    Reload,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerSnapshot {
    pub current_url: Option<String>,
    pub loading: bool,
    pub error: bool,
    pub can_go_back: bool,
    pub last_error: Option<String>,
}

/// State of the site screen.
#[derive(Debug, Default)]
pub struct SiteViewer {
    state: ViewerSnapshot,
}

impl SiteViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a site from raw user input and return the URL handed to the renderer.
    pub fn open(&mut self, raw: &str) -> Result<&str> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ViewerError::EmptyInput);
        }

        self.state = ViewerSnapshot {
            current_url: Some(normalize_url(trimmed)),
            loading: true,
            ..ViewerSnapshot::default()
        };

        Ok(self.state.current_url.as_deref().unwrap_or_default())
    }

    pub fn close(&mut self) {
        self.state = ViewerSnapshot::default();
    }

    /// Fold a renderer callback into the state. Returns false when the event
    /// was dropped because no site is open.
    pub fn apply(&mut self, event: RendererEvent) -> bool {
        if self.state.current_url.is_none() {
            return false;
        }

        match event {
            RendererEvent::LoadFinished => {
                self.state.loading = false;
            }
            RendererEvent::LoadError { description } => {
                self.state.error = true;
                self.state.loading = false;
                self.state.last_error = description;
            }
            RendererEvent::NavigationStateChanged { can_go_back } => {
                self.state.can_go_back = can_go_back;
            }
        }
        true
    }

    pub fn go_back(&self) -> Result<NavCommand> {
        self.ensure_open()?;
        if !self.state.can_go_back {
            return Err(ViewerError::CannotGoBack);
        }
        Ok(NavCommand::GoBack)
    }

    pub fn reload(&mut self) -> Result<NavCommand> {
        self.ensure_open()?;
        self.state.loading = true;
        self.state.error = false;
        self.state.last_error = None;
        Ok(NavCommand::Reload)
    }

    pub fn current_url(&self) -> Option<&str> {
        self.state.current_url.as_deref()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        self.state.clone()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state.current_url {
            Some(_) => Ok(()),
            None => Err(ViewerError::NoSiteOpen),
        }
    }
}
