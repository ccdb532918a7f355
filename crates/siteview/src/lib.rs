//! Site viewer
//!
//! Turns user input into an absolute URL for the embedded renderer and
//! tracks what the renderer reports back.

mod normalize;
mod viewer;

pub use normalize::normalize_url;
pub use viewer::{NavCommand, RendererEvent, SiteViewer, ViewerSnapshot};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("enter a site address first")]
    EmptyInput,

    #[error("no site is open")]
    NoSiteOpen,

    #[error("nothing to go back to")]
    CannotGoBack,
}

pub type Result<T> = std::result::Result<T, ViewerError>;
