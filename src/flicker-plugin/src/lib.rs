//! Provider orchestration for Flicker media sessions.
//!
//! This crate provides:
//! - A registry that builds provider instances from a table of descriptors
//!   and indexes them by capability, ascending by priority
//! - A dispatch loop with first-success, first-success-or-abort and broadcast
//!   policies
//! - Cooperative cancellation through attempt counters and an interrupt flag
//!   that other threads may touch
//! - A [`ProviderHandler`] tying the above to one playlist and its lifecycle
//!
//! # Lifecycle
//!
//! A caller drives one open attempt as:
//!
//! ```text
//! on_initializing -> on_initialized -> playlist.set_input -> open
//!     -> on_playlist_completed -> suggest_item / select_index
//!     -> on_initializing_switch -> open_item -> on_initialized_switch
//!     -> scrape_playlist
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use flicker_core::{PluginsConfig, ProviderDescriptor};
//! use flicker_plugin::{ProviderHandler, Session};
//!
//! let descriptors = vec![ProviderDescriptor::of::<MyOpener>("my-opener", "1.0.0")];
//! let mut handler = ProviderHandler::new(&descriptors, &PluginsConfig::default());
//! let mut session = Session::new();
//!
//! handler.on_initializing(&mut session);
//! handler.on_initialized(&mut session);
//! handler.playlist_mut().set_input("/media/show");
//! let opened = handler.open(&mut session)?;
//! ```

mod dispatch;
mod error;
mod handler;
mod registry;
mod session;

pub use dispatch::{dispatch, Dispatch, Policy, Step};
pub use error::{DispatchError, DispatchResult, LoadError};
pub use handler::{Opened, ProviderHandler, StreamSuggestion, TeardownReport};
pub use registry::{
    CapabilityFlags, CapabilityIndex, CapabilityKind, CapabilitySet, Capable, LoadReport,
    LoadedProvider, ProviderRegistry,
};
pub use session::{CancelToken, EpochKind, Session, SessionGuard};
