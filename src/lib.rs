//! Window manager core for multiple independent input seats sharing one set
//! of monitors and windows.
//!
//! The crate is driven from the outside: the embedding binary owns the
//! display transport, constructs a [`Wm`] with a [`backend::DisplayServer`]
//! implementation and a [`config::Config`], then feeds protocol events and
//! keybinding commands into it. Everything else - seat bookkeeping, client
//! lifecycle, focus resolution, tiling - happens in here.

#[macro_use]
mod macros;

pub mod arena;
pub mod backend;
pub mod client;
pub mod command;
pub mod config;
pub mod errorfmt;
pub mod event;
pub mod focus;
pub mod hints;
pub mod layout;
pub mod logger;
pub mod monitor;
pub mod rect;
pub mod seat;
pub mod state;

#[cfg(test)]
mod test_fixture;

pub use crate::{
    command::Command,
    config::Config,
    event::Event,
    state::Wm,
};
