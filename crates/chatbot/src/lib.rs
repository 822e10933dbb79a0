mod error;
pub mod utils;
pub use error::{Error, Result};

pub mod chat;
pub mod clients;
pub mod config;
pub mod console;
pub mod display;
pub mod responder;
pub mod session;
