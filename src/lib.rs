#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![allow(clippy::module_inception)]

pub mod build;
pub mod cmark;
pub mod config;
pub mod model;
pub mod parse;
pub mod registry;
pub mod service;

pub mod error {
    pub use anyhow::{Error, Result};
}
