//! Visual regression gate for web-page screenshots.
//!
//! Two captures of the same page are compared with structural similarity; when
//! the score drops below the pass threshold the changed regions are located
//! and drawn for review.

pub mod capture;
pub mod compare;
pub mod config;
pub mod gate;
pub mod logging;
pub mod present;
pub mod source;
pub mod staging;
