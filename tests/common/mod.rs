//! Synthetic uploads for the integration suites.
//!
//! The builders are the crate's unit-test helpers compiled a second time, so
//! both suites always see the same fixtures.

#![allow(dead_code)]

#[path = "../../src/test_helpers.rs"]
mod helpers;

pub use helpers::{bmp_bytes as bmp, gif_bytes as gif, jpeg_bytes as jpeg, png_bytes as png};

pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = helpers::decode(bytes);
    (img.width(), img.height())
}
