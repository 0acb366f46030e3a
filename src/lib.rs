//! Recycling classifier gateway
//!
//! A networked camera POSTs still images to `/upload`. Each image is decoded,
//! turned right side up and sent to Gemini for an item + recycling category
//! reply, which is returned synchronously to the camera. Only one image is
//! classified at a time; uploads arriving meanwhile are answered `BUSY`.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
