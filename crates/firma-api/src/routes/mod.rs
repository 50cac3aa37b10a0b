//! # Route Modules
//!
//! - [`documents`] — document directory (desktop side, authenticated)
//! - [`sessions`] — signing-session lifecycle, split into a desktop
//!   router (authenticated) and a mobile router (code-authenticated)

pub mod documents;
pub mod sessions;
