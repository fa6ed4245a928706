//! Domain models shared by the stores, the token codec and the API layer.

pub mod auth;
