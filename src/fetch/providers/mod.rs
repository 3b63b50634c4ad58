// src/fetch/providers/mod.rs
pub mod direct;
pub mod proxy;
