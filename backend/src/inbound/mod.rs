//! Inbound adapters: the REST surface driving the booking ports.

pub mod http;
