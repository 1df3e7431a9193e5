//! RTP payloaders for the Moonlight/GameStream wire protocol.
//!
//! This crate turns encoded elementary frames (H.264/H.265 NAL units, Opus
//! packets) into the exact sequence of UDP datagrams a Moonlight client
//! expects: RTP-framed, Moonlight-headered, Reed-Solomon protected, and (for
//! audio) AES-128-CBC encrypted.
//!
//! It does not touch sockets, encoders, or session negotiation. Callers feed
//! [`VideoPayloader::push_frame`] / [`AudioPayloader::push_packet`] one
//! encoded unit at a time and get back the shards to send, in order.
//!
//! Call [`fec::init`] once before constructing any payloader.

pub mod audio;
mod bytes;
mod crypto;
pub mod error;
pub mod fec;
mod iv;
mod rtp;
pub mod video;

pub use audio::{AudioConfig, AudioPayloader};
pub use error::PayloadError;
pub use video::{VideoConfig, VideoPayloader};
