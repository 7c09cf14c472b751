//! # Echo Service
//!
//! Schema crate for the `echo.Echo` service. It compiles `proto/echo.proto` and exposes:
//!
//! * [`FILE_DESCRIPTOR_SET`]: the encoded descriptor set that `echo-server` decodes at runtime
//!   to transcode messages by name, and registers with the reflection service.
//! * [`pb`]: the generated message types and the typed [`EchoClient`], used to talk to the server
//!   in tests.

pub mod pb {
    include!(concat!(env!("OUT_DIR"), "/echo.rs"));
}

pub use pb::echo_client::EchoClient;
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");
