// ABOUTME: containerd-family backends: direct gRPC and Colima's SSH-mediated
// ABOUTME: nerdctl, plus the hand-built OCI spec they share.

mod colima;
mod direct;
pub mod oci;

pub use colima::ColimaRuntime;
pub use direct::ContainerdRuntime;
