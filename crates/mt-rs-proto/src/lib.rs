//! Wire types and packet definitions for the voxel game network protocol.

pub mod codec;
pub mod error;
pub mod inventory;
pub mod packets;
pub mod types;
