//! Tag-identity lookups for EC2 resources.
//!
//! VPCs, subnets, internet gateways, NAT gateways, elastic IPs, route
//! tables and security groups have no globally unique names, so identity is
//! the tuple (kind, tag set). These lookups power idempotent creation: zero
//! matches means create, one match means adopt, more than one means the tag
//! namespace is corrupt and it is unsafe to proceed.

mod lookup;

pub use lookup::*;
