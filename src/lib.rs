//! redfish-authz - Redfish privilege-registry authorization engine
//!
//! Decides whether a user may perform a Redfish operation by classifying the
//! request path into a resource type and applying the DMTF Privilege Registry
//! rules for it, including property and subordinate overrides.

pub mod authz;
pub mod settings;
