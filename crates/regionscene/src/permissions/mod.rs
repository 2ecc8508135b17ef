//! Inputs of the authorization engine: server parameters, estate and region
//! records, and group membership.
//!
//! The checks themselves live on [`crate::scene::Scene`].

mod estate;
mod groups;
mod server_params;

pub use estate::{EstateInfo, RegionInfo, RegionSettings};
pub use groups::{GroupPowers, GroupsService, InMemoryGroups};
pub use server_params::{ServerParam, ServerParamValues, ServerParams};
