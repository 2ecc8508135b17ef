//! Local and grid-wide server parameters with override tracking.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A parameter with a grid-wide value that a region may shadow.
///
/// A local override wins over every later global update until it is
/// cleared. Assigning the same value locally and globally is not the same
/// thing: only the local assignment pins it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerParam<T> {
    #[default]
    Unset,
    Inherited(T),
    Overridden(T),
}

impl<T> ServerParam<T> {
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Unset => None,
            Self::Inherited(v) | Self::Overridden(v) => Some(v),
        }
    }

    #[must_use]
    pub fn is_overridden(&self) -> bool {
        matches!(self, Self::Overridden(_))
    }

    /// Ignored while a local override is in place.
    pub fn set_global(&mut self, value: T) {
        if !self.is_overridden() {
            *self = Self::Inherited(value);
        }
    }

    pub fn set_local(&mut self, value: T) {
        *self = Self::Overridden(value);
    }

    /// Drop the local override, falling back to `global` when known.
    pub fn clear_local(&mut self, global: Option<T>) {
        *self = global.map_or(Self::Unset, Self::Inherited);
    }
}

impl ServerParam<bool> {
    /// Unset toggles are off.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.value().copied().unwrap_or(false)
    }
}

/// One set of raw parameter values, as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerParamValues {
    pub estate_manager_is_god: Option<bool>,
    pub estate_owner_is_god: Option<bool>,
    pub region_owner_is_god: Option<bool>,
    pub god_agents: Option<Vec<Uuid>>,
}

/// The god-resolution toggles of a region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerParams {
    pub estate_manager_is_god: ServerParam<bool>,
    pub estate_owner_is_god: ServerParam<bool>,
    pub region_owner_is_god: ServerParam<bool>,
    pub god_agents: ServerParam<Vec<Uuid>>,
}

impl ServerParams {
    /// Build from grid-wide values, then apply the region's overrides.
    #[must_use]
    pub fn from_values(global: &ServerParamValues, local: &ServerParamValues) -> Self {
        let mut params = Self::default();
        params.apply_global(global);
        params.apply_local(local);
        params
    }

    pub fn apply_global(&mut self, values: &ServerParamValues) {
        if let Some(v) = values.estate_manager_is_god {
            self.estate_manager_is_god.set_global(v);
        }
        if let Some(v) = values.estate_owner_is_god {
            self.estate_owner_is_god.set_global(v);
        }
        if let Some(v) = values.region_owner_is_god {
            self.region_owner_is_god.set_global(v);
        }
        if let Some(v) = &values.god_agents {
            self.god_agents.set_global(v.clone());
        }
    }

    pub fn apply_local(&mut self, values: &ServerParamValues) {
        if let Some(v) = values.estate_manager_is_god {
            self.estate_manager_is_god.set_local(v);
        }
        if let Some(v) = values.estate_owner_is_god {
            self.estate_owner_is_god.set_local(v);
        }
        if let Some(v) = values.region_owner_is_god {
            self.region_owner_is_god.set_local(v);
        }
        if let Some(v) = &values.god_agents {
            self.god_agents.set_local(v.clone());
        }
    }

    #[must_use]
    pub fn is_god_agent(&self, agent: Uuid) -> bool {
        self.god_agents
            .value()
            .is_some_and(|agents| agents.contains(&agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_override_shadows_global() {
        let mut param = ServerParam::default();
        assert!(!param.enabled());

        param.set_global(true);
        assert_eq!(param, ServerParam::Inherited(true));

        param.set_local(false);
        param.set_global(true);
        // Later global updates do not replace an override.
        assert_eq!(param, ServerParam::Overridden(false));
        assert!(!param.enabled());

        param.clear_local(Some(true));
        assert!(param.enabled());
        param.clear_local(None);
        assert_eq!(param, ServerParam::Unset);
    }

    #[test]
    fn test_god_agent_lists() {
        let grid_god = Uuid::from_u128(1);
        let region_god = Uuid::from_u128(2);
        let params = ServerParams::from_values(
            &ServerParamValues {
                god_agents: Some(vec![grid_god]),
                estate_manager_is_god: Some(true),
                ..ServerParamValues::default()
            },
            &ServerParamValues {
                god_agents: Some(vec![region_god]),
                ..ServerParamValues::default()
            },
        );
        // The local list replaces the global one entirely.
        assert!(params.is_god_agent(region_god));
        assert!(!params.is_god_agent(grid_god));
        assert!(params.estate_manager_is_god.enabled());
        assert!(!params.estate_manager_is_god.is_overridden());
    }
}
