//! Share groups
//!
//! The share group API was experimental from 2.31 through 2.54 and became
//! stable at 2.55, so each operation carries two windows that differ only in
//! the experimental flag.

use super::manager::{
    build_query_string, envelope, ListOptions, Manager, Resource, ResourceId, ResourceKind,
};
use super::registry::{RegistryBuilder, Route};
use crate::api::client::Client;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const KIND: ResourceKind = ResourceKind {
    name: "share_groups",
    path: "/share-groups",
    singular: "share_group",
    plural: "share_groups",
};

pub const SHARE_GROUP_SORT_KEY_VALUES: &[&str] = &[
    "id",
    "name",
    "status",
    "host",
    "user_id",
    "project_id",
    "created_at",
    "availability_zone",
    "share_network",
    "share_network_id",
    "share_group_type",
    "share_group_type_id",
    "source_share_group_snapshot_id",
];

const SORT_KEY_ALIASES: &[(&str, &str)] = &[
    ("share_network", "share_network_id"),
    ("share_group_type", "share_group_type_id"),
];

const OPERATIONS: &[(&str, Route)] = &[
    ("create", Route::Standard),
    ("get", Route::Standard),
    ("update", Route::Standard),
    ("list", Route::Standard),
    ("delete", Route::Standard),
    ("force_delete", Route::Action("force_delete")),
    ("reset_state", Route::Action("reset_status")),
];

pub(crate) fn register(registry: &mut RegistryBuilder<Route>) -> Result<()> {
    for &(op, route) in OPERATIONS {
        let name = KIND.operation(op);
        registry
            .register_experimental(&name, "2.31", Some("2.54"), route)?
            .register(&name, "2.55", None, route)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareGroup {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub share_types: Option<Vec<String>>,
    #[serde(default)]
    pub share_group_type_id: Option<String>,
    #[serde(default)]
    pub share_network_id: Option<String>,
    #[serde(default)]
    pub source_share_group_snapshot_id: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for ShareGroup {
    fn id(&self) -> &str {
        &self.id
    }

    fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl ResourceId for ShareGroup {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Body of a create request; unset fields are sent as `null`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShareGroupCreate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub share_types: Option<Vec<String>>,
    pub share_group_type_id: Option<String>,
    pub share_network_id: Option<String>,
    pub source_share_group_snapshot_id: Option<String>,
    pub availability_zone: Option<String>,
}

/// Manage [`ShareGroup`] resources
pub struct ShareGroupManager<'a> {
    base: Manager<'a>,
}

impl<'a> ShareGroupManager<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            base: Manager::new(client, KIND),
        }
    }

    pub async fn create(&self, request: &ShareGroupCreate) -> Result<ShareGroup> {
        let call = self.base.resolve("create")?;
        let body = envelope(KIND.singular, request)?;
        self.base
            .create(KIND.path, &body, KIND.singular, call.options)
            .await
    }

    pub async fn get(&self, share_group: &(impl ResourceId + ?Sized)) -> Result<ShareGroup> {
        let call = self.base.resolve("get")?;
        let path = KIND.resource_path(share_group.resource_id());
        self.base.get(&path, KIND.singular, call.options).await
    }

    /// Update fields of a share group; `None` when there was nothing to send
    pub async fn update(
        &self,
        share_group: &(impl ResourceId + ?Sized),
        fields: Map<String, Value>,
    ) -> Result<Option<ShareGroup>> {
        let call = self.base.resolve("update")?;
        if fields.is_empty() {
            return Ok(None);
        }
        let body = envelope(KIND.singular, &fields)?;
        let path = KIND.resource_path(share_group.resource_id());
        self.base
            .update(&path, &body, KIND.singular, call.options)
            .await
            .map(Some)
    }

    pub async fn list(&self, options: ListOptions) -> Result<Vec<ShareGroup>> {
        let call = self.base.resolve("list")?;
        let detailed = options.detailed;
        let search_opts = options.into_search_opts(SHARE_GROUP_SORT_KEY_VALUES, SORT_KEY_ALIASES)?;
        let path = KIND.list_path(detailed, &build_query_string(&search_opts));
        self.base.list(&path, KIND.plural, call.options).await
    }

    /// Delete a share group; `force` posts a force-delete action instead
    pub async fn delete(&self, share_group: &(impl ResourceId + ?Sized), force: bool) -> Result<()> {
        let id = share_group.resource_id();
        if force {
            let call = self.base.resolve("force_delete")?;
            self.base.execute(call, id, None).await?;
        } else {
            let call = self.base.resolve("delete")?;
            self.base.delete(&KIND.resource_path(id), call.options).await?;
        }
        Ok(())
    }

    pub async fn reset_state(
        &self,
        share_group: &(impl ResourceId + ?Sized),
        state: &str,
    ) -> Result<()> {
        let call = self.base.resolve("reset_state")?;
        self.base
            .execute(call, share_group.resource_id(), Some(json!({ "status": state })))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::versions::ApiVersion;
    use crate::resource::registry::registry;

    #[test]
    fn test_share_groups_leave_experimental_at_2_55() {
        let registry = registry();
        let experimental = registry
            .resolve("share_groups.get", ApiVersion::new(2, 54))
            .unwrap();
        let stable = registry
            .resolve("share_groups.get", ApiVersion::new(2, 55))
            .unwrap();
        assert!(experimental.experimental);
        assert!(!stable.experimental);
        assert!(registry
            .resolve("share_groups.get", ApiVersion::new(2, 30))
            .is_err());
    }
}
