//! Share group instances

use super::manager::{
    build_query_string, ListOptions, Manager, Resource, ResourceId, ResourceKind,
};
use super::registry::{RegistryBuilder, Route};
use crate::api::client::Client;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const KIND: ResourceKind = ResourceKind {
    name: "share_group_instances",
    path: "/share-group-instances",
    singular: "share_group_instance",
    plural: "share_group_instances",
};

pub const SHARE_GROUP_INSTANCE_SORT_KEY_VALUES: &[&str] = &[
    "id",
    "status",
    "replica_state",
    "share_group_id",
    "share_network_id",
    "host",
    "availability_zone",
    "created_at",
    "updated_at",
];

pub(crate) fn register(registry: &mut RegistryBuilder<Route>) -> Result<()> {
    let operations = [
        ("get", Route::Standard),
        ("list", Route::Standard),
        ("force_delete", Route::Action("force_delete")),
        ("reset_state", Route::Action("reset_status")),
        ("reset_replica_state", Route::Action("reset_replica_state")),
    ];
    for (op, route) in operations {
        registry.register_experimental(&KIND.operation(op), "2.56", None, route)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareGroupInstance {
    pub id: String,
    #[serde(default)]
    pub share_group_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub replica_state: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub share_network_id: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for ShareGroupInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl ResourceId for ShareGroupInstance {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Manage [`ShareGroupInstance`] resources
pub struct ShareGroupInstanceManager<'a> {
    base: Manager<'a>,
}

impl<'a> ShareGroupInstanceManager<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            base: Manager::new(client, KIND),
        }
    }

    pub async fn get(
        &self,
        instance: &(impl ResourceId + ?Sized),
    ) -> Result<ShareGroupInstance> {
        let call = self.base.resolve("get")?;
        let path = KIND.resource_path(instance.resource_id());
        self.base.get(&path, KIND.singular, call.options).await
    }

    /// List instances, optionally only those of one share group
    pub async fn list(
        &self,
        share_group: Option<&(impl ResourceId + ?Sized)>,
        options: ListOptions,
    ) -> Result<Vec<ShareGroupInstance>> {
        let call = self.base.resolve("list")?;
        let detailed = options.detailed;
        let mut search_opts =
            options.into_search_opts(SHARE_GROUP_INSTANCE_SORT_KEY_VALUES, &[])?;
        if let Some(group) = share_group {
            search_opts.insert("share_group_id", group.resource_id());
        }

        let path = KIND.list_path(detailed, &build_query_string(&search_opts));
        self.base.list(&path, KIND.plural, call.options).await
    }

    pub async fn force_delete(&self, instance: &(impl ResourceId + ?Sized)) -> Result<()> {
        let call = self.base.resolve("force_delete")?;
        self.base.execute(call, instance.resource_id(), None).await?;
        Ok(())
    }

    pub async fn reset_state(
        &self,
        instance: &(impl ResourceId + ?Sized),
        state: &str,
    ) -> Result<()> {
        let call = self.base.resolve("reset_state")?;
        self.base
            .execute(call, instance.resource_id(), Some(json!({ "status": state })))
            .await?;
        Ok(())
    }

    pub async fn reset_replica_state(
        &self,
        instance: &(impl ResourceId + ?Sized),
        replica_state: &str,
    ) -> Result<()> {
        let call = self.base.resolve("reset_replica_state")?;
        self.base
            .execute(
                call,
                instance.resource_id(),
                Some(json!({ "replica_state": replica_state })),
            )
            .await?;
        Ok(())
    }
}
