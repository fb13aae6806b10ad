//! Share group replicas

use super::manager::{
    build_query_string, ListOptions, Manager, Resource, ResourceId, ResourceKind,
};
use super::registry::{RegistryBuilder, Route};
use crate::api::client::Client;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const KIND: ResourceKind = ResourceKind {
    name: "share_group_replicas",
    path: "/share-group-replicas",
    singular: "share_group_replica",
    plural: "share_group_replicas",
};

pub const SHARE_GROUP_REPLICA_SORT_KEY_VALUES: &[&str] = &[
    "id",
    "status",
    "replica_state",
    "share_group_id",
    "host",
    "availability_zone",
    "created_at",
    "updated_at",
];

pub(crate) fn register(registry: &mut RegistryBuilder<Route>) -> Result<()> {
    let operations = [
        ("create", Route::Standard),
        ("get", Route::Standard),
        ("list", Route::Standard),
        ("delete", Route::Standard),
        ("force_delete", Route::Action("force_delete")),
        ("reset_state", Route::Action("reset_status")),
        ("promote", Route::Action("promote")),
        ("resync", Route::Action("resync")),
    ];
    for (op, route) in operations {
        registry.register_experimental(&KIND.operation(op), "2.56", None, route)?;
    }

    registry.register_experimental(
        &KIND.operation("reset_replica_state"),
        "2.11",
        None,
        Route::Action("reset_replica_state"),
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareGroupReplica {
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
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for ShareGroupReplica {
    fn id(&self) -> &str {
        &self.id
    }

    fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl ResourceId for ShareGroupReplica {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Manage [`ShareGroupReplica`] resources
pub struct ShareGroupReplicaManager<'a> {
    base: Manager<'a>,
}

impl<'a> ShareGroupReplicaManager<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            base: Manager::new(client, KIND),
        }
    }

    /// Create a replica of `share_group`
    pub async fn create(
        &self,
        share_group: &(impl ResourceId + ?Sized),
    ) -> Result<ShareGroupReplica> {
        let call = self.base.resolve("create")?;
        let body = json!({ "share_group_replica": { "share_group_id": share_group.resource_id() } });
        self.base
            .create(KIND.path, &body, KIND.singular, call.options)
            .await
    }

    pub async fn get(
        &self,
        replica: &(impl ResourceId + ?Sized),
    ) -> Result<ShareGroupReplica> {
        let call = self.base.resolve("get")?;
        let path = KIND.resource_path(replica.resource_id());
        self.base.get(&path, KIND.singular, call.options).await
    }

    /// Re-fetch `replica` and replace it wholesale
    pub async fn refresh(&self, replica: &mut ShareGroupReplica) -> Result<()> {
        let fresh = self.get(replica.id.as_str()).await?;
        *replica = fresh;
        Ok(())
    }

    /// List replicas, optionally only those of one share group
    pub async fn list(
        &self,
        share_group: Option<&(impl ResourceId + ?Sized)>,
        options: ListOptions,
    ) -> Result<Vec<ShareGroupReplica>> {
        let call = self.base.resolve("list")?;
        let detailed = options.detailed;
        let mut search_opts =
            options.into_search_opts(SHARE_GROUP_REPLICA_SORT_KEY_VALUES, &[])?;
        if let Some(group) = share_group {
            search_opts.insert("share_group_id", group.resource_id());
        }

        let path = KIND.list_path(detailed, &build_query_string(&search_opts));
        self.base.list(&path, KIND.plural, call.options).await
    }

    /// Delete a replica; `force` posts `{"force_delete": null}` to the action path
    pub async fn delete(&self, replica: &(impl ResourceId + ?Sized), force: bool) -> Result<()> {
        let id = replica.resource_id();
        if force {
            let call = self.base.resolve("force_delete")?;
            self.base.execute(call, id, None).await?;
        } else {
            let call = self.base.resolve("delete")?;
            self.base.delete(&KIND.resource_path(id), call.options).await?;
        }
        Ok(())
    }

    /// Ask the service to set the replica's `status`
    pub async fn reset_state(&self, replica: &(impl ResourceId + ?Sized), state: &str) -> Result<()> {
        let call = self.base.resolve("reset_state")?;
        self.base
            .execute(call, replica.resource_id(), Some(json!({ "status": state })))
            .await?;
        Ok(())
    }

    pub async fn promote(&self, replica: &(impl ResourceId + ?Sized)) -> Result<()> {
        let call = self.base.resolve("promote")?;
        self.base.execute(call, replica.resource_id(), None).await?;
        Ok(())
    }

    pub async fn resync(&self, replica: &(impl ResourceId + ?Sized)) -> Result<()> {
        let call = self.base.resolve("resync")?;
        self.base.execute(call, replica.resource_id(), None).await?;
        Ok(())
    }

    /// Ask the service to set the replica's `replica_state`
    pub async fn reset_replica_state(
        &self,
        replica: &(impl ResourceId + ?Sized),
        replica_state: &str,
    ) -> Result<()> {
        let call = self.base.resolve("reset_replica_state")?;
        self.base
            .execute(
                call,
                replica.resource_id(),
                Some(json!({ "replica_state": replica_state })),
            )
            .await?;
        Ok(())
    }
}
