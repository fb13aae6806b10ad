//! Shares
//!
//! Most share actions were renamed at API 2.7 (`os-extend` became `extend`,
//! and so on); those are registered as a legacy window [1.0, 2.6] and a
//! current window [2.7, ..).

use super::manager::{
    build_query_string, envelope, take_key, ListOptions, Manager, Resource, ResourceId,
    ResourceKind,
};
use super::registry::{RegistryBuilder, Route};
use crate::api::client::Client;
use crate::api::http::RequestOptions;
use crate::error::{Error, Result};
use crate::utils::validate_access;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const KIND: ResourceKind = ResourceKind {
    name: "shares",
    path: "/shares",
    singular: "share",
    plural: "shares",
};

pub const SHARE_SORT_KEY_VALUES: &[&str] = &[
    "id",
    "status",
    "size",
    "host",
    "share_proto",
    "export_location",
    "availability_zone",
    "user_id",
    "project_id",
    "created_at",
    "updated_at",
    "display_name",
    "name",
    "share_type_id",
    "share_type",
    "share_network_id",
    "share_network",
    "snapshot_id",
    "snapshot",
];

const SORT_KEY_ALIASES: &[(&str, &str)] = &[
    ("share_type", "share_type_id"),
    ("snapshot", "snapshot_id"),
    ("share_network", "share_network_id"),
];

/// Actions whose name lost its `os-` prefix at 2.7: (operation, legacy, current)
const RENAMED_ACTIONS: &[(&str, &str, &str)] = &[
    ("force_delete", "os-force_delete", "force_delete"),
    ("allow", "os-allow_access", "allow_access"),
    ("deny", "os-deny_access", "deny_access"),
    ("access_list", "os-access_list", "access_list"),
    ("reset_state", "os-reset_status", "reset_status"),
    ("extend", "os-extend", "extend"),
    ("shrink", "os-shrink", "shrink"),
];

pub(crate) fn register(registry: &mut RegistryBuilder<Route>) -> Result<()> {
    for &(op, legacy, current) in RENAMED_ACTIONS {
        let name = KIND.operation(op);
        registry
            .register(&name, "1.0", Some("2.6"), Route::Action(legacy))?
            .register(&name, "2.7", None, Route::Action(current))?;
    }

    let migrate = KIND.operation("migrate_share");
    registry
        .register(&migrate, "2.5", Some("2.6"), Route::Action("os-migrate_share"))?
        .register(&migrate, "2.7", None, Route::Action("migrate_share"))?;

    let manage = KIND.operation("manage");
    registry
        .register(&manage, "1.0", Some("2.6"), Route::Post("/os-share-manage"))?
        .register(&manage, "2.7", None, Route::Post("/shares/manage"))?;

    let unmanage = KIND.operation("unmanage");
    registry
        .register(&unmanage, "1.0", Some("2.6"), Route::Post("/os-share-unmanage/{id}/unmanage"))?
        .register(&unmanage, "2.7", None, Route::Action("unmanage"))?;

    Ok(())
}

/// A shared filesystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub share_proto: Option<String>,
    #[serde(default)]
    pub share_type: Option<String>,
    #[serde(default)]
    pub share_network_id: Option<String>,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Share {
    /// Creation time, when the service reported a parseable timestamp
    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

impl Resource for Share {
    fn id(&self) -> &str {
        &self.id
    }

    fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl ResourceId for Share {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// One physical instance of a share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareInstance {
    pub id: String,
    #[serde(default)]
    pub share_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub share_network_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for ShareInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}

impl ResourceId for ShareInstance {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// An access rule granted on a share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    pub id: String,
    #[serde(default)]
    pub access_type: Option<String>,
    #[serde(default)]
    pub access_to: Option<String>,
    #[serde(default)]
    pub access_level: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceId for AccessRule {
    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Body of a create request
///
/// Every key is sent; unset optional fields go out as `null`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShareCreate {
    pub share_proto: String,
    pub size: u64,
    pub snapshot_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
    #[serde(rename = "share_network_id")]
    pub share_network: Option<String>,
    pub share_type: Option<String>,
    pub is_public: bool,
    pub availability_zone: Option<String>,
    pub consistency_group_id: Option<String>,
}

impl ShareCreate {
    pub fn new(share_proto: &str, size: u64) -> Self {
        Self {
            share_proto: share_proto.to_string(),
            size,
            ..Self::default()
        }
    }
}

/// Body of a manage request for a share that already exists on a backend
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManageShare {
    pub service_host: String,
    pub protocol: String,
    pub export_path: String,
    pub driver_options: BTreeMap<String, String>,
    pub share_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Manage [`Share`] resources
pub struct ShareManager<'a> {
    base: Manager<'a>,
}

impl<'a> ShareManager<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            base: Manager::new(client, KIND),
        }
    }

    pub async fn create(&self, share: &ShareCreate) -> Result<Share> {
        let body = envelope(KIND.singular, share)?;
        self.base
            .create(KIND.path, &body, KIND.singular, RequestOptions::default())
            .await
    }

    pub async fn get(&self, share: &(impl ResourceId + ?Sized)) -> Result<Share> {
        let path = KIND.resource_path(share.resource_id());
        self.base
            .get(&path, KIND.singular, RequestOptions::default())
            .await
    }

    /// Re-fetch `share` and replace it wholesale
    pub async fn refresh(&self, share: &mut Share) -> Result<()> {
        let fresh = self.get(share.id.as_str()).await?;
        *share = fresh;
        Ok(())
    }

    /// Update fields of a share; `None` when there was nothing to send
    pub async fn update(
        &self,
        share: &(impl ResourceId + ?Sized),
        fields: Map<String, Value>,
    ) -> Result<Option<Share>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let body = envelope(KIND.singular, &fields)?;
        let path = KIND.resource_path(share.resource_id());
        self.base
            .update(&path, &body, KIND.singular, RequestOptions::default())
            .await
            .map(Some)
    }

    pub async fn list(&self, options: ListOptions) -> Result<Vec<Share>> {
        let detailed = options.detailed;
        let mut search_opts =
            options.into_search_opts(SHARE_SORT_KEY_VALUES, SORT_KEY_ALIASES)?;
        if !search_opts.contains_key("is_public") {
            search_opts.insert("is_public", true);
        }

        let path = KIND.list_path(detailed, &build_query_string(&search_opts));
        self.base
            .list(&path, KIND.plural, RequestOptions::default())
            .await
    }

    pub async fn delete(
        &self,
        share: &(impl ResourceId + ?Sized),
        consistency_group_id: Option<&str>,
    ) -> Result<()> {
        let mut path = KIND.resource_path(share.resource_id());
        if let Some(group) = consistency_group_id.filter(|g| !g.is_empty()) {
            path.push_str(&format!(
                "?consistency_group_id={}",
                urlencoding::encode(group)
            ));
        }
        self.base.delete(&path, RequestOptions::default()).await
    }

    /// Delete a share regardless of its current state
    pub async fn force_delete(&self, share: &(impl ResourceId + ?Sized)) -> Result<()> {
        let call = self.base.resolve("force_delete")?;
        self.base.execute(call, share.resource_id(), None).await?;
        Ok(())
    }

    pub async fn migrate_share(
        &self,
        share: &(impl ResourceId + ?Sized),
        host: &str,
        force_host_copy: bool,
    ) -> Result<()> {
        let call = self.base.resolve("migrate_share")?;
        let info = json!({ "host": host, "force_host_copy": force_host_copy });
        self.base
            .execute(call, share.resource_id(), Some(info))
            .await?;
        Ok(())
    }

    /// Bring a share that exists on a backend under management
    pub async fn manage(&self, request: &ManageShare) -> Result<Share> {
        let call = self.base.resolve("manage")?;
        let Route::Post(path) = call.route else {
            return Err(Error::invalid_input("manage is only available as a POST"));
        };
        let body = envelope(KIND.singular, request)?;
        self.base
            .create(path, &body, KIND.singular, call.options)
            .await
    }

    pub async fn unmanage(&self, share: &(impl ResourceId + ?Sized)) -> Result<()> {
        let call = self.base.resolve("unmanage")?;
        self.base.execute(call, share.resource_id(), None).await?;
        Ok(())
    }

    /// Grant access to a share and return the new rule
    ///
    /// The rule is validated locally first; invalid rules never reach the service.
    pub async fn allow(
        &self,
        share: &(impl ResourceId + ?Sized),
        access_type: &str,
        access: &str,
        access_level: Option<&str>,
    ) -> Result<AccessRule> {
        validate_access(access_type, access)?;

        let call = self.base.resolve("allow")?;
        let mut info = json!({ "access_type": access_type, "access_to": access });
        if let Some(level) = access_level.filter(|l| !l.is_empty()) {
            info["access_level"] = json!(level);
        }

        let response = self
            .base
            .execute(call, share.resource_id(), Some(info))
            .await?;
        take_key(response.body, "access")
    }

    pub async fn deny(
        &self,
        share: &(impl ResourceId + ?Sized),
        access_id: &(impl ResourceId + ?Sized),
    ) -> Result<()> {
        let call = self.base.resolve("deny")?;
        let info = json!({ "access_id": access_id.resource_id() });
        self.base
            .execute(call, share.resource_id(), Some(info))
            .await?;
        Ok(())
    }

    pub async fn access_list(&self, share: &(impl ResourceId + ?Sized)) -> Result<Vec<AccessRule>> {
        let call = self.base.resolve("access_list")?;
        let response = self.base.execute(call, share.resource_id(), None).await?;
        let rules: Option<Vec<AccessRule>> = take_key(response.body, "access_list")?;
        Ok(rules.unwrap_or_default())
    }

    /// Ask the service to set the share's status; transitions are not checked here
    pub async fn reset_state(&self, share: &(impl ResourceId + ?Sized), state: &str) -> Result<()> {
        let call = self.base.resolve("reset_state")?;
        self.base
            .execute(call, share.resource_id(), Some(json!({ "status": state })))
            .await?;
        Ok(())
    }

    pub async fn extend(&self, share: &(impl ResourceId + ?Sized), new_size: u64) -> Result<()> {
        let call = self.base.resolve("extend")?;
        self.base
            .execute(call, share.resource_id(), Some(json!({ "new_size": new_size })))
            .await?;
        Ok(())
    }

    pub async fn shrink(&self, share: &(impl ResourceId + ?Sized), new_size: u64) -> Result<()> {
        let call = self.base.resolve("shrink")?;
        self.base
            .execute(call, share.resource_id(), Some(json!({ "new_size": new_size })))
            .await?;
        Ok(())
    }

    pub async fn get_metadata(
        &self,
        share: &(impl ResourceId + ?Sized),
    ) -> Result<BTreeMap<String, String>> {
        let path = metadata_path(share.resource_id());
        self.base
            .get(&path, "metadata", RequestOptions::default())
            .await
    }

    /// Set or update the given metadata keys
    pub async fn set_metadata(
        &self,
        share: &(impl ResourceId + ?Sized),
        metadata: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let path = metadata_path(share.resource_id());
        let body = json!({ "metadata": metadata });
        self.base
            .create(&path, &body, "metadata", RequestOptions::default())
            .await
    }

    /// Replace all metadata of a share
    pub async fn update_all_metadata(
        &self,
        share: &(impl ResourceId + ?Sized),
        metadata: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let path = metadata_path(share.resource_id());
        let body = json!({ "metadata": metadata });
        self.base
            .update(&path, &body, "metadata", RequestOptions::default())
            .await
    }

    /// Remove metadata keys, one request per key, stopping at the first failure
    pub async fn delete_metadata(
        &self,
        share: &(impl ResourceId + ?Sized),
        keys: &[&str],
    ) -> Result<()> {
        let base_path = metadata_path(share.resource_id());
        for key in keys {
            let path = format!("{}/{}", base_path, urlencoding::encode(key));
            self.base.delete(&path, RequestOptions::default()).await?;
        }
        Ok(())
    }

    pub async fn list_instances(
        &self,
        share: &(impl ResourceId + ?Sized),
    ) -> Result<Vec<ShareInstance>> {
        let path = format!("{}/instances", KIND.resource_path(share.resource_id()));
        self.base
            .list(&path, "share_instances", RequestOptions::default())
            .await
    }
}

fn metadata_path(id: &str) -> String {
    format!("{}/metadata", KIND.resource_path(id))
}

/// Parse the service's `2016-03-25T10:48:15.000000` timestamps
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_keeps_unknown_fields() {
        let share: Share = serde_json::from_value(json!({
            "id": "1234",
            "name": "docs",
            "size": 10,
            "status": "available",
            "export_locations": ["10.0.0.1:/share"],
            "has_replicas": false
        }))
        .unwrap();

        assert_eq!(share.id(), "1234");
        assert_eq!(share.size, Some(10));
        assert_eq!(share.attr("export_locations"), Some(json!(["10.0.0.1:/share"])));
        assert_eq!(share.attr("status"), Some(json!("available")));
        assert_eq!(share.attr("description"), None);
        assert!(share.extra.contains_key("has_replicas"));
    }

    #[test]
    fn test_create_body_sends_unset_fields_as_null() {
        let mut request = ShareCreate::new("NFS", 1);
        request.name = Some("docs".into());
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["share_proto"], "NFS");
        assert_eq!(body["name"], "docs");
        assert_eq!(body["metadata"], json!({}));
        assert_eq!(body["is_public"], false);
        assert!(body.get("snapshot_id").unwrap().is_null());
        assert!(body.get("share_network_id").unwrap().is_null());
        assert!(body.get("consistency_group_id").unwrap().is_null());
    }

    #[test]
    fn test_created_timestamp_parsing() {
        let share: Share = serde_json::from_value(json!({
            "id": "1",
            "created_at": "2016-03-25T10:48:15.000000"
        }))
        .unwrap();
        let created = share.created().unwrap();
        assert_eq!(created.format("%Y-%m-%d %H:%M").to_string(), "2016-03-25 10:48");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_every_renamed_action_has_both_windows() {
        let registry = crate::resource::registry::registry();
        for &(op, legacy, current) in RENAMED_ACTIONS {
            let name = KIND.operation(op);
            let methods = registry.methods(&name);
            assert_eq!(methods.len(), 2, "{}", name);
            assert_eq!(methods[0].func, Route::Action(legacy));
            assert_eq!(methods[1].func, Route::Action(current));
        }
    }
}
