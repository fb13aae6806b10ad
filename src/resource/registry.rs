//! Version Registry - Map operations to version-gated implementations
//!
//! Each manager module declares the request shape of its version-gated
//! operations once, through [`RegistryBuilder`]. The builder validates and
//! freezes the table; afterwards it is only read, on every dispatch.

use crate::api::versions::{ApiVersion, ApiVersioned, VersionWindow};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

/// One registered implementation of a logical operation
#[derive(Debug, Clone)]
pub struct VersionedMethod<T> {
    pub name: String,
    pub window: VersionWindow,
    pub experimental: bool,
    pub func: T,
}

impl<T> VersionedMethod<T> {
    pub fn new(name: impl Into<String>, window: VersionWindow, func: T) -> Self {
        Self {
            name: name.into(),
            window,
            experimental: false,
            func,
        }
    }

    /// Mark requests made through this implementation as experimental
    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }
}

/// Collects registrations before the registry is frozen
#[derive(Debug)]
pub struct RegistryBuilder<T> {
    methods: HashMap<String, Vec<VersionedMethod<T>>>,
}

impl<T> Default for RegistryBuilder<T> {
    fn default() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }
}

impl<T> RegistryBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another implementation under the method's name
    pub fn add(&mut self, method: VersionedMethod<T>) -> &mut Self {
        self.methods
            .entry(method.name.clone())
            .or_default()
            .push(method);
        self
    }

    /// Register `func` for `name` over the version strings `start..=end`
    pub fn register(
        &mut self,
        name: &str,
        start: &str,
        end: Option<&str>,
        func: T,
    ) -> Result<&mut Self> {
        let window = VersionWindow::parse(start, end)?;
        Ok(self.add(VersionedMethod::new(name, window, func)))
    }

    /// Same as [`register`](Self::register) for an experimental implementation
    pub fn register_experimental(
        &mut self,
        name: &str,
        start: &str,
        end: Option<&str>,
        func: T,
    ) -> Result<&mut Self> {
        let window = VersionWindow::parse(start, end)?;
        Ok(self.add(VersionedMethod::new(name, window, func).experimental()))
    }

    /// Validate and freeze the registry
    ///
    /// Windows are ordered by start; any two windows under one name that
    /// intersect are rejected.
    pub fn build(self) -> Result<VersionRegistry<T>> {
        let mut methods = self.methods;

        for (name, list) in methods.iter_mut() {
            // Unbounded starts (None) sort first
            list.sort_by_key(|m| m.window.start);

            for (i, earlier) in list.iter().enumerate() {
                if let Some(later) = list[i + 1..]
                    .iter()
                    .find(|m| m.window.overlaps(&earlier.window))
                {
                    return Err(Error::OverlappingVersions {
                        method: name.clone(),
                        first: earlier.window,
                        second: later.window,
                    });
                }
            }
        }

        Ok(VersionRegistry { methods })
    }
}

/// Frozen map from operation name to its version windows
#[derive(Debug)]
pub struct VersionRegistry<T> {
    methods: HashMap<String, Vec<VersionedMethod<T>>>,
}

impl<T> VersionRegistry<T> {
    /// Select the implementation whose window contains `version`
    ///
    /// Windows are scanned in ascending start order and the first match wins;
    /// `build` guarantees there is at most one.
    pub fn resolve(&self, name: &str, version: ApiVersion) -> Result<&VersionedMethod<T>> {
        self.methods
            .get(name)
            .and_then(|list| list.iter().find(|m| m.window.contains(version)))
            .ok_or_else(|| Error::VersionNotFoundForApiMethod {
                method: name.to_string(),
                version,
            })
    }

    /// Resolve `name` against the version the caller negotiated
    pub fn dispatch(&self, name: &str, caller: &impl ApiVersioned) -> Result<&VersionedMethod<T>> {
        let version = caller.api_version();
        let method = self.resolve(name, version)?;
        tracing::debug!(
            "dispatch {} at {} -> {} (experimental={})",
            name,
            version,
            method.window,
            method.experimental
        );
        Ok(method)
    }

    /// All windows registered for `name`, in resolution order
    pub fn methods(&self, name: &str) -> &[VersionedMethod<T>] {
        self.methods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All registered operation names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Request shape selected for a version-gated operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The manager's own request for this operation; only gated by version
    Standard,
    /// Named action posted to `<collection>/<id>/action`
    Action(&'static str),
    /// POST to a path; `{id}` is replaced with the target's id
    Post(&'static str),
}

/// Global registry for the built-in managers
static REGISTRY: OnceLock<VersionRegistry<Route>> = OnceLock::new();

/// Get the built-in registry (populated and validated on first access)
pub fn registry() -> &'static VersionRegistry<Route> {
    REGISTRY.get_or_init(|| {
        build_registry()
            .unwrap_or_else(|e| panic!("Failed to build the API version registry: {}", e))
    })
}

/// Register every manager's operations exactly once and freeze the result
pub fn build_registry() -> Result<VersionRegistry<Route>> {
    let mut builder = RegistryBuilder::new();
    super::shares::register(&mut builder)?;
    super::share_groups::register(&mut builder)?;
    super::share_group_replicas::register(&mut builder)?;
    super::share_group_instances::register(&mut builder)?;
    super::share_group_snapshot_instances::register(&mut builder)?;
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    fn impl_a() -> &'static str {
        "implA"
    }

    fn impl_b() -> &'static str {
        "implB"
    }

    fn resize_registry() -> VersionRegistry<fn() -> &'static str> {
        let mut builder: RegistryBuilder<fn() -> &'static str> = RegistryBuilder::new();
        builder
            .register("resize", "1.0", Some("2.6"), impl_a)
            .unwrap()
            .register("resize", "2.7", None, impl_b)
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_dispatch_routes_by_caller_version() {
        let registry = resize_registry();

        let at_2_7 = registry.dispatch("resize", &v("2.7")).unwrap();
        assert_eq!((at_2_7.func)(), "implB");

        let at_1_5 = registry.dispatch("resize", &v("1.5")).unwrap();
        assert_eq!((at_1_5.func)(), "implA");

        let at_0_9 = registry.dispatch("resize", &v("0.9"));
        assert!(matches!(
            at_0_9,
            Err(Error::VersionNotFoundForApiMethod { ref method, version })
                if method == "resize" && version == v("0.9")
        ));
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let registry = resize_registry();
        assert_eq!((registry.resolve("resize", v("2.6")).unwrap().func)(), "implA");
        assert_eq!((registry.resolve("resize", v("1.0")).unwrap().func)(), "implA");
        assert_eq!((registry.resolve("resize", v("9.0")).unwrap().func)(), "implB");
    }

    #[test]
    fn test_unknown_operation_is_version_not_found() {
        let registry = resize_registry();
        assert!(matches!(
            registry.resolve("grow", v("2.7")),
            Err(Error::VersionNotFoundForApiMethod { .. })
        ));
    }

    #[test]
    fn test_overlapping_windows_are_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("resize", "2.7", None, 2)
            .unwrap()
            .register("resize", "1.0", Some("2.7"), 1)
            .unwrap();

        match builder.build() {
            Err(Error::OverlappingVersions { method, first, second }) => {
                assert_eq!(method, "resize");
                assert_eq!(first.to_string(), "[1.0, 2.7]");
                assert_eq!(second.to_string(), "[2.7, ..)");
            }
            other => panic!("expected overlap error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_adjacent_overlap_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("op", "1.0", Some("3.0"), 'a')
            .unwrap()
            .register("op", "1.5", Some("1.6"), 'b')
            .unwrap()
            .register("op", "2.0", Some("2.1"), 'c')
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(Error::OverlappingVersions { .. })
        ));
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("op", "2.7", None, "current")
            .unwrap()
            .register("op", "1.0", Some("2.6"), "legacy")
            .unwrap();
        let registry = builder.build().unwrap();

        let windows: Vec<_> = registry.methods("op").iter().map(|m| m.func).collect();
        assert_eq!(windows, vec!["legacy", "current"]);
        assert_eq!(registry.resolve("op", v("2.0")).unwrap().func, "legacy");
    }

    #[test]
    fn test_same_window_under_different_names_is_allowed() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("shares.extend", "2.7", None, 1)
            .unwrap()
            .register("share_groups.extend", "2.7", None, 2)
            .unwrap();
        let registry = builder.build().unwrap();
        assert_eq!(registry.names(), vec!["share_groups.extend", "shares.extend"]);
    }

    #[test]
    fn test_experimental_flag_is_per_window() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_experimental("op", "2.31", Some("2.54"), ())
            .unwrap()
            .register("op", "2.55", None, ())
            .unwrap();
        let registry = builder.build().unwrap();
        assert!(registry.resolve("op", v("2.40")).unwrap().experimental);
        assert!(!registry.resolve("op", v("2.55")).unwrap().experimental);
    }

    #[test]
    fn test_malformed_registration_is_invalid_input() {
        let mut builder = RegistryBuilder::new();
        assert!(matches!(
            builder.register("op", "two.seven", None, ()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_builtin_registry_builds() {
        let registry = build_registry().expect("built-in windows must not overlap");
        assert!(!registry.names().is_empty());
    }

    #[test]
    fn test_builtin_share_actions_switch_names_at_2_7() {
        let registry = registry();
        let legacy = registry.resolve("shares.extend", v("2.6")).unwrap();
        let current = registry.resolve("shares.extend", v("2.7")).unwrap();
        assert_eq!(legacy.func, Route::Action("os-extend"));
        assert_eq!(current.func, Route::Action("extend"));
    }

    #[test]
    fn test_builtin_migrate_requires_2_5() {
        assert!(matches!(
            registry().resolve("shares.migrate_share", v("2.4")),
            Err(Error::VersionNotFoundForApiMethod { .. })
        ));
        assert_eq!(
            registry().resolve("shares.migrate_share", v("2.5")).unwrap().func,
            Route::Action("os-migrate_share")
        );
    }

    #[test]
    fn test_builtin_instance_operations_are_experimental_from_2_56() {
        for name in [
            "share_group_instances.force_delete",
            "share_group_snapshot_instances.reset_state",
            "share_group_replicas.promote",
        ] {
            assert!(registry().resolve(name, v("2.55")).is_err(), "{}", name);
            let method = registry().resolve(name, v("2.56")).unwrap();
            assert!(method.experimental, "{}", name);
        }
        let early = registry()
            .resolve("share_group_replicas.reset_replica_state", v("2.11"))
            .unwrap();
        assert_eq!(early.func, Route::Action("reset_replica_state"));
    }
}
