//! Per-call options values, the option functions that mutate them,
//! and their conversion into wire parameters.
//!
//! Options are accumulated in two distinct steps:
//! 1. every [`ApplyOption`] is applied, left to right, to a fresh default value
//! 2. the final value is frozen into query parameters ([`QueryParams`]) or a request body
use std::collections::BTreeMap;

use crate::{patch::PatchType, request::Error};
use serde::Serialize;

/// A single mutation of an options value
///
/// Implemented for every closure `Fn(&mut O)`, for the named option functions in this module,
/// and for the options structs themselves (set fields override).
pub trait ApplyOption<O>: Send + Sync {
    /// Apply this option to the options value
    fn apply_to(&self, opts: &mut O);
}

impl<O, F> ApplyOption<O> for F
where
    F: Fn(&mut O) + Send + Sync,
{
    fn apply_to(&self, opts: &mut O) {
        self(opts)
    }
}

/// Accumulation of option functions into an options value
pub trait ApplyOptions: Default + Sized {
    /// Apply every option in order, later options win
    fn apply_options(&mut self, opts: &[&dyn ApplyOption<Self>]) -> &mut Self {
        for opt in opts {
            opt.apply_to(self);
        }
        self
    }

    /// Build a fresh options value from a sequence of option functions
    fn from_options(opts: &[&dyn ApplyOption<Self>]) -> Self {
        let mut value = Self::default();
        value.apply_options(opts);
        value
    }
}

/// Conversion of a finished options value into query parameters
pub trait QueryParams {
    /// Reject values the API server would refuse
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Append the wire representation to a query string serializer
    fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>);
}

fn validate_field_manager(field_manager: &Option<String>, ctx: &str) -> Result<(), Error> {
    if let Some(field_manager) = field_manager {
        // Implement the easy part of validation, the API server rejects the rest
        if field_manager.len() > 128 {
            return Err(Error::Validation(format!("Failed to validate {ctx}::field_manager!")));
        }
    }
    Ok(())
}

/// Options for create calls
#[derive(Default, Clone, Debug, PartialEq)]
pub struct CreateOptions {
    /// Whether to run this as a dry run
    pub dry_run: bool,
    /// fieldManager is a name of the actor that is making changes
    pub field_manager: Option<String>,
}

impl ApplyOptions for CreateOptions {}

impl ApplyOption<CreateOptions> for CreateOptions {
    fn apply_to(&self, opts: &mut CreateOptions) {
        if self.dry_run {
            opts.dry_run = true;
        }
        if let Some(fm) = &self.field_manager {
            opts.field_manager = Some(fm.clone());
        }
    }
}

impl QueryParams for CreateOptions {
    fn validate(&self) -> Result<(), Error> {
        validate_field_manager(&self.field_manager, "CreateOptions")
    }

    fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if let Some(fm) = &self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
    }
}

/// Options for update calls
#[derive(Default, Clone, Debug, PartialEq)]
pub struct UpdateOptions {
    /// Whether to run this as a dry run
    pub dry_run: bool,
    /// fieldManager is a name of the actor that is making changes
    pub field_manager: Option<String>,
}

impl ApplyOptions for UpdateOptions {}

impl ApplyOption<UpdateOptions> for UpdateOptions {
    fn apply_to(&self, opts: &mut UpdateOptions) {
        if self.dry_run {
            opts.dry_run = true;
        }
        if let Some(fm) = &self.field_manager {
            opts.field_manager = Some(fm.clone());
        }
    }
}

impl QueryParams for UpdateOptions {
    fn validate(&self) -> Result<(), Error> {
        validate_field_manager(&self.field_manager, "UpdateOptions")
    }

    fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if let Some(fm) = &self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
    }
}

/// The validation directive to use for `fieldValidation` when using server-side apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationDirective {
    /// Strict mode will fail any invalid manifests.
    Strict,
    /// Warn mode will return a warning for invalid manifests.
    Warn,
    /// Ignore mode will silently ignore any problems.
    Ignore,
}

impl ValidationDirective {
    /// Returns the string format of the directive
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Warn => "Warn",
            Self::Ignore => "Ignore",
        }
    }
}

/// Options for patch calls
#[derive(Default, Clone, Debug, PartialEq)]
pub struct PatchOptions {
    /// Whether to run this as a dry run
    pub dry_run: bool,
    /// Force apply requests. Applicable only to [`PatchType::Apply`].
    pub force: bool,
    /// fieldManager is a name of the actor that is making changes. Required for [`PatchType::Apply`].
    pub field_manager: Option<String>,
    /// The server-side validation directive to use.
    pub field_validation: Option<ValidationDirective>,
}

impl ApplyOptions for PatchOptions {}

impl ApplyOption<PatchOptions> for PatchOptions {
    fn apply_to(&self, opts: &mut PatchOptions) {
        if self.dry_run {
            opts.dry_run = true;
        }
        if self.force {
            opts.force = true;
        }
        if let Some(fm) = &self.field_manager {
            opts.field_manager = Some(fm.clone());
        }
        if let Some(fv) = self.field_validation {
            opts.field_validation = Some(fv);
        }
    }
}

impl PatchOptions {
    /// Validate against the type of patch that will be sent
    pub fn validate_for(&self, patch_type: PatchType) -> Result<(), Error> {
        validate_field_manager(&self.field_manager, "PatchOptions")?;
        if self.force && patch_type != PatchType::Apply {
            return Err(Error::Validation(
                "PatchOptions::force only works with apply patches".into(),
            ));
        }
        if patch_type == PatchType::Apply && self.field_manager.is_none() {
            return Err(Error::Validation(
                "PatchOptions::field_manager is required for apply patches".into(),
            ));
        }
        Ok(())
    }
}

impl QueryParams for PatchOptions {
    fn validate(&self) -> Result<(), Error> {
        validate_field_manager(&self.field_manager, "PatchOptions")
    }

    fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if self.dry_run {
            qp.append_pair("dryRun", "All");
        }
        if self.force {
            qp.append_pair("force", "true");
        }
        if let Some(fm) = &self.field_manager {
            qp.append_pair("fieldManager", fm);
        }
        if let Some(fv) = &self.field_validation {
            qp.append_pair("fieldValidation", fv.as_str());
        }
    }
}

/// Options for list calls
#[derive(Default, Clone, Debug, PartialEq)]
pub struct ListOptions {
    /// A selector to restrict the list of returned objects by their labels.
    pub label_selector: Option<String>,
    /// A selector to restrict the list of returned objects by their fields.
    pub field_selector: Option<String>,
    /// Restrict the list to a single namespace
    ///
    /// Ignored for cluster-scoped resources.
    pub namespace: Option<String>,
    /// Limit the number of results per page.
    pub limit: Option<u32>,
    /// Fetch the page after a previous limited list.
    pub continue_token: Option<String>,
    /// An explicit resourceVersion to list at
    pub resource_version: Option<String>,
}

impl ApplyOptions for ListOptions {}

impl ApplyOption<ListOptions> for ListOptions {
    fn apply_to(&self, opts: &mut ListOptions) {
        let ListOptions {
            label_selector,
            field_selector,
            namespace,
            limit,
            continue_token,
            resource_version,
        } = self.clone();
        opts.label_selector = label_selector.or(opts.label_selector.take());
        opts.field_selector = field_selector.or(opts.field_selector.take());
        opts.namespace = namespace.or(opts.namespace.take());
        opts.limit = limit.or(opts.limit);
        opts.continue_token = continue_token.or(opts.continue_token.take());
        opts.resource_version = resource_version.or(opts.resource_version.take());
    }
}

impl QueryParams for ListOptions {
    fn populate_qp(&self, qp: &mut form_urlencoded::Serializer<String>) {
        if let Some(fields) = &self.field_selector {
            qp.append_pair("fieldSelector", fields);
        }
        if let Some(labels) = &self.label_selector {
            qp.append_pair("labelSelector", labels);
        }
        if let Some(limit) = &self.limit {
            qp.append_pair("limit", &limit.to_string());
        }
        if let Some(continue_token) = &self.continue_token {
            qp.append_pair("continue", continue_token);
        } else if let Some(rv) = &self.resource_version {
            // a continue token already pins the version
            qp.append_pair("resourceVersion", rv);
        }
    }
}

/// Propagation policy when deleting single objects
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum PropagationPolicy {
    /// Orphan dependents
    Orphan,
    /// Allow the garbage collector to delete the dependents in the background
    Background,
    /// A cascading policy that deletes all dependents in the foreground
    Foreground,
}

/// Preconditions must be fulfilled before an operation (update, delete, etc.) is carried out.
#[derive(Default, Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preconditions {
    /// Specifies the target ResourceVersion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Specifies the target UID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// Options for delete calls, sent as the request body
#[derive(Default, Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    /// When present, indicates that modifications should not be persisted.
    #[serde(serialize_with = "dry_run_all_ser", skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,

    /// The duration in seconds before the object should be deleted.
    ///
    /// Zero means delete immediately, `None` uses the per-type default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_seconds: Option<i64>,

    /// Whether or how garbage collection is performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation_policy: Option<PropagationPolicy>,

    /// Conditions that must be fulfilled before a deletion is carried out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Preconditions>,
}

impl ApplyOptions for DeleteOptions {}

impl ApplyOption<DeleteOptions> for DeleteOptions {
    fn apply_to(&self, opts: &mut DeleteOptions) {
        if self.dry_run {
            opts.dry_run = true;
        }
        if let Some(gps) = self.grace_period_seconds {
            opts.grace_period_seconds = Some(gps);
        }
        if let Some(pp) = self.propagation_policy {
            opts.propagation_policy = Some(pp);
        }
        if let Some(pre) = &self.preconditions {
            opts.preconditions = Some(pre.clone());
        }
    }
}

impl DeleteOptions {
    /// Freeze into the JSON request body
    pub fn to_body(&self) -> Result<Vec<u8>, Error> {
        if let Some(gps) = self.grace_period_seconds {
            if gps < 0 {
                return Err(Error::Validation(
                    "DeleteOptions::grace_period_seconds must be non-negative".into(),
                ));
            }
        }
        serde_json::to_vec(self).map_err(Error::SerializeBody)
    }
}

// dryRun serialization differ when used as body parameters and query strings:
// body params allow only: missing field, or ["All"]
fn dry_run_all_ser<S>(t: &bool, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::ser::Serializer,
{
    use serde::ser::SerializeTuple;
    match t {
        true => {
            let mut map = s.serialize_tuple(1)?;
            map.serialize_element("All")?;
            map.end()
        }
        false => s.serialize_none(),
    }
}

// ------------------------------------------------------------------------
// option functions
// ------------------------------------------------------------------------

/// Run the request as a dry run, nothing is persisted
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunAll;

impl ApplyOption<CreateOptions> for DryRunAll {
    fn apply_to(&self, opts: &mut CreateOptions) {
        opts.dry_run = true;
    }
}

impl ApplyOption<UpdateOptions> for DryRunAll {
    fn apply_to(&self, opts: &mut UpdateOptions) {
        opts.dry_run = true;
    }
}

impl ApplyOption<PatchOptions> for DryRunAll {
    fn apply_to(&self, opts: &mut PatchOptions) {
        opts.dry_run = true;
    }
}

impl ApplyOption<DeleteOptions> for DryRunAll {
    fn apply_to(&self, opts: &mut DeleteOptions) {
        opts.dry_run = true;
    }
}

/// Set the field manager recorded for the changes
#[derive(Clone, Debug)]
pub struct FieldOwner(pub String);

impl FieldOwner {
    /// Field owner with the given manager name
    pub fn new(manager: impl Into<String>) -> Self {
        Self(manager.into())
    }
}

impl ApplyOption<CreateOptions> for FieldOwner {
    fn apply_to(&self, opts: &mut CreateOptions) {
        opts.field_manager = Some(self.0.clone());
    }
}

impl ApplyOption<UpdateOptions> for FieldOwner {
    fn apply_to(&self, opts: &mut UpdateOptions) {
        opts.field_manager = Some(self.0.clone());
    }
}

impl ApplyOption<PatchOptions> for FieldOwner {
    fn apply_to(&self, opts: &mut PatchOptions) {
        opts.field_manager = Some(self.0.clone());
    }
}

/// Force apply patches through field conflicts
#[derive(Clone, Copy, Debug, Default)]
pub struct ForceOwnership;

impl ApplyOption<PatchOptions> for ForceOwnership {
    fn apply_to(&self, opts: &mut PatchOptions) {
        opts.force = true;
    }
}

/// Restrict a list to one namespace
#[derive(Clone, Debug)]
pub struct InNamespace(pub String);

impl InNamespace {
    /// Namespace restriction
    pub fn new(ns: impl Into<String>) -> Self {
        Self(ns.into())
    }
}

impl ApplyOption<ListOptions> for InNamespace {
    fn apply_to(&self, opts: &mut ListOptions) {
        opts.namespace = Some(self.0.clone());
    }
}

fn equality_selector(pairs: &BTreeMap<String, String>) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Select objects whose labels match every pair
#[derive(Clone, Debug, Default)]
pub struct MatchingLabels(pub BTreeMap<String, String>);

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MatchingLabels {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl ApplyOption<ListOptions> for MatchingLabels {
    fn apply_to(&self, opts: &mut ListOptions) {
        opts.label_selector = Some(equality_selector(&self.0));
    }
}

/// Select objects whose fields match every pair
#[derive(Clone, Debug, Default)]
pub struct MatchingFields(pub BTreeMap<String, String>);

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MatchingFields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl ApplyOption<ListOptions> for MatchingFields {
    fn apply_to(&self, opts: &mut ListOptions) {
        opts.field_selector = Some(equality_selector(&self.0));
    }
}

/// Page size for list calls
#[derive(Clone, Copy, Debug)]
pub struct Limit(pub u32);

impl ApplyOption<ListOptions> for Limit {
    fn apply_to(&self, opts: &mut ListOptions) {
        opts.limit = Some(self.0);
    }
}

/// Continue a paginated list from a previous page
#[derive(Clone, Debug)]
pub struct Continue(pub String);

impl ApplyOption<ListOptions> for Continue {
    fn apply_to(&self, opts: &mut ListOptions) {
        opts.continue_token = Some(self.0.clone());
    }
}

/// Grace period before deletion, in seconds
#[derive(Clone, Copy, Debug)]
pub struct GracePeriodSeconds(pub i64);

impl ApplyOption<DeleteOptions> for GracePeriodSeconds {
    fn apply_to(&self, opts: &mut DeleteOptions) {
        opts.grace_period_seconds = Some(self.0);
    }
}

impl ApplyOption<DeleteOptions> for PropagationPolicy {
    fn apply_to(&self, opts: &mut DeleteOptions) {
        opts.propagation_policy = Some(*self);
    }
}

impl ApplyOption<DeleteOptions> for Preconditions {
    fn apply_to(&self, opts: &mut DeleteOptions) {
        opts.preconditions = Some(self.clone());
    }
}
