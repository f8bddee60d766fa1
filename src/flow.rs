//! Versioned flow documents and the traversal contract used to rewrite them.
//!
//! Only the fields the rewrite walks through are typed. Everything else in a
//! document is carried in a flattened map and written back untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A record that references a registry by URL.
pub trait RegistryCoordinates {
    fn registry_url(&self) -> Option<&str>;
    fn set_registry_url(&mut self, url: String);
}

/// A node in a flow tree: optional coordinates plus any number of children of
/// the same type.
pub trait FlowNode: Sized {
    type Coordinates: RegistryCoordinates;

    fn children_mut(&mut self) -> &mut [Self];
    fn coordinates_mut(&mut self) -> Option<&mut Self::Coordinates>;
}

/// Applies `rewrite` to the registry URL of every node under `node`, children
/// before their parent. Coordinates without a URL are skipped.
pub fn rewrite_urls<N, F>(node: &mut N, rewrite: &F)
where
    N: FlowNode,
    F: Fn(&str) -> String,
{
    for child in node.children_mut() {
        rewrite_urls(child, rewrite);
    }

    if let Some(coordinates) = node.coordinates_mut() {
        if let Some(url) = coordinates.registry_url() {
            let url = rewrite(url);
            coordinates.set_registry_url(url);
        }
    }
}

/// `None` when the field is absent, `Some(None)` when it is `null`.
type Nullable<T> = Option<Option<T>>;

fn nullable<'de, T, D>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    pub flow_contents: ProcessGroup,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroup {
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    process_groups: Nullable<Vec<ProcessGroup>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    versioned_flow_coordinates: Nullable<FlowCoordinates>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowCoordinates {
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    registry_url: Nullable<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl FlowSnapshot {
    pub fn flow_contents_mut(&mut self) -> &mut ProcessGroup {
        &mut self.flow_contents
    }
}

impl ProcessGroup {
    pub fn with_coordinates(registry_url: impl Into<String>) -> Self {
        ProcessGroup {
            versioned_flow_coordinates: Some(Some(FlowCoordinates::new(registry_url))),
            ..ProcessGroup::default()
        }
    }

    pub fn process_groups(&self) -> &[ProcessGroup] {
        match &self.process_groups {
            Some(Some(groups)) => groups.as_slice(),
            _ => &[],
        }
    }

    pub fn push_group(&mut self, group: ProcessGroup) {
        match &mut self.process_groups {
            Some(Some(groups)) => groups.push(group),
            slot => *slot = Some(Some(vec![group])),
        }
    }

    pub fn coordinates(&self) -> Option<&FlowCoordinates> {
        self.versioned_flow_coordinates.as_ref().and_then(Option::as_ref)
    }

    pub fn registry_url(&self) -> Option<&str> {
        self.coordinates()
            .and_then(|coordinates| coordinates.registry_url())
    }
}

impl FlowCoordinates {
    pub fn new(registry_url: impl Into<String>) -> Self {
        FlowCoordinates {
            registry_url: Some(Some(registry_url.into())),
            other: Map::new(),
        }
    }
}

impl FlowNode for ProcessGroup {
    type Coordinates = FlowCoordinates;

    fn children_mut(&mut self) -> &mut [Self] {
        match &mut self.process_groups {
            Some(Some(groups)) => groups.as_mut_slice(),
            _ => &mut [],
        }
    }

    fn coordinates_mut(&mut self) -> Option<&mut FlowCoordinates> {
        self.versioned_flow_coordinates.as_mut().and_then(Option::as_mut)
    }
}

impl RegistryCoordinates for FlowCoordinates {
    fn registry_url(&self) -> Option<&str> {
        self.registry_url.as_ref().and_then(|url| url.as_deref())
    }

    fn set_registry_url(&mut self, url: String) {
        self.registry_url = Some(Some(url));
    }
}
