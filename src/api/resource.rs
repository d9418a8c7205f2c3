use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::relationship::{Related, Relationship};

/// A domain value that can be rendered as a JSON:API resource object.
///
/// Two resources with the same `(resource_type, id)` must render identically;
/// the `included` list relies on that to keep only the first one it meets.
pub trait JsonApiResource: Send + Sync {
    fn id(&self) -> String;

    /// Route key; defaults to the id
    fn slug(&self) -> String {
        self.id()
    }

    fn resource_type(&self) -> String;

    fn attributes(&self) -> Option<Map<String, Value>> {
        None
    }

    fn meta(&self) -> Option<Map<String, Value>> {
        None
    }

    /// Computed on demand, once per encoding of this resource
    fn relationships(&self) -> Vec<(String, Relationship)> {
        Vec::new()
    }
}

/// `"{type}:{id}"`
pub fn key(resource: &dyn JsonApiResource) -> String {
    format!("{}:{}", resource.resource_type(), resource.id())
}

/// `{id, slug, type}`, the reference form used inside relationships
pub fn header(resource: &dyn JsonApiResource) -> Value {
    json!({
        "id": resource.id(),
        "slug": resource.slug(),
        "type": resource.resource_type(),
    })
}

/// Header plus whichever of attributes, meta and relationships are present.
/// Related resources are added to `included` along the way.
pub fn data(resource: &dyn JsonApiResource, included: &mut Included) -> Value {
    body(resource, included).unwrap_or_else(|| header(resource))
}

/// `None` when the resource has nothing beyond its header
fn body(resource: &dyn JsonApiResource, included: &mut Included) -> Option<Value> {
    let attributes = resource.attributes();
    let meta = resource.meta();
    let relationships = encode_relationships(resource.relationships(), included);

    if attributes.is_none() && meta.is_none() && relationships.is_empty() {
        return None;
    }

    let mut object = match header(resource) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(attributes) = attributes {
        object.insert("attributes".into(), Value::Object(attributes));
    }
    if let Some(meta) = meta {
        object.insert("meta".into(), Value::Object(meta));
    }
    if !relationships.is_empty() {
        object.insert("relationships".into(), Value::Object(relationships));
    }
    Some(Value::Object(object))
}

/// Encode each named relationship as `{data, meta?, links?}` and hoist the
/// related resources into `included`.
pub fn encode_relationships(
    relationships: Vec<(String, Relationship)>,
    included: &mut Included,
) -> Map<String, Value> {
    let mut encoded = Map::new();

    for (name, relationship) in relationships {
        let data = match &relationship.related {
            Related::Nothing => Value::Null,
            Related::One(resource) => {
                if relationship.inclusion.allows(resource.as_ref()) {
                    included.include(resource.as_ref());
                }
                header(resource.as_ref())
            }
            Related::Many(resources) => Value::Array(
                resources
                    .iter()
                    .map(|resource| {
                        if relationship.inclusion.allows(resource.as_ref()) {
                            included.include(resource.as_ref());
                        }
                        header(resource.as_ref())
                    })
                    .collect(),
            ),
        };

        let mut entry = Map::new();
        entry.insert("data".into(), data);
        if let Some(meta) = relationship.meta {
            entry.insert("meta".into(), Value::Object(meta));
        }
        if let Some(links) = relationship.links {
            entry.insert("links".into(), Value::Object(links));
        }
        encoded.insert(name, Value::Object(entry));
    }

    encoded
}

/// The `included` accumulator.
///
/// A key is claimed before its resource's relationships are walked, so a
/// relationship cycle stops at the second visit whether or not the node had
/// anything to show. Resources with nothing beyond a header keep their claim
/// but never produce an entry.
#[derive(Debug, Default)]
pub struct Included {
    order: Vec<String>,
    bodies: HashMap<String, Option<Value>>,
}

impl Included {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key without rendering anything, e.g. for primary data
    pub fn claim(&mut self, key: String) -> bool {
        if self.bodies.contains_key(&key) {
            return false;
        }
        self.order.push(key.clone());
        self.bodies.insert(key, None);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bodies.contains_key(key)
    }

    pub fn include(&mut self, resource: &dyn JsonApiResource) {
        let key = key(resource);
        if !self.claim(key.clone()) {
            return;
        }
        if let Some(body) = body(resource, self) {
            self.bodies.insert(key, Some(body));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.values().all(Option::is_none)
    }

    /// Rendered entries in discovery order
    pub fn into_values(mut self) -> Vec<Value> {
        self.order
            .iter()
            .filter_map(|key| self.bodies.remove(key).flatten())
            .collect()
    }
}

/// A resource assembled by hand rather than derived from a domain type
#[derive(Debug, Clone, Default)]
pub struct ResourceObject {
    id: String,
    slug: Option<String>,
    resource_type: String,
    attributes: Option<Map<String, Value>>,
    meta: Option<Map<String, Value>>,
    relationships: Vec<(String, Relationship)>,
}

impl ResourceObject {
    pub fn new(resource_type: impl Into<String>, id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, relationship: Relationship) -> Self {
        self.relationships.push((name.into(), relationship));
        self
    }
}

impl JsonApiResource for ResourceObject {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| self.id.clone())
    }

    fn resource_type(&self) -> String {
        self.resource_type.clone()
    }

    fn attributes(&self) -> Option<Map<String, Value>> {
        self.attributes.clone()
    }

    fn meta(&self) -> Option<Map<String, Value>> {
        self.meta.clone()
    }

    fn relationships(&self) -> Vec<(String, Relationship)> {
        self.relationships.clone()
    }
}
