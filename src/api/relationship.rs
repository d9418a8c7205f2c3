use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::resource::JsonApiResource;

type Predicate = Arc<dyn Fn(&dyn JsonApiResource) -> bool + Send + Sync>;

/// Whether related resources are hoisted into `included`
#[derive(Clone, Default)]
pub enum Inclusion {
    #[default]
    Always,
    Never,
    /// Decided per related item
    When(Predicate),
}

impl Inclusion {
    pub fn allows(&self, resource: &dyn JsonApiResource) -> bool {
        match self {
            Inclusion::Always => true,
            Inclusion::Never => false,
            Inclusion::When(predicate) => predicate(resource),
        }
    }
}

impl fmt::Debug for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inclusion::Always => f.write_str("Always"),
            Inclusion::Never => f.write_str("Never"),
            Inclusion::When(_) => f.write_str("When(..)"),
        }
    }
}

/// What a relationship points at
#[derive(Clone)]
pub enum Related {
    /// A to-one relationship with nothing on the other end
    Nothing,
    One(Arc<dyn JsonApiResource>),
    Many(Vec<Arc<dyn JsonApiResource>>),
}

/// A named link from one resource to zero, one or many others.
///
/// Built from domain values plus a mapping closure, so callers hand over
/// their own types and the closure decides which resource wraps them.
#[derive(Clone)]
pub struct Relationship {
    pub related: Related,
    pub inclusion: Inclusion,
    pub meta: Option<Map<String, Value>>,
    pub links: Option<Map<String, Value>>,
}

impl Relationship {
    fn new(related: Related) -> Self {
        Self {
            related,
            inclusion: Inclusion::Always,
            meta: None,
            links: None,
        }
    }

    pub fn one<T, R, F>(value: Option<T>, map: F) -> Self
    where
        F: FnOnce(T) -> R,
        R: JsonApiResource + 'static,
    {
        match value {
            Some(value) => Self::new(Related::One(Arc::new(map(value)))),
            None => Self::new(Related::Nothing),
        }
    }

    pub fn many<I, T, R, F>(items: I, map: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> R,
        R: JsonApiResource + 'static,
    {
        let resources = items
            .into_iter()
            .map(map)
            .map(|resource| Arc::new(resource) as Arc<dyn JsonApiResource>)
            .collect();
        Self::new(Related::Many(resources))
    }

    pub fn never(mut self) -> Self {
        self.inclusion = Inclusion::Never;
        self
    }

    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&dyn JsonApiResource) -> bool + Send + Sync + 'static,
    {
        self.inclusion = Inclusion::When(Arc::new(predicate));
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_links(mut self, links: Map<String, Value>) -> Self {
        self.links = Some(links);
        self
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let related = match &self.related {
            Related::Nothing => "nothing".to_string(),
            Related::One(r) => format!("{}:{}", r.resource_type(), r.id()),
            Related::Many(rs) => format!("{} resources", rs.len()),
        };
        f.debug_struct("Relationship")
            .field("related", &related)
            .field("inclusion", &self.inclusion)
            .finish()
    }
}
