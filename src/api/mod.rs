//! JSON:API document assembly.
//!
//! Resources describe themselves through [`JsonApiResource`]; relationships
//! are computed lazily when a resource is encoded, and every related resource
//! with something to show is hoisted into a flat `included` list keyed by
//! `type:id`.

pub mod document;
pub mod relationship;
pub mod resource;
pub mod resources;

pub use document::{JsonApiResponse, Pagination, JSON_API_CONTENT_TYPE};
pub use relationship::{Inclusion, Related, Relationship};
pub use resource::{data, encode_relationships, header, Included, JsonApiResource, ResourceObject};
pub use resources::{TokenResource, UserResource};
