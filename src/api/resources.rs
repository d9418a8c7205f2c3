use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::relationship::Relationship;
use super::resource::JsonApiResource;
use crate::database::{DatabaseToken, User};

/// `users` resource, optionally carrying the user's tokens
#[derive(Debug, Clone)]
pub struct UserResource {
    user: Arc<User>,
    tokens: Option<Arc<Vec<DatabaseToken>>>,
    current_token: Option<i64>,
}

impl UserResource {
    pub fn new(user: User) -> Self {
        Self {
            user: Arc::new(user),
            tokens: None,
            current_token: None,
        }
    }

    /// Expose a `tokens` relationship; `current` marks the requesting token
    pub fn with_tokens(mut self, tokens: Vec<DatabaseToken>, current: Option<i64>) -> Self {
        self.tokens = Some(Arc::new(tokens));
        self.current_token = current;
        self
    }
}

impl JsonApiResource for UserResource {
    fn id(&self) -> String {
        self.user.id.to_string()
    }

    fn resource_type(&self) -> String {
        "users".to_string()
    }

    fn attributes(&self) -> Option<Map<String, Value>> {
        let mut attributes = Map::new();
        attributes.insert("name".into(), json!(self.user.name));
        attributes.insert("email".into(), json!(self.user.email));
        attributes.insert("is_active".into(), json!(self.user.is_active));
        attributes.insert("created_at".into(), json!(self.user.created_at.to_rfc3339()));
        attributes.insert("updated_at".into(), json!(self.user.updated_at.to_rfc3339()));
        Some(attributes)
    }

    fn relationships(&self) -> Vec<(String, Relationship)> {
        let Some(tokens) = &self.tokens else {
            return Vec::new();
        };

        let mut meta = Map::new();
        meta.insert("count".into(), json!(tokens.len()));

        let current = self.current_token;
        vec![(
            "tokens".to_string(),
            Relationship::many(tokens.iter().cloned(), |token| {
                let is_current = Some(token.id) == current;
                TokenResource::new(token)
                    .owned_by(self.clone())
                    .current(is_current)
            })
            .with_meta(meta),
        )]
    }
}

/// `database_tokens` resource. The hash never leaves the server.
#[derive(Debug, Clone)]
pub struct TokenResource {
    token: DatabaseToken,
    owner: Option<UserResource>,
    current: bool,
}

impl TokenResource {
    pub fn new(token: DatabaseToken) -> Self {
        Self {
            token,
            owner: None,
            current: false,
        }
    }

    pub fn owned_by(mut self, owner: UserResource) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn current(mut self, current: bool) -> Self {
        self.current = current;
        self
    }
}

impl JsonApiResource for TokenResource {
    fn id(&self) -> String {
        self.token.id.to_string()
    }

    fn resource_type(&self) -> String {
        "database_tokens".to_string()
    }

    fn attributes(&self) -> Option<Map<String, Value>> {
        let mut attributes = Map::new();
        attributes.insert("provider".into(), json!(self.token.provider));
        attributes.insert("created_at".into(), json!(self.token.created_at.to_rfc3339()));
        attributes.insert("updated_at".into(), json!(self.token.updated_at.to_rfc3339()));
        Some(attributes)
    }

    fn meta(&self) -> Option<Map<String, Value>> {
        let mut meta = Map::new();
        meta.insert("current".into(), json!(self.current));
        Some(meta)
    }

    fn relationships(&self) -> Vec<(String, Relationship)> {
        match &self.owner {
            Some(owner) => vec![(
                "owner".to_string(),
                Relationship::one(Some(owner.clone()), |owner| owner),
            )],
            None => Vec::new(),
        }
    }
}
