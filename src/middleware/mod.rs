use actix_web::{dev, FromRequest, HttpRequest};
use std::future::{ready, Ready};

pub const ACTOR_HEADER: &str = "X-Actor";
const DEFAULT_ACTOR: &str = "admin";
const MAX_ACTOR_LEN: usize = 64;

/// Who performed a mutation, taken from the `X-Actor` header.
/// Missing, blank or oversized values fall back to "admin".
#[derive(Debug, Clone, PartialEq)]
pub struct Actor(pub String);

impl Actor {
    pub fn name(&self) -> &str {
        &self.0
    }

    fn from_header(value: Option<&str>) -> Self {
        let name = value
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_ACTOR_LEN && !v.chars().any(char::is_control))
            .unwrap_or(DEFAULT_ACTOR);
        Actor(name.to_string())
    }
}

impl FromRequest for Actor {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let header = req.headers().get(ACTOR_HEADER).and_then(|v| v.to_str().ok());
        ready(Ok(Actor::from_header(header)))
    }
}
