#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use support_bundle_core::clock::{fixed_clock, Clock};
use support_bundle_core::config::ServerConnection;
use support_bundle_core::contract::{ConnectionResolver, TransportResponse};
use support_bundle_core::error::ResolveError;

pub fn clock() -> Clock {
    fixed_clock(Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap())
}

pub fn ok_json(body: &str) -> TransportResponse {
    TransportResponse::from_bytes(StatusCode::OK, body)
}

pub fn status(status: StatusCode) -> TransportResponse {
    TransportResponse::from_bytes(status, Vec::new())
}

/// Resolver backed by a fixed list of `(id, url)` pairs; the first is the default.
pub struct StaticResolver {
    pub servers: Vec<(String, ServerConnection)>,
    pub calls: Arc<Mutex<Vec<Option<String>>>>,
}

impl StaticResolver {
    pub fn new(servers: &[(&str, &str)]) -> Self {
        Self {
            servers: servers
                .iter()
                .map(|(id, url)| {
                    (
                        id.to_string(),
                        ServerConnection::new(*url, Default::default()),
                    )
                })
                .collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ConnectionResolver for StaticResolver {
    fn resolve<'a>(&self, server_id: Option<&'a str>) -> Result<ServerConnection, ResolveError> {
        self.calls
            .lock()
            .unwrap()
            .push(server_id.map(str::to_string));
        match server_id {
            None => self
                .servers
                .first()
                .map(|(_, conn)| conn.clone())
                .ok_or(ResolveError::NoDefault),
            Some(id) => self
                .servers
                .iter()
                .find(|(known, _)| known == id)
                .map(|(_, conn)| conn.clone())
                .ok_or_else(|| ResolveError::UnknownServer(id.to_string())),
        }
    }
}
