use super::Downloader;
use crate::error::Result;
use crate::reference::Ref;
use crate::sanitize::sanitize;
use crate::types::Boundary;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Boundaries of the account, addressable by their backend UUID.
#[derive(Debug, Default)]
pub struct Boundaries {
    boundaries: Vec<Boundary>,
    by_uuid: HashMap<String, usize>,
}

impl Boundaries {
    pub fn new(boundaries: Vec<Boundary>) -> Self {
        let by_uuid = boundaries
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.origin_object_id.clone().map(|uuid| (uuid, i)))
            .collect();
        Self {
            boundaries,
            by_uuid,
        }
    }

    pub fn reference(&self, uuid: &str) -> Option<Ref> {
        self.by_uuid
            .get(uuid)
            .map(|&i| Ref::id(self.boundaries[i].id.clone()))
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn into_boundaries(self) -> Vec<Boundary> {
        self.boundaries
    }
}

impl Downloader {
    #[instrument(skip(self))]
    pub(super) async fn fetch_boundaries(&self) -> Result<Boundaries> {
        let dtos = self.client.get_boundaries(&self.account.uuid).await?;

        let boundaries = dtos
            .into_iter()
            .map(|dto| Boundary {
                id: sanitize(&dto.name),
                name: dto.name,
                query: dto.boundary_query,
                origin_object_id: Some(dto.uuid),
            })
            .collect::<Vec<_>>();

        info!("Fetched {} boundaries", boundaries.len());
        Ok(Boundaries::new(boundaries))
    }
}
