// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore adapter implementing the remote gateway contract.
//!
//! Every entity type maps to one collection (see [`collection_for`]) with
//! documents keyed by entity id and an owner field `userId`. Firestore
//! errors are translated into [`GatewayError`] here and nowhere else.

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde_json::Value;

use crate::db::collection_for;
use crate::models::Entity;
use crate::sync::gateway::{GatewayError, RemoteGateway};

/// Document field holding the owner id.
const OWNER_FIELD: &str = "userId";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, GatewayError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| {
                GatewayError::Unavailable(format!("Failed to connect to Firestore: {}", e))
            })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, GatewayError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            GatewayError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client for testing.
    ///
    /// Every gateway call fails with [`GatewayError::Offline`].
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, GatewayError> {
        self.client.as_ref().ok_or(GatewayError::Offline)
    }
}

/// Translate a Firestore failure into the gateway's closed error set.
fn map_firestore_error(err: FirestoreError) -> GatewayError {
    match &err {
        FirestoreError::DataNotFoundError(_) => GatewayError::NotFound(err.to_string()),
        FirestoreError::NetworkError(_) => GatewayError::Unavailable(err.to_string()),
        _ => GatewayError::Rejected(err.to_string()),
    }
}

#[async_trait]
impl<T: Entity + serde::de::DeserializeOwned> RemoteGateway<T> for FirestoreDb {
    async fn save(&self, entity: &T) -> Result<(), GatewayError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection_for(T::KIND))
            .document_id(entity.id())
            .object(entity)
            .execute()
            .await
            .map_err(map_firestore_error)?;
        Ok(())
    }

    async fn fetch_by_owner(&self, owner_id: &str) -> Result<Vec<Value>, GatewayError> {
        let documents: Vec<Value> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection_for(T::KIND))
            .filter(|q| q.for_all([q.field(OWNER_FIELD).eq(owner_id)]))
            .obj::<Value>()
            .query()
            .await
            .map_err(map_firestore_error)?;

        tracing::debug!(
            collection = collection_for(T::KIND),
            owner_id,
            count = documents.len(),
            "Fetched documents"
        );
        Ok(documents)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), GatewayError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection_for(T::KIND))
            .document_id(id)
            .execute()
            .await
            .map_err(map_firestore_error)?;
        Ok(())
    }

    async fn edit_merge(&self, entity: &T) -> Result<(), GatewayError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(entity.merge_fields())
            .in_col(collection_for(T::KIND))
            .document_id(entity.id())
            .object(entity)
            .execute()
            .await
            .map_err(map_firestore_error)?;
        Ok(())
    }
}
