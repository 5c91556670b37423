use crate::models::{Subscription, SubscriptionStatus};
use crate::subscriptions::webhook::{WebhookError, WebhookEvent};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// `data.object` of `customer.subscription.*` events
#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    current_period_end: Option<i64>,
}

/// `data.object` of `checkout.session.completed`
#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    customer: Option<String>,
    #[serde(default)]
    customer_email: Option<String>,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Subscription records persisted as one JSON object keyed by customer id
pub struct SubscriptionStore {
    path: PathBuf,
    records: RwLock<HashMap<String, Subscription>>,
}

impl SubscriptionStore {
    /// Open the ledger, starting empty if the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub async fn get(&self, customer_id: &str) -> Option<Subscription> {
        self.records.read().await.get(customer_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Apply a webhook event. Returns the updated record, or `None` for event
    /// types the ledger does not track.
    pub async fn apply_event(&self, event: &WebhookEvent) -> Result<Option<Subscription>> {
        let now = event.created.and_then(timestamp).unwrap_or_else(Utc::now);
        let mut guard = self.records.write().await;
        // Changes land in memory only once they are on disk
        let mut records = guard.clone();

        let updated = match event.event_type.as_str() {
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => {
                let object: SubscriptionObject = serde_json::from_value(event.data.object.clone())
                    .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
                let status = if event.event_type == "customer.subscription.deleted" {
                    SubscriptionStatus::Canceled
                } else {
                    object
                        .status
                        .parse()
                        .map_err(|e: anyhow::Error| WebhookError::InvalidPayload(e.to_string()))?
                };

                let record = records
                    .entry(object.customer.clone())
                    .or_insert_with(|| Subscription {
                        customer_id: object.customer.clone(),
                        email: None,
                        status,
                        subscription_id: None,
                        created_at: now,
                        updated_at: now,
                        current_period_end: None,
                    });
                record.status = status;
                record.subscription_id = Some(object.id);
                record.current_period_end = object.current_period_end.and_then(timestamp);
                record.updated_at = now;
                record.clone()
            }
            "checkout.session.completed" => {
                let object: CheckoutSessionObject =
                    serde_json::from_value(event.data.object.clone())
                        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
                let customer_id = object.customer.ok_or_else(|| {
                    WebhookError::InvalidPayload("checkout session has no customer".to_string())
                })?;
                let email = object
                    .customer_details
                    .and_then(|d| d.email)
                    .or(object.customer_email);
                let paid = object.payment_status.as_deref() == Some("paid");

                let record = records.entry(customer_id.clone()).or_insert_with(|| Subscription {
                    customer_id,
                    email: None,
                    status: SubscriptionStatus::Incomplete,
                    subscription_id: None,
                    created_at: now,
                    updated_at: now,
                    current_period_end: None,
                });
                if email.is_some() {
                    record.email = email;
                }
                if object.subscription.is_some() {
                    record.subscription_id = object.subscription;
                }
                // Subscription events are authoritative; only promote fresh records
                if paid && record.status == SubscriptionStatus::Incomplete {
                    record.status = SubscriptionStatus::Active;
                }
                record.updated_at = now;
                record.clone()
            }
            other => {
                tracing::debug!("Ignoring webhook event type: {}", other);
                return Ok(None);
            }
        };

        persist(&self.path, &records).await?;
        *guard = records;
        tracing::info!(
            "Subscription for {} is now {:?} (event {})",
            updated.customer_id,
            updated.status,
            event.id
        );
        Ok(Some(updated))
    }
}

/// Write through a temporary file so readers never see a half-written ledger
async fn persist(path: &Path, records: &HashMap<String, Subscription>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create subscriptions directory")?;
    }

    let json = serde_json::to_string_pretty(records).context("Failed to serialize subscriptions")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .context("Failed to write subscriptions file")?;
    tokio::fs::rename(&tmp, path)
        .await
        .context("Failed to replace subscriptions file")?;
    Ok(())
}
