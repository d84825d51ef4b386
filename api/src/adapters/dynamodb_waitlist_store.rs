use crate::domain::{EntryId, StoreError, WaitlistEmail, WaitlistEntry, WaitlistStore};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use telemetry::get_trace_and_span_id;
use uuid::Uuid;

const ENTRY_TYPE: &str = "WaitlistEntry";

type Item = HashMap<String, AttributeValue>;

/// Waitlist table keyed by the email address (`PK`).
#[derive(Debug, Clone)]
pub struct DynamoDbWaitlistStore {
    client: Client,
    table_name: String,
}

impl DynamoDbWaitlistStore {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl WaitlistStore for DynamoDbWaitlistStore {
    #[tracing::instrument(
        name = "Checking the waitlist for an existing entry",
        skip(self, email),
        fields(waitlist_email = %email)
    )]
    async fn exists(&self, email: &WaitlistEmail) -> Result<bool, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(email.to_string()))
            .consistent_read(true)
            .send()
            .await
            .context(format!(
                "Failure reading record from DynamoDB. Using table {}",
                &self.table_name
            ))?;

        Ok(output.item.is_some())
    }

    #[tracing::instrument(
        name = "Inserting waitlist entry",
        skip(self, entry),
        fields(waitlist_email = %entry.email)
    )]
    async fn insert(&self, entry: &WaitlistEntry) -> Result<EntryId, StoreError> {
        let mut put_item = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_entry(entry)))
            .condition_expression("attribute_not_exists(PK)");

        put_item = match get_trace_and_span_id() {
            None => put_item,
            Some((trace_id, span_id)) => put_item
                .item("TraceParent", AttributeValue::S(trace_id))
                .item("ParentSpan", AttributeValue::S(span_id)),
        };

        match put_item.send().await {
            Ok(_) => Ok(entry.id),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    Err(StoreError::Duplicate(entry.email.to_string()))
                } else {
                    Err(anyhow::Error::new(service_error)
                        .context(format!(
                            "Failure inserting record to DynamoDB. Using table {}",
                            &self.table_name
                        ))
                        .into())
                }
            }
        }
    }

    #[tracing::instrument(name = "Counting waitlist entries", skip(self))]
    async fn count(&self) -> Result<u64, StoreError> {
        let mut total: u64 = 0;
        let mut exclusive_start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .select(Select::Count)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .context(format!(
                    "Failure counting records in DynamoDB. Using table {}",
                    &self.table_name
                ))?;

            total += output.count.max(0) as u64;

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(total)
    }

    #[tracing::instrument(name = "Listing waitlist entries", skip(self))]
    async fn list_oldest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        let mut entries = vec![];
        let mut exclusive_start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .context(format!(
                    "Failure reading records from DynamoDB. Using table {}",
                    &self.table_name
                ))?;

            for item in output.items.unwrap_or_default() {
                match entry_from_item(&item) {
                    Ok(entry) => entries.push(entry),
                    Err(error) => {
                        tracing::warn!(
                            error.cause_chain = ?error,
                            error.message = %error,
                            "Skipping a waitlist entry. Its stored details are invalid",
                        );
                    }
                }
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        entries.sort_by_key(|e: &WaitlistEntry| e.created_at);
        Ok(entries)
    }
}

fn item_from_entry(entry: &WaitlistEntry) -> Item {
    HashMap::from([
        ("PK".to_string(), AttributeValue::S(entry.email.to_string())),
        ("Type".to_string(), AttributeValue::S(ENTRY_TYPE.to_string())),
        ("Id".to_string(), AttributeValue::S(entry.id.to_string())),
        (
            "EmailAddress".to_string(),
            AttributeValue::S(entry.email.to_string()),
        ),
        (
            "CreatedAt".to_string(),
            AttributeValue::S(entry.created_at.to_rfc3339()),
        ),
        ("Source".to_string(), AttributeValue::S(entry.source.clone())),
    ])
}

fn entry_from_item(item: &Item) -> Result<WaitlistEntry, anyhow::Error> {
    let string_attribute = |name: &str| -> Result<String, anyhow::Error> {
        item.get(name)
            .ok_or_else(|| anyhow!("Missing attribute {}", name))?
            .as_s()
            .map(|s| s.to_string())
            .map_err(|_| anyhow!("Attribute {} is not a string", name))
    };

    let email = WaitlistEmail::parse(string_attribute("EmailAddress")?).map_err(|e| anyhow!(e))?;
    let id = Uuid::parse_str(&string_attribute("Id")?).context("Invalid entry id")?;
    let created_at = DateTime::parse_from_rfc3339(&string_attribute("CreatedAt")?)
        .context("Invalid creation timestamp")?
        .with_timezone(&Utc);

    Ok(WaitlistEntry {
        id,
        email,
        created_at,
        source: string_attribute("Source")?,
    })
}
