use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::env;

use crate::error::{AdminError, Result};
use crate::store::UserStore;
use crate::types::{PageCursor, Role, User, UserPage, UserUpdate};

/// GSI ordering user items by registration date, newest first when queried
/// with `scan_index_forward(false)`.
const REGISTRATION_INDEX: &str = "registrationDate-index";
const ENTITY_USER: &str = "USER";

/// Attributes owned by the table layout, never part of the record body.
const KEY_ATTRS: &[&str] = &["PK", "SK", "entity"];

/// Record attributes this core models; everything else passes through `extra`.
const KNOWN_ATTRS: &[&str] = &[
    "email",
    "fullname",
    "username",
    "balance",
    "country",
    "currency",
    "role",
    "isActive",
    "isSuspended",
    "registrationDate",
    "suspendedAt",
    "updatedAt",
];

/// DynamoDB-backed [`UserStore`]. User items live at `PK = SK = USER#<id>`
/// with an `entity` partition on the registration-date index.
pub struct DynamoUserStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoUserStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build a store from the ambient AWS environment. The table name comes
    /// from `TABLE_NAME`, falling back to `users`.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        let table_name = env::var("TABLE_NAME").unwrap_or_else(|_| "users".to_string());
        Self::new(DynamoClient::new(&config), table_name)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

fn user_pk(id: &str) -> String {
    format!("USER#{}", id)
}

#[async_trait]
impl UserStore for DynamoUserStore {
    async fn fetch_page(&self, page_size: usize, cursor: Option<&PageCursor>) -> Result<UserPage> {
        let mut query = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(REGISTRATION_INDEX)
            .key_condition_expression("entity = :entity")
            .expression_attribute_values(":entity", AttributeValue::S(ENTITY_USER.to_string()))
            .scan_index_forward(false)
            .limit(page_size as i32);

        if let Some(cursor) = cursor {
            let pk = user_pk(cursor.id());
            query = query
                .exclusive_start_key("entity", AttributeValue::S(ENTITY_USER.to_string()))
                .exclusive_start_key(
                    "registrationDate",
                    AttributeValue::S(cursor.sort_key().to_string()),
                )
                .exclusive_start_key("PK", AttributeValue::S(pk.clone()))
                .exclusive_start_key("SK", AttributeValue::S(pk));
        }

        let result = query.send().await.map_err(AdminError::store)?;

        let mut users = Vec::new();
        for item in result.items() {
            match item_to_user(item) {
                Some(user) => users.push(user),
                None => tracing::warn!("skipping user item with missing key or registration date"),
            }
        }

        // A full page means another fetch may yield more; the cursor is bound
        // to the last record actually returned, like the page token upstream.
        let has_more = users.len() == page_size;
        let next_cursor = result.items().last().and_then(page_cursor_for_item);

        Ok(UserPage {
            users,
            next_cursor,
            has_more,
        })
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<()> {
        let now = Utc::now();
        let update = update.sync_suspension(now);
        let expr = build_update_expression(&update, now);

        let pk = user_pk(id);
        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression(expr.expression);

        for (name, attr) in expr.names {
            builder = builder.expression_attribute_names(name, attr);
        }
        for (placeholder, value) in expr.values {
            builder = builder.expression_attribute_values(placeholder, value);
        }

        builder.send().await.map_err(AdminError::store)?;
        tracing::info!("updated user {}", id);
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let pk = user_pk(id);
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(AdminError::store)?;

        tracing::info!("deleted user {}", id);
        Ok(())
    }
}

fn page_cursor_for_item(item: &HashMap<String, AttributeValue>) -> Option<PageCursor> {
    let id = item
        .get("PK")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| s.strip_prefix("USER#"))?;
    let sort_key = item.get("registrationDate").and_then(|v| v.as_s().ok())?;
    Some(PageCursor::new(sort_key.clone(), id.to_string()))
}

fn item_to_user(item: &HashMap<String, AttributeValue>) -> Option<User> {
    let id = item
        .get("PK")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| s.strip_prefix("USER#"))
        .map(|s| s.to_string())?;

    let registration_date = item
        .get("registrationDate")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| parse_timestamp(s))?;

    let mut user = User {
        id,
        email: item
            .get("email")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        fullname: item
            .get("fullname")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        username: item
            .get("username")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        balance: item
            .get("balance")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse::<f64>().ok())
            .unwrap_or(0.0),
        country: item
            .get("country")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        currency: item
            .get("currency")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "USD".to_string()),
        role: item
            .get("role")
            .and_then(|v| v.as_s().ok())
            .map(|s| Role::parse(s))
            .unwrap_or_default(),
        is_active: item
            .get("isActive")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(true),
        is_suspended: item
            .get("isSuspended")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false),
        registration_date,
        suspended_at: item
            .get("suspendedAt")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| parse_timestamp(s)),
        updated_at: item
            .get("updatedAt")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| parse_timestamp(s)),
        extra: Map::new(),
    };

    for (name, value) in item {
        if KEY_ATTRS.contains(&name.as_str()) || KNOWN_ATTRS.contains(&name.as_str()) {
            continue;
        }
        user.extra.insert(name.clone(), attr_to_json(value));
    }

    Some(user)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

fn optional_string(value: &Option<String>) -> AttributeValue {
    match value {
        Some(s) => AttributeValue::S(s.clone()),
        None => AttributeValue::Null(true),
    }
}

/// Build the partial-merge SET expression. `role` needs an attribute-name
/// alias (reserved word), as do open-extension attributes whose names this
/// core does not control.
fn build_update_expression(update: &UserUpdate, now: DateTime<Utc>) -> UpdateExpression {
    let mut set_expr: Vec<String> = Vec::new();
    let mut names: HashMap<String, String> = HashMap::new();
    let mut values: HashMap<String, AttributeValue> = HashMap::new();

    if let Some(email) = &update.email {
        set_expr.push("email = :email".to_string());
        values.insert(":email".to_string(), AttributeValue::S(email.clone()));
    }

    if let Some(fullname) = &update.fullname {
        set_expr.push("fullname = :fullname".to_string());
        values.insert(":fullname".to_string(), AttributeValue::S(fullname.clone()));
    }

    if let Some(username) = &update.username {
        set_expr.push("username = :username".to_string());
        values.insert(":username".to_string(), optional_string(username));
    }

    if let Some(balance) = update.balance {
        set_expr.push("balance = :balance".to_string());
        values.insert(":balance".to_string(), AttributeValue::N(balance.to_string()));
    }

    if let Some(country) = &update.country {
        set_expr.push("country = :country".to_string());
        values.insert(":country".to_string(), optional_string(country));
    }

    if let Some(currency) = &update.currency {
        set_expr.push("currency = :currency".to_string());
        values.insert(":currency".to_string(), AttributeValue::S(currency.clone()));
    }

    if let Some(role) = update.role {
        set_expr.push("#role = :role".to_string());
        names.insert("#role".to_string(), "role".to_string());
        values.insert(
            ":role".to_string(),
            AttributeValue::S(role.as_str().to_string()),
        );
    }

    if let Some(active) = update.is_active {
        set_expr.push("isActive = :isActive".to_string());
        values.insert(":isActive".to_string(), AttributeValue::Bool(active));
    }

    if let Some(suspended) = update.is_suspended {
        set_expr.push("isSuspended = :isSuspended".to_string());
        values.insert(":isSuspended".to_string(), AttributeValue::Bool(suspended));
    }

    if let Some(suspended_at) = &update.suspended_at {
        set_expr.push("suspendedAt = :suspendedAt".to_string());
        let value = match suspended_at {
            Some(ts) => AttributeValue::S(ts.to_rfc3339()),
            None => AttributeValue::Null(true),
        };
        values.insert(":suspendedAt".to_string(), value);
    }

    for (i, (name, value)) in update.extra.iter().enumerate() {
        let alias = format!("#x{}", i);
        let placeholder = format!(":x{}", i);
        set_expr.push(format!("{} = {}", alias, placeholder));
        names.insert(alias, name.clone());
        values.insert(placeholder, json_to_attr(value));
    }

    // Every merge stamps the update time.
    set_expr.push("updatedAt = :updatedAt".to_string());
    values.insert(
        ":updatedAt".to_string(),
        AttributeValue::S(now.to_rfc3339()),
    );

    UpdateExpression {
        expression: format!("SET {}", set_expr.join(", ")),
        names,
        values,
    }
}

fn attr_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(attr_to_json).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), attr_to_json(v)))
                .collect(),
        ),
        AttributeValue::Ss(items) => {
            Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
        }
        _ => Value::Null,
    }
}

fn json_to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attr(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert(
            "PK".to_string(),
            AttributeValue::S("USER#abc-123".to_string()),
        );
        item.insert(
            "SK".to_string(),
            AttributeValue::S("USER#abc-123".to_string()),
        );
        item.insert("entity".to_string(), AttributeValue::S("USER".to_string()));
        item.insert(
            "email".to_string(),
            AttributeValue::S("jo@example.com".to_string()),
        );
        item.insert(
            "registrationDate".to_string(),
            AttributeValue::S("2024-05-01T09:30:00+00:00".to_string()),
        );
        item.insert("balance".to_string(), AttributeValue::N("12.5".to_string()));
        item.insert(
            "role".to_string(),
            AttributeValue::S("moderator".to_string()),
        );
        item.insert("isActive".to_string(), AttributeValue::Bool(true));
        item.insert(
            "referralCode".to_string(),
            AttributeValue::S("XK-12".to_string()),
        );
        item
    }

    #[test]
    fn item_to_user_maps_fields_and_extras() {
        let user = item_to_user(&sample_item()).unwrap();
        assert_eq!(user.id, "abc-123");
        assert_eq!(user.email, "jo@example.com");
        assert_eq!(user.balance, 12.5);
        assert_eq!(user.role, Role::Moderator);
        assert!(user.is_active);
        assert!(!user.is_suspended);
        assert_eq!(user.extra.get("referralCode").unwrap(), "XK-12");
        assert!(!user.extra.contains_key("PK"));
        assert!(!user.extra.contains_key("entity"));
    }

    #[test]
    fn item_without_registration_date_is_rejected() {
        let mut item = sample_item();
        item.remove("registrationDate");
        assert!(item_to_user(&item).is_none());
    }

    #[test]
    fn unknown_role_string_falls_back() {
        let mut item = sample_item();
        item.insert("role".to_string(), AttributeValue::S("owner".to_string()));
        assert_eq!(item_to_user(&item).unwrap().role, Role::User);
    }

    #[test]
    fn page_cursor_is_bound_to_the_stored_sort_key() {
        let cursor = page_cursor_for_item(&sample_item()).unwrap();
        assert_eq!(cursor.id(), "abc-123");
        assert_eq!(cursor.sort_key(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn update_expression_covers_written_fields_only() {
        let update = UserUpdate {
            email: Some("new@example.com".to_string()),
            username: Some(None),
            role: Some(Role::Admin),
            ..UserUpdate::default()
        };
        let now = Utc::now();
        let expr = build_update_expression(&update, now);

        assert!(expr.expression.starts_with("SET "));
        assert!(expr.expression.contains("email = :email"));
        assert!(expr.expression.contains("username = :username"));
        assert!(expr.expression.contains("#role = :role"));
        assert!(expr.expression.contains("updatedAt = :updatedAt"));
        assert!(!expr.expression.contains("balance"));

        assert_eq!(expr.names.get("#role").unwrap(), "role");
        assert_eq!(
            expr.values.get(":username").unwrap(),
            &AttributeValue::Null(true)
        );
        assert_eq!(
            expr.values.get(":role").unwrap(),
            &AttributeValue::S("admin".to_string())
        );
    }

    #[test]
    fn update_expression_syncs_suspension_timestamp() {
        let now = Utc::now();
        let update = UserUpdate {
            is_suspended: Some(true),
            ..UserUpdate::default()
        }
        .sync_suspension(now);
        let expr = build_update_expression(&update, now);

        assert!(expr.expression.contains("isSuspended = :isSuspended"));
        assert!(expr.expression.contains("suspendedAt = :suspendedAt"));
        assert_eq!(
            expr.values.get(":suspendedAt").unwrap(),
            &AttributeValue::S(now.to_rfc3339())
        );
    }

    #[test]
    fn update_expression_aliases_extra_attributes() {
        let mut update = UserUpdate::default();
        update
            .extra
            .insert("loginCount".to_string(), serde_json::json!(7));
        let expr = build_update_expression(&update, Utc::now());

        assert!(expr.expression.contains("#x0 = :x0"));
        assert_eq!(expr.names.get("#x0").unwrap(), "loginCount");
        assert_eq!(
            expr.values.get(":x0").unwrap(),
            &AttributeValue::N("7".to_string())
        );
    }

    #[test]
    fn json_and_attr_values_round_trip() {
        let value = serde_json::json!({
            "plan": "pro",
            "limits": { "daily": 5.0, "burst": true },
            "tags": ["a", "b"],
            "cleared": null
        });
        let attr = json_to_attr(&value);
        assert_eq!(attr_to_json(&attr), value);
    }
}
