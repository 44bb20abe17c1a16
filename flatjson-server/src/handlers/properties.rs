use axum::extract::State;
use flatjson_model::{NewProperty, Property, PropertyStatus, PropertyUpdate};
use flatjson_storage::ListOptions;
use flatjson_types::{PropertyId, PropertyType, RevisionId};
use serde::Deserialize;
use serde_json::Value;

use super::{created, run, ApiResult, AppState, Created};
use crate::error::ApiError;
use crate::extract::{Actor, ApiJson, ApiPath, ApiQuery, Data};

#[derive(Debug, Default, Deserialize)]
pub struct PropertyQuery {
    pub revision_id: Option<RevisionId>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Wire form of a new Property.
///
/// `key_value` is normally text; any other JSON value is taken as its
/// serialized form.
#[derive(Debug, Deserialize)]
pub struct CreatePropertyBody {
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub key_path: String,
    pub key_value: Value,
    pub revision_id: RevisionId,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
}

impl CreatePropertyBody {
    fn into_new_property(self) -> Result<NewProperty, ApiError> {
        let text = value_text(self.key_value);
        let property =
            NewProperty::from_text(self.revision_id, self.key_path, self.property_type, &text)?;
        Ok(property.with_status(self.status.unwrap_or_default()))
    }
}

/// Wire form of a Property update; `key_value` follows the create rules.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePropertyBody {
    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,
    pub key_path: Option<String>,
    pub key_value: Option<Value>,
    pub status: Option<PropertyStatus>,
    pub is_active: Option<bool>,
    pub is_frozen: Option<bool>,
}

impl From<UpdatePropertyBody> for PropertyUpdate {
    fn from(body: UpdatePropertyBody) -> Self {
        Self {
            property_type: body.property_type,
            key_path: body.key_path,
            key_value: body.key_value.map(value_text),
            status: body.status,
            is_active: body.is_active,
            is_frozen: body.is_frozen,
        }
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

pub async fn list(
    State(store): State<AppState>,
    ApiQuery(query): ApiQuery<PropertyQuery>,
) -> ApiResult<Vec<Property>> {
    let options = ListOptions {
        include_inactive: query.include_inactive,
        with_children: false,
    };
    let revision_id = query.revision_id;
    let properties = run(&store, move |s| s.list_properties(revision_id, options)).await?;
    Ok(Data::new(properties))
}

pub async fn get(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
) -> ApiResult<Property> {
    Ok(Data::new(run(&store, move |s| s.get_property(id)).await?))
}

pub async fn create(
    State(store): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<CreatePropertyBody>,
) -> Created<Property> {
    let input = body.into_new_property()?;
    created(run(&store, move |s| s.create_property(input, actor.as_deref())).await?)
}

pub async fn update(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    actor: Actor,
    ApiJson(body): ApiJson<UpdatePropertyBody>,
) -> ApiResult<Property> {
    let changes = PropertyUpdate::from(body);
    let property = run(&store, move |s| s.update_property(id, changes, actor.as_deref())).await?;
    Ok(Data::new(property))
}

pub async fn delete(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    actor: Actor,
) -> ApiResult<Property> {
    Ok(Data::new(run(&store, move |s| s.delete_property(id, actor.as_deref())).await?))
}

pub async fn restore(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    actor: Actor,
) -> ApiResult<Property> {
    Ok(Data::new(run(&store, move |s| s.restore_property(id, actor.as_deref())).await?))
}

pub async fn lock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    actor: Actor,
) -> ApiResult<Property> {
    Ok(Data::new(run(&store, move |s| s.lock_property(id, actor.as_deref())).await?))
}

pub async fn unlock(
    State(store): State<AppState>,
    ApiPath(id): ApiPath<PropertyId>,
    actor: Actor,
) -> ApiResult<Property> {
    Ok(Data::new(run(&store, move |s| s.unlock_property(id, actor.as_deref())).await?))
}
