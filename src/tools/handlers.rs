//! Tool handlers
//!
//! One async function per catalog entry. A handler validates its typed
//! arguments, makes its backend call and shapes the response into a
//! `ToolOutput`. Status >= 400 is a reported error; a body that breaks the
//! documented shape is an `UnexpectedShape` fault.

use chrono::Local;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Value, json};

use crate::api::{ApiResponse, BangumiClient, ImageType};
use crate::error::{BangumiError, Result};

use super::arguments::{Arguments, normalize_object_ints};
use super::output::ToolOutput;

/// Statically typed handler, looked up by tool name
pub type Handler = fn(BangumiClient, Arguments) -> BoxFuture<'static, Result<ToolOutput>>;

macro_rules! handler_table {
    ($($name:ident),* $(,)?) => {
        vec![$(
            (
                stringify!($name),
                (|client: BangumiClient, args: Arguments| $name(client, args).boxed()) as Handler,
            )
        ),*]
    };
}

/// Name/handler pairs for every built-in tool
pub fn builtin() -> Vec<(&'static str, Handler)> {
    handler_table![
        get_current_time,
        get_calendar,
        search_subjects,
        get_subjects,
        get_subject_info,
        get_subject_image,
        get_subject_persons,
        get_subject_characters,
        get_subject_relations,
        get_episodes,
        get_episode_info,
        search_characters,
        get_character_info,
        get_character_subjects,
        get_character_persons,
        post_character_collection,
        delete_character_collection,
        search_persons,
        get_person_info,
        get_person_subjects,
        get_person_characters,
        post_person_collection,
        delete_person_collection,
        get_user_info,
        get_me_info,
        get_user_collections,
        get_user_collection_info,
        post_my_collection,
        patch_my_collection,
        get_my_episode_collections,
        patch_my_episode_collections,
        get_my_episode_collection_info,
        put_my_episode_collection_info,
        get_user_character_collections,
        get_user_character_collection_info,
        get_user_person_collections,
        get_user_person_collection_info,
    ]
}

// Shaping

fn respond(response: ApiResponse) -> ToolOutput {
    if response.is_error() {
        ToolOutput::backend_error(response.body)
    } else {
        ToolOutput::success(response.body)
    }
}

/// A list endpoint, wrapped under a semantic key
fn respond_list(response: ApiResponse, key: &str) -> Result<ToolOutput> {
    if response.is_error() {
        return Ok(ToolOutput::backend_error(response.body));
    }
    if !response.body.is_array() {
        return Err(BangumiError::UnexpectedShape(format!("{} should be a list", key)));
    }
    Ok(ToolOutput::success(json!({ key: response.body })))
}

/// A paged or single-record endpoint that must answer with an object
fn respond_object(response: ApiResponse, what: &str) -> Result<ToolOutput> {
    if response.is_error() {
        return Ok(ToolOutput::backend_error(response.body));
    }
    if !response.body.is_object() {
        return Err(BangumiError::UnexpectedShape(format!("{} should be an object", what)));
    }
    Ok(ToolOutput::success(response.body))
}

// Clock

async fn get_current_time(_client: BangumiClient, _args: Arguments) -> Result<ToolOutput> {
    let now = Local::now();
    Ok(ToolOutput::success(json!({
        "current_time": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "weekday": now.format("%A").to_string(),
    })))
}

// Subjects

async fn get_calendar(client: BangumiClient, _args: Arguments) -> Result<ToolOutput> {
    respond_list(client.get_calendar().await?, "calendar")
}

async fn search_subjects(client: BangumiClient, mut args: Arguments) -> Result<ToolOutput> {
    args.string("keyword")?;
    args.object("filter")?;
    args.normalize_ints(&["limit", "offset"])?;
    let body = args.pick(&["keyword", "sort", "filter", "limit", "offset"]);
    respond_object(client.search_subjects(body).await?, "search result")
}

async fn get_subjects(client: BangumiClient, mut args: Arguments) -> Result<ToolOutput> {
    args.normalize_ints(&["type", "cat", "year", "month", "day", "limit", "offset"])?;
    let params = args.pick(&[
        "type", "cat", "series", "platform", "sort", "year", "month", "day", "limit", "offset",
    ]);
    respond_object(client.get_subjects(&params).await?, "subject page")
}

async fn get_subject_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    Ok(respond(client.get_subject_info(subject_id).await?))
}

async fn get_subject_image(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    let image_type = args
        .get("type")
        .and_then(Value::as_str)
        .and_then(ImageType::from_str)
        .ok_or_else(|| {
            let names: Vec<&str> = ImageType::ALL.iter().map(ImageType::as_str).collect();
            BangumiError::InvalidArgument(format!("type parameter must be one of [{}]", names.join(", ")))
        })?;

    let response = client.get_subject_image(subject_id, image_type).await?;
    if response.is_error() {
        return Ok(ToolOutput::backend_error(response.body));
    }
    let url = response
        .body
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| BangumiError::UnexpectedShape("image response carries no url".to_string()))?;
    Ok(ToolOutput::success(json!({ "url": url, "type": image_type.as_str() })))
}

async fn get_subject_persons(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    respond_list(client.get_subject_persons(subject_id).await?, "related_persons")
}

async fn get_subject_characters(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    respond_list(client.get_subject_characters(subject_id).await?, "related_characters")
}

async fn get_subject_relations(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    respond_list(client.get_subject_relations(subject_id).await?, "related_subjects")
}

// Episodes

async fn get_episodes(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    let params = json!({
        "subject_id": subject_id,
        "type": args.int("episode_type")?,
        "limit": args.int("limit")?,
        "offset": args.int("offset")?,
    });
    respond_object(client.get_episodes(&params).await?, "episode page")
}

async fn get_episode_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let episode_id = args.id("episode_id")?;
    Ok(respond(client.get_episode_info(episode_id).await?))
}

// Characters

async fn search_characters(client: BangumiClient, mut args: Arguments) -> Result<ToolOutput> {
    args.string("keyword")?;
    args.object("filter")?;
    args.normalize_ints(&["limit", "offset"])?;
    let body = args.pick(&["keyword", "filter", "limit", "offset"]);
    respond_object(client.search_characters(body).await?, "search result")
}

async fn get_character_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let character_id = args.id("character_id")?;
    Ok(respond(client.get_character_info(character_id).await?))
}

async fn get_character_subjects(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let character_id = args.id("character_id")?;
    respond_list(client.get_character_subjects(character_id).await?, "related_subjects")
}

async fn get_character_persons(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let character_id = args.id("character_id")?;
    respond_list(client.get_character_persons(character_id).await?, "related_persons")
}

async fn post_character_collection(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let character_id = args.id("character_id")?;
    Ok(respond(client.post_character_collection(character_id).await?))
}

async fn delete_character_collection(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let character_id = args.id("character_id")?;
    Ok(respond(client.delete_character_collection(character_id).await?))
}

// Persons

async fn search_persons(client: BangumiClient, mut args: Arguments) -> Result<ToolOutput> {
    args.string("keyword")?;
    args.object("filter")?;
    args.normalize_ints(&["limit", "offset"])?;
    let body = args.pick(&["keyword", "filter", "limit", "offset"]);
    respond_object(client.search_persons(body).await?, "search result")
}

async fn get_person_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let person_id = args.id("person_id")?;
    Ok(respond(client.get_person_info(person_id).await?))
}

async fn get_person_subjects(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let person_id = args.id("person_id")?;
    respond_list(client.get_person_subjects(person_id).await?, "related_subjects")
}

async fn get_person_characters(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let person_id = args.id("person_id")?;
    respond_list(client.get_person_characters(person_id).await?, "related_characters")
}

async fn post_person_collection(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let person_id = args.id("person_id")?;
    Ok(respond(client.post_person_collection(person_id).await?))
}

async fn delete_person_collection(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let person_id = args.id("person_id")?;
    Ok(respond(client.delete_person_collection(person_id).await?))
}

// Users

async fn get_user_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    Ok(respond(client.get_user_info(username).await?))
}

async fn get_me_info(client: BangumiClient, _args: Arguments) -> Result<ToolOutput> {
    Ok(respond(client.get_me_info().await?))
}

// Collections

async fn get_user_collections(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    let mut params = args.object("params")?;
    normalize_object_ints(&mut params, &["subject_type", "type", "limit", "offset"])?;
    respond_object(client.get_user_collections(username, &params).await?, "collection page")
}

async fn get_user_collection_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    let subject_id = args.id("subject_id")?;
    Ok(respond(client.get_user_collection_info(username, subject_id).await?))
}

async fn post_my_collection(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    let mut params = args.object("params")?;
    normalize_object_ints(&mut params, &["type", "rate", "ep_status", "vol_status"])?;
    Ok(respond(client.post_my_collection(subject_id, params).await?))
}

async fn patch_my_collection(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    let mut params = args.object("params")?;
    normalize_object_ints(&mut params, &["type", "rate", "ep_status", "vol_status"])?;
    Ok(respond(client.patch_my_collection(subject_id, params).await?))
}

async fn get_my_episode_collections(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    let mut params = args.object("params")?;
    normalize_object_ints(&mut params, &["offset", "limit", "episode_type"])?;
    respond_object(
        client.get_my_episode_collections(subject_id, &params).await?,
        "episode collection page",
    )
}

async fn patch_my_episode_collections(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let subject_id = args.id("subject_id")?;
    let episode_ids = args.id_list("episode_id")?;
    let collection_type = args.required_int("type")?;
    let body = json!({ "episode_id": episode_ids, "type": collection_type });
    Ok(respond(client.patch_my_episode_collections(subject_id, body).await?))
}

async fn get_my_episode_collection_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let episode_id = args.id("episode_id")?;
    Ok(respond(client.get_my_episode_collection_info(episode_id).await?))
}

async fn put_my_episode_collection_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let episode_id = args.id("episode_id")?;
    let collection_type = args.required_int("type")?;
    let body = json!({ "type": collection_type });
    Ok(respond(client.put_my_episode_collection_info(episode_id, body).await?))
}

async fn get_user_character_collections(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    respond_object(
        client.get_user_character_collections(username).await?,
        "character collection page",
    )
}

async fn get_user_character_collection_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    let character_id = args.id("character_id")?;
    Ok(respond(
        client.get_user_character_collection_info(username, character_id).await?,
    ))
}

async fn get_user_person_collections(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    respond_object(
        client.get_user_person_collections(username).await?,
        "person collection page",
    )
}

async fn get_user_person_collection_info(client: BangumiClient, args: Arguments) -> Result<ToolOutput> {
    let username = args.string("username")?;
    let person_id = args.id("person_id")?;
    Ok(respond(client.get_user_person_collection_info(username, person_id).await?))
}
