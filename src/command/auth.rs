//! Authentication commands.
//!
//! Successful `sign-in`, `sign-up` and positive `get-token-state` all bind
//! the calling session to the user. A client that merely checks a valid
//! token is therefore signed in on that session afterwards.

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::descriptor::{CommandContext, CommandDescriptor, CommandOutput};
use super::schema::ObjectSchema;
use crate::Result;

pub const SIGN_IN: &str = "sign-in";
pub const SIGN_UP: &str = "sign-up";
pub const SIGN_OUT: &str = "sign-out";
pub const GET_TOKEN_STATE: &str = "get-token-state";

#[derive(Debug, Deserialize)]
struct SignInInput {
    id: String,
    password: String,
    cf_turnstile_token: String,
}

#[derive(Debug, Deserialize)]
struct SignUpInput {
    id: String,
    password: String,
    permissions: String,
    cf_turnstile_token: String,
}

#[derive(Debug, Deserialize)]
struct SignOutInput {
    #[allow(dead_code)]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenStateInput {
    token_to_check: String,
    #[serde(rename = "userID")]
    user_id: String,
}

/// All authentication commands.
pub fn commands() -> Vec<CommandDescriptor> {
    vec![get_token_state(), sign_in(), sign_up(), sign_out()]
}

/// `sign-in {id, password, cf_turnstile_token}` → `{token}`.
pub fn sign_in() -> CommandDescriptor {
    CommandDescriptor::new(
        SIGN_IN,
        ObjectSchema::new()
            .string("id")
            .string("password")
            .string("cf_turnstile_token"),
        run_sign_in,
    )
}

async fn run_sign_in(input: SignInInput, ctx: CommandContext) -> Result<CommandOutput> {
    let token = ctx
        .data_source
        .login(&input.id, &input.password, &input.cf_turnstile_token)
        .await?;
    ctx.identities.bind(ctx.session_id, input.id.as_str())?;
    info!(session = %ctx.session_id, user = %input.id, "session signed in");
    Ok(Some(json!({ "token": token })))
}

/// `sign-up {id, password, permissions, cf_turnstile_token}` → void.
pub fn sign_up() -> CommandDescriptor {
    CommandDescriptor::new(
        SIGN_UP,
        ObjectSchema::new()
            .string("id")
            .string("password")
            .string("permissions")
            .string("cf_turnstile_token"),
        run_sign_up,
    )
}

async fn run_sign_up(input: SignUpInput, ctx: CommandContext) -> Result<CommandOutput> {
    ctx.data_source
        .add_user(
            &input.id,
            &input.password,
            &input.permissions,
            &input.cf_turnstile_token,
        )
        .await?;
    ctx.identities.bind(ctx.session_id, input.id.as_str())?;
    info!(session = %ctx.session_id, user = %input.id, "user signed up");
    Ok(None)
}

/// `sign-out {id}` → void.
///
/// Unbinds whatever user the calling session holds. The payload `id` is
/// required by the schema but plays no part in what gets removed.
pub fn sign_out() -> CommandDescriptor {
    CommandDescriptor::new(SIGN_OUT, ObjectSchema::new().string("id"), run_sign_out)
}

async fn run_sign_out(_input: SignOutInput, ctx: CommandContext) -> Result<CommandOutput> {
    if let Some(user) = ctx.identities.unbind(&ctx.session_id)? {
        info!(session = %ctx.session_id, user = %user, "session signed out");
    }
    Ok(None)
}

/// `get-token-state {tokenToCheck, userID}` → `{valid}`.
pub fn get_token_state() -> CommandDescriptor {
    CommandDescriptor::new(
        GET_TOKEN_STATE,
        ObjectSchema::new().string("tokenToCheck").string("userID"),
        run_get_token_state,
    )
}

async fn run_get_token_state(input: TokenStateInput, ctx: CommandContext) -> Result<CommandOutput> {
    let valid = ctx
        .data_source
        .verify_token(&input.user_id, &input.token_to_check)
        .await?;
    if valid {
        ctx.identities.bind(ctx.session_id, input.user_id.as_str())?;
        info!(session = %ctx.session_id, user = %input.user_id, "session bound by token");
    }
    Ok(Some(json!({ "valid": valid })))
}
