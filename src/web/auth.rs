// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::session_key::{AUTH_CALLBACK_PATH, AUTH_CSRF_STATE, AUTH_CSRF_VERIFIER, SESSION_USER};
use super::state::AppState;
use crate::config::ConfigData;
use crate::model::{SiteRole, User};
use crate::schema::users;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use diesel::prelude::*;
use miette::IntoDiagnostic;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
	Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tower_sessions::Session;

/// Gets the OAuth client object for interacting with the organization SSO as an OAuth2 client
fn sso_oauth_client(config: &ConfigData) -> miette::Result<BasicClient> {
	let client_id = ClientId::new(config.sso.client_id.clone());
	let client_secret = ClientSecret::new(config.sso.client_secret.clone());

	let auth_url = AuthUrl::new(config.sso.auth_url.clone()).into_diagnostic()?;
	let token_url = TokenUrl::new(config.sso.token_url.clone()).into_diagnostic()?;

	let redirect_url = RedirectUrl::new(format!("{}/auth_callback", config.web.base_url)).into_diagnostic()?;

	let client =
		BasicClient::new(client_id, Some(client_secret), auth_url, Some(token_url)).set_redirect_uri(redirect_url);
	Ok(client)
}

/// Paths an unauthenticated visitor may reach: the OAuth callback and the external feedback
/// respond flow (the page and the server functions it calls).
fn is_public_path(path: &str) -> bool {
	path == "/auth_callback" || path == "/feedback" || path.starts_with("/feedback/")
}

/// Axum layer function for SSO authorization. Redirects requests from sessions that aren't
/// authenticated and aren't hitting a public path to the organization's SSO login.
pub async fn sso_auth_layer(State(state): State<AppState>, session: Session, request: Request, next: Next) -> Response {
	let user_id: Option<String> = match session.get(SESSION_USER).await {
		Ok(id) => id,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to retrieve user ID from session");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	if user_id.is_none() {
		let request_uri = request.uri();
		if !is_public_path(request_uri.path()) {
			let request_path_with_query = request_uri.path_and_query();
			let request_path_with_query = request_path_with_query
				.map(|path_and_query| path_and_query.as_str().to_string())
				.unwrap_or_default();
			let insert_result = session.insert(AUTH_CALLBACK_PATH, request_path_with_query).await;
			if let Err(insert_error) = insert_result {
				tracing::error!(source = ?insert_error, "Failed to set callback path to session");
				return StatusCode::INTERNAL_SERVER_ERROR.into_response();
			}

			let oauth_client = match sso_oauth_client(&state.config) {
				Ok(client) => client,
				Err(error) => {
					tracing::error!(source = ?error, "Failed to set up oauth client");
					return StatusCode::INTERNAL_SERVER_ERROR.into_response();
				}
			};
			let (code_challenge, code_verifier) = PkceCodeChallenge::new_random_sha256();

			let (oauth_url, csrf_state) = oauth_client
				.authorize_url(CsrfToken::new_random)
				.add_scope(Scope::new(String::from("openid")))
				.add_scope(Scope::new(String::from("profile")))
				.add_scope(Scope::new(String::from("email")))
				.set_pkce_challenge(code_challenge)
				.url();

			let insert_result = session.insert(AUTH_CSRF_STATE, csrf_state.secret().clone()).await;
			if let Err(error) = insert_result {
				tracing::error!(source = ?error, "Failed to set oauth validation info to session");
				return StatusCode::INTERNAL_SERVER_ERROR.into_response();
			}
			let insert_result = session.insert(AUTH_CSRF_VERIFIER, code_verifier.secret().clone()).await;
			if let Err(error) = insert_result {
				tracing::error!(source = ?error, "Failed to set oauth validation info to session");
				return StatusCode::INTERNAL_SERVER_ERROR.into_response();
			}

			return Redirect::to(oauth_url.as_str()).into_response();
		}
	}

	next.run(request).await
}

#[derive(Debug, Deserialize)]
pub struct CallbackArgs {
	code: String,
	state: String,
}

/// The identity claims fetched from the SSO userinfo endpoint after login
#[derive(Debug, Deserialize)]
struct UserinfoClaims {
	sub: String,
	name: String,
	email: String,
}

/// Route function for the OAuth login callback
#[axum::debug_handler]
pub async fn auth_callback_route(
	Query(query): Query<CallbackArgs>,
	session: Session,
	State(state): State<AppState>,
) -> Response {
	let csrf_state: Option<String> = match session.remove(AUTH_CSRF_STATE).await {
		Ok(state) => state,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get CSRF state for login callback");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let code_verifier: Option<String> = match session.remove(AUTH_CSRF_VERIFIER).await {
		Ok(verifier) => verifier,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get CSRF code verifier for login callback");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	let redirect_path: Option<String> = match session.remove(AUTH_CALLBACK_PATH).await {
		Ok(path) => path,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get callback redirect path for login callback");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let (Some(csrf_state), Some(code_verifier), Some(redirect_path)) = (csrf_state, code_verifier, redirect_path)
	else {
		return StatusCode::BAD_REQUEST.into_response();
	};

	if csrf_state != query.state {
		return StatusCode::BAD_REQUEST.into_response();
	}

	let oauth_client = match sso_oauth_client(&state.config) {
		Ok(client) => client,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to set up oauth client");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let auth_code = AuthorizationCode::new(query.code);
	let code_verifier = PkceCodeVerifier::new(code_verifier);

	let token_response = oauth_client
		.exchange_code(auth_code)
		.set_pkce_verifier(code_verifier)
		.request_async(async_http_client)
		.await;
	let token_response = match token_response {
		Ok(response) => response,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to get token response for oauth");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let userinfo_response = reqwest::Client::new()
		.get(&state.config.sso.userinfo_url)
		.bearer_auth(token_response.access_token().secret())
		.send()
		.await;
	let userinfo_response = match userinfo_response {
		Ok(response) => response,
		Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
	};
	let claims: UserinfoClaims = match userinfo_response.json().await {
		Ok(claims) => claims,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to extract SSO user claims");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	let user = match provision_user(&state, claims) {
		Ok(user) => user,
		Err(error) => {
			tracing::error!(source = ?error, "Failed to provision user from SSO claims");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};
	if !user.active {
		return StatusCode::FORBIDDEN.into_response();
	}

	let insert_result = session.insert(SESSION_USER, user.id).await;
	if let Err(error) = insert_result {
		tracing::error!(source = ?error, "Failed to store user ID to session");
		return StatusCode::INTERNAL_SERVER_ERROR.into_response();
	}

	Redirect::to(&redirect_path).into_response()
}

/// Gets the local user for a set of SSO claims, creating them on first login and keeping the
/// name and email claims current on later ones.
fn provision_user(state: &AppState, claims: UserinfoClaims) -> Result<User, Box<dyn std::error::Error + Send + Sync>> {
	let mut db_connection = state.db_connection_pool.get()?;

	let new_user = User {
		id: cuid2::create_id(),
		sso_subject: claims.sub,
		display_name: claims.name,
		email: claims.email,
		site_role: SiteRole::Member,
		active: true,
	};
	let user: User = diesel::insert_into(users::table)
		.values(&new_user)
		.on_conflict(users::sso_subject)
		.do_update()
		.set((
			users::display_name.eq(&new_user.display_name),
			users::email.eq(&new_user.email),
		))
		.get_result(&mut db_connection)?;

	Ok(user)
}
