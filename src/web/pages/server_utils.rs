// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::User;
use crate::schema::users;
use crate::web::session_key::SESSION_USER;
use crate::web::state::AppState;
use diesel::prelude::*;
use leptos::prelude::*;
use leptos_axum::extract_with_state;
use tower_sessions::session::Session;

/// Gets the logged-in user for a request.
/// Must be used from a server function; relies on extracting request data.
pub async fn get_request_user() -> Result<Option<User>, ServerFnError> {
	let state: AppState = expect_context();
	let session: Session = extract_with_state(&state).await?;
	let user_id: Option<String> = session.get(SESSION_USER).await?;
	let Some(user_id) = user_id else {
		return Ok(None);
	};

	let mut db_connection = state.db_connection_pool.get()?;
	let user: Option<User> = users::table.find(&user_id).first(&mut db_connection).optional()?;
	Ok(user.filter(|user| user.active))
}

/// Gets the logged-in user, failing the server function if there isn't one.
pub async fn require_request_user() -> Result<User, ServerFnError> {
	match get_request_user().await? {
		Some(user) => Ok(user),
		None => Err(ServerFnError::ServerError(String::from("Not logged in"))),
	}
}
