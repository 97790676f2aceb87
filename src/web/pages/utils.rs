// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::permissions::PermissionLevel;
use leptos::prelude::*;
use leptos_router::params::Params;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Params, PartialEq)]
pub struct OccurrenceParams {
	pub occurrence: Option<String>,
}

#[derive(Clone, Debug, Params, PartialEq)]
pub struct DepartmentParams {
	pub department: Option<String>,
}

#[derive(Clone, Debug, Params, PartialEq)]
pub struct TokenParams {
	pub token: Option<String>,
}

/// The logged-in user's identity and access, as shown in the page chrome
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserData {
	pub display_name: String,
	pub permission_level: PermissionLevel,
}

#[server]
pub async fn get_current_user_data() -> Result<Option<UserData>, ServerFnError> {
	use super::server_utils::get_request_user;
	use crate::web::permissions::permission_level_for_user;
	use crate::web::state::AppState;

	let user = get_request_user().await?;
	let Some(user) = user else {
		return Ok(None);
	};

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;
	let permission_level = permission_level_for_user(&mut db_connection, &user)?;

	Ok(Some(UserData {
		display_name: user.display_name,
		permission_level,
	}))
}

/// Makes a URL to the view for an occurrence
pub fn make_occurrence_url(occurrence_id: &str) -> String {
	format!("/occurrence/{}", occurrence_id)
}

/// Makes a URL to a department's assignment queue
pub fn make_department_url(department_id: &str) -> String {
	format!("/department/{}", department_id)
}

/// Formats an occurrence number the way it's shown everywhere in the application
pub fn format_occurrence_number(occurrence_number: i32) -> String {
	format!("#{:04}", occurrence_number)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn occurrence_numbers_are_zero_padded_to_four_digits() {
		assert_eq!(format_occurrence_number(7), "#0007");
		assert_eq!(format_occurrence_number(482), "#0482");
		assert_eq!(format_occurrence_number(12345), "#12345");
	}
}
