// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn;
use serde::{Deserialize, Serialize};

#[component]
pub fn NotificationSettings() -> impl IntoView {
	let preferences = OnceResource::new(get_notification_preferences());

	let (on_assignment_created, set_on_assignment_created) = signal(true);
	let (on_referral_received, set_on_referral_received) = signal(true);
	let (on_feedback_received, set_on_feedback_received) = signal(true);
	let (saved, set_saved) = signal(false);

	Effect::new_isomorphic(move |_| {
		if let Some(Ok(preference_data)) = preferences.read().as_ref() {
			set_on_assignment_created.set(preference_data.on_assignment_created);
			set_on_referral_received.set(preference_data.on_referral_received);
			set_on_feedback_received.set(preference_data.on_feedback_received);
		}
	});

	let form_submit = move |event: SubmitEvent| {
		event.prevent_default();
		set_saved.set(false);
		spawn(async move {
			let result = save_notification_preferences(
				on_assignment_created.get_untracked(),
				on_referral_received.get_untracked(),
				on_feedback_received.get_untracked(),
			)
			.await;
			if result.is_ok() {
				set_saved.set(true);
			}
		});
	};

	view! {
		<h2>"Notification settings"</h2>
		<Transition>
			{preferences.read();}
			<form id="notification_settings_form" on:submit=form_submit>
				<div>
					<label>
						<input
							type="checkbox"
							bind:checked=(on_assignment_created, set_on_assignment_created)
						/>
						"Notify me when an occurrence is assigned to one of my departments"
					</label>
				</div>
				<div>
					<label>
						<input
							type="checkbox"
							bind:checked=(on_referral_received, set_on_referral_received)
						/>
						"Notify me when an occurrence is referred to one of my departments"
					</label>
				</div>
				<div>
					<label>
						<input
							type="checkbox"
							bind:checked=(on_feedback_received, set_on_feedback_received)
						/>
						"Notify me when feedback I requested arrives"
					</label>
				</div>
				<div class="notification_settings_save">
					<button type="submit">"Save"</button>
					{
						move || saved.get().then(|| view! {
							<span class="notification_settings_saved">"Saved"</span>
						})
					}
				</div>
			</form>
		</Transition>
	}
}

/// A user's notification switches, as edited on the settings page
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PreferenceData {
	pub on_assignment_created: bool,
	pub on_referral_received: bool,
	pub on_feedback_received: bool,
}

#[server]
async fn get_notification_preferences() -> Result<PreferenceData, ServerFnError> {
	use crate::notify::preferences_for_user;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let preferences = preferences_for_user(&mut db_connection, &user.id)?;
	Ok(PreferenceData {
		on_assignment_created: preferences.on_assignment_created,
		on_referral_received: preferences.on_referral_received,
		on_feedback_received: preferences.on_feedback_received,
	})
}

#[server]
async fn save_notification_preferences(
	on_assignment_created: bool,
	on_referral_received: bool,
	on_feedback_received: bool,
) -> Result<(), ServerFnError> {
	use crate::model::NotificationPreference;
	use crate::schema::notification_preferences;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let preference_row = NotificationPreference {
		user_id: user.id,
		on_assignment_created,
		on_referral_received,
		on_feedback_received,
	};
	diesel::insert_into(notification_preferences::table)
		.values(&preference_row)
		.on_conflict(notification_preferences::user_id)
		.do_update()
		.set((
			notification_preferences::on_assignment_created.eq(on_assignment_created),
			notification_preferences::on_referral_received.eq(on_referral_received),
			notification_preferences::on_feedback_received.eq(on_feedback_received),
		))
		.execute(&mut db_connection)?;

	Ok(())
}
