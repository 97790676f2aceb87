// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::pages::utils::make_occurrence_url;
use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn;
use leptos_router::hooks::use_navigate;
use serde::{Deserialize, Serialize};

#[component]
pub fn ReportOccurrence() -> impl IntoView {
	let categories = OnceResource::new(get_category_options());

	let (occurred_at, set_occurred_at) = signal(String::new());
	let (location, set_location) = signal(String::new());
	let (description, set_description) = signal(String::new());
	let (category, set_category) = signal(String::new());
	let (submit_errors, set_submit_errors): (ReadSignal<Vec<String>>, WriteSignal<Vec<String>>) = signal(Vec::new());

	// The severity badge next to the category picker tracks the selected category.
	let selected_severity = move || {
		let selected = category.get();
		categories
			.read()
			.as_ref()
			.and_then(|categories| categories.as_ref().ok())
			.and_then(|categories| categories.iter().find(|option| option.id == selected))
			.map(|option| option.severity.clone())
	};

	let form_submit = move |event: SubmitEvent| {
		event.prevent_default();
		set_submit_errors.set(Vec::new());

		if occurred_at.with(|occurred_at| occurred_at.is_empty()) {
			set_submit_errors.update(|errors| errors.push(String::from("Enter when the incident occurred")));
		}
		if location.with(|location| location.is_empty()) {
			set_submit_errors.update(|errors| errors.push(String::from("Enter where the incident occurred")));
		}
		if description.with(|description| description.is_empty()) {
			set_submit_errors.update(|errors| errors.push(String::from("Enter a description of the incident")));
		}
		if category.with(|category| category.is_empty()) {
			set_submit_errors.update(|errors| errors.push(String::from("Select an incident category")));
		}

		if !submit_errors.with(|errors| errors.is_empty()) {
			return;
		}

		spawn(async move {
			let result = submit_occurrence(occurred_at.get(), location.get(), description.get(), category.get()).await;
			match result {
				Ok(occurrence_id) => {
					use_navigate()(&make_occurrence_url(&occurrence_id), Default::default());
				}
				Err(_) => {
					set_submit_errors
						.update(|errors| errors.push(String::from("The occurrence couldn't be submitted")));
				}
			}
		});
	};

	view! {
		<h2>"Report an occurrence"</h2>
		<form id="report_occurrence_form" on:submit=form_submit>
			<div class="report_occurrence_errors">
				<ul>
					<For
						each=move || submit_errors.get()
						key=|error| error.clone()
						let(error)
					>
						<li>{error}</li>
					</For>
				</ul>
			</div>
			<div>
				<label>
					<span class="report_occurrence_label_text">"When it occurred"</span>
					<input
						type="datetime-local"
						bind:value=(occurred_at, set_occurred_at)
					/>
				</label>
			</div>
			<div>
				<label>
					<span class="report_occurrence_label_text">"Location"</span>
					<input
						type="text"
						bind:value=(location, set_location)
					/>
				</label>
			</div>
			<div>
				<label>
					<span class="report_occurrence_label_text">"Category"</span>
					<Transition>
						<select on:change:target=move |event| set_category.set(event.target().value())>
							<option value="">"Select a category"</option>
							{
								move || match &categories.read().as_ref().and_then(|categories| categories.as_ref().ok()) {
									Some(category_options) => {
										category_options.iter().map(|option|
											view! {
												<option value={option.id.clone()}>
													{option.label.clone()}
												</option>
											}.into_any()
										).collect::<Vec<_>>()
									}
									None => Vec::new()
								}
							}
						</select>
					</Transition>
				</label>
				{
					move || selected_severity().map(|severity| view! {
						<span class="report_occurrence_severity">"Severity: " {severity}</span>
					})
				}
			</div>
			<div>
				<label>
					<span class="report_occurrence_label_text">"What happened"</span>
					<textarea
						bind:value=(description, set_description)
					/>
				</label>
			</div>
			<div class="report_occurrence_submit">
				<button type="submit">"Submit report"</button>
			</div>
		</form>
	}
}

/// A selectable leaf category with its full path as the label
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CategoryOption {
	pub id: String,
	pub label: String,
	pub severity: String,
}

/// Gets the selectable incident categories: active leaves of the taxonomy, labeled with their
/// full main/sub/sub-sub path.
#[server]
async fn get_category_options() -> Result<Vec<CategoryOption>, ServerFnError> {
	use crate::model::IncidentCategory;
	use crate::schema::incident_categories;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;
	use std::collections::HashSet;

	require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let categories: Vec<IncidentCategory> = incident_categories::table
		.filter(incident_categories::active.eq(true))
		.load(&mut db_connection)?;

	let parent_ids: HashSet<&String> = categories.iter().filter_map(|category| category.parent.as_ref()).collect();

	let mut options: Vec<CategoryOption> = Vec::new();
	for category in categories.iter() {
		if parent_ids.contains(&category.id) {
			continue;
		}

		let mut path_parts = vec![category.name.clone()];
		let mut parent_id = category.parent.clone();
		while let Some(current_id) = parent_id {
			let Some(parent) = categories.iter().find(|category| category.id == current_id) else {
				break;
			};
			path_parts.push(parent.name.clone());
			parent_id = parent.parent.clone();
		}
		path_parts.reverse();

		options.push(CategoryOption {
			id: category.id.clone(),
			label: path_parts.join(" / "),
			severity: category.severity.to_string(),
		});
	}
	options.sort_by(|a, b| a.label.cmp(&b.label));

	Ok(options)
}

/// Files a new occurrence and returns its ID.
#[server]
async fn submit_occurrence(
	occurred_at: String,
	location: String,
	description: String,
	category: String,
) -> Result<String, ServerFnError> {
	use crate::model::IncidentCategory;
	use crate::occurrence::{NewOccurrence, create_occurrence};
	use crate::schema::incident_categories;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use chrono::NaiveDateTime;
	use chrono::Utc;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	if location.is_empty() || description.is_empty() {
		return Err(ServerFnError::ServerError(String::from(
			"Location and description are required",
		)));
	}

	// datetime-local inputs submit this format with no zone designator.
	let occurred_at = NaiveDateTime::parse_from_str(&occurred_at, "%Y-%m-%dT%H:%M")
		.map_err(|_| -> ServerFnError { ServerFnError::ServerError(String::from("Invalid occurrence time")) })?
		.and_utc();

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let selected: Option<IncidentCategory> = incident_categories::table
		.find(&category)
		.first(&mut db_connection)
		.optional()?;
	let Some(selected) = selected else {
		return Err(ServerFnError::ServerError(String::from("Unknown incident category")));
	};
	if !selected.active {
		return Err(ServerFnError::ServerError(String::from(
			"The selected category is no longer available",
		)));
	}
	let child_count: i64 = incident_categories::table
		.filter(
			incident_categories::parent
				.eq(&selected.id)
				.and(incident_categories::active.eq(true)),
		)
		.count()
		.get_result(&mut db_connection)?;
	if child_count > 0 {
		return Err(ServerFnError::ServerError(String::from(
			"Occurrences are filed against the most specific category",
		)));
	}

	let occurrence = create_occurrence(
		&mut db_connection,
		NewOccurrence {
			reported_by: user.id,
			occurred_at,
			location,
			description,
			category: selected.id,
		},
		Utc::now(),
	)?;

	Ok(occurrence.id)
}
