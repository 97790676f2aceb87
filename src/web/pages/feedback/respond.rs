// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::pages::errors::not_found::NotFound;
use crate::web::pages::utils::{TokenParams, format_occurrence_number};
use chrono::{DateTime, Utc};
use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn;
use leptos_router::hooks::use_params;
use serde::{Deserialize, Serialize};

#[component]
pub fn FeedbackRespond() -> impl IntoView {
	let params = use_params::<TokenParams>();
	let params = params.read();
	let params = params.as_ref().ok().cloned();

	let Some(params) = params else {
		return view! { <NotFound /> }.into_any();
	};
	let Some(token) = params.token.clone() else {
		return view! { <NotFound /> }.into_any();
	};

	let page_data = OnceResource::new(get_feedback_context(token.clone()));

	let (message, set_message) = signal(String::new());
	let (submitted, set_submitted) = signal(false);
	let (submit_error, set_submit_error): (ReadSignal<Option<String>>, WriteSignal<Option<String>>) = signal(None);

	let form_submit = {
		let token = token.clone();
		move |event: SubmitEvent| {
			event.prevent_default();
			if message.with(|message| message.is_empty()) {
				set_submit_error.set(Some(String::from("Enter your feedback before submitting")));
				return;
			}

			let token = token.clone();
			spawn(async move {
				match submit_feedback_message(token, message.get_untracked()).await {
					Ok(FeedbackSubmitOutcome::Accepted) => {
						set_submit_error.set(None);
						set_submitted.set(true);
					}
					Ok(FeedbackSubmitOutcome::Rejected(reason)) => {
						set_submit_error.set(Some(String::from(rejection_text(&reason))));
					}
					Err(_) => {
						set_submit_error.set(Some(String::from("Your feedback couldn't be submitted")));
					}
				}
			});
		}
	};

	view! {
		<main id="feedback_page">
			<h1>"OVA Reporting — Feedback"</h1>
			<Transition fallback=|| view! { <div id="feedback_page_loading">"Checking your link..."</div> }>
				{
					move || match page_data.read().as_ref().and_then(|data| data.as_ref().ok()) {
						Some(FeedbackPageData::Valid(details)) => {
							let details = details.clone();
							let form_submit = form_submit.clone();
							view! {
								<Show
									when=move || !submitted.get()
									fallback=|| view! {
										<div id="feedback_page_thanks">
											"Thank you. Your feedback was recorded."
										</div>
									}
								>
									<p>
										{details.department_name.clone()}
										" has asked for your feedback on occurrence "
										{format_occurrence_number(details.occurrence_number)}
										" ("
										{details.category_name.clone()}
										", "
										{details.occurred_at.to_rfc3339()}
										"), handled by "
										{details.issuer_name.clone()}
										"."
									</p>
									<form id="feedback_form" on:submit=form_submit.clone()>
										{
											move || submit_error.get().map(|error| view! {
												<div class="feedback_form_error">{error}</div>
											})
										}
										<textarea
											placeholder="Your feedback"
											bind:value=(message, set_message)
										/>
										<button type="submit">"Submit feedback"</button>
									</form>
								</Show>
							}.into_any()
						}
						Some(FeedbackPageData::Rejected(reason)) => {
							let text = rejection_text(reason);
							view! {
								<div id="feedback_page_rejected">{text}</div>
							}.into_any()
						}
						None => view! {
							<div id="feedback_page_loading">"Checking your link..."</div>
						}.into_any()
					}
				}
			</Transition>
		</main>
	}
	.into_any()
}

/// Maps a rejection reason to the text shown to the external party
fn rejection_text(reason: &str) -> &'static str {
	match reason {
		"expired" => "This feedback link has expired. Ask your contact for a new one.",
		"already-used" => "Feedback was already submitted with this link.",
		_ => "This feedback link isn't valid.",
	}
}

/// What the respond page shows for a live token
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeedbackDetails {
	pub occurrence_number: i32,
	pub occurred_at: DateTime<Utc>,
	pub category_name: String,
	pub department_name: String,
	pub issuer_name: String,
}

/// The respond page's state for a presented token
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum FeedbackPageData {
	Valid(FeedbackDetails),
	/// Carries the rejection reason: `invalid`, `expired`, or `already-used`
	Rejected(String),
}

/// The result of a feedback submission
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum FeedbackSubmitOutcome {
	Accepted,
	/// Carries the rejection reason: `invalid`, `expired`, or `already-used`
	Rejected(String),
}

/// Validates a presented token and resolves what the respond page shows.
///
/// Reachable without authentication; mounted under the public `/feedback/api` prefix.
#[server(prefix = "/feedback/api")]
async fn get_feedback_context(token: String) -> Result<FeedbackPageData, ServerFnError> {
	use crate::feedback::{FeedbackError, validate_token};
	use crate::model::IncidentCategory;
	use crate::schema::incident_categories;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	match validate_token(&mut db_connection, &token, Utc::now()) {
		Ok(validated) => {
			let category: IncidentCategory = incident_categories::table
				.find(&validated.occurrence.category)
				.first(&mut db_connection)?;
			Ok(FeedbackPageData::Valid(FeedbackDetails {
				occurrence_number: validated.occurrence.occurrence_number,
				occurred_at: validated.occurrence.occurred_at,
				category_name: category.name,
				department_name: validated.department.name,
				issuer_name: validated.issuer.display_name,
			}))
		}
		Err(FeedbackError::Rejected(rejection)) => Ok(FeedbackPageData::Rejected(rejection.to_string())),
		Err(FeedbackError::Database(error)) => Err(ServerFnError::ServerError(error.to_string())),
	}
}

/// Submits the external party's feedback message against their token.
///
/// Reachable without authentication; mounted under the public `/feedback/api` prefix.
#[server(prefix = "/feedback/api")]
async fn submit_feedback_message(token: String, message: String) -> Result<FeedbackSubmitOutcome, ServerFnError> {
	use crate::feedback::{FeedbackError, submit_feedback};
	use crate::model::{Assignment, FeedbackToken, NotificationKind, Occurrence};
	use crate::notify::notify_user;
	use crate::schema::{assignments, feedback_tokens, occurrences};
	use crate::web::pages::utils::format_occurrence_number;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	if message.is_empty() {
		return Err(ServerFnError::ServerError(String::from("Feedback message is required")));
	}

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let now = Utc::now();
	match submit_feedback(&mut db_connection, &token, &message, now) {
		Ok(()) => {
			// Tell the issuer their requested feedback arrived.
			let token_record: Option<FeedbackToken> = feedback_tokens::table
				.find(&token)
				.first(&mut db_connection)
				.optional()?;
			if let Some(token_record) = token_record {
				let assignment: Assignment = assignments::table
					.find(&token_record.assignment)
					.first(&mut db_connection)?;
				let occurrence: Occurrence = occurrences::table
					.find(&assignment.occurrence)
					.first(&mut db_connection)?;
				let body = format!(
					"Feedback was received for occurrence {}",
					format_occurrence_number(occurrence.occurrence_number)
				);
				notify_user(
					&mut db_connection,
					&token_record.issued_by,
					NotificationKind::FeedbackReceived,
					&occurrence.id,
					Some(&token_record.assignment),
					&body,
					now,
				)?;
			}
			Ok(FeedbackSubmitOutcome::Accepted)
		}
		Err(FeedbackError::Rejected(rejection)) => Ok(FeedbackSubmitOutcome::Rejected(rejection.to_string())),
		Err(FeedbackError::Database(error)) => Err(ServerFnError::ServerError(error.to_string())),
	}
}
