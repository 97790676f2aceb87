// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::dashboard::Dashboard;
use super::department::DepartmentQueue;
use super::errors::error::Error;
use super::errors::not_found::NotFound;
use super::feedback::FeedbackRespond;
use super::header::PageHeader;
use super::occurrence::{OccurrenceView, ReportOccurrence};
use super::reports::ReportSummary;
use super::settings::NotificationSettings;
use super::utils::get_current_user_data;
use leptos::prelude::*;
use leptos_meta::{Stylesheet, Title, provide_meta_context};
use leptos_router::components::{ParentRoute, Route, Router, Routes};
use leptos_router::nested_router::Outlet;
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	// The feedback respond route is for external parties; it renders without the signed-in
	// chrome and is exempted from the auth layer.
	view! {
		<Stylesheet href="/pkg/ova-report.css" />
		<Title text="OVA Reporting" />

		<Router>
			<Routes fallback=|| "Not found.">
				<Route path=path!("/feedback/:token") view=FeedbackRespond />
				<ParentRoute path=path!("") view=MainPage>
					<Route path=path!("/") view=Dashboard />
					<Route path=path!("/occurrence/new") view=ReportOccurrence />
					<Route path=path!("/occurrence/:occurrence") view=OccurrenceView />
					<Route path=path!("/department/:department") view=DepartmentQueue />
					<Route path=path!("/reports") view=ReportSummary />
					<Route path=path!("/settings/notifications") view=NotificationSettings />
				</ParentRoute>
			</Routes>
		</Router>
	}
}

#[component]
fn MainPage() -> impl IntoView {
	view! {
		<Await future=get_current_user_data() let:data>
			{
				match data {
					Ok(Some(data)) => view! {
						<PageHeader user_data={data.clone()} />
						<main>
							<Outlet />
						</main>
					}.into_any(),
					Ok(None) => view! {
						<NotFound />
					}.into_any(),
					Err(_) => view! {
						<Error />
					}.into_any()
				}
			}
		</Await>
	}
}
