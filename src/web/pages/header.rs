// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::utils::UserData;
use crate::web::permissions::PermissionLevel;
use leptos::prelude::*;

#[component]
pub fn PageHeader(user_data: UserData) -> impl IntoView {
	view! {
		<header id="header">
			<a id="header_title" href="/">
				<h1>"OVA Reporting"</h1>
			</a>
			<nav id="header_nav">
				<a href="/occurrence/new">"Report an occurrence"</a>
				{
					(user_data.permission_level != PermissionLevel::Member).then(|| view! {
						<a href="/reports">"Reports"</a>
					})
				}
				<a href="/settings/notifications">"Notification settings"</a>
			</nav>
			<div id="header_user_name">{user_data.display_name.clone()}</div>
		</header>
	}
}
