// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub const SESSION_USER: &str = "user_id";
pub const AUTH_CALLBACK_PATH: &str = "auth_callback_uri";
pub const AUTH_CSRF_STATE: &str = "csrf_state";
pub const AUTH_CSRF_VERIFIER: &str = "csrf_verifier";
