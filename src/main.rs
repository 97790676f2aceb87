// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> miette::Result<()> {
	use ova_report::web::server::run_server;
	use ova_report::{config, database};
	use std::sync::Arc;

	tracing_subscriber::fmt::init();

	let config = Arc::new(config::parse_config("config.kdl").await?);
	let db_connection_pool = database::connect_db(&config)?;
	database::run_embedded_migrations(&db_connection_pool)?;

	run_server(config, db_connection_pool).await
}

#[cfg(not(feature = "ssr"))]
fn main() {
	// The client side is mounted through the hydrate entry point in lib.rs; there's no
	// standalone binary without the server feature.
}
