// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod report;
mod view;

pub use report::ReportOccurrence;
pub use view::OccurrenceView;
