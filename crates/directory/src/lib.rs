//! PVZ directory model: pickup points, the paged listing query and the
//! aggregate overview built from one flat join.

pub mod listing;
pub mod pvz;

pub use listing::{OverviewRow, PageLimits, PvzListQuery, PvzOverview, ReceptionOverview, group_rows};
pub use pvz::{City, Pvz};
