//! The cumulative constraint: at any time instant the summed demand of the running tasks
//! stays within the resource capacity.

mod cumulative_graph_propagator;
mod cumulative_propagator;
mod event_point_series;
mod profile;

pub(crate) use cumulative_graph_propagator::CumulativeGraph;
pub(crate) use cumulative_propagator::Cumulative;
pub(crate) use event_point_series::EventPointSeries;
pub(crate) use event_point_series::EventType;
pub(crate) use profile::BacktrackableProfile;
pub(crate) use profile::Profile;
