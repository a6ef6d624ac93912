//! Core engine logic, independent of any transport or UI surface.

pub mod attribute;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod score;
pub mod train;
