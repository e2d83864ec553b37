//! Text analysis: topical classification and geo-inference.

pub mod classify;
pub mod geo;

pub use crate::analyze::classify::{Classifier, RiskCategory};
pub use crate::analyze::geo::{Centroid, GeoMatch, GeoResolver, Precision};
