//! Domain types shared by every stage.

pub mod provenance;
pub mod series;

pub use provenance::{read_provenance, write_provenance, Provenance, ProvenanceError};
pub use series::{PricePoint, Series, SeriesError};
