pub mod assessments;

pub mod evaluations;

pub use assessments::configure_assessments_routes;
pub use evaluations::configure_evaluations_routes;
