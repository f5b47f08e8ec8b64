pub mod gravatar;
pub mod validation;

pub use validation::ValidatedJson;
