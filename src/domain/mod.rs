pub mod campaign;
pub mod subscriber;
