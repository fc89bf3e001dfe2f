pub mod campaign;
pub mod health;
pub mod subscription;
