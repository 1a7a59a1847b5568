//! Client for the boum API, controlling irrigation and aquaponics boxes.

pub mod auth;
pub mod client;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod request;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{ActiveSession, ApiClient};
pub use config::{ClientConfig, Credentials, API_URL_DEV, API_URL_LOCAL, API_URL_PROD};
pub use device::Device;
pub use endpoint::{Endpoint, Resource};
pub use endpoints::{DataQuery, Root};
pub use error::{Error, Result};
pub use models::{DeviceDataModel, DeviceModel, DeviceStateModel, PumpState, UserModel};
