//! Device identity as reported by the backend.

use chat_core::DeviceDescriptor;
use chat_types::{DeviceInfoResponse, UNKNOWN_DEVICE, UNKNOWN_IP};

use crate::backend::BackendError;

/// What the backend told us about this device.
///
/// Looked up once per session; never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Local network address (placeholder when the backend left it out).
    pub local_address: String,
    /// Raw device description, possibly a JSON object.
    pub descriptor: String,
    /// Default gateway, if the backend reported one.
    pub gateway: Option<String>,
}

impl DeviceIdentity {
    /// Interpret a device-info body.
    ///
    /// A body that carries only an error is a rejection. Any other body is
    /// accepted, with placeholders for missing fields.
    pub fn from_response(response: DeviceInfoResponse) -> Result<Self, BackendError> {
        if response.local_ip.is_none() {
            if let Some(error) = response.error {
                return Err(BackendError::Rejected(error));
            }
        }

        Ok(Self {
            local_address: response.local_ip.unwrap_or_else(|| UNKNOWN_IP.to_string()),
            descriptor: response
                .device_info
                .unwrap_or_else(|| UNKNOWN_DEVICE.to_string()),
            gateway: response.network_gateway,
        })
    }

    /// Parsed form of the device description.
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::parse(&self.descriptor)
    }

    /// Human-friendly device name.
    pub fn display_name(&self) -> String {
        self.descriptor().display_name().into_owned()
    }
}
