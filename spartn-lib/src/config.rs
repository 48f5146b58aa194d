use typed_builder::TypedBuilder;

use crate::TimeAnchor;

/// Decoder configuration.
///
/// # Example
/// ```
/// use spartn::DecodeConfig;
///
/// let config = DecodeConfig::builder()
///     .decrypt(true)
///     .key("00112233445566778899aabbccddeeff")
///     .build();
/// assert!(config.validate);
/// ```
#[derive(TypedBuilder, Debug, Clone)]
pub struct DecodeConfig {
    /// Decrypt encrypted payloads. Requires a key.
    #[builder(default)]
    pub decrypt: bool,
    /// 128-bit AES key as a hexadecimal string. When not set the `MQTTKEY`
    /// environment variable is used.
    #[builder(default, setter(strip_option, into))]
    pub key: Option<String>,
    /// Validate the trailing frame CRC.
    #[builder(default = true)]
    pub validate: bool,
    /// Apply field resolutions when walking payload attributes.
    #[builder(default)]
    pub scaling: bool,
    /// Absolute time used to expand 16-bit time tags for decryption.
    #[builder(default, setter(strip_option))]
    pub time_anchor: Option<TimeAnchor>,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
