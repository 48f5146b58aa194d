#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The first byte is not the SPARTN preamble.
    #[error("Unknown message preamble {0:#04x}")]
    UnknownPreamble(u8),

    #[error("Not enough bytes")]
    NotEnoughData {
        /// Number of bytes we got
        actual: usize,
        /// Minimum number of expected bytes
        minimum: usize,
    },

    #[error("Invalid CRC {actual:#x}, computed {computed:#x}")]
    InvalidCrc { actual: u32, computed: u32 },

    #[error("Key must be provided if decryption is enabled")]
    MissingKey,
    #[error("Invalid decryption key: {0}")]
    InvalidKey(String),

    /// A 16-bit time tag cannot be expanded to 32 bits without an absolute time anchor.
    #[error("16-bit time tag {0} requires a time anchor for decryption")]
    AmbiguousTimeTag(u16),
    #[error("Invalid 16-bit time tag {0}; must be less than 43200")]
    InvalidTimeTag(u16),

    #[error("decryption error: {0}")]
    Decryption(String),

    /// Error decoding a single payload attribute.
    #[error("Error processing attribute '{name}' in message type {identity}")]
    Attribute {
        name: String,
        identity: String,
        #[source]
        source: Box<Error>,
    },
    /// A payload definition references an attribute that has not been decoded.
    #[error("Undefined attribute reference '{0}'")]
    UndefinedAttribute(String),

    /// A lookup width selector value has no entry in its table.
    #[error("Value {value} of '{name}' has no width")]
    LookupRange { name: String, value: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
