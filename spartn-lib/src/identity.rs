//! Message identities by message type and subtype.

/// Identity reported for type/subtype combinations with no known name.
pub const UNKNOWN: &str = "UNKNOWN";

/// Look up the message name for a message type and subtype, or `None` if the
/// combination is not defined.
#[must_use]
pub fn lookup(msg_type: u8, msg_subtype: u8) -> Option<&'static str> {
    let name = match (msg_type, msg_subtype) {
        // Orbit, clock, bias
        (0, 0) => "SPARTN-1X-OCB-GPS",
        (0, 1) => "SPARTN-1X-OCB-GLO",
        (0, 2) => "SPARTN-1X-OCB-GAL",
        (0, 3) => "SPARTN-1X-OCB-BEI",
        (0, 4) => "SPARTN-1X-OCB-QZSS",
        // High-precision atmosphere correction
        (1, 0) => "SPARTN-1X-HPAC-GPS",
        (1, 1) => "SPARTN-1X-HPAC-GLO",
        (1, 2) => "SPARTN-1X-HPAC-GAL",
        (1, 3) => "SPARTN-1X-HPAC-BEI",
        (1, 4) => "SPARTN-1X-HPAC-QZSS",
        (2, 0) => "SPARTN-1X-GAD",
        (3, 0) => "SPARTN-1X-BPAC",
        // Encryption and authentication support
        (4, 0) => "SPARTN-1X-EAS-DYN",
        (4, 1) => "SPARTN-1X-EAS-GROUP",
        // Proprietary
        (120, 0) => "SPARTN-1X-PROP-EST",
        (120, 1) => "SPARTN-1X-PROP-UBLOX",
        (120, 2) => "SPARTN-1X-PROP-SWIFT",
        _ => return None,
    };
    Some(name)
}
