// Payload written into newly created reframe files
// Opaque to this crate. Written verbatim, never parsed.

pub const REFRAME_TEMPLATE_LEN: usize = 77;

/// Body of a blank reframe.
///
/// Zero-filled stand-in of the expected length: the bytes of a blank reframe
/// saved by the Player are not bundled with this crate. Every writer goes
/// through this constant, so swapping in the real bytes is a one-line change.
pub const REFRAME_TEMPLATE: [u8; REFRAME_TEMPLATE_LEN] = [0u8; REFRAME_TEMPLATE_LEN];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_shape() {
        assert_eq!(REFRAME_TEMPLATE.len(), REFRAME_TEMPLATE_LEN);
        assert!((76..=78).contains(&REFRAME_TEMPLATE_LEN));
    }
}
