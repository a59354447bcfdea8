use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// Bytes of entropy per confirmation token (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Random URL-safe token, 22 characters of unpadded base64.
pub fn new_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}
