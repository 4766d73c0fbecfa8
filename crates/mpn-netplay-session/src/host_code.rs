//! Host codes: the short identifier a host shares so friends can join.

use rand::Rng;

/// Characters a host code is drawn from.
pub const HOST_CODE_ALPHABET: &[u8] = b"ABCDEF0123456789";

/// Length of every host code.
pub const HOST_CODE_LEN: usize = 8;

/// Generates a fresh random host code.
pub fn generate_host_code() -> String {
    let mut rng = rand::rng();
    (0..HOST_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..HOST_CODE_ALPHABET.len());
            HOST_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Generates a code guaranteed to differ from `previous`.
pub(crate) fn generate_host_code_after(previous: Option<&str>) -> String {
    loop {
        let code = generate_host_code();
        if previous != Some(code.as_str()) {
            return code;
        }
    }
}
