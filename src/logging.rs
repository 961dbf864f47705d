use std::fmt;

/// Display wrapper that hides the local part of an address in log output.
///
/// `alice@example.com` renders as `***@example.com`; input without an `@`
/// renders as `***`. Use it for every `tracing` field that carries an address.
///
/// ```
/// use email_gate::MaskedEmail;
///
/// assert_eq!(MaskedEmail("alice@example.com").to_string(), "***@example.com");
/// assert_eq!(MaskedEmail("not-an-address").to_string(), "***");
/// ```
#[derive(Clone, Copy)]
pub struct MaskedEmail<'a>(pub &'a str);

impl fmt::Display for MaskedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.rsplit_once('@') {
            Some((_, domain)) => write!(f, "***@{}", domain),
            None => f.write_str("***"),
        }
    }
}

impl fmt::Debug for MaskedEmail<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
