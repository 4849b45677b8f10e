use sha2::{Digest, Sha256};

/// Creates a truncated, salted hash of an identifier for safe logging.
///
/// Phone numbers and device tokens go through this before reaching any
/// log line.
///
/// # Arguments
/// * `id` - The identifier to hash (phone number, device token).
/// * `salt` - `LOG_HASH_SALT` from the logging configuration.
pub fn log_safe_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(id.as_bytes());
    let hash = hasher.finalize();

    hex::encode(&hash[..4])
}

/// Phone number as it may appear in logs: verbatim only when
/// `LOG_PHONE_NUMBERS` is enabled, hashed otherwise.
pub fn loggable_phone(phone_number: &str, enable_phone_numbers: bool, salt: &str) -> String {
    if enable_phone_numbers {
        phone_number.to_string()
    } else {
        log_safe_id(phone_number, salt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_safe_id_is_short_and_salted() {
        let a = log_safe_id("9876543210", "salt-a");
        let b = log_safe_id("9876543210", "salt-b");
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
        assert_eq!(a, log_safe_id("9876543210", "salt-a"));
    }

    #[test]
    fn test_loggable_phone() {
        assert_eq!(loggable_phone("9876543210", true, "s"), "9876543210");
        assert_eq!(loggable_phone("9876543210", false, "s"), log_safe_id("9876543210", "s"));
    }
}
